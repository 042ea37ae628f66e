#[cfg(test)]
mod interpreter_tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use rox::diagnostics::Diagnostics;
    use rox::interpreter::Interpreter;
    use rox::parser::Parser;
    use rox::resolver::Resolver;
    use rox::scanner::Scanner;
    use rox::token::{Token, TokenType};
    use rox::value::Value;
    use rox::Lox;

    fn output(lox: &Lox<Vec<u8>>) -> String {
        String::from_utf8_lossy(lox.output()).into_owned()
    }

    /// Run `source` in a fresh session, returning what it printed.
    fn run(source: &str) -> (String, Diagnostics) {
        let mut lox = Lox::with_output(Vec::new());
        let diagnostics = lox.run(source);

        (output(&lox), diagnostics)
    }

    fn run_ok(source: &str) -> String {
        let (printed, diagnostics) = run(source);
        assert!(
            diagnostics.is_empty(),
            "unexpected errors: {:?}",
            diagnostics.messages()
        );
        printed
    }

    /// Run `source`, expecting exactly one runtime error.
    fn runtime_error(source: &str) -> (String, String) {
        let (printed, diagnostics) = run(source);

        assert!(!diagnostics.had_error(), "{:?}", diagnostics.messages());
        assert!(diagnostics.had_runtime_error());
        assert_eq!(diagnostics.len(), 1);

        let error = diagnostics.iter().next().map(|e| e.to_string());
        (printed, error.unwrap_or_default())
    }

    #[test]
    fn test_arithmetic_and_print() {
        assert_eq!(run_ok("print 1 + 2 * 3; print (1 + 2) * 3;"), "7\n9\n");
        assert_eq!(run_ok("print \"a\" + \"b\"; print \"\";"), "ab\n\n");
        assert_eq!(run_ok("print nil; print true; print !true;"), "nil\ntrue\nfalse\n");
    }

    #[rstest]
    #[case("print 3;", "3")]
    #[case("print 2.5;", "2.5")]
    #[case("print 10 / 4;", "2.5")]
    #[case("print 1000000;", "1000000")]
    #[case("print 0.1 + 0.2;", "0.30000000000000004")]
    #[case("print 1 / 0;", "inf")]
    #[case("print -1 / 0;", "-inf")]
    #[case("print -(3 - 5);", "2")]
    fn test_number_formatting(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(run_ok(source), format!("{}\n", expected));
    }

    #[test]
    fn test_truthiness() {
        assert_eq!(
            run_ok("print !nil; print !0; print !\"\"; print !false;"),
            "true\nfalse\nfalse\ntrue\n"
        );
        assert_eq!(
            run_ok("if (0) print \"zero is true\"; if (nil) print 1; else print \"nil is false\";"),
            "zero is true\nnil is false\n"
        );
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        // `missing` is never defined; reading it would be a runtime error.
        let source = "
            print nil or \"x\";
            print 1 and 2;
            print false and missing;
            print true or missing;
            print nil and 1 or 3;
        ";

        assert_eq!(run_ok(source), "x\n2\nfalse\ntrue\n3\n");
    }

    #[test]
    fn test_equality_across_kinds() {
        let source = "
            print 1 == 1;
            print \"a\" == \"a\";
            print nil == nil;
            print 1 == \"1\";
            print nil == false;
            print 0 == false;
            print 1 != 2;
            print clock == clock;
            fun f() {}
            fun g() {}
            print f == f;
            print f == g;
        ";

        assert_eq!(
            run_ok(source),
            "true\ntrue\ntrue\nfalse\nfalse\nfalse\ntrue\ntrue\ntrue\nfalse\n"
        );
    }

    #[test]
    fn test_operands_evaluate_left_to_right() {
        let source = "
            var trail = \"\";
            fun mark(x) { trail = trail + x; return x; }
            print mark(\"a\") + mark(\"b\");
            print trail;
        ";

        assert_eq!(run_ok(source), "ab\nab\n");
    }

    #[test]
    fn test_block_shadowing() {
        let source = "
            var a = 1;
            {
                var a = 2;
                {
                    var a = 3;
                    print a;
                }
                print a;
            }
            print a;
        ";

        assert_eq!(run_ok(source), "3\n2\n1\n");
    }

    #[test]
    fn test_loops() {
        assert_eq!(
            run_ok("for (var i = 0; i < 3; i = i + 1) print i;"),
            "0\n1\n2\n"
        );
        assert_eq!(
            run_ok("var n = 3; while (n > 0) { print n; n = n - 1; }"),
            "3\n2\n1\n"
        );
    }

    #[test]
    fn test_recursion() {
        let source = "
            fun fact(n) {
                if (n <= 1) return 1;
                return n * fact(n - 1);
            }
            print fact(5);

            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(15);
        ";

        assert_eq!(run_ok(source), "120\n610\n");
    }

    #[test]
    fn test_closure_sees_later_assignment() {
        let source = "
            var a = 10;
            fun show() { print a; }
            a = 20;
            show();
            {
                var x = 1;
                fun get() { return x; }
                x = 2;
                print get();
            }
        ";

        assert_eq!(run_ok(source), "20\n2\n");
    }

    #[test]
    fn test_closure_binding_is_static() {
        let source = "
            var a = \"global\";
            {
                fun showA() { print a; }
                showA();
                var a = \"block\";
                showA();
            }
        ";

        assert_eq!(run_ok(source), "global\nglobal\n");
    }

    #[test]
    fn test_counter_closures_are_independent() {
        let source = "
            fun makeCounter() {
                var i = 0;
                fun count() {
                    i = i + 1;
                    print i;
                }
                return count;
            }
            var c = makeCounter();
            c();
            c();
            var d = makeCounter();
            d();
        ";

        assert_eq!(run_ok(source), "1\n2\n1\n");
    }

    #[test]
    fn test_return_unwinds_nested_loops() {
        let source = "
            fun find() {
                var i = 0;
                while (true) {
                    for (var j = 0; j < 10; j = j + 1) {
                        if (i * 10 + j == 23) return i * 10 + j;
                    }
                    i = i + 1;
                }
            }
            print find();
        ";

        assert_eq!(run_ok(source), "23\n");
    }

    #[test]
    fn test_missing_return_value_is_nil() {
        assert_eq!(
            run_ok("fun f() {} print f(); fun g() { return; } print g();"),
            "nil\nnil\n"
        );
    }

    #[test]
    fn test_callable_display() {
        assert_eq!(
            run_ok("fun add(a, b) { return a + b; } print add; print clock;"),
            "<fn add>\n<native fn>\n"
        );
    }

    #[test]
    fn test_clock_returns_seconds() {
        assert_eq!(run_ok("var t = clock(); print t > 1000000000;"), "true\n");
    }

    #[rstest]
    #[case("print -\"a\";", "Operand must be a number.")]
    #[case("print 1 + \"a\";", "Operands must be two numbers or two strings.")]
    #[case("print nil + nil;", "Operands must be two numbers or two strings.")]
    #[case("print \"a\" - \"b\";", "Operands must be numbers.")]
    #[case("print 1 < \"a\";", "Operands must be numbers.")]
    #[case("print nil * 2;", "Operands must be numbers.")]
    #[case("print undefined;", "Undefined variable 'undefined'.")]
    #[case("x = 1;", "Undefined variable 'x'.")]
    #[case("\"str\"();", "Can only call functions.")]
    #[case("var n = 1; n();", "Can only call functions.")]
    #[case("clock(1);", "Expected 0 arguments but got 1.")]
    #[case("fun f(a, b) {} f(1);", "Expected 2 arguments but got 1.")]
    fn test_runtime_errors(#[case] source: &str, #[case] message: &str) {
        let (_, error) = runtime_error(source);

        assert_eq!(error, format!("{}\n[line 1]", message));
    }

    #[test]
    fn test_runtime_error_reports_line_and_keeps_earlier_output() {
        let (printed, error) = runtime_error("print 1;\n\nprint -true;\nprint 2;");

        assert_eq!(printed, "1\n");
        assert_eq!(error, "Operand must be a number.\n[line 3]");
    }

    #[test]
    fn test_arity_mismatch_stops_program() {
        let (printed, error) =
            runtime_error("print \"before\";\nfun f(a) {}\nf(1, 2);\nprint \"after\";");

        assert_eq!(printed, "before\n");
        assert_eq!(error, "Expected 1 arguments but got 2.\n[line 3]");
    }

    #[test]
    fn test_arity_checked_before_arguments_run() {
        let mut lox = Lox::with_output(Vec::new());

        let diagnostics = lox.run("var a = 0; fun f(x) {} f(a = 1, a = 2);");
        assert_eq!(diagnostics.messages(), vec!["Expected 1 arguments but got 2."]);

        let diagnostics = lox.run("print a;");
        assert!(diagnostics.is_empty());
        assert_eq!(output(&lox), "0\n");
    }

    #[rstest]
    #[case::scan("print 1; @", "Unexpected character: @")]
    #[case::parse("print 1; print ;", "Expect expression.")]
    #[case::resolve("print 1; return 2;", "Can't return from top-level code.")]
    #[case::resolve_local("print 1; { var a = a; }", "Can't read local variable in its own initializer.")]
    fn test_static_errors_prevent_execution(#[case] source: &str, #[case] message: &str) {
        let (printed, diagnostics) = run(source);

        assert_eq!(printed, "");
        assert!(diagnostics.had_error());
        assert!(!diagnostics.had_runtime_error());
        assert_eq!(diagnostics.messages(), vec![message]);
    }

    #[test]
    fn test_session_state_persists_across_units() {
        let mut lox = Lox::with_output(Vec::new());

        for line in ["var a = 1;", "fun show() { print a; }", "a = 2;", "show();"] {
            assert!(lox.run(line).is_empty(), "{:?} failed", line);
        }

        // A failing unit leaves earlier definitions in place.
        assert!(lox.run("print missing;").had_runtime_error());
        assert!(lox.run("print ;").had_error());
        assert!(lox.run("show();").is_empty());

        assert_eq!(output(&lox), "2\n2\n");
    }

    #[test]
    fn test_units_do_not_share_expression_ids() {
        let mut lox = Lox::with_output(Vec::new());

        assert!(lox.run("{ var hidden = \"local\"; { print hidden; } }").is_empty());

        // `v` is global here; it must not pick up the distance recorded for
        // `hidden` in the previous unit.
        let diagnostics = lox.run("var v = \"global\"; { var w = 1; { print v; } }");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics.messages());

        assert_eq!(output(&lox), "local\nglobal\n");
    }

    #[test]
    fn test_scope_restored_after_runtime_error_in_block() {
        let mut lox = Lox::with_output(Vec::new());

        let diagnostics = lox.run("var a = \"outer\"; { var a = \"inner\"; print -a; }");
        assert!(diagnostics.had_runtime_error());

        // Top-level definitions land in the global scope again.
        assert!(lox.run("var b = 1; print a;").is_empty());
        assert!(lox.interpreter().globals().borrow().contains("b"));
        assert_eq!(output(&lox), "outer\n");
    }

    #[test]
    fn test_deep_recursion_is_a_runtime_error() {
        let mut lox = Lox::with_output(Vec::new());

        let overflow = lox.run("fun r(n) { return r(n + 1); }\nr(0);");
        assert_eq!(
            overflow.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
            vec!["Stack overflow.\n[line 1]"]
        );

        // The depth counter unwinds with the error.
        let recovered =
            lox.run("fun down(n) { if (n == 0) return 0; return down(n - 1); } print down(150);");
        assert!(recovered.is_empty(), "{:?}", recovered.messages());
        assert_eq!(output(&lox), "0\n");
    }

    #[test]
    fn test_recursion_up_to_the_call_limit() {
        let printed = run_ok(
            "fun count(n) { if (n == 1) return 1; return 1 + count(n - 1); } print count(200);",
        );

        assert_eq!(printed, "200\n");
    }

    #[test]
    fn test_deeply_nested_expression_evaluates() {
        let source = format!("print {}1{};", "(".repeat(200), ")".repeat(200));

        assert_eq!(run_ok(&source), "1\n");
    }

    #[test]
    fn test_assignment_targets_nearest_shadow() {
        let printed = run_ok("var a = \"g\"; { var a = 1; { a = 2; print a; } } print a;");

        assert_eq!(printed, "2\ng\n");
    }

    #[test]
    fn test_failed_resolution_records_no_distances() {
        let mut lox = Lox::with_output(Vec::new());

        let diagnostics = lox.run("{ var a = 1; { var b = a; var b = 2; } }");
        assert!(diagnostics.had_error());
        assert!(lox.interpreter().locals().is_empty());

        assert!(lox.run("{ var a = 1; { print a; } }").is_empty());
        assert_eq!(lox.interpreter().locals().len(), 1);
        assert_eq!(output(&lox), "1\n");
    }

    fn double(args: &[Value]) -> Result<Value, String> {
        match args {
            [Value::Number(n)] => Ok(Value::Number(n * 2.0)),
            _ => Err("Argument must be a number.".to_string()),
        }
    }

    #[test]
    fn test_host_defined_native() {
        let mut lox = Lox::with_output(Vec::new());
        lox.interpreter_mut().define_native("double", 1, double);

        let diagnostics = lox.run("print double(21);\nprint double;\ndouble(\"x\");");

        assert_eq!(output(&lox), "42\n<native fn>\n");
        assert_eq!(
            diagnostics.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
            vec!["Argument must be a number.\n[line 3]"]
        );
    }

    #[test]
    fn test_interpreter_without_session() {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new("fun sq(x) { return x * x; } print sq(4);")
            .scan_tokens(&mut diagnostics);
        let statements = Parser::new(&tokens)
            .parse(&mut diagnostics)
            .expect("valid program");

        let mut interpreter = Interpreter::with_output(Vec::new());
        Resolver::new(&mut interpreter).resolve(&statements, &mut diagnostics);
        interpreter.interpret(&statements, &mut diagnostics);

        assert!(diagnostics.is_empty());
        assert_eq!(interpreter.into_output(), b"16\n".to_vec());
    }

    #[test]
    fn test_value_helpers() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());

        let interpreter = Interpreter::with_output(Vec::<u8>::new());
        let clock = interpreter
            .globals()
            .borrow()
            .get(&Token::new(TokenType::IDENTIFIER, "clock", None, 1))
            .expect("clock is predefined");

        assert!(clock.is_callable());
        assert!(!Value::String("clock".into()).is_callable());
    }
}
