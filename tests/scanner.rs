#[cfg(test)]
mod scanner_tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use rox::diagnostics::Diagnostics;
    use rox::error::LoxError;
    use rox::scanner::*;
    use rox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn assert_token_matches(
        result: &Result<Token, LoxError>,
        expected_type: TokenType,
        expected_lexeme: &str,
    ) {
        match result {
            Ok(token) => {
                assert_eq!(token.token_type, expected_type);
                assert_eq!(token.lexeme, expected_lexeme);
            }
            Err(e) => panic!("Expected token but got error: {}", e),
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >= /",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_arithmetic_expression_tokens() {
        let tokens: Vec<Token> = Scanner::new("1 + 2.5 * (3 - x)")
            .collect::<Result<_, _>>()
            .expect("source is lexically valid");

        let kinds: Vec<TokenType> = tokens.iter().map(|t| t.token_type).collect();
        assert_eq!(
            kinds,
            vec![
                TokenType::NUMBER,
                TokenType::PLUS,
                TokenType::NUMBER,
                TokenType::STAR,
                TokenType::LEFT_PAREN,
                TokenType::NUMBER,
                TokenType::MINUS,
                TokenType::IDENTIFIER,
                TokenType::RIGHT_PAREN,
                TokenType::EOF,
            ]
        );

        assert_eq!(tokens[0].literal, Some(Literal::Number(1.0)));
        assert_eq!(tokens[2].literal, Some(Literal::Number(2.5)));
        assert_eq!(tokens[5].literal, Some(Literal::Number(3.0)));
        assert_eq!(tokens[7].lexeme, "x");
        assert!(tokens.iter().all(|t| t.line == 1));
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let results: Vec<_> = Scanner::new(source).collect();

        // COMMA, DOT, error for '$', LEFT_PAREN, error for '#', EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|e| e.to_string())
            .collect();

        assert_eq!(
            errors,
            vec![
                "[line 1] Error: Unexpected character: $".to_string(),
                "[line 1] Error: Unexpected character: #".to_string(),
            ]
        );
    }

    #[test]
    fn test_non_ascii_outside_string_is_one_error() {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new("é \"ünïcode\"").scan_tokens(&mut diagnostics);

        assert_eq!(diagnostics.messages(), vec!["Unexpected character: é"]);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].literal, Some(Literal::Str("ünïcode".into())));
    }

    #[test]
    fn test_unterminated_string_sets_error_and_finishes() {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new("var a = \"abc").scan_tokens(&mut diagnostics);

        assert!(diagnostics.had_error());
        assert_eq!(diagnostics.messages(), vec!["Unterminated string."]);

        let kinds: Vec<TokenType> = tokens.iter().map(|t| t.token_type).collect();
        assert_eq!(
            kinds,
            vec![
                TokenType::VAR,
                TokenType::IDENTIFIER,
                TokenType::EQUAL,
                TokenType::EOF
            ]
        );
    }

    #[test]
    fn test_multiline_string_counts_lines() {
        let tokens: Vec<Token> = Scanner::new("\"a\nb\" x")
            .collect::<Result<_, _>>()
            .expect("valid");

        assert_eq!(tokens[0].literal, Some(Literal::Str("a\nb".into())));
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens: Vec<Token> = Scanner::new("// one\n/* two\nthree */ print /**/ x")
            .collect::<Result<_, _>>()
            .expect("valid");

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].token_type, TokenType::PRINT);
        assert_eq!(tokens[0].line, 3);
        assert_eq!(tokens[1].token_type, TokenType::IDENTIFIER);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new("print /* never\nclosed").scan_tokens(&mut diagnostics);

        assert_eq!(diagnostics.messages(), vec!["Unterminated comment block."]);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].token_type, TokenType::EOF);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_trailing_dot_is_invalid_number() {
        let results: Vec<_> = Scanner::new("1.;").collect();

        assert_eq!(results.len(), 4);
        assert!(matches!(&results[0], Err(e) if e.message() == "Invalid number."));
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[2], TokenType::SEMICOLON, ";");
    }

    #[test]
    fn test_second_dot_is_invalid_number() {
        let results: Vec<_> = Scanner::new("1.2.3").collect();

        assert!(results[0].is_err());
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[2], TokenType::NUMBER, "3");
        assert_token_matches(&results[3], TokenType::EOF, "");
    }

    #[rstest]
    #[case("and", TokenType::AND)]
    #[case("class", TokenType::CLASS)]
    #[case("else", TokenType::ELSE)]
    #[case("false", TokenType::FALSE)]
    #[case("for", TokenType::FOR)]
    #[case("fun", TokenType::FUN)]
    #[case("if", TokenType::IF)]
    #[case("nil", TokenType::NIL)]
    #[case("or", TokenType::OR)]
    #[case("print", TokenType::PRINT)]
    #[case("return", TokenType::RETURN)]
    #[case("super", TokenType::SUPER)]
    #[case("this", TokenType::THIS)]
    #[case("true", TokenType::TRUE)]
    #[case("var", TokenType::VAR)]
    #[case("while", TokenType::WHILE)]
    #[case("orchid", TokenType::IDENTIFIER)]
    #[case("_var2", TokenType::IDENTIFIER)]
    #[case("While", TokenType::IDENTIFIER)]
    fn test_keyword_lookup(#[case] source: &str, #[case] expected: TokenType) {
        assert_token_sequence(source, &[(expected, source), (TokenType::EOF, "")]);
    }

    #[test]
    fn test_token_display() {
        let tokens: Vec<Token> = Scanner::new("42 3.5 \"hi\" name")
            .collect::<Result<_, _>>()
            .expect("valid");

        let rendered: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "NUMBER 42 42.0",
                "NUMBER 3.5 3.5",
                "STRING \"hi\" hi",
                "IDENTIFIER name null",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_exactly_one_eof() {
        let mut scanner = Scanner::new("");

        assert_token_matches(
            &scanner.next().expect("eof token"),
            TokenType::EOF,
            "",
        );
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
