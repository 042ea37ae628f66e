//! Tree‑walking evaluator.
//!
//! Statements run against a chain of [`Environment`]s.  Variable references
//! the resolver bound to a local scope are read at a fixed distance; all other
//! references go straight to the global scope.  `return` travels back
//! up as [`Flow::Return`] rather than as an error, and only runtime failures
//! use the `Err` channel.

use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::diagnostics::Diagnostics;
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};
use crate::value::{LoxFunction, NativeFn, Value};

/// Nesting limit for calls to user functions.  The walk grows its own stack
/// as needed, so the limit holds on any thread.
pub const MAX_CALL_DEPTH: usize = 200;

/// Outcome of executing a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Fall through to the next statement.
    Normal,

    /// A `return` is unwinding towards the nearest call.
    Return(Value),
}

pub struct Interpreter<W: Write = io::Stdout> {
    globals: EnvRef,
    environment: EnvRef,
    locals: HashMap<ExprId, usize>,
    output: W,
    call_depth: usize,
}

impl Interpreter<io::Stdout> {
    /// An interpreter printing to standard output.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Interpreter<W> {
    /// Creates an interpreter writing `print` output to `output`, with the
    /// native functions (`clock`) already defined.
    pub fn with_output(output: W) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Environment::new().into_ref();

        let mut interpreter = Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
            call_depth: 0,
        };

        interpreter.define_native("clock", 0, clock);

        interpreter
    }

    /// Bind a built‑in function under `name` in the global scope.
    pub fn define_native(&mut self, name: &'static str, arity: usize, func: NativeFn) {
        debug!("Defining native function '{}'", name);

        self.globals
            .borrow_mut()
            .define(name, Value::NativeFunction { name, arity, func });
    }

    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    // ───────────────────────── resolver side channel ─────────────────

    /// Record that the variable node `id` lives `depth` scopes up.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        debug!("Noting {} at depth {}", id, depth);

        self.locals.insert(id, depth);
    }

    pub fn local_depth(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    pub fn locals(&self) -> &HashMap<ExprId, usize> {
        &self.locals
    }

    // ───────────────────────── statements ────────────────────────────

    /// Runs a program.  The first runtime error is reported to
    /// `diagnostics` and stops the remaining statements; output already
    /// written stays written.
    pub fn interpret(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            if let Err(e) = self.execute(stmt) {
                debug!("Runtime error, aborting: {}", e);

                diagnostics.report(e);
                break;
            }
        }

        if let Err(e) = self.output.flush() {
            diagnostics.report(e.into());
        }

        info!("Interpretation finished");
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        ensure_sufficient_stack(|| self.run_stmt(stmt))
    }

    fn run_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)?;
                debug!("Printed value: {}", value);
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let scope: EnvRef =
                    Environment::with_enclosing(Rc::clone(&self.environment)).into_ref();

                return self.execute_block(statements, scope);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                // The closure is the scope active at declaration time.
                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                );

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);

                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    /// Runs `statements` with `environment` as the current scope, restoring
    /// the previous scope on every exit path.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Result<Flow> {
        let previous: EnvRef = mem::replace(&mut self.environment, environment);

        let result = self.execute_all(statements);

        self.environment = previous;

        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    // ───────────────────────── expressions ───────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        ensure_sufficient_stack(|| self.eval_expr(expr))
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right: Value = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(LoxError::runtime(operator, "Operand must be a number.")),
                    },

                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),

                    _ => Err(LoxError::runtime(operator, "Invalid unary operator.")),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;

                binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                let decided: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if decided {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone())?
                    }

                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                debug!("Assigned {} to '{}'", value, name.lexeme);

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                match self.evaluate(callee)? {
                    Value::NativeFunction { name, arity, func } => {
                        let values: Vec<Value> = self.arguments(arity, paren, arguments)?;

                        debug!("Calling native function '{}'", name);

                        func(&values).map_err(|message| LoxError::runtime(paren, message))
                    }

                    Value::Function(function) => {
                        let values: Vec<Value> =
                            self.arguments(function.arity(), paren, arguments)?;

                        self.call_function(&function, paren, values)
                    }

                    _ => Err(LoxError::runtime(paren, "Can only call functions.")),
                }
            }
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    /// Checks the argument count against `arity`, then evaluates the
    /// arguments left to right.
    fn arguments(
        &mut self,
        arity: usize,
        paren: &Token,
        arguments: &[Expr],
    ) -> Result<Vec<Value>> {
        if arguments.len() != arity {
            return Err(LoxError::runtime(
                paren,
                format!(
                    "Expected {} arguments but got {}.",
                    arity,
                    arguments.len()
                ),
            ));
        }

        arguments
            .iter()
            .map(|argument| self.evaluate(argument))
            .collect()
    }

    fn call_function(
        &mut self,
        function: &LoxFunction,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!("Calling user-defined function '{}'", function.name());

        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(LoxError::runtime(paren, "Stack overflow."));
        }

        let mut scope = Environment::with_enclosing(Rc::clone(&function.closure));
        for (param, value) in function.declaration.params.iter().zip(arguments) {
            scope.define(&param.lexeme, value);
        }

        self.call_depth += 1;
        let result = self.execute_block(&function.declaration.body, scope.into_ref());
        self.call_depth -= 1;

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

/// Arithmetic, comparison and equality on already evaluated operands.
fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    match operator.token_type {
        TokenType::PLUS => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            _ => Err(LoxError::runtime(
                operator,
                "Operands must be two numbers or two strings.",
            )),
        },

        TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

        TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

        _ => {
            let (a, b) = number_operands(operator, &left, &right)?;

            match operator.token_type {
                TokenType::MINUS => Ok(Value::Number(a - b)),
                TokenType::STAR => Ok(Value::Number(a * b)),
                TokenType::SLASH => Ok(Value::Number(a / b)),
                TokenType::GREATER => Ok(Value::Bool(a > b)),
                TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
                TokenType::LESS => Ok(Value::Bool(a < b)),
                TokenType::LESS_EQUAL => Ok(Value::Bool(a <= b)),
                _ => Err(LoxError::runtime(operator, "Invalid binary operator.")),
            }
        }
    }
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
    }
}

/// `clock()`: seconds since the Unix epoch.
fn clock(_args: &[Value]) -> std::result::Result<Value, String> {
    let micros: i64 = Utc::now().timestamp_micros();

    Ok(Value::Number(micros as f64 / 1_000_000.0))
}
