//! Session driver: one interpreter fed any number of source units.
//!
//! Each call to [`Lox::run`] scans, parses, resolves and interprets one unit
//! and hands back what went wrong.  Later stages are skipped once a static
//! error has been seen.  Globals, functions and resolved distances persist
//! between units, which is what the REPL relies on.

use std::io::{self, Write};

use log::info;

use crate::diagnostics::Diagnostics;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

pub struct Lox<W: Write = io::Stdout> {
    interpreter: Interpreter<W>,

    /// First expression id for the next unit.
    next_id: usize,
}

impl Lox<io::Stdout> {
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Lox<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Lox<W> {
    pub fn with_output(output: W) -> Self {
        Self {
            interpreter: Interpreter::with_output(output),
            next_id: 0,
        }
    }

    /// Run one unit of source text through the whole pipeline.
    pub fn run(&mut self, source: &str) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);

        let mut parser = Parser::starting_at(&tokens, self.next_id);
        let statements = parser.parse(&mut diagnostics);
        self.next_id = parser.next_id();

        let Some(statements) = statements else {
            info!("Skipping execution: parse failed");
            return diagnostics;
        };

        if diagnostics.had_error() {
            info!("Skipping execution: scan errors");
            return diagnostics;
        }

        Resolver::new(&mut self.interpreter).resolve(&statements, &mut diagnostics);

        if diagnostics.had_error() {
            info!("Skipping execution: resolution errors");
            return diagnostics;
        }

        self.interpreter.interpret(&statements, &mut diagnostics);

        diagnostics
    }

    pub fn interpreter(&self) -> &Interpreter<W> {
        &self.interpreter
    }

    /// Used to register extra native functions before running code.
    pub fn interpreter_mut(&mut self) -> &mut Interpreter<W> {
        &mut self.interpreter
    }

    pub fn output(&self) -> &W {
        self.interpreter.output()
    }
}
