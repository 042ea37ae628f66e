pub mod ast;
pub mod ast_printer;
pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod lox;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stack;
pub mod token;
pub mod value;

pub use diagnostics::Diagnostics;
pub use error::{LoxError, Result};
pub use lox::Lox;
