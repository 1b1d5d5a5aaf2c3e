//! BeamScript - a small dynamically-typed scripting language
//!
//! Source text flows through the lexer, the recursive-descent parser and the
//! tree-walking interpreter. Each run gets its own freshly built root scope.

pub mod token;
pub mod lexer;
pub mod parser;
pub mod ast;
pub mod value;
pub mod environment;
pub mod interpreter;
pub mod natives;
pub mod error;
pub mod gc;

use std::rc::Rc;

pub use error::{BeamError, ErrorKind, Result};
pub use interpreter::Interpreter;
pub use lexer::Lexer;
pub use natives::{BufferConsole, Console, StdConsole};
pub use parser::Parser;
pub use value::Value;

/// Run BeamScript code against stdin/stdout
pub fn run(source: &str) -> Result<Value> {
    run_with_console(source, Rc::new(StdConsole))
}

/// Run BeamScript code with console natives bound to `console`
pub fn run_with_console(source: &str, console: Rc<dyn Console>) -> Result<Value> {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize()?;
    let mut parser = Parser::new(tokens);
    let program = parser.parse()?;

    let env = natives::create_global_env(console)?;
    let mut interpreter = Interpreter::new();
    let result = interpreter.evaluate_program(&program, &env);
    interpreter.release_root(env);
    result
}

/// Version of the BeamScript language
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
