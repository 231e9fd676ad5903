pub mod ast;
pub mod ast_printer;
pub mod console;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod plugin;
pub mod plugins;
pub mod registry;
pub mod token;
pub mod value;

use ast::Program;
use error::SharpError;

/// Lex and parse `source`, returning the program and its parse diagnostics.
pub fn parse_source(source: &str) -> (Program, Vec<SharpError>) {
    let tokens = lexer::Lexer::new(source).tokenize();
    let mut parser = parser::Parser::new(&tokens);
    let program: Program = parser.parse();

    (program, parser.take_errors())
}
