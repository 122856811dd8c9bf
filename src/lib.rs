// Declare modules publicly so they are part of the library interface
pub mod ast;
pub mod config;
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod pretty_print;
pub mod primitives;
pub mod program;
pub mod promise;
pub mod source;
pub mod syntax;
pub mod types;
pub mod value;

pub use ast::{Exp, Form, PrimOp, Program};
pub use environment::{Env, EnvError};
pub use evaluator::{Depth, EvalError, EvalResult, Evaluator};
pub use lexer::{LexerError, Token, TokenKind, tokenize};
pub use parser::{ParseError, Parser, parse_expression, parse_program, parse_str};
pub use program::{Session, evaluate_expression, evaluate_program};
pub use source::Span;
pub use types::{Node, Sexpr};
pub use value::Value;
