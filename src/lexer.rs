use logos::Logos;
use std::fmt;
use thiserror::Error;

use crate::Span;
use crate::types::write_escaped;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")] // Skip whitespace
#[logos(skip r";[^\n\r]*")] // Skip comments
#[logos(error = LexerErrorKind)]
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(".", priority = 3)]
    Dot,
    #[token("'")]
    Quote,
    #[regex(r"[.a-zA-Z0-9!#$%&*/:<=>?~_^+-]+", |lex| lex.slice().to_string())]
    Symbol(String),
    // Outranks Symbol when both match the same text; longer symbols such as
    // `1-2` or `1e` still win on length.
    #[regex(r"[-+]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][-+]?[0-9]+)?", |lex| {
        let slice = lex.slice();
        slice
            .parse::<f64>()
            .map_err(|_| LexerErrorKind::InvalidNumberFormat(slice.to_string()))
    }, priority = 3)]
    Number(f64),
    #[token("#t", |_| true)]
    #[token("#f", |_| false)]
    Boolean(bool),
    #[regex(r#""([^"\\]|\\.)*.?"#, |lex| {
        let slice = lex.slice();
        let len = slice.len();
        // make sure string was terminated
        if len == 1 || &slice[len-1..] != "\"" {
            return Err(LexerErrorKind::UnterminatedString);
        }
        unescape(&slice[1..len - 1])
    })]
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Resolves the escapes in the body of a string literal.
fn unescape(body: &str) -> LexerResult<String> {
    let mut result = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        let unescaped = match c {
            '\\' => match chars.next().ok_or(LexerErrorKind::UnterminatedString)? {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                c @ ('\\' | '"') => c,
                other => return Err(LexerErrorKind::UnknownEscapeSequence(other)),
            },
            c => c,
        };
        result.push(unescaped);
    }
    Ok(result)
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Quote => write!(f, "'"),
            TokenKind::Symbol(s) => write!(f, "{}", s),
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::Boolean(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            TokenKind::String(s) => write_escaped(f, s),
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Error)]
pub enum LexerErrorKind {
    #[error("Unterminated string literal")]
    UnterminatedString,
    #[error("Invalid number format: '{0}'")]
    InvalidNumberFormat(String),
    #[error("Unknown escape sequence: '\\{0}'")]
    UnknownEscapeSequence(char),
    #[default]
    #[error("Invalid token")]
    InvalidToken,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct LexerError {
    pub error: LexerErrorKind,
    pub span: Span,
}

type LexerResult<T> = Result<T, LexerErrorKind>;

type LexerRangedResult<T> = Result<T, LexerError>;

/// Splits `input` into tokens, stopping at the first lexical error.
pub fn tokenize(input: &str) -> LexerRangedResult<Vec<Token>> {
    TokenKind::lexer(input)
        .spanned()
        .map(|(result, range)| {
            let span = Span::new(range.start, range.end);
            match result {
                Ok(kind) => Ok(Token { kind, span }),
                Err(error) => Err(LexerError { error, span }),
            }
        })
        .collect()
}
