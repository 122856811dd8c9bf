use crate::Span;
use crate::ast::{Form, Program};
use crate::lexer::{LexerError, Token, TokenKind};
use crate::syntax;
use crate::types::{Node, Sexpr};
use std::iter::Peekable;
use std::vec::IntoIter;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(
        "Parse Error [at {}]: Unexpected token '{}', expected {expected}",
        .found.span,
        .found.kind
    )]
    UnexpectedToken { found: Token, expected: String },
    #[error("Parse Error: Unexpected end of input during parsing. Expected {0}")]
    UnexpectedEof(String),
    #[error("Lexer Error during parse: {0}")]
    LexerError(#[from] LexerError),
    #[error("Parse Error: Invalid syntax for dotted pair at [{0}]")]
    InvalidDotSyntax(Span),
    #[error("Syntax Error: Invalid special form - {0}")]
    InvalidSpecialForm(String, Span),
    #[error("Syntax Error: Expected a symbol, but got: {0}")]
    NotASymbol(Sexpr, Span),
}

impl ParseError {
    /// Source location of the error, when one is known.
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::UnexpectedToken { found, .. } => Some(found.span),
            ParseError::UnexpectedEof(_) => None,
            ParseError::LexerError(lex_err) => Some(lex_err.span),
            ParseError::InvalidDotSyntax(span)
            | ParseError::InvalidSpecialForm(_, span)
            | ParseError::NotASymbol(_, span) => Some(*span),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Reads datums from a token stream.
pub struct Parser {
    tokens: Peekable<IntoIter<Token>>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens: tokens.into_iter().peekable(),
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        self.tokens.next()
    }

    fn parse_expr_with_token(&mut self, token: Option<Token>) -> ParseResult<Node> {
        match token {
            Some(Token {
                kind: TokenKind::LParen,
                span,
            }) => self.parse_list(span),
            Some(Token {
                kind: TokenKind::Quote,
                span,
            }) => self.parse_quoted_expr(span),
            Some(atom) => self.parse_atom(atom),
            None => Err(ParseError::UnexpectedEof("an expression".to_string())),
        }
    }

    /// Parses a single datum from the token stream.
    pub fn parse_expr(&mut self) -> ParseResult<Node> {
        let token = self.next_token();
        self.parse_expr_with_token(token)
    }

    fn parse_atom(&mut self, token: Token) -> ParseResult<Node> {
        let kind = match token.kind {
            TokenKind::Symbol(s) => Sexpr::Symbol(s),
            TokenKind::Number(n) => Sexpr::Number(n),
            TokenKind::Boolean(b) => Sexpr::Boolean(b),
            TokenKind::String(s) => Sexpr::String(s),
            TokenKind::Dot => return Err(ParseError::InvalidDotSyntax(token.span)),
            other_token => {
                return Err(ParseError::UnexpectedToken {
                    found: Token {
                        kind: other_token,
                        span: token.span,
                    },
                    expected: "an atom or '(' or '''".to_string(),
                });
            }
        };
        Ok(Node::new(kind, token.span))
    }

    /// Parses the rest of a list whose '(' has already been consumed.
    fn parse_list(&mut self, open: Span) -> ParseResult<Node> {
        let mut items = Vec::new();
        loop {
            match self.next_token() {
                Some(Token {
                    kind: TokenKind::RParen,
                    span,
                }) => {
                    let span = open.merge(span);
                    return Ok(if items.is_empty() {
                        Node::new_nil(span)
                    } else {
                        Node::new(Sexpr::List(items), span)
                    });
                }
                Some(Token {
                    kind: TokenKind::Dot,
                    span: dot_span,
                }) => {
                    if items.is_empty() {
                        return Err(ParseError::InvalidDotSyntax(dot_span));
                    }
                    let tail = self.parse_expr()?;
                    return match self.next_token() {
                        Some(Token {
                            kind: TokenKind::RParen,
                            span,
                        }) => Ok(Node::new(
                            Sexpr::DottedList(items, Box::new(tail)),
                            open.merge(span),
                        )),
                        Some(found) => Err(ParseError::UnexpectedToken {
                            found,
                            expected: "')' after dotted pair".to_string(),
                        }),
                        None => Err(ParseError::UnexpectedEof(
                            "')' after dotted pair".to_string(),
                        )),
                    };
                }
                Some(token) => items.push(self.parse_expr_with_token(Some(token))?),
                None => return Err(ParseError::UnexpectedEof("')'".to_string())),
            }
        }
    }

    fn parse_quoted_expr(&mut self, quote_span: Span) -> ParseResult<Node> {
        let quoted = self.parse_expr()?;
        Ok(Node::new_quote(quoted, quote_span))
    }

    /// Parses exactly one datum; trailing tokens are an error.
    pub fn parse(mut self) -> ParseResult<Node> {
        let expr = self.parse_expr()?;
        if let Some(found) = self.next_token() {
            Err(ParseError::UnexpectedToken {
                found,
                expected: "end of input".to_string(),
            })
        } else {
            Ok(expr)
        }
    }

    /// Parses every datum up to the end of input.
    pub fn parse_all(mut self) -> ParseResult<Vec<Node>> {
        let mut nodes = Vec::new();
        while self.tokens.peek().is_some() {
            nodes.push(self.parse_expr()?);
        }
        Ok(nodes)
    }
}

/// Lexes and reads a single datum.
pub fn parse_str(input: &str) -> ParseResult<Node> {
    let tokens = crate::lexer::tokenize(input)?;
    Parser::new(tokens).parse()
}

/// Reads a whole program: every top-level form in `input`, in order.
pub fn parse_program(input: &str) -> ParseResult<Program> {
    let tokens = crate::lexer::tokenize(input)?;
    let nodes = Parser::new(tokens).parse_all()?;
    Ok(Program {
        forms: syntax::parse_forms(&nodes)?,
    })
}

/// Reads exactly one top-level form.
pub fn parse_expression(input: &str) -> ParseResult<Form> {
    syntax::parse_form(&parse_str(input)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::LexerErrorKind;

    fn assert_parse(input: &str, expected: Node) {
        match parse_str(input) {
            Ok(result) => assert_eq!(result, expected, "Input: '{}'", input),
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        }
    }

    fn assert_parse_error(input: &str, expected_error_variant: ParseError) {
        match parse_str(input) {
            Ok(result) => panic!(
                "Expected parsing to fail for input '{}', but got: {:?}",
                input, result
            ),
            Err(e) => {
                assert_eq!(
                    std::mem::discriminant(&e),
                    std::mem::discriminant(&expected_error_variant),
                    "Input: '{}', Expected error variant like {:?}, got: {:?}",
                    input,
                    expected_error_variant,
                    e
                );
            }
        }
    }

    fn assert_parsed_string(input: &str, expected_output: &str) {
        let node = match parse_str(input) {
            Ok(result) => result,
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        };
        assert_eq!(node.to_string(), expected_output, "Input: '{}'", input);
    }

    fn node_number(n: f64, start: usize, end: usize) -> Node {
        Node::new_number(n, Span::new(start, end))
    }

    fn node_symbol(s: &str, start: usize, end: usize) -> Node {
        Node::new_symbol(s, Span::new(start, end))
    }

    fn unexpected_eof() -> ParseError {
        ParseError::UnexpectedEof(String::new())
    }

    #[test]
    fn test_parse_atoms() {
        assert_parse("123", node_number(123.0, 0, 3));
        assert_parse("symbol", node_symbol("symbol", 0, 6));
        assert_parse("#f", Node::new_bool(false, Span::new(0, 2)));
        assert_parse(
            r#""with \"quotes\"""#,
            Node::new_string("with \"quotes\"", Span::new(0, 17)),
        );
    }

    #[test]
    fn test_parse_empty_list() {
        assert_parse("()", Node::new_nil(Span::new(0, 2)));
        assert_parse("( )", Node::new_nil(Span::new(0, 3)));
    }

    #[test]
    fn test_parse_simple_list() {
        assert_parse(
            "(+ 10 20)",
            Node::new(
                Sexpr::List(vec![
                    node_symbol("+", 1, 2),
                    node_number(10.0, 3, 5),
                    node_number(20.0, 6, 8),
                ]),
                Span::new(0, 9),
            ),
        );
    }

    #[test]
    fn test_parse_dotted_list() {
        assert_parse(
            "(1 . 2)",
            Node::new(
                Sexpr::DottedList(
                    vec![node_number(1.0, 1, 2)],
                    Box::new(node_number(2.0, 5, 6)),
                ),
                Span::new(0, 7),
            ),
        );
        assert_parsed_string("(1 2 . 3)", "(1 2 . 3)");
    }

    #[test]
    fn test_parse_nested_and_quoted() {
        assert_parsed_string("(a (b c) d)", "(a (b c) d)");
        assert_parsed_string("'a", "(quote a)");
        assert_parsed_string("'(1 '())", "(quote (1 (quote ())))");
        assert_parse(
            "'a",
            Node::new_quote(node_symbol("a", 1, 2), Span::new(0, 1)),
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_parse_error("(1 2", unexpected_eof());
        assert_parse_error("", unexpected_eof());
        assert_parse_error("'", unexpected_eof());
        assert_parse_error(
            ")",
            ParseError::UnexpectedToken {
                found: Token {
                    kind: TokenKind::RParen,
                    span: Span::new(0, 1),
                },
                expected: String::new(),
            },
        );
        assert_parse_error("(. 1)", ParseError::InvalidDotSyntax(Span::default()));
        assert_parse_error(
            "(1 . 2 3)",
            ParseError::UnexpectedToken {
                found: Token {
                    kind: TokenKind::Number(3.0),
                    span: Span::new(7, 8),
                },
                expected: String::new(),
            },
        );
    }

    #[test]
    fn test_parse_trailing_tokens() {
        match parse_str("(1))") {
            Err(ParseError::UnexpectedToken { found, .. }) => {
                assert_eq!(found.kind, TokenKind::RParen);
                assert_eq!(found.span, Span::new(3, 4));
            }
            other => panic!("Expected trailing ')' error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_lexer_error_propagation() {
        assert_parse_error(
            "(1 \"abc",
            ParseError::LexerError(LexerError {
                error: LexerErrorKind::UnterminatedString,
                span: Span::new(3, 7),
            }),
        );
    }

    #[test]
    fn test_parse_program_reads_every_form() {
        let program = parse_program("(define x 1) ; one\n(+ x 1)").expect("program should parse");
        assert_eq!(program.forms.len(), 2);
        assert!(matches!(program.forms[0], Form::Define(_)));

        let empty = parse_program("  ; nothing here").expect("empty program should parse");
        assert!(empty.forms.is_empty());
    }
}
