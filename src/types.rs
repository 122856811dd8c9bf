use crate::source::Span;
use std::fmt;

/// A datum read from source text, with the span it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: Sexpr,
    pub span: Span,
}

impl Node {
    pub fn new(kind: Sexpr, span: Span) -> Self {
        Node { kind, span }
    }

    pub fn new_symbol(name: impl Into<String>, span: Span) -> Self {
        Node::new(Sexpr::Symbol(name.into()), span)
    }

    pub fn new_number(n: f64, span: Span) -> Self {
        Node::new(Sexpr::Number(n), span)
    }

    pub fn new_bool(b: bool, span: Span) -> Self {
        Node::new(Sexpr::Boolean(b), span)
    }

    pub fn new_string(s: impl Into<String>, span: Span) -> Self {
        Node::new(Sexpr::String(s.into()), span)
    }

    pub fn new_nil(span: Span) -> Self {
        Node::new(Sexpr::Nil, span)
    }

    /// Builds `(quote <quoted>)`; `quote_span` is the span of the `'` token.
    pub fn new_quote(quoted: Node, quote_span: Span) -> Self {
        let span = quote_span.merge(quoted.span);
        Node::new(
            Sexpr::List(vec![Node::new_symbol("quote", quote_span), quoted]),
            span,
        )
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            Sexpr::Symbol(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// Represents a Scheme S-expression (Symbolic Expression) as read, before it
/// is given meaning as code or as quoted data.
#[derive(Debug, Clone, PartialEq)]
pub enum Sexpr {
    Symbol(String),
    Number(f64),
    Boolean(bool),
    String(String),
    List(Vec<Node>),                  // (a b c), never empty
    DottedList(Vec<Node>, Box<Node>), // (a b . c)
    Nil,                              // ()
}

impl Sexpr {
    pub fn type_name(&self) -> &'static str {
        match self {
            Sexpr::Number(_) => "number",
            Sexpr::Symbol(_) => "symbol",
            Sexpr::Boolean(_) => "boolean",
            Sexpr::String(_) => "string",
            Sexpr::List(_) => "list",
            Sexpr::DottedList(_, _) => "dotted list",
            Sexpr::Nil => "nil",
        }
    }
}

pub(crate) fn write_escaped(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(
        f,
        "\"{}\"",
        s.chars().fold(String::new(), |mut acc, char| {
            match char {
                '"' => acc.push_str("\\\""),
                '\\' => acc.push_str("\\\\"),
                '\n' => acc.push_str("\\n"),
                '\r' => acc.push_str("\\r"),
                '\t' => acc.push_str("\\t"),
                c => acc.push(c),
            }
            acc
        })
    )
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Node]) -> fmt::Result {
    let mut first = true;
    for item in items {
        if !first {
            write!(f, " ")?;
        }
        write!(f, "{}", item)?;
        first = false;
    }
    Ok(())
}

impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexpr::Symbol(s) => write!(f, "{}", s),
            Sexpr::Number(n) => write!(f, "{}", n),
            Sexpr::Boolean(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Sexpr::String(s) => write_escaped(f, s),
            Sexpr::List(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                write!(f, ")")
            }
            Sexpr::DottedList(items, tail) => {
                write!(f, "(")?;
                write_items(f, items)?;
                write!(f, " . {})", tail)
            }
            Sexpr::Nil => write!(f, "()"),
        }
    }
}
