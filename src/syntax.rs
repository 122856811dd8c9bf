//! Gives meaning to datums: turns what the reader produced into [`Form`]s and
//! [`Exp`]s.

use crate::Span;
use crate::ast::{Binding, Define, Exp, Form, PrimOp, ProcExp};
use crate::parser::{ParseError, ParseResult};
use crate::types::{Node, Sexpr};
use crate::value::Value;
use std::rc::Rc;

/// Words that introduce a special form and cannot name a variable.
pub const KEYWORDS: [&str; 7] = ["define", "if", "lambda", "let", "letrec", "quote", "set!"];

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

fn invalid(msg: impl Into<String>, span: Span) -> ParseError {
    ParseError::InvalidSpecialForm(msg.into(), span)
}

pub fn parse_forms(nodes: &[Node]) -> ParseResult<Vec<Form>> {
    nodes.iter().map(parse_form).collect()
}

/// A top-level form: a `define` or an expression.
pub fn parse_form(node: &Node) -> ParseResult<Form> {
    match &node.kind {
        Sexpr::List(items) if items.first().and_then(Node::as_symbol) == Some("define") => {
            parse_define(&items[1..], node.span).map(Form::Define)
        }
        _ => parse_exp(node).map(Form::Exp),
    }
}

pub fn parse_exp(node: &Node) -> ParseResult<Exp> {
    match &node.kind {
        Sexpr::Number(n) => Ok(Exp::Num(*n)),
        Sexpr::Boolean(b) => Ok(Exp::Bool(*b)),
        Sexpr::String(s) => Ok(Exp::Str(s.clone())),
        Sexpr::Symbol(name) => parse_symbol(name, node.span),
        Sexpr::List(items) => parse_compound(items, node.span),
        Sexpr::DottedList(_, _) => Err(invalid(
            "a dotted list is not an expression",
            node.span,
        )),
        Sexpr::Nil => Err(invalid(
            "() is not an expression, quote it to get the empty list",
            node.span,
        )),
    }
}

fn parse_symbol(name: &str, span: Span) -> ParseResult<Exp> {
    if is_keyword(name) {
        return Err(invalid(format!("'{}' cannot be used as a variable", name), span));
    }
    Ok(match PrimOp::from_name(name) {
        Some(op) => Exp::PrimOp(op),
        None => Exp::var(name),
    })
}

fn parse_compound(items: &[Node], span: Span) -> ParseResult<Exp> {
    let (head, operands) = items
        .split_first()
        .ok_or_else(|| invalid("empty combination", span))?;
    match head.as_symbol() {
        Some("if") => parse_if(operands, span),
        Some("lambda") => parse_lambda(operands, span).map(|proc| Exp::Proc(Rc::new(proc))),
        Some("let") => {
            let (bindings, body) = parse_let_parts("let", operands, span)?;
            Ok(Exp::Let { bindings, body })
        }
        Some("letrec") => {
            let (bindings, body) = parse_let_parts("letrec", operands, span)?;
            Ok(Exp::Letrec { bindings, body })
        }
        Some("set!") => parse_set(operands, span),
        Some("quote") => parse_quote(operands, span),
        Some("define") => Err(invalid("define is only allowed at top level", span)),
        _ => Ok(Exp::App {
            rator: Box::new(parse_exp(head)?),
            rands: operands
                .iter()
                .map(|rand| parse_exp(rand).map(Rc::new))
                .collect::<ParseResult<_>>()?,
        }),
    }
}

fn parse_if(operands: &[Node], span: Span) -> ParseResult<Exp> {
    if let [test, then, alt] = operands {
        Ok(Exp::if_(parse_exp(test)?, parse_exp(then)?, parse_exp(alt)?))
    } else {
        Err(invalid(
            "if expects a test, a consequent and an alternative",
            span,
        ))
    }
}

fn parse_symbol_name(node: &Node) -> ParseResult<String> {
    match node.as_symbol() {
        Some(name) if is_keyword(name) => Err(invalid(
            format!("'{}' cannot be bound as a variable", name),
            node.span,
        )),
        Some(name) => Ok(name.to_string()),
        None => Err(ParseError::NotASymbol(node.kind.clone(), node.span)),
    }
}

fn parse_params(node: &Node) -> ParseResult<Vec<String>> {
    match &node.kind {
        Sexpr::Nil => Ok(Vec::new()),
        Sexpr::List(params) => params.iter().map(parse_symbol_name).collect(),
        _ => Err(invalid("expected a parameter list", node.span)),
    }
}

fn parse_body(body: &[Node], form: &str, span: Span) -> ParseResult<Vec<Exp>> {
    if body.is_empty() {
        return Err(invalid(format!("{} body cannot be empty", form), span));
    }
    body.iter().map(parse_exp).collect()
}

fn parse_lambda(operands: &[Node], span: Span) -> ParseResult<ProcExp> {
    let [params, body @ ..] = operands else {
        return Err(invalid("lambda expects a parameter list and a body", span));
    };
    Ok(ProcExp {
        params: parse_params(params)?,
        body: parse_body(body, "lambda", span)?,
    })
}

fn parse_binding(node: &Node) -> ParseResult<Binding> {
    match &node.kind {
        Sexpr::List(pair) if pair.len() == 2 => Ok(Binding {
            var: parse_symbol_name(&pair[0])?,
            val: Rc::new(parse_exp(&pair[1])?),
        }),
        _ => Err(invalid("a binding must look like (name expression)", node.span)),
    }
}

fn parse_let_parts(form: &str, operands: &[Node], span: Span) -> ParseResult<(Vec<Binding>, Vec<Exp>)> {
    let [bindings, body @ ..] = operands else {
        return Err(invalid(format!("{} expects bindings and a body", form), span));
    };
    let bindings = match &bindings.kind {
        Sexpr::Nil => Vec::new(),
        Sexpr::List(items) => items.iter().map(parse_binding).collect::<ParseResult<_>>()?,
        _ => return Err(invalid(format!("{} bindings must be a list", form), bindings.span)),
    };
    Ok((bindings, parse_body(body, form, span)?))
}

fn parse_set(operands: &[Node], span: Span) -> ParseResult<Exp> {
    if let [var, val] = operands {
        Ok(Exp::Set {
            var: parse_symbol_name(var)?,
            val: Box::new(parse_exp(val)?),
        })
    } else {
        Err(invalid("set! expects a variable and a value", span))
    }
}

fn parse_quote(operands: &[Node], span: Span) -> ParseResult<Exp> {
    if let [datum] = operands {
        Ok(Exp::Lit(datum_to_value(datum)))
    } else {
        Err(invalid("quote expects exactly one argument", span))
    }
}

fn parse_define(operands: &[Node], span: Span) -> ParseResult<Define> {
    match operands {
        // (define (f x ...) body ...)
        [
            Node {
                kind: Sexpr::List(names),
                ..
            },
            body @ ..,
        ] => {
            let (name, params) = names
                .split_first()
                .ok_or_else(|| invalid("define expects a procedure name", span))?;
            let var = parse_symbol_name(name)?;
            let params = params
                .iter()
                .map(parse_symbol_name)
                .collect::<ParseResult<_>>()?;
            let proc = ProcExp {
                params,
                body: parse_body(body, "define", span)?,
            };
            Ok(Define {
                var,
                val: Rc::new(Exp::Proc(Rc::new(proc))),
            })
        }
        [var, val] => Ok(Define::new(parse_symbol_name(var)?, parse_exp(val)?)),
        _ => Err(invalid("define expects a name and a value", span)),
    }
}

/// Converts quoted data into the value it denotes.
pub fn datum_to_value(node: &Node) -> Value {
    match &node.kind {
        Sexpr::Symbol(name) => Value::symbol(name.as_str()),
        Sexpr::Number(n) => Value::Number(*n),
        Sexpr::Boolean(b) => Value::Boolean(*b),
        Sexpr::String(s) => Value::String(s.clone()),
        Sexpr::Nil => Value::Empty,
        Sexpr::List(items) => Value::list(items.iter().map(datum_to_value).collect::<Vec<_>>()),
        Sexpr::DottedList(items, tail) => items
            .iter()
            .rev()
            .fold(datum_to_value(tail), |rest, item| {
                Value::cons(datum_to_value(item), rest)
            }),
    }
}
