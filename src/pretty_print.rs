use crate::environment::EnvError;
use crate::evaluator::EvalError;
use crate::parser::ParseError;
use ariadne::{Label, Report, ReportKind, Source};
use std::io;
use std::ops::Range;

type ReportSpan<'a> = (&'a str, Range<usize>);

impl EvalError {
    /// Renders the error against `input` on stderr. `name` labels the source,
    /// e.g. a file path or "REPL".
    pub fn pretty_print(&self, name: &str, input: &str) -> io::Result<()> {
        let report = match self {
            EvalError::Parse(parse_error) => return parse_error.pretty_print(name, input),
            // Evaluation errors carry no location, so point at the whole input
            error => eval_report(error, (name, 0..input.len())),
        };
        report.eprint((name, Source::from(input)))
    }
}

fn eval_report<'a>(error: &EvalError, span: ReportSpan<'a>) -> Report<'a, ReportSpan<'a>> {
    let (message, note) = match error {
        EvalError::EnvError(EnvError::UnboundVariable(name)) => (
            format!("Unbound variable `{}`", name),
            "This variable is not defined in the current scope".to_string(),
        ),
        EvalError::EnvError(EnvError::NotRecursive(name)) => (
            format!("Cannot resolve `{}` recursively", name),
            error.to_string(),
        ),
        EvalError::UnsupportedForm(form) => (
            format!("Unsupported form: {}", form),
            "Mutation and letrec are not available under normal-order evaluation".to_string(),
        ),
        EvalError::BadOperator(value) => (
            format!("Not a procedure: {}", value),
            format!("A {} cannot be called as a procedure", value.type_name()),
        ),
        EvalError::EmptySequence(what) => (
            format!("Empty {}", what),
            "Nothing here produces a value".to_string(),
        ),
        EvalError::Arity { expected, found } => (
            "Wrong number of arguments".to_string(),
            format!("Expected {} arguments, got {}", expected, found),
        ),
        EvalError::InvalidArguments(message) => ("Invalid arguments:".to_string(), message.clone()),
        EvalError::Output(message) => ("Output error".to_string(), message.clone()),
        EvalError::Parse(parse_error) => ("Parse error".to_string(), parse_error.to_string()),
    };
    Report::build(ReportKind::Error, span.clone())
        .with_message(message)
        .with_label(Label::new(span).with_message(note))
        .finish()
}

impl ParseError {
    /// Renders the error against `input` on stderr.
    pub fn pretty_print(&self, name: &str, input: &str) -> io::Result<()> {
        let report = match self {
            ParseError::UnexpectedToken { found, expected } => {
                Report::build(ReportKind::Error, (name, found.span.to_range()))
                    .with_message(format!("Unexpected token: {}", found.kind))
                    .with_label(
                        Label::new((name, found.span.to_range()))
                            .with_message(format!("Expected {expected}")),
                    )
            }
            ParseError::UnexpectedEof(expected) => {
                let idx = input.len();
                Report::build(ReportKind::Error, (name, idx..idx))
                    .with_message("Unexpected EOF")
                    .with_label(Label::new((name, idx..idx)).with_message(expected))
            }
            ParseError::LexerError(lex_err) => {
                Report::build(ReportKind::Error, (name, lex_err.span.to_range()))
                    .with_message("Lexer Error")
                    .with_label(
                        Label::new((name, lex_err.span.to_range()))
                            .with_message(lex_err.error.to_string()),
                    )
            }
            ParseError::InvalidDotSyntax(span) => {
                Report::build(ReportKind::Error, (name, span.to_range()))
                    .with_message("Invalid Dot Syntax")
                    .with_label(Label::new((name, span.to_range())).with_message("Unexpected dot"))
            }
            ParseError::InvalidSpecialForm(message, span) => {
                Report::build(ReportKind::Error, (name, span.to_range()))
                    .with_message(format!("Invalid special form: {}", message))
                    .with_label(
                        Label::new((name, span.to_range()))
                            .with_message("This special form is malformed or incomplete"),
                    )
            }
            ParseError::NotASymbol(sexpr, span) => {
                Report::build(ReportKind::Error, (name, span.to_range()))
                    .with_message(format!("Not a symbol: {}", sexpr))
                    .with_label(Label::new((name, span.to_range())).with_message(format!(
                        "Expected a symbol but found a {}",
                        sexpr.type_name()
                    )))
            }
        };
        report.finish().eprint((name, Source::from(input)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_eval_report_covers_every_variant() {
        let input = "(f 1)";
        let errors = [
            EvalError::EnvError(EnvError::UnboundVariable("f".into())),
            EvalError::EnvError(EnvError::NotRecursive("f".into())),
            EvalError::UnsupportedForm("set!"),
            EvalError::BadOperator(Value::Number(1.0)),
            EvalError::EmptySequence("program"),
            EvalError::Arity {
                expected: 2,
                found: 1,
            },
            EvalError::InvalidArguments("bad".into()),
            EvalError::Output("closed".into()),
        ];
        for error in errors {
            let mut rendered = Vec::new();
            eval_report(&error, ("test", 0..input.len()))
                .write(("test", Source::from(input)), &mut rendered)
                .expect("report renders");
            assert!(!rendered.is_empty(), "No report for {:?}", error);
        }
    }

    #[test]
    fn test_parse_error_pretty_print_succeeds() {
        for input in ["(1 2", ")", "(if 1 2)", "(lambda (1) 1)", "\"abc"] {
            let error = crate::parser::parse_expression(input).expect_err("input is malformed");
            assert!(error.pretty_print("test", input).is_ok(), "Input: '{}'", input);
        }
    }
}
