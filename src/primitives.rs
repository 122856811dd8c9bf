use std::io::Write;

use crate::ast::PrimOp;
use crate::evaluator::{EvalError, EvalResult};
use crate::value::Value;

// Checks the number of arguments
macro_rules! check_arity {
    ($args:expr, $expected:expr, $name:expr) => {
        if $args.len() != $expected {
            return Err(EvalError::InvalidArguments(format!(
                "Primitive '{}' expects exactly {} arguments, got {}",
                $name,
                $expected,
                $args.len()
            )));
        }
    };
    // Variant for minimum number of args
    ($args:expr, min $expected:expr, $name:expr) => {
        if $args.len() < $expected {
            return Err(EvalError::InvalidArguments(format!(
                "Primitive '{}' expects at least {} arguments, got {}",
                $name,
                $expected,
                $args.len()
            )));
        }
    };
}

// Extracts a number from a Value or returns an InvalidArguments error
macro_rules! expect_number {
    ($value:expr, $name:expr, $arg_pos:expr) => {
        match $value {
            Value::Number(n) => *n,
            other => {
                return Err(EvalError::InvalidArguments(format!(
                    "Primitive '{}' expects a number for argument {}, got {}",
                    $name,
                    $arg_pos,
                    other.type_name()
                )));
            }
        }
    };
}

macro_rules! expect_boolean {
    ($value:expr, $name:expr, $arg_pos:expr) => {
        match $value {
            Value::Boolean(b) => *b,
            other => {
                return Err(EvalError::InvalidArguments(format!(
                    "Primitive '{}' expects a boolean for argument {}, got {}",
                    $name,
                    $arg_pos,
                    other.type_name()
                )));
            }
        }
    };
}

/// Applies `op` to operands that have already been fully evaluated.
/// `display` and `newline` write to `out`.
pub fn apply_primitive(op: PrimOp, args: Vec<Value>, out: &mut dyn Write) -> EvalResult {
    let name = op.name();
    match op {
        PrimOp::Add => prim_fold_numbers(&args, 0.0, |acc, val| acc + val, name),
        PrimOp::Mul => prim_fold_numbers(&args, 1.0, |acc, val| acc * val, name),
        PrimOp::Sub => prim_sub(&args),
        PrimOp::Div => prim_div(&args),
        PrimOp::NumEq => prim_all_numbers(&args, |left, right| left == right, name),
        PrimOp::Lt => prim_all_numbers(&args, |left, right| left < right, name),
        PrimOp::Gt => prim_all_numbers(&args, |left, right| left > right, name),
        PrimOp::Not => {
            check_arity!(args, 1, name);
            Ok(Value::Boolean(!args[0].is_true()))
        }
        PrimOp::And => prim_fold_booleans(&args, true, |acc, val| acc && val, name),
        PrimOp::Or => prim_fold_booleans(&args, false, |acc, val| acc || val, name),
        PrimOp::IsEq => {
            check_arity!(args, 2, name);
            Ok(Value::Boolean(is_eq(&args[0], &args[1])))
        }
        PrimOp::StringEq => {
            check_arity!(args, 2, name);
            match (&args[0], &args[1]) {
                (Value::String(a), Value::String(b)) => Ok(Value::Boolean(a == b)),
                (a, b) => Err(EvalError::InvalidArguments(format!(
                    "Primitive 'string=?' expects two strings, got {} and {}",
                    a.type_name(),
                    b.type_name()
                ))),
            }
        }
        PrimOp::Cons => match <[Value; 2]>::try_from(args) {
            Ok([car, cdr]) => Ok(Value::cons(car, cdr)),
            Err(args) => Err(EvalError::InvalidArguments(format!(
                "Primitive 'cons' expects exactly 2 arguments, got {}",
                args.len()
            ))),
        },
        PrimOp::Car => prim_pair_part(&args, name, |car, _| car),
        PrimOp::Cdr => prim_pair_part(&args, name, |_, cdr| cdr),
        PrimOp::List => Ok(Value::list(args)),
        PrimOp::IsPair => is_type(&args, name, |v| matches!(v, Value::Pair(_, _))),
        PrimOp::IsNumber => is_type(&args, name, |v| matches!(v, Value::Number(_))),
        PrimOp::IsBoolean => is_type(&args, name, |v| matches!(v, Value::Boolean(_))),
        PrimOp::IsSymbol => is_type(&args, name, |v| matches!(v, Value::Symbol(_))),
        PrimOp::IsString => is_type(&args, name, |v| matches!(v, Value::String(_))),
        PrimOp::Display => {
            check_arity!(args, 1, name);
            let written = match &args[0] {
                // display shows string contents, not the literal
                Value::String(s) => write!(out, "{}", s),
                other => write!(out, "{}", other),
            };
            written.map_err(|err| EvalError::Output(err.to_string()))?;
            Ok(Value::Empty)
        }
        PrimOp::Newline => {
            check_arity!(args, 0, name);
            writeln!(out).map_err(|err| EvalError::Output(err.to_string()))?;
            Ok(Value::Empty)
        }
    }
}

fn prim_fold_numbers<F: Fn(f64, f64) -> f64>(
    args: &[Value],
    start: f64,
    func: F,
    operator: &str,
) -> EvalResult {
    let mut acc = start;
    for (i, value) in args.iter().enumerate() {
        let num = expect_number!(value, operator, i + 1);
        acc = func(acc, num);
    }
    Ok(Value::Number(acc))
}

fn prim_sub(args: &[Value]) -> EvalResult {
    // (- x) -> -x
    // (- x y z) -> x - y - z
    check_arity!(args, min 1, "-");
    let first_num = expect_number!(&args[0], "-", 1);
    if args.len() == 1 {
        return Ok(Value::Number(-first_num));
    }
    let mut result = first_num;
    for (i, value) in args.iter().enumerate().skip(1) {
        result -= expect_number!(value, "-", i + 1);
    }
    Ok(Value::Number(result))
}

fn prim_div(args: &[Value]) -> EvalResult {
    // (/ x) -> 1/x
    // (/ x y z) -> x / y / z
    check_arity!(args, min 1, "/");
    let first_num = expect_number!(&args[0], "/", 1);
    if args.len() == 1 {
        if first_num == 0.0 {
            return Err(EvalError::InvalidArguments(
                "Division by zero: (/ 0)".to_string(),
            ));
        }
        return Ok(Value::Number(1.0 / first_num));
    }
    let mut result = first_num;
    for (i, value) in args.iter().enumerate().skip(1) {
        let num = expect_number!(value, "/", i + 1);
        if num == 0.0 {
            return Err(EvalError::InvalidArguments("Division by zero".to_string()));
        }
        result /= num;
    }
    Ok(Value::Number(result))
}

fn prim_all_numbers<F: Fn(f64, f64) -> bool>(
    args: &[Value],
    compare: F,
    operator: &str,
) -> EvalResult {
    // (= n1 n2 ...) -> boolean, every operand type-checked even after a #f
    check_arity!(args, min 2, operator);
    let mut last_val = expect_number!(&args[0], operator, 1);
    let mut result = true;
    for (index, arg) in args.iter().enumerate().skip(1) {
        let val = expect_number!(arg, operator, index + 1);
        result = result && compare(last_val, val);
        last_val = val;
    }
    Ok(Value::Boolean(result))
}

fn prim_fold_booleans<F: Fn(bool, bool) -> bool>(
    args: &[Value],
    start: bool,
    func: F,
    operator: &str,
) -> EvalResult {
    let mut acc = start;
    for (i, value) in args.iter().enumerate() {
        acc = func(acc, expect_boolean!(value, operator, i + 1));
    }
    Ok(Value::Boolean(acc))
}

fn prim_pair_part(
    args: &[Value],
    operator: &str,
    part: for<'a> fn(&'a Value, &'a Value) -> &'a Value,
) -> EvalResult {
    check_arity!(args, 1, operator);
    match &args[0] {
        Value::Pair(car, cdr) => Ok(part(car.as_ref(), cdr.as_ref()).clone()),
        other => Err(EvalError::InvalidArguments(format!(
            "{}: Expected a pair, got {}",
            operator,
            other.type_name()
        ))),
    }
}

fn is_type(args: &[Value], operator: &str, predicate: fn(&Value) -> bool) -> EvalResult {
    check_arity!(args, 1, operator);
    Ok(Value::Boolean(predicate(&args[0])))
}

/// `eq?` compares atoms by value; pairs and procedures are never `eq?`
/// because the evaluator keeps no object identity for them.
fn is_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::PrimOp(x), Value::PrimOp(y)) => x == y,
        (Value::Empty, Value::Empty) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(op: PrimOp, args: Vec<Value>) -> EvalResult {
        apply_primitive(op, args, &mut Vec::new())
    }

    fn assert_prim(op: PrimOp, args: Vec<Value>, expected: Value) {
        match apply(op, args.clone()) {
            Ok(result) => assert_eq!(result, expected, "{} applied to {:?}", op, args),
            Err(e) => panic!("{} applied to {:?} failed: {}", op, args, e),
        }
    }

    fn assert_invalid(op: PrimOp, args: Vec<Value>) {
        match apply(op, args.clone()) {
            Err(EvalError::InvalidArguments(_)) => {}
            other => panic!("Expected {} on {:?} to fail, got {:?}", op, args, other),
        }
    }

    fn n(x: f64) -> Value {
        Value::Number(x)
    }

    #[test]
    fn test_arithmetic() {
        assert_prim(PrimOp::Add, vec![n(1.0), n(2.0), n(3.0)], n(6.0));
        assert_prim(PrimOp::Add, vec![], n(0.0));
        assert_prim(PrimOp::Mul, vec![], n(1.0));
        assert_prim(PrimOp::Sub, vec![n(10.0), n(3.0), n(2.0)], n(5.0));
        assert_prim(PrimOp::Sub, vec![n(5.0)], n(-5.0));
        assert_prim(PrimOp::Div, vec![n(10.0), n(4.0)], n(2.5));
        assert_prim(PrimOp::Div, vec![n(5.0)], n(0.2));
    }

    #[test]
    fn test_arithmetic_errors() {
        assert_invalid(PrimOp::Sub, vec![]);
        assert_invalid(PrimOp::Div, vec![]);
        assert_invalid(PrimOp::Div, vec![n(1.0), n(0.0)]);
        assert_invalid(PrimOp::Div, vec![n(0.0)]);
        assert_invalid(PrimOp::Add, vec![n(1.0), Value::Boolean(true)]);
    }

    #[test]
    fn test_comparison() {
        assert_prim(PrimOp::NumEq, vec![n(5.0), n(5.0), n(5.0)], Value::Boolean(true));
        assert_prim(PrimOp::Lt, vec![n(1.0), n(2.0), n(3.0)], Value::Boolean(true));
        assert_prim(PrimOp::Gt, vec![n(1.0), n(2.0)], Value::Boolean(false));
        assert_invalid(PrimOp::NumEq, vec![n(1.0)]);
        assert_invalid(PrimOp::Lt, vec![n(1.0), Value::symbol("x")]);
    }

    #[test]
    fn test_boolean_ops() {
        assert_prim(PrimOp::Not, vec![Value::Boolean(false)], Value::Boolean(true));
        assert_prim(PrimOp::Not, vec![n(0.0)], Value::Boolean(false));
        assert_prim(
            PrimOp::And,
            vec![Value::Boolean(true), Value::Boolean(false)],
            Value::Boolean(false),
        );
        assert_prim(
            PrimOp::Or,
            vec![Value::Boolean(false), Value::Boolean(true)],
            Value::Boolean(true),
        );
        assert_invalid(PrimOp::And, vec![n(1.0)]);
    }

    #[test]
    fn test_equality() {
        assert_prim(
            PrimOp::IsEq,
            vec![Value::symbol("x"), Value::symbol("x")],
            Value::Boolean(true),
        );
        assert_prim(PrimOp::IsEq, vec![Value::Empty, Value::Empty], Value::Boolean(true));
        let pair = Value::list([n(1.0)]);
        assert_prim(PrimOp::IsEq, vec![pair.clone(), pair], Value::Boolean(false));
        assert_prim(
            PrimOp::StringEq,
            vec![Value::String("a".into()), Value::String("a".into())],
            Value::Boolean(true),
        );
        assert_invalid(PrimOp::StringEq, vec![Value::String("a".into()), n(1.0)]);
    }

    #[test]
    fn test_pairs() {
        assert_prim(
            PrimOp::Cons,
            vec![n(1.0), Value::Empty],
            Value::list([n(1.0)]),
        );
        let list = Value::list([n(1.0), n(2.0)]);
        assert_prim(PrimOp::Car, vec![list.clone()], n(1.0));
        assert_prim(PrimOp::Cdr, vec![list], Value::list([n(2.0)]));
        assert_prim(PrimOp::List, vec![], Value::Empty);
        assert_invalid(PrimOp::Car, vec![Value::Empty]);
        assert_invalid(PrimOp::Cons, vec![n(1.0)]);
    }

    #[test]
    fn test_type_predicates() {
        assert_prim(PrimOp::IsNumber, vec![n(1.0)], Value::Boolean(true));
        assert_prim(PrimOp::IsNumber, vec![Value::symbol("x")], Value::Boolean(false));
        assert_prim(PrimOp::IsSymbol, vec![Value::symbol("x")], Value::Boolean(true));
        assert_prim(PrimOp::IsPair, vec![Value::list([n(1.0)])], Value::Boolean(true));
        assert_prim(PrimOp::IsPair, vec![Value::Empty], Value::Boolean(false));
        assert_prim(PrimOp::IsBoolean, vec![Value::Boolean(true)], Value::Boolean(true));
        assert_prim(PrimOp::IsString, vec![Value::String("s".into())], Value::Boolean(true));
    }

    #[test]
    fn test_display_and_newline_write_output() {
        let mut out = Vec::new();
        let result = apply_primitive(PrimOp::Display, vec![Value::String("hi".into())], &mut out);
        assert_eq!(result, Ok(Value::Empty));
        apply_primitive(PrimOp::Display, vec![Value::list([n(1.0), n(2.0)])], &mut out)
            .expect("display should succeed");
        apply_primitive(PrimOp::Newline, vec![], &mut out).expect("newline should succeed");
        assert_eq!(String::from_utf8(out).expect("utf8 output"), "hi(1 2)\n");
    }
}
