use crate::ast::{Exp, PrimOp, ProcExp};
use crate::environment::Env;
use crate::promise::Promise;
use crate::types::write_escaped;
use std::fmt;
use std::rc::Rc;

/// Everything an evaluation can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    String(String),
    PrimOp(PrimOp),
    Symbol(String),
    Empty,
    Pair(Rc<Value>, Rc<Value>),
    Closure(Rc<Closure>),
    /// A computation nothing has demanded yet.
    Promise(Promise),
}

/// A procedure value: the `lambda` it came from and the environment that was
/// current when the `lambda` was evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub proc: Rc<ProcExp>,
    pub env: Env,
}

impl Closure {
    pub fn new(proc: Rc<ProcExp>, env: Env) -> Closure {
        Closure { proc, env }
    }

    pub fn params(&self) -> &[String] {
        &self.proc.params
    }

    pub fn body(&self) -> &[Exp] {
        &self.proc.body
    }
}

impl Value {
    pub fn symbol(name: impl Into<String>) -> Value {
        Value::Symbol(name.into())
    }

    pub fn cons(car: Value, cdr: Value) -> Value {
        Value::Pair(Rc::new(car), Rc::new(cdr))
    }

    /// A proper list of `items`.
    pub fn list(items: impl IntoIterator<Item = Value, IntoIter: DoubleEndedIterator>) -> Value {
        items
            .into_iter()
            .rev()
            .fold(Value::Empty, |tail, item| Value::cons(item, tail))
    }

    /// Scheme truthiness: only `#f` is false.
    pub fn is_true(&self) -> bool {
        !matches!(self, Value::Boolean(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::PrimOp(_) => "primitive",
            Value::Symbol(_) => "symbol",
            Value::Empty => "empty list",
            Value::Pair(_, _) => "pair",
            Value::Closure(_) => "closure",
            Value::Promise(_) => "promise",
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::String(s) => write_escaped(f, s),
            Value::PrimOp(op) => write!(f, "#<primitive:{}>", op),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::Empty => write!(f, "'()"),
            Value::Pair(car, cdr) => {
                write!(f, "({}", car)?;
                let mut rest = cdr;
                loop {
                    match &**rest {
                        Value::Empty => break,
                        Value::Pair(car, cdr) => {
                            write!(f, " {}", car)?;
                            rest = cdr;
                        }
                        tail => {
                            write!(f, " . {}", tail)?;
                            break;
                        }
                    }
                }
                write!(f, ")")
            }
            Value::Closure(closure) => {
                write!(f, "#<closure ({})>", closure.params().join(" "))
            }
            Value::Promise(promise) => write!(f, "{}", promise),
        }
    }
}
