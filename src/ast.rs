//! The expression tree the evaluator consumes.
//!
//! Trees are immutable once built. Sub-expressions that a promise or a
//! closure may hold on to (operands, `let` and `define` right-hand sides,
//! procedure bodies) sit behind `Rc` so they can be shared with every
//! environment that refers to them.

use crate::types::write_escaped;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// The fixed set of primitive operators, recognised by name at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimOp {
    Add,
    Sub,
    Mul,
    Div,
    NumEq,
    Lt,
    Gt,
    Not,
    And,
    Or,
    IsEq,
    StringEq,
    Cons,
    Car,
    Cdr,
    List,
    IsPair,
    IsNumber,
    IsBoolean,
    IsSymbol,
    IsString,
    Display,
    Newline,
}

impl PrimOp {
    pub const ALL: [PrimOp; 23] = [
        PrimOp::Add,
        PrimOp::Sub,
        PrimOp::Mul,
        PrimOp::Div,
        PrimOp::NumEq,
        PrimOp::Lt,
        PrimOp::Gt,
        PrimOp::Not,
        PrimOp::And,
        PrimOp::Or,
        PrimOp::IsEq,
        PrimOp::StringEq,
        PrimOp::Cons,
        PrimOp::Car,
        PrimOp::Cdr,
        PrimOp::List,
        PrimOp::IsPair,
        PrimOp::IsNumber,
        PrimOp::IsBoolean,
        PrimOp::IsSymbol,
        PrimOp::IsString,
        PrimOp::Display,
        PrimOp::Newline,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PrimOp::Add => "+",
            PrimOp::Sub => "-",
            PrimOp::Mul => "*",
            PrimOp::Div => "/",
            PrimOp::NumEq => "=",
            PrimOp::Lt => "<",
            PrimOp::Gt => ">",
            PrimOp::Not => "not",
            PrimOp::And => "and",
            PrimOp::Or => "or",
            PrimOp::IsEq => "eq?",
            PrimOp::StringEq => "string=?",
            PrimOp::Cons => "cons",
            PrimOp::Car => "car",
            PrimOp::Cdr => "cdr",
            PrimOp::List => "list",
            PrimOp::IsPair => "pair?",
            PrimOp::IsNumber => "number?",
            PrimOp::IsBoolean => "boolean?",
            PrimOp::IsSymbol => "symbol?",
            PrimOp::IsString => "string?",
            PrimOp::Display => "display",
            PrimOp::Newline => "newline",
        }
    }

    pub fn from_name(name: &str) -> Option<PrimOp> {
        PrimOp::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl fmt::Display for PrimOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A `lambda`: parameter names and a non-empty body.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcExp {
    pub params: Vec<String>,
    pub body: Vec<Exp>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub var: String,
    pub val: Rc<Exp>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Exp {
    Num(f64),
    Bool(bool),
    Str(String),
    PrimOp(PrimOp),
    VarRef(String),
    /// Quoted data.
    Lit(Value),
    If {
        test: Box<Exp>,
        then: Box<Exp>,
        alt: Box<Exp>,
    },
    Proc(Rc<ProcExp>),
    Let {
        bindings: Vec<Binding>,
        body: Vec<Exp>,
    },
    App {
        rator: Box<Exp>,
        rands: Vec<Rc<Exp>>,
    },
    /// Parsed so that evaluation can reject it.
    Letrec {
        bindings: Vec<Binding>,
        body: Vec<Exp>,
    },
    /// Parsed so that evaluation can reject it.
    Set {
        var: String,
        val: Box<Exp>,
    },
}

impl Exp {
    pub fn var(name: impl Into<String>) -> Exp {
        Exp::VarRef(name.into())
    }

    pub fn if_(test: Exp, then: Exp, alt: Exp) -> Exp {
        Exp::If {
            test: Box::new(test),
            then: Box::new(then),
            alt: Box::new(alt),
        }
    }

    pub fn lambda<S: Into<String>>(params: impl IntoIterator<Item = S>, body: Vec<Exp>) -> Exp {
        Exp::Proc(Rc::new(ProcExp {
            params: params.into_iter().map(Into::into).collect(),
            body,
        }))
    }

    pub fn app(rator: Exp, rands: Vec<Exp>) -> Exp {
        Exp::App {
            rator: Box::new(rator),
            rands: rands.into_iter().map(Rc::new).collect(),
        }
    }

    pub fn let_<S: Into<String>>(bindings: impl IntoIterator<Item = (S, Exp)>, body: Vec<Exp>) -> Exp {
        Exp::Let {
            bindings: bindings
                .into_iter()
                .map(|(var, val)| Binding {
                    var: var.into(),
                    val: Rc::new(val),
                })
                .collect(),
            body,
        }
    }
}

/// `(define var val)`, allowed at top level only.
#[derive(Debug, Clone, PartialEq)]
pub struct Define {
    pub var: String,
    pub val: Rc<Exp>,
}

impl Define {
    pub fn new(var: impl Into<String>, val: Exp) -> Define {
        Define {
            var: var.into(),
            val: Rc::new(val),
        }
    }

    /// The procedure being defined, if the right-hand side is a `lambda`.
    pub fn procedure(&self) -> Option<&Rc<ProcExp>> {
        match &*self.val {
            Exp::Proc(proc) => Some(proc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    Define(Define),
    Exp(Exp),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub forms: Vec<Form>,
}

fn write_seq<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for item in items {
        write!(f, " {}", item)?;
    }
    Ok(())
}

fn write_bindings(f: &mut fmt::Formatter<'_>, bindings: &[Binding]) -> fmt::Result {
    write!(f, "(")?;
    for (i, binding) in bindings.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "({} {})", binding.var, binding.val)?;
    }
    write!(f, ")")
}

impl fmt::Display for ProcExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(lambda ({})", self.params.join(" "))?;
        write_seq(f, &self.body)?;
        write!(f, ")")
    }
}

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exp::Num(n) => write!(f, "{}", n),
            Exp::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Exp::Str(s) => write_escaped(f, s),
            Exp::PrimOp(op) => write!(f, "{}", op),
            Exp::VarRef(name) => write!(f, "{}", name),
            // Value already prints the empty list as '()
            Exp::Lit(Value::Empty) => write!(f, "{}", Value::Empty),
            Exp::Lit(value) => write!(f, "'{}", value),
            Exp::If { test, then, alt } => write!(f, "(if {} {} {})", test, then, alt),
            Exp::Proc(proc) => write!(f, "{}", proc),
            Exp::Let { bindings, body } => {
                write!(f, "(let ")?;
                write_bindings(f, bindings)?;
                write_seq(f, body)?;
                write!(f, ")")
            }
            Exp::Letrec { bindings, body } => {
                write!(f, "(letrec ")?;
                write_bindings(f, bindings)?;
                write_seq(f, body)?;
                write!(f, ")")
            }
            Exp::App { rator, rands } => {
                write!(f, "({}", rator)?;
                write_seq(f, rands)?;
                write!(f, ")")
            }
            Exp::Set { var, val } => write!(f, "(set! {} {})", var, val),
        }
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Form::Define(def) => write!(f, "(define {} {})", def.var, def.val),
            Form::Exp(exp) => write!(f, "{}", exp),
        }
    }
}
