//! Normal-order evaluation.
//!
//! Arguments to closures are passed as unevaluated [`Promise`]s and are only
//! evaluated where a concrete value is unavoidable: the operator of an
//! application, the operands of a primitive, and the test of an `if`.
//! Everything else is evaluated at one of two depths:
//!
//! * [`Depth::Weak`] stops at a variable bound to an unforced application
//!   and hands back the promise itself. Top-level forms use this depth, so a
//!   program may legitimately produce a promise.
//! * [`Depth::Full`] keeps forcing until no promise is left. Closure bodies
//!   use this depth.
//!
//! Promises are not memoized: a variable referenced twice is evaluated twice.

use crate::ast::{Binding, Exp, PrimOp};
use crate::environment::{Env, EnvError};
use crate::parser::ParseError;
use crate::primitives::apply_primitive;
use crate::promise::Promise;
use crate::value::{Closure, Value};
use std::io::Write;
use std::rc::Rc;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    EnvError(#[from] EnvError),
    #[error("Evaluation Error: {0} expressions are not supported by the normal-order evaluator")]
    UnsupportedForm(&'static str),
    #[error("Evaluation Error: Expected a procedure, but got: {0}")]
    BadOperator(Value),
    #[error("Evaluation Error: Empty {0}")]
    EmptySequence(&'static str),
    #[error("Evaluation Error: Procedure expects {expected} arguments, got {found}")]
    Arity { expected: usize, found: usize },
    #[error("Evaluation Error: Invalid arguments - {0}")]
    InvalidArguments(String),
    #[error("Evaluation Error: Could not write output - {0}")]
    Output(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type EvalResult<T = Value> = Result<T, EvalError>;

/// How far an evaluation must reduce its expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// A value, or a promise over an application nothing has demanded yet.
    Weak,
    /// A value that is not a promise.
    Full,
}

/// Evaluates expressions, sending `display`/`newline` output to `W`.
pub struct Evaluator<W> {
    out: W,
}

impl<W: Write> Evaluator<W> {
    pub fn new(out: W) -> Self {
        Evaluator { out }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn eval_weak(&mut self, exp: &Exp, env: &Env) -> EvalResult {
        self.eval(exp, env, Depth::Weak)
    }

    pub fn eval_full(&mut self, exp: &Exp, env: &Env) -> EvalResult {
        self.eval(exp, env, Depth::Full)
    }

    pub fn eval(&mut self, exp: &Exp, env: &Env, depth: Depth) -> EvalResult {
        match exp {
            Exp::Num(n) => Ok(Value::Number(*n)),
            Exp::Bool(b) => Ok(Value::Boolean(*b)),
            Exp::Str(s) => Ok(Value::String(s.clone())),
            Exp::PrimOp(op) => Ok(Value::PrimOp(*op)),
            Exp::Lit(value) => Ok(value.clone()),
            Exp::VarRef(name) => match depth {
                Depth::Weak => self.eval_var_ref_weak(name, env),
                Depth::Full => self.eval_var_ref_full(name, env),
            },
            Exp::If { test, then, alt } => {
                let test = self.eval_full(test, env)?;
                let branch = if test.is_true() { then } else { alt };
                self.eval(branch, env, depth)
            }
            Exp::Proc(proc) => Ok(Value::Closure(Rc::new(Closure::new(
                proc.clone(),
                env.clone(),
            )))),
            Exp::Let { bindings, body } => self.eval_let(bindings, body, env, depth),
            Exp::App { rator, rands } => self.eval_app(rator, rands, env),
            Exp::Letrec { .. } => Err(EvalError::UnsupportedForm("letrec")),
            Exp::Set { .. } => Err(EvalError::UnsupportedForm("set!")),
        }
    }

    /// Evaluates `exps` in order and returns the last value.
    pub fn eval_sequence(&mut self, exps: &[Exp], env: &Env, depth: Depth) -> EvalResult {
        let Some((last, init)) = exps.split_last() else {
            return Err(EvalError::EmptySequence("expression sequence"));
        };
        for exp in init {
            self.eval(exp, env, depth)?;
        }
        self.eval(last, env, depth)
    }

    fn eval_var_ref_weak(&mut self, name: &str, env: &Env) -> EvalResult {
        match env.lookup(name)? {
            Value::Promise(promise) => match promise.exp() {
                Exp::App { .. } => Ok(Value::Promise(promise)),
                Exp::Proc(_) if promise.env().is_recursive() => {
                    Ok(promise.env().lookup_recursive(name)?)
                }
                exp => {
                    trace!(name, "forcing promise (weak)");
                    self.eval_weak(exp, promise.env())
                }
            },
            value => Ok(value),
        }
    }

    fn eval_var_ref_full(&mut self, name: &str, env: &Env) -> EvalResult {
        match env.lookup(name)? {
            Value::Promise(promise) => match promise.exp() {
                Exp::Proc(_) if promise.env().is_recursive() => {
                    Ok(promise.env().lookup_recursive(name)?)
                }
                exp => {
                    trace!(name, "forcing promise");
                    self.eval_full(exp, promise.env())
                }
            },
            value => Ok(value),
        }
    }

    fn eval_let(&mut self, bindings: &[Binding], body: &[Exp], env: &Env, depth: Depth) -> EvalResult {
        let (vars, vals): (Vec<String>, Vec<Value>) = bindings
            .iter()
            .map(|binding| {
                let promise = Promise::delay(binding.val.clone(), env.clone());
                (binding.var.clone(), Value::Promise(promise))
            })
            .unzip();
        self.eval_sequence(body, &env.extend(vars, vals), depth)
    }

    fn eval_app(&mut self, rator: &Exp, rands: &[Rc<Exp>], env: &Env) -> EvalResult {
        match self.eval_full(rator, env)? {
            Value::PrimOp(op) => self.apply_primop(op, rands, env),
            Value::Closure(closure) => self.apply_closure(&closure, rands, env),
            other => Err(EvalError::BadOperator(other)),
        }
    }

    fn apply_primop(&mut self, op: PrimOp, rands: &[Rc<Exp>], env: &Env) -> EvalResult {
        let args = rands
            .iter()
            .map(|rand| self.eval_full(rand, env))
            .collect::<EvalResult<Vec<_>>>()?;
        apply_primitive(op, args, &mut self.out)
    }

    fn apply_closure(&mut self, closure: &Closure, rands: &[Rc<Exp>], env: &Env) -> EvalResult {
        let params = closure.params();
        if params.len() != rands.len() {
            return Err(EvalError::Arity {
                expected: params.len(),
                found: rands.len(),
            });
        }
        // Operands stay unevaluated, closed over the caller's environment
        let args = rands
            .iter()
            .map(|rand| Value::Promise(Promise::delay(rand.clone(), env.clone())))
            .collect();
        let body_env = closure.env.extend(params.to_vec(), args);
        self.eval_sequence(closure.body(), &body_env, Depth::Full)
    }
}
