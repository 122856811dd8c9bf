//! Running whole programs: top-level `define`s and the forms between them.

use crate::ast::{Define, Form, Program};
use crate::environment::Env;
use crate::evaluator::{EvalError, EvalResult, Evaluator};
use crate::parser::{parse_expression, parse_program};
use crate::promise::Promise;
use crate::value::Value;
use std::collections::HashSet;
use std::io::{self, Write};
use std::rc::Rc;
use tracing::debug;

/// The leading run of `forms` that can share one recursive frame: procedure
/// definitions with pairwise distinct names that are not yet bound in `env`.
/// A name already bound ends the run, so earlier procedures keep seeing the
/// binding that was current when they were defined.
fn define_group<'a>(forms: &'a [Form], env: &Env) -> Vec<&'a Define> {
    let mut seen = HashSet::new();
    forms
        .iter()
        .map_while(|form| match form {
            Form::Define(def)
                if def.procedure().is_some()
                    && env.lookup(&def.var).is_err()
                    && seen.insert(def.var.as_str()) =>
            {
                Some(def)
            }
            _ => None,
        })
        .collect()
}

impl<W: Write> Evaluator<W> {
    /// Evaluates `program` from the empty environment.
    #[tracing::instrument(level = "debug", skip_all, fields(forms = program.forms.len()))]
    pub fn eval_program(&mut self, program: &Program) -> EvalResult {
        self.eval_forms(&program.forms, &mut Env::empty())?
            .ok_or(EvalError::EmptySequence("program"))
    }

    /// Evaluates `forms` in order, extending `env` with each definition as
    /// it is reached. Returns the value of the last form, or `None` if it was
    /// a definition. On failure `env` keeps the definitions made so far.
    pub fn eval_forms(&mut self, forms: &[Form], env: &mut Env) -> EvalResult<Option<Value>> {
        let mut value = None;
        let mut rest = forms;
        while let Some(first) = rest.first() {
            match first {
                Form::Define(def) => {
                    let group = define_group(rest, env);
                    if group.is_empty() {
                        debug!(var = %def.var, "binding definition");
                        let promise = Promise::delay(def.val.clone(), env.clone());
                        *env = env.extend(vec![def.var.clone()], vec![Value::Promise(promise)]);
                        rest = &rest[1..];
                    } else {
                        *env = bind_procedures(&group, env);
                        rest = &rest[group.len()..];
                    }
                    value = None;
                }
                Form::Exp(exp) => {
                    value = Some(self.eval_weak(exp, env)?);
                    rest = &rest[1..];
                }
            }
        }
        Ok(value)
    }
}

/// Binds a group of procedure definitions. Each name maps to a promise over
/// its `lambda` in a recursive frame holding the whole group, so the
/// procedures can call themselves and each other.
fn bind_procedures(group: &[&Define], env: &Env) -> Env {
    let vars: Vec<String> = group.iter().map(|def| def.var.clone()).collect();
    debug!(?vars, "binding recursive definitions");
    let procs = group
        .iter()
        .filter_map(|def| def.procedure().cloned())
        .collect();
    let rec_env = env.extend_recursive(vars.clone(), procs);
    let promises = group
        .iter()
        .map(|def| Value::Promise(Promise::delay(Rc::clone(&def.val), rec_env.clone())))
        .collect();
    env.extend(vars, promises)
}

/// Evaluates `program`, sending primitive output to stdout.
pub fn evaluate_program(program: &Program) -> EvalResult {
    Evaluator::new(io::stdout()).eval_program(program)
}

/// Parses a single form and evaluates it as a one-form program.
pub fn evaluate_expression(input: &str) -> EvalResult {
    let form = parse_expression(input)?;
    evaluate_program(&Program { forms: vec![form] })
}

/// A top-level environment that survives between inputs, as a REPL needs.
pub struct Session<W> {
    evaluator: Evaluator<W>,
    env: Env,
}

impl Session<io::Stdout> {
    pub fn stdout() -> Self {
        Session::new(io::stdout())
    }
}

impl<W: Write> Session<W> {
    pub fn new(out: W) -> Self {
        Session {
            evaluator: Evaluator::new(out),
            env: Env::empty(),
        }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Parses and evaluates every form in `input`. Definitions persist even
    /// when a later form fails. Yields `None` when the last form is a
    /// definition.
    pub fn eval_source(&mut self, input: &str) -> EvalResult<Option<Value>> {
        let program = parse_program(input)?;
        self.evaluator.eval_forms(&program.forms, &mut self.env)
    }

    /// Forces a value the way a body would, for printing.
    pub fn force(&mut self, value: Value) -> EvalResult {
        match value {
            Value::Promise(promise) => self.evaluator.eval_full(promise.exp(), promise.env()),
            value => Ok(value),
        }
    }
}
