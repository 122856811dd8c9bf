use crate::ast::Exp;
use crate::environment::Env;
use std::fmt;
use std::rc::Rc;

/// A deferred computation: an expression and the environment it must be
/// evaluated in.
///
/// Promises are not memoized. Every time the evaluator forces one, the
/// expression is evaluated again from scratch (call-by-name, not
/// call-by-need). Forcing lives in [`crate::evaluator`], since how far to
/// force depends on the evaluation context.
#[derive(Debug, Clone, PartialEq)]
pub struct Promise {
    exp: Rc<Exp>,
    env: Env,
}

impl Promise {
    /// Wraps `exp` without evaluating anything.
    pub fn delay(exp: Rc<Exp>, env: Env) -> Promise {
        Promise { exp, env }
    }

    pub fn exp(&self) -> &Exp {
        &self.exp
    }

    pub fn env(&self) -> &Env {
        &self.env
    }
}

impl fmt::Display for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<promise {} in {} env>", self.exp, self.env.kind())
    }
}
