use crate::ast::ProcExp;
use crate::value::{Closure, Value};
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    #[error("Unbound variable: '{0}'")]
    UnboundVariable(String),
    #[error("Cannot resolve '{0}' as a recursive procedure: not a recursive environment")]
    NotRecursive(String),
}

/// A persistent chain of frames. Cloning is cheap and shares the chain;
/// extending never touches the environment being extended.
#[derive(Debug, Clone, PartialEq)]
pub struct Env(Rc<Frame>);

#[derive(Debug, PartialEq)]
enum Frame {
    Empty,
    Extended {
        vars: Vec<String>,
        vals: Vec<Value>,
        parent: Env,
    },
    /// Procedures that may refer to themselves and to each other. A lookup
    /// rebuilds the closure with this frame as its environment.
    Recursive {
        vars: Vec<String>,
        procs: Vec<Rc<ProcExp>>,
        parent: Env,
    },
}

impl Env {
    pub fn empty() -> Env {
        Env(Rc::new(Frame::Empty))
    }

    /// Binds `vars[i]` to `vals[i]` in a new frame on top of `self`.
    pub fn extend(&self, vars: Vec<String>, vals: Vec<Value>) -> Env {
        debug_assert_eq!(vars.len(), vals.len(), "one value per variable");
        Env(Rc::new(Frame::Extended {
            vars,
            vals,
            parent: self.clone(),
        }))
    }

    /// Binds each of `vars` to the matching procedure in a recursive frame.
    pub fn extend_recursive(&self, vars: Vec<String>, procs: Vec<Rc<ProcExp>>) -> Env {
        debug_assert_eq!(vars.len(), procs.len(), "one procedure per variable");
        Env(Rc::new(Frame::Recursive {
            vars,
            procs,
            parent: self.clone(),
        }))
    }

    /// Looks `name` up, innermost frame first. Within a frame the last
    /// binding of a duplicated name wins.
    pub fn lookup(&self, name: &str) -> Result<Value, EnvError> {
        let mut env = self;
        loop {
            match &*env.0 {
                Frame::Empty => return Err(EnvError::UnboundVariable(name.to_string())),
                Frame::Extended { vars, vals, parent } => {
                    match vars.iter().rposition(|var| var == name) {
                        Some(index) => return Ok(vals[index].clone()),
                        None => env = parent,
                    }
                }
                Frame::Recursive {
                    vars,
                    procs,
                    parent,
                } => match vars.iter().rposition(|var| var == name) {
                    Some(index) => {
                        let closure = Closure::new(procs[index].clone(), env.clone());
                        return Ok(Value::Closure(Rc::new(closure)));
                    }
                    None => env = parent,
                },
            }
        }
    }

    /// Resolves `name` through a recursive frame, yielding a closure whose
    /// environment is that frame. Only valid on a recursive frame.
    pub fn lookup_recursive(&self, name: &str) -> Result<Value, EnvError> {
        if self.is_recursive() {
            self.lookup(name)
        } else {
            Err(EnvError::NotRecursive(name.to_string()))
        }
    }

    pub fn is_recursive(&self) -> bool {
        matches!(*self.0, Frame::Recursive { .. })
    }

    pub fn kind(&self) -> &'static str {
        match *self.0 {
            Frame::Empty => "empty",
            Frame::Extended { .. } => "extended",
            Frame::Recursive { .. } => "recursive",
        }
    }

    /// Every name visible from this environment.
    pub fn identifiers(&self) -> HashSet<String> {
        let mut identifiers = HashSet::new();
        let mut env = self;
        loop {
            match &*env.0 {
                Frame::Empty => return identifiers,
                Frame::Extended { vars, parent, .. } | Frame::Recursive { vars, parent, .. } => {
                    identifiers.extend(vars.iter().cloned());
                    env = parent;
                }
            }
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Env::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Exp;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn identity_proc() -> Rc<ProcExp> {
        Rc::new(ProcExp {
            params: names(&["x"]),
            body: vec![Exp::var("x")],
        })
    }

    #[test]
    fn test_extend_and_lookup() {
        let env = Env::empty().extend(names(&["x", "y"]), vec![num(10.0), num(20.0)]);
        assert_eq!(env.lookup("x"), Ok(num(10.0)));
        assert_eq!(env.lookup("y"), Ok(num(20.0)));
    }

    #[test]
    fn test_lookup_unbound() {
        let env = Env::empty().extend(names(&["x"]), vec![num(1.0)]);
        assert_eq!(
            env.lookup("z"),
            Err(EnvError::UnboundVariable("z".to_string()))
        );
        assert!(matches!(
            Env::empty().lookup("x"),
            Err(EnvError::UnboundVariable(name)) if name == "x"
        ));
    }

    #[test]
    fn test_shadowing() {
        let global_env = Env::empty().extend(names(&["x"]), vec![num(10.0)]);
        let local_env = global_env.extend(names(&["x"]), vec![num(50.0)]);
        let inner_env = local_env.extend(names(&["y"]), vec![Value::symbol("y-value")]);

        assert_eq!(inner_env.lookup("x"), Ok(num(50.0)));
        assert_eq!(inner_env.lookup("y"), Ok(Value::symbol("y-value")));
        // Extending left the outer frames untouched
        assert_eq!(global_env.lookup("x"), Ok(num(10.0)));
        assert!(global_env.lookup("y").is_err());
    }

    #[test]
    fn test_last_duplicate_in_frame_wins() {
        let env = Env::empty().extend(names(&["x", "x"]), vec![num(1.0), num(2.0)]);
        assert_eq!(env.lookup("x"), Ok(num(2.0)));
    }

    #[test]
    fn test_recursive_frame_closure_captures_itself() {
        let rec_env = Env::empty().extend_recursive(names(&["id"]), vec![identity_proc()]);
        assert!(rec_env.is_recursive());

        match rec_env.lookup_recursive("id") {
            Ok(Value::Closure(closure)) => {
                assert_eq!(closure.params(), ["x".to_string()]);
                assert_eq!(closure.env, rec_env);
                // The captured frame resolves the name again
                assert!(matches!(closure.env.lookup("id"), Ok(Value::Closure(_))));
            }
            other => panic!("Expected a closure, got {:?}", other),
        }
    }

    #[test]
    fn test_lookup_recursive_requires_recursive_frame() {
        let env = Env::empty().extend(names(&["f"]), vec![num(1.0)]);
        assert_eq!(
            env.lookup_recursive("f"),
            Err(EnvError::NotRecursive("f".to_string()))
        );
        let rec_env = env.extend_recursive(names(&["g"]), vec![identity_proc()]);
        // Names outside the frame fall through to the parent chain
        assert_eq!(rec_env.lookup_recursive("f"), Ok(num(1.0)));
    }

    #[test]
    fn test_identifiers() {
        let env = Env::empty()
            .extend(names(&["a"]), vec![num(1.0)])
            .extend_recursive(names(&["f"]), vec![identity_proc()])
            .extend(names(&["b", "a"]), vec![num(2.0), num(3.0)]);
        let mut ids: Vec<String> = env.identifiers().into_iter().collect();
        ids.sort();
        assert_eq!(ids, names(&["a", "b", "f"]));
        assert_eq!(env.kind(), "extended");
        assert_eq!(Env::empty().kind(), "empty");
    }
}
