//! This module provides [`Environment`].

use crate::{
    interpreter::RuntimeError,
    object::LoxObject,
    span::WithSpan,
};
use std::{cell::RefCell, collections::HashMap, rc::Rc};

/// A chain of mutable name-to-value scopes.
///
/// The global environment has no enclosing environment. Closures share
/// ownership of the environment they captured, so every link in the chain is
/// an `Rc<RefCell<Environment>>`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Environment {
    /// The environment being enclosed by this one.
    pub enclosing: Option<Rc<RefCell<Environment>>>,

    /// A map of variable names to their values.
    pub values: HashMap<String, LoxObject>,
}

impl Environment {
    /// Create a new environment enclosing the given environment.
    pub fn enclosing(enclosing: Option<Rc<RefCell<Self>>>) -> Self {
        Self {
            enclosing,
            values: HashMap::new(),
        }
    }

    /// Create a new shared environment enclosing the given one.
    pub fn new_child(enclosing: &Rc<RefCell<Self>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::enclosing(Some(Rc::clone(enclosing)))))
    }

    /// Define a new variable with the given value, unconditionally binding it
    /// in this scope.
    pub fn define(&mut self, name: impl Into<String>, value: LoxObject) {
        self.values.insert(name.into(), value);
    }

    /// Re-assign an already existing name, ascending the chain to find it.
    /// Returns a [`RuntimeError`] if the name is undefined.
    pub fn assign(
        &mut self,
        name: &WithSpan<String>,
        value: LoxObject,
    ) -> Result<(), RuntimeError> {
        if let Some(current) = self.values.get_mut(&name.value) {
            *current = value;
            Ok(())
        } else if let Some(env) = &self.enclosing {
            env.borrow_mut().assign(name, value)
        } else {
            Err(RuntimeError {
                message: format!("Undefined variable '{}'.", name.value),
                span: name.span,
            })
        }
    }

    /// Get the value of the given name, ascending the chain to find it.
    /// Returns a [`RuntimeError`] if the name is undefined.
    pub fn get(&self, name: &WithSpan<String>) -> Result<LoxObject, RuntimeError> {
        if let Some(value) = self.values.get(&name.value) {
            Ok(value.clone())
        } else if let Some(env) = &self.enclosing {
            env.borrow().get(name)
        } else {
            Err(RuntimeError {
                message: format!("Undefined variable '{}'.", name.value),
                span: name.span,
            })
        }
    }

    /// Get the value of the given name in the environment exactly `depth`
    /// links up the chain.
    ///
    /// The resolver guarantees the name exists at that depth; a miss here is
    /// an internal bug, not a user error, so this panics rather than erroring.
    pub fn get_at_depth(env: &Rc<RefCell<Self>>, depth: usize, name: &str) -> LoxObject {
        Self::ancestor(env, depth)
            .borrow()
            .values
            .get(name)
            .unwrap_or_else(|| {
                panic!("Resolver bug: name '{name}' does not exist at depth {depth}")
            })
            .clone()
    }

    /// Re-assign the given name in the environment exactly `depth` links up
    /// the chain. Panics on a miss for the same reason as
    /// [`get_at_depth`](Self::get_at_depth).
    pub fn assign_at_depth(
        env: &Rc<RefCell<Self>>,
        depth: usize,
        name: &WithSpan<String>,
        value: LoxObject,
    ) {
        let ancestor = Self::ancestor(env, depth);
        let mut ancestor = ancestor.borrow_mut();
        let slot = ancestor.values.get_mut(&name.value).unwrap_or_else(|| {
            panic!(
                "Resolver bug: name '{}' does not exist at depth {depth}",
                name.value
            )
        });
        *slot = value;
    }

    /// Walk exactly `distance` enclosing links up the chain.
    fn ancestor(env: &Rc<RefCell<Self>>, distance: usize) -> Rc<RefCell<Self>> {
        let mut current = Rc::clone(env);
        for _ in 0..distance {
            let enclosing = current
                .borrow()
                .enclosing
                .as_ref()
                .map(Rc::clone)
                .unwrap_or_else(|| {
                    panic!("Resolver bug: environment chain is shorter than depth {distance}")
                });
            current = enclosing;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    fn name(text: &str) -> WithSpan<String> {
        WithSpan::new(Span { start: 0, end: 0 }, text.to_string())
    }

    #[test]
    fn define_get_assign() {
        let mut env = Environment::default();
        env.define("a", LoxObject::Number(1.0));

        assert_eq!(env.get(&name("a")).unwrap(), LoxObject::Number(1.0));
        assert!(env.get(&name("b")).is_err());

        env.assign(&name("a"), LoxObject::Number(2.0)).unwrap();
        assert_eq!(env.get(&name("a")).unwrap(), LoxObject::Number(2.0));

        assert!(env.assign(&name("b"), LoxObject::Nil).is_err());
    }

    #[test]
    fn nested_scopes() {
        let globals = Rc::new(RefCell::new(Environment::default()));
        globals.borrow_mut().define("a", LoxObject::Number(1.0));

        let inner = Environment::new_child(&globals);
        inner.borrow_mut().define("a", LoxObject::Number(2.0));
        inner.borrow_mut().define("b", LoxObject::Boolean(true));

        // Shadowed in the inner scope, original visible at depth 1.
        assert_eq!(
            inner.borrow().get(&name("a")).unwrap(),
            LoxObject::Number(2.0)
        );
        assert_eq!(
            Environment::get_at_depth(&inner, 1, "a"),
            LoxObject::Number(1.0)
        );

        // Assignment ascends to the defining scope.
        inner
            .borrow_mut()
            .assign(&name("c"), LoxObject::Nil)
            .unwrap_err();
        Environment::assign_at_depth(&inner, 1, &name("a"), LoxObject::Number(3.0));
        assert_eq!(
            globals.borrow().get(&name("a")).unwrap(),
            LoxObject::Number(3.0)
        );
    }
}
