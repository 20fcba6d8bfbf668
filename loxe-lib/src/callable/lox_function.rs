//! This module provides [`LoxFunction`].

use crate::{
    ast::SpanStmt,
    callable::LoxCallable,
    environment::Environment,
    interpreter::{ErrorOrReturn, Interpreter, RuntimeError},
    object::{LoxObject, SpanObject},
    span::{Span, WithSpan},
};
use std::{cell::RefCell, fmt, rc::Rc};

/// A function that was defined by user Lox code.
#[derive(Clone)]
pub struct LoxFunction {
    /// The name of the function, or None for an anonymous function expression.
    name: Option<WithSpan<String>>,

    /// The parameters that this function takes.
    parameters: Rc<[WithSpan<String>]>,

    /// The body of the function. Shared so that binding a method doesn't copy it.
    body: Rc<[SpanStmt]>,

    /// The environment that the function was defined in.
    closure: Rc<RefCell<Environment>>,

    /// Is this the `init` method of a class?
    is_initializer: bool,
}

impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("is_initializer", &self.is_initializer)
            .finish_non_exhaustive()
    }
}

impl LoxFunction {
    /// Create a new Lox function.
    pub fn new(
        name: Option<WithSpan<String>>,
        parameters: impl Into<Rc<[WithSpan<String>]>>,
        body: impl Into<Rc<[SpanStmt]>>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            name,
            parameters: parameters.into(),
            body: body.into(),
            closure,
            is_initializer,
        }
    }

    /// The declared name of this function, if it has one.
    pub fn declared_name(&self) -> Option<&str> {
        self.name.as_ref().map(|name| name.value.as_str())
    }

    /// Return a copy of this function whose closure binds `this` to the given
    /// receiver.
    pub fn bind(&self, receiver: LoxObject) -> Rc<LoxFunction> {
        let mut environment = Environment::enclosing(Some(Rc::clone(&self.closure)));
        environment.define("this", receiver);
        Rc::new(LoxFunction {
            closure: Rc::new(RefCell::new(environment)),
            ..self.clone()
        })
    }

    /// Get the `this` binding of this function's closure.
    ///
    /// Only meaningful for bound methods, where [`bind`](Self::bind) placed
    /// `this` at depth 0.
    fn get_this(&self) -> LoxObject {
        Environment::get_at_depth(&self.closure, 0, "this")
    }
}

impl LoxCallable for LoxFunction {
    fn name(&self) -> &str {
        self.declared_name().unwrap_or("anonymous")
    }

    fn arity(&self) -> u8 {
        self.parameters
            .len()
            .try_into()
            .expect("The parser rejects functions with more than 255 parameters")
    }

    fn call(
        &self,
        interpreter: &mut dyn Interpreter,
        _callee_span: Span,
        arguments: &[SpanObject],
        _close_paren: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let mut environment = Environment::enclosing(Some(Rc::clone(&self.closure)));

        for (parameter, argument) in self.parameters.iter().zip(arguments) {
            environment.define(parameter.value.clone(), argument.value.clone());
        }

        match interpreter.execute_block(&self.body, Some(Rc::new(RefCell::new(environment)))) {
            Ok(()) => {
                if self.is_initializer {
                    Ok(self.get_this())
                } else {
                    Ok(LoxObject::Nil)
                }
            }
            Err(ErrorOrReturn::Return(value)) => {
                if self.is_initializer {
                    if value.value == LoxObject::Nil {
                        Ok(self.get_this())
                    } else {
                        Err(RuntimeError {
                            message: "Cannot return a value from an initializer".to_string(),
                            span: value.span,
                        })
                    }
                } else {
                    Ok(value.value)
                }
            }
            Err(ErrorOrReturn::Error(error)) => Err(error),
        }
    }
}
