//! This module provides the [`LoxCallable`] trait and the call dispatcher.

pub mod lox_function;
pub mod native;

use crate::{
    class::LoxClass,
    interpreter::{Interpreter, RuntimeError},
    object::{LoxObject, SpanObject},
    span::Span,
};
use std::fmt;

/// A trait to encompass the ability to call an object in Lox.
pub trait LoxCallable: fmt::Debug {
    /// The name of this callable, for debugging.
    fn name(&self) -> &str;

    /// The number of arguments that this callable takes.
    fn arity(&self) -> u8;

    /// Call the callable and return a value.
    ///
    /// Implementors may assume the arguments list has the length returned by
    /// [`arity`](LoxCallable::arity); [`call_object`] checks it before
    /// dispatching.
    fn call(
        &self,
        interpreter: &mut dyn Interpreter,
        callee_span: Span,
        arguments: &[SpanObject],
        close_paren: Span,
    ) -> Result<LoxObject, RuntimeError>;
}

/// Call the given object with the given arguments.
///
/// This is the single dispatch point for every call in the language: the
/// interpreter's call expressions, method invocations, and natives that call
/// back into user code (`foreach`, `toString`) all come through here, so the
/// non-callable and arity errors live here and nowhere else.
pub fn call_object(
    interpreter: &mut dyn Interpreter,
    callee: &SpanObject,
    arguments: &[SpanObject],
    close_paren: Span,
) -> Result<LoxObject, RuntimeError> {
    let check_arity = |expected: u8| -> Result<(), RuntimeError> {
        if arguments.len() == expected as usize {
            Ok(())
        } else {
            Err(RuntimeError {
                message: format!(
                    "Expected {expected} arguments but got {}.",
                    arguments.len()
                ),
                span: callee.span.union(&close_paren),
            })
        }
    };

    match &callee.value {
        LoxObject::NativeFunction(function) => {
            check_arity(function.arity())?;
            function.call(interpreter, callee.span, arguments, close_paren)
        }
        LoxObject::LoxFunction(function) => {
            check_arity(function.arity())?;
            function.call(interpreter, callee.span, arguments, close_paren)
        }
        LoxObject::LoxClass(class) => {
            check_arity(class.arity())?;
            LoxClass::construct(class, interpreter, callee.span, arguments, close_paren)
        }
        _ => Err(RuntimeError {
            message: "Can only call functions and classes.".to_string(),
            span: callee.span,
        }),
    }
}
