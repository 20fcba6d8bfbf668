//! This module provides [`LoxObject`], the runtime value representation.

use crate::{
    callable::{call_object, lox_function::LoxFunction, LoxCallable},
    class::{LoxClass, LoxInstance},
    interpreter::{Interpreter, RuntimeError},
    span::WithSpan,
};
use std::{cell::RefCell, rc::Rc};

/// A [`LoxObject`] wrapped in [`WithSpan`].
pub type SpanObject = WithSpan<LoxObject>;

/// Possible objects in Lox.
#[derive(Clone, Debug)]
#[allow(clippy::missing_docs_in_private_items)]
pub enum LoxObject {
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
    NativeFunction(Rc<dyn LoxCallable>),
    LoxFunction(Rc<LoxFunction>),
    LoxClass(Rc<LoxClass>),
    LoxInstance(Rc<RefCell<LoxInstance>>),
}

impl PartialEq for LoxObject {
    /// Structural equality for nil, booleans, numbers (IEEE-754, so NaN is
    /// unequal to itself), and strings; identity for everything else.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::NativeFunction(a), Self::NativeFunction(b)) => {
                std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
            }
            (Self::LoxFunction(a), Self::LoxFunction(b)) => Rc::ptr_eq(a, b),
            (Self::LoxClass(a), Self::LoxClass(b)) => Rc::ptr_eq(a, b),
            (Self::LoxInstance(a), Self::LoxInstance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl LoxObject {
    /// Get the name of the type of this object, as reported by `typeOf`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::NativeFunction(_) | Self::LoxFunction(_) => "function",
            Self::LoxClass(_) => "class",
            Self::LoxInstance(_) => "instance",
        }
    }

    /// Return the representation of the object to display when printing.
    ///
    /// This is the `toString`-blind form; [`stringify`] consults an
    /// instance's `toString` method and falls back to this.
    pub fn print(&self) -> String {
        match self {
            Self::Nil => "nil".to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.clone(),
            Self::NativeFunction(_) => "<native fn>".to_string(),
            Self::LoxFunction(func) => match func.declared_name() {
                Some(name) => format!("<fn {name}>"),
                None => "<anonymous fn>".to_string(),
            },
            Self::LoxClass(class) => class.name().to_string(),
            Self::LoxInstance(instance) => {
                format!("<{} instance>", instance.borrow().class().name())
            }
        }
    }

    /// Is this object truthy? Everything but `nil` and `false` is.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Boolean(false))
    }
}

/// Convert the object to its user-visible string form.
///
/// An instance with a `toString` method is rendered by calling that method
/// bound to the instance; everything else uses [`LoxObject::print`].
pub fn stringify(
    interpreter: &mut dyn Interpreter,
    object: &SpanObject,
) -> Result<String, RuntimeError> {
    if let LoxObject::LoxInstance(instance) = &object.value {
        let method = instance.borrow().class().find_method("toString");
        if let Some(method) = method {
            let bound = method.bind(LoxObject::LoxInstance(Rc::clone(instance)));
            let result = call_object(
                interpreter,
                &WithSpan::new(object.span, bound),
                &[],
                object.span,
            )?;
            return match result {
                LoxObject::String(text) => Ok(text),
                _ => Err(RuntimeError {
                    message: "toString must return a string.".to_string(),
                    span: object.span,
                }),
            };
        }
    }

    Ok(object.value.print())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!LoxObject::Nil.is_truthy());
        assert!(!LoxObject::Boolean(false).is_truthy());
        assert!(LoxObject::Boolean(true).is_truthy());
        assert!(LoxObject::Number(0.0).is_truthy());
        assert!(LoxObject::String(String::new()).is_truthy());
    }

    #[test]
    fn number_printing() {
        assert_eq!(LoxObject::Number(3.0).print(), "3");
        assert_eq!(LoxObject::Number(3.5).print(), "3.5");
        assert_eq!(LoxObject::Number(-0.25).print(), "-0.25");
        assert_eq!(LoxObject::Number(f64::INFINITY).print(), "inf");
    }

    #[test]
    fn nan_is_unequal_to_itself() {
        assert_ne!(LoxObject::Number(f64::NAN), LoxObject::Number(f64::NAN));
    }

    #[test]
    fn primitive_equality() {
        assert_eq!(LoxObject::Nil, LoxObject::Nil);
        assert_eq!(
            LoxObject::String("abc".to_string()),
            LoxObject::String("abc".to_string())
        );
        assert_ne!(LoxObject::Nil, LoxObject::Boolean(false));
        assert_ne!(LoxObject::Number(1.0), LoxObject::String("1".to_string()));
    }
}
