//! This module provides the native functions registered in the global environment.

use super::LoxCallable;
use crate::{
    builtins,
    class::{LoxClass, LoxInstance},
    interpreter::{Interpreter, RuntimeError},
    object::{stringify, LoxObject, SpanObject},
    span::Span,
};
use std::{cell::RefCell, rc::Rc, time};

/// Get the number out of an argument, or error with its actual type.
pub(crate) fn expect_number(argument: &SpanObject) -> Result<f64, RuntimeError> {
    match argument.value {
        LoxObject::Number(n) => Ok(n),
        _ => Err(RuntimeError {
            message: format!(
                "Expected value of type number but got {}.",
                argument.value.type_name()
            ),
            span: argument.span,
        }),
    }
}

/// Get the string out of an argument, or error with its actual type.
pub(crate) fn expect_string(argument: &SpanObject) -> Result<&str, RuntimeError> {
    match &argument.value {
        LoxObject::String(s) => Ok(s),
        _ => Err(RuntimeError {
            message: format!(
                "Expected value of type string but got {}.",
                argument.value.type_name()
            ),
            span: argument.span,
        }),
    }
}

/// Return the current Unix time in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clock;

impl LoxCallable for Clock {
    fn name(&self) -> &str {
        "clock"
    }

    fn arity(&self) -> u8 {
        0
    }

    fn call(
        &self,
        _interpreter: &mut dyn Interpreter,
        callee_span: Span,
        _arguments: &[SpanObject],
        close_paren: Span,
    ) -> Result<LoxObject, RuntimeError> {
        Ok(LoxObject::Number(
            time::SystemTime::now()
                .duration_since(time::UNIX_EPOCH)
                .map_err(|error| RuntimeError {
                    message: format!("NATIVE FUNCTION INTERNAL ERROR: {error:?}"),
                    span: callee_span.union(&close_paren),
                })?
                .as_nanos() as f64
                / 1_000_000_000.0,
        ))
    }
}

/// Convert the given value to a string, honouring `toString` methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StringOf;

impl LoxCallable for StringOf {
    fn name(&self) -> &str {
        "string"
    }

    fn arity(&self) -> u8 {
        1
    }

    fn call(
        &self,
        interpreter: &mut dyn Interpreter,
        _callee_span: Span,
        arguments: &[SpanObject],
        _close_paren: Span,
    ) -> Result<LoxObject, RuntimeError> {
        Ok(LoxObject::String(stringify(interpreter, &arguments[0])?))
    }
}

/// Convert the given value to a number, or `nil` if it doesn't convert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NumberOf;

impl LoxCallable for NumberOf {
    fn name(&self) -> &str {
        "number"
    }

    fn arity(&self) -> u8 {
        1
    }

    fn call(
        &self,
        _interpreter: &mut dyn Interpreter,
        _callee_span: Span,
        arguments: &[SpanObject],
        _close_paren: Span,
    ) -> Result<LoxObject, RuntimeError> {
        Ok(match &arguments[0].value {
            LoxObject::Number(n) => LoxObject::Number(*n),
            LoxObject::String(s) => match s.trim().parse::<f64>() {
                Ok(n) => LoxObject::Number(n),
                Err(_) => LoxObject::Nil,
            },
            _ => LoxObject::Nil,
        })
    }
}

/// Return the type of the given value as a string code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeOf;

impl LoxCallable for TypeOf {
    fn name(&self) -> &str {
        "typeOf"
    }

    fn arity(&self) -> u8 {
        1
    }

    fn call(
        &self,
        _interpreter: &mut dyn Interpreter,
        _callee_span: Span,
        arguments: &[SpanObject],
        _close_paren: Span,
    ) -> Result<LoxObject, RuntimeError> {
        Ok(LoxObject::String(arguments[0].value.type_name().to_string()))
    }
}

/// Check whether a value is an instance of a class (walking the superclass
/// chain) or matches a type code string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Is;

impl LoxCallable for Is {
    fn name(&self) -> &str {
        "is"
    }

    fn arity(&self) -> u8 {
        2
    }

    fn call(
        &self,
        _interpreter: &mut dyn Interpreter,
        _callee_span: Span,
        arguments: &[SpanObject],
        _close_paren: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let value = &arguments[0].value;
        let target = &arguments[1].value;

        let result = match target {
            LoxObject::LoxClass(class) => match value {
                LoxObject::LoxInstance(instance) => {
                    let mut current = Some(Rc::clone(instance.borrow().class()));
                    let mut found = false;
                    while let Some(candidate) = current {
                        if Rc::ptr_eq(&candidate, class) {
                            found = true;
                            break;
                        }
                        current = candidate.superclass().map(Rc::clone);
                    }
                    found
                }
                _ => false,
            },
            LoxObject::String(code) => value.type_name() == code,
            _ => false,
        };

        Ok(LoxObject::Boolean(result))
    }
}

/// Get the instance (or class, for the static view) out of an introspection
/// argument.
fn expect_introspectable<'o>(
    function_name: &str,
    argument: &'o SpanObject,
) -> Result<Introspectable<'o>, RuntimeError> {
    match &argument.value {
        LoxObject::LoxInstance(instance) => Ok(Introspectable::Instance(instance)),
        LoxObject::LoxClass(class) => Ok(Introspectable::Class(class)),
        _ => Err(RuntimeError {
            message: format!("Argument to '{function_name}' must be an instance or a class."),
            span: argument.span,
        }),
    }
}

/// The subject of an introspection native: an instance, or a class seen as an
/// instance of its metaclass.
enum Introspectable<'o> {
    Instance(&'o Rc<RefCell<LoxInstance>>),
    Class(&'o Rc<LoxClass>),
}

impl Introspectable<'_> {
    /// The sorted field names of the subject.
    fn field_names(&self) -> Vec<String> {
        match self {
            Self::Instance(instance) => instance.borrow().field_names(),
            Self::Class(class) => class.static_field_names(),
        }
    }

    /// The sorted method names of the subject, including inherited ones.
    fn method_names(&self) -> Vec<String> {
        match self {
            Self::Instance(instance) => instance.borrow().class().method_names(),
            Self::Class(class) => class
                .metaclass()
                .map(|metaclass| metaclass.method_names())
                .unwrap_or_default(),
        }
    }

    /// Does the subject have a field with this name?
    fn has_field(&self, name: &str) -> bool {
        match self {
            Self::Instance(instance) => instance.borrow().has_field(name),
            Self::Class(class) => class.has_static_field(name),
        }
    }

    /// Does the subject have a method with this name?
    fn has_method(&self, name: &str) -> bool {
        match self {
            Self::Instance(instance) => instance.borrow().class().find_method(name).is_some(),
            Self::Class(class) => class
                .metaclass()
                .is_some_and(|metaclass| metaclass.find_method(name).is_some()),
        }
    }
}

/// Turn a list of names into a Lox array of strings.
fn name_array(interpreter: &dyn Interpreter, names: Vec<String>) -> LoxObject {
    builtins::new_array(
        &interpreter.array_class(),
        names.into_iter().map(LoxObject::String).collect(),
    )
}

/// List the field names of an instance (or the static fields of a class).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fields;

impl LoxCallable for Fields {
    fn name(&self) -> &str {
        "fields"
    }

    fn arity(&self) -> u8 {
        1
    }

    fn call(
        &self,
        interpreter: &mut dyn Interpreter,
        _callee_span: Span,
        arguments: &[SpanObject],
        _close_paren: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let names = expect_introspectable("fields", &arguments[0])?.field_names();
        Ok(name_array(interpreter, names))
    }
}

/// List the method names of an instance's class (or a class's static methods).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Methods;

impl LoxCallable for Methods {
    fn name(&self) -> &str {
        "methods"
    }

    fn arity(&self) -> u8 {
        1
    }

    fn call(
        &self,
        interpreter: &mut dyn Interpreter,
        _callee_span: Span,
        arguments: &[SpanObject],
        _close_paren: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let names = expect_introspectable("methods", &arguments[0])?.method_names();
        Ok(name_array(interpreter, names))
    }
}

/// Check whether an instance has a field with the given name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HasField;

impl LoxCallable for HasField {
    fn name(&self) -> &str {
        "hasField"
    }

    fn arity(&self) -> u8 {
        2
    }

    fn call(
        &self,
        _interpreter: &mut dyn Interpreter,
        _callee_span: Span,
        arguments: &[SpanObject],
        _close_paren: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let subject = expect_introspectable("hasField", &arguments[0])?;
        let name = expect_string(&arguments[1])?;
        Ok(LoxObject::Boolean(subject.has_field(name)))
    }
}

/// Check whether an instance's class has a method with the given name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HasMethod;

impl LoxCallable for HasMethod {
    fn name(&self) -> &str {
        "hasMethod"
    }

    fn arity(&self) -> u8 {
        2
    }

    fn call(
        &self,
        _interpreter: &mut dyn Interpreter,
        _callee_span: Span,
        arguments: &[SpanObject],
        _close_paren: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let subject = expect_introspectable("hasMethod", &arguments[0])?;
        let name = expect_string(&arguments[1])?;
        Ok(LoxObject::Boolean(subject.has_method(name)))
    }
}
