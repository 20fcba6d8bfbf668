//! This module builds the built-in classes and registers everything in the
//! global environment.

use crate::{
    callable::{
        call_object,
        native::{
            expect_number, expect_string, Clock, Fields, HasField, HasMethod, Is, Methods,
            NumberOf, StringOf, TypeOf,
        },
        LoxCallable,
    },
    class::{LoxClass, LoxInstance, LoxMethod, NativeData, NativeMethod},
    environment::Environment,
    interpreter::{Interpreter, RuntimeError},
    object::{stringify, LoxObject, SpanObject},
    span::{Span, WithSpan},
};
use std::{
    cell::RefCell,
    collections::HashMap,
    io::{self, BufRead, Write},
    rc::Rc,
};

/// Register all native functions and built-in classes in the given (global)
/// environment, and return the `Array` class for the interpreter to keep.
pub fn register_globals(environment: &mut Environment) -> Rc<LoxClass> {
    environment.define("clock", LoxObject::NativeFunction(Rc::new(Clock)));
    environment.define("string", LoxObject::NativeFunction(Rc::new(StringOf)));
    environment.define("number", LoxObject::NativeFunction(Rc::new(NumberOf)));
    environment.define("typeOf", LoxObject::NativeFunction(Rc::new(TypeOf)));
    environment.define("is", LoxObject::NativeFunction(Rc::new(Is)));
    environment.define("fields", LoxObject::NativeFunction(Rc::new(Fields)));
    environment.define("methods", LoxObject::NativeFunction(Rc::new(Methods)));
    environment.define("hasField", LoxObject::NativeFunction(Rc::new(HasField)));
    environment.define("hasMethod", LoxObject::NativeFunction(Rc::new(HasMethod)));

    let array_class = make_array_class();
    environment.define("Array", LoxObject::LoxClass(Rc::clone(&array_class)));
    environment.define("Console", LoxObject::LoxClass(make_console_class()));
    environment.define("String", LoxObject::LoxClass(make_string_class()));
    environment.define("Math", LoxObject::LoxClass(make_math_class()));

    array_class
}

/// Create an `Array` instance holding the given elements.
pub fn new_array(array_class: &Rc<LoxClass>, elements: Vec<LoxObject>) -> LoxObject {
    let mut instance = LoxInstance::new(Rc::clone(array_class));
    instance.set_native_data(NativeData::Array(elements));
    LoxObject::LoxInstance(Rc::new(RefCell::new(instance)))
}

/// Validate a numeric index against an array or string of the given length.
/// `what` names the indexed thing ("Array" or "String") in error messages.
pub fn check_index(
    what: &str,
    length: usize,
    index: f64,
    span: Span,
) -> Result<usize, RuntimeError> {
    if index.fract() != 0.0 || index < 0.0 {
        return Err(RuntimeError {
            message: format!("{what} index must be a non-negative integer."),
            span,
        });
    }

    let index = index as usize;
    if index >= length {
        return Err(RuntimeError {
            message: format!("{what} index out of bounds."),
            span,
        });
    }

    Ok(index)
}

/// Build a class whose instance methods and static methods are all native.
///
/// The statics go in a generated metaclass, the same shape user classes get.
fn native_class(
    name: &'static str,
    methods: Vec<NativeMethod>,
    static_methods: Vec<NativeMethod>,
) -> Rc<LoxClass> {
    /// Spans for built-ins point at the start of the source.
    const BUILTIN_SPAN: Span = Span { start: 0, end: 0 };

    /// Collect native methods into a method table.
    fn method_table(methods: Vec<NativeMethod>) -> HashMap<String, LoxMethod> {
        methods
            .into_iter()
            .map(|method| {
                (
                    method.name().to_string(),
                    LoxMethod::Native(Rc::new(method)),
                )
            })
            .collect()
    }

    let metaclass = if static_methods.is_empty() {
        None
    } else {
        Some(Rc::new(LoxClass::new(
            WithSpan::new(BUILTIN_SPAN, format!("__{name}_metaclass")),
            None,
            method_table(static_methods),
            None,
        )))
    };

    Rc::new(LoxClass::new(
        WithSpan::new(BUILTIN_SPAN, name.to_string()),
        None,
        method_table(methods),
        metaclass,
    ))
}

/// Get the receiver as an `Array` instance.
fn expect_array(receiver: &LoxObject, span: Span) -> Result<Rc<RefCell<LoxInstance>>, RuntimeError> {
    match receiver {
        LoxObject::LoxInstance(instance) if instance.borrow().array().is_some() => {
            Ok(Rc::clone(instance))
        }
        _ => Err(RuntimeError {
            message: "Receiver is not an array.".to_string(),
            span,
        }),
    }
}

/// The `Array` class: constructed with a length, with native element accessors.
fn make_array_class() -> Rc<LoxClass> {
    fn init(
        _interpreter: &mut dyn Interpreter,
        receiver: &LoxObject,
        arguments: &[SpanObject],
        span: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let length = expect_number(&arguments[0])?;
        if length.fract() != 0.0 || length < 0.0 {
            return Err(RuntimeError {
                message: "Array length must be a non-negative integer.".to_string(),
                span: arguments[0].span,
            });
        }

        let LoxObject::LoxInstance(instance) = receiver else {
            return Err(RuntimeError {
                message: "Receiver is not an array.".to_string(),
                span,
            });
        };
        instance
            .borrow_mut()
            .set_native_data(NativeData::Array(vec![LoxObject::Nil; length as usize]));

        Ok(LoxObject::Nil)
    }

    fn get(
        _interpreter: &mut dyn Interpreter,
        receiver: &LoxObject,
        arguments: &[SpanObject],
        span: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let instance = expect_array(receiver, span)?;
        let index = expect_number(&arguments[0])?;

        let instance = instance.borrow();
        let values = instance.array().unwrap();
        let index = check_index("Array", values.len(), index, arguments[0].span)?;
        Ok(values[index].clone())
    }

    fn set(
        _interpreter: &mut dyn Interpreter,
        receiver: &LoxObject,
        arguments: &[SpanObject],
        span: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let instance = expect_array(receiver, span)?;
        let index = expect_number(&arguments[0])?;
        let value = arguments[1].value.clone();

        let mut instance = instance.borrow_mut();
        let values = instance.array_mut().unwrap();
        let index = check_index("Array", values.len(), index, arguments[0].span)?;
        values[index] = value.clone();
        Ok(value)
    }

    fn length(
        _interpreter: &mut dyn Interpreter,
        receiver: &LoxObject,
        _arguments: &[SpanObject],
        span: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let instance = expect_array(receiver, span)?;
        let length = instance.borrow().array().unwrap().len();
        Ok(LoxObject::Number(length as f64))
    }

    fn fill(
        _interpreter: &mut dyn Interpreter,
        receiver: &LoxObject,
        arguments: &[SpanObject],
        span: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let instance = expect_array(receiver, span)?;
        let mut instance = instance.borrow_mut();
        let values = instance.array_mut().unwrap();
        for slot in values.iter_mut() {
            *slot = arguments[0].value.clone();
        }
        Ok(LoxObject::Nil)
    }

    fn foreach(
        interpreter: &mut dyn Interpreter,
        receiver: &LoxObject,
        arguments: &[SpanObject],
        span: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let instance = expect_array(receiver, span)?;
        let callback = WithSpan::new(arguments[0].span, arguments[0].value.clone());

        // Iterate over a snapshot so the callback may mutate the array.
        let values = instance.borrow().array().unwrap().clone();
        for (index, value) in values.into_iter().enumerate() {
            call_object(
                interpreter,
                &callback,
                &[
                    WithSpan::new(span, value),
                    WithSpan::new(span, LoxObject::Number(index as f64)),
                ],
                span,
            )?;
        }

        Ok(LoxObject::Nil)
    }

    fn to_string(
        interpreter: &mut dyn Interpreter,
        receiver: &LoxObject,
        _arguments: &[SpanObject],
        span: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let instance = expect_array(receiver, span)?;
        let values = instance.borrow().array().unwrap().clone();

        let mut parts = Vec::with_capacity(values.len());
        for value in values {
            parts.push(stringify(interpreter, &WithSpan::new(span, value))?);
        }
        Ok(LoxObject::String(format!("[{}]", parts.join(", "))))
    }

    native_class(
        "Array",
        vec![
            NativeMethod::new("init", 1, init),
            NativeMethod::new("get", 1, get),
            NativeMethod::new("set", 2, set),
            NativeMethod::new("length", 0, length),
            NativeMethod::new("fill", 1, fill),
            NativeMethod::new("foreach", 1, foreach),
            NativeMethod::new("toString", 0, to_string),
        ],
        vec![],
    )
}

/// The `Console` class: static standard-stream access.
fn make_console_class() -> Rc<LoxClass> {
    fn read_line(
        _interpreter: &mut dyn Interpreter,
        _receiver: &LoxObject,
        _arguments: &[SpanObject],
        span: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line).map_err(|error| {
            RuntimeError {
                message: format!("Failed to read from stdin: {error}"),
                span,
            }
        })?;

        if read == 0 {
            return Ok(LoxObject::Nil);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(LoxObject::String(line))
    }

    fn write_line(
        interpreter: &mut dyn Interpreter,
        _receiver: &LoxObject,
        arguments: &[SpanObject],
        _span: Span,
    ) -> Result<LoxObject, RuntimeError> {
        println!("{}", stringify(interpreter, &arguments[0])?);
        Ok(LoxObject::Nil)
    }

    fn write(
        interpreter: &mut dyn Interpreter,
        _receiver: &LoxObject,
        arguments: &[SpanObject],
        span: Span,
    ) -> Result<LoxObject, RuntimeError> {
        print!("{}", stringify(interpreter, &arguments[0])?);
        io::stdout().flush().map_err(|error| RuntimeError {
            message: format!("Failed to write to stdout: {error}"),
            span,
        })?;
        Ok(LoxObject::Nil)
    }

    native_class(
        "Console",
        vec![],
        vec![
            NativeMethod::new("readLine", 0, read_line),
            NativeMethod::new("writeLine", 1, write_line),
            NativeMethod::new("write", 1, write),
        ],
    )
}

/// The `String` class: static accessors working in UTF-16 code units.
fn make_string_class() -> Rc<LoxClass> {
    /// Get the UTF-16 code unit at the checked index.
    fn code_unit_at(arguments: &[SpanObject]) -> Result<u16, RuntimeError> {
        let text = expect_string(&arguments[0])?;
        let index = expect_number(&arguments[1])?;

        let units: Vec<u16> = text.encode_utf16().collect();
        let index = check_index("String", units.len(), index, arguments[1].span)?;
        Ok(units[index])
    }

    fn length(
        _interpreter: &mut dyn Interpreter,
        _receiver: &LoxObject,
        arguments: &[SpanObject],
        _span: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let text = expect_string(&arguments[0])?;
        Ok(LoxObject::Number(text.encode_utf16().count() as f64))
    }

    fn char_at(
        _interpreter: &mut dyn Interpreter,
        _receiver: &LoxObject,
        arguments: &[SpanObject],
        _span: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let unit = code_unit_at(arguments)?;
        Ok(LoxObject::String(String::from_utf16_lossy(&[unit])))
    }

    fn char_code_at(
        _interpreter: &mut dyn Interpreter,
        _receiver: &LoxObject,
        arguments: &[SpanObject],
        _span: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let unit = code_unit_at(arguments)?;
        Ok(LoxObject::Number(f64::from(unit)))
    }

    native_class(
        "String",
        vec![],
        vec![
            NativeMethod::new("length", 1, length),
            NativeMethod::new("charAt", 2, char_at),
            NativeMethod::new("charCodeAt", 2, char_code_at),
        ],
    )
}

/// The `Math` class: static numeric helpers.
fn make_math_class() -> Rc<LoxClass> {
    fn modulo(
        _interpreter: &mut dyn Interpreter,
        _receiver: &LoxObject,
        arguments: &[SpanObject],
        _span: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let a = expect_number(&arguments[0])?;
        let b = expect_number(&arguments[1])?;
        Ok(LoxObject::Number(a % b))
    }

    fn round(
        _interpreter: &mut dyn Interpreter,
        _receiver: &LoxObject,
        arguments: &[SpanObject],
        _span: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let value = expect_number(&arguments[0])?;
        let places = expect_number(&arguments[1])?;

        if places.fract() != 0.0 || places < 0.0 {
            return Err(RuntimeError {
                message: "Number of decimal places must be a non-negative integer.".to_string(),
                span: arguments[1].span,
            });
        }

        let factor = 10f64.powi(places as i32);
        Ok(LoxObject::Number((value * factor).round() / factor))
    }

    native_class(
        "Math",
        vec![],
        vec![
            NativeMethod::new("mod", 2, modulo),
            NativeMethod::new("round", 2, round),
        ],
    )
}
