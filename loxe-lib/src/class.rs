//! This module provides [`LoxClass`], [`LoxInstance`], and the method machinery.

use crate::{
    callable::{call_object, lox_function::LoxFunction, LoxCallable},
    interpreter::{Interpreter, RuntimeError},
    object::{LoxObject, SpanObject},
    span::{Span, WithSpan},
};
use std::{
    cell::RefCell,
    collections::{BTreeSet, HashMap},
    fmt,
    rc::Rc,
};

/// The signature of a native method body.
///
/// The second argument is the bound receiver (`this`); the final [`Span`]
/// covers the call site and is used for error locations.
pub type NativeMethodFn =
    fn(&mut dyn Interpreter, &LoxObject, &[SpanObject], Span) -> Result<LoxObject, RuntimeError>;

/// A method implemented by the host rather than by Lox code.
#[derive(Clone)]
pub struct NativeMethod {
    /// The name of the method.
    name: &'static str,

    /// The number of arguments the method takes.
    arity: u8,

    /// The host function implementing the method.
    function: NativeMethodFn,

    /// The receiver this method is bound to; `Nil` until [`bind`](Self::bind).
    receiver: LoxObject,
}

impl fmt::Debug for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeMethod({})", self.name)
    }
}

impl NativeMethod {
    /// Create a new, unbound native method.
    pub fn new(name: &'static str, arity: u8, function: NativeMethodFn) -> Self {
        Self {
            name,
            arity,
            function,
            receiver: LoxObject::Nil,
        }
    }

    /// Return a copy of this method carrying the given receiver.
    pub fn bind(&self, receiver: LoxObject) -> Rc<NativeMethod> {
        Rc::new(Self {
            receiver,
            ..self.clone()
        })
    }
}

impl LoxCallable for NativeMethod {
    fn name(&self) -> &str {
        self.name
    }

    fn arity(&self) -> u8 {
        self.arity
    }

    fn call(
        &self,
        interpreter: &mut dyn Interpreter,
        callee_span: Span,
        arguments: &[SpanObject],
        close_paren: Span,
    ) -> Result<LoxObject, RuntimeError> {
        (self.function)(
            interpreter,
            &self.receiver,
            arguments,
            callee_span.union(&close_paren),
        )
    }
}

/// A method in a class's method table, user-defined or native.
#[derive(Clone, Debug)]
pub enum LoxMethod {
    /// A method written in Lox.
    User(Rc<LoxFunction>),

    /// A method implemented by the host.
    Native(Rc<NativeMethod>),
}

impl LoxMethod {
    /// The number of arguments this method takes.
    pub fn arity(&self) -> u8 {
        match self {
            Self::User(function) => function.arity(),
            Self::Native(method) => method.arity(),
        }
    }

    /// Bind this method to a receiver, producing a callable object whose
    /// closure defines `this`.
    pub fn bind(&self, receiver: LoxObject) -> LoxObject {
        match self {
            Self::User(function) => LoxObject::LoxFunction(function.bind(receiver)),
            Self::Native(method) => LoxObject::NativeFunction(method.bind(receiver)),
        }
    }
}

/// A class value.
///
/// A class is also an instance of its metaclass: static method lookup walks
/// the metaclass chain, and static fields live in the class's own field
/// table, exactly like instance fields live on an instance. Metaclasses are
/// themselves classes with no metaclass of their own.
pub struct LoxClass {
    /// The name of the class, including the span where it was defined.
    name: WithSpan<String>,

    /// The superclass, if one was declared.
    superclass: Option<Rc<LoxClass>>,

    /// The instance methods of this class.
    methods: HashMap<String, LoxMethod>,

    /// The metaclass holding this class's static methods. `None` for
    /// metaclasses themselves.
    metaclass: Option<Rc<LoxClass>>,

    /// The static fields of this class.
    fields: RefCell<HashMap<String, LoxObject>>,
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoxClass({})", self.name.value)
    }
}

impl LoxClass {
    /// Create a new class.
    pub fn new(
        name: WithSpan<String>,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, LoxMethod>,
        metaclass: Option<Rc<LoxClass>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
            metaclass,
            fields: RefCell::new(HashMap::new()),
        }
    }

    /// The name of the class.
    pub fn name(&self) -> &str {
        &self.name.value
    }

    /// The superclass of this class, if any.
    pub fn superclass(&self) -> Option<&Rc<LoxClass>> {
        self.superclass.as_ref()
    }

    /// The metaclass of this class, if any.
    pub fn metaclass(&self) -> Option<&Rc<LoxClass>> {
        self.metaclass.as_ref()
    }

    /// Find a method by name, searching this class and then the superclass
    /// chain.
    pub fn find_method(&self, name: &str) -> Option<LoxMethod> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }
        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// All method names reachable from this class, including inherited ones,
    /// in sorted order.
    pub fn method_names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        let mut class = Some(self);
        while let Some(current) = class {
            names.extend(current.methods.keys().cloned());
            class = current.superclass.as_deref();
        }
        names.into_iter().collect()
    }

    /// The arity of the class when called as a constructor: the arity of its
    /// `init` method, or zero if it has none.
    pub fn arity(&self) -> u8 {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    /// Call the class as a constructor: allocate a fresh instance and run the
    /// bound `init` method on it if one exists.
    pub fn construct(
        class: &Rc<Self>,
        interpreter: &mut dyn Interpreter,
        callee_span: Span,
        arguments: &[SpanObject],
        close_paren: Span,
    ) -> Result<LoxObject, RuntimeError> {
        let instance = Rc::new(RefCell::new(LoxInstance::new(Rc::clone(class))));
        let object = LoxObject::LoxInstance(Rc::clone(&instance));

        if let Some(init) = class.find_method("init") {
            call_object(
                interpreter,
                &WithSpan::new(callee_span, init.bind(object.clone())),
                arguments,
                close_paren,
            )?;
        }

        Ok(object)
    }

    /// Look up a static member on the class: static fields first, then the
    /// metaclass method chain, binding the method to the class itself.
    pub fn get_static(class: &Rc<Self>, name: &str) -> Option<LoxObject> {
        if let Some(value) = class.fields.borrow().get(name) {
            return Some(value.clone());
        }

        class
            .metaclass
            .as_ref()
            .and_then(|metaclass| metaclass.find_method(name))
            .map(|method| method.bind(LoxObject::LoxClass(Rc::clone(class))))
    }

    /// Assign a static field on the class.
    pub fn set_static(&self, name: impl Into<String>, value: LoxObject) {
        self.fields.borrow_mut().insert(name.into(), value);
    }

    /// The names of the static fields currently set on the class, sorted.
    pub fn static_field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.fields.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Does the class currently have a static field with this name?
    pub fn has_static_field(&self, name: &str) -> bool {
        self.fields.borrow().contains_key(name)
    }
}

/// Implementation-private data carried by instances of built-in classes.
#[derive(Clone, Debug, PartialEq)]
pub enum NativeData {
    /// The element storage of an `Array` instance.
    Array(Vec<LoxObject>),
}

/// An instance of a class.
pub struct LoxInstance {
    /// The class that created this instance.
    class: Rc<LoxClass>,

    /// The fields of this instance.
    fields: HashMap<String, LoxObject>,

    /// The native-data slot used by built-in classes.
    native_data: Option<NativeData>,
}

impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LoxInstance({}, {} fields)",
            self.class.name(),
            self.fields.len()
        )
    }
}

impl LoxInstance {
    /// Create a new instance with no fields and no native data.
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
            native_data: None,
        }
    }

    /// The class that created this instance.
    pub fn class(&self) -> &Rc<LoxClass> {
        &self.class
    }

    /// Look up a property on the instance: fields shadow methods, and methods
    /// come back bound to the instance.
    pub fn get(instance: &Rc<RefCell<LoxInstance>>, name: &str) -> Option<LoxObject> {
        if let Some(value) = instance.borrow().fields.get(name) {
            return Some(value.clone());
        }

        let method = instance.borrow().class.find_method(name)?;
        Some(method.bind(LoxObject::LoxInstance(Rc::clone(instance))))
    }

    /// Assign a field on the instance.
    pub fn set_field(&mut self, name: impl Into<String>, value: LoxObject) {
        self.fields.insert(name.into(), value);
    }

    /// Does the instance have a field with this name?
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The names of the fields currently set on the instance, sorted.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.fields.keys().cloned().collect();
        names.sort();
        names
    }

    /// Install native data on the instance.
    pub fn set_native_data(&mut self, data: NativeData) {
        self.native_data = Some(data);
    }

    /// The array storage of this instance, if it is an `Array`.
    pub fn array(&self) -> Option<&Vec<LoxObject>> {
        match &self.native_data {
            Some(NativeData::Array(values)) => Some(values),
            None => None,
        }
    }

    /// Mutable access to the array storage of this instance, if it is an
    /// `Array`.
    pub fn array_mut(&mut self) -> Option<&mut Vec<LoxObject>> {
        match &mut self.native_data {
            Some(NativeData::Array(values)) => Some(values),
            None => None,
        }
    }
}
