//! This module provides [`TwInterpreter`].

use crate::resolver::Resolver;
use loxe_lib::{
    ast::{
        BinaryOperator, ClassDecl, Expr, FunDecl, LogicalOperator, SpanExpr, SpanStmt, Stmt,
        UnaryOperator,
    },
    builtins::{self, check_index},
    callable::{call_object, lox_function::LoxFunction},
    class::{LoxClass, LoxInstance, LoxMethod},
    environment::Environment,
    interpreter::{ErrorOrReturn, Interpreter, Result, RuntimeError},
    lox,
    object::{stringify, LoxObject, SpanObject},
    span::{Span, WithSpan},
};
use std::{cell::RefCell, collections::HashMap, rc::Rc};
use tracing::trace;

/// A tree-walk interpreter backend.
pub struct TwInterpreter {
    /// The global environment, always at the root of the chain.
    globals: Rc<RefCell<Environment>>,

    /// The environment of the scope currently being executed.
    environment: Rc<RefCell<Environment>>,

    /// The resolver's side table from a name use to its environment depth.
    /// Uses with no entry are globals.
    locals: HashMap<WithSpan<String>, usize>,

    /// The built-in `Array` class, kept for array literals and natives.
    array_class: Rc<LoxClass>,
}

impl Interpreter for TwInterpreter {
    fn new() -> Self {
        let mut globals = Environment::default();
        let array_class = builtins::register_globals(&mut globals);
        let globals = Rc::new(RefCell::new(globals));

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            array_class,
        }
    }

    fn get_current_env(&self) -> Rc<RefCell<Environment>> {
        Rc::clone(&self.environment)
    }

    fn interpret(&mut self, stmts: &[SpanStmt]) {
        match Resolver::get_locals_map(stmts) {
            Ok(locals) => {
                trace!(new_locals = locals.len(), "resolved");
                // Extend rather than replace: functions defined by earlier
                // REPL lines still need their resolutions.
                self.locals.extend(locals);
            }
            Err(error) => {
                lox::report_error_at(error.token.span, &error.token.value, &error.message);
                return;
            }
        }

        if let Err(ErrorOrReturn::Error(error)) = self.execute_statements(stmts) {
            lox::report_runtime_error(error.span, &error.message);
        }
    }

    fn execute_block(
        &mut self,
        stmts: &[SpanStmt],
        environment: Option<Rc<RefCell<Environment>>>,
    ) -> Result<()> {
        let previous = Rc::clone(&self.environment);
        self.environment = environment.unwrap_or_else(|| Environment::new_child(&previous));

        let result = self.execute_statements(stmts);

        self.environment = previous;
        result
    }

    fn array_class(&self) -> Rc<LoxClass> {
        Rc::clone(&self.array_class)
    }
}

impl TwInterpreter {
    /// Execute the given statements.
    fn execute_statements(&mut self, stmts: &[SpanStmt]) -> Result<()> {
        for stmt in stmts {
            self.execute_statement(stmt)?;
        }
        Ok(())
    }

    /// Execute the given statement.
    fn execute_statement(&mut self, stmt: &SpanStmt) -> Result<()> {
        match &stmt.value {
            Stmt::Expression(expr) => {
                self.evaluate_expression(expr)?;
            }
            Stmt::Print(expr) => {
                let value = self.evaluate_expression(expr)?;
                println!("{}", stringify(self, &value)?);
            }
            Stmt::Return(keyword_span, expr) => {
                let value = match expr {
                    Some(expr) => self.evaluate_expression(expr)?,
                    None => WithSpan::new(*keyword_span, LoxObject::Nil),
                };
                return Err(ErrorOrReturn::Return(value));
            }
            Stmt::VarDecl(name, initializer) => {
                let value = match initializer {
                    Some(expr) => self.evaluate_expression(expr)?.value,
                    None => LoxObject::Nil,
                };
                self.environment
                    .borrow_mut()
                    .define(name.value.clone(), value);
            }
            Stmt::FunDecl(decl) => {
                let function = self.make_function(decl, &self.get_current_env(), false);
                self.environment
                    .borrow_mut()
                    .define(decl.name.value.clone(), LoxObject::LoxFunction(function));
            }
            Stmt::ClassDecl(class) => self.execute_class_decl(class)?,
            Stmt::Block(stmts) => self.execute_block(stmts, None)?,
            Stmt::If(condition, then_branch, else_branch) => {
                if self.evaluate_expression(condition)?.value.is_truthy() {
                    self.execute_statement(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute_statement(else_branch)?;
                }
            }
            Stmt::While(condition, body) => {
                while self.evaluate_expression(condition)?.value.is_truthy() {
                    self.execute_statement(body)?;
                }
            }
        }

        Ok(())
    }

    /// Build a [`LoxFunction`] from a declaration, capturing the given
    /// environment.
    fn make_function(
        &self,
        decl: &FunDecl,
        closure: &Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Rc<LoxFunction> {
        Rc::new(LoxFunction::new(
            Some(decl.name.clone()),
            decl.params.clone(),
            decl.body.clone(),
            Rc::clone(closure),
            is_initializer,
        ))
    }

    /// Execute a class declaration.
    ///
    /// The name is pre-declared as nil so that methods can refer to the class
    /// itself; instance methods capture an environment defining `super` (the
    /// superclass) and static methods one defining `super` as the
    /// superclass's metaclass. The static methods live in a generated
    /// metaclass whose superclass is the superclass's metaclass, which is
    /// what makes static methods inherit.
    fn execute_class_decl(&mut self, class: &ClassDecl) -> Result<()> {
        let superclass: Option<Rc<LoxClass>> = match &class.superclass {
            Some(name) => match self.look_up_variable(name)? {
                LoxObject::LoxClass(superclass) => Some(superclass),
                _ => {
                    return Err(RuntimeError {
                        message: "Superclass must be a class.".to_string(),
                        span: name.span,
                    }
                    .into())
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(class.name.value.clone(), LoxObject::Nil);

        let method_env = match &superclass {
            Some(superclass) => {
                let env = Environment::new_child(&self.environment);
                env.borrow_mut()
                    .define("super", LoxObject::LoxClass(Rc::clone(superclass)));
                env
            }
            None => Rc::clone(&self.environment),
        };
        let methods = self.build_method_table(&class.methods, &method_env, true);

        let static_env = match &superclass {
            Some(superclass) => {
                let env = Environment::new_child(&self.environment);
                let super_meta = superclass
                    .metaclass()
                    .map(|metaclass| LoxObject::LoxClass(Rc::clone(metaclass)))
                    .unwrap_or(LoxObject::Nil);
                env.borrow_mut().define("super", super_meta);
                env
            }
            None => Rc::clone(&self.environment),
        };
        let static_methods = self.build_method_table(&class.static_methods, &static_env, false);

        let metaclass = Rc::new(LoxClass::new(
            WithSpan::new(
                class.name.span,
                format!("__{}_metaclass", class.name.value),
            ),
            superclass
                .as_ref()
                .and_then(|superclass| superclass.metaclass().map(Rc::clone)),
            static_methods,
            None,
        ));

        let lox_class = Rc::new(LoxClass::new(
            class.name.clone(),
            superclass,
            methods,
            Some(metaclass),
        ));

        self.environment
            .borrow_mut()
            .assign(&class.name, LoxObject::LoxClass(lox_class))?;

        Ok(())
    }

    /// Build the method table for a class from its method declarations.
    ///
    /// `init` only counts as an initializer among instance methods.
    fn build_method_table(
        &self,
        decls: &[WithSpan<FunDecl>],
        closure: &Rc<RefCell<Environment>>,
        instance_methods: bool,
    ) -> HashMap<String, LoxMethod> {
        decls
            .iter()
            .map(|method| {
                let decl = &method.value;
                let is_initializer = instance_methods && decl.name.value == "init";
                (
                    decl.name.value.clone(),
                    LoxMethod::User(self.make_function(decl, closure, is_initializer)),
                )
            })
            .collect()
    }

    /// Look up a variable use, consulting the resolver's side table for a
    /// depth and falling back to the globals.
    fn look_up_variable(&self, name: &WithSpan<String>) -> Result<LoxObject, RuntimeError> {
        match self.locals.get(name) {
            Some(&depth) => Ok(Environment::get_at_depth(
                &self.environment,
                depth,
                &name.value,
            )),
            None => self.globals.borrow().get(name),
        }
    }

    /// Evaluate the given expression.
    fn evaluate_expression(&mut self, expr: &SpanExpr) -> Result<SpanObject> {
        let span = expr.span;

        let value = match &expr.value {
            Expr::Nil => LoxObject::Nil,
            Expr::Boolean(b) => LoxObject::Boolean(*b),
            Expr::Number(n) => LoxObject::Number(*n),
            Expr::String(s) => LoxObject::String(s.clone()),
            Expr::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate_expression(element)?.value);
                }
                builtins::new_array(&self.array_class, values)
            }
            Expr::Binary(left, operator, right) => {
                let left = self.evaluate_expression(left)?;
                let right = self.evaluate_expression(right)?;
                self.evaluate_binary_expression(*operator, left, right)?
            }
            Expr::Logical(left, operator, right) => {
                let left = self.evaluate_expression(left)?;
                match operator.value {
                    LogicalOperator::Or if left.value.is_truthy() => left.value,
                    LogicalOperator::And if !left.value.is_truthy() => left.value,
                    _ => self.evaluate_expression(right)?.value,
                }
            }
            Expr::Unary(operator, operand) => {
                let operand = self.evaluate_expression(operand)?;
                self.evaluate_unary_expression(*operator, operand)?
            }
            Expr::Grouping(inner) => self.evaluate_expression(inner)?.value,
            Expr::Variable(name) => {
                self.look_up_variable(&WithSpan::new(span, name.clone()))?
            }
            Expr::Assign(name, value_expr) => {
                let value = self.evaluate_expression(value_expr)?.value;
                match self.locals.get(name) {
                    Some(&depth) => Environment::assign_at_depth(
                        &self.environment,
                        depth,
                        name,
                        value.clone(),
                    ),
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }
                value
            }
            Expr::Call(callee, arguments, close_paren) => {
                let callee = self.evaluate_expression(callee)?;
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate_expression(argument)?);
                }
                call_object(self, &callee, &args, *close_paren)?
            }
            Expr::Get(object, index) => {
                let object = self.evaluate_expression(object)?;
                let index = self.evaluate_expression(index)?;
                self.get_property(&object, &index)?
            }
            Expr::Set(object, index, value_expr) => {
                let object = self.evaluate_expression(object)?;
                let index = self.evaluate_expression(index)?;
                let value = self.evaluate_expression(value_expr)?.value;
                self.set_property(&object, &index, value)?
            }
            Expr::This => self.look_up_variable(&WithSpan::new(span, "this".to_string()))?,
            Expr::Super(method) => self.evaluate_super(span, method)?,
            Expr::Function(params, body) => LoxObject::LoxFunction(Rc::new(LoxFunction::new(
                None,
                params.clone(),
                body.clone(),
                Rc::clone(&self.environment),
                false,
            ))),
        };

        Ok(WithSpan::new(span, value))
    }

    /// Evaluate a binary expression.
    ///
    /// `/` follows IEEE-754, so division by zero yields an infinity or NaN
    /// rather than an error.
    fn evaluate_binary_expression(
        &mut self,
        operator: WithSpan<BinaryOperator>,
        left: SpanObject,
        right: SpanObject,
    ) -> Result<LoxObject, RuntimeError> {
        use BinaryOperator::*;

        match operator.value {
            EqualEqual => return Ok(LoxObject::Boolean(left.value == right.value)),
            BangEqual => return Ok(LoxObject::Boolean(left.value != right.value)),
            Plus => {
                return match (&left.value, &right.value) {
                    (LoxObject::Number(a), LoxObject::Number(b)) => Ok(LoxObject::Number(a + b)),
                    (LoxObject::String(_), _) | (_, LoxObject::String(_)) => {
                        let mut text = stringify(self, &left)?;
                        text.push_str(&stringify(self, &right)?);
                        Ok(LoxObject::String(text))
                    }
                    _ => Err(RuntimeError {
                        message: "Operands must be two numbers or at least one string."
                            .to_string(),
                        span: operator.span,
                    }),
                }
            }
            Minus | Star | Slash | Greater | GreaterEqual | Less | LessEqual => {}
        }

        let (LoxObject::Number(a), LoxObject::Number(b)) = (&left.value, &right.value) else {
            return Err(RuntimeError {
                message: "Operands must be numbers.".to_string(),
                span: operator.span,
            });
        };

        Ok(match operator.value {
            Minus => LoxObject::Number(a - b),
            Star => LoxObject::Number(a * b),
            Slash => LoxObject::Number(a / b),
            Greater => LoxObject::Boolean(a > b),
            GreaterEqual => LoxObject::Boolean(a >= b),
            Less => LoxObject::Boolean(a < b),
            LessEqual => LoxObject::Boolean(a <= b),
            Plus | EqualEqual | BangEqual => unreachable!("handled above"),
        })
    }

    /// Evaluate a unary expression.
    fn evaluate_unary_expression(
        &mut self,
        operator: WithSpan<UnaryOperator>,
        operand: SpanObject,
    ) -> Result<LoxObject, RuntimeError> {
        match (operator.value, &operand.value) {
            (UnaryOperator::Bang, value) => Ok(LoxObject::Boolean(!value.is_truthy())),
            (UnaryOperator::Minus, LoxObject::Number(n)) => Ok(LoxObject::Number(-n)),
            (UnaryOperator::Minus, _) => Err(RuntimeError {
                message: "Operand must be a number.".to_string(),
                span: operator.span,
            }),
        }
    }

    /// Evaluate a property or index read.
    ///
    /// A numeric index on an array instance reads the element storage;
    /// any other index is coerced to a string and treated as a field or
    /// method name. Classes take part as instances of their metaclasses.
    fn get_property(
        &mut self,
        object: &SpanObject,
        index: &SpanObject,
    ) -> Result<LoxObject, RuntimeError> {
        if let (LoxObject::LoxInstance(instance), LoxObject::Number(n)) =
            (&object.value, &index.value)
        {
            let instance = instance.borrow();
            if let Some(values) = instance.array() {
                let idx = check_index("Array", values.len(), *n, index.span)?;
                return Ok(values[idx].clone());
            }
        }

        let name = stringify(self, index)?;
        match &object.value {
            LoxObject::LoxInstance(instance) => {
                LoxInstance::get(instance, &name).ok_or_else(|| RuntimeError {
                    message: format!("Undefined property '{name}'."),
                    span: index.span,
                })
            }
            LoxObject::LoxClass(class) => {
                LoxClass::get_static(class, &name).ok_or_else(|| RuntimeError {
                    message: format!("Undefined property '{name}'."),
                    span: index.span,
                })
            }
            _ => Err(RuntimeError {
                message: "Only instances have properties.".to_string(),
                span: object.span,
            }),
        }
    }

    /// Evaluate a property or index write. The dual of
    /// [`get_property`](Self::get_property); returns the assigned value.
    fn set_property(
        &mut self,
        object: &SpanObject,
        index: &SpanObject,
        value: LoxObject,
    ) -> Result<LoxObject, RuntimeError> {
        if let (LoxObject::LoxInstance(instance), LoxObject::Number(n)) =
            (&object.value, &index.value)
        {
            let mut instance = instance.borrow_mut();
            if let Some(values) = instance.array_mut() {
                let idx = check_index("Array", values.len(), *n, index.span)?;
                values[idx] = value.clone();
                return Ok(value);
            }
        }

        let name = stringify(self, index)?;
        match &object.value {
            LoxObject::LoxInstance(instance) => {
                instance.borrow_mut().set_field(name, value.clone());
                Ok(value)
            }
            LoxObject::LoxClass(class) => {
                class.set_static(name, value.clone());
                Ok(value)
            }
            _ => Err(RuntimeError {
                message: "Only instances have fields.".to_string(),
                span: object.span,
            }),
        }
    }

    /// Evaluate a `super.method` expression.
    ///
    /// The resolver recorded the depth of the `super` binding; `this` always
    /// lives one environment below it. For static methods `super` is the
    /// superclass's metaclass and `this` is the class itself.
    fn evaluate_super(
        &mut self,
        span: Span,
        method: &WithSpan<String>,
    ) -> Result<LoxObject, RuntimeError> {
        let key = WithSpan::new(span, "super".to_string());
        let &depth = self
            .locals
            .get(&key)
            .unwrap_or_else(|| panic!("Resolver bug: 'super' at {span:?} was not resolved"));

        let undefined = || RuntimeError {
            message: format!("Undefined property '{}'.", method.value),
            span: method.span,
        };

        let LoxObject::LoxClass(superclass) =
            Environment::get_at_depth(&self.environment, depth, "super")
        else {
            // A static `super` in a subclass of a class with no metaclass.
            return Err(undefined());
        };

        let this_object = Environment::get_at_depth(&self.environment, depth - 1, "this");

        let method_value = superclass
            .find_method(&method.value)
            .ok_or_else(undefined)?;
        Ok(method_value.bind(this_object))
    }
}
