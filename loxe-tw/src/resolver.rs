//! This module provides the [`Resolver`].

use loxe_lib::{
    ast::{ClassDecl, Expr, FunDecl, SpanExpr, SpanStmt, Stmt},
    span::WithSpan,
};
use std::{collections::HashMap, fmt, mem};
use thiserror::Error;

/// An error that occurred whilst resolving.
#[derive(Clone, Debug, PartialEq, Error)]
pub struct ResolveError {
    /// The name or keyword the error is about.
    pub token: WithSpan<String>,

    /// The error message.
    pub message: String,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResolveError({:?})", self.message)
    }
}

/// A result wrapping a [`ResolveError`].
type Result<T = (), E = ResolveError> = ::std::result::Result<T, E>;

/// The kind of function the [`Resolver`] is currently inside. Used to detect
/// badly placed return statements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FunctionType {
    /// Not in a function.
    None,

    /// In a free function or function expression.
    Function,

    /// In the `init` method of a class.
    Initializer,

    /// In any other method on a class.
    Method,
}

/// The kind of class the [`Resolver`] is currently inside. Used to detect
/// badly placed `this` and `super` expressions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ClassType {
    /// Not inside a class.
    None,

    /// Inside a class with no superclass.
    Class,

    /// Inside a class with a superclass.
    Subclass,
}

/// A type to handle resolving and binding names before runtime.
///
/// Every use of a name in a local scope gets an entry in the `locals` map,
/// keyed by the name and its span - the span makes the key unique per
/// expression, which is what lets the interpreter look the depth back up.
/// Uses with no entry are globals.
#[derive(Clone, Debug)]
pub struct Resolver {
    /// A stack of local scopes mapping names to whether they've been defined
    /// yet. The global scope is not tracked.
    scopes: Vec<HashMap<String, bool>>,

    /// The side table from a name use to its environment depth.
    locals: HashMap<WithSpan<String>, usize>,

    /// The kind of function that we're currently inside.
    current_function: FunctionType,

    /// The kind of class that we're currently inside.
    current_class: ClassType,
}

impl Resolver {
    /// Resolve the given code and get the map of local names to their depths.
    ///
    /// Stops at the first error.
    pub fn get_locals_map(
        stmts: &[SpanStmt],
    ) -> Result<HashMap<WithSpan<String>, usize>, ResolveError> {
        let mut resolver = Self::new();
        resolver.resolve_stmts(stmts)?;
        Ok(resolver.locals)
    }

    /// Create a new Resolver.
    fn new() -> Self {
        Self {
            scopes: Vec::new(),
            locals: HashMap::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Resolve a list of statements.
    fn resolve_stmts(&mut self, stmts: &[SpanStmt]) -> Result {
        for stmt in stmts {
            self.resolve_stmt(stmt)?;
        }

        Ok(())
    }

    /// Resolve a single statement.
    fn resolve_stmt(&mut self, stmt: &SpanStmt) -> Result {
        match &stmt.value {
            Stmt::Block(body) => {
                self.begin_scope();
                self.resolve_stmts(body)?;
                self.end_scope();
            }
            Stmt::ClassDecl(class) => self.resolve_class(class)?,
            Stmt::VarDecl(name, initializer) => {
                self.declare_name(name)?;
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer)?;
                }
                self.define_name(&name.value);
            }
            Stmt::FunDecl(decl) => {
                self.declare_name(&decl.name)?;
                self.define_name(&decl.name.value);
                self.resolve_function(decl, FunctionType::Function)?;
            }
            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr)?,
            Stmt::Return(keyword_span, expr) => {
                if self.current_function == FunctionType::None {
                    return Err(ResolveError {
                        token: WithSpan::new(*keyword_span, "return".to_string()),
                        message: "Cannot return outside of a function".to_string(),
                    });
                }

                if let Some(expr) = expr {
                    if self.current_function == FunctionType::Initializer {
                        return Err(ResolveError {
                            token: WithSpan::new(*keyword_span, "return".to_string()),
                            message: "Cannot return a value from an initializer".to_string(),
                        });
                    }
                    self.resolve_expr(expr)?;
                }
            }
            Stmt::If(condition, then_branch, else_branch) => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch)?;
                }
            }
            Stmt::While(condition, body) => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)?;
            }
        }

        Ok(())
    }

    /// Resolve a single expression.
    fn resolve_expr(&mut self, expr: &SpanExpr) -> Result {
        match &expr.value {
            Expr::Variable(name) => {
                if self
                    .scopes
                    .last()
                    .is_some_and(|scope| scope.get(name) == Some(&false))
                {
                    return Err(ResolveError {
                        token: WithSpan::new(expr.span, name.clone()),
                        message: "Can't read local variable in its own initializer".to_string(),
                    });
                }

                self.resolve_local(WithSpan::new(expr.span, name.clone()));
            }
            Expr::Assign(name, value) => {
                self.resolve_expr(value)?;
                self.resolve_local(name.clone());
            }
            Expr::Binary(left, _, right) | Expr::Logical(left, _, right) => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }
            Expr::Call(callee, arguments, _) => {
                self.resolve_expr(callee)?;
                for argument in arguments {
                    self.resolve_expr(argument)?;
                }
            }
            Expr::Get(object, index) => {
                self.resolve_expr(object)?;
                self.resolve_expr(index)?;
            }
            Expr::Set(object, index, value) => {
                self.resolve_expr(value)?;
                self.resolve_expr(object)?;
                self.resolve_expr(index)?;
            }
            Expr::This => {
                if self.current_class == ClassType::None {
                    return Err(ResolveError {
                        token: WithSpan::new(expr.span, "this".to_string()),
                        message: "Cannot use 'this' outside of a class".to_string(),
                    });
                }
                self.resolve_local(WithSpan::new(expr.span, "this".to_string()));
            }
            Expr::Super(_) => {
                match self.current_class {
                    ClassType::None => {
                        return Err(ResolveError {
                            token: WithSpan::new(expr.span, "super".to_string()),
                            message: "Cannot use 'super' outside of a class".to_string(),
                        });
                    }
                    ClassType::Class => {
                        return Err(ResolveError {
                            token: WithSpan::new(expr.span, "super".to_string()),
                            message: "Cannot use 'super' in a class with no superclass"
                                .to_string(),
                        });
                    }
                    ClassType::Subclass => {}
                }
                self.resolve_local(WithSpan::new(expr.span, "super".to_string()));
            }
            Expr::Grouping(inner) | Expr::Unary(_, inner) => self.resolve_expr(inner)?,
            Expr::Array(elements) => {
                for element in elements {
                    self.resolve_expr(element)?;
                }
            }
            Expr::Function(params, body) => {
                self.resolve_function_parts(params, body, FunctionType::Function)?;
            }
            Expr::Nil | Expr::Boolean(_) | Expr::Number(_) | Expr::String(_) => (),
        }

        Ok(())
    }

    /// Resolve a class declaration.
    ///
    /// When the class has a superclass, a scope containing `super` wraps the
    /// scope containing `this`, matching the environments the interpreter
    /// builds around method closures. Static methods resolve in the same
    /// scope shape; at runtime their `super` is the superclass's metaclass.
    fn resolve_class(&mut self, class: &ClassDecl) -> Result {
        self.declare_name(&class.name)?;
        self.define_name(&class.name.value);

        let enclosing_class = self.current_class;

        if let Some(superclass) = &class.superclass {
            if superclass.value == class.name.value {
                return Err(ResolveError {
                    token: superclass.clone(),
                    message: "A class cannot inherit from itself".to_string(),
                });
            }

            self.current_class = ClassType::Subclass;
            self.resolve_local(superclass.clone());

            self.begin_scope();
            self.scopes
                .last_mut()
                .unwrap()
                .insert("super".to_string(), true);
        } else {
            self.current_class = ClassType::Class;
        }

        self.begin_scope();
        self.scopes
            .last_mut()
            .unwrap()
            .insert("this".to_string(), true);

        let result = self.resolve_class_members(class);

        self.end_scope();
        if class.superclass.is_some() {
            self.end_scope();
        }
        self.current_class = enclosing_class;

        result
    }

    /// Resolve the methods and static methods of a class.
    fn resolve_class_members(&mut self, class: &ClassDecl) -> Result {
        for method in &class.methods {
            let function_type = if method.value.name.value == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(&method.value, function_type)?;
        }

        for method in &class.static_methods {
            self.resolve_function(&method.value, FunctionType::Method)?;
        }

        Ok(())
    }

    /// Begin a new local scope.
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// End a local scope.
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Declare the given name to exist in the current scope, but not yet be
    /// defined. Redeclaring a name in the same local scope is an error.
    fn declare_name(&mut self, name: &WithSpan<String>) -> Result {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.value) {
                return Err(ResolveError {
                    token: name.clone(),
                    message: format!("Already declared variable '{}' in this scope", name.value),
                });
            }
            scope.insert(name.value.clone(), false);
        }
        Ok(())
    }

    /// Define the given name in the current scope.
    fn define_name(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            let defined = scope.get_mut(name).expect(
                "define_name() should only be called after declare_name() with the same name",
            );
            *defined = true;
        }
    }

    /// Resolve a name use by searching the scope stack from innermost
    /// outward, and record its depth in the side table. Names found in no
    /// scope are globals and get no entry.
    fn resolve_local(&mut self, name: WithSpan<String>) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.value) {
                self.locals.insert(name, depth);
                return;
            }
        }
    }

    /// Resolve a function declaration.
    fn resolve_function(&mut self, decl: &FunDecl, function_type: FunctionType) -> Result {
        self.resolve_function_parts(&decl.params, &decl.body, function_type)
    }

    /// Resolve a function's parameters and body in a fresh scope.
    fn resolve_function_parts(
        &mut self,
        params: &[WithSpan<String>],
        body: &[SpanStmt],
        function_type: FunctionType,
    ) -> Result {
        let enclosing_function = mem::replace(&mut self.current_function, function_type);

        self.begin_scope();
        for param in params {
            self.declare_name(param)?;
            self.define_name(&param.value);
        }
        let result = self.resolve_stmts(body);
        self.end_scope();

        self.current_function = enclosing_function;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loxe_lib::{parser::Parser, scanner::Scanner};

    fn resolve(code: &str) -> Result<HashMap<WithSpan<String>, usize>, ResolveError> {
        Resolver::get_locals_map(&Parser::parse(Scanner::scan_tokens(code)))
    }

    /// Get the (name, depth) pairs from a locals map, sorted by span.
    fn depths(locals: &HashMap<WithSpan<String>, usize>) -> Vec<(String, usize)> {
        let mut entries: Vec<_> = locals.iter().collect();
        entries.sort_by_key(|(name, _)| name.span.start);
        entries
            .into_iter()
            .map(|(name, depth)| (name.value.clone(), *depth))
            .collect()
    }

    #[test]
    fn globals_are_not_in_the_side_table() {
        let locals = resolve("var a = 1; print a; a = 2;").unwrap();
        assert!(locals.is_empty());
    }

    #[test]
    fn local_depths() {
        let locals = resolve("{ var a = 1; { print a; } fun f(x) { return x; } }").unwrap();
        assert_eq!(
            depths(&locals),
            vec![("a".to_string(), 1), ("x".to_string(), 0)]
        );
    }

    #[test]
    fn this_and_super_depths() {
        let locals = resolve(
            "class A { m() { return 1; } } class B < A { m() { return super.m() + this.v; } }",
        )
        .unwrap();

        let entries = depths(&locals);
        // The superclass name resolves in the global scope, so it gets no entry.
        assert!(!entries.iter().any(|(name, _)| name == "A"), "{entries:?}");
        assert!(entries.contains(&("super".to_string(), 2)), "{entries:?}");
        assert!(entries.contains(&("this".to_string(), 1)), "{entries:?}");
    }

    #[test]
    fn static_methods_resolve_super() {
        let locals =
            resolve("class A { class m() { return 1; } } class B < A { class s() { return super.m(); } }")
                .unwrap();
        assert!(depths(&locals).contains(&("super".to_string(), 2)));
    }

    #[test]
    fn return_outside_function() {
        let error = resolve("return 1;").unwrap_err();
        assert_eq!(error.message, "Cannot return outside of a function");
    }

    #[test]
    fn return_value_from_initializer() {
        let error = resolve("class C { init() { return 1; } }").unwrap_err();
        assert_eq!(error.message, "Cannot return a value from an initializer");

        // A bare return is allowed in an initializer.
        assert!(resolve("class C { init() { return; } }").is_ok());
    }

    #[test]
    fn this_outside_class() {
        let error = resolve("print this;").unwrap_err();
        assert_eq!(error.message, "Cannot use 'this' outside of a class");

        let error = resolve("fun f() { return this; }").unwrap_err();
        assert_eq!(error.message, "Cannot use 'this' outside of a class");
    }

    #[test]
    fn super_misuse() {
        let error = resolve("print super.m;").unwrap_err();
        assert_eq!(error.message, "Cannot use 'super' outside of a class");

        let error = resolve("class C { m() { return super.m(); } }").unwrap_err();
        assert_eq!(
            error.message,
            "Cannot use 'super' in a class with no superclass"
        );
    }

    #[test]
    fn self_inheritance() {
        let error = resolve("class C < C {}").unwrap_err();
        assert_eq!(error.message, "A class cannot inherit from itself");
    }

    #[test]
    fn read_in_own_initializer() {
        let error = resolve("{ var a = a; }").unwrap_err();
        assert_eq!(
            error.message,
            "Can't read local variable in its own initializer"
        );
    }

    #[test]
    fn duplicate_declaration() {
        let error = resolve("{ var a = 1; var a = 2; }").unwrap_err();
        assert_eq!(error.message, "Already declared variable 'a' in this scope");
    }
}
