//! This module provides a pretty-printer for the AST.

use crate::ast::{Expr, FunDecl, SpanExpr, SpanStmt, Stmt};

/// Pretty-print the AST in a Lisp-like form with clarifying parentheses.
///
/// Used by debug logging and as the test oracle for the parser.
pub struct ParenPrinter;

impl ParenPrinter {
    /// Print the statements, one per line.
    pub fn print_stmts(stmts: &[SpanStmt]) -> String {
        stmts
            .iter()
            .map(Self::print_stmt)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Print a single statement.
    pub fn print_stmt(stmt: &SpanStmt) -> String {
        match &stmt.value {
            Stmt::Expression(expr) => format!("{};", Self::print_expr(expr)),
            Stmt::Print(expr) => format!("print {};", Self::print_expr(expr)),
            Stmt::Return(_, Some(expr)) => format!("return {};", Self::print_expr(expr)),
            Stmt::Return(_, None) => "return;".to_string(),
            Stmt::VarDecl(name, Some(init)) => {
                format!("var {} = {};", name.value, Self::print_expr(init))
            }
            Stmt::VarDecl(name, None) => format!("var {};", name.value),
            Stmt::FunDecl(decl) => format!("fun {}", Self::print_fun_decl(decl)),
            Stmt::ClassDecl(class) => {
                let superclass = class
                    .superclass
                    .as_ref()
                    .map(|name| format!(" < {}", name.value))
                    .unwrap_or_default();

                let members: Vec<String> = class
                    .methods
                    .iter()
                    .map(|method| Self::print_fun_decl(method))
                    .chain(
                        class
                            .static_methods
                            .iter()
                            .map(|method| format!("class {}", Self::print_fun_decl(method))),
                    )
                    .collect();

                if members.is_empty() {
                    format!("class {}{superclass} {{}}", class.name.value)
                } else {
                    format!(
                        "class {}{superclass} {{ {} }}",
                        class.name.value,
                        members.join(" ")
                    )
                }
            }
            Stmt::Block(stmts) => Self::print_block(stmts),
            Stmt::If(condition, then_branch, else_branch) => {
                let mut text = format!(
                    "if {} {}",
                    Self::print_expr(condition),
                    Self::print_stmt(then_branch)
                );
                if let Some(else_branch) = else_branch {
                    text.push_str(&format!(" else {}", Self::print_stmt(else_branch)));
                }
                text
            }
            Stmt::While(condition, body) => format!(
                "while {} {}",
                Self::print_expr(condition),
                Self::print_stmt(body)
            ),
        }
    }

    /// Print a single expression.
    pub fn print_expr(expr: &SpanExpr) -> String {
        match &expr.value {
            Expr::Nil => "nil".to_string(),
            Expr::Boolean(b) => b.to_string(),
            Expr::Number(n) => n.to_string(),
            Expr::String(s) => format!("{s:?}"),
            Expr::Array(elements) => {
                Self::print_parenthesized("array", elements.iter().map(Self::print_expr))
            }
            Expr::Binary(left, operator, right) => Self::print_parenthesized(
                &operator.value.to_string(),
                [Self::print_expr(left), Self::print_expr(right)],
            ),
            Expr::Logical(left, operator, right) => Self::print_parenthesized(
                &operator.value.to_string(),
                [Self::print_expr(left), Self::print_expr(right)],
            ),
            Expr::Unary(operator, operand) => Self::print_parenthesized(
                &operator.value.to_string(),
                [Self::print_expr(operand)],
            ),
            Expr::Grouping(inner) => {
                Self::print_parenthesized("group", [Self::print_expr(inner)])
            }
            Expr::Variable(name) => name.clone(),
            Expr::Assign(name, value) => Self::print_parenthesized(
                "assign",
                [name.value.clone(), Self::print_expr(value)],
            ),
            Expr::Call(callee, arguments, _) => Self::print_parenthesized(
                "call",
                std::iter::once(Self::print_expr(callee))
                    .chain(arguments.iter().map(Self::print_expr)),
            ),
            Expr::Get(object, index) => Self::print_parenthesized(
                "get",
                [Self::print_expr(object), Self::print_expr(index)],
            ),
            Expr::Set(object, index, value) => {
                let target = Self::print_parenthesized(
                    "get",
                    [Self::print_expr(object), Self::print_expr(index)],
                );
                Self::print_parenthesized("set", [target, Self::print_expr(value)])
            }
            Expr::This => "this".to_string(),
            Expr::Super(method) => {
                Self::print_parenthesized("super", [method.value.clone()])
            }
            Expr::Function(params, body) => {
                let params: Vec<String> =
                    params.iter().map(|param| param.value.clone()).collect();
                format!("(fun ({}) {})", params.join(", "), Self::print_block(body))
            }
        }
    }

    /// Print a function or method declaration without its leading keyword.
    fn print_fun_decl(decl: &FunDecl) -> String {
        let params: Vec<String> = decl.params.iter().map(|param| param.value.clone()).collect();
        format!(
            "{}({}) {}",
            decl.name.value,
            params.join(", "),
            Self::print_block(&decl.body)
        )
    }

    /// Print a block of statements on a single line.
    fn print_block(stmts: &[SpanStmt]) -> String {
        if stmts.is_empty() {
            "{}".to_string()
        } else {
            let stmts: Vec<String> = stmts.iter().map(Self::print_stmt).collect();
            format!("{{ {} }}", stmts.join(" "))
        }
    }

    /// Print `(head item item ...)`, or `(head)` with no items.
    fn print_parenthesized(
        head: &str,
        items: impl IntoIterator<Item = String>,
    ) -> String {
        let items: Vec<String> = items.into_iter().collect();
        if items.is_empty() {
            format!("({head})")
        } else {
            format!("({head} {})", items.join(" "))
        }
    }
}
