//! This module lets the [`Parser`] parse statements.

use super::{ParseResult, Parser};
use crate::{
    ast::{ClassDecl, Expr, FunDecl, SpanExpr, SpanStmt, Stmt},
    lox::{report_error_at, report_token_error},
    span::WithSpan,
    tokens::TokenType,
};
use std::fmt;

/// The kind of function declaration being parsed, for error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FunDeclKind {
    /// A free function.
    Function,

    /// A method in a class.
    Method,

    /// A `class`-prefixed method in a class.
    StaticMethod,
}

impl fmt::Display for FunDeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Function => "function",
                Self::Method => "method",
                Self::StaticMethod => "static method",
            }
        )
    }
}

impl<'s> Parser<'s> {
    /// declaration → classDecl | funDecl | varDecl | statement ;
    ///
    /// A `fun` immediately followed by `(` is not a declaration but an
    /// anonymous function expression at the start of an expression statement,
    /// so it falls through to `parse_statement`.
    pub(super) fn parse_declaration(&mut self) -> Option<SpanStmt> {
        let result = if self.match_tokens([TokenType::Class]) {
            self.parse_class_decl()
        } else if self.check(TokenType::Fun) && !self.check_next(TokenType::LeftParen) {
            self.advance();
            self.parse_function(FunDeclKind::Function)
                .map(|WithSpan { span, value }| WithSpan::new(span, Stmt::FunDecl(value)))
        } else if self.match_tokens([TokenType::Var]) {
            self.parse_var_decl()
        } else {
            self.parse_statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(error) => {
                error.report();
                self.synchronize();
                None
            }
        }
    }

    /// function → IDENTIFIER "(" parameters? ")" block ;
    fn parse_function(&mut self, kind: FunDeclKind) -> ParseResult<'s, WithSpan<FunDecl>> {
        let name_token = self.consume(TokenType::Identifier, &format!("Expected {kind} name"))?;
        let name = WithSpan::new(name_token.span, name_token.lexeme.to_string());
        let mut span = name.span;

        self.consume(TokenType::LeftParen, &format!("Expected '(' after {kind} name"))?;
        let params = self.parse_parameters(&kind.to_string())?;
        self.consume(
            TokenType::RightParen,
            &format!("Expected ')' after {kind} parameters"),
        )?;

        if kind == FunDeclKind::StaticMethod && name.value == "init" && !params.is_empty() {
            report_error_at(name.span, &name.value, "The static 'init' method cannot have parameters");
        }

        self.consume(
            TokenType::LeftBrace,
            &format!("Expected '{{' before {kind} body"),
        )?;
        let body = self.parse_block()?;
        span.mut_union(&body.span);

        Ok(WithSpan::new(
            span,
            FunDecl {
                name,
                params,
                body: body.value,
            },
        ))
    }

    /// parameters → IDENTIFIER ( "," IDENTIFIER )* ;
    ///
    /// Stops before the closing paren, which the caller consumes. More than
    /// 255 parameters is reported but does not abort the parse.
    pub(super) fn parse_parameters(
        &mut self,
        kind: &str,
    ) -> ParseResult<'s, Vec<WithSpan<String>>> {
        let mut parameters: Vec<WithSpan<String>> = Vec::new();
        let mut reported_max_params_error = false;

        if !self.check(TokenType::RightParen) {
            loop {
                if parameters.len() >= 255 && !reported_max_params_error {
                    report_token_error(
                        self.peek().unwrap(),
                        &format!("Cannot have more than 255 parameters in a {kind} declaration"),
                    );
                    reported_max_params_error = true;
                }

                let token = self.consume(TokenType::Identifier, "Expected parameter name")?;
                parameters.push(WithSpan::new(token.span, token.lexeme.to_string()));

                if !self.match_tokens([TokenType::Comma]) {
                    break;
                }
            }
        }

        Ok(parameters)
    }

    /// classDecl → "class" IDENTIFIER ( "<" IDENTIFIER )? "{" member* "}" ;
    /// member → "class" function | function ;
    fn parse_class_decl(&mut self) -> ParseResult<'s, SpanStmt> {
        let mut span = self.previous().unwrap().span;

        let name_token =
            self.consume(TokenType::Identifier, "Expected identifier after 'class' keyword")?;
        let name = WithSpan::new(name_token.span, name_token.lexeme.to_string());

        let superclass = if self.match_tokens([TokenType::Less]) {
            let token =
                self.consume(TokenType::Identifier, "Expected superclass name after '<'")?;
            Some(WithSpan::new(token.span, token.lexeme.to_string()))
        } else {
            None
        };

        self.consume(TokenType::LeftBrace, "Expected '{' before class body")?;

        let mut methods = Vec::new();
        let mut static_methods = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            if self.match_tokens([TokenType::Class]) {
                static_methods.push(self.parse_function(FunDeclKind::StaticMethod)?);
            } else {
                methods.push(self.parse_function(FunDeclKind::Method)?);
            }
        }

        let right_brace = self.consume(TokenType::RightBrace, "Expected '}' after class body")?;
        span.mut_union(&right_brace.span);

        Ok(WithSpan::new(
            span,
            Stmt::ClassDecl(ClassDecl {
                name,
                superclass,
                methods,
                static_methods,
            }),
        ))
    }

    /// varDecl → "var" IDENTIFIER ( "=" expression )? ";" ;
    fn parse_var_decl(&mut self) -> ParseResult<'s, SpanStmt> {
        let mut span = self.previous().unwrap().span;

        let name_token = self.consume(
            TokenType::Identifier,
            "Expected variable name after 'var' keyword",
        )?;
        let name = WithSpan::new(name_token.span, name_token.lexeme.to_string());

        let initializer = if self.match_tokens([TokenType::Equal]) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let semicolon = self.consume(
            TokenType::Semicolon,
            "Expected ';' after variable declaration",
        )?;
        span.mut_union(&semicolon.span);

        Ok(WithSpan::new(span, Stmt::VarDecl(name, initializer)))
    }

    /// statement → ";" | exprStmt | ifStmt | printStmt | returnStmt | whileStmt | forStmt | block ;
    fn parse_statement(&mut self) -> ParseResult<'s, SpanStmt> {
        if self.match_tokens([TokenType::Semicolon]) {
            // An empty statement is an empty block.
            let span = self.previous().unwrap().span;
            Ok(WithSpan::new(span, Stmt::Block(vec![])))
        } else if self.match_tokens([TokenType::If]) {
            self.parse_if_statement()
        } else if self.match_tokens([TokenType::Print]) {
            self.parse_print_statement()
        } else if self.match_tokens([TokenType::Return]) {
            self.parse_return_statement()
        } else if self.match_tokens([TokenType::While]) {
            self.parse_while_loop()
        } else if self.match_tokens([TokenType::For]) {
            self.parse_for_loop()
        } else if self.match_tokens([TokenType::LeftBrace]) {
            self.parse_block()
                .map(|WithSpan { span, value }| WithSpan::new(span, Stmt::Block(value)))
        } else {
            self.parse_expr_statement()
        }
    }

    /// exprStmt → expression ";" ;
    fn parse_expr_statement(&mut self) -> ParseResult<'s, SpanStmt> {
        let expr = self.parse_expression()?;
        let semicolon = self.consume(TokenType::Semicolon, "Expected ';' after expression")?;

        let span = expr.span.union(&semicolon.span);
        Ok(WithSpan::new(span, Stmt::Expression(expr)))
    }

    /// ifStmt → "if" "(" expression ")" statement ( "else" statement )? ;
    fn parse_if_statement(&mut self) -> ParseResult<'s, SpanStmt> {
        let mut span = self.previous().unwrap().span;

        self.consume(TokenType::LeftParen, "Expected '(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after if condition")?;

        let then_branch = self.parse_statement()?;
        span.mut_union(&then_branch.span);

        let else_branch = if self.match_tokens([TokenType::Else]) {
            let stmt = self.parse_statement()?;
            span.mut_union(&stmt.span);
            Some(Box::new(stmt))
        } else {
            None
        };

        Ok(WithSpan::new(
            span,
            Stmt::If(condition, Box::new(then_branch), else_branch),
        ))
    }

    /// printStmt → "print" expression ";" ;
    fn parse_print_statement(&mut self) -> ParseResult<'s, SpanStmt> {
        let mut span = self.previous().unwrap().span;

        let expr = self.parse_expression()?;
        let semicolon = self.consume(TokenType::Semicolon, "Expected ';' after value")?;
        span.mut_union(&semicolon.span);

        Ok(WithSpan::new(span, Stmt::Print(expr)))
    }

    /// returnStmt → "return" expression? ";" ;
    fn parse_return_statement(&mut self) -> ParseResult<'s, SpanStmt> {
        let keyword_span = self.previous().unwrap().span;

        let expr = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        let semicolon = self.consume(TokenType::Semicolon, "Expected ';' after return value")?;

        Ok(WithSpan::new(
            keyword_span.union(&semicolon.span),
            Stmt::Return(keyword_span, expr),
        ))
    }

    /// whileStmt → "while" "(" expression ")" statement ;
    fn parse_while_loop(&mut self) -> ParseResult<'s, SpanStmt> {
        let mut span = self.previous().unwrap().span;

        self.consume(TokenType::LeftParen, "Expected '(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after while condition")?;

        let body = self.parse_statement()?;
        span.mut_union(&body.span);

        Ok(WithSpan::new(span, Stmt::While(condition, Box::new(body))))
    }

    /// forStmt → "for" "(" ( varDecl | exprStmt | ";" ) expression? ";" expression? ")" statement ;
    ///
    /// This method desugars the for loop to a [while loop](Stmt::While): the
    /// increment is appended to the body, a missing condition becomes literal
    /// `true`, and the initializer wraps the loop in an outer block.
    fn parse_for_loop(&mut self) -> ParseResult<'s, SpanStmt> {
        let for_span = self.previous().unwrap().span;

        self.consume(TokenType::LeftParen, "Expected '(' after 'for'")?;

        let initializer: Option<SpanStmt> = if self.match_tokens([TokenType::Semicolon]) {
            None
        } else if self.match_tokens([TokenType::Var]) {
            Some(self.parse_var_decl()?)
        } else {
            Some(self.parse_expr_statement()?)
        };

        let condition: Option<SpanExpr> = if !self.check(TokenType::Semicolon) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let cond_semicolon =
            self.consume(TokenType::Semicolon, "Expected ';' after for loop condition")?;

        let increment = if !self.check(TokenType::RightParen) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume(TokenType::RightParen, "Expected ')' after for loop clauses")?;

        let mut body = self.parse_statement()?;
        let full_span = for_span.union(&body.span);

        if let Some(increment) = increment {
            let increment = WithSpan::new(increment.span, Stmt::Expression(increment));
            body = WithSpan::new(
                body.span.union(&increment.span),
                Stmt::Block(vec![body, increment]),
            );
        }

        let condition = condition
            .unwrap_or_else(|| WithSpan::new(cond_semicolon.span, Expr::Boolean(true)));
        body = WithSpan::new(
            body.span.union(&condition.span),
            Stmt::While(condition, Box::new(body)),
        );

        if let Some(initializer) = initializer {
            body = WithSpan::new(
                initializer.span.union(&body.span),
                Stmt::Block(vec![initializer, body]),
            );
        }

        body.span = full_span;

        Ok(body)
    }

    /// block → "{" declaration* "}" ;
    ///
    /// This function does not return a [`Stmt::Block`] but just the span of
    /// the block including braces, and the statements inside the block. The
    /// caller wraps it into a [`Stmt::Block`] or a function body as needed.
    pub(super) fn parse_block(&mut self) -> ParseResult<'s, WithSpan<Vec<SpanStmt>>> {
        let mut stmts = Vec::new();
        let mut span = self.previous().unwrap().span;

        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.parse_declaration() {
                span.mut_union(&stmt.span);
                stmts.push(stmt);
            }
        }

        let right_brace = self.consume(TokenType::RightBrace, "Expected '}' after block")?;
        span.mut_union(&right_brace.span);

        Ok(WithSpan::new(span, stmts))
    }
}
