//! This module provides the [`Parser`].

mod exprs;
mod stmts;

use crate::{
    ast::SpanStmt,
    lox::report_token_error,
    tokens::{Token, TokenType},
};
use std::fmt;
use thiserror::Error;

/// An error that occured during parsing.
#[derive(Clone, Debug, PartialEq, Error)]
struct ParseError<'s> {
    /// The token that caused the error.
    token: Token<'s>,

    /// The message to display to the user.
    message: String,
}

impl fmt::Display for ParseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl ParseError<'_> {
    /// Report the parsing error to the user.
    fn report(&self) {
        report_token_error(&self.token, &self.message);
    }
}

/// A result wrapping a [`ParseError`].
type ParseResult<'s, T, E = ParseError<'s>> = ::std::result::Result<T, E>;

/// A recursive descent parser.
///
/// It parses this grammar:
/// ```text
/// program     → declaration* EOF ;
///
/// declaration → classDecl | funDecl | varDecl | statement ;
///
/// classDecl   → "class" IDENTIFIER ( "<" IDENTIFIER )? "{" member* "}" ;
/// member      → "class" function | function ;
/// funDecl     → "fun" function ;
/// function    → IDENTIFIER "(" parameters? ")" block ;
/// parameters  → IDENTIFIER ( "," IDENTIFIER )* ;
/// varDecl     → "var" IDENTIFIER ( "=" expression )? ";" ;
///
/// statement   → ";" | exprStmt | ifStmt | printStmt | returnStmt | whileStmt | forStmt | block ;
/// exprStmt    → expression ";" ;
/// ifStmt      → "if" "(" expression ")" statement ( "else" statement )? ;
/// printStmt   → "print" expression ";" ;
/// returnStmt  → "return" expression? ";" ;
/// whileStmt   → "while" "(" expression ")" statement ;
/// forStmt     → "for" "(" ( varDecl | exprStmt | ";" ) expression? ";" expression? ")" statement ;
/// block       → "{" declaration* "}" ;
///
/// expression  → assignment ;
/// assignment  → ( call "." IDENTIFIER | call "[" expression "]" | IDENTIFIER ) assignOp assignment
///             | logic_or ;
/// assignOp    → "=" | "+=" | "-=" | "*=" | "/=" ;
/// logic_or    → logic_and ( "or" logic_and )* ;
/// logic_and   → equality ( "and" equality )* ;
/// equality    → comparison ( ( "!=" | "==" ) comparison )* ;
/// comparison  → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
/// term        → factor ( ( "-" | "+" ) factor )* ;
/// factor      → unary ( ( "/" | "*" ) unary )* ;
/// unary       → ( "!" | "-" ) unary | funExpr ;
/// funExpr     → "fun" "(" parameters? ")" block | call ;
/// call        → primary ( "(" arguments? ")" | "." IDENTIFIER | "[" expression "]" )* ;
/// arguments   → expression ( "," expression )* ;
/// primary     → NUMBER | STRING | "true" | "false" | "nil" | "this"
///             | "super" "." IDENTIFIER | "(" expression ")"
///             | "[" ( expression ( "," expression )* )? "]" | IDENTIFIER ;
/// ```
pub struct Parser<'s> {
    /// The token list that we're parsing.
    tokens: Vec<Token<'s>>,

    /// The index of the token currently being considered.
    current: usize,

    /// The statements that have been parsed by the parser.
    statements: Vec<SpanStmt>,
}

impl<'s> Parser<'s> {
    /// Parse the given list of tokens.
    pub fn parse(tokens: Vec<Token<'s>>) -> Vec<SpanStmt> {
        let mut parser = Self {
            tokens,
            current: 0,
            statements: vec![],
        };

        parser.parse_program();
        parser.statements
    }

    /// Get the current token.
    #[inline]
    fn peek(&self) -> Option<&Token<'s>> {
        self.tokens.get(self.current)
    }

    /// Get the previous token.
    #[inline]
    fn previous(&self) -> Option<&Token<'s>> {
        self.tokens.get(self.current.saturating_sub(1))
    }

    /// Are we at the end of the token list?
    #[inline]
    fn is_at_end(&self) -> bool {
        self.check(TokenType::Eof)
    }

    /// Advance the internal pointer and get the next token.
    fn advance(&mut self) -> Token<'s> {
        if !self.is_at_end() {
            self.current += 1;
        }
        *self.previous().unwrap()
    }

    /// Check if the next token is of the given type.
    #[inline]
    fn check(&self, token_type: TokenType) -> bool {
        self.peek().is_some_and(|t| t.token_type == token_type)
    }

    /// Check if the token after the next one is of the given type.
    #[inline]
    fn check_next(&self, token_type: TokenType) -> bool {
        self.tokens
            .get(self.current + 1)
            .is_some_and(|t| t.token_type == token_type)
    }

    /// Check if the next token is of one of the given types and advance if it is.
    fn match_tokens(&mut self, token_types: impl IntoIterator<Item = TokenType>) -> bool {
        for token_type in token_types {
            if self.check(token_type) {
                self.advance();
                return true;
            }
        }

        false
    }

    /// Expect the next token to be of the given type and return it if so, or
    /// return an error with the given message if the check fails.
    fn consume(&mut self, token_type: TokenType, message: &str) -> ParseResult<'s, Token<'s>> {
        if self.check(token_type) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message))
        }
    }

    /// Build a [`ParseError`] pointing at the current token.
    fn error_at_current(&self, message: &str) -> ParseError<'s> {
        let token = *self.peek().unwrap_or_else(|| self.previous().unwrap());
        ParseError {
            token,
            message: message.to_string(),
        }
    }

    /// Synchronize the parser to an assumed correct state after an error:
    /// discard tokens until just after a semicolon or just before a token
    /// that can start a declaration.
    fn synchronize(&mut self) {
        use TokenType::*;

        self.advance();

        while !self.is_at_end() {
            if self.previous().is_some_and(|t| t.token_type == Semicolon) {
                return;
            }

            match self.peek().map(|t| t.token_type) {
                Some(Class | Fun | Var | For | If | While | Print | Return) => return,
                _ => {}
            }

            self.advance();
        }
    }

    /// program → declaration* EOF ;
    fn parse_program(&mut self) {
        while !self.is_at_end() {
            if let Some(stmt) = self.parse_declaration() {
                self.statements.push(stmt);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pretty_printers::ParenPrinter, scanner::Scanner};

    /// Parse the code and pretty-print the resulting AST.
    fn parse_to_string(code: &str) -> String {
        ParenPrinter::print_stmts(&Parser::parse(Scanner::scan_tokens(code)))
    }

    #[test]
    fn precedence() {
        assert_eq!(parse_to_string("print 1 + 2 * 3;"), "print (+ 1 (* 2 3));");
        assert_eq!(
            parse_to_string("print (5 - (3.2 / 1)) + -1;"),
            "print (+ (group (- 5 (group (/ 3.2 1)))) (- 1));"
        );
        assert_eq!(
            parse_to_string("print 1 < 2 == true and !false or nil;"),
            "print (or (and (== (< 1 2) true) (! false)) nil);"
        );
    }

    #[test]
    fn for_loop_desugars_to_while() {
        assert_eq!(
            parse_to_string("for (var i = 0; i < 3; i = i + 1) print i;"),
            "{ var i = 0; while (< i 3) { print i; (assign i (+ i 1)); } }"
        );
        assert_eq!(parse_to_string("for (;;) print 1;"), "while true print 1;");
    }

    #[test]
    fn augmented_assignment_desugars_to_binary() {
        assert_eq!(
            parse_to_string("x += 1;"),
            "(assign x (+ x 1));"
        );
        assert_eq!(
            parse_to_string("a.b *= 2;"),
            "(set (get a \"b\") (* (get a \"b\") 2));"
        );
        assert_eq!(
            parse_to_string("a[0] -= 2;"),
            "(set (get a 0) (- (get a 0) 2));"
        );
    }

    #[test]
    fn property_access_lowers_to_string_index() {
        assert_eq!(parse_to_string("a.b.c;"), "(get (get a \"b\") \"c\");");
        assert_eq!(parse_to_string("a[1 + 2];"), "(get a (+ 1 2));");
        assert_eq!(parse_to_string("a.b = 3;"), "(set (get a \"b\") 3);");
    }

    #[test]
    fn array_literals() {
        assert_eq!(parse_to_string("[];"), "(array);");
        assert_eq!(
            parse_to_string("[1, \"two\", [3]];"),
            "(array 1 \"two\" (array 3));"
        );
    }

    #[test]
    fn function_expressions() {
        assert_eq!(
            parse_to_string("var f = fun (a, b) { return a; };"),
            "var f = (fun (a, b) { return a; });"
        );
        // A `fun (` at statement level is an expression statement, not a
        // malformed declaration.
        assert_eq!(
            parse_to_string("fun (v) { print v; };"),
            "(fun (v) { print v; });"
        );
        assert_eq!(
            parse_to_string("a.foreach(fun (v, i) { print v; });"),
            "(call (get a \"foreach\") (fun (v, i) { print v; }));"
        );
    }

    #[test]
    fn class_declarations() {
        assert_eq!(
            parse_to_string("class A < B { m(x) { return x; } class s() { return 1; } }"),
            "class A < B { m(x) { return x; } class s() { return 1; } }"
        );
    }

    #[test]
    fn super_and_this() {
        assert_eq!(
            parse_to_string("class B < A { m() { super.m(); print this; } }"),
            "class B < A { m() { (call (super m)); print this; } }"
        );
    }

    #[test]
    fn calls_and_arguments() {
        assert_eq!(parse_to_string("f();"), "(call f);");
        assert_eq!(parse_to_string("f(1, 2)(3);"), "(call (call f 1 2) 3);");
        assert_eq!(parse_to_string("a.m(1);"), "(call (get a \"m\") 1);");
    }

    #[test]
    fn statement_count_matches_declarations() {
        let stmts = Parser::parse(Scanner::scan_tokens(
            "var a = 1; print a; { a = 2; } if (a) print a; while (false) {} fun f() {} class C {}",
        ));
        assert_eq!(stmts.len(), 7);
    }
}
