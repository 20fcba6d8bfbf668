//! This module handles scanning source code to produce tokens.

use crate::{
    span::Span,
    tokens::{Token, TokenLiteral, TokenType},
};

/// A scanner to get tokens from source code.
pub struct Scanner<'s> {
    /// The source code.
    source: &'s str,

    /// The tokens that we've already scanned out.
    tokens: Vec<Token<'s>>,

    /// An index to the start of the token currently being scanned.
    start: usize,

    /// An index to the byte currently being considered.
    current: usize,
}

impl<'s> Scanner<'s> {
    /// Scan all the tokens from the given source code.
    pub fn scan_tokens(source: &'s str) -> Vec<Token<'s>> {
        let mut scanner = Self {
            source,
            tokens: Vec::new(),
            start: 0,
            current: 0,
        };

        while !scanner.is_at_end() {
            scanner.start = scanner.current;
            scanner.scan_token();
        }

        scanner.tokens.push(Token {
            token_type: TokenType::Eof,
            lexeme: "",
            literal: None,
            span: Span {
                start: scanner.current,
                end: scanner.current,
            },
        });

        scanner.tokens
    }

    /// Are we at the end of the source code?
    #[inline]
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    /// Get the span from the start of this lexeme to the byte most recently consumed.
    #[inline]
    fn current_span(&self) -> Span {
        Span {
            start: self.start,
            end: self.current.saturating_sub(1),
        }
    }

    /// Scan a single token.
    fn scan_token(&mut self) {
        let c = self.advance();

        match c {
            b'(' => self.add_token(TokenType::LeftParen, None),
            b')' => self.add_token(TokenType::RightParen, None),
            b'{' => self.add_token(TokenType::LeftBrace, None),
            b'}' => self.add_token(TokenType::RightBrace, None),
            b'[' => self.add_token(TokenType::LeftBracket, None),
            b']' => self.add_token(TokenType::RightBracket, None),
            b',' => self.add_token(TokenType::Comma, None),
            b'.' => self.add_token(TokenType::Dot, None),
            b';' => self.add_token(TokenType::Semicolon, None),

            b'-' => {
                let token_type = if self.match_byte(b'=') {
                    TokenType::MinusEqual
                } else {
                    TokenType::Minus
                };
                self.add_token(token_type, None);
            }
            b'+' => {
                let token_type = if self.match_byte(b'=') {
                    TokenType::PlusEqual
                } else {
                    TokenType::Plus
                };
                self.add_token(token_type, None);
            }
            b'*' => {
                let token_type = if self.match_byte(b'=') {
                    TokenType::StarEqual
                } else {
                    TokenType::Star
                };
                self.add_token(token_type, None);
            }
            b'/' => {
                if self.match_byte(b'/') {
                    while self.current_byte() != Some(b'\n') && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.match_byte(b'=') {
                    self.add_token(TokenType::SlashEqual, None);
                } else {
                    self.add_token(TokenType::Slash, None);
                }
            }
            b'!' => {
                let token_type = if self.match_byte(b'=') {
                    TokenType::BangEqual
                } else {
                    TokenType::Bang
                };
                self.add_token(token_type, None);
            }
            b'=' => {
                let token_type = if self.match_byte(b'=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                };
                self.add_token(token_type, None);
            }
            b'<' => {
                let token_type = if self.match_byte(b'=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(token_type, None);
            }
            b'>' => {
                let token_type = if self.match_byte(b'=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(token_type, None);
            }

            b' ' | b'\t' | b'\r' | b'\n' => {}

            b'"' => self.scan_string(),

            b'0'..=b'9' => self.scan_number(),

            c if c.is_ascii_alphabetic() || c == b'_' => self.scan_identifier_or_keyword(),

            c => self.report_error(&format!("Unexpected character {:?}.", char::from(c))),
        }
    }

    /// Report the given error message with the current span.
    fn report_error(&self, message: &str) {
        crate::lox::report_scan_error(self.current_span(), message);
    }

    /// Return the byte pointed to by `self.current`.
    #[inline]
    fn current_byte(&self) -> Option<u8> {
        self.source.as_bytes().get(self.current).copied()
    }

    /// Return the byte after the one pointed to by `self.current`.
    #[inline]
    fn next_byte(&self) -> Option<u8> {
        self.source.as_bytes().get(self.current + 1).copied()
    }

    /// Advance the internal pointer and return the byte that was consumed.
    fn advance(&mut self) -> u8 {
        let c = self.source.as_bytes()[self.current];
        self.current += 1;
        c
    }

    /// Add a token with the given token type and literal to the internal token vec.
    fn add_token(&mut self, token_type: TokenType, literal: Option<TokenLiteral<'s>>) {
        let lexeme = &self.source[self.start..self.current];
        self.tokens.push(Token {
            token_type,
            lexeme,
            literal,
            span: self.current_span(),
        });
    }

    /// Conditionally [`advance`](Self::advance) if the next byte is the expected one.
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.current_byte() == Some(expected) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Scan a string literal. Strings may span multiple lines and have no
    /// escape sequences; the literal value is the raw text between the quotes.
    fn scan_string(&mut self) {
        while self.current_byte() != Some(b'"') && !self.is_at_end() {
            self.advance();
        }

        if self.is_at_end() {
            self.report_error("Unterminated string.");
            return;
        }

        // The closing "
        self.advance();

        self.add_token(
            TokenType::String,
            Some(TokenLiteral::String(
                // Trim the surrounding quotes
                &self.source[(self.start + 1)..(self.current - 1)],
            )),
        );
    }

    /// Scan a numeric literal.
    fn scan_number(&mut self) {
        while self.current_byte().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.current_byte() == Some(b'.') && self.next_byte().is_some_and(|c| c.is_ascii_digit())
        {
            self.advance();
            while self.current_byte().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        self.add_token(
            TokenType::Number,
            Some(TokenLiteral::Number(
                self.source[self.start..self.current].parse().unwrap(),
            )),
        );
    }

    /// Scan a single identifier or keyword.
    fn scan_identifier_or_keyword(&mut self) {
        while self
            .current_byte()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.advance();
        }

        let token_type = match &self.source[self.start..self.current] {
            "and" => TokenType::And,
            "class" => TokenType::Class,
            "else" => TokenType::Else,
            "false" => TokenType::False,
            "for" => TokenType::For,
            "fun" => TokenType::Fun,
            "if" => TokenType::If,
            "nil" => TokenType::Nil,
            "or" => TokenType::Or,
            "print" => TokenType::Print,
            "return" => TokenType::Return,
            "super" => TokenType::Super,
            "this" => TokenType::This,
            "true" => TokenType::True,
            "var" => TokenType::Var,
            "while" => TokenType::While,
            _ => TokenType::Identifier,
        };

        self.add_token(token_type, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenType::*;

    fn scan<'s>(code: &'s str) -> Vec<(TokenType, &'s str, Option<TokenLiteral<'s>>)> {
        Scanner::scan_tokens(code)
            .into_iter()
            .map(|token| (token.token_type, token.lexeme, token.literal))
            .collect()
    }

    #[test]
    fn identifiers() {
        let scanned = scan("andy formless fo _ _123 _abc ab123");

        assert_eq!(
            scanned,
            vec![
                (Identifier, "andy", None),
                (Identifier, "formless", None),
                (Identifier, "fo", None),
                (Identifier, "_", None),
                (Identifier, "_123", None),
                (Identifier, "_abc", None),
                (Identifier, "ab123", None),
                (Eof, "", None),
            ]
        );
    }

    #[test]
    fn keywords() {
        let scanned =
            scan("and class else false for fun if nil or print return super this true var while");

        assert_eq!(
            scanned,
            vec![
                (And, "and", None),
                (Class, "class", None),
                (Else, "else", None),
                (False, "false", None),
                (For, "for", None),
                (Fun, "fun", None),
                (If, "if", None),
                (Nil, "nil", None),
                (Or, "or", None),
                (Print, "print", None),
                (Return, "return", None),
                (Super, "super", None),
                (This, "this", None),
                (True, "true", None),
                (Var, "var", None),
                (While, "while", None),
                (Eof, "", None),
            ]
        );
    }

    #[test]
    fn numbers() {
        let scanned = scan("123\n123.456\n.456\n123.");

        assert_eq!(
            scanned,
            vec![
                (Number, "123", Some(TokenLiteral::Number(123.0))),
                (Number, "123.456", Some(TokenLiteral::Number(123.456))),
                (Dot, ".", None),
                (Number, "456", Some(TokenLiteral::Number(456.0))),
                (Number, "123", Some(TokenLiteral::Number(123.0))),
                (Dot, ".", None),
                (Eof, "", None),
            ]
        );
    }

    #[test]
    fn punctuators() {
        let scanned = scan("(){}[];,!===<=>=!=<>/.");

        assert_eq!(
            scanned,
            vec![
                (LeftParen, "(", None),
                (RightParen, ")", None),
                (LeftBrace, "{", None),
                (RightBrace, "}", None),
                (LeftBracket, "[", None),
                (RightBracket, "]", None),
                (Semicolon, ";", None),
                (Comma, ",", None),
                (BangEqual, "!=", None),
                (EqualEqual, "==", None),
                (LessEqual, "<=", None),
                (GreaterEqual, ">=", None),
                (BangEqual, "!=", None),
                (Less, "<", None),
                (Greater, ">", None),
                (Slash, "/", None),
                (Dot, ".", None),
                (Eof, "", None),
            ]
        );
    }

    #[test]
    fn compound_assignment_operators() {
        let scanned = scan("+= -= *= /= + - * / =");

        assert_eq!(
            scanned,
            vec![
                (PlusEqual, "+=", None),
                (MinusEqual, "-=", None),
                (StarEqual, "*=", None),
                (SlashEqual, "/=", None),
                (Plus, "+", None),
                (Minus, "-", None),
                (Star, "*", None),
                (Slash, "/", None),
                (Equal, "=", None),
                (Eof, "", None),
            ]
        );
    }

    #[test]
    fn strings() {
        let scanned = scan("\"\"\n\"string\"\n\"multi\nline\"");

        assert_eq!(
            scanned,
            vec![
                (String, "\"\"", Some(TokenLiteral::String(""))),
                (String, "\"string\"", Some(TokenLiteral::String("string"))),
                (
                    String,
                    "\"multi\nline\"",
                    Some(TokenLiteral::String("multi\nline"))
                ),
                (Eof, "", None),
            ]
        );
    }

    #[test]
    fn comments_and_whitespace() {
        let scanned = scan("space// a comment\ntabs\t\t\t// another // comment\n\nend");

        assert_eq!(
            scanned,
            vec![
                (Identifier, "space", None),
                (Identifier, "tabs", None),
                (Identifier, "end", None),
                (Eof, "", None),
            ]
        );
    }

    #[test]
    fn token_lines_are_non_decreasing() {
        let code = "var a = 1;\nvar b = \"two\nthree\";\nprint a;";
        let offsets = crate::span::LineOffsets::new(code);

        let mut last_line = 0;
        for token in Scanner::scan_tokens(code) {
            let line = offsets.line(token.span.start);
            assert!(line >= last_line, "token {token} went backwards");
            last_line = line;
        }
    }
}
