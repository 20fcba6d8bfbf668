//! This module lets the [`Parser`] parse expressions.

use super::{ParseError, ParseResult, Parser};
use crate::{
    ast::{BinaryOperator, Expr, LogicalOperator, SpanExpr, UnaryOperator},
    lox::report_token_error,
    span::WithSpan,
    tokens::{Token, TokenLiteral, TokenType},
};

/// Map an operator token type to its [`BinaryOperator`].
///
/// The compound assignment operators map to their non-compound forms, which
/// is what the augmented-assignment rewrite needs.
fn binary_operator(token_type: TokenType) -> BinaryOperator {
    match token_type {
        TokenType::Slash | TokenType::SlashEqual => BinaryOperator::Slash,
        TokenType::Star | TokenType::StarEqual => BinaryOperator::Star,
        TokenType::Plus | TokenType::PlusEqual => BinaryOperator::Plus,
        TokenType::Minus | TokenType::MinusEqual => BinaryOperator::Minus,
        TokenType::Greater => BinaryOperator::Greater,
        TokenType::GreaterEqual => BinaryOperator::GreaterEqual,
        TokenType::Less => BinaryOperator::Less,
        TokenType::LessEqual => BinaryOperator::LessEqual,
        TokenType::BangEqual => BinaryOperator::BangEqual,
        TokenType::EqualEqual => BinaryOperator::EqualEqual,
        _ => unreachable!("{token_type:?} is not a binary operator"),
    }
}

impl<'s> Parser<'s> {
    /// expression → assignment ;
    pub(super) fn parse_expression(&mut self) -> ParseResult<'s, SpanExpr> {
        self.parse_assignment()
    }

    /// assignment → ( call "." IDENTIFIER | call "[" expression "]" | IDENTIFIER ) assignOp assignment
    ///             | logic_or ;
    ///
    /// Augmented assignment `lhs op= rhs` is rewritten here to an assignment
    /// of `Binary(lhs, op, rhs)`, so the rest of the pipeline only ever sees
    /// plain assignments.
    fn parse_assignment(&mut self) -> ParseResult<'s, SpanExpr> {
        use TokenType::*;

        let expr = self.parse_logic_or()?;

        if self.match_tokens([Equal, PlusEqual, MinusEqual, StarEqual, SlashEqual]) {
            let op_token = *self.previous().unwrap();
            let r_value = self.parse_assignment()?;

            let value = if op_token.token_type == Equal {
                r_value
            } else {
                let operator =
                    WithSpan::new(op_token.span, binary_operator(op_token.token_type));
                let span = expr.span.union(&r_value.span);
                WithSpan::new(
                    span,
                    Expr::Binary(Box::new(expr.clone()), operator, Box::new(r_value)),
                )
            };

            let target_span = expr.span;
            let full_span = target_span.union(&value.span);
            match expr.value {
                Expr::Variable(name) => {
                    return Ok(WithSpan::new(
                        full_span,
                        Expr::Assign(WithSpan::new(target_span, name), Box::new(value)),
                    ));
                }
                Expr::Get(object, index) => {
                    return Ok(WithSpan::new(full_span, Expr::Set(object, index, Box::new(value))));
                }
                other => {
                    ParseError {
                        token: op_token,
                        message: "Invalid assignment target".to_string(),
                    }
                    .report();
                    return Ok(WithSpan::new(target_span, other));
                }
            }
        }

        Ok(expr)
    }

    /// logic_or → logic_and ( "or" logic_and )* ;
    fn parse_logic_or(&mut self) -> ParseResult<'s, SpanExpr> {
        let mut expr = self.parse_logic_and()?;

        while self.match_tokens([TokenType::Or]) {
            let operator = WithSpan::new(self.previous().unwrap().span, LogicalOperator::Or);
            let right = self.parse_logic_and()?;

            let span = expr.span.union(&right.span);
            expr = WithSpan::new(
                span,
                Expr::Logical(Box::new(expr), operator, Box::new(right)),
            );
        }

        Ok(expr)
    }

    /// logic_and → equality ( "and" equality )* ;
    fn parse_logic_and(&mut self) -> ParseResult<'s, SpanExpr> {
        let mut expr = self.parse_equality()?;

        while self.match_tokens([TokenType::And]) {
            let operator = WithSpan::new(self.previous().unwrap().span, LogicalOperator::And);
            let right = self.parse_equality()?;

            let span = expr.span.union(&right.span);
            expr = WithSpan::new(
                span,
                Expr::Logical(Box::new(expr), operator, Box::new(right)),
            );
        }

        Ok(expr)
    }

    /// equality → comparison ( ( "!=" | "==" ) comparison )* ;
    fn parse_equality(&mut self) -> ParseResult<'s, SpanExpr> {
        use TokenType::*;
        self.parse_binary_level([BangEqual, EqualEqual], Self::parse_comparison)
    }

    /// comparison → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
    fn parse_comparison(&mut self) -> ParseResult<'s, SpanExpr> {
        use TokenType::*;
        self.parse_binary_level([Greater, GreaterEqual, Less, LessEqual], Self::parse_term)
    }

    /// term → factor ( ( "-" | "+" ) factor )* ;
    fn parse_term(&mut self) -> ParseResult<'s, SpanExpr> {
        use TokenType::*;
        self.parse_binary_level([Minus, Plus], Self::parse_factor)
    }

    /// factor → unary ( ( "/" | "*" ) unary )* ;
    fn parse_factor(&mut self) -> ParseResult<'s, SpanExpr> {
        use TokenType::*;
        self.parse_binary_level([Slash, Star], Self::parse_unary)
    }

    /// Parse one level of left-associative binary operators.
    fn parse_binary_level<const N: usize>(
        &mut self,
        operators: [TokenType; N],
        next_level: fn(&mut Self) -> ParseResult<'s, SpanExpr>,
    ) -> ParseResult<'s, SpanExpr> {
        let mut expr = next_level(self)?;

        while self.match_tokens(operators) {
            let token = *self.previous().unwrap();
            let operator = WithSpan::new(token.span, binary_operator(token.token_type));
            let right = next_level(self)?;

            let span = expr.span.union(&right.span);
            expr = WithSpan::new(
                span,
                Expr::Binary(Box::new(expr), operator, Box::new(right)),
            );
        }

        Ok(expr)
    }

    /// unary → ( "!" | "-" ) unary | funExpr ;
    fn parse_unary(&mut self) -> ParseResult<'s, SpanExpr> {
        use TokenType::*;

        if self.match_tokens([Bang, Minus]) {
            let token = *self.previous().unwrap();
            let operator = WithSpan::new(
                token.span,
                match token.token_type {
                    Bang => UnaryOperator::Bang,
                    Minus => UnaryOperator::Minus,
                    _ => unreachable!(),
                },
            );
            let right = self.parse_unary()?;

            let span = operator.span.union(&right.span);
            Ok(WithSpan::new(span, Expr::Unary(operator, Box::new(right))))
        } else {
            self.parse_fun_expr()
        }
    }

    /// funExpr → "fun" "(" parameters? ")" block | call ;
    fn parse_fun_expr(&mut self) -> ParseResult<'s, SpanExpr> {
        use TokenType::*;

        if self.check(Fun) && self.check_next(LeftParen) {
            let mut span = self.advance().span;
            self.advance();

            let params = self.parse_parameters("function expression")?;
            self.consume(RightParen, "Expected ')' after function expression parameters")?;
            self.consume(LeftBrace, "Expected '{' before function expression body")?;
            let body = self.parse_block()?;
            span.mut_union(&body.span);

            Ok(WithSpan::new(span, Expr::Function(params, body.value)))
        } else {
            self.parse_call()
        }
    }

    /// call → primary ( "(" arguments? ")" | "." IDENTIFIER | "[" expression "]" )* ;
    ///
    /// `a.b` lowers to a Get with a string-literal index; `a[e]` keeps `e`.
    fn parse_call(&mut self) -> ParseResult<'s, SpanExpr> {
        use TokenType::*;

        let mut expr = self.parse_primary()?;

        loop {
            if self.match_tokens([LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.match_tokens([Dot]) {
                let token = self.consume(Identifier, "Expected property name after '.'")?;
                let index = WithSpan::new(token.span, Expr::String(token.lexeme.to_string()));

                let span = expr.span.union(&token.span);
                expr = WithSpan::new(span, Expr::Get(Box::new(expr), Box::new(index)));
            } else if self.match_tokens([LeftBracket]) {
                let index = self.parse_expression()?;
                let bracket = self.consume(RightBracket, "Expected ']' after index")?;

                let span = expr.span.union(&bracket.span);
                expr = WithSpan::new(span, Expr::Get(Box::new(expr), Box::new(index)));
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Finish parsing a function call by parsing the argument list and
    /// closing paren. `arguments → expression ( "," expression )* ;`
    fn finish_call(&mut self, callee: SpanExpr) -> ParseResult<'s, SpanExpr> {
        let mut arguments: Vec<SpanExpr> = Vec::new();
        let mut reported_max_args_error = false;

        if !self.check(TokenType::RightParen) {
            loop {
                if arguments.len() >= 255 && !reported_max_args_error {
                    report_token_error(
                        self.peek().unwrap(),
                        "Cannot have more than 255 arguments in a function call",
                    );
                    reported_max_args_error = true;
                }

                arguments.push(self.parse_expression()?);

                if !self.match_tokens([TokenType::Comma]) {
                    break;
                }
            }
        }

        let close_paren = self.consume(
            TokenType::RightParen,
            "Expected ')' after arguments in function call",
        )?;

        Ok(WithSpan::new(
            callee.span.union(&close_paren.span),
            Expr::Call(Box::new(callee), arguments, close_paren.span),
        ))
    }

    /// primary → NUMBER | STRING | "true" | "false" | "nil" | "this"
    ///         | "super" "." IDENTIFIER | "(" expression ")"
    ///         | "[" ( expression ( "," expression )* )? "]" | IDENTIFIER ;
    fn parse_primary(&mut self) -> ParseResult<'s, SpanExpr> {
        use TokenType::*;

        if self.match_tokens([
            True,
            False,
            Nil,
            This,
            Super,
            Number,
            String,
            Identifier,
            LeftParen,
            LeftBracket,
        ]) {
            let previous = *self.previous().unwrap();
            let mut span = previous.span;

            let value = match previous {
                Token {
                    token_type: True, ..
                } => Expr::Boolean(true),
                Token {
                    token_type: False, ..
                } => Expr::Boolean(false),
                Token {
                    token_type: Nil, ..
                } => Expr::Nil,
                Token {
                    token_type: This, ..
                } => Expr::This,
                Token {
                    token_type: Super, ..
                } => {
                    self.consume(Dot, "Expected '.' after 'super'")?;
                    let method =
                        self.consume(Identifier, "Expected superclass method name after '.'")?;
                    span.mut_union(&method.span);
                    Expr::Super(WithSpan::new(method.span, method.lexeme.to_string()))
                }
                Token {
                    token_type: Number,
                    literal: Some(TokenLiteral::Number(num)),
                    ..
                } => Expr::Number(num),
                Token {
                    token_type: String,
                    literal: Some(TokenLiteral::String(string)),
                    ..
                } => Expr::String(string.to_string()),
                Token {
                    token_type: Identifier,
                    lexeme,
                    ..
                } => Expr::Variable(lexeme.to_string()),
                Token {
                    token_type: LeftParen,
                    ..
                } => {
                    let expr = self.parse_expression()?;
                    let right_paren =
                        self.consume(RightParen, "Expected ')' at end of grouped expression")?;
                    span.mut_union(&right_paren.span);
                    Expr::Grouping(Box::new(expr))
                }
                Token {
                    token_type: LeftBracket,
                    ..
                } => {
                    let mut elements = Vec::new();
                    if !self.check(RightBracket) {
                        loop {
                            elements.push(self.parse_expression()?);
                            if !self.match_tokens([Comma]) {
                                break;
                            }
                        }
                    }
                    let right_bracket =
                        self.consume(RightBracket, "Expected ']' after array elements")?;
                    span.mut_union(&right_bracket.span);
                    Expr::Array(elements)
                }
                _ => unreachable!(
                    "match_tokens() will only return a token with a TokenType that we expected"
                ),
            };

            Ok(WithSpan::new(span, value))
        } else {
            let message = match self.peek() {
                Some(token) => format!("Expected expression, got {:?}", token.token_type),
                None => "Expected expression".to_string(),
            };
            Err(self.error_at_current(&message))
        }
    }
}
