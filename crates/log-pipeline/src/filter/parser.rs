//! 재귀 하강 필터 파서
//!
//! ```text
//! or      := and ( "||" and )*
//! and     := unary ( "&&" unary )*
//! unary   := "!" unary | atom
//! atom    := "(" or ")" | FIELD ( "=" | "==" | "!=" ) value | FUNC "(" STRING ")"
//! value   := STRING | WORD
//! ```

use super::ast::{Field, FilterExpression, Function};
use super::error::FilterSyntaxError;
use super::lexer::{Token, TokenKind, tokenize};

/// 중첩 깊이 제한 (스택 보호)
const MAX_DEPTH: usize = 64;

/// 쿼리를 식 트리로 파싱합니다.
///
/// 빈 쿼리는 에러입니다. 전체 통과 필터는 [`EventFilter::compile`](super::EventFilter::compile)이
/// 파서를 호출하기 전에 처리합니다.
pub fn parse(query: &str) -> Result<FilterExpression, FilterSyntaxError> {
    let tokens = tokenize(query)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };

    if parser.peek().kind == TokenKind::Eof {
        return Err(FilterSyntaxError::new(0, "empty query"));
    }

    let expr = parser.parse_or()?;
    let trailing = parser.peek();
    if trailing.kind != TokenKind::Eof {
        return Err(FilterSyntaxError::new(
            trailing.position,
            format!("unexpected {}", trailing.kind.describe()),
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // tokenize는 항상 Eof로 끝나므로 마지막 토큰에 머무름
        let idx = self.pos.min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, FilterSyntaxError> {
        let token = self.advance();
        if token.kind == kind {
            Ok(token)
        } else {
            Err(FilterSyntaxError::new(
                token.position,
                format!("expected {what}, found {}", token.kind.describe()),
            ))
        }
    }

    fn parse_or(&mut self) -> Result<FilterExpression, FilterSyntaxError> {
        let mut lhs = self.parse_and()?;
        while self.peek().kind == TokenKind::Or {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = FilterExpression::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<FilterExpression, FilterSyntaxError> {
        let mut lhs = self.parse_unary()?;
        while self.peek().kind == TokenKind::And {
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = FilterExpression::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<FilterExpression, FilterSyntaxError> {
        if self.peek().kind == TokenKind::Not {
            let token = self.advance();
            self.enter(token.position)?;
            let inner = self.parse_unary();
            self.depth -= 1;
            return Ok(FilterExpression::Not(Box::new(inner?)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<FilterExpression, FilterSyntaxError> {
        let token = self.advance();
        match token.kind {
            TokenKind::LParen => {
                self.enter(token.position)?;
                let inner = self.parse_or();
                self.depth -= 1;
                let inner = inner?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(FilterExpression::Group(Box::new(inner)))
            }
            TokenKind::Word(name) => {
                if self.peek().kind == TokenKind::LParen {
                    self.parse_call(&name, token.position)
                } else {
                    self.parse_compare(&name, token.position)
                }
            }
            TokenKind::Eof => Err(FilterSyntaxError::new(
                token.position,
                "unexpected end of query",
            )),
            other => Err(FilterSyntaxError::new(
                token.position,
                format!("expected field or function, found {}", other.describe()),
            )),
        }
    }

    fn parse_call(
        &mut self,
        name: &str,
        position: usize,
    ) -> Result<FilterExpression, FilterSyntaxError> {
        let function = Function::from_name(name).ok_or_else(|| {
            FilterSyntaxError::new(position, format!("unknown function '{name}'"))
        })?;
        self.advance(); // '('

        let token = self.advance();
        let TokenKind::Str(argument) = token.kind else {
            return Err(FilterSyntaxError::new(
                token.position,
                format!(
                    "{}() takes a quoted string, found {}",
                    function.as_str(),
                    token.kind.describe()
                ),
            ));
        };

        self.expect(TokenKind::RParen, "')'")?;
        Ok(FilterExpression::Call { function, argument })
    }

    fn parse_compare(
        &mut self,
        name: &str,
        position: usize,
    ) -> Result<FilterExpression, FilterSyntaxError> {
        let field = Field::from_name(name)
            .ok_or_else(|| FilterSyntaxError::new(position, format!("unknown field '{name}'")))?;

        let op = self.advance();
        let negate = match op.kind {
            TokenKind::Eq | TokenKind::EqEq => false,
            TokenKind::NotEq => true,
            other => {
                return Err(FilterSyntaxError::new(
                    op.position,
                    format!(
                        "expected '=', '==' or '!=' after '{}', found {}",
                        field.as_str(),
                        other.describe()
                    ),
                ));
            }
        };

        let token = self.advance();
        let value = match token.kind {
            TokenKind::Word(value) | TokenKind::Str(value) => value,
            other => {
                return Err(FilterSyntaxError::new(
                    token.position,
                    format!("expected a value, found {}", other.describe()),
                ));
            }
        };

        let compare = FilterExpression::Compare { field, value };
        Ok(if negate {
            FilterExpression::Not(Box::new(compare))
        } else {
            compare
        })
    }

    fn enter(&mut self, position: usize) -> Result<(), FilterSyntaxError> {
        if self.depth >= MAX_DEPTH {
            return Err(FilterSyntaxError::new(position, "expression nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }
}
