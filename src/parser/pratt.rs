// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pratt parser for expressions
//!
//! Binary operators are driven by a single precedence table; the conditional
//! operator and `not in` are handled inline in the climbing loop.

use super::error::{ParseError, ParseResult};
use super::span::Spanned;
use super::tokenizer::{Token, Tokenizer};
use crate::ast::{Arguments, BinaryOperator, ExpressionNode, LiteralValue, UnaryOperator};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Deepest expression nesting the parser accepts.
///
/// Counts parenthesized and prefix nesting as well as operator and postfix
/// chains, so it also bounds the depth of the produced tree.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Magnitude of `i64::MIN`, the only literal valid solely when negated
const I64_MIN_MAGNITUDE: u64 = i64::MIN.unsigned_abs();

/// Operator precedence levels (higher = tighter binding)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// Lowest precedence - conditional `?:` (right associative)
    Conditional = 1,
    /// Logical OR
    Or = 2,
    /// Logical AND
    And = 3,
    /// Equality operators (==, !=)
    Equality = 4,
    /// Relational and membership operators (<, >, <=, >=, in, not in)
    Relational = 5,
    /// Additive operators (+, -)
    Additive = 6,
    /// Multiplicative operators (*, /, %)
    Multiplicative = 7,
    /// Unary operators (-, !)
    Unary = 8,
    /// Navigation, calls and indexing (., [])
    Postfix = 9,
}

impl Precedence {
    /// Get the next higher precedence level for left-associative operators
    #[inline(always)]
    pub const fn next_level(self) -> Self {
        match self {
            Precedence::Conditional => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Relational,
            Precedence::Relational => Precedence::Additive,
            Precedence::Additive => Precedence::Multiplicative,
            Precedence::Multiplicative => Precedence::Unary,
            Precedence::Unary => Precedence::Postfix,
            Precedence::Postfix => Precedence::Postfix,
        }
    }
}

#[inline(always)]
fn get_precedence(token: &Token<'_>) -> Option<Precedence> {
    match token {
        Token::Plus | Token::Minus => Some(Precedence::Additive),
        Token::Equal | Token::NotEqual => Some(Precedence::Equality),
        Token::LessThan
        | Token::LessThanOrEqual
        | Token::GreaterThan
        | Token::GreaterThanOrEqual
        | Token::In => Some(Precedence::Relational),
        Token::And => Some(Precedence::And),
        Token::Or => Some(Precedence::Or),
        Token::Star | Token::Slash | Token::Percent => Some(Precedence::Multiplicative),
        Token::Question => Some(Precedence::Conditional),
        _ => None,
    }
}

#[inline(always)]
fn token_to_binary_op(token: &Token<'_>) -> Option<BinaryOperator> {
    match token {
        Token::Plus => Some(BinaryOperator::Add),
        Token::Minus => Some(BinaryOperator::Subtract),
        Token::Star => Some(BinaryOperator::Multiply),
        Token::Slash => Some(BinaryOperator::Divide),
        Token::Percent => Some(BinaryOperator::Modulo),
        Token::Equal => Some(BinaryOperator::Equal),
        Token::NotEqual => Some(BinaryOperator::NotEqual),
        Token::LessThan => Some(BinaryOperator::LessThan),
        Token::LessThanOrEqual => Some(BinaryOperator::LessThanOrEqual),
        Token::GreaterThan => Some(BinaryOperator::GreaterThan),
        Token::GreaterThanOrEqual => Some(BinaryOperator::GreaterThanOrEqual),
        Token::And => Some(BinaryOperator::And),
        Token::Or => Some(BinaryOperator::Or),
        Token::In => Some(BinaryOperator::In),
        _ => None,
    }
}

/// Pratt parser over a pre-tokenized expression
pub struct PrattParser<'input> {
    tokens: Vec<Spanned<Token<'input>>>,
    pos: usize,
    input_len: usize,
    depth: usize,
}

impl<'input> PrattParser<'input> {
    /// Tokenize `input` and prepare a parser over it
    pub fn new(input: &'input str) -> ParseResult<Self> {
        Ok(Self {
            tokens: Tokenizer::new(input).tokenize_all()?,
            pos: 0,
            input_len: input.len(),
            depth: 0,
        })
    }

    /// Enter one nesting level, failing past [`MAX_NESTING_DEPTH`]
    fn descend(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::NestingTooDeep {
                max_depth: MAX_NESTING_DEPTH,
                position: self.position(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    #[inline(always)]
    fn current(&self) -> Option<&Token<'input>> {
        self.tokens.get(self.pos).map(|t| &t.value)
    }

    #[inline(always)]
    fn peek(&self) -> Option<&Token<'input>> {
        self.tokens.get(self.pos + 1).map(|t| &t.value)
    }

    /// Byte offset of the current token, or end of input
    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.input_len, |t| t.start)
    }

    #[inline(always)]
    fn advance(&mut self) {
        self.pos += 1;
    }

    fn unexpected(&self) -> ParseError {
        match self.current() {
            Some(token) => ParseError::UnexpectedToken {
                token: token.to_string(),
                position: self.position(),
            },
            None => ParseError::UnexpectedEof {
                position: self.input_len,
            },
        }
    }

    fn expect(&mut self, expected: Token<'static>) -> ParseResult<()> {
        match self.current() {
            Some(token) if *token == expected => {
                self.advance();
                Ok(())
            }
            Some(token) => Err(ParseError::ExpectedToken {
                expected: format!("'{expected}'"),
                found: token.to_string(),
                position: self.position(),
            }),
            None => Err(ParseError::UnexpectedEof {
                position: self.input_len,
            }),
        }
    }

    /// Parse primary expression (literals, variables, identifiers, groups)
    fn parse_primary(&mut self) -> ParseResult<ExpressionNode> {
        let position = self.position();
        let Some(token) = self.current().copied() else {
            return Err(self.unexpected());
        };

        let node = match token {
            Token::Integer(n) => {
                self.advance();
                let value = i64::try_from(n).map_err(|_| ParseError::InvalidLiteral {
                    literal_type: "integer",
                    value: n.to_string(),
                    position,
                })?;
                ExpressionNode::literal(LiteralValue::Integer(value))
            }
            Token::Decimal(text) => {
                self.advance();
                let value = Decimal::from_str(text).map_err(|_| ParseError::InvalidLiteral {
                    literal_type: "decimal",
                    value: text.to_string(),
                    position,
                })?;
                ExpressionNode::literal(LiteralValue::Decimal(value))
            }
            Token::String(raw) => {
                self.advance();
                let value = Self::process_string_escapes(raw, position + 1)?;
                ExpressionNode::literal(LiteralValue::String(value))
            }
            Token::True => {
                self.advance();
                ExpressionNode::literal(LiteralValue::Boolean(true))
            }
            Token::False => {
                self.advance();
                ExpressionNode::literal(LiteralValue::Boolean(false))
            }
            Token::Null => {
                self.advance();
                ExpressionNode::literal(LiteralValue::Null)
            }
            Token::Variable(name) => {
                self.advance();
                ExpressionNode::variable(name)
            }
            Token::Identifier(name) => {
                self.advance();
                self.parse_method_or_property(None, name)?
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RightParen)?;
                expr
            }
            Token::LeftBrace => {
                self.advance();
                ExpressionNode::List(self.parse_list_items()?)
            }
            Token::HashBrace => {
                self.advance();
                ExpressionNode::Map(self.parse_map_entries()?)
            }
            _ => return Err(self.unexpected()),
        };
        Ok(node)
    }

    /// Comma separated expressions up to the closing brace
    fn parse_list_items(&mut self) -> ParseResult<Vec<ExpressionNode>> {
        let mut items = Vec::new();
        if self.current() == Some(&Token::RightBrace) {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(self.parse_expression()?);
            match self.current() {
                Some(Token::Comma) => self.advance(),
                Some(Token::RightBrace) => {
                    self.advance();
                    return Ok(items);
                }
                _ => return Err(self.expected("',' or '}' in list literal")),
            }
        }
    }

    fn parse_map_entries(&mut self) -> ParseResult<Vec<(ExpressionNode, ExpressionNode)>> {
        let mut entries = Vec::new();
        if self.current() == Some(&Token::RightBrace) {
            self.advance();
            return Ok(entries);
        }
        loop {
            let key = self.parse_expression()?;
            self.expect(Token::Colon)?;
            let value = self.parse_expression()?;
            entries.push((key, value));
            match self.current() {
                Some(Token::Comma) => self.advance(),
                Some(Token::RightBrace) => {
                    self.advance();
                    return Ok(entries);
                }
                _ => return Err(self.expected("',' or '}' in map literal")),
            }
        }
    }

    fn expected(&self, what: &str) -> ParseError {
        match self.current() {
            Some(token) => ParseError::ExpectedToken {
                expected: what.to_string(),
                found: token.to_string(),
                position: self.position(),
            },
            None => ParseError::UnexpectedEof {
                position: self.input_len,
            },
        }
    }

    /// Parse a method call when parentheses follow, otherwise a property
    fn parse_method_or_property(
        &mut self,
        base: Option<ExpressionNode>,
        name: &str,
    ) -> ParseResult<ExpressionNode> {
        if self.current() != Some(&Token::LeftParen) {
            return Ok(match base {
                Some(base) => ExpressionNode::path(base, name),
                None => ExpressionNode::property(name),
            });
        }

        self.advance();
        let mut args = Arguments::new();
        if self.current() == Some(&Token::RightParen) {
            self.advance();
            return Ok(ExpressionNode::method_call(base, name, args));
        }

        loop {
            args.push(self.parse_expression()?);
            match self.current() {
                Some(Token::Comma) => self.advance(),
                Some(Token::RightParen) => {
                    self.advance();
                    break;
                }
                _ => return Err(self.expected("',' or ')' in method arguments")),
            }
        }
        Ok(ExpressionNode::method_call(base, name, args))
    }

    /// Parse navigation, calls, projections and indexing after a primary
    fn parse_postfix(&mut self, mut left: ExpressionNode) -> ParseResult<ExpressionNode> {
        let mut chained = 0;
        loop {
            match self.current() {
                Some(Token::Dot) => {
                    self.descend()?;
                    chained += 1;
                    self.advance();
                    left = self.parse_member(left)?;
                }
                Some(Token::LeftBracket) => {
                    self.descend()?;
                    chained += 1;
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(Token::RightBracket)?;
                    left = ExpressionNode::index(left, index);
                }
                _ => break,
            }
        }
        self.depth -= chained;
        Ok(left)
    }

    /// Parse what follows a dot: a name, a call, or a `{ }` projection/selection
    fn parse_member(&mut self, base: ExpressionNode) -> ParseResult<ExpressionNode> {
        let Some(token) = self.current().copied() else {
            return Err(self.unexpected());
        };

        if token == Token::LeftBrace {
            self.advance();
            let selecting = self.current() == Some(&Token::Question);
            if selecting {
                self.advance();
            }
            let inner = self.parse_expression()?;
            self.expect(Token::RightBrace)?;
            return Ok(if selecting {
                ExpressionNode::selection(base, inner)
            } else {
                ExpressionNode::projection(base, inner)
            });
        }

        let name = match token {
            Token::Identifier(name) => name,
            other => match other.keyword_text() {
                Some(word) => word,
                None => return Err(self.expected("member name after '.'")),
            },
        };
        self.advance();
        self.parse_method_or_property(Some(base), name)
    }

    /// Parse prefix operators, then a primary with its postfix chain
    fn parse_unary(&mut self) -> ParseResult<ExpressionNode> {
        self.descend()?;
        let result = self.parse_unary_operand();
        self.depth -= 1;
        result
    }

    fn parse_unary_operand(&mut self) -> ParseResult<ExpressionNode> {
        let op = match self.current() {
            Some(Token::Minus) => UnaryOperator::Negate,
            Some(Token::Not) => UnaryOperator::Not,
            _ => {
                let primary = self.parse_primary()?;
                return self.parse_postfix(primary);
            }
        };
        self.advance();

        if op == UnaryOperator::Negate
            && self.current() == Some(&Token::Integer(I64_MIN_MAGNITUDE))
            && !matches!(self.peek(), Some(Token::Dot | Token::LeftBracket))
        {
            self.advance();
            return Ok(ExpressionNode::literal(LiteralValue::Integer(i64::MIN)));
        }

        let operand = self.parse_unary()?;

        // fold negative numeric literals
        Ok(match (op, operand) {
            (UnaryOperator::Negate, ExpressionNode::Literal(LiteralValue::Integer(n)))
                if n != i64::MIN =>
            {
                ExpressionNode::literal(LiteralValue::Integer(-n))
            }
            (UnaryOperator::Negate, ExpressionNode::Literal(LiteralValue::Decimal(d))) => {
                ExpressionNode::literal(LiteralValue::Decimal(-d))
            }
            (op, operand) => ExpressionNode::unary_op(op, operand),
        })
    }

    /// Core precedence climbing loop
    fn parse_expression_with_precedence(
        &mut self,
        min_precedence: Precedence,
    ) -> ParseResult<ExpressionNode> {
        let mut left = self.parse_unary()?;
        let mut chained = 0;

        while let Some(current_token) = self.current().copied() {
            // `not in` is the only two-token operator
            let (precedence, op, width) =
                if current_token == Token::Not && self.peek() == Some(&Token::In) {
                    (Precedence::Relational, Some(BinaryOperator::NotIn), 2)
                } else {
                    match get_precedence(&current_token) {
                        Some(prec) => (prec, token_to_binary_op(&current_token), 1),
                        None => break,
                    }
                };
            if precedence < min_precedence {
                break;
            }
            self.descend()?;
            chained += 1;
            self.pos += width;

            let Some(op) = op else {
                // conditional, right associative
                let then_expr = self.parse_expression_with_precedence(Precedence::Conditional)?;
                self.expect(Token::Colon)?;
                let else_expr = self.parse_expression_with_precedence(Precedence::Conditional)?;
                left = ExpressionNode::conditional(left, then_expr, else_expr);
                continue;
            };

            let right = self.parse_expression_with_precedence(precedence.next_level())?;
            left = ExpressionNode::binary_op(op, left, right);
        }

        self.depth -= chained;
        Ok(left)
    }

    /// Parse a full expression at the lowest precedence
    pub fn parse_expression(&mut self) -> ParseResult<ExpressionNode> {
        self.parse_expression_with_precedence(Precedence::Conditional)
    }

    /// Parse complete input, rejecting trailing tokens
    pub fn parse(&mut self) -> ParseResult<ExpressionNode> {
        let expr = self.parse_expression()?;
        if self.current().is_some() {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    /// Resolve escape sequences; `offset` is the byte position of `input` in the source
    fn process_string_escapes(input: &str, offset: usize) -> ParseResult<String> {
        if !input.contains('\\') {
            return Ok(input.to_string());
        }

        let mut result = String::with_capacity(input.len());
        let mut chars = input.char_indices();

        while let Some((at, ch)) = chars.next() {
            if ch != '\\' {
                result.push(ch);
                continue;
            }
            let position = offset + at;
            match chars.next().map(|(_, c)| c) {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('\\') => result.push('\\'),
                Some('\'') => result.push('\''),
                Some('"') => result.push('"'),
                Some('u') => {
                    let hex: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
                    let decoded = (hex.len() == 4 && hex.chars().all(|c| c.is_ascii_hexdigit()))
                        .then(|| u32::from_str_radix(&hex, 16).ok())
                        .flatten()
                        .and_then(char::from_u32);
                    match decoded {
                        Some(unicode_char) => result.push(unicode_char),
                        None => {
                            return Err(ParseError::InvalidEscape {
                                sequence: format!("\\u{hex}"),
                                position,
                            });
                        }
                    }
                }
                Some(other) => {
                    return Err(ParseError::InvalidEscape {
                        sequence: format!("\\{other}"),
                        position,
                    });
                }
                None => {
                    return Err(ParseError::InvalidEscape {
                        sequence: "\\".to_string(),
                        position,
                    });
                }
            }
        }

        Ok(result)
    }
}

/// Parse an expression string into an AST
pub fn parse_expression_pratt(input: &str) -> ParseResult<ExpressionNode> {
    PrattParser::new(input)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> ExpressionNode {
        parse_expression_pratt(input).unwrap()
    }

    fn int(n: i64) -> ExpressionNode {
        ExpressionNode::literal(LiteralValue::Integer(n))
    }

    #[test]
    fn test_precedence_ordering() {
        assert!(Precedence::Multiplicative > Precedence::Additive);
        assert!(Precedence::Additive > Precedence::Relational);
        assert!(Precedence::Relational > Precedence::Equality);
        assert!(Precedence::Equality > Precedence::And);
        assert!(Precedence::And > Precedence::Or);
        assert!(Precedence::Or > Precedence::Conditional);
    }

    #[test]
    fn test_basic_expressions() {
        assert_eq!(parse("#target"), ExpressionNode::variable("target"));
        assert_eq!(parse("name"), ExpressionNode::property("name"));
        assert_eq!(
            parse("#target.name"),
            ExpressionNode::path(ExpressionNode::variable("target"), "name")
        );
        assert_eq!(
            parse("#param[0]"),
            ExpressionNode::index(ExpressionNode::variable("param"), int(0))
        );
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(
            parse("1 + 2 * 3"),
            ExpressionNode::binary_op(
                BinaryOperator::Add,
                int(1),
                ExpressionNode::binary_op(BinaryOperator::Multiply, int(2), int(3)),
            )
        );
        // left associative
        assert_eq!(
            parse("10 - 4 - 3"),
            ExpressionNode::binary_op(
                BinaryOperator::Subtract,
                ExpressionNode::binary_op(BinaryOperator::Subtract, int(10), int(4)),
                int(3),
            )
        );
    }

    #[test]
    fn test_conditional_is_right_associative() {
        let expr = parse("a ? 1 : b ? 2 : 3");
        let ExpressionNode::Conditional(data) = expr else {
            panic!("expected conditional");
        };
        assert_eq!(data.condition, ExpressionNode::property("a"));
        assert_eq!(data.then_expr, int(1));
        assert!(matches!(data.else_expr, ExpressionNode::Conditional(_)));
    }

    #[test]
    fn test_word_operators() {
        assert_eq!(parse("#target lte 11"), parse("#target <= 11"));
        assert_eq!(parse("a and b or c"), parse("a && b || c"));
        assert_eq!(
            parse("1 not in {2, 3}"),
            ExpressionNode::binary_op(
                BinaryOperator::NotIn,
                int(1),
                ExpressionNode::List(vec![int(2), int(3)]),
            )
        );
    }

    #[test]
    fn test_unary() {
        assert_eq!(parse("-5"), int(-5));
        assert_eq!(
            parse("!#target.isEmpty()"),
            ExpressionNode::unary_op(
                UnaryOperator::Not,
                ExpressionNode::method_call(
                    Some(ExpressionNode::variable("target")),
                    "isEmpty",
                    Arguments::new()
                ),
            )
        );
    }

    #[test]
    fn test_method_calls() {
        let expr = parse("#target.substring(1, 3)");
        let ExpressionNode::MethodCall(data) = expr else {
            panic!("expected method call");
        };
        assert_eq!(data.method, "substring");
        assert_eq!(data.args.as_slice(), &[int(1), int(3)]);

        assert!(matches!(parse("size()"), ExpressionNode::MethodCall(data) if data.base.is_none()));
    }

    #[test]
    fn test_projection_and_selection() {
        assert_eq!(
            parse("#target.{ #this * 2 }"),
            ExpressionNode::projection(
                ExpressionNode::variable("target"),
                ExpressionNode::binary_op(
                    BinaryOperator::Multiply,
                    ExpressionNode::variable("this"),
                    int(2)
                ),
            )
        );
        assert!(matches!(
            parse("#target.{? #this > 1 }"),
            ExpressionNode::Selection { .. }
        ));
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            parse(r"'a\'bA'"),
            ExpressionNode::literal(LiteralValue::String("a'bA".to_string()))
        );
        assert_eq!(
            parse("1.50"),
            ExpressionNode::literal(LiteralValue::Decimal(Decimal::new(150, 2)))
        );
        assert_eq!(parse("{}"), ExpressionNode::List(vec![]));
        assert_eq!(
            parse("#{'k': 1}"),
            ExpressionNode::Map(vec![(
                ExpressionNode::literal(LiteralValue::String("k".to_string())),
                int(1)
            )])
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse_expression_pratt("1 +").unwrap_err(),
            ParseError::UnexpectedEof { position: 3 }
        );
        assert_eq!(
            parse_expression_pratt("1 2").unwrap_err(),
            ParseError::UnexpectedToken {
                token: "2".to_string(),
                position: 2
            }
        );
        assert!(matches!(
            parse_expression_pratt("(1 + 2").unwrap_err(),
            ParseError::UnexpectedEof { .. }
        ));
        assert!(matches!(
            parse_expression_pratt("'bad \\q'").unwrap_err(),
            ParseError::InvalidEscape { position: 5, .. }
        ));
        assert!(matches!(
            parse_expression_pratt("a ? 1").unwrap_err(),
            ParseError::UnexpectedEof { .. }
        ));
        assert!(parse_expression_pratt("").is_err());
    }

    #[test]
    fn test_i64_bounds() {
        assert_eq!(parse("-9223372036854775808"), int(i64::MIN));
        assert_eq!(parse("- 9223372036854775808"), int(i64::MIN));
        assert_eq!(parse("9223372036854775807"), int(i64::MAX));
        assert_eq!(
            parse("--9223372036854775808"),
            ExpressionNode::unary_op(UnaryOperator::Negate, int(i64::MIN))
        );
        assert_eq!(
            parse_expression_pratt("9223372036854775808").unwrap_err(),
            ParseError::InvalidLiteral {
                literal_type: "integer",
                value: "9223372036854775808".to_string(),
                position: 0
            }
        );
        // postfix binds tighter than the sign, so the magnitude stands alone
        assert!(matches!(
            parse_expression_pratt("-9223372036854775808.toString()").unwrap_err(),
            ParseError::InvalidLiteral { position: 1, .. }
        ));
    }

    #[test]
    fn test_nesting_within_limit() {
        let depth = 100;
        let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&source), int(1));

        let chain = format!("1{}", " + 1".repeat(100));
        assert!(parse_expression_pratt(&chain).is_ok());
    }

    #[test]
    fn test_nesting_too_deep() {
        for depth in [400, 10_000] {
            let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
            assert_eq!(
                parse_expression_pratt(&source).unwrap_err(),
                ParseError::NestingTooDeep {
                    max_depth: MAX_NESTING_DEPTH,
                    position: MAX_NESTING_DEPTH
                }
            );
        }

        let prefixes = format!("{}true", "!".repeat(1_000));
        assert!(matches!(
            parse_expression_pratt(&prefixes).unwrap_err(),
            ParseError::NestingTooDeep { .. }
        ));

        let chain = format!("1{}", " + 1".repeat(1_000));
        assert!(matches!(
            parse_expression_pratt(&chain).unwrap_err(),
            ParseError::NestingTooDeep { .. }
        ));

        let path = format!("#target{}", ".a[0]".repeat(1_000));
        assert!(matches!(
            parse_expression_pratt(&path).unwrap_err(),
            ParseError::NestingTooDeep { .. }
        ));
    }
}
