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

//! Tokenizer for expression source text
//!
//! Produces zero-copy tokens borrowing from the input. String literal
//! contents are returned raw; escape sequences are resolved by the parser.

use super::error::{ParseError, ParseResult};
use super::span::Spanned;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::fmt;
use unicode_xid::UnicodeXID;

/// Expression token borrowing from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'input> {
    // Literals
    /// Integer literal magnitude (e.g., 42); sign and range are checked by the parser
    Integer(u64),
    /// Decimal literal as string slice, parsed by the parser (e.g., 3.14)
    Decimal(&'input str),
    /// String literal content between quotes, escapes unresolved
    String(&'input str),
    /// Boolean literal true
    True,
    /// Boolean literal false
    False,
    /// Null literal
    Null,

    /// Bare identifier (e.g., name, size)
    Identifier(&'input str),
    /// Variable reference without the leading `#` (e.g., target)
    Variable(&'input str),

    // Operators
    /// Addition operator (+)
    Plus,
    /// Subtraction operator (-)
    Minus,
    /// Multiplication operator (*)
    Star,
    /// Division operator (/)
    Slash,
    /// Remainder operator (%)
    Percent,
    /// Equality operator (== or eq)
    Equal,
    /// Inequality operator (!= or neq)
    NotEqual,
    /// Less than operator (< or lt)
    LessThan,
    /// Less than or equal operator (<= or lte)
    LessThanOrEqual,
    /// Greater than operator (> or gt)
    GreaterThan,
    /// Greater than or equal operator (>= or gte)
    GreaterThanOrEqual,
    /// Logical AND operator (&& or and)
    And,
    /// Logical OR operator (|| or or)
    Or,
    /// Logical NOT operator (! or not)
    Not,
    /// Membership operator (in keyword)
    In,

    // Punctuation
    /// Conditional operator (?)
    Question,
    /// Colon (:)
    Colon,
    /// Dot operator (.)
    Dot,
    /// Comma separator (,)
    Comma,
    /// Left parenthesis (
    LeftParen,
    /// Right parenthesis )
    RightParen,
    /// Left square bracket [
    LeftBracket,
    /// Right square bracket ]
    RightBracket,
    /// Left curly brace {
    LeftBrace,
    /// Right curly brace }
    RightBrace,
    /// Map literal opener #{
    HashBrace,
}

impl<'input> Token<'input> {
    /// Look up a reserved word
    #[inline]
    pub fn from_keyword(s: &str) -> Option<Token<'static>> {
        KEYWORD_TABLE.get(s).copied()
    }

    /// Source text of a word-like token, usable as a member name after `.`
    pub fn keyword_text(&self) -> Option<&'static str> {
        KEYWORD_TABLE
            .iter()
            .find_map(|(text, token)| (token == self).then_some(*text))
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Integer(n) => write!(f, "{n}"),
            Token::Decimal(s) | Token::Identifier(s) => f.write_str(s),
            Token::String(s) => write!(f, "'{s}'"),
            Token::Variable(name) => write!(f, "#{name}"),
            Token::True => f.write_str("true"),
            Token::False => f.write_str("false"),
            Token::Null => f.write_str("null"),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::Percent => f.write_str("%"),
            Token::Equal => f.write_str("=="),
            Token::NotEqual => f.write_str("!="),
            Token::LessThan => f.write_str("<"),
            Token::LessThanOrEqual => f.write_str("<="),
            Token::GreaterThan => f.write_str(">"),
            Token::GreaterThanOrEqual => f.write_str(">="),
            Token::And => f.write_str("&&"),
            Token::Or => f.write_str("||"),
            Token::Not => f.write_str("!"),
            Token::In => f.write_str("in"),
            Token::Question => f.write_str("?"),
            Token::Colon => f.write_str(":"),
            Token::Dot => f.write_str("."),
            Token::Comma => f.write_str(","),
            Token::LeftParen => f.write_str("("),
            Token::RightParen => f.write_str(")"),
            Token::LeftBracket => f.write_str("["),
            Token::RightBracket => f.write_str("]"),
            Token::LeftBrace => f.write_str("{"),
            Token::RightBrace => f.write_str("}"),
            Token::HashBrace => f.write_str("#{"),
        }
    }
}

/// Shared keyword lookup table
static KEYWORD_TABLE: Lazy<FxHashMap<&'static str, Token<'static>>> = Lazy::new(|| {
    let mut map = FxHashMap::default();

    map.insert("true", Token::True);
    map.insert("false", Token::False);
    map.insert("null", Token::Null);

    map.insert("and", Token::And);
    map.insert("or", Token::Or);
    map.insert("not", Token::Not);
    map.insert("in", Token::In);

    // Word forms of comparison operators
    map.insert("eq", Token::Equal);
    map.insert("neq", Token::NotEqual);
    map.insert("lt", Token::LessThan);
    map.insert("lte", Token::LessThanOrEqual);
    map.insert("gt", Token::GreaterThan);
    map.insert("gte", Token::GreaterThanOrEqual);

    map
});

/// Tokenizer over a single expression source
pub struct Tokenizer<'input> {
    input: &'input str,
    pos: usize,
    token_start: usize,
}

impl<'input> Tokenizer<'input> {
    /// Create a new tokenizer
    #[inline]
    pub fn new(input: &'input str) -> Self {
        Self {
            input,
            pos: 0,
            token_start: 0,
        }
    }

    /// Current byte position
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    #[inline]
    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn is_id_start(ch: char) -> bool {
        ch == '_' || ch == '$' || UnicodeXID::is_xid_start(ch)
    }

    fn is_id_continue(ch: char) -> bool {
        ch == '$' || UnicodeXID::is_xid_continue(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if !ch.is_whitespace() {
                break;
            }
            self.pos += ch.len_utf8();
        }
    }

    fn parse_identifier(&mut self) -> &'input str {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if !Self::is_id_continue(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
        &self.input[start..self.pos]
    }

    fn parse_number(&mut self) -> ParseResult<Token<'input>> {
        let start = self.pos;
        while self.peek_byte(0).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }

        let is_decimal =
            self.peek_byte(0) == Some(b'.') && self.peek_byte(1).is_some_and(|b| b.is_ascii_digit());

        if is_decimal {
            self.pos += 1;
            while self.peek_byte(0).is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
            return Ok(Token::Decimal(&self.input[start..self.pos]));
        }

        let text = &self.input[start..self.pos];
        text.parse::<u64>()
            .map(Token::Integer)
            .map_err(|_| ParseError::InvalidLiteral {
                literal_type: "integer",
                value: text.to_string(),
                position: start,
            })
    }

    /// Scan a quoted string, returning its raw content
    fn parse_string_literal(&mut self, quote: u8) -> ParseResult<&'input str> {
        let start = self.pos;
        self.pos += 1;
        let content_start = self.pos;

        while let Some(byte) = self.peek_byte(0) {
            match byte {
                b'\\' => {
                    self.pos += 1;
                    if let Some(ch) = self.peek_char() {
                        self.pos += ch.len_utf8();
                    }
                }
                b if b == quote => {
                    let content = &self.input[content_start..self.pos];
                    self.pos += 1;
                    return Ok(content);
                }
                _ => {
                    let ch = self.peek_char().unwrap_or_default();
                    self.pos += ch.len_utf8().max(1);
                }
            }
        }

        Err(ParseError::UnclosedString { position: start })
    }

    /// Produce the next token, or `None` at end of input
    pub fn next_token(&mut self) -> ParseResult<Option<Token<'input>>> {
        self.skip_whitespace();
        self.token_start = self.pos;

        let Some(byte) = self.peek_byte(0) else {
            return Ok(None);
        };

        let (token, width) = match byte {
            b'.' => (Token::Dot, 1),
            b'(' => (Token::LeftParen, 1),
            b')' => (Token::RightParen, 1),
            b'[' => (Token::LeftBracket, 1),
            b']' => (Token::RightBracket, 1),
            b'{' => (Token::LeftBrace, 1),
            b'}' => (Token::RightBrace, 1),
            b',' => (Token::Comma, 1),
            b'?' => (Token::Question, 1),
            b':' => (Token::Colon, 1),
            b'+' => (Token::Plus, 1),
            b'-' => (Token::Minus, 1),
            b'*' => (Token::Star, 1),
            b'/' => (Token::Slash, 1),
            b'%' => (Token::Percent, 1),
            b'=' => match self.peek_byte(1) {
                Some(b'=') => (Token::Equal, 2),
                _ => {
                    return Err(ParseError::UnexpectedCharacter {
                        character: '=',
                        position: self.pos,
                    });
                }
            },
            b'!' => match self.peek_byte(1) {
                Some(b'=') => (Token::NotEqual, 2),
                _ => (Token::Not, 1),
            },
            b'<' => match self.peek_byte(1) {
                Some(b'=') => (Token::LessThanOrEqual, 2),
                _ => (Token::LessThan, 1),
            },
            b'>' => match self.peek_byte(1) {
                Some(b'=') => (Token::GreaterThanOrEqual, 2),
                _ => (Token::GreaterThan, 1),
            },
            b'&' if self.peek_byte(1) == Some(b'&') => (Token::And, 2),
            b'|' if self.peek_byte(1) == Some(b'|') => (Token::Or, 2),
            b'\'' | b'"' => {
                let content = self.parse_string_literal(byte)?;
                return Ok(Some(Token::String(content)));
            }
            b'0'..=b'9' => return self.parse_number().map(Some),
            b'#' => {
                if self.peek_byte(1) == Some(b'{') {
                    (Token::HashBrace, 2)
                } else {
                    self.pos += 1;
                    match self.peek_char() {
                        Some(ch) if Self::is_id_start(ch) => {
                            return Ok(Some(Token::Variable(self.parse_identifier())));
                        }
                        _ => {
                            return Err(ParseError::UnexpectedCharacter {
                                character: '#',
                                position: self.token_start,
                            });
                        }
                    }
                }
            }
            _ => {
                let ch = self.peek_char().unwrap_or_default();
                if Self::is_id_start(ch) {
                    let ident = self.parse_identifier();
                    let token = Token::from_keyword(ident).unwrap_or(Token::Identifier(ident));
                    return Ok(Some(token));
                }
                return Err(ParseError::UnexpectedCharacter {
                    character: ch,
                    position: self.pos,
                });
            }
        };

        self.pos += width;
        Ok(Some(token))
    }

    /// Tokenize the whole input with byte spans
    pub fn tokenize_all(&mut self) -> ParseResult<Vec<Spanned<Token<'input>>>> {
        let mut tokens = Vec::with_capacity(16);
        while let Some(token) = self.next_token()? {
            tokens.push(Spanned::new(token, self.token_start, self.pos));
        }
        Ok(tokens)
    }
}

/// Tokenize an expression
pub fn tokenize(input: &str) -> ParseResult<Vec<Spanned<Token<'_>>>> {
    Tokenizer::new(input).tokenize_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token<'_>> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.value)
            .collect()
    }

    #[test]
    fn test_tokenizer_basic() {
        let mut tokenizer = Tokenizer::new("#target.name");

        assert_eq!(
            tokenizer.next_token().unwrap(),
            Some(Token::Variable("target"))
        );
        assert_eq!(tokenizer.next_token().unwrap(), Some(Token::Dot));
        assert_eq!(
            tokenizer.next_token().unwrap(),
            Some(Token::Identifier("name"))
        );
        assert!(tokenizer.next_token().unwrap().is_none());
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("== != < <= > >= && || ! ? :"),
            vec![
                Token::Equal,
                Token::NotEqual,
                Token::LessThan,
                Token::LessThanOrEqual,
                Token::GreaterThan,
                Token::GreaterThanOrEqual,
                Token::And,
                Token::Or,
                Token::Not,
                Token::Question,
                Token::Colon,
            ]
        );
    }

    #[test]
    fn test_keyword_operators() {
        assert_eq!(
            kinds("and or not in eq neq lt lte gt gte true false null"),
            vec![
                Token::And,
                Token::Or,
                Token::Not,
                Token::In,
                Token::Equal,
                Token::NotEqual,
                Token::LessThan,
                Token::LessThanOrEqual,
                Token::GreaterThan,
                Token::GreaterThanOrEqual,
                Token::True,
                Token::False,
                Token::Null,
            ]
        );
        assert_eq!(Token::In.keyword_text(), Some("in"));
        assert_eq!(Token::Identifier("size").keyword_text(), None);
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(
            kinds(r#"'hello world' "double" 'it\'s'"#),
            vec![
                Token::String("hello world"),
                Token::String("double"),
                Token::String(r"it\'s"),
            ]
        );
    }

    #[test]
    fn test_unclosed_string() {
        assert_eq!(
            tokenize("'abc").unwrap_err(),
            ParseError::UnclosedString { position: 0 }
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 3.14 7.size"),
            vec![
                Token::Integer(42),
                Token::Decimal("3.14"),
                Token::Integer(7),
                Token::Dot,
                Token::Identifier("size"),
            ]
        );
        assert!(matches!(
            tokenize("99999999999999999999").unwrap_err(),
            ParseError::InvalidLiteral { position: 0, .. }
        ));
    }

    #[test]
    fn test_map_and_variables() {
        assert_eq!(
            kinds("#{'a': #param[0]}"),
            vec![
                Token::HashBrace,
                Token::String("a"),
                Token::Colon,
                Token::Variable("param"),
                Token::LeftBracket,
                Token::Integer(0),
                Token::RightBracket,
                Token::RightBrace,
            ]
        );
    }

    #[test]
    fn test_unicode_identifiers() {
        assert_eq!(kinds("größe"), vec![Token::Identifier("größe")]);
    }

    #[test]
    fn test_spans() {
        let tokens = tokenize("#target + 10").unwrap();
        assert_eq!((tokens[0].start, tokens[0].end), (0, 7));
        assert_eq!((tokens[1].start, tokens[1].end), (8, 9));
        assert_eq!((tokens[2].start, tokens[2].end), (10, 12));
    }

    #[test]
    fn test_unexpected_characters() {
        assert_eq!(
            tokenize("1 = 2").unwrap_err(),
            ParseError::UnexpectedCharacter {
                character: '=',
                position: 2
            }
        );
        assert!(tokenize("# 1").is_err());
        assert!(tokenize("a @ b").is_err());
    }
}
