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

//! Parser error types

use thiserror::Error;

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Parse error with location information
///
/// Positions are byte offsets into the expression source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Unexpected token
    #[error("Unexpected token '{token}' at position {position}")]
    UnexpectedToken {
        /// The unexpected token that was found
        token: String,
        /// Position where the token was found
        position: usize,
    },

    /// Unexpected end of input
    #[error("Unexpected end of input at position {position}")]
    UnexpectedEof {
        /// Position where more input was expected
        position: usize,
    },

    /// Expected token
    #[error("Expected {expected} at position {position}, found '{found}'")]
    ExpectedToken {
        /// The expected token description
        expected: String,
        /// The token that was found instead
        found: String,
        /// Position where the token was expected
        position: usize,
    },

    /// Invalid literal value
    #[error("Invalid {literal_type} literal at position {position}: {value}")]
    InvalidLiteral {
        /// Type of literal that failed to parse
        literal_type: &'static str,
        /// The invalid value that was encountered
        value: String,
        /// Position where the invalid literal was found
        position: usize,
    },

    /// Invalid escape sequence
    #[error("Invalid escape sequence at position {position}: {sequence}")]
    InvalidEscape {
        /// The invalid escape sequence
        sequence: String,
        /// Position where the escape sequence was found
        position: usize,
    },

    /// Unclosed string literal
    #[error("Unclosed string literal starting at position {position}")]
    UnclosedString {
        /// Position where the unclosed string started
        position: usize,
    },

    /// Character that cannot start any token
    #[error("Unexpected character '{character}' at position {position}")]
    UnexpectedCharacter {
        /// The offending character
        character: char,
        /// Position of the character
        position: usize,
    },

    /// Expression nested deeper than the parser allows
    #[error("Expression nesting exceeds {max_depth} levels at position {position}")]
    NestingTooDeep {
        /// Nesting limit that was hit
        max_depth: usize,
        /// Position where the limit was reached
        position: usize,
    },
}

impl ParseError {
    /// Byte offset the error refers to
    pub fn position(&self) -> usize {
        match self {
            ParseError::UnexpectedToken { position, .. }
            | ParseError::UnexpectedEof { position }
            | ParseError::ExpectedToken { position, .. }
            | ParseError::InvalidLiteral { position, .. }
            | ParseError::InvalidEscape { position, .. }
            | ParseError::UnclosedString { position }
            | ParseError::UnexpectedCharacter { position, .. }
            | ParseError::NestingTooDeep { position, .. } => *position,
        }
    }
}
