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

// Error types for typed expression evaluation

use crate::model::ValueType;
use thiserror::Error;

/// Boxed engine failure kept as the cause of an [`ExpressionError`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for expression operations
pub type Result<T> = std::result::Result<T, ExpressionError>;

/// Errors that can occur while building or evaluating a typed expression
#[derive(Error, Debug)]
pub enum ExpressionError {
    /// Evaluator built without a required component
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What was missing or malformed
        message: String,
    },

    /// The engine rejected the expression text
    #[error("Cannot compile expression \"{expression}\": {cause}")]
    Compilation {
        /// Offending expression source
        expression: String,
        /// Engine diagnostic
        #[source]
        cause: BoxError,
    },

    /// The engine failed while running a compiled expression
    #[error("Error evaluating expression \"{expression}\": {cause}")]
    Evaluation {
        /// Expression source
        expression: String,
        /// Original engine failure
        #[source]
        cause: BoxError,
    },

    /// The produced value does not satisfy the declared result type
    #[error("Result of expression \"{expression}\" has type {actual}, which is not assignable to {expected}")]
    TypeMismatch {
        /// Expression source
        expression: String,
        /// Declared result type
        expected: ValueType,
        /// Runtime type of the produced value
        actual: ValueType,
    },
}

impl ExpressionError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ExpressionError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Wrap an engine compile failure
    pub fn compilation(expression: &str, cause: impl Into<BoxError>) -> Self {
        ExpressionError::Compilation {
            expression: expression.to_string(),
            cause: cause.into(),
        }
    }

    /// Wrap an engine evaluation failure
    pub fn evaluation(expression: &str, cause: impl Into<BoxError>) -> Self {
        ExpressionError::Evaluation {
            expression: expression.to_string(),
            cause: cause.into(),
        }
    }

    /// Expression source the error refers to, if any
    pub fn expression(&self) -> Option<&str> {
        match self {
            ExpressionError::InvalidArgument { .. } => None,
            ExpressionError::Compilation { expression, .. }
            | ExpressionError::Evaluation { expression, .. }
            | ExpressionError::TypeMismatch { expression, .. } => Some(expression),
        }
    }

    /// Check for [`ExpressionError::InvalidArgument`]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, ExpressionError::InvalidArgument { .. })
    }

    /// Check for [`ExpressionError::Compilation`]
    pub fn is_compilation(&self) -> bool {
        matches!(self, ExpressionError::Compilation { .. })
    }

    /// Check for [`ExpressionError::Evaluation`]
    pub fn is_evaluation(&self) -> bool {
        matches!(self, ExpressionError::Evaluation { .. })
    }

    /// Check for [`ExpressionError::TypeMismatch`]
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, ExpressionError::TypeMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Error, Debug)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_cause_is_preserved() {
        let err = ExpressionError::evaluation("1/0", Boom);
        assert!(err.is_evaluation());
        assert_eq!(err.expression(), Some("1/0"));
        assert_eq!(err.source().map(|e| e.to_string()), Some("boom".to_string()));
        assert_eq!(
            err.to_string(),
            "Error evaluating expression \"1/0\": boom"
        );
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = ExpressionError::TypeMismatch {
            expression: "'x'".to_string(),
            expected: ValueType::Integer,
            actual: ValueType::String,
        };
        assert_eq!(
            err.to_string(),
            "Result of expression \"'x'\" has type String, which is not assignable to Integer"
        );
        assert!(err.is_type_mismatch());
    }

    #[test]
    fn test_invalid_argument_has_no_expression() {
        let err = ExpressionError::invalid_argument("Result type cannot be null");
        assert!(err.is_invalid_argument());
        assert_eq!(err.expression(), None);
    }
}
