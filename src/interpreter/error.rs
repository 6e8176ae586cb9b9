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

// Error types for expression evaluation

use thiserror::Error;

/// Result type for evaluation operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors raised while evaluating a compiled expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Variable not bound in the evaluation context
    #[error("Variable #{name} is not defined")]
    UndefinedVariable {
        /// Variable name without the leading `#`
        name: String,
    },

    /// Navigation or call on a null value
    #[error("Cannot {operation} on null")]
    NullTarget {
        /// What was attempted, e.g. "read property 'name'"
        operation: String,
    },

    /// Property not available on the value
    #[error("Property {property} not found on {type_name}")]
    NoSuchProperty {
        /// Property name
        property: String,
        /// Type name of the receiver
        type_name: &'static str,
    },

    /// Method not available on the value
    #[error("Method {method}() not found on {type_name}")]
    NoSuchMethod {
        /// Method name
        method: String,
        /// Type name of the receiver
        type_name: &'static str,
    },

    /// Method called with the wrong number or kind of arguments
    #[error("Invalid arguments for {method}(): {message}")]
    InvalidArguments {
        /// Method name
        method: String,
        /// What was wrong
        message: String,
    },

    /// Binary operator applied to unsupported operand types
    #[error("Operator {operator} cannot be applied to {left} and {right}")]
    InvalidOperands {
        /// Operator symbol
        operator: &'static str,
        /// Left operand type name
        left: &'static str,
        /// Right operand type name
        right: &'static str,
    },

    /// Unary operator applied to an unsupported operand type
    #[error("Operator {operator} cannot be applied to {operand}")]
    InvalidOperand {
        /// Operator symbol
        operator: &'static str,
        /// Operand type name
        operand: &'static str,
    },

    /// Exact division or remainder by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Integer arithmetic overflow
    #[error("Arithmetic overflow in {operator}")]
    Overflow {
        /// Operator symbol
        operator: &'static str,
    },

    /// Index out of bounds
    #[error("Index {index} out of bounds for {type_name} of size {size}")]
    IndexOutOfBounds {
        /// Requested index
        index: i64,
        /// Collection size
        size: usize,
        /// Type name of the indexed value
        type_name: &'static str,
    },

    /// Index applied to a value that cannot be indexed by that key
    #[error("{type_name} cannot be indexed by {index_type}")]
    NotIndexable {
        /// Type name of the indexed value
        type_name: &'static str,
        /// Type name of the index
        index_type: &'static str,
    },

    /// Projection or selection over a value that is not a collection
    #[error("{type_name} is not a collection")]
    NotIterable {
        /// Type name of the value
        type_name: &'static str,
    },

    /// Regular expression failed to compile
    #[error("Invalid regular expression '{pattern}': {message}")]
    InvalidRegex {
        /// The pattern
        pattern: String,
        /// Regex engine diagnostic
        message: String,
    },

    /// Expression nesting exceeded the configured depth
    #[error("Maximum evaluation depth {max_depth} exceeded")]
    RecursionLimit {
        /// Configured limit
        max_depth: usize,
    },
}

impl RuntimeError {
    pub(crate) fn invalid_arguments(method: &str, message: impl Into<String>) -> Self {
        RuntimeError::InvalidArguments {
            method: method.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn null_target(operation: impl Into<String>) -> Self {
        RuntimeError::NullTarget {
            operation: operation.into(),
        }
    }
}
