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

//! Expression AST node definitions

use super::operator::{BinaryOperator, UnaryOperator};
use rust_decimal::Decimal;
use smallvec::SmallVec;

/// Method arguments; most calls take at most two
pub type Arguments = SmallVec<[ExpressionNode; 2]>;

/// AST representation of an expression
///
/// Large variants are boxed to keep the enum small.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExpressionNode {
    /// Literal value (string, number, boolean, null)
    Literal(LiteralValue),

    /// Context variable reference (`#target`, `#param`, `#this`)
    Variable(String),

    /// Property navigation; a missing base means the current root (`name`, `a.name`)
    Property {
        /// Base expression
        base: Option<Box<ExpressionNode>>,
        /// Property name
        name: String,
    },

    /// Index access (`base[index]`)
    Index {
        /// Base expression
        base: Box<ExpressionNode>,
        /// Index expression
        index: Box<ExpressionNode>,
    },

    /// Method call (`base.method(args)`, or `method(args)` on the current root)
    MethodCall(Box<MethodCallData>),

    /// Projection (`base.{ expr }`), evaluated with each element as `#this`
    Projection {
        /// Collection expression
        base: Box<ExpressionNode>,
        /// Expression applied to every element
        mapping: Box<ExpressionNode>,
    },

    /// Selection (`base.{? expr }`), keeps elements the condition holds for
    Selection {
        /// Collection expression
        base: Box<ExpressionNode>,
        /// Filter condition
        condition: Box<ExpressionNode>,
    },

    /// Binary operation (boxed for size optimization)
    BinaryOp(Box<BinaryOpData>),

    /// Unary operation
    UnaryOp {
        /// The operator
        op: UnaryOperator,
        /// The operand
        operand: Box<ExpressionNode>,
    },

    /// Conditional expression (`cond ? a : b`)
    Conditional(Box<ConditionalData>),

    /// List literal (`{a, b, c}`)
    List(Vec<ExpressionNode>),

    /// Map literal (`#{ 'k' : v }`)
    Map(Vec<(ExpressionNode, ExpressionNode)>),
}

/// Binary operation data (separate struct to optimize enum size)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryOpData {
    /// The operator
    pub op: BinaryOperator,
    /// Left operand
    pub left: ExpressionNode,
    /// Right operand
    pub right: ExpressionNode,
}

/// Method call data (separate struct to optimize enum size)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodCallData {
    /// Receiver; `None` calls the method on the current root
    pub base: Option<ExpressionNode>,
    /// Method name
    pub method: String,
    /// Method arguments
    pub args: Arguments,
}

/// Conditional expression data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConditionalData {
    /// Condition
    pub condition: ExpressionNode,
    /// Value when the condition is truthy
    pub then_expr: ExpressionNode,
    /// Value otherwise
    pub else_expr: ExpressionNode,
}

/// Literal values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    /// Null literal
    Null,
    /// Boolean literal
    Boolean(bool),
    /// Integer literal
    Integer(i64),
    /// Decimal literal, parsed at compile time
    Decimal(Decimal),
    /// String literal with escapes resolved
    String(String),
}

impl ExpressionNode {
    /// Create a literal expression
    pub fn literal(value: LiteralValue) -> Self {
        Self::Literal(value)
    }

    /// Create a variable reference
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Create a property access on the current root
    pub fn property(name: impl Into<String>) -> Self {
        Self::Property {
            base: None,
            name: name.into(),
        }
    }

    /// Create a property access on `base`
    pub fn path(base: ExpressionNode, name: impl Into<String>) -> Self {
        Self::Property {
            base: Some(Box::new(base)),
            name: name.into(),
        }
    }

    /// Create an index access expression
    pub fn index(base: ExpressionNode, index: ExpressionNode) -> Self {
        Self::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    /// Create a method call expression
    pub fn method_call(
        base: Option<ExpressionNode>,
        method: impl Into<String>,
        args: impl Into<Arguments>,
    ) -> Self {
        Self::MethodCall(Box::new(MethodCallData {
            base,
            method: method.into(),
            args: args.into(),
        }))
    }

    /// Create a projection expression
    pub fn projection(base: ExpressionNode, mapping: ExpressionNode) -> Self {
        Self::Projection {
            base: Box::new(base),
            mapping: Box::new(mapping),
        }
    }

    /// Create a selection expression
    pub fn selection(base: ExpressionNode, condition: ExpressionNode) -> Self {
        Self::Selection {
            base: Box::new(base),
            condition: Box::new(condition),
        }
    }

    /// Create a binary operation expression
    pub fn binary_op(op: BinaryOperator, left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::BinaryOp(Box::new(BinaryOpData { op, left, right }))
    }

    /// Create a unary operation expression
    pub fn unary_op(op: UnaryOperator, operand: ExpressionNode) -> Self {
        Self::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Create a conditional expression
    pub fn conditional(
        condition: ExpressionNode,
        then_expr: ExpressionNode,
        else_expr: ExpressionNode,
    ) -> Self {
        Self::Conditional(Box::new(ConditionalData {
            condition,
            then_expr,
            else_expr,
        }))
    }

    /// Check if this is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }
}
