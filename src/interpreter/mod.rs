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

//! Tree-walking interpreter for parsed expressions
//!
//! Evaluation is a recursive walk over [`ExpressionNode`]. Bare identifiers
//! and method calls without a receiver resolve against the current value,
//! `#this`, which starts as the root and is rebound to each element inside
//! projections and selections.

pub mod error;
pub mod methods;
pub mod operators;

pub use error::{RuntimeError, RuntimeResult};
pub use methods::RegexCache;

use crate::ast::{BinaryOpData, BinaryOperator, ExpressionNode, LiteralValue, MethodCallData};
use crate::evaluator::EvaluationContext;
use crate::model::Value;
use indexmap::IndexMap;
use std::sync::Arc;

/// Variable bound to the current element
pub const THIS_VARIABLE: &str = "this";
/// Variable bound to the evaluation root
pub const ROOT_VARIABLE: &str = "root";

/// Default nesting limit for a single evaluation
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Bindings visible at one point of the walk
#[derive(Clone, Copy)]
struct Scope<'a> {
    context: EvaluationContext<'a>,
    root: &'a Value,
    this: &'a Value,
}

/// Expression interpreter
///
/// Clones share one pattern cache.
#[derive(Debug, Clone)]
pub struct Interpreter {
    max_depth: usize,
    regexes: Arc<RegexCache>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl Interpreter {
    /// Create an interpreter with the given nesting limit
    pub fn new(max_depth: usize) -> Self {
        Self::with_regex_cache(max_depth, Arc::new(RegexCache::default()))
    }

    /// Create an interpreter using the given pattern cache
    pub fn with_regex_cache(max_depth: usize, regexes: Arc<RegexCache>) -> Self {
        Self { max_depth, regexes }
    }

    /// Compiled patterns used by `matches` and `split`
    pub fn regex_cache(&self) -> &RegexCache {
        &self.regexes
    }

    /// Evaluate `node` with `root` as both `#root` and the initial `#this`
    pub fn evaluate(
        &self,
        node: &ExpressionNode,
        context: &EvaluationContext<'_>,
        root: &Value,
    ) -> RuntimeResult<Value> {
        let scope = Scope {
            context: *context,
            root,
            this: root,
        };
        self.evaluate_node(node, scope, 0)
    }

    fn evaluate_node(
        &self,
        node: &ExpressionNode,
        scope: Scope<'_>,
        depth: usize,
    ) -> RuntimeResult<Value> {
        if depth > self.max_depth {
            return Err(RuntimeError::RecursionLimit {
                max_depth: self.max_depth,
            });
        }
        let depth = depth + 1;

        match node {
            ExpressionNode::Literal(literal) => Ok(evaluate_literal(literal)),

            ExpressionNode::Variable(name) => evaluate_variable(name, scope),

            ExpressionNode::Property { base, name } => match base {
                Some(base) => {
                    let receiver = self.evaluate_node(base, scope, depth)?;
                    methods::property(&receiver, name)
                }
                None => methods::property(scope.this, name),
            },

            ExpressionNode::Index { base, index } => {
                let receiver = self.evaluate_node(base, scope, depth)?;
                let index = self.evaluate_node(index, scope, depth)?;
                methods::index(&receiver, &index)
            }

            ExpressionNode::MethodCall(data) => self.evaluate_method_call(data, scope, depth),

            ExpressionNode::Projection { base, mapping } => {
                let collection = self.evaluate_node(base, scope, depth)?;
                let items = iterable(&collection)?;
                let mut projected = Vec::with_capacity(items.len());
                for item in items {
                    let inner = Scope { this: item, ..scope };
                    projected.push(self.evaluate_node(mapping, inner, depth)?);
                }
                Ok(Value::List(projected))
            }

            ExpressionNode::Selection { base, condition } => {
                let collection = self.evaluate_node(base, scope, depth)?;
                let items = iterable(&collection)?;
                let mut selected = Vec::new();
                for item in items {
                    let inner = Scope { this: item, ..scope };
                    if self.evaluate_node(condition, inner, depth)?.is_truthy() {
                        selected.push(item.clone());
                    }
                }
                Ok(match collection {
                    Value::Set(_) => Value::Set(selected),
                    _ => Value::List(selected),
                })
            }

            ExpressionNode::BinaryOp(data) => self.evaluate_binary_operation(data, scope, depth),

            ExpressionNode::UnaryOp { op, operand } => {
                let value = self.evaluate_node(operand, scope, depth)?;
                operators::unary(*op, &value)
            }

            ExpressionNode::Conditional(data) => {
                let condition = self.evaluate_node(&data.condition, scope, depth)?;
                if condition.is_truthy() {
                    self.evaluate_node(&data.then_expr, scope, depth)
                } else {
                    self.evaluate_node(&data.else_expr, scope, depth)
                }
            }

            ExpressionNode::List(items) => items
                .iter()
                .map(|item| self.evaluate_node(item, scope, depth))
                .collect::<RuntimeResult<Vec<_>>>()
                .map(Value::List),

            ExpressionNode::Map(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = match self.evaluate_node(key, scope, depth)? {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    map.insert(key, self.evaluate_node(value, scope, depth)?);
                }
                Ok(Value::Map(map))
            }
        }
    }

    fn evaluate_method_call(
        &self,
        data: &MethodCallData,
        scope: Scope<'_>,
        depth: usize,
    ) -> RuntimeResult<Value> {
        let receiver = match &data.base {
            Some(base) => self.evaluate_node(base, scope, depth)?,
            None => scope.this.clone(),
        };
        let args = data
            .args
            .iter()
            .map(|arg| self.evaluate_node(arg, scope, depth))
            .collect::<RuntimeResult<Vec<_>>>()?;
        methods::call(&self.regexes, &receiver, &data.method, &args)
    }

    fn evaluate_binary_operation(
        &self,
        data: &BinaryOpData,
        scope: Scope<'_>,
        depth: usize,
    ) -> RuntimeResult<Value> {
        let left = self.evaluate_node(&data.left, scope, depth)?;

        // short-circuit before touching the right operand
        match data.op {
            BinaryOperator::And if !left.is_truthy() => return Ok(Value::Boolean(false)),
            BinaryOperator::Or if left.is_truthy() => return Ok(Value::Boolean(true)),
            _ => {}
        }

        let right = self.evaluate_node(&data.right, scope, depth)?;
        match data.op {
            BinaryOperator::And | BinaryOperator::Or => Ok(Value::Boolean(right.is_truthy())),
            BinaryOperator::Equal => Ok(Value::Boolean(operators::equals(&left, &right))),
            BinaryOperator::NotEqual => Ok(Value::Boolean(!operators::equals(&left, &right))),
            BinaryOperator::In => operators::contains(data.op, &left, &right).map(Value::Boolean),
            BinaryOperator::NotIn => {
                operators::contains(data.op, &left, &right).map(|found| Value::Boolean(!found))
            }
            op if op.is_ordering() => operators::compare(op, &left, &right),
            op => operators::arithmetic(op, &left, &right),
        }
    }
}

fn evaluate_literal(literal: &LiteralValue) -> Value {
    match literal {
        LiteralValue::Null => Value::Null,
        LiteralValue::Boolean(b) => Value::Boolean(*b),
        LiteralValue::Integer(i) => Value::Integer(*i),
        LiteralValue::Decimal(d) => Value::Decimal(*d),
        LiteralValue::String(s) => Value::String(s.clone()),
    }
}

fn evaluate_variable(name: &str, scope: Scope<'_>) -> RuntimeResult<Value> {
    match name {
        THIS_VARIABLE => Ok(scope.this.clone()),
        ROOT_VARIABLE => Ok(scope.root.clone()),
        _ => scope
            .context
            .variable(name)
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
            }),
    }
}

fn iterable(value: &Value) -> RuntimeResult<&[Value]> {
    match value {
        Value::Null => Err(RuntimeError::null_target("iterate")),
        other => other.as_slice().ok_or(RuntimeError::NotIterable {
            type_name: other.type_name(),
        }),
    }
}
