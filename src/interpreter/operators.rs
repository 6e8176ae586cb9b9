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

//! Arithmetic, comparison and membership operators

use super::error::{RuntimeError, RuntimeResult};
use crate::ast::{BinaryOperator, UnaryOperator};
use crate::model::Value;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;

/// A numeric operand pair promoted to a common representation
enum Promoted {
    Integer(i64, i64),
    Decimal(Decimal, Decimal),
    Float(f64, f64),
}

/// Promote two numeric values: Integer op Integer stays Integer, any Float
/// widens to Float, otherwise Decimal
fn promote(left: &Value, right: &Value) -> Option<Promoted> {
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => Some(Promoted::Integer(*l, *r)),
        (Value::Float(_), _) | (_, Value::Float(_)) => {
            Some(Promoted::Float(left.to_f64()?, right.to_f64()?))
        }
        (Value::Decimal(l), Value::Decimal(r)) => Some(Promoted::Decimal(*l, *r)),
        (Value::Decimal(l), Value::Integer(r)) => Some(Promoted::Decimal(*l, Decimal::from(*r))),
        (Value::Integer(l), Value::Decimal(r)) => Some(Promoted::Decimal(Decimal::from(*l), *r)),
        _ => None,
    }
}

fn invalid_operands(op: BinaryOperator, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::InvalidOperands {
        operator: op.as_str(),
        left: left.type_name(),
        right: right.type_name(),
    }
}

/// Evaluate `+ - * / %`
pub fn arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> RuntimeResult<Value> {
    if op == BinaryOperator::Add
        && (matches!(left, Value::String(_) | Value::Char(_))
            || matches!(right, Value::String(_) | Value::Char(_)))
    {
        return Ok(Value::String(format!("{left}{right}")));
    }

    let promoted = promote(left, right).ok_or_else(|| invalid_operands(op, left, right))?;
    let overflow = || RuntimeError::Overflow {
        operator: op.as_str(),
    };

    match promoted {
        Promoted::Integer(l, r) => {
            let result = match op {
                BinaryOperator::Add => l.checked_add(r),
                BinaryOperator::Subtract => l.checked_sub(r),
                BinaryOperator::Multiply => l.checked_mul(r),
                BinaryOperator::Divide | BinaryOperator::Modulo if r == 0 => {
                    return Err(RuntimeError::DivisionByZero);
                }
                BinaryOperator::Divide => l.checked_div(r),
                BinaryOperator::Modulo => l.checked_rem(r),
                _ => return Err(invalid_operands(op, left, right)),
            };
            result.map(Value::Integer).ok_or_else(overflow)
        }
        Promoted::Decimal(l, r) => {
            let result = match op {
                BinaryOperator::Add => l.checked_add(r),
                BinaryOperator::Subtract => l.checked_sub(r),
                BinaryOperator::Multiply => l.checked_mul(r),
                BinaryOperator::Divide | BinaryOperator::Modulo if r.is_zero() => {
                    return Err(RuntimeError::DivisionByZero);
                }
                BinaryOperator::Divide => l.checked_div(r),
                BinaryOperator::Modulo => l.checked_rem(r),
                _ => return Err(invalid_operands(op, left, right)),
            };
            result.map(Value::Decimal).ok_or_else(overflow)
        }
        Promoted::Float(l, r) => {
            let result = match op {
                BinaryOperator::Add => l + r,
                BinaryOperator::Subtract => l - r,
                BinaryOperator::Multiply => l * r,
                BinaryOperator::Divide => l / r,
                BinaryOperator::Modulo => l % r,
                _ => return Err(invalid_operands(op, left, right)),
            };
            Ok(Value::Float(result))
        }
    }
}

/// Order two values, `Ok(None)` when they are comparable kinds but unordered (NaN)
fn ordering(op: BinaryOperator, left: &Value, right: &Value) -> RuntimeResult<Option<Ordering>> {
    if let Some(promoted) = promote(left, right) {
        return Ok(match promoted {
            Promoted::Integer(l, r) => Some(l.cmp(&r)),
            Promoted::Decimal(l, r) => Some(l.cmp(&r)),
            Promoted::Float(l, r) => l.partial_cmp(&r),
        });
    }

    let ordering = match (left, right) {
        (Value::String(l), Value::String(r)) => l.cmp(r),
        (Value::Char(l), Value::Char(r)) => l.cmp(r),
        (Value::String(l), Value::Char(r)) => l.as_str().cmp(r.to_string().as_str()),
        (Value::Char(l), Value::String(r)) => l.to_string().as_str().cmp(r.as_str()),
        (Value::Boolean(l), Value::Boolean(r)) => l.cmp(r),
        (Value::Date(l), Value::Date(r)) => l.cmp(r),
        (Value::DateTime(l), Value::DateTime(r)) => l.cmp(r),
        _ => return Err(invalid_operands(op, left, right)),
    };
    Ok(Some(ordering))
}

/// Evaluate `< <= > >=`
pub fn compare(op: BinaryOperator, left: &Value, right: &Value) -> RuntimeResult<Value> {
    let Some(ord) = ordering(op, left, right)? else {
        return Ok(Value::Boolean(false));
    };
    let result = match op {
        BinaryOperator::LessThan => ord == Ordering::Less,
        BinaryOperator::LessThanOrEqual => ord != Ordering::Greater,
        BinaryOperator::GreaterThan => ord == Ordering::Greater,
        BinaryOperator::GreaterThanOrEqual => ord != Ordering::Less,
        _ => return Err(invalid_operands(op, left, right)),
    };
    Ok(Value::Boolean(result))
}

/// Numeric-aware structural equality
pub fn equals(left: &Value, right: &Value) -> bool {
    if let Some(promoted) = promote(left, right) {
        return match promoted {
            Promoted::Integer(l, r) => l == r,
            Promoted::Decimal(l, r) => l == r,
            Promoted::Float(l, r) => l == r,
        };
    }

    match (left, right) {
        (Value::String(s), Value::Char(c)) | (Value::Char(c), Value::String(s)) => {
            let mut chars = s.chars();
            chars.next() == Some(*c) && chars.next().is_none()
        }
        (Value::List(l), Value::List(r)) | (Value::Set(l), Value::Set(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| equals(a, b))
        }
        (Value::Map(l), Value::Map(r)) => {
            l.len() == r.len()
                && l.iter()
                    .all(|(key, a)| r.get(key).is_some_and(|b| equals(a, b)))
        }
        _ => left == right,
    }
}

/// Evaluate `in`: element of a list or set, key of a map, or substring of a string
pub fn contains(op: BinaryOperator, item: &Value, collection: &Value) -> RuntimeResult<bool> {
    match collection {
        Value::List(items) | Value::Set(items) => Ok(items.iter().any(|v| equals(item, v))),
        Value::Map(entries) => Ok(match item {
            Value::String(key) => entries.contains_key(key),
            Value::Char(c) => entries.contains_key(c.to_string().as_str()),
            _ => false,
        }),
        Value::String(haystack) => match item {
            Value::String(needle) => Ok(haystack.contains(needle.as_str())),
            Value::Char(c) => Ok(haystack.contains(*c)),
            _ => Err(invalid_operands(op, item, collection)),
        },
        _ => Err(invalid_operands(op, item, collection)),
    }
}

/// Evaluate a unary operator
pub fn unary(op: UnaryOperator, operand: &Value) -> RuntimeResult<Value> {
    match op {
        UnaryOperator::Not => Ok(Value::Boolean(!operand.is_truthy())),
        UnaryOperator::Negate => match operand {
            Value::Integer(i) => i
                .checked_neg()
                .map(Value::Integer)
                .ok_or(RuntimeError::Overflow { operator: "-" }),
            Value::Float(f) => Ok(Value::Float(-f)),
            Value::Decimal(d) => Ok(Value::Decimal(-*d)),
            other => Err(RuntimeError::InvalidOperand {
                operator: "-",
                operand: other.type_name(),
            }),
        },
    }
}

/// Truncate a numeric value to `i64`
pub(crate) fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Decimal(d) => d.trunc().to_i64(),
        Value::Float(f) if f.is_finite() => {
            let truncated = f.trunc();
            (truncated >= i64::MIN as f64 && truncated < i64::MAX as f64)
                .then_some(truncated as i64)
        }
        _ => None,
    }
}
