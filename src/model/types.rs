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

//! Runtime type descriptors for expression results
//!
//! A [`ValueType`] is a first-class value describing what shape of data an
//! expression is expected to produce. It carries enough information to test
//! any [`Value`] for assignability, including element types of containers.

use super::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Type descriptor for expression values
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Unconstrained type, accepts any value
    Any,
    /// Boolean value
    Boolean,
    /// 64-bit signed integer
    Integer,
    /// 64-bit floating point number
    Float,
    /// Arbitrary precision decimal
    Decimal,
    /// Any numeric value (integer, float or decimal)
    Number,
    /// String value
    String,
    /// Single character
    Char,
    /// Calendar date without time
    Date,
    /// Date and time without timezone
    DateTime,
    /// Ordered list with element type
    List(Box<ValueType>),
    /// Insertion-ordered set with element type
    Set(Box<ValueType>),
    /// String-keyed map with value type
    Map(Box<ValueType>),
}

impl ValueType {
    /// List of the given element type
    pub fn list_of(element: ValueType) -> Self {
        ValueType::List(Box::new(element))
    }

    /// Set of the given element type
    pub fn set_of(element: ValueType) -> Self {
        ValueType::Set(Box::new(element))
    }

    /// Map with the given value type
    pub fn map_of(value: ValueType) -> Self {
        ValueType::Map(Box::new(value))
    }

    /// Whether this descriptor restricts anything at all
    pub fn is_constrained(&self) -> bool {
        !matches!(self, ValueType::Any)
    }

    /// Check whether a runtime value is assignable to this type.
    ///
    /// `Null` is assignable to every type, at the top level and inside
    /// containers. Container element types are checked recursively.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (ValueType::Any, _) => true,
            (ValueType::Number, v) => v.is_numeric(),
            (ValueType::Boolean, Value::Boolean(_))
            | (ValueType::Integer, Value::Integer(_))
            | (ValueType::Float, Value::Float(_))
            | (ValueType::Decimal, Value::Decimal(_))
            | (ValueType::String, Value::String(_))
            | (ValueType::Char, Value::Char(_))
            | (ValueType::Date, Value::Date(_))
            | (ValueType::DateTime, Value::DateTime(_)) => true,
            (ValueType::List(elem), Value::List(items))
            | (ValueType::Set(elem), Value::Set(items)) => {
                !elem.is_constrained() || items.iter().all(|item| elem.accepts(item))
            }
            (ValueType::Map(elem), Value::Map(entries)) => {
                !elem.is_constrained() || entries.values().all(|v| elem.accepts(v))
            }
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Any => write!(f, "Any"),
            ValueType::Boolean => write!(f, "Boolean"),
            ValueType::Integer => write!(f, "Integer"),
            ValueType::Float => write!(f, "Float"),
            ValueType::Decimal => write!(f, "Decimal"),
            ValueType::Number => write!(f, "Number"),
            ValueType::String => write!(f, "String"),
            ValueType::Char => write!(f, "Char"),
            ValueType::Date => write!(f, "Date"),
            ValueType::DateTime => write!(f, "DateTime"),
            ValueType::List(elem) => write!(f, "List<{elem}>"),
            ValueType::Set(elem) => write!(f, "Set<{elem}>"),
            ValueType::Map(elem) => write!(f, "Map<{elem}>"),
        }
    }
}

/// Error returned when a type name cannot be understood
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown type name '{name}'")]
pub struct UnknownTypeError {
    /// The name that failed to parse
    pub name: String,
}

impl FromStr for ValueType {
    type Err = UnknownTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let unknown = || UnknownTypeError {
            name: name.to_string(),
        };

        if let Some(open) = name.find('<') {
            let inner = name[open + 1..].strip_suffix('>').ok_or_else(unknown)?;
            let elem: ValueType = inner.parse().map_err(|_| unknown())?;
            return match name[..open].trim() {
                "List" | "Array" => Ok(ValueType::list_of(elem)),
                "Set" => Ok(ValueType::set_of(elem)),
                "Map" => Ok(ValueType::map_of(elem)),
                _ => Err(unknown()),
            };
        }

        match name {
            "Any" | "Object" => Ok(ValueType::Any),
            "Boolean" | "Bool" => Ok(ValueType::Boolean),
            "Integer" | "Int" | "Long" => Ok(ValueType::Integer),
            "Float" | "Double" => Ok(ValueType::Float),
            "Decimal" => Ok(ValueType::Decimal),
            "Number" => Ok(ValueType::Number),
            "String" => Ok(ValueType::String),
            "Char" | "Character" => Ok(ValueType::Char),
            "Date" => Ok(ValueType::Date),
            "DateTime" => Ok(ValueType::DateTime),
            "List" | "Array" => Ok(ValueType::list_of(ValueType::Any)),
            "Set" => Ok(ValueType::set_of(ValueType::Any)),
            "Map" => Ok(ValueType::map_of(ValueType::Any)),
            _ => Err(unknown()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_any_accepts_everything() {
        assert!(ValueType::Any.accepts(&Value::Integer(1)));
        assert!(ValueType::Any.accepts(&Value::String("x".into())));
        assert!(ValueType::Any.accepts(&Value::List(vec![])));
        assert!(!ValueType::Any.is_constrained());
    }

    #[test]
    fn test_null_accepted_by_every_type() {
        for ty in [
            ValueType::Integer,
            ValueType::String,
            ValueType::list_of(ValueType::Boolean),
            ValueType::map_of(ValueType::Date),
        ] {
            assert!(ty.accepts(&Value::Null), "{ty} should accept null");
        }
    }

    #[test]
    fn test_scalar_mismatch() {
        assert!(!ValueType::Integer.accepts(&Value::String("5".into())));
        assert!(!ValueType::Integer.accepts(&Value::Float(5.0)));
        assert!(!ValueType::String.accepts(&Value::Char('a')));
    }

    #[test]
    fn test_number_accepts_all_numeric_kinds() {
        assert!(ValueType::Number.accepts(&Value::Integer(1)));
        assert!(ValueType::Number.accepts(&Value::Float(1.5)));
        assert!(ValueType::Number.accepts(&Value::Decimal(Decimal::new(15, 1))));
        assert!(!ValueType::Number.accepts(&Value::Boolean(true)));
    }

    #[test]
    fn test_container_elements_checked() {
        let strings = ValueType::list_of(ValueType::String);
        let good = Value::List(vec!["a".into(), Value::Null, "b".into()]);
        let bad = Value::List(vec!["a".into(), Value::Integer(1)]);
        assert!(strings.accepts(&good));
        assert!(!strings.accepts(&bad));
        assert!(!strings.accepts(&Value::set(vec![Value::from("a")])));
    }

    #[test]
    fn test_display_and_parse() {
        let ty = ValueType::map_of(ValueType::list_of(ValueType::Integer));
        assert_eq!(ty.to_string(), "Map<List<Integer>>");
        assert_eq!("Map<List<Integer>>".parse::<ValueType>().unwrap(), ty);
        assert_eq!("Object".parse::<ValueType>().unwrap(), ValueType::Any);
        assert!("Widget".parse::<ValueType>().is_err());
        assert!("List<Integer".parse::<ValueType>().is_err());
    }
}
