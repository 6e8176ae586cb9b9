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

//! Bridge from dynamic values to native Rust result types

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::{IndexMap, IndexSet};
use rust_decimal::Decimal;
use std::hash::Hash;

use super::types::ValueType;
use super::value::Value;

/// A native type an expression result can be extracted into.
///
/// `value_type` is the descriptor checked at runtime before extraction;
/// `from_value` must succeed for every non-null value that descriptor accepts.
pub trait FromValue: Sized {
    /// Runtime descriptor corresponding to `Self`
    fn value_type() -> ValueType;

    /// Extract `Self`; `None` when the value has a different shape
    fn from_value(value: Value) -> Option<Self>;
}

impl FromValue for Value {
    fn value_type() -> ValueType {
        ValueType::Any
    }

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

macro_rules! scalar_from_value {
    ($ty:ty, $variant:ident) => {
        impl FromValue for $ty {
            fn value_type() -> ValueType {
                ValueType::$variant
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

scalar_from_value!(bool, Boolean);
scalar_from_value!(i64, Integer);
scalar_from_value!(f64, Float);
scalar_from_value!(Decimal, Decimal);
scalar_from_value!(String, String);
scalar_from_value!(char, Char);
scalar_from_value!(NaiveDate, Date);
scalar_from_value!(NaiveDateTime, DateTime);

/// Nullable element, so containers holding nulls can still be extracted
impl<T: FromValue> FromValue for Option<T> {
    fn value_type() -> ValueType {
        T::value_type()
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn value_type() -> ValueType {
        ValueType::list_of(T::value_type())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl<T: FromValue + Hash + Eq> FromValue for IndexSet<T> {
    fn value_type() -> ValueType {
        ValueType::set_of(T::value_type())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Set(items) => items.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for IndexMap<String, T> {
    fn value_type() -> ValueType {
        ValueType::map_of(T::value_type())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
                .collect(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptors() {
        assert_eq!(<i64 as FromValue>::value_type(), ValueType::Integer);
        assert_eq!(
            <Vec<String> as FromValue>::value_type(),
            ValueType::list_of(ValueType::String)
        );
        assert_eq!(
            <IndexMap<String, Vec<bool>> as FromValue>::value_type(),
            ValueType::map_of(ValueType::list_of(ValueType::Boolean))
        );
        assert_eq!(<Value as FromValue>::value_type(), ValueType::Any);
    }

    #[test]
    fn test_extract_nested() {
        let value = Value::list(vec!["a", "b"]);
        assert_eq!(
            Vec::<String>::from_value(value),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(i64::from_value(Value::from("x")), None);
    }

    #[test]
    fn test_nullable_elements() {
        let value = Value::List(vec![Value::Integer(1), Value::Null]);
        assert_eq!(Vec::<i64>::from_value(value.clone()), None);
        assert_eq!(
            Vec::<Option<i64>>::from_value(value),
            Some(vec![Some(1), None])
        );
    }

    #[test]
    fn test_set_extraction() {
        let value = Value::set(vec![1i64, 2, 2, 3]);
        let set = IndexSet::<i64>::from_value(value).unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
