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

//! Property access, indexing and built-in methods

use super::error::{RuntimeError, RuntimeResult};
use super::operators::{equals, to_integer};
use crate::cache::{CacheConfig, CacheStats, ExpressionCache};
use crate::model::Value;
use regex::Regex;
use std::sync::Arc;

/// Default number of compiled patterns kept per interpreter
pub const DEFAULT_REGEX_CAPACITY: usize = 256;

/// Bounded cache of patterns used by `matches` and `split`
#[derive(Debug)]
pub struct RegexCache {
    patterns: ExpressionCache<Regex>,
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_REGEX_CAPACITY)
    }
}

impl RegexCache {
    /// Keep at most `capacity` compiled patterns, evicting least recently used ones
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            patterns: ExpressionCache::with_config(CacheConfig::bounded(capacity)),
        }
    }

    /// Cache statistics
    pub fn stats(&self) -> CacheStats {
        self.patterns.stats()
    }

    /// Compile `pattern` once; `anchored` wraps it for whole-string matching
    fn get(&self, pattern: &str, anchored: bool) -> RuntimeResult<Arc<Regex>> {
        let source = if anchored {
            format!("^(?:{pattern})$")
        } else {
            pattern.to_string()
        };
        self.patterns
            .get_or_compile(&source, Regex::new)
            .map_err(|e| RuntimeError::InvalidRegex {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn size_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(char_len(s)),
        Value::List(items) | Value::Set(items) => Some(items.len()),
        Value::Map(entries) => Some(entries.len()),
        _ => None,
    }
}

fn as_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Resolve `receiver.name`
pub fn property(receiver: &Value, name: &str) -> RuntimeResult<Value> {
    if let Value::Map(entries) = receiver {
        if let Some(value) = entries.get(name) {
            return Ok(value.clone());
        }
    }

    match (receiver, name) {
        (Value::Null, _) => Err(RuntimeError::null_target(format!(
            "read property '{name}'"
        ))),
        (_, "length" | "size") if size_of(receiver).is_some() => {
            Ok(Value::Integer(as_i64(size_of(receiver).unwrap_or_default())))
        }
        (_, "empty") if size_of(receiver).is_some() => {
            Ok(Value::Boolean(size_of(receiver) == Some(0)))
        }
        (Value::Map(_), "keys" | "values") => map_method(receiver, name, &[]),
        // missing map keys read as null
        (Value::Map(_), _) => Ok(Value::Null),
        _ => Err(RuntimeError::NoSuchProperty {
            property: name.to_string(),
            type_name: receiver.type_name(),
        }),
    }
}

/// Resolve `receiver[index]`
pub fn index(receiver: &Value, index: &Value) -> RuntimeResult<Value> {
    match (receiver, index) {
        (Value::Null, _) => Err(RuntimeError::null_target("index")),
        (Value::List(items) | Value::Set(items), Value::Integer(i)) => element_at(receiver, items, *i),
        (Value::Map(entries), Value::String(key)) => {
            Ok(entries.get(key).cloned().unwrap_or(Value::Null))
        }
        (Value::Map(entries), Value::Char(key)) => Ok(entries
            .get(key.to_string().as_str())
            .cloned()
            .unwrap_or(Value::Null)),
        (Value::String(s), Value::Integer(i)) => char_at(s, *i),
        _ => Err(RuntimeError::NotIndexable {
            type_name: receiver.type_name(),
            index_type: index.type_name(),
        }),
    }
}

fn element_at(receiver: &Value, items: &[Value], i: i64) -> RuntimeResult<Value> {
    usize::try_from(i)
        .ok()
        .and_then(|at| items.get(at))
        .cloned()
        .ok_or(RuntimeError::IndexOutOfBounds {
            index: i,
            size: items.len(),
            type_name: receiver.type_name(),
        })
}

fn char_at(s: &str, i: i64) -> RuntimeResult<Value> {
    usize::try_from(i)
        .ok()
        .and_then(|at| s.chars().nth(at))
        .map(Value::Char)
        .ok_or(RuntimeError::IndexOutOfBounds {
            index: i,
            size: char_len(s),
            type_name: "String",
        })
}

fn arity(method: &str, args: &[Value], min: usize, max: usize) -> RuntimeResult<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("expected {min} argument(s), got {}", args.len())
        } else {
            format!("expected {min} to {max} arguments, got {}", args.len())
        };
        return Err(RuntimeError::invalid_arguments(method, expected));
    }
    Ok(())
}

fn int_arg(method: &str, value: &Value) -> RuntimeResult<i64> {
    match value {
        Value::Integer(i) => Ok(*i),
        other => Err(RuntimeError::invalid_arguments(
            method,
            format!("expected Integer, got {}", other.type_name()),
        )),
    }
}

fn text_arg(method: &str, value: &Value) -> RuntimeResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Char(c) => Ok(c.to_string()),
        other => Err(RuntimeError::invalid_arguments(
            method,
            format!("expected String, got {}", other.type_name()),
        )),
    }
}

/// Invoke a built-in method on `receiver`
pub fn call(
    regexes: &RegexCache,
    receiver: &Value,
    method: &str,
    args: &[Value],
) -> RuntimeResult<Value> {
    if receiver.is_null() {
        return Err(RuntimeError::null_target(format!("call {method}()")));
    }

    // methods available on every value
    match method {
        "toString" => {
            arity(method, args, 0, 0)?;
            return Ok(Value::String(receiver.to_string()));
        }
        "equals" => {
            arity(method, args, 1, 1)?;
            return Ok(Value::Boolean(equals(receiver, &args[0])));
        }
        "length" | "size" if size_of(receiver).is_some() => {
            arity(method, args, 0, 0)?;
            return Ok(Value::Integer(as_i64(size_of(receiver).unwrap_or_default())));
        }
        "isEmpty" if size_of(receiver).is_some() => {
            arity(method, args, 0, 0)?;
            return Ok(Value::Boolean(size_of(receiver) == Some(0)));
        }
        _ => {}
    }

    match receiver {
        Value::String(s) => string_method(regexes, s, method, args),
        Value::Char(c) => string_method(regexes, &c.to_string(), method, args),
        Value::List(items) | Value::Set(items) => collection_method(receiver, items, method, args),
        Value::Map(_) => map_method(receiver, method, args),
        Value::Integer(_) | Value::Float(_) | Value::Decimal(_) => {
            number_method(receiver, method, args)
        }
        _ => Err(no_such_method(receiver, method)),
    }
}

fn no_such_method(receiver: &Value, method: &str) -> RuntimeError {
    RuntimeError::NoSuchMethod {
        method: method.to_string(),
        type_name: receiver.type_name(),
    }
}

fn string_method(
    regexes: &RegexCache,
    s: &str,
    method: &str,
    args: &[Value],
) -> RuntimeResult<Value> {
    let value = match method {
        "toUpperCase" => {
            arity(method, args, 0, 0)?;
            Value::String(s.to_uppercase())
        }
        "toLowerCase" => {
            arity(method, args, 0, 0)?;
            Value::String(s.to_lowercase())
        }
        "trim" => {
            arity(method, args, 0, 0)?;
            Value::String(s.trim().to_string())
        }
        "substring" => {
            arity(method, args, 1, 2)?;
            let len = as_i64(char_len(s));
            let begin = int_arg(method, &args[0])?;
            let end = match args.get(1) {
                Some(end) => int_arg(method, end)?,
                None => len,
            };
            if begin < 0 || end > len || begin > end {
                return Err(RuntimeError::invalid_arguments(
                    method,
                    format!("range {begin}..{end} is invalid for length {len}"),
                ));
            }
            // both bounds are within 0..=len here
            let skip = usize::try_from(begin).unwrap_or_default();
            let take = usize::try_from(end - begin).unwrap_or_default();
            Value::String(s.chars().skip(skip).take(take).collect())
        }
        "charAt" => {
            arity(method, args, 1, 1)?;
            char_at(s, int_arg(method, &args[0])?)?
        }
        "indexOf" => {
            arity(method, args, 1, 1)?;
            let needle = text_arg(method, &args[0])?;
            let position = s
                .find(needle.as_str())
                .map_or(-1, |byte_at| as_i64(char_len(&s[..byte_at])));
            Value::Integer(position)
        }
        "contains" => {
            arity(method, args, 1, 1)?;
            Value::Boolean(s.contains(text_arg(method, &args[0])?.as_str()))
        }
        "startsWith" => {
            arity(method, args, 1, 1)?;
            Value::Boolean(s.starts_with(text_arg(method, &args[0])?.as_str()))
        }
        "endsWith" => {
            arity(method, args, 1, 1)?;
            Value::Boolean(s.ends_with(text_arg(method, &args[0])?.as_str()))
        }
        "matches" => {
            arity(method, args, 1, 1)?;
            let pattern = text_arg(method, &args[0])?;
            Value::Boolean(regexes.get(&pattern, true)?.is_match(s))
        }
        "replace" => {
            arity(method, args, 2, 2)?;
            let from = text_arg(method, &args[0])?;
            let to = text_arg(method, &args[1])?;
            Value::String(s.replace(from.as_str(), &to))
        }
        "split" => {
            arity(method, args, 1, 1)?;
            let pattern = text_arg(method, &args[0])?;
            let regex = regexes.get(&pattern, false)?;
            let mut parts: Vec<Value> = regex
                .split(s)
                .map(|part| Value::String(part.to_string()))
                .collect();
            // trailing empty segments are dropped
            while parts.last().is_some_and(|p| p.as_str() == Some("")) && parts.len() > 1 {
                parts.pop();
            }
            Value::List(parts)
        }
        _ => return Err(no_such_method(&Value::String(s.to_string()), method)),
    };
    Ok(value)
}

fn collection_method(
    receiver: &Value,
    items: &[Value],
    method: &str,
    args: &[Value],
) -> RuntimeResult<Value> {
    match method {
        "contains" => {
            arity(method, args, 1, 1)?;
            Ok(Value::Boolean(items.iter().any(|v| equals(v, &args[0]))))
        }
        "get" => {
            arity(method, args, 1, 1)?;
            element_at(receiver, items, int_arg(method, &args[0])?)
        }
        "indexOf" => {
            arity(method, args, 1, 1)?;
            let position = items
                .iter()
                .position(|v| equals(v, &args[0]))
                .map_or(-1, as_i64);
            Ok(Value::Integer(position))
        }
        _ => Err(no_such_method(receiver, method)),
    }
}

fn map_method(receiver: &Value, method: &str, args: &[Value]) -> RuntimeResult<Value> {
    let Value::Map(entries) = receiver else {
        return Err(no_such_method(receiver, method));
    };
    match method {
        "get" => {
            arity(method, args, 1, 1)?;
            let key = text_arg(method, &args[0])?;
            Ok(entries.get(&key).cloned().unwrap_or(Value::Null))
        }
        "containsKey" => {
            arity(method, args, 1, 1)?;
            let key = text_arg(method, &args[0])?;
            Ok(Value::Boolean(entries.contains_key(&key)))
        }
        "keys" | "keySet" => {
            arity(method, args, 0, 0)?;
            Ok(Value::Set(
                entries.keys().map(|k| Value::String(k.clone())).collect(),
            ))
        }
        "values" => {
            arity(method, args, 0, 0)?;
            Ok(Value::List(entries.values().cloned().collect()))
        }
        _ => Err(no_such_method(receiver, method)),
    }
}

fn number_method(receiver: &Value, method: &str, args: &[Value]) -> RuntimeResult<Value> {
    match method {
        "intValue" | "longValue" => {
            arity(method, args, 0, 0)?;
            to_integer(receiver)
                .map(Value::Integer)
                .ok_or(RuntimeError::Overflow { operator: "intValue" })
        }
        "doubleValue" => {
            arity(method, args, 0, 0)?;
            receiver
                .to_f64()
                .map(Value::Float)
                .ok_or_else(|| no_such_method(receiver, method))
        }
        _ => Err(no_such_method(receiver, method)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    fn call(receiver: &Value, method: &str, args: &[Value]) -> RuntimeResult<Value> {
        super::call(&RegexCache::default(), receiver, method, args)
    }

    #[test]
    fn test_property_access() {
        let map = Value::map(vec![("name", s("Ann")), ("size", s("XL"))]);
        assert_eq!(property(&map, "name"), Ok(s("Ann")));
        // map keys shadow pseudo-properties
        assert_eq!(property(&map, "size"), Ok(s("XL")));
        assert_eq!(property(&map, "missing"), Ok(Value::Null));
        assert_eq!(property(&s("héllo"), "length"), Ok(Value::Integer(5)));
        assert_eq!(
            property(&Value::list(vec![1i64, 2]), "size"),
            Ok(Value::Integer(2))
        );
        assert!(matches!(
            property(&Value::Null, "name"),
            Err(RuntimeError::NullTarget { .. })
        ));
        assert!(matches!(
            property(&Value::Integer(1), "name"),
            Err(RuntimeError::NoSuchProperty { .. })
        ));
    }

    #[test]
    fn test_index() {
        let list = Value::list(vec![10i64, 20]);
        assert_eq!(index(&list, &Value::Integer(1)), Ok(Value::Integer(20)));
        assert!(matches!(
            index(&list, &Value::Integer(2)),
            Err(RuntimeError::IndexOutOfBounds { index: 2, size: 2, .. })
        ));
        assert!(matches!(
            index(&list, &Value::Integer(-1)),
            Err(RuntimeError::IndexOutOfBounds { .. })
        ));
        assert_eq!(index(&s("abc"), &Value::Integer(2)), Ok(Value::Char('c')));
        assert_eq!(
            index(&Value::map(vec![("k", 1i64)]), &s("k")),
            Ok(Value::Integer(1))
        );
        assert!(matches!(
            index(&Value::Integer(3), &Value::Integer(0)),
            Err(RuntimeError::NotIndexable { .. })
        ));
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(call(&s(" Ab "), "trim", &[]), Ok(s("Ab")));
        assert_eq!(call(&s("Ab"), "toUpperCase", &[]), Ok(s("AB")));
        assert_eq!(
            call(&s("hello"), "substring", &[Value::Integer(1), Value::Integer(3)]),
            Ok(s("el"))
        );
        assert_eq!(
            call(&s("hello"), "substring", &[Value::Integer(2)]),
            Ok(s("llo"))
        );
        assert!(call(&s("hello"), "substring", &[Value::Integer(9)]).is_err());
        assert_eq!(call(&s("hello"), "indexOf", &[s("l")]), Ok(Value::Integer(2)));
        assert_eq!(call(&s("hello"), "indexOf", &[s("z")]), Ok(Value::Integer(-1)));
        assert_eq!(call(&s("hello"), "startsWith", &[s("he")]), Ok(Value::Boolean(true)));
        assert_eq!(
            call(&s("a-b"), "replace", &[s("-"), s("+")]),
            Ok(s("a+b"))
        );
        assert_eq!(call(&s(""), "isEmpty", &[]), Ok(Value::Boolean(true)));
    }

    #[test]
    fn test_matches_is_full_match() {
        assert_eq!(
            call(&s("abc123"), "matches", &[s("[a-z]+\\d+")]),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            call(&s("abc123x"), "matches", &[s("[a-z]+\\d+")]),
            Ok(Value::Boolean(false))
        );
        assert!(matches!(
            call(&s("x"), "matches", &[s("(")]),
            Err(RuntimeError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_regex_cache_is_bounded() {
        let regexes = RegexCache::with_capacity(4);
        for i in 0..50 {
            let pattern = format!("a{{{i}}}");
            assert_eq!(
                super::call(&regexes, &s("aaa"), "matches", &[s(&pattern)]),
                Ok(Value::Boolean(i == 3))
            );
        }
        let stats = regexes.stats();
        assert!(stats.entries <= 4);
        assert!(stats.evictions > 0);

        // a repeated pattern is compiled once
        let before = regexes.stats().compilations;
        super::call(&regexes, &s("b"), "split", &[s(",")]).unwrap();
        super::call(&regexes, &s("b"), "split", &[s(",")]).unwrap();
        assert_eq!(regexes.stats().compilations, before + 1);
    }

    #[test]
    fn test_split_drops_trailing_empty() {
        assert_eq!(
            call(&s("a,b,,"), "split", &[s(",")]),
            Ok(Value::list(vec!["a", "b"]))
        );
        assert_eq!(
            call(&s("a1b22c"), "split", &[s("\\d+")]),
            Ok(Value::list(vec!["a", "b", "c"]))
        );
    }

    #[test]
    fn test_collection_and_map_methods() {
        let list = Value::list(vec![1i64, 2, 3]);
        assert_eq!(call(&list, "size", &[]), Ok(Value::Integer(3)));
        assert_eq!(call(&list, "contains", &[Value::Integer(2)]), Ok(Value::Boolean(true)));
        assert_eq!(call(&list, "get", &[Value::Integer(0)]), Ok(Value::Integer(1)));

        let map = Value::map(vec![("a", 1i64), ("b", 2)]);
        assert_eq!(call(&map, "containsKey", &[s("a")]), Ok(Value::Boolean(true)));
        assert_eq!(call(&map, "get", &[s("z")]), Ok(Value::Null));
        assert_eq!(call(&map, "keys", &[]), Ok(Value::set(vec!["a", "b"])));
        assert_eq!(call(&map, "values", &[]), Ok(Value::list(vec![1i64, 2])));
    }

    #[test]
    fn test_number_methods() {
        assert_eq!(call(&Value::Float(2.7), "intValue", &[]), Ok(Value::Integer(2)));
        assert_eq!(call(&Value::Integer(2), "doubleValue", &[]), Ok(Value::Float(2.0)));
        assert_eq!(call(&Value::Integer(2), "toString", &[]), Ok(s("2")));
    }

    #[test]
    fn test_method_errors() {
        assert!(matches!(
            call(&Value::Null, "trim", &[]),
            Err(RuntimeError::NullTarget { .. })
        ));
        assert!(matches!(
            call(&s("x"), "frobnicate", &[]),
            Err(RuntimeError::NoSuchMethod { .. })
        ));
        assert!(matches!(
            call(&s("x"), "trim", &[Value::Integer(1)]),
            Err(RuntimeError::InvalidArguments { .. })
        ));
        assert!(matches!(
            call(&Value::Boolean(true), "size", &[]),
            Err(RuntimeError::NoSuchMethod { .. })
        ));
    }
}
