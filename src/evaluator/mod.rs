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

//! Typed expression evaluators
//!
//! An [`ExpressionEvaluator`] owns an engine and a compiled-expression cache
//! and mints [`TypedExpression`] values. Each typed expression binds a
//! declared result type, the expression source and a parameter list. Invoking
//! it compiles the source at most once through the shared cache, evaluates it
//! against a target and checks the result against the declared type.
//!
//! ```text
//! let evaluator = ExpressionEvaluator::new();
//! let plus_ten = evaluator.typed::<i64>("#target + 10", Vec::<Value>::new());
//! assert_eq!(plus_ten.evaluate(&Value::Integer(5), None)?, Some(15));
//! ```

#![warn(missing_docs)]

mod context;

pub use context::{EvaluationContext, INDEX_VARIABLE, PARAM_VARIABLE, TARGET_VARIABLE};

use crate::cache::{CacheConfig, ExpressionCache};
use crate::engine::{ExpressionEngine, StandardEngine};
use crate::error::{ExpressionError, Result};
use crate::model::{FromValue, Value, ValueType};
use log::trace;
use once_cell::sync::Lazy;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

static SHARED: Lazy<ExpressionEvaluator> = Lazy::new(ExpressionEvaluator::new);

/// Factory for typed expressions sharing one engine and one cache
pub struct ExpressionEvaluator<E: ExpressionEngine = StandardEngine> {
    engine: Arc<E>,
    cache: Arc<ExpressionCache<E::Compiled>>,
}

impl<E: ExpressionEngine> Clone for ExpressionEvaluator<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<E: ExpressionEngine> fmt::Debug for ExpressionEvaluator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionEvaluator")
            .field("cache", &self.cache.stats())
            .finish_non_exhaustive()
    }
}

impl ExpressionEvaluator<StandardEngine> {
    /// Create an evaluator using the standard engine and an unbounded cache
    pub fn new() -> Self {
        Self::with_engine(StandardEngine::new())
    }

    /// Create an evaluator using the standard engine and a configured cache
    pub fn with_config(config: CacheConfig) -> Self {
        Self::with_cache(
            Arc::new(StandardEngine::new()),
            Arc::new(ExpressionCache::with_config(config)),
        )
    }

    /// The process-wide default evaluator.
    ///
    /// Every clone of it shares one cache. Callers needing isolation should
    /// construct their own evaluator instead.
    pub fn shared() -> &'static ExpressionEvaluator {
        &SHARED
    }
}

impl Default for ExpressionEvaluator<StandardEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ExpressionEngine> ExpressionEvaluator<E> {
    /// Create an evaluator for a custom engine with an unbounded cache
    pub fn with_engine(engine: E) -> Self {
        Self::with_cache(Arc::new(engine), Arc::new(ExpressionCache::new()))
    }

    /// Create an evaluator from an existing engine and cache
    pub fn with_cache(engine: Arc<E>, cache: Arc<ExpressionCache<E::Compiled>>) -> Self {
        Self { engine, cache }
    }

    /// The engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The compiled-expression cache
    pub fn cache(&self) -> &ExpressionCache<E::Compiled> {
        &self.cache
    }

    /// Start building a typed expression with validation of its parts
    pub fn builder(&self) -> TypedExpressionBuilder<E> {
        TypedExpressionBuilder {
            evaluator: self.clone(),
            result_type: None,
            source: None,
            params: Vec::new(),
        }
    }

    /// Typed expression with an explicit result type descriptor
    pub fn expression<I, V>(
        &self,
        result_type: ValueType,
        source: impl Into<Arc<str>>,
        params: I,
    ) -> TypedExpression<E>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        TypedExpression {
            result_type,
            source: source.into(),
            params: Arc::new(Value::list(params)),
            engine: Arc::clone(&self.engine),
            cache: Arc::clone(&self.cache),
        }
    }

    /// Typed expression accepting any result
    pub fn any<I, V>(&self, source: impl Into<Arc<str>>, params: I) -> TypedExpression<E>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.expression(ValueType::Any, source, params)
    }

    /// Typed expression whose result is extracted into `R`
    pub fn typed<R: FromValue>(
        &self,
        source: impl Into<Arc<str>>,
        params: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Expression<R, E> {
        Expression::new(self.expression(R::value_type(), source, params))
    }

    /// Compile `source` through the cache without evaluating it
    pub fn compile(&self, source: &str) -> Result<Arc<E::Compiled>> {
        compile_cached(&*self.engine, &self.cache, source)
    }
}

fn compile_cached<E: ExpressionEngine>(
    engine: &E,
    cache: &ExpressionCache<E::Compiled>,
    source: &str,
) -> Result<Arc<E::Compiled>> {
    cache
        .get_or_compile(source, |s| engine.compile(s))
        .map_err(|e| ExpressionError::compilation(source, e))
}

/// An immutable, reusable evaluator bound to a result type, a source and parameters
pub struct TypedExpression<E: ExpressionEngine = StandardEngine> {
    result_type: ValueType,
    source: Arc<str>,
    params: Arc<Value>,
    engine: Arc<E>,
    cache: Arc<ExpressionCache<E::Compiled>>,
}

impl<E: ExpressionEngine> Clone for TypedExpression<E> {
    fn clone(&self) -> Self {
        Self {
            result_type: self.result_type.clone(),
            source: Arc::clone(&self.source),
            params: Arc::clone(&self.params),
            engine: Arc::clone(&self.engine),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<E: ExpressionEngine> fmt::Debug for TypedExpression<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedExpression")
            .field("result_type", &self.result_type)
            .field("source", &self.source)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl<E: ExpressionEngine> TypedExpression<E> {
    /// Declared result type
    pub fn result_type(&self) -> &ValueType {
        &self.result_type
    }

    /// Expression source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parameters exposed as `#param`
    pub fn params(&self) -> &[Value] {
        self.params.as_slice().unwrap_or_default()
    }

    /// Evaluate against `target`; `index` is the position within an indexed traversal
    pub fn evaluate(&self, target: &Value, index: Option<usize>) -> Result<Value> {
        trace!("evaluating {:?} at index {index:?}", self.source);
        let compiled = self.compiled()?;
        let context = EvaluationContext::new(target, &self.params, index);
        let value = self
            .engine
            .evaluate(&compiled, &context, target)
            .map_err(|e| ExpressionError::evaluation(&self.source, e))?;
        self.verify(value)
    }

    /// Evaluate outside any traversal; `#index` reads as null
    pub fn evaluate_unindexed(&self, target: &Value) -> Result<Value> {
        self.evaluate(target, None)
    }

    /// Evaluate once per target with zero-based indices, stopping at the first failure
    pub fn evaluate_each<'a, I>(&self, targets: I) -> Result<Vec<Value>>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        targets
            .into_iter()
            .enumerate()
            .map(|(index, target)| self.evaluate(target, Some(index)))
            .collect()
    }

    /// Compile the source now so that the first evaluation does not pay for it
    pub fn precompile(&self) -> Result<()> {
        self.compiled().map(|_| ())
    }

    fn compiled(&self) -> Result<Arc<E::Compiled>> {
        compile_cached(&*self.engine, &self.cache, &self.source)
    }

    fn verify(&self, value: Value) -> Result<Value> {
        if value.is_null() || !self.result_type.is_constrained() || self.result_type.accepts(&value)
        {
            return Ok(value);
        }
        Err(ExpressionError::TypeMismatch {
            expression: self.source.to_string(),
            expected: self.result_type.clone(),
            actual: value.value_type(),
        })
    }
}

/// A typed expression whose result is extracted into the native type `R`.
///
/// A null result is `None`.
pub struct Expression<R, E: ExpressionEngine = StandardEngine> {
    inner: TypedExpression<E>,
    _result: PhantomData<fn() -> R>,
}

impl<R, E: ExpressionEngine> Clone for Expression<R, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _result: PhantomData,
        }
    }
}

impl<R, E: ExpressionEngine> fmt::Debug for Expression<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expression").field(&self.inner).finish()
    }
}

impl<R: FromValue, E: ExpressionEngine> Expression<R, E> {
    fn new(inner: TypedExpression<E>) -> Self {
        Self {
            inner,
            _result: PhantomData,
        }
    }

    /// The underlying dynamically typed expression
    pub fn as_typed(&self) -> &TypedExpression<E> {
        &self.inner
    }

    /// Expression source text
    pub fn source(&self) -> &str {
        self.inner.source()
    }

    /// Evaluate against `target` and extract the result
    pub fn evaluate(&self, target: &Value, index: Option<usize>) -> Result<Option<R>> {
        let value = self.inner.evaluate(target, index)?;
        self.extract(value)
    }

    /// Evaluate outside any traversal
    pub fn evaluate_unindexed(&self, target: &Value) -> Result<Option<R>> {
        self.evaluate(target, None)
    }

    /// Evaluate once per target with zero-based indices, stopping at the first failure
    pub fn evaluate_each<'a, I>(&self, targets: I) -> Result<Vec<Option<R>>>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        targets
            .into_iter()
            .enumerate()
            .map(|(index, target)| self.evaluate(target, Some(index)))
            .collect()
    }

    /// Compile the source now
    pub fn precompile(&self) -> Result<()> {
        self.inner.precompile()
    }

    fn extract(&self, value: Value) -> Result<Option<R>> {
        if value.is_null() {
            return Ok(None);
        }
        // nulls nested in containers only convert into Option elements
        let actual = value.value_type();
        R::from_value(value)
            .map(Some)
            .ok_or_else(|| ExpressionError::TypeMismatch {
                expression: self.inner.source.to_string(),
                expected: R::value_type(),
                actual,
            })
    }
}

/// Builder validating that a typed expression has all required parts
pub struct TypedExpressionBuilder<E: ExpressionEngine = StandardEngine> {
    evaluator: ExpressionEvaluator<E>,
    result_type: Option<ValueType>,
    source: Option<Arc<str>>,
    params: Vec<Value>,
}

impl<E: ExpressionEngine> TypedExpressionBuilder<E> {
    /// Set the declared result type
    pub fn result_type(mut self, result_type: ValueType) -> Self {
        self.result_type = Some(result_type);
        self
    }

    /// Set the expression source
    pub fn expression(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Append one parameter
    pub fn param(mut self, param: impl Into<Value>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Append parameters
    pub fn params<I, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.params.extend(params.into_iter().map(Into::into));
        self
    }

    /// Build the typed expression. Nothing is compiled or cached here.
    pub fn build(self) -> Result<TypedExpression<E>> {
        let result_type = self
            .result_type
            .ok_or_else(|| ExpressionError::invalid_argument("Result type cannot be null"))?;
        let source = self
            .source
            .ok_or_else(|| ExpressionError::invalid_argument("Expression cannot be null"))?;
        Ok(self.evaluator.expression(result_type, source, self.params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn no_params() -> Vec<Value> {
        Vec::new()
    }

    #[test]
    fn test_integer_addition() {
        let evaluator = ExpressionEvaluator::new();
        let expr = evaluator.expression(ValueType::Integer, "#target + 10", no_params());
        assert_eq!(expr.evaluate(&Value::Integer(5), None).unwrap(), Value::Integer(15));
    }

    #[test]
    fn test_typed_extraction() {
        let evaluator = ExpressionEvaluator::new();
        let expr = evaluator.typed::<String>("'KEY: ' + #target", no_params());
        assert_eq!(
            expr.evaluate(&Value::from("one"), Some(2)).unwrap(),
            Some("KEY: one".to_string())
        );
        let nullable = evaluator.typed::<i64>("null", no_params());
        assert_eq!(nullable.evaluate_unindexed(&Value::Null).unwrap(), None);
    }

    #[test]
    fn test_type_mismatch() {
        let evaluator = ExpressionEvaluator::new();
        let expr = evaluator.expression(ValueType::Integer, "'not a number'", no_params());
        let err = expr.evaluate(&Value::Null, None).unwrap_err();
        match err {
            ExpressionError::TypeMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, ValueType::Integer);
                assert_eq!(actual, ValueType::String);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_null_elements_need_option() {
        let evaluator = ExpressionEvaluator::new();
        let strict = evaluator.typed::<Vec<i64>>("{1, null}", no_params());
        assert!(strict.evaluate_unindexed(&Value::Null).unwrap_err().is_type_mismatch());

        let lenient = evaluator.typed::<Vec<Option<i64>>>("{1, null}", no_params());
        assert_eq!(
            lenient.evaluate_unindexed(&Value::Null).unwrap(),
            Some(vec![Some(1), None])
        );
    }

    #[test]
    fn test_compilation_error_is_not_cached() {
        let evaluator = ExpressionEvaluator::new();
        let expr = evaluator.any("#target +", no_params());
        let err = expr.evaluate_unindexed(&Value::Null).unwrap_err();
        assert!(err.is_compilation());
        assert_eq!(err.expression(), Some("#target +"));
        assert!(evaluator.cache().is_empty());
    }

    #[test]
    fn test_evaluate_each_supplies_indices() {
        let evaluator = ExpressionEvaluator::new();
        let expr = evaluator.typed::<String>("#target + '@' + #index", no_params());
        let targets = [Value::from("a"), Value::from("b")];
        assert_eq!(
            expr.evaluate_each(&targets).unwrap(),
            vec![Some("a@0".to_string()), Some("b@1".to_string())]
        );
    }

    #[test]
    fn test_builder_validation() {
        let evaluator = ExpressionEvaluator::new();
        let err = evaluator.builder().expression("#target").build().unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(err.to_string(), "Invalid argument: Result type cannot be null");

        let err = evaluator
            .builder()
            .result_type(ValueType::Integer)
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: Expression cannot be null");

        let built = evaluator
            .builder()
            .result_type(ValueType::Integer)
            .expression("#target + #param[0] + #param[1]")
            .param(1i64)
            .params(vec![2i64])
            .build()
            .unwrap();
        assert!(evaluator.cache().is_empty());
        assert_eq!(built.params(), &[Value::Integer(1), Value::Integer(2)]);
        assert_eq!(built.evaluate_unindexed(&Value::Integer(3)).unwrap(), Value::Integer(6));
    }

    #[test]
    fn test_shared_evaluator_is_one_instance() {
        let a = ExpressionEvaluator::shared();
        let b = ExpressionEvaluator::shared();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_precompile_populates_cache() {
        let evaluator = ExpressionEvaluator::new();
        let expr = evaluator.any("1 + 1", no_params());
        expr.precompile().unwrap();
        assert!(evaluator.cache().contains("1 + 1"));
        assert_eq!(evaluator.cache().stats().compilations, 1);
    }
}
