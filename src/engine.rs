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

//! Expression engines: the compile/evaluate seam used by typed evaluators

use crate::ast::ExpressionNode;
use crate::evaluator::EvaluationContext;
use crate::interpreter::methods::DEFAULT_REGEX_CAPACITY;
use crate::interpreter::{DEFAULT_MAX_DEPTH, Interpreter, RegexCache, RuntimeError};
use crate::model::Value;
use crate::parser::{ParseError, parse};
use log::trace;
use std::sync::Arc;

/// A pluggable expression language implementation.
///
/// `compile` turns source text into an immutable artifact that the cache
/// shares between threads; `evaluate` runs it against a context. Engines
/// must not keep per-evaluation state.
pub trait ExpressionEngine: Send + Sync + 'static {
    /// Compiled form of an expression
    type Compiled: Send + Sync + 'static;
    /// Error produced by `compile`
    type CompileError: std::error::Error + Send + Sync + 'static;
    /// Error produced by `evaluate`
    type EvalError: std::error::Error + Send + Sync + 'static;

    /// Compile expression source text
    fn compile(&self, source: &str) -> Result<Self::Compiled, Self::CompileError>;

    /// Evaluate a compiled expression; `root` is the value bare names resolve against
    fn evaluate(
        &self,
        compiled: &Self::Compiled,
        context: &EvaluationContext<'_>,
        root: &Value,
    ) -> Result<Value, Self::EvalError>;
}

/// Configuration for the standard engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluationConfig {
    /// Maximum expression nesting evaluated before failing
    pub max_recursion_depth: usize,
    /// Compiled `matches`/`split` patterns kept by the engine
    pub regex_cache_capacity: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: DEFAULT_MAX_DEPTH,
            regex_cache_capacity: DEFAULT_REGEX_CAPACITY,
        }
    }
}

/// The built-in engine: Pratt parser plus tree-walking interpreter
#[derive(Clone, Debug)]
pub struct StandardEngine {
    config: EvaluationConfig,
    interpreter: Interpreter,
}

impl Default for StandardEngine {
    fn default() -> Self {
        Self::with_config(EvaluationConfig::default())
    }
}

impl StandardEngine {
    /// Create an engine with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom configuration
    pub fn with_config(config: EvaluationConfig) -> Self {
        let regexes = Arc::new(RegexCache::with_capacity(config.regex_cache_capacity));
        Self {
            interpreter: Interpreter::with_regex_cache(config.max_recursion_depth, regexes),
            config,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Pattern cache owned by this engine
    pub fn regex_cache(&self) -> &RegexCache {
        self.interpreter.regex_cache()
    }
}

impl ExpressionEngine for StandardEngine {
    type Compiled = ExpressionNode;
    type CompileError = ParseError;
    type EvalError = RuntimeError;

    fn compile(&self, source: &str) -> Result<ExpressionNode, ParseError> {
        parse(source)
    }

    fn evaluate(
        &self,
        compiled: &ExpressionNode,
        context: &EvaluationContext<'_>,
        root: &Value,
    ) -> Result<Value, RuntimeError> {
        trace!("evaluating {compiled:?} with index {:?}", context.index());
        self.interpreter.evaluate(compiled, context, root)
    }
}
