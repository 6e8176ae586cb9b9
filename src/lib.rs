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

//! Typed, cached evaluation of dynamic expressions
//!
//! Expressions are compiled once per distinct source text into a shared
//! cache, evaluated against a target with `#target`, `#param` and `#index`
//! bound, and their results checked against a declared type.

pub mod ast;
pub mod cache;
pub mod evaluator;
pub mod interpreter;
pub mod model;
pub mod parser;

pub mod engine;
pub mod error;

// Re-export main types
pub use cache::{CacheConfig, CacheStats, ExpressionCache};
pub use engine::{EvaluationConfig, ExpressionEngine, StandardEngine};
pub use error::{ExpressionError, Result};
pub use evaluator::{
    EvaluationContext, Expression, ExpressionEvaluator, TypedExpression, TypedExpressionBuilder,
};
pub use model::{FromValue, Value, ValueType};
pub use parser::{ParseError, parse};
