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

//! Per-invocation evaluation context

use crate::model::Value;

/// Variable name bound to the invocation target
pub const TARGET_VARIABLE: &str = "target";
/// Variable name bound to the parameter list
pub const PARAM_VARIABLE: &str = "param";
/// Variable name bound to the iteration index
pub const INDEX_VARIABLE: &str = "index";

/// Variable bindings visible to one evaluation.
///
/// Exposes exactly three variables: the target (also the evaluation root),
/// the parameter list as a single list value, and the iteration index.
/// Built fresh for every invocation and never shared between invocations.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    target: &'a Value,
    params: &'a Value,
    index: Option<usize>,
}

impl<'a> EvaluationContext<'a> {
    /// Create a context. `params` is expected to be a [`Value::List`].
    pub fn new(target: &'a Value, params: &'a Value, index: Option<usize>) -> Self {
        Self {
            target,
            params,
            index,
        }
    }

    /// The invocation target
    pub fn target(&self) -> &'a Value {
        self.target
    }

    /// The parameter list
    pub fn params(&self) -> &'a Value {
        self.params
    }

    /// The iteration index, if evaluating inside an indexed traversal
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Resolve one of the three context variables by name.
    ///
    /// An unset index resolves to `Null`; unknown names resolve to `None`.
    pub fn variable(&self, name: &str) -> Option<Value> {
        match name {
            TARGET_VARIABLE => Some(self.target.clone()),
            PARAM_VARIABLE => Some(self.params.clone()),
            INDEX_VARIABLE => Some(
                self.index
                    .and_then(|i| i64::try_from(i).ok())
                    .map_or(Value::Null, Value::Integer),
            ),
            _ => None,
        }
    }
}
