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

//! Shared helpers for integration tests

#![allow(dead_code)]

use exprfn::ast::ExpressionNode;
use exprfn::interpreter::RuntimeError;
use exprfn::{EvaluationContext, ExpressionEngine, ParseError, StandardEngine, Value};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Standard engine that counts compilations and can slow them down
#[derive(Default)]
pub struct CountingEngine {
    inner: StandardEngine,
    compilations: AtomicUsize,
    evaluations: AtomicUsize,
    compile_delay: Option<Duration>,
}

impl CountingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep inside every compile, widening first-use races
    pub fn with_compile_delay(delay: Duration) -> Self {
        Self {
            compile_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::SeqCst)
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }
}

impl ExpressionEngine for CountingEngine {
    type Compiled = ExpressionNode;
    type CompileError = ParseError;
    type EvalError = RuntimeError;

    fn compile(&self, source: &str) -> Result<ExpressionNode, ParseError> {
        self.compilations.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.compile_delay {
            thread::sleep(delay);
        }
        self.inner.compile(source)
    }

    fn evaluate(
        &self,
        compiled: &ExpressionNode,
        context: &EvaluationContext<'_>,
        root: &Value,
    ) -> Result<Value, RuntimeError> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        self.inner.evaluate(compiled, context, root)
    }
}

/// A small order record used as an evaluation target
pub fn order(id: i64, customer: &str, items: &[(&str, i64, f64)]) -> Value {
    let lines: Vec<_> = items
        .iter()
        .map(|(sku, quantity, price)| json!({ "sku": sku, "quantity": quantity, "price": price }))
        .collect();
    Value::from(json!({
        "id": id,
        "customer": customer,
        "lines": lines,
    }))
}
