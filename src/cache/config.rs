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

//! Cache configuration options

/// Configuration for the compiled-expression cache
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of compiled expressions kept (None = unbounded)
    pub max_entries: Option<usize>,

    /// Fraction of entries dropped when a bounded cache is full
    pub eviction_ratio: f64,
}

impl CacheConfig {
    /// Create a configuration with no size limit
    pub fn unbounded() -> Self {
        Self {
            max_entries: None,
            eviction_ratio: 0.2,
        }
    }

    /// Create a configuration holding at most `max_entries` expressions
    pub fn bounded(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries.max(1)),
            eviction_ratio: 0.2,
        }
    }

    /// Set the fraction of entries dropped per eviction, clamped to `(0, 1]`
    pub fn with_eviction_ratio(mut self, ratio: f64) -> Self {
        self.eviction_ratio = if ratio.is_finite() && ratio > 0.0 {
            ratio.min(1.0)
        } else {
            0.2
        };
        self
    }

    /// Number of entries one eviction pass removes
    pub(crate) fn eviction_batch(&self) -> usize {
        match self.max_entries {
            Some(max) => ((max as f64 * self.eviction_ratio).ceil() as usize).max(1),
            None => 0,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::unbounded()
    }
}
