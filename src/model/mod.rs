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

//! Value model and runtime type descriptors
//!
//! This module provides the dynamic [`Value`] that expressions operate on,
//! the [`ValueType`] descriptors results are verified against, and the
//! [`FromValue`] bridge into native Rust types.

pub mod convert;
pub mod types;
pub mod value;

pub use convert::FromValue;
pub use types::{UnknownTypeError, ValueType};
pub use value::Value;
