// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! Imports interchange-format (ONNX-style) models and validates every
//! operator node before anything is executed.
//!
//! - [`proto`]: the serialized model description, read from JSON.
//! - [`OpRegistry`]: per-operator shape and type inference rules. Addition
//!   checks element types first, then NumPy-style broadcasting.
//! - [`ModelGraph`]: named tensors and nodes, with a **type-state pattern**
//!   (`Building` → `Validated`).
//! - [`ModelImporter`]: drives a description through the registry into a
//!   validated graph.
//!
//! # Example
//! ```no_run
//! use model_ir::ModelImporter;
//! use std::path::Path;
//!
//! let graph = ModelImporter::new().load(Path::new("addition.json")).unwrap();
//! println!("{}", graph.summary());
//! for node in graph.iter_nodes() {
//!     println!("  {}", node.summary());
//! }
//! ```

mod error;
pub mod graph;
mod importer;
mod op;
pub mod proto;
mod registry;

pub use error::{ModelError, ValidationError, ValidationErrorKind};
pub use graph::{ModelGraph, TensorOrigin};
pub use importer::ModelImporter;
pub use op::{AttributeValue, Attributes, Node, OpKind};
pub use registry::{InferFn, OpRegistry, OpRule};
