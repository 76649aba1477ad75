// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Tensor metadata shared by the importer, the memory planner and the
//! execution backends.
//!
//! This crate provides:
//! - [`DType`]: supported scalar element kinds.
//! - [`Shape`]: immutable dimension lists, including the right-aligned
//!   broadcasting rule ([`Shape::broadcast_with`]).
//! - [`TensorDesc`]: element type + shape, the unit the graph validator
//!   reasons about.
//! - [`Tensor`] / [`TensorView`]: owned values and borrowed byte views used
//!   at the runtime's input/output boundary.
//!
//! # Example
//! ```
//! use tensor_core::{DType, Shape, TensorDesc};
//!
//! let a = TensorDesc::new(DType::F32, vec![1, 1, 1, 4]);
//! let b = TensorDesc::new(DType::F32, vec![4]);
//! let out = a.shape().broadcast_with(b.shape()).unwrap();
//! assert_eq!(out, Shape::new(vec![1, 1, 1, 4]));
//! ```

mod desc;
mod dtype;
mod error;
mod shape;
mod tensor;

pub use desc::TensorDesc;
pub use dtype::DType;
pub use error::{BroadcastError, TensorError};
pub use shape::Shape;
pub use tensor::{Element, Tensor, TensorView};
