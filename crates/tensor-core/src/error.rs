// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor descriptors and values.

use crate::{DType, Shape};

/// Two shapes cannot be broadcast together.
///
/// `axis` is the lowest aligned position (after left-padding the shorter
/// shape with ones) at which the extents disagree, so the same pair of
/// shapes always reports the same axis.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("shapes {lhs} and {rhs} are not broadcast-compatible: axis {axis} has extents {lhs_dim} vs {rhs_dim}")]
pub struct BroadcastError {
    pub lhs: Shape,
    pub rhs: Shape,
    pub axis: usize,
    pub lhs_dim: usize,
    pub rhs_dim: usize,
}

/// Errors that can occur when combining shapes or building tensor values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer size does not match the expected size for the given shape and dtype.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Two shapes cannot be broadcast together.
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    /// The requested element type does not match the tensor's element type.
    #[error("dtype mismatch: tensor holds {actual}, requested {requested}")]
    DTypeMismatch { requested: DType, actual: DType },
}
