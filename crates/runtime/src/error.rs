// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for planning and execution.

use tensor_core::DType;

/// Errors that can occur while preparing or running a graph.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The execution plan is inconsistent with the graph.
    #[error("invalid execution plan: {0}")]
    InvalidPlan(String),

    /// Caller-supplied inputs do not match the graph's declared inputs.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backend has no kernel for this operator and element type.
    #[error("backend '{backend}' cannot execute node '{node}' ({op}) on {dtype}")]
    Unsupported {
        backend: &'static str,
        node: String,
        op: String,
        dtype: DType,
    },

    /// A kernel failed while executing a node.
    #[error("execution error in node '{node}': {detail}")]
    ExecutionError { node: String, detail: String },

    /// A tensor buffer did not match its descriptor.
    #[error("tensor error: {0}")]
    TensorError(#[from] tensor_core::TensorError),

    /// A memory pool operation failed.
    #[error("memory pool error: {0}")]
    PoolError(#[from] memory_manager::PoolError),

    /// Model import or validation failed.
    #[error("model error: {0}")]
    ModelError(#[from] model_ir::ModelError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
