// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! Runs validated model graphs over pooled tensor memory.
//!
//! The runtime takes:
//! - A validated `ModelGraph` from `model-ir`.
//! - An [`ExecutionPlan`] with one buffer per named tensor and the step
//!   after which each buffer can be returned.
//! - A `TensorMemoryPool` from `memory-manager`, created by the [`Backend`]
//!   and reserved exactly once.
//!
//! It copies inputs and initializers into pool regions, executes nodes in
//! order through the backend, and copies declared outputs back out,
//! recording per-node timing and live pool bytes.
//!
//! # Type-State Pipeline
//! ```text
//! InferenceEngine<Idle> → InferenceEngine<Planned> → InferenceEngine<Ready>
//! ```
//! Transitions are compile-time checked.

mod backend;
mod config;
mod engine;
mod error;
mod metrics;
pub mod plan;

pub use backend::{Backend, RefCpuBackend};
pub use config::{PoolKind, RuntimeConfig};
pub use engine::{EngineState, Idle, InferenceEngine, InferenceOutput, Planned, Ready};
pub use error::RuntimeError;
pub use metrics::{InferenceMetrics, NodeMetrics};
pub use plan::ExecutionPlan;
