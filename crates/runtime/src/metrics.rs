// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inference profiling metrics.
//!
//! [`InferenceMetrics`] collects per-node timing and the pool's live bytes
//! after each node, plus aggregate timing for the whole run.

use std::time::Duration;

/// Metrics for a single node's execution.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NodeMetrics {
    /// Node name.
    pub node_name: String,
    /// Operator type.
    pub op: String,
    /// Time spent in the backend kernel.
    pub compute_duration: Duration,
    /// Bytes held by live pool buffers right after the kernel returned.
    pub live_pool_bytes: usize,
}

/// Aggregate metrics for a complete inference run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct InferenceMetrics {
    /// Total wall-clock time for the run, including input and output copies.
    pub total_duration: Duration,
    /// Total time spent in backend kernels.
    pub total_compute_duration: Duration,
    /// Highest pool live bytes observed during the run.
    pub peak_live_bytes: usize,
    /// Per-node metrics. Empty when profiling is disabled.
    pub node_metrics: Vec<NodeMetrics>,
    /// Number of nodes executed.
    pub nodes_executed: usize,
}

impl InferenceMetrics {
    /// Creates an empty metrics container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one executed node. Per-node detail is kept only when `detailed`.
    pub fn record_node(
        &mut self,
        name: &str,
        op: &str,
        compute: Duration,
        live_pool_bytes: usize,
        detailed: bool,
    ) {
        self.nodes_executed += 1;
        self.total_compute_duration += compute;
        self.peak_live_bytes = self.peak_live_bytes.max(live_pool_bytes);
        if detailed {
            self.node_metrics.push(NodeMetrics {
                node_name: name.to_string(),
                op: op.to_string(),
                compute_duration: compute,
                live_pool_bytes,
            });
        }
    }

    /// Records pool occupancy observed outside a kernel (e.g. after copying inputs).
    pub fn observe_live_bytes(&mut self, live_pool_bytes: usize) {
        self.peak_live_bytes = self.peak_live_bytes.max(live_pool_bytes);
    }

    /// Finalises metrics with the total wall-clock time.
    pub fn finalise(&mut self, total: Duration) {
        self.total_duration = total;
    }

    /// Returns the slowest recorded node, if any.
    pub fn slowest_node(&self) -> Option<&NodeMetrics> {
        self.node_metrics.iter().max_by_key(|m| m.compute_duration)
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let peak_kb = self.peak_live_bytes as f64 / 1024.0;
        format!(
            "Inference: {:.3}ms total, {} nodes, {:.3}ms compute, peak {:.2} KB live",
            self.total_duration.as_secs_f64() * 1000.0,
            self.nodes_executed,
            self.total_compute_duration.as_secs_f64() * 1000.0,
            peak_kb,
        )
    }
}
