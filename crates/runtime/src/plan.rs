// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Execution plans: which buffers a graph needs and when each can be freed.
//!
//! Every named tensor in a validated graph gets one [`BufferSlot`]. The slot
//! records the pool request for the tensor (its dense size, at least one
//! byte since pools refuse empty requests) and the step after which nothing
//! reads it. Declared outputs are never freed early.

use crate::RuntimeError;
use memory_manager::TensorMemoryPool;
use model_ir::{graph::Validated, ModelGraph, TensorOrigin};
use std::collections::HashMap;
use tensor_core::TensorDesc;

/// One tensor's buffer requirements.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BufferSlot {
    /// Tensor name.
    pub tensor: String,
    /// Descriptor of the tensor stored in the slot.
    #[serde(skip)]
    pub desc: TensorDesc,
    /// Where the tensor's value comes from.
    #[serde(serialize_with = "serialize_origin")]
    pub origin: TensorOrigin,
    /// Bytes requested from the pool.
    pub request_bytes: usize,
    /// Step after which the buffer is returned. `None` keeps it to the end.
    pub release_after: Option<usize>,
}

/// One node execution.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Step {
    /// Index of the node in the graph's execution order.
    pub node_index: usize,
    /// Slot indices of the node's inputs, in declared order.
    pub inputs: Vec<usize>,
    /// Slot index of the node's output.
    pub output: usize,
    /// Slots returned to the pool once this step completes.
    pub release: Vec<usize>,
}

/// The buffers and step order for running a validated graph.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutionPlan {
    slots: Vec<BufferSlot>,
    steps: Vec<Step>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl ExecutionPlan {
    /// Builds the plan for `graph`.
    pub fn build(graph: &ModelGraph<Validated>) -> Result<Self, RuntimeError> {
        let mut plan = Self {
            slots: Vec::new(),
            steps: Vec::new(),
            by_name: HashMap::new(),
        };

        for (name, desc) in graph.inputs() {
            plan.add_slot(name, desc.clone(), TensorOrigin::Input);
        }
        for (name, value) in graph.initializers() {
            plan.add_slot(name, value.desc().clone(), TensorOrigin::Initializer);
        }

        for (node_index, node) in graph.iter_nodes().enumerate() {
            let inputs = node
                .inputs
                .iter()
                .map(|name| plan.slot_index(name))
                .collect::<Result<Vec<_>, _>>()?;
            let desc = graph.descriptor(&node.output).cloned().ok_or_else(|| {
                RuntimeError::InvalidPlan(format!("output '{}' has no descriptor", node.output))
            })?;
            let output = plan.add_slot(&node.output, desc, TensorOrigin::Node(node_index));
            plan.steps.push(Step {
                node_index,
                inputs,
                output,
                release: Vec::new(),
            });
        }

        plan.assign_lifetimes(graph)?;
        tracing::debug!(
            slots = plan.slots.len(),
            steps = plan.steps.len(),
            capacity = plan.total_request_bytes(),
            "execution plan built"
        );
        Ok(plan)
    }

    fn add_slot(&mut self, name: &str, desc: TensorDesc, origin: TensorOrigin) -> usize {
        let index = self.slots.len();
        self.slots.push(BufferSlot {
            tensor: name.to_string(),
            request_bytes: desc.size_bytes().max(1),
            desc,
            origin,
            release_after: None,
        });
        self.by_name.insert(name.to_string(), index);
        index
    }

    fn assign_lifetimes(&mut self, graph: &ModelGraph<Validated>) -> Result<(), RuntimeError> {
        let mut last_use: Vec<Option<usize>> = vec![None; self.slots.len()];
        for (step_index, step) in self.steps.iter().enumerate() {
            // A node's output is live at least through the step producing it.
            last_use[step.output] = Some(step_index);
            for &input in &step.inputs {
                last_use[input] = Some(step_index);
            }
        }

        for (name, _) in graph.outputs() {
            let index = self.slot_index(name)?;
            last_use[index] = None;
        }

        // Inputs or initializers that nothing reads keep `None` and stay to the end.
        for (slot_index, last) in last_use.into_iter().enumerate() {
            self.slots[slot_index].release_after = last;
            if let Some(step) = last {
                self.steps[step].release.push(slot_index);
            }
        }
        Ok(())
    }

    /// Returns the slot index for `tensor`.
    pub fn slot_index(&self, tensor: &str) -> Result<usize, RuntimeError> {
        self.by_name
            .get(tensor)
            .copied()
            .ok_or_else(|| RuntimeError::InvalidPlan(format!("no buffer for tensor '{tensor}'")))
    }

    /// All buffer slots, inputs first, then initializers, then node outputs.
    pub fn slots(&self) -> &[BufferSlot] {
        &self.slots
    }

    /// Node executions in order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Sum of every slot's request, saturating at `usize::MAX`.
    pub fn total_request_bytes(&self) -> usize {
        self.slots
            .iter()
            .map(|s| s.request_bytes)
            .fold(0, usize::saturating_add)
    }

    /// Largest number of requested bytes live at once while running.
    pub fn peak_live_bytes(&self) -> usize {
        let mut live = self
            .slots
            .iter()
            .filter(|s| !matches!(s.origin, TensorOrigin::Node(_)))
            .map(|s| s.request_bytes)
            .fold(0, usize::saturating_add);
        let mut peak = live;
        for step in &self.steps {
            live = live.saturating_add(self.slots[step.output].request_bytes);
            peak = peak.max(live);
            for &freed in &step.release {
                live = live.saturating_sub(self.slots[freed].request_bytes);
            }
        }
        peak
    }

    /// Registers one request per slot with `pool`.
    pub fn register(&self, pool: &mut dyn TensorMemoryPool) -> Result<(), RuntimeError> {
        for slot in &self.slots {
            pool.register_request(slot.request_bytes)?;
        }
        Ok(())
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Plan: {} buffers, {} steps, {} bytes requested, peak {} bytes live",
            self.slots.len(),
            self.steps.len(),
            self.total_request_bytes(),
            self.peak_live_bytes(),
        )
    }
}

fn serialize_origin<S: serde::Serializer>(origin: &TensorOrigin, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(origin)
}
