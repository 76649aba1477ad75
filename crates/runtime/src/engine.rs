// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The inference engine with a type-state enforced pipeline.
//!
//! ```text
//! InferenceEngine<Idle>
//!     │  .load_model() / InferenceEngine::from_graph()
//!     ▼
//! InferenceEngine<Planned>
//!     │  .prepare(backend)
//!     ▼
//! InferenceEngine<Ready>
//!     │  .run(inputs)      (any number of times)
//!     ▼
//!   InferenceOutput
//! ```
//!
//! Each transition consumes the old value and returns a new one. The data a
//! state needs lives in its marker struct, so a `Ready` engine always has a
//! graph, a plan, an allocated pool and a backend.

use crate::plan::BufferSlot;
use crate::{Backend, ExecutionPlan, InferenceMetrics, RuntimeConfig, RuntimeError};
use memory_manager::{AllocationStats, BufferGuard, TensorMemoryPool};
use model_ir::{graph::Validated, ModelGraph, ModelImporter};
use std::time::Instant;
use tensor_core::{Tensor, TensorView};

// ── Type-state markers ─────────────────────────────────────────

/// Engine is created but no model is loaded.
#[derive(Debug)]
pub struct Idle;

/// Model is loaded and an execution plan has been built.
#[derive(Debug)]
pub struct Planned {
    graph: ModelGraph<Validated>,
    plan: ExecutionPlan,
}

/// Pool is allocated and the engine can run inference.
#[derive(Debug)]
pub struct Ready {
    graph: ModelGraph<Validated>,
    plan: ExecutionPlan,
    pool: Box<dyn TensorMemoryPool>,
    backend: Box<dyn Backend>,
}

/// Sealed trait for engine states.
pub trait EngineState: std::fmt::Debug {}
impl EngineState for Idle {}
impl EngineState for Planned {}
impl EngineState for Ready {}

// ── Inference output ───────────────────────────────────────────

/// The result of a single inference run.
#[derive(Debug)]
pub struct InferenceOutput {
    /// Declared graph outputs, in declaration order.
    pub outputs: Vec<(String, Tensor)>,
    /// Per-node and overall timing/memory metrics.
    pub metrics: InferenceMetrics,
}

impl InferenceOutput {
    /// Returns the output tensor called `name`.
    pub fn output(&self, name: &str) -> Option<&Tensor> {
        self.outputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }
}

// ── Engine ─────────────────────────────────────────────────────

/// The primary inference engine.
///
/// `S` is a type-state marker that enforces the pipeline ordering at
/// compile time. You cannot call `.run()` on an `Idle` engine or
/// `.load_model()` on a `Ready` engine.
///
/// # Example
/// ```no_run
/// use runtime::{InferenceEngine, RefCpuBackend, RuntimeConfig};
/// use tensor_core::Tensor;
///
/// # fn example() -> Result<(), runtime::RuntimeError> {
/// let engine = InferenceEngine::new(RuntimeConfig::for_model("add.json"))
///     .load_model()?
///     .prepare(RefCpuBackend::new())?;
/// let a = Tensor::from_f32(vec![1, 1, 2, 2], &[1.0, 2.0, -3.0, -4.0])?;
/// let b = Tensor::from_f32(vec![1, 1, 2, 2], &[1.0, 2.0, 3.0, 4.0])?;
/// let output = engine.run(&[("Input0", a), ("Input1", b)])?;
/// println!("{}", output.metrics.summary());
/// # Ok(())
/// # }
/// ```
pub struct InferenceEngine<S: EngineState = Idle> {
    config: RuntimeConfig,
    state: S,
}

impl<S: EngineState> InferenceEngine<S> {
    /// Returns the engine configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

// ── Idle → Planned ─────────────────────────────────────────────

impl InferenceEngine<Idle> {
    /// Creates a new engine from the given configuration.
    pub fn new(config: RuntimeConfig) -> Self {
        tracing::info!("engine created with {} pool", config.pool);
        Self { config, state: Idle }
    }

    /// Imports the model at `config.model_path` and builds the execution plan.
    pub fn load_model(self) -> Result<InferenceEngine<Planned>, RuntimeError> {
        let graph = ModelImporter::new().load(&self.config.model_path)?;
        tracing::info!("{}", graph.summary());
        InferenceEngine::from_graph(self.config, graph)
    }

    /// Builds an engine for an already validated graph.
    pub fn from_graph(
        config: RuntimeConfig,
        graph: ModelGraph<Validated>,
    ) -> Result<InferenceEngine<Planned>, RuntimeError> {
        let plan = ExecutionPlan::build(&graph)?;
        tracing::info!("{}", plan.summary());
        Ok(InferenceEngine {
            config,
            state: Planned { graph, plan },
        })
    }
}

// ── Planned → Ready ────────────────────────────────────────────

impl InferenceEngine<Planned> {
    /// Returns the execution plan.
    pub fn plan(&self) -> &ExecutionPlan {
        &self.state.plan
    }

    /// Returns the model graph.
    pub fn graph(&self) -> &ModelGraph<Validated> {
        &self.state.graph
    }

    /// Creates the pool through `backend`, registers every planned buffer and
    /// reserves the pool once.
    ///
    /// # Errors
    /// - [`RuntimeError::Unsupported`] if the backend cannot run some node.
    /// - [`RuntimeError::ConfigError`] for an unparsable memory budget.
    /// - [`RuntimeError::PoolError`] if the reservation exceeds the budget.
    pub fn prepare(
        self,
        backend: impl Backend + 'static,
    ) -> Result<InferenceEngine<Ready>, RuntimeError> {
        let Planned { graph, plan } = self.state;

        for node in graph.iter_nodes() {
            let Some(desc) = graph.descriptor(&node.output) else {
                return Err(RuntimeError::InvalidPlan(format!(
                    "node '{}' output '{}' has no descriptor",
                    node.name, node.output
                )));
            };
            if !backend.supports(node.kind, desc.dtype()) {
                return Err(RuntimeError::Unsupported {
                    backend: backend.name(),
                    node: node.name.clone(),
                    op: node.kind.to_string(),
                    dtype: desc.dtype(),
                });
            }
        }

        let mut pool = backend.create_pool(self.config.pool, self.config.pool_options()?);
        plan.register(pool.as_mut())?;
        pool.allocate_pool()?;
        tracing::info!(
            "{} pool reserved: {} bytes for {} buffers (backend '{}')",
            pool.name(),
            pool.capacity(),
            plan.slots().len(),
            backend.name(),
        );

        Ok(InferenceEngine {
            config: self.config,
            state: Ready {
                graph,
                plan,
                pool,
                backend: Box::new(backend),
            },
        })
    }
}

// ── Ready: run inference ───────────────────────────────────────

impl InferenceEngine<Ready> {
    /// Returns the execution plan.
    pub fn plan(&self) -> &ExecutionPlan {
        &self.state.plan
    }

    /// Returns the model graph.
    pub fn graph(&self) -> &ModelGraph<Validated> {
        &self.state.graph
    }

    /// Returns the pool backing tensor buffers.
    pub fn pool(&self) -> &dyn TensorMemoryPool {
        self.state.pool.as_ref()
    }

    /// Returns the current pool statistics.
    pub fn memory_stats(&self) -> AllocationStats {
        self.state.pool.stats()
    }

    /// Runs the graph on `inputs`, given as `(name, tensor)` pairs.
    ///
    /// 1. Copy every input and initializer into its own pool region.
    /// 2. Execute the nodes in order; a region goes back to the pool after
    ///    the last step that reads it.
    /// 3. Copy declared outputs out of the pool.
    ///
    /// Every region is returned when this call ends, whether it succeeds or not.
    ///
    /// # Errors
    /// [`RuntimeError::InvalidInput`] when an input is missing, unknown,
    /// supplied twice, or does not match its declared descriptor.
    pub fn run(&self, inputs: &[(&str, Tensor)]) -> Result<InferenceOutput, RuntimeError> {
        let run_start = Instant::now();
        let Ready {
            graph,
            plan,
            pool,
            backend,
        } = &self.state;
        let pool: &dyn TensorMemoryPool = &**pool;
        let supplied = match_inputs(graph, inputs)?;

        let mut metrics = InferenceMetrics::new();
        let profiling = self.config.enable_profiling;
        let mut buffers: Vec<Option<BufferGuard<'_>>> =
            plan.slots().iter().map(|_| None).collect();

        let staged = supplied
            .into_iter()
            .chain(graph.initializers().iter().map(|(n, t)| (n.as_str(), t)));
        for (name, tensor) in staged {
            let index = plan.slot_index(name)?;
            buffers[index] = Some(stage(pool, &plan.slots()[index], tensor)?);
        }
        metrics.observe_live_bytes(pool.live_bytes());

        for step in plan.steps() {
            let node = graph.node(step.node_index).ok_or_else(|| {
                RuntimeError::InvalidPlan(format!("node index {} not in graph", step.node_index))
            })?;
            let out_slot = &plan.slots()[step.output];
            let mut out = pool.acquire(out_slot.request_bytes)?;

            let views = step
                .inputs
                .iter()
                .map(|&i| view(&buffers, &plan.slots()[i], i))
                .collect::<Result<Vec<_>, _>>()?;

            let start = Instant::now();
            backend.execute(
                node,
                &views,
                &mut out.as_mut_slice()[..out_slot.desc.size_bytes()],
                &out_slot.desc,
            )?;
            let compute = start.elapsed();
            drop(views);

            buffers[step.output] = Some(out);
            metrics.record_node(
                &node.name,
                node.kind.as_str(),
                compute,
                pool.live_bytes(),
                profiling,
            );
            tracing::trace!(node = %node.name, ?compute, "node executed");

            for &released in &step.release {
                buffers[released] = None;
            }
        }

        let mut outputs = Vec::with_capacity(graph.outputs().len());
        for (name, _) in graph.outputs() {
            let index = plan.slot_index(name)?;
            let slot = &plan.slots()[index];
            let data = view(&buffers, slot, index)?.as_bytes().to_vec();
            outputs.push((name.clone(), Tensor::from_bytes(slot.desc.clone(), data)?));
        }
        drop(buffers);

        metrics.finalise(run_start.elapsed());
        tracing::debug!("{}", metrics.summary());
        Ok(InferenceOutput { outputs, metrics })
    }

    /// Releases the pool reservation and returns the pool's final statistics.
    pub fn shutdown(self) -> Result<AllocationStats, RuntimeError> {
        let mut pool = self.state.pool;
        pool.release_pool()?;
        let stats = pool.stats();
        tracing::info!("{}", stats.summary());
        Ok(stats)
    }
}

/// Orders caller inputs by the graph's declared inputs, rejecting unknown,
/// duplicated, missing and mismatched tensors.
fn match_inputs<'i>(
    graph: &ModelGraph<Validated>,
    inputs: &'i [(&'i str, Tensor)],
) -> Result<Vec<(&'i str, &'i Tensor)>, RuntimeError> {
    for (i, (name, _)) in inputs.iter().enumerate() {
        if !graph.inputs().iter().any(|(declared, _)| declared == name) {
            return Err(RuntimeError::InvalidInput(format!(
                "'{name}' is not an input of graph '{}'",
                graph.name()
            )));
        }
        if inputs[..i].iter().any(|(earlier, _)| earlier == name) {
            return Err(RuntimeError::InvalidInput(format!(
                "input '{name}' supplied more than once"
            )));
        }
    }

    graph
        .inputs()
        .iter()
        .map(|(declared, desc)| {
            let (name, tensor) = inputs
                .iter()
                .find(|(name, _)| name == declared)
                .ok_or_else(|| {
                    RuntimeError::InvalidInput(format!("missing input '{declared}'"))
                })?;
            if tensor.desc() != desc {
                return Err(RuntimeError::InvalidInput(format!(
                    "input '{declared}' expects {desc}, got {}",
                    tensor.desc()
                )));
            }
            Ok((*name, tensor))
        })
        .collect()
}

/// Acquires the slot's region and copies `tensor` into it.
fn stage<'p>(
    pool: &'p dyn TensorMemoryPool,
    slot: &BufferSlot,
    tensor: &Tensor,
) -> Result<BufferGuard<'p>, RuntimeError> {
    let mut guard = pool.acquire(slot.request_bytes)?;
    let bytes = tensor.as_bytes();
    guard.as_mut_slice()[..bytes.len()].copy_from_slice(bytes);
    Ok(guard)
}

/// Views the live buffer in slot `index`.
fn view<'b>(
    buffers: &'b [Option<BufferGuard<'_>>],
    slot: &'b BufferSlot,
    index: usize,
) -> Result<TensorView<'b>, RuntimeError> {
    let guard = buffers[index].as_ref().ok_or_else(|| {
        RuntimeError::InvalidPlan(format!("tensor '{}' read after release", slot.tensor))
    })?;
    Ok(TensorView::from_parts(
        &slot.desc,
        &guard.as_slice()[..slot.desc.size_bytes()],
    )?)
}

impl<S: EngineState> std::fmt::Debug for InferenceEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("state", &std::any::type_name::<S>())
            .field("pool", &self.config.pool)
            .field("model_path", &self.config.model_path)
            .finish()
    }
}
