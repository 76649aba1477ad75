// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `onnx-prep plan` command: show the buffer plan and pool sizing.

use super::truncate;
use memory_manager::TensorMemoryPool;
use runtime::{Backend, ExecutionPlan, InferenceEngine, RefCpuBackend, RuntimeConfig};

pub fn execute(config: RuntimeConfig) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             onnx-prep · Buffer Planner               ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let pool_kind = config.pool;
    let options = config.pool_options()?;
    let budget = options.budget;
    let planned = InferenceEngine::new(config).load_model()?;
    let plan: &ExecutionPlan = planned.plan();

    println!("  {}", planned.graph().summary());
    println!("  {}", plan.summary());
    println!();

    // ── Buffers ────────────────────────────────────────────────
    println!(
        "  {:<4} {:<24} {:<12} {:>10} {:>14}",
        "Slot", "Tensor", "Origin", "Bytes", "Released after",
    );
    println!("  {}", "-".repeat(68));
    for (index, slot) in plan.slots().iter().enumerate() {
        let released = slot
            .release_after
            .map_or_else(|| "end".to_string(), |step| format!("step {step}"));
        println!(
            "  {:<4} {:<24} {:<12} {:>10} {:>14}",
            index,
            truncate(&slot.tensor, 24),
            slot.origin,
            slot.request_bytes,
            released,
        );
    }
    println!();

    // ── Pool sizing ────────────────────────────────────────────
    let mut pool = RefCpuBackend::new().create_pool(pool_kind, options);
    plan.register(pool.as_mut())?;
    let capacity = pool.required_capacity();
    println!("  Pool:     {} ({} requests)", pool.name(), plan.slots().len());
    println!("  Capacity: {capacity} bytes ({:.2} KB)", capacity as f64 / 1024.0);
    match budget {
        Some(budget) if budget.admits(capacity) => println!("  Budget:   {budget} (fits)"),
        Some(budget) => println!("  Budget:   {budget} (EXCEEDED, prepare would fail)"),
        None => println!("  Budget:   unbounded"),
    }
    println!();
    Ok(())
}
