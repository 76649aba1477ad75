// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `onnx-prep inspect` command: validate a model and print its structure.
//!
//! Prints model metadata, then the descriptor of every graph input,
//! initializer and output, then one line per node with its inferred
//! output descriptor.

use super::truncate;
use anyhow::Context;
use model_ir::{proto::ModelProto, ModelImporter};
use runtime::RuntimeConfig;

pub fn execute(config: RuntimeConfig) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            onnx-prep · Model Inspector               ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let path = &config.model_path;
    let proto = ModelProto::from_file(path)
        .with_context(|| format!("failed to read model '{}'", path.display()))?;
    let graph = ModelImporter::new()
        .import(&proto)
        .with_context(|| format!("model '{}' failed validation", path.display()))?;

    // ── Metadata ───────────────────────────────────────────────
    println!("  Model:    {}", path.display());
    println!(
        "  Producer: {} {} (domain '{}')",
        proto.producer_name, proto.producer_version, proto.domain
    );
    println!(
        "  IR:       v{}, opset {}",
        proto.ir_version,
        proto
            .default_opset()
            .map_or_else(|| "unspecified".to_string(), |v| v.to_string()),
    );
    println!("  {}", graph.summary());
    println!();

    // ── Tensors ────────────────────────────────────────────────
    println!("  {:<12} {:<28} {:<24}", "Kind", "Name", "Descriptor");
    println!("  {}", "-".repeat(66));
    for (name, desc) in graph.inputs() {
        println!("  {:<12} {:<28} {}", "input", truncate(name, 28), desc);
    }
    for (name, value) in graph.initializers() {
        println!("  {:<12} {:<28} {}", "initializer", truncate(name, 28), value.desc());
    }
    for (name, desc) in graph.outputs() {
        println!("  {:<12} {:<28} {}", "output", truncate(name, 28), desc);
    }
    println!();

    // ── Nodes ──────────────────────────────────────────────────
    println!("  {:<4} {:<20} {:<10} {:<24}", "Idx", "Node", "Op", "Output");
    println!("  {}", "-".repeat(66));
    for (index, node) in graph.iter_nodes().enumerate() {
        let out = graph
            .descriptor(&node.output)
            .map_or_else(|| "?".to_string(), |d| d.to_string());
        println!(
            "  {:<4} {:<20} {:<10} {} {}",
            index,
            truncate(&node.name, 20),
            node.kind.as_str(),
            node.output,
            out,
        );
    }
    println!();
    println!("  Model is valid.");
    Ok(())
}
