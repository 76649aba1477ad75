// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `onnx-prep run` command: execute a model on the reference backend.
//!
//! Demonstrates the full type-state pipeline:
//! ```text
//! InferenceEngine<Idle> → load_model → <Planned> → prepare → <Ready> → run
//! ```
//!
//! The inputs file maps each graph input to a flat, row-major array of
//! numbers; the shape comes from the model's declaration:
//! ```json
//! { "Input0": [1, 2, -3, -4], "Input1": [1, 2, 3, 4] }
//! ```

use anyhow::{bail, Context};
use runtime::{InferenceEngine, InferenceOutput, RefCpuBackend, RuntimeConfig};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tensor_core::{DType, Element, Tensor, TensorDesc};

pub fn execute(config: RuntimeConfig, inputs: PathBuf) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             onnx-prep · Inference Runner             ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    println!("  Config:");
    println!("   Model:    {}", config.model_path.display());
    println!(
        "   Budget:   {}",
        config.memory_budget.as_deref().unwrap_or("unbounded")
    );
    println!("   Pool:     {}", config.pool);
    println!("   Inputs:   {}", inputs.display());
    println!();

    // Step 1: Idle → Planned (import model + build execution plan).
    println!("  [1/3] Importing model and building execution plan...");
    let planned = InferenceEngine::new(config).load_model()?;
    println!("        {}", planned.plan().summary());
    println!();

    let text = std::fs::read_to_string(&inputs)
        .with_context(|| format!("cannot read inputs '{}'", inputs.display()))?;
    let values: Value = serde_json::from_str(&text)
        .with_context(|| format!("inputs '{}' are not valid JSON", inputs.display()))?;
    let Value::Object(values) = values else {
        bail!("inputs file must hold a JSON object keyed by input name");
    };
    let tensors = parse_inputs(planned.graph().inputs(), &values)?;

    // Step 2: Planned → Ready (reserve the pool once).
    println!("  [2/3] Reserving memory pool...");
    let ready = planned.prepare(RefCpuBackend::new())?;
    println!(
        "        {} pool: {} bytes",
        ready.pool().name(),
        ready.pool().capacity()
    );
    println!();

    // Step 3: Ready → Run.
    println!("  [3/3] Running inference...");
    let named: Vec<(&str, Tensor)> = tensors
        .iter()
        .map(|(name, tensor)| (name.as_str(), tensor.clone()))
        .collect();
    let output = ready.run(&named)?;
    println!();
    print_results(&output)?;

    let stats = ready.shutdown()?;
    println!("  Pool Stats:");
    println!("   {}", stats.summary());
    Ok(())
}

/// Builds one tensor per declared input from the JSON arrays in `values`.
fn parse_inputs(
    declared: &[(String, TensorDesc)],
    values: &Map<String, Value>,
) -> anyhow::Result<Vec<(String, Tensor)>> {
    if let Some(extra) = values
        .keys()
        .find(|k| !declared.iter().any(|(name, _)| name == *k))
    {
        bail!("'{extra}' is not an input of this model");
    }

    declared
        .iter()
        .map(|(name, desc)| -> anyhow::Result<(String, Tensor)> {
            let array = values
                .get(name)
                .and_then(Value::as_array)
                .with_context(|| format!("input '{name}' must be an array of numbers"))?;
            if array.len() != desc.num_elements() {
                bail!(
                    "input '{name}' has {} values, {desc} needs {}",
                    array.len(),
                    desc.num_elements()
                );
            }
            let tensor = tensor_from_json(desc, array)
                .with_context(|| format!("input '{name}'"))?;
            Ok((name.clone(), tensor))
        })
        .collect()
}

fn tensor_from_json(desc: &TensorDesc, array: &[Value]) -> anyhow::Result<Tensor> {
    fn collect<T: Element>(
        array: &[Value],
        convert: impl Fn(&Value) -> Option<T>,
    ) -> anyhow::Result<Vec<T>> {
        array
            .iter()
            .map(|v| convert(v).with_context(|| format!("{v} is not a valid {}", T::DTYPE)))
            .collect()
    }

    let shape = desc.shape().clone();
    let tensor = match desc.dtype() {
        DType::F32 => Tensor::from_slice(shape, &collect(array, |v| v.as_f64().map(|x| x as f32))?)?,
        DType::F64 => Tensor::from_slice(shape, &collect(array, Value::as_f64)?)?,
        DType::I8 => Tensor::from_slice(shape, &collect(array, |v| int::<i8>(v))?)?,
        DType::U8 => Tensor::from_slice(shape, &collect(array, |v| int::<u8>(v))?)?,
        DType::I16 => Tensor::from_slice(shape, &collect(array, |v| int::<i16>(v))?)?,
        DType::I32 => Tensor::from_slice(shape, &collect(array, |v| int::<i32>(v))?)?,
        DType::I64 => Tensor::from_slice(shape, &collect(array, Value::as_i64)?)?,
        DType::Bool => {
            let bytes = array
                .iter()
                .map(|v| v.as_bool().map(u8::from).with_context(|| format!("{v} is not a bool")))
                .collect::<anyhow::Result<Vec<u8>>>()?;
            Tensor::from_bytes(desc.clone(), bytes)?
        }
        other => bail!("inputs of type {other} cannot be given as JSON"),
    };
    Ok(tensor)
}

fn int<T: TryFrom<i64>>(v: &Value) -> Option<T> {
    v.as_i64().and_then(|x| T::try_from(x).ok())
}

fn tensor_to_json(tensor: &Tensor) -> anyhow::Result<Value> {
    let values: Vec<Value> = match tensor.dtype() {
        DType::F32 => tensor.to_vec::<f32>()?.into_iter().map(Value::from).collect(),
        DType::F64 => tensor.to_vec::<f64>()?.into_iter().map(Value::from).collect(),
        DType::I8 => tensor.to_vec::<i8>()?.into_iter().map(Value::from).collect(),
        DType::U8 => tensor.to_vec::<u8>()?.into_iter().map(Value::from).collect(),
        DType::I16 => tensor.to_vec::<i16>()?.into_iter().map(Value::from).collect(),
        DType::I32 => tensor.to_vec::<i32>()?.into_iter().map(Value::from).collect(),
        DType::I64 => tensor.to_vec::<i64>()?.into_iter().map(Value::from).collect(),
        DType::Bool => tensor.as_bytes().iter().map(|&b| Value::from(b != 0)).collect(),
        other => bail!("outputs of type {other} cannot be printed as JSON"),
    };
    Ok(serde_json::json!({
        "dtype": tensor.dtype().to_string(),
        "dims": tensor.shape().dims(),
        "values": values,
    }))
}

fn print_results(output: &InferenceOutput) -> anyhow::Result<()> {
    let mut outputs = Map::new();
    for (name, tensor) in &output.outputs {
        outputs.insert(name.clone(), tensor_to_json(tensor)?);
    }
    println!("  Outputs:");
    println!("{}", serde_json::to_string_pretty(&Value::Object(outputs))?);
    println!();
    println!("  Metrics:");
    println!("   {}", output.metrics.summary());
    for node in &output.metrics.node_metrics {
        println!(
            "   {:<20} {:<8} {:>10.3}µs {:>8} bytes live",
            node.node_name,
            node.op,
            node.compute_duration.as_secs_f64() * 1e6,
            node.live_pool_bytes,
        );
    }
    println!();
    Ok(())
}
