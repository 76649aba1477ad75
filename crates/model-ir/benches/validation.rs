// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for node validation and graph import.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use model_ir::proto::{GraphProto, ModelProto, NodeProto, ValueInfoProto};
use model_ir::{Attributes, ModelImporter, OpKind, OpRegistry};
use tensor_core::{DType, TensorDesc};

fn bench_registry_infer(c: &mut Criterion) {
    let registry = OpRegistry::with_defaults();
    let attrs = Attributes::new();
    let inputs = [
        TensorDesc::new(DType::F32, vec![8, 1, 64, 32]),
        TensorDesc::new(DType::F32, vec![16, 1, 32]),
    ];
    c.bench_function("infer_add_broadcast", |b| {
        b.iter(|| registry.infer(OpKind::Add, black_box(&inputs), &attrs))
    });
}

/// A chain of `n` Add nodes, each adding a fresh input to the running sum.
fn add_chain(n: usize) -> ModelProto {
    let desc = TensorDesc::new(DType::F32, vec![1, 64]);
    let mut graph = GraphProto {
        name: format!("chain_{n}"),
        input: vec![ValueInfoProto::new("x0", &desc).unwrap()],
        ..Default::default()
    };
    let mut acc = "x0".to_string();
    for i in 0..n {
        let operand = format!("y{i}");
        let out = format!("s{i}");
        graph.input.push(ValueInfoProto::new(operand.clone(), &desc).unwrap());
        graph.node.push(NodeProto {
            name: format!("add_{i}"),
            op_type: "Add".into(),
            domain: String::new(),
            input: vec![acc, operand],
            output: vec![out.clone()],
            attribute: Attributes::new(),
        });
        acc = out;
    }
    graph.output.push(ValueInfoProto::new(acc, &desc).unwrap());

    ModelProto {
        ir_version: 3,
        producer_name: "bench".into(),
        producer_version: String::new(),
        domain: String::new(),
        model_version: 1,
        opset_import: vec![],
        graph,
    }
}

fn bench_import(c: &mut Criterion) {
    let importer = ModelImporter::new();
    let mut group = c.benchmark_group("import_add_chain");
    for n in [1usize, 16, 256] {
        let model = add_chain(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &model, |b, m| {
            b.iter(|| importer.import(black_box(m)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_registry_infer, bench_import);
criterion_main!(benches);
