// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Import tests against the addition model fixtures on disk.

use model_ir::{ModelError, ModelImporter, TensorOrigin, ValidationErrorKind};
use std::path::{Path, PathBuf};
use tensor_core::{DType, Shape, TensorDesc};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn valid_addition_imports() {
    let graph = ModelImporter::new()
        .load(&fixture("add_valid.json"))
        .unwrap();

    assert_eq!(graph.name(), "CNTKGraph");
    assert_eq!(graph.num_nodes(), 1);
    assert_eq!(graph.inputs().len(), 2);
    let expected = TensorDesc::new(DType::F32, vec![1, 1, 2, 2]);
    assert_eq!(graph.descriptor("Output"), Some(&expected));
    assert_eq!(graph.outputs(), &[("Output".to_string(), expected)]);
    assert_eq!(graph.origin("Output"), Some(TensorOrigin::Node(0)));
}

#[test]
fn broadcast_addition_imports() {
    let graph = ModelImporter::new()
        .load(&fixture("add_broadcast.json"))
        .unwrap();
    assert_eq!(
        graph.descriptor("Output"),
        Some(&TensorDesc::new(DType::F32, vec![1, 1, 1, 4]))
    );
}

#[test]
fn int32_inputs_with_float_output_rejected() {
    let err = ModelImporter::new()
        .load(&fixture("add_int32_inputs.json"))
        .unwrap_err();

    match err.validation_kind() {
        Some(ValidationErrorKind::OutputMismatch { declared, inferred }) => {
            assert_eq!(declared.dtype(), DType::F32);
            assert_eq!(inferred.dtype(), DType::I32);
        }
        other => panic!("expected OutputMismatch, got {other:?}"),
    }
}

#[test]
fn incompatible_broadcast_rejected_at_axis_three() {
    let err = ModelImporter::new()
        .load(&fixture("add_broadcast_invalid.json"))
        .unwrap_err();

    let ModelError::Validation(v) = &err else {
        panic!("expected a validation error, got {err}");
    };
    assert_eq!(v.node, "addition");
    assert_eq!(v.op_type, "Add");
    match &v.kind {
        ValidationErrorKind::BroadcastIncompatible(b) => {
            assert_eq!(b.lhs, Shape::new(vec![1, 1, 1, 3]));
            assert_eq!(b.rhs, Shape::vector(4));
            assert_eq!(b.axis, 3);
            assert_eq!((b.lhs_dim, b.rhs_dim), (3, 4));
        }
        other => panic!("expected BroadcastIncompatible, got {other:?}"),
    }

    let msg = err.to_string();
    assert!(msg.contains("addition"));
    assert!(msg.contains("f32[1, 1, 1, 3]"));
    assert!(msg.contains("f32[4]"));
}

#[test]
fn missing_file_is_read_error() {
    let err = ModelImporter::new()
        .load(&fixture("does_not_exist.json"))
        .unwrap_err();
    assert!(matches!(err, ModelError::ReadError(_)));
}

#[test]
fn importing_twice_gives_identical_graphs() {
    let importer = ModelImporter::new();
    let a = importer.load(&fixture("add_broadcast.json")).unwrap();
    let b = importer.load(&fixture("add_broadcast.json")).unwrap();
    assert_eq!(a.summary(), b.summary());
    assert_eq!(a.descriptor("Output"), b.descriptor("Output"));
}
