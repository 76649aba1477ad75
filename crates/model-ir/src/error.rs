// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model import and graph validation.

use tensor_core::{BroadcastError, DType, TensorDesc};

/// The reason an operator node was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationErrorKind {
    /// The operands do not share an element type.
    #[error("element type mismatch: {lhs} vs {rhs}")]
    TypeMismatch { lhs: DType, rhs: DType },

    /// The operand shapes cannot be broadcast together.
    #[error("broadcast incompatible: {0}")]
    BroadcastIncompatible(BroadcastError),

    /// No validation rule is registered for this operator.
    #[error("unknown operator '{op_type}' in domain '{domain}'")]
    UnknownOperator { op_type: String, domain: String },

    /// An input names a tensor with no descriptor bound yet.
    #[error("input '{tensor}' has no bound descriptor")]
    UnboundInput { tensor: String },

    /// The node has the wrong number of inputs for its operator.
    #[error("expected {expected} inputs, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    /// The operator cannot compute on this element type.
    #[error("element type {dtype} is not supported by this operator")]
    UnsupportedType { dtype: DType },

    /// The output name was already bound by an input, initializer or earlier node.
    #[error("output '{tensor}' is already bound")]
    DuplicateOutput { tensor: String },

    /// The inferred output is too large for its byte size to fit a `usize`.
    #[error("output {inferred} is too large to address")]
    OutputTooLarge { inferred: TensorDesc },

    /// A declared graph output disagrees with the descriptor the graph computes.
    #[error("declared output {declared} does not match inferred {inferred}")]
    OutputMismatch {
        declared: TensorDesc,
        inferred: TensorDesc,
    },
}

impl From<BroadcastError> for ValidationErrorKind {
    fn from(e: BroadcastError) -> Self {
        Self::BroadcastIncompatible(e)
    }
}

/// A node that failed validation, with enough context to find it in the
/// source model: its name, its operator type, and every operand descriptor
/// that was resolved at the time of failure (`None` for unbound names).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("node '{node}' ({op_type}) rejected: {kind} [inputs: {}]", render_inputs(.inputs))]
pub struct ValidationError {
    pub node: String,
    pub op_type: String,
    pub inputs: Vec<(String, Option<TensorDesc>)>,
    pub kind: ValidationErrorKind,
}

fn render_inputs(inputs: &[(String, Option<TensorDesc>)]) -> String {
    inputs
        .iter()
        .map(|(name, desc)| match desc {
            Some(d) => format!("{name}: {d}"),
            None => format!("{name}: <unbound>"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur when importing a model or building its graph.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model file could not be read.
    #[error("failed to read model: {0}")]
    ReadError(#[from] std::io::Error),

    /// The model JSON is malformed.
    #[error("failed to parse model: {0}")]
    ParseError(#[from] serde_json::Error),

    /// A declared tensor (input, output or initializer) is malformed.
    #[error("invalid tensor '{name}': {detail}")]
    InvalidTensor { name: String, detail: String },

    /// An operator node failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The graph was left invalid by an earlier validation failure.
    #[error("graph '{graph}' is invalid after an earlier validation failure")]
    Poisoned { graph: String },

    /// The model graph is structurally malformed.
    #[error("invalid model graph: {0}")]
    InvalidGraph(String),
}

impl ModelError {
    /// Returns the validation failure kind, if this error is one.
    pub fn validation_kind(&self) -> Option<&ValidationErrorKind> {
        match self {
            ModelError::Validation(e) => Some(&e.kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Shape;

    #[test]
    fn test_display_names_node_and_shapes() {
        let err = ValidationError {
            node: "addition".into(),
            op_type: "Add".into(),
            inputs: vec![
                ("Input0".into(), Some(TensorDesc::new(DType::F32, vec![1, 1, 1, 3]))),
                ("Input1".into(), Some(TensorDesc::new(DType::F32, vec![4]))),
            ],
            kind: BroadcastError {
                lhs: Shape::new(vec![1, 1, 1, 3]),
                rhs: Shape::vector(4),
                axis: 3,
                lhs_dim: 3,
                rhs_dim: 4,
            }
            .into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'addition'"));
        assert!(msg.contains("Add"));
        assert!(msg.contains("Input0: f32[1, 1, 1, 3]"));
        assert!(msg.contains("Input1: f32[4]"));
        assert!(msg.contains("axis 3"));
    }

    #[test]
    fn test_display_unbound_input() {
        let err = ValidationError {
            node: "n".into(),
            op_type: "Relu".into(),
            inputs: vec![("x".into(), None)],
            kind: ValidationErrorKind::UnboundInput { tensor: "x".into() },
        };
        assert!(err.to_string().contains("x: <unbound>"));
    }

    #[test]
    fn test_validation_kind_accessor() {
        let err = ModelError::InvalidGraph("empty".into());
        assert!(err.validation_kind().is_none());
    }
}
