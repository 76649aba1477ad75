// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model graph: named tensors connected by validated operator nodes.
//!
//! # Type-State Pattern
//!
//! ```text
//! ModelGraph<Building>   declarations and nodes are being added,
//!       │                each node is validated as it arrives.
//!       │  .finish()
//!       ▼
//! ModelGraph<Validated>  immutable; every node validated, every
//!                        declared output bound and consistent.
//! ```
//!
//! Nodes must be added in topological order: a node may only consume names
//! that were declared as inputs or initializers, or produced by an earlier
//! node. A failed [`ModelGraph::add_node`] leaves nothing bound and poisons
//! the graph, so a partially built graph can never reach `Validated`.

use crate::{
    ModelError, Node, OpRegistry, ValidationError, ValidationErrorKind,
};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use tensor_core::{Tensor, TensorDesc};

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: graph is under construction.
#[derive(Debug, Clone)]
pub struct Building;

/// Marker: graph has been fully validated.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Building {}
impl GraphState for Validated {}

/// Where a named tensor's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorOrigin {
    /// Supplied by the caller at run time.
    Input,
    /// Constant data stored in the model.
    Initializer,
    /// Produced by the node at this index in execution order.
    Node(usize),
}

impl fmt::Display for TensorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.pad("input"),
            Self::Initializer => f.pad("initializer"),
            Self::Node(index) => f.pad(&format!("node {index}")),
        }
    }
}

#[derive(Debug, Clone)]
struct Binding {
    desc: TensorDesc,
    origin: TensorOrigin,
}

// ── ModelGraph ─────────────────────────────────────────────────────

/// A model graph. `S` encodes whether validation is complete.
#[derive(Debug, Clone)]
pub struct ModelGraph<S: GraphState = Building> {
    name: String,
    nodes: Vec<Node>,
    bindings: HashMap<String, Binding>,
    inputs: Vec<(String, TensorDesc)>,
    initializers: Vec<(String, Tensor)>,
    outputs: Vec<(String, TensorDesc)>,
    poisoned: bool,
    _state: PhantomData<S>,
}

impl<S: GraphState> ModelGraph<S> {
    /// Returns the graph name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the descriptor bound to `tensor`, if any.
    pub fn descriptor(&self, tensor: &str) -> Option<&TensorDesc> {
        self.bindings.get(tensor).map(|b| &b.desc)
    }

    /// Returns where `tensor` comes from, if it is bound.
    pub fn origin(&self, tensor: &str) -> Option<TensorOrigin> {
        self.bindings.get(tensor).map(|b| b.origin)
    }

    /// Returns the number of nodes added so far.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }
}

// ── Building state ─────────────────────────────────────────────────

impl ModelGraph<Building> {
    /// Creates an empty graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            bindings: HashMap::new(),
            inputs: Vec::new(),
            initializers: Vec::new(),
            outputs: Vec::new(),
            poisoned: false,
            _state: PhantomData,
        }
    }

    /// Returns `true` if an earlier node failed validation.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Declares a graph input supplied at run time.
    pub fn declare_input(
        &mut self,
        name: impl Into<String>,
        desc: TensorDesc,
    ) -> Result<(), ModelError> {
        let name = name.into();
        self.bind_declared(&name, desc.clone(), TensorOrigin::Input)?;
        self.inputs.push((name, desc));
        Ok(())
    }

    /// Declares a constant tensor stored in the model.
    pub fn declare_initializer(
        &mut self,
        name: impl Into<String>,
        value: Tensor,
    ) -> Result<(), ModelError> {
        let name = name.into();
        self.bind_declared(&name, value.desc().clone(), TensorOrigin::Initializer)?;
        self.initializers.push((name, value));
        Ok(())
    }

    fn bind_declared(
        &mut self,
        name: &str,
        desc: TensorDesc,
        origin: TensorOrigin,
    ) -> Result<(), ModelError> {
        if self.bindings.contains_key(name) {
            return Err(ModelError::InvalidTensor {
                name: name.to_string(),
                detail: "declared more than once".into(),
            });
        }
        if desc.checked_size_bytes().is_none() {
            return Err(ModelError::InvalidTensor {
                name: name.to_string(),
                detail: format!("{desc} is too large to address"),
            });
        }
        self.bindings
            .insert(name.to_string(), Binding { desc, origin });
        Ok(())
    }

    /// Validates `node` against the descriptors bound so far and, if it is
    /// well-formed, binds its output.
    ///
    /// # Errors
    /// - [`ModelError::Poisoned`] if an earlier node was rejected.
    /// - [`ModelError::Validation`] if this node is rejected; the graph is
    ///   poisoned afterwards.
    pub fn add_node(&mut self, node: Node, registry: &OpRegistry) -> Result<(), ModelError> {
        if self.poisoned {
            return Err(ModelError::Poisoned {
                graph: self.name.clone(),
            });
        }

        match self.check_node(&node, registry) {
            Ok(desc) => {
                tracing::debug!(node = %node.name, op = %node.kind, output = %desc, "node validated");
                let index = self.nodes.len();
                self.bindings.insert(
                    node.output.clone(),
                    Binding {
                        desc,
                        origin: TensorOrigin::Node(index),
                    },
                );
                self.nodes.push(node);
                Ok(())
            }
            Err(kind) => {
                self.poisoned = true;
                let err = ValidationError {
                    inputs: self.resolve_inputs(&node),
                    node: node.name,
                    op_type: node.kind.as_str().to_string(),
                    kind,
                };
                tracing::warn!(graph = %self.name, "{err}");
                Err(err.into())
            }
        }
    }

    fn check_node(
        &self,
        node: &Node,
        registry: &OpRegistry,
    ) -> Result<TensorDesc, ValidationErrorKind> {
        let mut descs = Vec::with_capacity(node.inputs.len());
        for input in &node.inputs {
            let desc = self
                .descriptor(input)
                .ok_or_else(|| ValidationErrorKind::UnboundInput {
                    tensor: input.clone(),
                })?;
            descs.push(desc.clone());
        }

        if self.bindings.contains_key(&node.output) {
            return Err(ValidationErrorKind::DuplicateOutput {
                tensor: node.output.clone(),
            });
        }

        let inferred = registry.infer_node(node, &descs)?;
        if inferred.checked_size_bytes().is_none() {
            return Err(ValidationErrorKind::OutputTooLarge { inferred });
        }
        Ok(inferred)
    }

    fn resolve_inputs(&self, node: &Node) -> Vec<(String, Option<TensorDesc>)> {
        node.inputs
            .iter()
            .map(|name| (name.clone(), self.descriptor(name).cloned()))
            .collect()
    }

    /// Declares a graph output and the descriptor the model claims for it.
    pub fn declare_output(&mut self, name: impl Into<String>, desc: TensorDesc) {
        self.outputs.push((name.into(), desc));
    }

    /// Completes construction.
    ///
    /// # Checks
    /// - No node was rejected.
    /// - The graph has at least one node.
    /// - Every declared output is bound, and its declared descriptor equals
    ///   the inferred one.
    pub fn finish(self) -> Result<ModelGraph<Validated>, ModelError> {
        if self.poisoned {
            return Err(ModelError::Poisoned { graph: self.name });
        }
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidGraph(format!(
                "graph '{}' contains no nodes",
                self.name
            )));
        }

        for (name, declared) in &self.outputs {
            let binding = self.bindings.get(name).ok_or_else(|| {
                ModelError::InvalidGraph(format!("declared output '{name}' is never produced"))
            })?;
            if &binding.desc == declared {
                continue;
            }

            let kind = ValidationErrorKind::OutputMismatch {
                declared: declared.clone(),
                inferred: binding.desc.clone(),
            };
            return Err(match binding.origin {
                TensorOrigin::Node(i) => {
                    let node = &self.nodes[i];
                    ValidationError {
                        node: node.name.clone(),
                        op_type: node.kind.as_str().to_string(),
                        inputs: self.resolve_inputs(node),
                        kind,
                    }
                    .into()
                }
                _ => ModelError::InvalidTensor {
                    name: name.clone(),
                    detail: kind.to_string(),
                },
            });
        }

        tracing::info!(
            graph = %self.name,
            nodes = self.nodes.len(),
            outputs = self.outputs.len(),
            "graph validated"
        );

        Ok(ModelGraph {
            name: self.name,
            nodes: self.nodes,
            bindings: self.bindings,
            inputs: self.inputs,
            initializers: self.initializers,
            outputs: self.outputs,
            poisoned: false,
            _state: PhantomData,
        })
    }
}

// ── Validated state ────────────────────────────────────────────────

impl ModelGraph<Validated> {
    /// Returns the nodes in execution order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Returns a node by execution index.
    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// Returns the runtime inputs in declared order.
    pub fn inputs(&self) -> &[(String, TensorDesc)] {
        &self.inputs
    }

    /// Returns the declared outputs in declared order.
    pub fn outputs(&self) -> &[(String, TensorDesc)] {
        &self.outputs
    }

    /// Returns the constant tensors in declared order.
    pub fn initializers(&self) -> &[(String, Tensor)] {
        &self.initializers
    }

    /// Returns the constant bound to `name`, if any.
    pub fn initializer(&self, name: &str) -> Option<&Tensor> {
        self.initializers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    /// Returns the total dense size of every named tensor in the graph,
    /// saturating at `usize::MAX`.
    pub fn total_tensor_bytes(&self) -> usize {
        self.bindings
            .values()
            .map(|b| b.desc.size_bytes())
            .fold(0, usize::saturating_add)
    }

    /// Returns a one-line summary of the graph.
    pub fn summary(&self) -> String {
        let total_kb = self.total_tensor_bytes() as f64 / 1024.0;
        format!(
            "Graph '{}': {} nodes, {} inputs, {} initializers, {} outputs, {:.2} KB tensors",
            self.name,
            self.nodes.len(),
            self.inputs.len(),
            self.initializers.len(),
            self.outputs.len(),
            total_kb,
        )
    }
}

impl fmt::Display for ModelGraph<Validated> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for (i, node) in self.nodes.iter().enumerate() {
            let out = self
                .descriptor(&node.output)
                .map(ToString::to_string)
                .unwrap_or_default();
            writeln!(f, "  [{i:>3}] {}  -> {out}", node.summary())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpKind;
    use tensor_core::DType;

    fn f32_desc(dims: &[usize]) -> TensorDesc {
        TensorDesc::new(DType::F32, dims)
    }

    fn addition_graph(a: TensorDesc, b: TensorDesc) -> ModelGraph<Building> {
        let mut g = ModelGraph::new("add_graph");
        g.declare_input("Input0", a).unwrap();
        g.declare_input("Input1", b).unwrap();
        g
    }

    fn add_node() -> Node {
        Node::new("addition", OpKind::Add, ["Input0", "Input1"], "Output")
    }

    #[test]
    fn test_build_and_finish() {
        let registry = OpRegistry::with_defaults();
        let mut g = addition_graph(f32_desc(&[1, 1, 2, 2]), f32_desc(&[1, 1, 2, 2]));
        g.add_node(add_node(), &registry).unwrap();
        g.declare_output("Output", f32_desc(&[1, 1, 2, 2]));

        let g = g.finish().unwrap();
        assert_eq!(g.num_nodes(), 1);
        assert_eq!(g.descriptor("Output"), Some(&f32_desc(&[1, 1, 2, 2])));
        assert_eq!(g.origin("Output"), Some(TensorOrigin::Node(0)));
        assert_eq!(g.origin("Input0"), Some(TensorOrigin::Input));
        assert_eq!(g.total_tensor_bytes(), 48);
    }

    #[test]
    fn test_unbound_input_poisons() {
        let registry = OpRegistry::with_defaults();
        let mut g = ModelGraph::new("g");
        g.declare_input("Input0", f32_desc(&[4])).unwrap();

        let err = g.add_node(add_node(), &registry).unwrap_err();
        assert_eq!(
            err.validation_kind(),
            Some(&ValidationErrorKind::UnboundInput {
                tensor: "Input1".into()
            })
        );
        assert!(g.is_poisoned());
        assert!(g.descriptor("Output").is_none());

        let relu = Node::new("r", OpKind::Relu, ["Input0"], "y");
        assert!(matches!(
            g.add_node(relu, &registry),
            Err(ModelError::Poisoned { .. })
        ));
        assert!(matches!(g.finish(), Err(ModelError::Poisoned { .. })));
    }

    #[test]
    fn test_broadcast_failure_carries_context() {
        let registry = OpRegistry::with_defaults();
        let mut g = addition_graph(f32_desc(&[1, 1, 1, 3]), f32_desc(&[4]));
        let err = g.add_node(add_node(), &registry).unwrap_err();

        match err {
            ModelError::Validation(v) => {
                assert_eq!(v.node, "addition");
                assert_eq!(v.op_type, "Add");
                assert_eq!(v.inputs[0].1, Some(f32_desc(&[1, 1, 1, 3])));
                assert_eq!(v.inputs[1].1, Some(f32_desc(&[4])));
                assert!(matches!(
                    v.kind,
                    ValidationErrorKind::BroadcastIncompatible(ref b) if b.axis == 3
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_origin_display_pads() {
        assert_eq!(TensorOrigin::Initializer.to_string(), "initializer");
        assert_eq!(format!("{:<8}|", TensorOrigin::Input), "input   |");
        assert_eq!(format!("{:<8}|", TensorOrigin::Node(3)), "node 3  |");
    }

    #[test]
    fn test_unaddressable_input_rejected() {
        let mut g = ModelGraph::new("huge");
        let err = g
            .declare_input("x", f32_desc(&[1 << 32, 1 << 32, 16]))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidTensor { ref name, .. } if name == "x"));
        assert!(g.descriptor("x").is_none());
    }

    #[test]
    fn test_unaddressable_broadcast_output_poisons() {
        let registry = OpRegistry::with_defaults();
        // Each operand fits; their broadcast does not.
        let mut g = addition_graph(f32_desc(&[1 << 31, 1]), f32_desc(&[1, 1 << 31]));
        let err = g.add_node(add_node(), &registry).unwrap_err();
        assert!(matches!(
            err.validation_kind(),
            Some(ValidationErrorKind::OutputTooLarge { inferred })
                if inferred.shape().dims() == [1 << 31, 1 << 31]
        ));
        assert!(g.is_poisoned());
    }

    #[test]
    fn test_duplicate_output_rejected() {
        let registry = OpRegistry::with_defaults();
        let mut g = addition_graph(f32_desc(&[2]), f32_desc(&[2]));
        let node = Node::new("clobber", OpKind::Relu, ["Input0"], "Input1");
        let err = g.add_node(node, &registry).unwrap_err();
        assert!(matches!(
            err.validation_kind(),
            Some(ValidationErrorKind::DuplicateOutput { .. })
        ));
        // The original binding is untouched.
        assert_eq!(g.descriptor("Input1"), Some(&f32_desc(&[2])));
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let mut g = ModelGraph::new("g");
        g.declare_input("x", f32_desc(&[2])).unwrap();
        let err = g.declare_input("x", f32_desc(&[3])).unwrap_err();
        assert!(matches!(err, ModelError::InvalidTensor { .. }));
    }

    #[test]
    fn test_output_mismatch_reports_producer() {
        let registry = OpRegistry::with_defaults();
        let i32_desc = TensorDesc::new(DType::I32, vec![1, 1, 2, 2]);
        let mut g = addition_graph(i32_desc.clone(), i32_desc);
        g.add_node(add_node(), &registry).unwrap();
        g.declare_output("Output", f32_desc(&[1, 1, 2, 2]));

        let err = g.finish().unwrap_err();
        match err {
            ModelError::Validation(v) => {
                assert_eq!(v.node, "addition");
                assert!(matches!(v.kind, ValidationErrorKind::OutputMismatch { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unproduced_output_rejected() {
        let registry = OpRegistry::with_defaults();
        let mut g = addition_graph(f32_desc(&[2]), f32_desc(&[2]));
        g.add_node(add_node(), &registry).unwrap();
        g.declare_output("Missing", f32_desc(&[2]));
        assert!(matches!(g.finish(), Err(ModelError::InvalidGraph(_))));
    }

    #[test]
    fn test_empty_graph_rejected() {
        let g = ModelGraph::new("empty");
        assert!(matches!(g.finish(), Err(ModelError::InvalidGraph(_))));
    }

    #[test]
    fn test_chained_nodes_and_initializer() {
        let registry = OpRegistry::with_defaults();
        let mut g = ModelGraph::new("chain");
        g.declare_input("x", f32_desc(&[2, 3])).unwrap();
        g.declare_initializer("bias", Tensor::from_f32(vec![3], &[1.0, 2.0, 3.0]).unwrap())
            .unwrap();
        g.add_node(Node::new("add", OpKind::Add, ["x", "bias"], "h"), &registry)
            .unwrap();
        g.add_node(Node::new("act", OpKind::Relu, ["h"], "y"), &registry)
            .unwrap();
        g.declare_output("y", f32_desc(&[2, 3]));

        let g = g.finish().unwrap();
        assert_eq!(g.origin("bias"), Some(TensorOrigin::Initializer));
        assert_eq!(g.origin("y"), Some(TensorOrigin::Node(1)));
        assert!(g.initializer("bias").is_some());
        assert_eq!(g.iter_nodes().count(), 2);
        assert!(g.summary().contains("2 nodes"));
        assert!(g.to_string().contains("y = Relu(h) 'act'"));
    }
}
