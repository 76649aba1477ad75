// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model import: interchange description in, validated graph out.
//!
//! Import walks the description in a fixed order and stops at the first
//! failure:
//!
//! 1. Initializers are decoded and bound.
//! 2. Graph inputs are bound, except those an initializer already provides.
//! 3. Nodes are converted and validated in declared order.
//! 4. Declared outputs are recorded and the graph is finished.

use crate::graph::Validated;
use crate::proto::{ModelProto, NodeProto};
use crate::{ModelError, ModelGraph, Node, OpKind, OpRegistry, ValidationError, ValidationErrorKind};
use std::collections::HashSet;
use std::path::Path;

/// Lowest default-domain opset whose broadcasting rules are the
/// right-aligned, multidirectional ones the registry implements.
const MIN_BROADCAST_OPSET: i64 = 7;

/// Imports interchange-format models into validated graphs.
///
/// # Example
/// ```no_run
/// use model_ir::ModelImporter;
/// use std::path::Path;
///
/// let graph = ModelImporter::new().load(Path::new("addition.json")).unwrap();
/// println!("{}", graph.summary());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModelImporter {
    registry: OpRegistry,
}

impl ModelImporter {
    /// Creates an importer with the default operator rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an importer that validates against `registry`.
    pub fn with_registry(registry: OpRegistry) -> Self {
        Self { registry }
    }

    /// Returns the registry nodes are validated against.
    pub fn registry(&self) -> &OpRegistry {
        &self.registry
    }

    /// Reads a JSON model file and imports it.
    pub fn load(&self, path: &Path) -> Result<ModelGraph<Validated>, ModelError> {
        tracing::info!("loading model from {}", path.display());
        let model = ModelProto::from_file(path)?;
        self.import(&model)
    }

    /// Builds and validates the graph described by `model`.
    pub fn import(&self, model: &ModelProto) -> Result<ModelGraph<Validated>, ModelError> {
        match model.default_opset() {
            Some(v) if v < MIN_BROADCAST_OPSET => tracing::warn!(
                opset = v,
                "model targets an opset older than {MIN_BROADCAST_OPSET}; \
                 legacy broadcast attributes are ignored"
            ),
            Some(v) => tracing::debug!(opset = v, "default opset"),
            None => tracing::debug!("model declares no default opset"),
        }

        let proto = &model.graph;
        let mut graph = ModelGraph::new(proto.name.clone());

        let mut constant_names = HashSet::new();
        for init in &proto.initializer {
            graph.declare_initializer(init.name.clone(), init.to_tensor()?)?;
            constant_names.insert(init.name.as_str());
        }

        for input in &proto.input {
            if constant_names.contains(input.name.as_str()) {
                tracing::debug!(tensor = %input.name, "input provided by initializer");
                continue;
            }
            graph.declare_input(input.name.clone(), input.to_desc()?)?;
        }

        for (index, node_proto) in proto.node.iter().enumerate() {
            let node = self.convert_node(index, node_proto, &graph)?;
            graph.add_node(node, &self.registry)?;
        }

        for output in &proto.output {
            graph.declare_output(output.name.clone(), output.to_desc()?);
        }

        let graph = graph.finish()?;
        tracing::info!("{}", graph.summary());
        Ok(graph)
    }

    fn convert_node(
        &self,
        index: usize,
        proto: &NodeProto,
        graph: &ModelGraph,
    ) -> Result<Node, ModelError> {
        let name = if proto.name.is_empty() {
            format!("{}_{index}", proto.op_type)
        } else {
            proto.name.clone()
        };

        let reject = |kind: ValidationErrorKind| -> ModelError {
            ValidationError {
                node: name.clone(),
                op_type: proto.op_type.clone(),
                inputs: proto
                    .input
                    .iter()
                    .map(|i| (i.clone(), graph.descriptor(i).cloned()))
                    .collect(),
                kind,
            }
            .into()
        };

        let kind = match OpKind::from_op_type(&proto.op_type) {
            Some(kind) if is_default_domain(&proto.domain) => kind,
            _ => {
                return Err(reject(ValidationErrorKind::UnknownOperator {
                    op_type: proto.op_type.clone(),
                    domain: proto.domain.clone(),
                }))
            }
        };

        let output = match proto.output.as_slice() {
            [single] => single.clone(),
            other => {
                return Err(ModelError::InvalidGraph(format!(
                    "node '{name}' ({}) declares {} outputs, exactly one is supported",
                    proto.op_type,
                    other.len()
                )))
            }
        };

        let mut node = Node::new(name, kind, proto.input.iter().cloned(), output);
        node.attributes = proto.attribute.clone();
        Ok(node)
    }
}

fn is_default_domain(domain: &str) -> bool {
    domain.is_empty() || domain == "ai.onnx"
}
