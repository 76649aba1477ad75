// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator kinds and operator nodes.
//!
//! A [`Node`] is the validated form of an interchange-format node: a typed
//! [`OpKind`], its ordered input tensor names, exactly one output tensor
//! name, and its attributes. Nodes are owned by the graph and never mutated
//! after validation.

use std::collections::BTreeMap;
use std::fmt;

/// The kind of computation an operator node performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum OpKind {
    /// Element-wise addition with broadcasting.
    Add,
    /// Element-wise subtraction with broadcasting.
    Sub,
    /// Element-wise multiplication with broadcasting.
    Mul,
    /// Element-wise division with broadcasting.
    Div,
    /// Rectified linear unit.
    Relu,
    /// Pass-through copy.
    Identity,
}

impl OpKind {
    /// Every operator kind the importer understands.
    pub const ALL: [OpKind; 6] = [
        OpKind::Add,
        OpKind::Sub,
        OpKind::Mul,
        OpKind::Div,
        OpKind::Relu,
        OpKind::Identity,
    ];

    /// Maps an interchange-format `op_type` string to an operator kind.
    ///
    /// Matching is exact, as operator names in the format are case-sensitive.
    pub fn from_op_type(op_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == op_type)
    }

    /// Returns the interchange-format `op_type` string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Sub => "Sub",
            Self::Mul => "Mul",
            Self::Div => "Div",
            Self::Relu => "Relu",
            Self::Identity => "Identity",
        }
    }

    /// Returns `true` for the two-operand broadcasting arithmetic kinds.
    pub fn is_broadcast_binary(&self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single operator attribute value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Int(i64),
    Float(f32),
    String(String),
    Ints(Vec<i64>),
    Floats(Vec<f32>),
}

/// Operator attributes, keyed by name. Ordered so that display and
/// comparison are deterministic.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// An operator node in the model graph.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Node {
    /// Node name, unique within the graph (e.g. `"addition"`).
    pub name: String,
    /// The operator this node applies.
    pub kind: OpKind,
    /// Input tensor names, in declared order.
    pub inputs: Vec<String>,
    /// Output tensor name.
    pub output: String,
    /// Operator-specific attributes.
    pub attributes: Attributes,
}

impl Node {
    /// Creates a node with no attributes.
    pub fn new(
        name: impl Into<String>,
        kind: OpKind,
        inputs: impl IntoIterator<Item = impl Into<String>>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs: inputs.into_iter().map(Into::into).collect(),
            output: output.into(),
            attributes: Attributes::new(),
        }
    }

    /// Adds an attribute, returning the node.
    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        format!(
            "{} = {}({}) '{}'",
            self.output,
            self.kind,
            self.inputs.join(", "),
            self.name
        )
    }
}
