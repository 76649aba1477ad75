// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-operator validation rules.
//!
//! The [`OpRegistry`] maps each [`OpKind`] to an [`OpRule`]: the number of
//! inputs the operator takes and a pure function from input descriptors (and
//! attributes) to the output descriptor. Graph construction only ever goes
//! through [`OpRegistry::infer`], so supporting a new operator means
//! registering one more rule.
//!
//! # Addition and the other broadcasting operators
//!
//! 1. Both operands must have the same element type, otherwise
//!    [`ValidationErrorKind::TypeMismatch`]. This is checked before any
//!    shape work, so a node that is wrong in both respects reports the type.
//! 2. The element type must be numeric.
//! 3. Shapes are combined with [`tensor_core::Shape::broadcast_with`]; a
//!    failure becomes [`ValidationErrorKind::BroadcastIncompatible`] carrying
//!    both shapes and the first incompatible axis.
//! 4. The output takes the first operand's element type.

use crate::{Attributes, Node, OpKind, ValidationErrorKind};
use std::collections::HashMap;
use tensor_core::TensorDesc;

/// Signature shared by every shape/type inference routine.
pub type InferFn = fn(&[TensorDesc], &Attributes) -> Result<TensorDesc, ValidationErrorKind>;

/// How one operator kind is validated.
#[derive(Debug, Clone, Copy)]
pub struct OpRule {
    /// Exact number of inputs the operator takes.
    pub arity: usize,
    /// Computes the output descriptor from the input descriptors.
    pub infer: InferFn,
}

/// Dispatch table from operator kind to validation rule.
#[derive(Debug, Clone)]
pub struct OpRegistry {
    rules: HashMap<OpKind, OpRule>,
}

impl OpRegistry {
    /// Creates a registry with no rules. Every node is an unknown operator.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Creates a registry with the rules for every [`OpKind`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for kind in OpKind::ALL {
            let rule = match kind {
                k if k.is_broadcast_binary() => OpRule {
                    arity: 2,
                    infer: infer_broadcast_binary,
                },
                OpKind::Relu => OpRule {
                    arity: 1,
                    infer: infer_numeric_unary,
                },
                _ => OpRule {
                    arity: 1,
                    infer: infer_identity,
                },
            };
            registry.register(kind, rule);
        }
        registry
    }

    /// Registers (or replaces) the rule for `kind`, returning the previous one.
    pub fn register(&mut self, kind: OpKind, rule: OpRule) -> Option<OpRule> {
        self.rules.insert(kind, rule)
    }

    /// Returns the rule for `kind`, if one is registered.
    pub fn rule(&self, kind: OpKind) -> Option<&OpRule> {
        self.rules.get(&kind)
    }

    /// Returns `true` if a rule is registered for `kind`.
    pub fn supports(&self, kind: OpKind) -> bool {
        self.rules.contains_key(&kind)
    }

    /// Validates one application of `kind` to `inputs`.
    ///
    /// This is a pure function of its arguments: the same inputs always
    /// produce the same descriptor or the same error.
    pub fn infer(
        &self,
        kind: OpKind,
        inputs: &[TensorDesc],
        attributes: &Attributes,
    ) -> Result<TensorDesc, ValidationErrorKind> {
        let rule = self
            .rule(kind)
            .ok_or_else(|| ValidationErrorKind::UnknownOperator {
                op_type: kind.as_str().to_string(),
                domain: String::new(),
            })?;

        if inputs.len() != rule.arity {
            return Err(ValidationErrorKind::ArityMismatch {
                expected: rule.arity,
                actual: inputs.len(),
            });
        }

        (rule.infer)(inputs, attributes)
    }

    /// Validates `node` against already-resolved input descriptors.
    pub fn infer_node(
        &self,
        node: &Node,
        inputs: &[TensorDesc],
    ) -> Result<TensorDesc, ValidationErrorKind> {
        self.infer(node.kind, inputs, &node.attributes)
    }
}

impl Default for OpRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Rule for `Add`, `Sub`, `Mul` and `Div`.
pub fn infer_broadcast_binary(
    inputs: &[TensorDesc],
    _attributes: &Attributes,
) -> Result<TensorDesc, ValidationErrorKind> {
    let [a, b] = inputs else {
        return Err(ValidationErrorKind::ArityMismatch {
            expected: 2,
            actual: inputs.len(),
        });
    };

    if a.dtype() != b.dtype() {
        return Err(ValidationErrorKind::TypeMismatch {
            lhs: a.dtype(),
            rhs: b.dtype(),
        });
    }
    if !a.dtype().is_numeric() {
        return Err(ValidationErrorKind::UnsupportedType { dtype: a.dtype() });
    }

    let shape = a.shape().broadcast_with(b.shape())?;
    Ok(TensorDesc::new(a.dtype(), shape))
}

/// Rule for `Relu`: numeric input, output identical to the input.
pub fn infer_numeric_unary(
    inputs: &[TensorDesc],
    _attributes: &Attributes,
) -> Result<TensorDesc, ValidationErrorKind> {
    let [x] = inputs else {
        return Err(ValidationErrorKind::ArityMismatch {
            expected: 1,
            actual: inputs.len(),
        });
    };
    if !x.dtype().is_numeric() {
        return Err(ValidationErrorKind::UnsupportedType { dtype: x.dtype() });
    }
    Ok(x.clone())
}

/// Rule for `Identity`.
pub fn infer_identity(
    inputs: &[TensorDesc],
    _attributes: &Attributes,
) -> Result<TensorDesc, ValidationErrorKind> {
    match inputs {
        [x] => Ok(x.clone()),
        _ => Err(ValidationErrorKind::ArityMismatch {
            expected: 1,
            actual: inputs.len(),
        }),
    }
}
