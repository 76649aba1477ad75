// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Execution backends.
//!
//! A [`Backend`] supplies the memory pool the engine runs out of and the
//! kernels for each operator. [`RefCpuBackend`] is a straightforward
//! element-at-a-time implementation used as the reference for correctness.

use crate::{PoolKind, RuntimeError};
use memory_manager::{ArenaPool, PoolOptions, SlabPool, TensorMemoryPool};
use model_ir::{Node, OpKind};
use std::fmt;
use tensor_core::{DType, Element, Shape, TensorDesc, TensorView};

/// Something that can execute validated nodes.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Short backend name (e.g. `"ref-cpu"`).
    fn name(&self) -> &'static str;

    /// Returns `true` if the backend can run `kind` producing `dtype`.
    fn supports(&self, kind: OpKind, dtype: DType) -> bool;

    /// Creates the pool tensor buffers will live in.
    fn create_pool(&self, kind: PoolKind, options: PoolOptions) -> Box<dyn TensorMemoryPool> {
        match kind {
            PoolKind::Arena => Box::new(ArenaPool::new(options)),
            PoolKind::Slab => Box::new(SlabPool::new(options)),
        }
    }

    /// Executes `node`, writing a dense `out_desc` tensor into `output`.
    ///
    /// `inputs` are in the node's declared input order and already match the
    /// descriptors the validator inferred.
    fn execute(
        &self,
        node: &Node,
        inputs: &[TensorView<'_>],
        output: &mut [u8],
        out_desc: &TensorDesc,
    ) -> Result<(), RuntimeError>;
}

// ── Scalar arithmetic ──────────────────────────────────────────────

/// Element types the reference kernels compute on.
trait Scalar: Element + PartialOrd {
    const ZERO: Self;
    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;
    fn mul(self, rhs: Self) -> Self;
    /// `None` when the quotient is undefined for the type.
    fn div(self, rhs: Self) -> Option<Self>;
}

macro_rules! float_scalar {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            const ZERO: Self = 0.0;
            fn add(self, rhs: Self) -> Self { self + rhs }
            fn sub(self, rhs: Self) -> Self { self - rhs }
            fn mul(self, rhs: Self) -> Self { self * rhs }
            fn div(self, rhs: Self) -> Option<Self> { Some(self / rhs) }
        }
    )*};
}

macro_rules! int_scalar {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            const ZERO: Self = 0;
            fn add(self, rhs: Self) -> Self { self.wrapping_add(rhs) }
            fn sub(self, rhs: Self) -> Self { self.wrapping_sub(rhs) }
            fn mul(self, rhs: Self) -> Self { self.wrapping_mul(rhs) }
            fn div(self, rhs: Self) -> Option<Self> { self.checked_div(rhs) }
        }
    )*};
}

float_scalar!(f32, f64);
int_scalar!(i32, i64);

// ── Broadcasting ───────────────────────────────────────────────────

/// Per-axis strides for reading `input` while iterating `out`: broadcast
/// axes get stride zero.
fn broadcast_strides(input: &Shape, out: &Shape) -> Vec<usize> {
    let padded = Shape::new(input.padded_to(out.rank()));
    padded
        .dims()
        .iter()
        .zip(padded.strides())
        .zip(out.dims())
        .map(|((&d, s), &o)| if d == 1 && o != 1 { 0 } else { s })
        .collect()
}

/// Maps an output linear index to the input linear index it reads.
fn source_index(mut linear: usize, out_dims: &[usize], strides: &[usize]) -> usize {
    let mut index = 0;
    for (&d, &s) in out_dims.iter().zip(strides).rev() {
        index += (linear % d) * s;
        linear /= d;
    }
    index
}

fn write<T: Element>(output: &mut [u8], values: impl Iterator<Item = T>) {
    let size = std::mem::size_of::<T>();
    for (chunk, v) in output.chunks_exact_mut(size).zip(values) {
        chunk.copy_from_slice(bytemuck::bytes_of(&v));
    }
}

fn binary<T: Scalar>(
    a: &TensorView<'_>,
    b: &TensorView<'_>,
    output: &mut [u8],
    out_desc: &TensorDesc,
    op: impl Fn(T, T) -> Option<T>,
) -> Result<(), String> {
    let out = out_desc.shape();
    let a_strides = broadcast_strides(a.desc().shape(), out);
    let b_strides = broadcast_strides(b.desc().shape(), out);

    let mut values = Vec::with_capacity(out.num_elements());
    for i in 0..out.num_elements() {
        let x: T = a.read(source_index(i, out.dims(), &a_strides));
        let y: T = b.read(source_index(i, out.dims(), &b_strides));
        values.push(op(x, y).ok_or_else(|| format!("undefined result at element {i}"))?);
    }
    write(output, values.into_iter());
    Ok(())
}

fn relu<T: Scalar>(x: &TensorView<'_>, output: &mut [u8]) {
    let n = x.desc().num_elements();
    write(
        output,
        (0..n).map(|i| {
            let v: T = x.read(i);
            if v > T::ZERO {
                v
            } else {
                T::ZERO
            }
        }),
    );
}

fn binary_op<T: Scalar>(kind: OpKind) -> fn(T, T) -> Option<T> {
    match kind {
        OpKind::Sub => |x: T, y: T| Some(x.sub(y)),
        OpKind::Mul => |x: T, y: T| Some(x.mul(y)),
        OpKind::Div => |x: T, y: T| x.div(y),
        _ => |x: T, y: T| Some(x.add(y)),
    }
}

// ── Reference CPU backend ──────────────────────────────────────────

/// Single-threaded reference kernels for every registered operator on
/// `f32`, `f64`, `i32` and `i64`. Integer arithmetic wraps; integer
/// division by zero is an execution error.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefCpuBackend;

impl RefCpuBackend {
    pub fn new() -> Self {
        Self
    }

    fn run_binary(
        &self,
        node: &Node,
        inputs: &[TensorView<'_>],
        output: &mut [u8],
        out_desc: &TensorDesc,
    ) -> Result<(), String> {
        let [a, b] = inputs else {
            return Err(format!("expected 2 inputs, got {}", inputs.len()));
        };
        match out_desc.dtype() {
            DType::F32 => binary::<f32>(a, b, output, out_desc, binary_op(node.kind)),
            DType::F64 => binary::<f64>(a, b, output, out_desc, binary_op(node.kind)),
            DType::I32 => binary::<i32>(a, b, output, out_desc, binary_op(node.kind)),
            DType::I64 => binary::<i64>(a, b, output, out_desc, binary_op(node.kind)),
            other => Err(format!("no kernel for {other}")),
        }
    }
}

impl Backend for RefCpuBackend {
    fn name(&self) -> &'static str {
        "ref-cpu"
    }

    fn supports(&self, kind: OpKind, dtype: DType) -> bool {
        match kind {
            OpKind::Identity => true,
            _ => matches!(dtype, DType::F32 | DType::F64 | DType::I32 | DType::I64),
        }
    }

    fn execute(
        &self,
        node: &Node,
        inputs: &[TensorView<'_>],
        output: &mut [u8],
        out_desc: &TensorDesc,
    ) -> Result<(), RuntimeError> {
        if !self.supports(node.kind, out_desc.dtype()) {
            return Err(RuntimeError::Unsupported {
                backend: self.name(),
                node: node.name.clone(),
                op: node.kind.to_string(),
                dtype: out_desc.dtype(),
            });
        }
        if output.len() != out_desc.size_bytes() {
            return Err(RuntimeError::ExecutionError {
                node: node.name.clone(),
                detail: format!(
                    "output buffer is {} bytes, {out_desc} needs {}",
                    output.len(),
                    out_desc.size_bytes()
                ),
            });
        }

        let result = match node.kind {
            OpKind::Add | OpKind::Sub | OpKind::Mul | OpKind::Div => {
                self.run_binary(node, inputs, output, out_desc)
            }
            OpKind::Relu | OpKind::Identity => match inputs {
                [x] if node.kind == OpKind::Identity => {
                    output.copy_from_slice(x.as_bytes());
                    Ok(())
                }
                [x] => {
                    match out_desc.dtype() {
                        DType::F32 => relu::<f32>(x, output),
                        DType::F64 => relu::<f64>(x, output),
                        DType::I32 => relu::<i32>(x, output),
                        _ => relu::<i64>(x, output),
                    }
                    Ok(())
                }
                _ => Err(format!("expected 1 input, got {}", inputs.len())),
            },
        };

        result.map_err(|detail| RuntimeError::ExecutionError {
            node: node.name.clone(),
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Tensor;

    fn exec(node: &Node, inputs: &[&Tensor], out_desc: TensorDesc) -> Result<Tensor, RuntimeError> {
        let views: Vec<_> = inputs.iter().map(|t| t.view()).collect();
        let mut out = vec![0u8; out_desc.size_bytes()];
        RefCpuBackend.execute(node, &views, &mut out, &out_desc)?;
        Ok(Tensor::from_bytes(out_desc, out)?)
    }

    fn add_node() -> Node {
        Node::new("addition", OpKind::Add, ["a", "b"], "y")
    }

    #[test]
    fn test_add_same_shape() {
        let a = Tensor::from_f32(vec![1, 1, 2, 2], &[1.0, 2.0, -3.0, -4.0]).unwrap();
        let b = Tensor::from_f32(vec![1, 1, 2, 2], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let y = exec(&add_node(), &[&a, &b], a.desc().clone()).unwrap();
        assert_eq!(y.to_vec::<f32>().unwrap(), vec![2.0, 4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_add_broadcast_vector() {
        let a = Tensor::from_f32(vec![1, 1, 1, 4], &[1.0, 2.0, -3.0, -4.0]).unwrap();
        let b = Tensor::from_f32(vec![4], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let y = exec(&add_node(), &[&a, &b], a.desc().clone()).unwrap();
        assert_eq!(y.to_vec::<f32>().unwrap(), vec![2.0, 4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_broadcast_both_sides() {
        // [2, 1] + [1, 3] -> [2, 3]
        let a = Tensor::from_i32(vec![2, 1], &[10, 20]).unwrap();
        let b = Tensor::from_i32(vec![1, 3], &[1, 2, 3]).unwrap();
        let y = exec(&add_node(), &[&a, &b], TensorDesc::new(DType::I32, vec![2, 3])).unwrap();
        assert_eq!(y.to_vec::<i32>().unwrap(), vec![11, 12, 13, 21, 22, 23]);
    }

    #[test]
    fn test_scalar_operand() {
        let a = Tensor::from_f32(vec![3], &[1.0, 2.0, 3.0]).unwrap();
        let s = Tensor::from_f32(Shape::scalar(), &[0.5]).unwrap();
        let node = Node::new("m", OpKind::Mul, ["a", "s"], "y");
        let y = exec(&node, &[&a, &s], a.desc().clone()).unwrap();
        assert_eq!(y.to_vec::<f32>().unwrap(), vec![0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_sub_and_div_i64() {
        let a = Tensor::from_i64(vec![2], &[9, -8]).unwrap();
        let b = Tensor::from_i64(vec![2], &[3, 2]).unwrap();
        let sub = Node::new("s", OpKind::Sub, ["a", "b"], "y");
        let div = Node::new("d", OpKind::Div, ["a", "b"], "y");
        let desc = a.desc().clone();
        assert_eq!(exec(&sub, &[&a, &b], desc.clone()).unwrap().to_vec::<i64>().unwrap(), vec![6, -10]);
        assert_eq!(exec(&div, &[&a, &b], desc).unwrap().to_vec::<i64>().unwrap(), vec![3, -4]);
    }

    #[test]
    fn test_integer_division_by_zero() {
        let a = Tensor::from_i32(vec![2], &[1, 2]).unwrap();
        let b = Tensor::from_i32(vec![2], &[1, 0]).unwrap();
        let node = Node::new("d", OpKind::Div, ["a", "b"], "y");
        let err = exec(&node, &[&a, &b], a.desc().clone()).unwrap_err();
        assert!(matches!(err, RuntimeError::ExecutionError { ref node, .. } if node == "d"));
    }

    #[test]
    fn test_relu_and_identity() {
        let x = Tensor::from_f32(vec![4], &[-1.0, 0.0, 2.5, -0.5]).unwrap();
        let relu = Node::new("r", OpKind::Relu, ["x"], "y");
        let y = exec(&relu, &[&x], x.desc().clone()).unwrap();
        assert_eq!(y.to_vec::<f32>().unwrap(), vec![0.0, 0.0, 2.5, 0.0]);

        let id = Node::new("i", OpKind::Identity, ["x"], "y");
        assert_eq!(exec(&id, &[&x], x.desc().clone()).unwrap(), x);
    }

    #[test]
    fn test_zero_extent_output() {
        let a = Tensor::from_f32(vec![0, 3], &[]).unwrap();
        let b = Tensor::from_f32(vec![1, 3], &[1.0, 2.0, 3.0]).unwrap();
        let y = exec(&add_node(), &[&a, &b], a.desc().clone()).unwrap();
        assert_eq!(y.size_bytes(), 0);
    }

    #[test]
    fn test_unsupported_dtype() {
        let a = Tensor::from_slice(vec![2], &[1u8, 2]).unwrap();
        let err = exec(&add_node(), &[&a, &a], a.desc().clone()).unwrap_err();
        assert!(matches!(err, RuntimeError::Unsupported { dtype: DType::U8, .. }));
        assert!(RefCpuBackend.supports(OpKind::Identity, DType::U8));
    }

    #[test]
    fn test_broadcast_strides() {
        let out = Shape::new(vec![2, 3, 4]);
        assert_eq!(broadcast_strides(&Shape::vector(4), &out), vec![0, 0, 1]);
        assert_eq!(broadcast_strides(&Shape::new(vec![3, 1]), &out), vec![0, 1, 0]);
        assert_eq!(broadcast_strides(&out, &out), vec![12, 4, 1]);
    }
}
