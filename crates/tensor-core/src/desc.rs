// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor descriptors: element type plus shape, independent of data.

use crate::{DType, Shape};
use std::fmt;

/// Shape and element-type metadata for a tensor.
///
/// Descriptors are what the graph validator reasons about: each operator
/// consumes the descriptors bound to its inputs and produces the descriptor
/// of its output. They are immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TensorDesc {
    dtype: DType,
    shape: Shape,
}

impl TensorDesc {
    /// Creates a descriptor.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{DType, Shape, TensorDesc};
    /// let d = TensorDesc::new(DType::F32, Shape::new(vec![1, 1, 2, 2]));
    /// assert_eq!(d.size_bytes(), 16);
    /// assert_eq!(d.to_string(), "f32[1, 1, 2, 2]");
    /// ```
    pub fn new(dtype: DType, shape: impl Into<Shape>) -> Self {
        Self {
            dtype,
            shape: shape.into(),
        }
    }

    /// Returns the element type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns the shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the number of elements described.
    pub fn num_elements(&self) -> usize {
        self.shape.num_elements()
    }

    /// Returns the byte size of a dense buffer for this descriptor.
    pub fn size_bytes(&self) -> usize {
        self.shape.size_bytes(self.dtype)
    }

    /// Returns the dense byte size, or `None` if it does not fit a `usize`.
    pub fn checked_size_bytes(&self) -> Option<usize> {
        self.shape.checked_size_bytes(self.dtype)
    }
}

impl fmt::Display for TensorDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.dtype, self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let d = TensorDesc::new(DType::I32, vec![2, 3]);
        assert_eq!(d.dtype(), DType::I32);
        assert_eq!(d.shape().dims(), &[2, 3]);
        assert_eq!(d.num_elements(), 6);
        assert_eq!(d.size_bytes(), 24);
    }

    #[test]
    fn test_checked_size_bytes() {
        assert_eq!(TensorDesc::new(DType::I32, vec![2, 3]).checked_size_bytes(), Some(24));
        let huge = TensorDesc::new(DType::F32, vec![1 << 32, 1 << 32, 16]);
        assert_eq!(huge.checked_size_bytes(), None);
    }

    #[test]
    fn test_scalar_descriptor() {
        let d = TensorDesc::new(DType::F64, Shape::scalar());
        assert_eq!(d.size_bytes(), 8);
        assert_eq!(d.to_string(), "f64[]");
    }

    #[test]
    fn test_equality_covers_dtype_and_shape() {
        let a = TensorDesc::new(DType::F32, vec![4]);
        assert_eq!(a, TensorDesc::new(DType::F32, vec![4]));
        assert_ne!(a, TensorDesc::new(DType::I32, vec![4]));
        assert_ne!(a, TensorDesc::new(DType::F32, vec![1, 4]));
    }
}
