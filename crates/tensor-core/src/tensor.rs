// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Owned tensor values and borrowed views.
//!
//! Values only appear at the edges of the runtime: callers hand inputs in as
//! [`Tensor`]s and receive outputs back as [`Tensor`]s. Everything in between
//! lives in pool-managed buffers and is seen through [`TensorView`]s.

use crate::{DType, Shape, TensorDesc, TensorError};

/// A scalar type that can be stored in a tensor buffer.
pub trait Element: bytemuck::Pod {
    /// The [`DType`] this Rust type corresponds to.
    const DTYPE: DType;
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;
}
impl Element for f64 {
    const DTYPE: DType = DType::F64;
}
impl Element for i8 {
    const DTYPE: DType = DType::I8;
}
impl Element for u8 {
    const DTYPE: DType = DType::U8;
}
impl Element for i16 {
    const DTYPE: DType = DType::I16;
}
impl Element for i32 {
    const DTYPE: DType = DType::I32;
}
impl Element for i64 {
    const DTYPE: DType = DType::I64;
}

/// An owned, dense, row-major tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    desc: TensorDesc,
    data: Vec<u8>,
}

impl Tensor {
    /// Creates a zero-filled tensor.
    pub fn zeros(desc: TensorDesc) -> Self {
        let data = vec![0u8; desc.size_bytes()];
        Self { desc, data }
    }

    /// Creates a tensor from raw bytes.
    ///
    /// Returns an error if the buffer length does not match `desc.size_bytes()`.
    pub fn from_bytes(desc: TensorDesc, data: Vec<u8>) -> Result<Self, TensorError> {
        let expected = desc.size_bytes();
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { desc, data })
    }

    /// Creates a tensor from typed values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Shape, Tensor};
    /// let t = Tensor::from_slice(Shape::vector(3), &[1.0f32, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.to_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0]);
    /// ```
    pub fn from_slice<T: Element>(shape: impl Into<Shape>, values: &[T]) -> Result<Self, TensorError> {
        let desc = TensorDesc::new(T::DTYPE, shape);
        let bytes: &[u8] = bytemuck::cast_slice(values);
        Self::from_bytes(desc, bytes.to_vec())
    }

    /// Creates an `f32` tensor.
    pub fn from_f32(shape: impl Into<Shape>, values: &[f32]) -> Result<Self, TensorError> {
        Self::from_slice(shape, values)
    }

    /// Creates an `i32` tensor.
    pub fn from_i32(shape: impl Into<Shape>, values: &[i32]) -> Result<Self, TensorError> {
        Self::from_slice(shape, values)
    }

    /// Creates an `i64` tensor.
    pub fn from_i64(shape: impl Into<Shape>, values: &[i64]) -> Result<Self, TensorError> {
        Self::from_slice(shape, values)
    }

    /// Returns the tensor's descriptor.
    pub fn desc(&self) -> &TensorDesc {
        &self.desc
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        self.desc.shape()
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.desc.dtype()
    }

    /// Returns an immutable view over this tensor's data.
    pub fn view(&self) -> TensorView<'_> {
        TensorView {
            desc: &self.desc,
            data: &self.data,
        }
    }

    /// Returns the raw byte slice backing this tensor.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the memory footprint of this tensor in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Copies the elements out as a typed vector.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, TensorError> {
        self.view().to_vec()
    }
}

/// A borrowed, read-only view over tensor bytes.
///
/// Views are zero-copy and tied to the lifetime of their source, which may be
/// an owned [`Tensor`] or a pool-managed buffer.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    desc: &'a TensorDesc,
    data: &'a [u8],
}

impl<'a> TensorView<'a> {
    /// Creates a view from raw parts.
    ///
    /// Returns an error if `data` is not exactly `desc.size_bytes()` long.
    pub fn from_parts(desc: &'a TensorDesc, data: &'a [u8]) -> Result<Self, TensorError> {
        if data.len() != desc.size_bytes() {
            return Err(TensorError::BufferSizeMismatch {
                expected: desc.size_bytes(),
                actual: data.len(),
            });
        }
        Ok(Self { desc, data })
    }

    /// Returns the descriptor of the viewed tensor.
    pub fn desc(&self) -> &'a TensorDesc {
        self.desc
    }

    /// Returns the raw byte slice.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Reads element `index` without requiring the buffer to be aligned.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn read<T: Element>(&self, index: usize) -> T {
        let size = std::mem::size_of::<T>();
        bytemuck::pod_read_unaligned(&self.data[index * size..(index + 1) * size])
    }

    /// Copies the elements out as a typed vector.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, TensorError> {
        if self.desc.dtype() != T::DTYPE {
            return Err(TensorError::DTypeMismatch {
                requested: T::DTYPE,
                actual: self.desc.dtype(),
            });
        }
        Ok(self
            .data
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let t = Tensor::zeros(TensorDesc::new(DType::F32, Shape::matrix(2, 3)));
        assert_eq!(t.size_bytes(), 24);
        assert!(t.to_vec::<f32>().unwrap().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_from_f32() {
        let data = vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let t = Tensor::from_f32(Shape::matrix(2, 3), &data).unwrap();
        assert_eq!(t.dtype(), DType::F32);
        assert_eq!(t.to_vec::<f32>().unwrap(), data);
    }

    #[test]
    fn test_from_slice_len_mismatch() {
        let result = Tensor::from_f32(Shape::matrix(2, 3), &[1.0, 2.0]);
        assert_eq!(
            result.unwrap_err(),
            TensorError::BufferSizeMismatch {
                expected: 24,
                actual: 8
            }
        );
    }

    #[test]
    fn test_to_vec_wrong_dtype() {
        let t = Tensor::from_i32(Shape::vector(2), &[1, 2]).unwrap();
        assert!(matches!(
            t.to_vec::<f32>(),
            Err(TensorError::DTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_view_read_unaligned() {
        let t = Tensor::from_i64(Shape::vector(3), &[7, -8, 9]).unwrap();
        let v = t.view();
        assert_eq!(v.read::<i64>(1), -8);
        assert_eq!(v.desc(), t.desc());
    }

    #[test]
    fn test_view_from_parts_checks_len() {
        let desc = TensorDesc::new(DType::F32, Shape::vector(2));
        assert!(TensorView::from_parts(&desc, &[0u8; 8]).is_ok());
        assert!(TensorView::from_parts(&desc, &[0u8; 12]).is_err());
    }

    #[test]
    fn test_empty_tensor() {
        let t = Tensor::from_f32(Shape::new(vec![0, 3]), &[]).unwrap();
        assert_eq!(t.size_bytes(), 0);
        assert!(t.to_vec::<f32>().unwrap().is_empty());
    }
}
