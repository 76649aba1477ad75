// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor shape descriptors and the broadcasting rule.

use crate::BroadcastError;
use std::fmt;

/// Describes the dimensionality of a tensor.
///
/// Shapes are immutable once created. Dimensions may be zero (an empty
/// tensor); rank 0 is a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![2, 3, 4]);
    /// assert_eq!(s.rank(), 3);
    /// assert_eq!(s.num_elements(), 24);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Creates a scalar shape (rank 0).
    pub fn scalar() -> Self {
        Self { dims: vec![] }
    }

    /// Creates a 1-D shape.
    pub fn vector(len: usize) -> Self {
        Self { dims: vec![len] }
    }

    /// Creates a 2-D shape (matrix).
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self {
            dims: vec![rows, cols],
        }
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements.
    ///
    /// A scalar holds one element; any zero-sized dimension makes it zero.
    /// Overflows for shapes [`Shape::checked_num_elements`] rejects; validated
    /// graphs never carry such shapes.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the number of elements, or `None` if it does not fit a `usize`.
    pub fn checked_num_elements(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the size of a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.dims.get(index).copied()
    }

    /// Computes the memory footprint in bytes for a given [`crate::DType`].
    pub fn size_bytes(&self, dtype: super::DType) -> usize {
        self.num_elements() * dtype.size_bytes()
    }

    /// Like [`Shape::size_bytes`], but `None` on overflow.
    pub fn checked_size_bytes(&self, dtype: super::DType) -> Option<usize> {
        self.checked_num_elements()?.checked_mul(dtype.size_bytes())
    }

    /// Computes row-major (C-order) strides for this shape.
    pub fn strides(&self) -> Vec<usize> {
        let rank = self.dims.len();
        if rank == 0 {
            return vec![];
        }
        let mut strides = vec![0usize; rank];
        strides[rank - 1] = 1;
        for i in (0..rank - 1).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Returns this shape left-padded with ones to `rank` dimensions.
    ///
    /// If `rank` is not larger than the current rank the dims are returned
    /// unchanged.
    pub fn padded_to(&self, rank: usize) -> Vec<usize> {
        let pad = rank.saturating_sub(self.dims.len());
        let mut dims = vec![1usize; pad];
        dims.extend_from_slice(&self.dims);
        dims
    }

    /// Computes the broadcast of `self` and `other`.
    ///
    /// Dimensions are right-aligned and the shorter shape is padded on the
    /// left with ones. An aligned pair `(a, b)` is compatible when `a == b`,
    /// `a == 1` or `b == 1`, and the result takes the extent that is not the
    /// stretched `1` (so `0` against `1` gives `0`). Any other pair fails,
    /// and the error reports the lowest incompatible aligned axis.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let a = Shape::new(vec![1, 1, 1, 4]);
    /// let b = Shape::vector(4);
    /// assert_eq!(a.broadcast_with(&b).unwrap(), Shape::new(vec![1, 1, 1, 4]));
    /// ```
    pub fn broadcast_with(&self, other: &Shape) -> Result<Shape, BroadcastError> {
        let rank = self.rank().max(other.rank());
        let lhs = self.padded_to(rank);
        let rhs = other.padded_to(rank);

        let mut dims = Vec::with_capacity(rank);
        for (axis, (&a, &b)) in lhs.iter().zip(rhs.iter()).enumerate() {
            let out = if a == b {
                a
            } else if a == 1 {
                b
            } else if b == 1 {
                a
            } else {
                return Err(BroadcastError {
                    lhs: self.clone(),
                    rhs: other.clone(),
                    axis,
                    lhs_dim: a,
                    rhs_dim: b,
                });
            };
            dims.push(out);
        }
        Ok(Shape { dims })
    }

    /// Returns `true` if two shapes are broadcast-compatible.
    pub fn is_broadcast_compatible(&self, other: &Shape) -> bool {
        self.broadcast_with(other).is_ok()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// Convenience: `Shape::from(vec![2, 3])`.
impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

/// Convenience: `Shape::from(&[2, 3][..])`.
impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DType;

    fn shape(dims: &[usize]) -> Shape {
        Shape::from(dims)
    }

    #[test]
    fn test_scalar_shape() {
        let s = Shape::scalar();
        assert_eq!(s.rank(), 0);
        assert_eq!(s.num_elements(), 1);
        assert!(s.strides().is_empty());
    }

    #[test]
    fn test_zero_extent_has_no_elements() {
        assert_eq!(shape(&[0, 3]).num_elements(), 0);
        assert_eq!(shape(&[0, 3]).size_bytes(DType::F32), 0);
    }

    #[test]
    fn test_checked_sizes() {
        let s = shape(&[2, 3, 4]);
        assert_eq!(s.checked_num_elements(), Some(24));
        assert_eq!(s.checked_size_bytes(crate::DType::F64), Some(192));
        assert_eq!(Shape::scalar().checked_num_elements(), Some(1));

        let huge = shape(&[1 << 32, 1 << 32, 16]);
        assert_eq!(huge.checked_num_elements(), None);
        // Element count fits, byte count does not.
        let wide = shape(&[usize::MAX / 2 + 1]);
        assert!(wide.checked_num_elements().is_some());
        assert_eq!(wide.checked_size_bytes(crate::DType::F32), None);
        // A zero extent wins even next to huge dims.
        assert_eq!(shape(&[0, usize::MAX, 2]).checked_size_bytes(crate::DType::F32), Some(0));
    }

    #[test]
    fn test_strides() {
        assert_eq!(Shape::matrix(3, 4).strides(), vec![4, 1]);
        assert_eq!(shape(&[2, 3, 4]).strides(), vec![12, 4, 1]);
    }

    #[test]
    fn test_padded_to() {
        assert_eq!(Shape::vector(4).padded_to(4), vec![1, 1, 1, 4]);
        assert_eq!(Shape::scalar().padded_to(2), vec![1, 1]);
        assert_eq!(shape(&[2, 3]).padded_to(1), vec![2, 3]);
    }

    #[test]
    fn test_broadcast_identical() {
        let a = shape(&[1, 1, 2, 2]);
        assert_eq!(a.broadcast_with(&a).unwrap(), a);
    }

    #[test]
    fn test_broadcast_trailing_vector() {
        let out = shape(&[1, 1, 1, 4]).broadcast_with(&Shape::vector(4)).unwrap();
        assert_eq!(out, shape(&[1, 1, 1, 4]));
    }

    #[test]
    fn test_broadcast_takes_max_per_axis() {
        let out = shape(&[4, 1, 3]).broadcast_with(&shape(&[2, 1])).unwrap();
        assert_eq!(out, shape(&[4, 2, 3]));
    }

    #[test]
    fn test_broadcast_scalar() {
        let s = Shape::scalar();
        assert_eq!(s.broadcast_with(&shape(&[2, 5])).unwrap(), shape(&[2, 5]));
        assert_eq!(shape(&[2, 5]).broadcast_with(&s).unwrap(), shape(&[2, 5]));
        assert_eq!(s.broadcast_with(&s).unwrap(), Shape::scalar());
    }

    #[test]
    fn test_broadcast_incompatible_reports_axis() {
        let err = shape(&[1, 1, 1, 3])
            .broadcast_with(&Shape::vector(4))
            .unwrap_err();
        assert_eq!(
            err,
            BroadcastError {
                lhs: shape(&[1, 1, 1, 3]),
                rhs: Shape::vector(4),
                axis: 3,
                lhs_dim: 3,
                rhs_dim: 4,
            }
        );
    }

    #[test]
    fn test_broadcast_reports_lowest_axis() {
        // Axes 0 and 2 both disagree; axis 0 must be reported.
        let err = shape(&[2, 1, 3]).broadcast_with(&shape(&[5, 4, 7])).unwrap_err();
        assert_eq!(err.axis, 0);
    }

    #[test]
    fn test_broadcast_zero_against_one() {
        let out = shape(&[0, 3]).broadcast_with(&shape(&[1, 3])).unwrap();
        assert_eq!(out, shape(&[0, 3]));
        let out = shape(&[1, 3]).broadcast_with(&shape(&[0, 1])).unwrap();
        assert_eq!(out, shape(&[0, 3]));
    }

    #[test]
    fn test_broadcast_zero_against_zero() {
        let out = Shape::vector(0).broadcast_with(&Shape::vector(0)).unwrap();
        assert_eq!(out, Shape::vector(0));
    }

    #[test]
    fn test_broadcast_zero_against_other_extent_fails() {
        let err = shape(&[0, 3]).broadcast_with(&shape(&[2, 3])).unwrap_err();
        assert_eq!((err.axis, err.lhs_dim, err.rhs_dim), (0, 0, 2));
    }

    #[test]
    fn test_is_broadcast_compatible() {
        assert!(shape(&[1, 3]).is_broadcast_compatible(&shape(&[4, 3])));
        assert!(shape(&[1, 3]).is_broadcast_compatible(&shape(&[4, 1])));
        assert!(!shape(&[1, 3]).is_broadcast_compatible(&shape(&[4, 2])));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", shape(&[2, 3, 4])), "[2, 3, 4]");
        assert_eq!(format!("{}", Shape::scalar()), "[]");
    }

    #[test]
    fn test_serde_roundtrip() {
        let s = shape(&[1, 2, 3]);
        let json = serde_json::to_string(&s).unwrap();
        let back: Shape = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
