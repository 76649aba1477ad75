// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAII guard that hands a region back to its pool on drop.
//!
//! A [`BufferGuard`] borrows the pool it came from. Two things follow from
//! that borrow: the guard cannot outlive the pool, and the pool's
//! `release_pool` (which needs `&mut self`) cannot be called while any guard
//! is alive. Releasing memory that is still in use is a compile error.

use crate::pool::RegionSink;
use crate::{PoolError, Region};
use std::ptr::NonNull;

/// Exclusive access to one region of a pool's reservation.
///
/// # Example
/// ```
/// use memory_manager::{ArenaPool, PoolOptions, TensorMemoryPool};
///
/// let mut pool = ArenaPool::new(PoolOptions::default());
/// pool.register_request(16).unwrap();
/// pool.allocate_pool().unwrap();
///
/// {
///     let mut guard = pool.acquire(16).unwrap();
///     guard.as_typed_mut::<f32>().unwrap().copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
///     assert_eq!(guard.as_typed::<f32>().unwrap()[3], 4.0);
/// } // region returned here
///
/// pool.release_pool().unwrap();
/// ```
pub struct BufferGuard<'p> {
    ptr: NonNull<u8>,
    region: Region,
    requested: usize,
    sink: &'p dyn RegionSink,
}

// SAFETY: the guard is the only holder of its region, and the sink it
// returns the region to is `Sync`.
unsafe impl Send for BufferGuard<'_> {}

impl<'p> BufferGuard<'p> {
    pub(crate) fn new(
        ptr: NonNull<u8>,
        region: Region,
        requested: usize,
        sink: &'p dyn RegionSink,
    ) -> Self {
        Self {
            ptr,
            region,
            requested,
            sink,
        }
    }

    /// The region of the reservation this guard holds. Its length is the
    /// aligned size, which may exceed [`size_bytes`](Self::size_bytes).
    pub fn region(&self) -> Region {
        self.region
    }

    /// The number of bytes that were requested.
    pub fn size_bytes(&self) -> usize {
        self.requested
    }

    /// The requested bytes, read-only.
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `ptr` points at `region.len >= requested` initialized bytes
        // that no other guard can reach until this one is dropped.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.requested) }
    }

    /// The requested bytes, writable.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as for `as_slice`; `&mut self` makes the access unique.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.requested) }
    }

    /// Views the requested bytes as a slice of `T`.
    ///
    /// Regions start on a 64-byte boundary, so alignment always holds; the
    /// length must be a whole number of `T`s.
    pub fn as_typed<T: bytemuck::Pod>(&self) -> Result<&[T], PoolError> {
        let len = self.requested;
        bytemuck::try_cast_slice(self.as_slice()).map_err(|_| PoolError::InvalidView {
            len,
            type_name: std::any::type_name::<T>(),
        })
    }

    /// Views the requested bytes as a mutable slice of `T`.
    pub fn as_typed_mut<T: bytemuck::Pod>(&mut self) -> Result<&mut [T], PoolError> {
        let len = self.requested;
        bytemuck::try_cast_slice_mut(self.as_mut_slice()).map_err(|_| PoolError::InvalidView {
            len,
            type_name: std::any::type_name::<T>(),
        })
    }
}

impl Drop for BufferGuard<'_> {
    fn drop(&mut self) {
        self.sink.give_back(self.region);
    }
}

impl std::fmt::Debug for BufferGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferGuard")
            .field("region", &self.region)
            .field("size_bytes", &self.requested)
            .finish()
    }
}
