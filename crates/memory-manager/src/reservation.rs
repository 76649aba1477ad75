// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The single contiguous block of memory behind an allocated pool.

use crate::Region;
use std::ptr::NonNull;

/// Alignment of the reservation base and of every region carved from it.
pub const REGION_ALIGN: usize = 64;

#[derive(Clone, Copy)]
#[repr(C, align(64))]
struct Line([u8; REGION_ALIGN]);

/// A zeroed, 64-byte aligned block of `len` bytes.
///
/// The block is carved into [`Region`]s by the pool that owns it. The base
/// pointer is derived once at construction and the backing vector is never
/// touched again until drop, so pointers into disjoint regions may be handed
/// out concurrently.
pub(crate) struct Reservation {
    // Owns the memory; only dropped, never read through.
    _lines: Vec<Line>,
    base: NonNull<u8>,
    len: usize,
}

// SAFETY: the reservation is plain owned memory. Concurrent access only
// happens through pointers to regions the owning pool guarantees disjoint.
unsafe impl Send for Reservation {}
unsafe impl Sync for Reservation {}

impl Reservation {
    pub(crate) fn zeroed(len: usize) -> Self {
        let count = (len + REGION_ALIGN - 1) / REGION_ALIGN;
        let mut lines = vec![Line([0; REGION_ALIGN]); count];
        let base = NonNull::from(lines.as_mut_slice()).cast::<u8>();
        tracing::debug!(bytes = len, lines = count, "reservation made");
        Self {
            _lines: lines,
            base,
            len,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Returns a pointer to the start of `region`, zeroing its bytes.
    ///
    /// The caller must hold `region` exclusively.
    pub(crate) fn claim(&self, region: Region) -> NonNull<u8> {
        assert!(
            region.end() <= self.len,
            "region {region:?} outside reservation of {} bytes",
            self.len
        );
        // SAFETY: the region lies within the reservation (checked above) and
        // is held exclusively by the caller, so writing to it races nothing.
        unsafe {
            let ptr = self.base.as_ptr().add(region.offset);
            std::ptr::write_bytes(ptr, 0, region.len);
            NonNull::new_unchecked(ptr)
        }
    }
}

impl std::fmt::Debug for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation").field("len", &self.len).finish()
    }
}
