// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The tensor memory pool capability and its shared lifecycle machinery.
//!
//! # Lifecycle
//!
//! ```text
//!  Unallocated ──allocate_pool──► Allocated ──release_pool──► Released
//!   ▲ register_request              │ acquire / drop guard       │
//!   └───────────────────────────────┘                            │
//!                 allocate_pool (only with `allow_reentry`) ◄────┘
//! ```
//!
//! Requests are registered while the pool is `Unallocated`. `allocate_pool`
//! makes one zeroed reservation large enough for all of them, and
//! `release_pool` returns it in one step. In between, `acquire` hands out
//! non-overlapping regions through [`BufferGuard`]s.
//!
//! # Thread Safety
//! Lifecycle transitions take `&mut self`, so they are serialized by the
//! borrow checker and cannot run while any guard (which borrows the pool)
//! is alive. `acquire` takes `&self`; the free list sits behind a `Mutex`,
//! so any number of threads may acquire from a shared pool.

use crate::reservation::{Reservation, REGION_ALIGN};
use crate::{AllocationStats, BufferGuard, MemoryBudget, PoolError};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Where a pool is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum PoolState {
    /// No reservation yet; requests may be registered.
    Unallocated,
    /// The reservation is held; regions may be acquired.
    Allocated,
    /// The reservation has been returned.
    Released,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PoolState::Unallocated => "unallocated",
            PoolState::Allocated => "allocated",
            PoolState::Released => "released",
        };
        f.write_str(s)
    }
}

/// Construction options shared by every pool kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolOptions {
    /// Upper bound on the reservation. `None` means unbounded.
    pub budget: Option<MemoryBudget>,
    /// Whether `allocate_pool` may be called again after `release_pool`.
    pub allow_reentry: bool,
}

/// A byte range within a pool's reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Region {
    pub offset: usize,
    pub len: usize,
}

impl Region {
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// One past the last byte.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Returns `true` if the two ranges share at least one byte.
    pub fn overlaps(&self, other: &Region) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// Rounds `bytes` up to the region alignment, or `None` if that overflows.
pub fn align_up(bytes: usize) -> Option<usize> {
    bytes
        .checked_add(REGION_ALIGN - 1)
        .map(|padded| padded / REGION_ALIGN * REGION_ALIGN)
}

/// The capability every tensor memory pool provides.
///
/// Implementations differ only in how they size the reservation and carve
/// regions from it; the lifecycle rules are the same for all of them.
pub trait TensorMemoryPool: Send + Sync + fmt::Debug {
    /// Short name of the pool strategy (e.g. `"arena"`).
    fn name(&self) -> &'static str;

    /// Declares that a buffer of `bytes` will be needed.
    ///
    /// # Errors
    /// - [`PoolError::ZeroSizedAllocation`] for zero bytes.
    /// - [`PoolError::CapacityOverflow`] if the capacity would not fit a `usize`.
    /// - [`PoolError::PoolAlreadyAllocated`] / [`PoolError::PoolReleased`]
    ///   outside the `Unallocated` state.
    fn register_request(&mut self, bytes: usize) -> Result<(), PoolError>;

    /// Size of the reservation `allocate_pool` will make.
    fn required_capacity(&self) -> usize;

    /// Makes the reservation. Called at most once per lifecycle.
    ///
    /// # Errors
    /// - [`PoolError::PoolAlreadyAllocated`] if already allocated.
    /// - [`PoolError::PoolReleased`] after release, unless re-entry is enabled.
    /// - [`PoolError::ExceedsBudget`] if the capacity is over budget.
    fn allocate_pool(&mut self) -> Result<(), PoolError>;

    /// Returns the whole reservation.
    ///
    /// # Errors
    /// - [`PoolError::PoolNotAllocated`] if never allocated.
    /// - [`PoolError::PoolReleased`] if already released.
    fn release_pool(&mut self) -> Result<(), PoolError>;

    /// Current lifecycle state.
    fn state(&self) -> PoolState;

    /// Size of the current reservation, or zero when none is held.
    fn capacity(&self) -> usize;

    /// Hands out a zeroed region of at least `bytes` bytes.
    ///
    /// Requests too large to round up to a region size are refused with
    /// [`PoolError::PoolOutOfCapacity`] like any other request that does not fit.
    fn acquire(&self, bytes: usize) -> Result<BufferGuard<'_>, PoolError>;

    /// Bytes currently held by live guards (aligned region sizes).
    fn live_bytes(&self) -> usize;

    /// Snapshot of the pool's counters.
    fn stats(&self) -> AllocationStats;
}

/// Receives regions back from dropped [`BufferGuard`]s.
pub(crate) trait RegionSink: Sync {
    fn give_back(&self, region: Region);
}

/// State and bookkeeping common to every pool kind.
#[derive(Debug)]
pub(crate) struct PoolCore {
    name: &'static str,
    options: PoolOptions,
    state: PoolState,
    reservation: Option<Reservation>,
    live_bytes: AtomicUsize,
    stats: Mutex<AllocationStats>,
}

impl PoolCore {
    pub(crate) fn new(name: &'static str, options: PoolOptions) -> Self {
        Self {
            name,
            options,
            state: PoolState::Unallocated,
            reservation: None,
            live_bytes: AtomicUsize::new(0),
            stats: Mutex::new(AllocationStats::default()),
        }
    }

    pub(crate) fn state(&self) -> PoolState {
        self.state
    }

    pub(crate) fn capacity(&self) -> usize {
        self.reservation.as_ref().map_or(0, Reservation::len)
    }

    pub(crate) fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Acquire)
    }

    pub(crate) fn stats(&self) -> AllocationStats {
        self.stats_lock().clone()
    }

    fn stats_lock(&self) -> MutexGuard<'_, AllocationStats> {
        lock(&self.stats)
    }

    /// Checks that a request of `bytes` may be registered now.
    pub(crate) fn check_register(&self, bytes: usize) -> Result<(), PoolError> {
        if bytes == 0 {
            return Err(PoolError::ZeroSizedAllocation);
        }
        match self.state {
            PoolState::Unallocated => Ok(()),
            PoolState::Allocated => Err(PoolError::PoolAlreadyAllocated),
            PoolState::Released => Err(PoolError::PoolReleased),
        }
    }

    /// Makes a reservation of `capacity` bytes, honouring state and budget.
    pub(crate) fn reserve(&mut self, capacity: usize) -> Result<(), PoolError> {
        match self.state {
            PoolState::Allocated => return Err(PoolError::PoolAlreadyAllocated),
            PoolState::Released if !self.options.allow_reentry => {
                return Err(PoolError::PoolReleased)
            }
            _ => {}
        }

        if let Some(budget) = self.options.budget {
            if !budget.admits(capacity) {
                tracing::warn!(pool = self.name, capacity, %budget, "reservation over budget");
                return Err(PoolError::ExceedsBudget {
                    capacity,
                    budget: budget.as_bytes(),
                });
            }
        }

        self.reservation = Some(Reservation::zeroed(capacity));
        self.state = PoolState::Allocated;
        self.stats_lock().record_reservation();
        tracing::info!(pool = self.name, capacity, "pool allocated");
        Ok(())
    }

    /// Drops the reservation.
    pub(crate) fn release(&mut self) -> Result<(), PoolError> {
        match self.state {
            PoolState::Unallocated => Err(PoolError::PoolNotAllocated),
            PoolState::Released => Err(PoolError::PoolReleased),
            PoolState::Allocated => {
                let capacity = self.capacity();
                self.reservation = None;
                self.state = PoolState::Released;
                tracing::info!(pool = self.name, capacity, "pool released");
                Ok(())
            }
        }
    }

    /// Checks that an acquisition of `bytes` may proceed now.
    pub(crate) fn check_acquire(&self, bytes: usize) -> Result<(), PoolError> {
        if bytes == 0 {
            return Err(PoolError::ZeroSizedAllocation);
        }
        match self.state {
            PoolState::Allocated => Ok(()),
            PoolState::Unallocated => Err(PoolError::PoolNotAllocated),
            PoolState::Released => Err(PoolError::PoolReleased),
        }
    }

    /// Adds `region_len` to the `registered` total.
    pub(crate) fn grow_required(
        registered: usize,
        requested: usize,
        region_len: Option<usize>,
    ) -> Result<usize, PoolError> {
        region_len
            .and_then(|len| registered.checked_add(len))
            .ok_or(PoolError::CapacityOverflow {
                requested,
                registered,
            })
    }

    /// Records a refused acquisition and builds its error.
    pub(crate) fn out_of_capacity(&self, requested: usize, largest_free: usize) -> PoolError {
        self.stats_lock().record_out_of_capacity();
        tracing::debug!(pool = self.name, requested, largest_free, "out of capacity");
        PoolError::PoolOutOfCapacity {
            requested,
            largest_free,
            capacity: self.capacity(),
        }
    }

    /// Wraps an exclusively held `region` in a guard.
    pub(crate) fn issue<'p>(
        &'p self,
        region: Region,
        requested: usize,
        sink: &'p dyn RegionSink,
    ) -> Result<BufferGuard<'p>, PoolError> {
        let reservation = self
            .reservation
            .as_ref()
            .ok_or(PoolError::PoolNotAllocated)?;
        let ptr = reservation.claim(region);

        let live = self.live_bytes.fetch_add(region.len, Ordering::AcqRel) + region.len;
        self.stats_lock().record_acquire(region.len, live);
        tracing::trace!(pool = self.name, ?region, requested, "acquired");

        Ok(BufferGuard::new(ptr, region, requested, sink))
    }

    /// Accounts for a region coming back from a guard.
    pub(crate) fn returned(&self, region: Region) {
        self.live_bytes.fetch_sub(region.len, Ordering::AcqRel);
        self.stats_lock().record_return();
        tracing::trace!(pool = self.name, ?region, "returned");
    }
}

/// Locks `m`, recovering the data if another thread panicked while holding it.
/// Every critical section leaves the protected state consistent.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
