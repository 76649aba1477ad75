// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor memory pools.

/// Errors that can occur in pool lifecycle operations and acquisitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The pool already holds a reservation.
    #[error("pool is already allocated")]
    PoolAlreadyAllocated,

    /// The pool's reservation has been released.
    #[error("pool has been released")]
    PoolReleased,

    /// The operation needs a reservation, but the pool was never allocated.
    #[error("pool has not been allocated")]
    PoolNotAllocated,

    /// No free region is large enough for the request.
    #[error("pool out of capacity: requested {requested} bytes, largest free region {largest_free} bytes (capacity: {capacity})")]
    PoolOutOfCapacity {
        requested: usize,
        largest_free: usize,
        capacity: usize,
    },

    /// The registered requests add up to more than a `usize` can hold.
    #[error("request of {requested} bytes overflows the pool capacity ({registered} bytes already registered)")]
    CapacityOverflow { requested: usize, registered: usize },

    /// Attempted to register or acquire zero bytes.
    #[error("cannot allocate zero-sized buffer")]
    ZeroSizedAllocation,

    /// The reservation the pool needs is larger than its budget.
    #[error("pool capacity {capacity} bytes exceeds budget of {budget} bytes")]
    ExceedsBudget { capacity: usize, budget: usize },

    /// A memory budget string could not be parsed.
    #[error("invalid memory budget '{0}': expected a number with an optional K, M or G suffix")]
    InvalidBudget(String),

    /// A buffer's length is not a whole number of elements of the requested type.
    #[error("buffer of {len} bytes cannot be viewed as {type_name}")]
    InvalidView {
        len: usize,
        type_name: &'static str,
    },
}
