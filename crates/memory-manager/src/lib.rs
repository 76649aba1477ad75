// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-manager
//!
//! Tensor memory pools with an explicit reserve/release lifecycle.
//!
//! A pool is told up front which buffers a workload will need
//! ([`TensorMemoryPool::register_request`]), reserves memory for all of them
//! in one step ([`TensorMemoryPool::allocate_pool`]), hands out regions
//! while the workload runs ([`TensorMemoryPool::acquire`]), and gives the
//! whole reservation back in one step ([`TensorMemoryPool::release_pool`]).
//!
//! # Key Components
//!
//! - [`TensorMemoryPool`]: the capability every pool strategy implements.
//! - [`ArenaPool`]: first-fit regions carved from one arena, coalesced on return.
//! - [`SlabPool`]: one power-of-two slot per registered request.
//! - [`BufferGuard`]: RAII access to one region. Dropping it returns the
//!   region; the borrow it holds on the pool makes releasing a pool with
//!   live guards a compile error.
//! - [`MemoryBudget`]: a cap on the reservation, parsed from `"512M"` etc.
//! - [`AllocationStats`]: acquisition counters and peak live bytes.
//!
//! # Ownership Model
//!
//! ```text
//! pool.acquire(size)           (&self, any thread)
//!       │
//!       ▼
//!   BufferGuard<'pool>  ◄─── exclusive region of the reservation
//!       │
//!       │  drop()
//!       ▼
//!   free list                  (Mutex-protected)
//!
//! pool.release_pool()          (&mut self: no guard may be alive)
//! ```
//!
//! # Example
//! ```
//! use memory_manager::{ArenaPool, PoolOptions, PoolState, TensorMemoryPool};
//!
//! let mut pool = ArenaPool::new(PoolOptions::default());
//! pool.register_request(1024).unwrap();
//! pool.register_request(512).unwrap();
//! pool.allocate_pool().unwrap();
//!
//! let a = pool.acquire(1024).unwrap();
//! let b = pool.acquire(512).unwrap();
//! assert_eq!(pool.live_bytes(), 1536);
//! drop((a, b));
//!
//! pool.release_pool().unwrap();
//! assert_eq!(pool.state(), PoolState::Released);
//! ```

mod arena;
mod budget;
mod error;
mod guard;
pub mod pool;
mod reservation;
mod slab;
mod stats;

pub use arena::ArenaPool;
pub use budget::MemoryBudget;
pub use error::PoolError;
pub use guard::BufferGuard;
pub use pool::{PoolOptions, PoolState, Region, TensorMemoryPool};
pub use reservation::REGION_ALIGN;
pub use slab::SlabPool;
pub use stats::AllocationStats;
