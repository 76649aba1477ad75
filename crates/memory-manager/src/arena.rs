// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! First-fit arena pool.
//!
//! The reservation is the sum of every registered request (each rounded up
//! to 64 bytes), so all registered buffers fit at once. Free space is kept
//! as an offset-sorted list of regions: `acquire` takes the first region
//! that is large enough and splits it, and a returned region is merged with
//! any free neighbours so the arena does not fragment over repeated runs.

use crate::pool::{align_up, lock, PoolCore, RegionSink};
use crate::{AllocationStats, BufferGuard, PoolError, PoolOptions, PoolState, Region, TensorMemoryPool};
use std::sync::Mutex;

/// A pool that carves first-fit regions out of one arena.
///
/// # Example
/// ```
/// use memory_manager::{ArenaPool, PoolOptions, TensorMemoryPool};
///
/// let mut pool = ArenaPool::new(PoolOptions::default());
/// pool.register_request(100).unwrap();
/// pool.register_request(64).unwrap();
/// assert_eq!(pool.required_capacity(), 192);
///
/// pool.allocate_pool().unwrap();
/// let a = pool.acquire(100).unwrap();
/// let b = pool.acquire(64).unwrap();
/// assert!(!a.region().overlaps(&b.region()));
/// ```
#[derive(Debug)]
pub struct ArenaPool {
    core: PoolCore,
    required: usize,
    free: Mutex<Vec<Region>>,
}

impl ArenaPool {
    /// Creates an unallocated arena.
    pub fn new(options: PoolOptions) -> Self {
        Self {
            core: PoolCore::new("arena", options),
            required: 0,
            free: Mutex::new(Vec::new()),
        }
    }

    /// Returns the size of the largest free region.
    pub fn largest_free(&self) -> usize {
        lock(&self.free).iter().map(|r| r.len).max().unwrap_or(0)
    }

    /// Returns the number of disjoint free regions.
    pub fn free_regions(&self) -> usize {
        lock(&self.free).len()
    }
}

impl TensorMemoryPool for ArenaPool {
    fn name(&self) -> &'static str {
        "arena"
    }

    fn register_request(&mut self, bytes: usize) -> Result<(), PoolError> {
        self.core.check_register(bytes)?;
        self.required = PoolCore::grow_required(self.required, bytes, align_up(bytes))?;
        Ok(())
    }

    fn required_capacity(&self) -> usize {
        self.required
    }

    fn allocate_pool(&mut self) -> Result<(), PoolError> {
        self.core.reserve(self.required)?;
        let free = self.free.get_mut().unwrap_or_else(|p| p.into_inner());
        free.clear();
        if self.required > 0 {
            free.push(Region::new(0, self.required));
        }
        Ok(())
    }

    fn release_pool(&mut self) -> Result<(), PoolError> {
        self.core.release()?;
        self.free.get_mut().unwrap_or_else(|p| p.into_inner()).clear();
        Ok(())
    }

    fn state(&self) -> PoolState {
        self.core.state()
    }

    fn capacity(&self) -> usize {
        self.core.capacity()
    }

    fn acquire(&self, bytes: usize) -> Result<BufferGuard<'_>, PoolError> {
        self.core.check_acquire(bytes)?;
        let need = align_up(bytes);

        let region = {
            let mut free = lock(&self.free);
            let fit = need.and_then(|need| {
                free.iter()
                    .position(|r| r.len >= need)
                    .map(|i| (i, need))
            });
            match fit {
                Some((i, need)) => {
                    let slot = free[i];
                    if slot.len == need {
                        free.remove(i);
                    } else {
                        free[i] = Region::new(slot.offset + need, slot.len - need);
                    }
                    Region::new(slot.offset, need)
                }
                None => {
                    let largest = free.iter().map(|r| r.len).max().unwrap_or(0);
                    return Err(self.core.out_of_capacity(bytes, largest));
                }
            }
        };

        self.core.issue(region, bytes, self)
    }

    fn live_bytes(&self) -> usize {
        self.core.live_bytes()
    }

    fn stats(&self) -> AllocationStats {
        self.core.stats()
    }
}

impl RegionSink for ArenaPool {
    fn give_back(&self, region: Region) {
        {
            let mut free = lock(&self.free);
            let at = free.partition_point(|r| r.offset < region.offset);
            free.insert(at, region);

            // Merge with the following region, then with the preceding one.
            if at + 1 < free.len() && free[at].end() == free[at + 1].offset {
                free[at].len += free[at + 1].len;
                free.remove(at + 1);
            }
            if at > 0 && free[at - 1].end() == free[at].offset {
                free[at - 1].len += free[at].len;
                free.remove(at);
            }
        }
        self.core.returned(region);
    }
}
