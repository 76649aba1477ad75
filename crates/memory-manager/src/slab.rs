// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Size-class slab pool.
//!
//! Every registered request gets its own slot, sized to the request's size
//! class (the next power of two, at least 64 bytes). Slots never split or
//! merge, which keeps acquisition and return cheap and predictable at the
//! cost of up to 2x internal waste.

use crate::pool::{lock, PoolCore, RegionSink};
use crate::{AllocationStats, BufferGuard, PoolError, PoolOptions, PoolState, Region, TensorMemoryPool};
use std::sync::Mutex;

/// Smallest slot size.
const MIN_SIZE_CLASS: usize = 64;

/// Computes the size class for a given request, or `None` past the largest
/// power of two.
fn size_class_for(bytes: usize) -> Option<usize> {
    bytes.max(MIN_SIZE_CLASS).checked_next_power_of_two()
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    region: Region,
    in_use: bool,
}

/// A pool of fixed, power-of-two sized slots.
///
/// `acquire` picks the smallest free slot that fits (lowest offset on ties).
///
/// # Example
/// ```
/// use memory_manager::{PoolOptions, SlabPool, TensorMemoryPool};
///
/// let mut pool = SlabPool::new(PoolOptions::default());
/// pool.register_request(100).unwrap(); // 128-byte slot
/// pool.register_request(10).unwrap();  // 64-byte slot
/// assert_eq!(pool.required_capacity(), 192);
///
/// pool.allocate_pool().unwrap();
/// let small = pool.acquire(8).unwrap();
/// assert_eq!(small.region().len, 64);
/// ```
#[derive(Debug)]
pub struct SlabPool {
    core: PoolCore,
    classes: Vec<usize>,
    required: usize,
    slots: Mutex<Vec<Slot>>,
}

impl SlabPool {
    /// Creates an unallocated slab pool.
    pub fn new(options: PoolOptions) -> Self {
        Self {
            core: PoolCore::new("slab", options),
            classes: Vec::new(),
            required: 0,
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Returns the number of slots not currently held by a guard.
    pub fn free_slots(&self) -> usize {
        lock(&self.slots).iter().filter(|s| !s.in_use).count()
    }
}

impl TensorMemoryPool for SlabPool {
    fn name(&self) -> &'static str {
        "slab"
    }

    fn register_request(&mut self, bytes: usize) -> Result<(), PoolError> {
        self.core.check_register(bytes)?;
        let class = size_class_for(bytes);
        self.required = PoolCore::grow_required(self.required, bytes, class)?;
        self.classes.extend(class);
        Ok(())
    }

    fn required_capacity(&self) -> usize {
        self.required
    }

    fn allocate_pool(&mut self) -> Result<(), PoolError> {
        self.core.reserve(self.required_capacity())?;

        // Largest slots first: every slot then starts on a multiple of its
        // own size.
        let mut classes = self.classes.clone();
        classes.sort_unstable_by(|a, b| b.cmp(a));

        let slots = self.slots.get_mut().unwrap_or_else(|p| p.into_inner());
        slots.clear();
        let mut offset = 0;
        for class in classes {
            slots.push(Slot {
                region: Region::new(offset, class),
                in_use: false,
            });
            offset += class;
        }
        tracing::debug!(slots = slots.len(), "slab carved");
        Ok(())
    }

    fn release_pool(&mut self) -> Result<(), PoolError> {
        self.core.release()?;
        self.slots.get_mut().unwrap_or_else(|p| p.into_inner()).clear();
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
        let need = size_class_for(bytes);

        let region = {
            let mut slots = lock(&self.slots);
            let best = need.and_then(|need| {
                slots
                    .iter_mut()
                    .filter(|s| !s.in_use && s.region.len >= need)
                    .min_by_key(|s| (s.region.len, s.region.offset))
            });
            match best {
                Some(slot) => {
                    slot.in_use = true;
                    slot.region
                }
                None => {
                    let largest = slots
                        .iter()
                        .filter(|s| !s.in_use)
                        .map(|s| s.region.len)
                        .max()
                        .unwrap_or(0);
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

impl RegionSink for SlabPool {
    fn give_back(&self, region: Region) {
        if let Some(slot) = lock(&self.slots)
            .iter_mut()
            .find(|s| s.region.offset == region.offset)
        {
            slot.in_use = false;
        }
        self.core.returned(region);
    }
}
