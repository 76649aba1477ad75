// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pool usage counters.

/// Cumulative statistics about a pool's reservations and acquisitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AllocationStats {
    /// Successful acquisitions.
    pub acquisitions: u64,
    /// Regions handed back by dropped guards.
    pub returns: u64,
    /// Acquisitions refused because no free region was large enough.
    pub out_of_capacity: u64,
    /// Highest number of bytes held by live guards at any one time.
    pub peak_live_bytes: usize,
    /// Total bytes handed out over the pool's lifetime.
    pub cumulative_bytes: u64,
    /// Number of backing reservations made (more than one only with re-entry).
    pub reservations: u64,
}

impl AllocationStats {
    pub(crate) fn record_acquire(&mut self, bytes: usize, live_now: usize) {
        self.acquisitions += 1;
        self.cumulative_bytes += bytes as u64;
        self.peak_live_bytes = self.peak_live_bytes.max(live_now);
    }

    pub(crate) fn record_return(&mut self) {
        self.returns += 1;
    }

    pub(crate) fn record_out_of_capacity(&mut self) {
        self.out_of_capacity += 1;
    }

    pub(crate) fn record_reservation(&mut self) {
        self.reservations += 1;
    }

    /// Returns the number of acquisitions whose guard is still alive.
    pub fn outstanding(&self) -> u64 {
        self.acquisitions.saturating_sub(self.returns)
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let peak_kb = self.peak_live_bytes as f64 / 1024.0;
        format!(
            "Acquisitions: {} ({} returned, {} out of capacity), peak {:.2} KB live, \
             {} bytes cumulative, {} reservation(s)",
            self.acquisitions,
            self.returns,
            self.out_of_capacity,
            peak_kb,
            self.cumulative_bytes,
            self.reservations,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let s = AllocationStats::default();
        assert_eq!(s.acquisitions, 0);
        assert_eq!(s.outstanding(), 0);
    }

    #[test]
    fn test_peak_does_not_decrease() {
        let mut s = AllocationStats::default();
        s.record_acquire(64, 64);
        s.record_acquire(128, 192);
        s.record_return();
        s.record_acquire(64, 128);
        assert_eq!(s.peak_live_bytes, 192);
        assert_eq!(s.cumulative_bytes, 256);
        assert_eq!(s.outstanding(), 2);
    }

    #[test]
    fn test_summary() {
        let mut s = AllocationStats::default();
        s.record_reservation();
        s.record_acquire(1024, 1024);
        s.record_out_of_capacity();
        let summary = s.summary();
        assert!(summary.contains("Acquisitions: 1"));
        assert!(summary.contains("1 out of capacity"));
        assert!(summary.contains("1 reservation"));
    }
}
