//! Damage region accumulation
//!
//! Mutations to the view stack record the screen rectangles they dirty here;
//! the dispatcher flushes the accumulated regions to the display once per
//! batch. The tracker keeps a bounded number of regions and merges when it
//! would overflow, degrading to full damage as the last resort.

use super::Rect;

const DEFAULT_REGION_LIMIT: usize = 8;

/// Accumulates dirty screen rectangles between flushes
#[derive(Clone, Debug)]
pub struct DamageTracker {
    regions: Vec<Rect>,
    limit: usize,
    full: bool,
}

impl Default for DamageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DamageTracker {
    /// Create a tracker with the default region limit
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_REGION_LIMIT)
    }

    /// Create a tracker that keeps at most `limit` disjoint regions
    pub fn with_limit(limit: usize) -> Self {
        Self {
            regions: Vec::with_capacity(limit),
            limit: limit.max(1),
            full: false,
        }
    }

    /// Record a dirty rectangle, merging with any overlapping region
    pub fn add(&mut self, rect: Rect) {
        if !rect.is_valid() || self.full {
            return;
        }

        for i in 0..self.regions.len() {
            if self.regions[i].overlaps(rect) {
                self.regions[i] = self.regions[i].union(rect);
                self.merge_all_overlapping();
                return;
            }
        }

        if self.regions.len() >= self.limit {
            self.merge_smallest_pair();
        }

        if self.regions.len() < self.limit {
            self.regions.push(rect);
        } else {
            self.full = true;
        }
    }

    /// Mark everything dirty
    #[inline]
    pub fn mark_all(&mut self) {
        self.full = true;
    }

    /// Whether anything needs redrawing
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.full || !self.regions.is_empty()
    }

    /// Whether the tracker degraded to full damage
    #[inline]
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Current regions (empty when fully damaged)
    #[inline]
    pub fn regions(&self) -> &[Rect] {
        if self.full {
            &[]
        } else {
            &self.regions
        }
    }

    /// Bounding box of all accumulated damage
    pub fn bounding_box(&self) -> Rect {
        self.regions
            .iter()
            .fold(Rect::EMPTY, |acc, r| acc.union(*r))
    }

    /// Drain the accumulated regions, resetting the tracker.
    /// Returns `None` when the whole screen must be redrawn.
    pub fn take(&mut self) -> Option<Vec<Rect>> {
        let full = self.full;
        self.full = false;
        let regions = std::mem::take(&mut self.regions);
        if full {
            None
        } else {
            Some(regions)
        }
    }

    fn merge_smallest_pair(&mut self) {
        if self.regions.len() < 2 {
            return;
        }

        let mut best = (0, 1);
        let mut best_count = usize::MAX;
        for i in 0..self.regions.len() {
            for j in (i + 1)..self.regions.len() {
                let count = self.regions[i].union(self.regions[j]).area().count();
                if count < best_count {
                    best_count = count;
                    best = (i, j);
                }
            }
        }

        let (i, j) = best;
        let merged = self.regions[i].union(self.regions[j]);
        self.regions[i] = merged;
        self.regions.swap_remove(j);
        self.merge_all_overlapping();
    }

    fn merge_all_overlapping(&mut self) {
        let mut i = 0;
        while i < self.regions.len() {
            let mut j = i + 1;
            while j < self.regions.len() {
                if self.regions[i].overlaps(self.regions[j]) {
                    self.regions[i] = self.regions[i].union(self.regions[j]);
                    self.regions.swap_remove(j);
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
    }
}
