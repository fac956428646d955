// Copyright 2025 the Raster Primitives Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The active edge table: edges overlapping the current scanline.
//!
//! Entries are ids into the builder's pools, valid for the duration of one
//! fill. Curve edges are stepped lazily while expiring, so an edge whose
//! current sub-segment ended above the row either advances into range or
//! drops out.

use crate::edge_builder::{EdgeBuilder, EdgeId};

#[derive(Default)]
pub(crate) struct ActiveList {
    ids: Vec<EdgeId>,
}

impl ActiveList {
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn get(&self, i: usize) -> EdgeId {
        self.ids[i]
    }

    /// Inserts an edge. Edges that begin above `y_sub` (for example above the
    /// viewport) get their X caught up to the row top, keeping the invariant
    /// that `x` corresponds to `max(first_y, row_top)`.
    pub fn insert(&mut self, builder: &mut EdgeBuilder, id: EdgeId, y_sub: i32) {
        let line = builder.line_of_mut(id);
        if line.first_y < y_sub {
            let count = (y_sub - line.first_y) as i64;
            line.x = (line.x as i64 + line.dx as i64 * count)
                .clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        }
        self.ids.push(id);
    }

    /// Drops edges whose current sub-segment ends above `y_sub`, stepping
    /// curve edges forward first.
    pub fn remove_expired(&mut self, builder: &mut EdgeBuilder, y_sub: i32) {
        let mut i = 0;
        while i < self.ids.len() {
            let id = self.ids[i];
            let mut alive = true;
            while builder.line_of(id).last_y < y_sub {
                if !builder.step_edge(id) {
                    alive = false;
                    break;
                }
            }
            if alive {
                i += 1;
            } else {
                // Order is rebuilt by the per-row sort anyway.
                self.ids.swap_remove(i);
            }
        }
    }

    /// Sorts by current X, breaking ties by slope.
    pub fn sort_by_x(&mut self, builder: &EdgeBuilder) {
        self.ids.sort_unstable_by_key(|id| {
            let line = builder.line_of(*id);
            (line.x, line.dx)
        });
    }

    /// Advances each edge's X to the top of the next pixel row.
    pub fn advance_x(&mut self, builder: &mut EdgeBuilder, y_sub: i32, y_end: i32) {
        for &id in &self.ids {
            let line = builder.line_of_mut(id);
            let from = line.first_y.max(y_sub);
            let count = (y_end - from) as i64;
            if count > 0 {
                line.x = (line.x as i64 + line.dx as i64 * count)
                    .clamp(i32::MIN as i64, i32::MAX as i64) as i32;
            }
        }
    }
}
