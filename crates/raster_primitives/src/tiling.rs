// Copyright 2025 the Raster Primitives Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binning of monotonic segments into 16x16 tiles.
//!
//! Each segment is walked with a DDA over the tile grid. At step `i` the
//! tile position is `(x0 + sign * floor(a*i + b), y0 + i - floor(a*i + b))`,
//! so consecutive steps move either one tile down or one tile sideways.
//! Segments are clipped to each visited tile; crossings of a tile's top edge
//! bump the backdrop of the tile one column to the right, and a per-row
//! prefix sum turns those bumps into the winding carried into each tile.
//!
//! The numerical guards here (the ULP clamp on `b`, the 2e-7 correction on
//! `a`, the 1e-3 clip bias, the boundary nudges) are load-bearing; removing
//! any one of them reproduces a known artifact class.

use crate::edge::LineEdge;
use crate::edge_builder::EdgeBuilder;
use crate::fixed::fdot16;
use crate::geometry::Point;

pub const TILE_SIZE: u32 = 16;

const TILE_SCALE: f32 = TILE_SIZE as f32;
const INV_TILE_SCALE: f32 = 1.0 / TILE_SIZE as f32;
/// Nudge for points sitting exactly on a vertical tile boundary, in tile
/// units.
const BOUNDARY_NUDGE: f32 = 1.0 / 32768.0;
/// Bias keeping clip points strictly inside a tile, in pixels.
const CLIP_BIAS: f32 = 1e-3;
const ONE_MINUS_ULP: f32 = 0.999_999_94;
const ROBUST_EPSILON: f32 = 2e-7;

/// A segment in tile-local coordinates, stored in its original direction.
///
/// `y_edge` is the Y at which the segment crosses the tile's left edge, or
/// `+INF` when it does not.
#[derive(Clone, Copy, Debug)]
pub struct Segment {
    pub p0: Point,
    pub p1: Point,
    pub y_edge: f32,
}

#[derive(Clone, Debug, Default)]
pub struct Tile {
    pub backdrop: i32,
    pub segments: Vec<Segment>,
}

/// The tile grid's bounding box for the current fill, in tile units.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct TileBBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl TileBBox {
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }
}

pub struct Tiler {
    width_tiles: i32,
    height_tiles: i32,
    tiles: Vec<Tile>,
    bbox: TileBBox,
}

impl Tiler {
    pub fn new(width: u16, height: u16) -> Self {
        let width_tiles = (width as i32 + TILE_SIZE as i32 - 1) / TILE_SIZE as i32;
        let height_tiles = (height as i32 + TILE_SIZE as i32 - 1) / TILE_SIZE as i32;
        Tiler {
            width_tiles,
            height_tiles,
            tiles: vec![Tile::default(); (width_tiles * height_tiles) as usize],
            bbox: TileBBox::default(),
        }
    }

    /// Clears the tiles touched by the previous fill, preserving capacity.
    pub fn reset(&mut self) {
        let bbox = self.bbox;
        for ty in bbox.y0..bbox.y1 {
            for tx in bbox.x0..bbox.x1 {
                let tile = self.tile_mut(tx, ty);
                tile.backdrop = 0;
                tile.segments.clear();
            }
        }
        self.bbox = TileBBox::default();
    }

    pub(crate) fn bbox(&self) -> TileBBox {
        self.bbox
    }

    pub(crate) fn tile(&self, tx: i32, ty: i32) -> &Tile {
        &self.tiles[(ty * self.width_tiles + tx) as usize]
    }

    fn tile_mut(&mut self, tx: i32, ty: i32) -> &mut Tile {
        &mut self.tiles[(ty * self.width_tiles + tx) as usize]
    }

    /// Bins every edge of the builder. Curve edges are walked on cloned
    /// stepper state; the builder is left untouched.
    pub fn bin(&mut self, builder: &EdgeBuilder) {
        let bounds = builder.bounds();
        if bounds.is_empty() {
            return;
        }

        self.bbox = TileBBox {
            x0: ((bounds.min_x * INV_TILE_SCALE).floor() as i32).clamp(0, self.width_tiles),
            y0: ((bounds.min_y * INV_TILE_SCALE).floor() as i32).clamp(0, self.height_tiles),
            x1: ((bounds.max_x * INV_TILE_SCALE).floor() as i32 + 1).clamp(0, self.width_tiles),
            y1: ((bounds.max_y * INV_TILE_SCALE).floor() as i32 + 1).clamp(0, self.height_tiles),
        };
        if self.bbox.is_empty() {
            return;
        }

        let shift = builder.aa_shift();
        for mut edge in builder.all_edges() {
            let mut prev_end: Option<Point> = None;
            loop {
                let (p0, p1, is_down) = line_to_segment(edge.as_line(), shift);

                // A stepper that skipped a zero-height sub-segment leaves a
                // horizontal gap in the polyline; its boundary crossings
                // still carry winding, so bin the connector.
                if let Some(prev) = prev_end {
                    if (prev.x - p0.x).abs() > 1.0 / 256.0 {
                        let joint = Point::new(p0.x, prev.y);
                        let (a, b) = if is_down { (prev, joint) } else { (joint, prev) };
                        self.bin_segment(a, b, true);
                    }
                }
                prev_end = Some(p1);

                self.bin_segment(p0, p1, is_down);
                if !edge.step() {
                    break;
                }
            }
        }

        // Horizontal geometry carries no winding of its own, but its
        // left-edge crossings propagate winding into the tiles it traverses.
        for flat in builder.flats() {
            let (a, b) = if flat[1].y >= flat[0].y {
                (flat[0], flat[1])
            } else {
                (flat[1], flat[0])
            };
            self.bin_segment(a, b, flat[1].y >= flat[0].y);
        }
    }

    /// Bins one monotonic segment given top-to-bottom, with `is_down` naming
    /// its original direction.
    fn bin_segment(&mut self, p0: Point, p1: Point, is_down: bool) {
        debug_assert!(p0.y <= p1.y);

        // Below or above every visible row; nothing to record.
        if p1.y <= 0.0 || p0.y >= (self.height_tiles * TILE_SIZE as i32) as f32 {
            return;
        }

        let mut s0 = p0 * INV_TILE_SCALE;
        let mut s1 = p1 * INV_TILE_SCALE;

        // Points exactly on a vertical tile boundary move off it, so that a
        // tile-local x of zero uniquely marks a left-edge crossing.
        if s0.x.fract() == 0.0 {
            s0.x += BOUNDARY_NUDGE;
        }
        if s1.x.fract() == 0.0 {
            s1.x += BOUNDARY_NUDGE;
        }
        let p0 = s0 * TILE_SCALE;
        let p1 = s1 * TILE_SCALE;

        let count_x = span(s0.x, s1.x) - 1;
        let count = count_x + span(s0.y, s1.y);

        let dx = (s1.x - s0.x).abs();
        let dy = s1.y - s0.y;
        if dx + dy == 0.0 {
            return;
        }
        let y0f = s0.y.floor();
        if dy == 0.0 && y0f == s0.y {
            return;
        }

        let idxdy = 1.0 / (dx + dy);
        let mut a = dx * idxdy;
        let is_positive_slope = s1.x >= s0.x;
        let sign = if is_positive_slope { 1.0 } else { -1.0 };
        let xt0 = (s0.x * sign).floor();
        let c = s0.x * sign - xt0;
        let ytop = if s0.y == s1.y { s0.y.ceil() } else { y0f + 1.0 };
        let b = ((dy * c + dx * (ytop - s0.y)) * idxdy).min(ONE_MINUS_ULP);

        // The walk must end in the expected tile column; float error in `a`
        // is corrected by a one-ULP-scale nudge.
        let robust_err = (a * (count - 1) as f32 + b).floor() - count_x as f32;
        if robust_err != 0.0 {
            a -= ROBUST_EPSILON * robust_err.signum();
        }

        let x0i = (xt0 * sign) as i32 + if is_positive_slope { 0 } else { -1 };
        let y0i = y0f as i32;
        let delta = if is_down { -1 } else { 1 };
        let bbox = self.bbox;

        let mut last_z = 0.0f32;
        for i in 0..count {
            let z = (a * i as f32 + b).floor();
            let tx = x0i + (sign * z) as i32;
            let ty = y0i + i as i32 - z as i32;

            // A repeated floor means the previous step moved down a row, so
            // this tile is entered through its top edge.
            let top_edge = if i == 0 { s0.y == y0f } else { z == last_z };
            last_z = z;

            if ty >= bbox.y1 {
                break;
            }
            if ty < bbox.y0 || tx >= bbox.x1 {
                continue;
            }

            if top_edge {
                let bump_x = (tx + 1).max(bbox.x0);
                if bump_x < bbox.x1 {
                    self.tile_mut(bump_x, ty).backdrop += delta;
                }
            }

            // Tiles left of the bounding box contribute winding only.
            if tx < bbox.x0 {
                continue;
            }

            let origin = Point::new((tx * TILE_SIZE as i32) as f32, (ty * TILE_SIZE as i32) as f32);
            let mut q0 = p0;
            let mut q1 = p1;

            if i > 0 {
                if top_edge {
                    let t = (origin.y - p0.y) / (p1.y - p0.y);
                    let xt = (p0.x + (p1.x - p0.x) * t)
                        .clamp(origin.x + CLIP_BIAS, origin.x + TILE_SCALE - CLIP_BIAS);
                    q0 = Point::new(xt, origin.y);
                } else {
                    let x_clip = if is_positive_slope {
                        origin.x
                    } else {
                        origin.x + TILE_SCALE
                    };
                    let t = (x_clip - p0.x) / (p1.x - p0.x);
                    let yt = (p0.y + (p1.y - p0.y) * t)
                        .clamp(origin.y + CLIP_BIAS, origin.y + TILE_SCALE - CLIP_BIAS);
                    q0 = Point::new(x_clip, yt);
                }
            }

            if i + 1 < count {
                let z_next = (a * (i + 1) as f32 + b).floor();
                if z_next == z {
                    // Exits through the bottom edge.
                    let t = (origin.y + TILE_SCALE - p0.y) / (p1.y - p0.y);
                    let xt = (p0.x + (p1.x - p0.x) * t)
                        .clamp(origin.x + CLIP_BIAS, origin.x + TILE_SCALE - CLIP_BIAS);
                    q1 = Point::new(xt, origin.y + TILE_SCALE);
                } else {
                    let x_clip = if is_positive_slope {
                        origin.x + TILE_SCALE
                    } else {
                        origin.x
                    };
                    let t = (x_clip - p0.x) / (p1.x - p0.x);
                    let yt = (p0.y + (p1.y - p0.y) * t)
                        .clamp(origin.y + CLIP_BIAS, origin.y + TILE_SCALE - CLIP_BIAS);
                    q1 = Point::new(x_clip, yt);
                }
            }

            // Tile-local coordinates.
            let mut q0 = clamp_local(q0 - origin);
            let mut q1 = clamp_local(q1 - origin);

            // Restore the original direction before recording the crossing,
            // so the sign of delta.x carries the winding of the left edge.
            if !is_down {
                core::mem::swap(&mut q0, &mut q1);
            }

            let mut y_edge = f32::INFINITY;
            if q0.x == 0.0 && q1.x == 0.0 {
                // Degenerate seam segment; unreachable for real geometry
                // after the boundary nudge.
                q1.x = CLIP_BIAS;
                y_edge = q0.y;
                q0.x = CLIP_BIAS;
            } else if q0.x == 0.0 {
                y_edge = q0.y;
                q0.x = CLIP_BIAS;
            } else if q1.x == 0.0 {
                y_edge = q1.y;
                q1.x = CLIP_BIAS;
            }

            self.tile_mut(tx, ty).segments.push(Segment { p0: q0, p1: q1, y_edge });
        }
    }

    /// Accumulates each tile row left to right, so every tile's backdrop
    /// becomes the signed winding contributed by all geometry on its left.
    pub fn prefix_sum_backdrops(&mut self) {
        let bbox = self.bbox;
        for ty in bbox.y0..bbox.y1 {
            let mut acc = 0;
            for tx in bbox.x0..bbox.x1 {
                let tile = self.tile_mut(tx, ty);
                acc += tile.backdrop;
                tile.backdrop = acc;
            }
        }
    }
}

/// Converts an edge's current sub-segment to float pixel endpoints, top to
/// bottom, plus its original direction.
fn line_to_segment(line: &LineEdge, shift: i32) -> (Point, Point, bool) {
    // Edge coordinates live in the AA-scaled space.
    let inv_scale = 1.0 / (1 << shift) as f32;
    let p0 = Point::new(
        fdot16::to_f32(line.x) * inv_scale,
        line.first_y as f32 * inv_scale,
    );
    let p1 = Point::new(
        fdot16::to_f32(line.last_x) * inv_scale,
        (line.last_y + 1) as f32 * inv_scale,
    );
    (p0, p1, line.winding > 0)
}

/// Number of tiles spanned between two positions in tile units, at least 1.
fn span(a: f32, b: f32) -> u32 {
    (a.max(b).ceil() - a.min(b).floor()).max(1.0) as u32
}

fn clamp_local(p: Point) -> Point {
    Point::new(p.x.clamp(0.0, TILE_SCALE), p.y.clamp(0.0, TILE_SCALE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge_builder::{EdgeBuilder, Verb};
    use peniko::kurbo::Affine;

    fn tiler_with_rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Tiler {
        let mut builder = EdgeBuilder::new(2);
        builder.add_path(
            &[
                Verb::MoveTo,
                Verb::LineTo,
                Verb::LineTo,
                Verb::LineTo,
                Verb::Close,
            ],
            &[
                Point::new(x0, y0),
                Point::new(x1, y0),
                Point::new(x1, y1),
                Point::new(x0, y1),
            ],
            Affine::IDENTITY,
        );
        let mut tiler = Tiler::new(64, 64);
        tiler.bin(&builder);
        tiler
    }

    #[test]
    fn span_is_at_least_one() {
        assert_eq!(span(0.5, 0.5), 1);
        assert_eq!(span(0.1, 0.9), 1);
        assert_eq!(span(0.5, 2.5), 3);
    }

    #[test]
    fn rect_bins_segments_in_its_columns() {
        let tiler = tiler_with_rect(4.0, 4.0, 40.0, 40.0);
        let bbox = tiler.bbox();
        assert_eq!((bbox.x0, bbox.y0), (0, 0));
        assert_eq!((bbox.x1, bbox.y1), (3, 3));

        // The left edge passes through column 0, the right through column 2.
        assert!(!tiler.tile(0, 0).segments.is_empty());
        assert!(!tiler.tile(2, 0).segments.is_empty());
        // The middle column only sees the horizontal extents, which bin no
        // segments.
        assert!(tiler.tile(1, 1).segments.is_empty());
    }

    #[test]
    fn backdrop_prefix_sum_preserves_raw_deltas() {
        let mut tiler = tiler_with_rect(4.0, 4.0, 40.0, 40.0);
        let bbox = tiler.bbox();

        let mut raw = vec![];
        for ty in bbox.y0..bbox.y1 {
            for tx in bbox.x0..bbox.x1 {
                raw.push(tiler.tile(tx, ty).backdrop);
            }
        }

        tiler.prefix_sum_backdrops();

        let mut i = 0;
        for ty in bbox.y0..bbox.y1 {
            let mut prev = 0;
            for tx in bbox.x0..bbox.x1 {
                let summed = tiler.tile(tx, ty).backdrop;
                assert_eq!(summed - prev, raw[i]);
                prev = summed;
                i += 1;
            }
        }
    }

    #[test]
    fn interior_tiles_carry_winding_after_prefix_sum() {
        let mut tiler = tiler_with_rect(4.0, 4.0, 60.0, 60.0);
        tiler.prefix_sum_backdrops();

        // Tile (1, 1) is interior: covered purely by backdrop.
        let tile = tiler.tile(1, 1);
        assert!(tile.segments.is_empty());
        assert_eq!(tile.backdrop.abs(), 1);
    }

    #[test]
    fn segments_store_left_crossings() {
        let tiler = tiler_with_rect(4.0, 4.0, 40.0, 40.0);

        // A shallow diagonal would cross; the rect's verticals must not
        // produce spurious left-edge crossings in their own tiles.
        for seg in &tiler.tile(0, 0).segments {
            assert!(seg.p0.x > 0.0 && seg.p1.x > 0.0);
        }
    }

    #[test]
    fn steep_diagonal_walk_terminates() {
        let mut builder = EdgeBuilder::new(2);
        builder.add_path(
            &[Verb::MoveTo, Verb::LineTo, Verb::LineTo, Verb::Close],
            &[
                Point::new(22.0, 552.0),
                Point::new(224.0, 388.0),
                Point::new(22.0, 388.0),
            ],
            Affine::IDENTITY,
        );
        let mut tiler = Tiler::new(256, 600);
        tiler.bin(&builder);
        tiler.prefix_sum_backdrops();
    }

    #[test]
    fn reset_clears_touched_tiles() {
        let mut tiler = tiler_with_rect(4.0, 4.0, 40.0, 40.0);
        tiler.reset();
        for ty in 0..4 {
            for tx in 0..4 {
                assert!(tiler.tile(tx, ty).segments.is_empty());
                assert_eq!(tiler.tile(tx, ty).backdrop, 0);
            }
        }
    }
}
