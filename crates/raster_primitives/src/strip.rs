// Copyright 2025 the Raster Primitives Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coverage evaluation for binned tiles.
//!
//! Each tile's coverage starts from its backdrop winding and accumulates the
//! analytic area of every segment, row by row. A segment that crosses the
//! tile's left edge additionally contributes a full winding step to every
//! row below the crossing, signed by its X direction; this is how winding
//! propagates through a tile that geometry merely passes across.
//!
//! The same evaluation feeds two outputs: per-row alpha runs, and packed
//! sparse strips.

use crate::alpha_runs::AlphaRuns;
use crate::tiling::{Tile, Tiler, TILE_SIZE};
use crate::FillRule;

const TILE: usize = TILE_SIZE as usize;

/// A run of non-trivial tile columns in one tile row.
///
/// `alpha_idx..next.alpha_idx` indexes the shared alpha stream, column-major:
/// 16 bytes per pixel column. `fill_gap` marks that the span between the
/// previous strip on the same row and this one is interior and must be
/// filled. A record with `x == u16::MAX` terminates the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Strip {
    pub x: u16,
    pub y: u16,
    pub alpha_idx: u32,
    pub fill_gap: bool,
}

impl Strip {
    pub fn is_sentinel(&self) -> bool {
        self.x == u16::MAX
    }
}

/// Evaluates one tile into a 16x16 alpha block, row-major.
fn rasterize_tile(tile: &Tile, fill_rule: FillRule, out: &mut [[u8; TILE]; TILE]) {
    let mut areas = [[tile.backdrop as f32; TILE]; TILE];

    for seg in &tile.segments {
        let delta = seg.p1 - seg.p0;
        let y_edge_sign = if seg.y_edge.is_finite() && delta.x != 0.0 {
            delta.x.signum()
        } else {
            0.0
        };

        for (local_y, row) in areas.iter_mut().enumerate() {
            let y = seg.p0.y - local_y as f32;
            let y0 = y.clamp(0.0, 1.0);
            let y1 = (y + delta.y).clamp(0.0, 1.0);
            let row_dy = y0 - y1;

            let y_edge = y_edge_sign * (local_y as f32 - seg.y_edge + 1.0).clamp(0.0, 1.0);

            if row_dy != 0.0 {
                let inv_slope = delta.x / delta.y;
                let sx0 = seg.p0.x + (y0 - y) * inv_slope;
                let sx1 = seg.p0.x + (y1 - y) * inv_slope;
                let xmin0 = sx0.min(sx1);
                let xmax0 = sx0.max(sx1);

                for (i, area) in row.iter_mut().enumerate() {
                    let xmin = (xmin0 - i as f32).min(1.0) - 1e-6;
                    let xmax = xmax0 - i as f32;
                    let b = xmax.min(1.0);
                    let c = b.max(0.0);
                    let d = xmin.max(0.0);
                    let a = (b + 0.5 * (d * d - c * c) - xmin) / (xmax - xmin);
                    *area += y_edge + a * row_dy;
                }
            } else if y_edge != 0.0 {
                for area in row.iter_mut() {
                    *area += y_edge;
                }
            }
        }
    }

    for (area_row, out_row) in areas.iter().zip(out.iter_mut()) {
        for (area, alpha) in area_row.iter().zip(out_row.iter_mut()) {
            *alpha = (fill_rule.coverage(*area) * 255.0 + 0.5) as u8;
        }
    }
}

/// Renders the tile grid row by row, invoking `emit` for every pixel row
/// with non-zero coverage.
pub(crate) fn render_rows<F: FnMut(u32, &AlphaRuns)>(
    tiler: &Tiler,
    fill_rule: FillRule,
    width: u16,
    height: u16,
    row_block: &mut Vec<u8>,
    runs: &mut AlphaRuns,
    mut emit: F,
) {
    let bbox = tiler.bbox();
    if bbox.is_empty() {
        return;
    }

    let width = width as usize;
    row_block.clear();
    row_block.resize(TILE * width, 0);

    let mut block = [[0u8; TILE]; TILE];

    for ty in bbox.y0..bbox.y1 {
        row_block.fill(0);

        for tx in bbox.x0..bbox.x1 {
            let tile = tiler.tile(tx, ty);
            let base_x = tx as usize * TILE;
            if base_x >= width {
                break;
            }
            let cols = TILE.min(width - base_x);

            if tile.segments.is_empty() {
                let alpha = (fill_rule.coverage(tile.backdrop as f32) * 255.0 + 0.5) as u8;
                if alpha != 0 {
                    for ly in 0..TILE {
                        row_block[ly * width + base_x..ly * width + base_x + cols].fill(alpha);
                    }
                }
            } else {
                rasterize_tile(tile, fill_rule, &mut block);
                for (ly, block_row) in block.iter().enumerate() {
                    row_block[ly * width + base_x..ly * width + base_x + cols]
                        .copy_from_slice(&block_row[..cols]);
                }
            }
        }

        for ly in 0..TILE {
            let py = ty * TILE as i32 + ly as i32;
            if py < 0 || py >= height as i32 {
                continue;
            }
            runs.reset();
            for (px, &alpha) in row_block[ly * width..(ly + 1) * width].iter().enumerate() {
                runs.push(px as u32, alpha);
            }
            if !runs.is_empty() {
                emit(py as u32, runs);
            }
        }
    }
}

/// Packs the tile grid into sparse strips plus a shared alpha stream.
pub(crate) fn render_strips(
    tiler: &Tiler,
    fill_rule: FillRule,
    strip_buf: &mut Vec<Strip>,
    alpha_buf: &mut Vec<u8>,
) {
    strip_buf.clear();
    alpha_buf.clear();

    let bbox = tiler.bbox();
    let mut block = [[0u8; TILE]; TILE];
    let mut last_y = 0u16;

    for ty in bbox.y0..bbox.y1 {
        let y = (ty * TILE as i32) as u16;
        let mut tx = bbox.x0;
        let mut row_has_strip = false;

        while tx < bbox.x1 {
            if tiler.tile(tx, ty).segments.is_empty() {
                tx += 1;
                continue;
            }

            let start = tx;
            while tx < bbox.x1 && !tiler.tile(tx, ty).segments.is_empty() {
                tx += 1;
            }

            // The gap to the previous strip is uniform; its winding is the
            // backdrop carried into this strip's first tile.
            let fill_gap =
                row_has_strip && fill_rule.active(tiler.tile(start, ty).backdrop);

            strip_buf.push(Strip {
                x: (start * TILE as i32) as u16,
                y,
                alpha_idx: alpha_buf.len() as u32,
                fill_gap,
            });
            row_has_strip = true;

            for t in start..tx {
                rasterize_tile(tiler.tile(t, ty), fill_rule, &mut block);
                for col in 0..TILE {
                    for row in block.iter() {
                        alpha_buf.push(row[col]);
                    }
                }
            }
        }

        last_y = y;
    }

    strip_buf.push(Strip {
        x: u16::MAX,
        y: last_y,
        alpha_idx: alpha_buf.len() as u32,
        fill_gap: false,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge_builder::{EdgeBuilder, Verb};
    use crate::geometry::Point;
    use peniko::kurbo::Affine;

    fn binned_rect() -> Tiler {
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
                Point::new(8.0, 8.0),
                Point::new(40.0, 8.0),
                Point::new(40.0, 56.0),
                Point::new(8.0, 56.0),
            ],
            Affine::IDENTITY,
        );
        let mut tiler = Tiler::new(64, 64);
        tiler.bin(&builder);
        tiler.prefix_sum_backdrops();
        tiler
    }

    #[test]
    fn rect_rows_are_solid_inside() {
        let tiler = binned_rect();
        let mut row_block = vec![];
        let mut runs = AlphaRuns::new();
        let mut rows = vec![];

        render_rows(
            &tiler,
            FillRule::NonZero,
            64,
            64,
            &mut row_block,
            &mut runs,
            |y, runs| {
                let mut row = vec![0u8; 64];
                runs.write_row(&mut row);
                rows.push((y, row));
            },
        );

        // The interior tile rows exercise the backdrop-only path; rows 16..48
        // of the middle column carry no segments at all.
        assert_eq!(rows.len(), 48);
        assert_eq!(rows[0].0, 8);
        assert_eq!(rows[47].0, 55);
        for (_, row) in &rows {
            for (x, &alpha) in row.iter().enumerate() {
                let expected = if (8..40).contains(&x) { 255 } else { 0 };
                assert_eq!(alpha, expected, "x={}", x);
            }
        }
    }

    #[test]
    fn strips_terminate_with_sentinel() {
        let tiler = binned_rect();
        let mut strips = vec![];
        let mut alphas = vec![];
        render_strips(&tiler, FillRule::NonZero, &mut strips, &mut alphas);

        assert!(strips.last().unwrap().is_sentinel());
        assert!(strips.len() >= 2);
        // Strip alpha spans are 16 bytes per column.
        for pair in strips.windows(2) {
            let len = (pair[1].alpha_idx - pair[0].alpha_idx) as usize;
            assert_eq!(len % TILE, 0);
        }
        assert_eq!(strips.last().unwrap().alpha_idx as usize, alphas.len());
    }

    #[test]
    fn strips_reconstruct_rows() {
        let tiler = binned_rect();

        let mut expected = vec![0u8; 64 * 64];
        let mut row_block = vec![];
        let mut runs = AlphaRuns::new();
        render_rows(
            &tiler,
            FillRule::NonZero,
            64,
            64,
            &mut row_block,
            &mut runs,
            |y, runs| {
                runs.write_row(&mut expected[y as usize * 64..(y as usize + 1) * 64]);
            },
        );

        let mut strips = vec![];
        let mut alphas = vec![];
        render_strips(&tiler, FillRule::NonZero, &mut strips, &mut alphas);

        let mut actual = vec![0u8; 64 * 64];
        for i in 0..strips.len() - 1 {
            let strip = strips[i];
            let cols = ((strips[i + 1].alpha_idx - strip.alpha_idx) as usize) / TILE;

            if strip.fill_gap && i > 0 {
                let prev = strips[i - 1];
                let prev_cols = ((strip.alpha_idx - prev.alpha_idx) as usize) / TILE;
                let gap = prev.x as usize + prev_cols..strip.x as usize;
                for row in 0..TILE {
                    let y = strip.y as usize + row;
                    for x in gap.clone() {
                        actual[y * 64 + x] = 255;
                    }
                }
            }

            for col in 0..cols {
                let x = strip.x as usize + col;
                if x >= 64 {
                    continue;
                }
                for row in 0..TILE {
                    let y = strip.y as usize + row;
                    if y >= 64 {
                        continue;
                    }
                    actual[y * 64 + x] = alphas[strip.alpha_idx as usize + col * TILE + row];
                }
            }
        }

        assert_eq!(actual, expected);
    }
}
