// Copyright 2025 the Raster Primitives Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Analytic scanline filling.
//!
//! For every pixel row the filler integrates exact trapezoidal coverage from
//! the active edges into a float `area` buffer. Each edge crossing also
//! deposits its signed row delta into a `delta` buffer one pixel past its X
//! span; a running sum over `delta` at resolve time supplies the constant
//! winding an edge contributes to everything on its right.

use crate::active_list::ActiveList;
use crate::alpha_runs::AlphaRuns;
use crate::edge_builder::{EdgeBuilder, EdgeId};
use crate::fixed::fdot16;
use crate::FillRule;

pub struct ScanlineFiller {
    area: Vec<f32>,
    delta: Vec<f32>,
    runs: AlphaRuns,
    active: ActiveList,
    ids: Vec<EdgeId>,
}

impl ScanlineFiller {
    pub fn new() -> Self {
        ScanlineFiller {
            area: vec![],
            delta: vec![],
            runs: AlphaRuns::new(),
            active: ActiveList::default(),
            ids: vec![],
        }
    }

    /// Fills the builder's edges, invoking `emit` for every pixel row with
    /// non-zero coverage. Consumes the builder's curve stepper state.
    pub fn fill<F: FnMut(u32, &AlphaRuns)>(
        &mut self,
        builder: &mut EdgeBuilder,
        fill_rule: FillRule,
        width: u16,
        height: u16,
        mut emit: F,
    ) {
        builder.sorted_ids(&mut self.ids);
        if self.ids.is_empty() {
            return;
        }

        let shift = builder.aa_shift();
        let scale = 1 << shift;
        let width = width as usize;

        self.area.clear();
        self.area.resize(width, 0.0);
        self.delta.clear();
        self.delta.resize(width, 0.0);
        self.active.clear();

        let start_row = (builder.line_of(self.ids[0]).first_y >> shift).max(0);
        let mut next = 0;

        for y in start_row..height as i32 {
            let y_sub = y << shift;
            let y_end = y_sub + scale;

            self.active.remove_expired(builder, y_sub);
            while next < self.ids.len() && builder.line_of(self.ids[next]).first_y < y_end {
                self.active.insert(builder, self.ids[next], y_sub);
                next += 1;
            }

            if self.active.is_empty() {
                if next >= self.ids.len() {
                    break;
                }
                continue;
            }

            self.active.sort_by_x(builder);

            for i in 0..self.active.len() {
                let id = self.active.get(i);
                accumulate_edge(
                    builder,
                    id,
                    y_sub,
                    y_end,
                    shift,
                    width,
                    &mut self.area,
                    &mut self.delta,
                );
            }

            self.runs.reset();
            let mut acc = 0.0f32;
            for px in 0..width {
                acc += self.delta[px];
                let coverage = fill_rule.coverage(self.area[px] + acc);
                self.runs.push(px as u32, (coverage * 255.0 + 0.5) as u8);
                self.area[px] = 0.0;
                self.delta[px] = 0.0;
            }

            if !self.runs.is_empty() {
                emit(y as u32, &self.runs);
            }

            self.active.advance_x(builder, y_sub, y_end);
        }
    }
}

impl Default for ScanlineFiller {
    fn default() -> Self {
        Self::new()
    }
}

/// Walks the edge's current sub-segment, and any further ones ending inside
/// this row, accumulating per-pixel coverage.
#[allow(clippy::too_many_arguments)]
fn accumulate_edge(
    builder: &mut EdgeBuilder,
    id: EdgeId,
    y_sub: i32,
    y_end: i32,
    shift: i32,
    width: usize,
    area: &mut [f32],
    delta: &mut [f32],
) {
    let inv_scale = 1.0 / (1 << shift) as f32;

    loop {
        let line = *builder.line_of(id);

        let top = line.first_y.max(y_sub);
        let bot = (line.last_y + 1).min(y_end);
        if bot > top {
            // `line.x` corresponds to `top` (see ActiveList) and lives in
            // the AA-scaled space, as does `dx` per sub-pixel row.
            let x0 = fdot16::to_f32(line.x) * inv_scale;
            let x1 = x0 + fdot16::to_f32(line.dx) * (bot - top) as f32 * inv_scale;
            let dy = (bot - top) as f32 * inv_scale;
            add_trapezoid(area, delta, width, line.winding as f32, x0, x1, dy);
        }

        if line.last_y >= y_end - 1 {
            break;
        }
        if !builder.step_edge(id) {
            break;
        }
    }
}

/// Accumulates the coverage of one sub-segment clipped to the current pixel
/// row. `x0`/`x1` are its endpoints in pixels and `dy` the (signed by
/// `sign`) fraction of the row it spans.
fn add_trapezoid(
    area: &mut [f32],
    delta: &mut [f32],
    width: usize,
    sign: f32,
    x0: f32,
    x1: f32,
    dy: f32,
) {
    if dy <= 0.0 {
        return;
    }

    let xmin0 = x0.min(x1);
    let xmax0 = x0.max(x1);

    if xmin0 >= width as f32 {
        return;
    }
    if xmax0 < 0.0 {
        // Entirely left of the viewport; only its crossing counts.
        delta[0] += sign * dy;
        return;
    }

    if xmax0 - xmin0 < 1e-6 {
        // Nearly vertical; use the pixel-relative X offset directly.
        let x = xmax0.max(0.0);
        let px = (x as usize).min(width - 1);
        area[px] += sign * dy * ((px + 1) as f32 - x).clamp(0.0, 1.0);
        if px + 1 < width {
            delta[px + 1] += sign * dy;
        }
        return;
    }

    let px0 = xmin0.floor().max(0.0) as usize;
    let px1 = (xmax0.floor() as usize).min(width - 1);

    for (px, slot) in area.iter_mut().enumerate().take(px1 + 1).skip(px0) {
        let xmin = (xmin0 - px as f32).min(1.0) - 1e-6;
        let xmax = xmax0 - px as f32;
        let b = xmax.min(1.0);
        let c = b.max(0.0);
        let d = xmin.max(0.0);
        let a = (b + 0.5 * (d * d - c * c) - xmin) / (xmax - xmin);
        *slot += sign * dy * a;
    }

    if px1 + 1 < width {
        delta[px1 + 1] += sign * dy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(area: &[f32], delta: &[f32]) -> Vec<f32> {
        let mut acc = 0.0;
        area.iter()
            .zip(delta)
            .map(|(a, d)| {
                acc += d;
                a + acc
            })
            .collect()
    }

    #[test]
    fn vertical_segment_covers_right_side() {
        let mut area = vec![0.0; 8];
        let mut delta = vec![0.0; 8];
        add_trapezoid(&mut area, &mut delta, 8, 1.0, 2.5, 2.5, 1.0);
        let w = resolve(&area, &delta);
        assert!((w[2] - 0.5).abs() < 1e-5);
        for &v in &w[3..] {
            assert!((v - 1.0).abs() < 1e-5);
        }
        assert_eq!(w[0], 0.0);
        assert_eq!(w[1], 0.0);
    }

    #[test]
    fn diagonal_segment_covers_half_pixel() {
        let mut area = vec![0.0; 4];
        let mut delta = vec![0.0; 4];
        // Crosses pixel 1 corner to corner.
        add_trapezoid(&mut area, &mut delta, 4, 1.0, 1.0, 2.0, 1.0);
        let w = resolve(&area, &delta);
        assert!((w[1] - 0.5).abs() < 1e-5);
        assert!((w[2] - 1.0).abs() < 1e-5);
        assert!((w[3] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn segment_left_of_viewport_contributes_backdrop() {
        let mut area = vec![0.0; 4];
        let mut delta = vec![0.0; 4];
        add_trapezoid(&mut area, &mut delta, 4, -1.0, -10.0, -9.0, 0.5);
        let w = resolve(&area, &delta);
        for &v in &w {
            assert!((v + 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn wide_span_integrates_to_full_row() {
        // A shallow segment crossing pixels 0..4 plus its backdrop must sum
        // to one full row of signed coverage per column once combined with a
        // closing vertical edge far right; here just check the partial sums
        // are monotone from 0 toward 1.
        let mut area = vec![0.0; 6];
        let mut delta = vec![0.0; 6];
        add_trapezoid(&mut area, &mut delta, 6, 1.0, 0.0, 4.0, 1.0);
        let w = resolve(&area, &delta);
        for pair in w.windows(2) {
            assert!(pair[0] <= pair[1] + 1e-6);
        }
        assert!((w[5] - 1.0).abs() < 1e-5);
    }
}
