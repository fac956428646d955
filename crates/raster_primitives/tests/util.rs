// Copyright 2025 the Raster Primitives Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(dead_code)]

use peniko::kurbo::{Affine, BezPath};
use raster_primitives::{Engine, FillRule, Rasterizer};

/// Renders a path into a full coverage mask.
pub fn render_mask(
    width: u16,
    height: u16,
    engine: Engine,
    fill_rule: FillRule,
    path: &BezPath,
    transform: Affine,
) -> Vec<u8> {
    let mut rasterizer = Rasterizer::new(width, height);
    rasterizer.set_engine(engine);
    rasterizer.set_fill_rule(fill_rule);

    let width = width as usize;
    let mut mask = vec![0u8; width * height as usize];
    rasterizer.rasterize_path_with(path, transform, |y, runs| {
        runs.write_row(&mut mask[y as usize * width..(y as usize + 1) * width]);
    });
    mask
}

pub fn rect_path(x0: f64, y0: f64, x1: f64, y1: f64) -> BezPath {
    let mut path = BezPath::new();
    path.move_to((x0, y0));
    path.line_to((x1, y0));
    path.line_to((x1, y1));
    path.line_to((x0, y1));
    path.close_path();
    path
}

/// A circle from four cubic segments.
pub fn circle_path(cx: f64, cy: f64, r: f64) -> BezPath {
    const KAPPA: f64 = 0.552_284_749_830_793_4;
    let k = r * KAPPA;

    let mut path = BezPath::new();
    path.move_to((cx + r, cy));
    path.curve_to((cx + r, cy + k), (cx + k, cy + r), (cx, cy + r));
    path.curve_to((cx - k, cy + r), (cx - r, cy + k), (cx - r, cy));
    path.curve_to((cx - r, cy - k), (cx - k, cy - r), (cx, cy - r));
    path.curve_to((cx + k, cy - r), (cx + r, cy - k), (cx + r, cy));
    path.close_path();
    path
}

pub fn mask_sum(mask: &[u8]) -> u64 {
    mask.iter().map(|&a| a as u64).sum()
}

pub fn max_diff(a: &[u8], b: &[u8]) -> u8 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| x.abs_diff(y))
        .max()
        .unwrap_or(0)
}
