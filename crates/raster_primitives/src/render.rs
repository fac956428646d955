// Copyright 2025 the Raster Primitives Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The public rasterization facade.
//!
//! A [`Rasterizer`] is bound to a viewport and owns every intermediate
//! buffer, so repeated fills allocate nothing after warmup. Each call
//! rebuilds edges from the incoming path and runs the selected engine.

use peniko::color::{AlphaColor, Srgb};
use peniko::kurbo::{Affine, BezPath};

use crate::alpha_runs::AlphaRuns;
use crate::edge_builder::EdgeBuilder;
use crate::geometry::Point;
use crate::scanline::ScanlineFiller;
use crate::strip::{self, Strip};
use crate::tiling::Tiler;
use crate::{FillRule, Verb};

/// Which coverage engine a fill runs on. Both produce the same alpha values
/// up to one least significant bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Engine {
    /// Walks active edges row by row, integrating trapezoids per pixel.
    Scanline,
    /// Bins segments into 16x16 tiles and evaluates coverage per tile.
    Tiles,
}

pub struct Rasterizer {
    width: u16,
    height: u16,
    fill_rule: FillRule,
    engine: Engine,
    aa_shift: i32,
    builder: EdgeBuilder,
    filler: ScanlineFiller,
    tiler: Tiler,
    row_block: Vec<u8>,
    runs: AlphaRuns,
    strip_buf: Vec<Strip>,
    alpha_buf: Vec<u8>,
}

impl Rasterizer {
    pub fn new(width: u16, height: u16) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let aa_shift = 2;
        Rasterizer {
            width,
            height,
            fill_rule: FillRule::NonZero,
            engine: Engine::Scanline,
            aa_shift,
            builder: EdgeBuilder::new(aa_shift),
            filler: ScanlineFiller::new(),
            tiler: Tiler::new(width, height),
            row_block: vec![],
            runs: AlphaRuns::new(),
            strip_buf: vec![],
            alpha_buf: vec![],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn fill_rule(&self) -> FillRule {
        self.fill_rule
    }

    pub fn set_fill_rule(&mut self, fill_rule: FillRule) {
        self.fill_rule = fill_rule;
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn set_engine(&mut self, engine: Engine) {
        self.engine = engine;
    }

    /// Sub-pixel Y precision of the edge builder; 0 disables vertical AA.
    pub fn set_aa_shift(&mut self, aa_shift: u8) {
        self.aa_shift = (aa_shift as i32).min(6);
    }

    /// Returns all intermediate buffers to empty, preserving capacity.
    pub fn reset(&mut self) {
        self.builder.reset();
        self.tiler.reset();
        self.strip_buf.clear();
        self.alpha_buf.clear();
    }

    /// Rasterizes a verb stream, invoking `emit` for every pixel row with
    /// non-zero coverage.
    pub fn rasterize_with<F: FnMut(u32, &AlphaRuns)>(
        &mut self,
        verbs: &[Verb],
        points: &[Point],
        transform: Affine,
        emit: F,
    ) {
        self.build(|builder, shift| {
            builder.set_aa_shift(shift);
            builder.add_path(verbs, points, transform);
        });
        self.run(emit);
    }

    /// Rasterizes a kurbo path, invoking `emit` for every pixel row with
    /// non-zero coverage.
    pub fn rasterize_path_with<F: FnMut(u32, &AlphaRuns)>(
        &mut self,
        path: &BezPath,
        transform: Affine,
        emit: F,
    ) {
        self.build(|builder, shift| {
            builder.set_aa_shift(shift);
            builder.add_bez_path(path, transform);
        });
        self.run(emit);
    }

    /// Rasterizes a verb stream and composites `color` over the destination
    /// buffer with premultiplied source-over blending.
    ///
    /// `buf` holds RGBA8 pixels with `stride` bytes per row;
    /// `buf.len() >= stride * height` and `stride >= width * 4`.
    pub fn rasterize_to_buffer(
        &mut self,
        verbs: &[Verb],
        points: &[Point],
        transform: Affine,
        buf: &mut [u8],
        stride: usize,
        color: AlphaColor<Srgb>,
    ) {
        debug_assert!(stride >= self.width as usize * 4);
        debug_assert!(buf.len() >= stride * self.height as usize);

        let src = premultiply(color);
        self.rasterize_with(verbs, points, transform, |y, runs| {
            let row = &mut buf[y as usize * stride..];
            for run in runs.iter() {
                let mask = run.alpha as u16;
                for px in run.x..run.x + run.len {
                    let dst = &mut row[px as usize * 4..px as usize * 4 + 4];
                    let inv = 255 - div_255(src[3] as u16 * mask);
                    for (d, &s) in dst.iter_mut().zip(&src) {
                        *d = (div_255(s as u16 * mask) + div_255(*d as u16 * inv)) as u8;
                    }
                }
            }
        });
    }

    /// Rasterizes a verb stream into sparse strips. The returned slices stay
    /// valid until the next fill or reset.
    pub fn rasterize_strips(
        &mut self,
        verbs: &[Verb],
        points: &[Point],
        transform: Affine,
    ) -> (&[Strip], &[u8]) {
        self.build(|builder, shift| {
            builder.set_aa_shift(shift);
            builder.add_path(verbs, points, transform);
        });

        self.strip_buf.clear();
        self.alpha_buf.clear();
        if !self.builder.is_empty() {
            self.tiler.reset();
            self.tiler.bin(&self.builder);
            self.tiler.prefix_sum_backdrops();
            strip::render_strips(
                &self.tiler,
                self.fill_rule,
                &mut self.strip_buf,
                &mut self.alpha_buf,
            );
        }

        (&self.strip_buf, &self.alpha_buf)
    }

    fn build(&mut self, add: impl FnOnce(&mut EdgeBuilder, i32)) {
        self.builder.reset();
        add(&mut self.builder, self.aa_shift);
    }

    fn run<F: FnMut(u32, &AlphaRuns)>(&mut self, emit: F) {
        if self.builder.is_empty() {
            return;
        }

        match self.engine {
            Engine::Scanline => {
                self.filler.fill(
                    &mut self.builder,
                    self.fill_rule,
                    self.width,
                    self.height,
                    emit,
                );
            }
            Engine::Tiles => {
                self.tiler.reset();
                self.tiler.bin(&self.builder);
                self.tiler.prefix_sum_backdrops();
                strip::render_rows(
                    &self.tiler,
                    self.fill_rule,
                    self.width,
                    self.height,
                    &mut self.row_block,
                    &mut self.runs,
                    emit,
                );
            }
        }
    }
}

fn premultiply(color: AlphaColor<Srgb>) -> [u8; 4] {
    let p = color.premultiply();
    [
        (p.components[0] * 255.0 + 0.5) as u8,
        (p.components[1] * 255.0 + 0.5) as u8,
        (p.components[2] * 255.0 + 0.5) as u8,
        (p.components[3] * 255.0 + 0.5) as u8,
    ]
}

fn div_255(v: u16) -> u16 {
    (v + 1 + (v >> 8)) >> 8
}
