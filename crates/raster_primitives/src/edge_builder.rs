// Copyright 2025 the Raster Primitives Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Turns a path into pools of monotonic edges.
//!
//! The builder ingests a verb stream with a flat point array (or a
//! [`BezPath`]) under an affine transform, chops curves at their Y extrema
//! and stores the resulting edges in three flat pools. Iteration order is a
//! stable sort of edge ids by top Y, produced once per fill; the pools are
//! never reordered.

use peniko::kurbo::{Affine, BezPath, PathEl};

use crate::edge::{CubicEdge, Edge, LineEdge, QuadraticEdge};
use crate::fixed::fdot6;
use crate::geometry::{chop_cubic_at_y_extrema, chop_quad_at_y_extrema, Point};

/// A path verb. Its points are consumed from the accompanying point array:
/// one for `MoveTo`/`LineTo`, two for `QuadTo`, three for `CubicTo`, none
/// for `Close`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    MoveTo,
    LineTo,
    QuadTo,
    CubicTo,
    Close,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EdgeKind {
    Line,
    Quadratic,
    Cubic,
}

/// A non-owning handle to an edge in one of the builder's pools.
#[derive(Clone, Copy, Debug)]
pub(crate) struct EdgeId {
    pub kind: EdgeKind,
    pub index: u32,
}

/// An axis-aligned float rectangle, grown incrementally.
#[derive(Clone, Copy, Debug)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds {
            min_x: f32::MAX,
            min_y: f32::MAX,
            max_x: f32::MIN,
            max_y: f32::MIN,
        }
    }
}

impl Bounds {
    fn extend(&mut self, p: Point) {
        // NaN fails every comparison and is ignored.
        if p.x < self.min_x {
            self.min_x = p.x;
        }
        if p.x > self.max_x {
            self.max_x = p.x;
        }
        if p.y < self.min_y {
            self.min_y = p.y;
        }
        if p.y > self.max_y {
            self.max_y = p.y;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }
}

enum Combine {
    No,
    Partial,
    Total,
}

pub struct EdgeBuilder {
    lines: Vec<LineEdge>,
    quads: Vec<QuadraticEdge>,
    cubics: Vec<CubicEdge>,
    /// Insertion order across all three pools; the basis for stable sorting.
    order: Vec<EdgeId>,
    /// Segments with no vertical extent, in original direction. They carry no
    /// winding for the scanline filler, but the tile rasterizer needs their
    /// boundary crossings to propagate winding across tile columns.
    flats: Vec<[Point; 2]>,
    shift: i32,
    bounds: Bounds,
    current: Point,
    subpath_start: Point,
    in_subpath: bool,
}

impl EdgeBuilder {
    pub fn new(aa_shift: i32) -> Self {
        EdgeBuilder {
            lines: vec![],
            quads: vec![],
            cubics: vec![],
            order: vec![],
            flats: vec![],
            shift: aa_shift.clamp(0, 6),
            bounds: Bounds::default(),
            current: Point::default(),
            subpath_start: Point::default(),
            in_subpath: false,
        }
    }

    /// Drops all edges and bounds, preserving capacity.
    pub fn reset(&mut self) {
        self.lines.clear();
        self.quads.clear();
        self.cubics.clear();
        self.order.clear();
        self.flats.clear();
        self.bounds = Bounds::default();
        self.current = Point::default();
        self.subpath_start = Point::default();
        self.in_subpath = false;
    }

    pub fn set_aa_shift(&mut self, aa_shift: i32) {
        debug_assert!(self.is_empty());
        self.shift = aa_shift.clamp(0, 6);
    }

    pub(crate) fn aa_shift(&self) -> i32 {
        self.shift
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        debug_assert_eq!(
            self.order.len(),
            self.lines.len() + self.quads.len() + self.cubics.len()
        );
        self.order.len()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Ingests a verb stream. A short point array truncates the stream; the
    /// final subpath is closed implicitly.
    pub fn add_path(&mut self, verbs: &[Verb], points: &[Point], transform: Affine) {
        let mut i = 0;
        let take = |i: &mut usize, n: usize| -> Option<usize> {
            let at = *i;
            if at + n > points.len() {
                return None;
            }
            *i = at + n;
            Some(at)
        };

        for &verb in verbs {
            match verb {
                Verb::MoveTo => {
                    let Some(at) = take(&mut i, 1) else { break };
                    self.move_to(map(transform, points[at]));
                }
                Verb::LineTo => {
                    let Some(at) = take(&mut i, 1) else { break };
                    self.line_to(map(transform, points[at]));
                }
                Verb::QuadTo => {
                    let Some(at) = take(&mut i, 2) else { break };
                    self.quad_to(map(transform, points[at]), map(transform, points[at + 1]));
                }
                Verb::CubicTo => {
                    let Some(at) = take(&mut i, 3) else { break };
                    self.cubic_to(
                        map(transform, points[at]),
                        map(transform, points[at + 1]),
                        map(transform, points[at + 2]),
                    );
                }
                Verb::Close => self.close(),
            }
        }

        self.finish();
    }

    /// Ingests a kurbo path under the given transform.
    pub fn add_bez_path(&mut self, path: &BezPath, transform: Affine) {
        for el in path.iter().map(|el| transform * el) {
            match el {
                PathEl::MoveTo(p) => self.move_to(to_point(p)),
                PathEl::LineTo(p) => self.line_to(to_point(p)),
                PathEl::QuadTo(p1, p2) => self.quad_to(to_point(p1), to_point(p2)),
                PathEl::CurveTo(p1, p2, p3) => {
                    self.cubic_to(to_point(p1), to_point(p2), to_point(p3))
                }
                PathEl::ClosePath => self.close(),
            }
        }

        self.finish();
    }

    fn move_to(&mut self, p: Point) {
        self.finish();
        self.bounds.extend(p);
        self.current = p;
        self.subpath_start = p;
        self.in_subpath = true;
    }

    fn line_to(&mut self, p: Point) {
        self.bounds.extend(p);
        self.push_line(self.current, p);
        self.current = p;
    }

    fn quad_to(&mut self, c: Point, p: Point) {
        self.bounds.extend(c);
        self.bounds.extend(p);

        let src = [self.current, c, p];
        if src.iter().all(Point::is_finite) {
            let mut chopped = [Point::default(); 5];
            let chops = chop_quad_at_y_extrema(&src, &mut chopped);
            for i in 0..=chops {
                let piece = [chopped[i * 2], chopped[i * 2 + 1], chopped[i * 2 + 2]];
                if let Some(quad) = QuadraticEdge::new(&piece, self.shift) {
                    self.order.push(EdgeId {
                        kind: EdgeKind::Quadratic,
                        index: self.quads.len() as u32,
                    });
                    self.quads.push(quad);
                } else {
                    // Zero vertical extent; keep the chord for the tiler.
                    self.push_flat(piece[0], piece[2]);
                }
            }
        }

        self.current = p;
    }

    fn cubic_to(&mut self, c1: Point, c2: Point, p: Point) {
        self.bounds.extend(c1);
        self.bounds.extend(c2);
        self.bounds.extend(p);

        let src = [self.current, c1, c2, p];
        if src.iter().all(Point::is_finite) {
            let mut chopped = [Point::default(); 10];
            let chops = chop_cubic_at_y_extrema(&src, &mut chopped);
            for i in 0..=chops {
                let piece = [
                    chopped[i * 3],
                    chopped[i * 3 + 1],
                    chopped[i * 3 + 2],
                    chopped[i * 3 + 3],
                ];
                if let Some(cubic) = CubicEdge::new(&piece, self.shift) {
                    self.order.push(EdgeId {
                        kind: EdgeKind::Cubic,
                        index: self.cubics.len() as u32,
                    });
                    self.cubics.push(cubic);
                } else {
                    self.push_flat(piece[0], piece[3]);
                }
            }
        }

        self.current = p;
    }

    fn close(&mut self) {
        if self.in_subpath && self.current != self.subpath_start {
            self.push_line(self.current, self.subpath_start);
        }
        self.current = self.subpath_start;
        self.in_subpath = false;
    }

    /// Closes a dangling subpath. Safe to call repeatedly.
    fn finish(&mut self) {
        if self.in_subpath {
            self.close();
        }
    }

    fn push_line(&mut self, p0: Point, p1: Point) {
        if !p0.is_finite() || !p1.is_finite() {
            return;
        }

        let Some(edge) = LineEdge::new(p0, p1, self.shift) else {
            self.push_flat(p0, p1);
            return;
        };

        // Adjacent vertical edges at the same X coalesce or cancel.
        if edge.is_vertical() {
            if let Some(&EdgeId {
                kind: EdgeKind::Line,
                index,
            }) = self.order.last()
            {
                let last = &mut self.lines[index as usize];
                if last.is_vertical() {
                    match combine_vertical(&edge, last) {
                        Combine::Total => {
                            self.lines.pop();
                            self.order.pop();
                            return;
                        }
                        Combine::Partial => return,
                        Combine::No => {}
                    }
                }
            }
        }

        self.order.push(EdgeId {
            kind: EdgeKind::Line,
            index: self.lines.len() as u32,
        });
        self.lines.push(edge);
    }

    fn push_flat(&mut self, p0: Point, p1: Point) {
        if !(p0.is_finite() && p1.is_finite()) || p0.x == p1.x {
            return;
        }

        // Snap to the quantization grid of the surviving edges, so the
        // crossings the tiler records from this segment line up with its
        // neighbors in the path.
        let scale = (1 << (self.shift + 6)) as f32;
        let snap_x = |v: f32| ((v * scale) as i32) as f32 / scale;
        let y = fdot6::round((p0.y * scale) as i32) as f32 / (1 << self.shift) as f32;

        self.flats
            .push([Point::new(snap_x(p0.x), y), Point::new(snap_x(p1.x), y)]);
    }

    /// Segments discarded for having no vertical extent, in original
    /// direction.
    pub(crate) fn flats(&self) -> &[[Point; 2]] {
        &self.flats
    }

    /// All edges as tagged views, stably sorted by top Y.
    pub fn all_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        let mut ids = Vec::new();
        self.sorted_ids(&mut ids);
        ids.into_iter().map(|id| self.edge(id))
    }

    pub(crate) fn sorted_ids(&self, out: &mut Vec<EdgeId>) {
        out.clear();
        out.extend_from_slice(&self.order);
        out.sort_by_key(|id| self.line_of(*id).first_y);
    }

    pub(crate) fn edge(&self, id: EdgeId) -> Edge {
        match id.kind {
            EdgeKind::Line => Edge::Line(self.lines[id.index as usize]),
            EdgeKind::Quadratic => Edge::Quadratic(self.quads[id.index as usize].clone()),
            EdgeKind::Cubic => Edge::Cubic(self.cubics[id.index as usize].clone()),
        }
    }

    /// The current sub-segment of an edge.
    pub(crate) fn line_of(&self, id: EdgeId) -> &LineEdge {
        match id.kind {
            EdgeKind::Line => &self.lines[id.index as usize],
            EdgeKind::Quadratic => &self.quads[id.index as usize].line,
            EdgeKind::Cubic => &self.cubics[id.index as usize].line,
        }
    }

    pub(crate) fn line_of_mut(&mut self, id: EdgeId) -> &mut LineEdge {
        match id.kind {
            EdgeKind::Line => &mut self.lines[id.index as usize],
            EdgeKind::Quadratic => &mut self.quads[id.index as usize].line,
            EdgeKind::Cubic => &mut self.cubics[id.index as usize].line,
        }
    }

    /// Steps a curve edge to its next sub-segment. Line edges never step.
    pub(crate) fn step_edge(&mut self, id: EdgeId) -> bool {
        match id.kind {
            EdgeKind::Line => false,
            EdgeKind::Quadratic => {
                let quad = &mut self.quads[id.index as usize];
                quad.count > 0 && quad.update()
            }
            EdgeKind::Cubic => {
                let cubic = &mut self.cubics[id.index as usize];
                cubic.count < 0 && cubic.update()
            }
        }
    }
}

fn map(transform: Affine, p: Point) -> Point {
    to_point(transform * peniko::kurbo::Point::new(p.x as f64, p.y as f64))
}

fn to_point(p: peniko::kurbo::Point) -> Point {
    Point::new(p.x as f32, p.y as f32)
}

fn combine_vertical(edge: &LineEdge, last: &mut LineEdge) -> Combine {
    debug_assert!(last.dx == 0 && edge.dx == 0);

    if edge.x != last.x {
        return Combine::No;
    }

    if edge.winding == last.winding {
        if edge.last_y + 1 == last.first_y {
            last.first_y = edge.first_y;
            return Combine::Partial;
        }
        if edge.first_y == last.last_y + 1 {
            last.last_y = edge.last_y;
            return Combine::Partial;
        }
        return Combine::No;
    }

    if edge.first_y == last.first_y {
        if edge.last_y == last.last_y {
            return Combine::Total;
        }
        if edge.last_y < last.last_y {
            last.first_y = edge.last_y + 1;
            return Combine::Partial;
        }
        last.first_y = last.last_y + 1;
        last.last_y = edge.last_y;
        last.winding = edge.winding;
        return Combine::Partial;
    }

    if edge.last_y == last.last_y {
        if edge.first_y > last.first_y {
            last.last_y = edge.first_y - 1;
            return Combine::Partial;
        }
        last.last_y = last.first_y - 1;
        last.first_y = edge.first_y;
        last.winding = edge.winding;
        return Combine::Partial;
    }

    Combine::No
}
