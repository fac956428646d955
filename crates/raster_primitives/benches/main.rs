mod strips;

use criterion::{criterion_group, criterion_main};

criterion_group!(t, tiling::tiling);
criterion_group!(sc, scanline::scanline);
criterion_group!(st, strips::strips);
criterion_main!(t, sc, st);
