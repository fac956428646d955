use criterion::{black_box, Criterion};
use peniko::kurbo::Affine;
use raster_primitives::{Engine, Point, Rasterizer, Verb};

pub fn strips(c: &mut Criterion) {
    let mut g = c.benchmark_group("strips");

    let verbs = [
        Verb::MoveTo,
        Verb::LineTo,
        Verb::LineTo,
        Verb::LineTo,
        Verb::Close,
    ];
    let points = [
        Point::new(30.0, 2.5),
        Point::new(250.5, 60.0),
        Point::new(180.0, 240.0),
        Point::new(4.25, 120.0),
    ];

    g.bench_function("quad_strips_256", |b| {
        let mut rasterizer = Rasterizer::new(256, 256);
        b.iter(|| {
            let (strips, alphas) = rasterizer.rasterize_strips(&verbs, &points, Affine::IDENTITY);
            black_box((strips.len(), alphas.len()));
        })
    });

    g.bench_function("quad_rows_256", |b| {
        let mut rasterizer = Rasterizer::new(256, 256);
        rasterizer.set_engine(Engine::Tiles);
        b.iter(|| {
            let mut rows = 0u32;
            rasterizer.rasterize_with(&verbs, &points, Affine::IDENTITY, |_, _| rows += 1);
            black_box(rows);
        })
    });
}
