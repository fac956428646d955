// Copyright 2025 the Raster Primitives Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use peniko::color::palette::css::DARK_BLUE;
use peniko::kurbo::Affine;
use raster_primitives::{Point, Rasterizer, Verb};
use std::io::BufWriter;

const WIDTH: u16 = 64;
const HEIGHT: u16 = 64;

pub fn main() {
    let verbs = [
        Verb::MoveTo,
        Verb::LineTo,
        Verb::LineTo,
        Verb::QuadTo,
        Verb::Close,
    ];
    let points = [
        Point::new(2.5, 2.5),
        Point::new(45.0, 15.0),
        Point::new(7.5, 45.0),
        Point::new(30.0, 60.0),
        Point::new(55.0, 55.0),
    ];

    let mut rasterizer = Rasterizer::new(WIDTH, HEIGHT);
    let stride = WIDTH as usize * 4;
    let mut buf = vec![0u8; stride * HEIGHT as usize];
    rasterizer.rasterize_to_buffer(&verbs, &points, Affine::IDENTITY, &mut buf, stride, DARK_BLUE);

    let filename = std::env::args().nth(1).unwrap_or("simple.png".into());
    let file = std::fs::File::create(filename).unwrap();
    let w = BufWriter::new(file);
    let mut encoder = png::Encoder::new(w, WIDTH as u32, HEIGHT as u32);
    encoder.set_color(png::ColorType::Rgba);
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(&buf).unwrap();
}
