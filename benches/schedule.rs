// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#[macro_use]
extern crate criterion;
extern crate mandeltiles;

use criterion::Criterion;
use mandeltiles::{Canvas, Config, Mandelbrot, Rect, TileManager, HOME};
use std::sync::Arc;

fn small_config() -> Config {
    Config {
        width: 128,
        height: 128,
        divisor: 8,
        iterations: 64,
        ..Config::default()
    }
}

fn settle(tiles: &mut TileManager, canvas: &mut Canvas) {
    while !tiles.is_complete() {
        tiles.update();
        tiles.draw(canvas).unwrap();
    }
}

fn zoom_home(c: &mut Criterion) {
    let config = small_config();
    let engine = Arc::new(Mandelbrot::new(config.iterations));
    let mut canvas = Canvas::new(config.width, config.height);
    let mut tiles = TileManager::new(config, engine).unwrap();
    c.bench_function("zoom home 8x8", move |b| {
        b.iter(|| {
            tiles.zoom_request(HOME).unwrap();
            settle(&mut tiles, &mut canvas);
        })
    });
}

fn pan_one_column(c: &mut Criterion) {
    let config = small_config();
    let engine = Arc::new(Mandelbrot::new(config.iterations));
    let mut canvas = Canvas::new(config.width, config.height);
    let mut tiles = TileManager::new(config, engine).unwrap();
    let left = Rect::new(-1.5, -1.0, 2.0, 2.0);
    let right = Rect::new(-1.25, -1.0, 2.0, 2.0);
    tiles.zoom_request(left).unwrap();
    settle(&mut tiles, &mut canvas);
    let mut flip = false;
    c.bench_function("pan one column", move |b| {
        b.iter(|| {
            flip = !flip;
            tiles.move_request(if flip { right } else { left }).unwrap();
            settle(&mut tiles, &mut canvas);
        })
    });
}

criterion_group!(benches, zoom_home, pan_one_column);
criterion_main!(benches);
