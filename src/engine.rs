// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The pixel side of the renderer.  The scheduler only ever sees the
//! PixelEngine trait: a pure, total function from a point on the
//! complex plane to a colour.  Mandelbrot is the engine the binary
//! ships with.

use image::Rgba;
use num::Complex;

use crate::planes::{Pixel, PlaneMapper};

/// Colours one point of the complex plane.  Implementations must be
/// deterministic and free of side effects; workers call them from
/// several threads at once.
pub trait PixelEngine: Send + Sync {
    /// The colour of a single point.
    fn color_at(&self, point: Complex<f64>) -> Rgba<u8>;

    /// Writes scanline `row` of `plane` into `out`, four bytes (RGBA)
    /// per pixel.  `out` is exactly one row long.
    fn render_row(&self, plane: &PlaneMapper, row: usize, out: &mut [u8]) {
        fill_row(self, plane, row, out)
    }
}

/// The plain per-pixel scanline loop behind `PixelEngine::render_row`.
/// Engines that override `render_row` can still fall back on it.
pub fn fill_row<E: PixelEngine + ?Sized>(engine: &E, plane: &PlaneMapper, row: usize, out: &mut [u8]) {
    for (column, rgba) in out.chunks_exact_mut(4).enumerate() {
        let color = engine.color_at(plane.pixel_to_point(&Pixel(column, row)));
        rgba.copy_from_slice(&color.0);
    }
}

/// This is our classic iterator function, which either returns the
/// number of iterations it took to escape the Mandelbrot set, or
/// it returns nothing at all.
pub fn escape_time(point: Complex<f64>, limit: usize) -> Option<usize> {
    let mut z: Complex<f64> = Complex { re: 0.0, im: 0.0 };
    for i in 0..limit {
        z = z * z + point;
        if z.norm_sqr() > 4.0 {
            return Some(i);
        }
    }
    None
}

const DARK_YELLOW: Rgba<u8> = Rgba([0xEE, 0xEE, 0x9E, 0xFF]);
const DARK_GREEN: Rgba<u8> = Rgba([0x44, 0x88, 0x44, 0xFF]);
const PALE_GREY_BLUE: Rgba<u8> = Rgba([0x49, 0x93, 0xDD, 0xFF]);
const CYAN: Rgba<u8> = Rgba([0x00, 0xFF, 0xFF, 0xFF]);
const RED: Rgba<u8> = Rgba([0xFF, 0x00, 0x00, 0xFF]);
const WHITE: Rgba<u8> = Rgba([0xFF, 0xFF, 0xFF, 0xFF]);
const BLACK: Rgba<u8> = Rgba([0x00, 0x00, 0x00, 0xFF]);

// Gradient segments and the share of the iteration range each covers.
const SCALE: [(Rgba<u8>, Rgba<u8>, f64); 5] = [
    (DARK_YELLOW, DARK_GREEN, 0.25),
    (DARK_GREEN, CYAN, 0.25),
    (CYAN, RED, 0.25),
    (RED, WHITE, 0.125),
    (WHITE, PALE_GREY_BLUE, 0.125),
];

// Weighted towards `end` at `f == 0`, so each segment opens on the
// colour it is named to finish with.
fn blend(start: Rgba<u8>, end: Rgba<u8>, f: f64) -> Rgba<u8> {
    let mut out = [0u8; 4];
    for (i, channel) in out.iter_mut().enumerate() {
        let v = f64::from(start.0[i]) * f + f64::from(end.0[i]) * (1.0 - f);
        *channel = num::clamp(v, 0.0, 255.0) as u8;
    }
    Rgba(out)
}

/// Builds one colour per escape count, plus black at index
/// `iterations` for points that never escape.
pub fn build_palette(iterations: usize) -> Vec<Rgba<u8>> {
    let mut palette = Vec::with_capacity(iterations + 1);
    for &(start, end, share) in SCALE.iter() {
        let n = (share * iterations as f64 + 0.5) as usize;
        for i in 0..n {
            if palette.len() == iterations {
                break;
            }
            palette.push(blend(start, end, i as f64 / n as f64));
        }
    }
    // Rounding can leave the gradient a few entries short.
    while palette.len() < iterations {
        palette.push(PALE_GREY_BLUE);
    }
    palette.push(BLACK);
    palette
}

/// The escape-time Mandelbrot set, coloured by a fixed gradient.
#[derive(Debug, Clone)]
pub struct Mandelbrot {
    iterations: usize,
    palette: Vec<Rgba<u8>>,
}

impl Mandelbrot {
    /// An engine iterating each point at most `iterations` times.
    pub fn new(iterations: usize) -> Self {
        Mandelbrot {
            iterations,
            palette: build_palette(iterations),
        }
    }

    /// The iteration limit.
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

impl PixelEngine for Mandelbrot {
    fn color_at(&self, point: Complex<f64>) -> Rgba<u8> {
        match escape_time(point, self.iterations) {
            Some(i) => self.palette[i],
            None => self.palette[self.iterations],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planes::Rect;

    #[test]
    fn palette_has_one_entry_per_iteration_plus_black() {
        for &n in &[1, 7, 16, 100, 1024] {
            let palette = build_palette(n);
            assert_eq!(palette.len(), n + 1);
            assert_eq!(palette[n], BLACK);
        }
        let palette = build_palette(1024);
        assert_eq!(palette[0], DARK_GREEN);
        assert_eq!(palette[256], CYAN);
        assert_eq!(palette[768], WHITE);
    }

    #[test]
    fn segments_run_from_their_end_colour_back_to_their_start() {
        assert_eq!(blend(DARK_YELLOW, DARK_GREEN, 0.0), DARK_GREEN);
        assert_eq!(blend(DARK_YELLOW, DARK_GREEN, 1.0), DARK_YELLOW);
        assert_eq!(blend(BLACK, WHITE, 0.5), Rgba([0x7F, 0x7F, 0x7F, 0xFF]));
    }

    #[test]
    fn interior_points_are_black() {
        let engine = Mandelbrot::new(256);
        assert_eq!(engine.iterations(), 256);
        assert_eq!(engine.color_at(Complex::new(0.0, 0.0)), BLACK);
        assert_eq!(engine.color_at(Complex::new(-1.0, 0.0)), BLACK);
        assert_ne!(engine.color_at(Complex::new(1.0, 1.0)), BLACK);
    }

    #[test]
    fn escape_time_leaves_early_outside() {
        assert_eq!(escape_time(Complex::new(2.0, 2.0), 100), Some(0));
        assert_eq!(escape_time(Complex::new(-0.5, 0.0), 100), None);
    }

    #[test]
    fn render_row_matches_color_at() {
        let engine = Mandelbrot::new(64);
        let plane = PlaneMapper::new(8, 8, Rect::new(-2.0, -1.0, 3.0, 2.0)).unwrap();
        let mut row = vec![0u8; 8 * 4];
        engine.render_row(&plane, 3, &mut row);
        for column in 0..8 {
            let expected = engine.color_at(plane.pixel_to_point(&Pixel(column, 3)));
            assert_eq!(&row[column * 4..column * 4 + 4], &expected.0[..]);
        }
    }
}
