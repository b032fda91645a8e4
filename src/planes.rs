// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the Rect and PlaneMapper structs.  A Rect is a region of
//! the complex plane, described by its top-left corner and its
//! extent.  The PlaneMapper describes a relationship between a
//! rectangle on the integral plane with an origin at 0,0 (a pixel
//! buffer) and a Rect on the complex plane.
use num::Complex;

use crate::error::{Error, Result};

/// Describes the x, y of a point in a pixel buffer.  Column first,
/// row second.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// A rectangle in fractal coordinates.  The viewport and every tile
/// share this coordinate system, so overlap tests between them are
/// direct.  `x` grows with the real part, `y` with the imaginary part,
/// and row 0 of any buffer sits at `y`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rect {
    /// Real part of the origin corner.
    pub x: f64,
    /// Imaginary part of the origin corner.
    pub y: f64,
    /// Extent along the real axis.
    pub w: f64,
    /// Extent along the imaginary axis.
    pub h: f64,
}

impl Rect {
    /// Constructor.
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect { x, y, w, h }
    }

    /// Builds the rectangle spanned by two corners, in the manner of
    /// the command line's left-lower and right-upper arguments.
    pub fn from_corners(leftlower: Complex<f64>, rightupper: Complex<f64>) -> Result<Rect> {
        if rightupper.re <= leftlower.re {
            return Err(Error::Region(
                "The left lower corner is not to the left of the right upper corner.".to_string(),
            ));
        }
        if rightupper.im <= leftlower.im {
            return Err(Error::Region(
                "The left lower corner is not lower than the right upper corner".to_string(),
            ));
        }
        Ok(Rect::new(
            leftlower.re,
            leftlower.im,
            rightupper.re - leftlower.re,
            rightupper.im - leftlower.im,
        ))
    }

    /// The far edge along the real axis.
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    /// The far edge along the imaginary axis.
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// The point in the middle of the rectangle.
    pub fn center(&self) -> Complex<f64> {
        Complex::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Axis-aligned intersection test.  Rectangles that only share an
    /// edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        let ix = self.right().min(other.right()) > self.x.max(other.x);
        let iy = self.bottom().min(other.bottom()) > self.y.max(other.y);
        ix && iy
    }

    /// True when every component is a finite number and the extent is
    /// positive.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.w.is_finite()
            && self.h.is_finite()
            && self.w > 0.0
            && self.h > 0.0
    }

    /// True when `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Maps the pixels of a buffer onto the region of the complex plane
/// the buffer shows.
#[derive(Debug, Clone)]
pub struct PlaneMapper {
    /// The region of the complex plane this buffer covers.
    pub region: Rect,
    // The size of one pixel on the complex plane, along each axis.
    steps: (f64, f64),
}

impl PlaneMapper {
    /// Constructor.  Takes the size of a pixel buffer and the region
    /// it covers.
    pub fn new(width: usize, height: usize, region: Rect) -> Result<PlaneMapper> {
        if width == 0 || height == 0 {
            return Err(Error::Region(format!(
                "A {}x{} buffer has no pixels to map.",
                width, height
            )));
        }
        if !region.is_valid() {
            return Err(Error::Region(format!("{:?} is not a usable region", region)));
        }

        Ok(PlaneMapper {
            region,
            steps: (region.w / (width as f64), region.h / (height as f64)),
        })
    }

    /// Given a pixel on the integral cartesian plane, map that as
    /// closely as possible to a point on the complex cartesian plane.
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex<f64> {
        Complex::new(
            (pixel.0 as f64) * self.steps.0 + self.region.x,
            (pixel.1 as f64) * self.steps.1 + self.region.y,
        )
    }
}
