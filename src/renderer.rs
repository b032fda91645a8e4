// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The display side.  Tiles talk to a Renderer: upload a buffer into
//! a texture (replacing the tile's previous one), draw a texture
//! stretched over a screen rectangle, or fill a rectangle with a flat
//! colour.  Canvas is a software implementation that composites into
//! an RGBA image, which is all the command line tool needs.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::error::{Error, Result};

/// Handle to a buffer uploaded to a Renderer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TextureId(pub usize);

/// A rectangle in screen pixels.  May hang off any edge of the screen.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScreenRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub w: u32,
    /// Height.
    pub h: u32,
}

impl ScreenRect {
    /// Constructor.
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        ScreenRect { x, y, w, h }
    }
}

/// What a tile needs from whatever is putting pixels on the screen.
/// Failures here are not expected to be recoverable.
pub trait Renderer {
    /// Uploads `pixels`, replacing `existing` when given.  Returns the
    /// handle to draw it with.
    fn upload(&mut self, existing: Option<TextureId>, pixels: &RgbaImage) -> Result<TextureId>;

    /// Draws a texture stretched over `rect`.
    fn draw_texture(&mut self, rect: ScreenRect, texture: TextureId) -> Result<()>;

    /// Fills `rect` with a single colour.
    fn fill(&mut self, rect: ScreenRect, color: Rgba<u8>) -> Result<()>;
}

/// A software Renderer compositing into an in-memory image.
pub struct Canvas {
    target: RgbaImage,
    textures: Vec<RgbaImage>,
}

impl Canvas {
    /// A black canvas of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Canvas {
            target: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])),
            textures: Vec::new(),
        }
    }

    /// Paints the whole canvas with `color`.
    pub fn clear(&mut self, color: Rgba<u8>) {
        for pixel in self.target.pixels_mut() {
            *pixel = color;
        }
    }

    /// The composited frame.
    pub fn image(&self) -> &RgbaImage {
        &self.target
    }

    /// Number of textures uploaded so far.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Writes the frame out; the format follows the file extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.target.save(path)?;
        Ok(())
    }
}

impl Renderer for Canvas {
    fn upload(&mut self, existing: Option<TextureId>, pixels: &RgbaImage) -> Result<TextureId> {
        match existing {
            Some(id) => {
                let slot = self
                    .textures
                    .get_mut(id.0)
                    .ok_or(Error::UnknownTexture(id.0))?;
                *slot = pixels.clone();
                Ok(id)
            }
            None => {
                self.textures.push(pixels.clone());
                Ok(TextureId(self.textures.len() - 1))
            }
        }
    }

    fn draw_texture(&mut self, rect: ScreenRect, texture: TextureId) -> Result<()> {
        let source = self
            .textures
            .get(texture.0)
            .ok_or(Error::UnknownTexture(texture.0))?;
        if rect.w == 0 || rect.h == 0 {
            return Ok(());
        }
        let (x, y) = (i64::from(rect.x), i64::from(rect.y));
        if source.dimensions() == (rect.w, rect.h) {
            imageops::replace(&mut self.target, source, x, y);
        } else {
            let scaled = imageops::resize(source, rect.w, rect.h, FilterType::Nearest);
            imageops::replace(&mut self.target, &scaled, x, y);
        }
        Ok(())
    }

    fn fill(&mut self, rect: ScreenRect, color: Rgba<u8>) -> Result<()> {
        if rect.w == 0 || rect.h == 0 {
            return Ok(());
        }
        let patch = RgbaImage::from_pixel(rect.w, rect.h, color);
        imageops::replace(&mut self.target, &patch, i64::from(rect.x), i64::from(rect.y));
        Ok(())
    }
}
