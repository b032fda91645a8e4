// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A Tile is one rectangular piece of the viewport, refined in two
//! passes.  The first request is a quarter-resolution preview so that
//! something close to right is on screen quickly; when it lands the
//! tile immediately asks for the full-resolution buffer.  Until the
//! preview arrives the tile is drawn as a single colour sampled at its
//! centre.
//!
//! ```text
//!   request ──> Empty ──preview──> Preview ──final──> Final
//!                 ^                   │                 │
//!                 └──── reset ────────┴─────────────────┘
//! ```

use image::RgbaImage;
use tracing::debug;

use crate::engine::PixelEngine;
use crate::error::Result;
use crate::planes::Rect;
use crate::queue::{Deliver, RenderQueue};
use crate::renderer::{Renderer, ScreenRect, TextureId};
use crate::request::{CancelToken, Request};
use crate::worker::TileId;

/// How much of a tile has been computed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Lod {
    /// Nothing yet; drawn as a flat colour.
    Empty,
    /// The quarter-resolution pass has landed.
    Preview,
    /// The full-resolution pass has landed.  Terminal until the next
    /// request.
    Final,
}

impl Lod {
    fn slot(self) -> Option<usize> {
        match self {
            Lod::Empty => None,
            Lod::Preview => Some(0),
            Lod::Final => Some(1),
        }
    }
}

/// Position of a tile in the grid anchored at the home region's
/// origin.  Column first.
pub type Cell = (i64, i64);

/// One independently scheduled piece of the viewport.
pub struct Tile {
    id: TileId,
    cell: Cell,
    screen: (i32, i32),
    size: (u32, u32),
    preview_size: (u32, u32),
    region: Rect,
    lod: Lod,
    token: CancelToken,
    pending: bool,
    buffers: [Option<RgbaImage>; 2],
    textures: [Option<TextureId>; 2],
    uploaded: [bool; 2],
    requests: usize,
}

impl Tile {
    /// An empty tile for slot `id`, `size` pixels on screen, with a
    /// preview pass of `preview_size` pixels.
    pub fn new(id: TileId, size: (u32, u32), preview_size: (u32, u32)) -> Self {
        Tile {
            id,
            cell: (0, 0),
            screen: (0, 0),
            size,
            preview_size,
            region: Rect::new(0.0, 0.0, 0.0, 0.0),
            lod: Lod::Empty,
            token: CancelToken::new(),
            pending: false,
            buffers: [None, None],
            textures: [None, None],
            uploaded: [false, false],
            requests: 0,
        }
    }

    /// The slot this tile occupies.
    pub fn id(&self) -> TileId {
        self.id
    }

    /// Grid position of the region this tile was last asked for.
    pub fn cell(&self) -> Cell {
        self.cell
    }

    /// Top-left corner on screen.
    pub fn screen(&self) -> (i32, i32) {
        self.screen
    }

    /// The fractal-space region this tile shows.
    pub fn region(&self) -> Rect {
        self.region
    }

    /// Current level of detail.
    pub fn lod(&self) -> Lod {
        self.lod
    }

    /// A request is queued or being computed for this tile.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// The token guarding the tile's current (or last) request.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// How many times `request` was called on this tile.
    pub fn request_count(&self) -> usize {
        self.requests
    }

    /// The preview buffer, once it has arrived.
    pub fn preview(&self) -> Option<&RgbaImage> {
        self.buffers[0].as_ref()
    }

    /// The full-resolution buffer, once it has arrived.
    pub fn full(&self) -> Option<&RgbaImage> {
        self.buffers[1].as_ref()
    }

    /// Abandons whatever is outstanding and forgets what was computed.
    pub fn reset(&mut self) {
        if self.pending {
            self.token.cancel();
            self.pending = false;
        }
        self.lod = Lod::Empty;
        self.buffers = [None, None];
        self.uploaded = [false, false];
    }

    /// Points the tile at `region` and queues its preview pass.  Any
    /// request still outstanding is cancelled first.
    pub fn request(&mut self, queue: &mut RenderQueue, cell: Cell, screen: (i32, i32), region: Rect) {
        self.reset();
        self.cell = cell;
        self.screen = screen;
        self.region = region;
        self.token = CancelToken::new();
        self.pending = true;
        self.requests += 1;
        let (w, h) = self.preview_size;
        queue.enqueue(Request::new(w, h, region, self.token.clone()), self.id);
    }

    /// Moves the tile on screen without touching what it shows.
    pub fn place(&mut self, screen: (i32, i32)) {
        self.screen = screen;
    }

    /// Installs a finished buffer.  A preview escalates straight to the
    /// full-resolution request; a full buffer finishes the tile.
    pub fn apply_result(&mut self, pixels: RgbaImage, queue: &mut RenderQueue) {
        match self.lod {
            Lod::Empty => {
                debug_assert_eq!(pixels.dimensions(), self.preview_size);
                self.install(0, pixels);
                self.lod = Lod::Preview;
                self.token = CancelToken::new();
                let (w, h) = self.size;
                queue.enqueue(Request::new(w, h, self.region, self.token.clone()), self.id);
            }
            Lod::Preview => {
                debug_assert_eq!(pixels.dimensions(), self.size);
                self.install(1, pixels);
                self.lod = Lod::Final;
                self.pending = false;
                debug!(tile = self.id.0, cell = ?self.cell, "tile final");
            }
            Lod::Final => unreachable!(
                "tile {} at {:?} is final and received another buffer",
                self.id.0, self.cell
            ),
        }
    }

    fn install(&mut self, slot: usize, pixels: RgbaImage) {
        self.buffers[slot] = Some(pixels);
        self.uploaded[slot] = false;
    }

    /// Puts the tile on screen: the best buffer it has, stretched to
    /// the tile's size, or a flat colour from its centre.
    pub fn draw(&mut self, renderer: &mut dyn Renderer, engine: &dyn PixelEngine) -> Result<()> {
        let rect = ScreenRect::new(self.screen.0, self.screen.1, self.size.0, self.size.1);
        let slot = match self.lod.slot() {
            Some(slot) => slot,
            None => return renderer.fill(rect, engine.color_at(self.region.center())),
        };
        if !self.uploaded[slot] {
            if let Some(ref pixels) = self.buffers[slot] {
                self.textures[slot] = Some(renderer.upload(self.textures[slot], pixels)?);
                self.uploaded[slot] = true;
            }
        }
        match self.textures[slot] {
            Some(texture) => renderer.draw_texture(rect, texture),
            None => Ok(()),
        }
    }
}

impl Deliver for [Tile] {
    fn deliver(&mut self, owner: TileId, pixels: RgbaImage, queue: &mut RenderQueue) {
        self[owner.index()].apply_result(pixels, queue);
    }
}
