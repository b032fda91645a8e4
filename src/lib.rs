#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tiled Mandelbrot explorer
//!
//! Rendering the whole visible region of the Mandelbrot set at full
//! resolution takes far longer than a frame, so this crate never
//! tries.  The view is cut into tiles, and every tile is computed
//! twice: first at a quarter of its resolution, which is cheap and
//! lands quickly, then at full resolution.  A fixed pool of worker
//! threads does the computing while the frame loop stays free to draw
//! whatever has arrived so far.
//!
//! When the view changes, work that is no longer wanted is thrown
//! away.  Requests still waiting in the queue are dropped before they
//! reach a worker, and a worker part way through a buffer notices at
//! the end of its current scanline.  Panning keeps every tile that is
//! still visible; only zooming starts from scratch.
//!
//! The frame loop drives a TileManager:
//!
//! ```no_run
//! use std::sync::Arc;
//! use mandeltiles::{Canvas, Config, Mandelbrot, TileManager, HOME};
//!
//! let config = Config::default();
//! let engine = Arc::new(Mandelbrot::new(config.iterations));
//! let mut canvas = Canvas::new(config.width, config.height);
//! let mut tiles = TileManager::new(config, engine).unwrap();
//! tiles.zoom_request(HOME).unwrap();
//! while !tiles.is_complete() {
//!     tiles.update();
//!     tiles.draw(&mut canvas).unwrap();
//! }
//! ```

extern crate crossbeam;
extern crate failure;
extern crate image;
extern crate itertools;
extern crate num;
extern crate num_cpus;

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod manager;
pub mod planes;
pub mod queue;
pub mod renderer;
pub mod request;
pub mod tile;
pub mod viewport;
pub mod worker;

pub use config::{Config, HOME};
pub use engine::{Mandelbrot, PixelEngine};
pub use error::{Error, Result};
pub use manager::TileManager;
pub use planes::{PlaneMapper, Rect};
pub use queue::{Deliver, QueueStats, RenderQueue};
pub use renderer::{Canvas, Renderer, ScreenRect, TextureId};
pub use request::{CancelToken, Request};
pub use tile::{Lod, Tile};
pub use viewport::{pan_region, selection_to_region, ScreenPoint};
pub use worker::{Poll, TileId, Worker};
