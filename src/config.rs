// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Startup settings.  These are read once, checked once, and never
//! change while the scheduler runs.

use crate::error::{Error, Result};
use crate::planes::Rect;

/// The region shown at startup and on "go home".  Tiles are aligned to
/// its origin, and panning never leaves it.
pub const HOME: Rect = Rect {
    x: -1.5,
    y: -1.5,
    w: 3.0,
    h: 3.0,
};

/// Everything the scheduler needs to know before it starts.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Number of compute threads.
    pub workers: usize,
    /// The viewport is split into `divisor` by `divisor` tiles.
    pub divisor: u32,
    /// Escape-time iteration limit.
    pub iterations: usize,
    /// Screen width in pixels.
    pub width: u32,
    /// Screen height in pixels.
    pub height: u32,
    /// Startup region, grid anchor and pan bounds.
    pub home: Rect,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            workers: default_workers(),
            divisor: 8,
            iterations: 1024,
            width: 512,
            height: 512,
            home: HOME,
        }
    }
}

/// One thread per core, leaving one for the frame loop.
pub fn default_workers() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

impl Config {
    /// Rejects settings the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("at least one worker is required".to_string()));
        }
        if self.divisor == 0 {
            return Err(Error::Config("the tile divisor must be at least 1".to_string()));
        }
        if self.iterations == 0 {
            return Err(Error::Config("the iteration limit must be at least 1".to_string()));
        }
        let (w, h) = self.tile_size();
        if w == 0 || h == 0 {
            return Err(Error::Config(format!(
                "a {}x{} screen cannot be split {} ways",
                self.width, self.height, self.divisor
            )));
        }
        if !self.home.is_valid() {
            return Err(Error::Config(format!("{:?} is not a usable home region", self.home)));
        }
        Ok(())
    }

    /// On-screen size of one tile.
    pub fn tile_size(&self) -> (u32, u32) {
        match self.divisor {
            0 => (0, 0),
            d => (self.width / d, self.height / d),
        }
    }

    /// Size of a tile's preview pass: a quarter of the tile along each
    /// axis, never less than a pixel.
    pub fn preview_size(&self) -> (u32, u32) {
        let (w, h) = self.tile_size();
        ((w / 4).max(1), (h / 4).max(1))
    }

    /// Tile slots to allocate.  A region that is not aligned to the
    /// grid straddles one extra row and column.
    pub fn capacity(&self) -> usize {
        let side = self.divisor as usize + 1;
        side * side
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.workers >= 1);
        assert_eq!(config.tile_size(), (64, 64));
        assert_eq!(config.preview_size(), (16, 16));
        assert_eq!(config.capacity(), 81);
    }

    #[test]
    fn rejects_unusable_settings() {
        let bad = |f: &dyn Fn(&mut Config)| {
            let mut config = Config::default();
            f(&mut config);
            config.validate().is_err()
        };
        assert!(bad(&|c| c.workers = 0));
        assert!(bad(&|c| c.divisor = 0));
        assert!(bad(&|c| c.iterations = 0));
        assert!(bad(&|c| c.divisor = 1024));
        assert!(bad(&|c| c.home = Rect::new(0.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn tiny_tiles_still_get_a_preview_pixel() {
        let config = Config {
            width: 24,
            height: 24,
            divisor: 8,
            ..Config::default()
        };
        assert_eq!(config.tile_size(), (3, 3));
        assert_eq!(config.preview_size(), (1, 1));
    }
}
