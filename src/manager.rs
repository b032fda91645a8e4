// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The TileManager keeps a grid of tiles over the visible region and
//! reconciles it when the region changes.  Zooming throws every tile
//! away and starts over.  Panning keeps every tile that is still at
//! least partly visible, moves it on screen, and only requests the
//! cells that scrolled into view.
//!
//! The grid is anchored at the home region's origin, with cells
//! `region.w / divisor` wide, so a pan that keeps the zoom level lands
//! on the same cell boundaries as before.  Tile slots are allocated
//! once, at startup, and recycled.

use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::sync::Arc;

use itertools::iproduct;
use tracing::{debug, warn};

use crate::config::Config;
use crate::engine::PixelEngine;
use crate::error::{Error, Result};
use crate::planes::Rect;
use crate::queue::{QueueStats, RenderQueue};
use crate::renderer::Renderer;
use crate::tile::{Cell, Lod, Tile};
use crate::worker::TileId;

// Cell indices beyond this mean the zoom has outrun f64.
const MAX_CELL: f64 = i32::MAX as f64;

#[derive(Debug, Clone)]
struct Grid {
    tile_w: f64,
    tile_h: f64,
    pix_w: f64,
    pix_h: f64,
    cols: RangeInclusive<i64>,
    rows: RangeInclusive<i64>,
}

impl Grid {
    fn len(&self) -> usize {
        let cols = (self.cols.end() - self.cols.start() + 1) as usize;
        let rows = (self.rows.end() - self.rows.start() + 1) as usize;
        cols * rows
    }

    /// Row-major, top row first.
    fn cells(&self) -> impl Iterator<Item = Cell> {
        iproduct!(self.rows.clone(), self.cols.clone()).map(|(y, x)| (x, y))
    }

    fn cell_region(&self, home: &Rect, cell: Cell) -> Rect {
        Rect::new(
            home.x + cell.0 as f64 * self.tile_w,
            home.y + cell.1 as f64 * self.tile_h,
            self.tile_w,
            self.tile_h,
        )
    }

    fn screen_of(&self, region: &Rect, tile: &Rect) -> (i32, i32) {
        (
            ((tile.x - region.x) / self.pix_w).floor() as i32,
            ((tile.y - region.y) / self.pix_h).floor() as i32,
        )
    }

    fn same_extent(&self, extent: (f64, f64)) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() <= a.abs().max(b.abs()) * 1e-9;
        close(self.tile_w, extent.0) && close(self.tile_h, extent.1)
    }
}

fn span(offset: f64, extent: f64, step: f64) -> Option<RangeInclusive<i64>> {
    let first = (offset / step).floor();
    let last = ((offset + extent) / step).ceil() - 1.0;
    if !first.is_finite() || !last.is_finite() || first.abs() > MAX_CELL || last.abs() > MAX_CELL {
        return None;
    }
    Some(first as i64..=(last.max(first) as i64))
}

/// Owns the tiles, the render queue, and the pixel engine.
pub struct TileManager {
    config: Config,
    engine: Arc<dyn PixelEngine>,
    queue: RenderQueue,
    slots: Vec<Tile>,
    active: Vec<TileId>,
    free: Vec<TileId>,
    region: Rect,
    extent: Option<(f64, f64)>,
}

impl TileManager {
    /// Checks `config`, allocates every tile slot and starts the
    /// workers.  Nothing is requested until the first `zoom_request`.
    pub fn new(config: Config, engine: Arc<dyn PixelEngine>) -> Result<TileManager> {
        config.validate()?;
        let queue = RenderQueue::new(config.workers, engine.clone())?;
        let (size, preview) = (config.tile_size(), config.preview_size());
        let capacity = config.capacity();
        let slots = (0..capacity)
            .map(|i| Tile::new(TileId(i), size, preview))
            .collect();
        debug!(capacity, tile = ?size, preview = ?preview, "tile slots allocated");
        Ok(TileManager {
            region: config.home,
            config,
            engine,
            queue,
            slots,
            active: Vec::with_capacity(capacity),
            free: (0..capacity).rev().map(TileId).collect(),
            extent: None,
        })
    }

    fn grid(&self, region: &Rect) -> Option<Grid> {
        if !region.is_valid() {
            return None;
        }
        let divisor = f64::from(self.config.divisor);
        let (px, py) = self.config.tile_size();
        let (tile_w, tile_h) = (region.w / divisor, region.h / divisor);
        let home = &self.config.home;
        Some(Grid {
            tile_w,
            tile_h,
            pix_w: tile_w / f64::from(px),
            pix_h: tile_h / f64::from(py),
            cols: span(region.x - home.x, region.w, tile_w)?,
            rows: span(region.y - home.y, region.h, tile_h)?,
        })
    }

    fn ensure_capacity(&self, required: usize) -> Result<()> {
        if required > self.slots.len() {
            return Err(Error::TileCapacity {
                required,
                capacity: self.slots.len(),
                divisor: self.config.divisor,
            });
        }
        Ok(())
    }

    fn assign(&mut self, id: TileId, cell: Cell, grid: &Grid, region: &Rect) {
        let rect = grid.cell_region(&self.config.home, cell);
        let screen = grid.screen_of(region, &rect);
        self.slots[id.index()].request(&mut self.queue, cell, screen, rect);
        self.active.push(id);
    }

    fn release_all(&mut self) {
        for id in self.active.drain(..) {
            self.slots[id.index()].reset();
            self.free.push(id);
        }
    }

    /// Replaces the whole view with `region`: every tile is dropped,
    /// its outstanding work cancelled, and the new grid requested from
    /// scratch.  A region too small for `f64` to tile falls back to
    /// home.  Returns the region actually shown.
    pub fn zoom_request(&mut self, region: Rect) -> Result<Rect> {
        let (region, grid) = match self.grid(&region) {
            Some(grid) => (region, grid),
            None => {
                warn!(?region, "too close, zooming out");
                let home = self.config.home;
                let grid = self.grid(&home).ok_or_else(|| {
                    Error::Config(format!("{:?} cannot be tiled", home))
                })?;
                (home, grid)
            }
        };

        self.release_all();
        self.ensure_capacity(grid.len())?;
        for cell in grid.cells() {
            let id = match self.free.pop() {
                Some(id) => id,
                None => break,
            };
            self.assign(id, cell, &grid, &region);
        }
        debug!(?region, tiles = self.active.len(), "zoom");
        self.region = region;
        self.extent = Some((grid.tile_w, grid.tile_h));
        Ok(region)
    }

    /// Returns to the home region, discarding everything.
    pub fn zoom_home(&mut self) -> Result<Rect> {
        let home = self.config.home;
        self.zoom_request(home)
    }

    /// Slides the view to `region` at the same zoom level.  Tiles still
    /// overlapping it are only moved on screen; the rest are reset and
    /// their slots reused for the cells that came into view.  A region
    /// of a different size is handled as a zoom.
    pub fn move_request(&mut self, region: Rect) -> Result<()> {
        let grid = match (self.extent, self.grid(&region)) {
            (Some(extent), Some(grid)) if grid.same_extent(extent) => grid,
            _ => {
                debug!(?region, "move changes the tile grid, rebuilding");
                self.zoom_request(region)?;
                return Ok(());
            }
        };
        self.ensure_capacity(grid.len())?;

        let mut covered = HashSet::new();
        let mut survivors = Vec::with_capacity(self.active.len());
        for id in self.active.drain(..) {
            let tile = &mut self.slots[id.index()];
            if tile.region().overlaps(&region) {
                tile.place(grid.screen_of(&region, &tile.region()));
                covered.insert(tile.cell());
                survivors.push(id);
            } else {
                tile.reset();
                self.free.push(id);
            }
        }
        self.active = survivors;

        let kept = self.active.len();
        for cell in grid.cells().filter(|cell| !covered.contains(cell)) {
            match self.free.pop() {
                Some(id) => self.assign(id, cell, &grid, &region),
                None => warn!(?cell, ?region, "missing free tiles, cell skipped"),
            }
        }
        debug!(kept, requested = self.active.len() - kept, "move");
        self.region = region;
        Ok(())
    }

    /// One scheduling step: collect finished buffers and keep the
    /// workers busy.  Never blocks.
    pub fn update(&mut self) {
        self.queue.tick(&mut self.slots[..]);
    }

    /// Draws every visible tile.  Tiles never overlap, so order does
    /// not matter.
    pub fn draw(&mut self, renderer: &mut dyn Renderer) -> Result<()> {
        for id in self.active.iter() {
            self.slots[id.index()].draw(renderer, self.engine.as_ref())?;
        }
        Ok(())
    }

    /// The region currently shown.
    pub fn region(&self) -> Rect {
        self.region
    }

    /// The configuration the manager was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// On-screen size of every tile.
    pub fn tile_size(&self) -> (u32, u32) {
        self.config.tile_size()
    }

    /// The tiles currently covering the view.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.active.iter().map(move |id| &self.slots[id.index()])
    }

    /// Number of tiles covering the view.
    pub fn tile_count(&self) -> usize {
        self.active.len()
    }

    /// Every tile slot allocated at startup.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Every visible tile has its full-resolution buffer.
    pub fn is_complete(&self) -> bool {
        self.tiles().all(|tile| tile.lod() == Lod::Final)
    }

    /// Scheduler counters.
    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HOME;
    use crate::renderer::Canvas;
    use crate::worker::testing::Quadrants;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;
    use std::thread;
    use std::time::Duration;

    fn manager(divisor: u32) -> TileManager {
        let config = Config {
            workers: 3,
            divisor,
            iterations: 16,
            width: 64,
            height: 64,
            home: HOME,
        };
        TileManager::new(config, Arc::new(Quadrants)).unwrap()
    }

    fn finish(tm: &mut TileManager) {
        for _ in 0..20_000 {
            tm.update();
            if tm.is_complete() {
                return;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("tiles never finished");
    }

    fn by_cell(tm: &TileManager) -> HashMap<Cell, (usize, Lod, (i32, i32))> {
        tm.tiles()
            .map(|t| (t.cell(), (t.request_count(), t.lod(), t.screen())))
            .collect()
    }

    #[test]
    fn home_with_divisor_eight_is_sixty_four_tiles() {
        let mut tm = manager(8);
        assert_eq!(tm.zoom_request(HOME).unwrap(), HOME);
        assert_eq!(tm.tile_count(), 64);
        assert!(tm.tiles().all(|t| t.is_pending() && t.lod() == Lod::Empty));
        finish(&mut tm);
        assert!(tm.tiles().all(|t| t.lod() == Lod::Final));
        assert_eq!(tm.stats().completed, 128);
        let cells: HashSet<Cell> = tm.tiles().map(|t| t.cell()).collect();
        assert_eq!(cells.len(), 64);
        assert!(cells.iter().all(|&(x, y)| (0..8).contains(&x) && (0..8).contains(&y)));
    }

    #[test]
    fn zooming_twice_starts_over_both_times() {
        let mut tm = manager(8);
        tm.zoom_request(HOME).unwrap();
        tm.zoom_request(HOME).unwrap();
        assert_eq!(tm.tile_count(), 64);
        finish(&mut tm);
        assert_eq!(tm.stats().dropped_queued, 64);

        tm.zoom_request(HOME).unwrap();
        assert_eq!(tm.tile_count(), 64);
        assert!(tm
            .tiles()
            .all(|t| t.lod() == Lod::Empty && t.preview().is_none() && t.full().is_none()));
        finish(&mut tm);
        assert!(tm.tiles().all(|t| t.lod() == Lod::Final && t.full().is_some()));
        let cells: HashSet<Cell> = tm.tiles().map(|t| t.cell()).collect();
        assert_eq!(cells.len(), 64);
    }

    #[test]
    fn going_home_replaces_a_zoomed_view() {
        let mut tm = manager(8);
        tm.zoom_request(Rect::new(-0.5, -0.5, 0.75, 0.75)).unwrap();
        finish(&mut tm);
        assert_eq!(tm.zoom_home().unwrap(), HOME);
        assert_eq!(tm.region(), HOME);
        assert_eq!(tm.tile_count(), 64);
        assert_eq!(tm.tile_size(), (8, 8));
        assert!(tm.tiles().all(|t| t.request_count() >= 1 && t.lod() == Lod::Empty));
    }

    #[test]
    fn panning_one_tile_keeps_the_rest() {
        let mut tm = manager(8);
        tm.zoom_request(HOME).unwrap();
        finish(&mut tm);
        let before = by_cell(&tm);

        let step = HOME.w / 8.0;
        tm.move_request(Rect::new(HOME.x + step, HOME.y, HOME.w, HOME.h))
            .unwrap();
        let after = by_cell(&tm);
        assert_eq!(after.len(), 64);
        for (&(x, y), &(count, lod, screen)) in after.iter() {
            if x == 8 {
                assert_eq!(count, 1);
                assert_eq!(lod, Lod::Empty);
            } else {
                let (old_count, _, old_screen) = before[&(x, y)];
                assert!(x >= 1 && x <= 7);
                assert_eq!(count, old_count, "cell {:?} was re-requested", (x, y));
                assert_eq!(lod, Lod::Final);
                assert_eq!(screen, (old_screen.0 - 8, old_screen.1));
            }
        }
        assert!(!after.keys().any(|&(x, _)| x == 0));
        finish(&mut tm);
    }

    #[test]
    fn a_partial_pan_adds_a_column() {
        let mut tm = manager(8);
        tm.zoom_request(HOME).unwrap();
        finish(&mut tm);
        let dispatched = tm.stats().dispatched;

        tm.move_request(Rect::new(HOME.x + 0.1, HOME.y, HOME.w, HOME.h))
            .unwrap();
        assert_eq!(tm.tile_count(), 72);
        let fresh: Vec<&Tile> = tm.tiles().filter(|t| t.lod() == Lod::Empty).collect();
        assert_eq!(fresh.len(), 8);
        assert!(fresh.iter().all(|t| t.cell().0 == 8));
        assert!(tm
            .tiles()
            .filter(|t| t.cell().0 < 8)
            .all(|t| t.request_count() == 1 && t.lod() == Lod::Final));
        finish(&mut tm);
        assert_eq!(tm.stats().dispatched, dispatched + 16);
    }

    #[test]
    fn pan_before_anything_finished_cancels_only_what_left() {
        let mut tm = manager(8);
        tm.zoom_request(HOME).unwrap();
        let step = HOME.w / 8.0;
        tm.move_request(Rect::new(HOME.x, HOME.y + step, HOME.w, HOME.h))
            .unwrap();
        assert_eq!(tm.tile_count(), 64);
        finish(&mut tm);
        let stats = tm.stats();
        assert_eq!(stats.completed, 128);
        assert_eq!(stats.dropped_queued + stats.discarded, 8);
    }

    #[test]
    fn a_resized_move_is_a_zoom() {
        let mut tm = manager(8);
        tm.zoom_request(HOME).unwrap();
        finish(&mut tm);
        tm.move_request(Rect::new(-1.0, -1.0, 1.0, 1.0)).unwrap();
        assert!(tm.tiles().all(|t| t.lod() == Lod::Empty));
        finish(&mut tm);
        assert_eq!(tm.region(), Rect::new(-1.0, -1.0, 1.0, 1.0));
    }

    #[test]
    fn zooming_past_f64_goes_home() {
        let mut tm = manager(8);
        let shown = tm
            .zoom_request(Rect::new(0.25, 0.25, 1e-300, 1e-300))
            .unwrap();
        assert_eq!(shown, HOME);
        assert_eq!(tm.region(), HOME);
        assert_eq!(tm.tile_count(), 64);
    }

    #[test]
    fn oversized_grids_are_refused() {
        let tm = manager(2);
        assert_eq!(tm.capacity(), 9);
        match tm.ensure_capacity(10) {
            Err(Error::TileCapacity {
                required,
                capacity,
                divisor,
            }) => assert_eq!((required, capacity, divisor), (10, 9, 2)),
            other => panic!("expected a capacity error, got {:?}", other),
        }
        assert!(tm.ensure_capacity(9).is_ok());
    }

    #[test]
    fn finished_frame_matches_a_direct_render() {
        let mut tm = manager(8);
        tm.zoom_request(HOME).unwrap();
        finish(&mut tm);
        let mut canvas = Canvas::new(64, 64);
        tm.draw(&mut canvas).unwrap();
        let step = HOME.w / 64.0;
        for (x, y, pixel) in canvas.image().enumerate_pixels() {
            let point = num::Complex::new(HOME.x + x as f64 * step, HOME.y + y as f64 * step);
            assert_eq!(*pixel, Quadrants.color_at(point), "pixel {},{}", x, y);
        }
    }

    #[test]
    fn random_pans_keep_the_grid_consistent() {
        let mut tm = manager(4);
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut region = Rect::new(-1.0, -1.0, 1.5, 1.5);
        tm.zoom_request(region).unwrap();
        for _ in 0..40 {
            region.x = (region.x + rng.gen_range(-0.4, 0.4)).max(-1.5).min(0.0);
            region.y = (region.y + rng.gen_range(-0.4, 0.4)).max(-1.5).min(0.0);
            tm.move_request(region).unwrap();
            for _ in 0..rng.gen_range(0, 4) {
                tm.update();
            }
            assert!(tm.tile_count() <= tm.capacity());
            let cells: HashSet<Cell> = tm.tiles().map(|t| t.cell()).collect();
            assert_eq!(cells.len(), tm.tile_count());
            assert!(tm.tiles().all(|t| t.region().overlaps(&region)));
        }
        finish(&mut tm);
        let grid = tm.grid(&region).unwrap();
        let cells: HashSet<Cell> = tm.tiles().map(|t| t.cell()).collect();
        assert!(grid.cells().all(|cell| cells.contains(&cell)));
    }
}
