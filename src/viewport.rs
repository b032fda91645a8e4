// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turns pointer gestures into regions.  A rectangular selection
//! becomes a zoom target; a drag becomes a pan.  Both work in screen
//! pixels against the region currently shown.

use crate::planes::Rect;

/// A position on screen, in pixels from the top-left corner.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScreenPoint {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl ScreenPoint {
    /// Constructor.
    pub fn new(x: i32, y: i32) -> Self {
        ScreenPoint { x, y }
    }
}

fn min_max(a: ScreenPoint, b: ScreenPoint) -> (ScreenPoint, ScreenPoint) {
    (
        ScreenPoint::new(a.x.min(b.x), a.y.min(b.y)),
        ScreenPoint::new(a.x.max(b.x), a.y.max(b.y)),
    )
}

/// The region under a selection dragged from `start` to `end`.  The
/// selection is squared up around its middle so the zoomed view keeps
/// a 1:1 aspect.  An empty selection selects nothing.
pub fn selection_to_region(
    start: ScreenPoint,
    end: ScreenPoint,
    screen: (u32, u32),
    current: Rect,
) -> Option<Rect> {
    let (mut min, mut max) = min_max(start, end);
    let (cw, ch) = (max.x - min.x, max.y - min.y);
    if cw == 0 && ch == 0 {
        return None;
    }
    if cw < ch {
        let dif = (ch - cw) / 2;
        min.x -= dif;
        max.x += dif;
    } else if ch < cw {
        let dif = (cw - ch) / 2;
        min.y -= dif;
        max.y += dif;
    }

    let stepx = current.w / f64::from(screen.0);
    let stepy = current.h / f64::from(screen.1);
    Some(Rect::new(
        f64::from(min.x) * stepx + current.x,
        f64::from(min.y) * stepy + current.y,
        f64::from(max.x - min.x) * stepx,
        f64::from(max.y - min.y) * stepy,
    ))
}

/// The region after dragging the image from `from` to `to`.  The
/// content follows the pointer.  A pan that would leave `bounds` is
/// refused and `current` comes back unchanged.
pub fn pan_region(
    current: Rect,
    from: ScreenPoint,
    to: ScreenPoint,
    screen: (u32, u32),
    bounds: Rect,
) -> Rect {
    let pixw = current.w / f64::from(screen.0);
    let pixh = current.h / f64::from(screen.1);
    let moved = Rect::new(
        current.x + f64::from(from.x - to.x) * pixw,
        current.y + f64::from(from.y - to.y) * pixh,
        current.w,
        current.h,
    );
    if bounds.contains(&moved) {
        moved
    } else {
        current
    }
}
