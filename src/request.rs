// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A Request describes one buffer a worker should compute, and
//! carries the CancelToken its owner uses to take it back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::planes::Rect;

/// A set-once cancellation flag shared between the tile that issued
/// a request and whichever queue entry or worker currently holds it.
/// Setting it never blocks; holders poll it at their own check points.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, unset token.
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    /// Marks the work as no longer wanted.  Setting an already set
    /// token does nothing.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Has the owner given up on this work?
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A buffer of `width` by `height` pixels covering `region`.
/// Immutable once built.
#[derive(Clone, Debug)]
pub struct Request {
    width: u32,
    height: u32,
    region: Rect,
    token: CancelToken,
}

impl Request {
    /// Constructor.
    pub fn new(width: u32, height: u32, region: Rect, token: CancelToken) -> Self {
        Request {
            width,
            height,
            region,
            token,
        }
    }

    /// Width of the requested buffer, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the requested buffer, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The fractal-space region the buffer covers.
    pub fn region(&self) -> Rect {
        self.region
    }

    /// The token the owner will set to take this request back.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Shorthand for `self.token().is_cancelled()`.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
