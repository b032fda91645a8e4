// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The one error type of the crate.  Cancellation is not in here:
//! discarding superseded work is an expected outcome, not a failure.
//! Scheduler bugs (a finished tile receiving another completion, a
//! worker reporting work it was never given) panic instead of coming
//! back as an `Err`.

use failure::Fail;

/// Everything that can go wrong while configuring, scheduling or
/// drawing tiles.
#[derive(Debug, Fail)]
pub enum Error {
    /// The startup configuration cannot produce a working scheduler.
    #[fail(display = "invalid configuration: {}", _0)]
    Config(String),

    /// A region or buffer geometry that cannot be mapped.
    #[fail(display = "invalid region: {}", _0)]
    Region(String),

    /// The tile grid needed for a region exceeds the slots that were
    /// pre-allocated for the configured divisor.
    #[fail(
        display = "{} tiles required but only {} were allocated for divisor {}",
        required, capacity, divisor
    )]
    TileCapacity {
        /// Tiles needed to cover the requested region.
        required: usize,
        /// Tile slots allocated at startup.
        capacity: usize,
        /// The configured tile divisor.
        divisor: u32,
    },

    /// A renderer was asked to draw a texture it never received.
    #[fail(display = "unknown texture {}", _0)]
    UnknownTexture(usize),

    /// Thread spawning or file output failed.
    #[fail(display = "I/O error: {}", _0)]
    Io(#[cause] std::io::Error),

    /// Encoding the output image failed.
    #[fail(display = "image error: {}", _0)]
    Image(#[cause] image::ImageError),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
