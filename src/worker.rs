// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A Worker is one long-lived compute thread.  It takes one Request at
//! a time, renders it scanline by scanline, and hands the buffer back
//! over a channel that the queue polls without blocking.  Between
//! scanlines it looks at the request's CancelToken; once that is set,
//! the work is abandoned and the result is reported as discarded.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{unbounded, Receiver, Sender, TryRecvError};
use image::RgbaImage;
use tracing::trace;

use crate::engine::PixelEngine;
use crate::error::Result;
use crate::planes::PlaneMapper;
use crate::request::{CancelToken, Request};

/// Identifies the tile slot a request belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TileId(pub usize);

impl TileId {
    /// The slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a non-blocking look at a worker found.
#[derive(Debug)]
pub enum Poll {
    /// The worker is idle, or still computing.
    NotReady,
    /// The request ran to the end and is still wanted.
    Completed {
        /// The tile the request was dispatched for.
        owner: TileId,
        /// `width * height` RGBA pixels, row-major.
        pixels: RgbaImage,
    },
    /// The request was cancelled before or while it ran.
    Discarded {
        /// The tile the request was dispatched for.
        owner: TileId,
    },
}

#[derive(Debug)]
enum State {
    Idle,
    Busy { owner: TileId, token: CancelToken },
}

/// One background compute slot.
pub struct Worker {
    index: usize,
    state: State,
    jobs: Option<Sender<Request>>,
    results: Receiver<Option<RgbaImage>>,
    handle: Option<JoinHandle<()>>,
}

/// Computes `request` row by row, giving up as soon as its token is
/// set.  `None` means discarded; no partial buffer escapes.
pub fn render(engine: &dyn PixelEngine, request: &Request) -> Option<RgbaImage> {
    if request.is_cancelled() {
        return None;
    }
    let (width, height) = (request.width() as usize, request.height() as usize);
    let plane = match PlaneMapper::new(width, height, request.region()) {
        Ok(plane) => plane,
        Err(_) => return None,
    };
    let mut pixels = RgbaImage::new(request.width(), request.height());
    for (row, scanline) in pixels.chunks_exact_mut(width * 4).enumerate() {
        engine.render_row(&plane, row, scanline);
        if request.is_cancelled() {
            return None;
        }
    }
    Some(pixels)
}

impl Worker {
    /// Starts the thread behind worker number `index`.
    pub fn spawn(index: usize, engine: Arc<dyn PixelEngine>) -> Result<Worker> {
        let (jobs, inbox) = unbounded::<Request>();
        let (outbox, results) = unbounded();
        let handle = thread::Builder::new()
            .name(format!("mandeltiles-worker-{}", index))
            .spawn(move || {
                for request in inbox {
                    let result = render(engine.as_ref(), &request);
                    if outbox.send(result).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Worker {
            index,
            state: State::Idle,
            jobs: Some(jobs),
            results,
            handle: Some(handle),
        })
    }

    /// The position of this worker in its pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// True while a request is dispatched and not yet polled to a
    /// terminal state.
    pub fn is_busy(&self) -> bool {
        match self.state {
            State::Idle => false,
            State::Busy { .. } => true,
        }
    }

    /// The tile whose request this worker is running, if any.
    pub fn owner(&self) -> Option<TileId> {
        match self.state {
            State::Idle => None,
            State::Busy { owner, .. } => Some(owner),
        }
    }

    /// Hands `request` to the worker.  Refuses, and changes nothing,
    /// when the worker is already busy.
    pub fn submit(&mut self, request: Request, owner: TileId) -> bool {
        if self.is_busy() {
            return false;
        }
        let token = request.token().clone();
        let jobs = match self.jobs {
            Some(ref jobs) => jobs,
            None => return false,
        };
        if jobs.send(request).is_err() {
            panic!("worker {} thread is gone", self.index);
        }
        trace!(worker = self.index, tile = owner.0, "dispatched");
        self.state = State::Busy { owner, token };
        true
    }

    /// Non-blocking check for a finished request.  A terminal answer
    /// returns the worker to idle.  A buffer that finished after its
    /// token was set still counts as discarded.
    pub fn poll(&mut self) -> Poll {
        let result = match self.results.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return Poll::NotReady,
            Err(TryRecvError::Disconnected) => {
                panic!("worker {} thread died mid-request", self.index)
            }
        };
        let (owner, token) = match std::mem::replace(&mut self.state, State::Idle) {
            State::Busy { owner, token } => (owner, token),
            State::Idle => panic!(
                "worker {} reported a result it was never dispatched",
                self.index
            ),
        };
        match result {
            Some(pixels) if !token.is_cancelled() => Poll::Completed { owner, pixels },
            _ => Poll::Discarded { owner },
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let State::Busy { ref token, .. } = self.state {
            token.cancel();
        }
        // Closing the job channel ends the thread's receive loop.
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
