// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The RenderQueue owns the worker pool and the list of requests
//! waiting for a free worker.  Once per frame `tick` collects whatever
//! the workers finished, hands those buffers to their tiles, and then
//! feeds idle workers from the front of the queue.  Nothing in here
//! ever blocks.

use std::collections::VecDeque;
use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, trace};

use crate::engine::PixelEngine;
use crate::error::{Error, Result};
use crate::request::Request;
use crate::worker::{Poll, TileId, Worker};

/// Receives finished buffers on behalf of their tiles.  The queue is
/// passed back in so that an owner can enqueue follow-up work.
pub trait Deliver {
    /// `pixels` finished for a request `owner` issued and still wants.
    fn deliver(&mut self, owner: TileId, pixels: RgbaImage, queue: &mut RenderQueue);
}

/// Running totals, for diagnostics.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Requests handed to a worker.
    pub dispatched: usize,
    /// Buffers delivered to their owner.
    pub completed: usize,
    /// Requests dropped from the queue before reaching a worker.
    pub dropped_queued: usize,
    /// Requests a worker abandoned, or finished after cancellation.
    pub discarded: usize,
}

struct Entry {
    request: Request,
    owner: TileId,
}

/// A FIFO of pending requests in front of a fixed pool of workers.
pub struct RenderQueue {
    workers: Vec<Worker>,
    pending: VecDeque<Entry>,
    stats: QueueStats,
}

impl RenderQueue {
    /// Spawns `workers` compute threads sharing `engine`.
    pub fn new(workers: usize, engine: Arc<dyn PixelEngine>) -> Result<RenderQueue> {
        if workers == 0 {
            return Err(Error::Config("at least one worker is required".to_string()));
        }
        let workers = (0..workers)
            .map(|index| Worker::spawn(index, engine.clone()))
            .collect::<Result<Vec<_>>>()?;
        debug!(workers = workers.len(), "render queue started");
        Ok(RenderQueue {
            workers,
            pending: VecDeque::new(),
            stats: QueueStats::default(),
        })
    }

    /// Appends a request to the tail of the queue.
    pub fn enqueue(&mut self, request: Request, owner: TileId) {
        self.pending.push_back(Entry { request, owner });
    }

    /// Number of requests still waiting for a worker, cancelled ones
    /// included until a tick drops them.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// No requests waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Size of the worker pool.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Workers currently free to take a request.
    pub fn idle_workers(&self) -> usize {
        self.workers.iter().filter(|w| !w.is_busy()).count()
    }

    /// Nothing queued and nothing in flight.
    pub fn is_settled(&self) -> bool {
        self.pending.is_empty() && self.workers.iter().all(|w| !w.is_busy())
    }

    /// Counters since startup.
    pub fn stats(&self) -> QueueStats {
        self.stats
    }

    /// Polls every worker, delivers finished buffers through `sink`,
    /// then dispatches queued requests, oldest first, to idle workers.
    /// Requests whose token is already set are dropped without using a
    /// worker.
    pub fn tick<D: Deliver + ?Sized>(&mut self, sink: &mut D) {
        let mut finished = Vec::new();
        for worker in self.workers.iter_mut() {
            match worker.poll() {
                Poll::NotReady => {}
                Poll::Completed { owner, pixels } => finished.push((owner, pixels)),
                Poll::Discarded { owner } => {
                    trace!(worker = worker.index(), tile = owner.0, "discarded in flight");
                    self.stats.discarded += 1;
                }
            }
        }
        for (owner, pixels) in finished {
            self.stats.completed += 1;
            sink.deliver(owner, pixels, self);
        }
        self.dispatch();
    }

    fn dispatch(&mut self) {
        while !self.pending.is_empty() {
            let worker = match self.workers.iter_mut().find(|w| !w.is_busy()) {
                Some(worker) => worker,
                None => break,
            };
            let entry = match self.pending.pop_front() {
                Some(entry) => entry,
                None => break,
            };
            if entry.request.is_cancelled() {
                trace!(tile = entry.owner.0, "dropped before dispatch");
                self.stats.dropped_queued += 1;
                continue;
            }
            if !worker.submit(entry.request, entry.owner) {
                panic!("idle worker {} refused a request", worker.index());
            }
            self.stats.dispatched += 1;
        }
    }

    #[cfg(test)]
    fn owners(&self) -> Vec<Option<TileId>> {
        self.workers.iter().map(|w| w.owner()).collect()
    }
}
