//! Sliding admission window for the uploads of one directory.
//!
//! Uploads are plain futures driven from the caller's task through a
//! [`FuturesUnordered`]; nothing is spawned. [`ConcurrencyScheduler::submit`]
//! only returns once the new future has a slot, so the order of `submit` calls is
//! the order in which uploads are first polled.

use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::trace;

pub struct ConcurrencyScheduler<F: Future> {
    limit: usize,
    in_flight: FuturesUnordered<F>,
    finished: Vec<F::Output>,
}

impl<F: Future> ConcurrencyScheduler<F> {
    /// A `limit` of zero is treated as one.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            in_flight: FuturesUnordered::new(),
            finished: Vec::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Uploads admitted and not yet in a terminal state.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Admit `upload`, first driving in-flight uploads until a slot frees up.
    pub async fn submit(&mut self, upload: F) {
        while self.in_flight.len() >= self.limit {
            trace!(limit = self.limit, "[SCHED] Window full, waiting for a slot");
            match self.in_flight.next().await {
                Some(output) => self.finished.push(output),
                None => break,
            }
        }
        self.in_flight.push(upload);
    }

    /// Wait for every admitted upload and return their outputs in completion order.
    pub async fn drain(mut self) -> Vec<F::Output> {
        while let Some(output) = self.in_flight.next().await {
            self.finished.push(output);
        }
        self.finished
    }
}
