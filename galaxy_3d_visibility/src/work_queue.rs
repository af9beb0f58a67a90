/// Work queue - synchronous fan-out/fan-in over short data-parallel items.
///
/// Callers split their data into disjoint chunks, build one item per chunk
/// and block in `complete()` until every item has run. Items may borrow from
/// the caller's stack.

use crate::error::{Error, Result};

/// A unit of work borrowing data for `'a`
pub type WorkItem<'a> = Box<dyn FnOnce() + Send + 'a>;

/// Thread pool abstraction injected into the octree and the view
pub trait WorkQueue: Send + Sync {
    /// Number of worker threads (the calling thread not included)
    fn num_threads(&self) -> usize;

    /// Run all items and return once every one of them has finished
    fn complete<'a>(&self, items: Vec<WorkItem<'a>>);
}

/// Runs every item on the calling thread, in order
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialWorkQueue;

impl WorkQueue for SerialWorkQueue {
    fn num_threads(&self) -> usize {
        0
    }

    fn complete<'a>(&self, items: Vec<WorkItem<'a>>) {
        for item in items {
            item();
        }
    }
}

/// Work queue backed by a dedicated rayon thread pool
pub struct RayonWorkQueue {
    pool: rayon::ThreadPool,
}

impl RayonWorkQueue {
    /// Create a pool with `num_threads` workers (0 lets rayon pick one per core)
    pub fn new(num_threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|index| format!("galaxy3d-worker-{}", index))
            .build()
            .map_err(|err| {
                crate::engine_error!("galaxy3d::WorkQueue", "Failed to create worker pool: {}", err);
                Error::InitializationFailed(format!("worker pool: {}", err))
            })?;

        crate::engine_info!(
            "galaxy3d::WorkQueue",
            "Worker pool created with {} threads",
            pool.current_num_threads()
        );
        Ok(Self { pool })
    }
}

impl WorkQueue for RayonWorkQueue {
    fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn complete<'a>(&self, items: Vec<WorkItem<'a>>) {
        if items.len() <= 1 {
            for item in items {
                item();
            }
            return;
        }

        self.pool.scope(|scope| {
            for item in items {
                scope.spawn(move |_| item());
            }
        });
    }
}

/// Split `len` elements into at most `num_threads + 1` contiguous ranges.
///
/// Every range but the last holds `len / (num_threads + 1)` elements (at
/// least one); the last takes the remainder.
pub fn partition(len: usize, num_threads: usize) -> Vec<std::ops::Range<usize>> {
    let num_items = num_threads + 1;
    let per_item = (len / num_items).max(1);
    let mut ranges = Vec::with_capacity(num_items);
    let mut start = 0;

    for i in 0..num_items {
        if start >= len {
            break;
        }
        let end = if i < num_items - 1 { (start + per_item).min(len) } else { len };
        ranges.push(start..end);
        start = end;
    }
    ranges
}

#[cfg(test)]
#[path = "work_queue_tests.rs"]
mod tests;
