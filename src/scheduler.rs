//! Work distribution with per-key result caching.
//!
//! A *master* stack owns a work partition (N items, one pure per-item
//! function) and a cache-validity decision driven by an explicit scalar key.
//! *Slave* stacks attach to a master and share its partition and cache
//! decision while computing their own output buffer. [`StackScheduler::calculate`]
//! is the synchronization barrier: when it returns, every participating
//! buffer is fully populated, and a key that matches the previously computed
//! one turns the whole call into a cheap no-op. Each distinct key value is
//! computed at most once.

use parking_lot::{Mutex, RwLock};
use std::thread;

use crate::error::MeasureError;

/// Identifier of a registered stack.
pub type StackId = usize;

type ItemFn = Box<dyn Fn(usize, &mut [f64]) + Send + Sync>;
type KeyFn = Box<dyn Fn() -> f64 + Send + Sync>;

struct MasterStack {
    len: usize,
    dim: usize,
    item: ItemFn,
    key: KeyFn,
    cached_key: Mutex<Option<f64>>,
    buffer: RwLock<Vec<f64>>,
    slaves: Vec<StackId>,
}

struct SlaveStack {
    master: StackId,
    dim: usize,
    item: ItemFn,
    buffer: RwLock<Vec<f64>>,
}

enum Stack {
    Master(MasterStack),
    Slave(SlaveStack),
}

/// Thread-based scheduler for per-separation measurement work.
pub struct StackScheduler {
    workers: usize,
    stacks: Vec<Stack>,
}

impl StackScheduler {
    /// Create a scheduler fanning out across `workers` threads.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            stacks: Vec::new(),
        }
    }

    /// Register a master stack of `len` items, each producing `dim` scalars.
    ///
    /// `item` must be a pure function of the linear index (given a fixed flow
    /// state); `key` reads the scalar cache key governing recomputation.
    pub fn add_master_stack(
        &mut self,
        len: usize,
        dim: usize,
        item: impl Fn(usize, &mut [f64]) + Send + Sync + 'static,
        key: impl Fn() -> f64 + Send + Sync + 'static,
    ) -> StackId {
        let id = self.stacks.len();
        self.stacks.push(Stack::Master(MasterStack {
            len,
            dim,
            item: Box::new(item),
            key: Box::new(key),
            cached_key: Mutex::new(None),
            buffer: RwLock::new(vec![0.0; len * dim]),
            slaves: Vec::new(),
        }));
        id
    }

    /// Register a slave stack sharing `master`'s partition and cache
    /// decision, with its own item function and buffer.
    pub fn add_slave_stack(
        &mut self,
        master: StackId,
        dim: usize,
        item: impl Fn(usize, &mut [f64]) + Send + Sync + 'static,
    ) -> Result<StackId, MeasureError> {
        let id = self.stacks.len();
        let len = match self.stacks.get_mut(master) {
            Some(Stack::Master(m)) => {
                m.slaves.push(id);
                m.len
            }
            _ => return Err(MeasureError::UnknownStack(master)),
        };
        self.stacks.push(Stack::Slave(SlaveStack {
            master,
            dim,
            item: Box::new(item),
            buffer: RwLock::new(vec![0.0; len * dim]),
        }));
        Ok(id)
    }

    /// Compute every stack in `ids` whose governing master observes a key
    /// different from its previously computed one. Blocks until all
    /// participating buffers are fully populated.
    pub fn calculate(&self, ids: &[StackId]) -> Result<(), MeasureError> {
        let mut masters: Vec<StackId> = Vec::with_capacity(ids.len());
        for &id in ids {
            let master = match self.stacks.get(id) {
                Some(Stack::Master(_)) => id,
                Some(Stack::Slave(s)) => s.master,
                None => return Err(MeasureError::UnknownStack(id)),
            };
            if !masters.contains(&master) {
                masters.push(master);
            }
        }

        for master_id in masters {
            let master = match &self.stacks[master_id] {
                Stack::Master(m) => m,
                Stack::Slave(_) => unreachable!("resolved to master above"),
            };

            // Holding the key lock for the whole computation makes the
            // recomputation at-most-once per key among concurrent callers.
            let mut cached = master.cached_key.lock();
            let key = (master.key)();
            if *cached == Some(key) {
                continue;
            }

            self.compute(master_id, master);
            *cached = Some(key);
        }
        Ok(())
    }

    /// Read access to a stack's result buffer.
    pub fn with_values<R>(
        &self,
        id: StackId,
        f: impl FnOnce(&[f64]) -> R,
    ) -> Result<R, MeasureError> {
        let buffer = match self.stacks.get(id) {
            Some(Stack::Master(m)) => &m.buffer,
            Some(Stack::Slave(s)) => &s.buffer,
            None => return Err(MeasureError::UnknownStack(id)),
        };
        Ok(f(&buffer.read()))
    }

    fn compute(&self, master_id: StackId, master: &MasterStack) {
        // Participants: the master and every slave attached to it.
        let mut participants: Vec<(StackId, usize, &ItemFn)> =
            vec![(master_id, master.dim, &master.item)];
        for &slave_id in &master.slaves {
            if let Stack::Slave(s) = &self.stacks[slave_id] {
                participants.push((slave_id, s.dim, &s.item));
            }
        }

        let chunk = master.len.div_ceil(self.workers);
        let chunks: Vec<(usize, usize)> = (0..self.workers)
            .map(|worker| {
                let start = (worker * chunk).min(master.len);
                let end = ((worker + 1) * chunk).min(master.len);
                (start, end)
            })
            .filter(|(start, end)| start < end)
            .collect();

        // Workers compute into private scratch buffers; results are merged
        // after the join so the shared buffers are only locked briefly.
        let results: Vec<(usize, Vec<Vec<f64>>)> = thread::scope(|scope| {
            let handles: Vec<_> = chunks
                .iter()
                .map(|&(start, end)| {
                    let participants = &participants;
                    scope.spawn(move || {
                        let mut local: Vec<Vec<f64>> = participants
                            .iter()
                            .map(|&(_, dim, _)| vec![0.0; (end - start) * dim])
                            .collect();
                        for index in start..end {
                            for (slot, &(_, dim, item)) in participants.iter().enumerate() {
                                let offset = (index - start) * dim;
                                item(index, &mut local[slot][offset..offset + dim]);
                            }
                        }
                        (start, local)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        });

        for (start, local) in results {
            for (slot, values) in local.into_iter().enumerate() {
                let (id, dim, _) = participants[slot];
                let buffer = match &self.stacks[id] {
                    Stack::Master(m) => &m.buffer,
                    Stack::Slave(s) => &s.buffer,
                };
                let offset = start * dim;
                buffer.write()[offset..offset + values.len()].copy_from_slice(&values);
            }
        }
    }
}
