//! Fixed-size group of cooperating workers with collective exchange.
//!
//! A [`WorkerGroup`] owns a dedicated rayon pool with one thread per rank.
//! [`WorkerGroup::run`] starts the same closure on every rank; the ranks
//! then talk only through the collectives on [`Communicator`]:
//!
//! - **scatter**: the coordinator hands each rank its slice of a buffer
//! - **gather**: every rank sends a slice back to the coordinator
//! - **broadcast**: the coordinator's buffer replaces everyone's copy
//! - **agree**: every rank votes on a local result
//!
//! Every collective is a group-wide barrier and ends with a vote, so a
//! failure on any rank makes the call fail on all of them. No rank can
//! run ahead while a peer aborts.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Barrier;

use parking_lot::RwLock;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{Error, Result};

/// Rank of the coordinator.
pub const ROOT: usize = 0;

pub struct WorkerGroup {
    pool: ThreadPool,
    size: usize,
}

impl WorkerGroup {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::WorkerGroup("worker group needs at least one rank".into()));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|rank| format!("stencil-rank-{rank}"))
            .build()
            .map_err(|e| Error::WorkerGroup(e.to_string()))?;
        Ok(Self { pool, size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `f` once on every rank and collect the results in rank order.
    ///
    /// `f` must call the same collectives in the same order on every rank.
    pub fn run<F, R>(&self, f: F) -> Vec<R>
    where
        F: Fn(&Communicator<'_>) -> R + Sync,
        R: Send,
    {
        let shared = Shared::new(self.size);
        self.pool.broadcast(|ctx| {
            let comm = Communicator {
                rank: ctx.index(),
                shared: &shared,
            };
            f(&comm)
        })
    }
}

struct Shared {
    size: usize,
    barrier: Barrier,
    slots: Vec<RwLock<Vec<u8>>>,
    votes: Vec<AtomicBool>,
}

impl Shared {
    fn new(size: usize) -> Self {
        Self {
            size,
            barrier: Barrier::new(size),
            slots: (0..size).map(|_| RwLock::new(Vec::new())).collect(),
            votes: (0..size).map(|_| AtomicBool::new(true)).collect(),
        }
    }
}

/// One rank's handle onto the group.
pub struct Communicator<'a> {
    rank: usize,
    shared: &'a Shared,
}

impl Communicator<'_> {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.shared.size
    }

    pub fn is_root(&self) -> bool {
        self.rank == ROOT
    }

    /// Block until every rank has reached this point.
    pub fn barrier(&self) {
        self.shared.barrier.wait();
    }

    /// Vote on a local result. Returns `Ok` only if every rank passed `Ok`.
    pub fn agree<T>(&self, local: Result<T>) -> Result<T> {
        self.round("agree", || local)
    }

    /// Coordinator splits `send` by `ranges`; rank `i` receives
    /// `send[ranges[i]]` into `recv`. `send` is ignored on other ranks.
    pub fn scatter(&self, send: &[u8], ranges: &[Range<usize>], recv: &mut [u8]) -> Result<()> {
        if self.is_root() {
            for (rank, slot) in self.shared.slots.iter().enumerate() {
                let mut slot = slot.write();
                slot.clear();
                if let Some(part) = ranges.get(rank).and_then(|r| send.get(r.clone())) {
                    slot.extend_from_slice(part);
                }
            }
        }

        self.round("scatter", || {
            self.check_ranges(ranges)?;
            let slot = self.shared.slots[self.rank].read();
            copy_exact(&slot, recv, "scatter")
        })
    }

    /// Every rank sends `send`; the coordinator writes rank `i`'s data into
    /// `recv[ranges[i]]`. `recv` is ignored on other ranks.
    pub fn gather(&self, send: &[u8], ranges: &[Range<usize>], recv: &mut [u8]) -> Result<()> {
        {
            let mut slot = self.shared.slots[self.rank].write();
            slot.clear();
            slot.extend_from_slice(send);
        }

        self.round("gather", || {
            self.check_ranges(ranges)?;
            if !self.is_root() {
                return Ok(());
            }
            let total = recv.len();
            for (rank, (slot, range)) in self.shared.slots.iter().zip(ranges).enumerate() {
                let dst = recv.get_mut(range.clone()).ok_or_else(|| {
                    Error::InvalidPartition(format!(
                        "gather range {range:?} of rank {rank} exceeds buffer of {total} bytes"
                    ))
                })?;
                copy_exact(&slot.read(), dst, "gather")?;
            }
            Ok(())
        })
    }

    /// Replace `buf` on every rank with the coordinator's `buf`.
    pub fn broadcast(&self, buf: &mut [u8]) -> Result<()> {
        if self.is_root() {
            let mut slot = self.shared.slots[ROOT].write();
            slot.clear();
            slot.extend_from_slice(buf);
        }

        self.round("broadcast", || {
            if self.is_root() {
                return Ok(());
            }
            copy_exact(&self.shared.slots[ROOT].read(), buf, "broadcast")
        })
    }

    /// Shared tail of every collective: wait for all writes, read, vote,
    /// then wait until every vote has been read so slots and votes can be
    /// reused by the next call.
    fn round<T>(&self, op: &str, read: impl FnOnce() -> Result<T>) -> Result<T> {
        let shared = self.shared;
        shared.barrier.wait();

        let local = read();
        shared.votes[self.rank].store(local.is_ok(), Ordering::SeqCst);
        shared.barrier.wait();

        let failed = shared
            .votes
            .iter()
            .position(|vote| !vote.load(Ordering::SeqCst));
        shared.barrier.wait();

        match (local, failed) {
            (Err(e), _) => Err(e),
            (Ok(value), None) => Ok(value),
            (Ok(_), Some(rank)) => Err(Error::WorkerGroup(format!(
                "rank {rank} failed during {op}, rank {} aborting",
                self.rank
            ))),
        }
    }

    fn check_ranges(&self, ranges: &[Range<usize>]) -> Result<()> {
        if ranges.len() != self.shared.size {
            return Err(Error::InvalidPartition(format!(
                "{} ranges for a group of {}",
                ranges.len(),
                self.shared.size
            )));
        }
        Ok(())
    }
}

fn copy_exact(src: &[u8], dst: &mut [u8], op: &str) -> Result<()> {
    if src.len() != dst.len() {
        return Err(Error::InvalidPartition(format!(
            "{op} delivered {} bytes into a buffer of {}",
            src.len(),
            dst.len()
        )));
    }
    dst.copy_from_slice(src);
    Ok(())
}
