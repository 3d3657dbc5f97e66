//! Shared, lock-guarded access to a [`CircularLog`]
//!
//! [`SharedLog`] is the one handle every front-end holds. A single
//! `parking_lot::Mutex` serializes inserts and both lookups. The lock is held
//! only across the in-memory state transition; copying bytes out to a
//! transport, and releasing evicted records, happens after the guard is gone.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::accumulator::WriteAccumulator;
use crate::circular::CircularLog;
use crate::config::StoreConfig;
use crate::entry::Entry;
use crate::error::LogResult;

/// Cloneable handle to one log store
#[derive(Debug, Clone)]
pub struct SharedLog {
    inner: Arc<Mutex<CircularLog>>,
    config: StoreConfig,
}

impl SharedLog {
    /// Build an empty store from `config`
    pub fn new(config: StoreConfig) -> LogResult<Self> {
        config.validate()?;
        let log = CircularLog::new(config.capacity)?;
        debug!(
            capacity = config.capacity,
            max_record_bytes = config.max_record_bytes,
            "Created log store"
        );
        Ok(Self {
            inner: Arc::new(Mutex::new(log)),
            config,
        })
    }

    /// Build an empty store with `capacity` slots and default limits
    pub fn with_capacity(capacity: usize) -> LogResult<Self> {
        Self::new(StoreConfig::with_capacity(capacity))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// A fresh accumulator sized for this store's record cap
    pub fn accumulator(&self) -> WriteAccumulator {
        WriteAccumulator::new(self.config.max_record_bytes)
    }

    /// Insert a complete record, returning the evicted entry if any.
    ///
    /// The returned entry is owned by the caller and released when dropped,
    /// outside the lock.
    pub fn insert(&self, record: Bytes) -> Option<Entry> {
        self.inner.lock().insert(record)
    }

    /// Feed raw bytes through `acc` and store the record they complete.
    ///
    /// Accumulation runs without the lock; only the flush into the ring takes
    /// it. Returns the stored record.
    pub fn commit(&self, acc: &mut WriteAccumulator, data: &[u8]) -> LogResult<Option<Bytes>> {
        let Some(record) = acc.append(data)? else {
            return Ok(None);
        };
        let evicted = self.insert(record.clone());
        if let Some(old) = evicted {
            debug!(size = old.size(), "Evicted oldest command");
        }
        Ok(Some(record))
    }

    /// Up to `max` bytes starting at `offset`, taken from a single entry.
    ///
    /// Returns `None` at or past the end of the stream.
    pub fn read_at(&self, offset: u64, max: usize) -> Option<Bytes> {
        let log = self.inner.lock();
        let (entry, within) = log.find_entry_for_offset(offset)?;
        let chunk = entry.slice_from(within, max);
        trace!(offset, within, len = chunk.len(), "Read chunk");
        Some(chunk)
    }

    /// The logical stream from `offset` to the end, as refcounted chunks
    pub fn contents_from(&self, offset: u64) -> Vec<Bytes> {
        let log = self.inner.lock();
        let mut chunks = Vec::with_capacity(log.len());
        let mut cumulative = 0u64;
        for entry in log.iter() {
            let end = cumulative + entry.size() as u64;
            if offset < end {
                let within = offset.saturating_sub(cumulative) as usize;
                chunks.push(entry.slice_from(within, entry.size()));
            }
            cumulative = end;
        }
        chunks
    }

    /// Clone of every resident entry, oldest first
    pub fn snapshot(&self) -> Vec<Entry> {
        self.inner.lock().iter().cloned().collect()
    }

    /// Translate `(index, intra_offset)` into an absolute byte offset
    pub fn find_offset_for_command_index(&self, index: usize, intra_offset: usize) -> LogResult<u64> {
        self.inner
            .lock()
            .find_offset_for_command_index(index, intra_offset)
    }

    /// Run `f` against the ring while holding the lock.
    ///
    /// `f` must not block or call back into this handle.
    pub fn inspect<R>(&self, f: impl FnOnce(&CircularLog) -> R) -> R {
        f(&*self.inner.lock())
    }

    pub fn total_len(&self) -> u64 {
        self.inner.lock().total_len()
    }

    /// Number of resident commands
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Release every resident entry, leaving the store empty.
    ///
    /// Returns how many entries were released.
    pub fn teardown(&self) -> usize {
        let drained = self.inner.lock().drain();
        let released = drained.len();
        drop(drained);
        debug!(released, "Tore down log store");
        released
    }
}
