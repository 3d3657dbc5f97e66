//! Fixed-capacity ring of records
//!
//! [`CircularLog`] holds up to `capacity` complete records. Inserting into a
//! full ring evicts the oldest record and hands it back to the caller. The
//! resident records, read oldest first starting at `read_index`, form one
//! logical byte stream that can be addressed by byte offset or by command
//! index.
//!
//! The ring does no locking of its own; see [`SharedLog`](crate::SharedLog).

use bytes::Bytes;
use tracing::trace;

use crate::entry::Entry;
use crate::error::{LogError, LogResult};

/// Circular buffer of variable-length records
#[derive(Debug)]
pub struct CircularLog {
    /// Slot array, fixed length for the lifetime of the log
    slots: Box<[Option<Entry>]>,
    /// Next slot to be written
    write_index: usize,
    /// Slot holding the oldest resident record
    read_index: usize,
    /// Set when every slot is populated
    full: bool,
    /// Sum of resident record sizes
    total_len: u64,
}

impl CircularLog {
    /// Create an empty log with `capacity` slots
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a zero capacity.
    pub fn new(capacity: usize) -> LogResult<Self> {
        if capacity == 0 {
            return Err(LogError::invalid_argument("capacity must be at least 1"));
        }
        let slots = (0..capacity).map(|_| None).collect::<Vec<_>>();
        Ok(Self {
            slots: slots.into_boxed_slice(),
            write_index: 0,
            read_index: 0,
            full: false,
            total_len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of resident records
    pub fn len(&self) -> usize {
        if self.full {
            self.capacity()
        } else {
            (self.write_index + self.capacity() - self.read_index) % self.capacity()
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.full && self.write_index == self.read_index
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Length of the logical stream in bytes
    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    pub fn read_index(&self) -> usize {
        self.read_index
    }

    /// Slot index of the `n`th oldest resident record
    fn slot_of(&self, n: usize) -> usize {
        (self.read_index + n) % self.capacity()
    }

    /// Store a complete record, evicting the oldest one if the ring is full.
    ///
    /// The record is not checked for a trailing newline. At most one entry is
    /// evicted per call and ownership of it passes to the caller.
    pub fn insert(&mut self, record: Bytes) -> Option<Entry> {
        let evicted = if self.full {
            let old = self.slots[self.read_index].take();
            self.read_index = (self.read_index + 1) % self.capacity();
            if let Some(ref entry) = old {
                self.total_len -= entry.size() as u64;
            }
            old
        } else {
            None
        };

        let size = record.len();
        self.slots[self.write_index] = Some(Entry::new(record));
        self.total_len += size as u64;
        self.write_index = (self.write_index + 1) % self.capacity();
        self.full = self.write_index == self.read_index;

        trace!(
            size,
            write_index = self.write_index,
            read_index = self.read_index,
            evicted = evicted.is_some(),
            "Inserted record"
        );
        evicted
    }

    /// Resident records, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Entry> + '_ {
        (0..self.len()).filter_map(move |n| self.slots[self.slot_of(n)].as_ref())
    }

    /// Record at command index `index` (oldest = 0)
    pub fn get(&self, index: usize) -> Option<&Entry> {
        if index >= self.len() {
            return None;
        }
        self.slots[self.slot_of(index)].as_ref()
    }

    /// Translate a byte offset in the logical stream into an entry and the
    /// offset inside it.
    ///
    /// An offset on a record boundary resolves to the start of the later
    /// record. Returns `None` when `byte_offset >= total_len()`.
    pub fn find_entry_for_offset(&self, byte_offset: u64) -> Option<(&Entry, usize)> {
        let mut cumulative = 0u64;
        for entry in self.iter() {
            let before = cumulative;
            cumulative += entry.size() as u64;
            if byte_offset < cumulative {
                return Some((entry, (byte_offset - before) as usize));
            }
        }
        None
    }

    /// Absolute byte offset of byte `intra_offset` of command `index`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `index` is not a resident command or when
    /// `intra_offset` is not inside that command.
    pub fn find_offset_for_command_index(&self, index: usize, intra_offset: usize) -> LogResult<u64> {
        let resident = self.len();
        let Some(target) = self.get(index) else {
            return Err(LogError::invalid_argument(format!(
                "command {index} out of range ({resident} resident)"
            )));
        };
        if intra_offset >= target.size() {
            return Err(LogError::invalid_argument(format!(
                "offset {intra_offset} outside command {index} of {} bytes",
                target.size()
            )));
        }

        let before: u64 = self.iter().take(index).map(|e| e.size() as u64).sum();
        Ok(before + intra_offset as u64)
    }

    /// Remove every resident entry, oldest first, leaving an empty log of the
    /// same capacity.
    pub fn drain(&mut self) -> Vec<Entry> {
        let mut out = Vec::with_capacity(self.len());
        for n in 0..self.len() {
            let slot = self.slot_of(n);
            if let Some(entry) = self.slots[slot].take() {
                out.push(entry);
            }
        }
        self.write_index = 0;
        self.read_index = 0;
        self.full = false;
        self.total_len = 0;
        out
    }

    /// Drop every resident entry
    pub fn reset(&mut self) {
        self.drain();
    }

    /// Verify the structural invariants of the ring.
    ///
    /// Used by tests after arbitrary operation sequences.
    pub fn check_invariants(&self) -> Result<(), String> {
        let cap = self.capacity();
        if self.write_index >= cap || self.read_index >= cap {
            return Err(format!(
                "index out of range: write={} read={} cap={cap}",
                self.write_index, self.read_index
            ));
        }
        if self.full && self.write_index != self.read_index {
            return Err("full flag set with write != read".into());
        }

        let len = self.len();
        let mut total = 0u64;
        for n in 0..cap {
            let populated = self.slots[self.slot_of(n)].is_some();
            if n < len && !populated {
                return Err(format!("resident slot {} is empty", self.slot_of(n)));
            }
            if n >= len && populated {
                return Err(format!("free slot {} is populated", self.slot_of(n)));
            }
            if let Some(entry) = &self.slots[self.slot_of(n)] {
                total += entry.size() as u64;
            }
        }
        if total != self.total_len {
            return Err(format!("total_len {} != sum {total}", self.total_len));
        }
        Ok(())
    }
}
