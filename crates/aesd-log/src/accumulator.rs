use bytes::Bytes;
use tracing::{trace, warn};

use crate::error::{LogError, LogResult};

/// Write accumulator assembling partial writes into complete records.
///
/// Each writer context (an open device handle, a socket connection) owns one.
/// Bytes are buffered until a write contains a newline; the pending bytes up
/// to and including that newline are then returned as one record and the
/// buffer starts over. Bytes that follow the newline in the same write are
/// not carried into the next record.
#[derive(Debug)]
pub struct WriteAccumulator {
    pending: Vec<u8>,
    max_pending: usize,
}

impl WriteAccumulator {
    pub fn new(max_pending: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_pending,
        }
    }

    /// Append `data`, returning the completed record if `data` holds a newline.
    ///
    /// # Errors
    ///
    /// `RecordTooLarge` if the pending bytes would grow past the cap, and
    /// `ResourceExhaustion` if the buffer cannot grow. The pending buffer is
    /// unchanged in both cases.
    pub fn append(&mut self, data: &[u8]) -> LogResult<Option<Bytes>> {
        let newline = data.iter().position(|&b| b == b'\n');
        // Only the bytes through the newline ever reach the pending buffer.
        let take = newline.map_or(data.len(), |pos| pos + 1);

        if self.pending.len() + take > self.max_pending {
            return Err(LogError::RecordTooLarge {
                pending: self.pending.len(),
                incoming: take,
                limit: self.max_pending,
            });
        }
        self.pending.try_reserve(take)?;
        self.pending.extend_from_slice(&data[..take]);

        let Some(pos) = newline else {
            trace!(pending = self.pending.len(), "Partial write, waiting for newline");
            return Ok(None);
        };

        let dropped = data.len() - (pos + 1);
        if dropped > 0 {
            warn!(dropped, "Discarding bytes after newline in the same write");
        }
        let record = Bytes::from(std::mem::take(&mut self.pending));
        trace!(size = record.len(), "Completed record");
        Ok(Some(record))
    }

    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn max_pending(&self) -> usize {
        self.max_pending
    }

    /// Discard any partial record
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_writes_assemble_record() {
        let mut acc = WriteAccumulator::new(1024);
        assert_eq!(acc.append(b"hel").unwrap(), None);
        assert_eq!(acc.pending(), b"hel");

        let record = acc.append(b"lo\n").unwrap().unwrap();
        assert_eq!(&record[..], b"hello\n");
        assert!(acc.is_empty());

        assert_eq!(acc.append(b"wor").unwrap(), None);
        assert_eq!(acc.pending(), b"wor");
    }

    #[test]
    fn test_single_complete_write() {
        let mut acc = WriteAccumulator::new(64);
        let record = acc.append(b"ping\n").unwrap().unwrap();
        assert_eq!(&record[..], b"ping\n");
        assert_eq!(acc.pending_len(), 0);
    }

    #[test]
    fn test_bytes_after_newline_are_dropped() {
        let mut acc = WriteAccumulator::new(64);
        let record = acc.append(b"first\nsecond").unwrap().unwrap();
        assert_eq!(&record[..], b"first\n");
        assert!(acc.is_empty());
    }

    #[test]
    fn test_too_large_keeps_pending() {
        let mut acc = WriteAccumulator::new(8);
        acc.append(b"12345").unwrap();
        let err = acc.append(b"6789").unwrap_err();
        assert!(matches!(
            err,
            LogError::RecordTooLarge {
                pending: 5,
                incoming: 4,
                limit: 8
            }
        ));
        assert_eq!(acc.pending(), b"12345");

        // A write that fits still completes the record
        let record = acc.append(b"67\n").unwrap().unwrap();
        assert_eq!(&record[..], b"1234567\n");
    }

    #[test]
    fn test_cap_counts_only_bytes_through_newline() {
        let mut acc = WriteAccumulator::new(4);
        let record = acc.append(b"abc\ntrailing-junk").unwrap().unwrap();
        assert_eq!(&record[..], b"abc\n");
    }

    #[test]
    fn test_clear_discards_partial() {
        let mut acc = WriteAccumulator::new(16);
        acc.append(b"partial").unwrap();
        acc.clear();
        assert!(acc.is_empty());
        let record = acc.append(b"x\n").unwrap().unwrap();
        assert_eq!(&record[..], b"x\n");
    }
}
