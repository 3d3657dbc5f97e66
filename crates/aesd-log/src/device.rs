//! File-like access to a [`SharedLog`]
//!
//! A [`DeviceHandle`] is one open context on the log, the way an open file is
//! one context on a character device: it carries its own file position and
//! its own write accumulator, and shares the store with every other handle.
//!
//! Besides plain byte seeking it supports the out-of-band
//! [`DeviceRequest::SeekToCommand`] request, which positions the handle at a
//! byte inside a given resident command.

use std::io::{self, SeekFrom};

use tracing::{debug, trace};

use crate::accumulator::WriteAccumulator;
use crate::error::{LogError, LogResult};
use crate::shared::SharedLog;

/// Out-of-band requests understood by [`DeviceHandle::ioctl`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRequest {
    /// Position at byte `intra_offset` of command `index` (oldest = 0)
    SeekToCommand { index: u32, intra_offset: u32 },
}

/// Either kind of seek a handle accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekRequest {
    /// Seek in the logical byte stream
    Byte(SeekFrom),
    /// Seek to a byte inside a resident command
    Command { index: usize, intra_offset: usize },
}

impl From<DeviceRequest> for SeekRequest {
    fn from(request: DeviceRequest) -> Self {
        match request {
            DeviceRequest::SeekToCommand {
                index,
                intra_offset,
            } => SeekRequest::Command {
                index: index as usize,
                intra_offset: intra_offset as usize,
            },
        }
    }
}

/// One open context on a shared log
#[derive(Debug)]
pub struct DeviceHandle {
    log: SharedLog,
    position: u64,
    accumulator: WriteAccumulator,
}

impl DeviceHandle {
    /// Open a new context positioned at the start of the stream
    pub fn open(log: &SharedLog) -> Self {
        trace!("open");
        Self {
            log: log.clone(),
            position: 0,
            accumulator: log.accumulator(),
        }
    }

    /// Current file position
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes written on this handle that have not yet formed a record
    pub fn pending(&self) -> &[u8] {
        self.accumulator.pending()
    }

    /// Copy bytes from the entry at the current position into `buf`.
    ///
    /// A single call never spans two records. Returns 0 at end of stream.
    pub fn read(&mut self, buf: &mut [u8]) -> LogResult<usize> {
        trace!(count = buf.len(), offset = self.position, "read");
        if buf.is_empty() {
            return Ok(0);
        }
        let Some(chunk) = self.log.read_at(self.position, buf.len()) else {
            return Ok(0);
        };
        buf[..chunk.len()].copy_from_slice(&chunk);
        self.position += chunk.len() as u64;
        Ok(chunk.len())
    }

    /// Accept `data`, storing a record once a newline arrives.
    ///
    /// Returns the number of bytes accepted, which is all of `data` on
    /// success.
    pub fn write(&mut self, data: &[u8]) -> LogResult<usize> {
        trace!(count = data.len(), offset = self.position, "write");
        if let Some(record) = self.log.commit(&mut self.accumulator, data)? {
            debug!(size = record.len(), "Stored command");
        }
        Ok(data.len())
    }

    /// Seek in the logical stream, bounded by its current length.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the target lies before 0 or after the end.
    pub fn llseek(&mut self, pos: SeekFrom) -> LogResult<u64> {
        let size = self.log.total_len();
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(delta) => i128::from(self.position) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(size) + i128::from(delta),
        };
        if target < 0 || target > i128::from(size) {
            return Err(LogError::invalid_argument(format!(
                "seek target {target} outside [0, {size}]"
            )));
        }
        self.position = target as u64;
        Ok(self.position)
    }

    /// Handle an out-of-band request, returning the new position
    pub fn ioctl(&mut self, request: DeviceRequest) -> LogResult<u64> {
        self.seek(request.into())
    }

    /// Resolve either seek kind and move the position
    pub fn seek(&mut self, request: SeekRequest) -> LogResult<u64> {
        match request {
            SeekRequest::Byte(pos) => self.llseek(pos),
            SeekRequest::Command {
                index,
                intra_offset,
            } => {
                let offset = self.log.find_offset_for_command_index(index, intra_offset)?;
                debug!(index, intra_offset, offset, "Seek to command");
                self.position = offset;
                Ok(offset)
            }
        }
    }

    /// Close the handle, discarding any partial record
    pub fn release(self) {}
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        if !self.accumulator.is_empty() {
            debug!(
                discarded = self.accumulator.pending_len(),
                "release with partial record"
            );
        }
        trace!("release");
    }
}

impl From<LogError> for io::Error {
    fn from(err: LogError) -> Self {
        let kind = match err {
            LogError::NotFound => io::ErrorKind::NotFound,
            LogError::InvalidArgument(_) | LogError::Config(_) => io::ErrorKind::InvalidInput,
            LogError::ResourceExhaustion(_) => io::ErrorKind::OutOfMemory,
            LogError::RecordTooLarge { .. } => io::ErrorKind::FileTooLarge,
        };
        io::Error::new(kind, err)
    }
}

impl io::Read for DeviceHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(DeviceHandle::read(self, buf)?)
    }
}

impl io::Write for DeviceHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(DeviceHandle::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for DeviceHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.llseek(pos)?)
    }
}
