//! # AESD Log
//!
//! A bounded, append-only log of newline-terminated records ("commands").
//!
//! The log keeps at most `capacity` records in a circular buffer. Writing a
//! new record into a full buffer evicts the oldest one. The resident records,
//! oldest first, read as one continuous byte stream that can be addressed
//! either by byte offset or by `(command index, offset within command)`.
//!
//! ## Features
//!
//! - **CircularLog**: the ring itself, with offset and command-index lookups
//! - **WriteAccumulator**: per-writer buffer turning partial writes into records
//! - **SharedLog**: the single-lock handle front-ends share
//! - **DeviceHandle**: file-like open context with read, write, llseek and ioctl
//!
//! ## Example
//!
//! ```rust
//! use std::io::SeekFrom;
//! use aesd_log::{DeviceHandle, DeviceRequest, SharedLog};
//!
//! let log = SharedLog::with_capacity(10).unwrap();
//! let mut dev = DeviceHandle::open(&log);
//!
//! dev.write(b"first command\n").unwrap();
//! dev.write(b"second ").unwrap();
//! dev.write(b"command\n").unwrap();
//! assert_eq!(log.len(), 2);
//!
//! // Jump to byte 7 of the second command
//! let pos = dev
//!     .ioctl(DeviceRequest::SeekToCommand { index: 1, intra_offset: 7 })
//!     .unwrap();
//! assert_eq!(pos, 21);
//!
//! let mut buf = [0u8; 32];
//! let n = dev.read(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"command\n");
//!
//! assert_eq!(dev.llseek(SeekFrom::End(0)).unwrap(), log.total_len());
//! ```

pub mod accumulator;
pub mod circular;
pub mod config;
pub mod device;
pub mod entry;
pub mod error;
pub mod shared;

// Re-exports
pub use accumulator::WriteAccumulator;
pub use circular::CircularLog;
pub use config::{DEFAULT_CAPACITY, DEFAULT_MAX_RECORD_BYTES, StoreConfig};
pub use device::{DeviceHandle, DeviceRequest, SeekRequest};
pub use entry::Entry;
pub use error::{LogError, LogResult};
pub use shared::SharedLog;
