//! # AESD Socket
//!
//! TCP front-end for the AESD command log.
//!
//! Clients send newline-terminated packets. Each complete packet is appended
//! to a bounded [`SharedLog`](aesd_log::SharedLog) and the whole log is
//! streamed back. The control packet `AESDCHAR_IOCSEEKTO:X,Y\n` is not
//! stored; the reply starts at byte `Y` of command `X` instead.
//!
//! ## Example
//!
//! ```rust,ignore
//! use aesd_socket::{Server, ServerConfig};
//!
//! let server = Server::bind(ServerConfig::default()).await?;
//! server.run().await?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod server;
pub mod timestamp;

pub use config::{Cli, ServerConfig};
pub use connection::Connection;
pub use error::{ServerError, ServerResult};
pub use protocol::{Command, SEEK_COMMAND_PREFIX};
pub use server::{Server, shutdown_signal};
pub use timestamp::{TIMESTAMP_FORMAT, TimestampTask, timestamp_record};
