//! Classification of received records
//!
//! A record is either data to append to the log or the seek control command
//! `AESDCHAR_IOCSEEKTO:X,Y\n`, which positions the reply stream at byte `Y`
//! of command `X` and is never stored.

use aesd_log::DeviceRequest;
use bytes::Bytes;

use crate::error::{ServerError, ServerResult};

/// Prefix identifying the seek control command
pub const SEEK_COMMAND_PREFIX: &[u8] = b"AESDCHAR_IOCSEEKTO:";

/// What a complete record asks the server to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store the record and echo the whole log
    Append(Bytes),
    /// Echo the log starting at the translated offset
    Seek(DeviceRequest),
}

impl Command {
    /// Classify one newline-terminated record.
    ///
    /// Records starting with [`SEEK_COMMAND_PREFIX`] must carry two decimal
    /// `u32` values separated by a comma; anything else is a protocol error.
    pub fn parse(record: Bytes) -> ServerResult<Self> {
        if !record.starts_with(SEEK_COMMAND_PREFIX) {
            return Ok(Command::Append(record));
        }

        let args = std::str::from_utf8(&record[SEEK_COMMAND_PREFIX.len()..])
            .map_err(|_| ServerError::protocol("seek arguments are not UTF-8"))?
            .trim_end_matches(['\n', '\r']);
        let (index, intra_offset) = args
            .split_once(',')
            .ok_or_else(|| ServerError::protocol(format!("expected X,Y, got {args:?}")))?;

        let index = parse_u32(index, "command index")?;
        let intra_offset = parse_u32(intra_offset, "intra-command offset")?;
        Ok(Command::Seek(DeviceRequest::SeekToCommand {
            index,
            intra_offset,
        }))
    }
}

fn parse_u32(field: &str, what: &str) -> ServerResult<u32> {
    field
        .trim()
        .parse()
        .map_err(|e| ServerError::protocol(format!("invalid {what} {field:?}: {e}")))
}
