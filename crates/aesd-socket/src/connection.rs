//! Per-client connection handling
//!
//! Each connection owns its own [`WriteAccumulator`], so a half-sent command
//! from one client never merges with another client's bytes. Socket I/O
//! happens outside the log lock: replies are built from refcounted chunks
//! copied out under the lock and written afterwards.

use std::net::SocketAddr;

use aesd_log::{DeviceRequest, SharedLog, WriteAccumulator};
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::ServerResult;
use crate::protocol::Command;

/// One accepted client
pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    log: SharedLog,
    accumulator: WriteAccumulator,
    read_chunk_size: usize,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: SocketAddr, log: SharedLog, read_chunk_size: usize) -> Self {
        let accumulator = log.accumulator();
        Self {
            stream,
            peer,
            log,
            accumulator,
            read_chunk_size: read_chunk_size.max(1),
        }
    }

    /// Serve the client until it disconnects, fails, or `cancel` fires
    #[instrument(skip_all, fields(peer = %self.peer))]
    pub async fn run(mut self, cancel: CancellationToken) -> ServerResult<()> {
        info!("Accepted connection from {}", self.peer.ip());
        let result = self.serve(&cancel).await;
        if !self.accumulator.is_empty() {
            debug!(
                dropped = self.accumulator.pending_len(),
                "Discarding unterminated command"
            );
        }
        info!("Closed connection from {}", self.peer.ip());
        result
    }

    async fn serve(&mut self, cancel: &CancellationToken) -> ServerResult<()> {
        let mut buf = vec![0u8; self.read_chunk_size];
        loop {
            let n = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                read = self.stream.read(&mut buf) => read?,
            };
            if n == 0 {
                return Ok(());
            }

            if let Some(record) = self.accumulator.append(&buf[..n])? {
                self.handle_record(record).await?;
            }
        }
    }

    /// Act on one complete record and send the reply stream
    async fn handle_record(&mut self, record: Bytes) -> ServerResult<()> {
        let offset = match Command::parse(record) {
            Ok(Command::Append(record)) => {
                let size = record.len();
                if let Some(evicted) = self.log.insert(record) {
                    debug!(evicted = evicted.size(), "Evicted oldest command");
                }
                debug!(size, "Stored command");
                0
            }
            Ok(Command::Seek(request)) => {
                let DeviceRequest::SeekToCommand {
                    index,
                    intra_offset,
                } = request;
                match self
                    .log
                    .find_offset_for_command_index(index as usize, intra_offset as usize)
                {
                    Ok(offset) => {
                        debug!(index, intra_offset, offset, "Seek command resolved");
                        offset
                    }
                    Err(e) => {
                        warn!(index, intra_offset, error = %e, "Rejected seek command");
                        return Ok(());
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Rejected malformed seek command");
                return Ok(());
            }
        };

        for chunk in self.log.contents_from(offset) {
            self.stream.write_all(&chunk).await?;
        }
        self.stream.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use aesd_log::{LogError, StoreConfig};
    use tokio_test::io::Builder;

    use super::*;
    use crate::error::ServerError;

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    async fn serve(log: &SharedLog, stream: tokio_test::io::Mock) -> ServerResult<()> {
        Connection::new(stream, peer(), log.clone(), 1024)
            .run(CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn test_record_is_stored_and_log_echoed() {
        let log = SharedLog::with_capacity(10).unwrap();
        log.insert(Bytes::from_static(b"earlier\n"));

        let stream = Builder::new()
            .read(b"hello\n")
            .write(b"earlier\nhello\n")
            .build();
        serve(&log, stream).await.unwrap();

        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn test_split_record_waits_for_newline() {
        let log = SharedLog::with_capacity(10).unwrap();
        let stream = Builder::new()
            .read(b"hel")
            .read(b"lo\n")
            .read(b"wor")
            .write(b"hello\n")
            .build();
        serve(&log, stream).await.unwrap();

        let entries = log.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].as_slice(), b"hello\n");
    }

    #[tokio::test]
    async fn test_small_read_chunks() {
        let log = SharedLog::with_capacity(10).unwrap();
        let stream = Builder::new().read(b"abcdef\n").write(b"abcdef\n").build();
        Connection::new(stream, peer(), log.clone(), 2)
            .run(CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(log.total_len(), 7);
    }

    #[tokio::test]
    async fn test_seek_command_streams_from_offset() {
        let log = SharedLog::with_capacity(10).unwrap();
        for record in [&b"zero\n"[..], b"one\n", b"two\n"] {
            log.insert(Bytes::copy_from_slice(record));
        }

        let stream = Builder::new()
            .read(b"AESDCHAR_IOCSEEKTO:1,2\n")
            .write(b"e\ntwo\n")
            .build();
        serve(&log, stream).await.unwrap();

        assert_eq!(log.len(), 3);
    }

    #[tokio::test]
    async fn test_out_of_range_seek_sends_nothing() {
        let log = SharedLog::with_capacity(10).unwrap();
        log.insert(Bytes::from_static(b"only\n"));

        let stream = Builder::new()
            .read(b"AESDCHAR_IOCSEEKTO:1,0\n")
            .read(b"AESDCHAR_IOCSEEKTO:0,5\n")
            .read(b"AESDCHAR_IOCSEEKTO:x\n")
            .build();
        serve(&log, stream).await.unwrap();

        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_eviction_over_connection() {
        let log = SharedLog::with_capacity(2).unwrap();
        let stream = Builder::new()
            .read(b"a\n")
            .write(b"a\n")
            .read(b"b\n")
            .write(b"a\nb\n")
            .read(b"c\n")
            .write(b"b\nc\n")
            .build();
        serve(&log, stream).await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_record_ends_connection() {
        let log = SharedLog::new(StoreConfig::with_capacity(4).with_max_record_bytes(4)).unwrap();
        let stream = Builder::new().read(b"abc").read(b"defg\n").build();

        let err = serve(&log, stream).await.unwrap_err();
        assert!(matches!(
            err,
            ServerError::Log(LogError::RecordTooLarge { .. })
        ));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_stops_idle_connection() {
        let log = SharedLog::with_capacity(10).unwrap();
        let (client, server) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(
            Connection::new(server, peer(), log.clone(), 1024).run(cancel.clone()),
        );
        cancel.cancel();
        handle.await.unwrap().unwrap();
        drop(client);
    }
}
