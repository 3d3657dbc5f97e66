//! Background task that appends wall-clock timestamps to the log

use std::fmt::Display;
use std::time::Duration;

use aesd_log::SharedLog;
use bytes::Bytes;
use chrono::{DateTime, Local, TimeZone};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

/// RFC 2822 style timestamp format
pub const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %T %z";

/// Render one timestamp record, newline included
pub fn timestamp_record<Tz>(now: &DateTime<Tz>) -> Bytes
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    Bytes::from(format!("timestamp:{}\n", now.format(TIMESTAMP_FORMAT)))
}

/// Periodic timestamp writer
pub struct TimestampTask {
    log: SharedLog,
    interval: Duration,
    cancel: CancellationToken,
}

impl TimestampTask {
    pub fn new(log: SharedLog, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            log,
            interval,
            cancel,
        }
    }

    /// Spawn the task on `tracker`
    pub fn spawn(self, tracker: &TaskTracker) {
        tracker.spawn(self.run());
    }

    /// Append a timestamp every interval until cancelled.
    ///
    /// The first record is written one full interval after start.
    pub async fn run(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Timestamp task started"
        );

        let start = tokio::time::Instant::now() + self.interval;
        let mut interval = tokio::time::interval_at(start, self.interval);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Timestamp task shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let record = timestamp_record(&Local::now());
                    debug!(record = %String::from_utf8_lossy(&record).trim_end(), "Appending timestamp");
                    drop(self.log.insert(record));
                }
            }
        }
    }
}
