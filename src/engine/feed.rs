use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// One notification to be mailed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Nanoseconds since the Unix epoch.
    #[serde(rename = "timestamp")]
    pub timestamp_nanos: i64,
    #[serde(default)]
    pub severity: i32,
    #[serde(default)]
    pub logger: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub payload: String,
}

impl NotificationRecord {
    /// Empty the record for reuse, keeping its allocations.
    pub fn clear(&mut self) {
        self.timestamp_nanos = 0;
        self.severity = 0;
        self.logger.clear();
        self.hostname.clear();
        self.payload.clear();
    }
}

/// Blocking source of notification records.
///
/// Every record obtained from [`recv`](Self::recv) is handed back through
/// [`recycle`](Self::recycle) once the consumer is done with it.
pub trait NotificationFeed {
    /// Next record, or `None` once the feed is closed.
    fn recv(&mut self) -> Option<NotificationRecord>;

    fn recycle(&mut self, record: NotificationRecord);
}

/// Channel-backed feed with a pool of reusable records.
#[derive(Debug)]
pub struct ChannelFeed {
    records: Receiver<NotificationRecord>,
    pool: Sender<NotificationRecord>,
}

/// Producer half of a [`ChannelFeed`].
#[derive(Debug)]
pub struct FeedSender {
    records: SyncSender<NotificationRecord>,
    pool: Receiver<NotificationRecord>,
}

impl ChannelFeed {
    /// A feed holding at most `capacity` undelivered records.
    pub fn bounded(capacity: usize) -> (FeedSender, ChannelFeed) {
        let (record_tx, record_rx) = mpsc::sync_channel(capacity);
        let (pool_tx, pool_rx) = mpsc::channel();
        (
            FeedSender {
                records: record_tx,
                pool: pool_rx,
            },
            ChannelFeed {
                records: record_rx,
                pool: pool_tx,
            },
        )
    }
}

impl NotificationFeed for ChannelFeed {
    fn recv(&mut self) -> Option<NotificationRecord> {
        self.records.recv().ok()
    }

    fn recycle(&mut self, mut record: NotificationRecord) {
        record.clear();
        // The producer may already be gone; the record is simply dropped then.
        let _ = self.pool.send(record);
    }
}

impl FeedSender {
    /// A cleared record from the pool, or a fresh one when the pool is empty.
    pub fn acquire(&self) -> NotificationRecord {
        self.pool.try_recv().unwrap_or_default()
    }

    /// Queue `record`, blocking while the feed is full. Gives the record back
    /// when the consumer has hung up.
    pub fn send(&self, record: NotificationRecord) -> Result<(), NotificationRecord> {
        self.records.send(record).map_err(|err| err.0)
    }
}

/// Feed reading one JSON record per line, e.g. from standard input.
///
/// Blank lines are ignored and malformed lines are logged and skipped; a read
/// error ends the feed.
#[derive(Debug)]
pub struct JsonLinesFeed<R> {
    reader: R,
    line: String,
    line_no: u64,
    skipped: u64,
}

impl<R: BufRead> JsonLinesFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
            skipped: 0,
        }
    }

    /// Lines that could not be parsed so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<R: BufRead> NotificationFeed for JsonLinesFeed<R> {
    fn recv(&mut self) -> Option<NotificationRecord> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(err) => {
                    error!(line = self.line_no + 1, error = %err, "reading notification feed failed");
                    return None;
                }
            }
            self.line_no += 1;
            let text = self.line.trim();
            if text.is_empty() {
                continue;
            }
            match serde_json::from_str(text) {
                Ok(record) => return Some(record),
                Err(err) => {
                    self.skipped += 1;
                    warn!(line = self.line_no, error = %err, "skipping malformed notification record");
                }
            }
        }
    }

    fn recycle(&mut self, _record: NotificationRecord) {}
}
