use crate::error::Result;
use crate::fetch::Fetcher;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

/// One reading of the target's stats endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    #[serde(default)]
    pub goroutine: u64,
    #[serde(default)]
    pub thread: u64,
    #[serde(default)]
    pub block: u64,
    #[serde(default)]
    pub timestamp: i64,
}

impl StatsSnapshot {
    pub fn parse(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Local time of the reading, if the timestamp is representable
    pub fn taken_at(&self) -> Option<chrono::DateTime<chrono::Local>> {
        chrono::DateTime::from_timestamp(self.timestamp, 0)
            .map(|t| t.with_timezone(&chrono::Local))
    }
}

/// Bounded FIFO of the most recent values
#[derive(Debug, Clone, Default)]
pub struct RollingBuffer {
    values: VecDeque<u64>,
}

impl RollingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: u64, width: usize) {
        self.values.push_back(value);
        self.trim(width);
    }

    pub fn trim(&mut self, width: usize) {
        while self.values.len() > width {
            self.values.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> Option<u64> {
        self.values.back().copied()
    }

    /// Oldest first
    pub fn as_vec(&self) -> Vec<u64> {
        self.values.iter().copied().collect()
    }
}

/// Feeds one rolling buffer per counter from the stats endpoint
pub struct StatsPoller {
    fetcher: Arc<dyn Fetcher>,
    pub goroutines: RollingBuffer,
    pub threads: RollingBuffer,
    pub blocks: RollingBuffer,
    last: Option<StatsSnapshot>,
}

impl StatsPoller {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        StatsPoller {
            fetcher,
            goroutines: RollingBuffer::new(),
            threads: RollingBuffer::new(),
            blocks: RollingBuffer::new(),
            last: None,
        }
    }

    /// Fetch one snapshot and append it; failures are logged and skipped.
    ///
    /// Returns whether a snapshot was appended.
    pub fn poll(&mut self, width: usize) -> bool {
        let snapshot = match self.fetcher.stats().and_then(|b| StatsSnapshot::parse(&b)) {
            Ok(s) => s,
            Err(e) => {
                log::debug!("stats poll skipped: {}", e);
                return false;
            }
        };
        self.goroutines.push(snapshot.goroutine, width);
        self.threads.push(snapshot.thread, width);
        self.blocks.push(snapshot.block, width);
        self.last = Some(snapshot);
        true
    }

    pub fn resize(&mut self, width: usize) {
        self.goroutines.trim(width);
        self.threads.trim(width);
        self.blocks.trim(width);
    }

    pub fn last(&self) -> Option<&StatsSnapshot> {
        self.last.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Mutex;

    struct Replies(Mutex<Vec<Result<Vec<u8>>>>);

    impl Fetcher for Replies {
        fn profile(&self, _kind: &str, _seconds: u64) -> Result<Vec<u8>> {
            unreachable!()
        }

        fn symbols(&self, _addrs: &[u64]) -> Result<String> {
            unreachable!()
        }

        fn stats(&self) -> Result<Vec<u8>> {
            self.0.lock().unwrap().remove(0)
        }
    }

    #[test]
    fn test_parse_snapshot() {
        let body = br#"{"goroutine":12,"thread":5,"block":1,"timestamp":1700000000}"#;
        let s = StatsSnapshot::parse(body).unwrap();
        assert_eq!(s.goroutine, 12);
        assert_eq!(s.thread, 5);
        assert_eq!(s.block, 1);
        assert!(s.taken_at().is_some());
        assert!(StatsSnapshot::parse(b"not json").is_err());
    }

    #[test]
    fn test_buffer_bounded_fifo() {
        let mut buf = RollingBuffer::new();
        for v in 1..=5 {
            buf.push(v, 3);
            assert!(buf.len() <= 3);
        }
        assert_eq!(buf.as_vec(), vec![3, 4, 5]);
        buf.trim(1);
        assert_eq!(buf.as_vec(), vec![5]);
        buf.trim(0);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_poll_skips_failures() {
        let replies = Replies(Mutex::new(vec![
            Ok(br#"{"goroutine":3,"thread":2,"block":0,"timestamp":1}"#.to_vec()),
            Err(Error::Connectivity {
                url: "http://target/debug/pprofstats".into(),
                reason: "refused".into(),
            }),
            Ok(b"{broken".to_vec()),
            Ok(br#"{"goroutine":4,"thread":2,"block":1,"timestamp":2}"#.to_vec()),
        ]));
        let mut poller = StatsPoller::new(Arc::new(replies));
        assert!(poller.poll(10));
        assert!(!poller.poll(10));
        assert!(!poller.poll(10));
        assert!(poller.poll(10));
        assert_eq!(poller.goroutines.as_vec(), vec![3, 4]);
        assert_eq!(poller.blocks.as_vec(), vec![0, 1]);
        assert_eq!(poller.last().map(|s| s.timestamp), Some(2));

        poller.resize(1);
        assert_eq!(poller.threads.as_vec(), vec![2]);
    }
}
