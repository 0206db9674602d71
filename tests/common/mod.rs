#![allow(dead_code)]

use gom::error::{Error, Result};
use gom::fetch::Fetcher;
use gom::profile::proto;
use gom::report::GraphLayout;
use gom::store::Registry;
use gom::symbols::NoSymbolizer;
use prost::Message;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub const STATS_BODY: &str = r#"{"goroutine":12,"thread":6,"block":1,"timestamp":1700000000}"#;

/// In-memory target serving a fixed heap profile
pub struct StubTarget {
    fetches: AtomicUsize,
    pub fail: AtomicBool,
    delay: Duration,
}

impl StubTarget {
    pub fn new() -> Arc<Self> {
        Self::slow(Duration::ZERO)
    }

    /// Every profile retrieval takes `delay`
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(StubTarget {
            fetches: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            delay,
        })
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

impl Fetcher for StubTarget {
    fn profile(&self, _kind: &str, _seconds: u64) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Connectivity {
                url: "http://stub/debug/pprof".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(heap_profile())
    }

    fn symbols(&self, _addrs: &[u64]) -> Result<String> {
        Ok(String::new())
    }

    fn stats(&self) -> Result<Vec<u8>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Status {
                url: "http://stub/debug/pprofstats".to_string(),
                status: 404,
                body: "not found".to_string(),
            });
        }
        Ok(STATS_BODY.as_bytes().to_vec())
    }
}

/// Heap profile with three call paths:
///
/// main.main -> main.encode -> bytes.Grow  (5 MB)
/// main.main -> main.decode                (7 MB)
/// main.main -> main.encode                (2 MB)
pub fn heap_profile() -> Vec<u8> {
    const MB: i64 = 1024 * 1024;
    let strings = [
        "",
        "inuse_space",
        "bytes",
        "main.main",
        "main.encode",
        "bytes.Grow",
        "main.decode",
        "main.go",
    ];
    let function = |id: u64, name: i64| proto::Function {
        id,
        name,
        filename: 7,
        ..Default::default()
    };
    let location = |id: u64| proto::Location {
        id,
        address: 0x1000 + id,
        line: vec![proto::Line {
            function_id: id,
            line: 10 * id as i64,
        }],
        ..Default::default()
    };
    let sample = |location_id: Vec<u64>, value: i64| proto::Sample {
        location_id,
        value: vec![value],
    };

    let message = proto::Profile {
        sample_type: vec![proto::ValueType { r#type: 1, unit: 2 }],
        sample: vec![
            sample(vec![3, 2, 1], 5 * MB),
            sample(vec![4, 1], 7 * MB),
            sample(vec![2, 1], 2 * MB),
        ],
        location: (1..=4).map(location).collect(),
        function: vec![function(1, 3), function(2, 4), function(3, 5), function(4, 6)],
        string_table: strings.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    };
    message.encode_to_vec()
}

pub fn registry(target: &Arc<StubTarget>) -> Arc<Registry> {
    Arc::new(Registry::new(target.clone(), Arc::new(NoSymbolizer), false))
}

/// Layout that echoes the graph description back
pub struct StubLayout;

impl GraphLayout for StubLayout {
    fn layout(&self, dot: &str) -> Result<Vec<u8>> {
        Ok(format!("<svg><!-- {} --></svg>", dot.len()).into_bytes())
    }

    fn content_type(&self) -> &'static str {
        "image/svg+xml"
    }
}

/// Layout whose program is missing
pub struct BrokenLayout;

impl GraphLayout for BrokenLayout {
    fn layout(&self, _dot: &str) -> Result<Vec<u8>> {
        Err(Error::Render("dot: command not found".to_string()))
    }

    fn content_type(&self) -> &'static str {
        "image/png"
    }
}
