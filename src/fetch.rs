use crate::error::{Error, Result};
use std::io::Read;
use std::time::Duration;

/// Upper bound on a single payload; larger responses are rejected
const MAX_PAYLOAD_BYTES: u64 = 256 * 1024 * 1024;

pub const DEFAULT_STATS_PATH: &str = "/debug/pprofstats";

/// Source of raw profile, symbol and stats payloads
pub trait Fetcher: Send + Sync {
    /// Raw profile payload for `kind` sampled over `seconds`
    fn profile(&self, kind: &str, seconds: u64) -> Result<Vec<u8>>;

    /// Symbol endpoint response body for a batch of addresses
    fn symbols(&self, addrs: &[u64]) -> Result<String>;

    /// Stats counters JSON body
    fn stats(&self) -> Result<Vec<u8>>;
}

/// Fetches from a live target over HTTP
pub struct HttpFetcher {
    agent: ureq::Agent,
    target: String,
    stats_path: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(target: &str, stats_path: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout.min(Duration::from_secs(10)))
            .build();
        HttpFetcher {
            agent,
            target: target.trim_end_matches('/').to_string(),
            stats_path: stats_path.to_string(),
            timeout,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn profile_url(&self, kind: &str, seconds: u64) -> String {
        format!("{}/debug/pprof/{}?seconds={}", self.target, kind, seconds)
    }

    pub fn symbol_url(&self) -> String {
        format!("{}/debug/pprof/symbol", self.target)
    }

    pub fn stats_url(&self) -> String {
        format!("{}{}", self.target, self.stats_path)
    }

    fn read_body(url: &str, response: ureq::Response) -> Result<Vec<u8>> {
        read_limited(url, response.into_reader(), MAX_PAYLOAD_BYTES)
    }
}

fn read_limited(url: &str, reader: impl Read, limit: u64) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    reader
        .take(limit + 1)
        .read_to_end(&mut body)
        .map_err(|e| Error::Connectivity {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    if body.len() as u64 > limit {
        return Err(Error::Decode(format!("{}: payload exceeds {} bytes", url, limit)));
    }
    Ok(body)
}

fn classify(url: &str, err: ureq::Error) -> Error {
    match err {
        ureq::Error::Status(status, response) => Error::Status {
            url: url.to_string(),
            status,
            body: response
                .into_string()
                .unwrap_or_default()
                .trim()
                .to_string(),
        },
        ureq::Error::Transport(transport) => Error::Connectivity {
            url: url.to_string(),
            reason: transport.to_string(),
        },
    }
}

impl Fetcher for HttpFetcher {
    fn profile(&self, kind: &str, seconds: u64) -> Result<Vec<u8>> {
        let url = self.profile_url(kind, seconds);
        log::debug!("fetching {}", url);
        // The target holds the response for the sampling window.
        let timeout = self.timeout + Duration::from_secs(seconds);
        let response = self
            .agent
            .get(&url)
            .timeout(timeout)
            .call()
            .map_err(|e| classify(&url, e))?;
        Self::read_body(&url, response)
    }

    fn symbols(&self, addrs: &[u64]) -> Result<String> {
        let url = self.symbol_url();
        let body = addrs
            .iter()
            .map(|a| format!("{:#x}", a))
            .collect::<Vec<_>>()
            .join("+");
        log::debug!("symbolizing {} addresses via {}", addrs.len(), url);
        let response = self
            .agent
            .post(&url)
            .timeout(self.timeout)
            .send_string(&body)
            .map_err(|e| classify(&url, e))?;
        let bytes = Self::read_body(&url, response)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn stats(&self) -> Result<Vec<u8>> {
        let url = self.stats_url();
        let response = self
            .agent
            .get(&url)
            .timeout(self.timeout)
            .call()
            .map_err(|e| classify(&url, e))?;
        Self::read_body(&url, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let f = HttpFetcher::new(
            "http://localhost:6060/",
            DEFAULT_STATS_PATH,
            Duration::from_secs(60),
        );
        assert_eq!(f.target(), "http://localhost:6060");
        assert_eq!(
            f.profile_url("profile", 30),
            "http://localhost:6060/debug/pprof/profile?seconds=30"
        );
        assert_eq!(f.symbol_url(), "http://localhost:6060/debug/pprof/symbol");
        assert_eq!(f.stats_url(), "http://localhost:6060/debug/pprofstats");
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        let url = "http://localhost:6060/debug/pprof/heap";
        let body = read_limited(url, &[7u8; 16][..], 16).unwrap();
        assert_eq!(body.len(), 16);

        let err = read_limited(url, &[7u8; 17][..], 16).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert!(err.to_string().contains("exceeds 16 bytes"), "{err}");
    }

    #[test]
    fn test_unreachable_target_is_connectivity_error() {
        // Port 9 (discard) on loopback is closed on test machines.
        let f = HttpFetcher::new(
            "http://127.0.0.1:9",
            DEFAULT_STATS_PATH,
            Duration::from_secs(2),
        );
        let err = f.stats().unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err}");
    }
}
