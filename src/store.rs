use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::profile::{self, Profile};
use crate::symbols::Symbolizer;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

pub const CPU_KIND: &str = "profile";
pub const HEAP_KIND: &str = "heap";

/// Kinds registered at start-up with their default sampling duration in seconds
pub const DEFAULT_KINDS: &[(&str, u64)] = &[
    (CPU_KIND, 30),
    (HEAP_KIND, 0),
    ("allocs", 0),
    ("goroutine", 0),
    ("threadcreate", 0),
    ("block", 0),
    ("mutex", 0),
];

#[derive(Default)]
struct Cache {
    profile: Option<Profile>,
    /// Bumped on every successful fetch
    generation: u64,
}

/// One profile kind of the target and its cached snapshot
pub struct ReportSession {
    kind: String,
    default_seconds: u64,
    fetcher: Arc<dyn Fetcher>,
    symbolizer: Arc<dyn Symbolizer>,
    tolerate_symbol_errors: bool,
    cache: Mutex<Cache>,
    /// Held for the whole duration of a network fetch
    fetch_guard: Mutex<()>,
}

impl ReportSession {
    pub fn new(
        kind: &str,
        default_seconds: u64,
        fetcher: Arc<dyn Fetcher>,
        symbolizer: Arc<dyn Symbolizer>,
    ) -> Self {
        ReportSession {
            kind: kind.to_string(),
            default_seconds,
            fetcher,
            symbolizer,
            tolerate_symbol_errors: false,
            cache: Mutex::new(Cache::default()),
            fetch_guard: Mutex::new(()),
        }
    }

    /// Keep profiles whose symbol lookup failed, showing raw addresses
    pub fn tolerate_symbol_errors(mut self, tolerate: bool) -> Self {
        self.tolerate_symbol_errors = tolerate;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn default_seconds(&self) -> u64 {
        self.default_seconds
    }

    pub fn is_loaded(&self) -> bool {
        self.lock_cache().profile.is_some()
    }

    /// Copy of the cached profile, if any
    pub fn cached(&self) -> Option<Profile> {
        self.lock_cache().profile.clone()
    }

    /// Return the cached profile, or fetch a new one when missing or `force` is set.
    ///
    /// Callers that wait on an in-flight fetch get its result instead of issuing
    /// another retrieval. A failed fetch leaves the cache untouched.
    pub fn fetch(&self, force: bool, seconds: u64) -> Result<Profile> {
        let seen = {
            let cache = self.lock_cache();
            if !force && let Some(profile) = &cache.profile {
                return Ok(profile.clone());
            }
            cache.generation
        };

        let _guard = self
            .fetch_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        {
            let cache = self.lock_cache();
            let completed_while_waiting = cache.generation != seen;
            if (completed_while_waiting || !force)
                && let Some(profile) = &cache.profile
            {
                return Ok(profile.clone());
            }
        }

        let profile = self.retrieve(seconds)?;

        let mut cache = self.lock_cache();
        cache.profile = Some(profile.clone());
        cache.generation += 1;
        Ok(profile)
    }

    fn retrieve(&self, seconds: u64) -> Result<Profile> {
        let seconds = if seconds == 0 {
            self.default_seconds
        } else {
            seconds
        };
        let started = Instant::now();

        let payload = self.fetcher.profile(&self.kind, seconds)?;
        let mut profile = profile::decode(&payload)?;

        match self.symbolizer.symbolize(&mut profile) {
            Ok(()) => {}
            Err(e @ Error::Symbolization(_)) if self.tolerate_symbol_errors => {
                log::warn!("{}: showing raw addresses: {}", self.kind, e);
            }
            Err(e) => return Err(e),
        }

        log::info!(
            "fetched {} profile: {} samples, {} locations in {:?}",
            self.kind,
            profile.samples.len(),
            profile.locations.len(),
            started.elapsed()
        );
        Ok(profile)
    }

    fn lock_cache(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// All report sessions of one target, keyed by kind name
pub struct Registry {
    sessions: BTreeMap<String, ReportSession>,
    fetcher: Arc<dyn Fetcher>,
}

impl Registry {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        symbolizer: Arc<dyn Symbolizer>,
        tolerate_symbol_errors: bool,
    ) -> Self {
        Self::with_kinds(DEFAULT_KINDS, fetcher, symbolizer, tolerate_symbol_errors)
    }

    pub fn with_kinds(
        kinds: &[(&str, u64)],
        fetcher: Arc<dyn Fetcher>,
        symbolizer: Arc<dyn Symbolizer>,
        tolerate_symbol_errors: bool,
    ) -> Self {
        let sessions = kinds
            .iter()
            .map(|&(kind, seconds)| {
                let session =
                    ReportSession::new(kind, seconds, fetcher.clone(), symbolizer.clone())
                        .tolerate_symbol_errors(tolerate_symbol_errors);
                (kind.to_string(), session)
            })
            .collect();
        Registry { sessions, fetcher }
    }

    pub fn session(&self, kind: &str) -> Option<&ReportSession> {
        self.sessions.get(kind)
    }

    /// Like [`Registry::session`], failing with [`Error::UnknownKind`]
    pub fn require(&self, kind: &str) -> Result<&ReportSession> {
        self.session(kind)
            .ok_or_else(|| Error::UnknownKind(kind.to_string()))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }
}
