use super::Symbolizer;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::profile::{Frame, Profile};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Addresses sent per request to the symbol endpoint
const BATCH_SIZE: usize = 4096;

/// Resolves addresses through the target's `/debug/pprof/symbol` endpoint
pub struct RemoteSymbolizer {
    fetcher: Arc<dyn Fetcher>,
}

impl RemoteSymbolizer {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        RemoteSymbolizer { fetcher }
    }
}

impl Symbolizer for RemoteSymbolizer {
    fn symbolize(&self, profile: &mut Profile) -> Result<()> {
        let unresolved = profile.unresolved();
        if unresolved.is_empty() {
            return Ok(());
        }

        let mut missing = 0usize;
        for batch in unresolved.chunks(BATCH_SIZE) {
            let body = self
                .fetcher
                .symbols(batch)
                .map_err(|e| Error::Symbolization(e.to_string()))?;
            let names = parse_symbol_response(&body);

            for &addr in batch {
                let frame = match names.get(&addr) {
                    Some(name) => Frame::named(name),
                    None => {
                        missing += 1;
                        Frame::unknown()
                    }
                };
                profile.set_frames(addr, vec![frame]);
            }
        }

        if missing > 0 {
            log::debug!(
                "{} of {} addresses left unresolved",
                missing,
                unresolved.len()
            );
        }
        Ok(())
    }
}

fn symbol_line() -> &'static Regex {
    static LINE: OnceLock<Regex> = OnceLock::new();
    LINE.get_or_init(|| {
        Regex::new(r"^\s*0x([[:xdigit:]]+)\s+(.+?)\s*$").expect("symbol line pattern is valid")
    })
}

/// Parse `0x<addr> <name>` lines; header lines such as `num_symbols: 1` are skipped
pub fn parse_symbol_response(body: &str) -> HashMap<u64, String> {
    body.lines()
        .filter_map(|line| {
            let caps = symbol_line().captures(line)?;
            let addr = u64::from_str_radix(&caps[1], 16).ok()?;
            let name = rustc_demangle::demangle(&caps[2]).to_string();
            Some((addr, name))
        })
        .collect()
}
