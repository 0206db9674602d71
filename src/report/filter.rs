use crate::error::{Error, Result};
use crate::profile::Profile;
use regex::Regex;

/// Compile a filter typed by the operator; empty text means no filter
pub fn compile_filter(text: &str) -> Result<Option<Regex>> {
    if text.is_empty() {
        return Ok(None);
    }
    Regex::new(text)
        .map(Some)
        .map_err(|e| Error::InvalidFilter {
            pattern: text.to_string(),
            reason: e.to_string(),
        })
}

/// Copy of `profile` holding only samples with a frame matching `pattern`.
///
/// Kept samples retain their whole stack so callers and callees of the
/// matching frame stay visible.
pub fn focus(profile: &Profile, pattern: Option<&Regex>) -> Profile {
    let Some(re) = pattern else {
        return profile.clone();
    };

    let samples: Vec<_> = profile
        .samples
        .iter()
        .filter(|s| profile.sample_matches(s, re))
        .cloned()
        .collect();

    let mut kept = profile.clone_metadata();
    kept.samples = samples;
    for addr in kept.addresses() {
        kept.set_frames(addr, profile.frames(addr).to_vec());
    }
    kept
}

impl Profile {
    /// Everything but the samples and the location table
    fn clone_metadata(&self) -> Profile {
        Profile {
            sample_types: self.sample_types.clone(),
            default_sample_type: self.default_sample_type,
            samples: Vec::new(),
            locations: Default::default(),
            period_type: self.period_type.clone(),
            period: self.period,
            time_nanos: self.time_nanos,
            duration_nanos: self.duration_nanos,
        }
    }
}
