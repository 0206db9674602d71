mod decode;
pub mod proto;

pub use decode::decode;

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// Placeholder name for addresses the symbolizer could not resolve
pub const UNKNOWN_FUNCTION: &str = "[unknown]";

/// Set on the location key of a location that carries no address; the rest
/// of the key is its location id
pub const SYMBOLIC_LOCATION: u64 = 1 << 63;

/// Semantics of one sample value, e.g. `("inuse_space", "bytes")`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueType {
    pub kind: String,
    pub unit: String,
}

impl ValueType {
    pub fn new(kind: &str, unit: &str) -> Self {
        ValueType {
            kind: kind.to_string(),
            unit: unit.to_string(),
        }
    }
}

/// One observed call stack, leaf address first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub stack: Vec<u64>,
    pub values: Vec<i64>,
}

/// A resolved source frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub function: String,
    pub file: String,
    pub line: u32,
}

impl Frame {
    pub fn named(function: &str) -> Self {
        Frame {
            function: function.to_string(),
            file: String::new(),
            line: 0,
        }
    }

    pub fn unknown() -> Self {
        Frame::named(UNKNOWN_FUNCTION)
    }

    pub fn is_unknown(&self) -> bool {
        self.function == UNKNOWN_FUNCTION
    }
}

/// A fetched profile snapshot.
///
/// The location table maps every address referenced by a sample to its frames,
/// innermost inlined frame first. An empty frame list means the address was
/// never symbolized.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Profile {
    pub sample_types: Vec<ValueType>,
    pub default_sample_type: Option<usize>,
    pub samples: Vec<Sample>,
    pub locations: BTreeMap<u64, Vec<Frame>>,
    pub period_type: Option<ValueType>,
    pub period: i64,
    pub time_nanos: i64,
    pub duration_nanos: i64,
}

impl Profile {
    /// Index of the sample value reports aggregate over
    pub fn value_index(&self) -> usize {
        self.default_sample_type
            .filter(|&i| i < self.sample_types.len())
            .unwrap_or_else(|| self.sample_types.len().saturating_sub(1))
    }

    /// Value type reports aggregate over
    pub fn value_type(&self) -> ValueType {
        self.sample_types
            .get(self.value_index())
            .cloned()
            .unwrap_or_else(|| ValueType::new("samples", "count"))
    }

    pub fn frames(&self, addr: u64) -> &[Frame] {
        self.locations.get(&addr).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every address referenced by at least one sample
    pub fn addresses(&self) -> BTreeSet<u64> {
        self.samples
            .iter()
            .flat_map(|s| s.stack.iter().copied())
            .collect()
    }

    /// Referenced addresses without any frame yet
    pub fn unresolved(&self) -> Vec<u64> {
        self.addresses()
            .into_iter()
            .filter(|addr| addr & SYMBOLIC_LOCATION == 0 && self.frames(*addr).is_empty())
            .collect()
    }

    pub fn set_frames(&mut self, addr: u64, frames: Vec<Frame>) {
        self.locations.insert(addr, frames);
    }

    /// Sum of the value at `index` over all samples
    pub fn total(&self, index: usize) -> i64 {
        self.samples
            .iter()
            .map(|s| s.values.get(index).copied().unwrap_or(0))
            .sum()
    }

    /// Whether any frame of the sample's stack has a function name matching `focus`
    pub fn sample_matches(&self, sample: &Sample, focus: &Regex) -> bool {
        sample.stack.iter().any(|&addr| {
            self.frames(addr)
                .iter()
                .any(|frame| focus.is_match(&frame.function))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heap_profile() -> Profile {
        let mut p = Profile {
            sample_types: vec![
                ValueType::new("alloc_space", "bytes"),
                ValueType::new("inuse_space", "bytes"),
            ],
            ..Default::default()
        };
        p.samples.push(Sample {
            stack: vec![0x10, 0x20],
            values: vec![100, 40],
        });
        p.samples.push(Sample {
            stack: vec![0x30, 0x20],
            values: vec![50, 10],
        });
        p.set_frames(0x10, vec![Frame::named("main.alloc")]);
        p.set_frames(0x20, vec![Frame::named("main.main")]);
        p
    }

    #[test]
    fn test_value_index_defaults_to_last_type() {
        let mut p = heap_profile();
        assert_eq!(p.value_index(), 1);
        assert_eq!(p.value_type().kind, "inuse_space");
        p.default_sample_type = Some(0);
        assert_eq!(p.value_index(), 0);
        p.default_sample_type = Some(9);
        assert_eq!(p.value_index(), 1);
    }

    #[test]
    fn test_unresolved_addresses() {
        let p = heap_profile();
        assert_eq!(p.unresolved(), vec![0x30]);
        assert_eq!(p.total(0), 150);
    }

    #[test]
    fn test_sample_matches_any_frame() {
        let p = heap_profile();
        let re = Regex::new("main\\.main").unwrap();
        assert!(p.samples.iter().all(|s| p.sample_matches(s, &re)));
        let re = Regex::new("alloc").unwrap();
        assert!(p.sample_matches(&p.samples[0], &re));
        assert!(!p.sample_matches(&p.samples[1], &re));
    }
}
