use super::Symbolizer;
use super::dwarf::{AddressRange, BinaryInfo, FunctionSymbol};
use crate::error::Result;
use crate::profile::{Frame, Profile};
use std::cmp::Ordering;
use std::path::Path;

/// Resolves addresses against the target's executable on disk
pub struct LocalSymbolizer {
    symbols: Vec<FunctionSymbol>,
    ranges: Vec<AddressRange>,
}

impl LocalSymbolizer {
    pub fn open(path: &Path) -> Result<Self> {
        let info = BinaryInfo::parse(path)?;
        Ok(Self::from_tables(info.symbols, info.ranges))
    }

    fn from_tables(mut symbols: Vec<FunctionSymbol>, mut ranges: Vec<AddressRange>) -> Self {
        symbols.sort_by_key(|s| s.start);
        ranges.sort_by_key(|r| r.start);
        LocalSymbolizer { symbols, ranges }
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    /// Resolve one address, `None` when it falls outside every known function
    pub fn resolve(&self, addr: u64) -> Option<Frame> {
        let function = self.find_function(addr)?;

        let (file, line) = match self.ranges.binary_search_by(|r| {
            if addr < r.start {
                Ordering::Greater
            } else if addr >= r.end {
                Ordering::Less
            } else {
                Ordering::Equal
            }
        }) {
            Ok(idx) => (self.ranges[idx].file.clone(), self.ranges[idx].line),
            Err(_) => (String::new(), 0),
        };

        Some(Frame {
            function: function.name.clone(),
            file,
            line,
        })
    }

    fn find_function(&self, addr: u64) -> Option<&FunctionSymbol> {
        // Largest start address <= addr
        let idx = self.symbols.partition_point(|s| s.start <= addr);
        let candidate = self.symbols.get(idx.checked_sub(1)?)?;
        // Unsized symbols cover everything up to the next symbol.
        if candidate.size == 0 || addr < candidate.start + candidate.size {
            Some(candidate)
        } else {
            None
        }
    }
}

impl Symbolizer for LocalSymbolizer {
    fn symbolize(&self, profile: &mut Profile) -> Result<()> {
        for addr in profile.unresolved() {
            if let Some(frame) = self.resolve(addr) {
                profile.set_frames(addr, vec![frame]);
            }
        }
        Ok(())
    }
}
