use crate::error::{Error, Result};
use gimli::{EndianSlice, RunTimeEndian};
use object::{Object, ObjectSection, ObjectSymbol};
use std::fs::File;
use std::path::Path;

/// Symbol table and line table of an executable
pub struct BinaryInfo {
    /// Function symbols sorted by start address
    pub symbols: Vec<FunctionSymbol>,
    /// Line table rows sorted by start address, empty without DWARF
    pub ranges: Vec<AddressRange>,
}

#[derive(Debug, Clone)]
pub struct FunctionSymbol {
    pub start: u64,
    pub size: u64,
    pub name: String,
}

/// An address range mapped to a source location
#[derive(Debug, Clone)]
pub struct AddressRange {
    pub start: u64,
    pub end: u64,
    pub file: String,
    pub line: u32,
}

impl BinaryInfo {
    pub fn parse(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only and dropped before this function returns;
        // everything kept is copied out of it.
        let mmap = unsafe { memmap2::Mmap::map(&file) }?;

        let object = object::File::parse(&*mmap).map_err(|e| {
            Error::Symbolization(format!("failed to parse {}: {}", path.display(), e))
        })?;

        let symbols = Self::parse_symbols(&object);
        if symbols.is_empty() {
            return Err(Error::MissingSymbols {
                path: path.display().to_string(),
            });
        }

        let ranges = if object.section_by_name(".debug_info").is_some() {
            let endian = if object.is_little_endian() {
                RunTimeEndian::Little
            } else {
                RunTimeEndian::Big
            };
            Self::parse_line_info_from_object(&object, endian)?
        } else {
            // Stripped of DWARF: names only.
            Vec::new()
        };

        Ok(BinaryInfo { symbols, ranges })
    }

    fn parse_symbols(object: &object::File<'_>) -> Vec<FunctionSymbol> {
        let mut symbols: Vec<FunctionSymbol> = object
            .symbols()
            .filter(|s| s.kind() == object::SymbolKind::Text && s.address() != 0)
            .filter_map(|s| {
                let name = s.name().ok()?;
                Some(FunctionSymbol {
                    start: s.address(),
                    size: s.size(),
                    name: rustc_demangle::demangle(name).to_string(),
                })
            })
            .collect();
        symbols.sort_by_key(|s| s.start);
        symbols.dedup_by_key(|s| s.start);
        symbols
    }

    fn parse_line_info_from_object(
        object: &object::File<'_>,
        endian: RunTimeEndian,
    ) -> Result<Vec<AddressRange>> {
        let load_section = |name: &str| -> &[u8] {
            object
                .section_by_name(name)
                .and_then(|s| s.data().ok())
                .unwrap_or(&[])
        };

        let dwarf = gimli::Dwarf {
            debug_abbrev: gimli::DebugAbbrev::new(load_section(".debug_abbrev"), endian),
            debug_info: gimli::DebugInfo::new(load_section(".debug_info"), endian),
            debug_line: gimli::DebugLine::new(load_section(".debug_line"), endian),
            debug_str: gimli::DebugStr::new(load_section(".debug_str"), endian),
            debug_line_str: gimli::DebugLineStr::new(load_section(".debug_line_str"), endian),
            ..Default::default()
        };

        Self::parse_line_info(&dwarf)
    }

    fn parse_line_info(
        dwarf: &gimli::Dwarf<EndianSlice<'_, RunTimeEndian>>,
    ) -> Result<Vec<AddressRange>> {
        let mut ranges = Vec::new();
        let mut units = dwarf.units();

        while let Ok(Some(header)) = units.next() {
            let unit = dwarf
                .unit(header)
                .map_err(|e| Error::Symbolization(format!("failed to parse unit: {}", e)))?;

            let Some(program) = unit.line_program.clone() else {
                continue;
            };
            let mut rows = program.rows();
            let mut prev_row: Option<(u64, String, u32)> = None;

            while let Ok(Some((header, row))) = rows.next_row() {
                let addr = row.address();

                let file = row
                    .file(header)
                    .map(|f| {
                        let mut path = String::new();
                        if let Some(dir) = f.directory(header)
                            && let Ok(dir) = dwarf.attr_string(&unit, dir)
                            && let Ok(dir) = dir.to_string()
                        {
                            path.push_str(dir);
                            if !path.ends_with('/') {
                                path.push('/');
                            }
                        }
                        if let Ok(name) = dwarf.attr_string(&unit, f.path_name())
                            && let Ok(name) = name.to_string()
                        {
                            path.push_str(name);
                        }
                        path
                    })
                    .unwrap_or_default();
                let line = row.line().map(|l| l.get() as u32).unwrap_or(0);

                if let Some((prev_addr, prev_file, prev_line)) = prev_row.take()
                    && addr > prev_addr
                    && !prev_file.is_empty()
                {
                    ranges.push(AddressRange {
                        start: prev_addr,
                        end: addr,
                        file: prev_file,
                        line: prev_line,
                    });
                }

                if !row.end_sequence() {
                    prev_row = Some((addr, file, line));
                }
            }
        }

        ranges.sort_by_key(|r| r.start);
        Ok(ranges)
    }
}
