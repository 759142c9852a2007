// String formatting intentionally uses format! for clarity
#![allow(clippy::format_push_string)]

use addr2line::Context;
use anyhow::{Context as _, Result};
use gimli::{EndianRcSlice, RunTimeEndian};
use object::{Object, ObjectSection, ObjectSegment, ObjectSymbol};
use rustc_demangle::demangle;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// Symbolizer for resolving instruction pointers inside one ELF module
///
/// DWARF is tried first (function names, inlining, source locations); the
/// ELF symbol table is the fallback for stripped or release-built modules.
/// Includes a cache because the same return addresses repeat across threads.
pub struct Symbolizer {
    ctx: Context<EndianRcSlice<RunTimeEndian>>,
    /// (address, size, name) sorted by address
    symbols: Vec<(u64, u64, String)>,
    /// Loadable segments as (file offset, file size, virtual address)
    segments: Vec<(u64, u64, u64)>,
    /// Cache of resolved frames by address
    cache: RefCell<HashMap<u64, ResolvedFrame>>,
}

impl Symbolizer {
    /// Create a new symbolizer for the given binary
    ///
    /// # Errors
    /// Returns an error if the binary file cannot be read or parsed
    pub fn new<P: AsRef<Path>>(binary_path: P) -> Result<Self> {
        let binary_data = fs::read(binary_path.as_ref()).context("Failed to read binary file")?;

        let obj_file = object::File::parse(&*binary_data).context("Failed to parse object file")?;

        // Load DWARF debug info
        let endian =
            if obj_file.is_little_endian() { RunTimeEndian::Little } else { RunTimeEndian::Big };

        let load_section =
            |id: gimli::SectionId| -> Result<EndianRcSlice<RunTimeEndian>, gimli::Error> {
                let data = obj_file
                    .section_by_name(id.name())
                    .and_then(|section| section.uncompressed_data().ok())
                    .unwrap_or(std::borrow::Cow::Borrowed(&[][..]));
                Ok(EndianRcSlice::new(Rc::from(&*data), endian))
            };

        let dwarf = gimli::Dwarf::load(&load_section)?;
        let ctx = Context::from_dwarf(dwarf).context("Failed to load DWARF debug information")?;

        let mut symbols: Vec<(u64, u64, String)> = obj_file
            .symbols()
            .chain(obj_file.dynamic_symbols())
            .filter(|sym| sym.is_definition() && sym.address() != 0)
            .filter_map(|sym| {
                let name = sym.name().ok()?;
                (!name.is_empty()).then(|| (sym.address(), sym.size(), name.to_string()))
            })
            .collect();
        symbols.sort_by_key(|(addr, _, _)| *addr);
        symbols.dedup_by_key(|(addr, _, _)| *addr);

        let segments = obj_file
            .segments()
            .map(|segment| {
                let (offset, size) = segment.file_range();
                (offset, size, segment.address())
            })
            .filter(|(_, size, _)| *size > 0)
            .collect();

        Ok(Self {
            ctx,
            symbols,
            segments,
            cache: RefCell::new(HashMap::new()),
        })
    }

    /// Virtual address of the byte at `file_offset`, the key symbols and
    /// DWARF use. `None` if no loadable segment covers the offset.
    #[must_use]
    pub fn address_for_offset(&self, file_offset: u64) -> Option<u64> {
        self.segments
            .iter()
            .find(|(offset, size, _)| file_offset >= *offset && file_offset - offset < *size)
            .map(|(offset, _, vaddr)| vaddr + (file_offset - offset))
    }

    /// Resolve a module-relative address to symbol information
    ///
    /// Uses a cache to avoid re-resolving the same address multiple times.
    pub fn resolve(&self, addr: u64) -> ResolvedFrame {
        // Check cache first
        if let Some(cached) = self.cache.borrow().get(&addr) {
            return cached.clone();
        }

        // Cache miss - perform actual resolution
        let mut result = Vec::new();

        if let Ok(mut frame_iter) = self.ctx.find_frames(addr).skip_all_loads() {
            while let Ok(Some(frame)) = frame_iter.next() {
                let Some(function) =
                    frame.function.and_then(|f| f.demangle().ok().map(|s| s.to_string()))
                else {
                    continue;
                };

                let location = frame.location.map(|loc| SourceLocation {
                    file: loc.file.map(std::string::ToString::to_string),
                    line: loc.line,
                    column: loc.column,
                });

                result.push(InlinedFrame { function, location });
            }
        }

        let resolved = ResolvedFrame {
            addr,
            symbol: self.lookup_symbol(addr),
            frames: result,
        };

        // Store in cache
        self.cache.borrow_mut().insert(addr, resolved.clone());

        resolved
    }

    /// Symbol-table lookup: `(name, offset)` of the symbol covering `addr`
    fn lookup_symbol(&self, addr: u64) -> Option<(String, u64)> {
        let idx = self.symbols.partition_point(|(start, _, _)| *start <= addr);
        let (start, size, name) = self.symbols.get(idx.checked_sub(1)?)?;
        let offset = addr - start;
        // Zero-sized symbols (hand-written asm) get the benefit of the doubt
        if *size != 0 && offset >= *size {
            return None;
        }
        Some((Self::demangle_symbol(name), offset))
    }

    /// Demangle a Rust symbol name; other names come back unchanged
    #[must_use]
    pub fn demangle_symbol(symbol: &str) -> String {
        format!("{:#}", demangle(symbol))
    }
}

/// A resolved address (may contain multiple inlined frames)
#[derive(Debug, Clone)]
pub struct ResolvedFrame {
    pub addr: u64,
    /// Covering ELF symbol and the offset into it
    pub symbol: Option<(String, u64)>,
    /// DWARF frames, innermost inlined function first
    pub frames: Vec<InlinedFrame>,
}

/// An inlined frame within a resolved frame
#[derive(Debug, Clone)]
pub struct InlinedFrame {
    pub function: String,
    pub location: Option<SourceLocation>,
}

/// Source code location
#[derive(Debug, Clone)]
pub struct SourceLocation {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl ResolvedFrame {
    /// One-line description: `func+0x1a`, `func [file.c:42]`, or `None`
    #[must_use]
    pub fn summary(&self) -> Option<String> {
        if let Some(inner) = self.frames.first() {
            let mut output = inner.function.clone();
            if let Some((_, offset)) = &self.symbol {
                output.push_str(&format!("+0x{offset:x}"));
            }
            if let Some(SourceLocation { file: Some(file), line, .. }) = &inner.location {
                let file = Path::new(file).file_name().map_or(file.as_str(), |n| {
                    n.to_str().unwrap_or(file.as_str())
                });
                output.push_str(&format!(" [{file}"));
                if let Some(line) = line {
                    output.push_str(&format!(":{line}"));
                }
                output.push(']');
            }
            return Some(output);
        }

        self.symbol.as_ref().map(|(name, offset)| format!("{name}+0x{offset:x}"))
    }
}
