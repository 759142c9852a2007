//! Memory mapping utilities for process address space analysis
//!
//! This module parses `/proc/<pid>/maps` into a [`MemoryMap`]: the ordered
//! list of mappings of the target. The module list, runtime detection, the
//! stack scan and frame symbolization all work off this one view.

use anyhow::{bail, Context, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Memory range of a mapping in a process's address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange {
    pub start: u64,
    pub end: u64,
}

impl MemoryRange {
    /// Check if an address falls within this memory range
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }
}

/// One line of `/proc/<pid>/maps`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub range: MemoryRange,
    pub readable: bool,
    pub executable: bool,
    /// File offset of `range.start`
    pub offset: u64,
    /// Backing file, `None` for anonymous and pseudo mappings (`[stack]`, `[heap]`, ...)
    pub path: Option<PathBuf>,
    /// Raw pathname column, kept for pseudo mappings
    pub label: String,
}

impl MapEntry {
    /// Offset into the backing file of a runtime address inside this mapping.
    /// Symbol lookups still need the segment's virtual address, see
    /// [`Symbolizer::address_for_offset`](super::Symbolizer::address_for_offset).
    #[must_use]
    pub fn file_offset(&self, addr: u64) -> u64 {
        addr - self.range.start + self.offset
    }

    fn parse(line: &str) -> Result<Self> {
        // "start-end perms offset dev inode    pathname"
        let mut parts = line.splitn(6, ' ');
        let range = parts.next().context("missing address range")?;
        let perms = parts.next().context("missing permissions")?;
        let offset = parts.next().context("missing offset")?;
        let _dev = parts.next().context("missing device")?;
        let _inode = parts.next().context("missing inode")?;
        let label = parts.next().unwrap_or("").trim_start().to_string();

        let (start, end) = range.split_once('-').context("malformed address range")?;
        let start = u64::from_str_radix(start, 16).context("Failed to parse range start")?;
        let end = u64::from_str_radix(end, 16).context("Failed to parse range end")?;
        let offset = u64::from_str_radix(offset, 16).context("Failed to parse offset")?;

        let perms = perms.as_bytes();
        if perms.len() < 4 {
            bail!("malformed permissions");
        }

        let path = label
            .starts_with('/')
            .then(|| PathBuf::from(label.trim_end_matches(" (deleted)")));

        Ok(Self {
            range: MemoryRange { start, end },
            readable: perms[0] == b'r',
            executable: perms[2] == b'x',
            offset,
            path,
            label,
        })
    }
}

/// All mappings of a process, in address order
#[derive(Debug, Clone, Default)]
pub struct MemoryMap {
    entries: Vec<MapEntry>,
}

impl MemoryMap {
    /// Read and parse `/proc/<pid>/maps`
    ///
    /// # Errors
    /// Returns an error if the maps file cannot be read or a line is malformed
    pub fn read(pid: u32) -> Result<Self> {
        let maps_path = format!("/proc/{pid}/maps");
        let maps = fs::read_to_string(&maps_path).context(format!("Failed to read {maps_path}"))?;
        let map = Self::parse(&maps)?;
        debug!("{maps_path}: {} mappings", map.entries.len());
        Ok(map)
    }

    /// Parse the text of a maps file
    ///
    /// # Errors
    /// Returns an error naming the first malformed line
    pub fn parse(text: &str) -> Result<Self> {
        let entries = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| MapEntry::parse(line).with_context(|| format!("Bad maps line: {line}")))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    #[must_use]
    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    /// Mapping containing `addr`
    #[must_use]
    pub fn find(&self, addr: u64) -> Option<&MapEntry> {
        let idx = self.entries.partition_point(|e| e.range.end <= addr);
        self.entries.get(idx).filter(|e| e.range.contains(addr))
    }

    /// Executable mapping containing `addr`
    #[must_use]
    pub fn find_executable(&self, addr: u64) -> Option<&MapEntry> {
        self.find(addr).filter(|e| e.executable)
    }

    /// Distinct backing files in order of first appearance
    #[must_use]
    pub fn file_paths(&self) -> Vec<&Path> {
        let mut seen: Vec<&Path> = Vec::new();
        for path in self.entries.iter().filter_map(|e| e.path.as_deref()) {
            if !seen.contains(&path) {
                seen.push(path);
            }
        }
        seen
    }

    /// Full range covered by all mappings of `binary_path`
    #[must_use]
    pub fn range_of(&self, binary_path: &Path) -> Option<MemoryRange> {
        let mut start_addr = None;
        let mut end_addr = None;

        for entry in self.entries.iter().filter(|e| e.path.as_deref() == Some(binary_path)) {
            start_addr = Some(start_addr.map_or(entry.range.start, |s: u64| s.min(entry.range.start)));
            end_addr = Some(end_addr.map_or(entry.range.end, |e: u64| e.max(entry.range.end)));
        }

        match (start_addr, end_addr) {
            (Some(start), Some(end)) => Some(MemoryRange { start, end }),
            _ => None,
        }
    }
}
