//! JIT symbol maps (`/tmp/perf-<pid>.map`)
//!
//! Managed runtimes compile methods into anonymous executable memory that no
//! ELF file describes. CoreCLR (`DOTNET_PerfMapEnabled=1`) and Mono
//! (`--jitmap`) can publish those methods in the perf map format: one
//! `START SIZE name` line per method, addresses in hex without prefix.
//!
//! The runtime writes to `/tmp` as the target sees it, so the map is looked
//! up through `/proc/<pid>/root` first. The inspector's own `TMPDIR` plays no
//! part.

use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Parsed perf map, sorted by start address
#[derive(Debug, Clone, Default)]
pub struct PerfMap {
    entries: Vec<(u64, u64, String)>,
}

impl PerfMap {
    /// Places the map of `pid` may be found, most specific first
    #[must_use]
    pub fn candidates(pid: u32) -> [PathBuf; 2] {
        let name = format!("perf-{pid}.map");
        [PathBuf::from(format!("/proc/{pid}/root/tmp")).join(&name), Path::new("/tmp").join(name)]
    }

    /// Existing map of `pid`, or the plain `/tmp` location if there is none
    #[must_use]
    pub fn path_for(pid: u32) -> PathBuf {
        let [in_root, plain] = Self::candidates(pid);
        if in_root.exists() {
            in_root
        } else {
            plain
        }
    }

    /// Load the perf map of `pid`, `Ok(None)` if the target doesn't publish one
    ///
    /// # Errors
    /// Returns an error if the map exists but cannot be read
    pub fn load(pid: u32) -> Result<Option<Self>> {
        let path = Self::path_for(pid);
        if !path.exists() {
            return Ok(None);
        }
        let text =
            fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let map = Self::parse(&text);
        debug!("{}: {} JIT symbols", path.display(), map.entries.len());
        Ok(Some(map))
    }

    /// Parse map text, skipping malformed lines (the runtime appends while we read)
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut entries: Vec<(u64, u64, String)> = text
            .lines()
            .filter_map(|line| {
                let mut parts = line.splitn(3, ' ');
                let start = u64::from_str_radix(parts.next()?, 16).ok()?;
                let size = u64::from_str_radix(parts.next()?, 16).ok()?;
                let name = parts.next()?.trim();
                (!name.is_empty()).then(|| (start, size, name.to_string()))
            })
            .collect();
        entries.sort_by_key(|(start, _, _)| *start);
        Self { entries }
    }

    /// Method covering `addr` and the offset into it
    #[must_use]
    pub fn lookup(&self, addr: u64) -> Option<(&str, u64)> {
        let idx = self.entries.partition_point(|(start, _, _)| *start <= addr);
        let (start, size, name) = self.entries.get(idx.checked_sub(1)?)?;
        let offset = addr - start;
        (offset < *size).then_some((name.as_str(), offset))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
7F3A10002000 4A [OptimizedTier1] System.Threading.Monitor::Wait(class System.Object,int32)[Optimized]
7F3A10001000 80 [Tier0] Program::Main(string[])[QuickJitted]
garbage line
7F3A10003000 10 stub<1> AllocateTemporaryEntryPoints<PreJIT>
";

    #[test]
    fn test_parse_sorts_and_skips_garbage() {
        let map = PerfMap::parse(SAMPLE);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_lookup_inside_method() {
        let map = PerfMap::parse(SAMPLE);
        let (name, offset) = map.lookup(0x7F3A_1000_1010).unwrap();
        assert_eq!(name, "[Tier0] Program::Main(string[])[QuickJitted]");
        assert_eq!(offset, 0x10);
    }

    #[test]
    fn test_lookup_past_method_end() {
        let map = PerfMap::parse(SAMPLE);
        assert!(map.lookup(0x7F3A_1000_1080).is_none());
        assert!(map.lookup(0x1000).is_none());
    }

    #[test]
    fn test_load_missing_map() {
        assert!(PerfMap::load(u32::MAX).unwrap().is_none());
    }

    #[test]
    fn test_candidates_ignore_inspector_tmpdir() {
        let [in_root, plain] = PerfMap::candidates(4242);
        assert_eq!(in_root, Path::new("/proc/4242/root/tmp/perf-4242.map"));
        assert_eq!(plain, Path::new("/tmp/perf-4242.map"));
        assert_eq!(PerfMap::path_for(u32::MAX), Path::new(&format!("/tmp/perf-{}.map", u32::MAX)));
    }

    #[test]
    fn test_load_through_target_root() {
        let pid = std::process::id();
        let path = Path::new("/tmp").join(format!("perf-{pid}.map"));
        fs::write(&path, SAMPLE).unwrap();

        let found = PerfMap::path_for(pid);
        let loaded = PerfMap::load(pid);
        fs::remove_file(&path).unwrap();

        assert_eq!(found, PathBuf::from(format!("/proc/{pid}/root/tmp/perf-{pid}.map")));
        assert_eq!(loaded.unwrap().unwrap().len(), 3);
    }
}
