//! # Symbol Resolution and Address Translation
//!
//! Stack frames come out of the target as raw instruction pointers like
//! `0x7f3a2b4c780`. This module turns them into the text the report prints
//! next to each frame.
//!
//! ## Sources of names
//!
//! ```text
//! instruction pointer
//!        │
//!        ▼
//! /proc/<pid>/maps ── which mapping holds it?
//!        │
//!        ├── file-backed (libcoreclr.so, libc.so.6, the host executable)
//!        │      │  file address = ip - mapping.start + mapping.offset
//!        │      ▼
//!        │   Symbolizer: DWARF (addr2line) → ELF symbol table
//!        │      → "libcoreclr.so!ThreadNative::Sleep+0x4c"
//!        │
//!        └── anonymous executable (JIT code heap)
//!               ▼
//!            PerfMap: /tmp/perf-<pid>.map published by the runtime
//!               → "[Tier0] Program::Main(string[])+0x10"
//! ```
//!
//! ## PIE and shared objects
//!
//! Position-independent modules are loaded at a randomized base, and ELF
//! symbols and DWARF are keyed by the virtual addresses of the file's
//! `PT_LOAD` segments. A runtime address goes through the mapping it falls in
//! to a file offset ([`MapEntry::file_offset`]), then through the segment
//! covering that offset to a virtual address
//! ([`Symbolizer::address_for_offset`]). The two differ whenever a linker
//! places `p_vaddr` above `p_offset`, as lld does. Fixed-address executables
//! (`ET_EXEC`) come out of the same translation with their absolute address.
//!
//! ## Module Structure
//!
//! - **`memory_maps`**: `/proc/<pid>/maps` parsing
//! - **`symbolizer`**: per-module DWARF and symbol-table lookup with a cache
//! - **`perf_map`**: JIT method maps written by managed runtimes
//!
//! ## Limitations
//!
//! - Stripped modules without `.dynsym` entries resolve to `module+offset`
//! - JIT frames need the target to run with perf maps enabled

pub mod memory_maps;
pub mod perf_map;
pub mod symbolizer;

pub use memory_maps::{MapEntry, MemoryMap, MemoryRange};
pub use perf_map::PerfMap;
pub use symbolizer::Symbolizer;
