//! # Shared Definitions (procsnap ↔ build tooling)
//!
//! Types and conventions that both the `procsnap` binary and `xtask` need to
//! agree on. The binary uses them to decide whether it can inspect a target
//! directly and, if not, where its architecture-matching sibling lives;
//! `xtask build-x86` uses the same naming rule to install that sibling.
//!
//! ## Key Items
//!
//! - [`ArchitectureTag`] - bit-width of a process (inspector or target)
//! - [`alternate_file_name`] - `procsnap` → `procsnap_x86`
//! - [`X86_SUFFIX`] - the suffix inserted by the convention

use std::fmt;

/// Suffix inserted before the extension of the 32-bit inspector binary.
pub const X86_SUFFIX: &str = "_x86";

/// Bit-width of a process.
///
/// Attach only proceeds when the inspector and the target carry the same tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchitectureTag {
    /// 32-bit process
    X86,
    /// 64-bit process
    X64,
}

impl ArchitectureTag {
    /// Architecture of the running inspector, fixed at compile time.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_pointer_width = "64") {
            Self::X64
        } else {
            Self::X86
        }
    }

    /// Map a pointer width in bits to a tag.
    #[must_use]
    pub const fn from_pointer_width(bits: u32) -> Option<Self> {
        match bits {
            32 => Some(Self::X86),
            64 => Some(Self::X64),
            _ => None,
        }
    }

    /// Size of a pointer in the process, in bytes.
    #[must_use]
    pub const fn pointer_size(self) -> usize {
        match self {
            Self::X86 => 4,
            Self::X64 => 8,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
        }
    }
}

impl fmt::Display for ArchitectureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File name of the 32-bit sibling of an inspector binary.
///
/// The suffix goes in front of the last extension, or at the end when the
/// name has none. Leading dots do not count as an extension separator.
///
/// ```
/// use procsnap_common::alternate_file_name;
///
/// assert_eq!(alternate_file_name("procsnap"), "procsnap_x86");
/// assert_eq!(alternate_file_name("procsnap.exe"), "procsnap_x86.exe");
/// ```
#[must_use]
pub fn alternate_file_name(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => {
            let (stem, ext) = file_name.split_at(dot);
            format!("{stem}{X86_SUFFIX}{ext}")
        }
        _ => format!("{file_name}{X86_SUFFIX}"),
    }
}
