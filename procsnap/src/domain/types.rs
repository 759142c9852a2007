//! Domain types providing compile-time safety and self-documentation
//!
//! Newtype wrappers keep process ids, OS thread ids and managed thread ids
//! apart, and the record types are the value snapshots that flow from the
//! introspection service into the report.

use std::fmt;
use std::path::PathBuf;

pub use procsnap_common::ArchitectureTag;

/// Process ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Pid {
    fn from(pid: u32) -> Self {
        Pid(pid)
    }
}

/// OS thread ID (kernel TID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tid(pub u32);

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::UpperHex for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

/// Managed thread ID assigned by the runtime
///
/// Distinct from [`Tid`]: the runtime numbers its own threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManagedThreadId(pub u32);

impl fmt::Display for ManagedThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One loaded binary module in the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    pub file_path: PathBuf,
    /// Empty when the module carries no recognizable version
    pub version: String,
}

/// One thread known to the runtime, without its frames.
///
/// Frames are pulled separately, and only for alive threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRecord {
    pub os_thread_id: Tid,
    pub managed_thread_id: Option<ManagedThreadId>,
    pub is_alive: bool,
}

impl ThreadRecord {
    /// `managed|os` pair used in the inactive-thread line
    #[must_use]
    pub fn id_pair(&self) -> String {
        match self.managed_thread_id {
            Some(id) => format!("{id}|{}", self.os_thread_id),
            None => format!("-|{}", self.os_thread_id),
        }
    }
}

/// One frame of a thread's call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrameRecord {
    pub stack_pointer: u64,
    pub instruction_pointer: u64,
    pub display_text: String,
}

/// One application domain known to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDomainRecord {
    pub name: String,
    pub id: u32,
    /// Empty when the runtime reports no application base
    pub application_base: String,
}

/// Runtime family hosted by the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeFlavor {
    /// .NET Core / .NET 5+
    CoreClr,
    /// Mono
    Mono,
    /// .NET Framework
    Desktop,
}

impl fmt::Display for RuntimeFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CoreClr => f.write_str("CoreCLR"),
            Self::Mono => f.write_str("Mono"),
            Self::Desktop => f.write_str("Desktop"),
        }
    }
}

/// A runtime detected in the target, not yet instantiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClrInfo {
    pub flavor: RuntimeFlavor,
    /// `"unknown"` when the version could not be derived
    pub version: String,
    /// Module that hosts the runtime
    pub module_path: PathBuf,
}

impl fmt::Display for ClrInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.flavor, self.version)
    }
}

/// Version resource of the target's executable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileVersionInfo {
    pub file: PathBuf,
    pub file_version: String,
    pub build_id: String,
    pub machine: String,
}

impl FileVersionInfo {
    /// Render as aligned `Key: value` lines, one per field.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("{:<18}{}", "File:", self.file.display()),
            format!("{:<18}{}", "FileVersion:", self.file_version),
            format!("{:<18}{}", "BuildId:", self.build_id),
            format!("{:<18}{}", "Machine:", self.machine),
        ]
    }
}
