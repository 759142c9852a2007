//! # Introspection service boundary
//!
//! Everything procsnap knows about a target comes through the traits in this
//! module. The session logic never touches `/proc`, memory or symbols
//! directly, so any backend that can answer these questions plugs in.
//!
//! ```text
//! ProcessProvider ── current()            inspector identity + architecture
//!        │         └ open(pid) ──▶ TargetProcess   handle, architecture, version info
//!        │
//! Introspector ───── attach(pid, timeout) ──▶ DataTarget
//!                                               ├ enumerate_modules()
//!                                               ├ clr_versions()
//!                                               └ create_runtime(&ClrInfo) ──▶ ClrRuntime
//!                                                                               ├ threads()
//!                                                                               ├ stack_trace(&thread)
//!                                                                               └ app_domains()
//! ```
//!
//! Ownership follows the arrows: a [`ClrRuntime`] borrows its [`DataTarget`],
//! so the runtime view is always dropped (detached) before the target.
//!
//! - [`procfs`]: the Linux backend

pub mod procfs;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{
    AppDomainRecord, ArchitectureTag, AttachError, ClrInfo, FileVersionInfo, IntrospectionError,
    ModuleRecord, Pid, StackFrameRecord, ThreadRecord,
};

/// Lazily walked frames of one thread, innermost first.
///
/// The walk ends when the iterator does; an `Err` item aborts it.
pub type StackWalk<'a> = Box<dyn Iterator<Item = Result<StackFrameRecord, IntrospectionError>> + 'a>;

/// Identity of the running inspector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfProcess {
    pub pid: Pid,
    pub exe_path: PathBuf,
    pub architecture: ArchitectureTag,
}

impl SelfProcess {
    /// File name of the inspector binary, for the banner line
    #[must_use]
    pub fn exe_name(&self) -> String {
        file_name_of(&self.exe_path)
    }
}

/// OS process services: who am I, and open someone else
pub trait ProcessProvider {
    /// Identity and architecture of the inspector itself.
    ///
    /// # Errors
    /// Returns an error if the inspector's own executable cannot be located.
    fn current(&self) -> std::io::Result<SelfProcess>;

    /// Open a read-only handle on `pid`.
    ///
    /// # Errors
    /// `AttachError` if the process is missing or cannot be opened.
    fn open(&self, pid: Pid) -> Result<Box<dyn TargetProcess>, AttachError>;
}

/// An opened target process; closing happens on drop
pub trait TargetProcess {
    fn pid(&self) -> Pid;

    /// Bit-width of the target.
    ///
    /// # Errors
    /// `AttachError::UnknownArchitecture` if it cannot be determined.
    fn architecture(&self) -> Result<ArchitectureTag, AttachError>;

    fn exe_path(&self) -> &Path;

    /// Version resource of the target's executable (best effort)
    fn file_version(&self) -> FileVersionInfo;

    /// File name of the target's executable, used in the report and its file name
    fn exe_name(&self) -> String {
        file_name_of(self.exe_path())
    }
}

/// Non-invasive attach to a process's runtime
pub trait Introspector {
    /// Attach to `pid`, giving up after `timeout`.
    ///
    /// Must not suspend, inject into, or alter the target.
    ///
    /// # Errors
    /// `AttachError` on missing process, denied access or timeout.
    fn attach(&self, pid: Pid, timeout: Duration) -> Result<Box<dyn DataTarget>, AttachError>;
}

/// An attach session; detaches on drop
pub trait DataTarget {
    /// Loaded binary modules, in the order the service reports them.
    ///
    /// Works even when no runtime was detected.
    ///
    /// # Errors
    /// `IntrospectionError` if the module list cannot be read.
    fn enumerate_modules(&self) -> Result<Vec<ModuleRecord>, IntrospectionError>;

    /// Runtimes detected at attach time, possibly empty
    fn clr_versions(&self) -> &[ClrInfo];

    /// Instantiate a live view of one detected runtime.
    ///
    /// # Errors
    /// `AttachError::RuntimeCreation` if the runtime cannot be inspected.
    fn create_runtime(&self, info: &ClrInfo) -> Result<Box<dyn ClrRuntime + '_>, AttachError>;
}

/// Live, read-only view of a managed runtime
pub trait ClrRuntime {
    /// Threads known to the runtime, in runtime order.
    ///
    /// # Errors
    /// `IntrospectionError` if the thread list cannot be read.
    fn threads(&self) -> Result<Vec<ThreadRecord>, IntrospectionError>;

    /// Start walking the stack of an alive thread.
    ///
    /// Callers never ask for the stack of a thread with `is_alive == false`.
    ///
    /// # Errors
    /// `IntrospectionError` if the walk cannot start.
    fn stack_trace(&self, thread: &ThreadRecord) -> Result<StackWalk<'_>, IntrospectionError>;

    /// Application domains known to the runtime.
    ///
    /// # Errors
    /// `IntrospectionError` if the domain list cannot be read.
    fn app_domains(&self) -> Result<Vec<AppDomainRecord>, IntrospectionError>;
}

fn file_name_of(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}
