//! Structured error types for procsnap
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! The variants follow the session's failure taxonomy: usage problems never
//! reach the target, attach problems leave no report behind, traversal
//! problems leave a partial report on disk.

use super::types::{Pid, Tid};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure to reach the target or its runtime. No report file exists yet.
#[derive(Error, Debug)]
pub enum AttachError {
    #[error("Process {0} not found")]
    ProcessNotFound(Pid),

    #[error("Access to process {pid} denied: {source}")]
    AccessDenied {
        pid: Pid,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot determine the architecture of process {pid}: {reason}")]
    UnknownArchitecture { pid: Pid, reason: String },

    #[error("Attach to process {pid} timed out after {}ms", .timeout.as_millis())]
    Timeout { pid: Pid, timeout: Duration },

    #[error("No managed runtime found in process {0}")]
    NoRuntime(Pid),

    #[error("Couldn't create ClrRuntime: {0}")]
    RuntimeCreation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure while reading runtime state from an attached target.
#[derive(Error, Debug)]
pub enum IntrospectionError {
    #[error("Failed to list threads: {0}")]
    ThreadListFailed(String),

    #[error("Stack walk of thread {tid} failed: {reason}")]
    StackWalkFailed { tid: Tid, reason: String },

    #[error("Failed to read {len} bytes at 0x{addr:x}: {source}")]
    MemoryRead {
        addr: u64,
        len: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list application domains: {0}")]
    DomainListFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Report section whose traversal aborted the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Threads,
    AppDomains,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Threads => f.write_str("threads"),
            Self::AppDomains => f.write_str("application domains"),
        }
    }
}

/// Everything that can end a snapshot session early.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Couldn't connect to process '{pid}'.  Error: {source}")]
    Connect {
        pid: Pid,
        #[source]
        source: AttachError,
    },

    #[error("Attach to process '{pid}' failed: {source}")]
    Attach {
        pid: Pid,
        #[source]
        source: AttachError,
    },

    #[error("Process {pid} is {target} but this inspector is {inspector}; relaunch disabled")]
    ArchitectureMismatch {
        pid: Pid,
        inspector: procsnap_common::ArchitectureTag,
        target: procsnap_common::ArchitectureTag,
    },

    #[error("Couldn't start x86 process from '{}': {source}", .path.display())]
    Relaunch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot aborted while walking {section}: {source}")]
    FatalTraversal {
        section: Section,
        #[source]
        source: IntrospectionError,
    },

    #[error("Failed to write report {}: {source}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Bad command-line input; nothing was attached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("Couldn't parse '{0}' as int, exiting...")]
    InvalidPid(String),
}
