//! Domain model for procsnap
//!
//! This module contains core domain types and errors that provide:
//! - Compile-time safety via newtype pattern
//! - Value snapshots of the target's runtime state
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{
    AppDomainRecord, ArchitectureTag, ClrInfo, FileVersionInfo, ManagedThreadId, ModuleRecord,
    Pid, RuntimeFlavor, StackFrameRecord, ThreadRecord, Tid,
};

pub use errors::{AttachError, IntrospectionError, Section, SnapshotError, UsageError};
