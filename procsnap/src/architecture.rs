//! Inspector/target bit-width comparison.
//!
//! A 64-bit inspector cannot read the runtime structures of a 32-bit target
//! with a 64-bit view of them, so the session either proceeds or hands the
//! target to the 32-bit sibling binary.

use log::debug;

use crate::domain::{ArchitectureTag, AttachError};
use crate::introspection::TargetProcess;

/// Bit-width of the running inspector
#[must_use]
pub const fn probe_self() -> ArchitectureTag {
    ArchitectureTag::current()
}

/// Bit-width of an opened target.
///
/// # Errors
/// `AttachError` if it cannot be determined.
pub fn probe_target(target: &dyn TargetProcess) -> Result<ArchitectureTag, AttachError> {
    let tag = target.architecture()?;
    debug!("Process {} is {tag}", target.pid());
    Ok(tag)
}

/// What to do with a given pair of architectures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Attach from this process
    Proceed,
    /// Hand the target to the x86 sibling binary
    Relaunch,
}

/// Only x64 inspecting x86 is relaunched; every other pair proceeds.
#[must_use]
pub fn decide(inspector: ArchitectureTag, target: ArchitectureTag) -> Decision {
    match (inspector, target) {
        (ArchitectureTag::X64, ArchitectureTag::X86) => Decision::Relaunch,
        _ => Decision::Proceed,
    }
}
