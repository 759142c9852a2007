//! # Linux procfs backend
//!
//! Implements the introspection traits with nothing but `/proc/<pid>/…`,
//! `pidfd_open(2)` and `process_vm_readv(2)`. The target is never stopped,
//! traced or written to.
//!
//! ## Module Structure
//!
//! - **`process`**: opened process, ELF-class architecture, file version info
//! - **`target`**: attach session, module list, runtime detection
//! - **`detect`**: runtime and version recognition from mapped libraries
//! - **`runtime`**: threads, stacks and the default domain of one runtime
//! - **`stack`**: register seed and return-address scan
//! - **`memory`**: remote reads

pub mod detect;
pub mod memory;
pub mod process;
pub mod runtime;
pub mod stack;
pub mod target;

use crossbeam_channel::{bounded, RecvTimeoutError};
use log::{debug, warn};
use std::time::Duration;

use crate::architecture::probe_self;
use crate::domain::{AttachError, Pid};
use crate::introspection::{DataTarget, Introspector, ProcessProvider, SelfProcess, TargetProcess};
use process::ProcfsProcess;
use target::ProcfsTarget;

/// Process services of the local Linux machine
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxProcesses;

impl ProcessProvider for LinuxProcesses {
    fn current(&self) -> std::io::Result<SelfProcess> {
        Ok(SelfProcess {
            pid: Pid(std::process::id()),
            exe_path: std::env::current_exe()?,
            architecture: probe_self(),
        })
    }

    fn open(&self, pid: Pid) -> Result<Box<dyn TargetProcess>, AttachError> {
        Ok(Box::new(ProcfsProcess::open(pid)?))
    }
}

/// Attaches by reading procfs on a helper thread, bounded by the timeout
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcfsIntrospector;

impl Introspector for ProcfsIntrospector {
    fn attach(&self, pid: Pid, timeout: Duration) -> Result<Box<dyn DataTarget>, AttachError> {
        let (tx, rx) = bounded(1);
        std::thread::Builder::new()
            .name(format!("attach-{pid}"))
            .spawn(move || {
                // The receiver is gone when we were too slow; nothing to report then
                let _ = tx.send(ProcfsTarget::attach(pid));
            })?;

        match rx.recv_timeout(timeout) {
            Ok(result) => {
                let target = result?;
                debug!("Attached to process {pid}");
                Ok(Box::new(target))
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("Attach to process {pid} still running after {}ms, abandoning it", timeout.as_millis());
                Err(AttachError::Timeout { pid, timeout })
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(AttachError::Other(anyhow::anyhow!("attach thread for process {pid} died")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArchitectureTag;

    #[test]
    fn test_current_process_identity() {
        let me = LinuxProcesses.current().unwrap();
        assert_eq!(me.pid, Pid(std::process::id()));
        assert_eq!(me.architecture, ArchitectureTag::current());
        assert_eq!(me.exe_path, std::env::current_exe().unwrap());
    }

    #[test]
    fn test_open_self_through_provider() {
        let target = LinuxProcesses.open(Pid(std::process::id())).unwrap();
        assert_eq!(target.architecture().unwrap(), ArchitectureTag::current());
    }

    #[test]
    fn test_attach_missing_process() {
        let err = ProcfsIntrospector.attach(Pid(999_999_999), Duration::from_secs(5)).err().expect("attach should fail");
        assert!(matches!(err, AttachError::ProcessNotFound(Pid(999_999_999))));
    }

    #[test]
    fn test_attach_self_lists_modules() {
        let target = ProcfsIntrospector.attach(Pid(std::process::id()), Duration::from_secs(5)).unwrap();
        assert!(!target.enumerate_modules().unwrap().is_empty());
        assert!(target.clr_versions().is_empty());
    }
}
