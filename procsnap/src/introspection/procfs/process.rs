//! Opened target process: handle, architecture, executable identity.

use log::debug;
use object::{FileKind, Object};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::detect::version_from_path;
use crate::domain::{ArchitectureTag, AttachError, FileVersionInfo, Pid};
use crate::introspection::TargetProcess;
use crate::preflight::{check_proc_access, check_process_exists};
use crate::process_lookup::{read_exe_header, resolve_exe_path, ProcessHandle};

/// A process opened through procfs; the handle closes on drop
#[derive(Debug)]
pub struct ProcfsProcess {
    handle: ProcessHandle,
    exe_path: PathBuf,
}

impl ProcfsProcess {
    /// Open `pid` read-only.
    ///
    /// # Errors
    /// `ProcessNotFound` or `AccessDenied` depending on what stops us.
    pub fn open(pid: Pid) -> Result<Self, AttachError> {
        check_process_exists(pid)?;
        let handle = ProcessHandle::open(pid)?;
        check_proc_access(pid)?;

        let exe_path = resolve_exe_path(pid).map_err(|e| {
            match e.downcast_ref::<std::io::Error>().map(std::io::Error::kind) {
                Some(ErrorKind::NotFound) => AttachError::ProcessNotFound(pid),
                _ => AttachError::Other(e),
            }
        })?;
        debug!("Opened process {pid} ({})", exe_path.display());

        Ok(Self { handle, exe_path })
    }
}

impl TargetProcess for ProcfsProcess {
    fn pid(&self) -> Pid {
        self.handle.pid()
    }

    fn architecture(&self) -> Result<ArchitectureTag, AttachError> {
        let pid = self.pid();
        let header = read_exe_header::<16>(pid).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AttachError::ProcessNotFound(pid),
            ErrorKind::PermissionDenied => AttachError::AccessDenied { pid, source: e },
            _ => AttachError::UnknownArchitecture { pid, reason: e.to_string() },
        })?;

        match FileKind::parse(&header[..]) {
            Ok(FileKind::Elf32) => Ok(ArchitectureTag::X86),
            Ok(FileKind::Elf64) => Ok(ArchitectureTag::X64),
            Ok(other) => Err(AttachError::UnknownArchitecture {
                pid,
                reason: format!("unsupported executable format {other:?}"),
            }),
            Err(e) => Err(AttachError::UnknownArchitecture { pid, reason: e.to_string() }),
        }
    }

    fn exe_path(&self) -> &Path {
        &self.exe_path
    }

    fn file_version(&self) -> FileVersionInfo {
        let mut info = FileVersionInfo {
            file: self.exe_path.clone(),
            file_version: version_from_path(&self.exe_path).unwrap_or_default(),
            ..FileVersionInfo::default()
        };

        // /proc/<pid>/exe still works when the file was replaced on disk
        let image = match std::fs::read(format!("/proc/{}/exe", self.pid())) {
            Ok(image) => image,
            Err(e) => {
                debug!("Cannot read executable of {}: {e}", self.pid());
                return info;
            }
        };
        match object::File::parse(&*image) {
            Ok(obj) => {
                info.machine = format!("{:?}", obj.architecture());
                if let Ok(Some(build_id)) = obj.build_id() {
                    info.build_id = build_id.iter().map(|b| format!("{b:02x}")).collect();
                }
            }
            Err(e) => debug!("Cannot parse executable of {}: {e}", self.pid()),
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_self_reports_native_architecture() {
        let process = ProcfsProcess::open(Pid(std::process::id())).unwrap();
        assert_eq!(process.architecture().unwrap(), ArchitectureTag::current());
        assert_eq!(process.exe_path(), std::env::current_exe().unwrap());
    }

    #[test]
    fn test_open_missing_process() {
        let err = ProcfsProcess::open(Pid(999_999_999)).unwrap_err();
        assert!(matches!(err, AttachError::ProcessNotFound(_)));
    }

    #[test]
    fn test_file_version_of_self() {
        let process = ProcfsProcess::open(Pid(std::process::id())).unwrap();
        let info = process.file_version();
        assert_eq!(info.file, std::env::current_exe().unwrap());
        assert!(!info.machine.is_empty());
    }
}
