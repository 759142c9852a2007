//! Pre-flight checks for procsnap
//!
//! Validates that the target can be inspected before any attach work starts.
//! Provides clear, actionable error messages when requirements aren't met.

use log::warn;
use object::{Object, ObjectSection};
use std::path::Path;

use crate::domain::{AttachError, Pid};

/// Check if the target process exists
///
/// # Errors
/// `ProcessNotFound` if `/proc/<pid>` is missing
pub fn check_process_exists(pid: Pid) -> Result<(), AttachError> {
    let proc_path = format!("/proc/{pid}");
    if !Path::new(&proc_path).exists() {
        return Err(AttachError::ProcessNotFound(pid));
    }
    Ok(())
}

/// Check if we can read the process's memory maps
///
/// Reading `maps` needs the same ptrace access mode as reading memory, so
/// this is the earliest point a permission problem shows up.
///
/// # Errors
/// `AccessDenied` when the kernel refuses, `ProcessNotFound` if the process
/// exited in between.
pub fn check_proc_access(pid: Pid) -> Result<(), AttachError> {
    let maps_path = format!("/proc/{pid}/maps");
    match std::fs::read_to_string(&maps_path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AttachError::ProcessNotFound(pid)),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(AttachError::AccessDenied { pid, source: e })
        }
        // An empty maps file or ESRCH mid-read means the process is exiting
        Err(e) if e.raw_os_error() == Some(libc::ESRCH) => Err(AttachError::ProcessNotFound(pid)),
        Err(e) => Err(AttachError::Io(e)),
    }
}

/// Check if a module has symbols for stack frame resolution
///
/// Returns `false` (and warns) when frames in this module will only show
/// as `module+offset`.
#[must_use]
pub fn check_debug_symbols(module_path: &Path) -> bool {
    let Ok(file_data) = std::fs::read(module_path) else {
        warn!("Cannot read {}, frames will show addresses only", module_path.display());
        return false;
    };

    let Ok(obj) = object::File::parse(&*file_data) else {
        // Not a valid object file, let later stages handle it
        return false;
    };

    let has_debug_info = obj.section_by_name(".debug_info").is_some_and(|s| s.size() > 0);
    let has_symtab = obj.section_by_name(".symtab").is_some_and(|s| s.size() > 0);
    let has_dynsym = obj.section_by_name(".dynsym").is_some_and(|s| s.size() > 0);

    if !has_debug_info && !has_symtab && !has_dynsym {
        warn!("{} is stripped, frames will show addresses only", module_path.display());
        return false;
    }
    if !has_debug_info {
        warn!("{}: no DWARF debug info, source locations unavailable", module_path.display());
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_not_found() {
        let result = check_process_exists(Pid(999_999_999));
        assert!(matches!(result, Err(AttachError::ProcessNotFound(_))));
    }

    #[test]
    fn test_self_is_accessible() {
        let pid = Pid(std::process::id());
        assert!(check_process_exists(pid).is_ok());
        assert!(check_proc_access(pid).is_ok());
    }

    #[test]
    fn test_debug_symbols_of_missing_module() {
        assert!(!check_debug_symbols(Path::new("/nonexistent/path/to/libfoo.so")));
    }

    #[test]
    fn test_debug_symbols_of_test_binary() {
        let exe = std::env::current_exe().unwrap();
        assert!(check_debug_symbols(&exe));
    }
}
