//! Attach session over procfs.

use log::{debug, info};

use super::detect::{detect_runtimes, version_from_path};
use super::process::ProcfsProcess;
use super::runtime::ProcfsRuntime;
use crate::domain::{AttachError, ClrInfo, IntrospectionError, ModuleRecord, Pid};
use crate::introspection::{ClrRuntime, DataTarget, TargetProcess};
use crate::symbolization::MemoryMap;

/// Attached target; owns its own process handle for the session
#[derive(Debug)]
pub struct ProcfsTarget {
    process: ProcfsProcess,
    runtimes: Vec<ClrInfo>,
}

impl ProcfsTarget {
    /// Open `pid` and detect hosted runtimes.
    ///
    /// # Errors
    /// `AttachError` if the process cannot be opened or its maps read.
    pub fn attach(pid: Pid) -> Result<Self, AttachError> {
        let process = ProcfsProcess::open(pid)?;
        let map = MemoryMap::read(pid.0)?;
        let runtimes = detect_runtimes(&map);

        match runtimes.as_slice() {
            [] => info!("No managed runtime mapped in process {pid}"),
            found => {
                for runtime in found {
                    info!("Found {runtime} ({})", runtime.module_path.display());
                }
            }
        }

        Ok(Self { process, runtimes })
    }

    #[must_use]
    pub fn pid(&self) -> Pid {
        self.process.pid()
    }

    #[must_use]
    pub fn process(&self) -> &ProcfsProcess {
        &self.process
    }
}

impl DataTarget for ProcfsTarget {
    fn enumerate_modules(&self) -> Result<Vec<ModuleRecord>, IntrospectionError> {
        let map = MemoryMap::read(self.pid().0)?;
        let modules: Vec<ModuleRecord> = map
            .file_paths()
            .into_iter()
            .map(|path| ModuleRecord {
                file_path: path.to_path_buf(),
                version: version_from_path(path).unwrap_or_default(),
            })
            .collect();
        debug!("Process {}: {} modules", self.pid(), modules.len());
        Ok(modules)
    }

    fn clr_versions(&self) -> &[ClrInfo] {
        &self.runtimes
    }

    fn create_runtime(&self, info: &ClrInfo) -> Result<Box<dyn ClrRuntime + '_>, AttachError> {
        Ok(Box::new(ProcfsRuntime::new(self, info)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_self_has_no_runtime() {
        let target = ProcfsTarget::attach(Pid(std::process::id())).unwrap();
        assert!(target.clr_versions().is_empty());
    }

    #[test]
    fn test_self_modules_start_with_executable() {
        let target = ProcfsTarget::attach(Pid(std::process::id())).unwrap();
        let modules = target.enumerate_modules().unwrap();
        assert_eq!(modules[0].file_path, std::env::current_exe().unwrap());
    }
}
