//! Hand-off to the architecture-matching inspector binary.

use log::info;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use procsnap_common::alternate_file_name;

/// Path of the x86 sibling of `current_exe`, in the same directory.
#[must_use]
pub fn alternate_binary_path(current_exe: &Path) -> PathBuf {
    let file_name = current_exe
        .file_name()
        .map_or_else(|| "procsnap".to_string(), |name| name.to_string_lossy().into_owned());
    current_exe.with_file_name(alternate_file_name(&file_name))
}

/// Starts another inspector process and waits for it
pub trait Launcher {
    /// Run `program` with `args`, inheriting the console.
    ///
    /// # Errors
    /// Returns the spawn error if the program cannot be started.
    fn launch(&self, program: &Path, args: &[String]) -> std::io::Result<ExitStatus>;
}

/// Launcher backed by [`std::process::Command`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(&self, program: &Path, args: &[String]) -> std::io::Result<ExitStatus> {
        info!("Relaunching as {} {}", program.display(), args.join(" "));
        Command::new(program).args(args).status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternate_binary_next_to_current() {
        assert_eq!(
            alternate_binary_path(Path::new("/opt/tools/procsnap")),
            PathBuf::from("/opt/tools/procsnap_x86")
        );
        assert_eq!(
            alternate_binary_path(Path::new("/opt/tools/procsnap.bin")),
            PathBuf::from("/opt/tools/procsnap_x86.bin")
        );
    }

    #[test]
    fn test_missing_program_fails_to_launch() {
        let err = SystemLauncher
            .launch(Path::new("/nonexistent/procsnap_x86"), &["1".to_string()])
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
