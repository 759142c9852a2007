//! # Snapshot session
//!
//! Drives one run from a PID to a finished report:
//!
//! ```text
//! Idle ─▶ ArchitectureChecked ─┬─▶ Relaunching                       (terminal)
//!                              └─▶ Attaching ─▶ Attached ─▶ ReportOpen
//!                                    ─▶ ModulesWritten ─▶ ThreadsWritten
//!                                    ─▶ DomainsWritten ─▶ Done           (terminal)
//! any non-terminal state ─▶ Failed                                       (terminal)
//! ```
//!
//! The attach happens before the report file is created, so a target that
//! can't be reached leaves nothing on disk. Once the file exists, a thread or
//! domain failure ends the session with the partial report kept.
//!
//! Resources are scoped to [`Orchestrator::run`]: the report closes first,
//! then the runtime view, then the attach session, then the process handle.

use chrono::Local;
use log::{debug, info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use crate::architecture::{decide, probe_target, Decision};
use crate::cli::parse_pid;
use crate::domain::{AttachError, Pid, SnapshotError};
use crate::introspection::{Introspector, ProcessProvider};
use crate::relaunch::{alternate_binary_path, Launcher};
use crate::report::{console_line, format_timestamp, snapshot_file_name, ReportWriter};
use crate::snapshot::{write_app_domains, write_modules, write_threads};

/// Default attach timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Knobs of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotConfig {
    pub timeout: Duration,
    pub output_dir: PathBuf,
    /// Start the x86 sibling on a mismatch instead of failing
    pub relaunch: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { timeout: DEFAULT_TIMEOUT, output_dir: PathBuf::from("."), relaunch: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ArchitectureChecked,
    Relaunching,
    Attaching,
    Attached,
    ReportOpen,
    ModulesWritten,
    ThreadsWritten,
    DomainsWritten,
    Done,
    Failed,
}

/// How a session ended without error
#[derive(Debug)]
pub enum Outcome {
    /// Report written
    Completed { report: PathBuf, alive_threads: usize },
    /// The x86 inspector ran instead
    Relaunched { program: PathBuf, status: ExitStatus },
    /// The PID argument was not a number; nothing was attached
    InvalidPid,
}

/// One snapshot session over pluggable collaborators
pub struct Orchestrator<'d> {
    processes: &'d dyn ProcessProvider,
    introspector: &'d dyn Introspector,
    launcher: &'d dyn Launcher,
    config: SnapshotConfig,
    state: SessionState,
}

impl<'d> Orchestrator<'d> {
    #[must_use]
    pub fn new(
        processes: &'d dyn ProcessProvider,
        introspector: &'d dyn Introspector,
        launcher: &'d dyn Launcher,
        config: SnapshotConfig,
    ) -> Self {
        Self { processes, introspector, launcher, config, state: SessionState::Idle }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session: {:?} -> {next:?}", self.state);
        self.state = next;
    }

    /// Run a session for the raw PID argument.
    ///
    /// A non-numeric argument prints the parse message and returns
    /// [`Outcome::InvalidPid`] without touching any process.
    ///
    /// # Errors
    /// See [`Orchestrator::run`].
    pub fn run_arg(&mut self, raw_pid: &str, console: &mut dyn Write) -> Result<Outcome, SnapshotError> {
        match parse_pid(raw_pid) {
            Ok(pid) => self.run(pid, console),
            Err(e) => {
                console_line(console, &e.to_string())?;
                Ok(Outcome::InvalidPid)
            }
        }
    }

    /// Run a session against `pid`, progress going to `console`.
    ///
    /// # Errors
    /// `SnapshotError` for every way the session can end early. The state
    /// is `Failed` afterwards.
    pub fn run(&mut self, pid: Pid, console: &mut dyn Write) -> Result<Outcome, SnapshotError> {
        let result = self.run_session(pid, console);
        match &result {
            Ok(Outcome::Relaunched { .. } | Outcome::InvalidPid) => {}
            Ok(Outcome::Completed { .. }) => self.transition(SessionState::Done),
            Err(e) => {
                debug!("Session for {pid} failed: {e}");
                self.transition(SessionState::Failed);
            }
        }
        result
    }

    fn run_session(&mut self, pid: Pid, console: &mut dyn Write) -> Result<Outcome, SnapshotError> {
        let connect = |source: AttachError| SnapshotError::Connect { pid, source };

        let me = self.processes.current().map_err(|e| connect(AttachError::Io(e)))?;
        let inspector = me.architecture;
        console_line(console, &format!("{}[{}] is {inspector}", me.exe_name(), me.pid))?;

        let process = self.processes.open(pid).map_err(connect)?;
        let target_arch = probe_target(process.as_ref()).map_err(connect)?;
        console_line(
            console,
            &format!(
                "Successfully connected to {target_arch} process '{}'[{pid}]",
                process.exe_path().display()
            ),
        )?;
        self.transition(SessionState::ArchitectureChecked);

        if decide(inspector, target_arch) == Decision::Relaunch {
            if !self.config.relaunch {
                return Err(SnapshotError::ArchitectureMismatch { pid, inspector, target: target_arch });
            }
            self.transition(SessionState::Relaunching);
            console_line(console, "Need restart it as x86 process")?;
            let program = alternate_binary_path(&me.exe_path);
            let status = self
                .launcher
                .launch(&program, &self.relaunch_args(pid))
                .map_err(|source| SnapshotError::Relaunch { path: program.clone(), source })?;
            info!("{} exited with {status}", program.display());
            return Ok(Outcome::Relaunched { program, status });
        }

        console_line(console, "Start working...")?;
        self.transition(SessionState::Attaching);
        let attach = |source: AttachError| SnapshotError::Attach { pid, source };
        let data_target = self.introspector.attach(pid, self.config.timeout).map_err(attach)?;
        let versions = data_target.clr_versions();
        let Some(clr) = versions.first() else {
            return Err(attach(AttachError::NoRuntime(pid)));
        };
        if versions.len() > 1 {
            let ignored: Vec<String> = versions[1..].iter().map(ToString::to_string).collect();
            warn!("Process {pid} hosts {} runtimes, ignoring {}", versions.len(), ignored.join(", "));
        }
        let runtime = data_target.create_runtime(clr).map_err(attach)?;
        self.transition(SessionState::Attached);

        let exe_name = process.exe_name();
        let file_name = snapshot_file_name(&exe_name, pid, &format_timestamp(Local::now()));
        let path = self.config.output_dir.join(file_name);
        console_line(console, &format!("The result will be saved in: '{}'", path.display()))?;

        let alive_threads = {
            let mut report = ReportWriter::create(path.clone(), console)?;
            self.transition(SessionState::ReportOpen);

            report.emit(&format!("ClrVersion: {clr}"))?;
            report.emit(&format!("Process: {exe_name}"))?;
            report.emit("Version: ")?;
            for line in process.file_version().lines() {
                report.emit(&line)?;
            }

            write_modules(data_target.as_ref(), &mut report)?;
            report.emit("")?;
            self.transition(SessionState::ModulesWritten);

            let alive = write_threads(runtime.as_ref(), &mut report)?;
            report.emit("")?;
            self.transition(SessionState::ThreadsWritten);

            write_app_domains(runtime.as_ref(), &mut report)?;
            self.transition(SessionState::DomainsWritten);
            alive
        };

        console_line(console, "Finished.")?;
        Ok(Outcome::Completed { report: path, alive_threads })
    }

    /// Arguments for the x86 sibling: same PID, same settings, no second hop
    fn relaunch_args(&self, pid: Pid) -> Vec<String> {
        vec![
            "--timeout-ms".to_string(),
            self.config.timeout.as_millis().to_string(),
            "--output-dir".to_string(),
            self.config.output_dir.display().to_string(),
            "--no-relaunch".to_string(),
            pid.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SnapshotConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(5000));
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert!(config.relaunch);
    }
}
