//! Process handles and `/proc/<pid>` lookups.

#![allow(unsafe_code)] // pidfd_open has no libc wrapper

use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::Read;
use std::os::fd::{FromRawFd, OwnedFd};
use std::path::PathBuf;

use crate::domain::{AttachError, Pid, Tid};

/// RAII handle on a target process.
///
/// Backed by a pidfd where the kernel supports it, otherwise by an open
/// `/proc/<pid>` directory. Either pins the process identity for the
/// session; the descriptor is closed on drop.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Pid,
    /// Only held; closing it on drop ends the pin
    _pin: OwnedFd,
}

impl ProcessHandle {
    /// Open a handle on `pid`.
    ///
    /// # Errors
    /// `ProcessNotFound` if no such process exists, `AccessDenied` if the
    /// kernel refuses the handle.
    pub fn open(pid: Pid) -> Result<Self, AttachError> {
        let raw = unsafe { libc::syscall(libc::SYS_pidfd_open, pid.0 as libc::pid_t, 0) };
        if raw >= 0 {
            #[allow(clippy::cast_possible_truncation)]
            let fd = unsafe { OwnedFd::from_raw_fd(raw as libc::c_int) };
            return Ok(Self { pid, _pin: fd });
        }

        let err = std::io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::ESRCH | libc::EINVAL) => Err(AttachError::ProcessNotFound(pid)),
            // ENOSYS before 5.3, EPERM under seccomp profiles that predate pidfds
            _ => {
                let dir = File::open(format!("/proc/{pid}")).map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => AttachError::ProcessNotFound(pid),
                    std::io::ErrorKind::PermissionDenied => {
                        AttachError::AccessDenied { pid, source: e }
                    }
                    _ => AttachError::Io(e),
                })?;
                Ok(Self { pid, _pin: OwnedFd::from(dir) })
            }
        }
    }

    #[must_use]
    pub fn pid(&self) -> Pid {
        self.pid
    }
}

/// Resolve binary path from PID via `/proc/<pid>/exe`.
///
/// # Errors
/// Returns error if the process doesn't exist or `/proc/<pid>/exe` is not readable.
pub fn resolve_exe_path(pid: Pid) -> Result<PathBuf> {
    let exe_link = format!("/proc/{pid}/exe");
    fs::read_link(&exe_link).with_context(|| format!("Cannot read {exe_link}"))
}

/// Read the first `N` bytes of the target's executable image.
///
/// # Errors
/// Returns the raw I/O error so callers can tell "gone" from "denied".
pub fn read_exe_header<const N: usize>(pid: Pid) -> std::io::Result<[u8; N]> {
    let mut header = [0u8; N];
    File::open(format!("/proc/{pid}/exe"))?.read_exact(&mut header)?;
    Ok(header)
}

/// Command line of the process, NUL-separated arguments split out.
///
/// # Errors
/// Returns an error if `/proc/<pid>/cmdline` cannot be read.
pub fn read_cmdline(pid: Pid) -> Result<Vec<String>> {
    let path = format!("/proc/{pid}/cmdline");
    let raw = fs::read(&path).with_context(|| format!("Cannot read {path}"))?;
    Ok(raw
        .split(|b| *b == 0)
        .filter(|arg| !arg.is_empty())
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect())
}

/// Current working directory of the process.
///
/// # Errors
/// Returns an error if `/proc/<pid>/cwd` cannot be resolved.
pub fn read_cwd(pid: Pid) -> Result<PathBuf> {
    let link = format!("/proc/{pid}/cwd");
    fs::read_link(&link).with_context(|| format!("Cannot read {link}"))
}

/// Thread ids of the process in ascending order.
///
/// # Errors
/// Returns an error if `/proc/<pid>/task` cannot be listed.
pub fn list_tasks(pid: Pid) -> Result<Vec<Tid>> {
    let task_dir = format!("/proc/{pid}/task");
    let entries = fs::read_dir(&task_dir).context(format!("Failed to read {task_dir}"))?;

    let mut tids: Vec<Tid> = entries
        .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse::<u32>().ok().map(Tid))
        .collect();
    tids.sort_by_key(|tid| tid.0);
    Ok(tids)
}

/// Scheduler state letter of a thread, `None` once the thread is gone.
///
/// # Errors
/// Returns an error if the stat file exists but cannot be parsed.
pub fn task_state(pid: Pid, tid: Tid) -> Result<Option<char>> {
    let stat_path = format!("/proc/{pid}/task/{tid}/stat");
    let stat_content = match fs::read_to_string(&stat_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).context(format!("Failed to read {stat_path}")),
    };
    let close = stat_content.rfind(')').context("Invalid stat format")?;
    let state = stat_content[close + 1..].trim_start().chars().next();
    match state {
        Some(state) => Ok(Some(state)),
        None => bail!("Invalid stat format"),
    }
}

/// Extract command name from `/proc/<pid>/stat`.
/// Format: "pid (comm) state ..."
///
/// # Errors
/// Returns an error if the line has no `(comm)` field.
pub fn extract_comm(stat_line: &str) -> Result<String> {
    let open = stat_line.find('(').context("Invalid stat format")?;
    let close = stat_line.rfind(')').context("Invalid stat format")?;
    if open >= close {
        bail!("Invalid stat format");
    }
    Ok(stat_line[open + 1..close].to_string())
}
