//! Snapshot report sink: every line goes to the file and to the console.

use chrono::{DateTime, Local};
use log::debug;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::{Pid, SnapshotError};

const CONSOLE: &str = "<console>";

/// Report file name: `{exe}_{pid}_{timestamp}.txt`, filename-safe
#[must_use]
pub fn snapshot_file_name(exe_name: &str, pid: Pid, timestamp: &str) -> String {
    let stamp: String = timestamp
        .chars()
        .map(|c| if matches!(c, ':' | '/' | '\\' | ' ') { '_' } else { c })
        .collect();
    format!("{exe_name}_{pid}_{stamp}.txt")
}

/// Local wall-clock time as it appears in report file names
#[must_use]
pub fn format_timestamp(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Write a console-only progress line.
///
/// # Errors
/// `SnapshotError::Report` if the console is gone.
pub fn console_line(console: &mut dyn Write, line: &str) -> Result<(), SnapshotError> {
    writeln!(console, "{line}")
        .and_then(|()| console.flush())
        .map_err(|source| SnapshotError::Report { path: PathBuf::from(CONSOLE), source })
}

/// Dual sink; the file is closed when the writer drops
pub struct ReportWriter<'c> {
    path: PathBuf,
    file: File,
    console: &'c mut dyn Write,
}

impl<'c> ReportWriter<'c> {
    /// Create (truncate) the report file at `path`.
    ///
    /// # Errors
    /// `SnapshotError::Report` if the file cannot be created.
    pub fn create(path: PathBuf, console: &'c mut dyn Write) -> Result<Self, SnapshotError> {
        let file = match File::create(&path) {
            Ok(file) => file,
            Err(source) => return Err(SnapshotError::Report { path, source }),
        };
        debug!("Report file {} created", path.display());
        Ok(Self { path, file, console })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one line to the file, then the console, flushing both.
    ///
    /// # Errors
    /// `SnapshotError::Report` naming the sink that failed.
    pub fn emit(&mut self, line: &str) -> Result<(), SnapshotError> {
        writeln!(self.file, "{line}")
            .and_then(|()| self.file.flush())
            .map_err(|source| SnapshotError::Report { path: self.path.clone(), source })?;
        console_line(&mut *self.console, line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_name_is_filename_safe() {
        assert_eq!(
            snapshot_file_name("app.exe", Pid(4242), "2026-10-18 09:15:02"),
            "app.exe_4242_2026-10-18_09_15_02.txt"
        );
        assert_eq!(
            snapshot_file_name("app", Pid(7), "10/18/2026 9:15:02 AM"),
            "app_7_10_18_2026_9_15_02_AM.txt"
        );
    }

    #[test]
    fn test_timestamp_format() {
        let now = Local.with_ymd_and_hms(2026, 10, 18, 9, 15, 2).unwrap();
        assert_eq!(format_timestamp(now), "2026-10-18 09:15:02");
    }

    #[test]
    fn test_emit_mirrors_to_file_and_console() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let mut console = Vec::new();

        let mut writer = ReportWriter::create(path.clone(), &mut console).unwrap();
        writer.emit("ClrVersion: CoreCLR 8.0.1").unwrap();
        writer.emit("").unwrap();
        drop(writer);

        let file = std::fs::read_to_string(&path).unwrap();
        assert_eq!(file, "ClrVersion: CoreCLR 8.0.1\n\n");
        assert_eq!(String::from_utf8(console).unwrap(), file);
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let mut console = Vec::new();
        let err = ReportWriter::create(PathBuf::from("/nonexistent/dir/r.txt"), &mut console)
            .err()
            .unwrap();
        assert!(matches!(err, SnapshotError::Report { .. }));
    }
}
