//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::{Pid, UsageError};
use crate::orchestrator::SnapshotConfig;

#[derive(Parser, Debug)]
#[command(
    name = "procsnap",
    version,
    about = "Snapshot the managed runtime of a running process",
    after_help = "\
EXAMPLES:
    procsnap 4242                            Report into the current directory
    procsnap 4242 -o /tmp/snapshots          Report into /tmp/snapshots
    RUST_LOG=procsnap=debug procsnap 4242    Show attach and stack-walk details"
)]
pub struct Args {
    /// Process ID to inspect
    #[arg(value_name = "PID", allow_hyphen_values = true)]
    pub pid: String,

    /// Give up attaching after this many milliseconds
    #[arg(long, value_name = "MS", default_value = "5000")]
    pub timeout_ms: u64,

    /// Directory the report file is written to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Report an architecture mismatch instead of starting the x86 inspector
    #[arg(long)]
    pub no_relaunch: bool,
}

impl Args {
    #[must_use]
    pub fn config(&self) -> SnapshotConfig {
        SnapshotConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            output_dir: self.output_dir.clone(),
            relaunch: !self.no_relaunch,
        }
    }
}

/// Parse the PID argument the way the usage message promises.
///
/// # Errors
/// `UsageError::InvalidPid` for anything that is not a non-negative integer.
pub fn parse_pid(raw: &str) -> Result<Pid, UsageError> {
    raw.parse::<u32>().map(Pid).map_err(|_| UsageError::InvalidPid(raw.to_string()))
}

/// Lines printed for a missing or extra argument
#[must_use]
pub fn usage_lines() -> [&'static str; 2] {
    ["Incorrect input. Usage: ", "   procsnap ProcessId"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pid() {
        assert_eq!(parse_pid("4242"), Ok(Pid(4242)));
        assert_eq!(parse_pid("abc"), Err(UsageError::InvalidPid("abc".to_string())));
        assert_eq!(parse_pid("-1"), Err(UsageError::InvalidPid("-1".to_string())));
        assert_eq!(parse_pid("12.5"), Err(UsageError::InvalidPid("12.5".to_string())));
    }

    #[test]
    fn test_invalid_pid_message() {
        assert_eq!(
            parse_pid("x1").unwrap_err().to_string(),
            "Couldn't parse 'x1' as int, exiting..."
        );
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["procsnap", "4242"]).unwrap();
        let config = args.config();
        assert_eq!(args.pid, "4242");
        assert_eq!(config.timeout, Duration::from_millis(5000));
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert!(config.relaunch);
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from([
            "procsnap", "--timeout-ms", "250", "-o", "/tmp/out", "--no-relaunch", "17",
        ])
        .unwrap();
        let config = args.config();
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert!(!config.relaunch);
    }

    #[test]
    fn test_hyphenated_pid_is_a_value() {
        let args = Args::try_parse_from(["procsnap", "-x"]).unwrap();
        assert_eq!(args.pid, "-x");
        let args = Args::try_parse_from(["procsnap", "-o", "/tmp/out", "-5"]).unwrap();
        assert_eq!(args.pid, "-5");
        assert_eq!(args.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_missing_and_extra_arguments_are_rejected() {
        assert!(Args::try_parse_from(["procsnap"]).is_err());
        assert!(Args::try_parse_from(["procsnap", "1", "2"]).is_err());
    }
}
