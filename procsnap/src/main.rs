//! # procsnap - Main Entry Point
//!
//! Parses the command line, wires the Linux collaborators into an
//! [`Orchestrator`] and maps the session result to an exit code. This is the
//! only place errors are printed; everything below returns them.

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use log::debug;

use procsnap::cli::{usage_lines, Args};
use procsnap::introspection::procfs::{LinuxProcesses, ProcfsIntrospector};
use procsnap::orchestrator::{Orchestrator, Outcome};
use procsnap::relaunch::SystemLauncher;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_ERROR
        }
    });
}

fn run() -> Result<i32> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            return Ok(EXIT_SUCCESS);
        }
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::MissingRequiredArgument | ErrorKind::UnknownArgument
            ) =>
        {
            debug!("{e}");
            for line in usage_lines() {
                println!("{line}");
            }
            return Ok(EXIT_USAGE);
        }
        Err(e) => {
            e.print()?;
            return Ok(EXIT_USAGE);
        }
    };

    let processes = LinuxProcesses;
    let introspector = ProcfsIntrospector;
    let launcher = SystemLauncher;
    let mut orchestrator = Orchestrator::new(&processes, &introspector, &launcher, args.config());

    let stdout = std::io::stdout();
    let mut console = stdout.lock();
    let code = match orchestrator.run_arg(&args.pid, &mut console)? {
        Outcome::Completed { .. } => EXIT_SUCCESS,
        Outcome::Relaunched { status, .. } if status.success() => EXIT_SUCCESS,
        Outcome::Relaunched { status, .. } => status.code().unwrap_or(EXIT_ERROR),
        Outcome::InvalidPid => EXIT_USAGE,
    };
    Ok(code)
}
