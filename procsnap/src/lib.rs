//! # procsnap - Managed Runtime Snapshots
//!
//! procsnap attaches to a running process without stopping it, finds the
//! managed runtime it hosts (CoreCLR or Mono) and writes a plain-text
//! snapshot: runtime version, executable version info, loaded modules, the
//! stack of every thread and the application domains. Every report line is
//! printed to the console as it is written to the file.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐   pid    ┌──────────────┐  x64 → x86  ┌──────────────┐
//! │     CLI      │────────▶│ Orchestrator │────────────▶│   Relaunch   │
//! └──────────────┘          └──────┬───────┘             │ procsnap_x86 │
//!                                  │ attach              └──────────────┘
//!                                  ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Introspection (trait boundary)                  │
//! │  ProcessProvider · Introspector · DataTarget · ClrRuntime        │
//! │                                                                 │
//! │  procfs backend: /proc/<pid>/{maps,task,syscall}, pidfd,         │
//! │                  process_vm_readv, ELF/DWARF, perf maps          │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ records
//!                         ▼
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   Modules    │──▶│   Threads    │──▶│  AppDomains  │──▶ ReportWriter
//! └──────────────┘   └──────────────┘   └──────────────┘    (file + console)
//! ```
//!
//! ## Module Structure
//!
//! - [`orchestrator`]: the session state machine
//! - [`architecture`]: inspector/target bit-width and the relaunch decision
//! - [`relaunch`]: locating and starting the x86 sibling binary
//! - [`introspection`]: collaborator traits and the [`introspection::procfs`] backend
//! - [`snapshot`]: module, thread and domain sections of the report
//! - [`report`]: dual file/console sink and report file naming
//! - [`symbolization`]: memory maps, ELF/DWARF symbols and JIT perf maps
//! - [`preflight`] / [`process_lookup`]: `/proc` access checks and readers
//! - [`cli`]: command-line arguments
//! - [`domain`]: ids, records and error types
//!
//! ## Typical Usage
//!
//! ```bash
//! # Snapshot process 4242 into the current directory
//! procsnap 4242
//!
//! # Managed frames need the runtime's perf map
//! DOTNET_PerfMapEnabled=1 dotnet MyApp.dll &
//! procsnap $! -o /tmp/snapshots
//! ```

pub mod architecture;
pub mod cli;
pub mod domain;
pub mod introspection;
pub mod orchestrator;
pub mod preflight;
pub mod process_lookup;
pub mod relaunch;
pub mod report;
pub mod snapshot;
pub mod symbolization;
