//! Command-line interface

pub mod args;

pub use args::{parse_pid, usage_lines, Args};
