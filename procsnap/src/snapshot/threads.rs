//! `Threads:` section: one block per alive thread, one line per dead one.

use log::debug;

use crate::domain::{IntrospectionError, Section, SnapshotError, StackFrameRecord};
use crate::introspection::ClrRuntime;
use crate::report::ReportWriter;

/// Rule printed above and below every stack
pub const SEPARATOR: &str =
    "============================================================================================================================================";

fn fatal(source: IntrospectionError) -> SnapshotError {
    SnapshotError::FatalTraversal { section: Section::Threads, source }
}

/// `{sp:>12X} {ip:>12X} {text}`
#[must_use]
pub fn frame_line(frame: &StackFrameRecord) -> String {
    format!("{:>12X} {:>12X} {}", frame.stack_pointer, frame.instruction_pointer, frame.display_text)
}

/// Write every thread and the closing `Alive Threads: n` line.
///
/// Returns the number of alive threads.
///
/// # Errors
/// `FatalTraversal` if the thread list or a stack walk fails, or a report
/// I/O error.
pub fn write_threads(
    runtime: &dyn ClrRuntime,
    report: &mut ReportWriter<'_>,
) -> Result<usize, SnapshotError> {
    report.emit("Threads: ")?;

    let threads = runtime.threads().map_err(fatal)?;
    let mut alive = 0;
    for thread in &threads {
        if !thread.is_alive {
            report.emit(&format!("Thread[{}] isn't alive", thread.id_pair()))?;
            continue;
        }
        alive += 1;

        report.emit(&format!("Thread {:X}:", thread.os_thread_id))?;
        report.emit(SEPARATOR)?;
        let mut depth = 0usize;
        for frame in runtime.stack_trace(thread).map_err(fatal)? {
            report.emit(&frame_line(&frame.map_err(fatal)?))?;
            depth += 1;
        }
        report.emit(SEPARATOR)?;
        report.emit("")?;
        debug!("Thread {}: {depth} frames", thread.os_thread_id);
    }

    report.emit(&format!("Alive Threads: {alive}"))?;
    Ok(alive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separator_width() {
        assert_eq!(SEPARATOR.len(), 140);
        assert!(SEPARATOR.chars().all(|c| c == '='));
    }

    #[test]
    fn test_frame_line_is_right_aligned_upper_hex() {
        let frame = StackFrameRecord {
            stack_pointer: 0x7ffd_5e1a_0b38,
            instruction_pointer: 0xab,
            display_text: "libc.so.6!nanosleep+0x17".to_string(),
        };
        assert_eq!(frame_line(&frame), "7FFD5E1A0B38           AB libc.so.6!nanosleep+0x17");
    }
}
