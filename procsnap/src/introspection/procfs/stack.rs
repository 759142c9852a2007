//! Stack walking without stopping the target.
//!
//! The kernel exposes the user stack pointer and program counter of a thread
//! that is blocked (in a syscall or sleeping) through
//! `/proc/<pid>/task/<tid>/syscall`. That gives the innermost frame. The
//! rest of the stack is recovered the way `!DumpStack` does it: every word
//! between the stack pointer and the top of the stack mapping that points
//! into executable memory is reported as a candidate return address.
//!
//! A thread that is on-CPU reports `running` and yields no frames.

use std::fs;
use std::io::ErrorKind;

use super::memory::RemoteMemory;
use crate::domain::{IntrospectionError, Pid, StackFrameRecord, Tid};

const SCAN_CHUNK: usize = 4096;

/// `(stack_pointer, program_counter)` of a blocked thread
pub type Registers = (u64, u64);

/// Read the saved user registers of a thread.
///
/// `Ok(None)` when the thread is running or has exited since it was listed.
///
/// # Errors
/// `StackWalkFailed` when the kernel refuses access or the file is garbled.
pub fn read_registers(pid: Pid, tid: Tid) -> Result<Option<Registers>, IntrospectionError> {
    let path = format!("/proc/{pid}/task/{tid}/syscall");
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(IntrospectionError::StackWalkFailed {
                tid,
                reason: format!("cannot read {path}: {e}"),
            })
        }
    };
    parse_syscall_line(&content).map_err(|reason| IntrospectionError::StackWalkFailed { tid, reason })
}

/// Parse `running`, `-1 SP PC` or `NR ARG1..ARG6 SP PC`
fn parse_syscall_line(content: &str) -> Result<Option<Registers>, String> {
    let content = content.trim();
    if content == "running" {
        return Ok(None);
    }

    let fields: Vec<&str> = content.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(format!("unexpected syscall line '{content}'"));
    }
    let hex = |s: &str| {
        u64::from_str_radix(s.trim_start_matches("0x"), 16)
            .map_err(|e| format!("bad register value '{s}': {e}"))
    };
    let sp = hex(fields[fields.len() - 2])?;
    let pc = hex(fields[fields.len() - 1])?;
    Ok(Some((sp, pc)))
}

/// Lazily scans a thread's stack, innermost frame first
pub struct StackScan<C, F> {
    memory: RemoteMemory,
    is_code: C,
    describe: F,
    first: Option<Registers>,
    cursor: u64,
    end: u64,
    word_size: usize,
    chunk: Vec<u8>,
    chunk_base: u64,
    done: bool,
}

impl<C, F> StackScan<C, F>
where
    C: Fn(u64) -> bool,
    F: Fn(u64) -> String,
{
    /// Scan `[sp, stack_end)` after reporting the `(sp, pc)` frame.
    ///
    /// `is_code` tells return-address candidates from data; `describe`
    /// renders an instruction pointer.
    pub fn new(
        memory: RemoteMemory,
        registers: Registers,
        stack_end: u64,
        word_size: usize,
        is_code: C,
        describe: F,
    ) -> Self {
        let (sp, _) = registers;
        Self {
            memory,
            describe,
            is_code,
            first: Some(registers),
            cursor: sp,
            end: stack_end,
            word_size,
            chunk: Vec::with_capacity(SCAN_CHUNK),
            chunk_base: sp,
            done: false,
        }
    }

    fn frame(&self, stack_pointer: u64, instruction_pointer: u64) -> StackFrameRecord {
        StackFrameRecord {
            stack_pointer,
            instruction_pointer,
            display_text: (self.describe)(instruction_pointer),
        }
    }

    fn read_word(&mut self, slot: u64) -> Result<u64, IntrospectionError> {
        let word = self.word_size as u64;
        let cached_end = self.chunk_base + self.chunk.len() as u64;
        if slot < self.chunk_base || slot + word > cached_end {
            #[allow(clippy::cast_possible_truncation)]
            let len = SCAN_CHUNK.min((self.end - slot) as usize);
            self.chunk.resize(len, 0);
            let read = self.memory.read(slot, &mut self.chunk)?;
            self.chunk.truncate(read);
            self.chunk_base = slot;
            if self.chunk.len() < self.word_size {
                return Err(IntrospectionError::MemoryRead {
                    addr: slot,
                    len: self.word_size,
                    source: std::io::Error::from(ErrorKind::UnexpectedEof),
                });
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        let at = (slot - self.chunk_base) as usize;
        let bytes = &self.chunk[at..at + self.word_size];
        Ok(match self.word_size {
            4 => u64::from(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            _ => u64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
        })
    }
}

impl<C, F> Iterator for StackScan<C, F>
where
    C: Fn(u64) -> bool,
    F: Fn(u64) -> String,
{
    type Item = Result<StackFrameRecord, IntrospectionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some((sp, pc)) = self.first.take() {
            return Some(Ok(self.frame(sp, pc)));
        }

        let word = self.word_size as u64;
        while self.cursor + word <= self.end {
            let slot = self.cursor;
            let value = match self.read_word(slot) {
                Ok(value) => value,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            self.cursor += word;
            if value != 0 && (self.is_code)(value) {
                return Some(Ok(self.frame(slot, value)));
            }
        }

        self.done = true;
        None
    }
}
