//! Remote memory reads via `process_vm_readv(2)`.
//!
//! The target keeps running; no ptrace stop is involved. The kernel applies
//! the same access check as for `/proc/<pid>/mem`.

#![allow(unsafe_code)] // process_vm_readv FFI

use crate::domain::{IntrospectionError, Pid};

/// Reader for another process's address space
#[derive(Debug, Clone, Copy)]
pub struct RemoteMemory {
    pid: Pid,
}

impl RemoteMemory {
    #[must_use]
    pub fn new(pid: Pid) -> Self {
        Self { pid }
    }

    /// Read up to `buf.len()` bytes at `addr`, returning how many were read.
    ///
    /// Short reads happen at the end of a mapping.
    ///
    /// # Errors
    /// `MemoryRead` if nothing could be read, or if the range does not fit
    /// this inspector's address space (an x86 inspector reading an x64 target).
    pub fn read(&self, addr: u64, buf: &mut [u8]) -> Result<usize, IntrospectionError> {
        let Some(remote_addr) = addressable(addr, buf.len()) else {
            return Err(IntrospectionError::MemoryRead {
                addr,
                len: buf.len(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "address out of range for this inspector",
                ),
            });
        };
        let remote = libc::iovec { iov_base: remote_addr as *mut libc::c_void, iov_len: buf.len() };
        let local = libc::iovec { iov_base: buf.as_mut_ptr().cast::<libc::c_void>(), iov_len: buf.len() };

        #[allow(clippy::cast_possible_wrap)]
        let read = unsafe { libc::process_vm_readv(self.pid.0 as libc::pid_t, &local, 1, &remote, 1, 0) };

        if read <= 0 {
            let source = if read == 0 {
                std::io::Error::from(std::io::ErrorKind::UnexpectedEof)
            } else {
                std::io::Error::last_os_error()
            };
            return Err(IntrospectionError::MemoryRead { addr, len: buf.len(), source });
        }

        #[allow(clippy::cast_sign_loss)]
        Ok(read as usize)
    }
}

/// `addr` as a native pointer value, if all of `addr..addr + len` is representable
fn addressable(addr: u64, len: usize) -> Option<usize> {
    let start = usize::try_from(addr).ok()?;
    start.checked_add(len)?;
    Some(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_own_memory() {
        let value: u64 = 0xDEAD_BEEF_CAFE_F00D;
        let memory = RemoteMemory::new(Pid(std::process::id()));
        let mut buf = [0u8; 8];
        let read = memory.read(std::ptr::addr_of!(value) as u64, &mut buf).unwrap();
        assert_eq!(read, 8);
        assert_eq!(u64::from_ne_bytes(buf), value);
    }

    #[test]
    fn test_read_unmapped_address_fails() {
        let memory = RemoteMemory::new(Pid(std::process::id()));
        let mut buf = [0u8; 8];
        let err = memory.read(0x10, &mut buf).unwrap_err();
        assert!(matches!(err, IntrospectionError::MemoryRead { addr: 0x10, .. }));
    }

    #[test]
    fn test_range_past_address_space_is_rejected() {
        let memory = RemoteMemory::new(Pid(std::process::id()));
        let mut buf = [0u8; 8];
        let addr = usize::MAX as u64 - 3;
        let err = memory.read(addr, &mut buf).unwrap_err();
        match err {
            IntrospectionError::MemoryRead { addr: failed, len: 8, source } => {
                assert_eq!(failed, addr);
                assert_eq!(source.kind(), std::io::ErrorKind::InvalidInput);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_addressable() {
        assert_eq!(addressable(0x1000, 8), Some(0x1000));
        assert_eq!(addressable(usize::MAX as u64, 1), None);
        #[cfg(target_pointer_width = "32")]
        assert_eq!(addressable(0x7FFD_0000_1000, 8), None);
    }
}
