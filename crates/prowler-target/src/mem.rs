use std::io::{IoSlice, IoSliceMut};

use nix::sys::uio::{process_vm_readv, process_vm_writev, RemoteIoVec};
use nix::unistd::Pid;

/// Reads memory from the process with the given ID.
///
/// One vectored syscall per call; the target is not stopped. The
/// transferred count is returned as-is, partial reads included.
pub fn read_process_memory(pid: Pid, addr: u64, buf: &mut [u8]) -> crate::Result<usize> {
    let len = buf.len();
    let mut local = [IoSliceMut::new(buf)];
    let remote = [RemoteIoVec {
        base: addr as usize,
        len,
    }];

    process_vm_readv(pid, &mut local, &remote)
        .inspect_err(
            |e| tracing::error!(error = %e, addr = format_args!("{addr:#x}"), "process_vm_readv"),
        )
        .map_err(crate::Error::Os)
}

/// Writes memory into the process with the given ID.
pub fn write_process_memory(pid: Pid, addr: u64, data: &[u8]) -> crate::Result<usize> {
    let local = [IoSlice::new(data)];
    let remote = [RemoteIoVec {
        base: addr as usize,
        len: data.len(),
    }];

    process_vm_writev(pid, &local, &remote)
        .inspect_err(
            |e| tracing::error!(error = %e, addr = format_args!("{addr:#x}"), "process_vm_writev"),
        )
        .map_err(crate::Error::Os)
}
