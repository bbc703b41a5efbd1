//! Linux implementations of the engine's target capabilities: memory I/O
//! through the cross-process vectored syscalls, `/proc/<pid>/maps`
//! parsing, and executable/entry-point discovery from `/proc`.
//!
//! The target process is never ptrace-stopped; reads and writes race with
//! its execution by design.
//!
//! ```no_run
//! let engine = prowler_target::attach(4242).unwrap();
//! let value = engine.get("main.answer").unwrap();
//! println!("{}", prowler_engine::value::pretty::render(&value));
//! ```

mod error;
mod locate;
mod maps;
mod mem;

use std::io;

use nix::unistd::Pid;

use prowler_engine::target::{LocatedBinary, MemoryRegion, TargetLocator, TargetMemory};
use prowler_engine::Prowler;

pub use self::error::{Error, Result};
pub use self::locate::{locate_executable, pid_exists};
pub use self::maps::parse_proc_maps;

/// Attaches the inspection engine to the process with the given ID.
pub fn attach(pid: u64) -> prowler_engine::Result<Prowler> {
    Prowler::attach(pid, &ProcLocator, Box::new(ProcMemory::new(pid)))
}

/// [TargetMemory] backed by `process_vm_readv`/`process_vm_writev` and
/// `/proc/<pid>/maps`.
pub struct ProcMemory {
    pid: Pid,
}

impl ProcMemory {
    pub fn new(pid: u64) -> Self {
        Self {
            pid: Pid::from_raw(pid as i32),
        }
    }
}

impl TargetMemory for ProcMemory {
    fn read_memory(&self, addr: u64, buf: &mut [u8]) -> io::Result<usize> {
        mem::read_process_memory(self.pid, addr, buf).map_err(Into::into)
    }

    fn write_memory(&self, addr: u64, data: &[u8]) -> io::Result<usize> {
        mem::write_process_memory(self.pid, addr, data).map_err(Into::into)
    }

    fn memory_regions(&self) -> io::Result<Vec<MemoryRegion>> {
        maps::parse_proc_maps(self.pid.as_raw() as u64).map_err(Into::into)
    }
}

/// [TargetLocator] backed by `/proc/<pid>/exe` and `/proc/<pid>/auxv`.
pub struct ProcLocator;

impl TargetLocator for ProcLocator {
    fn locate(&self, pid: u64) -> io::Result<LocatedBinary> {
        locate::locate_executable(pid).map_err(Into::into)
    }
}
