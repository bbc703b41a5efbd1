use std::io;
use std::path::PathBuf;

/// Read/write access to a live target's virtual address space.
///
/// The engine never stops the target; reads race with the target's own
/// execution and may observe torn values. Partial transfers are reported
/// through the returned count, never retried silently.
pub trait TargetMemory: Send + Sync {
    /// Reads bytes at `addr` into `buf`, returning the transferred count.
    fn read_memory(&self, addr: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes `data` at `addr`, returning the transferred count.
    fn write_memory(&self, addr: u64, data: &[u8]) -> io::Result<usize>;

    /// Snapshot of the target's virtual-memory layout.
    fn memory_regions(&self) -> io::Result<Vec<MemoryRegion>>;
}

/// Discovery of the target's executable and program entry point from
/// operating-system bookkeeping.
pub trait TargetLocator {
    fn locate(&self, pid: u64) -> io::Result<LocatedBinary>;
}

/// One mapped range of the target's address space.
#[derive(Debug, Clone)]
pub struct MemoryRegion {
    pub start: u64,
    pub end: u64,
    pub perms: RegionPerms,
    pub offset: u64,
    pub device: String,
    pub inode: u64,
}

impl MemoryRegion {
    /// Whether this region is anonymous private read+write memory, the only
    /// kind the allocation ledger carves from.
    pub fn is_anonymous_rw(&self) -> bool {
        self.perms.read
            && self.perms.write
            && !self.perms.execute
            && self.perms.private
            && self.offset == 0
            && self.inode == 0
    }
}

/// Permission bits of a memory region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionPerms {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
    pub shared: bool,
    pub private: bool,
}

/// What a [TargetLocator] found out about the target's main executable.
#[derive(Debug, Clone)]
pub struct LocatedBinary {
    /// Path the executable can be read from.
    pub path: PathBuf,

    /// Runtime entry point (from the auxiliary vector).
    pub entry_point: u64,

    /// Difference between runtime and file addresses (zero unless PIE).
    pub load_bias: u64,

    /// Pointer size of the target, in bytes.
    pub pointer_size: u64,

    /// Whether the target is little endian.
    pub little_endian: bool,
}
