//! In-memory fake target shared by the reader/writer tests.

use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

use crate::target::{MemoryRegion, RegionPerms, TargetMemory};

/// Sparse byte-addressed fake of a target address space.
#[derive(Default)]
pub(crate) struct FakeMemory {
    bytes: Mutex<HashMap<u64, u8>>,
    regions: Vec<MemoryRegion>,
}

impl FakeMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an anonymous `rw-p` region the allocation ledger may carve from.
    pub fn with_rw_region(mut self, start: u64, end: u64) -> Self {
        self.regions.push(MemoryRegion {
            start,
            end,
            perms: RegionPerms {
                read: true,
                write: true,
                execute: false,
                shared: false,
                private: true,
            },
            offset: 0,
            device: "00:00".to_owned(),
            inode: 0,
        });
        self
    }

    pub fn put(&self, addr: u64, data: &[u8]) {
        let mut bytes = self.bytes.lock().unwrap();
        for (i, &b) in data.iter().enumerate() {
            bytes.insert(addr + i as u64, b);
        }
    }

    pub fn put_word(&self, addr: u64, word: u64) {
        self.put(addr, &word.to_le_bytes());
    }

    pub fn get(&self, addr: u64, len: usize) -> Vec<u8> {
        let bytes = self.bytes.lock().unwrap();
        (0..len)
            .map(|i| bytes.get(&(addr + i as u64)).copied().unwrap_or(0xaa))
            .collect()
    }

    pub fn get_word(&self, addr: u64) -> u64 {
        u64::from_le_bytes(self.get(addr, 8).try_into().unwrap())
    }
}

impl TargetMemory for FakeMemory {
    fn read_memory(&self, addr: u64, buf: &mut [u8]) -> io::Result<usize> {
        let bytes = self.bytes.lock().unwrap();
        for (i, out) in buf.iter_mut().enumerate() {
            match bytes.get(&(addr + i as u64)) {
                Some(&b) => *out = b,
                None if i == 0 => {
                    return Err(io::Error::new(io::ErrorKind::InvalidInput, "bad address"))
                }
                None => return Ok(i),
            }
        }
        Ok(buf.len())
    }

    fn write_memory(&self, addr: u64, data: &[u8]) -> io::Result<usize> {
        let mut bytes = self.bytes.lock().unwrap();
        for (i, &b) in data.iter().enumerate() {
            bytes.insert(addr + i as u64, b);
        }
        Ok(data.len())
    }

    fn memory_regions(&self) -> io::Result<Vec<MemoryRegion>> {
        Ok(self.regions.clone())
    }
}
