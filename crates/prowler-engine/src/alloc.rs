use crate::target::MemoryRegion;

/// Record of memory ranges the tool has carved out of the target's
/// anonymous writable pages. Lives on the engine, guarded by the engine's
/// exclusive write lock.
#[derive(Debug, Default)]
pub struct AllocationLedger {
    /// Allocated `[start, end)` ranges. Entries never overlap.
    allocated: Vec<(u64, u64)>,
}

impl AllocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds `min_size` contiguous free bytes inside an anonymous `rw-p`
    /// region and records the allocation.
    ///
    /// Candidate gaps within a region are tried in address order: before
    /// the first ledger entry, between entries, after the last entry.
    pub fn find_free_memory(
        &mut self,
        regions: &[MemoryRegion],
        min_size: u64,
    ) -> crate::Result<u64> {
        for region in regions.iter().filter(|r| r.is_anonymous_rw()) {
            if let Some(addr) = self.space_in_region(region.start, region.end, min_size) {
                self.allocated.push((addr, addr + min_size));
                tracing::debug!(
                    addr = format_args!("{addr:#x}"),
                    size = min_size,
                    "carved target memory"
                );
                return Ok(addr);
            }
        }

        Err(crate::Error::NoFreeMemory)
    }

    fn space_in_region(&self, start: u64, end: u64, min_size: u64) -> Option<u64> {
        let mut entries: Vec<(u64, u64)> = self
            .allocated
            .iter()
            .copied()
            .filter(|&(s, e)| s < end && e > start)
            .collect();

        if entries.is_empty() {
            return (end - start >= min_size).then_some(start);
        }

        entries.sort_by_key(|&(s, _)| s);

        if entries[0].0.saturating_sub(start) >= min_size {
            return Some(start);
        }

        for pair in entries.windows(2) {
            let (gap_start, gap_end) = (pair[0].1, pair[1].0);
            if gap_end.saturating_sub(gap_start) >= min_size {
                return Some(gap_start);
            }
        }

        let last_end = entries[entries.len() - 1].1;
        (end.saturating_sub(last_end) >= min_size).then_some(last_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::RegionPerms;

    fn rw_region(start: u64, end: u64) -> MemoryRegion {
        MemoryRegion {
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
        }
    }

    #[test]
    fn allocates_from_region_start() {
        let mut ledger = AllocationLedger::new();
        let regions = [rw_region(0x1000, 0x2000)];

        let addr = ledger.find_free_memory(&regions, 0x100).unwrap();
        assert_eq!(addr, 0x1000);
    }

    #[test]
    fn successive_allocations_never_overlap() {
        let mut ledger = AllocationLedger::new();
        let regions = [rw_region(0x1000, 0x2000)];

        let mut ranges = Vec::new();
        for _ in 0..8 {
            let addr = ledger.find_free_memory(&regions, 0x100).unwrap();
            ranges.push((addr, addr + 0x100));
        }

        for (i, &(s1, e1)) in ranges.iter().enumerate() {
            assert!(s1 >= 0x1000 && e1 <= 0x2000);
            for &(s2, e2) in &ranges[i + 1..] {
                assert!(e1 <= s2 || e2 <= s1, "{s1:#x}..{e1:#x} overlaps {s2:#x}..{e2:#x}");
            }
        }
    }

    #[test]
    fn exhausted_region_spills_into_next() {
        let mut ledger = AllocationLedger::new();
        let regions = [rw_region(0x1000, 0x1100), rw_region(0x4000, 0x5000)];

        assert_eq!(ledger.find_free_memory(&regions, 0x100).unwrap(), 0x1000);
        assert_eq!(ledger.find_free_memory(&regions, 0x100).unwrap(), 0x4000);
    }

    #[test]
    fn skips_non_anonymous_regions() {
        let mut ledger = AllocationLedger::new();

        let mut file_backed = rw_region(0x1000, 0x2000);
        file_backed.inode = 42;
        let mut exec = rw_region(0x3000, 0x4000);
        exec.perms.execute = true;

        let err = ledger.find_free_memory(&[file_backed, exec], 0x10).unwrap_err();
        assert!(matches!(err, crate::Error::NoFreeMemory));
    }

    #[test]
    fn no_space_reports_no_free_memory() {
        let mut ledger = AllocationLedger::new();
        let regions = [rw_region(0x1000, 0x1010)];

        assert_eq!(ledger.find_free_memory(&regions, 0x10).unwrap(), 0x1000);
        let err = ledger.find_free_memory(&regions, 0x10).unwrap_err();
        assert!(matches!(err, crate::Error::NoFreeMemory));
    }
}
