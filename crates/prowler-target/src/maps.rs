use std::path::PathBuf;

use prowler_engine::target::{MemoryRegion, RegionPerms};

/// Parses `/proc/<pid>/maps` into the engine's region model.
pub fn parse_proc_maps(pid: u64) -> crate::Result<Vec<MemoryRegion>> {
    let path = PathBuf::from(format!("/proc/{pid}/maps"));
    let content = std::fs::read_to_string(&path).map_err(|e| crate::Error::File(path, e))?;
    Ok(parse_maps(&content))
}

fn parse_maps(content: &str) -> Vec<MemoryRegion> {
    content.lines().filter_map(parse_line).collect()
}

/// One maps line: `start-end perms offset dev inode [path]`.
fn parse_line(line: &str) -> Option<MemoryRegion> {
    let mut fields = line.split_whitespace();

    let range = fields.next()?;
    let perms = fields.next()?;
    let offset = fields.next()?;
    let device = fields.next()?;
    let inode = fields.next()?;

    let (start, end) = range.split_once('-')?;

    Some(MemoryRegion {
        start: u64::from_str_radix(start, 16).ok()?,
        end: u64::from_str_radix(end, 16).ok()?,
        perms: parse_perms(perms),
        offset: u64::from_str_radix(offset, 16).ok()?,
        device: device.to_owned(),
        inode: inode.parse().ok()?,
    })
}

fn parse_perms(perms: &str) -> RegionPerms {
    let mut chars = perms.chars();
    let read = chars.next() == Some('r');
    let write = chars.next() == Some('w');
    let execute = chars.next() == Some('x');
    let last = chars.next();

    RegionPerms {
        read,
        write,
        execute,
        shared: last == Some('s'),
        private: last == Some('p'),
    }
}
