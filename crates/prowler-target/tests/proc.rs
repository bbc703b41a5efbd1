// Once clippy takes `clippy.toml` into account (for `tests` targets),
// we can remove these.
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(missing_docs)]

//! These tests exercise the real `/proc` plumbing against the test
//! process itself; reading your own address space needs no extra
//! privileges.

use prowler_engine::target::TargetMemory;
use prowler_target::{locate_executable, parse_proc_maps, pid_exists, ProcMemory};

fn self_pid() -> u64 {
    std::process::id() as u64
}

#[test]
fn reads_own_memory() {
    let buffer: [u8; 16] = *b"prowler-readback";
    let mem = ProcMemory::new(self_pid());

    let mut out = [0u8; 16];
    let n = mem
        .read_memory(buffer.as_ptr() as u64, &mut out)
        .expect("read own memory");

    assert_eq!(n, out.len());
    assert_eq!(out, buffer);
}

#[test]
fn writes_own_memory() {
    let mut buffer = [0u8; 8];
    let mem = ProcMemory::new(self_pid());

    let n = mem
        .write_memory(buffer.as_mut_ptr() as u64, b"42424242")
        .expect("write own memory");

    assert_eq!(n, 8);
    assert_eq!(&buffer, b"42424242");
}

#[test]
fn own_maps_contain_an_allocation_candidate() {
    let regions = parse_proc_maps(self_pid()).expect("parse own maps");

    assert!(!regions.is_empty());
    assert!(
        regions.iter().any(|r| r.is_anonymous_rw()),
        "no anonymous rw-p region in own maps"
    );
}

#[test]
fn locates_own_executable() {
    let located = locate_executable(self_pid()).expect("locate own executable");

    assert_ne!(located.entry_point, 0);
    assert!(matches!(located.pointer_size, 4 | 8));
    assert!(located.path.exists());
}

#[test]
fn pid_existence_check() {
    assert!(pid_exists(self_pid()));
    assert!(!pid_exists(u64::MAX / 2));
}
