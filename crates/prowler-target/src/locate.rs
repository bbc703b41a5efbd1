use std::path::PathBuf;

use goblin::elf::header::ET_DYN;
use goblin::elf::Elf;
use scroll::Pread;

use prowler_engine::target::LocatedBinary;

const AT_NULL: u64 = 0;
const AT_ENTRY: u64 = 9;

/// Discovers the target's executable and entry point from the kernel's
/// bookkeeping under `/proc/<pid>/`.
pub fn locate_executable(pid: u64) -> crate::Result<LocatedBinary> {
    let path = PathBuf::from(format!("/proc/{pid}/exe"));
    let elf = std::fs::read(&path).map_err(|e| crate::Error::File(path.clone(), e))?;

    let header = Elf::parse_header(&elf)?;
    let elf_ctx = goblin::container::Ctx::new(header.container()?, header.endianness()?);

    let auxv_path = PathBuf::from(format!("/proc/{pid}/auxv"));
    let auxv =
        std::fs::read(&auxv_path).map_err(|e| crate::Error::File(auxv_path, e))?;

    let entry_point =
        entry_point_from_auxv(&auxv, elf_ctx).ok_or(crate::Error::MissingAuxv)?;

    // Position-independent executables are loaded at an arbitrary base;
    // the bias offsets every address declared in debug info.
    let load_bias = if header.e_type == ET_DYN {
        entry_point - header.e_entry
    } else {
        0
    };

    tracing::debug!(
        pid,
        entry = format_args!("{entry_point:#x}"),
        load_bias = format_args!("{load_bias:#x}"),
        "located executable"
    );

    Ok(LocatedBinary {
        path,
        entry_point,
        load_bias,
        pointer_size: elf_ctx.size() as u64,
        little_endian: elf_ctx.le.is_little(),
    })
}

/// Scans the auxiliary vector for the entry-point address: `(tag, value)`
/// pairs of pointer-size words until tag 9 (entry) is found or tag 0
/// terminates the vector.
pub(crate) fn entry_point_from_auxv(auxv: &[u8], elf_ctx: goblin::container::Ctx) -> Option<u64> {
    let mut offset = 0usize;

    loop {
        let (tag, value) = if elf_ctx.is_big() {
            let tag: u64 = auxv.gread_with(&mut offset, elf_ctx.le).ok()?;
            let value: u64 = auxv.gread_with(&mut offset, elf_ctx.le).ok()?;
            (tag, value)
        } else {
            let tag: u32 = auxv.gread_with(&mut offset, elf_ctx.le).ok()?;
            let value: u32 = auxv.gread_with(&mut offset, elf_ctx.le).ok()?;
            (tag as u64, value as u64)
        };

        match tag {
            AT_NULL => return None,
            AT_ENTRY => return Some(value),
            _ => (),
        }
    }
}

/// Whether a process with the given ID currently exists.
pub fn pid_exists(pid: u64) -> bool {
    std::path::Path::new(&format!("/proc/{pid}")).exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx64() -> goblin::container::Ctx {
        goblin::container::Ctx::new(goblin::container::Container::Big, scroll::Endian::Little)
    }

    fn pairs(entries: &[(u64, u64)]) -> Vec<u8> {
        let mut out = Vec::new();
        for &(tag, value) in entries {
            out.extend_from_slice(&tag.to_le_bytes());
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }

    #[test]
    fn entry_tag_is_found() {
        let auxv = pairs(&[(33, 0x7fff0000), (9, 0x401000), (0, 0)]);
        assert_eq!(entry_point_from_auxv(&auxv, ctx64()), Some(0x401000));
    }

    #[test]
    fn terminator_without_entry_yields_none() {
        let auxv = pairs(&[(33, 0x7fff0000), (0, 0), (9, 0x401000)]);
        assert_eq!(entry_point_from_auxv(&auxv, ctx64()), None);
    }

    #[test]
    fn truncated_vector_yields_none() {
        let auxv = pairs(&[(33, 0x7fff0000)]);
        let truncated = &auxv[..12];
        assert_eq!(entry_point_from_auxv(truncated, ctx64()), None);
    }
}
