//! Mirror of the target runtime's per-module descriptor, used to convert
//! in-target runtime-type addresses into debug-info entries.

use super::types::TyKind;
use super::BinaryInfo;
use crate::target::TargetMemory;

/// Counterpart to the runtime's `moduledata` record.
#[derive(Debug, Clone, Copy)]
pub struct ModuleData {
    pub text: u64,
    pub etext: u64,
    pub types: u64,
    pub etypes: u64,
    /// Address of the module's typemap (populated for plugin modules).
    pub typemap: u64,
}

/// Chain limit; the descriptor list is tiny in practice and a corrupt
/// `next` pointer must not spin forever.
const MAX_MODULES: usize = 1024;

/// Walks the module descriptor list rooted at `runtime.firstmoduledata`.
pub fn load_module_data(
    bi: &BinaryInfo,
    mem: &dyn TargetMemory,
) -> crate::Result<Vec<ModuleData>> {
    let var = bi
        .vars
        .get("runtime.firstmoduledata")
        .ok_or_else(|| crate::Error::SymbolNotFound("runtime.firstmoduledata".to_owned()))?;

    let struct_ty = bi.ty(bi.resolve_typedef(var.ty));
    let TyKind::Struct { ref fields } = struct_ty.kind else {
        return Err(crate::Error::Unreadable(
            "runtime.firstmoduledata is not a struct".to_owned(),
        ));
    };

    let field_offset = |name: &str| -> crate::Result<u64> {
        fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.byte_offset as u64)
            .ok_or_else(|| {
                crate::Error::Unreadable(format!("moduledata has no field {name:?}"))
            })
    };

    let text_off = field_offset("text")?;
    let etext_off = field_offset("etext")?;
    let types_off = field_offset("types")?;
    let etypes_off = field_offset("etypes")?;
    let typemap_off = field_offset("typemap")?;
    let next_off = field_offset("next")?;

    let word = |addr: u64| -> crate::Result<u64> {
        let mut buf = vec![0u8; bi.arch.ptr_size as usize];
        let n = mem
            .read_memory(addr, &mut buf)
            .map_err(|e| crate::Error::Unreadable(e.to_string()))?;
        if n != buf.len() {
            return Err(crate::Error::Unreadable(format!(
                "short read at {addr:#x}: {n} of {} bytes",
                buf.len()
            )));
        }
        Ok(bi.arch.decode_uint(&buf))
    };

    let mut modules = Vec::new();
    let mut addr = var.addr;

    while addr != 0 && modules.len() < MAX_MODULES {
        modules.push(ModuleData {
            text: word(addr + text_off)?,
            etext: word(addr + etext_off)?,
            types: word(addr + types_off)?,
            etypes: word(addr + etypes_off)?,
            typemap: word(addr + typemap_off)?,
        });

        addr = word(addr + next_off)?;
    }

    Ok(modules)
}

/// The module whose type table contains `type_addr`.
pub fn module_for_type_addr(modules: &[ModuleData], type_addr: u64) -> Option<&ModuleData> {
    modules
        .iter()
        .find(|md| type_addr >= md.types && type_addr < md.etypes)
}
