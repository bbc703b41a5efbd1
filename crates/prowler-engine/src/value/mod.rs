//! Materialization of target memory into typed value trees.

pub mod pretty;
pub mod write;

use crate::binary::types::{Kind, TyKind, TypeId};
use crate::binary::{moduledata, BinaryInfo, DIRECT_IFACE};
use crate::target::TargetMemory;

/// Bounds applied while loading a value tree.
#[derive(Debug, Clone, Copy)]
pub struct LoadConfig {
    pub follow_pointers: bool,
    pub max_recurse: i64,
    pub max_string_len: i64,
    pub max_array_values: i64,
    /// `-1` leaves struct fields unbounded.
    pub max_struct_fields: i64,
    pub max_map_buckets: i64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            follow_pointers: true,
            max_recurse: 1,
            max_string_len: 64,
            max_array_values: 64,
            max_struct_fields: -1,
            max_map_buckets: 64,
        }
    }
}

/// Set on values that describe compile-time constants.
pub const FLAG_CONSTANT: u16 = 1 << 2;

/// Tophash bytes below this mark an empty or evacuated hash cell.
const MIN_TOP_HASH: u8 = 5;

/// A materialized snapshot of one target variable (or a subtree of one).
///
/// For maps the children alternate key/value; for interfaces the sole child
/// carries the concrete instance; for strings `base` points at the byte
/// array and `len` holds the full byte length.
#[derive(Debug, Clone)]
pub struct Value {
    pub name: String,
    pub addr: u64,
    /// Only the address is known; children were cut off by the recursion cap.
    pub only_addr: bool,
    pub ty: TypeId,
    pub real_ty: TypeId,
    pub kind: Kind,
    pub type_name: String,
    /// Scalar representation, function name, or (possibly truncated) string
    /// bytes.
    pub value: String,
    pub len: i64,
    pub cap: i64,
    pub base: u64,
    pub children: Vec<Value>,
    pub flags: u16,
    pub unreadable: Option<String>,
}

/// Reads value trees out of the target's address space.
pub struct ValueReader<'a> {
    bi: &'a BinaryInfo,
    mem: &'a dyn TargetMemory,
}

impl<'a> ValueReader<'a> {
    pub fn new(bi: &'a BinaryInfo, mem: &'a dyn TargetMemory) -> Self {
        Self { bi, mem }
    }

    /// A fresh, unloaded value rooted at `addr`.
    pub fn new_value(&self, name: &str, addr: u64, ty: TypeId) -> Value {
        let real_ty = self.resolve_parametric(self.bi.resolve_typedef(ty), 0);
        let declared = self.bi.ty(ty);
        let real = self.bi.ty(real_ty);

        let type_name = if declared.name.is_empty() {
            real.name.clone()
        } else {
            declared.name.clone()
        };

        Value {
            name: name.to_owned(),
            addr,
            only_addr: false,
            ty,
            real_ty,
            kind: real.kind_tag(),
            type_name,
            value: String::new(),
            len: 0,
            cap: 0,
            base: 0,
            children: Vec::new(),
            flags: 0,
            unreadable: None,
        }
    }

    /// Populates `value` and all reachable children subject to `cfg`.
    ///
    /// A failing read marks the offending subtree unreadable; ancestors and
    /// siblings stay usable.
    pub fn load(&self, value: &mut Value, cfg: &LoadConfig) {
        self.load_value(value, 0, cfg);
    }

    /// Struct-member access: a value rooted at the member's offset.
    pub fn field(&self, value: &Value, name: &str) -> crate::Result<Value> {
        let ty = self.bi.ty(value.real_ty);
        let field = ty
            .field_by_name(name)
            .ok_or_else(|| crate::Error::UnknownField(name.to_owned()))?;
        Ok(self.new_value(name, value.addr.wrapping_add(field.byte_offset as u64), field.ty))
    }

    /// Pointer dereference.
    pub fn elem(&self, value: &Value) -> crate::Result<Value> {
        let TyKind::Pointer { elem } = self.bi.ty(value.real_ty).kind else {
            return Err(crate::Error::TypeMismatch(format!(
                "cannot dereference {}",
                value.type_name
            )));
        };

        let word = self
            .read_word(value.addr)
            .map_err(crate::Error::Unreadable)?;
        if word == 0 {
            return Err(crate::Error::Unreadable("nil pointer dereference".to_owned()));
        }

        Ok(self.new_value("", word, elem))
    }

    fn load_value(&self, v: &mut Value, depth: i64, cfg: &LoadConfig) {
        if v.only_addr || v.unreadable.is_some() {
            return;
        }

        let real = self.bi.ty(v.real_ty);

        let result = match &real.kind {
            TyKind::Bool => self.load_bool(v),
            TyKind::Int => self.load_int(v, real.byte_size),
            TyKind::Uint => self.load_uint(v, real.byte_size),
            TyKind::Float => self.load_float(v, real.byte_size),
            TyKind::Complex => self.load_complex(v, real.byte_size),
            TyKind::String => self.load_string(v, cfg),
            TyKind::Pointer { elem } => {
                let elem = *elem;
                self.load_pointer(v, elem, depth, cfg)
            }
            TyKind::UnsafePointer => self.load_unsafe_pointer(v),
            TyKind::Slice { elem } => {
                let elem = *elem;
                self.load_slice(v, elem, depth, cfg)
            }
            TyKind::Array { elem, count } => {
                let (elem, count) = (*elem, *count);
                self.load_array(v, elem, count, depth, cfg)
            }
            TyKind::Struct { .. } => self.load_struct(v, depth, cfg),
            TyKind::Map { .. } => self.load_map(v, depth, cfg),
            TyKind::Chan { .. } => self.load_chan(v, depth, cfg),
            TyKind::Interface { .. } => self.load_interface(v, depth, cfg),
            TyKind::Func => self.load_func(v),
            TyKind::Parametric { .. } | TyKind::Typedef { .. } | TyKind::Unsupported => {
                Err(format!("unsupported type {}", v.type_name))
            }
        };

        if let Err(reason) = result {
            v.unreadable = Some(reason);
        }
    }

    fn load_bool(&self, v: &mut Value) -> Result<(), String> {
        let bytes = self.read_exact(v.addr, 1)?;
        v.value = if bytes[0] != 0 { "true" } else { "false" }.to_owned();
        Ok(())
    }

    fn load_int(&self, v: &mut Value, size: u64) -> Result<(), String> {
        let bytes = self.read_exact(v.addr, size.max(1) as usize)?;
        let raw = self.bi.arch.decode_uint(&bytes);
        let bits = (bytes.len() as u32) * 8;
        let val = if bits >= 64 {
            raw as i64
        } else {
            ((raw << (64 - bits)) as i64) >> (64 - bits)
        };
        v.value = val.to_string();
        Ok(())
    }

    fn load_uint(&self, v: &mut Value, size: u64) -> Result<(), String> {
        let bytes = self.read_exact(v.addr, size.max(1) as usize)?;
        v.value = self.bi.arch.decode_uint(&bytes).to_string();
        Ok(())
    }

    fn load_float(&self, v: &mut Value, size: u64) -> Result<(), String> {
        v.value = self.read_float(v.addr, size)?;
        Ok(())
    }

    fn read_float(&self, addr: u64, size: u64) -> Result<String, String> {
        let bytes = self.read_exact(addr, size as usize)?;
        let raw = self.bi.arch.decode_uint(&bytes);
        Ok(match size {
            4 => f32::from_bits(raw as u32).to_string(),
            8 => f64::from_bits(raw).to_string(),
            n => return Err(format!("unsupported float width {n}")),
        })
    }

    fn load_complex(&self, v: &mut Value, size: u64) -> Result<(), String> {
        let half = size / 2;
        let real = self.read_float(v.addr, half)?;
        let imag = self.read_float(v.addr + half, half)?;
        v.value = format!("({real} + {imag}i)");
        Ok(())
    }

    fn load_string(&self, v: &mut Value, cfg: &LoadConfig) -> Result<(), String> {
        let ptr = self.bi.arch.ptr_size;
        v.base = self.read_word(v.addr)?;
        v.len = self.read_word(v.addr + ptr)? as i64;

        let count = v.len.max(0).min(cfg.max_string_len.max(0)) as usize;
        if v.base != 0 && count > 0 {
            let bytes = self.read_exact(v.base, count)?;
            v.value = String::from_utf8_lossy(&bytes).into_owned();
        }
        Ok(())
    }

    fn load_pointer(
        &self,
        v: &mut Value,
        elem: TypeId,
        depth: i64,
        cfg: &LoadConfig,
    ) -> Result<(), String> {
        let word = self.read_word(v.addr)?;
        v.base = word;

        let mut child = self.new_value("", word, elem);
        if word != 0 {
            if cfg.follow_pointers && depth < cfg.max_recurse {
                self.load_value(&mut child, depth + 1, cfg);
            } else {
                child.only_addr = true;
            }
        }
        v.children.push(child);
        Ok(())
    }

    fn load_unsafe_pointer(&self, v: &mut Value) -> Result<(), String> {
        let word = self.read_word(v.addr)?;
        v.base = word;
        if word != 0 {
            let mut child = self.new_value("", word, v.real_ty);
            child.only_addr = true;
            v.children.push(child);
        }
        Ok(())
    }

    fn load_slice(
        &self,
        v: &mut Value,
        elem: TypeId,
        depth: i64,
        cfg: &LoadConfig,
    ) -> Result<(), String> {
        let ptr = self.bi.arch.ptr_size;
        v.base = self.read_word(v.addr)?;
        v.len = self.read_word(v.addr + ptr)? as i64;
        v.cap = self.read_word(v.addr + 2 * ptr)? as i64;

        if v.base == 0 {
            return Ok(());
        }
        self.load_elements(v, elem, v.base, v.len, depth, cfg)
    }

    fn load_array(
        &self,
        v: &mut Value,
        elem: TypeId,
        count: i64,
        depth: i64,
        cfg: &LoadConfig,
    ) -> Result<(), String> {
        v.base = v.addr;
        v.len = count;
        v.cap = count;
        self.load_elements(v, elem, v.addr, count, depth, cfg)
    }

    fn load_elements(
        &self,
        v: &mut Value,
        elem: TypeId,
        base: u64,
        len: i64,
        depth: i64,
        cfg: &LoadConfig,
    ) -> Result<(), String> {
        let elem_size = self.bi.ty(self.bi.resolve_typedef(elem)).byte_size;
        let count = len.max(0).min(cfg.max_array_values.max(0));

        for i in 0..count {
            let mut child = self.new_value("", base + i as u64 * elem_size, elem);
            self.load_value(&mut child, depth + 1, cfg);
            v.children.push(child);
        }
        Ok(())
    }

    fn load_struct(&self, v: &mut Value, depth: i64, cfg: &LoadConfig) -> Result<(), String> {
        let ty = self.bi.ty(v.real_ty);
        let TyKind::Struct { ref fields } = ty.kind else {
            return Err("not a struct".to_owned());
        };

        v.len = fields.len() as i64;
        if depth > cfg.max_recurse {
            return Ok(());
        }

        let max = if cfg.max_struct_fields < 0 {
            fields.len()
        } else {
            cfg.max_struct_fields.min(fields.len() as i64) as usize
        };

        for field in &fields[..max] {
            let mut child = self.new_value(
                &field.name,
                v.addr.wrapping_add(field.byte_offset as u64),
                field.ty,
            );
            self.load_value(&mut child, depth + 1, cfg);
            v.children.push(child);
        }
        Ok(())
    }

    fn load_map(&self, v: &mut Value, depth: i64, cfg: &LoadConfig) -> Result<(), String> {
        let ty = self.bi.ty(v.real_ty);
        let TyKind::Map {
            key: key_ty,
            elem: elem_ty,
            underlying,
        } = ty.kind
        else {
            return Err("not a map".to_owned());
        };

        let repr = self.bi.ty(self.bi.resolve_typedef(underlying));
        let TyKind::Pointer { elem: header_id } = repr.kind else {
            return Err("unexpected map representation".to_owned());
        };

        v.base = self.read_word(v.addr)?;
        if v.base == 0 {
            // nil map
            return Ok(());
        }

        let header = self.bi.ty(self.bi.resolve_typedef(header_id));
        let count_f = header
            .field_by_name("count")
            .ok_or("map header has no count field")?;
        let b_f = header.field_by_name("B").ok_or("map header has no B field")?;
        let buckets_f = header
            .field_by_name("buckets")
            .ok_or("map header has no buckets field")?;

        let count_bytes = self.read_exact(
            v.base + count_f.byte_offset as u64,
            self.bi.ty(self.bi.resolve_typedef(count_f.ty)).byte_size.max(1) as usize,
        )?;
        v.len = self.bi.arch.decode_uint(&count_bytes) as i64;

        let b = self.read_exact(v.base + b_f.byte_offset as u64, 1)?[0];
        if b > 56 {
            return Err(format!("implausible map bucket count (2^{b})"));
        }
        let buckets_addr = self.read_word(v.base + buckets_f.byte_offset as u64)?;

        let bucket_id = match self.bi.ty(self.bi.resolve_typedef(buckets_f.ty)).kind {
            TyKind::Pointer { elem } => elem,
            _ => return Err("unexpected bucket representation".to_owned()),
        };
        let bucket = self.bi.ty(self.bi.resolve_typedef(bucket_id));

        let top_f = bucket
            .field_by_name("tophash")
            .or_else(|| bucket.field_by_name("topbits"))
            .ok_or("map bucket has no tophash field")?;
        let keys_f = bucket
            .field_by_name("keys")
            .ok_or("map bucket has no keys field")?;
        let vals_f = bucket
            .field_by_name("values")
            .or_else(|| bucket.field_by_name("elems"))
            .ok_or("map bucket has no values field")?;
        let overflow_f = bucket
            .field_by_name("overflow")
            .ok_or("map bucket has no overflow field")?;

        let slots = match self.bi.ty(self.bi.resolve_typedef(top_f.ty)).kind {
            TyKind::Array { count, .. } => count.max(0) as u64,
            _ => 8,
        };
        let key_stride = self.bi.ty(self.bi.resolve_typedef(key_ty)).byte_size;
        let val_stride = self.bi.ty(self.bi.resolve_typedef(elem_ty)).byte_size;
        let bucket_size = bucket.byte_size;

        if buckets_addr == 0 {
            return Ok(());
        }

        let mut buckets_seen = 0i64;
        'outer: for bi_idx in 0..(1u64 << b) {
            let mut baddr = buckets_addr + bi_idx * bucket_size;

            while baddr != 0 {
                if buckets_seen >= cfg.max_map_buckets {
                    break 'outer;
                }
                buckets_seen += 1;

                let tophash = self.read_exact(baddr + top_f.byte_offset as u64, slots as usize)?;

                for slot in 0..slots {
                    if tophash[slot as usize] < MIN_TOP_HASH {
                        continue;
                    }

                    let key_addr = baddr + keys_f.byte_offset as u64 + slot * key_stride;
                    let val_addr = baddr + vals_f.byte_offset as u64 + slot * val_stride;

                    let mut key = self.new_value("", key_addr, key_ty);
                    self.load_value(&mut key, depth + 1, cfg);
                    let mut val = self.new_value("", val_addr, elem_ty);
                    self.load_value(&mut val, depth + 1, cfg);

                    v.children.push(key);
                    v.children.push(val);

                    if v.children.len() as i64 / 2 >= v.len {
                        break 'outer;
                    }
                }

                baddr = self.read_word(baddr + overflow_f.byte_offset as u64)?;
            }
        }

        Ok(())
    }

    fn load_chan(&self, v: &mut Value, depth: i64, cfg: &LoadConfig) -> Result<(), String> {
        let ty = self.bi.ty(v.real_ty);
        let TyKind::Chan { elem, underlying } = ty.kind else {
            return Err("not a channel".to_owned());
        };

        let repr = self.bi.ty(self.bi.resolve_typedef(underlying));
        let TyKind::Pointer { elem: header_id } = repr.kind else {
            return Err("unexpected channel representation".to_owned());
        };

        v.base = self.read_word(v.addr)?;
        if v.base == 0 {
            // nil channel
            return Ok(());
        }

        let header = self.bi.ty(self.bi.resolve_typedef(header_id));
        let TyKind::Struct { ref fields } = header.kind else {
            return Err("unexpected channel header".to_owned());
        };

        let dataqsiz = match header.field_by_name("dataqsiz") {
            Some(f) => self.read_word(v.base + f.byte_offset as u64)? as i64,
            None => 0,
        };

        for field in fields {
            let addr = v.base + field.byte_offset as u64;
            let mut child = if field.name == "buf" {
                // The runtime stores an untyped pointer; retype it as a
                // pointer to the buffered element array.
                let array = self.bi.array_of(elem, dataqsiz);
                let ptr = self.bi.pointer_to(array);
                self.new_value("buf", addr, ptr)
            } else {
                self.new_value(&field.name, addr, field.ty)
            };
            self.load_value(&mut child, depth + 1, cfg);
            v.children.push(child);
        }

        if let Some(f) = header.field_by_name("qcount") {
            v.len = self.read_word(v.base + f.byte_offset as u64)? as i64;
        }
        v.cap = dataqsiz;

        Ok(())
    }

    fn load_interface(&self, v: &mut Value, depth: i64, cfg: &LoadConfig) -> Result<(), String> {
        let ty = self.bi.ty(v.real_ty);
        let TyKind::Interface { underlying } = ty.kind else {
            return Err("not an interface".to_owned());
        };

        let header = self.bi.ty(self.bi.resolve_typedef(underlying));

        let (type_field, indirect_tab) = match header.field_by_name("tab") {
            Some(f) => (f, true),
            None => (
                header
                    .field_by_name("_type")
                    .ok_or("unexpected interface header")?,
                false,
            ),
        };
        let data_field = header
            .field_by_name("data")
            .ok_or("unexpected interface header")?;

        let tab_word = self.read_word(v.addr + type_field.byte_offset as u64)?;
        if tab_word == 0 {
            // nil interface
            let mut child = self.new_value("data", 0, v.real_ty);
            child.kind = Kind::Invalid;
            v.children.push(child);
            return Ok(());
        }

        let type_addr = if indirect_tab {
            // The itab stores the concrete type one word in.
            self.read_word(tab_word + self.bi.arch.ptr_size)?
        } else {
            tab_word
        };

        let (concrete, go_kind) = self
            .runtime_type_to_debug_type(type_addr)
            .map_err(|e| e.to_string())?;

        let data_addr = v.addr + data_field.byte_offset as u64;
        let payload_addr = if go_kind & DIRECT_IFACE != 0 {
            // The data word is the value itself (pointer-shaped).
            data_addr
        } else {
            self.read_word(data_addr)?
        };

        let mut child = self.new_value("data", payload_addr, concrete);
        self.load_value(&mut child, depth + 1, cfg);
        v.children.push(child);

        Ok(())
    }

    fn load_func(&self, v: &mut Value) -> Result<(), String> {
        let closure = self.read_word(v.addr)?;
        if closure == 0 {
            // nil function pointer
            v.base = 0;
            return Ok(());
        }

        let entry = self.read_word(closure)?;
        v.base = entry;
        v.value = match self.bi.function_at(entry) {
            Some(f) => f.name.clone(),
            None => format!("{entry:#x}"),
        };
        Ok(())
    }

    /// Converts an in-target runtime-type pointer into the debug-info type
    /// describing it, together with the runtime kind bits.
    pub fn runtime_type_to_debug_type(&self, type_addr: u64) -> crate::Result<(TypeId, i64)> {
        let modules = moduledata::load_module_data(self.bi, self.mem)?;
        let md = moduledata::module_for_type_addr(&modules, type_addr)
            .ok_or(crate::Error::UnresolvedInterfaceType)?;

        let entry = self
            .bi
            .runtime_type_entry(0, type_addr - md.types)
            .ok_or(crate::Error::UnresolvedInterfaceType)?;

        let id = self.bi.type_at(0, entry.die_offset)?;

        let kind = if entry.kind >= 0 {
            entry.kind
        } else {
            self.read_runtime_kind(type_addr)?
        };

        Ok((id, kind))
    }

    /// Kind byte straight from the target's type descriptor, for entries
    /// whose debug info does not record it.
    fn read_runtime_kind(&self, type_addr: u64) -> crate::Result<i64> {
        let rt = self
            .bi
            .runtime_type()
            .ok_or(crate::Error::UnresolvedInterfaceType)?;
        let ty = self.bi.ty(self.bi.resolve_typedef(rt));

        let field = ty
            .field_by_name("Kind_")
            .or_else(|| ty.field_by_name("kind"))
            .ok_or(crate::Error::UnresolvedInterfaceType)?;

        let bytes = self
            .read_exact(type_addr + field.byte_offset as u64, 1)
            .map_err(crate::Error::Unreadable)?;
        Ok(bytes[0] as i64)
    }

    fn resolve_parametric(&self, id: TypeId, dict_addr: u64) -> TypeId {
        let TyKind::Parametric {
            dict_index,
            default,
        } = self.bi.ty(id).kind
        else {
            return id;
        };

        if dict_addr == 0 {
            // No dictionary in scope; fall back to the shape type.
            return self.bi.resolve_typedef(default);
        }

        let slot = dict_addr + dict_index as u64 * self.bi.arch.ptr_size;
        let resolved = self
            .read_word(slot)
            .map_err(crate::Error::Unreadable)
            .and_then(|type_addr| self.runtime_type_to_debug_type(type_addr));

        match resolved {
            Ok((id, _)) => self.bi.resolve_typedef(id),
            Err(e) => {
                tracing::debug!(error = %e, "could not resolve parametric type");
                self.bi.resolve_typedef(default)
            }
        }
    }

    fn read_exact(&self, addr: u64, len: usize) -> Result<Vec<u8>, String> {
        let mut buf = vec![0u8; len];
        if len == 0 {
            return Ok(buf);
        }

        match self.mem.read_memory(addr, &mut buf) {
            Ok(n) if n == len => Ok(buf),
            Ok(n) => Err(format!("short read at {addr:#x}: {n} of {len} bytes")),
            Err(e) => Err(format!("read at {addr:#x}: {e}")),
        }
    }

    fn read_word(&self, addr: u64) -> Result<u64, String> {
        let bytes = self.read_exact(addr, self.bi.arch.ptr_size as usize)?;
        Ok(self.bi.arch.decode_uint(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::binary::types::{Field, Ty, TypeArena};
    use crate::binary::Arch;
    use crate::testutil::FakeMemory;

    const ARCH: Arch = Arch {
        ptr_size: 8,
        little_endian: true,
    };

    fn int64(arena: &mut TypeArena) -> TypeId {
        arena.alloc(Ty {
            name: "int".to_owned(),
            byte_size: 8,
            kind: TyKind::Int,
        })
    }

    fn string_ty(arena: &mut TypeArena) -> TypeId {
        arena.alloc(Ty {
            name: "string".to_owned(),
            byte_size: 16,
            kind: TyKind::String,
        })
    }

    #[test]
    fn scalar_reads() {
        let (bi, (int, boolean, float)) = BinaryInfo::for_tests(ARCH, |arena| {
            let int = int64(arena);
            let boolean = arena.alloc(Ty {
                name: "bool".to_owned(),
                byte_size: 1,
                kind: TyKind::Bool,
            });
            let float = arena.alloc(Ty {
                name: "float64".to_owned(),
                byte_size: 8,
                kind: TyKind::Float,
            });
            (int, boolean, float)
        });

        let mem = FakeMemory::new();
        mem.put(0x100, &(-5i64).to_le_bytes());
        mem.put(0x110, &[1]);
        mem.put(0x120, &3.5f64.to_bits().to_le_bytes());

        let reader = ValueReader::new(&bi, &mem);
        let cfg = LoadConfig::default();

        let mut v = reader.new_value("n", 0x100, int);
        reader.load(&mut v, &cfg);
        assert_eq!(v.value, "-5");
        assert_eq!(v.kind, Kind::Int);

        let mut v = reader.new_value("b", 0x110, boolean);
        reader.load(&mut v, &cfg);
        assert_eq!(v.value, "true");

        let mut v = reader.new_value("f", 0x120, float);
        reader.load(&mut v, &cfg);
        assert_eq!(v.value, "3.5");
    }

    #[test]
    fn typedef_resolves_before_decoding() {
        let (bi, alias) = BinaryInfo::for_tests(ARCH, |arena| {
            let int = int64(arena);
            arena.alloc(Ty {
                name: "main.Port".to_owned(),
                byte_size: 8,
                kind: TyKind::Typedef { underlying: int },
            })
        });

        let mem = FakeMemory::new();
        mem.put(0x100, &80i64.to_le_bytes());

        let reader = ValueReader::new(&bi, &mem);
        let mut v = reader.new_value("p", 0x100, alias);
        reader.load(&mut v, &LoadConfig::default());

        assert_eq!(v.kind, Kind::Int);
        assert_eq!(v.value, "80");
        assert_eq!(v.type_name, "main.Port");
    }

    #[test]
    fn string_header_and_truncation() {
        let (bi, string) = BinaryInfo::for_tests(ARCH, string_ty);

        let mem = FakeMemory::new();
        mem.put_word(0x100, 0x200);
        mem.put_word(0x108, 100);
        mem.put(0x200, &[b'a'; 100]);

        let reader = ValueReader::new(&bi, &mem);
        let mut v = reader.new_value("s", 0x100, string);
        reader.load(&mut v, &LoadConfig::default());

        assert_eq!(v.base, 0x200);
        assert_eq!(v.len, 100);
        assert_eq!(v.value.len(), 64); // capped at max_string_len
        assert!(v.value.bytes().all(|b| b == b'a'));
    }

    #[test]
    fn slice_elements() {
        let (bi, slice) = BinaryInfo::for_tests(ARCH, |arena| {
            let int = int64(arena);
            arena.alloc(Ty {
                name: "[]int".to_owned(),
                byte_size: 24,
                kind: TyKind::Slice { elem: int },
            })
        });

        let mem = FakeMemory::new();
        mem.put_word(0x100, 0x300);
        mem.put_word(0x108, 3);
        mem.put_word(0x110, 4);
        for (i, n) in [10i64, 20, 30].iter().enumerate() {
            mem.put(0x300 + i as u64 * 8, &n.to_le_bytes());
        }

        let reader = ValueReader::new(&bi, &mem);
        let mut v = reader.new_value("xs", 0x100, slice);
        reader.load(&mut v, &LoadConfig::default());

        assert_eq!((v.len, v.cap, v.base), (3, 4, 0x300));
        let values: Vec<_> = v.children.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, ["10", "20", "30"]);
    }

    #[test]
    fn self_referential_struct_terminates() {
        let (bi, node) = BinaryInfo::for_tests(ARCH, |arena| {
            let int = int64(arena);
            let node = arena.alloc_placeholder();
            let ptr = arena.alloc(Ty {
                name: "*main.Node".to_owned(),
                byte_size: 8,
                kind: TyKind::Pointer { elem: node },
            });
            arena.set(
                node,
                Ty {
                    name: "main.Node".to_owned(),
                    byte_size: 16,
                    kind: TyKind::Struct {
                        fields: vec![
                            Field {
                                name: "next".to_owned(),
                                byte_offset: 0,
                                ty: ptr,
                            },
                            Field {
                                name: "val".to_owned(),
                                byte_offset: 8,
                                ty: int,
                            },
                        ],
                    },
                },
            );
            node
        });

        let mem = FakeMemory::new();
        mem.put_word(0x100, 0x100); // next points back at itself
        mem.put(0x108, &7i64.to_le_bytes());

        let reader = ValueReader::new(&bi, &mem);
        let mut v = reader.new_value("n", 0x100, node);
        reader.load(&mut v, &LoadConfig::default());

        assert_eq!(v.children.len(), 2);
        assert_eq!(v.children[1].value, "7");

        // The recursion cap stops the pointer chase with an address-only
        // child rather than looping.
        let next = &v.children[0];
        assert_eq!(next.kind, Kind::Ptr);
        assert!(next.children[0].only_addr);
        assert_eq!(next.children[0].addr, 0x100);
    }

    #[test]
    fn unreadable_subtree_keeps_siblings() {
        let (bi, conf) = BinaryInfo::for_tests(ARCH, |arena| {
            let int = int64(arena);
            let string = string_ty(arena);
            arena.alloc(Ty {
                name: "main.Conf".to_owned(),
                byte_size: 24,
                kind: TyKind::Struct {
                    fields: vec![
                        Field {
                            name: "Host".to_owned(),
                            byte_offset: 0,
                            ty: string,
                        },
                        Field {
                            name: "Port".to_owned(),
                            byte_offset: 16,
                            ty: int,
                        },
                    ],
                },
            })
        });

        let mem = FakeMemory::new();
        // Host header points into unmapped memory.
        mem.put_word(0x100, 0xdead0000);
        mem.put_word(0x108, 4);
        mem.put(0x110, &80i64.to_le_bytes());

        let reader = ValueReader::new(&bi, &mem);
        let mut v = reader.new_value("conf", 0x100, conf);
        reader.load(&mut v, &LoadConfig::default());

        assert!(v.unreadable.is_none());
        assert!(v.children[0].unreadable.is_some());
        assert_eq!(v.children[1].value, "80");
    }

    #[test]
    fn field_and_elem_accessors() {
        let (bi, (conf, ptr)) = BinaryInfo::for_tests(ARCH, |arena| {
            let int = int64(arena);
            let conf = arena.alloc(Ty {
                name: "main.Conf".to_owned(),
                byte_size: 8,
                kind: TyKind::Struct {
                    fields: vec![Field {
                        name: "Port".to_owned(),
                        byte_offset: 0,
                        ty: int,
                    }],
                },
            });
            let ptr = arena.alloc(Ty {
                name: "*int".to_owned(),
                byte_size: 8,
                kind: TyKind::Pointer { elem: int },
            });
            (conf, ptr)
        });

        let mem = FakeMemory::new();
        mem.put(0x100, &80i64.to_le_bytes());
        mem.put_word(0x200, 0); // nil pointer

        let reader = ValueReader::new(&bi, &mem);

        let v = reader.new_value("conf", 0x100, conf);
        let port = reader.field(&v, "Port").unwrap();
        assert_eq!(port.addr, 0x100);
        assert!(matches!(
            reader.field(&v, "Missing"),
            Err(crate::Error::UnknownField(_))
        ));

        let p = reader.new_value("p", 0x200, ptr);
        assert!(matches!(
            reader.elem(&p),
            Err(crate::Error::Unreadable(_))
        ));
    }

    #[test]
    fn channel_header_fields() {
        let (bi, chan) = BinaryInfo::for_tests(ARCH, |arena| {
            let int = int64(arena);
            let uint = arena.alloc(Ty {
                name: "uint".to_owned(),
                byte_size: 8,
                kind: TyKind::Uint,
            });
            let unsafe_ptr = arena.alloc(Ty {
                name: "unsafe.Pointer".to_owned(),
                byte_size: 8,
                kind: TyKind::UnsafePointer,
            });
            let hchan = arena.alloc(Ty {
                name: "runtime.hchan".to_owned(),
                byte_size: 24,
                kind: TyKind::Struct {
                    fields: vec![
                        Field {
                            name: "qcount".to_owned(),
                            byte_offset: 0,
                            ty: uint,
                        },
                        Field {
                            name: "dataqsiz".to_owned(),
                            byte_offset: 8,
                            ty: uint,
                        },
                        Field {
                            name: "buf".to_owned(),
                            byte_offset: 16,
                            ty: unsafe_ptr,
                        },
                    ],
                },
            });
            let hchan_ptr = arena.pointer_to(hchan, 8);
            arena.alloc(Ty {
                name: "chan int".to_owned(),
                byte_size: 8,
                kind: TyKind::Chan {
                    elem: int,
                    underlying: hchan_ptr,
                },
            })
        });

        let mem = FakeMemory::new();
        mem.put_word(0x50, 0x500);
        mem.put_word(0x500, 2); // qcount
        mem.put_word(0x508, 4); // dataqsiz
        mem.put_word(0x510, 0x600); // buf

        let reader = ValueReader::new(&bi, &mem);
        let mut v = reader.new_value("ch", 0x50, chan);
        reader.load(&mut v, &LoadConfig::default());

        assert_eq!((v.len, v.cap, v.base), (2, 4, 0x500));
        let qcount = v.children.iter().find(|c| c.name == "qcount").unwrap();
        assert_eq!(qcount.value, "2");
        let buf = v.children.iter().find(|c| c.name == "buf").unwrap();
        assert_eq!(buf.kind, Kind::Ptr);
        assert_eq!(buf.type_name, "*[4]int");
    }

    #[test]
    fn map_bucket_walk() {
        let (bi, map) = BinaryInfo::for_tests(ARCH, map_arena);

        let mem = FakeMemory::new();
        mem.put_word(0x50, 0x700); // map variable -> hmap
        mem.put(0x700, &2i64.to_le_bytes()); // count
        mem.put(0x709, &[0u8]); // B = 0 -> one bucket
        mem.put_word(0x710, 0x800); // buckets

        let mut tophash = [0u8; 8];
        tophash[0] = 5;
        tophash[2] = 7;
        mem.put(0x800, &tophash);
        mem.put(0x808, &1i64.to_le_bytes()); // keys[0]
        mem.put(0x818, &3i64.to_le_bytes()); // keys[2]
        mem.put(0x848, &100i64.to_le_bytes()); // values[0]
        mem.put(0x858, &300i64.to_le_bytes()); // values[2]
        mem.put_word(0x888, 0); // overflow

        let reader = ValueReader::new(&bi, &mem);
        let mut v = reader.new_value("m", 0x50, map);
        reader.load(&mut v, &LoadConfig::default());

        assert_eq!(v.unreadable, None);
        assert_eq!(v.len, 2);
        let pairs: Vec<_> = v.children.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(pairs, ["1", "100", "3", "300"]);
    }

    /// `map[int]int` with a classic bucket layout: tophash at 0, eight
    /// keys at 8, eight values at 0x48, overflow pointer at 0x88.
    pub(crate) fn map_arena(arena: &mut TypeArena) -> TypeId {
        let int = arena.alloc(Ty {
            name: "int".to_owned(),
            byte_size: 8,
            kind: TyKind::Int,
        });
        let uint8 = arena.alloc(Ty {
            name: "uint8".to_owned(),
            byte_size: 1,
            kind: TyKind::Uint,
        });
        let tophash = arena.array_of(uint8, 8);
        let keys = arena.array_of(int, 8);
        let values = arena.array_of(int, 8);

        let bucket = arena.alloc_placeholder();
        let bucket_ptr = arena.pointer_to(bucket, 8);
        arena.set(
            bucket,
            Ty {
                name: "map.bucket[int]int".to_owned(),
                byte_size: 0x90,
                kind: TyKind::Struct {
                    fields: vec![
                        Field {
                            name: "tophash".to_owned(),
                            byte_offset: 0,
                            ty: tophash,
                        },
                        Field {
                            name: "keys".to_owned(),
                            byte_offset: 8,
                            ty: keys,
                        },
                        Field {
                            name: "values".to_owned(),
                            byte_offset: 0x48,
                            ty: values,
                        },
                        Field {
                            name: "overflow".to_owned(),
                            byte_offset: 0x88,
                            ty: bucket_ptr,
                        },
                    ],
                },
            },
        );

        let hmap = arena.alloc(Ty {
            name: "runtime.hmap".to_owned(),
            byte_size: 48,
            kind: TyKind::Struct {
                fields: vec![
                    Field {
                        name: "count".to_owned(),
                        byte_offset: 0,
                        ty: int,
                    },
                    Field {
                        name: "B".to_owned(),
                        byte_offset: 9,
                        ty: uint8,
                    },
                    Field {
                        name: "buckets".to_owned(),
                        byte_offset: 0x10,
                        ty: bucket_ptr,
                    },
                ],
            },
        });
        let hmap_ptr = arena.pointer_to(hmap, 8);

        arena.alloc(Ty {
            name: "map[int]int".to_owned(),
            byte_size: 8,
            kind: TyKind::Map {
                key: int,
                elem: int,
                underlying: hmap_ptr,
            },
        })
    }

    #[test]
    fn function_symbol_resolution() {
        let (mut bi, func_var) = BinaryInfo::for_tests(ARCH, |arena| {
            arena.alloc(Ty {
                name: "func()".to_owned(),
                byte_size: 8,
                kind: TyKind::Func,
            })
        });
        bi.add_test_function("main.hello", 0x401000, 0x401100);

        let mem = FakeMemory::new();
        mem.put_word(0x50, 0x900); // closure pointer
        mem.put_word(0x900, 0x401000); // entry

        let reader = ValueReader::new(&bi, &mem);
        let mut v = reader.new_value("f", 0x50, func_var);
        reader.load(&mut v, &LoadConfig::default());

        assert_eq!(v.value, "main.hello");
        assert_eq!(v.base, 0x401000);
    }
}
