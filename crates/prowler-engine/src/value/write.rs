//! Mutation of target memory from textual literals.

use super::{LoadConfig, Value, ValueReader};
use crate::alloc::AllocationLedger;
use crate::binary::types::{Kind, TyKind, TypeId};
use crate::binary::BinaryInfo;
use crate::target::TargetMemory;

/// A literal parsed against a declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    /// Slice, array or channel-buffer elements.
    List(Vec<Literal>),
    /// Struct fields by name.
    Struct(Vec<(String, Literal)>),
    /// Map entries; keys already parsed against the key type.
    Map(Vec<(Literal, Literal)>),
}

impl Literal {
    /// Canonical scalar form used to match map keys against loaded values.
    fn canonical(&self) -> String {
        match self {
            Literal::Bool(b) => b.to_string(),
            Literal::Int(n) => n.to_string(),
            Literal::Uint(n) => n.to_string(),
            Literal::Float(f) => f.to_string(),
            Literal::Str(s) => s.clone(),
            _ => String::new(),
        }
    }
}

/// Parses `text` against the declared type `ty`.
///
/// Scalars are plain literals, structs and maps are JSON objects, and
/// slices/arrays/channel buffers are bracketed comma-separated lists.
pub fn parse_literal(bi: &BinaryInfo, text: &str, ty: TypeId) -> crate::Result<Literal> {
    let real = bi.resolve_typedef(ty);
    let t = bi.ty(real);

    match &t.kind {
        TyKind::Bool => text
            .parse()
            .map(Literal::Bool)
            .map_err(|_| crate::Error::TypeMismatch(format!("{text:?} is not a bool"))),
        TyKind::Int => text
            .parse()
            .map(Literal::Int)
            .map_err(|_| crate::Error::TypeMismatch(format!("{text:?} is not an integer"))),
        TyKind::Uint => text
            .parse()
            .map(Literal::Uint)
            .map_err(|_| {
                crate::Error::TypeMismatch(format!("{text:?} is not an unsigned integer"))
            }),
        TyKind::Float => text
            .parse()
            .map(Literal::Float)
            .map_err(|_| crate::Error::TypeMismatch(format!("{text:?} is not a float"))),
        TyKind::String => Ok(Literal::Str(text.to_owned())),

        TyKind::Pointer { elem } => parse_literal(bi, text, *elem),

        TyKind::Struct { fields } => {
            let object: serde_json::Map<String, serde_json::Value> =
                serde_json::from_str(text)?;

            let mut entries = Vec::with_capacity(object.len());
            for (name, value) in &object {
                let field = fields
                    .iter()
                    .find(|f| &f.name == name)
                    .ok_or_else(|| crate::Error::UnknownField(name.clone()))?;
                entries.push((
                    name.clone(),
                    parse_literal(bi, &json_value_to_text(value), field.ty)?,
                ));
            }
            Ok(Literal::Struct(entries))
        }

        TyKind::Map { key, elem, .. } => {
            let object: serde_json::Map<String, serde_json::Value> =
                serde_json::from_str(text)?;

            let mut entries = Vec::with_capacity(object.len());
            for (k, v) in &object {
                let key_lit = parse_literal(bi, k, *key)?;
                let val_lit = parse_literal(bi, &json_value_to_text(v), *elem)?;
                entries.push((key_lit, val_lit));
            }
            Ok(Literal::Map(entries))
        }

        TyKind::Slice { elem } => parse_list(bi, text, *elem, "sli").map(Literal::List),

        TyKind::Chan { elem, .. } => parse_list(bi, text, *elem, "chan").map(Literal::List),

        TyKind::Array { elem, count } => {
            let items = parse_list(bi, text, *elem, "arr")?;
            if items.len() as i64 > *count {
                return Err(crate::Error::ArrayOverflow {
                    expected: *count,
                    actual: items.len(),
                });
            }
            Ok(Literal::List(items))
        }

        _ => Err(crate::Error::UnsupportedType(t.name.clone())),
    }
}

fn parse_list(
    bi: &BinaryInfo,
    text: &str,
    elem: TypeId,
    what: &'static str,
) -> crate::Result<Vec<Literal>> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| crate::Error::NotBracketed {
            expr: text.to_owned(),
            what,
        })?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    let elem_name = bi.ty(bi.resolve_typedef(elem)).name.clone();
    inner
        .split(',')
        .map(|raw| {
            let raw = raw.trim();
            parse_literal(bi, raw, elem).map_err(|e| match e {
                e @ crate::Error::ArrayOverflow { .. } => e,
                _ => crate::Error::ElementFormat {
                    elem: raw.to_owned(),
                    ty: elem_name.clone(),
                },
            })
        })
        .collect()
}

fn json_value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(_) | serde_json::Value::Array(_) => value.to_string(),
        other => other.to_string(),
    }
}

/// Writes parsed literals into target memory.
///
/// Backing storage for strings and slices is carved through the allocation
/// ledger; headers are stored with single word-width writes so the target
/// runtime never observes a half-updated pointer.
pub struct ValueWriter<'a> {
    bi: &'a BinaryInfo,
    mem: &'a dyn TargetMemory,
    ledger: &'a mut AllocationLedger,
}

impl<'a> ValueWriter<'a> {
    pub fn new(
        bi: &'a BinaryInfo,
        mem: &'a dyn TargetMemory,
        ledger: &'a mut AllocationLedger,
    ) -> Self {
        Self { bi, mem, ledger }
    }

    fn reader(&self) -> ValueReader<'a> {
        ValueReader::new(self.bi, self.mem)
    }

    /// Recursively writes `lit` over the memory rooted at `v`.
    pub fn write_value(&mut self, v: &Value, lit: &Literal) -> crate::Result<()> {
        let real = self.bi.ty(v.real_ty);

        match v.kind {
            Kind::Bool | Kind::Int | Kind::Uint | Kind::Float => {
                let bytes = self.encode_scalar(v.kind, real.byte_size, lit, &v.type_name)?;
                self.write_bytes(v.addr, &bytes)
            }

            Kind::String => self.write_string(v.addr, lit),

            Kind::Ptr => {
                // The pointer itself is never repointed; recurse into the
                // pointee.
                let reader = self.reader();
                let mut child = reader.elem(v)?;
                reader.load(&mut child, &LoadConfig::default());
                self.write_value(&child, lit)
            }

            Kind::Struct => {
                let Literal::Struct(entries) = lit else {
                    return Err(crate::Error::TypeMismatch(format!(
                        "{} literal is not a struct",
                        v.type_name
                    )));
                };
                let TyKind::Struct { ref fields } = real.kind else {
                    return Err(crate::Error::UnsupportedType(v.type_name.clone()));
                };

                // Field declaration order, regardless of literal order.
                for field in fields {
                    let Some((_, field_lit)) =
                        entries.iter().find(|(name, _)| *name == field.name)
                    else {
                        continue;
                    };

                    let reader = self.reader();
                    let mut child = reader.new_value(
                        &field.name,
                        v.addr.wrapping_add(field.byte_offset as u64),
                        field.ty,
                    );
                    reader.load(&mut child, &LoadConfig::default());
                    if let Some(reason) = child.unreadable.clone() {
                        return Err(crate::Error::Unreadable(reason));
                    }

                    self.write_value(&child, field_lit)?;
                }
                Ok(())
            }

            Kind::Chan => {
                // Only the buffer of a buffered channel can be rewritten.
                if let Some(dataqsiz) = v.children.iter().find(|c| c.name == "dataqsiz") {
                    if dataqsiz.value == "0" {
                        return Err(crate::Error::SynchronousChannel);
                    }
                }

                let buf = v
                    .children
                    .iter()
                    .find(|c| c.name == "buf")
                    .ok_or_else(|| {
                        crate::Error::Unreadable(format!("channel {} has no buffer", v.name))
                    })?;

                self.write_value(buf, lit)
            }

            Kind::Map => {
                let Literal::Map(entries) = lit else {
                    return Err(crate::Error::TypeMismatch(format!(
                        "{} literal is not a map",
                        v.type_name
                    )));
                };

                // Overwrite values of keys already present; keys absent from
                // the map are not inserted (growth would require the target
                // allocator).
                for (key_lit, val_lit) in entries {
                    let wanted = key_lit.canonical();

                    let mut i = 0;
                    let mut matched = false;
                    while i + 1 < v.children.len() {
                        if v.children[i].value == wanted {
                            self.write_value(&v.children[i + 1], val_lit)?;
                            matched = true;
                            break;
                        }
                        i += 2;
                    }

                    if !matched {
                        tracing::debug!(key = %wanted, "map key not present, skipping");
                    }
                }
                Ok(())
            }

            Kind::Slice => {
                let Literal::List(items) = lit else {
                    return Err(crate::Error::TypeMismatch(format!(
                        "{} literal is not a list",
                        v.type_name
                    )));
                };
                let TyKind::Slice { elem } = real.kind else {
                    return Err(crate::Error::UnsupportedType(v.type_name.clone()));
                };

                // Element size comes from the declared element type.
                let elem_size = self.bi.ty(self.bi.resolve_typedef(elem)).byte_size;

                let base = if items.is_empty() {
                    0
                } else {
                    let base = self.alloc(items.len() as u64 * elem_size)?;
                    for (i, item) in items.iter().enumerate() {
                        self.write_element(base + i as u64 * elem_size, elem, item)?;
                    }
                    base
                };

                let ptr = self.bi.arch.ptr_size;
                self.write_word(v.addr, base)?;
                self.write_word(v.addr + ptr, items.len() as u64)?;
                self.write_word(v.addr + 2 * ptr, items.len() as u64)
            }

            Kind::Array => {
                let Literal::List(items) = lit else {
                    return Err(crate::Error::TypeMismatch(format!(
                        "{} literal is not a list",
                        v.type_name
                    )));
                };
                let TyKind::Array { elem, count } = real.kind else {
                    return Err(crate::Error::UnsupportedType(v.type_name.clone()));
                };

                if items.len() as i64 > count {
                    return Err(crate::Error::ArrayOverflow {
                        expected: count,
                        actual: items.len(),
                    });
                }

                let elem_size = self.bi.ty(self.bi.resolve_typedef(elem)).byte_size;
                for (i, item) in items.iter().enumerate() {
                    self.write_element(v.addr + i as u64 * elem_size, elem, item)?;
                }
                Ok(())
            }

            _ => Err(crate::Error::UnsupportedType(v.type_name.clone())),
        }
    }

    /// One slice/array slot: scalars in place, strings through freshly
    /// allocated backing storage.
    fn write_element(&mut self, addr: u64, elem: TypeId, lit: &Literal) -> crate::Result<()> {
        let real_id = self.bi.resolve_typedef(elem);
        let real = self.bi.ty(real_id);

        match real.kind_tag() {
            Kind::Bool | Kind::Int | Kind::Uint | Kind::Float => {
                let bytes =
                    self.encode_scalar(real.kind_tag(), real.byte_size, lit, &real.name)?;
                self.write_bytes(addr, &bytes)
            }
            Kind::String => self.write_string(addr, lit),
            _ => Err(crate::Error::UnsupportedType(real.name.clone())),
        }
    }

    /// Allocates backing storage for the bytes and overwrites the two-word
    /// string header at `addr`.
    fn write_string(&mut self, addr: u64, lit: &Literal) -> crate::Result<()> {
        let Literal::Str(s) = lit else {
            return Err(crate::Error::TypeMismatch("literal is not a string".to_owned()));
        };

        let bytes = s.as_bytes();
        let base = if bytes.is_empty() {
            0
        } else {
            let base = self.alloc(bytes.len() as u64)?;
            self.write_bytes(base, bytes)?;
            base
        };

        self.write_word(addr, base)?;
        self.write_word(addr + self.bi.arch.ptr_size, bytes.len() as u64)
    }

    fn encode_scalar(
        &self,
        kind: Kind,
        size: u64,
        lit: &Literal,
        type_name: &str,
    ) -> crate::Result<Vec<u8>> {
        let size = size.max(1) as usize;
        let arch = &self.bi.arch;

        let mismatch =
            || crate::Error::TypeMismatch(format!("literal {lit:?} does not fit {type_name}"));

        match (kind, lit) {
            (Kind::Bool, Literal::Bool(b)) => Ok(arch.encode_uint(*b as u64, size)),
            (Kind::Int, Literal::Int(n)) => Ok(arch.encode_uint(*n as u64, size)),
            (Kind::Int, Literal::Uint(n)) => Ok(arch.encode_uint(*n, size)),
            (Kind::Uint, Literal::Uint(n)) => Ok(arch.encode_uint(*n, size)),
            (Kind::Uint, Literal::Int(n)) if *n >= 0 => Ok(arch.encode_uint(*n as u64, size)),
            (Kind::Float, Literal::Float(f)) => Ok(match size {
                4 => arch.encode_uint((*f as f32).to_bits() as u64, 4),
                _ => arch.encode_uint(f.to_bits(), 8),
            }),
            (Kind::Float, Literal::Int(n)) => Ok(match size {
                4 => arch.encode_uint((*n as f32).to_bits() as u64, 4),
                _ => arch.encode_uint((*n as f64).to_bits(), 8),
            }),
            _ => Err(mismatch()),
        }
    }

    fn alloc(&mut self, size: u64) -> crate::Result<u64> {
        let regions = self
            .mem
            .memory_regions()
            .map_err(crate::Error::TargetUnavailable)?;
        self.ledger.find_free_memory(&regions, size)
    }

    fn write_bytes(&self, addr: u64, bytes: &[u8]) -> crate::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }

        let n = self
            .mem
            .write_memory(addr, bytes)
            .map_err(crate::Error::TargetUnavailable)?;
        if n != bytes.len() {
            return Err(crate::Error::Unreadable(format!(
                "short write at {addr:#x}: {n} of {} bytes",
                bytes.len()
            )));
        }
        Ok(())
    }

    /// A single store of exactly the header word width.
    fn write_word(&self, addr: u64, val: u64) -> crate::Result<()> {
        let bytes = self.bi.arch.encode_uint(val, self.bi.arch.ptr_size as usize);
        self.write_bytes(addr, &bytes)
    }
}
