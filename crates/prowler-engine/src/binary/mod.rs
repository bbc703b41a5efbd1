//! Debug-information model of the attached target: loaded images, the
//! global name dictionaries, and the lazily-populated type arena.

pub mod moduledata;
pub mod types;

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use object::{Object, ObjectSection};
use gimli::Reader as _;

use self::types::{Field, Ty, TyKind, TypeArena, TypeId};
use crate::target::LocatedBinary;

type Reader = gimli::EndianArcSlice<gimli::RunTimeEndian>;

// Vendor extension attributes emitted by the Go toolchain.
const DW_AT_GO_KIND: gimli::DwAt = gimli::DwAt(0x2900);
const DW_AT_GO_KEY: gimli::DwAt = gimli::DwAt(0x2901);
const DW_AT_GO_ELEM: gimli::DwAt = gimli::DwAt(0x2902);
const DW_AT_GO_RUNTIME_TYPE: gimli::DwAt = gimli::DwAt(0x2904);
const DW_AT_GO_DICT_INDEX: gimli::DwAt = gimli::DwAt(0x2906);

/// Reflect kind numbers carried by `DW_AT_go_kind`.
mod go_kind {
    pub const CHAN: u64 = 18;
    pub const INTERFACE: u64 = 20;
    pub const MAP: u64 = 21;
    pub const SLICE: u64 = 23;
    pub const STRING: u64 = 24;
    pub const UNSAFE_POINTER: u64 = 26;

    /// Kind flag: interface data word holds the value itself.
    pub const DIRECT_IFACE: i64 = 1 << 5;
}

pub use self::go_kind::DIRECT_IFACE;

/// Architecture metadata of the target.
#[derive(Debug, Clone, Copy)]
pub struct Arch {
    /// Pointer size in bytes (4 or 8).
    pub ptr_size: u64,
    pub little_endian: bool,
}

impl Arch {
    pub fn decode_uint(&self, bytes: &[u8]) -> u64 {
        let mut val = 0u64;
        if self.little_endian {
            for &b in bytes.iter().rev() {
                val = (val << 8) | b as u64;
            }
        } else {
            for &b in bytes {
                val = (val << 8) | b as u64;
            }
        }
        val
    }

    pub fn encode_uint(&self, val: u64, size: usize) -> Vec<u8> {
        let le = val.to_le_bytes();
        let mut out = le[..size.min(8)].to_vec();
        if !self.little_endian {
            out.reverse();
        }
        out
    }

    fn endian(&self) -> gimli::RunTimeEndian {
        if self.little_endian {
            gimli::RunTimeEndian::Little
        } else {
            gimli::RunTimeEndian::Big
        }
    }
}

/// A package-level variable.
#[derive(Debug)]
pub struct PackageVar {
    pub name: String,
    /// Runtime address (load bias already applied).
    pub addr: u64,
    pub image: usize,
    pub ty: TypeId,
}

/// A named compile-time constant.
#[derive(Debug)]
pub struct GlobalConst {
    pub name: String,
    pub value: i64,
    pub single_bit: bool,
    pub ty: TypeId,
}

/// A function with a known entry point.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub entry: u64,
    pub end: u64,
}

/// Bridge from an in-target runtime type descriptor back into debug info.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeTypeEntry {
    /// Offset of the describing DIE inside the image.
    pub die_offset: u64,
    /// Kind byte recorded in debug info, `-1` when absent.
    pub kind: i64,
}

/// One loaded object (main executable or shared dependency).
pub struct Image {
    pub path: PathBuf,
    pub load_bias: u64,
    pub index: usize,
    dwarf: gimli::Dwarf<Reader>,
    units: Vec<gimli::Unit<Reader>>,
    /// `.debug_info` start offset of each unit, parallel to `units`.
    unit_starts: Vec<u64>,
    /// Runtime-type-table offset to describing DIE.
    runtime_types: HashMap<u64, RuntimeTypeEntry>,
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("path", &self.path)
            .field("load_bias", &format_args!("{:#x}", self.load_bias))
            .field("units", &self.units.len())
            .finish_non_exhaustive()
    }
}

struct TypeTable {
    arena: TypeArena,
    /// Per-image DIE offset to arena handle, breaks type cycles.
    cache: Vec<HashMap<u64, TypeId>>,
}

/// Aggregate debug information of every image mapped into the target.
///
/// Immutable after attach apart from the internal type memoization, which
/// is synchronized separately so lock-free `get`/`list` stay sound.
pub struct BinaryInfo {
    pub arch: Arch,
    images: Vec<Image>,
    types: Mutex<TypeTable>,

    pub vars: IndexMap<String, PackageVar>,
    pub consts: IndexMap<String, GlobalConst>,
    pub functions: IndexMap<String, Function>,
    fn_by_entry: HashMap<u64, String>,

    /// The runtime's own type-descriptor struct, when present.
    runtime_type: Option<TypeId>,
    /// Synthesized type handle for function symbols.
    func_type: TypeId,
}

impl BinaryInfo {
    /// Parses the target executable's debug information and builds the
    /// global dictionaries. Fatal on structurally broken DWARF.
    pub fn load(located: &LocatedBinary, debug_info_dirs: &[PathBuf]) -> crate::Result<Self> {
        let arch = Arch {
            ptr_size: located.pointer_size,
            little_endian: located.little_endian,
        };

        let mut image = Image::open(&located.path, located.load_bias, 0, arch, debug_info_dirs)?;
        let scan = image.scan(arch)?;

        tracing::info!(
            vars = scan.vars.len(),
            consts = scan.consts.len(),
            functions = scan.functions.len(),
            runtime_types = image.runtime_types.len(),
            "scanned debug info"
        );

        let images = vec![image];
        let mut table = TypeTable {
            arena: TypeArena::new(),
            cache: vec![HashMap::new()],
        };

        let mut vars = IndexMap::with_capacity(scan.vars.len());
        for raw in scan.vars {
            let ty = resolve_or_placeholder(&images, &mut table, 0, raw.type_offset, &raw.name);
            vars.insert(
                raw.name.clone(),
                PackageVar {
                    name: raw.name,
                    addr: raw.addr,
                    image: 0,
                    ty,
                },
            );
        }

        let mut consts = IndexMap::with_capacity(scan.consts.len());
        for raw in scan.consts {
            let ty = resolve_or_placeholder(&images, &mut table, 0, raw.type_offset, &raw.name);
            consts.insert(
                raw.name.clone(),
                GlobalConst {
                    single_bit: raw.value.count_ones() == 1,
                    name: raw.name,
                    value: raw.value,
                    ty,
                },
            );
        }

        let mut functions = IndexMap::with_capacity(scan.functions.len());
        let mut fn_by_entry = HashMap::with_capacity(scan.functions.len());
        for f in scan.functions {
            fn_by_entry.insert(f.entry, f.name.clone());
            functions.insert(f.name.clone(), f);
        }

        let runtime_type = scan
            .runtime_type_die
            .and_then(|off| parse_type(&images, &mut table, 0, off).ok());

        let func_type = table.arena.alloc(Ty {
            name: "func()".to_owned(),
            byte_size: arch.ptr_size,
            kind: TyKind::Func,
        });

        Ok(Self {
            arch,
            images,
            types: Mutex::new(table),
            vars,
            consts,
            functions,
            fn_by_entry,
            runtime_type,
            func_type,
        })
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    /// Resolved type for the given arena handle.
    pub fn ty(&self, id: TypeId) -> Arc<Ty> {
        self.types.lock().unwrap().arena.get(id)
    }

    /// Follows definition aliases until a non-alias type is reached.
    pub fn resolve_typedef(&self, id: TypeId) -> TypeId {
        self.types.lock().unwrap().arena.resolve_typedef(id)
    }

    pub fn pointer_to(&self, elem: TypeId) -> TypeId {
        self.types
            .lock()
            .unwrap()
            .arena
            .pointer_to(elem, self.arch.ptr_size)
    }

    pub fn array_of(&self, elem: TypeId, count: i64) -> TypeId {
        self.types.lock().unwrap().arena.array_of(elem, count)
    }

    /// Lazily parses the type DIE at `offset` inside `image`.
    pub fn type_at(&self, image: usize, offset: u64) -> crate::Result<TypeId> {
        let mut table = self.types.lock().unwrap();
        parse_type(&self.images, &mut table, image, offset)
    }

    /// Debug-info entry for a runtime type-table offset, if any.
    pub fn runtime_type_entry(&self, image: usize, rt_offset: u64) -> Option<RuntimeTypeEntry> {
        self.images
            .get(image)?
            .runtime_types
            .get(&rt_offset)
            .copied()
    }

    /// The `runtime._type` descriptor struct, when the target has one.
    pub fn runtime_type(&self) -> Option<TypeId> {
        self.runtime_type
    }

    /// Type handle used for function symbols.
    pub fn func_type(&self) -> TypeId {
        self.func_type
    }

    /// Function whose entry point is exactly `addr`.
    pub fn function_at(&self, addr: u64) -> Option<&Function> {
        self.fn_by_entry
            .get(&addr)
            .and_then(|name| self.functions.get(name))
    }
}

fn resolve_or_placeholder(
    images: &[Image],
    table: &mut TypeTable,
    image: usize,
    type_offset: Option<u64>,
    name: &str,
) -> TypeId {
    let resolved = type_offset
        .ok_or_else(|| crate::Error::Unreadable("no type attribute".to_owned()))
        .and_then(|off| parse_type(images, table, image, off));

    match resolved {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(name, error = %e, "could not resolve type");
            table.arena.alloc(Ty {
                name: String::new(),
                byte_size: 0,
                kind: TyKind::Unsupported,
            })
        }
    }
}

struct RawVar {
    name: String,
    addr: u64,
    type_offset: Option<u64>,
}

struct RawConst {
    name: String,
    value: i64,
    type_offset: Option<u64>,
}

struct ScanOutput {
    vars: Vec<RawVar>,
    consts: Vec<RawConst>,
    functions: Vec<Function>,
    runtime_type_die: Option<u64>,
}

impl Image {
    /// Opens an executable (or shared object) and loads its DWARF sections,
    /// chasing a split debug file by build id when the binary is stripped.
    fn open(
        path: &Path,
        load_bias: u64,
        index: usize,
        arch: Arch,
        debug_info_dirs: &[PathBuf],
    ) -> crate::Result<Self> {
        let data =
            std::fs::read(path).map_err(|e| crate::Error::File(path.to_path_buf(), e))?;

        let split_path = {
            let file = object::File::parse(&*data)?;
            if has_debug_info(&file) {
                None
            } else {
                let debug_path = find_split_debug_file(&file, debug_info_dirs)
                    .ok_or_else(|| crate::Error::MissingDebugInfo(path.to_path_buf()))?;
                tracing::debug!(path = %debug_path.display(), "using split debug file");
                Some(debug_path)
            }
        };

        let data = match &split_path {
            None => data,
            Some(debug_path) => std::fs::read(debug_path)
                .map_err(|e| crate::Error::File(debug_path.clone(), e))?,
        };

        let file = object::File::parse(&*data)?;
        if !has_debug_info(&file) {
            return Err(crate::Error::MissingDebugInfo(
                split_path.unwrap_or_else(|| path.to_path_buf()),
            ));
        }

        let endian = arch.endian();
        let dwarf = gimli::Dwarf::load(|id: gimli::SectionId| -> Result<Reader, gimli::Error> {
            let section = file
                .section_by_name(id.name())
                .and_then(|s| s.uncompressed_data().ok())
                .unwrap_or(Cow::Borrowed(&[]));
            Ok(gimli::EndianArcSlice::new(
                Arc::from(section.as_ref()),
                endian,
            ))
        })?;

        let mut units = Vec::new();
        let mut unit_starts = Vec::new();
        let mut iter = dwarf.units();
        while let Some(header) = iter.next()? {
            let start = match header.offset() {
                gimli::UnitSectionOffset::DebugInfoOffset(o) => o.0 as u64,
                gimli::UnitSectionOffset::DebugTypesOffset(_) => continue,
            };
            units.push(dwarf.unit(header)?);
            unit_starts.push(start);
        }

        Ok(Self {
            path: path.to_path_buf(),
            load_bias,
            index,
            dwarf,
            units,
            unit_starts,
            runtime_types: HashMap::new(),
        })
    }

    /// Single pass over every DIE: global dictionaries and the
    /// runtime-type bridge.
    fn scan(&mut self, arch: Arch) -> crate::Result<ScanOutput> {
        let mut out = ScanOutput {
            vars: Vec::new(),
            consts: Vec::new(),
            functions: Vec::new(),
            runtime_type_die: None,
        };
        let mut runtime_types = HashMap::new();

        for unit in &self.units {
            let mut cursor = unit.entries();
            let mut depth = 0isize;

            while let Some((delta, entry)) = cursor.next_dfs()? {
                depth += delta;

                if let Some(rt_off) = attr_udata(entry, DW_AT_GO_RUNTIME_TYPE)? {
                    let kind = attr_udata(entry, DW_AT_GO_KIND)?
                        .map(|k| k as i64)
                        .unwrap_or(-1);
                    let die_offset = global_offset(unit, entry.offset());
                    runtime_types.insert(rt_off, RuntimeTypeEntry { die_offset, kind });
                }

                if out.runtime_type_die.is_none()
                    && entry.tag() == gimli::DW_TAG_structure_type
                {
                    if let Some(name) = attr_string(&self.dwarf, unit, entry, gimli::DW_AT_name)? {
                        if name == "runtime._type" || name == "internal/abi.Type" {
                            out.runtime_type_die = Some(global_offset(unit, entry.offset()));
                        }
                    }
                }

                if depth != 1 {
                    continue;
                }

                match entry.tag() {
                    gimli::DW_TAG_variable => {
                        let Some(name) = attr_string(&self.dwarf, unit, entry, gimli::DW_AT_name)?
                        else {
                            continue;
                        };
                        let Some(addr) = static_address(entry, arch)? else {
                            continue;
                        };
                        out.vars.push(RawVar {
                            name,
                            addr: addr + self.load_bias,
                            type_offset: attr_type_offset(unit, entry)?,
                        });
                    }
                    gimli::DW_TAG_constant => {
                        let Some(name) = attr_string(&self.dwarf, unit, entry, gimli::DW_AT_name)?
                        else {
                            continue;
                        };
                        if name.is_empty() {
                            continue;
                        }
                        let Some(value) = attr_const_value(entry)? else {
                            continue;
                        };
                        out.consts.push(RawConst {
                            name,
                            value,
                            type_offset: attr_type_offset(unit, entry)?,
                        });
                    }
                    gimli::DW_TAG_subprogram => {
                        let Some(name) = attr_string(&self.dwarf, unit, entry, gimli::DW_AT_name)?
                        else {
                            continue;
                        };
                        let Some(gimli::AttributeValue::Addr(low)) =
                            entry.attr_value(gimli::DW_AT_low_pc)?
                        else {
                            // Abstract or inlined instance.
                            continue;
                        };
                        let entry_addr = low + self.load_bias;
                        let end = match entry.attr_value(gimli::DW_AT_high_pc)? {
                            Some(gimli::AttributeValue::Addr(a)) => a + self.load_bias,
                            Some(v) => entry_addr + v.udata_value().unwrap_or(0),
                            None => entry_addr,
                        };
                        out.functions.push(Function {
                            name,
                            entry: entry_addr,
                            end,
                        });
                    }
                    _ => (),
                }
            }
        }

        self.runtime_types = runtime_types;

        Ok(out)
    }

    fn unit_containing(
        &self,
        offset: u64,
    ) -> crate::Result<(&gimli::Unit<Reader>, gimli::UnitOffset)> {
        let idx = self
            .unit_starts
            .partition_point(|&start| start <= offset)
            .checked_sub(1)
            .ok_or(gimli::Error::OffsetOutOfBounds)?;

        // A unit offset is relative to the start of the unit header.
        let relative = (offset - self.unit_starts[idx]) as usize;

        Ok((&self.units[idx], gimli::UnitOffset(relative)))
    }
}

/// Lazily parses the type rooted at `offset`, memoizing through the
/// per-image cache so self-referential types terminate.
fn parse_type(
    images: &[Image],
    table: &mut TypeTable,
    image: usize,
    offset: u64,
) -> crate::Result<TypeId> {
    if let Some(&id) = table.cache[image].get(&offset) {
        return Ok(id);
    }

    let id = table.arena.alloc_placeholder();
    table.cache[image].insert(offset, id);

    let ty = parse_type_entry(images, table, image, offset)?;
    table.arena.set(id, ty);

    Ok(id)
}

fn parse_type_entry(
    images: &[Image],
    table: &mut TypeTable,
    image: usize,
    offset: u64,
) -> crate::Result<Ty> {
    let img = &images[image];
    let (unit, unit_offset) = img.unit_containing(offset)?;
    let entry = unit.entry(unit_offset)?;

    let mut name = attr_string(&img.dwarf, unit, &entry, gimli::DW_AT_name)?.unwrap_or_default();
    let byte_size = attr_udata(&entry, gimli::DW_AT_byte_size)?.unwrap_or(0);
    let go_kind = attr_udata(&entry, DW_AT_GO_KIND)?.unwrap_or(0);
    let ptr_size = match unit.header.address_size() {
        0 => 8,
        n => n as u64,
    };

    let kind = match entry.tag() {
        gimli::DW_TAG_base_type => match entry.attr_value(gimli::DW_AT_encoding)? {
            Some(gimli::AttributeValue::Encoding(gimli::DW_ATE_boolean)) => TyKind::Bool,
            Some(gimli::AttributeValue::Encoding(gimli::DW_ATE_signed))
            | Some(gimli::AttributeValue::Encoding(gimli::DW_ATE_signed_char)) => TyKind::Int,
            Some(gimli::AttributeValue::Encoding(gimli::DW_ATE_unsigned))
            | Some(gimli::AttributeValue::Encoding(gimli::DW_ATE_unsigned_char))
            | Some(gimli::AttributeValue::Encoding(gimli::DW_ATE_address)) => TyKind::Uint,
            Some(gimli::AttributeValue::Encoding(gimli::DW_ATE_float)) => TyKind::Float,
            Some(gimli::AttributeValue::Encoding(gimli::DW_ATE_complex_float)) => TyKind::Complex,
            _ => TyKind::Unsupported,
        },

        gimli::DW_TAG_pointer_type => match attr_type_offset(unit, &entry)? {
            _ if go_kind == go_kind::UNSAFE_POINTER || name == "unsafe.Pointer" => {
                TyKind::UnsafePointer
            }
            Some(elem_off) => TyKind::Pointer {
                elem: parse_type(images, table, image, elem_off)?,
            },
            None => TyKind::UnsafePointer,
        },

        gimli::DW_TAG_structure_type => {
            let fields = parse_struct_fields(images, table, image, offset)?;
            match go_kind {
                go_kind::STRING => TyKind::String,
                go_kind::SLICE => match fields
                    .iter()
                    .find(|f| f.name == "array")
                    .map(|f| table.arena.get(f.ty))
                {
                    Some(ptr) => match ptr.kind {
                        TyKind::Pointer { elem } => TyKind::Slice { elem },
                        _ => TyKind::Struct { fields },
                    },
                    None => TyKind::Struct { fields },
                },
                _ => TyKind::Struct { fields },
            }
        }

        gimli::DW_TAG_typedef => match attr_type_offset(unit, &entry)? {
            None => TyKind::Unsupported,
            Some(under_off) => {
                let dict_index = attr_udata(&entry, DW_AT_GO_DICT_INDEX)?;
                let key_off = attr_type_ref(unit, &entry, DW_AT_GO_KEY)?;
                let elem_off = attr_type_ref(unit, &entry, DW_AT_GO_ELEM)?;
                let underlying = parse_type(images, table, image, under_off)?;

                if let Some(dict_index) = dict_index {
                    TyKind::Parametric {
                        dict_index: dict_index as i64,
                        default: underlying,
                    }
                } else {
                    match (go_kind, key_off, elem_off) {
                        (go_kind::MAP, Some(k), Some(e)) => TyKind::Map {
                            key: parse_type(images, table, image, k)?,
                            elem: parse_type(images, table, image, e)?,
                            underlying,
                        },
                        (go_kind::CHAN, _, Some(e)) => TyKind::Chan {
                            elem: parse_type(images, table, image, e)?,
                            underlying,
                        },
                        (go_kind::INTERFACE, _, _) => TyKind::Interface {
                            underlying: table.arena.resolve_typedef(underlying),
                        },
                        _ => TyKind::Typedef { underlying },
                    }
                }
            }
        },

        gimli::DW_TAG_array_type => {
            let elem_off = attr_type_offset(unit, &entry)?;
            let count = array_count(unit, unit_offset)?;
            match elem_off {
                Some(off) => TyKind::Array {
                    elem: parse_type(images, table, image, off)?,
                    count,
                },
                None => TyKind::Unsupported,
            }
        }

        gimli::DW_TAG_subroutine_type => TyKind::Func,

        gimli::DW_TAG_const_type | gimli::DW_TAG_volatile_type | gimli::DW_TAG_restrict_type => {
            match attr_type_offset(unit, &entry)? {
                Some(off) => TyKind::Typedef {
                    underlying: parse_type(images, table, image, off)?,
                },
                None => TyKind::Unsupported,
            }
        }

        _ => TyKind::Unsupported,
    };

    // Synthesize a readable name for unnamed derived types.
    if name.is_empty() {
        name = match &kind {
            TyKind::Pointer { elem } => format!("*{}", table.arena.get(*elem).name),
            TyKind::Array { elem, count } => {
                format!("[{}]{}", count, table.arena.get(*elem).name)
            }
            TyKind::Slice { elem } => format!("[]{}", table.arena.get(*elem).name),
            TyKind::Func => "func()".to_owned(),
            _ => name,
        };
    }

    let byte_size = match (&kind, byte_size) {
        (TyKind::Pointer { .. } | TyKind::UnsafePointer | TyKind::Func, 0) => ptr_size,
        _ => byte_size,
    };

    Ok(Ty {
        name,
        byte_size,
        kind,
    })
}

fn parse_struct_fields(
    images: &[Image],
    table: &mut TypeTable,
    image: usize,
    struct_offset: u64,
) -> crate::Result<Vec<Field>> {
    // Collect raw members first; recursing while the entries tree borrows
    // the unit would tangle the cursor state.
    let mut raw = Vec::new();
    {
        let img = &images[image];
        let (unit, unit_offset) = img.unit_containing(struct_offset)?;
        let mut tree = unit.entries_tree(Some(unit_offset))?;
        let root = tree.root()?;
        let mut children = root.children();

        while let Some(child) = children.next()? {
            let entry = child.entry();
            if entry.tag() != gimli::DW_TAG_member {
                continue;
            }
            let name = attr_string(&img.dwarf, unit, entry, gimli::DW_AT_name)?.unwrap_or_default();
            let byte_offset = attr_udata(entry, gimli::DW_AT_data_member_location)?
                .unwrap_or(0) as i64;
            let Some(type_offset) = attr_type_offset(unit, entry)? else {
                continue;
            };
            raw.push((name, byte_offset, type_offset));
        }
    }

    let mut fields = Vec::with_capacity(raw.len());
    for (name, byte_offset, type_offset) in raw {
        fields.push(Field {
            name,
            byte_offset,
            ty: parse_type(images, table, image, type_offset)?,
        });
    }

    Ok(fields)
}

fn array_count(
    unit: &gimli::Unit<Reader>,
    array_offset: gimli::UnitOffset,
) -> crate::Result<i64> {
    let mut tree = unit.entries_tree(Some(array_offset))?;
    let root = tree.root()?;
    let mut children = root.children();

    while let Some(child) = children.next()? {
        let entry = child.entry();
        if entry.tag() == gimli::DW_TAG_subrange_type {
            if let Some(count) = attr_udata(entry, gimli::DW_AT_count)? {
                return Ok(count as i64);
            }
            if let Some(upper) = attr_udata(entry, gimli::DW_AT_upper_bound)? {
                return Ok(upper as i64 + 1);
            }
        }
    }

    Ok(0)
}

fn global_offset(unit: &gimli::Unit<Reader>, offset: gimli::UnitOffset) -> u64 {
    match offset.to_unit_section_offset(unit) {
        gimli::UnitSectionOffset::DebugInfoOffset(o) => o.0 as u64,
        gimli::UnitSectionOffset::DebugTypesOffset(o) => o.0 as u64,
    }
}

fn attr_udata(
    entry: &gimli::DebuggingInformationEntry<Reader>,
    at: gimli::DwAt,
) -> crate::Result<Option<u64>> {
    Ok(entry.attr_value(at)?.and_then(|v| v.udata_value()))
}

fn attr_const_value(
    entry: &gimli::DebuggingInformationEntry<Reader>,
) -> crate::Result<Option<i64>> {
    let Some(value) = entry.attr_value(gimli::DW_AT_const_value)? else {
        return Ok(None);
    };
    Ok(value
        .sdata_value()
        .or_else(|| value.udata_value().map(|u| u as i64)))
}

fn attr_string(
    dwarf: &gimli::Dwarf<Reader>,
    unit: &gimli::Unit<Reader>,
    entry: &gimli::DebuggingInformationEntry<Reader>,
    at: gimli::DwAt,
) -> crate::Result<Option<String>> {
    let Some(value) = entry.attr_value(at)? else {
        return Ok(None);
    };
    let s = dwarf.attr_string(unit, value)?;
    Ok(Some(s.to_string_lossy()?.into_owned()))
}

/// `DW_AT_type` of an entry as a `.debug_info` offset.
fn attr_type_offset(
    unit: &gimli::Unit<Reader>,
    entry: &gimli::DebuggingInformationEntry<Reader>,
) -> crate::Result<Option<u64>> {
    attr_type_ref(unit, entry, gimli::DW_AT_type)
}

fn attr_type_ref(
    unit: &gimli::Unit<Reader>,
    entry: &gimli::DebuggingInformationEntry<Reader>,
    at: gimli::DwAt,
) -> crate::Result<Option<u64>> {
    Ok(match entry.attr_value(at)? {
        Some(gimli::AttributeValue::UnitRef(uo)) => Some(global_offset(unit, uo)),
        Some(gimli::AttributeValue::DebugInfoRef(o)) => Some(o.0 as u64),
        _ => None,
    })
}

/// Address of a statically-allocated variable: a location expression of the
/// form `DW_OP_addr <address>`.
fn static_address(
    entry: &gimli::DebuggingInformationEntry<Reader>,
    arch: Arch,
) -> crate::Result<Option<u64>> {
    let Some(gimli::AttributeValue::Exprloc(expr)) =
        entry.attr_value(gimli::DW_AT_location)?
    else {
        return Ok(None);
    };

    let bytes = expr.0.to_slice()?;
    if bytes.len() != 1 + arch.ptr_size as usize || bytes[0] != gimli::DW_OP_addr.0 {
        return Ok(None);
    }

    Ok(Some(arch.decode_uint(&bytes[1..])))
}

fn has_debug_info(file: &object::File) -> bool {
    file.section_by_name(".debug_info")
        .map(|s| s.size() > 0)
        .unwrap_or(false)
}

/// `<dir>/<aa>/<rest of build id>.debug` lookup, the `.build-id` layout
/// used by distribution debug packages.
fn find_split_debug_file(file: &object::File, debug_info_dirs: &[PathBuf]) -> Option<PathBuf> {
    let build_id = file.build_id().ok().flatten()?;
    if build_id.len() < 2 {
        return None;
    }

    let head = format!("{:02x}", build_id[0]);
    let rest: String = build_id[1..].iter().map(|b| format!("{b:02x}")).collect();

    debug_info_dirs
        .iter()
        .map(|dir| dir.join(&head).join(format!("{rest}.debug")))
        .find(|p| p.exists())
}

#[cfg(test)]
impl BinaryInfo {
    /// Builds a `BinaryInfo` around a hand-assembled type arena, without
    /// any backing executable. The closure returns whatever handles the
    /// test wants to keep.
    pub(crate) fn for_tests<T>(
        arch: Arch,
        build: impl FnOnce(&mut TypeArena) -> T,
    ) -> (Self, T) {
        let mut arena = TypeArena::new();
        let out = build(&mut arena);
        let func_type = arena.alloc(Ty {
            name: "func()".to_owned(),
            byte_size: arch.ptr_size,
            kind: TyKind::Func,
        });

        (
            Self {
                arch,
                images: Vec::new(),
                types: Mutex::new(TypeTable {
                    arena,
                    cache: Vec::new(),
                }),
                vars: IndexMap::new(),
                consts: IndexMap::new(),
                functions: IndexMap::new(),
                fn_by_entry: HashMap::new(),
                runtime_type: None,
                func_type,
            },
            out,
        )
    }

    pub(crate) fn add_test_function(&mut self, name: &str, entry: u64, end: u64) {
        self.fn_by_entry.insert(entry, name.to_owned());
        self.functions.insert(
            name.to_owned(),
            Function {
                name: name.to_owned(),
                entry,
                end,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arch_uint_codec_round_trips() {
        let le = Arch {
            ptr_size: 8,
            little_endian: true,
        };
        let be = Arch {
            ptr_size: 8,
            little_endian: false,
        };

        assert_eq!(le.encode_uint(0xdead_beef, 8), 0xdead_beefu64.to_le_bytes());
        assert_eq!(be.encode_uint(0xdead_beef, 8), 0xdead_beefu64.to_be_bytes());

        for arch in [le, be] {
            for val in [0u64, 1, 0x7f, 0x80, 0xffff_ffff, u64::MAX] {
                let bytes = arch.encode_uint(val, 8);
                assert_eq!(arch.decode_uint(&bytes), val);
            }
            let bytes = arch.encode_uint(0x1234, 2);
            assert_eq!(arch.decode_uint(&bytes), 0x1234);
        }
    }
}
