use std::fmt;
use std::sync::Arc;

/// Handle into the type arena.
///
/// Types are stored in an arena keyed by their debug-info offset so that
/// cyclic graphs (a struct pointing at itself through a pointer) resolve to
/// the same handle instead of recursing forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub(crate) u32);

/// Reflect-style kind tag attached to every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Invalid,
    Bool,
    Int,
    Uint,
    Float,
    Complex,
    Array,
    Chan,
    Func,
    Interface,
    Map,
    Ptr,
    Slice,
    String,
    Struct,
    UnsafePointer,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Invalid => "invalid",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Float => "float",
            Kind::Complex => "complex",
            Kind::Array => "array",
            Kind::Chan => "chan",
            Kind::Func => "func",
            Kind::Interface => "interface",
            Kind::Map => "map",
            Kind::Ptr => "ptr",
            Kind::Slice => "slice",
            Kind::String => "string",
            Kind::Struct => "struct",
            Kind::UnsafePointer => "unsafe.Pointer",
        };
        f.write_str(s)
    }
}

/// One struct member.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub byte_offset: i64,
    pub ty: TypeId,
}

/// A type from the target's debug information.
#[derive(Debug)]
pub struct Ty {
    /// Common (declared) name, possibly synthesized for unnamed types.
    pub name: String,

    /// Size in bytes of a value of this type.
    pub byte_size: u64,

    pub kind: TyKind,
}

/// Type variants, mirroring the target language's type system.
#[derive(Debug)]
pub enum TyKind {
    Bool,
    /// Signed integer; width is `byte_size`.
    Int,
    Uint,
    Float,
    Complex,
    String,
    Pointer {
        elem: TypeId,
    },
    UnsafePointer,
    Array {
        elem: TypeId,
        count: i64,
    },
    Slice {
        elem: TypeId,
    },
    Map {
        key: TypeId,
        elem: TypeId,
        /// The declared representation (pointer to the runtime hash table),
        /// consulted when walking buckets.
        underlying: TypeId,
    },
    Chan {
        elem: TypeId,
        /// Pointer to the runtime channel header struct.
        underlying: TypeId,
    },
    Struct {
        fields: Vec<Field>,
    },
    Interface {
        /// The two-word runtime header struct behind the interface.
        underlying: TypeId,
    },
    Func,
    /// Generic type whose concrete instantiation lives in a per-function
    /// dictionary at runtime.
    Parametric {
        dict_index: i64,
        default: TypeId,
    },
    /// Definition alias; chased by [TypeArena::resolve_typedef].
    Typedef {
        underlying: TypeId,
    },
    /// Placeholder for types the parser does not model.
    Unsupported,
}

impl Ty {
    pub fn kind_tag(&self) -> Kind {
        match self.kind {
            TyKind::Bool => Kind::Bool,
            TyKind::Int => Kind::Int,
            TyKind::Uint => Kind::Uint,
            TyKind::Float => Kind::Float,
            TyKind::Complex => Kind::Complex,
            TyKind::String => Kind::String,
            TyKind::Pointer { .. } => Kind::Ptr,
            TyKind::UnsafePointer => Kind::UnsafePointer,
            TyKind::Array { .. } => Kind::Array,
            TyKind::Slice { .. } => Kind::Slice,
            TyKind::Map { .. } => Kind::Map,
            TyKind::Chan { .. } => Kind::Chan,
            TyKind::Struct { .. } => Kind::Struct,
            TyKind::Interface { .. } => Kind::Interface,
            TyKind::Func => Kind::Func,
            TyKind::Parametric { .. } | TyKind::Typedef { .. } | TyKind::Unsupported => {
                Kind::Invalid
            }
        }
    }

    /// Struct member lookup by name.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        match &self.kind {
            TyKind::Struct { fields } => fields.iter().find(|f| f.name == name),
            _ => None,
        }
    }
}

/// Append-only arena of resolved types.
#[derive(Debug, Default)]
pub struct TypeArena {
    types: Vec<Arc<Ty>>,
}

impl TypeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: TypeId) -> Arc<Ty> {
        self.types[id.0 as usize].clone()
    }

    /// Allocates a new slot. Used with [set](Self::set) to break cycles:
    /// the handle is registered in the per-image cache before the type's
    /// children are parsed.
    pub(crate) fn alloc_placeholder(&mut self) -> TypeId {
        self.types.push(Arc::new(Ty {
            name: String::new(),
            byte_size: 0,
            kind: TyKind::Unsupported,
        }));
        TypeId(self.types.len() as u32 - 1)
    }

    pub(crate) fn set(&mut self, id: TypeId, ty: Ty) {
        self.types[id.0 as usize] = Arc::new(ty);
    }

    pub(crate) fn alloc(&mut self, ty: Ty) -> TypeId {
        self.types.push(Arc::new(ty));
        TypeId(self.types.len() as u32 - 1)
    }

    /// Follows definition aliases until a non-alias type is reached.
    pub fn resolve_typedef(&self, mut id: TypeId) -> TypeId {
        loop {
            match self.types[id.0 as usize].kind {
                TyKind::Typedef { underlying } => id = underlying,
                _ => return id,
            }
        }
    }

    /// Derives `*elem` with the target's pointer size.
    pub fn pointer_to(&mut self, elem: TypeId, ptr_size: u64) -> TypeId {
        let name = format!("*{}", self.get(elem).name);
        self.alloc(Ty {
            name,
            byte_size: ptr_size,
            kind: TyKind::Pointer { elem },
        })
    }

    /// Derives `[count]elem`.
    pub fn array_of(&mut self, elem: TypeId, count: i64) -> TypeId {
        let elem_ty = self.get(elem);
        let name = format!("[{}]{}", count, elem_ty.name);
        let byte_size = elem_ty.byte_size * count.max(0) as u64;
        self.alloc(Ty {
            name,
            byte_size,
            kind: TyKind::Array { elem, count },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typedef_chains_resolve_to_base() {
        let mut arena = TypeArena::new();
        let base = arena.alloc(Ty {
            name: "int".to_owned(),
            byte_size: 8,
            kind: TyKind::Int,
        });
        let alias = arena.alloc(Ty {
            name: "pkg.MyInt".to_owned(),
            byte_size: 8,
            kind: TyKind::Typedef { underlying: base },
        });
        let alias2 = arena.alloc(Ty {
            name: "pkg.MyInt2".to_owned(),
            byte_size: 8,
            kind: TyKind::Typedef { underlying: alias },
        });

        assert_eq!(arena.resolve_typedef(alias2), base);
        assert_eq!(arena.resolve_typedef(base), base);
    }

    #[test]
    fn derived_pointer_and_array_types() {
        let mut arena = TypeArena::new();
        let base = arena.alloc(Ty {
            name: "uint8".to_owned(),
            byte_size: 1,
            kind: TyKind::Uint,
        });

        let ptr = arena.pointer_to(base, 8);
        let ptr_ty = arena.get(ptr);
        assert_eq!(ptr_ty.name, "*uint8");
        assert_eq!(ptr_ty.byte_size, 8);
        assert_eq!(ptr_ty.kind_tag(), Kind::Ptr);

        let arr = arena.array_of(base, 4);
        let arr_ty = arena.get(arr);
        assert_eq!(arr_ty.name, "[4]uint8");
        assert_eq!(arr_ty.byte_size, 4);
        assert_eq!(arr_ty.kind_tag(), Kind::Array);
    }
}
