/// Error type of this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A name is absent from the symbol index.
    #[error("{0} not found in process")]
    SymbolNotFound(String),

    /// A name resolved to a variable entry that no longer exists.
    #[error("variable not found")]
    VariableNotFound,

    /// A name resolved to a constant entry that no longer exists.
    #[error("constant not found")]
    ConstantNotFound,

    /// A name resolved to a function entry that no longer exists.
    #[error("function not found")]
    FunctionNotFound,

    /// A struct literal referenced a field the type does not have.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// File open/read error.
    #[error("{0}: {1}")]
    File(std::path::PathBuf, std::io::Error),

    /// Structural error in the target's debug information (fatal at attach).
    #[error("malformed debug info: {0}")]
    Dwarf(#[from] gimli::Error),

    /// The target executable could not be parsed.
    #[error("malformed object file: {0}")]
    Object(#[from] object::read::Error),

    /// The target binary carries no debug information at all.
    #[error("no debug info found in {0}")]
    MissingDebugInfo(std::path::PathBuf),

    /// The target's address space could not be accessed.
    #[error("target unavailable: {0}")]
    TargetUnavailable(#[source] std::io::Error),

    /// A memory read failed or yielded an inconsistent structure.
    #[error("unreadable: {0}")]
    Unreadable(String),

    /// A textual literal is incompatible with the declared type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// No anonymous writable region can hold the requested allocation.
    #[error("not found free memory")]
    NoFreeMemory,

    /// An array literal holds more elements than the compile-time count.
    #[error(
        "expected length is {expected}, actual length is {actual}, \
         array length is not expandable, write failed"
    )]
    ArrayOverflow { expected: i64, actual: usize },

    /// Unbuffered channels have no buffer to rewrite.
    #[error("cannot support synchronous channel modification")]
    SynchronousChannel,

    /// The declared type has no write support.
    #[error("conversion not implemented for type: {0}")]
    UnsupportedType(String),

    /// A list-like literal is missing its surrounding brackets.
    #[error("cannot parse expression {expr:?}, {what} must be wrapped by []")]
    NotBracketed { expr: String, what: &'static str },

    /// An element of a list-like literal failed to parse.
    #[error("element format error, elem: {elem}, type: {ty}")]
    ElementFormat { elem: String, ty: String },

    /// A struct or map literal is not valid JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// An in-target runtime type pointer has no debug-info counterpart.
    #[error("could not resolve interface type")]
    UnresolvedInterfaceType,
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;
