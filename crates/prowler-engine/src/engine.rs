use std::path::PathBuf;
use std::sync::Mutex;

use crate::alloc::AllocationLedger;
use crate::binary::types::TyKind;
use crate::binary::BinaryInfo;
use crate::index::{SymbolIndex, SymbolKind};
use crate::target::{TargetLocator, TargetMemory};
use crate::value::write::{parse_literal, ValueWriter};
use crate::value::{LoadConfig, Value, ValueReader, FLAG_CONSTANT};

/// Default search path for split debug files.
const DEFAULT_DEBUG_INFO_DIRS: &[&str] = &["/usr/lib/debug/.build-id"];

/// Kind filter accepted by [Prowler::list].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListKind {
    #[default]
    All,
    Variables,
    Constants,
}

impl From<u8> for ListKind {
    fn from(v: u8) -> Self {
        match v {
            1 => ListKind::Variables,
            2 => ListKind::Constants,
            _ => ListKind::All,
        }
    }
}

/// The inspection engine attached to one live process.
///
/// `get` and `list` take no lock and may observe torn values while the
/// target keeps running; `set` holds the engine's exclusive lock from name
/// resolution to the final readback.
pub struct Prowler {
    pid: u64,
    mem: Box<dyn TargetMemory>,
    bi: BinaryInfo,
    index: SymbolIndex,
    /// Exclusive write lock; also owns the allocation ledger.
    write_lock: Mutex<AllocationLedger>,
    load_cfg: LoadConfig,
}

impl Prowler {
    /// Attaches to the process with the given ID: locates its executable,
    /// parses the debug information and builds the symbol index.
    pub fn attach(
        pid: u64,
        locator: &dyn TargetLocator,
        mem: Box<dyn TargetMemory>,
    ) -> crate::Result<Self> {
        let located = locator
            .locate(pid)
            .map_err(crate::Error::TargetUnavailable)?;

        tracing::info!(
            pid,
            path = %located.path.display(),
            entry = format_args!("{:#x}", located.entry_point),
            load_bias = format_args!("{:#x}", located.load_bias),
            "attaching"
        );

        let debug_info_dirs: Vec<PathBuf> = DEFAULT_DEBUG_INFO_DIRS
            .iter()
            .map(PathBuf::from)
            .collect();

        let bi = BinaryInfo::load(&located, &debug_info_dirs)?;
        let index = build_index(&bi);

        tracing::info!(symbols = index.len(), "symbol index built");

        Ok(Self {
            pid,
            mem,
            bi,
            index,
            write_lock: Mutex::new(AllocationLedger::new()),
            load_cfg: LoadConfig::default(),
        })
    }

    pub fn pid(&self) -> u64 {
        self.pid
    }

    pub fn binary_info(&self) -> &BinaryInfo {
        &self.bi
    }

    /// Resolves `name` and materializes its current value.
    pub fn get(&self, name: &str) -> crate::Result<Value> {
        let kind = self
            .index
            .find(name)
            .ok_or_else(|| crate::Error::SymbolNotFound(name.to_owned()))?;

        match kind {
            SymbolKind::Variable => self.get_variable(name),
            SymbolKind::Constant => self.get_constant(name),
            SymbolKind::Function => self.get_function(name),
        }
    }

    /// Parses `text` against the declared type of `name` and writes it into
    /// the target, returning the observed post-state.
    ///
    /// Writes are unsafe with respect to concurrent target mutators; the
    /// target is never stopped.
    pub fn set(&self, name: &str, text: &str) -> crate::Result<Value> {
        let mut ledger = self.write_lock.lock().unwrap();

        let var = self
            .bi
            .vars
            .get(name)
            .ok_or(crate::Error::VariableNotFound)?;

        let reader = ValueReader::new(&self.bi, &*self.mem);
        let mut snapshot = reader.new_value(name, var.addr, var.ty);
        reader.load(&mut snapshot, &self.load_cfg);
        if let Some(reason) = snapshot.unreadable.clone() {
            return Err(crate::Error::Unreadable(reason));
        }

        let literal = parse_literal(&self.bi, text, snapshot.real_ty)?;

        let mut writer = ValueWriter::new(&self.bi, &*self.mem, &mut ledger);
        writer.write_value(&snapshot, &literal)?;

        // Readback under the same lock.
        let mut after = reader.new_value(name, var.addr, var.ty);
        reader.load(&mut after, &self.load_cfg);
        Ok(after)
    }

    /// Names of variables and/or constants, filtered by prefixes/suffixes
    /// (no filter lists everything).
    pub fn list(&self, kind: ListKind, prefixes: &[String], suffixes: &[String]) -> Vec<String> {
        let all = prefixes.is_empty() && suffixes.is_empty();
        let matches = |name: &str| {
            all || prefixes.iter().any(|p| name.starts_with(p.as_str()))
                || suffixes.iter().any(|s| name.ends_with(s.as_str()))
        };

        let mut out = Vec::new();
        if matches!(kind, ListKind::All | ListKind::Variables) {
            out.extend(self.bi.vars.keys().filter(|n| matches(n.as_str())).cloned());
        }
        if matches!(kind, ListKind::All | ListKind::Constants) {
            out.extend(self.bi.consts.keys().filter(|n| matches(n.as_str())).cloned());
        }
        out
    }

    /// Prefix and subsequence matches over every indexed name, in
    /// insertion order.
    pub fn fuzzy(&self, expr: &str) -> Vec<String> {
        self.index.fuzzy_search(expr)
    }

    fn get_variable(&self, name: &str) -> crate::Result<Value> {
        let var = self
            .bi
            .vars
            .get(name)
            .ok_or(crate::Error::VariableNotFound)?;

        let reader = ValueReader::new(&self.bi, &*self.mem);
        let mut value = reader.new_value(name, var.addr, var.ty);
        reader.load(&mut value, &self.load_cfg);

        if let Some(reason) = value.unreadable.clone() {
            return Err(crate::Error::Unreadable(reason));
        }
        Ok(value)
    }

    /// Constants materialize as untyped literals from their recorded
    /// integer payload.
    fn get_constant(&self, name: &str) -> crate::Result<Value> {
        let c = self
            .bi
            .consts
            .get(name)
            .ok_or(crate::Error::ConstantNotFound)?;

        let reader = ValueReader::new(&self.bi, &*self.mem);
        let mut value = reader.new_value(name, 0, c.ty);

        let real = self.bi.ty(value.real_ty);
        value.value = match real.kind {
            TyKind::Uint => (c.value as u64).to_string(),
            TyKind::Bool => (c.value != 0).to_string(),
            TyKind::Float => f64::from_bits(c.value as u64).to_string(),
            _ => c.value.to_string(),
        };
        value.flags |= FLAG_CONSTANT;

        Ok(value)
    }

    /// Functions materialize as their symbolic name rooted at the entry
    /// address.
    fn get_function(&self, name: &str) -> crate::Result<Value> {
        let f = self
            .bi
            .functions
            .get(name)
            .ok_or(crate::Error::FunctionNotFound)?;

        let reader = ValueReader::new(&self.bi, &*self.mem);
        let mut value = reader.new_value(name, f.entry, self.bi.func_type());
        value.base = f.entry;
        value.value = f.name.clone();

        Ok(value)
    }
}

fn build_index(bi: &BinaryInfo) -> SymbolIndex {
    let mut index = SymbolIndex::new();
    for name in bi.vars.keys() {
        index.insert(name, SymbolKind::Variable);
    }
    for name in bi.consts.keys() {
        index.insert(name, SymbolKind::Constant);
    }
    for name in bi.functions.keys() {
        index.insert(name, SymbolKind::Function);
    }
    index
}

#[cfg(test)]
impl Prowler {
    pub(crate) fn for_tests(bi: BinaryInfo, mem: Box<dyn TargetMemory>) -> Self {
        let index = build_index(&bi);
        Self {
            pid: 0,
            mem,
            bi,
            index,
            write_lock: Mutex::new(AllocationLedger::new()),
            load_cfg: LoadConfig::default(),
        }
    }
}
