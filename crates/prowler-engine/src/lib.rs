//! Core inspection engine for live processes with full debug information.
//!
//! The engine attaches to a target by process ID, parses the target
//! binary's debug information into a symbol/type index, reads the current
//! values of package-level variables out of the target's address space,
//! and — on demand — type-checks textual literals and writes them back
//! into the target's memory.
//!
//! Target plumbing (memory I/O, `/proc` parsing, executable discovery) is
//! abstracted behind the [target::TargetMemory] and [target::TargetLocator]
//! traits; `prowler-target` provides the Linux implementations and an
//! `attach` helper wiring them into a [Prowler].

mod alloc;
/// Debug-information model: images, dictionaries, type graph.
pub mod binary;
mod engine;
mod error;
/// Symbol index over discovered names.
pub mod index;
/// Capability traits the engine consumes.
pub mod target;
/// Value trees: reader, writer, pretty-printer.
pub mod value;

#[cfg(test)]
pub(crate) mod testutil;

pub use self::alloc::AllocationLedger;
pub use self::engine::{ListKind, Prowler};
pub use self::error::{Error, Result};
