//! Crate implementing the CLI commands.

mod cli;
mod exec;
mod term;

pub use self::cli::{CliAction, CliOpts};
pub use self::exec::{
    evaluate_attach, evaluate_conn, evaluate_get, evaluate_ls, evaluate_set,
};
