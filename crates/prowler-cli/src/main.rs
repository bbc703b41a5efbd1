#![allow(missing_docs)]
#![allow(clippy::print_stderr)]

use prowler_cli::{CliAction, CliOpts};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = CliOpts::parse_from_cmdline();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_env_var("PROWLER_LOG")
                .from_env_lossy(),
        )
        .init();

    let res = match cli.action {
        CliAction::Get { pid, name } => prowler_cli::evaluate_get(pid, &name).await,
        CliAction::Set { pid, name, value } => {
            prowler_cli::evaluate_set(pid, &name, &value).await
        }
        CliAction::Ls {
            pid,
            kind,
            prefixes,
            suffixes,
        } => prowler_cli::evaluate_ls(pid, kind, &prefixes, &suffixes).await,
        CliAction::Attach { pid } => prowler_cli::evaluate_attach(pid).await,
        CliAction::Conn { addr } => prowler_cli::evaluate_conn(&addr).await,
    };

    if let Err(e) = res {
        eprintln!("{e:?}");
        std::process::exit(1);
    }
}
