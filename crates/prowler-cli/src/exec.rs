use std::sync::Arc;

use miette::{bail, IntoDiagnostic};

use prowler_engine::value::pretty;
use prowler_engine::ListKind;
use prowler_server::Client;

use crate::term;

pub async fn evaluate_get(pid: u64, name: &str) -> miette::Result<()> {
    check_target(pid, Some(name))?;

    let engine = prowler_target::attach(pid).into_diagnostic()?;
    let value = engine.get(name).into_diagnostic()?;
    println!("{}", pretty::render(&value));
    Ok(())
}

pub async fn evaluate_set(pid: u64, name: &str, value: &str) -> miette::Result<()> {
    check_target(pid, Some(name))?;

    let engine = prowler_target::attach(pid).into_diagnostic()?;
    let after = engine.set(name, value).into_diagnostic()?;
    println!("{}", pretty::render(&after));
    Ok(())
}

pub async fn evaluate_ls(
    pid: u64,
    kind: u8,
    prefixes: &[String],
    suffixes: &[String],
) -> miette::Result<()> {
    check_target(pid, None)?;

    let engine = prowler_target::attach(pid).into_diagnostic()?;
    for name in engine.list(ListKind::from(kind), prefixes, suffixes) {
        println!("{name}");
    }
    Ok(())
}

/// Attaches, serves the transport on an ephemeral local port, then drops
/// into a prompt connected to that server.
pub async fn evaluate_attach(pid: u64) -> miette::Result<()> {
    check_target(pid, None)?;

    let engine = Arc::new(prowler_target::attach(pid).into_diagnostic()?);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .into_diagnostic()?;
    let addr = listener.local_addr().into_diagnostic()?;

    tokio::spawn(async move {
        if let Err(e) = prowler_server::serve(listener, engine).await {
            tracing::error!(error = %e, "server stopped");
        }
    });

    let client = Client::connect(&addr.to_string()).await.into_diagnostic()?;
    term::run(client).await
}

pub async fn evaluate_conn(addr: &str) -> miette::Result<()> {
    let client = Client::connect(addr).await.into_diagnostic()?;
    term::run(client).await
}

fn check_target(pid: u64, name: Option<&str>) -> miette::Result<()> {
    if !prowler_target::pid_exists(pid) {
        bail!("pid {pid} does not exist");
    }

    if let Some(name) = name {
        if !name.contains('.') {
            bail!("variable name must contain '.'");
        }
    }

    Ok(())
}
