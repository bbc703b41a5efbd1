use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;

use prowler_engine::value::pretty;
use prowler_engine::Prowler;

use crate::wire::{Expression, Response};

/// Routes serving the three verbs plus the liveness probe.
pub fn router(engine: Arc<Prowler>) -> Router {
    Router::new()
        .route("/explore", get(handle_explore))
        .route("/get", get(handle_get))
        .route("/set", post(handle_set))
        .route("/list", get(handle_list))
        .with_state(engine)
}

/// Serves the router until the listener closes.
pub async fn serve(
    listener: tokio::net::TcpListener,
    engine: Arc<Prowler>,
) -> std::io::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "serving");
    axum::serve(listener, router(engine)).await
}

/// Liveness probe: 200 iff this server is an instance of this tool.
async fn handle_explore() -> StatusCode {
    StatusCode::OK
}

async fn handle_get(
    State(engine): State<Arc<Prowler>>,
    Json(expr): Json<Expression>,
) -> (StatusCode, Json<Response>) {
    let name = match single_argument(&expr, "get") {
        Ok(name) => name,
        Err(msg) => return bad_request(msg),
    };

    match engine.get(&name) {
        Ok(value) => success(serde_json::json!(pretty::render(&value))),
        Err(e) => internal_error(e),
    }
}

async fn handle_set(
    State(engine): State<Arc<Prowler>>,
    Json(expr): Json<Expression>,
) -> (StatusCode, Json<Response>) {
    let rest = match command_rest(&expr, "set") {
        Ok(rest) => rest,
        Err(msg) => return bad_request(msg),
    };
    let Some((name, value)) = rest.split_once(' ') else {
        return bad_request("empty arguments");
    };

    match engine.set(name.trim(), value.trim()) {
        Ok(after) => success(serde_json::json!(pretty::render(&after))),
        Err(e) => internal_error(e),
    }
}

async fn handle_list(
    State(engine): State<Arc<Prowler>>,
    Json(expr): Json<Expression>,
) -> (StatusCode, Json<Response>) {
    let pattern = match single_argument(&expr, "list") {
        Ok(pattern) => pattern,
        Err(msg) => return bad_request(msg),
    };

    let names = engine.fuzzy(&pattern);
    success(serde_json::json!(names))
}

fn command_rest(expr: &Expression, want: &str) -> Result<String, &'static str> {
    let Some((cmd, rest)) = expr.resolve() else {
        return Err("invalid command");
    };
    if cmd.to_lowercase() != want {
        return Err("invalid command");
    }
    if rest.is_empty() {
        return Err("empty arguments");
    }
    Ok(rest.to_owned())
}

fn single_argument(expr: &Expression, want: &str) -> Result<String, &'static str> {
    let rest = command_rest(expr, want)?;
    rest.split_whitespace()
        .next()
        .map(str::to_owned)
        .ok_or("empty arguments")
}

fn success(data: serde_json::Value) -> (StatusCode, Json<Response>) {
    (StatusCode::OK, Json(Response::success(data)))
}

fn bad_request(msg: &str) -> (StatusCode, Json<Response>) {
    (StatusCode::BAD_REQUEST, Json(Response::failure(400, msg)))
}

fn internal_error(e: prowler_engine::Error) -> (StatusCode, Json<Response>) {
    tracing::debug!(error = %e, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(Response::failure(500, e.to_string())),
    )
}
