//! Thin local HTTP transport over the inspection engine.
//!
//! Requests carry a JSON envelope `{"expression": "<cmd> <args>", "pid": n}`;
//! responses are `{"status": int, "msg": string, "data": any}`. Three
//! endpoints map straight onto the engine (`GET /get`, `POST /set`,
//! `GET /list`) plus `GET /explore` as a liveness probe.

mod client;
mod error;
mod server;
mod wire;

pub use self::client::Client;
pub use self::error::{Error, Result};
pub use self::server::{router, serve};
pub use self::wire::{CmdKind, Expression, Response};
