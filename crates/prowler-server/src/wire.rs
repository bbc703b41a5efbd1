use serde::{Deserialize, Serialize};

/// The three verbs the transport ferries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdKind {
    Get,
    Set,
    List,
}

impl CmdKind {
    pub(crate) fn word(self) -> &'static str {
        match self {
            CmdKind::Get => "get",
            CmdKind::Set => "set",
            CmdKind::List => "list",
        }
    }

    pub(crate) fn method_and_path(self) -> (reqwest::Method, &'static str) {
        match self {
            CmdKind::Get => (reqwest::Method::GET, "/get"),
            CmdKind::Set => (reqwest::Method::POST, "/set"),
            CmdKind::List => (reqwest::Method::GET, "/list"),
        }
    }
}

/// Request envelope: a textual command plus the client's process ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Expression {
    #[serde(rename = "expression")]
    pub expr: String,
    pub pid: u64,
}

impl Expression {
    pub fn new(expr: impl Into<String>, pid: u64) -> Self {
        Self {
            expr: expr.into(),
            pid,
        }
    }

    /// Splits the expression into its command word and argument rest.
    pub fn resolve(&self) -> Option<(&str, &str)> {
        let expr = self.expr.trim();
        match expr.split_once(' ') {
            Some((cmd, rest)) => Some((cmd, rest.trim())),
            None if expr.is_empty() => None,
            None => Some((expr, "")),
        }
    }
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub msg: String,
    pub data: serde_json::Value,
}

impl Response {
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            status: 200,
            msg: String::new(),
            data,
        }
    }

    pub fn failure(status: u16, msg: impl Into<String>) -> Self {
        Self {
            status,
            msg: msg.into(),
            data: serde_json::Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trip() {
        let expr = Expression::new("get pkg.N", 42);
        let json = serde_json::to_string(&expr).unwrap();
        assert_eq!(json, r#"{"expression":"get pkg.N","pid":42}"#);

        let back: Expression = serde_json::from_str(&json).unwrap();
        assert_eq!(back.expr, "get pkg.N");
        assert_eq!(back.pid, 42);
    }

    #[test]
    fn resolve_splits_command_and_rest() {
        let expr = Expression::new("set pkg.Conf {\"Port\": 81}", 1);
        let (cmd, rest) = expr.resolve().unwrap();
        assert_eq!(cmd, "set");
        assert_eq!(rest, "pkg.Conf {\"Port\": 81}");
    }

    #[test]
    fn resolve_handles_bare_and_empty_commands() {
        assert_eq!(Expression::new("get", 1).resolve(), Some(("get", "")));
        assert_eq!(Expression::new("", 1).resolve(), None);
        assert_eq!(Expression::new("   ", 1).resolve(), None);
    }

    #[test]
    fn response_serialization() {
        let ok = Response::success(serde_json::json!("pkg.N: 42"));
        let json = serde_json::to_string(&ok).unwrap();
        assert_eq!(json, r#"{"status":200,"msg":"","data":"pkg.N: 42"}"#);

        let err = Response::failure(500, "variable not found");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(
            json,
            r#"{"status":500,"msg":"variable not found","data":null}"#
        );
    }
}
