use std::time::Duration;

use crate::wire::{CmdKind, Expression, Response};

/// Client half of the transport, used by the interactive prompt.
pub struct Client {
    url: String,
    http: reqwest::Client,
}

impl Client {
    /// Connects to a server, verifying with the liveness probe that the
    /// peer actually is an instance of this tool.
    pub async fn connect(addr: &str) -> crate::Result<Self> {
        let client = Self {
            url: format!("http://{addr}"),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?,
        };

        if !client.is_prowler_server().await {
            return Err(crate::Error::NotProwlerServer(addr.to_owned()));
        }

        Ok(client)
    }

    /// Whether the peer answers the liveness probe.
    pub async fn is_prowler_server(&self) -> bool {
        let response = self
            .http
            .get(format!("{}/explore", self.url))
            .send()
            .await;

        matches!(response, Ok(r) if r.status() == reqwest::StatusCode::OK)
    }

    /// Sends one command and returns the rendered response text.
    pub async fn send_expr(&self, kind: CmdKind, args: &str) -> crate::Result<String> {
        let args = args.trim();
        if args.is_empty() {
            return Err(crate::Error::EmptyArguments);
        }

        let expr = Expression::new(format!("{} {}", kind.word(), args), std::process::id() as u64);
        let (method, path) = kind.method_and_path();

        let response = self
            .http
            .request(method, format!("{}{}", self.url, path))
            .json(&expr)
            .send()
            .await?;

        let envelope: Response = response.json().await?;
        if envelope.status != 200 {
            return Err(crate::Error::Remote {
                status: envelope.status,
                msg: envelope.msg,
            });
        }

        Ok(render_data(&envelope.data))
    }
}

fn render_data(data: &serde_json::Value) -> String {
    match data {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_data_renders_one_name_per_line() {
        let data = serde_json::json!(["pkg.Alpha", "pkg.Alphabet"]);
        assert_eq!(render_data(&data), "pkg.Alpha\npkg.Alphabet");
    }

    #[test]
    fn string_data_passes_through() {
        let data = serde_json::json!("pkg.N: 42");
        assert_eq!(render_data(&data), "pkg.N: 42");
    }
}
