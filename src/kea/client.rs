use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::config::{Config, RunMode};
use crate::error::{ProvisionError, Result};
use crate::models::{CommandEnvelope, CommandResult};

use super::commands::{self, is_read_only};

/// Transport carries one command envelope to the control agent and returns its results
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, envelope: &CommandEnvelope) -> Result<Vec<CommandResult>>;
}

/// The control agent answers with an array, but rejects some requests with a bare object
#[derive(Deserialize)]
#[serde(untagged)]
enum ResponseBody {
    Many(Vec<CommandResult>),
    One(CommandResult),
}

/// HTTP transport to the Kea control agent, authenticated with Basic credentials
pub struct HttpTransport {
    url: String,
    user: String,
    pass: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ProvisionError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: config.api_url.clone(),
            user: config.api_user.clone(),
            pass: config.api_pass.clone(),
            client,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, envelope: &CommandEnvelope) -> Result<Vec<CommandResult>> {
        let resp = self
            .client
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.pass))
            .json(envelope)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProvisionError::Transport(format!(
                "Kea API error {} on {}: {}",
                status, envelope.command, body
            )));
        }

        let body = resp.text().await?;
        let parsed: ResponseBody = serde_json::from_str(&body).map_err(|e| {
            ProvisionError::Transport(format!(
                "malformed response to {}: {}",
                envelope.command, e
            ))
        })?;

        Ok(match parsed {
            ResponseBody::Many(results) => results,
            ResponseBody::One(result) => vec![result],
        })
    }
}

/// Kea control channel client. In dry-run mode mutating commands never reach the transport.
pub struct KeaClient {
    transport: Box<dyn Transport>,
    mode: RunMode,
}

impl KeaClient {
    pub fn new(transport: Box<dyn Transport>, mode: RunMode) -> Self {
        Self { transport, mode }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Send a command and return every result record
    pub async fn invoke(&self, envelope: &CommandEnvelope) -> Result<Vec<CommandResult>> {
        if self.mode == RunMode::DryRun && !is_read_only(&envelope.command) {
            tracing::debug!("dry-run: not sending {}\n{}", envelope.command, pretty(envelope));
            return Ok(vec![CommandResult::success("simulated")]);
        }

        tracing::debug!("-> {}\n{}", envelope.command, pretty(envelope));
        let results = self.transport.send(envelope).await?;
        tracing::debug!("<- {}\n{}", envelope.command, pretty(&results));
        Ok(results)
    }

    /// Send a command and require its first result to be a success
    pub async fn execute(&self, envelope: &CommandEnvelope) -> Result<CommandResult> {
        let first = self
            .invoke(envelope)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ProvisionError::Transport(format!("empty response to {}", envelope.command))
            })?;

        if !first.is_success() {
            return Err(ProvisionError::Command {
                command: envelope.command.clone(),
                result: first.result,
                text: first.text,
            });
        }
        Ok(first)
    }

    /// Commands the server supports
    pub async fn list_commands(&self) -> Result<Vec<String>> {
        let result = self.execute(&commands::list_commands()).await?;
        Ok(result
            .arguments
            .as_ref()
            .and_then(|a| a.as_array())
            .map(|cmds| {
                cmds.iter()
                    .filter_map(|c| c.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn pretty<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kea::testing::FakeKea;
    use serde_json::json;
    use wiremock::matchers::{basic_auth, body_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(url: &str) -> Config {
        Config {
            api_url: url.to_string(),
            api_user: "kea-api".to_string(),
            api_pass: "secret".to_string(),
            debug: false,
            mode: RunMode::Apply,
            timeout_secs: 5,
            connect_timeout_secs: 1,
            rollback: true,
            lifetime_secs: 300,
            stencil_dir: None,
        }
    }

    #[tokio::test]
    async fn test_http_transport_posts_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(basic_auth("kea-api", "secret"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"command": "subnet4-list", "service": ["dhcp4"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"result": 0, "text": "1 IPv4 subnet(s) found",
                 "arguments": {"subnets": [{"id": 1, "subnet": "10.0.0.0/24"}]}}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&config_for(&server.uri())).unwrap();
        let results = transport.send(&commands::subnet4_list()).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_success());
        assert_eq!(results[0].argument("subnets").unwrap()[0]["id"], 1);
    }

    #[tokio::test]
    async fn test_http_transport_non_2xx_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&config_for(&server.uri())).unwrap();
        let err = transport.send(&commands::config_write()).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Transport(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_http_transport_accepts_bare_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": 1, "text": "unsupported service"})),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&config_for(&server.uri())).unwrap();
        let results = transport.send(&commands::list_commands()).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "unsupported service");
    }

    #[tokio::test]
    async fn test_http_transport_unreachable() {
        // nothing listens on the discard port
        let transport = HttpTransport::new(&config_for("http://127.0.0.1:9")).unwrap();
        let err = transport.send(&commands::subnet4_list()).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Transport(_)));
    }

    #[tokio::test]
    async fn test_dry_run_suppresses_mutations() {
        let kea = FakeKea::new();
        let client = KeaClient::new(Box::new(kea.clone()), RunMode::DryRun);

        let result = client.execute(&commands::config_write()).await.unwrap();
        assert_eq!(result.text, "simulated");
        client.execute(&commands::subnet4_del(1)).await.unwrap();
        client.invoke(&commands::subnet4_list()).await.unwrap();

        assert_eq!(kea.sent_commands(), vec!["subnet4-list"]);
    }

    #[tokio::test]
    async fn test_apply_transmits_everything() {
        let kea = FakeKea::new();
        let client = KeaClient::new(Box::new(kea.clone()), RunMode::Apply);

        client.execute(&commands::config_write()).await.unwrap();
        client.invoke(&commands::subnet4_list()).await.unwrap();

        assert_eq!(kea.sent_commands(), vec!["config-write", "subnet4-list"]);
    }

    #[tokio::test]
    async fn test_execute_surfaces_logical_failure() {
        let kea = FakeKea::new();
        let client = KeaClient::new(Box::new(kea), RunMode::Apply);

        let err = client
            .execute(&crate::models::CommandEnvelope::new("no-such-command"))
            .await
            .unwrap_err();
        match err {
            ProvisionError::Command { command, result, .. } => {
                assert_eq!(command, "no-such-command");
                assert_ne!(result, 0);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_list_commands() {
        let client = KeaClient::new(Box::new(FakeKea::new()), RunMode::DryRun);
        let cmds = client.list_commands().await.unwrap();
        assert!(cmds.contains(&"subnet4-add".to_string()));
    }
}
