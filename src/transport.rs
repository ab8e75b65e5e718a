use crate::config::Config;
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// The fixed set of node resources polled every cycle, in collection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Sensor,
    DisconnectedTotal,
    ConnectedTotal,
    Neighbor,
    Status,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Sensor,
        Resource::DisconnectedTotal,
        Resource::ConnectedTotal,
        Resource::Neighbor,
        Resource::Status,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Resource::Sensor => "sensor/si7021",
            Resource::DisconnectedTotal => "statistics/app/disconnected_total",
            Resource::ConnectedTotal => "statistics/app/connected_total",
            Resource::Neighbor => "status/neighbor",
            Resource::Status => "status/all",
        }
    }

    /// Request payload; the neighbor query selects entry `0`.
    pub fn payload(self) -> Option<&'static str> {
        match self {
            Resource::Neighbor => Some("0"),
            _ => None,
        }
    }
}

/// Fetches the raw text of one node resource.
///
/// Implementations never fail: any transport problem is logged and reported
/// as an empty response.
pub trait CoapTransport {
    fn fetch(&self, resource: Resource) -> impl Future<Output = String> + Send;
}

/// Shells out to a CoAP command-line client (`aiocoap-client` by default).
#[derive(Debug, Clone)]
pub struct CommandTransport {
    client: String,
    base_uri: String,
    timeout: Option<Duration>,
}

impl CommandTransport {
    pub fn new(client: impl Into<String>, base_uri: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            client: client.into(),
            base_uri: base_uri.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.coap_client.clone(),
            config.coap_base_uri(),
            config.fetch_timeout,
        )
    }

    pub fn resource_uri(&self, resource: Resource) -> String {
        format!("{}/{}", self.base_uri.trim_end_matches('/'), resource.path())
    }

    fn command(&self, uri: &str, resource: Resource) -> Command {
        let mut cmd = Command::new(&self.client);
        cmd.arg(uri);
        if let Some(payload) = resource.payload() {
            cmd.args(["--payload", payload]);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl CoapTransport for CommandTransport {
    async fn fetch(&self, resource: Resource) -> String {
        let uri = self.resource_uri(resource);
        let mut cmd = self.command(&uri, resource);

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(uri = %uri, timeout_secs = limit.as_secs_f64(), "CoAP request timed out");
                    return String::new();
                }
            },
            None => cmd.output().await,
        };

        let output = match output {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(uri = %uri, client = %self.client, error = %err, "failed to run CoAP client");
                return String::new();
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(uri = %uri, status = %output.status, stderr = %stderr.trim(), "CoAP command failed");
            return String::new();
        }

        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}
