use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const DEFAULT_NODE_ADDR: &str = "fd12:3456::92fd:9fff:feee:9d4b";
const DEFAULT_COAP_PORT: u64 = 5683;
const DEFAULT_COAP_CLIENT: &str = "aiocoap-client";
const DEFAULT_UPDATE_URL: &str = "https://api.thingspeak.com/update";
const DEFAULT_PUBLISH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub node_addr: String,
    pub coap_port: u16,
    pub coap_client: String,
    /// `None` keeps CoAP requests unbounded.
    pub fetch_timeout: Option<Duration>,

    pub api_key: String,
    pub update_url: Url,
    pub publish_timeout: Duration,

    pub poll_interval: Duration,
    pub csv_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let node_addr = env_string(&lookup, "WISUN_NODE_ADDR", Some(DEFAULT_NODE_ADDR.to_string()))?;
        if node_addr.trim_matches(|c| c == '[' || c == ']').is_empty() {
            return Err(anyhow!("WISUN_NODE_ADDR is empty"));
        }
        let coap_port = u16::try_from(env_u64(&lookup, "WISUN_COAP_PORT", Some(DEFAULT_COAP_PORT))?)
            .context("WISUN_COAP_PORT out of range")?;
        let coap_client =
            env_string(&lookup, "WISUN_COAP_CLIENT", Some(DEFAULT_COAP_CLIENT.to_string()))?;

        let fetch_timeout = match env_optional(&lookup, "WISUN_FETCH_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .context("invalid WISUN_FETCH_TIMEOUT_SECS")?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let api_key = env_optional(&lookup, "THINGSPEAK_API_KEY")
            .ok_or_else(|| anyhow!("missing env var THINGSPEAK_API_KEY"))?;
        let update_url = env_string(&lookup, "THINGSPEAK_UPDATE_URL", Some(DEFAULT_UPDATE_URL.to_string()))?;
        let update_url = Url::parse(&update_url).context("invalid THINGSPEAK_UPDATE_URL")?;
        let publish_timeout_secs = env_u64(
            &lookup,
            "THINGSPEAK_TIMEOUT_SECS",
            Some(DEFAULT_PUBLISH_TIMEOUT_SECS),
        )?;
        if publish_timeout_secs == 0 {
            return Err(anyhow!("THINGSPEAK_TIMEOUT_SECS must be at least 1"));
        }
        let publish_timeout = Duration::from_secs(publish_timeout_secs);

        let poll_interval = Duration::from_secs(env_u64(
            &lookup,
            "COLLECTOR_INTERVAL_SECS",
            Some(DEFAULT_INTERVAL_SECS),
        )?);
        let csv_path = env_optional(&lookup, "COLLECTOR_CSV_PATH").map(PathBuf::from);

        Ok(Self {
            node_addr,
            coap_port,
            coap_client,
            fetch_timeout,
            api_key,
            update_url,
            publish_timeout,
            poll_interval,
            csv_path,
        })
    }

    /// `coap://[addr]:port`, bracketing bare IPv6 literals.
    pub fn coap_base_uri(&self) -> String {
        let host = self
            .node_addr
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']');
        if host.contains(':') {
            format!("coap://[{host}]:{}", self.coap_port)
        } else {
            format!("coap://{host}:{}", self.coap_port)
        }
    }
}

fn env_string<F>(lookup: &F, key: &str, default: Option<String>) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => Ok(value.trim().to_string()),
        None => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

fn env_u64<F>(lookup: &F, key: &str, default: Option<u64>) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid {key}")),
        None => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

fn env_optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_reference_deployment() {
        let config = config_from(&[("THINGSPEAK_API_KEY", "KEY")]).unwrap();
        assert_eq!(config.coap_port, 5683);
        assert_eq!(config.coap_client, "aiocoap-client");
        assert_eq!(config.fetch_timeout, None);
        assert_eq!(config.publish_timeout, Duration::from_secs(10));
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.update_url.as_str(), "https://api.thingspeak.com/update");
        assert!(config.csv_path.is_none());
        assert_eq!(
            config.coap_base_uri(),
            "coap://[fd12:3456::92fd:9fff:feee:9d4b]:5683"
        );
    }

    #[test]
    fn api_key_is_required() {
        let err = config_from(&[]).unwrap_err();
        assert!(err.to_string().contains("THINGSPEAK_API_KEY"));
        assert!(config_from(&[("THINGSPEAK_API_KEY", "   ")]).is_err());
    }

    #[test]
    fn node_addr_accepts_brackets_and_ipv4() {
        let bracketed = config_from(&[
            ("THINGSPEAK_API_KEY", "KEY"),
            ("WISUN_NODE_ADDR", "[fd12::1]"),
            ("WISUN_COAP_PORT", "5684"),
        ])
        .unwrap();
        assert_eq!(bracketed.coap_base_uri(), "coap://[fd12::1]:5684");

        let v4 = config_from(&[
            ("THINGSPEAK_API_KEY", "KEY"),
            ("WISUN_NODE_ADDR", "192.168.1.20"),
        ])
        .unwrap();
        assert_eq!(v4.coap_base_uri(), "coap://192.168.1.20:5683");
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(config_from(&[("THINGSPEAK_API_KEY", "KEY"), ("WISUN_COAP_PORT", "70000")]).is_err());
        assert!(config_from(&[("THINGSPEAK_API_KEY", "KEY"), ("COLLECTOR_INTERVAL_SECS", "soon")]).is_err());
        assert!(config_from(&[("THINGSPEAK_API_KEY", "KEY"), ("THINGSPEAK_UPDATE_URL", "not a url")]).is_err());
        assert!(config_from(&[("THINGSPEAK_API_KEY", "KEY"), ("WISUN_NODE_ADDR", "[]")]).is_err());
    }

    #[test]
    fn zero_publish_timeout_is_rejected() {
        let err = config_from(&[("THINGSPEAK_API_KEY", "KEY"), ("THINGSPEAK_TIMEOUT_SECS", "0")])
            .unwrap_err();
        assert!(err.to_string().contains("THINGSPEAK_TIMEOUT_SECS"));

        let config = config_from(&[("THINGSPEAK_API_KEY", "KEY"), ("THINGSPEAK_TIMEOUT_SECS", "3")])
            .unwrap();
        assert_eq!(config.publish_timeout, Duration::from_secs(3));
    }

    #[test]
    fn optional_settings_are_parsed() {
        let config = config_from(&[
            ("THINGSPEAK_API_KEY", "KEY"),
            ("WISUN_FETCH_TIMEOUT_SECS", "15"),
            ("COLLECTOR_CSV_PATH", "/tmp/wisun.csv"),
            ("COLLECTOR_INTERVAL_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.fetch_timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.csv_path, Some(PathBuf::from("/tmp/wisun.csv")));
        assert_eq!(config.poll_interval, Duration::from_secs(5));
    }
}
