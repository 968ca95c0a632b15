//! Egress Identity Probe
//!
//! Asks the provider's identity endpoint what the outside world sees:
//! public IP, location, and whether the address is a provider exit.
//! Every check is a fresh request; nothing is cached.

use crate::config::ProbeConfig;
use rand::seq::SliceRandom;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Probe errors
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("HTTP client setup failed: {0}")]
    Client(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Invalid identity document: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One blacklist lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlacklistResult {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub blacklisted: bool,
}

/// Blacklist summary for the observed IP
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blacklist {
    #[serde(default)]
    pub blacklisted: bool,
    #[serde(default)]
    pub results: Vec<BlacklistResult>,
}

/// Decoded identity document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySnapshot {
    pub ip: String,
    pub country: String,
    pub city: Option<String>,
    pub longitude: f64,
    pub latitude: f64,
    /// Is the observed IP a provider exit?
    pub mullvad_exit_ip: bool,
    pub mullvad_exit_ip_hostname: Option<String>,
    pub mullvad_server_type: Option<String>,
    pub blacklisted: Blacklist,
    pub organization: String,
}

impl IdentitySnapshot {
    /// Decode an identity document
    pub fn from_json(body: &str) -> Result<Self, ProbeError> {
        Ok(serde_json::from_str(body)?)
    }

    /// One-line summary for display
    pub fn summary(&self) -> String {
        let exit = match (&self.mullvad_exit_ip_hostname, self.mullvad_exit_ip) {
            (Some(host), true) => format!("exit {}", host),
            (None, true) => "exit".to_string(),
            (_, false) => "not an exit".to_string(),
        };
        format!(
            "{} | {}{} | {} | {}",
            self.ip,
            self.city.as_deref().map(|c| format!("{}, ", c)).unwrap_or_default(),
            self.country,
            self.organization,
            exit
        )
    }
}

/// Source of egress identity
pub trait IdentityProbe {
    /// Fetch a fresh identity snapshot
    fn check_status(&self) -> Result<IdentitySnapshot, ProbeError>;

    /// Is traffic leaving through a provider exit?
    ///
    /// Any probe error counts as "not connected".
    fn is_connected(&self) -> bool {
        match self.check_status() {
            Ok(snapshot) => snapshot.mullvad_exit_ip,
            Err(e) => {
                warn!("Identity check failed: {}", e);
                false
            }
        }
    }
}

/// HTTP implementation of [`IdentityProbe`]
pub struct HttpProber {
    client: Client,
    url: String,
    user_agents: Vec<String>,
}

impl HttpProber {
    /// Build a prober from configuration
    pub fn new(config: &ProbeConfig) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            user_agents: config.user_agents.clone(),
        })
    }

    /// Endpoint being probed
    pub fn url(&self) -> &str {
        &self.url
    }

    fn user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or("mullctrl")
    }
}

impl IdentityProbe for HttpProber {
    fn check_status(&self) -> Result<IdentitySnapshot, ProbeError> {
        let user_agent = self.user_agent();
        debug!("GET {} (UA: {})", self.url, user_agent);

        let response = self
            .client
            .get(&self.url)
            .header(USER_AGENT, user_agent)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let body = response.text()?;
        IdentitySnapshot::from_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONNECTED: &str = r#"{
        "ip": "185.65.134.77",
        "country": "Sweden",
        "city": "Gothenburg",
        "longitude": 11.9746,
        "latitude": 57.7089,
        "mullvad_exit_ip": true,
        "mullvad_exit_ip_hostname": "se-got-wg-001",
        "mullvad_server_type": "WireGuard",
        "blacklisted": {
            "blacklisted": false,
            "results": [
                {"name": "Spamhaus", "link": "https://www.spamhaus.org/", "blacklisted": false}
            ]
        },
        "organization": "31173 Services AB"
    }"#;

    #[test]
    fn test_decode_connected() {
        let snapshot = IdentitySnapshot::from_json(CONNECTED).unwrap();

        assert_eq!(snapshot.ip, "185.65.134.77");
        assert!(snapshot.mullvad_exit_ip);
        assert_eq!(snapshot.mullvad_exit_ip_hostname.as_deref(), Some("se-got-wg-001"));
        assert_eq!(snapshot.blacklisted.results.len(), 1);
        assert_eq!(snapshot.blacklisted.results[0].name, "Spamhaus");
        assert!(snapshot.summary().contains("exit se-got-wg-001"));
    }

    #[test]
    fn test_decode_plain_connection() {
        let body = r#"{"ip":"203.0.113.9","country":"Spain","mullvad_exit_ip":false,
            "blacklisted":{"blacklisted":false,"results":[]},"organization":"ISP"}"#;
        let snapshot = IdentitySnapshot::from_json(body).unwrap();

        assert!(!snapshot.mullvad_exit_ip);
        assert!(snapshot.city.is_none());
        assert!(snapshot.summary().ends_with("not an exit"));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            IdentitySnapshot::from_json("<html>"),
            Err(ProbeError::Decode(_))
        ));
    }

    struct FailingProbe;

    impl IdentityProbe for FailingProbe {
        fn check_status(&self) -> Result<IdentitySnapshot, ProbeError> {
            Err(ProbeError::Status(503))
        }
    }

    #[test]
    fn test_is_connected_swallows_errors() {
        assert!(!FailingProbe.is_connected());
    }

    #[test]
    fn test_transport_failure_is_not_connected() {
        let config = ProbeConfig {
            url: "http://127.0.0.1:9/json".to_string(),
            timeout_secs: 2,
            connect_timeout_secs: 1,
            ..ProbeConfig::default()
        };
        let prober = HttpProber::new(&config).unwrap();

        assert!(prober.check_status().is_err());
        assert!(!prober.is_connected());
    }

    #[test]
    fn test_user_agent_from_pool() {
        let prober = HttpProber::new(&ProbeConfig::default()).unwrap();
        let ua = prober.user_agent();
        assert!(ProbeConfig::default().user_agents.iter().any(|u| u == ua));
    }
}
