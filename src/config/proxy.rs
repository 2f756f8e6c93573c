// ABOUTME: Reverse proxy settings for route registration.
// ABOUTME: Admin API location, public domain, and the port slots listen on.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProxyConfig {
    /// Base URL of the Caddy admin API.
    #[serde(default = "default_url")]
    pub url: String,

    /// Slots are served at `{deployment_id}.{domain}`.
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Port the slot's workload listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bound on each admin API call.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            domain: default_domain(),
            port: default_port(),
            timeout: default_timeout(),
        }
    }
}

pub(crate) fn default_url() -> String {
    "http://caddy:2019".to_string()
}

pub(crate) fn default_domain() -> String {
    "gitops.bitswan.space".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}
