// ABOUTME: Route reconciler for the Caddy reverse proxy.
// ABOUTME: Adds a host route per deployment slot through the admin API, idempotently.

mod client;
mod error;

pub use client::{AdminEndpoint, AdminResponse};
pub use error::RouteError;

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::ProxyConfig;
use crate::types::DeploymentId;

const UPSTREAMS_PATH: &str = "/reverse_proxy/upstreams";
/// `...` appends to the route array rather than replacing it.
const ROUTES_PATH: &str = "/config/apps/http/servers/srv0/routes/...";

/// One upstream as reported by the proxy.
#[derive(Debug, Clone, Deserialize)]
pub struct Upstream {
    pub address: String,
}

impl Upstream {
    /// Host part of the dial address.
    pub fn host(&self) -> &str {
        self.address
            .split_once(':')
            .map_or(self.address.as_str(), |(host, _)| host)
    }
}

/// What `ensure_route` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// An upstream for the slot already existed; nothing was changed.
    AlreadyPresent,
    Added,
}

/// Route JSON sending `{id}.{domain}` to `{id}:{port}`.
pub fn route_body(id: &DeploymentId, domain: &str, port: u16) -> serde_json::Value {
    json!([{
        "match": [{ "host": [format!("{id}.{domain}")] }],
        "handle": [{
            "handler": "subroute",
            "routes": [{
                "handle": [{
                    "handler": "reverse_proxy",
                    "upstreams": [{ "dial": format!("{id}:{port}") }]
                }]
            }]
        }],
        "terminal": true
    }])
}

/// Client for the Caddy admin API.
#[derive(Debug, Clone)]
pub struct CaddyClient {
    endpoint: AdminEndpoint,
    domain: String,
    port: u16,
}

impl CaddyClient {
    pub fn new(
        url: &str,
        domain: impl Into<String>,
        port: u16,
        timeout: Duration,
    ) -> Result<Self, RouteError> {
        Ok(Self {
            endpoint: AdminEndpoint::parse(url, timeout)?,
            domain: domain.into(),
            port,
        })
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, RouteError> {
        Self::new(&config.url, config.domain.clone(), config.port, config.timeout)
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn default_port(&self) -> u16 {
        self.port
    }

    /// Upstreams currently known to the proxy.
    pub async fn upstreams(&self) -> Result<Vec<Upstream>, RouteError> {
        let resp = self.endpoint.get(UPSTREAMS_PATH).await?;
        if !resp.is_success() {
            return Err(status_error("GET", UPSTREAMS_PATH, &resp));
        }
        Ok(serde_json::from_slice::<Option<Vec<Upstream>>>(&resp.body)?.unwrap_or_default())
    }

    /// Append a route for `id`.
    pub async fn add_route(&self, id: &DeploymentId, port: u16) -> Result<(), RouteError> {
        let body = serde_json::to_vec(&route_body(id, &self.domain, port))?;
        let resp = self.endpoint.post_json(ROUTES_PATH, body).await?;
        if !resp.is_success() {
            return Err(status_error("POST", ROUTES_PATH, &resp));
        }
        Ok(())
    }

    /// Make sure the proxy forwards `{id}.{domain}` to the slot.
    ///
    /// A slot that already has an upstream is left as is, whatever port it uses.
    /// Routes are never removed.
    pub async fn ensure_route(
        &self,
        id: &DeploymentId,
        port: Option<u16>,
    ) -> Result<RouteOutcome, RouteError> {
        let upstreams = self.upstreams().await?;
        if upstreams.iter().any(|u| u.host() == id.as_str()) {
            tracing::debug!("proxy already routes {}", id);
            return Ok(RouteOutcome::AlreadyPresent);
        }

        let port = port.unwrap_or(self.port);
        self.add_route(id, port).await?;
        tracing::info!("added route {}.{} -> {}:{}", id, self.domain, id, port);
        Ok(RouteOutcome::Added)
    }
}

fn status_error(method: &'static str, path: &str, resp: &AdminResponse) -> RouteError {
    RouteError::Status {
        method,
        path: path.to_string(),
        status: resp.status,
        body: resp.body_text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_body_matches_host_and_dials_slot() {
        let id = DeploymentId::new("svc1").unwrap();
        let body = route_body(&id, "gitops.example.com", 8080);

        assert_eq!(body[0]["match"][0]["host"][0], "svc1.gitops.example.com");
        assert_eq!(body[0]["handle"][0]["handler"], "subroute");
        let proxy = &body[0]["handle"][0]["routes"][0]["handle"][0];
        assert_eq!(proxy["handler"], "reverse_proxy");
        assert_eq!(proxy["upstreams"][0]["dial"], "svc1:8080");
        assert_eq!(body[0]["terminal"], true);
    }

    #[test]
    fn upstream_host_strips_port() {
        let upstream = Upstream {
            address: "svc1:8080".to_string(),
        };
        assert_eq!(upstream.host(), "svc1");

        let bare = Upstream {
            address: "svc2".to_string(),
        };
        assert_eq!(bare.host(), "svc2");
    }
}
