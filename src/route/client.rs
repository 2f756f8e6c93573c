// ABOUTME: Minimal HTTP/1.1 client for the Caddy admin API.
// ABOUTME: One connection per request over TCP, bounded by a timeout.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::Uri;
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::net::TcpStream;

use super::RouteError;

/// Response status and body.
#[derive(Debug)]
pub struct AdminResponse {
    pub status: u16,
    pub body: Bytes,
}

impl AdminResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).trim().to_string()
    }
}

/// Location of an admin API, parsed once.
#[derive(Debug, Clone)]
pub struct AdminEndpoint {
    host: String,
    port: u16,
    base_path: String,
    timeout: Duration,
}

impl AdminEndpoint {
    pub fn parse(url: &str, timeout: Duration) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let uri: Uri = url.parse().map_err(|_| invalid("not a URI"))?;
        match uri.scheme_str() {
            Some("http") => {}
            Some(_) => return Err(invalid("only http:// is supported")),
            None => return Err(invalid("missing scheme")),
        }
        let host = uri.host().ok_or_else(|| invalid("missing host"))?;

        Ok(Self {
            host: host.to_string(),
            port: uri.port_u16().unwrap_or(80),
            base_path: uri.path().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// `host:port` for the `Host` header and the TCP connection.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn path(&self, suffix: &str) -> String {
        format!("{}{}", self.base_path, suffix)
    }

    pub async fn get(&self, suffix: &str) -> Result<AdminResponse, RouteError> {
        self.send("GET", suffix, None).await
    }

    pub async fn post_json(&self, suffix: &str, body: Vec<u8>) -> Result<AdminResponse, RouteError> {
        self.send("POST", suffix, Some(body)).await
    }

    async fn send(
        &self,
        method: &'static str,
        suffix: &str,
        body: Option<Vec<u8>>,
    ) -> Result<AdminResponse, RouteError> {
        tokio::time::timeout(self.timeout, self.exchange(method, suffix, body))
            .await
            .map_err(|_| RouteError::Timeout(self.timeout))?
    }

    async fn exchange(
        &self,
        method: &'static str,
        suffix: &str,
        body: Option<Vec<u8>>,
    ) -> Result<AdminResponse, RouteError> {
        let authority = self.authority();
        let stream = TcpStream::connect(&authority)
            .await
            .map_err(|source| RouteError::Connect {
                address: authority.clone(),
                source,
            })?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;

        // Spawn connection handler
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!("proxy admin connection error: {}", e);
            }
        });

        let path = self.path(suffix);
        let mut builder = hyper::Request::builder()
            .method(method)
            .uri(&path)
            .header("Host", &authority);
        if body.is_some() {
            builder = builder.header("Content-Type", "application/json");
        }
        let req = builder
            .body(Full::new(Bytes::from(body.unwrap_or_default())))
            .map_err(|e| RouteError::Request(e.to_string()))?;

        tracing::debug!("{} http://{}{}", method, authority, path);
        let resp = sender.send_request(req).await?;
        let status = resp.status().as_u16();
        let body = resp.into_body().collect().await?.to_bytes();

        Ok(AdminResponse { status, body })
    }
}
