// ABOUTME: Error types for reverse proxy route registration.
// ABOUTME: Registration is best-effort; these errors are reported, never rolled back.

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("invalid proxy admin URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to connect to proxy at {address}: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },

    #[error("proxy request failed: {0}")]
    Http(#[from] hyper::Error),

    #[error("failed to build proxy request: {0}")]
    Request(String),

    #[error("proxy request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The admin API answered with a non-2xx status.
    #[error("{method} {path} returned {status}: {body}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        body: String,
    },

    #[error("unexpected proxy response: {0}")]
    Decode(#[from] serde_json::Error),
}
