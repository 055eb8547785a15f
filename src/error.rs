use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("upstream rejected request with code {code}")]
    UpstreamRejected { code: serde_json::Value },

    #[error("leads collection is empty")]
    EmptyLeads,

    #[error("lead record is missing `{0}`")]
    MissingField(&'static str),

    #[error("unparseable timestamp: {0:?}")]
    InvalidTimestamp(String),

    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),
}

impl GatewayError {
    /// True for failures caused by the upstream API rather than by this gateway.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Http(_) | Self::UpstreamRejected { .. })
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
