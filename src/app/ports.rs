use async_trait::async_trait;
use std::fmt;

/// Why a URL could not be fetched. Kept separate from "fetched but no
/// timestamp" so retry decisions can be made per failure kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    InvalidUrl(String),
    Timeout,
    Connect(String),
    Status(u16),
    Other(String),
}

impl FetchFailure {
    /// Failures that may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        match self {
            FetchFailure::Timeout | FetchFailure::Connect(_) => true,
            FetchFailure::Status(code) => *code == 429 || *code >= 500,
            FetchFailure::InvalidUrl(_) | FetchFailure::Other(_) => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FetchFailure::InvalidUrl(_) => "invalid_url",
            FetchFailure::Timeout => "timeout",
            FetchFailure::Connect(_) => "connect",
            FetchFailure::Status(_) => "status",
            FetchFailure::Other(_) => "other",
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::InvalidUrl(msg) => write!(f, "invalid URL: {}", msg),
            FetchFailure::Timeout => write!(f, "request timed out"),
            FetchFailure::Connect(msg) => write!(f, "connection failed: {}", msg),
            FetchFailure::Status(code) => write!(f, "unexpected HTTP status {}", code),
            FetchFailure::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Fetch capability used by the resolver: GET a URL, follow redirects and
/// report where the request finally landed.
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn final_url(&self, url: &str) -> Result<String, FetchFailure>;
}
