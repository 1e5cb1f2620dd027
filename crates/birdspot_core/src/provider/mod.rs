//! Observation provider pipeline.
//!
//! # Responsibility
//! - Fetch raw observation records from the remote citizen-science API.
//! - Normalize them into ranked `Observation` lists.
//! - Substitute a deterministic mock set when the live fetch fails.
//!
//! # Invariants
//! - The live attempt always completes before the mock fallback is built.
//! - `ObservationProvider::fetch` never fails; errors stop at the adapter.

pub mod client;
pub mod mock;
pub mod normalize;
mod observation_provider;

use crate::model::coordinates::ObservationQuery;
use crate::model::observation::Observation;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub use observation_provider::ObservationProvider;

pub type FetchResult<T> = Result<T, FetchError>;

/// Failure of one live provider call.
#[derive(Debug)]
pub enum FetchError {
    /// Transport-level failure: DNS, connect, TLS or timeout.
    Network(reqwest::Error),
    /// The server answered with a non-2xx status.
    Status(u16),
    /// The body was not JSON or matched neither recognized shape.
    MalformedResponse(String),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network(err) if err.is_timeout())
    }

    /// Stable short code for log events.
    pub fn code(&self) -> &'static str {
        if self.is_timeout() {
            return "timeout";
        }
        match self {
            Self::Network(_) => "network",
            Self::Status(_) => "http_status",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(err) => write!(f, "network failure: {err}"),
            Self::Status(status) => write!(f, "unexpected HTTP status {status}"),
            Self::MalformedResponse(message) => write!(f, "malformed response: {message}"),
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Network(err) => Some(err),
            Self::Status(_) | Self::MalformedResponse(_) => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            return Self::MalformedResponse(value.to_string());
        }
        Self::Network(value)
    }
}

/// Live observation source: the first, fallible stage of the provider.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    /// Fetches and normalizes observations for `query`.
    async fn fetch_observations(&self, query: &ObservationQuery) -> FetchResult<Vec<Observation>>;

    /// Lightweight reachability probe that returns no data.
    async fn probe(&self) -> FetchResult<()>;
}

/// HTTP client configuration for the observation API.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub fetch_timeout: Duration,
    pub probe_timeout: Duration,
    pub user_agent: String,
    /// Lookback window in days, counted back from the query end date.
    pub lookback_days: u32,
}

pub const DEFAULT_BASE_URL: &str = "https://waarneming.nl/api/v1";

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            fetch_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
            user_agent: format!("BirdSpotting/{}", env!("CARGO_PKG_VERSION")),
            lookback_days: 1,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}
