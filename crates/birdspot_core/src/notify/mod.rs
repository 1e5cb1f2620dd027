//! Rare-bird notification filtering and dispatch.
//!
//! # Responsibility
//! - Decide which observations are rare enough to notify about.
//! - Dispatch at most one notification per sighting per process lifetime.
//! - Hide the platform notification service behind `NotificationSink`.
//!
//! # Invariants
//! - A key is marked as sent only after its dispatch succeeded.
//! - The sent-key set is in-memory only and never persisted.

mod rare_birds;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use rare_birds::{evaluate, is_rare_bird, DispatchReport, RareBirdNotifier};

/// Default minimum rarity for notifications (`zeldzaam`).
pub const DEFAULT_NOTIFICATION_MIN_RARITY: u8 = 3;

/// Platform permission state for notifications or location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// Not asked yet, or the platform could not answer.
    Undetermined,
}

impl PermissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Undetermined => "undetermined",
        }
    }

    /// Lenient parse used at the FFI boundary; unknown values are undetermined.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "granted" => Self::Granted,
            "denied" => Self::Denied,
            _ => Self::Undetermined,
        }
    }

    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

/// One local notification to schedule immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// Platform-side identifier; equals the dedup key for rare-bird alerts.
    pub identifier: String,
    pub title: String,
    pub body: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    PermissionDenied,
    /// The platform rejected or failed to schedule the request.
    Platform(String),
}

impl Display for NotificationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "notification permission denied"),
            Self::Platform(message) => write!(f, "notification platform error: {message}"),
        }
    }
}

impl Error for NotificationError {}

/// Device notification service.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn permission_status(&self) -> PermissionStatus;
    async fn request_permission(&self) -> PermissionStatus;
    async fn schedule(&self, request: NotificationRequest) -> Result<(), NotificationError>;
    async fn cancel_all(&self) -> Result<(), NotificationError>;
}
