//! Device location orchestration.
//!
//! The platform location service lives behind `LocationSource`; this module
//! only sequences permission, service and position checks and maps failures
//! onto user-facing retry messages.

use crate::model::coordinates::Coordinates;
use crate::notify::PermissionStatus;
use async_trait::async_trait;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    PermissionDenied,
    ServiceDisabled,
    /// The platform could not resolve a position.
    Unavailable(String),
}

impl LocationError {
    /// Message shown next to the retry action.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "Locatie toegang is vereist om vogels in je buurt te vinden",
            Self::ServiceDisabled => {
                "Locatieservices zijn uitgeschakeld. Schakel ze in via instellingen."
            }
            Self::Unavailable(_) => "Locatie niet beschikbaar. Controleer je instellingen.",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::ServiceDisabled => "service_disabled",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

impl Display for LocationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "location permission denied"),
            Self::ServiceDisabled => write!(f, "location services disabled"),
            Self::Unavailable(reason) => write!(f, "location unavailable: {reason}"),
        }
    }
}

impl Error for LocationError {}

/// Device location service.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn permission_status(&self) -> PermissionStatus;
    async fn request_permission(&self) -> PermissionStatus;
    async fn services_enabled(&self) -> bool;
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// Resolves the current position: permission, then service check, then fix.
pub async fn current_location<L: LocationSource + ?Sized>(
    source: &L,
) -> Result<Coordinates, LocationError> {
    let result = resolve(source).await;
    match &result {
        Ok(_) => info!("event=location_resolve module=location status=ok"),
        Err(err) => error!(
            "event=location_resolve module=location status=error error_code={} error={}",
            err.code(),
            err
        ),
    }
    result
}

async fn resolve<L: LocationSource + ?Sized>(source: &L) -> Result<Coordinates, LocationError> {
    if !source.request_permission().await.is_granted() {
        return Err(LocationError::PermissionDenied);
    }
    if !source.services_enabled().await {
        return Err(LocationError::ServiceDisabled);
    }
    source.current_position().await
}
