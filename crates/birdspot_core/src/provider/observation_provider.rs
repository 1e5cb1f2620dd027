//! Fallback adapter around a live `ObservationSource`.

use super::client::WaarnemingClient;
use super::mock::mock_observations;
use super::{ClientConfig, FetchResult, ObservationSource};
use crate::model::coordinates::{Coordinates, ObservationQuery};
use crate::model::observation::Observation;
use chrono::{Local, NaiveDateTime, Timelike};
use log::{error, warn};

/// Caller-facing provider whose `fetch` always resolves to a list.
pub struct ObservationProvider<S: ObservationSource> {
    source: S,
}

impl ObservationProvider<WaarnemingClient> {
    /// Provider backed by the live HTTP client.
    pub fn live(config: ClientConfig) -> FetchResult<Self> {
        Ok(Self::new(WaarnemingClient::new(config)?))
    }
}

impl<S: ObservationSource> ObservationProvider<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetches today's observations within `radius_km` of `location`.
    pub async fn recent_observations(
        &self,
        location: Coordinates,
        radius_km: f64,
    ) -> Vec<Observation> {
        let query = ObservationQuery::for_day(location, radius_km, Local::now().date_naive());
        self.fetch(&query).await
    }

    /// Live attempt first; on any failure the mock set is returned instead.
    pub async fn fetch(&self, query: &ObservationQuery) -> Vec<Observation> {
        match self.source.fetch_observations(query).await {
            Ok(observations) => observations,
            Err(err) => {
                let fallback = mock_observations(query, now_local());
                warn!(
                    "event=observations_fetch module=provider status=fallback error_code={} count={} error={}",
                    err.code(),
                    fallback.len(),
                    err
                );
                fallback
            }
        }
    }

    /// Returns whether the remote API answered the probe with HTTP 200.
    pub async fn test_connection(&self) -> bool {
        match self.source.probe().await {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "event=api_probe module=provider status=error error_code={} error={}",
                    err.code(),
                    err
                );
                false
            }
        }
    }
}

fn now_local() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}
