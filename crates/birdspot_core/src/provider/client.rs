//! HTTP client for the `observations/around-point` endpoint.

use super::normalize::normalize_records;
use super::{ClientConfig, FetchError, FetchResult, ObservationSource};
use crate::model::coordinates::{ObservationQuery, BIRDS_SPECIES_GROUP};
use crate::model::observation::Observation;
use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use std::time::Instant;

const AROUND_POINT_PATH: &str = "/observations/around-point/";
/// Fixed reference point used by the connectivity probe (Utrecht).
pub const PROBE_LATITUDE: f64 = 52.0726;
pub const PROBE_LONGITUDE: f64 = 5.0966;
const PROBE_RADIUS_METERS: u64 = 1000;

/// `ObservationSource` backed by the waarneming.nl REST API.
pub struct WaarnemingClient {
    client: Client,
    config: ClientConfig,
}

impl WaarnemingClient {
    pub fn new(config: ClientConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}{AROUND_POINT_PATH}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn query_params(
        &self,
        lat: f64,
        lng: f64,
        radius_meters: u64,
        species_group: &str,
        end_date: NaiveDate,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("lat", lat.to_string()),
            ("lng", lng.to_string()),
            ("radius", radius_meters.to_string()),
            ("species_group", species_group.to_string()),
            ("days", self.config.lookback_days.to_string()),
            ("end_date", end_date.format("%Y-%m-%d").to_string()),
        ]
    }
}

#[async_trait]
impl ObservationSource for WaarnemingClient {
    async fn fetch_observations(&self, query: &ObservationQuery) -> FetchResult<Vec<Observation>> {
        let started_at = Instant::now();
        let params = self.query_params(
            query.center.latitude,
            query.center.longitude,
            query.radius_meters(),
            &query.species_group,
            query.date_to,
        );

        let response = self
            .client
            .get(self.endpoint())
            .query(&params)
            .header(ACCEPT, "application/json")
            .timeout(self.config.fetch_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.json::<Value>().await?;
        let records = extract_records(body)?;
        let observations = normalize_records(&records, query);
        info!(
            "event=observations_fetch module=provider status=ok source=live count={} duration_ms={}",
            observations.len(),
            started_at.elapsed().as_millis()
        );
        Ok(observations)
    }

    async fn probe(&self) -> FetchResult<()> {
        let params = self.query_params(
            PROBE_LATITUDE,
            PROBE_LONGITUDE,
            PROBE_RADIUS_METERS,
            BIRDS_SPECIES_GROUP,
            chrono::Local::now().date_naive(),
        );
        let response = self
            .client
            .get(self.endpoint())
            .query(&params)
            .header(ACCEPT, "application/json")
            .timeout(self.config.probe_timeout)
            .send()
            .await?;

        match response.status().as_u16() {
            200 => {
                debug!("event=api_probe module=provider status=ok");
                Ok(())
            }
            other => Err(FetchError::Status(other)),
        }
    }
}

/// Accepts `{"results": [...]}` or a bare array.
fn extract_records(body: Value) -> FetchResult<Vec<Value>> {
    match body {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(FetchError::MalformedResponse(
                "object body without a `results` array".to_string(),
            )),
        },
        other => Err(FetchError::MalformedResponse(format!(
            "unexpected top-level JSON type: {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
