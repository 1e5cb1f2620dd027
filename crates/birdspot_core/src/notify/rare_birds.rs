//! Rarity threshold filter with per-sighting deduplication.

use super::{NotificationError, NotificationRequest, NotificationSink, PermissionStatus};
use crate::model::observation::{NotificationKey, Observation};
use futures::future::join_all;
use log::{debug, error, info};
use serde_json::json;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

const TEST_NOTIFICATION_ID: &str = "birdspot-test";

/// Inclusive threshold check: `rarity.id >= min_rarity`.
pub fn is_rare_bird(observation: &Observation, min_rarity: u8) -> bool {
    observation.rarity.id >= min_rarity
}

/// Returns the observations meeting `min_rarity`, in input order.
pub fn evaluate(observations: &[Observation], min_rarity: u8) -> Vec<Observation> {
    observations
        .iter()
        .filter(|observation| is_rare_bird(observation, min_rarity))
        .cloned()
        .collect()
}

/// Outcome of one `check_for_rare_birds` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Observations at or above the threshold.
    pub qualifying: usize,
    /// Keys dispatched successfully in this pass.
    pub sent: Vec<NotificationKey>,
    /// Qualifying observations whose key was already sent or reserved.
    pub skipped_duplicates: usize,
    /// Keys whose dispatch failed; they stay eligible for the next pass.
    pub failed: Vec<NotificationKey>,
}

#[derive(Default)]
struct DedupState {
    /// Keys whose dispatch succeeded.
    sent: HashSet<NotificationKey>,
    /// Keys reserved by a pass whose dispatch has not settled yet.
    in_flight: HashSet<NotificationKey>,
}

/// In-flight claim on one key.
///
/// Dropping it without `commit` (failed dispatch, or the pass future was
/// dropped mid-dispatch) makes the key eligible again.
struct Reservation<'a> {
    state: &'a Mutex<DedupState>,
    key: NotificationKey,
    committed: bool,
}

impl Reservation<'_> {
    fn commit(mut self) {
        self.committed = true;
        let mut state = lock_state(self.state);
        state.in_flight.remove(&self.key);
        state.sent.insert(self.key);
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        lock_state(self.state).in_flight.remove(&self.key);
        debug!(
            "event=rare_bird_notify module=notify status=released key={}",
            self.key
        );
    }
}

/// Session-scoped rare-bird notifier.
pub struct RareBirdNotifier<N: NotificationSink> {
    sink: N,
    dedup: Mutex<DedupState>,
}

impl<N: NotificationSink> RareBirdNotifier<N> {
    pub fn new(sink: N) -> Self {
        Self {
            sink,
            dedup: Mutex::new(DedupState::default()),
        }
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    /// Asks the platform for permission; returns whether it was granted.
    pub async fn request_permission(&self) -> bool {
        let status = match self.sink.permission_status().await {
            PermissionStatus::Granted => PermissionStatus::Granted,
            _ => self.sink.request_permission().await,
        };
        info!(
            "event=notification_permission module=notify status={}",
            status.as_str()
        );
        status.is_granted()
    }

    pub async fn permission_status(&self) -> PermissionStatus {
        self.sink.permission_status().await
    }

    /// Notifies once per qualifying sighting not yet sent in this process.
    ///
    /// Keys are reserved before dispatch so concurrent passes cannot double
    /// send. A key only counts as sent once its dispatch succeeded; a failed
    /// or cancelled dispatch releases its reservation.
    pub async fn check_for_rare_birds(
        &self,
        observations: &[Observation],
        min_rarity: u8,
    ) -> DispatchReport {
        let rare = evaluate(observations, min_rarity);
        let mut report = DispatchReport {
            qualifying: rare.len(),
            ..DispatchReport::default()
        };

        let reserved = {
            let mut state = lock_state(&self.dedup);
            let mut reserved = Vec::with_capacity(rare.len());
            for observation in &rare {
                let key = observation.notification_key();
                if state.sent.contains(&key) || !state.in_flight.insert(key) {
                    report.skipped_duplicates += 1;
                    debug!(
                        "event=rare_bird_notify module=notify status=skipped key={}",
                        key
                    );
                    continue;
                }
                reserved.push((
                    observation,
                    Reservation {
                        state: &self.dedup,
                        key,
                        committed: false,
                    },
                ));
            }
            reserved
        };

        let outcomes = join_all(reserved.into_iter().map(|(observation, reservation)| async move {
            let key = reservation.key;
            let result = self.sink.schedule(rare_bird_request(observation)).await;
            if result.is_ok() {
                reservation.commit();
            }
            (key, result)
        }))
        .await;

        for (key, result) in outcomes {
            match result {
                Ok(()) => report.sent.push(key),
                Err(err) => {
                    error!(
                        "event=rare_bird_notify module=notify status=error key={} error={}",
                        key, err
                    );
                    report.failed.push(key);
                }
            }
        }

        info!(
            "event=rare_bird_check module=notify status=ok observations={} min_rarity={} qualifying={} sent={} skipped={} failed={}",
            observations.len(),
            min_rarity,
            report.qualifying,
            report.sent.len(),
            report.skipped_duplicates,
            report.failed.len()
        );
        report
    }

    pub async fn send_test_notification(&self) -> Result<(), NotificationError> {
        let request = NotificationRequest {
            identifier: TEST_NOTIFICATION_ID.to_string(),
            title: "Test notificatie".to_string(),
            body: "Notificaties werken! Je krijgt meldingen wanneer er zeldzame vogels in de buurt zijn."
                .to_string(),
            data: json!({ "test": true }),
        };
        self.sink.schedule(request).await
    }

    pub async fn cancel_all(&self) -> Result<(), NotificationError> {
        self.sink.cancel_all().await
    }

    /// Forgets every sent key so sightings may notify again.
    pub fn clear_history(&self) {
        lock_state(&self.dedup).sent.clear();
        info!("event=notification_history_clear module=notify status=ok");
    }

    pub fn was_sent(&self, key: &NotificationKey) -> bool {
        lock_state(&self.dedup).sent.contains(key)
    }

    pub fn sent_count(&self) -> usize {
        lock_state(&self.dedup).sent.len()
    }
}

fn lock_state(state: &Mutex<DedupState>) -> MutexGuard<'_, DedupState> {
    // Poisoning only means another pass panicked mid-update; the sets stay usable.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Builds the alert shown for a rare sighting.
pub(crate) fn rare_bird_request(observation: &Observation) -> NotificationRequest {
    let distance = observation
        .distance_km
        .map(|km| format!("{km:.1}"))
        .unwrap_or_else(|| "?".to_string());
    NotificationRequest {
        identifier: observation.notification_key().to_string(),
        title: format!("{} vogel gespot!", observation.rarity.display_name()),
        body: format!(
            "{} gezien op {}km afstand bij {}",
            observation.species.name, distance, observation.location.name
        ),
        data: json!({
            "observationId": observation.id,
            "speciesName": observation.species.name,
            "location": observation.location,
            "distance": observation.distance_km,
            "rarity": observation.rarity,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::rare_bird_request;
    use crate::model::observation::{Observation, ObservationLocation, Species};
    use crate::model::rarity::level_for;
    use chrono::NaiveDate;

    fn sighting(distance_km: Option<f64>) -> Observation {
        Observation {
            id: 12,
            species: Species {
                id: 7,
                name: "Grote zilverreiger".to_string(),
                scientific_name: "Ardea alba".to_string(),
                photo_url: None,
            },
            observed_at: NaiveDate::from_ymd_opt(2024, 4, 20)
                .and_then(|day| day.and_hms_opt(8, 0, 0))
                .expect("valid timestamp"),
            location: ObservationLocation {
                lat: 52.1,
                lng: 5.1,
                name: "Amelisweerd".to_string(),
            },
            observer: "Waarnemer 1".to_string(),
            distance_km,
            rarity: level_for(4),
        }
    }

    #[test]
    fn request_uses_key_as_identifier_and_formats_body() {
        let request = rare_bird_request(&sighting(Some(1.26)));
        assert_eq!(request.identifier, "7-12");
        assert_eq!(request.title, "Zeer zeldzaam vogel gespot!");
        assert_eq!(
            request.body,
            "Grote zilverreiger gezien op 1.3km afstand bij Amelisweerd"
        );
        assert_eq!(request.data["observationId"], 12);
        assert_eq!(request.data["rarity"]["id"], 4);
    }

    #[test]
    fn missing_distance_renders_question_mark() {
        let request = rare_bird_request(&sighting(None));
        assert!(request.body.contains("op ?km"));
    }
}
