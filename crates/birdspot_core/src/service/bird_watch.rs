//! Observation refresh flow.
//!
//! # Responsibility
//! - Fetch once per (location, radius) change and keep the latest result.
//! - Trigger the rare-bird check after each committed fetch.
//! - Apply the display rarity filter from settings.
//!
//! # Invariants
//! - Results from a superseded fetch are discarded, never committed.
//! - Settings changes other than the radius never trigger a refetch.

use super::refresh::{FetchTicket, RefreshPlanner, RefreshPolicy};
use crate::model::coordinates::Coordinates;
use crate::model::observation::Observation;
use crate::notify::{DispatchReport, NotificationSink, RareBirdNotifier};
use crate::provider::{ObservationProvider, ObservationSource};
use crate::settings::kv::KeyValueStore;
use crate::settings::{AppSettings, SettingsStore};
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::sync::{Mutex, MutexGuard};

/// Display floor applied when `rarebirds_only` is set (`zeldzaam`).
pub const RARE_BIRDS_ONLY_FLOOR: u8 = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Location and radius are unchanged since the last fetch.
    Skipped,
    /// A newer fetch was issued while this one was in flight.
    Superseded(FetchTicket),
    Updated {
        ticket: FetchTicket,
        /// Observations after the display filter, nearest first.
        visible: Vec<Observation>,
        /// Count before the display filter.
        total: usize,
        /// Present when the rare-bird check ran.
        notifications: Option<DispatchReport>,
    },
}

#[derive(Default)]
struct FeedState {
    planner: RefreshPlanner,
    observations: Vec<Observation>,
    refreshed_at: Option<DateTime<Utc>>,
}

pub struct BirdWatchService<S, N, K>
where
    S: ObservationSource,
    N: NotificationSink,
    K: KeyValueStore,
{
    provider: ObservationProvider<S>,
    notifier: RareBirdNotifier<N>,
    settings: SettingsStore<K>,
    state: Mutex<FeedState>,
}

impl<S, N, K> BirdWatchService<S, N, K>
where
    S: ObservationSource,
    N: NotificationSink,
    K: KeyValueStore,
{
    pub fn new(
        provider: ObservationProvider<S>,
        notifier: RareBirdNotifier<N>,
        settings: SettingsStore<K>,
    ) -> Self {
        Self::with_policy(provider, notifier, settings, RefreshPolicy::default())
    }

    pub fn with_policy(
        provider: ObservationProvider<S>,
        notifier: RareBirdNotifier<N>,
        settings: SettingsStore<K>,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            provider,
            notifier,
            settings,
            state: Mutex::new(FeedState {
                planner: RefreshPlanner::new(policy),
                ..FeedState::default()
            }),
        }
    }

    pub fn provider(&self) -> &ObservationProvider<S> {
        &self.provider
    }

    pub fn notifier(&self) -> &RareBirdNotifier<N> {
        &self.notifier
    }

    pub fn settings(&self) -> &SettingsStore<K> {
        &self.settings
    }

    /// Refetches when `location` or the configured radius changed, or when
    /// `force` is set (pull-to-refresh).
    pub async fn refresh(&self, location: Coordinates, force: bool) -> RefreshOutcome {
        let radius = self.settings.current().search_radius;
        let ticket = {
            let mut state = self.state();
            if !force && !state.planner.needs_refresh(&location, radius) {
                debug!("event=observations_refresh module=service status=skipped");
                return RefreshOutcome::Skipped;
            }
            state.planner.begin(location, radius)
        };

        let observations = self
            .provider
            .recent_observations(location, f64::from(radius.km()))
            .await;

        {
            let mut state = self.state();
            if !state.planner.is_current(ticket) {
                info!(
                    "event=observations_refresh module=service status=superseded ticket={}",
                    ticket.value()
                );
                return RefreshOutcome::Superseded(ticket);
            }
            state.observations = observations.clone();
            state.refreshed_at = Some(Utc::now());
        }

        let settings = self.settings.current();
        let notifications = self.notify_rare_birds(&observations, &settings).await;
        let visible = display_filter(&observations, &settings);
        info!(
            "event=observations_refresh module=service status=ok ticket={} radius_km={} total={} visible={}",
            ticket.value(),
            radius.km(),
            observations.len(),
            visible.len()
        );
        RefreshOutcome::Updated {
            ticket,
            visible,
            total: observations.len(),
            notifications,
        }
    }

    /// Latest committed observations after the current display filter.
    pub fn visible_observations(&self) -> Vec<Observation> {
        let settings = self.settings.current();
        display_filter(&self.state().observations, &settings)
    }

    /// Latest committed observations, unfiltered.
    pub fn observations(&self) -> Vec<Observation> {
        self.state().observations.clone()
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.state().refreshed_at
    }

    async fn notify_rare_birds(
        &self,
        observations: &[Observation],
        settings: &AppSettings,
    ) -> Option<DispatchReport> {
        if observations.is_empty() || !settings.notifications_enabled {
            return None;
        }
        if !self.notifier.permission_status().await.is_granted() {
            debug!("event=rare_bird_check module=service status=skipped reason=permission");
            return None;
        }
        Some(
            self.notifier
                .check_for_rare_birds(observations, settings.notification_min_rarity)
                .await,
        )
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Minimum rarity shown in the list for `settings`.
pub fn display_floor(settings: &AppSettings) -> u8 {
    if settings.rarebirds_only {
        settings.min_rarity_level.max(RARE_BIRDS_ONLY_FLOOR)
    } else {
        settings.min_rarity_level
    }
}

/// Keeps observations at or above the display floor, preserving order.
pub fn display_filter(observations: &[Observation], settings: &AppSettings) -> Vec<Observation> {
    let floor = display_floor(settings);
    observations
        .iter()
        .filter(|observation| observation.rarity.id >= floor)
        .cloned()
        .collect()
}
