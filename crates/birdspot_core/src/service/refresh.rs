//! Refetch decisions and stale-result sequencing.

use crate::geo::distance_between;
use crate::model::coordinates::Coordinates;
use crate::settings::SearchRadius;

/// Default minimum move before a new location counts as a change.
pub const DEFAULT_DEBOUNCE_KM: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshPolicy {
    /// Location moves shorter than this do not trigger a refetch.
    pub debounce_km: f64,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            debounce_km: DEFAULT_DEBOUNCE_KM,
        }
    }
}

/// Monotonic id of one fetch; only the latest ticket may commit results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
struct FetchKey {
    center: Coordinates,
    radius: SearchRadius,
}

#[derive(Debug, Default)]
pub(crate) struct RefreshPlanner {
    policy: RefreshPolicy,
    last_key: Option<FetchKey>,
    issued: u64,
}

impl RefreshPlanner {
    pub(crate) fn new(policy: RefreshPolicy) -> Self {
        Self {
            policy,
            last_key: None,
            issued: 0,
        }
    }

    /// True when `(center, radius)` differs from the last issued fetch.
    pub(crate) fn needs_refresh(&self, center: &Coordinates, radius: SearchRadius) -> bool {
        match &self.last_key {
            None => true,
            Some(last) => {
                last.radius != radius
                    || distance_between(&last.center, center) >= self.policy.debounce_km
            }
        }
    }

    pub(crate) fn begin(&mut self, center: Coordinates, radius: SearchRadius) -> FetchTicket {
        self.issued += 1;
        self.last_key = Some(FetchKey { center, radius });
        FetchTicket(self.issued)
    }

    pub(crate) fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.0 == self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::{RefreshPlanner, RefreshPolicy};
    use crate::model::coordinates::Coordinates;
    use crate::settings::SearchRadius;

    #[test]
    fn small_moves_are_debounced_and_radius_changes_are_not() {
        let mut planner = RefreshPlanner::new(RefreshPolicy::default());
        let home = Coordinates::new(52.0907, 5.1214);
        assert!(planner.needs_refresh(&home, SearchRadius::Km2));
        planner.begin(home, SearchRadius::Km2);

        let jitter = Coordinates::new(52.0909, 5.1215);
        assert!(!planner.needs_refresh(&jitter, SearchRadius::Km2));
        assert!(planner.needs_refresh(&jitter, SearchRadius::Km5));

        let across_town = Coordinates::new(52.1000, 5.1214);
        assert!(planner.needs_refresh(&across_town, SearchRadius::Km2));
    }

    #[test]
    fn only_latest_ticket_is_current() {
        let mut planner = RefreshPlanner::new(RefreshPolicy::default());
        let first = planner.begin(Coordinates::new(52.0, 5.0), SearchRadius::Km2);
        let second = planner.begin(Coordinates::new(52.5, 5.0), SearchRadius::Km2);
        assert!(!planner.is_current(first));
        assert!(planner.is_current(second));
        assert!(first < second);
    }
}
