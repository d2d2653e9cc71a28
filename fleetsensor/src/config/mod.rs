//! Engine configuration.
//!
//! [`EngineSettings`] groups the tunables of the acquisition engine: the
//! first-time retry window ladder, the repeat-search window, cache lifetime,
//! segment priority order, and the sentinel messages surfaced to consumers.
//! Pure data with builder-style setters; validation happens at construction.

use crate::reading::Segment;
use std::collections::HashMap;
use std::time::Duration;

/// Lower bound for the sensor-data cache lifetime.
pub const MIN_LIFETIME_SECS: u64 = 10;

/// Complete engine configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Ascending list of first-time search windows, in days.
    ///
    /// A first-time search tries `[now - days[0], now]` first and widens
    /// through the list until data appears or the list is exhausted.
    pub first_time_window_days: Vec<u32>,
    /// Window for a repeat (refresh) search, in seconds. One attempt only.
    pub repeat_window_secs: i64,
    /// Cache lifetime in seconds; clamped to [`MIN_LIFETIME_SECS`].
    pub lifetime_secs: u64,
    /// Segment priority order; the first configured segment observed in a
    /// result becomes the active segment.
    pub segment_priority: Vec<Segment>,
    /// Human-readable segment names for logs and UI consumers.
    pub segment_display_names: HashMap<Segment, String>,
    /// Sentinel message for single-flight contention.
    pub busy_message: String,
    /// Sentinel message for an exhausted search with no data.
    pub not_found_message: String,
    /// How long a persisted channel catalog stays valid.
    pub catalog_expiry: Duration,
    /// Interval between advisory-lock polls while another context builds the
    /// catalog.
    pub lock_poll_interval: Duration,
    /// Bounded number of advisory-lock polls before taking the lock over.
    pub lock_poll_attempts: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let segment_priority: Vec<Segment> = ["tractor", "trailer1", "trailer2"]
            .into_iter()
            .map(Segment::new)
            .collect();
        let segment_display_names = [
            ("tractor", "Tractor"),
            ("trailer1", "Trailer 1"),
            ("trailer2", "Trailer 2"),
        ]
        .into_iter()
        .map(|(seg, name)| (Segment::new(seg), name.to_string()))
        .collect();

        Self {
            first_time_window_days: vec![1, 2, 7, 30, 60, 90],
            repeat_window_secs: 3_600,
            lifetime_secs: 60,
            segment_priority,
            segment_display_names,
            busy_message: "sensor data search already in progress".to_string(),
            not_found_message: "no sensor data found".to_string(),
            catalog_expiry: Duration::from_secs(4 * 24 * 3_600),
            lock_poll_interval: Duration::from_secs(1),
            lock_poll_attempts: 20,
        }
    }
}

impl EngineSettings {
    /// Replace the first-time window ladder.
    ///
    /// The list is sorted ascending; an empty list keeps the default.
    pub fn with_first_time_window_days(mut self, mut days: Vec<u32>) -> Self {
        if !days.is_empty() {
            days.sort_unstable();
            self.first_time_window_days = days;
        }
        self
    }

    /// Replace the repeat-search window.
    pub fn with_repeat_window_secs(mut self, secs: i64) -> Self {
        self.repeat_window_secs = secs.max(1);
        self
    }

    /// Replace the cache lifetime, clamped to the minimum.
    pub fn with_lifetime_secs(mut self, secs: u64) -> Self {
        self.lifetime_secs = secs.max(MIN_LIFETIME_SECS);
        self
    }

    /// Replace the segment priority order.
    pub fn with_segment_priority(mut self, priority: Vec<Segment>) -> Self {
        if !priority.is_empty() {
            self.segment_priority = priority;
        }
        self
    }

    /// Replace the advisory-lock polling parameters.
    pub fn with_lock_polling(mut self, interval: Duration, attempts: u32) -> Self {
        self.lock_poll_interval = interval;
        self.lock_poll_attempts = attempts.max(1);
        self
    }

    /// Display name for a segment, falling back to its raw identifier.
    pub fn display_name<'a>(&'a self, segment: &'a Segment) -> &'a str {
        self.segment_display_names
            .get(segment)
            .map(String::as_str)
            .unwrap_or_else(|| segment.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ladder_is_ascending() {
        let settings = EngineSettings::default();
        let mut sorted = settings.first_time_window_days.clone();
        sorted.sort_unstable();
        assert_eq!(settings.first_time_window_days, sorted);
    }

    #[test]
    fn lifetime_is_clamped_to_minimum() {
        let settings = EngineSettings::default().with_lifetime_secs(3);
        assert_eq!(settings.lifetime_secs, MIN_LIFETIME_SECS);
    }

    #[test]
    fn window_ladder_is_sorted_on_replacement() {
        let settings = EngineSettings::default().with_first_time_window_days(vec![7, 1, 2]);
        assert_eq!(settings.first_time_window_days, vec![1, 2, 7]);
    }

    #[test]
    fn display_name_falls_back_to_identifier() {
        let settings = EngineSettings::default();
        assert_eq!(settings.display_name(&Segment::new("tractor")), "Tractor");
        assert_eq!(settings.display_name(&Segment::new("dolly")), "dolly");
    }
}
