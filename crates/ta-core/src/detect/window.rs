//! Trailing-window selection for baseline fitting.

use chrono::Duration;
use ta_common::Sample;

/// Fewest points a trailing window may hold before the full history is
/// used instead.
pub const DEFAULT_MIN_WINDOW_POINTS: usize = 100;

/// The samples chosen for a baseline fit.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Timestamp-sorted samples.
    pub samples: Vec<Sample>,
    /// True when the trailing window was too small and the full history was
    /// returned instead.
    pub widened: bool,
}

impl Window {
    pub fn intensities(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.intensity).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Selects the trailing `window_days` of history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSelector {
    pub window_days: u32,
    pub min_points: usize,
}

impl WindowSelector {
    pub fn new(window_days: u32) -> Self {
        Self {
            window_days,
            min_points: DEFAULT_MIN_WINDOW_POINTS,
        }
    }

    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    /// Sort (stably) by timestamp and keep samples no older than
    /// `window_days` before the newest one.
    ///
    /// A window with fewer than `min_points` samples is replaced by the
    /// whole sorted input. Empty input yields an empty window.
    pub fn select(&self, samples: &[Sample]) -> Window {
        let mut sorted = samples.to_vec();
        sorted.sort_by_key(|s| s.timestamp);

        let Some(t_max) = sorted.last().map(|s| s.timestamp) else {
            return Window {
                samples: sorted,
                widened: false,
            };
        };

        // A span reaching past the earliest representable instant covers
        // the whole history.
        let start = Duration::try_days(i64::from(self.window_days))
            .and_then(|span| t_max.checked_sub_signed(span))
            .map_or(0, |t_min| sorted.partition_point(|s| s.timestamp < t_min));

        if sorted.len() - start < self.min_points {
            return Window {
                widened: start > 0,
                samples: sorted,
            };
        }

        Window {
            samples: sorted.split_off(start),
            widened: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn day(d: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(d)
    }

    fn hourly(days: i64) -> Vec<Sample> {
        (0..days * 24)
            .map(|h| Sample::new(day(0) + Duration::hours(h), h as f64))
            .collect()
    }

    #[test]
    fn empty_input_is_empty_window() {
        let window = WindowSelector::new(30).select(&[]);
        assert!(window.is_empty());
        assert!(!window.widened);
    }

    #[test]
    fn keeps_only_trailing_days() {
        let samples = hourly(40);
        let window = WindowSelector::new(30).select(&samples);
        let t_max = samples.last().unwrap().timestamp;
        assert!(!window.widened);
        assert!(window
            .samples
            .iter()
            .all(|s| s.timestamp >= t_max - Duration::days(30)));
        // Boundary sample exactly 30 days back is kept.
        assert_eq!(window.len(), 30 * 24 + 1);
    }

    #[test]
    fn widens_when_window_is_thin() {
        // 30 hourly points in the last day, older data a month before.
        let mut samples: Vec<Sample> = (0..200)
            .map(|i| Sample::new(day(0) + Duration::minutes(i), 1.0))
            .collect();
        samples.extend((0..30).map(|h| Sample::new(day(60) + Duration::hours(h), 2.0)));

        let window = WindowSelector::new(30).select(&samples);
        assert!(window.widened);
        assert_eq!(window.len(), samples.len());
    }

    #[test]
    fn small_history_is_not_reported_as_widened() {
        let samples: Vec<Sample> = (0..5).map(|d| Sample::new(day(d), 10.0)).collect();
        let window = WindowSelector::new(30).select(&samples);
        assert_eq!(window.len(), 5);
        assert!(!window.widened);
    }

    #[test]
    fn window_longer_than_time_range_keeps_everything() {
        let samples = hourly(10);
        let window = WindowSelector::new(200_000_000).select(&samples);
        assert_eq!(window.len(), samples.len());
        assert!(!window.widened);

        let window = WindowSelector::new(u32::MAX).with_min_points(1).select(&samples);
        assert_eq!(window.len(), samples.len());
    }

    #[test]
    fn sorts_unsorted_input_stably() {
        let samples = vec![
            Sample::new(day(2), 3.0),
            Sample::new(day(1), 1.0),
            Sample::new(day(1), 2.0),
        ];
        let window = WindowSelector::new(30).with_min_points(1).select(&samples);
        let values = window.intensities();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }
}
