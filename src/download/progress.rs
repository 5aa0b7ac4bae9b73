// StreamSync - Offline Video Downloads for Mobile
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Progress formatting and rate estimation
//!
//! The engine reports progress as a fraction. These helpers turn a record
//! into what a progress ring or status line shows:
//! - Percentage (0.0 - 100.0) and a two-decimal percent string
//! - A one-line display string per status
//! - Moving-average rate and ETA from successive progress ticks

use crate::download::status::{DownloadRecord, DownloadStatus};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Percentage complete (0.0 - 100.0)
pub fn percent(record: &DownloadRecord) -> f64 {
    if record.status == DownloadStatus::Completed {
        return 100.0;
    }
    if !record.status.has_progress() {
        return 0.0;
    }
    record.progress * 100.0
}

/// Percentage with two decimals, e.g. "42.50"
pub fn percent_string(record: &DownloadRecord) -> String {
    format!("{:.2}", percent(record))
}

/// Format a duration as a short human-readable string (e.g., "5m 30s")
pub fn eta_string(eta: Option<Duration>) -> String {
    let Some(eta) = eta else {
        return "calculating...".to_string();
    };

    let total = eta.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Format a record as a display line
pub fn display_string(title: &str, record: &DownloadRecord) -> String {
    match record.status {
        DownloadStatus::NotStarted => format!("{}: Not downloaded", title),
        DownloadStatus::Pending => format!("{}: Queued", title),
        DownloadStatus::Downloading => format!("{}: {}%", title, percent_string(record)),
        DownloadStatus::Paused => format!("{}: Paused at {}%", title, percent_string(record)),
        DownloadStatus::Completed => format!("{}: Completed", title),
        DownloadStatus::Failed => format!("{}: Failed", title),
        DownloadStatus::Canceled => format!("{}: Cancelled", title),
    }
}

/// Moving-average rate of progress
///
/// Uses a sliding window so one slow batch does not swing the estimate.
#[derive(Debug)]
pub struct RateTracker {
    /// Samples within the time window
    samples: VecDeque<RateSample>,

    /// Time window for averaging (default 10 seconds)
    window_duration: Duration,
}

#[derive(Debug, Clone)]
struct RateSample {
    timestamp: Instant,
    /// Fraction complete at this point in time
    fraction: f64,
}

impl RateTracker {
    /// Create new rate tracker with default 10-second window
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(10))
    }

    pub fn with_window(window_duration: Duration) -> Self {
        Self {
            samples: VecDeque::new(),
            window_duration,
        }
    }

    /// Add a progress sample taken now
    pub fn add_sample(&mut self, fraction: f64) {
        self.add_sample_at(Instant::now(), fraction);
    }

    /// Add a progress sample taken at `timestamp`
    pub fn add_sample_at(&mut self, timestamp: Instant, fraction: f64) {
        // A lower fraction means the download restarted
        if self
            .samples
            .back()
            .is_some_and(|last| fraction < last.fraction)
        {
            self.samples.clear();
        }

        self.samples.push_back(RateSample { timestamp, fraction });

        while let Some(sample) = self.samples.front() {
            if timestamp.duration_since(sample.timestamp) > self.window_duration {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Fraction of the download completed per second
    pub fn rate_per_second(&self) -> f64 {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };

        let elapsed = last.timestamp.duration_since(first.timestamp).as_secs_f64();
        if elapsed > 0.0 {
            (last.fraction - first.fraction).max(0.0) / elapsed
        } else {
            0.0
        }
    }

    /// Estimated time until the fraction reaches 1.0
    pub fn estimate_time_remaining(&self) -> Option<Duration> {
        let rate = self.rate_per_second();
        let last = self.samples.back()?;
        if rate > 0.0 {
            Some(Duration::from_secs_f64((1.0 - last.fraction).max(0.0) / rate))
        } else {
            None
        }
    }
}

impl Default for RateTracker {
    fn default() -> Self {
        Self::new()
    }
}
