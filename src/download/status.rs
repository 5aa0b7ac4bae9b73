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


//! Download records and asset records as reported by the engine
//!
//! # Wire format
//! Records arrive from the engine as camelCase JSON:
//! `{"id": "d1", "url": "...", "status": "downloading", "progress": 0.5}`.
//! Completed assets use `pathToFile` for the local path; `localPath` is
//! accepted as an alias on both record types.

use crate::error::{Result, StreamSyncError};
use serde::{Deserialize, Serialize};

/// Lifecycle of a single download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// No record exists for the url. Never reported by the engine.
    NotStarted,
    /// Created, waiting for an engine slot
    Pending,
    /// Currently transferring
    Downloading,
    /// Paused by the user
    Paused,
    /// Materialized locally
    Completed,
    /// Engine gave up on the download
    Failed,
    /// Cancelled by the user
    Canceled,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::NotStarted => "not_started",
            DownloadStatus::Pending => "pending",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Paused => "paused",
            DownloadStatus::Completed => "completed",
            DownloadStatus::Failed => "failed",
            DownloadStatus::Canceled => "canceled",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "not_started" => Ok(DownloadStatus::NotStarted),
            "pending" => Ok(DownloadStatus::Pending),
            "downloading" => Ok(DownloadStatus::Downloading),
            "paused" => Ok(DownloadStatus::Paused),
            "completed" => Ok(DownloadStatus::Completed),
            "failed" => Ok(DownloadStatus::Failed),
            "canceled" => Ok(DownloadStatus::Canceled),
            _ => Err(StreamSyncError::invalid_input(format!("Invalid download status: {}", s))),
        }
    }

    /// No further progress events are expected; a new download may start
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadStatus::Completed | DownloadStatus::Canceled | DownloadStatus::Failed
        )
    }

    /// States in which `progress` is meaningful
    pub fn has_progress(&self) -> bool {
        matches!(
            self,
            DownloadStatus::Pending | DownloadStatus::Downloading | DownloadStatus::Paused
        )
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one download as tracked by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    /// Engine-assigned id; absent until the engine created the download
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Source locator; the natural key before an id exists
    pub url: String,

    pub status: DownloadStatus,

    /// Fraction in [0, 1]
    #[serde(default)]
    pub progress: f64,

    /// Local file; only set while `status == Completed`
    #[serde(default, alias = "pathToFile", skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
}

impl DownloadRecord {
    /// Create a record as the engine would report it
    pub fn new(id: impl Into<String>, url: impl Into<String>, status: DownloadStatus) -> Self {
        Self {
            id: Some(id.into()),
            url: url.into(),
            status,
            progress: 0.0,
            local_path: None,
        }
    }

    /// Placeholder returned for urls nothing is known about
    pub fn not_started(url: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            status: DownloadStatus::NotStarted,
            progress: 0.0,
            local_path: None,
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = progress;
        self
    }

    /// Mark completed together with its local file
    pub fn completed_at(mut self, local_path: impl Into<String>) -> Self {
        self.status = DownloadStatus::Completed;
        self.local_path = Some(local_path.into());
        self
    }

    /// Identity used by the merge: id, or url while no id was assigned
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.url)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Local file, only ever reported for completed records
    pub fn local_path(&self) -> Option<&str> {
        match self.status {
            DownloadStatus::Completed => self.local_path.as_deref(),
            _ => None,
        }
    }

    /// Enforce record invariants on ingest
    ///
    /// Progress is clamped to [0, 1] (NaN becomes 0). A local path on a
    /// non-completed record is dropped.
    pub fn normalized(mut self) -> Self {
        self.progress = if self.progress.is_nan() {
            0.0
        } else {
            self.progress.clamp(0.0, 1.0)
        };
        if self.status != DownloadStatus::Completed {
            self.local_path = None;
        }
        self
    }
}

/// A completed, locally stored download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub id: String,
    pub url: String,
    #[serde(rename = "pathToFile", alias = "localPath")]
    pub local_path: String,
    #[serde(default)]
    pub title: String,
}

impl AssetRecord {
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        local_path: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            local_path: local_path.into(),
            title: title.into(),
        }
    }
}
