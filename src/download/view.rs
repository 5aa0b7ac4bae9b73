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


//! Read model published to the UI

use crate::download::progress;
use crate::download::status::{AssetRecord, DownloadRecord, DownloadStatus};
use serde::Serialize;

/// Immutable view of the reconciler state at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub ready: bool,
    pub downloads: Vec<DownloadRecord>,
    pub assets: Vec<AssetRecord>,
}

/// What the download control of a list item shows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControlState {
    /// Not ready yet; render nothing
    Hidden,
    /// Progress ring; `resumable` shows the resume button
    Progress { percent: f64, resumable: bool },
    /// Check mark; tapping it deletes the asset
    Completed { asset_id: Option<String> },
    Failed,
    /// Download button
    Download,
}

impl Snapshot {
    /// Current record for `url`
    ///
    /// Prefers the non-terminal record, then the most recent one. Unknown
    /// urls yield a `NotStarted` placeholder.
    pub fn status_of(&self, url: &str) -> DownloadRecord {
        self.active_record(url)
            .or_else(|| self.downloads.iter().rev().find(|r| r.url == url))
            .cloned()
            .unwrap_or_else(|| DownloadRecord::not_started(url))
    }

    /// The non-terminal record for `url`, if any
    pub fn active_record(&self, url: &str) -> Option<&DownloadRecord> {
        self.downloads
            .iter()
            .find(|r| r.url == url && !r.is_terminal())
    }

    pub fn asset_for_url(&self, url: &str) -> Option<&AssetRecord> {
        self.assets.iter().find(|a| a.url == url)
    }

    pub fn asset(&self, id: &str) -> Option<&AssetRecord> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// URI handed to the player: the local file if downloaded, else the stream
    pub fn playback_uri(&self, url: &str) -> String {
        self.asset_for_url(url)
            .map(|a| a.local_path.clone())
            .filter(|path| !path.is_empty())
            .unwrap_or_else(|| url.to_string())
    }

    pub fn controls(&self, url: &str) -> ControlState {
        if !self.ready {
            return ControlState::Hidden;
        }

        let record = self.status_of(url);
        match record.status {
            DownloadStatus::Pending | DownloadStatus::Downloading | DownloadStatus::Paused => {
                ControlState::Progress {
                    percent: progress::percent(&record),
                    resumable: record.status == DownloadStatus::Paused,
                }
            }
            DownloadStatus::Completed => ControlState::Completed {
                asset_id: record
                    .id
                    .clone()
                    .or_else(|| self.asset_for_url(url).map(|a| a.id.clone())),
            },
            DownloadStatus::Failed => ControlState::Failed,
            DownloadStatus::NotStarted | DownloadStatus::Canceled => ControlState::Download,
        }
    }
}
