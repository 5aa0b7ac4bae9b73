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


//! Track selection for new downloads
//!
//! A source exposes video, audio and text renditions. The default policy
//! downloads one video rendition from the middle of the quality list plus
//! every audio and text track.

use serde::{Deserialize, Serialize};

/// A selectable sub-stream of a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            bitrate: None,
            language: None,
        }
    }
}

/// Renditions available for one url, in engine order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailableTracks {
    #[serde(default)]
    pub video: Vec<Track>,
    #[serde(default)]
    pub audio: Vec<Track>,
    #[serde(default)]
    pub text: Vec<Track>,
}

/// Track ids to download, per kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSelection {
    pub video: Vec<String>,
    pub audio: Vec<String>,
    pub text: Vec<String>,
}

/// Options passed to the engine when creating a download
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOptions {
    /// `None` lets the engine pick its defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracks: Option<TrackSelection>,
}

impl DownloadOptions {
    pub fn with_tracks(tracks: TrackSelection) -> Self {
        Self { tracks: Some(tracks) }
    }
}

/// Which position of the video list to download
///
/// Positions are taken from the engine's list order, which runs from
/// lowest to highest quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoQualityPolicy {
    #[default]
    Medium,
    Highest,
    Lowest,
}

impl VideoQualityPolicy {
    /// Index into a list of `len` video tracks, `None` when empty
    pub fn pick_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(match self {
            VideoQualityPolicy::Medium => len / 2,
            VideoQualityPolicy::Highest => len - 1,
            VideoQualityPolicy::Lowest => 0,
        })
    }
}

/// Choose the tracks to download from what the engine offers
pub fn select_tracks(available: &AvailableTracks, policy: VideoQualityPolicy) -> TrackSelection {
    let video = policy
        .pick_index(available.video.len())
        .map(|index| vec![available.video[index].id.clone()])
        .unwrap_or_default();

    TrackSelection {
        video,
        audio: available.audio.iter().map(|t| t.id.clone()).collect(),
        text: available.text.iter().map(|t| t.id.clone()).collect(),
    }
}
