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


//! Download status tracking
//!
//! The transfer itself happens in an external engine. This module keeps the
//! app's view of it consistent:
//! - `engine` - the engine trait and its event stream
//! - `status` - download and asset records
//! - `merge` - progress-batch merge and resync replacement
//! - `reconciler` - owns the state and forwards user intents
//! - `tracks` - which renditions a new download fetches
//! - `view` / `progress` - read model for the UI
//! - `simulated` - in-process engine for desktop runs and tests

pub mod engine;
pub mod merge;
pub mod progress;
pub mod reconciler;
pub mod simulated;
pub mod status;
pub mod tracks;
pub mod view;

// Re-export commonly used types
pub use engine::{DownloadEngine, EngineConfig, EngineEvent};
pub use reconciler::{DownloadReconciler, EngineSubscription, StatusSubscription};
pub use simulated::SimulatedEngine;
pub use status::{AssetRecord, DownloadRecord, DownloadStatus};
pub use tracks::{AvailableTracks, DownloadOptions, Track, TrackSelection, VideoQualityPolicy};
pub use view::{ControlState, Snapshot};
