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


//! Download engine interface
//!
//! The engine does the actual transfer, muxing and storage. The core only
//! talks to it through this trait and listens to its event stream.
//!
//! # Event contract
//! - `ProgressBatch` carries the records that changed since the last batch.
//!   Updates are ordered per id, not across ids.
//! - `DownloadEnd` carries nothing; it means some download finished, failed
//!   or was cancelled, and the client should refetch.

use crate::download::status::{AssetRecord, DownloadRecord};
use crate::download::tracks::{AvailableTracks, DownloadOptions};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Engine tuning pushed before registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Maximum downloads transferring at once
    pub max_parallel_downloads: usize,

    /// Interval between progress batches
    #[serde(rename = "updateFrequencyMS")]
    pub update_frequency_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parallel_downloads: 4,
            update_frequency_ms: 1000,
        }
    }
}

/// Notification emitted by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ProgressBatch(Vec<DownloadRecord>),
    DownloadEnd,
}

/// Capabilities the reconciler needs from a download engine
#[async_trait]
pub trait DownloadEngine: Send + Sync {
    /// Apply engine-wide settings
    async fn configure(&self, config: &EngineConfig) -> Result<()>;

    /// Register with the engine; fails with `AuthenticationFailed` on a bad key
    async fn register(&self, api_key: &str) -> Result<()>;

    /// Create a download and return the engine's first view of it
    async fn create_download(&self, url: &str, options: &DownloadOptions) -> Result<DownloadRecord>;

    async fn pause(&self, url: &str) -> Result<()>;

    async fn resume(&self, url: &str) -> Result<()>;

    async fn cancel(&self, id: &str) -> Result<()>;

    /// Authoritative list of every download the engine knows about
    async fn list_statuses(&self) -> Result<Vec<DownloadRecord>>;

    /// Authoritative list of completed assets
    async fn list_assets(&self) -> Result<Vec<AssetRecord>>;

    /// Delete one asset; fails with `AssetNotFound` for unknown ids
    async fn delete_asset(&self, id: &str) -> Result<()>;

    async fn delete_all_assets(&self) -> Result<()>;

    async fn available_tracks(&self, url: &str) -> Result<AvailableTracks>;

    /// Subscribe to the engine's event stream
    fn events(&self) -> broadcast::Receiver<EngineEvent>;
}
