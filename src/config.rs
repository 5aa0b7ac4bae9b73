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


//! Reconciler configuration
//!
//! Loaded from a JSON file; every field is optional and falls back to the
//! defaults below. `STREAMSYNC_API_KEY` overrides the key from the file.
//!
//! ```json
//! {
//!   "apiKey": "...",
//!   "storageKey": "downloadedAssets",
//!   "videoQuality": "medium",
//!   "engine": { "maxParallelDownloads": 4, "updateFrequencyMS": 1000 }
//! }
//! ```

use crate::download::engine::EngineConfig;
use crate::download::tracks::VideoQualityPolicy;
use crate::error::{Result, StreamSyncError};
use crate::storage::DEFAULT_ASSETS_KEY;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const API_KEY_ENV: &str = "STREAMSYNC_API_KEY";

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconcilerConfig {
    /// Key used to register with the download engine
    pub api_key: String,

    /// Key under which the asset list is persisted
    pub storage_key: String,

    /// Which video rendition new downloads fetch
    pub video_quality: VideoQualityPolicy,

    /// Settings pushed to the engine during initialization
    pub engine: EngineConfig,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            storage_key: DEFAULT_ASSETS_KEY.to_string(),
            video_quality: VideoQualityPolicy::default(),
            engine: EngineConfig::default(),
        }
    }
}

// The api key must never end up in logs
impl std::fmt::Debug for ReconcilerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcilerConfig")
            .field("api_key", &"<redacted>")
            .field("storage_key", &self.storage_key)
            .field("video_quality", &self.video_quality)
            .field("engine", &self.engine)
            .finish()
    }
}

impl ReconcilerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Load from a JSON file, then apply environment overrides
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StreamSyncError::ConfigurationError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let mut config: Self = serde_json::from_str(&raw).map_err(|e| {
            StreamSyncError::ConfigurationError(format!("Invalid config {}: {}", path.display(), e))
        })?;
        config.apply_env();
        Ok(config)
    }

    /// Replace the api key with `STREAMSYNC_API_KEY` when it is set
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api_key = key;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(StreamSyncError::ConfigurationError("api key is empty".to_string()));
        }
        if self.storage_key.trim().is_empty() {
            return Err(StreamSyncError::ConfigurationError("storage key is empty".to_string()));
        }
        if self.engine.max_parallel_downloads == 0 {
            return Err(StreamSyncError::ConfigurationError(
                "maxParallelDownloads must be at least 1".to_string(),
            ));
        }
        if self.engine.update_frequency_ms == 0 {
            return Err(StreamSyncError::ConfigurationError(
                "updateFrequencyMS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.storage_key, "downloadedAssets");
        assert_eq!(config.engine.max_parallel_downloads, 4);
        assert_eq!(config.engine.update_frequency_ms, 1000);
        assert_eq!(config.video_quality, VideoQualityPolicy::Medium);
    }

    #[test]
    fn test_validate() {
        assert!(ReconcilerConfig::default().validate().is_err());
        assert!(ReconcilerConfig::new("key").validate().is_ok());

        let mut config = ReconcilerConfig::new("key");
        config.engine.max_parallel_downloads = 0;
        assert!(matches!(config.validate(), Err(StreamSyncError::ConfigurationError(_))));
    }

    #[test]
    fn test_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"apiKey":"abc","videoQuality":"highest","engine":{{"maxParallelDownloads":2,"updateFrequencyMS":250}}}}"#
        )
        .unwrap();

        let config = ReconcilerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.video_quality, VideoQualityPolicy::Highest);
        assert_eq!(config.engine.max_parallel_downloads, 2);
        assert_eq!(config.engine.update_frequency_ms, 250);
        assert_eq!(config.storage_key, "downloadedAssets");
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", ReconcilerConfig::new("secret-key"));
        assert!(!rendered.contains("secret-key"));
    }
}
