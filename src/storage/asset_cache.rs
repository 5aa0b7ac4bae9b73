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


//! Durable cache of completed assets
//!
//! The list is stored as one JSON document under a single key:
//! `{"savedAt": "<rfc3339>", "assets": [...]}`. A bare JSON array (the
//! format written by earlier app versions) is also accepted on load.

use crate::download::status::AssetRecord;
use crate::error::{Result, StreamSyncError};
use crate::storage::kv::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_ASSETS_KEY: &str = "downloadedAssets";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedAssets {
    saved_at: DateTime<Utc>,
    assets: Vec<AssetRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredAssets {
    Envelope(CachedAssets),
    Bare(Vec<AssetRecord>),
}

/// Reads and writes the asset list through a `KeyValueStore`
#[derive(Clone)]
pub struct AssetCache {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl AssetCache {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the cached list; a missing entry is an empty list
    ///
    /// # Errors
    /// `StorageError` if the entry exists but cannot be parsed.
    pub async fn load(&self) -> Result<Vec<AssetRecord>> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(Vec::new());
        };

        let stored: StoredAssets = serde_json::from_str(&raw).map_err(|e| {
            StreamSyncError::StorageError(format!("Corrupt asset cache under '{}': {}", self.key, e))
        })?;

        Ok(match stored {
            StoredAssets::Envelope(cached) => cached.assets,
            StoredAssets::Bare(assets) => assets,
        })
    }

    /// Overwrite the cached list
    pub async fn save(&self, assets: &[AssetRecord]) -> Result<()> {
        let cached = CachedAssets {
            saved_at: Utc::now(),
            assets: assets.to_vec(),
        };
        let json = serde_json::to_string(&cached)?;
        self.store.set(&self.key, &json).await?;

        tracing::debug!(key = %self.key, count = assets.len(), "saved asset cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::kv::MemoryStore;

    #[tokio::test]
    async fn test_missing_entry_is_empty() {
        let cache = AssetCache::new(Arc::new(MemoryStore::new()), DEFAULT_ASSETS_KEY);
        assert!(cache.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let cache = AssetCache::new(Arc::new(MemoryStore::new()), DEFAULT_ASSETS_KEY);
        let assets = vec![AssetRecord::new("d1", "u1", "/x/u1.mp4", "Sintel")];

        cache.save(&assets).await.unwrap();
        assert_eq!(cache.load().await.unwrap(), assets);
    }

    #[tokio::test]
    async fn test_bare_array_is_accepted() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(DEFAULT_ASSETS_KEY, r#"[{"id":"d1","url":"u1","pathToFile":"/x/u1.mp4","title":"Sintel"}]"#)
            .await
            .unwrap();

        let cache = AssetCache::new(store, DEFAULT_ASSETS_KEY);
        let assets = cache.load().await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].title, "Sintel");
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_storage_error() {
        let store = Arc::new(MemoryStore::new());
        store.set(DEFAULT_ASSETS_KEY, "not json").await.unwrap();

        let cache = AssetCache::new(store, DEFAULT_ASSETS_KEY);
        let err = cache.load().await.unwrap_err();
        assert!(err.is_storage_error());
    }
}
