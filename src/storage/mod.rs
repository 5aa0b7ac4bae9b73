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


//! Local persistence
//!
//! Only the list of completed assets is persisted. It is written on every
//! change of the asset collection and read once at startup, so downloaded
//! files stay playable before the engine has answered.
//!
//! # Usage Example
//! ```no_run
//! use std::sync::Arc;
//! use streamsync_core::storage::{AssetCache, Database, DEFAULT_ASSETS_KEY};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new("./streamsync.db").await?;
//! let cache = AssetCache::new(Arc::new(db), DEFAULT_ASSETS_KEY);
//! let assets = cache.load().await?;
//! # Ok(())
//! # }
//! ```

pub mod asset_cache;
pub mod database;
pub mod kv;
pub mod migrations;

// Re-export commonly used types
pub use asset_cache::{AssetCache, DEFAULT_ASSETS_KEY};
pub use database::Database;
pub use kv::{KeyValueStore, MemoryStore};
