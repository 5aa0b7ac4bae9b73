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


//! StreamSync core
//!
//! Native core of the offline video app. Tracks which videos are
//! downloading or downloaded through an external download engine and keeps
//! the completed-asset list cached on the device.

pub mod catalog;
pub mod config;
pub mod download;
pub mod error;
pub mod storage;

pub use config::ReconcilerConfig;
pub use download::{DownloadReconciler, DownloadStatus};
pub use error::{Result, StreamSyncError};
