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


//! Scripted engine for integration tests
//!
//! Answers come from lists the test sets up. Every call is counted and any
//! call can be made to fail.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use streamsync_core::download::{
    AssetRecord, AvailableTracks, DownloadEngine, DownloadOptions, DownloadRecord, DownloadStatus,
    EngineConfig, EngineEvent, Track,
};
use streamsync_core::{Result, StreamSyncError};
use tokio::sync::{broadcast, Mutex};

#[derive(Default)]
struct Script {
    statuses: Vec<DownloadRecord>,
    assets: Vec<AssetRecord>,
    failing: Vec<&'static str>,
    calls: HashMap<&'static str, usize>,
    /// Delays applied to list_statuses calls, consumed in call order
    status_delays: Vec<Duration>,
    next_id: usize,
}

#[derive(Clone)]
pub struct ScriptedEngine {
    script: Arc<Mutex<Script>>,
    events: broadcast::Sender<EngineEvent>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            script: Arc::new(Mutex::new(Script::default())),
            events,
        }
    }

    pub async fn set_statuses(&self, statuses: Vec<DownloadRecord>) {
        self.script.lock().await.statuses = statuses;
    }

    pub async fn set_assets(&self, assets: Vec<AssetRecord>) {
        self.script.lock().await.assets = assets;
    }

    /// Make every call of `operation` fail until `heal` is called
    pub async fn fail(&self, operation: &'static str) {
        self.script.lock().await.failing.push(operation);
    }

    pub async fn heal(&self, operation: &'static str) {
        self.script.lock().await.failing.retain(|op| *op != operation);
    }

    pub async fn delay_next_status_lists(&self, delays: Vec<Duration>) {
        self.script.lock().await.status_delays = delays;
    }

    pub async fn calls(&self, operation: &str) -> usize {
        self.script.lock().await.calls.get(operation).copied().unwrap_or(0)
    }

    pub fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    pub fn sender(&self) -> broadcast::Sender<EngineEvent> {
        self.events.clone()
    }

    async fn record_call(&self, operation: &'static str) -> Result<()> {
        let mut script = self.script.lock().await;
        *script.calls.entry(operation).or_default() += 1;
        if script.failing.contains(&operation) {
            return Err(StreamSyncError::EngineUnavailable(format!("{} scripted to fail", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl DownloadEngine for ScriptedEngine {
    async fn configure(&self, _config: &EngineConfig) -> Result<()> {
        self.record_call("configure").await
    }

    async fn register(&self, api_key: &str) -> Result<()> {
        self.record_call("register").await?;
        if api_key.is_empty() {
            return Err(StreamSyncError::AuthenticationFailed("empty api key".to_string()));
        }
        Ok(())
    }

    async fn create_download(&self, url: &str, _options: &DownloadOptions) -> Result<DownloadRecord> {
        self.record_call("create_download").await?;
        let mut script = self.script.lock().await;
        script.next_id += 1;
        let record = DownloadRecord::new(format!("d{}", script.next_id), url, DownloadStatus::Pending);
        script.statuses.push(record.clone());
        Ok(record)
    }

    async fn pause(&self, _url: &str) -> Result<()> {
        self.record_call("pause").await
    }

    async fn resume(&self, _url: &str) -> Result<()> {
        self.record_call("resume").await
    }

    async fn cancel(&self, _id: &str) -> Result<()> {
        self.record_call("cancel").await
    }

    async fn list_statuses(&self) -> Result<Vec<DownloadRecord>> {
        self.record_call("list_statuses").await?;
        let (statuses, delay) = {
            let mut script = self.script.lock().await;
            let delay = if script.status_delays.is_empty() {
                None
            } else {
                Some(script.status_delays.remove(0))
            };
            (script.statuses.clone(), delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(statuses)
    }

    async fn list_assets(&self) -> Result<Vec<AssetRecord>> {
        self.record_call("list_assets").await?;
        Ok(self.script.lock().await.assets.clone())
    }

    async fn delete_asset(&self, id: &str) -> Result<()> {
        self.record_call("delete_asset").await?;
        let mut script = self.script.lock().await;
        let before = script.assets.len();
        script.assets.retain(|a| a.id != id);
        if script.assets.len() == before {
            return Err(StreamSyncError::not_found(id));
        }
        script.statuses.retain(|r| r.id.as_deref() != Some(id));
        Ok(())
    }

    async fn delete_all_assets(&self) -> Result<()> {
        self.record_call("delete_all_assets").await?;
        let mut script = self.script.lock().await;
        script.assets.clear();
        script.statuses.retain(|r| r.status != DownloadStatus::Completed);
        Ok(())
    }

    async fn available_tracks(&self, _url: &str) -> Result<AvailableTracks> {
        self.record_call("available_tracks").await?;
        Ok(AvailableTracks {
            video: vec![Track::new("v0"), Track::new("v1"), Track::new("v2")],
            audio: vec![Track::new("a0")],
            text: Vec::new(),
        })
    }

    fn events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

/// Route library logs to the test harness; RUST_LOG=debug shows them
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Completed record and matching asset for `url`
pub fn completed(id: &str, url: &str) -> (DownloadRecord, AssetRecord) {
    let path = format!("/downloads/{}.mp4", id);
    (
        DownloadRecord::new(id, url, DownloadStatus::Downloading).completed_at(&path),
        AssetRecord::new(id, url, path, id),
    )
}
