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


//! In-process download engine for desktop runs and tests
//!
//! Nothing is transferred. Each tick moves every downloading record forward
//! by a fixed step, promotes pending records while slots are free, and
//! completes records that reach 1.0. Like a real engine, a batch may carry
//! the completed tick of a record, followed by a `DownloadEnd`.
//!
//! `SimulatedEngine::new` ticks on its own every `update_frequency_ms`
//! after registration; `SimulatedEngine::manual` only advances on `tick()`.

use crate::download::engine::{DownloadEngine, EngineConfig, EngineEvent};
use crate::download::status::{AssetRecord, DownloadRecord, DownloadStatus};
use crate::download::tracks::{AvailableTracks, DownloadOptions, Track};
use crate::error::{Result, StreamSyncError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

const EVENT_CAPACITY: usize = 256;
const DEFAULT_PROGRESS_STEP: f64 = 0.1;

#[derive(Debug)]
struct SimDownload {
    record: DownloadRecord,
    options: DownloadOptions,
}

#[derive(Debug, Default)]
struct EngineState {
    config: EngineConfig,
    registered: bool,
    downloads: Vec<SimDownload>,
    assets: Vec<AssetRecord>,
    ticker: Option<JoinHandle<()>>,
}

struct Inner {
    state: Mutex<EngineState>,
    events: broadcast::Sender<EngineEvent>,
    download_dir: PathBuf,
    progress_step: f64,
    auto_tick: bool,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(ticker) = self.state.get_mut().ticker.take() {
            ticker.abort();
        }
    }
}

/// Download engine that simulates transfers in memory
#[derive(Clone)]
pub struct SimulatedEngine {
    inner: Arc<Inner>,
}

impl SimulatedEngine {
    /// Engine that ticks on its own once registered
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self::build(download_dir.into(), true)
    }

    /// Engine that only advances when `tick()` is called
    pub fn manual(download_dir: impl Into<PathBuf>) -> Self {
        Self::build(download_dir.into(), false)
    }

    fn build(download_dir: PathBuf, auto_tick: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(EngineState::default()),
                events,
                download_dir,
                progress_step: DEFAULT_PROGRESS_STEP,
                auto_tick,
            }),
        }
    }

    /// Fraction added per tick, clamped to (0, 1]
    pub fn with_progress_step(mut self, step: f64) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.progress_step = step.clamp(0.001, 1.0);
        }
        self
    }

    /// Advance every download by one step and emit the resulting events
    pub async fn tick(&self) {
        self.inner.tick().await;
    }

    /// Options the download was created with
    pub async fn options_for(&self, id: &str) -> Option<DownloadOptions> {
        let state = self.inner.state.lock().await;
        state
            .downloads
            .iter()
            .find(|d| d.record.id.as_deref() == Some(id))
            .map(|d| d.options.clone())
    }

    /// Count of downloads created so far
    pub async fn download_count(&self) -> usize {
        self.inner.state.lock().await.downloads.len()
    }

    async fn require_registered(&self) -> Result<()> {
        if self.inner.state.lock().await.registered {
            Ok(())
        } else {
            Err(StreamSyncError::EngineUnavailable("engine not registered".to_string()))
        }
    }

    fn emit(&self, event: EngineEvent) {
        // No receivers is fine
        let _ = self.inner.events.send(event);
    }
}

impl Inner {
    async fn tick(&self) {
        let (batch, ended) = {
            let mut state = self.state.lock().await;
            let max_parallel = state.config.max_parallel_downloads.max(1);
            let mut active = state
                .downloads
                .iter()
                .filter(|d| d.record.status == DownloadStatus::Downloading)
                .count();

            let mut batch = Vec::new();
            let mut completed = Vec::new();

            for download in state.downloads.iter_mut() {
                let record = &mut download.record;
                if record.status == DownloadStatus::Pending && active < max_parallel {
                    record.status = DownloadStatus::Downloading;
                    active += 1;
                    batch.push(record.clone());
                    continue;
                }
                if record.status != DownloadStatus::Downloading {
                    continue;
                }

                record.progress = (record.progress + self.progress_step).min(1.0);
                if record.progress >= 1.0 - 1e-9 {
                    let id = record.key().to_string();
                    let path = self.download_dir.join(format!("{}.mp4", id));
                    record.progress = 1.0;
                    record.status = DownloadStatus::Completed;
                    record.local_path = Some(path.display().to_string());
                    completed.push(AssetRecord::new(
                        id,
                        record.url.clone(),
                        path.display().to_string(),
                        title_from_url(&record.url),
                    ));
                }
                batch.push(record.clone());
            }

            let ended = !completed.is_empty();
            state.assets.extend(completed);
            (batch, ended)
        };

        if !batch.is_empty() {
            let _ = self.events.send(EngineEvent::ProgressBatch(batch));
        }
        if ended {
            let _ = self.events.send(EngineEvent::DownloadEnd);
        }
    }
}

fn spawn_ticker(inner: &Arc<Inner>, every: Duration) -> JoinHandle<()> {
    let weak: Weak<Inner> = Arc::downgrade(inner);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            inner.tick().await;
        }
    })
}

fn title_from_url(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .to_string()
}

#[async_trait]
impl DownloadEngine for SimulatedEngine {
    async fn configure(&self, config: &EngineConfig) -> Result<()> {
        if config.max_parallel_downloads == 0 || config.update_frequency_ms == 0 {
            return Err(StreamSyncError::ConfigurationError(
                "engine limits must be positive".to_string(),
            ));
        }
        self.inner.state.lock().await.config = config.clone();
        Ok(())
    }

    async fn register(&self, api_key: &str) -> Result<()> {
        if api_key.trim().is_empty() {
            return Err(StreamSyncError::AuthenticationFailed("empty api key".to_string()));
        }

        let mut state = self.inner.state.lock().await;
        state.registered = true;
        if self.inner.auto_tick && state.ticker.is_none() {
            let every = Duration::from_millis(state.config.update_frequency_ms);
            state.ticker = Some(spawn_ticker(&self.inner, every));
        }
        Ok(())
    }

    async fn create_download(&self, url: &str, options: &DownloadOptions) -> Result<DownloadRecord> {
        self.require_registered().await?;
        if url.trim().is_empty() {
            return Err(StreamSyncError::invalid_input("empty url"));
        }

        let record = DownloadRecord::new(Uuid::new_v4().to_string(), url, DownloadStatus::Pending);
        self.inner.state.lock().await.downloads.push(SimDownload {
            record: record.clone(),
            options: options.clone(),
        });
        Ok(record)
    }

    async fn pause(&self, url: &str) -> Result<()> {
        let record = {
            let mut state = self.inner.state.lock().await;
            let download = state
                .downloads
                .iter_mut()
                .find(|d| {
                    d.record.url == url
                        && matches!(d.record.status, DownloadStatus::Pending | DownloadStatus::Downloading)
                })
                .ok_or_else(|| StreamSyncError::InvalidState(format!("nothing to pause for {}", url)))?;
            download.record.status = DownloadStatus::Paused;
            download.record.clone()
        };
        self.emit(EngineEvent::ProgressBatch(vec![record]));
        Ok(())
    }

    async fn resume(&self, url: &str) -> Result<()> {
        let record = {
            let mut state = self.inner.state.lock().await;
            let download = state
                .downloads
                .iter_mut()
                .find(|d| d.record.url == url && d.record.status == DownloadStatus::Paused)
                .ok_or_else(|| StreamSyncError::InvalidState(format!("nothing to resume for {}", url)))?;
            download.record.status = DownloadStatus::Pending;
            download.record.clone()
        };
        self.emit(EngineEvent::ProgressBatch(vec![record]));
        Ok(())
    }

    async fn cancel(&self, id: &str) -> Result<()> {
        {
            let mut state = self.inner.state.lock().await;
            let download = state
                .downloads
                .iter_mut()
                .find(|d| d.record.id.as_deref() == Some(id) && !d.record.is_terminal())
                .ok_or_else(|| StreamSyncError::InvalidState(format!("nothing to cancel for {}", id)))?;
            download.record.status = DownloadStatus::Canceled;
        }
        self.emit(EngineEvent::DownloadEnd);
        Ok(())
    }

    async fn list_statuses(&self) -> Result<Vec<DownloadRecord>> {
        self.require_registered().await?;
        let state = self.inner.state.lock().await;
        Ok(state.downloads.iter().map(|d| d.record.clone()).collect())
    }

    async fn list_assets(&self) -> Result<Vec<AssetRecord>> {
        self.require_registered().await?;
        Ok(self.inner.state.lock().await.assets.clone())
    }

    async fn delete_asset(&self, id: &str) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        let before = state.assets.len();
        state.assets.retain(|a| a.id != id);
        if state.assets.len() == before {
            return Err(StreamSyncError::not_found(id));
        }
        state
            .downloads
            .retain(|d| !(d.record.id.as_deref() == Some(id) && d.record.status == DownloadStatus::Completed));
        Ok(())
    }

    async fn delete_all_assets(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        state.assets.clear();
        state
            .downloads
            .retain(|d| d.record.status != DownloadStatus::Completed);
        Ok(())
    }

    async fn available_tracks(&self, _url: &str) -> Result<AvailableTracks> {
        let track = |id: &str, label: &str| Track {
            id: id.to_string(),
            label: Some(label.to_string()),
            bitrate: None,
            language: None,
        };
        Ok(AvailableTracks {
            video: vec![
                track("video-360p", "360p"),
                track("video-720p", "720p"),
                track("video-1080p", "1080p"),
            ],
            audio: vec![track("audio-en", "English"), track("audio-es", "Spanish")],
            text: vec![track("text-en", "English CC")],
        })
    }

    fn events(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn registered_engine(step: f64) -> SimulatedEngine {
        let engine = SimulatedEngine::manual("/videos").with_progress_step(step);
        engine.register("key").await.unwrap();
        engine
    }

    #[tokio::test]
    async fn test_register_requires_key() {
        let engine = SimulatedEngine::manual("/videos");
        let err = engine.register(" ").await.unwrap_err();
        assert!(matches!(err, StreamSyncError::AuthenticationFailed(_)));
        assert!(engine.list_statuses().await.is_err());
    }

    #[tokio::test]
    async fn test_download_runs_to_completion() {
        let engine = registered_engine(0.5).await;
        let mut events = engine.events();
        let created = engine
            .create_download("https://cdn/sintel.m3u8", &DownloadOptions::default())
            .await
            .unwrap();
        let id = created.id.clone().unwrap();

        engine.tick().await; // pending -> downloading
        engine.tick().await; // 0.5
        engine.tick().await; // 1.0 -> completed

        let statuses = engine.list_statuses().await.unwrap();
        assert_eq!(statuses[0].status, DownloadStatus::Completed);
        assert_eq!(statuses[0].local_path.as_deref(), Some(format!("/videos/{}.mp4", id).as_str()));

        let assets = engine.list_assets().await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].title, "sintel.m3u8");

        let mut saw_end = false;
        while let Ok(event) = events.try_recv() {
            if event == EngineEvent::DownloadEnd {
                saw_end = true;
            }
        }
        assert!(saw_end);
    }

    #[tokio::test]
    async fn test_parallel_limit() {
        let engine = registered_engine(0.1).await;
        engine
            .configure(&EngineConfig { max_parallel_downloads: 1, update_frequency_ms: 10 })
            .await
            .unwrap();
        engine.create_download("u1", &DownloadOptions::default()).await.unwrap();
        engine.create_download("u2", &DownloadOptions::default()).await.unwrap();

        engine.tick().await;
        let statuses = engine.list_statuses().await.unwrap();
        assert_eq!(statuses[0].status, DownloadStatus::Downloading);
        assert_eq!(statuses[1].status, DownloadStatus::Pending);
    }

    #[tokio::test]
    async fn test_pause_resume_cancel() {
        let engine = registered_engine(0.1).await;
        let created = engine.create_download("u1", &DownloadOptions::default()).await.unwrap();
        engine.tick().await;

        engine.pause("u1").await.unwrap();
        engine.tick().await;
        let paused = engine.list_statuses().await.unwrap().remove(0);
        assert_eq!(paused.status, DownloadStatus::Paused);
        assert_eq!(paused.progress, 0.0);

        engine.resume("u1").await.unwrap();
        engine.cancel(created.id.as_deref().unwrap()).await.unwrap();
        let canceled = engine.list_statuses().await.unwrap().remove(0);
        assert_eq!(canceled.status, DownloadStatus::Canceled);
        assert!(engine.resume("u1").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_unknown_asset() {
        let engine = registered_engine(0.1).await;
        let err = engine.delete_asset("missing").await.unwrap_err();
        assert!(err.is_benign());
    }
}
