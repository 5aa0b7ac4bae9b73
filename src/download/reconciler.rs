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


//! Download-status reconciler
//!
//! Keeps the app's view of downloads and assets in line with the engine:
//! - Forwards user intents (start, pause, resume, cancel, delete) to the engine
//! - Merges progress batches into the in-flight collection
//! - Replaces both collections wholesale after every `DownloadEnd`
//! - Persists the asset list on every change
//! - Publishes an immutable `Snapshot` after every mutation
//!
//! The engine is the source of truth. Pause, resume and cancel never touch
//! local state; their effect arrives through the event stream.
//!
//! # Resync ordering
//! Every resync takes a ticket when it is issued. Its result is applied only
//! if no resync issued later has been applied already, so the latest
//! authoritative read wins and a slow, older read cannot roll state back.
//!
//! # Usage Example
//! ```no_run
//! use std::sync::Arc;
//! use streamsync_core::config::ReconcilerConfig;
//! use streamsync_core::download::{DownloadReconciler, SimulatedEngine};
//! use streamsync_core::storage::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Arc::new(SimulatedEngine::new("/tmp/videos"));
//! let reconciler = Arc::new(DownloadReconciler::new(
//!     engine,
//!     Arc::new(MemoryStore::new()),
//!     ReconcilerConfig::new("my-api-key"),
//! ));
//! let _events = reconciler.attach();
//! reconciler.initialize().await?;
//! let id = reconciler.start_with_policy("https://cdn.example.com/a.m3u8").await?;
//! println!("started {id}");
//! # Ok(())
//! # }
//! ```

use crate::config::ReconcilerConfig;
use crate::download::engine::{DownloadEngine, EngineEvent};
use crate::download::merge;
use crate::download::status::{AssetRecord, DownloadRecord, DownloadStatus};
use crate::download::tracks::{select_tracks, DownloadOptions};
use crate::download::view::{ControlState, Snapshot};
use crate::error::{Result, StreamSyncError};
use crate::storage::{AssetCache, KeyValueStore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct ReconcilerState {
    ready: bool,
    downloads: Vec<DownloadRecord>,
    assets: Vec<AssetRecord>,
    /// Ticket of the last applied downloads resync
    downloads_ticket: u64,
    /// Ticket of the last applied assets resync
    assets_ticket: u64,
}

impl ReconcilerState {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            ready: self.ready,
            downloads: self.downloads.clone(),
            assets: self.assets.clone(),
        }
    }
}

/// Owns the download and asset collections for one engine
pub struct DownloadReconciler {
    engine: Arc<dyn DownloadEngine>,
    cache: AssetCache,
    config: ReconcilerConfig,
    state: RwLock<ReconcilerState>,
    snapshots: watch::Sender<Arc<Snapshot>>,
    /// Serializes `start` so racing calls for one url create one download
    start_lock: Mutex<()>,
    downloads_tickets: AtomicU64,
    assets_tickets: AtomicU64,
    /// Event pump started by the latest `attach`
    pump: std::sync::Mutex<Option<AbortHandle>>,
}

impl DownloadReconciler {
    pub fn new(
        engine: Arc<dyn DownloadEngine>,
        store: Arc<dyn KeyValueStore>,
        config: ReconcilerConfig,
    ) -> Self {
        let cache = AssetCache::new(store, config.storage_key.clone());
        let (snapshots, _) = watch::channel(Arc::new(Snapshot::default()));

        Self {
            engine,
            cache,
            config,
            state: RwLock::new(ReconcilerState::default()),
            snapshots,
            start_lock: Mutex::new(()),
            downloads_tickets: AtomicU64::new(0),
            assets_tickets: AtomicU64::new(0),
            pump: std::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Register with the engine and load the initial state
    ///
    /// Cached assets are restored first so downloaded files are playable
    /// even when the engine is unreachable. On failure the reconciler stays
    /// not ready and the caller may retry.
    pub async fn initialize(&self) -> Result<()> {
        self.restore_cached_assets().await;

        let result = self.try_initialize().await;
        match &result {
            Ok(()) => {
                let snapshot = self.snapshot();
                info!(
                    downloads = snapshot.downloads.len(),
                    assets = snapshot.assets.len(),
                    "download engine ready"
                );
            }
            Err(e) => error!(error = %e, "failed to initialize download engine"),
        }
        result
    }

    async fn try_initialize(&self) -> Result<()> {
        self.config
            .validate()
            .map_err(|e| StreamSyncError::init_failed("config", e))?;

        self.engine
            .configure(&self.config.engine)
            .await
            .map_err(|e| StreamSyncError::init_failed("configure", e))?;

        self.engine
            .register(&self.config.api_key)
            .await
            .map_err(|e| StreamSyncError::init_failed("register", e))?;

        let downloads_ticket = self.next_downloads_ticket();
        let assets_ticket = self.next_assets_ticket();

        let (statuses, assets) = tokio::try_join!(
            async {
                self.engine
                    .list_statuses()
                    .await
                    .map_err(|e| StreamSyncError::init_failed("list_statuses", e))
            },
            async {
                self.engine
                    .list_assets()
                    .await
                    .map_err(|e| StreamSyncError::init_failed("list_assets", e))
            },
        )?;

        let mut state = self.state.write().await;
        Self::replace_downloads(&mut state, downloads_ticket, statuses);
        if Self::replace_assets(&mut state, assets_ticket, assets) {
            self.persist_assets(&state.assets).await;
        }
        state.ready = true;
        self.publish(&state);
        Ok(())
    }

    /// Drop in-flight state and mark the reconciler not ready
    ///
    /// Stops the attached event pump so later events cannot refill the
    /// downloads. Assets stay cached. Resyncs still in flight are discarded.
    /// Call `attach` again after a new `initialize` to resume event delivery.
    pub async fn teardown(&self) {
        self.stop_pump();
        let ticket = self.next_downloads_ticket();
        let mut state = self.state.write().await;
        state.ready = false;
        state.downloads.clear();
        state.downloads_ticket = ticket;
        self.publish(&state);
        debug!("reconciler torn down");
    }

    async fn restore_cached_assets(&self) {
        let cached = match self.cache.load().await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(error = %e, key = self.cache.key(), "ignoring unreadable asset cache");
                return;
            }
        };

        let mut state = self.state.write().await;
        // An engine read already landed; it is newer than the cache
        if state.assets_ticket > 0 || cached.is_empty() {
            return;
        }
        debug!(count = cached.len(), "restored cached assets");
        state.assets = cached;
        self.publish(&state);
    }

    // ========================================================================
    // Event handling
    // ========================================================================

    /// Spawn the task that feeds engine events into this reconciler
    ///
    /// The task holds only a weak reference. It stops when the returned
    /// handle is dropped or unsubscribed, on `teardown`, or when the
    /// reconciler is dropped. Attaching again replaces the previous pump.
    pub fn attach(self: &Arc<Self>) -> EngineSubscription {
        let mut events = self.engine.events();
        let reconciler: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            loop {
                let received = events.recv().await;
                let Some(reconciler) = reconciler.upgrade() else {
                    break;
                };
                match received {
                    Ok(event) => reconciler.handle_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "engine events lagged, resyncing");
                        reconciler.resync_all().await;
                    }
                    Err(RecvError::Closed) => {
                        debug!("engine event stream closed");
                        break;
                    }
                }
            }
        });

        let previous = self
            .pump
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(handle.abort_handle());
        if let Some(previous) = previous {
            previous.abort();
        }

        EngineSubscription { handle: Some(handle) }
    }

    fn stop_pump(&self) {
        let previous = self
            .pump
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(pump) = previous {
            debug!("stopping engine event pump");
            pump.abort();
        }
    }

    /// Apply one engine event
    pub async fn handle_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::ProgressBatch(batch) => {
                let incoming = batch.len();
                let mut state = self.state.write().await;
                let outcome = merge::merge_progress_batch(&mut state.downloads, batch);
                if outcome.changed() {
                    self.publish(&state);
                }
                debug!(
                    incoming,
                    replaced = outcome.replaced,
                    appended = outcome.appended,
                    skipped_completed = outcome.skipped_completed,
                    "merged progress batch"
                );
            }
            EngineEvent::DownloadEnd => {
                debug!("download end event, resyncing");
                self.resync_all().await;
            }
        }
    }

    // ========================================================================
    // Resync
    // ========================================================================

    /// Replace the downloads collection with the engine's list
    pub async fn refresh_downloads(&self) -> Result<()> {
        let ticket = self.next_downloads_ticket();
        let statuses = self.engine.list_statuses().await.map_err(|e| {
            warn!(error = %e, "failed to fetch download statuses");
            StreamSyncError::operation_failed("list_statuses", e)
        })?;

        let mut state = self.state.write().await;
        if Self::replace_downloads(&mut state, ticket, statuses) {
            self.publish(&state);
        }
        Ok(())
    }

    /// Replace the asset collection with the engine's list
    pub async fn refresh_assets(&self) -> Result<()> {
        let ticket = self.next_assets_ticket();
        let assets = self.engine.list_assets().await.map_err(|e| {
            warn!(error = %e, "failed to fetch downloaded assets");
            StreamSyncError::operation_failed("list_assets", e)
        })?;

        let mut state = self.state.write().await;
        if Self::replace_assets(&mut state, ticket, assets) {
            self.persist_assets(&state.assets).await;
            self.publish(&state);
        }
        Ok(())
    }

    /// Refresh both collections concurrently; failures are logged only
    pub async fn resync_all(&self) {
        let (downloads, assets) = tokio::join!(self.refresh_downloads(), self.refresh_assets());
        if downloads.is_err() || assets.is_err() {
            debug!("resync incomplete, keeping previous state for failed lists");
        }
    }

    fn replace_downloads(state: &mut ReconcilerState, ticket: u64, statuses: Vec<DownloadRecord>) -> bool {
        if ticket < state.downloads_ticket {
            debug!(ticket, applied = state.downloads_ticket, "discarding stale downloads resync");
            return false;
        }
        state.downloads_ticket = ticket;
        merge::replace_all(&mut state.downloads, statuses);
        true
    }

    fn replace_assets(state: &mut ReconcilerState, ticket: u64, assets: Vec<AssetRecord>) -> bool {
        if ticket < state.assets_ticket {
            debug!(ticket, applied = state.assets_ticket, "discarding stale assets resync");
            return false;
        }
        state.assets_ticket = ticket;

        let mut next: Vec<AssetRecord> = Vec::with_capacity(assets.len());
        for asset in assets {
            match next.iter().position(|a| a.id == asset.id) {
                Some(index) => next[index] = asset,
                None => next.push(asset),
            }
        }
        state.assets = next;
        true
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Start downloading `url`, or return the id of its active download
    ///
    /// A paused download is resumed instead of duplicated. After creating a
    /// new download the status list is refetched; the engine's immediate
    /// answer only fills in if the refetch does not show the download yet.
    pub async fn start(&self, url: &str, options: DownloadOptions) -> Result<String> {
        if url.trim().is_empty() {
            return Err(StreamSyncError::invalid_input("download url must not be empty"));
        }

        let _guard = self.start_lock.lock().await;

        if let Some(existing) = self.snapshot().active_record(url).cloned() {
            let id = existing.key().to_string();
            if existing.status == DownloadStatus::Paused {
                debug!(url, id = %id, "start on paused download, resuming");
                self.resume(url).await?;
            } else {
                debug!(url, id = %id, status = %existing.status, "download already active");
            }
            return Ok(id);
        }

        info!(url, "starting download");
        let created = self
            .engine
            .create_download(url, &options)
            .await
            .map_err(|e| Self::operation_error("start", url, e))?;
        let id = created.key().to_string();

        if let Err(e) = self.refresh_downloads().await {
            warn!(url, error = %e, "status refresh after start failed");
        }

        let mut state = self.state.write().await;
        if !state.downloads.iter().any(|r| r.key() == id) {
            let outcome = merge::merge_progress_batch(&mut state.downloads, vec![created]);
            if outcome.changed() {
                self.publish(&state);
            }
        }

        info!(url, id = %id, "download started");
        Ok(id)
    }

    /// Start `url` with tracks chosen by the configured quality policy
    pub async fn start_with_policy(&self, url: &str) -> Result<String> {
        if url.trim().is_empty() {
            return Err(StreamSyncError::invalid_input("download url must not be empty"));
        }

        let available = self
            .engine
            .available_tracks(url)
            .await
            .map_err(|e| Self::operation_error("available_tracks", url, e))?;
        let tracks = select_tracks(&available, self.config.video_quality);
        debug!(url, video = ?tracks.video, audio = tracks.audio.len(), text = tracks.text.len(), "selected tracks");

        self.start(url, DownloadOptions::with_tracks(tracks)).await
    }

    pub async fn pause(&self, url: &str) -> Result<()> {
        self.engine
            .pause(url)
            .await
            .map_err(|e| Self::operation_error("pause", url, e))
    }

    pub async fn resume(&self, url: &str) -> Result<()> {
        self.engine
            .resume(url)
            .await
            .map_err(|e| Self::operation_error("resume", url, e))
    }

    /// Ask the engine to cancel; the canceled state arrives as an event
    pub async fn cancel(&self, id: &str) -> Result<()> {
        self.engine
            .cancel(id)
            .await
            .map_err(|e| Self::operation_error("cancel", id, e))
    }

    /// Delete a downloaded asset
    ///
    /// Unknown ids are a no-op. After the engine call both collections are
    /// refetched.
    pub async fn delete_asset(&self, id: &str) -> Result<()> {
        let snapshot = self.snapshot();
        let known = snapshot.asset(id).is_some()
            || snapshot
                .downloads
                .iter()
                .any(|r| r.id.as_deref() == Some(id) && r.status == DownloadStatus::Completed);
        if !known {
            debug!(id, "ignoring delete of unknown asset");
            return Ok(());
        }

        info!(id, "deleting asset");
        match self.engine.delete_asset(id).await {
            Ok(()) => {}
            Err(e) if e.is_benign() => debug!(id, "engine had already dropped asset"),
            Err(e) => return Err(Self::operation_error("delete_asset", id, e)),
        }

        self.forget_asset(id).await;
        self.resync_all().await;
        Ok(())
    }

    /// Delete every downloaded asset; in-flight downloads are untouched
    pub async fn delete_all(&self) -> Result<()> {
        info!("deleting all assets");
        self.engine
            .delete_all_assets()
            .await
            .map_err(|e| Self::operation_error("delete_all", "*", e))?;

        if let Err(e) = self.refresh_assets().await {
            warn!(error = %e, "asset refresh after delete_all failed");
        }
        Ok(())
    }

    /// Remove an asset locally and invalidate older asset reads
    async fn forget_asset(&self, id: &str) {
        let ticket = self.next_assets_ticket();
        let mut state = self.state.write().await;
        state.assets_ticket = state.assets_ticket.max(ticket);

        let before = state.assets.len();
        state.assets.retain(|a| a.id != id);
        if state.assets.len() != before {
            self.persist_assets(&state.assets).await;
            self.publish(&state);
        }
    }

    fn operation_error(operation: &str, target: &str, err: StreamSyncError) -> StreamSyncError {
        error!(operation, target, error = %err, "engine operation failed");
        StreamSyncError::operation_failed(operation, err)
    }

    // ========================================================================
    // Read model
    // ========================================================================

    /// Latest published state
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshots.borrow().clone()
    }

    /// Watch published snapshots
    pub fn subscribe(&self) -> StatusSubscription {
        StatusSubscription {
            receiver: self.snapshots.subscribe(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot().ready
    }

    /// Current record for `url`, `NotStarted` if nothing is known
    pub fn get_status(&self, url: &str) -> DownloadRecord {
        self.snapshot().status_of(url)
    }

    pub fn downloads(&self) -> Vec<DownloadRecord> {
        self.snapshot().downloads.clone()
    }

    pub fn assets(&self) -> Vec<AssetRecord> {
        self.snapshot().assets.clone()
    }

    /// Local file for `url` if downloaded, else `url` itself
    pub fn playback_uri(&self, url: &str) -> String {
        self.snapshot().playback_uri(url)
    }

    pub fn controls(&self, url: &str) -> ControlState {
        self.snapshot().controls(url)
    }

    // ========================================================================
    // Internal Methods
    // ========================================================================

    fn next_downloads_ticket(&self) -> u64 {
        self.downloads_tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn next_assets_ticket(&self) -> u64 {
        self.assets_tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn publish(&self, state: &ReconcilerState) {
        self.snapshots.send_replace(Arc::new(state.snapshot()));
    }

    /// Write-through of the asset list; failures do not fail the caller
    async fn persist_assets(&self, assets: &[AssetRecord]) {
        if let Err(e) = self.cache.save(assets).await {
            warn!(error = %e, "failed to persist asset list");
        }
    }
}

/// Handle for the engine event pump started by `DownloadReconciler::attach`
#[derive(Debug)]
pub struct EngineSubscription {
    handle: Option<JoinHandle<()>>,
}

impl EngineSubscription {
    /// Stop delivering engine events to the reconciler
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for EngineSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Snapshot watcher handed to the UI layer
#[derive(Debug, Clone)]
pub struct StatusSubscription {
    receiver: watch::Receiver<Arc<Snapshot>>,
}

impl StatusSubscription {
    /// Snapshot at the time of the call
    pub fn current(&self) -> Arc<Snapshot> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next published snapshot
    ///
    /// # Errors
    /// `InvalidState` once the reconciler has been dropped.
    pub async fn changed(&mut self) -> Result<Arc<Snapshot>> {
        self.receiver
            .changed()
            .await
            .map_err(|_| StreamSyncError::InvalidState("reconciler dropped".to_string()))?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    /// Stop watching; dropping the subscription releases the receiver
    pub fn unsubscribe(self) {
        drop(self);
    }
}
