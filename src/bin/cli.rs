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


use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use streamsync_core::catalog::{demo_catalog, find_video, VideoItem};
use streamsync_core::download::progress::{display_string, eta_string, RateTracker};
use streamsync_core::download::{DownloadReconciler, DownloadStatus, SimulatedEngine};
use streamsync_core::storage::{AssetCache, Database, KeyValueStore, MemoryStore};
use streamsync_core::ReconcilerConfig;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "streamsync-cli")]
#[command(about = "StreamSync CLI - Desktop testing tool", long_about = None)]
struct Cli {
    /// SQLite database for the asset cache (default: platform data dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Keep the asset cache in memory only
    #[arg(long, global = true, conflicts_with = "db")]
    in_memory: bool,

    /// JSON config file (apiKey, storageKey, videoQuality, engine)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Engine api key (overrides config and STREAMSYNC_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the demo catalog
    Catalog,
    /// Download catalog videos with the simulated engine
    Demo {
        /// Catalog ids to download (default: all)
        ids: Vec<String>,
        /// Progress added per engine tick
        #[arg(long, default_value_t = 0.1)]
        step: f64,
        /// Milliseconds between engine ticks
        #[arg(long, default_value_t = 200)]
        tick_ms: u64,
    },
    /// Show cached downloaded assets
    Assets,
    /// Show where a catalog video plays from
    Status {
        /// Catalog id
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?cli, "CLI arguments parsed");

    match &cli.command {
        Commands::Catalog => print_catalog(),
        Commands::Demo { ids, step, tick_ms } => run_demo(&cli, ids, *step, *tick_ms).await?,
        Commands::Assets => print_assets(&cli).await?,
        Commands::Status { id } => print_status(&cli, id).await?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<ReconcilerConfig> {
    let mut config = match &cli.config {
        Some(path) => ReconcilerConfig::from_json_file(path)?,
        None => {
            let mut config = ReconcilerConfig::default();
            config.apply_env();
            config
        }
    };
    if let Some(key) = &cli.api_key {
        config.api_key = key.clone();
    }
    Ok(config)
}

async fn open_store(cli: &Cli) -> Result<Arc<dyn KeyValueStore>> {
    if cli.in_memory {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let path = cli.db.clone().unwrap_or_else(Database::get_default_path);
    let db = Database::new(&path)
        .await
        .with_context(|| format!("opening database {}", path.display()))?;
    info!(path = %path.display(), "using asset cache database");
    Ok(Arc::new(db))
}

fn print_catalog() {
    for video in demo_catalog() {
        let kind = if video.is_hls() { "hls" } else { "mp4" };
        println!("{:>2}  {:<20} {:>4}  [{}]  {}", video.id, video.title, video.duration, kind, video.url);
    }
}

fn selected_videos(ids: &[String]) -> Result<Vec<VideoItem>> {
    let catalog = demo_catalog();
    if ids.is_empty() {
        return Ok(catalog);
    }
    ids.iter()
        .map(|id| match find_video(&catalog, id) {
            Some(video) => Ok(video.clone()),
            None => bail!("no catalog video with id {}", id),
        })
        .collect()
}

async fn run_demo(cli: &Cli, ids: &[String], step: f64, tick_ms: u64) -> Result<()> {
    let videos = selected_videos(ids)?;
    let mut config = load_config(cli)?;
    if config.api_key.trim().is_empty() {
        // The simulated engine accepts any non-empty key
        config.api_key = "demo".to_string();
    }
    config.engine.update_frequency_ms = tick_ms.max(1);

    let download_dir = std::env::temp_dir().join("streamsync-demo");
    let engine = Arc::new(SimulatedEngine::new(&download_dir).with_progress_step(step));
    let store = open_store(cli).await?;
    let reconciler = Arc::new(DownloadReconciler::new(engine, store, config));

    let _events = reconciler.attach();
    reconciler.initialize().await?;

    let results = join_all(videos.iter().map(|v| reconciler.start_with_policy(&v.url))).await;
    let mut started = Vec::new();
    for (video, result) in videos.into_iter().zip(results) {
        match result {
            Ok(id) => {
                info!(title = %video.title, id = %id, "queued");
                started.push(video);
            }
            Err(e) => warn!(title = %video.title, error = %e, "could not start: {}", e.user_message()),
        }
    }
    if started.is_empty() {
        bail!("no downloads could be started");
    }
    let videos = started;

    let mut trackers: HashMap<String, RateTracker> = HashMap::new();
    let mut updates = reconciler.subscribe();
    loop {
        let snapshot = updates.current();

        for video in &videos {
            let record = snapshot.status_of(&video.url);
            let tracker = trackers.entry(video.url.clone()).or_default();
            tracker.add_sample(record.progress);
            if record.status == DownloadStatus::Downloading {
                println!(
                    "{}  eta {}",
                    display_string(&video.title, &record),
                    eta_string(tracker.estimate_time_remaining())
                );
            }
        }

        let settled = videos.iter().all(|v| match snapshot.status_of(&v.url).status {
            DownloadStatus::Completed => snapshot.asset_for_url(&v.url).is_some(),
            DownloadStatus::Canceled | DownloadStatus::Failed => true,
            _ => false,
        });
        if settled {
            break;
        }
        updates.changed().await?;
    }

    for video in &videos {
        println!("{}  ->  {}", video.title, reconciler.playback_uri(&video.url));
    }
    reconciler.teardown().await;
    Ok(())
}

async fn print_assets(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let cache = AssetCache::new(open_store(cli).await?, config.storage_key);
    let assets = cache.load().await?;
    if assets.is_empty() {
        println!("No downloaded assets");
        return Ok(());
    }
    for asset in assets {
        println!("{:<38} {:<20} {}", asset.id, asset.title, asset.local_path);
    }
    Ok(())
}

async fn print_status(cli: &Cli, id: &str) -> Result<()> {
    let catalog = demo_catalog();
    let Some(video) = find_video(&catalog, id) else {
        bail!("no catalog video with id {}", id);
    };

    let config = load_config(cli)?;
    let cache = AssetCache::new(open_store(cli).await?, config.storage_key);
    let assets = cache.load().await?;
    match assets.iter().find(|a| a.url == video.url) {
        Some(asset) => println!("{}: downloaded, plays from {}", video.title, asset.local_path),
        None => println!("{}: not downloaded, streams from {}", video.title, video.url),
    }
    Ok(())
}
