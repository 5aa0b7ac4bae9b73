/// Walk one download through its whole lifecycle against the simulated engine
/// Run with: cargo run --example simulated_session

use std::sync::Arc;

use streamsync_core::catalog::demo_catalog;
use streamsync_core::download::progress::display_string;
use streamsync_core::download::{ControlState, DownloadReconciler, SimulatedEngine};
use streamsync_core::storage::MemoryStore;
use streamsync_core::ReconcilerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== StreamSync - Simulated Session ===\n");

    let engine = Arc::new(SimulatedEngine::manual(std::env::temp_dir().join("streamsync-demo")).with_progress_step(0.25));
    let reconciler = Arc::new(DownloadReconciler::new(
        engine.clone(),
        Arc::new(MemoryStore::new()),
        ReconcilerConfig::new("demo"),
    ));
    let _events = reconciler.attach();
    reconciler.initialize().await?;
    println!("✓ Engine ready");

    let video = &demo_catalog()[0];
    let id = reconciler.start_with_policy(&video.url).await?;
    println!("✓ Started {} ({})", video.title, id);

    let mut updates = reconciler.subscribe();
    while reconciler.assets().is_empty() {
        engine.tick().await;
        let snapshot = updates.changed().await?;
        println!("  {}", display_string(&video.title, &snapshot.status_of(&video.url)));
    }

    match reconciler.controls(&video.url) {
        ControlState::Completed { asset_id } => println!("✓ Downloaded as {:?}", asset_id),
        other => println!("✗ Unexpected controls: {:?}", other),
    }
    println!("  Plays from {}", reconciler.playback_uri(&video.url));

    reconciler.delete_asset(&id).await?;
    println!("✓ Deleted, plays from {}", reconciler.playback_uri(&video.url));

    println!("\n=== Session complete ===");
    Ok(())
}
