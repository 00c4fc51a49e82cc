//! Runs the scripted idlework session and prints the final economy.
//!
//! Usage: `idlework-demo [DATA_DIR]`. Without an argument the bundled
//! catalog is used. Set `RUST_LOG=debug` for per-frame detail.

use idlework_data::load_catalog;
use idlework_demo::bundled_data_dir;
use idlework_demo::session::run_session;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(bundled_data_dir);
    info!(dir = %dir.display(), "loading catalog");
    let catalog = load_catalog(&dir)?;

    let summary = run_session(&catalog)?;

    println!("=== idlework session ===");
    println!(
        "{} frames, {} fixed updates, {} rejected commands",
        summary.frames, summary.fixed_updates, summary.rejected_commands
    );
    if let Some(report) = &summary.pause_credit {
        println!("pause credit: {:.0}s", report.credited_seconds);
    }
    if let Some(report) = &summary.resume_credit {
        println!("offline credit: {:.0}s", report.credited_seconds);
        for (key, gain) in &report.gains {
            println!("  +{gain:.2} {key}");
        }
    }
    println!("snapshot: {} bytes", summary.snapshot_bytes);
    for view in &summary.resources {
        let cap = view
            .max_amount
            .map(|m| format!("{m:.0}"))
            .unwrap_or_else(|| "-".into());
        println!(
            "  [{:>8}] {:>10.2} / {cap:<6} {:+.3}/s{}",
            view.key,
            view.amount,
            view.per_second,
            if view.unlocked { "" } else { " (locked)" }
        );
    }
    Ok(())
}
