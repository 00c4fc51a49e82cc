//! The scripted session.

use idlework_core::command_queue::Command;
use idlework_core::config::ConfigError;
use idlework_core::engine::Game;
use idlework_core::id::UpgradeKind;
use idlework_core::query::ResourceView;
use idlework_core::serialize::{self, DeserializeError, SerializeError};
use idlework_core::sim::OfflineReport;
use idlework_core::time::{Millis, ManualTimeSource, MemoryTimestampStore, TimeSource};
use idlework_core::workforce::Strategy;
use idlework_data::Catalog;
use tracing::{info, warn};

/// Wall-clock start of every scripted session.
pub const SESSION_START: Millis = 1_700_000_000_000;

/// Length of one host frame.
pub const FRAME_MILLIS: u64 = 100;

/// Failure while running a scripted session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Encode(#[from] SerializeError),
    #[error(transparent)]
    Decode(#[from] DeserializeError),
}

/// What a session did, for printing or assertions.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub frames: u32,
    pub fixed_updates: u64,
    pub rejected_commands: usize,
    pub pause_credit: Option<OfflineReport>,
    pub snapshot_bytes: usize,
    pub resume_credit: Option<OfflineReport>,
    /// Resources of the resumed game after its first frame.
    pub resources: Vec<ResourceView>,
}

fn build(catalog: &Catalog, time: &ManualTimeSource) -> Result<Game, ConfigError> {
    catalog
        .clone()
        .into_builder()
        .time_source(time.clone())
        .timestamp_store(MemoryTimestampStore::new())
        .max_history(256)
        .build()
}

/// Advance the manual clock by `seconds` in host frames.
fn play(game: &mut Game, time: &ManualTimeSource, seconds: u64, summary: &mut SessionSummary) {
    for _ in 0..seconds * 1_000 / FRAME_MILLIS {
        time.advance_millis(FRAME_MILLIS);
        let report = game.frame();
        summary.frames += 1;
        summary.fixed_updates += u64::from(report.fixed_updates);
        for result in &report.commands {
            if let Err(rejection) = result {
                warn!(%rejection, "command rejected");
                summary.rejected_commands += 1;
            }
        }
    }
}

fn log_resources(label: &str, game: &Game) {
    for view in game.economy().resources() {
        info!(
            stage = label,
            resource = %view.key,
            amount = %format!("{:.2}", view.amount),
            per_second = %format!("{:.3}", view.per_second),
            unlocked = view.unlocked,
            "resource"
        );
    }
}

/// Play the scripted session against `catalog`.
pub fn run_session(catalog: &Catalog) -> Result<SessionSummary, SessionError> {
    let time = ManualTimeSource::new(SESSION_START);
    let mut game = build(catalog, &time)?;
    let mut summary = SessionSummary {
        frames: 0,
        fixed_updates: 0,
        rejected_commands: 0,
        pause_credit: None,
        snapshot_bytes: 0,
        resume_credit: None,
        resources: Vec::new(),
    };

    game.start();
    game.submit_batch((0..5).map(|_| Command::Click {
        resource: "gold".into(),
    }));
    game.submit_batch([
        Command::Purchase {
            structure: "mine".into(),
        },
        Command::AutoAssignWorkers {
            strategy: Strategy::Efficiency,
        },
    ]);
    play(&mut game, &time, 30, &mut summary);
    log_resources("opening", &game);

    game.submit_batch([
        Command::UnlockStructure {
            structure: "lumber_camp".into(),
        },
        Command::Purchase {
            structure: "lumber_camp".into(),
        },
        Command::SetStage { stage: 1 },
        Command::AutoAssignWorkers {
            strategy: Strategy::Balanced,
        },
        Command::UpgradeResource {
            resource: "gold".into(),
            kind: UpgradeKind::Passive,
        },
        // Still locked; rejected.
        Command::Purchase {
            structure: "quarry".into(),
        },
    ]);
    play(&mut game, &time, 60, &mut summary);

    game.pause();
    time.advance_secs(600.0);
    summary.pause_credit = game.resume();
    if let Some(report) = &summary.pause_credit {
        info!(credited = report.credited_seconds, "credited long pause");
    }
    play(&mut game, &time, 10, &mut summary);
    log_resources("before save", &game);

    game.stop();
    let bytes = serialize::encode(&game.snapshot())?;
    summary.snapshot_bytes = bytes.len();
    info!(bytes = bytes.len(), tick = game.status().tick, "saved");

    // An hour later, in a fresh process.
    let later = ManualTimeSource::new(time.now_millis() + 3_600_000);
    let mut resumed = build(catalog, &later)?;
    resumed.restore(&serialize::decode(&bytes)?);
    summary.resume_credit = resumed.start();
    play(&mut resumed, &later, 1, &mut summary);
    log_resources("resumed", &resumed);

    summary.resources = resumed.economy().resources();
    Ok(summary)
}
