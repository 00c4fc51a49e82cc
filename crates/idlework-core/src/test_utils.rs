//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::catalog::{ResourceEntry, StructureEntry};
use crate::config::EconomyConfig;
use crate::economy::Economy;
use crate::engine::Game;
use crate::time::{Millis, ManualTimeSource};

/// An arbitrary wall-clock origin for manual time sources.
pub const T0: Millis = 1_700_000_000_000;

// ===========================================================================
// Catalogs
// ===========================================================================

/// gold (100, capped at 1000), wood (20), and threat, a fixed 0.5/s
/// resource capped at 100.
pub fn sample_resources() -> Vec<ResourceEntry> {
    vec![
        ResourceEntry::new("gold", "Gold", 100.0, 0.0, true).with_max(1000.0),
        ResourceEntry::new("wood", "Wood", 20.0, 0.0, true),
        ResourceEntry::new("threat", "Threat", 0.0, 0.0, true)
            .with_max(100.0)
            .with_fixed_rate(0.5),
    ]
}

/// mine (unlocked, 50 gold, 1 gold/s, 5 workers) and lumber_camp (locked,
/// 30 gold + 10 wood, 2 wood/s, 4 workers).
pub fn sample_structures() -> Vec<StructureEntry> {
    vec![
        StructureEntry::new("mine", "Mine", true, 10, 5)
            .with_cost("gold", 50.0)
            .with_production("gold", 1.0),
        StructureEntry::new("lumber_camp", "Lumber Camp", false, 5, 4)
            .with_cost("gold", 30.0)
            .with_cost("wood", 10.0)
            .with_production("wood", 2.0),
    ]
}

pub fn sample_economy(config: &EconomyConfig) -> Economy {
    Economy::new(config, sample_resources(), sample_structures())
}

// ===========================================================================
// Games
// ===========================================================================

/// A game over the sample catalog on a manual clock at [`T0`]. The returned
/// time source shares its reading with the game.
pub fn sample_game() -> (Game, ManualTimeSource) {
    sample_game_with(EconomyConfig::default())
}

pub fn sample_game_with(config: EconomyConfig) -> (Game, ManualTimeSource) {
    let time = ManualTimeSource::new(T0);
    let game = Game::builder(config)
        .resources(sample_resources())
        .structures(sample_structures())
        .time_source(time.clone())
        .build()
        .expect("sample configuration is valid");
    (game, time)
}

/// Run `frames` frames, advancing the clock by `frame_millis` before each.
pub fn run_frames(game: &mut Game, time: &ManualTimeSource, frames: usize, frame_millis: u64) {
    for _ in 0..frames {
        time.advance_millis(frame_millis);
        game.frame();
    }
}
