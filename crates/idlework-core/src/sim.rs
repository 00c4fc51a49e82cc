//! Clock state and report types, and the [`Simulation`] seam the clock
//! drives.

use crate::command_queue::CommandResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Clock state
// ---------------------------------------------------------------------------

/// Lifecycle of the simulation clock. `Stopped` is initial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockState {
    #[default]
    Stopped,
    Running,
    /// The host is hidden or backgrounded.
    Paused,
}

/// Read-only view of the clock for the query surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockStatus {
    pub state: ClockState,
    pub tick: u64,
    /// Game seconds simulated by fixed updates since the clock was created.
    pub game_time: f64,
    /// Unspent time waiting for the next fixed update.
    pub accumulated: f64,
    pub faults: u64,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What one frame did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub fixed_updates: u32,
    /// The update cap was hit and the backlog beyond one step was dropped.
    pub remainder_discarded: bool,
    /// Fixed updates that panicked and were skipped.
    pub faults: u32,
    pub recalculated: bool,
    pub persisted: bool,
    /// Results of queued commands drained before the fixed updates.
    pub commands: Vec<CommandResult>,
}

/// Outcome of crediting an absence as offline progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineReport {
    /// Real seconds since the last save.
    pub wall_seconds: f64,
    /// Game seconds actually credited after the efficiency factor and cap.
    pub credited_seconds: f64,
    /// Amount gained per resource key. Resources that did not change are
    /// omitted.
    pub gains: BTreeMap<String, f64>,
}

// ---------------------------------------------------------------------------
// Simulation seam
// ---------------------------------------------------------------------------

/// What the clock needs from the economy it drives.
pub trait Simulation {
    /// Accrue `seconds` of production at the current rates.
    fn advance(&mut self, seconds: f64);

    /// Rebuild derived rates from structural state.
    fn recalculate(&mut self);

    /// Current amount of every resource, keyed by resource key.
    fn amounts(&self) -> BTreeMap<String, f64>;

    /// Credit an offline lump sum and report the gains. Rates are refreshed
    /// first so the credit reflects current structures.
    fn credit_offline(&mut self, seconds: f64) -> BTreeMap<String, f64> {
        let before = self.amounts();
        self.recalculate();
        self.advance(seconds);
        self.amounts()
            .into_iter()
            .filter_map(|(key, after)| {
                let gain = after - before.get(&key).copied().unwrap_or(0.0);
                (gain != 0.0).then_some((key, gain))
            })
            .collect()
    }
}
