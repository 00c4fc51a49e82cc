//! The simulation clock: wall time to game time, the fixed-timestep loop,
//! pause/resume, and offline reconciliation.
//!
//! The clock owns no economy state. Every operation takes the current wall
//! time, the [`Simulation`] to drive, and the [`TimestampStore`] holding the
//! last-save time, so the same clock logic runs against the real economy or
//! a test double.
//!
//! # Frame loop
//!
//! ```text
//! elapsed      = clamp(now - last_tick, min_tick, max_tick)
//! accumulated += elapsed
//! while accumulated >= step and updates < max_updates:
//!     accumulated -= step
//!     tick += 1
//!     advance(step)                    (panics are caught and logged)
//!     every recalc_interval ticks:  recalculate()
//!     every persist_interval ticks: save(now)
//! if the cap was hit with more than one step left: accumulated = 0
//! ```

use crate::config::ClockConfig;
use crate::sim::{ClockState, ClockStatus, FrameReport, OfflineReport, Simulation};
use crate::time::{Millis, TimestampStore, seconds_between};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info};

/// Slack when comparing the accumulator against the fixed step, so ten
/// 0.1 s steps fit in one second.
const STEP_EPSILON: f64 = 1e-9;

/// Fixed-step clock that drives a [`Simulation`] from wall time.
#[derive(Debug, Clone)]
pub struct SimClock {
    config: ClockConfig,
    state: ClockState,
    /// Wall time the previous frame (or start/resume) was observed.
    last_tick: Option<Millis>,
    paused_at: Option<Millis>,
    accumulated: f64,
    game_time: f64,
    tick: u64,
    faults: u64,
}

impl SimClock {
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config,
            state: ClockState::Stopped,
            last_tick: None,
            paused_at: None,
            accumulated: 0.0,
            game_time: 0.0,
            tick: 0,
            faults: 0,
        }
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Current run state.
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Number of fixed updates applied so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Snapshot of state, tick and accumulated time.
    pub fn status(&self) -> ClockStatus {
        ClockStatus {
            state: self.state,
            tick: self.tick,
            game_time: self.game_time,
            accumulated: self.accumulated,
            faults: self.faults,
        }
    }

    /// Set the counters carried by a save.
    pub(crate) fn restore(&mut self, tick: u64, game_time: f64) {
        self.tick = tick;
        self.game_time = game_time.max(0.0);
        self.accumulated = 0.0;
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Begin running from `Stopped`. Returns false in any other state.
    pub fn start(&mut self, now: Millis) -> bool {
        if self.state != ClockState::Stopped {
            return false;
        }
        self.state = ClockState::Running;
        self.last_tick = Some(now);
        self.paused_at = None;
        info!(tick = self.tick, "clock started");
        true
    }

    /// Stop from `Running` or `Paused`, saving the timestamp. Game time and
    /// the tick counter are kept. Returns false if already stopped.
    pub fn stop(&mut self, now: Millis, store: &mut dyn TimestampStore) -> bool {
        if self.state == ClockState::Stopped {
            return false;
        }
        store.save(now);
        self.state = ClockState::Stopped;
        self.last_tick = None;
        self.paused_at = None;
        info!(tick = self.tick, game_time = self.game_time, "clock stopped");
        true
    }

    /// Suspend a running clock (host hidden). The timestamp is saved so a
    /// long absence can be credited on resume.
    pub fn pause(&mut self, now: Millis, store: &mut dyn TimestampStore) -> bool {
        if self.state != ClockState::Running {
            return false;
        }
        store.save(now);
        self.state = ClockState::Paused;
        self.paused_at = Some(now);
        info!(tick = self.tick, "clock paused");
        true
    }

    /// Continue a paused clock. A pause longer than the long-pause threshold
    /// is credited as offline progress when offline processing is enabled;
    /// shorter pauses are simply not simulated.
    pub fn resume(
        &mut self,
        now: Millis,
        sim: &mut dyn Simulation,
        store: &mut dyn TimestampStore,
    ) -> Option<OfflineReport> {
        if self.state != ClockState::Paused {
            return None;
        }
        let gap = self
            .paused_at
            .map(|at| seconds_between(at, now))
            .unwrap_or(0.0);
        self.state = ClockState::Running;
        self.paused_at = None;
        self.last_tick = Some(now);
        info!(gap_seconds = gap, "clock resumed");

        if gap > self.config.long_pause_threshold_seconds && self.config.offline_enabled {
            self.credit_since_save(now, sim, store)
        } else {
            None
        }
    }

    // -----------------------------------------------------------------------
    // Frame
    // -----------------------------------------------------------------------

    /// Handle one host trigger. Does nothing unless running.
    pub fn frame(
        &mut self,
        now: Millis,
        sim: &mut dyn Simulation,
        store: &mut dyn TimestampStore,
    ) -> FrameReport {
        let mut report = FrameReport::default();
        if self.state != ClockState::Running {
            return report;
        }

        // A clock that went backwards reads as zero elapsed and is raised to
        // the minimum tick.
        let raw = self
            .last_tick
            .map(|last| seconds_between(last, now))
            .unwrap_or(0.0);
        let elapsed = raw.clamp(self.config.min_tick_seconds, self.config.max_tick_seconds);
        self.last_tick = Some(now);
        self.accumulated += elapsed;

        let step = self.config.fixed_step_seconds;
        while self.accumulated + STEP_EPSILON >= step
            && report.fixed_updates < self.config.max_updates_per_frame
        {
            self.accumulated = (self.accumulated - step).max(0.0);
            self.tick += 1;
            self.game_time += step;
            report.fixed_updates += 1;

            let tick = self.tick;
            let recalc = tick % self.config.recalc_interval_ticks.max(1) == 0;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                sim.advance(step);
                if recalc {
                    sim.recalculate();
                }
            }));
            match outcome {
                Ok(()) => report.recalculated |= recalc,
                Err(payload) => {
                    self.faults += 1;
                    report.faults += 1;
                    error!(tick, reason = %panic_message(payload.as_ref()), "fixed update panicked");
                }
            }

            if tick % self.config.persist_interval_ticks.max(1) == 0 {
                store.save(now);
                report.persisted = true;
            }
        }

        if report.fixed_updates >= self.config.max_updates_per_frame
            && self.accumulated > step + STEP_EPSILON
        {
            debug!(
                dropped_seconds = self.accumulated,
                "update cap reached; discarding backlog"
            );
            self.accumulated = 0.0;
            report.remainder_discarded = true;
        }
        report
    }

    // -----------------------------------------------------------------------
    // Offline progress
    // -----------------------------------------------------------------------

    /// Credit the time since the last save as offline progress, scaled by
    /// the offline efficiency and capped, then save `now`. Reconciling the
    /// same gap twice credits it once.
    ///
    /// A running clock has already simulated that time in fixed updates, so
    /// it only records `now` and credits nothing. Paused clocks are credited
    /// through [`resume`](Self::resume).
    pub fn reconcile_offline(
        &mut self,
        now: Millis,
        sim: &mut dyn Simulation,
        store: &mut dyn TimestampStore,
    ) -> Option<OfflineReport> {
        match self.state {
            ClockState::Stopped => self.credit_since_save(now, sim, store),
            ClockState::Running => {
                store.save(now);
                None
            }
            ClockState::Paused => None,
        }
    }

    fn credit_since_save(
        &mut self,
        now: Millis,
        sim: &mut dyn Simulation,
        store: &mut dyn TimestampStore,
    ) -> Option<OfflineReport> {
        if !self.config.offline_enabled {
            store.save(now);
            return None;
        }
        let Some(saved) = store.load() else {
            store.save(now);
            return None;
        };
        if now <= saved {
            return None;
        }

        let wall_seconds = seconds_between(saved, now);
        let credited_seconds =
            (wall_seconds * self.config.offline_efficiency).min(self.config.max_offline_seconds);
        store.save(now);
        if self.state == ClockState::Running {
            self.last_tick = Some(now);
        }
        if credited_seconds <= 0.0 {
            return None;
        }

        let gains = sim.credit_offline(credited_seconds);
        info!(
            wall_seconds,
            credited_seconds,
            resources = gains.len(),
            "offline progress credited"
        );
        Some(OfflineReport {
            wall_seconds,
            credited_seconds,
            gains,
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
