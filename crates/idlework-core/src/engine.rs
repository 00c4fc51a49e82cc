//! The game facade: one clock, one economy, a command queue, and the time
//! and timestamp seams, built through [`GameBuilder`].
//!
//! A [`Game`] is `Send`. Hosts that drive it from several threads wrap it in
//! a mutex; queued commands then give one serialization point for every
//! mutation.

use crate::catalog::{ResourceEntry, StructureEntry};
use crate::clock::SimClock;
use crate::command_queue::{Command, CommandQueue, CommandResult};
use crate::config::{ConfigError, EconomyConfig};
use crate::economy::Economy;
use crate::serialize::GameSnapshot;
use crate::sim::{ClockState, ClockStatus, FrameReport, OfflineReport};
use crate::time::{MemoryTimestampStore, Millis, SystemTimeSource, TimeSource, TimestampStore};

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects catalog entries and host services before building a [`Game`].
pub struct GameBuilder {
    config: EconomyConfig,
    resources: Vec<ResourceEntry>,
    structures: Vec<StructureEntry>,
    time_source: Option<Box<dyn TimeSource>>,
    timestamp_store: Option<Box<dyn TimestampStore>>,
    max_history: usize,
}

impl GameBuilder {
    pub fn new(config: EconomyConfig) -> Self {
        Self {
            config,
            resources: Vec::new(),
            structures: Vec::new(),
            time_source: None,
            timestamp_store: None,
            max_history: 0,
        }
    }

    /// Add one resource entry.
    pub fn resource(mut self, entry: ResourceEntry) -> Self {
        self.resources.push(entry);
        self
    }

    pub fn resources(mut self, entries: impl IntoIterator<Item = ResourceEntry>) -> Self {
        self.resources.extend(entries);
        self
    }

    /// Add one structure entry.
    pub fn structure(mut self, entry: StructureEntry) -> Self {
        self.structures.push(entry);
        self
    }

    pub fn structures(mut self, entries: impl IntoIterator<Item = StructureEntry>) -> Self {
        self.structures.extend(entries);
        self
    }

    /// Defaults to [`SystemTimeSource`].
    pub fn time_source(mut self, source: impl TimeSource + 'static) -> Self {
        self.time_source = Some(Box::new(source));
        self
    }

    /// Defaults to an empty [`MemoryTimestampStore`].
    pub fn timestamp_store(mut self, store: impl TimestampStore + 'static) -> Self {
        self.timestamp_store = Some(Box::new(store));
        self
    }

    /// Keep up to `max_history` executed queued commands. 0 disables history.
    pub fn max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Validate the configuration and assemble the game. Catalog problems
    /// do not fail the build; they are listed in the economy's catalog
    /// report.
    pub fn build(self) -> Result<Game, ConfigError> {
        self.config.validate()?;
        let economy = Economy::new(&self.config, self.resources, self.structures);
        Ok(Game {
            clock: SimClock::new(self.config.clock.clone()),
            economy,
            queue: CommandQueue::with_max_history(self.max_history),
            time_source: self
                .time_source
                .unwrap_or_else(|| Box::new(SystemTimeSource)),
            timestamp_store: self
                .timestamp_store
                .unwrap_or_else(|| Box::new(MemoryTimestampStore::new())),
        })
    }
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// A running economy with its clock, command queue and host services.
pub struct Game {
    clock: SimClock,
    economy: Economy,
    queue: CommandQueue,
    time_source: Box<dyn TimeSource>,
    timestamp_store: Box<dyn TimestampStore>,
}

impl Game {
    pub fn builder(config: EconomyConfig) -> GameBuilder {
        GameBuilder::new(config)
    }

    /// Current wall time from the time source.
    pub fn now(&self) -> Millis {
        self.time_source.now_millis()
    }

    // -----------------------------------------------------------------------
    // Clock control
    // -----------------------------------------------------------------------

    /// Start the session: credit any absence since the last save, then run
    /// the clock. Returns `None` when already started or nothing was
    /// credited.
    pub fn start(&mut self) -> Option<OfflineReport> {
        if self.clock.state() != ClockState::Stopped {
            return None;
        }
        let now = self.now();
        let report =
            self.clock
                .reconcile_offline(now, &mut self.economy, self.timestamp_store.as_mut());
        self.clock.start(now);
        report
    }

    /// Stop the clock. Returns false if it was already stopped.
    pub fn stop(&mut self) -> bool {
        let now = self.now();
        self.clock.stop(now, self.timestamp_store.as_mut())
    }

    /// Pause the clock and record the pause time.
    pub fn pause(&mut self) -> bool {
        let now = self.now();
        self.clock.pause(now, self.timestamp_store.as_mut())
    }

    /// Resume a paused clock, crediting a long pause as offline time.
    pub fn resume(&mut self) -> Option<OfflineReport> {
        let now = self.now();
        self.clock
            .resume(now, &mut self.economy, self.timestamp_store.as_mut())
    }

    /// Credit the time since the last save without changing clock state.
    /// Only a stopped game is credited; a running game has already simulated
    /// the gap and a paused one is credited on resume.
    pub fn reconcile_offline(&mut self) -> Option<OfflineReport> {
        let now = self.now();
        self.clock
            .reconcile_offline(now, &mut self.economy, self.timestamp_store.as_mut())
    }

    /// Handle one host trigger: run queued commands, then the clock's fixed
    /// updates.
    pub fn frame(&mut self) -> FrameReport {
        let now = self.now();
        let commands = self.queue.drain(self.clock.tick());
        let results: Vec<CommandResult> =
            commands.iter().map(|cmd| self.economy.apply(cmd)).collect();
        let mut report = self
            .clock
            .frame(now, &mut self.economy, self.timestamp_store.as_mut());
        report.commands = results;
        report
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Queue a command for the next frame.
    pub fn submit(&mut self, command: Command) {
        self.queue.push(command);
    }

    /// Queue several commands in order.
    pub fn submit_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.queue.push_batch(commands);
    }

    /// Run a command now, bypassing the queue.
    pub fn execute(&mut self, command: &Command) -> CommandResult {
        self.economy.apply(command)
    }

    pub fn pending_commands(&self) -> usize {
        self.queue.pending_count()
    }

    pub fn command_history(&self) -> &[(u64, Command)] {
        self.queue.history()
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    pub fn economy(&self) -> &Economy {
        &self.economy
    }

    /// Direct command access. Mutations made here are not recorded in the
    /// command history.
    pub fn economy_mut(&mut self) -> &mut Economy {
        &mut self.economy
    }

    /// Clock status.
    pub fn status(&self) -> ClockStatus {
        self.clock.status()
    }

    /// Last timestamp written to the store.
    pub fn last_save_time(&self) -> Option<Millis> {
        self.timestamp_store.load()
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    /// Capture everything needed to restore this game.
    pub fn snapshot(&self) -> GameSnapshot {
        let status = self.clock.status();
        GameSnapshot {
            stage: self.economy.workforce().stage(),
            tick: status.tick,
            game_time: status.game_time,
            last_save_time: self.timestamp_store.load(),
            resources: self.economy.resource_snapshots(),
            structures: self.economy.structure_snapshots(),
        }
    }

    /// Apply a saved snapshot to this game's catalog. Returns the number of
    /// resource and structure entries applied.
    pub fn restore(&mut self, snapshot: &GameSnapshot) -> usize {
        let applied =
            self.economy
                .restore(snapshot.stage, &snapshot.resources, &snapshot.structures);
        self.clock.restore(snapshot.tick, snapshot.game_time);
        if let Some(saved) = snapshot.last_save_time {
            self.timestamp_store.save(saved);
        }
        applied
    }
}

// ===========================================================================
// Tests
// ===========================================================================
