//! Player commands and the queue that serializes them.
//!
//! Commands submitted from the presentation layer (or from other threads
//! through a lock around the game) wait here until the start of the next
//! frame, then run in submission order before any fixed update.

use crate::error::Rejection;
use crate::id::UpgradeKind;
use crate::workforce::{Assignment, Strategy};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

/// One entry of the command surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Buy the next level of a structure.
    Purchase { structure: String },
    /// Set a structure's worker count outright.
    AssignWorkers { structure: String, count: u32 },
    /// Add or remove workers relative to the current count.
    ChangeWorkers { structure: String, delta: i64 },
    Click { resource: String },
    UpgradeResource { resource: String, kind: UpgradeKind },
    /// Redistribute the whole pool with a strategy.
    AutoAssignWorkers { strategy: Strategy },
    UnlockResource { resource: String },
    UnlockStructure { structure: String },
    /// Change the progression stage, which resizes the pool.
    SetStage { stage: u32 },
}

/// Success value of a command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandOutcome {
    /// New structure or upgrade level.
    Level(u32),
    /// Workers now assigned (absolute assignment or auto-assignment total).
    Workers(u32),
    Assignment(Assignment),
    /// Amount granted by a click. Zero when nothing was granted.
    Granted(f64),
    /// Whether an unlock changed anything.
    Unlocked(bool),
    StageSet,
}

/// Outcome of one applied command.
pub type CommandResult = Result<CommandOutcome, Rejection>;

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// Commands waiting for the next frame, with optional bounded history.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<Command>,
    /// Executed commands with the tick they ran before.
    history: Vec<(u64, Command)>,
    /// 0 disables history.
    max_history: usize,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue that keeps at most `max_history` applied commands.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    /// Queue a command for the next drain.
    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn push_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.pending.extend(commands);
    }

    /// Take every pending command in submission order, recording them in
    /// history against `tick`.
    pub fn drain(&mut self, tick: u64) -> Vec<Command> {
        let commands: Vec<Command> = self.pending.drain(..).collect();
        if self.max_history > 0 {
            self.history
                .extend(commands.iter().map(|cmd| (tick, cmd.clone())));
            let excess = self.history.len().saturating_sub(self.max_history);
            self.history.drain(..excess);
        }
        commands
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Applied commands with the tick they ran on, oldest first.
    pub fn history(&self) -> &[(u64, Command)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn click(resource: &str) -> Command {
        Command::Click {
            resource: resource.to_string(),
        }
    }

    #[test]
    fn drain_preserves_submission_order() {
        let mut queue = CommandQueue::new();
        queue.push(click("gold"));
        queue.push_batch([
            Command::SetStage { stage: 2 },
            Command::Purchase {
                structure: "mine".into(),
            },
        ]);
        assert_eq!(queue.pending_count(), 3);

        let drained = queue.drain(0);
        assert_eq!(drained[0], click("gold"));
        assert_eq!(drained[1], Command::SetStage { stage: 2 });
        assert!(queue.is_empty());
    }

    #[test]
    fn history_is_off_by_default() {
        let mut queue = CommandQueue::new();
        queue.push(click("gold"));
        queue.drain(1);
        assert!(queue.history().is_empty());
    }

    #[test]
    fn history_keeps_most_recent_entries() {
        let mut queue = CommandQueue::with_max_history(2);
        for tick in 0..3 {
            queue.push(Command::SetStage { stage: tick as u32 });
            queue.drain(tick);
        }
        let ticks: Vec<u64> = queue.history().iter().map(|(t, _)| *t).collect();
        assert_eq!(ticks, [1, 2]);

        queue.clear_history();
        assert!(queue.history().is_empty());
    }

    #[test]
    fn commands_deserialize_from_tagged_json() {
        let cmd: Command = serde_json::from_str(
            r#"{"command":"upgrade_resource","resource":"gold","kind":"click_power"}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::UpgradeResource {
                resource: "gold".into(),
                kind: UpgradeKind::ClickPower,
            }
        );

        let cmd: Command =
            serde_json::from_str(r#"{"command":"auto_assign_workers","strategy":"focused"}"#)
                .unwrap();
        assert_eq!(
            cmd,
            Command::AutoAssignWorkers {
                strategy: Strategy::Focused
            }
        );
    }
}
