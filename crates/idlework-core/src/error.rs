/// Why a command was refused.
///
/// These are ordinary, expected outcomes (insufficient funds, locked
/// entities, unknown ids). Commands return them as values and leave state
/// untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error("unknown structure: {0}")]
    UnknownStructure(String),
    #[error("{0} is locked")]
    Locked(String),
    /// Some entry of a cost vector exceeds the amount held.
    #[error("cannot afford cost")]
    Insufficient,
    #[error("cost vector contains a negative or non-finite amount")]
    InvalidCost,
    #[error("{0} is already at max level")]
    MaxLevel(String),
    /// A passive upgrade cannot move a resource pinned to a fixed rate.
    #[error("{0} runs at a fixed rate and cannot take passive upgrades")]
    FixedRate(String),
    /// Auto-assignment found no unlocked structure with a level above zero.
    #[error("no unlocked structure with a level above zero")]
    NoEligibleStructures,
    /// The pool is empty, or no eligible structure has a worker slot.
    #[error("no workers available")]
    NoWorkers,
}
