//! Worker allocation: the shared worker pool, per-structure assignment, and
//! the staffing efficiency curve.
//!
//! The pool size is derived from the game stage; the assigned total is the
//! sum of every structure's workers. Assignment never lets the assigned total
//! exceed the pool: requests are clamped at the point of assignment.
//!
//! # Efficiency curve
//!
//! Production scales with the staffing ratio `r = workers / max_workers`,
//! rising linearly to a peak at `peak_ratio` and then falling back towards
//! `full_staff_efficiency` at `r = 1`. With the reference configuration:
//!
//! ```text
//! r      0.0  0.4  0.8  0.9  1.0
//! eff    0.0  1.0  2.0  1.5  1.0
//! ```

use crate::config::WorkforceConfig;
use crate::error::Rejection;
use crate::id::{StructureId, StructureKey};
use crate::structure::StructureTable;
use serde::{Deserialize, Serialize};

/// Distribution strategy for [`Workforce::auto_assign`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Spread the pool evenly; leftovers go to structures with the most room.
    Balanced,
    /// Fill the highest-level structures to capacity first.
    Focused,
    /// Staff every structure at the curve's peak, then fill by level.
    Efficiency,
}

/// Result of a relative worker change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Changed { from: u32, to: u32 },
    /// The clamped target equalled the current count.
    Unchanged(u32),
}

/// Worker pool sized by the current stage.
#[derive(Debug, Clone)]
pub struct Workforce {
    config: WorkforceConfig,
    stage: u32,
}

impl Workforce {
    pub fn new(config: WorkforceConfig) -> Self {
        Self { config, stage: 0 }
    }

    pub fn config(&self) -> &WorkforceConfig {
        &self.config
    }

    /// Current progression stage.
    pub fn stage(&self) -> u32 {
        self.stage
    }

    /// Set the game stage that sizes the pool. Lowering the stage does not
    /// evict workers; it only blocks further assignment until the pool
    /// catches up.
    pub fn set_stage(&mut self, stage: u32) {
        self.stage = stage;
    }

    // -----------------------------------------------------------------------
    // Pool totals
    // -----------------------------------------------------------------------

    /// Pool size for the current stage.
    pub fn total_available(&self) -> u32 {
        self.config
            .base_allowance
            .saturating_add(self.config.stage_increment.saturating_mul(self.stage))
    }

    /// Workers currently placed across all structures.
    pub fn total_assigned(&self, table: &StructureTable) -> u32 {
        table.total_workers()
    }

    /// Workers still free to assign.
    pub fn remaining(&self, table: &StructureTable) -> u32 {
        self.total_available()
            .saturating_sub(self.total_assigned(table))
    }

    // -----------------------------------------------------------------------
    // Assignment
    // -----------------------------------------------------------------------

    /// Set a structure's worker count, clamped to its cap and to the free
    /// pool plus the workers it already holds. Returns the count written.
    pub fn assign(
        &self,
        table: &mut StructureTable,
        key: impl StructureKey,
        requested: u32,
    ) -> Result<u32, Rejection> {
        let id = self.unlocked_id(table, &key)?;
        let remaining = self.remaining(table);
        let Some(structure) = table.get_mut(id) else {
            return Err(Rejection::UnknownStructure(key.describe()));
        };
        let cap = structure
            .max_workers
            .min(remaining.saturating_add(structure.workers));
        let count = requested.min(cap);
        structure.workers = count;
        Ok(count)
    }

    /// Move a structure's worker count by `delta`, clamped the same way as
    /// [`assign`](Self::assign).
    pub fn change_by(
        &self,
        table: &mut StructureTable,
        key: impl StructureKey,
        delta: i64,
    ) -> Result<Assignment, Rejection> {
        let id = self.unlocked_id(table, &key)?;
        let remaining = self.remaining(table);
        let Some(structure) = table.get(id) else {
            return Err(Rejection::UnknownStructure(key.describe()));
        };
        let current = structure.workers;
        let upper = structure
            .max_workers
            .min(current.saturating_add(remaining));
        let target = (current as i64).saturating_add(delta).clamp(0, upper as i64) as u32;
        if target == current {
            return Ok(Assignment::Unchanged(current));
        }
        let to = self.assign(table, id, target)?;
        Ok(Assignment::Changed { from: current, to })
    }

    fn unlocked_id<K: StructureKey>(
        &self,
        table: &StructureTable,
        key: &K,
    ) -> Result<StructureId, Rejection> {
        let id = table
            .resolve(key)
            .ok_or_else(|| Rejection::UnknownStructure(key.describe()))?;
        match table.get(id) {
            Some(s) if !s.unlocked => Err(Rejection::Locked(s.key.clone())),
            Some(_) => Ok(id),
            None => Err(Rejection::UnknownStructure(key.describe())),
        }
    }

    // -----------------------------------------------------------------------
    // Efficiency
    // -----------------------------------------------------------------------

    /// Production multiplier for a structure's current staffing. Zero for an
    /// unknown or unstaffed structure.
    pub fn efficiency(&self, table: &StructureTable, key: impl StructureKey) -> f64 {
        table
            .get(key)
            .map(|s| self.efficiency_for(s.workers, s.max_workers))
            .unwrap_or(0.0)
    }

    /// Efficiency for a raw worker count; zero when unstaffed.
    pub fn efficiency_for(&self, workers: u32, max_workers: u32) -> f64 {
        if workers == 0 || max_workers == 0 {
            return 0.0;
        }
        let ratio = (workers as f64 / max_workers as f64).min(1.0);
        self.efficiency_at(ratio)
    }

    /// The two-segment curve over a staffing ratio in `[0, 1]`.
    pub fn efficiency_at(&self, ratio: f64) -> f64 {
        let c = &self.config;
        if ratio <= c.peak_ratio {
            (ratio / c.peak_ratio) * c.peak_efficiency
        } else {
            let falloff = (ratio - c.peak_ratio) / (1.0 - c.peak_ratio);
            c.peak_efficiency - falloff * (c.peak_efficiency - c.full_staff_efficiency)
        }
    }

    // -----------------------------------------------------------------------
    // Auto-assignment
    // -----------------------------------------------------------------------

    /// Clear every structure's workers and redistribute the whole pool over
    /// unlocked structures with a level above zero. Returns the number of
    /// workers placed, which is never zero: an empty pool or eligible
    /// structures without worker slots fail with [`Rejection::NoWorkers`].
    pub fn auto_assign(
        &self,
        table: &mut StructureTable,
        strategy: Strategy,
    ) -> Result<u32, Rejection> {
        let eligible: Vec<StructureId> = table
            .iter()
            .filter(|(_, s)| s.is_active())
            .map(|(id, _)| id)
            .collect();
        if eligible.is_empty() {
            return Err(Rejection::NoEligibleStructures);
        }
        let pool = self.total_available();
        let capacity = eligible
            .iter()
            .filter_map(|id| table.get(*id))
            .fold(0u32, |acc, s| acc.saturating_add(s.max_workers));
        // Nothing could be placed: fail before clearing current assignments.
        if pool == 0 || capacity == 0 {
            return Err(Rejection::NoWorkers);
        }

        for (_, s) in table.iter_mut() {
            s.workers = 0;
        }

        let left = match strategy {
            Strategy::Balanced => distribute_balanced(table, &eligible, pool),
            Strategy::Focused => {
                let order = by_level_desc(table, &eligible);
                fill_in_order(table, &order, pool)
            }
            Strategy::Efficiency => {
                let order = by_level_desc(table, &eligible);
                let mut left = pool;
                for &id in &order {
                    if left == 0 {
                        break;
                    }
                    if let Some(s) = table.get_mut(id) {
                        let peak = self.peak_staffing(s.max_workers);
                        let give = peak.min(left);
                        s.workers = give;
                        left -= give;
                    }
                }
                fill_in_order(table, &order, left)
            }
        };
        Ok(pool - left)
    }

    /// `ceil(peak_ratio * max_workers)`, the staffing that maximizes the curve.
    pub fn peak_staffing(&self, max_workers: u32) -> u32 {
        // The epsilon keeps exact products like 0.8 * 5 from rounding up.
        let target = (self.config.peak_ratio * max_workers as f64 - 1e-9).ceil();
        (target.max(0.0) as u32).min(max_workers)
    }
}

fn by_level_desc(table: &StructureTable, ids: &[StructureId]) -> Vec<StructureId> {
    let mut order = ids.to_vec();
    // Stable: equal levels keep registration order.
    order.sort_by_key(|id| std::cmp::Reverse(table.get(*id).map(|s| s.level).unwrap_or(0)));
    order
}

/// Top up structures to capacity in the given order. Returns what is left.
fn fill_in_order(table: &mut StructureTable, order: &[StructureId], mut left: u32) -> u32 {
    for &id in order {
        if left == 0 {
            break;
        }
        if let Some(s) = table.get_mut(id) {
            let give = s.room().min(left);
            s.workers += give;
            left -= give;
        }
    }
    left
}

fn distribute_balanced(table: &mut StructureTable, eligible: &[StructureId], pool: u32) -> u32 {
    let share = pool / eligible.len() as u32;
    let mut left = pool;
    for &id in eligible {
        if let Some(s) = table.get_mut(id) {
            let give = share.min(s.max_workers);
            s.workers = give;
            left -= give;
        }
    }

    // Hand out the remainder one worker at a time, most room first, until
    // the pool or the capacity runs out.
    while left > 0 {
        let mut candidates: Vec<(StructureId, u32)> = eligible
            .iter()
            .filter_map(|&id| table.get(id).map(|s| (id, s.room())))
            .filter(|(_, room)| *room > 0)
            .collect();
        if candidates.is_empty() {
            break;
        }
        candidates.sort_by_key(|(_, room)| std::cmp::Reverse(*room));
        for (id, _) in candidates {
            if left == 0 {
                break;
            }
            if let Some(s) = table.get_mut(id) {
                s.workers += 1;
                left -= 1;
            }
        }
    }
    left
}

// ===========================================================================
// Tests
// ===========================================================================
