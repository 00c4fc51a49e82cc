//! The economy: ledger, structures and workforce wired together behind the
//! command and query surfaces.
//!
//! The clock drives an [`Economy`] through the [`Simulation`] trait; player
//! commands call straight into it. Commands that change structural state
//! (levels, staffing, unlocks) refresh the ledger's rates immediately so
//! queries never show a stale rate between periodic recalculations.

use crate::catalog::{CatalogReport, ResourceEntry, StructureEntry};
use crate::command_queue::{Command, CommandOutcome, CommandResult};
use crate::config::EconomyConfig;
use crate::error::Rejection;
use crate::id::{ResourceKey, StructureKey, UpgradeKind};
use crate::ledger::{CostVector, Ledger};
use crate::production::Production;
use crate::query::{self, ResourceView, StructureView, WorkforceView};
use crate::serialize::{ResourceSnapshot, StructureSnapshot};
use crate::sim::Simulation;
use crate::structure::StructureTable;
use crate::workforce::{Assignment, Strategy, Workforce};
use std::collections::BTreeMap;
use tracing::warn;

/// Ledger, structures and workforce wired together.
#[derive(Debug, Clone)]
pub struct Economy {
    ledger: Ledger,
    production: Production,
    workforce: Workforce,
    report: CatalogReport,
}

impl Economy {
    /// Build an economy from its catalogs. Resources are registered first so
    /// structures can reference them; bad entries of either kind are logged
    /// and skipped.
    pub fn new(
        config: &EconomyConfig,
        resources: impl IntoIterator<Item = ResourceEntry>,
        structures: impl IntoIterator<Item = StructureEntry>,
    ) -> Self {
        let mut ledger = Ledger::new(config.ledger.clone());
        let mut report = ledger.initialize(resources);
        let mut production = Production::new(config.production.clone());
        report.merge(production.initialize_many(&ledger, structures));

        let mut economy = Self {
            ledger,
            production,
            workforce: Workforce::new(config.workforce.clone()),
            report,
        };
        economy.recalculate();
        economy
    }

    /// Entries skipped while loading the catalog.
    pub fn catalog_report(&self) -> &CatalogReport {
        &self.report
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn structures(&self) -> &StructureTable {
        self.production.structures()
    }

    pub fn production(&self) -> &Production {
        &self.production
    }

    pub fn workforce(&self) -> &Workforce {
        &self.workforce
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Buy the next level of a structure. Returns the new level.
    pub fn purchase(&mut self, structure: impl StructureKey) -> Result<u32, Rejection> {
        let level = self
            .production
            .purchase(&mut self.ledger, &self.workforce, structure)?;
        // The new level's snapshot (idle trickle when unstaffed) holds until
        // the next full recalculation.
        self.production.fold_into(&mut self.ledger);
        Ok(level)
    }

    /// Set a structure's workers to exactly `count`.
    pub fn assign_workers(
        &mut self,
        structure: impl StructureKey,
        count: u32,
    ) -> Result<u32, Rejection> {
        let assigned = self
            .workforce
            .assign(self.production.structures_mut(), structure, count)?;
        self.recalculate();
        Ok(assigned)
    }

    /// Move a structure's workers by `delta`.
    pub fn change_workers(
        &mut self,
        structure: impl StructureKey,
        delta: i64,
    ) -> Result<Assignment, Rejection> {
        let outcome = self
            .workforce
            .change_by(self.production.structures_mut(), structure, delta)?;
        if matches!(outcome, Assignment::Changed { .. }) {
            self.recalculate();
        }
        Ok(outcome)
    }

    /// Clear and redistribute every worker. Returns how many were placed.
    pub fn auto_assign_workers(&mut self, strategy: Strategy) -> Result<u32, Rejection> {
        let assigned = self
            .workforce
            .auto_assign(self.production.structures_mut(), strategy)?;
        self.recalculate();
        Ok(assigned)
    }

    /// Returns the amount granted; zero for an unknown or locked resource.
    pub fn click(&mut self, resource: impl ResourceKey) -> f64 {
        self.ledger.click(resource)
    }

    /// Buy one click-power or passive level for a resource.
    pub fn upgrade_resource(
        &mut self,
        resource: impl ResourceKey,
        kind: UpgradeKind,
    ) -> Result<u32, Rejection> {
        self.ledger.upgrade(resource, kind)
    }

    pub fn unlock_resource(&mut self, resource: impl ResourceKey) -> bool {
        self.ledger.unlock(resource)
    }

    pub fn unlock_structure(&mut self, structure: impl StructureKey) -> bool {
        let changed = self.production.unlock_structure(structure);
        if changed {
            self.recalculate();
        }
        changed
    }

    /// Move to `stage`. Existing assignments are kept.
    pub fn set_stage(&mut self, stage: u32) {
        self.workforce.set_stage(stage);
    }

    /// Run one queued command.
    pub fn apply(&mut self, command: &Command) -> CommandResult {
        match command {
            Command::Purchase { structure } => self.purchase(structure).map(CommandOutcome::Level),
            Command::AssignWorkers { structure, count } => self
                .assign_workers(structure, *count)
                .map(CommandOutcome::Workers),
            Command::ChangeWorkers { structure, delta } => self
                .change_workers(structure, *delta)
                .map(CommandOutcome::Assignment),
            Command::Click { resource } => Ok(CommandOutcome::Granted(self.click(resource))),
            Command::UpgradeResource { resource, kind } => self
                .upgrade_resource(resource, *kind)
                .map(CommandOutcome::Level),
            Command::AutoAssignWorkers { strategy } => self
                .auto_assign_workers(*strategy)
                .map(CommandOutcome::Workers),
            Command::UnlockResource { resource } => {
                Ok(CommandOutcome::Unlocked(self.unlock_resource(resource)))
            }
            Command::UnlockStructure { structure } => {
                Ok(CommandOutcome::Unlocked(self.unlock_structure(structure)))
            }
            Command::SetStage { stage } => {
                self.set_stage(*stage);
                Ok(CommandOutcome::StageSet)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Amount held of a resource.
    pub fn amount(&self, resource: impl ResourceKey) -> Option<f64> {
        self.ledger.amount(resource)
    }

    /// Current effective rate of a resource.
    pub fn per_second(&self, resource: impl ResourceKey) -> Option<f64> {
        self.ledger.get(resource).map(|r| r.per_second)
    }

    /// Price of the next upgrade level, if the resource exists.
    pub fn resource_upgrade_cost(&self, resource: impl ResourceKey, kind: UpgradeKind) -> Option<f64> {
        self.ledger.upgrade_cost(resource, kind)
    }

    /// Cost of the next structure level; `None` at max level.
    pub fn structure_upgrade_cost(&self, structure: impl StructureKey) -> Option<CostVector> {
        self.production.upgrade_cost(structure)
    }

    pub fn can_purchase(&self, structure: impl StructureKey) -> bool {
        self.production.can_purchase(&self.ledger, structure)
    }

    /// Staffing efficiency of a structure in `[0, 1]`.
    pub fn efficiency(&self, structure: impl StructureKey) -> f64 {
        self.workforce.efficiency(self.production.structures(), structure)
    }

    /// Views of all resources in registration order.
    pub fn resources(&self) -> Vec<ResourceView> {
        query::resource_views(&self.ledger)
    }

    pub fn structure_views(&self) -> Vec<StructureView> {
        self.production
            .structures()
            .iter()
            .map(|(id, s)| {
                query::structure_view(
                    s,
                    &self.ledger,
                    &self.workforce,
                    self.production.purchase_price(id),
                    self.production.can_purchase(&self.ledger, id),
                )
            })
            .collect()
    }

    /// Pool size, assignments and remaining workers.
    pub fn workforce_view(&self) -> WorkforceView {
        let table = self.production.structures();
        WorkforceView {
            stage: self.workforce.stage(),
            total_available: self.workforce.total_available(),
            total_assigned: self.workforce.total_assigned(table),
            remaining: self.workforce.remaining(table),
        }
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    pub(crate) fn resource_snapshots(&self) -> Vec<ResourceSnapshot> {
        self.ledger
            .iter()
            .map(|(_, r)| ResourceSnapshot {
                key: r.key.clone(),
                amount: r.amount,
                unlocked: r.unlocked,
                upgrade_levels: r.upgrade_levels.clone(),
            })
            .collect()
    }

    pub(crate) fn structure_snapshots(&self) -> Vec<StructureSnapshot> {
        self.production
            .structures()
            .iter()
            .map(|(_, s)| StructureSnapshot {
                key: s.key.clone(),
                level: s.level,
                workers: s.workers,
                unlocked: s.unlocked,
            })
            .collect()
    }

    /// Overwrite persisted state. Entries naming keys this economy does not
    /// know are skipped. Returns the number of entries applied.
    pub(crate) fn restore(
        &mut self,
        stage: u32,
        resources: &[ResourceSnapshot],
        structures: &[StructureSnapshot],
    ) -> usize {
        self.workforce.set_stage(stage);
        let mut applied = 0;
        for r in resources {
            if self
                .ledger
                .restore(&r.key, r.amount, r.unlocked, &r.upgrade_levels)
            {
                applied += 1;
            } else {
                warn!(resource = %r.key, "snapshot names an unknown resource; skipping");
            }
        }
        for s in structures {
            if self
                .production
                .restore(&s.key, s.level, s.workers, s.unlocked)
            {
                applied += 1;
            } else {
                warn!(structure = %s.key, "snapshot names an unknown structure; skipping");
            }
        }
        self.trim_workers_to_pool();
        self.recalculate();
        applied
    }

    /// Release workers from the most recently registered structures until
    /// the assigned total fits the pool.
    fn trim_workers_to_pool(&mut self) {
        let available = self.workforce.total_available();
        let table = self.production.structures_mut();
        let mut excess = table.total_workers().saturating_sub(available);
        if excess == 0 {
            return;
        }
        warn!(excess, available, "restored workers exceed the pool; releasing");
        for id in table.ids().into_iter().rev() {
            if excess == 0 {
                break;
            }
            if let Some(s) = table.get_mut(id) {
                let release = s.workers.min(excess);
                s.workers -= release;
                excess -= release;
            }
        }
    }
}

impl Simulation for Economy {
    fn advance(&mut self, seconds: f64) {
        self.ledger.accrue(seconds);
    }

    fn recalculate(&mut self) {
        self.production
            .recalculate_all(&mut self.ledger, &self.workforce);
    }

    fn amounts(&self) -> BTreeMap<String, f64> {
        self.ledger
            .iter()
            .map(|(_, r)| (r.key.clone(), r.amount))
            .collect()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn economy() -> Economy {
        test_utils::sample_economy(&EconomyConfig::default())
    }

    #[test]
    fn sample_catalog_is_fully_admitted() {
        let economy = economy();
        assert!(economy.catalog_report().skipped.is_empty());
        assert_eq!(economy.ledger().len(), 3);
        assert_eq!(economy.structures().len(), 2);
    }

    #[test]
    fn bad_entries_are_reported_and_skipped() {
        let economy = Economy::new(
            &EconomyConfig::default(),
            vec![
                ResourceEntry::new("gold", "Gold", 0.0, 0.0, true),
                ResourceEntry {
                    id: Some("broken".into()),
                    ..ResourceEntry::default()
                },
            ],
            vec![StructureEntry::new("forge", "Forge", true, 3, 2).with_cost("iron", 1.0)],
        );
        assert_eq!(economy.catalog_report().admitted, 1);
        assert_eq!(economy.catalog_report().skipped.len(), 2);
    }

    #[test]
    fn purchase_refreshes_rates_immediately() {
        let mut economy = economy();
        assert!(approx(economy.per_second("gold").unwrap(), 0.0));
        economy.purchase("mine").unwrap();
        // Level 1, unstaffed: 1.0 * 1.1 * 0.1.
        assert!(approx(economy.per_second("gold").unwrap(), 0.11));
        economy.assign_workers("mine", 4).unwrap();
        assert!(approx(economy.per_second("gold").unwrap(), 1.0 * 1.1 * 2.0));
    }

    #[test]
    fn recalculation_uses_staffing_efficiency() {
        let mut economy = economy();
        economy.purchase("mine").unwrap();
        economy.recalculate();
        assert_eq!(economy.efficiency("mine"), 0.0);
        assert!(approx(economy.per_second("gold").unwrap(), 0.0));

        economy.assign_workers("mine", 2).unwrap();
        economy.recalculate();
        assert!(approx(economy.per_second("gold").unwrap(), 1.0 * 1.1 * 1.0));
    }

    #[test]
    fn commands_apply_through_the_enum() {
        let mut economy = economy();
        assert_eq!(
            economy.apply(&Command::Click {
                resource: "gold".into()
            }),
            Ok(CommandOutcome::Granted(1.0))
        );
        assert_eq!(
            economy.apply(&Command::Purchase {
                structure: "lumber_camp".into()
            }),
            Err(Rejection::Locked("lumber_camp".into()))
        );
        assert_eq!(
            economy.apply(&Command::UnlockStructure {
                structure: "lumber_camp".into()
            }),
            Ok(CommandOutcome::Unlocked(true))
        );
        assert_eq!(
            economy.apply(&Command::SetStage { stage: 1 }),
            Ok(CommandOutcome::StageSet)
        );
        assert_eq!(economy.workforce_view().total_available, 8);
    }

    #[test]
    fn structure_views_show_price_and_efficiency() {
        let mut economy = economy();
        economy.purchase("mine").unwrap();
        economy.assign_workers("mine", 2).unwrap();
        let views = economy.structure_views();
        let mine = views.iter().find(|v| v.key == "mine").unwrap();
        assert_eq!(mine.level, 1);
        assert!(approx(mine.efficiency, 1.0));
        assert_eq!(mine.purchase_price.get("gold"), Some(&50.0));
        assert!(mine.production.contains_key("gold"));
    }

    #[test]
    fn restore_trims_workers_to_pool() {
        let mut economy = economy();
        let structures = vec![
            StructureSnapshot {
                key: "mine".into(),
                level: 1,
                workers: 5,
                unlocked: true,
            },
            StructureSnapshot {
                key: "lumber_camp".into(),
                level: 1,
                workers: 4,
                unlocked: true,
            },
            StructureSnapshot {
                key: "castle".into(),
                level: 1,
                workers: 0,
                unlocked: true,
            },
        ];
        let applied = economy.restore(0, &[], &structures);
        assert_eq!(applied, 2);
        let view = economy.workforce_view();
        assert_eq!(view.total_assigned, view.total_available);
        assert_eq!(economy.structures().get("mine").unwrap().workers, 5);
        assert_eq!(economy.structures().get("lumber_camp").unwrap().workers, 0);
    }
}
