//! Structure production: purchase pricing, levels, and the translation of
//! (level, staffing efficiency) into per-resource production that is folded
//! into the ledger's base rates.
//!
//! Effective production for one structure is
//!
//! ```text
//! base_rate * (1 + level * level_bonus_per_level) * multiplier
//! ```
//!
//! where the multiplier is the staffing efficiency when the structure has
//! workers and `idle_fraction` when it has none. Only unlocked structures
//! with a level above zero contribute to the ledger.

use crate::catalog::{CatalogError, CatalogReport, StructureEntry};
use crate::config::ProductionConfig;
use crate::error::Rejection;
use crate::id::{ResourceId, StructureId, StructureKey};
use crate::ledger::{CostVector, Ledger};
use crate::structure::{Structure, StructureTable};
use crate::workforce::Workforce;
use slotmap::SecondaryMap;
use tracing::warn;

/// Structure table plus the production settings that price and scale it.
#[derive(Debug, Clone)]
pub struct Production {
    config: ProductionConfig,
    structures: StructureTable,
}

impl Production {
    pub fn new(config: ProductionConfig) -> Self {
        Self {
            config,
            structures: StructureTable::new(),
        }
    }

    pub fn config(&self) -> &ProductionConfig {
        &self.config
    }

    /// The structure table.
    pub fn structures(&self) -> &StructureTable {
        &self.structures
    }

    pub(crate) fn structures_mut(&mut self) -> &mut StructureTable {
        &mut self.structures
    }

    // -----------------------------------------------------------------------
    // Initialization
    // -----------------------------------------------------------------------

    /// Register one structure. Cost and production keys must name resources
    /// already present in the ledger.
    pub fn initialize(
        &mut self,
        ledger: &Ledger,
        entry: StructureEntry,
    ) -> Result<StructureId, CatalogError> {
        let position = self.structures.len();
        self.admit(ledger, entry, position)
    }

    /// Register a batch of structures, logging and skipping bad entries.
    pub fn initialize_many(
        &mut self,
        ledger: &Ledger,
        entries: impl IntoIterator<Item = StructureEntry>,
    ) -> CatalogReport {
        let mut report = CatalogReport::default();
        for (position, entry) in entries.into_iter().enumerate() {
            match self.admit(ledger, entry, position) {
                Ok(_) => report.admitted += 1,
                Err(err) => {
                    warn!(position, %err, "skipping structure catalog entry");
                    report.skipped.push(err);
                }
            }
        }
        report
    }

    fn admit(
        &mut self,
        ledger: &Ledger,
        entry: StructureEntry,
        position: usize,
    ) -> Result<StructureId, CatalogError> {
        let def = entry.validate(position)?;
        if self.structures.contains(&def.key) {
            return Err(CatalogError::Duplicate(def.key));
        }
        let resolve = |pairs: Vec<(String, f64)>| -> Result<CostVector, CatalogError> {
            pairs
                .into_iter()
                .map(|(resource, amount)| match ledger.id(resource.as_str()) {
                    Some(id) => Ok((id, amount)),
                    None => Err(CatalogError::UnknownResourceRef {
                        entry: def.key.clone(),
                        resource,
                    }),
                })
                .collect()
        };
        let cost = resolve(def.cost.clone())?;
        let production = resolve(def.production.clone())?;

        let structure = Structure {
            key: def.key.clone(),
            name: def.name,
            level: def.level,
            max_level: def.max_level,
            cost,
            production,
            unlocked: def.unlocked,
            workers: def.workers,
            max_workers: def.max_workers,
            current_production: Vec::new(),
        };
        self.structures
            .insert(structure)
            .ok_or(CatalogError::Duplicate(def.key))
    }

    // -----------------------------------------------------------------------
    // Purchasing
    // -----------------------------------------------------------------------

    /// Linear level pricing: `cost * (1 + level * cost_scale_per_level)`.
    pub fn upgrade_cost(&self, key: impl StructureKey) -> Option<CostVector> {
        let structure = self.structures.get(key)?;
        let factor = 1.0 + structure.level as f64 * self.config.cost_scale_per_level;
        Some(
            structure
                .cost
                .iter()
                .map(|(resource, amount)| (*resource, amount * factor))
                .collect(),
        )
    }

    /// What a purchase of the next level charges right now.
    pub fn purchase_price(&self, key: impl StructureKey) -> Option<CostVector> {
        if self.config.scale_purchase_cost {
            self.upgrade_cost(key)
        } else {
            self.structures.get(key).map(|s| s.cost.clone())
        }
    }

    /// Whether the next level is unlocked, below max and affordable.
    pub fn can_purchase(&self, ledger: &Ledger, key: impl StructureKey) -> bool {
        match self.purchase_check(&key) {
            Ok(id) => self
                .purchase_price(id)
                .is_some_and(|price| ledger.can_afford(&price)),
            Err(_) => false,
        }
    }

    fn purchase_check<K: StructureKey>(&self, key: &K) -> Result<StructureId, Rejection> {
        let id = self
            .structures
            .resolve(key)
            .ok_or_else(|| Rejection::UnknownStructure(key.describe()))?;
        let Some(structure) = self.structures.get(id) else {
            return Err(Rejection::UnknownStructure(key.describe()));
        };
        if !structure.unlocked {
            return Err(Rejection::Locked(structure.key.clone()));
        }
        if structure.is_maxed() {
            return Err(Rejection::MaxLevel(structure.key.clone()));
        }
        Ok(id)
    }

    /// Pay for and build one level. Returns the new level.
    pub fn purchase(
        &mut self,
        ledger: &mut Ledger,
        workforce: &Workforce,
        key: impl StructureKey,
    ) -> Result<u32, Rejection> {
        let id = self.purchase_check(&key)?;
        let price = self
            .purchase_price(id)
            .ok_or_else(|| Rejection::UnknownStructure(key.describe()))?;
        ledger.apply_cost(&price)?;

        let level = match self.structures.get_mut(id) {
            Some(structure) => {
                structure.level += 1;
                structure.level
            }
            None => return Err(Rejection::UnknownStructure(key.describe())),
        };
        self.recalculate_production(workforce, id, None);
        Ok(level)
    }

    /// Unlock a structure. Returns whether anything changed.
    pub fn unlock_structure(&mut self, key: impl StructureKey) -> bool {
        match self.structures.get_mut(key) {
            Some(structure) if !structure.unlocked => {
                structure.unlocked = true;
                true
            }
            _ => false,
        }
    }

    // -----------------------------------------------------------------------
    // Production
    // -----------------------------------------------------------------------

    /// Recompute one structure's production snapshot. An explicit
    /// `efficiency` replaces the staffing multiplier. Returns false for an
    /// unknown structure.
    pub fn recalculate_production(
        &mut self,
        workforce: &Workforce,
        key: impl StructureKey,
        efficiency: Option<f64>,
    ) -> bool {
        let idle_fraction = self.config.idle_fraction;
        let level_bonus = self.config.level_bonus_per_level;
        let Some(structure) = self.structures.get_mut(key) else {
            return false;
        };
        let multiplier = efficiency.unwrap_or_else(|| {
            if structure.workers > 0 {
                workforce.efficiency_for(structure.workers, structure.max_workers)
            } else {
                idle_fraction
            }
        });
        let level_factor = 1.0 + structure.level as f64 * level_bonus;
        structure.current_production = structure
            .production
            .iter()
            .map(|(resource, rate)| (*resource, rate * level_factor * multiplier))
            .collect();
        true
    }

    /// Sum of every contributing structure's production snapshot, per
    /// resource.
    pub fn production_totals(&self) -> SecondaryMap<ResourceId, f64> {
        let mut totals = SecondaryMap::new();
        for (_, structure) in self.structures.iter().filter(|(_, s)| s.is_active()) {
            for (resource, rate) in &structure.current_production {
                match totals.get_mut(*resource) {
                    Some(total) => *total += rate,
                    None => {
                        totals.insert(*resource, *rate);
                    }
                }
            }
        }
        totals
    }

    /// Recalculate every structure at its staffing efficiency, then fold the
    /// totals into the ledger's base rates. An unstaffed structure has
    /// efficiency zero here; the idle fraction only applies to the snapshot
    /// taken right after a purchase.
    pub fn recalculate_all(&mut self, ledger: &mut Ledger, workforce: &Workforce) {
        for id in self.structures.ids() {
            let efficiency = workforce.efficiency(&self.structures, id);
            self.recalculate_production(workforce, id, Some(efficiency));
        }
        self.fold_into(ledger);
    }

    /// Fold the current snapshots into the ledger without recalculating
    /// them.
    pub fn fold_into(&self, ledger: &mut Ledger) {
        ledger.recalculate_base_rates(&self.production_totals());
    }

    // -----------------------------------------------------------------------
    // Restore
    // -----------------------------------------------------------------------

    /// Overwrite persisted fields of one structure, clamped to its limits.
    /// Returns false for an unknown key.
    pub(crate) fn restore(&mut self, key: &str, level: u32, workers: u32, unlocked: bool) -> bool {
        let Some(structure) = self.structures.get_mut(key) else {
            return false;
        };
        structure.level = level.min(structure.max_level);
        structure.workers = workers.min(structure.max_workers);
        structure.unlocked = unlocked;
        true
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ResourceEntry;
    use crate::config::{LedgerConfig, WorkforceConfig};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn ledger() -> Ledger {
        let mut ledger = Ledger::new(LedgerConfig::default());
        ledger.initialize(vec![
            ResourceEntry::new("gold", "Gold", 100.0, 0.0, true),
            ResourceEntry::new("wood", "Wood", 50.0, 1.0, true),
        ]);
        ledger
    }

    fn mine() -> StructureEntry {
        StructureEntry::new("mine", "Mine", true, 3, 5)
            .with_cost("gold", 40.0)
            .with_production("gold", 2.0)
    }

    fn setup(config: ProductionConfig) -> (Ledger, Production, Workforce) {
        let ledger = ledger();
        let mut production = Production::new(config);
        production.initialize(&ledger, mine()).unwrap();
        (ledger, production, Workforce::new(WorkforceConfig::default()))
    }

    fn gold(production: &Production) -> f64 {
        let structure = production.structures().get("mine").unwrap();
        structure.current_production.first().map(|(_, r)| *r).unwrap_or(0.0)
    }

    #[test]
    fn unknown_resource_reference_is_skipped() {
        let ledger = ledger();
        let mut production = Production::new(ProductionConfig::default());
        let report = production.initialize_many(
            &ledger,
            vec![
                StructureEntry::new("forge", "Forge", true, 3, 2).with_cost("iron", 5.0),
                mine(),
                mine(),
            ],
        );
        assert_eq!(report.admitted, 1);
        assert_eq!(report.skipped.len(), 2);
        assert!(matches!(
            report.skipped[0],
            CatalogError::UnknownResourceRef { .. }
        ));
        assert_eq!(report.skipped[1], CatalogError::Duplicate("mine".into()));
    }

    #[test]
    fn purchase_deducts_base_cost_and_levels_up() {
        let (mut ledger, mut production, workforce) = setup(ProductionConfig::default());
        assert!(production.can_purchase(&ledger, "mine"));
        assert_eq!(production.purchase(&mut ledger, &workforce, "mine"), Ok(1));
        assert_eq!(ledger.amount("gold"), Some(60.0));
        // Base cost is charged regardless of level.
        assert_eq!(production.purchase(&mut ledger, &workforce, "mine"), Ok(2));
        assert_eq!(ledger.amount("gold"), Some(20.0));
        assert_eq!(
            production.purchase(&mut ledger, &workforce, "mine"),
            Err(Rejection::Insufficient)
        );
        assert_eq!(production.structures().get("mine").unwrap().level, 2);
    }

    #[test]
    fn purchase_at_max_level_deducts_nothing() {
        let (mut ledger, mut production, workforce) = setup(ProductionConfig::default());
        production.restore("mine", 3, 0, true);
        assert!(!production.can_purchase(&ledger, "mine"));
        assert_eq!(
            production.purchase(&mut ledger, &workforce, "mine"),
            Err(Rejection::MaxLevel("mine".into()))
        );
        assert_eq!(ledger.amount("gold"), Some(100.0));
    }

    #[test]
    fn purchase_of_locked_or_unknown_structure_fails() {
        let (mut ledger, mut production, workforce) = setup(ProductionConfig::default());
        production.structures_mut().get_mut("mine").unwrap().unlocked = false;
        assert_eq!(
            production.purchase(&mut ledger, &workforce, "mine"),
            Err(Rejection::Locked("mine".into()))
        );
        assert!(matches!(
            production.purchase(&mut ledger, &workforce, "castle"),
            Err(Rejection::UnknownStructure(_))
        ));
        assert!(!production.can_purchase(&ledger, "castle"));
        assert_eq!(ledger.amount("gold"), Some(100.0));
    }

    #[test]
    fn upgrade_cost_scales_linearly_with_level() {
        let (_, mut production, _) = setup(ProductionConfig::default());
        production.restore("mine", 2, 0, true);
        let cost = production.upgrade_cost("mine").unwrap();
        assert!(approx(cost[0].1, 40.0 * 1.3));
        assert!(production.upgrade_cost("castle").is_none());
    }

    #[test]
    fn scaled_purchase_charges_upgrade_cost() {
        let config = ProductionConfig {
            scale_purchase_cost: true,
            ..ProductionConfig::default()
        };
        let (mut ledger, mut production, workforce) = setup(config);
        production.purchase(&mut ledger, &workforce, "mine").unwrap();
        assert!(approx(ledger.amount("gold").unwrap(), 60.0));
        production.purchase(&mut ledger, &workforce, "mine").unwrap();
        assert!(approx(ledger.amount("gold").unwrap(), 60.0 - 46.0));
    }

    #[test]
    fn unstaffed_structure_produces_idle_fraction() {
        let (_, mut production, workforce) = setup(ProductionConfig::default());
        production.restore("mine", 2, 0, true);
        assert!(production.recalculate_production(&workforce, "mine", None));
        assert!(approx(gold(&production), 2.0 * 1.2 * 0.1));
    }

    #[test]
    fn staffed_structure_uses_efficiency() {
        let (_, mut production, workforce) = setup(ProductionConfig::default());
        production.restore("mine", 1, 4, true);
        production.recalculate_production(&workforce, "mine", None);
        // 4 of 5 workers is the peak: multiplier 2.
        assert!(approx(gold(&production), 2.0 * 1.1 * 2.0));
    }

    #[test]
    fn efficiency_override_replaces_multiplier() {
        let (_, mut production, workforce) = setup(ProductionConfig::default());
        production.restore("mine", 1, 4, true);
        production.recalculate_production(&workforce, "mine", Some(0.5));
        assert!(approx(gold(&production), 2.0 * 1.1 * 0.5));
        assert!(!production.recalculate_production(&workforce, "castle", None));
    }

    #[test]
    fn recalculate_all_folds_only_active_structures() {
        let (mut ledger, mut production, workforce) = setup(ProductionConfig::default());
        production
            .initialize(
                &ledger,
                StructureEntry::new("camp", "Camp", false, 3, 5)
                    .with_level(2)
                    .with_production("wood", 10.0),
            )
            .unwrap();

        production.recalculate_all(&mut ledger, &workforce);
        // Mine is level 0, camp is locked: nothing contributes.
        assert!(approx(ledger.get("gold").unwrap().per_second, 0.0));
        assert!(approx(ledger.get("wood").unwrap().per_second, 1.0));

        production.restore("mine", 1, 4, true);
        production.unlock_structure("camp");
        production.recalculate_all(&mut ledger, &workforce);
        // Mine staffed at the peak; camp active but unstaffed adds nothing.
        assert!(approx(ledger.get("gold").unwrap().per_second, 2.0 * 1.1 * 2.0));
        assert!(approx(ledger.get("wood").unwrap().per_second, 1.0));
    }

    #[test]
    fn full_recalculation_drops_the_idle_trickle() {
        let (mut ledger, mut production, workforce) = setup(ProductionConfig::default());
        production.purchase(&mut ledger, &workforce, "mine").unwrap();
        assert!(approx(gold(&production), 2.0 * 1.1 * 0.1));

        production.recalculate_all(&mut ledger, &workforce);
        assert_eq!(workforce.efficiency(production.structures(), "mine"), 0.0);
        assert_eq!(gold(&production), 0.0);
        assert!(approx(ledger.get("gold").unwrap().per_second, 0.0));
    }

    #[test]
    fn unlock_structure_reports_change() {
        let (_, mut production, _) = setup(ProductionConfig::default());
        production.structures_mut().get_mut("mine").unwrap().unlocked = false;
        assert!(production.unlock_structure("mine"));
        assert!(!production.unlock_structure("mine"));
        assert!(!production.unlock_structure("castle"));
    }
}
