//! The resource ledger: authoritative amounts, capacities and rates.
//!
//! Every mutation keeps `amount` inside `[0, max_amount]`. Rates are derived:
//! `per_second` is recomputed from `base_per_second` plus the passive upgrade
//! bonus (or pinned by a [`RatePolicy::Fixed`]) and never written directly by
//! callers.

use crate::catalog::{CatalogError, CatalogReport, RatePolicy, ResourceDef, ResourceEntry};
use crate::config::LedgerConfig;
use crate::error::Rejection;
use crate::id::{ResourceId, ResourceKey, UpgradeKind};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// A list of (resource, amount) pairs, e.g. a price or a production vector.
pub type CostVector = Vec<(ResourceId, f64)>;

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// Live state of one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub key: String,
    pub name: String,
    pub amount: f64,
    /// Capacity. `None` is unbounded.
    pub max_amount: Option<f64>,
    /// Total rate actually applied on accrual.
    pub per_second: f64,
    /// Catalog rate plus structure contributions, before upgrade bonuses.
    pub base_per_second: f64,
    /// The rate from the catalog definition.
    pub catalog_per_second: f64,
    /// Click power as defined in the catalog, before upgrades.
    pub base_click_power: Option<f64>,
    pub click_power: Option<f64>,
    pub unlocked: bool,
    pub upgrade_levels: BTreeMap<UpgradeKind, u32>,
    pub rate_policy: RatePolicy,
}

impl Resource {
    fn from_def(def: ResourceDef) -> Self {
        let amount = clamp_amount(def.amount, def.max_amount);
        let per_second = match def.rate_policy {
            RatePolicy::Fixed(rate) => rate,
            RatePolicy::Computed => def.per_second,
        };
        Self {
            key: def.key,
            name: def.name,
            amount,
            max_amount: def.max_amount,
            per_second,
            base_per_second: def.per_second,
            catalog_per_second: def.per_second,
            base_click_power: def.click_power,
            click_power: def.click_power,
            unlocked: def.unlocked,
            upgrade_levels: BTreeMap::new(),
            rate_policy: def.rate_policy,
        }
    }

    /// Current level along an upgrade track (0 if never upgraded).
    pub fn upgrade_level(&self, kind: UpgradeKind) -> u32 {
        self.upgrade_levels.get(&kind).copied().unwrap_or(0)
    }

    /// Amount a single click grants, before clamping.
    pub fn effective_click_power(&self) -> f64 {
        self.click_power.unwrap_or(1.0)
    }

    fn set_amount(&mut self, amount: f64) {
        self.amount = clamp_amount(amount, self.max_amount);
    }
}

fn clamp_amount(amount: f64, max: Option<f64>) -> f64 {
    if amount.is_nan() {
        return 0.0;
    }
    let floored = amount.max(0.0);
    match max {
        Some(max) => floored.min(max),
        None => floored,
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Owns every resource of one simulation instance.
#[derive(Debug, Clone)]
pub struct Ledger {
    config: LedgerConfig,
    resources: SlotMap<ResourceId, Resource>,
    index: HashMap<String, ResourceId>,
}

impl Ledger {
    /// Empty ledger with the given upgrade pricing.
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            resources: SlotMap::with_key(),
            index: HashMap::new(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Initialization
    // -----------------------------------------------------------------------

    /// Register every entry of a starting catalog.
    ///
    /// Malformed or duplicate entries are logged and skipped; the remaining
    /// entries are still admitted.
    pub fn initialize(&mut self, catalog: impl IntoIterator<Item = ResourceEntry>) -> CatalogReport {
        let mut report = CatalogReport::default();
        for (position, entry) in catalog.into_iter().enumerate() {
            match self.admit(entry, position) {
                Ok(_) => report.admitted += 1,
                Err(err) => {
                    warn!(position, %err, "skipping resource catalog entry");
                    report.skipped.push(err);
                }
            }
        }
        report
    }

    fn admit(&mut self, entry: ResourceEntry, position: usize) -> Result<ResourceId, CatalogError> {
        let def = entry.validate(position)?;
        if self.index.contains_key(&def.key) {
            return Err(CatalogError::Duplicate(def.key));
        }
        let key = def.key.clone();
        let id = self.resources.insert(Resource::from_def(def));
        self.index.insert(key, id);
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Resolve a key to a live id.
    pub fn id(&self, key: impl ResourceKey) -> Option<ResourceId> {
        key.resolve(&self.index)
            .filter(|id| self.resources.contains_key(*id))
    }

    /// Look up a resource by key or id.
    pub fn get(&self, key: impl ResourceKey) -> Option<&Resource> {
        key.resolve(&self.index).and_then(|id| self.resources.get(id))
    }

    fn get_mut(&mut self, key: impl ResourceKey) -> Option<&mut Resource> {
        key.resolve(&self.index)
            .and_then(|id| self.resources.get_mut(id))
    }

    /// Current amount, or `None` for an unknown key.
    pub fn amount(&self, key: impl ResourceKey) -> Option<f64> {
        self.get(key).map(|r| r.amount)
    }

    /// Iterate resources in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &Resource)> {
        self.resources.iter()
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Copy of every amount, keyed by id.
    pub fn amounts(&self) -> SecondaryMap<ResourceId, f64> {
        self.resources.iter().map(|(id, r)| (id, r.amount)).collect()
    }

    // -----------------------------------------------------------------------
    // Accrual
    // -----------------------------------------------------------------------

    /// Add `per_second * elapsed_seconds` to every unlocked resource.
    ///
    /// Negative, zero or non-finite deltas are ignored. Fixed-rate resources
    /// are pinned back to their canonical rate before accruing.
    pub fn accrue(&mut self, elapsed_seconds: f64) {
        if !(elapsed_seconds.is_finite() && elapsed_seconds > 0.0) {
            return;
        }
        for resource in self.resources.values_mut() {
            if let RatePolicy::Fixed(rate) = resource.rate_policy {
                if resource.per_second != rate {
                    debug!(
                        resource = %resource.key,
                        drifted = resource.per_second,
                        canonical = rate,
                        "correcting fixed-rate resource"
                    );
                    resource.per_second = rate;
                }
            }
            if !resource.unlocked || resource.per_second == 0.0 {
                continue;
            }
            let next = resource.amount + resource.per_second * elapsed_seconds;
            resource.set_amount(next);
        }
    }

    // -----------------------------------------------------------------------
    // Spending
    // -----------------------------------------------------------------------

    /// True iff every entry names an unlocked resource holding at least the
    /// requested amount. An empty cost is affordable.
    pub fn can_afford<K: ResourceKey>(&self, cost: &[(K, f64)]) -> bool {
        self.check_cost(cost).is_ok()
    }

    fn check_cost<K: ResourceKey>(&self, cost: &[(K, f64)]) -> Result<(), Rejection> {
        for (key, amount) in cost {
            if !(amount.is_finite() && *amount >= 0.0) {
                return Err(Rejection::InvalidCost);
            }
            let resource = key
                .resolve(&self.index)
                .and_then(|id| self.resources.get(id))
                .ok_or_else(|| Rejection::UnknownResource(key.describe()))?;
            if !resource.unlocked {
                return Err(Rejection::Locked(resource.key.clone()));
            }
            if resource.amount < *amount {
                return Err(Rejection::Insufficient);
            }
        }
        Ok(())
    }

    /// Deduct every entry if the whole cost is affordable; otherwise change
    /// nothing.
    pub fn apply_cost<K: ResourceKey>(&mut self, cost: &[(K, f64)]) -> Result<(), Rejection> {
        self.check_cost(cost)?;
        for (key, amount) in cost {
            if let Some(id) = key.resolve(&self.index) {
                if let Some(resource) = self.resources.get_mut(id) {
                    let next = resource.amount - amount;
                    resource.set_amount(next);
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Player actions
    // -----------------------------------------------------------------------

    /// Grant one click's worth of a resource. Returns the amount actually
    /// added, which is 0 for unknown or locked resources and may be less than
    /// the click power when the resource is near capacity.
    pub fn click(&mut self, key: impl ResourceKey) -> f64 {
        let Some(resource) = self.get_mut(key) else {
            return 0.0;
        };
        if !resource.unlocked {
            return 0.0;
        }
        let before = resource.amount;
        let next = before + resource.effective_click_power();
        resource.set_amount(next);
        resource.amount - before
    }

    /// Unlock a resource. Returns whether anything changed.
    pub fn unlock(&mut self, key: impl ResourceKey) -> bool {
        match self.get_mut(key) {
            Some(resource) if !resource.unlocked => {
                resource.unlocked = true;
                true
            }
            _ => false,
        }
    }

    /// Price of the next level along `kind`, paid in the resource itself.
    pub fn upgrade_cost(&self, key: impl ResourceKey, kind: UpgradeKind) -> Option<f64> {
        let resource = self.get(key)?;
        Some(self.cost_at_level(kind, resource.upgrade_level(kind)))
    }

    fn cost_at_level(&self, kind: UpgradeKind, level: u32) -> f64 {
        let (base, scale) = match kind {
            UpgradeKind::ClickPower => (self.config.click_base_cost, self.config.click_cost_scale),
            UpgradeKind::Passive => (self.config.passive_base_cost, self.config.passive_cost_scale),
        };
        base * scale.powi(level.min(i32::MAX as u32) as i32)
    }

    /// Buy one level of `kind` for a resource. Returns the new level.
    ///
    /// Fixed-rate resources refuse passive upgrades; their click power can
    /// still be upgraded.
    pub fn upgrade(&mut self, key: impl ResourceKey, kind: UpgradeKind) -> Result<u32, Rejection> {
        let id = key
            .resolve(&self.index)
            .filter(|id| self.resources.contains_key(*id))
            .ok_or_else(|| Rejection::UnknownResource(key.describe()))?;
        let resource = &self.resources[id];
        if !resource.unlocked {
            return Err(Rejection::Locked(resource.key.clone()));
        }
        if kind == UpgradeKind::Passive && matches!(resource.rate_policy, RatePolicy::Fixed(_)) {
            return Err(Rejection::FixedRate(resource.key.clone()));
        }
        let price = self.cost_at_level(kind, resource.upgrade_level(kind));
        self.apply_cost(&[(id, price)])?;

        let config = self.config.clone();
        let resource = &mut self.resources[id];
        let level = resource.upgrade_levels.entry(kind).or_insert(0);
        *level += 1;
        let level = *level;
        match kind {
            UpgradeKind::ClickPower => {
                let base = resource.base_click_power.unwrap_or(1.0);
                resource.click_power = Some(base + level as f64 * config.click_bonus_per_level);
            }
            UpgradeKind::Passive => {
                resource.per_second = derive_rate(resource, &config);
            }
        }
        Ok(level)
    }

    // -----------------------------------------------------------------------
    // Rate derivation
    // -----------------------------------------------------------------------

    /// Rebuild every `base_per_second` from the catalog rate plus the given
    /// structural contributions, then re-derive `per_second` keeping upgrade
    /// bonuses.
    pub fn recalculate_base_rates(&mut self, structure_totals: &SecondaryMap<ResourceId, f64>) {
        let config = &self.config;
        for (id, resource) in self.resources.iter_mut() {
            let contribution = structure_totals.get(id).copied().unwrap_or(0.0);
            resource.base_per_second = resource.catalog_per_second + contribution;
            resource.per_second = derive_rate(resource, config);
        }
    }

    // -----------------------------------------------------------------------
    // Restore
    // -----------------------------------------------------------------------

    /// Overwrite persisted fields of one resource and re-derive its click
    /// power and rate. Returns false for an unknown key.
    pub(crate) fn restore(
        &mut self,
        key: &str,
        amount: f64,
        unlocked: bool,
        upgrade_levels: &BTreeMap<UpgradeKind, u32>,
    ) -> bool {
        let config = self.config.clone();
        let Some(resource) = self.get_mut(key) else {
            return false;
        };
        resource.set_amount(amount);
        resource.unlocked = unlocked;
        resource.upgrade_levels = upgrade_levels
            .iter()
            .filter(|(_, level)| **level > 0)
            .map(|(k, v)| (*k, *v))
            .collect();
        let click_level = resource.upgrade_level(UpgradeKind::ClickPower);
        resource.click_power = if click_level > 0 {
            let base = resource.base_click_power.unwrap_or(1.0);
            Some(base + click_level as f64 * config.click_bonus_per_level)
        } else {
            resource.base_click_power
        };
        resource.per_second = derive_rate(resource, &config);
        true
    }
}

fn derive_rate(resource: &Resource, config: &LedgerConfig) -> f64 {
    match resource.rate_policy {
        RatePolicy::Fixed(rate) => rate,
        RatePolicy::Computed => {
            resource.base_per_second
                + resource.upgrade_level(UpgradeKind::Passive) as f64 * config.passive_bonus_per_level
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
