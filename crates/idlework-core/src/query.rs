//! Read-only views of economy state for the presentation layer.
//!
//! Every view is an owned copy keyed by string keys; nothing here borrows
//! into the ledger or the structure table.

use crate::catalog::RatePolicy;
use crate::id::UpgradeKind;
use crate::ledger::{CostVector, Ledger};
use crate::structure::Structure;
use crate::workforce::Workforce;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Resource view
// ---------------------------------------------------------------------------

/// Read-only view of one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceView {
    pub key: String,
    pub name: String,
    pub amount: f64,
    /// `None` when unbounded.
    pub max_amount: Option<f64>,
    pub per_second: f64,
    pub base_per_second: f64,
    pub click_power: f64,
    pub unlocked: bool,
    pub rate_policy: RatePolicy,
    pub upgrade_levels: BTreeMap<UpgradeKind, u32>,
    /// Price of the next level of each upgrade kind.
    pub upgrade_costs: BTreeMap<UpgradeKind, f64>,
}

// ---------------------------------------------------------------------------
// Structure view
// ---------------------------------------------------------------------------

/// Read-only view of one structure and its staffing.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureView {
    pub key: String,
    pub name: String,
    pub level: u32,
    pub max_level: u32,
    pub unlocked: bool,
    pub workers: u32,
    pub max_workers: u32,
    pub efficiency: f64,
    /// Last calculated production, per resource key.
    pub production: BTreeMap<String, f64>,
    /// What buying the next level would charge. Empty at max level.
    pub purchase_price: BTreeMap<String, f64>,
    pub can_purchase: bool,
}

// ---------------------------------------------------------------------------
// Workforce view
// ---------------------------------------------------------------------------

/// Read-only view of the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkforceView {
    pub stage: u32,
    pub total_available: u32,
    pub total_assigned: u32,
    pub remaining: u32,
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub(crate) fn resource_views(ledger: &Ledger) -> Vec<ResourceView> {
    ledger
        .iter()
        .map(|(id, r)| ResourceView {
            key: r.key.clone(),
            name: r.name.clone(),
            amount: r.amount,
            max_amount: r.max_amount,
            per_second: r.per_second,
            base_per_second: r.base_per_second,
            click_power: r.effective_click_power(),
            unlocked: r.unlocked,
            rate_policy: r.rate_policy,
            upgrade_levels: r.upgrade_levels.clone(),
            upgrade_costs: UpgradeKind::ALL
                .iter()
                .filter_map(|kind| ledger.upgrade_cost(id, *kind).map(|c| (*kind, c)))
                .collect(),
        })
        .collect()
}

pub(crate) fn structure_view(
    structure: &Structure,
    ledger: &Ledger,
    workforce: &Workforce,
    purchase_price: Option<CostVector>,
    can_purchase: bool,
) -> StructureView {
    StructureView {
        key: structure.key.clone(),
        name: structure.name.clone(),
        level: structure.level,
        max_level: structure.max_level,
        unlocked: structure.unlocked,
        workers: structure.workers,
        max_workers: structure.max_workers,
        efficiency: workforce.efficiency_for(structure.workers, structure.max_workers),
        production: keyed(ledger, &structure.current_production),
        purchase_price: match purchase_price {
            Some(price) if !structure.is_maxed() => keyed(ledger, &price),
            _ => BTreeMap::new(),
        },
        can_purchase,
    }
}

/// Translate resource ids back to their keys, summing duplicates.
pub(crate) fn keyed(ledger: &Ledger, vector: &CostVector) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for (id, amount) in vector {
        if let Some(resource) = ledger.get(*id) {
            *out.entry(resource.key.clone()).or_insert(0.0) += amount;
        }
    }
    out
}
