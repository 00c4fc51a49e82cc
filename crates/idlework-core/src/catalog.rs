//! Catalog entries: the externally supplied starting definitions for
//! resources and structures.
//!
//! Entries are deliberately loose (every field optional) so that data files
//! can be deserialized without aborting on the first malformed record. Each
//! entry is validated individually when it is admitted into the ledger or
//! the structure table; an invalid entry is logged and skipped without
//! affecting the rest of the batch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a single catalog entry was refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("entry {entry}: missing required field `{field}`")]
    MissingField { entry: String, field: &'static str },
    #[error("entry {entry}: invalid `{field}`: {reason}")]
    InvalidValue {
        entry: String,
        field: &'static str,
        reason: String,
    },
    #[error("duplicate key: {0}")]
    Duplicate(String),
    #[error("entry {entry}: unknown resource reference `{resource}`")]
    UnknownResourceRef { entry: String, resource: String },
}

/// Outcome of a bulk initialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogReport {
    pub admitted: usize,
    pub skipped: Vec<CatalogError>,
}

impl CatalogReport {
    /// Fold another report into this one.
    pub fn merge(&mut self, other: CatalogReport) {
        self.admitted += other.admitted;
        self.skipped.extend(other.skipped);
    }
}

// ---------------------------------------------------------------------------
// Rate policy
// ---------------------------------------------------------------------------

/// How a resource's per-second rate is determined.
///
/// Most resources use the computed rate (structural base plus upgrade
/// bonus). A `Fixed` resource always runs at its canonical rate; the ledger
/// forces it back before every accrual so stale derived writes cannot drift
/// it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatePolicy {
    /// Rate follows structure output plus passive upgrades.
    #[default]
    Computed,
    /// Rate pinned to the given value.
    Fixed(f64),
}

// ---------------------------------------------------------------------------
// Resource entries
// ---------------------------------------------------------------------------

/// A resource definition as it appears in catalog data.
///
/// Required: `id`, `name`, `amount`, `per_second`, `unlocked`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceEntry {
    pub id: Option<String>,
    pub name: Option<String>,
    pub amount: Option<f64>,
    #[serde(alias = "perSecond")]
    pub per_second: Option<f64>,
    pub unlocked: Option<bool>,
    /// Capacity. `None` means unbounded.
    #[serde(alias = "maxAmount")]
    pub max_amount: Option<f64>,
    #[serde(alias = "clickPower")]
    pub click_power: Option<f64>,
    #[serde(alias = "ratePolicy")]
    pub rate_policy: Option<RatePolicy>,
}

impl ResourceEntry {
    /// Entry with every required field present.
    pub fn new(id: &str, name: &str, amount: f64, per_second: f64, unlocked: bool) -> Self {
        Self {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            amount: Some(amount),
            per_second: Some(per_second),
            unlocked: Some(unlocked),
            ..Self::default()
        }
    }

    pub fn with_max(mut self, max_amount: f64) -> Self {
        self.max_amount = Some(max_amount);
        self
    }

    pub fn with_click_power(mut self, click_power: f64) -> Self {
        self.click_power = Some(click_power);
        self
    }

    /// Pin the resource to `rate` regardless of production.
    pub fn with_fixed_rate(mut self, rate: f64) -> Self {
        self.rate_policy = Some(RatePolicy::Fixed(rate));
        self
    }

    /// Check required fields and value ranges.
    ///
    /// `position` labels the entry in error messages when it has no id.
    pub fn validate(self, position: usize) -> Result<ResourceDef, CatalogError> {
        let label = self
            .id
            .clone()
            .unwrap_or_else(|| format!("#{position}"));
        let missing = |field| CatalogError::MissingField {
            entry: label.clone(),
            field,
        };

        let key = self.id.clone().ok_or_else(|| missing("id"))?;
        let name = self.name.ok_or_else(|| missing("name"))?;
        let amount = self.amount.ok_or_else(|| missing("amount"))?;
        let per_second = self.per_second.ok_or_else(|| missing("per_second"))?;
        let unlocked = self.unlocked.ok_or_else(|| missing("unlocked"))?;

        if key.is_empty() {
            return Err(invalid(&label, "id", "must not be empty"));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(invalid(&label, "amount", "must be a non-negative finite number"));
        }
        if !per_second.is_finite() {
            return Err(invalid(&label, "per_second", "must be finite"));
        }
        if let Some(max) = self.max_amount {
            if max.is_nan() || max < 0.0 {
                return Err(invalid(&label, "max_amount", "must be non-negative"));
            }
        }
        if let Some(click) = self.click_power {
            if !click.is_finite() || click < 0.0 {
                return Err(invalid(&label, "click_power", "must be a non-negative finite number"));
            }
        }
        let rate_policy = self.rate_policy.unwrap_or_default();
        if let RatePolicy::Fixed(rate) = rate_policy {
            if !rate.is_finite() {
                return Err(invalid(&label, "rate_policy", "fixed rate must be finite"));
            }
        }

        // An infinite capacity is the same as no capacity.
        let max_amount = self.max_amount.filter(|m| m.is_finite());

        Ok(ResourceDef {
            key,
            name,
            amount,
            per_second,
            unlocked,
            max_amount,
            click_power: self.click_power,
            rate_policy,
        })
    }
}

fn invalid(entry: &str, field: &'static str, reason: &str) -> CatalogError {
    CatalogError::InvalidValue {
        entry: entry.to_string(),
        field,
        reason: reason.to_string(),
    }
}

/// A validated resource definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDef {
    pub key: String,
    pub name: String,
    pub amount: f64,
    pub per_second: f64,
    pub unlocked: bool,
    pub max_amount: Option<f64>,
    pub click_power: Option<f64>,
    pub rate_policy: RatePolicy,
}

// ---------------------------------------------------------------------------
// Structure entries
// ---------------------------------------------------------------------------

/// A structure definition as it appears in catalog data.
///
/// Required: `id`, `name`, `cost`, `production`, `unlocked`, `max_level`,
/// `max_workers`. `level` and `workers` default to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureEntry {
    pub id: Option<String>,
    pub name: Option<String>,
    pub cost: Option<BTreeMap<String, f64>>,
    pub production: Option<BTreeMap<String, f64>>,
    pub unlocked: Option<bool>,
    #[serde(alias = "maxLevel")]
    pub max_level: Option<u32>,
    #[serde(alias = "maxWorkers")]
    pub max_workers: Option<u32>,
    pub level: Option<u32>,
    pub workers: Option<u32>,
}

impl StructureEntry {
    /// Entry with empty cost and production vectors.
    pub fn new(id: &str, name: &str, unlocked: bool, max_level: u32, max_workers: u32) -> Self {
        Self {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            cost: Some(BTreeMap::new()),
            production: Some(BTreeMap::new()),
            unlocked: Some(unlocked),
            max_level: Some(max_level),
            max_workers: Some(max_workers),
            level: None,
            workers: None,
        }
    }

    pub fn with_cost(mut self, resource: &str, amount: f64) -> Self {
        self.cost
            .get_or_insert_with(BTreeMap::new)
            .insert(resource.to_string(), amount);
        self
    }

    pub fn with_production(mut self, resource: &str, rate: f64) -> Self {
        self.production
            .get_or_insert_with(BTreeMap::new)
            .insert(resource.to_string(), rate);
        self
    }

    /// Start the structure at `level` instead of zero.
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_workers(mut self, workers: u32) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Check required fields and value ranges. Resource references are
    /// resolved later, against the ledger.
    pub fn validate(self, position: usize) -> Result<StructureDef, CatalogError> {
        let label = self
            .id
            .clone()
            .unwrap_or_else(|| format!("#{position}"));
        let missing = |field| CatalogError::MissingField {
            entry: label.clone(),
            field,
        };

        let key = self.id.clone().ok_or_else(|| missing("id"))?;
        let name = self.name.ok_or_else(|| missing("name"))?;
        let cost = self.cost.ok_or_else(|| missing("cost"))?;
        let production = self.production.ok_or_else(|| missing("production"))?;
        let unlocked = self.unlocked.ok_or_else(|| missing("unlocked"))?;
        let max_level = self.max_level.ok_or_else(|| missing("max_level"))?;
        let max_workers = self.max_workers.ok_or_else(|| missing("max_workers"))?;

        if key.is_empty() {
            return Err(invalid(&label, "id", "must not be empty"));
        }
        if cost.values().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(invalid(&label, "cost", "amounts must be non-negative and finite"));
        }
        if production.values().any(|v| !v.is_finite()) {
            return Err(invalid(&label, "production", "rates must be finite"));
        }
        let level = self.level.unwrap_or(0);
        if level > max_level {
            return Err(invalid(&label, "level", "exceeds max_level"));
        }
        let workers = self.workers.unwrap_or(0);
        if workers > max_workers {
            return Err(invalid(&label, "workers", "exceeds max_workers"));
        }

        Ok(StructureDef {
            key,
            name,
            cost: cost.into_iter().collect(),
            production: production.into_iter().collect(),
            unlocked,
            max_level,
            max_workers,
            level,
            workers,
        })
    }
}

/// A validated structure definition with resource references still by key.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureDef {
    pub key: String,
    pub name: String,
    pub cost: Vec<(String, f64)>,
    pub production: Vec<(String, f64)>,
    pub unlocked: bool,
    pub max_level: u32,
    pub max_workers: u32,
    pub level: u32,
    pub workers: u32,
}

// ===========================================================================
// Tests
// ===========================================================================
