//! Balance constants and timing parameters.
//!
//! Every tunable number the simulation uses lives here and is passed in at
//! construction. The defaults are the reference balance values; games
//! override them from a TOML document:
//!
//! ```toml
//! [clock]
//! fixed_step_seconds = 0.05
//! offline_efficiency = 0.5
//!
//! [workforce]
//! base_allowance = 3
//! ```

use serde::{Deserialize, Serialize};

/// Errors produced while parsing or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Top-level configuration for one simulation instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub ledger: LedgerConfig,
    pub workforce: WorkforceConfig,
    pub production: ProductionConfig,
    pub clock: ClockConfig,
}

impl EconomyConfig {
    /// Parse a configuration document. Missing sections and fields keep their
    /// defaults. The result is validated before it is returned.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let l = &self.ledger;
        positive("ledger.click_base_cost", l.click_base_cost)?;
        at_least_one("ledger.click_cost_scale", l.click_cost_scale)?;
        non_negative("ledger.click_bonus_per_level", l.click_bonus_per_level)?;
        positive("ledger.passive_base_cost", l.passive_base_cost)?;
        at_least_one("ledger.passive_cost_scale", l.passive_cost_scale)?;
        non_negative("ledger.passive_bonus_per_level", l.passive_bonus_per_level)?;

        let w = &self.workforce;
        if !(w.peak_ratio > 0.0 && w.peak_ratio < 1.0) {
            return Err(invalid("workforce.peak_ratio", "must be strictly between 0 and 1"));
        }
        non_negative("workforce.peak_efficiency", w.peak_efficiency)?;
        non_negative("workforce.full_staff_efficiency", w.full_staff_efficiency)?;

        let p = &self.production;
        non_negative("production.level_bonus_per_level", p.level_bonus_per_level)?;
        non_negative("production.cost_scale_per_level", p.cost_scale_per_level)?;
        non_negative("production.idle_fraction", p.idle_fraction)?;

        let c = &self.clock;
        positive("clock.fixed_step_seconds", c.fixed_step_seconds)?;
        non_negative("clock.min_tick_seconds", c.min_tick_seconds)?;
        positive("clock.max_tick_seconds", c.max_tick_seconds)?;
        if c.min_tick_seconds > c.max_tick_seconds {
            return Err(invalid(
                "clock.min_tick_seconds",
                "must not exceed clock.max_tick_seconds",
            ));
        }
        if c.max_updates_per_frame == 0 {
            return Err(invalid("clock.max_updates_per_frame", "must be at least 1"));
        }
        if c.recalc_interval_ticks == 0 {
            return Err(invalid("clock.recalc_interval_ticks", "must be at least 1"));
        }
        if c.persist_interval_ticks == 0 {
            return Err(invalid("clock.persist_interval_ticks", "must be at least 1"));
        }
        non_negative("clock.long_pause_threshold_seconds", c.long_pause_threshold_seconds)?;
        if !(0.0..=1.0).contains(&c.offline_efficiency) {
            return Err(invalid("clock.offline_efficiency", "must be within [0, 1]"));
        }
        non_negative("clock.max_offline_seconds", c.max_offline_seconds)?;
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn positive(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a positive finite number"))
    }
}

fn non_negative(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a non-negative finite number"))
    }
}

fn at_least_one(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v >= 1.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be at least 1"))
    }
}

/// Resource upgrade pricing and bonuses.
///
/// Upgrade cost follows `base_cost * cost_scale ^ current_level` and is paid
/// in the upgraded resource itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub click_base_cost: f64,
    pub click_cost_scale: f64,
    /// Click power added per click-power level.
    pub click_bonus_per_level: f64,
    pub passive_base_cost: f64,
    pub passive_cost_scale: f64,
    /// Per-second rate added per passive level.
    pub passive_bonus_per_level: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            click_base_cost: 10.0,
            click_cost_scale: 1.5,
            click_bonus_per_level: 1.0,
            passive_base_cost: 25.0,
            passive_cost_scale: 1.6,
            passive_bonus_per_level: 0.5,
        }
    }
}

/// Worker pool size and the staffing efficiency curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkforceConfig {
    pub base_allowance: u32,
    pub stage_increment: u32,
    /// Staffing ratio at which the efficiency curve peaks.
    pub peak_ratio: f64,
    pub peak_efficiency: f64,
    /// Efficiency at 100% staffing (the overstaffing floor).
    pub full_staff_efficiency: f64,
}

impl Default for WorkforceConfig {
    fn default() -> Self {
        Self {
            base_allowance: 5,
            stage_increment: 3,
            peak_ratio: 0.8,
            peak_efficiency: 2.0,
            full_staff_efficiency: 1.0,
        }
    }
}

/// Structure production and pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionConfig {
    pub level_bonus_per_level: f64,
    pub cost_scale_per_level: f64,
    /// Production multiplier for a structure with no workers.
    pub idle_fraction: f64,
    /// Charge the level-scaled cost on purchase instead of the base cost.
    pub scale_purchase_cost: bool,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            level_bonus_per_level: 0.1,
            cost_scale_per_level: 0.15,
            idle_fraction: 0.1,
            scale_purchase_cost: false,
        }
    }
}

/// Fixed-timestep loop and offline reconciliation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub fixed_step_seconds: f64,
    pub min_tick_seconds: f64,
    pub max_tick_seconds: f64,
    pub max_updates_per_frame: u32,
    /// Recalculate all production every N fixed updates.
    pub recalc_interval_ticks: u64,
    /// Persist the last-tick timestamp every M fixed updates.
    pub persist_interval_ticks: u64,
    pub long_pause_threshold_seconds: f64,
    pub offline_enabled: bool,
    pub offline_efficiency: f64,
    pub max_offline_seconds: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            fixed_step_seconds: 0.1,
            min_tick_seconds: 0.001,
            max_tick_seconds: 1.0,
            max_updates_per_frame: 10,
            recalc_interval_ticks: 50,
            persist_interval_ticks: 300,
            long_pause_threshold_seconds: 60.0,
            offline_enabled: true,
            offline_efficiency: 0.7,
            max_offline_seconds: 12.0 * 60.0 * 60.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        EconomyConfig::default().validate().unwrap();
    }

    #[test]
    fn recalc_cadence_is_five_game_seconds() {
        let c = ClockConfig::default();
        let seconds = c.recalc_interval_ticks as f64 * c.fixed_step_seconds;
        assert!((seconds - 5.0).abs() < 1e-9);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EconomyConfig::from_toml_str(
            r#"
            [clock]
            offline_efficiency = 0.5

            [workforce]
            base_allowance = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.clock.offline_efficiency, 0.5);
        assert_eq!(config.clock.fixed_step_seconds, 0.1);
        assert_eq!(config.workforce.base_allowance, 2);
        assert_eq!(config.workforce.stage_increment, 3);
        assert_eq!(config.ledger, LedgerConfig::default());
    }

    #[test]
    fn empty_document_is_default() {
        let config = EconomyConfig::from_toml_str("").unwrap();
        assert_eq!(config, EconomyConfig::default());
    }

    #[test]
    fn offline_efficiency_above_one_rejected() {
        let err = EconomyConfig::from_toml_str("[clock]\noffline_efficiency = 1.5\n").unwrap_err();
        match err {
            ConfigError::Invalid { field, .. } => assert_eq!(field, "clock.offline_efficiency"),
            other => panic!("expected Invalid, got: {other:?}"),
        }
    }

    #[test]
    fn inverted_tick_clamp_rejected() {
        let mut config = EconomyConfig::default();
        config.clock.min_tick_seconds = 2.0;
        config.clock.max_tick_seconds = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_fixed_step_rejected() {
        let mut config = EconomyConfig::default();
        config.clock.fixed_step_seconds = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn peak_ratio_must_be_interior() {
        let mut config = EconomyConfig::default();
        config.workforce.peak_ratio = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = EconomyConfig::from_toml_str("[clock\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
