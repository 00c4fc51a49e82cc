//! Idlework Core -- the economic simulation behind incremental ("idle")
//! games.
//!
//! This crate owns elapsed-time accounting, resource accrual, structure
//! production and worker allocation, and keeps them correct whether the game
//! is running, backgrounded, or resumed after a long absence.
//!
//! # Components
//!
//! Composed leaves first:
//!
//! 1. **Resource ledger** ([`ledger::Ledger`]) -- amounts, capacities and
//!    rates; accrual, spending, clicks and resource upgrades.
//! 2. **Worker allocation** ([`workforce::Workforce`]) -- the worker pool,
//!    per-structure assignment, distribution strategies and the staffing
//!    efficiency curve.
//! 3. **Structure production** ([`production::Production`]) -- levels,
//!    purchase pricing, and per-structure production folded into the
//!    ledger's base rates.
//! 4. **Simulation clock** ([`clock::SimClock`]) -- fixed-timestep updates,
//!    pause/resume, and offline reconciliation.
//!
//! [`economy::Economy`] wires the first three behind the command and query
//! surfaces; [`engine::Game`] adds the clock, the command queue and the time
//! seams.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut game = Game::builder(EconomyConfig::default())
//!     .resources(resources)
//!     .structures(structures)
//!     .build()?;
//! game.start();
//! loop {
//!     let report = game.frame();
//!     // render game.economy().resources() ...
//! }
//! ```

pub mod catalog;
pub mod clock;
pub mod command_queue;
pub mod config;
pub mod economy;
pub mod engine;
pub mod error;
pub mod id;
pub mod ledger;
pub mod production;
pub mod query;
pub mod serialize;
pub mod sim;
pub mod structure;
pub mod time;
pub mod workforce;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
