//! Headless demonstration of the idlework economy.
//!
//! [`session::run_session`] plays a scripted session against a catalog on
//! a manual clock: clicks and purchases, a stretch of live frames, a long
//! pause, and a save that is resumed an hour later in a fresh game.

pub mod session;

/// Path to the catalog bundled with this crate.
pub fn bundled_data_dir() -> std::path::PathBuf {
    std::path::Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data")).to_path_buf()
}
