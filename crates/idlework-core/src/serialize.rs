//! Persistence snapshot of a game, plus a compact binary encoding.
//!
//! [`GameSnapshot`] is plain serde data; hosts may store it in any format.
//! [`encode`] and [`decode`] provide a `bitcode` encoding behind a versioned
//! header so stale or foreign blobs are refused before they are applied.

use crate::id::UpgradeKind;
use crate::time::Millis;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying an encoded game snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x1D1E_0001;

/// Current encoding version. Increment when the snapshot shape changes.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failure to write a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("could not encode game snapshot: {0}")]
    Encode(String),
}

/// Failure to read a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("not a game snapshot (magic 0x{0:08X})")]
    InvalidMagic(u32),
    #[error("snapshot version {0} is too old (current is {FORMAT_VERSION})")]
    UnsupportedVersion(u32),
    #[error("snapshot version {0} is newer than this build ({FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("could not decode game snapshot: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Snapshot shape
// ---------------------------------------------------------------------------

/// Saved state of one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub key: String,
    pub amount: f64,
    pub unlocked: bool,
    #[serde(default)]
    pub upgrade_levels: BTreeMap<UpgradeKind, u32>,
}

/// Saved state of one structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureSnapshot {
    pub key: String,
    pub level: u32,
    pub workers: u32,
    pub unlocked: bool,
}

/// Everything a save needs to resume a game. Balance constants and catalog
/// definitions are not included; they come from the host's data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub stage: u32,
    pub tick: u64,
    pub game_time: f64,
    /// Wall-clock time of the last persisted save, for offline progress.
    pub last_save_time: Option<Millis>,
    pub resources: Vec<ResourceSnapshot>,
    pub structures: Vec<StructureSnapshot>,
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Magic and version written ahead of the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    pub tick: u64,
}

impl SnapshotHeader {
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    /// Reject foreign data and incompatible versions.
    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Encoded {
    header: SnapshotHeader,
    snapshot: GameSnapshot,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a snapshot behind a versioned header.
pub fn encode(snapshot: &GameSnapshot) -> Result<Vec<u8>, SerializeError> {
    let encoded = Encoded {
        header: SnapshotHeader::new(snapshot.tick),
        snapshot: snapshot.clone(),
    };
    bitcode::serialize(&encoded).map_err(|e| SerializeError::Encode(e.to_string()))
}

/// Decode bytes written by [`encode`].
pub fn decode(data: &[u8]) -> Result<GameSnapshot, DeserializeError> {
    let encoded: Encoded =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    encoded.header.validate()?;
    Ok(encoded.snapshot)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> GameSnapshot {
        GameSnapshot {
            stage: 2,
            tick: 1234,
            game_time: 123.4,
            last_save_time: Some(1_700_000_000_000),
            resources: vec![ResourceSnapshot {
                key: "gold".into(),
                amount: 42.5,
                unlocked: true,
                upgrade_levels: BTreeMap::from([(UpgradeKind::Passive, 3)]),
            }],
            structures: vec![StructureSnapshot {
                key: "mine".into(),
                level: 4,
                workers: 2,
                unlocked: true,
            }],
        }
    }

    #[test]
    fn encoded_snapshot_decodes_unchanged() {
        let bytes = encode(&snapshot()).unwrap();
        assert_eq!(decode(&bytes).unwrap(), snapshot());
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let encoded = Encoded {
            header: SnapshotHeader {
                magic: 0xDEAD_BEEF,
                version: FORMAT_VERSION,
                tick: 0,
            },
            snapshot: snapshot(),
        };
        let bytes = bitcode::serialize(&encoded).unwrap();
        assert!(matches!(
            decode(&bytes),
            Err(DeserializeError::InvalidMagic(0xDEAD_BEEF))
        ));
    }

    #[test]
    fn future_version_is_rejected() {
        let header = SnapshotHeader {
            version: FORMAT_VERSION + 1,
            ..SnapshotHeader::new(0)
        };
        assert!(matches!(
            header.validate(),
            Err(DeserializeError::FutureVersion(_))
        ));
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(
            decode(&[]),
            Err(DeserializeError::Decode(_))
        ));
    }

    #[test]
    fn snapshot_is_plain_serde_data() {
        let json = serde_json::to_string(&snapshot()).unwrap();
        let back: GameSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot());
    }
}
