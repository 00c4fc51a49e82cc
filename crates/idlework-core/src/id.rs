use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a resource in the ledger. Resolved from the resource's
    /// stable string key at registration time.
    pub struct ResourceId;

    /// Identifies a structure (building) in the structure table.
    pub struct StructureId;
}

/// The upgrade tracks a resource can be leveled along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    /// Raises the amount granted per manual click.
    ClickPower,
    /// Adds a fixed bonus per level on top of the structural rate.
    Passive,
}

impl UpgradeKind {
    /// Every upgrade kind.
    pub const ALL: [UpgradeKind; 2] = [UpgradeKind::ClickPower, UpgradeKind::Passive];
}

/// Anything that can name a resource: its [`ResourceId`] or its string key.
///
/// Lookups through this trait return `None` for unknown keys; there is no
/// panicking index path.
pub trait ResourceKey {
    fn resolve(&self, index: &std::collections::HashMap<String, ResourceId>) -> Option<ResourceId>;

    /// Label used in rejection messages.
    fn describe(&self) -> String;
}

impl ResourceKey for ResourceId {
    fn resolve(&self, _: &std::collections::HashMap<String, ResourceId>) -> Option<ResourceId> {
        Some(*self)
    }

    fn describe(&self) -> String {
        format!("{self:?}")
    }
}

impl ResourceKey for &str {
    fn resolve(&self, index: &std::collections::HashMap<String, ResourceId>) -> Option<ResourceId> {
        index.get(*self).copied()
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl ResourceKey for String {
    fn resolve(&self, index: &std::collections::HashMap<String, ResourceId>) -> Option<ResourceId> {
        index.get(self.as_str()).copied()
    }

    fn describe(&self) -> String {
        self.clone()
    }
}

impl ResourceKey for &String {
    fn resolve(&self, index: &std::collections::HashMap<String, ResourceId>) -> Option<ResourceId> {
        index.get(self.as_str()).copied()
    }

    fn describe(&self) -> String {
        (*self).clone()
    }
}

/// Anything that can name a structure: its [`StructureId`] or its string key.
pub trait StructureKey {
    fn resolve(
        &self,
        index: &std::collections::HashMap<String, StructureId>,
    ) -> Option<StructureId>;

    fn describe(&self) -> String;
}

impl StructureKey for StructureId {
    fn resolve(&self, _: &std::collections::HashMap<String, StructureId>) -> Option<StructureId> {
        Some(*self)
    }

    fn describe(&self) -> String {
        format!("{self:?}")
    }
}

impl StructureKey for &str {
    fn resolve(
        &self,
        index: &std::collections::HashMap<String, StructureId>,
    ) -> Option<StructureId> {
        index.get(*self).copied()
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl StructureKey for String {
    fn resolve(
        &self,
        index: &std::collections::HashMap<String, StructureId>,
    ) -> Option<StructureId> {
        index.get(self.as_str()).copied()
    }

    fn describe(&self) -> String {
        self.clone()
    }
}

impl StructureKey for &String {
    fn resolve(
        &self,
        index: &std::collections::HashMap<String, StructureId>,
    ) -> Option<StructureId> {
        index.get(self.as_str()).copied()
    }

    fn describe(&self) -> String {
        (*self).clone()
    }
}
