use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identifier of a launcher instance.
///
/// This is an opaque string handed to us by the instance manager. It is cheap
/// to clone and compares by string value.
#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(Arc<str>);

impl InstanceId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for InstanceId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// A category of listed asset.
///
/// This is a closed set known at compile time; every cache entry and every
/// invalidation event is scoped to exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Mod,
    ResourcePack,
    /// Resource packs pushed by a server, listed separately from the ones the
    /// user installed themselves.
    ServerResourcePack,
    ShaderPack,
    World,
    Schematic,
}

impl ResourceKind {
    pub const ALL: &'static [ResourceKind] = &[
        ResourceKind::Mod,
        ResourceKind::ResourcePack,
        ResourceKind::ServerResourcePack,
        ResourceKind::ShaderPack,
        ResourceKind::World,
        ResourceKind::Schematic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Mod => "mod",
            ResourceKind::ResourcePack => "resource_pack",
            ResourceKind::ServerResourcePack => "server_resource_pack",
            ResourceKind::ShaderPack => "shader_pack",
            ResourceKind::World => "world",
            ResourceKind::Schematic => "schematic",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One listed asset.
///
/// Entries are immutable values once produced by a [`ResourceLister`]: the
/// cache only ever replaces whole lists, it never patches an entry in place.
///
/// [`ResourceLister`]: crate::ResourceLister
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEntry {
    /// Display name, unique within its kind and instance at any instant, but
    /// not globally.
    pub name: String,

    /// Free-form description, possibly empty.
    #[serde(default)]
    pub description: String,

    /// Raw icon payload, if the asset ships one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Vec<u8>>,

    /// Path of the file this entry was listed from.
    pub file_path: PathBuf,

    /// Set for entries that were pushed by a server rather than installed
    /// locally.
    #[serde(default)]
    pub server_origin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_id_compares_by_value() {
        let a = InstanceId::from("survival-1.21");
        let b = InstanceId::new(String::from("survival-1.21"));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "survival-1.21");
    }

    #[test]
    fn kind_serde_uses_snake_case() {
        let json = serde_json::to_string(&ResourceKind::ServerResourcePack).unwrap();
        assert_eq!(json, "\"server_resource_pack\"");

        let kind: ResourceKind = serde_json::from_str("\"shader_pack\"").unwrap();
        assert_eq!(kind, ResourceKind::ShaderPack);
    }

    #[test]
    fn kinds_order_by_declaration() {
        // Kinds are used as ordered map keys; `ALL` doubles as the sorted
        // enumeration.
        assert!(ResourceKind::ALL.windows(2).all(|pair| pair[0] < pair[1]));

        let mut map = std::collections::BTreeMap::new();
        map.insert(ResourceKind::World, 1);
        map.insert(ResourceKind::Mod, 2);
        assert_eq!(map.keys().next(), Some(&ResourceKind::Mod));
    }

    #[test]
    fn entry_serde_is_camel_case() {
        let entry = ResourceEntry {
            name: "Faithful 32x".into(),
            description: "A double-resolution texture pack".into(),
            icon: None,
            file_path: PathBuf::from("/instances/survival/resourcepacks/faithful.zip"),
            server_origin: false,
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["filePath"], "/instances/survival/resourcepacks/faithful.zip");
        assert_eq!(json["serverOrigin"], false);
        assert!(json.get("icon").is_none());
    }
}
