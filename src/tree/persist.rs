//! Versioned import/export and lazy tree materialization.

use super::legacy::{flatten_tree_to_legacy_map, migrate_flat_map_to_tree, LegacyFlatMap};
use super::PropTree;
use crate::error::ImportError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Schema version written by [`export_tree`]
pub const SCHEMA_VERSION: u64 = 1;

/// The user-property storage of one editable object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropsContainer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_props_tree: Option<PropTree>,
    /// Legacy flat map, still read by older hosts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_props: Option<LegacyFlatMap>,
}

impl PropsContainer {
    /// The tree, materialized on first access
    pub fn ensure_tree(&mut self) -> &mut PropTree {
        ensure_tree(self)
    }

    /// Rewrite the legacy map from the tree
    pub fn sync_legacy(&mut self) {
        if let Some(tree) = &self.user_props_tree {
            self.user_props = Some(flatten_tree_to_legacy_map(tree));
        }
    }
}

/// Materialize the container's tree, migrating its legacy map when present
pub fn ensure_tree(container: &mut PropsContainer) -> &mut PropTree {
    let legacy = &container.user_props;
    container.user_props_tree.get_or_insert_with(|| match legacy {
        Some(map) => {
            debug!(entries = map.len(), "Migrating legacy flat map");
            migrate_flat_map_to_tree(map)
        }
        None => PropTree::new(),
    })
}

/// Export document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedTree {
    pub schema_version: u64,
    pub exported_at: DateTime<Utc>,
    pub tree: PropTree,
}

/// Serialize a tree into a versioned JSON document
pub fn export_tree(tree: &PropTree) -> serde_json::Result<String> {
    let doc = ExportedTree {
        schema_version: SCHEMA_VERSION,
        exported_at: Utc::now(),
        tree: tree.clone(),
    };
    serde_json::to_string_pretty(&doc)
}

#[derive(Deserialize)]
struct VersionProbe {
    #[serde(rename = "schemaVersion")]
    schema_version: Option<u64>,
}

#[derive(Deserialize)]
struct LegacyDocument {
    #[serde(default)]
    props: LegacyFlatMap,
}

#[derive(Deserialize)]
struct CurrentDocument {
    tree: PropTree,
}

/// Parse a document produced by [`export_tree`].
///
/// Version `0` documents carry a legacy flat map under `props` and are
/// upgraded through migration.
pub fn import_tree(json: &str) -> Result<PropTree, ImportError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let probe: VersionProbe = serde_json::from_value(value.clone())?;
    let tree = match probe.schema_version {
        None => return Err(ImportError::Unversioned),
        Some(0) => {
            let doc: LegacyDocument = serde_json::from_value(value)?;
            debug!(entries = doc.props.len(), "Upgrading version 0 document");
            migrate_flat_map_to_tree(&doc.props)
        }
        Some(SCHEMA_VERSION) => serde_json::from_value::<CurrentDocument>(value)?.tree,
        Some(other) => return Err(ImportError::UnsupportedVersion(other)),
    };
    tree.check_invariants()?;
    Ok(tree)
}
