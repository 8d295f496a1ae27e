//! Manifest and state snapshot files
//!
//! A manifest declares the desired resources:
//!
//! ```toml
//! [provider]
//! snowflake_account = "acme"
//!
//! [[resources]]
//! label = "analytics"
//! type = "snowflake_warehouse"
//! [resources.attributes]
//! name = "ANALYTICS"
//! size = "SMALL"
//! ```
//!
//! A snapshot records what exists, as JSON keyed by label:
//!
//! ```json
//! { "analytics": { "type": "snowflake_warehouse", "id": "wh-42", "attributes": { "name": "ANALYTICS" } } }
//! ```

use anyhow::{Context, Result, bail};
use reconcile::{Instance, ProviderConfig, ResourceState, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Desired-state manifest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
    #[serde(default)]
    pub resources: Vec<ManifestResource>,
}

/// One declared resource
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestResource {
    pub label: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl Manifest {
    /// Parse a manifest, rejecting empty or duplicate labels
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(content).context("Invalid manifest")?;
        let mut seen = BTreeSet::new();
        for resource in &manifest.resources {
            if resource.label.trim().is_empty() {
                bail!("Resource of type {} has an empty label", resource.resource_type);
            }
            if !seen.insert(resource.label.as_str()) {
                bail!("Label '{}' is declared more than once", resource.label);
            }
        }
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to load {}", path.display()))
    }

    /// Desired instances in declaration order
    pub fn instances(&self) -> Vec<Instance> {
        self.resources
            .iter()
            .map(|r| {
                Instance::new(
                    r.label.clone(),
                    r.resource_type.clone(),
                    ResourceState {
                        id: String::new(),
                        attributes: r.attributes.clone(),
                    },
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotEntry {
    #[serde(rename = "type")]
    resource_type: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    attributes: BTreeMap<String, Value>,
}

/// Parse a JSON state snapshot into recorded instances, ordered by label
pub fn parse_snapshot(content: &str) -> Result<Vec<Instance>> {
    let entries: BTreeMap<String, SnapshotEntry> =
        serde_json::from_str(content).context("Invalid state snapshot")?;
    Ok(entries
        .into_iter()
        .map(|(label, entry)| {
            Instance::new(
                label,
                entry.resource_type,
                ResourceState {
                    id: entry.id,
                    attributes: entry.attributes,
                },
            )
        })
        .collect())
}

pub fn load_snapshot(path: &Path) -> Result<Vec<Instance>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
    parse_snapshot(&content).with_context(|| format!("Failed to load {}", path.display()))
}
