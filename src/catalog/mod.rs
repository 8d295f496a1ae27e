//! Snowflake-on-OVH resource catalog
//!
//! Every type the provider knows is declared here as an attribute table.
//! The tables are grouped by family; [`registry`] collects them all.

mod access;
mod account;
mod compute;
mod database;
mod pipeline;

use reconcile::{Registry, ResourceSchema, Result};

/// Root of every collection path
pub const API_ROOT: &str = "/cloud/project/snowflake";

/// Collection path for a kebab-case collection name
fn collection(name: &str) -> String {
    format!("{API_ROOT}/{name}")
}

fn managed(resource_type: &str, name: &str, attributes: Vec<reconcile::Attribute>) -> Result<ResourceSchema> {
    ResourceSchema::managed(resource_type, &collection(name), attributes)
}

/// Build the registry holding every catalog type
pub fn registry() -> Result<Registry> {
    let mut registry = Registry::new();
    let families = [
        account::schemas()?,
        compute::schemas()?,
        database::schemas()?,
        access::schemas()?,
        pipeline::schemas()?,
    ];
    for schema in families.into_iter().flatten() {
        registry.register(schema)?;
    }
    log::debug!("Registered {} resource types", registry.len());
    Ok(registry)
}
