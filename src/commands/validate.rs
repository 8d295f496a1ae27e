//! `floe validate <manifest>`

use anyhow::{Result, bail};
use reconcile::{ConnectionContext, Registry, ResourceState};
use std::path::Path;

use crate::Context;
use crate::catalog;
use crate::config::expand_path;
use crate::manifest::Manifest;
use crate::ui;

/// Outcome of validating one declared resource
#[derive(Debug)]
pub struct Checked {
    pub label: String,
    pub resource_type: String,
    /// Normalized state with defaults applied, or the rejection
    pub result: reconcile::Result<ResourceState>,
}

/// Coerce, default and validate every resource of a manifest
pub fn check(
    registry: &Registry,
    context: Option<&ConnectionContext>,
    manifest: &Manifest,
) -> Vec<Checked> {
    manifest
        .instances()
        .into_iter()
        .map(|instance| {
            let result = registry.get_managed(&instance.resource_type).and_then(|schema| {
                let state = schema.apply_defaults(&schema.coerce(&instance.state)?, context);
                schema.validate(&state)?;
                Ok(state)
            });
            Checked {
                label: instance.label,
                resource_type: instance.resource_type,
                result,
            }
        })
        .collect()
}

pub fn run(ctx: &Context, manifest: &str) -> Result<()> {
    let path = expand_path(manifest);
    let manifest = Manifest::load(&path)?;
    let registry = catalog::registry()?;
    let context = super::manifest_context(&manifest, ctx.quiet)?;

    if !ctx.quiet {
        ui::header(&format!("Validating {}", display_name(&path)));
    }

    let results = check(&registry, context.as_ref(), &manifest);
    let mut failed = 0;
    for checked in &results {
        let name = format!("{}.{}", checked.resource_type, checked.label);
        match &checked.result {
            Ok(state) => {
                if !ctx.quiet {
                    ui::success(&name);
                }
                if ctx.verbose > 0 {
                    for (key, value) in &state.attributes {
                        ui::kv(key, &value.to_json().to_string());
                    }
                }
            }
            Err(e) => {
                failed += 1;
                ui::error(&format!("{name}: {e}"));
                if ctx.verbose > 0 {
                    ui::dim(e.category().advice());
                }
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} resources are invalid", results.len());
    }
    if !ctx.quiet {
        println!();
        ui::success(&format!("{} resources valid", results.len()));
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
