//! `floe plan <manifest> [--state snapshot.json]`

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use reconcile::{Action, ConnectionContext, Instance, Plan, PlanSummary, Registry};

use crate::Context;
use crate::catalog;
use crate::cli::PlanArgs;
use crate::config::expand_path;
use crate::manifest::{Manifest, load_snapshot};
use crate::ui;

/// Plan a manifest against recorded instances, optionally narrowed to a target
pub fn build(
    registry: &Registry,
    context: Option<&ConnectionContext>,
    manifest: &Manifest,
    recorded: &[Instance],
    target: Option<&str>,
) -> reconcile::Result<Plan> {
    let plan = reconcile::plan(registry, context, &manifest.instances(), recorded)?;
    Ok(plan.filter_by_target(target))
}

pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    let manifest = Manifest::load(&expand_path(&args.manifest))?;
    let recorded = match &args.state {
        Some(path) => load_snapshot(&expand_path(path))?,
        None => Vec::new(),
    };
    let registry = catalog::registry()?;
    let context = super::manifest_context(&manifest, ctx.quiet)?;

    let plan = build(
        &registry,
        context.as_ref(),
        &manifest,
        &recorded,
        args.target.as_deref(),
    )
    .context("Failed to plan")?;

    if !ctx.quiet {
        ui::header("Plan");
    }
    let summary = plan.summary();
    if !summary.has_changes() {
        ui::success(&format!(
            "No changes. {} resources up to date.",
            summary.unchanged
        ));
        return Ok(());
    }

    for change in &plan.changes {
        if !change.action.is_change() && ctx.verbose == 0 {
            continue;
        }
        println!(
            "  {} {}.{}{}",
            ui::action_marker(&change.action),
            change.resource_type,
            change.label.bold(),
            detail(&change.action).dimmed()
        );
    }

    println!();
    ui::info(&summary_line(&summary));
    Ok(())
}

/// Attribute list shown after an update or replacement
fn detail(action: &Action) -> String {
    match action {
        Action::Update { attributes, .. } => format!("  ({})", attributes.join(", ")),
        Action::Replace { attributes, .. } => {
            format!("  (forces replacement: {})", attributes.join(", "))
        }
        Action::Create { .. } | Action::Delete { .. } | Action::NoOp { .. } => String::new(),
    }
}

fn summary_line(summary: &PlanSummary) -> String {
    format!(
        "Plan: {} to create, {} to update, {} to replace, {} to delete, {} unchanged",
        summary.creates, summary.updates, summary.replaces, summary.deletes, summary.unchanged
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_snapshot;

    const MANIFEST: &str = r#"
[[resources]]
label = "analytics"
type = "snowflake_warehouse"
attributes = { name = "ANALYTICS", size = "MEDIUM" }

[[resources]]
label = "loader"
type = "snowflake_role"
attributes = { name = "LOADER" }

[[resources]]
label = "raw"
type = "snowflake_database"
attributes = { name = "RAW_V2" }
"#;

    const SNAPSHOT: &str = r#"{
  "analytics": {
    "type": "snowflake_warehouse",
    "id": "wh-1",
    "attributes": {
      "name": "ANALYTICS", "size": "SMALL", "max_cluster_count": 1, "min_cluster_count": 1,
      "auto_suspend": 60, "auto_resume": true, "initially_suspended": false,
      "scaling_policy": "STANDARD", "ovh_optimization": true, "cost_tracking": true,
      "performance_insights": false
    }
  },
  "raw": {
    "type": "snowflake_database",
    "id": "db-1",
    "attributes": { "name": "RAW" }
  },
  "legacy": {
    "type": "snowflake_role",
    "id": "role-9",
    "attributes": { "name": "LEGACY" }
  }
}"#;

    fn planned(target: Option<&str>) -> Plan {
        let registry = catalog::registry().unwrap();
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let recorded = parse_snapshot(SNAPSHOT).unwrap();
        build(&registry, None, &manifest, &recorded, target).unwrap()
    }

    #[test]
    fn test_build_plan() {
        let plan = planned(None);
        let verbs: Vec<_> = plan
            .changes
            .iter()
            .map(|c| (c.label.as_str(), c.action.verb()))
            .collect();
        assert_eq!(
            verbs,
            vec![
                ("analytics", "update"),
                ("loader", "create"),
                ("raw", "replace"),
                ("legacy", "delete"),
            ]
        );
        assert!(matches!(
            &plan.changes[0].action,
            Action::Update { attributes, .. } if attributes == &["size"]
        ));
    }

    #[test]
    fn test_build_plan_with_target() {
        let plan = planned(Some("snowflake_role"));
        let labels: Vec<_> = plan.changes.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["loader", "legacy"]);

        let plan = planned(Some("snowflake_database.raw"));
        assert_eq!(plan.changes.len(), 1);
    }

    #[test]
    fn test_detail() {
        let plan = planned(None);
        assert_eq!(detail(&plan.changes[0].action), "  (size)");
        assert_eq!(
            detail(&plan.changes[2].action),
            "  (forces replacement: name)"
        );
        assert_eq!(detail(&plan.changes[1].action), "");
    }

    #[test]
    fn test_summary_line() {
        let summary = planned(None).summary();
        assert_eq!(
            summary_line(&summary),
            "Plan: 1 to create, 1 to update, 1 to replace, 1 to delete, 0 unchanged"
        );
    }
}
