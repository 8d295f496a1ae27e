//! `floe types` and `floe schema <type>`

use anyhow::Result;
use colored::Colorize;
use reconcile::{Attribute, Mutability, ResourceSchema, Validator};

use crate::Context;
use crate::catalog;
use crate::ui;

pub fn types(ctx: &Context) -> Result<()> {
    let registry = catalog::registry()?;
    let mut schemas: Vec<_> = registry.schemas().collect();
    schemas.sort_by(|a, b| a.resource_type().cmp(b.resource_type()));

    if !ctx.quiet {
        ui::header("Resource Types");
    }
    let width = schemas
        .iter()
        .map(|s| s.resource_type().len())
        .max()
        .unwrap_or_default();
    for schema in &schemas {
        let kind = if schema.is_managed() {
            ui::pad("managed", 9).green()
        } else {
            ui::pad("read-only", 9).cyan()
        };
        println!(
            "  {}  {}  {:>2} attributes  {}",
            ui::pad(schema.resource_type(), width).bold(),
            kind,
            schema.attributes().len(),
            schema.path().dimmed()
        );
    }

    if !ctx.quiet {
        println!();
        ui::dim(&format!("{} types. Use 'floe schema <type>' for details.", schemas.len()));
    }
    Ok(())
}

pub fn show(_ctx: &Context, resource_type: &str) -> Result<()> {
    let registry = catalog::registry()?;
    let schema = registry.get(resource_type)?;

    ui::header(schema.resource_type());
    ui::kv("path", schema.path());
    ui::kv(
        "kind",
        if schema.is_managed() {
            "managed resource"
        } else {
            "read-only data source"
        },
    );

    let width = schema
        .attributes()
        .iter()
        .map(|a| a.name.len())
        .max()
        .unwrap_or_default();
    for section in sections(schema) {
        ui::section(section.0);
        for attr in section.1 {
            println!(
                "  {}  {}  {}",
                ui::pad(&attr.name, width),
                attr.kind.to_string().cyan(),
                describe(attr).join(", ").dimmed()
            );
        }
    }
    Ok(())
}

fn sections(schema: &ResourceSchema) -> Vec<(&'static str, Vec<&Attribute>)> {
    let pick = |keep: fn(&Attribute) -> bool| -> Vec<&Attribute> {
        schema.attributes().iter().filter(|a| keep(a)).collect()
    };
    let sections = vec![
        ("Required", pick(|a| a.required)),
        ("Optional", pick(|a| !a.required && !a.is_computed())),
        ("Computed", pick(Attribute::is_computed)),
    ];
    sections
        .into_iter()
        .filter(|(_, attrs)| !attrs.is_empty())
        .collect()
}

/// Flags shown next to an attribute
fn describe(attr: &Attribute) -> Vec<String> {
    let mut notes = Vec::new();
    if attr.mutability != Mutability::Mutable {
        notes.push(attr.mutability.to_string());
    }
    if attr.write_only {
        notes.push("write-only".to_string());
    }
    if let Some(default) = &attr.default {
        notes.push(format!("default {}", default.to_json()));
    }
    if let Some(field) = attr.context_default {
        notes.push(format!("default from {field}"));
    }
    if !matches!(attr.validator, Validator::Any) {
        notes.push(attr.validator.to_string());
    }
    if attr.wire_name != reconcile::schema::camel_case(&attr.name) {
        notes.push(format!("wire {}", attr.wire_name));
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warehouse() -> ResourceSchema {
        catalog::registry()
            .unwrap()
            .get("snowflake_warehouse")
            .unwrap()
            .clone()
    }

    #[test]
    fn test_describe_defaults_and_bounds() {
        let schema = warehouse();
        let suspend = schema.attribute("auto_suspend").unwrap();
        assert_eq!(describe(suspend), vec!["default 60", "at least 60"]);

        let name = schema.attribute("name").unwrap();
        assert_eq!(describe(name), vec!["immutable"]);
    }

    #[test]
    fn test_describe_write_only() {
        let registry = catalog::registry().unwrap();
        let user = registry.get("snowflake_user").unwrap();
        assert!(describe(user.attribute("password").unwrap()).contains(&"write-only".to_string()));
    }

    #[test]
    fn test_sections_partition_attributes() {
        let schema = warehouse();
        let sections = sections(&schema);
        assert_eq!(sections[0].0, "Required");
        let total: usize = sections.iter().map(|(_, attrs)| attrs.len()).sum();
        assert_eq!(total, schema.attributes().len());
    }
}
