use anyhow::{Result, bail};
use reconcile::config::{AUTH_FIELD, ENV_VARS};
use reconcile::{ConnectionContext, Environment, Error};

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::{Source, default_provider_path, load_provider_or_default};
use crate::ui;

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Check { config } => check(ctx, config.as_deref()),
        ConfigCommand::Path => path(),
    }
}

fn check(ctx: &Context, config: Option<&str>) -> Result<()> {
    let (provider, source) = load_provider_or_default(config)?;

    ui::header("Provider Configuration");
    match &source {
        Source::File(path) => ui::kv("file", &path.display().to_string()),
        Source::Environment(path) => {
            ui::kv("file", &format!("{} (not found, environment only)", path.display()));
        }
    }

    match reconcile::resolve(&provider, &Environment::capture()) {
        Ok(context) => {
            println!();
            for (key, value) in describe(&context) {
                ui::kv(key, &value);
            }
            println!();
            ui::success("Provider configuration resolved");
            Ok(())
        }
        Err(Error::MissingConfig { missing }) => {
            println!();
            for field in &missing {
                ui::error(&format!("{field} is not set"));
                if !ctx.quiet {
                    ui::dim(&hint(field));
                }
            }
            bail!("{} provider fields missing", missing.len())
        }
        Err(e) => {
            if ctx.verbose > 0 {
                ui::dim(e.category().advice());
            }
            Err(e.into())
        }
    }
}

fn path() -> Result<()> {
    println!("{}", default_provider_path()?.display());
    Ok(())
}

/// Key-value lines for a resolved context, secrets redacted
fn describe(context: &ConnectionContext) -> Vec<(&'static str, String)> {
    let optional = |value: &Option<String>| value.clone().unwrap_or_else(|| "(unset)".to_string());
    vec![
        (
            "endpoint",
            format!("{} ({})", context.endpoint.name, context.endpoint.base_url),
        ),
        ("application_key", context.application_key.clone()),
        ("application_secret", context.application_secret.to_string()),
        ("consumer_key", context.consumer_key.to_string()),
        ("account", context.account.clone()),
        ("username", context.username.clone()),
        ("authentication", context.authentication.to_string()),
        ("role", optional(&context.role)),
        ("warehouse", optional(&context.warehouse)),
        ("database", optional(&context.database)),
        ("schema", optional(&context.schema)),
    ]
}

/// Where a missing field can be supplied
fn hint(field: &str) -> String {
    let fields: Vec<&str> = if field == AUTH_FIELD {
        vec!["snowflake_password", "snowflake_private_key", "snowflake_private_key_path"]
    } else {
        vec![field]
    };
    let vars: Vec<&str> = fields
        .iter()
        .filter_map(|f| ENV_VARS.iter().find(|(name, _)| name == f))
        .flat_map(|(_, vars)| vars.iter().copied())
        .collect();
    format!(
        "Set {} in [provider] or export {}",
        fields.join(" / "),
        vars.join(" / ")
    )
}
