pub mod config;
pub mod plan;
pub mod schema;
pub mod validate;

use anyhow::Result;
use reconcile::{ConnectionContext, Environment, ProviderConfig};

use crate::manifest::Manifest;
use crate::ui;

/// Resolve a connection context, or `None` when the configuration is incomplete
pub fn context_for(provider: &ProviderConfig, env: &Environment) -> Option<ConnectionContext> {
    match reconcile::resolve(provider, env) {
        Ok(context) => Some(context),
        Err(e) => {
            log::info!("Provider context unavailable: {e}");
            None
        }
    }
}

/// Connection context for a manifest: its `[provider]` table, else the
/// default provider file, merged with the process environment
pub fn manifest_context(manifest: &Manifest, quiet: bool) -> Result<Option<ConnectionContext>> {
    let provider = match &manifest.provider {
        Some(provider) => provider.clone(),
        None => crate::config::load_provider_or_default(None)?.0,
    };
    let context = context_for(&provider, &Environment::capture());
    if context.is_none() && !quiet {
        ui::warn("Provider configuration incomplete; context defaults not applied");
    }
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_for_complete() {
        let provider = ProviderConfig {
            ovh_application_key: Some("ak".into()),
            ovh_application_secret: Some("as".into()),
            ovh_consumer_key: Some("ck".into()),
            snowflake_account: Some("acme".into()),
            snowflake_username: Some("loader".into()),
            snowflake_password: Some("hunter2".into()),
            snowflake_database: Some("ANALYTICS".into()),
            ..ProviderConfig::default()
        };
        let context = context_for(&provider, &Environment::new()).unwrap();
        assert_eq!(context.database.as_deref(), Some("ANALYTICS"));
    }

    #[test]
    fn test_context_for_incomplete() {
        assert!(context_for(&ProviderConfig::default(), &Environment::new()).is_none());
    }
}
