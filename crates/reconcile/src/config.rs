//! Provider configuration resolution.
//!
//! Every field resolves with the precedence explicit value, then
//! environment variable, then built-in default. Empty strings count as unset
//! at every layer. Resolution happens once per run; the resulting
//! [`ConnectionContext`] is read-only and shared by reference.

use crate::error::{Error, Result};
use crate::schema::ContextField;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "ovh-eu";

/// Missing-field entry reported when no authentication method is set.
pub const AUTH_FIELD: &str = "snowflake_password|snowflake_private_key";

/// Named API regions and their base URLs.
pub const ENDPOINTS: &[(&str, &str)] = &[
    ("ovh-eu", "https://eu.api.ovh.com/1.0"),
    ("ovh-ca", "https://ca.api.ovh.com/1.0"),
    ("ovh-us", "https://api.us.ovhcloud.com/1.0"),
    ("kimsufi-eu", "https://eu.api.kimsufi.com/1.0"),
    ("kimsufi-ca", "https://ca.api.kimsufi.com/1.0"),
    ("soyoustart-eu", "https://eu.api.soyoustart.com/1.0"),
    ("soyoustart-ca", "https://ca.api.soyoustart.com/1.0"),
];

/// Environment variables consulted by [`resolve`], by field.
pub const ENV_VARS: &[(&str, &[&str])] = &[
    ("ovh_endpoint", &["OVH_ENDPOINT"]),
    ("ovh_application_key", &["OVH_APPLICATION_KEY"]),
    ("ovh_application_secret", &["OVH_APPLICATION_SECRET"]),
    ("ovh_consumer_key", &["OVH_CONSUMER_KEY"]),
    ("snowflake_account", &["SNOWFLAKE_ACCOUNT"]),
    ("snowflake_username", &["SNOWFLAKE_USERNAME", "SNOWFLAKE_USER"]),
    ("snowflake_password", &["SNOWFLAKE_PASSWORD"]),
    ("snowflake_private_key", &["SNOWFLAKE_PRIVATE_KEY"]),
    ("snowflake_private_key_path", &["SNOWFLAKE_PRIVATE_KEY_PATH"]),
    ("snowflake_role", &["SNOWFLAKE_ROLE"]),
    ("snowflake_warehouse", &["SNOWFLAKE_WAREHOUSE"]),
    ("snowflake_database", &["SNOWFLAKE_DATABASE"]),
    ("snowflake_schema", &["SNOWFLAKE_SCHEMA"]),
];

/// Explicitly configured provider fields, typically a `[provider]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub ovh_endpoint: Option<String>,
    pub ovh_application_key: Option<String>,
    pub ovh_application_secret: Option<String>,
    pub ovh_consumer_key: Option<String>,
    pub snowflake_account: Option<String>,
    pub snowflake_username: Option<String>,
    pub snowflake_password: Option<String>,
    pub snowflake_private_key: Option<String>,
    pub snowflake_private_key_path: Option<String>,
    pub snowflake_role: Option<String>,
    pub snowflake_warehouse: Option<String>,
    pub snowflake_database: Option<String>,
    pub snowflake_schema: Option<String>,
}

impl ProviderConfig {
    fn explicit(&self, field: &str) -> Option<&str> {
        let value = match field {
            "ovh_endpoint" => &self.ovh_endpoint,
            "ovh_application_key" => &self.ovh_application_key,
            "ovh_application_secret" => &self.ovh_application_secret,
            "ovh_consumer_key" => &self.ovh_consumer_key,
            "snowflake_account" => &self.snowflake_account,
            "snowflake_username" => &self.snowflake_username,
            "snowflake_password" => &self.snowflake_password,
            "snowflake_private_key" => &self.snowflake_private_key,
            "snowflake_private_key_path" => &self.snowflake_private_key_path,
            "snowflake_role" => &self.snowflake_role,
            "snowflake_warehouse" => &self.snowflake_warehouse,
            "snowflake_database" => &self.snowflake_database,
            "snowflake_schema" => &self.snowflake_schema,
            _ => return None,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }
}

/// Snapshot of the environment variables the resolver reads.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the provider variables from the process environment
    pub fn capture() -> Self {
        ENV_VARS
            .iter()
            .flat_map(|(_, vars)| vars.iter())
            .filter_map(|var| std::env::var(var).ok().map(|v| (var.to_string(), v)))
            .collect()
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    /// Non-empty value of a variable
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// String whose `Debug` and `Display` never show the contents.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The secret value, for handing to a client
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

/// Where a private key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Inline(Secret),
    File(PathBuf),
}

/// Snowflake authentication method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    Password(Secret),
    KeyPair(KeySource),
}

impl fmt::Display for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => write!(f, "password"),
            Self::KeyPair(KeySource::Inline(_)) => write!(f, "key pair (inline)"),
            Self::KeyPair(KeySource::File(path)) => write!(f, "key pair ({})", path.display()),
        }
    }
}

/// Resolved API endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Region alias or the URL itself
    pub name: String,
    pub base_url: String,
}

impl Endpoint {
    /// Resolve a region alias or an `https://` URL.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for anything else.
    pub fn parse(value: &str) -> Result<Self> {
        if let Some((name, url)) = ENDPOINTS.iter().find(|(name, _)| *name == value) {
            return Ok(Self {
                name: (*name).to_string(),
                base_url: (*url).to_string(),
            });
        }
        if value.starts_with("https://") && value.len() > "https://".len() {
            return Ok(Self {
                name: value.to_string(),
                base_url: value.trim_end_matches('/').to_string(),
            });
        }
        let known: Vec<_> = ENDPOINTS.iter().map(|(name, _)| *name).collect();
        Err(Error::InvalidConfig {
            field: "ovh_endpoint".to_string(),
            reason: format!(
                "{value:?} is neither a known region ({}) nor an https:// URL",
                known.join(", ")
            ),
        })
    }
}

/// Resolved provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionContext {
    pub endpoint: Endpoint,
    pub application_key: String,
    pub application_secret: Secret,
    pub consumer_key: Secret,
    pub account: String,
    pub username: String,
    pub authentication: Authentication,
    pub role: Option<String>,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
}

impl ConnectionContext {
    /// Default value an attribute can take from this context
    pub fn default_for(&self, field: ContextField) -> Option<&str> {
        match field {
            ContextField::Warehouse => self.warehouse.as_deref(),
            ContextField::Database => self.database.as_deref(),
            ContextField::Schema => self.schema.as_deref(),
        }
    }
}

/// Resolve provider configuration from explicit values and the environment.
///
/// # Errors
///
/// Returns `Error::MissingConfig` listing every missing required field, or
/// `Error::InvalidConfig` for conflicting authentication or a bad endpoint.
/// Missing fields are reported first; conflicts and a bad endpoint surface
/// only once nothing required is missing.
pub fn resolve(explicit: &ProviderConfig, env: &Environment) -> Result<ConnectionContext> {
    let lookup = |field: &str| -> Option<String> {
        explicit
            .explicit(field)
            .or_else(|| {
                ENV_VARS
                    .iter()
                    .find(|(name, _)| *name == field)
                    .and_then(|(_, vars)| vars.iter().find_map(|var| env.get(var)))
            })
            .map(str::to_string)
    };

    let application_key = lookup("ovh_application_key");
    let application_secret = lookup("ovh_application_secret");
    let consumer_key = lookup("ovh_consumer_key");
    let account = lookup("snowflake_account");
    let username = lookup("snowflake_username");
    let password = lookup("snowflake_password");
    let private_key = lookup("snowflake_private_key");
    let private_key_path = lookup("snowflake_private_key_path");

    let mut missing = Vec::new();
    for (field, value) in [
        ("ovh_application_key", &application_key),
        ("ovh_application_secret", &application_secret),
        ("ovh_consumer_key", &consumer_key),
        ("snowflake_account", &account),
        ("snowflake_username", &username),
    ] {
        if value.is_none() {
            missing.push(field.to_string());
        }
    }
    if password.is_none() && private_key.is_none() && private_key_path.is_none() {
        missing.push(AUTH_FIELD.to_string());
    }

    let (
        Some(application_key),
        Some(application_secret),
        Some(consumer_key),
        Some(account),
        Some(username),
    ) = (application_key, application_secret, consumer_key, account, username)
    else {
        return Err(Error::MissingConfig { missing });
    };
    if !missing.is_empty() {
        return Err(Error::MissingConfig { missing });
    }

    let authentication = authentication(password, private_key, private_key_path)?;
    let endpoint = Endpoint::parse(&lookup("ovh_endpoint").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()))?;

    let context = ConnectionContext {
        endpoint,
        application_key,
        application_secret: Secret::new(application_secret),
        consumer_key: Secret::new(consumer_key),
        account,
        username,
        authentication,
        role: lookup("snowflake_role"),
        warehouse: lookup("snowflake_warehouse"),
        database: lookup("snowflake_database"),
        schema: lookup("snowflake_schema"),
    };

    info!(
        "Resolved provider configuration: endpoint={} account={} username={} auth={}",
        context.endpoint.base_url, context.account, context.username, context.authentication
    );
    Ok(context)
}

fn authentication(
    password: Option<String>,
    private_key: Option<String>,
    private_key_path: Option<String>,
) -> Result<Authentication> {
    let invalid = |reason: &str| Error::InvalidConfig {
        field: "snowflake_password".to_string(),
        reason: reason.to_string(),
    };
    match (password, private_key, private_key_path) {
        (Some(_), Some(_) | None, Some(_)) | (Some(_), Some(_), None) => Err(invalid(
            "password and private key are mutually exclusive; configure exactly one",
        )),
        (None, Some(_), Some(_)) => Err(Error::InvalidConfig {
            field: "snowflake_private_key".to_string(),
            reason: "set either an inline private key or a key path, not both".to_string(),
        }),
        (Some(password), None, None) => Ok(Authentication::Password(Secret::new(password))),
        (None, Some(key), None) => Ok(Authentication::KeyPair(KeySource::Inline(Secret::new(key)))),
        (None, None, Some(path)) => Ok(Authentication::KeyPair(KeySource::File(PathBuf::from(
            shellexpand::tilde(&path).as_ref(),
        )))),
        (None, None, None) => Err(Error::MissingConfig {
            missing: vec![AUTH_FIELD.to_string()],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> ProviderConfig {
        ProviderConfig {
            ovh_application_key: Some("ak".into()),
            ovh_application_secret: Some("as".into()),
            ovh_consumer_key: Some("ck".into()),
            snowflake_account: Some("acme".into()),
            snowflake_username: Some("loader".into()),
            snowflake_password: Some("hunter2".into()),
            ..ProviderConfig::default()
        }
    }

    fn missing(err: Error) -> Vec<String> {
        match err {
            Error::MissingConfig { missing } => missing,
            other => panic!("expected missing config, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_account_and_auth_reported_together() {
        let env = Environment::new()
            .with("SNOWFLAKE_ACCOUNT", "")
            .with("SNOWFLAKE_USERNAME", "u");
        let missing = missing(resolve(&ProviderConfig::default(), &env).unwrap_err());
        assert_eq!(
            missing,
            vec![
                "ovh_application_key",
                "ovh_application_secret",
                "ovh_consumer_key",
                "snowflake_account",
                AUTH_FIELD,
            ]
        );
    }

    #[test]
    fn test_missing_only_auth() {
        let config = ProviderConfig {
            snowflake_password: None,
            ..complete()
        };
        assert_eq!(missing(resolve(&config, &Environment::new()).unwrap_err()), vec![AUTH_FIELD]);
    }

    #[test]
    fn test_explicit_beats_environment() {
        let env = Environment::new()
            .with("SNOWFLAKE_ACCOUNT", "from-env")
            .with("SNOWFLAKE_WAREHOUSE", "ENV_WH");
        let ctx = resolve(&complete(), &env).unwrap();
        assert_eq!(ctx.account, "acme");
        assert_eq!(ctx.warehouse.as_deref(), Some("ENV_WH"));
    }

    #[test]
    fn test_empty_explicit_falls_through() {
        let config = ProviderConfig {
            snowflake_account: Some(String::new()),
            ..complete()
        };
        let env = Environment::new().with("SNOWFLAKE_ACCOUNT", "from-env");
        assert_eq!(resolve(&config, &env).unwrap().account, "from-env");
    }

    #[test]
    fn test_username_alias() {
        let config = ProviderConfig {
            snowflake_username: None,
            ..complete()
        };
        let env = Environment::new().with("SNOWFLAKE_USER", "legacy");
        assert_eq!(resolve(&config, &env).unwrap().username, "legacy");

        let env = env.with("SNOWFLAKE_USERNAME", "primary");
        assert_eq!(resolve(&config, &env).unwrap().username, "primary");
    }

    #[test]
    fn test_default_endpoint() {
        let ctx = resolve(&complete(), &Environment::new()).unwrap();
        assert_eq!(ctx.endpoint.name, "ovh-eu");
        assert_eq!(ctx.endpoint.base_url, "https://eu.api.ovh.com/1.0");
    }

    #[test]
    fn test_endpoint_aliases_and_urls() {
        assert_eq!(
            Endpoint::parse("ovh-ca").unwrap().base_url,
            "https://ca.api.ovh.com/1.0"
        );
        assert_eq!(
            Endpoint::parse("https://api.example.test/1.0/").unwrap().base_url,
            "https://api.example.test/1.0"
        );
        assert!(matches!(
            Endpoint::parse("http://insecure.test").unwrap_err(),
            Error::InvalidConfig { .. }
        ));
        assert!(Endpoint::parse("mars-1").is_err());
    }

    #[test]
    fn test_password_and_key_conflict() {
        let config = ProviderConfig {
            snowflake_private_key: Some("-----BEGIN".into()),
            ..complete()
        };
        assert!(matches!(
            resolve(&config, &Environment::new()).unwrap_err(),
            Error::InvalidConfig { .. }
        ));

        let env = Environment::new().with("SNOWFLAKE_PRIVATE_KEY_PATH", "/keys/rsa.p8");
        assert!(resolve(&complete(), &env).is_err());
    }

    #[test]
    fn test_missing_fields_reported_before_conflicts() {
        let config = ProviderConfig {
            snowflake_account: None,
            snowflake_private_key: Some("-----BEGIN".into()),
            ..complete()
        };
        assert_eq!(
            missing(resolve(&config, &Environment::new()).unwrap_err()),
            vec!["snowflake_account"]
        );

        let config = ProviderConfig {
            snowflake_private_key: Some("-----BEGIN".into()),
            ..complete()
        };
        assert!(matches!(
            resolve(&config, &Environment::new()).unwrap_err(),
            Error::InvalidConfig { .. }
        ));
    }

    #[test]
    fn test_inline_key_and_path_conflict() {
        let config = ProviderConfig {
            snowflake_password: None,
            snowflake_private_key: Some("-----BEGIN".into()),
            snowflake_private_key_path: Some("/keys/rsa.p8".into()),
            ..complete()
        };
        match resolve(&config, &Environment::new()).unwrap_err() {
            Error::InvalidConfig { field, .. } => assert_eq!(field, "snowflake_private_key"),
            other => panic!("expected invalid config, got {other:?}"),
        }
    }

    #[test]
    fn test_key_pair_from_path() {
        let config = ProviderConfig {
            snowflake_password: None,
            snowflake_private_key_path: Some("/keys/rsa.p8".into()),
            ..complete()
        };
        let ctx = resolve(&config, &Environment::new()).unwrap();
        assert_eq!(
            ctx.authentication,
            Authentication::KeyPair(KeySource::File(PathBuf::from("/keys/rsa.p8")))
        );
    }

    #[test]
    fn test_secrets_are_redacted() {
        let ctx = resolve(&complete(), &Environment::new()).unwrap();
        let debug = format!("{ctx:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("\"as\""));
        assert!(!debug.contains("\"ck\""));
        assert_eq!(ctx.consumer_key.to_string(), "***");
        assert_eq!(ctx.consumer_key.expose(), "ck");
    }

    #[test]
    fn test_context_defaults() {
        let config = ProviderConfig {
            snowflake_database: Some("ANALYTICS".into()),
            ..complete()
        };
        let ctx = resolve(&config, &Environment::new()).unwrap();
        assert_eq!(ctx.default_for(ContextField::Database), Some("ANALYTICS"));
        assert_eq!(ctx.default_for(ContextField::Schema), None);
    }

    #[test]
    fn test_provider_config_deserialize() {
        let config: ProviderConfig =
            serde_json::from_str(r#"{"snowflake_account": "acme", "snowflake_role": "SYSADMIN"}"#).unwrap();
        assert_eq!(config.snowflake_account.as_deref(), Some("acme"));
        assert_eq!(config.snowflake_role.as_deref(), Some("SYSADMIN"));
        assert!(serde_json::from_str::<ProviderConfig>(r#"{"region": "x"}"#).is_err());
    }
}
