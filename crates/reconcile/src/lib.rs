//! # Reconcile
//!
//! Schema-driven reconciliation of remote resources.
//!
//! This crate converges resources held by a REST backend to match a declared
//! desired state. Every resource type is described by data: a
//! [`ResourceSchema`] lists its attributes, their kinds, which ones are
//! immutable and which ones the server assigns. One generic [`Reconciler`]
//! then performs create, read, update, delete and import for every type.
//!
//! ## Core Concepts
//!
//! - **ResourceSchema**: Attribute table for one type, kept in a [`Registry`]
//! - **ResourceState**: Identity plus attribute values of one instance
//! - **Reconciler**: Drives one instance through its lifecycle
//! - **Plan / execute**: Decide and apply the changes for many instances
//! - **DataSourceReader**: Lists and filters a collection
//!
//! ## Example
//!
//! ```
//! use reconcile::{
//!     Attribute, CancelToken, Environment, MockRemote, ProviderConfig, Reconciler, Registry,
//!     ResourceSchema, ResourceState, resolve,
//! };
//!
//! let mut registry = Registry::new();
//! registry
//!     .register(ResourceSchema::managed(
//!         "snowflake_role",
//!         "/cloud/project/snowflake/role",
//!         vec![
//!             Attribute::string("name").required().immutable(),
//!             Attribute::string("comment"),
//!         ],
//!     )?)?;
//!
//! let config = ProviderConfig {
//!     ovh_application_key: Some("ak".into()),
//!     ovh_application_secret: Some("as".into()),
//!     ovh_consumer_key: Some("ck".into()),
//!     snowflake_account: Some("acme".into()),
//!     snowflake_username: Some("loader".into()),
//!     snowflake_password: Some("hunter2".into()),
//!     ..ProviderConfig::default()
//! };
//! let context = resolve(&config, &Environment::new())?;
//!
//! let reconciler = Reconciler::new(&registry, &context);
//! let backend = MockRemote::new();
//! let role = reconciler.create(
//!     &backend,
//!     &CancelToken::new(),
//!     "snowflake_role",
//!     &ResourceState::new().with("name", "ANALYST"),
//! )?;
//! assert!(!role.is_absent());
//! # Ok::<(), reconcile::Error>(())
//! ```
//!
//! ## Seams
//!
//! - [`RemoteClient`]: The backend; [`MockRemote`] serves tests
//! - [`ProgressCallback`]: Receives execution progress
//! - [`CancelToken`]: Cooperative cancellation and deadlines
//!
//! The crate performs no I/O of its own: configuration resolution records a
//! private key path with `~` expanded but never reads the file.

pub mod codec;
pub mod config;
pub mod context;
pub mod datasource;
pub mod diff;
pub mod error;
pub mod executor;
pub mod planner;
pub mod reconciler;
pub mod remote;
pub mod schema;
pub mod types;

// Re-export main types at crate root
pub use config::{
    Authentication, ConnectionContext, Endpoint, Environment, KeySource, ProviderConfig, Secret, resolve,
};
pub use context::{CancelToken, NoProgress, ProgressCallback};
pub use datasource::{DataSourceReader, Filter};
pub use diff::{AttributeDiff, Change};
pub use error::{Error, ErrorCategory, Result};
pub use executor::{ExecuteReport, Outcome, execute};
pub use planner::{Action, Instance, Plan, PlanSummary, PlannedChange, plan, plan_instance};
pub use reconciler::Reconciler;
pub use remote::{MockRemote, RemoteClient, RemoteError, RemoteResult};
pub use schema::{Attribute, ContextField, Kind, Mutability, Registry, ResourceSchema, Validator};
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary, Operation, ResourceState, Value};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::{ConnectionContext, Environment, ProviderConfig, resolve};
    use crate::schema::{Attribute, ContextField, Registry, ResourceSchema};

    pub const WAREHOUSES: &str = "/cloud/project/snowflake/warehouse";
    pub const SCHEMAS: &str = "/cloud/project/snowflake/schema";
    pub const USERS: &str = "/cloud/project/snowflake/user";

    const SIZES: &[&str] = &["X-SMALL", "SMALL", "MEDIUM", "LARGE", "X-LARGE"];

    /// A small catalog covering defaults, bounds, context fallback,
    /// write-only and read-only types
    pub fn registry() -> Registry {
        let mut registry = Registry::new();
        let schemas = [
            ResourceSchema::managed(
                "snowflake_warehouse",
                WAREHOUSES,
                vec![
                    Attribute::string("name").required().immutable(),
                    Attribute::string("size").with_default("X-SMALL").one_of(SIZES),
                    Attribute::int("max_cluster_count").with_default(1).range(1, 10),
                    Attribute::int("auto_suspend").with_default(600).at_least(60),
                    Attribute::bool("auto_resume").with_default(true),
                    Attribute::string("resource_monitor"),
                    Attribute::string("comment"),
                    Attribute::string("state").computed(),
                    Attribute::string("type").computed(),
                    Attribute::string("created_on").computed(),
                ],
            ),
            ResourceSchema::managed(
                "snowflake_schema",
                SCHEMAS,
                vec![
                    Attribute::string("name").required().immutable(),
                    Attribute::string("database")
                        .immutable()
                        .default_null()
                        .from_context(ContextField::Database),
                    Attribute::string("comment"),
                    Attribute::string("created_on").computed(),
                ],
            ),
            ResourceSchema::managed(
                "snowflake_user",
                USERS,
                vec![
                    Attribute::string("name").required().immutable(),
                    Attribute::string("password").write_only(),
                    Attribute::bool("disabled").with_default(false),
                    Attribute::string("comment"),
                ],
            ),
            ResourceSchema::read_only(
                "snowflake_warehouses",
                WAREHOUSES,
                vec![
                    Attribute::string("name"),
                    Attribute::string("size"),
                    Attribute::int("auto_suspend"),
                    Attribute::string("region"),
                ],
            ),
        ];
        for schema in schemas {
            registry.register(schema.unwrap()).unwrap();
        }
        registry
    }

    pub fn context() -> ConnectionContext {
        let config = ProviderConfig {
            ovh_application_key: Some("ak".into()),
            ovh_application_secret: Some("as".into()),
            ovh_consumer_key: Some("ck".into()),
            snowflake_account: Some("acme".into()),
            snowflake_username: Some("loader".into()),
            snowflake_password: Some("hunter2".into()),
            snowflake_database: Some("ANALYTICS".into()),
            ..ProviderConfig::default()
        };
        resolve(&config, &Environment::new()).unwrap()
    }
}
