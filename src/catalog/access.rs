//! Users, roles, grants and network policies

use super::managed;
use reconcile::{Attribute, Kind, ResourceSchema, Result};

const PRIVILEGES: &[&str] = &[
    "SELECT",
    "INSERT",
    "UPDATE",
    "DELETE",
    "TRUNCATE",
    "REFERENCES",
    "USAGE",
    "CREATE",
    "MONITOR",
    "OPERATE",
    "READ",
    "WRITE",
    "ALL",
    "ALL PRIVILEGES",
];

const GRANT_TARGETS: &[&str] = &[
    "ACCOUNT",
    "DATABASE",
    "SCHEMA",
    "TABLE",
    "VIEW",
    "WAREHOUSE",
    "ROLE",
    "USER",
    "RESOURCE MONITOR",
    "INTEGRATION",
];

pub fn schemas() -> Result<Vec<ResourceSchema>> {
    Ok(vec![
        managed(
            "snowflake_user",
            "user",
            vec![
                Attribute::string("name").required().immutable(),
                Attribute::string("password").write_only(),
                Attribute::string("login_name"),
                Attribute::string("display_name"),
                Attribute::string("first_name"),
                Attribute::string("last_name"),
                Attribute::string("email"),
                Attribute::bool("must_change_password").with_default(false),
                Attribute::bool("disabled").with_default(false),
                Attribute::string("default_warehouse"),
                Attribute::string("default_namespace"),
                Attribute::string("default_role"),
                Attribute::string("comment"),
                Attribute::map("tags", Kind::String),
                Attribute::string("created_on").computed(),
                Attribute::string("login_name_computed").computed(),
                Attribute::string("display_name_computed").computed(),
            ],
        )?,
        managed(
            "snowflake_role",
            "role",
            vec![
                Attribute::string("name").required().immutable(),
                Attribute::string("comment"),
                Attribute::map("tags", Kind::String),
                Attribute::string("owner").computed(),
                Attribute::string("created_on").computed(),
            ],
        )?,
        // Grants cannot be altered; every attribute forces replacement
        managed(
            "snowflake_grant",
            "grant",
            vec![
                Attribute::string("privilege").required().immutable().one_of(PRIVILEGES),
                Attribute::string("on").required().immutable().one_of(GRANT_TARGETS),
                Attribute::string("object_name").immutable().default_null(),
                Attribute::string("to_role").immutable().default_null(),
                Attribute::string("to_user").immutable().default_null(),
                Attribute::bool("with_grant_option").immutable().with_default(false),
                Attribute::string("granted_on").computed(),
                Attribute::string("granted_to").computed(),
                Attribute::string("granted_by").computed(),
            ],
        )?,
        managed(
            "snowflake_network_policy",
            "network-policy",
            vec![
                Attribute::string("name").required().immutable(),
                Attribute::list("allowed_ip_list", Kind::String),
                Attribute::list("blocked_ip_list", Kind::String),
                Attribute::string("comment"),
                Attribute::string("created_on").computed(),
            ],
        )?,
    ])
}
