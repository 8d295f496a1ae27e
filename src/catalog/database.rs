//! Databases, schemas and the tables inside them

use super::managed;
use reconcile::{Attribute, ContextField, Kind, ResourceSchema, Result};

/// `database` and `schema` of an object living inside a schema
fn namespace() -> [Attribute; 2] {
    [
        Attribute::string("database")
            .required()
            .immutable()
            .from_context(ContextField::Database),
        Attribute::string("schema")
            .required()
            .immutable()
            .from_context(ContextField::Schema),
    ]
}

pub fn schemas() -> Result<Vec<ResourceSchema>> {
    let mut table = vec![Attribute::string("name").required().immutable()];
    table.extend(namespace());
    table.extend([
        Attribute::objects(
            "columns",
            vec![
                Attribute::string("name").required(),
                Attribute::string("type").required(),
                Attribute::bool("nullable").with_default(true),
                Attribute::string("default"),
                Attribute::string("comment"),
            ],
        )
        .required(),
        Attribute::string("comment"),
        Attribute::list("cluster_by", Kind::String),
        Attribute::int("data_retention_time_in_days"),
        Attribute::bool("change_tracking").with_default(false),
        Attribute::map("tags", Kind::String),
        Attribute::string("owner").computed(),
        Attribute::string("created_on").computed(),
    ]);

    let mut external_table = vec![Attribute::string("name").required().immutable()];
    external_table.extend(namespace());
    external_table.extend([
        Attribute::objects(
            "columns",
            vec![
                Attribute::string("name").required(),
                Attribute::string("type").required(),
                Attribute::string("as"),
            ],
        )
        .required(),
        Attribute::string("location").required(),
        Attribute::string("file_format"),
        Attribute::string("pattern"),
        Attribute::list("partition_by", Kind::String),
        Attribute::bool("auto_refresh").with_default(false),
        Attribute::bool("refresh_on_create").with_default(true),
        Attribute::string("comment"),
        Attribute::string("owner").computed(),
        Attribute::string("created_on").computed(),
    ]);

    Ok(vec![
        managed(
            "snowflake_database",
            "database",
            vec![
                Attribute::string("name").required().immutable(),
                Attribute::string("comment"),
                Attribute::int("data_retention_time_in_days").with_default(1),
                Attribute::string("from_share").immutable().default_null(),
                Attribute::string("from_database").immutable().default_null(),
                Attribute::string("from_replica").immutable().default_null(),
                Attribute::map("tags", Kind::String),
                Attribute::string("owner").computed(),
                Attribute::string("created_on").computed(),
            ],
        )?,
        managed(
            "snowflake_schema",
            "schema",
            vec![
                Attribute::string("name").required().immutable(),
                Attribute::string("database")
                    .required()
                    .immutable()
                    .from_context(ContextField::Database),
                Attribute::string("comment"),
                Attribute::bool("is_transient").immutable().with_default(false),
                Attribute::bool("is_managed").immutable().with_default(false),
                Attribute::int("data_retention_time_in_days"),
                Attribute::map("tags", Kind::String),
                Attribute::string("owner").computed(),
                Attribute::string("created_on").computed(),
            ],
        )?,
        managed("snowflake_table", "table", table)?,
        managed("snowflake_external_table", "external-table", external_table)?,
    ])
}
