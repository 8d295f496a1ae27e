//! Change capture and ingestion: streams, pipes and tasks

use super::managed;
use reconcile::{Attribute, ContextField, Kind, ResourceSchema, Result};

/// Name plus the `database`/`schema` pair the object lives in
fn located() -> Vec<Attribute> {
    vec![
        Attribute::string("name").required().immutable(),
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
    let mut stream = located();
    stream.extend([
        Attribute::string("on_table").immutable().default_null(),
        Attribute::string("on_view").immutable().default_null(),
        Attribute::bool("append_only").immutable().with_default(false),
        Attribute::bool("show_initial_rows").immutable().with_default(false),
        Attribute::string("comment"),
        Attribute::string("owner").computed(),
        Attribute::string("created_on").computed(),
        Attribute::string("table_name").computed(),
        Attribute::string("type").computed(),
        Attribute::bool("stale").computed(),
        Attribute::string("mode").computed(),
    ]);

    let mut pipe = located();
    pipe.extend([
        Attribute::string("copy_statement").required(),
        Attribute::bool("auto_ingest").with_default(false),
        Attribute::string("aws_sns_topic"),
        Attribute::string("integration"),
        Attribute::string("comment"),
        Attribute::string("notification_channel").computed(),
        Attribute::string("owner").computed(),
        Attribute::string("created_on").computed(),
    ]);

    let mut task = located();
    task.extend([
        Attribute::string("sql_statement").required(),
        Attribute::string("warehouse").from_context(ContextField::Warehouse),
        Attribute::string("schedule"),
        Attribute::map("session_parameters", Kind::String),
        Attribute::int("user_task_timeout_ms"),
        Attribute::string("comment"),
        Attribute::list("after", Kind::String),
        Attribute::string("when"),
        Attribute::bool("enabled").with_default(false),
        Attribute::string("owner").computed(),
        Attribute::string("created_on").computed(),
        Attribute::string("state").computed(),
        Attribute::string("definition").computed(),
        Attribute::string("condition").computed(),
    ]);

    Ok(vec![
        managed("snowflake_stream", "stream", stream)?,
        managed("snowflake_pipe", "pipe", pipe)?,
        managed("snowflake_task", "task", task)?,
    ])
}
