use super::managed;
use reconcile::{Attribute, Kind, ResourceSchema, Result};

const SIZES: &[&str] = &[
    "X-SMALL", "SMALL", "MEDIUM", "LARGE", "X-LARGE", "2X-LARGE", "3X-LARGE", "4X-LARGE", "5X-LARGE",
    "6X-LARGE",
];

const SCALING_POLICIES: &[&str] = &["STANDARD", "ECONOMY"];

const FREQUENCIES: &[&str] = &["MONTHLY", "DAILY", "WEEKLY", "YEARLY", "NEVER"];

pub fn schemas() -> Result<Vec<ResourceSchema>> {
    Ok(vec![
        managed(
            "snowflake_warehouse",
            "warehouse",
            vec![
                Attribute::string("name").required().immutable(),
                Attribute::string("size").with_default("X-SMALL").one_of(SIZES),
                Attribute::int("max_cluster_count").with_default(1).range(1, 10),
                Attribute::int("min_cluster_count").with_default(1).range(1, 10),
                Attribute::int("auto_suspend").with_default(60).at_least(60),
                Attribute::bool("auto_resume").with_default(true),
                Attribute::bool("initially_suspended").with_default(false),
                Attribute::string("scaling_policy")
                    .with_default("STANDARD")
                    .one_of(SCALING_POLICIES),
                Attribute::string("resource_monitor"),
                Attribute::string("comment"),
                Attribute::bool("ovh_optimization").with_default(true),
                Attribute::bool("cost_tracking").with_default(true),
                Attribute::bool("performance_insights").with_default(false),
                Attribute::map("tags", Kind::String),
                Attribute::string("state").computed(),
                Attribute::string("type").computed(),
                Attribute::string("created_on").computed(),
            ],
        )?,
        managed(
            "snowflake_resource_monitor",
            "resource-monitor",
            vec![
                Attribute::string("name").required().immutable(),
                Attribute::int("credit_quota").at_least(1),
                Attribute::string("frequency").with_default("MONTHLY").one_of(FREQUENCIES),
                Attribute::string("start_timestamp"),
                Attribute::string("end_timestamp"),
                Attribute::list("notify_triggers", Kind::Int).range(1, 100),
                Attribute::list("suspend_triggers", Kind::Int).range(1, 100),
                Attribute::list("suspend_immediate_triggers", Kind::Int).range(1, 100),
                Attribute::list("notify_users", Kind::String),
                Attribute::string("comment"),
                Attribute::string("created_on").computed(),
                Attribute::string("owner").computed(),
            ],
        )?,
    ])
}
