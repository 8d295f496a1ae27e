use super::{collection, managed};
use reconcile::{Attribute, Kind, ResourceSchema, Result};

const REGIONS: &[&str] = &[
    "GRA", "SBG", "RBX", "BHS", "WAW", "DE", "UK", "SGP", "SYD", "US-EAST", "US-WEST",
];

const EDITIONS: &[&str] = &["STANDARD", "ENTERPRISE", "BUSINESS_CRITICAL", "VPS"];

const BLOCKCHAINS: &[&str] = &["ethereum", "bitcoin", "polygon", "avalanche", "solana"];

pub fn schemas() -> Result<Vec<ResourceSchema>> {
    Ok(vec![
        managed(
            "snowflake_account",
            "account",
            vec![
                Attribute::string("name").required().immutable(),
                Attribute::string("region").required().immutable().one_of(REGIONS),
                Attribute::string("edition").required().one_of(EDITIONS),
                Attribute::string("admin_name").required(),
                Attribute::string("admin_password").required().write_only(),
                Attribute::string("admin_email").required(),
                Attribute::string("comment"),
                Attribute::int("auto_suspend").with_default(60).range(1, 10080),
                Attribute::bool("auto_resume").with_default(true),
                Attribute::bool("web3_analytics").with_default(false),
                Attribute::list("blockchain_connectors", Kind::String).one_of(BLOCKCHAINS),
                Attribute::bool("cost_optimization").with_default(true),
                Attribute::bool("private_connectivity").with_default(false),
                Attribute::map("tags", Kind::String),
                Attribute::string("account_locator").computed(),
                Attribute::string("account_url").computed(),
                Attribute::string("organization_name").computed(),
                Attribute::string("status").computed(),
                Attribute::string("created_on").computed(),
            ],
        )?,
        // Read-only projection of the account collection, filterable by region and status
        ResourceSchema::read_only(
            "snowflake_accounts",
            &collection("account"),
            vec![
                Attribute::string("name"),
                Attribute::string("region"),
                Attribute::string("edition"),
                Attribute::string("url"),
                Attribute::string("status"),
                Attribute::string("created_on"),
                Attribute::map("tags", Kind::String),
            ],
        )?,
    ])
}
