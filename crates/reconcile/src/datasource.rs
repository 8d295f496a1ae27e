//! Read-only listing with client-side filtering

use crate::codec::{self, json_type};
use crate::context::CancelToken;
use crate::error::{Error, Result};
use crate::remote::{RemoteClient, RemoteError};
use crate::schema::Registry;
use crate::types::{Operation, ResourceState, Value};
use log::debug;
use std::collections::BTreeMap;

/// Attribute equality constraints, combined with AND.
pub type Filter = BTreeMap<String, Value>;

/// Lists the instances of a collection.
///
/// Works for read-only data source types and managed types alike. Every call
/// hits the backend; nothing is cached.
#[derive(Debug, Clone, Copy)]
pub struct DataSourceReader<'a> {
    registry: &'a Registry,
}

impl<'a> DataSourceReader<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// List instances of `resource_type` matching every entry of `filter`.
    ///
    /// Filter values are coerced to the attribute's kind before comparing
    /// against decoded values, so `"60"` matches an integer 60.
    ///
    /// # Errors
    ///
    /// - `Validation` for a filter on an undeclared attribute or a value
    ///   that does not fit the attribute
    /// - `Read` if the listing call fails
    /// - `Protocol` if the response is not an array of objects
    /// - `Cancelled` if the token fires
    pub fn list(
        &self,
        client: &dyn RemoteClient,
        cancel: &CancelToken,
        resource_type: &str,
        filter: &Filter,
    ) -> Result<Vec<ResourceState>> {
        let schema = self.registry.get(resource_type)?;
        let wanted = schema.coerce(&ResourceState {
            id: String::new(),
            attributes: filter.clone(),
        })?;

        let cancelled = || Error::Cancelled {
            resource_type: resource_type.to_string(),
            id: None,
            operation: Operation::List,
        };
        if cancel.is_cancelled() {
            return Err(cancelled());
        }
        debug!("GET {} (list {resource_type})", schema.path());
        let response = match client.get(schema.path(), cancel) {
            Ok(response) => response,
            Err(RemoteError::Cancelled) => return Err(cancelled()),
            Err(source) => {
                return Err(Error::Read {
                    resource_type: resource_type.to_string(),
                    id: None,
                    operation: Operation::List,
                    source,
                });
            }
        };
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        let serde_json::Value::Array(items) = response else {
            return Err(Error::Protocol {
                resource_type: resource_type.to_string(),
                id: None,
                reason: format!("expected an array, got {}", json_type(&response)),
            });
        };

        let mut matches = Vec::new();
        for item in &items {
            let mut state = codec::decode(schema, item)?;
            schema.fill_missing(&mut state);
            let keep = wanted
                .attributes
                .iter()
                .all(|(name, value)| state.get(name) == Some(value));
            if keep {
                matches.push(state);
            }
        }
        debug!(
            "{resource_type}: {} of {} instances match",
            matches.len(),
            items.len()
        );
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{Method, MockRemote};
    use crate::test_support::{WAREHOUSES, registry};
    use serde_json::json;

    fn seeded() -> MockRemote {
        let mock = MockRemote::new();
        mock.insert(WAREHOUSES, "a", json!({"name": "A", "size": "SMALL", "autoSuspend": 60}));
        mock.insert(WAREHOUSES, "b", json!({"name": "B", "size": "LARGE", "autoSuspend": 60}));
        mock.insert(WAREHOUSES, "c", json!({"name": "C", "size": "SMALL", "autoSuspend": 600}));
        mock
    }

    #[test]
    fn test_list_all() {
        let registry = registry();
        let reader = DataSourceReader::new(&registry);
        let all = reader
            .list(&seeded(), &CancelToken::new(), "snowflake_warehouses", &Filter::new())
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, "a");
        assert_eq!(all[0].get("region"), Some(&Value::Null));
    }

    #[test]
    fn test_list_filters_conjunctively() {
        let registry = registry();
        let reader = DataSourceReader::new(&registry);
        let filter = Filter::from([
            ("size".to_string(), Value::from("SMALL")),
            ("auto_suspend".to_string(), Value::from("60")),
        ]);
        let found = reader
            .list(&seeded(), &CancelToken::new(), "snowflake_warehouse", &filter)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("name"), Some(&Value::from("A")));
    }

    #[test]
    fn test_list_unknown_filter_key() {
        let registry = registry();
        let reader = DataSourceReader::new(&registry);
        let mock = seeded();
        let filter = Filter::from([("colour".to_string(), Value::from("red"))]);
        let err = reader
            .list(&mock, &CancelToken::new(), "snowflake_warehouses", &filter)
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_list_non_array_is_protocol_error() {
        let registry = registry();
        let reader = DataSourceReader::new(&registry);
        let mock = MockRemote::new();
        mock.insert("/cloud/project/snowflake", "warehouse", json!({"unexpected": true}));
        let err = reader
            .list(&mock, &CancelToken::new(), "snowflake_warehouses", &Filter::new())
            .unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_list_failure_is_read_error() {
        let registry = registry();
        let reader = DataSourceReader::new(&registry);
        let mock = seeded();
        mock.fail_next(Method::Get, RemoteError::Transport("timeout".into()));
        let err = reader
            .list(&mock, &CancelToken::new(), "snowflake_warehouses", &Filter::new())
            .unwrap_err();
        assert!(matches!(err, Error::Read { id: None, .. }));
    }

    #[test]
    fn test_list_cancelled() {
        let registry = registry();
        let reader = DataSourceReader::new(&registry);
        let mock = seeded();
        mock.cancel_during(Method::Get);
        let err = reader
            .list(&mock, &CancelToken::new(), "snowflake_warehouses", &Filter::new())
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled { .. }));
    }
}
