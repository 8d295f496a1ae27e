//! Attribute schemas and the resource type registry.
//!
//! A [`ResourceSchema`] is an ordered attribute table for one resource type.
//! Schemas are declared once at startup, checked for consistency, and then
//! only read. Everything the reconciler knows about a type (which fields are
//! immutable, which are server-assigned, how names map to the wire) comes
//! from here.

use crate::config::ConnectionContext;
use crate::error::{Error, Result};
use crate::types::{ResourceState, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Value shape of an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    String,
    Int,
    Bool,
    List(Box<Kind>),
    Map(Box<Kind>),
    /// Nested object with its own declared fields
    Object(Vec<Attribute>),
}

impl Kind {
    pub fn list(element: Kind) -> Self {
        Self::List(Box::new(element))
    }

    pub fn map(element: Kind) -> Self {
        Self::Map(Box::new(element))
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Int => write!(f, "int"),
            Self::Bool => write!(f, "bool"),
            Self::List(element) => write!(f, "list({element})"),
            Self::Map(element) => write!(f, "map({element})"),
            Self::Object(fields) => {
                let names: Vec<_> = fields.iter().map(|a| a.name.as_str()).collect();
                write!(f, "object({})", names.join(", "))
            }
        }
    }
}

/// How an attribute may change over an instance's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    /// Set at creation; changing it requires replacement
    Immutable,
    /// Updatable in place
    Mutable,
    /// Assigned by the server, never sent
    Computed,
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immutable => write!(f, "immutable"),
            Self::Mutable => write!(f, "mutable"),
            Self::Computed => write!(f, "computed"),
        }
    }
}

/// Value constraint, applied to a scalar or to every element of a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validator {
    Any,
    OneOf(&'static [&'static str]),
    Range { min: Option<i64>, max: Option<i64> },
}

impl Validator {
    fn check(&self, value: &Value) -> std::result::Result<(), String> {
        match (self, value) {
            (Self::OneOf(allowed), Value::String(s)) if !allowed.contains(&s.as_str()) => Err(
                format!("must be one of {}; got {s:?}", allowed.join(", ")),
            ),
            (Self::Range { min, max }, Value::Int(n)) => {
                let below = min.is_some_and(|m| *n < m);
                let above = max.is_some_and(|m| *n > m);
                if below || above {
                    Err(format!("must be {self}; got {n}"))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any value"),
            Self::OneOf(allowed) => write!(f, "one of {}", allowed.join(", ")),
            Self::Range {
                min: Some(min),
                max: Some(max),
            } => write!(f, "between {min} and {max}"),
            Self::Range {
                min: Some(min),
                max: None,
            } => write!(f, "at least {min}"),
            Self::Range {
                min: None,
                max: Some(max),
            } => write!(f, "at most {max}"),
            Self::Range {
                min: None,
                max: None,
            } => write!(f, "any integer"),
        }
    }
}

/// Connection context field an attribute can fall back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextField {
    Warehouse,
    Database,
    Schema,
}

impl fmt::Display for ContextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warehouse => write!(f, "snowflake_warehouse"),
            Self::Database => write!(f, "snowflake_database"),
            Self::Schema => write!(f, "snowflake_schema"),
        }
    }
}

/// One declared attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub wire_name: String,
    pub kind: Kind,
    pub mutability: Mutability,
    pub required: bool,
    pub default: Option<Value>,
    pub validator: Validator,
    /// Accepted by the backend but never returned
    pub write_only: bool,
    pub context_default: Option<ContextField>,
}

impl Attribute {
    /// Optional mutable attribute whose wire name is the camelCase of `name`
    pub fn new(name: &str, kind: Kind) -> Self {
        Self {
            name: name.to_string(),
            wire_name: camel_case(name),
            kind,
            mutability: Mutability::Mutable,
            required: false,
            default: None,
            validator: Validator::Any,
            write_only: false,
            context_default: None,
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, Kind::String)
    }

    pub fn int(name: &str) -> Self {
        Self::new(name, Kind::Int)
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, Kind::Bool)
    }

    pub fn list(name: &str, element: Kind) -> Self {
        Self::new(name, Kind::list(element))
    }

    pub fn map(name: &str, element: Kind) -> Self {
        Self::new(name, Kind::map(element))
    }

    /// List of nested objects
    pub fn objects(name: &str, fields: Vec<Attribute>) -> Self {
        Self::new(name, Kind::list(Kind::Object(fields)))
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn immutable(mut self) -> Self {
        self.mutability = Mutability::Immutable;
        self
    }

    #[must_use]
    pub fn computed(mut self) -> Self {
        self.mutability = Mutability::Computed;
        self
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Declare "absent at creation" as the default
    #[must_use]
    pub fn default_null(mut self) -> Self {
        self.default = Some(Value::Null);
        self
    }

    #[must_use]
    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.validator = Validator::OneOf(allowed);
        self
    }

    #[must_use]
    pub fn range(mut self, min: i64, max: i64) -> Self {
        self.validator = Validator::Range {
            min: Some(min),
            max: Some(max),
        };
        self
    }

    #[must_use]
    pub fn at_least(mut self, min: i64) -> Self {
        self.validator = Validator::Range {
            min: Some(min),
            max: None,
        };
        self
    }

    #[must_use]
    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    #[must_use]
    pub fn from_context(mut self, field: ContextField) -> Self {
        self.context_default = Some(field);
        self
    }

    /// Override the wire name
    #[must_use]
    pub fn wire(mut self, wire_name: &str) -> Self {
        self.wire_name = wire_name.to_string();
        self
    }

    pub fn is_computed(&self) -> bool {
        self.mutability == Mutability::Computed
    }

    pub fn is_immutable(&self) -> bool {
        self.mutability == Mutability::Immutable
    }
}

/// `auto_suspend` -> `autoSuspend`
pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, part) in name.split('_').filter(|p| !p.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(part);
            continue;
        }
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Location and message of a rejected value.
#[derive(Debug)]
struct Violation {
    path: String,
    reason: String,
}

impl Violation {
    fn new(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rules {
    /// Kind coercion only
    Shape,
    /// Kind coercion plus validators and nested required fields
    Full,
}

/// Coerce a scalar into `kind`, accepting the loose forms a config file or
/// a backend may produce.
pub(crate) fn coerce_scalar(kind: &Kind, value: &Value) -> Option<Value> {
    match (kind, value) {
        (_, Value::Null) => Some(Value::Null),
        (Kind::String, Value::String(_)) | (Kind::Int, Value::Int(_)) | (Kind::Bool, Value::Bool(_)) => {
            Some(value.clone())
        }
        (Kind::String, Value::Int(n)) => Some(Value::String(n.to_string())),
        (Kind::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
        (Kind::Int, Value::String(s)) => s.trim().parse().ok().map(Value::Int),
        (Kind::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn conform(attr: &Attribute, value: &Value, path: &str, rules: Rules) -> std::result::Result<Value, Violation> {
    let value = conform_kind(&attr.kind, value, path, rules)?;
    if rules == Rules::Full {
        let elements: Vec<(String, &Value)> = match &value {
            Value::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("{path}[{i}]"), v))
                .collect(),
            other => vec![(path.to_string(), other)],
        };
        for (at, element) in elements {
            attr.validator.check(element).map_err(|reason| Violation::new(&at, reason))?;
        }
    }
    Ok(value)
}

fn conform_kind(kind: &Kind, value: &Value, path: &str, rules: Rules) -> std::result::Result<Value, Violation> {
    match (kind, value) {
        (_, Value::Null) => Ok(Value::Null),
        (Kind::List(element), Value::List(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| conform_kind(element, item, &format!("{path}[{i}]"), rules))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::List),
        (Kind::Map(element), Value::Map(entries)) => entries
            .iter()
            .map(|(k, v)| Ok((k.clone(), conform_kind(element, v, &format!("{path}.{k}"), rules)?)))
            .collect::<std::result::Result<BTreeMap<_, _>, _>>()
            .map(Value::Map),
        (Kind::Object(fields), Value::Map(entries)) => conform_object(fields, entries, path, rules),
        (Kind::List(_) | Kind::Map(_) | Kind::Object(_), other) => Err(Violation::new(
            path,
            format!("expected {kind}, got {}", other.type_name()),
        )),
        (scalar, other) => coerce_scalar(scalar, other).ok_or_else(|| {
            Violation::new(path, format!("expected {kind}, got {}", describe(other)))
        }),
    }
}

fn conform_object(
    fields: &[Attribute],
    entries: &BTreeMap<String, Value>,
    path: &str,
    rules: Rules,
) -> std::result::Result<Value, Violation> {
    let mut out = BTreeMap::new();
    for (key, value) in entries {
        let field = fields
            .iter()
            .find(|f| f.name == *key)
            .ok_or_else(|| Violation::new(&format!("{path}.{key}"), "field is not declared"))?;
        out.insert(key.clone(), conform(field, value, &format!("{path}.{key}"), rules)?);
    }
    if rules == Rules::Full {
        for field in fields.iter().filter(|f| f.required) {
            if out.get(&field.name).is_none_or(Value::is_null) {
                return Err(Violation::new(&format!("{path}.{}", field.name), "required field is missing"));
            }
        }
    }
    Ok(Value::Map(out))
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{s:?}"),
        Value::Int(n) => n.to_string(),
        other => other.type_name().to_string(),
    }
}

/// Attribute table for one resource type.
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    resource_type: String,
    path: String,
    managed: bool,
    attributes: Vec<Attribute>,
}

impl ResourceSchema {
    /// Declare a type with full create/read/update/delete support.
    ///
    /// # Errors
    ///
    /// Returns `Error::Schema` if the attribute table is inconsistent.
    pub fn managed(resource_type: &str, path: &str, attributes: Vec<Attribute>) -> Result<Self> {
        Self::build(resource_type, path, true, attributes)
    }

    /// Declare a read-only type served by the data source reader.
    ///
    /// # Errors
    ///
    /// Returns `Error::Schema` if the attribute table is inconsistent.
    pub fn read_only(resource_type: &str, path: &str, attributes: Vec<Attribute>) -> Result<Self> {
        Self::build(resource_type, path, false, attributes)
    }

    fn build(resource_type: &str, path: &str, managed: bool, attributes: Vec<Attribute>) -> Result<Self> {
        if resource_type.is_empty() {
            return Err(Error::schema(resource_type, "resource type name is empty"));
        }
        if !path.starts_with('/') || path.ends_with('/') {
            return Err(Error::schema(
                resource_type,
                format!("collection path {path:?} must start with '/' and not end with one"),
            ));
        }
        check_unique(resource_type, "", &attributes)?;

        for attr in &attributes {
            if attr.name == "id" || attr.wire_name == "id" {
                return Err(Error::schema(resource_type, "attribute name \"id\" is reserved for the identity"));
            }
            match attr.mutability {
                Mutability::Immutable if !attr.required && attr.default.is_none() => {
                    return Err(Error::schema(
                        resource_type,
                        format!("immutable attribute {} must be required or declare a default", attr.name),
                    ));
                }
                Mutability::Computed if attr.required || attr.default.is_some() => {
                    return Err(Error::schema(
                        resource_type,
                        format!("computed attribute {} cannot be required or defaulted", attr.name),
                    ));
                }
                _ => {}
            }
        }

        Ok(Self {
            resource_type: resource_type.to_string(),
            path: path.to_string(),
            managed,
            attributes,
        })
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Collection path, e.g. `/cloud/project/snowflake/warehouse`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path of one instance in the collection
    pub fn instance_path(&self, id: &str) -> String {
        format!("{}/{id}", self.path)
    }

    pub fn is_managed(&self) -> bool {
        self.managed
    }

    /// Attributes in declaration order
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    fn declared(&self, name: &str) -> Result<&Attribute> {
        self.attribute(name)
            .ok_or_else(|| Error::validation(&self.resource_type, name, "attribute is not declared"))
    }

    fn violation(&self, v: Violation) -> Error {
        Error::validation(&self.resource_type, v.path, v.reason)
    }

    /// Coerce loosely typed input into each attribute's kind.
    ///
    /// Only shapes are checked here; allowed values, bounds and required
    /// attributes are left to [`validate`](Self::validate).
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for undeclared attributes and values that
    /// cannot be coerced.
    pub fn coerce(&self, desired: &ResourceState) -> Result<ResourceState> {
        let mut out = ResourceState::with_id(desired.id.clone());
        for (name, value) in &desired.attributes {
            let attr = self.declared(name)?;
            let value = conform(attr, value, name, Rules::Shape).map_err(|v| self.violation(v))?;
            out.attributes.insert(name.clone(), value);
        }
        Ok(out)
    }

    /// Validate a complete desired state.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` naming the first offending attribute.
    pub fn validate(&self, desired: &ResourceState) -> Result<()> {
        for (name, value) in &desired.attributes {
            let attr = self.declared(name)?;
            if attr.is_computed() {
                if value.is_null() {
                    continue;
                }
                return Err(Error::validation(
                    &self.resource_type,
                    name,
                    "computed attribute cannot be set",
                ));
            }
            conform(attr, value, name, Rules::Full).map_err(|v| self.violation(v))?;
        }
        for attr in self.attributes.iter().filter(|a| a.required) {
            if desired.get(&attr.name).is_none_or(Value::is_null) {
                return Err(Error::validation(
                    &self.resource_type,
                    &attr.name,
                    "required attribute is missing",
                ));
            }
        }
        Ok(())
    }

    /// Validate one value against its attribute's kind and constraints.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the value is rejected.
    pub fn validate_value(&self, name: &str, value: &Value) -> Result<()> {
        let attr = self.declared(name)?;
        conform(attr, value, name, Rules::Full)
            .map(|_| ())
            .map_err(|v| self.violation(v))
    }

    /// Fill declared and context defaults for attributes absent from `desired`.
    ///
    /// Context defaults take precedence over static ones and apply only when
    /// the connection context carries the field.
    pub fn apply_defaults(&self, desired: &ResourceState, context: Option<&ConnectionContext>) -> ResourceState {
        let mut out = desired.clone();
        for attr in self.attributes.iter().filter(|a| !a.is_computed()) {
            if out.attributes.contains_key(&attr.name) {
                continue;
            }
            let from_context = attr
                .context_default
                .zip(context)
                .and_then(|(field, ctx)| ctx.default_for(field))
                .map(Value::from);
            if let Some(value) = from_context.or_else(|| attr.default.clone()) {
                out.attributes.insert(attr.name.clone(), value);
            }
        }
        out
    }

    /// Insert `Null` for every declared attribute the state lacks.
    pub fn fill_missing(&self, state: &mut ResourceState) {
        for attr in &self.attributes {
            state.attributes.entry(attr.name.clone()).or_insert(Value::Null);
        }
    }
}

fn check_unique(resource_type: &str, prefix: &str, attributes: &[Attribute]) -> Result<()> {
    let mut names = BTreeSet::new();
    let mut wire_names = BTreeSet::new();
    for attr in attributes {
        if attr.name.is_empty() || attr.wire_name.is_empty() {
            return Err(Error::schema(resource_type, format!("{prefix}attribute with empty name")));
        }
        if !names.insert(attr.name.as_str()) {
            return Err(Error::schema(
                resource_type,
                format!("duplicate attribute {prefix}{}", attr.name),
            ));
        }
        if !wire_names.insert(attr.wire_name.as_str()) {
            return Err(Error::schema(
                resource_type,
                format!("duplicate wire name {prefix}{}", attr.wire_name),
            ));
        }
        let nested = match &attr.kind {
            Kind::Object(fields) => Some(fields),
            Kind::List(element) | Kind::Map(element) => match element.as_ref() {
                Kind::Object(fields) => Some(fields),
                _ => None,
            },
            _ => None,
        };
        if let Some(fields) = nested {
            check_unique(resource_type, &format!("{prefix}{}.", attr.name), fields)?;
        }
    }
    Ok(())
}

/// Registered resource types, keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    schemas: BTreeMap<String, ResourceSchema>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema.
    ///
    /// # Errors
    ///
    /// Returns `Error::Schema` if the type name is already registered.
    pub fn register(&mut self, schema: ResourceSchema) -> Result<()> {
        if self.schemas.contains_key(schema.resource_type()) {
            return Err(Error::schema(schema.resource_type(), "resource type registered twice"));
        }
        self.schemas.insert(schema.resource_type.clone(), schema);
        Ok(())
    }

    /// Look up a schema by type name.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownResourceType` if the type is not registered.
    pub fn get(&self, resource_type: &str) -> Result<&ResourceSchema> {
        self.schemas
            .get(resource_type)
            .ok_or_else(|| Error::UnknownResourceType {
                resource_type: resource_type.to_string(),
            })
    }

    /// Look up a schema that supports full reconciliation.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownResourceType` or `Error::NotManaged`.
    pub fn get_managed(&self, resource_type: &str) -> Result<&ResourceSchema> {
        let schema = self.get(resource_type)?;
        if !schema.is_managed() {
            return Err(Error::NotManaged {
                resource_type: resource_type.to_string(),
            });
        }
        Ok(schema)
    }

    /// Validate a desired state against its type's schema.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownResourceType` or `Error::Validation`.
    pub fn validate(&self, resource_type: &str, desired: &ResourceState) -> Result<()> {
        let schema = self.get(resource_type)?;
        schema.validate(&schema.coerce(desired)?)
    }

    /// Schemas ordered by type name
    pub fn schemas(&self) -> impl Iterator<Item = &ResourceSchema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZES: &[&str] = &["X-SMALL", "SMALL", "MEDIUM", "LARGE"];

    fn warehouse() -> ResourceSchema {
        ResourceSchema::managed(
            "test_warehouse",
            "/test/warehouse",
            vec![
                Attribute::string("name").required().immutable(),
                Attribute::string("size").with_default("X-SMALL").one_of(SIZES),
                Attribute::int("auto_suspend").with_default(60).at_least(60),
                Attribute::bool("auto_resume").with_default(true),
                Attribute::int("max_cluster_count").with_default(1).range(1, 10),
                Attribute::string("warehouse").from_context(ContextField::Warehouse),
                Attribute::map("tags", Kind::String),
                Attribute::string("state").computed(),
            ],
        )
        .unwrap()
    }

    fn table() -> ResourceSchema {
        ResourceSchema::managed(
            "test_table",
            "/test/table",
            vec![
                Attribute::string("name").required().immutable(),
                Attribute::objects(
                    "columns",
                    vec![
                        Attribute::string("name").required(),
                        Attribute::string("type").required(),
                        Attribute::bool("nullable").with_default(true),
                    ],
                )
                .required(),
                Attribute::list("triggers", Kind::Int).range(1, 100),
            ],
        )
        .unwrap()
    }

    fn reason(err: &Error) -> (&str, &str) {
        match err {
            Error::Validation { attribute, reason, .. } => (attribute, reason),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("auto_suspend"), "autoSuspend");
        assert_eq!(camel_case("web3_analytics"), "web3Analytics");
        assert_eq!(camel_case("name"), "name");
        assert_eq!(camel_case("data_retention_time_in_days"), "dataRetentionTimeInDays");
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let err = ResourceSchema::managed(
            "t",
            "/t",
            vec![Attribute::string("name").required(), Attribute::string("name")],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));

        let err = ResourceSchema::managed(
            "t",
            "/t",
            vec![Attribute::string("a").wire("x"), Attribute::string("b").wire("x")],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate wire name x"));
    }

    #[test]
    fn test_schema_rejects_nested_duplicates() {
        let err = ResourceSchema::managed(
            "t",
            "/t",
            vec![Attribute::objects(
                "columns",
                vec![Attribute::string("name"), Attribute::string("name")],
            )],
        )
        .unwrap_err();
        assert!(err.to_string().contains("columns.name"));
    }

    #[test]
    fn test_schema_rejects_reserved_id() {
        let err = ResourceSchema::managed("t", "/t", vec![Attribute::string("id")]).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn test_schema_immutable_needs_required_or_default() {
        assert!(ResourceSchema::managed("t", "/t", vec![Attribute::string("a").immutable()]).is_err());
        assert!(
            ResourceSchema::managed("t", "/t", vec![Attribute::string("a").immutable().default_null()]).is_ok()
        );
        assert!(
            ResourceSchema::managed("t", "/t", vec![Attribute::bool("a").immutable().with_default(false)]).is_ok()
        );
    }

    #[test]
    fn test_schema_computed_cannot_be_required() {
        assert!(ResourceSchema::managed("t", "/t", vec![Attribute::string("a").computed().required()]).is_err());
        assert!(ResourceSchema::managed("t", "/t", vec![Attribute::string("a").computed().with_default("x")]).is_err());
    }

    #[test]
    fn test_schema_path_shape() {
        assert!(ResourceSchema::managed("t", "t", vec![]).is_err());
        assert!(ResourceSchema::managed("t", "/t/", vec![]).is_err());
        assert_eq!(
            ResourceSchema::managed("t", "/a/t", vec![]).unwrap().instance_path("x"),
            "/a/t/x"
        );
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let schema = warehouse();
        let desired = schema.apply_defaults(&ResourceState::new().with("name", "wh1"), None);
        assert_eq!(desired.get("size"), Some(&Value::from("X-SMALL")));
        assert_eq!(desired.get("auto_resume"), Some(&Value::Bool(true)));
        assert!(desired.get("state").is_none());
        assert!(desired.get("warehouse").is_none());
        schema.validate(&desired).unwrap();
    }

    #[test]
    fn test_validate_required() {
        let err = warehouse().validate(&ResourceState::new().with("size", "SMALL")).unwrap_err();
        assert_eq!(reason(&err), ("name", "required attribute is missing"));

        let err = warehouse()
            .validate(&ResourceState::new().with("name", Value::Null))
            .unwrap_err();
        assert_eq!(reason(&err).0, "name");
    }

    #[test]
    fn test_validate_undeclared_and_computed() {
        let err = warehouse()
            .validate(&ResourceState::new().with("name", "w").with("color", "red"))
            .unwrap_err();
        assert_eq!(reason(&err), ("color", "attribute is not declared"));

        let err = warehouse()
            .validate(&ResourceState::new().with("name", "w").with("state", "STARTED"))
            .unwrap_err();
        assert_eq!(reason(&err), ("state", "computed attribute cannot be set"));

        warehouse()
            .validate(&ResourceState::new().with("name", "w").with("state", Value::Null))
            .unwrap();
    }

    #[test]
    fn test_validate_enum_and_bounds() {
        let schema = warehouse();
        let err = schema
            .validate(&ResourceState::new().with("name", "w").with("size", "HUGE"))
            .unwrap_err();
        let (attribute, why) = reason(&err);
        assert_eq!(attribute, "size");
        assert!(why.contains("one of X-SMALL"));

        let err = schema
            .validate(&ResourceState::new().with("name", "w").with("auto_suspend", 30))
            .unwrap_err();
        assert_eq!(reason(&err), ("auto_suspend", "must be at least 60; got 30"));

        let err = schema
            .validate(&ResourceState::new().with("name", "w").with("max_cluster_count", 11))
            .unwrap_err();
        assert_eq!(reason(&err), ("max_cluster_count", "must be between 1 and 10; got 11"));
    }

    #[test]
    fn test_validate_list_elements() {
        let schema = table();
        let columns = Value::List(vec![Value::Map(BTreeMap::from([
            ("name".to_string(), Value::from("id")),
            ("type".to_string(), Value::from("NUMBER")),
        ]))]);
        let err = schema
            .validate(
                &ResourceState::new()
                    .with("name", "t")
                    .with("columns", columns)
                    .with("triggers", vec![50, 150]),
            )
            .unwrap_err();
        assert_eq!(reason(&err), ("triggers[1]", "must be between 1 and 100; got 150"));
    }

    #[test]
    fn test_validate_nested_path() {
        let schema = table();
        let columns = Value::List(vec![
            Value::Map(BTreeMap::from([
                ("name".to_string(), Value::from("id")),
                ("type".to_string(), Value::from("NUMBER")),
            ])),
            Value::Map(BTreeMap::from([("name".to_string(), Value::from("label"))])),
        ]);
        let err = schema
            .validate(&ResourceState::new().with("name", "t").with("columns", columns))
            .unwrap_err();
        assert_eq!(reason(&err), ("columns[1].type", "required field is missing"));
    }

    #[test]
    fn test_coerce_loose_input() {
        let schema = warehouse();
        let coerced = schema
            .coerce(
                &ResourceState::new()
                    .with("name", "w")
                    .with("auto_suspend", "300")
                    .with("auto_resume", "false"),
            )
            .unwrap();
        assert_eq!(coerced.get("auto_suspend"), Some(&Value::Int(300)));
        assert_eq!(coerced.get("auto_resume"), Some(&Value::Bool(false)));

        let err = schema
            .coerce(&ResourceState::new().with("auto_suspend", "soon"))
            .unwrap_err();
        assert_eq!(reason(&err), ("auto_suspend", "expected int, got \"soon\""));
    }

    #[test]
    fn test_coerce_skips_constraints() {
        let coerced = warehouse()
            .coerce(&ResourceState::new().with("size", "HUGE"))
            .unwrap();
        assert_eq!(coerced.get("size"), Some(&Value::from("HUGE")));
    }

    #[test]
    fn test_coerce_rejects_shape_mismatch() {
        let err = warehouse()
            .coerce(&ResourceState::new().with("tags", "env=prod"))
            .unwrap_err();
        assert_eq!(reason(&err), ("tags", "expected map(string), got string"));
    }

    #[test]
    fn test_fill_missing() {
        let schema = warehouse();
        let mut state = ResourceState::with_id("w-1").with("name", "w");
        schema.fill_missing(&mut state);
        assert_eq!(state.attributes.len(), schema.attributes().len());
        assert_eq!(state.get("state"), Some(&Value::Null));
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = Registry::new();
        registry.register(warehouse()).unwrap();
        registry
            .register(ResourceSchema::read_only("test_list", "/test/warehouse", vec![]).unwrap())
            .unwrap();

        assert!(registry.get("test_warehouse").is_ok());
        assert!(matches!(
            registry.get("nope").unwrap_err(),
            Error::UnknownResourceType { .. }
        ));
        assert!(matches!(
            registry.get_managed("test_list").unwrap_err(),
            Error::NotManaged { .. }
        ));
        assert!(registry.register(warehouse()).is_err());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_validate_coerces_first() {
        let mut registry = Registry::new();
        registry.register(warehouse()).unwrap();
        registry
            .validate(
                "test_warehouse",
                &ResourceState::new().with("name", "w").with("auto_suspend", "120"),
            )
            .unwrap();
    }
}
