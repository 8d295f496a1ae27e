//! Resource reconciler: create, read, update, delete and import.
//!
//! One generic reconciler serves every managed resource type; all
//! per-type behavior comes from the [`ResourceSchema`]. Operations take the
//! caller's state by reference and return a new snapshot, so a failed
//! operation leaves the caller's prior state untouched.
//!
//! Lifecycle of one instance:
//!
//! ```text
//! Absent --create--> Present --update--> Present --delete--> Absent
//!                       |                                      ^
//!                       +---------- read (not found) ----------+
//! ```

use crate::codec;
use crate::config::ConnectionContext;
use crate::context::CancelToken;
use crate::diff::AttributeDiff;
use crate::error::{Error, Result};
use crate::remote::{RemoteClient, RemoteError, RemoteResult};
use crate::schema::{Registry, ResourceSchema};
use crate::types::{Operation, ResourceState, Value};
use log::{debug, info, warn};

/// Drives one resource instance through its lifecycle.
///
/// The reconciler holds no mutable state and no per-identity locks: callers
/// must not reconcile the same identity from two threads at once. Distinct
/// identities may be reconciled concurrently.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'a> {
    registry: &'a Registry,
    context: &'a ConnectionContext,
}

impl<'a> Reconciler<'a> {
    pub fn new(registry: &'a Registry, context: &'a ConnectionContext) -> Self {
        Self { registry, context }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Create an instance and return its fully resolved state.
    ///
    /// Defaults are applied and the desired state validated before any remote
    /// call. After the create succeeds the instance is read back, so computed
    /// attributes are populated.
    ///
    /// # Errors
    ///
    /// - `Validation` if the desired state is invalid
    /// - `Write` if the create call fails
    /// - `Protocol` if the response has no identity or the new instance
    ///   cannot be read back
    /// - `Read` (carrying the new identity) if the follow-up read fails
    /// - `Cancelled` if the token fires
    pub fn create(
        &self,
        client: &dyn RemoteClient,
        cancel: &CancelToken,
        resource_type: &str,
        desired: &ResourceState,
    ) -> Result<ResourceState> {
        let schema = self.registry.get_managed(resource_type)?;
        let desired = schema.apply_defaults(&schema.coerce(desired)?, Some(self.context));
        schema.validate(&desired)?;

        let body = codec::create_payload(schema, &desired);
        debug!("POST {} for {resource_type}", schema.path());
        let response = self
            .dispatch(cancel, schema, None, Operation::Create, || {
                client.post(schema.path(), &body, cancel)
            })?
            .map_err(|source| Error::Write {
                resource_type: resource_type.to_string(),
                id: None,
                operation: Operation::Create,
                source,
            })?;

        let id = codec::identity(&response).ok_or_else(|| Error::Protocol {
            resource_type: resource_type.to_string(),
            id: None,
            reason: "create response carries no identity".to_string(),
        })?;
        self.ensure_live(cancel, schema, Some(&id), Operation::Create)?;
        info!("Created {resource_type} {id}");

        let pending = ResourceState {
            id: id.clone(),
            attributes: desired.attributes,
        };
        let state = self.fetch(client, cancel, schema, &pending, Operation::Create)?;
        if state.is_absent() {
            return Err(Error::Protocol {
                resource_type: resource_type.to_string(),
                id: Some(id),
                reason: "created instance could not be read back".to_string(),
            });
        }
        Ok(state)
    }

    /// Refresh an instance from the backend.
    ///
    /// A missing instance is not an error: the returned state has its
    /// identity cleared. A state that is already absent is returned as-is
    /// without a remote call.
    ///
    /// # Errors
    ///
    /// `Read`, `Protocol` or `Cancelled`; the caller's state is untouched.
    pub fn read(
        &self,
        client: &dyn RemoteClient,
        cancel: &CancelToken,
        resource_type: &str,
        current: &ResourceState,
    ) -> Result<ResourceState> {
        let schema = self.registry.get_managed(resource_type)?;
        if current.is_absent() {
            return Ok(current.clone());
        }
        self.fetch(client, cancel, schema, current, Operation::Read)
    }

    /// Apply in-place changes.
    ///
    /// Attributes absent from `desired` are left alone. Changes to immutable
    /// attributes are rejected before anything else is checked; the caller
    /// must route them through delete and create. When nothing changes the
    /// current state is returned without a remote call.
    ///
    /// # Errors
    ///
    /// - `Validation` for an absent identity, undeclared attributes or
    ///   invalid values
    /// - `ImmutableAttributeChanged` naming the first immutable attribute
    ///   in schema order
    /// - `Write`, `Read`, `Protocol` or `Cancelled` from the remote calls
    pub fn update(
        &self,
        client: &dyn RemoteClient,
        cancel: &CancelToken,
        resource_type: &str,
        current: &ResourceState,
        desired: &ResourceState,
    ) -> Result<ResourceState> {
        let schema = self.registry.get_managed(resource_type)?;
        if current.is_absent() {
            return Err(Error::validation(
                resource_type,
                "id",
                "cannot update an instance without identity",
            ));
        }
        let desired = schema.coerce(desired)?;
        let diff = AttributeDiff::compute(schema, current, &desired);

        if let Some((first, rest)) = diff.changed_immutable().split_first() {
            return Err(Error::ImmutableAttributeChanged {
                resource_type: resource_type.to_string(),
                id: current.id.clone(),
                attribute: (*first).to_string(),
                others: rest.iter().map(ToString::to_string).collect(),
            });
        }

        let changed = diff.changed_mutable();
        for name in &changed {
            let value = desired.get(name).unwrap_or(&Value::Null);
            schema.validate_value(name, value)?;
        }
        if changed.is_empty() {
            debug!("{resource_type} {} is up to date", current.id);
            return Ok(current.clone());
        }

        let body = codec::update_payload(schema, &desired, &changed);
        let path = schema.instance_path(&current.id);
        debug!("PUT {path} ({})", changed.join(", "));
        self.dispatch(cancel, schema, Some(&current.id), Operation::Update, || {
            client.put(&path, &body, cancel)
        })?
        .map_err(|source| Error::Write {
            resource_type: resource_type.to_string(),
            id: Some(current.id.clone()),
            operation: Operation::Update,
            source,
        })?;
        self.ensure_live(cancel, schema, Some(&current.id), Operation::Update)?;
        info!("Updated {resource_type} {} ({})", current.id, changed.join(", "));

        let mut pending = current.clone();
        for name in &changed {
            pending.set(*name, desired.get(name).cloned().unwrap_or_default());
        }
        self.fetch(client, cancel, schema, &pending, Operation::Update)
    }

    /// Delete an instance.
    ///
    /// Deleting an instance the backend no longer knows succeeds, and an
    /// already-absent state is returned without a remote call, so delete is
    /// safe to repeat.
    ///
    /// # Errors
    ///
    /// `Write` or `Cancelled`.
    pub fn delete(
        &self,
        client: &dyn RemoteClient,
        cancel: &CancelToken,
        resource_type: &str,
        current: &ResourceState,
    ) -> Result<ResourceState> {
        let schema = self.registry.get_managed(resource_type)?;
        if current.is_absent() {
            return Ok(current.clone());
        }

        let path = schema.instance_path(&current.id);
        debug!("DELETE {path}");
        match self.dispatch(cancel, schema, Some(&current.id), Operation::Delete, || {
            client.delete(&path, cancel)
        })? {
            Ok(()) => info!("Deleted {resource_type} {}", current.id),
            Err(e) if e.is_not_found() => {
                warn!("{resource_type} {} was already gone", current.id);
            }
            Err(source) => {
                return Err(Error::Write {
                    resource_type: resource_type.to_string(),
                    id: Some(current.id.clone()),
                    operation: Operation::Delete,
                    source,
                });
            }
        }
        self.ensure_live(cancel, schema, Some(&current.id), Operation::Delete)?;
        Ok(current.cleared())
    }

    /// Adopt an existing instance by identity.
    ///
    /// Returns the fully resolved state, or an absent state if the backend
    /// does not know the identity.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty identity; otherwise as [`read`](Self::read).
    pub fn import(
        &self,
        client: &dyn RemoteClient,
        cancel: &CancelToken,
        resource_type: &str,
        id: &str,
    ) -> Result<ResourceState> {
        let schema = self.registry.get_managed(resource_type)?;
        if id.is_empty() {
            return Err(Error::validation(resource_type, "id", "import requires an identity"));
        }
        let state = self.fetch(client, cancel, schema, &ResourceState::with_id(id), Operation::Import)?;
        if !state.is_absent() {
            info!("Imported {resource_type} {id}");
        }
        Ok(state)
    }

    /// GET one instance and decode it, carrying write-only values forward.
    fn fetch(
        &self,
        client: &dyn RemoteClient,
        cancel: &CancelToken,
        schema: &ResourceSchema,
        prior: &ResourceState,
        operation: Operation,
    ) -> Result<ResourceState> {
        let path = schema.instance_path(&prior.id);
        debug!("GET {path}");
        let doc = match self.dispatch(cancel, schema, Some(&prior.id), operation, || client.get(&path, cancel))? {
            Ok(doc) => doc,
            Err(e) if e.is_not_found() => {
                warn!(
                    "{} {} no longer exists; clearing identity",
                    schema.resource_type(),
                    prior.id
                );
                self.ensure_live(cancel, schema, Some(&prior.id), operation)?;
                return Ok(prior.cleared());
            }
            Err(source) => {
                return Err(Error::Read {
                    resource_type: schema.resource_type().to_string(),
                    id: Some(prior.id.clone()),
                    operation,
                    source,
                });
            }
        };
        self.ensure_live(cancel, schema, Some(&prior.id), operation)?;

        let mut state = codec::decode(schema, &doc)?;
        if state.id.is_empty() {
            state.id.clone_from(&prior.id);
        } else if state.id != prior.id {
            return Err(Error::Protocol {
                resource_type: schema.resource_type().to_string(),
                id: Some(prior.id.clone()),
                reason: format!("read returned identity {}", state.id),
            });
        }
        schema.fill_missing(&mut state);
        for attr in schema.attributes().iter().filter(|a| a.write_only) {
            let known = prior.get(&attr.name).filter(|v| !v.is_null());
            if let (Some(known), Some(Value::Null)) = (known, state.get(&attr.name)) {
                state.set(attr.name.clone(), known.clone());
            }
        }
        Ok(state)
    }

    /// Run one remote call between cancellation checks.
    ///
    /// The outer result carries cancellation; the inner one is the call's
    /// own outcome for the caller to classify.
    fn dispatch<T>(
        &self,
        cancel: &CancelToken,
        schema: &ResourceSchema,
        id: Option<&str>,
        operation: Operation,
        call: impl FnOnce() -> RemoteResult<T>,
    ) -> Result<RemoteResult<T>> {
        self.ensure_live(cancel, schema, id, operation)?;
        match call() {
            Err(RemoteError::Cancelled) => Err(cancelled(schema, id, operation)),
            other => Ok(other),
        }
    }

    fn ensure_live(
        &self,
        cancel: &CancelToken,
        schema: &ResourceSchema,
        id: Option<&str>,
        operation: Operation,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(cancelled(schema, id, operation));
        }
        Ok(())
    }
}

fn cancelled(schema: &ResourceSchema, id: Option<&str>, operation: Operation) -> Error {
    warn!("{operation} of {} cancelled", schema.resource_type());
    Error::Cancelled {
        resource_type: schema.resource_type().to_string(),
        id: id.map(str::to_string),
        operation,
    }
}
