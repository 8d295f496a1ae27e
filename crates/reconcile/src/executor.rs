//! Execution engine - applies a plan with bounded parallelism

use crate::context::{CancelToken, ProgressCallback};
use crate::error::{Error, Result};
use crate::planner::{Action, Instance, Plan, PlannedChange};
use crate::reconciler::Reconciler;
use crate::remote::RemoteClient;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary, ResourceState};
use log::{debug, error, info};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Result of one planned change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub label: String,
    pub resource_type: String,
    pub result: ApplyResult,
    /// State after the change; the prior state when it failed or was skipped
    pub state: ResourceState,
}

/// Everything an execution produced
#[derive(Debug, Clone, Default)]
pub struct ExecuteReport {
    pub outcomes: Vec<Outcome>,
    pub summary: ExecuteSummary,
}

impl ExecuteReport {
    pub fn outcome(&self, label: &str) -> Option<&Outcome> {
        self.outcomes.iter().rev().find(|o| o.label == label)
    }

    /// Instances that still exist after execution, for the next snapshot
    pub fn instances(&self) -> Vec<Instance> {
        self.outcomes
            .iter()
            .filter(|o| !o.state.is_absent())
            .map(|o| Instance::new(o.label.clone(), o.resource_type.clone(), o.state.clone()))
            .collect()
    }
}

/// Execute a plan with the given options and callbacks
///
/// # Arguments
/// * `reconciler` - Reconciler bound to the registry and connection context
/// * `client` - Backend every change goes through
/// * `cancel` - Changes not yet started when this fires are skipped
/// * `plan` - The planned changes
/// * `opts` - Execution options (dry_run, jobs)
/// * `progress` - Progress callback
///
/// Changes touch distinct identities and run concurrently on `opts.jobs`
/// threads. A failed change does not stop the others.
///
/// # Errors
///
/// Returns `Error::Validation` if two changes touch the same identity and
/// `Error::InvalidConfig` if the worker pool cannot be built. Per-change
/// failures are reported as [`ApplyResult::Failed`] instead.
pub fn execute<P: ProgressCallback>(
    reconciler: &Reconciler<'_>,
    client: &dyn RemoteClient,
    cancel: &CancelToken,
    plan: &Plan,
    opts: &ExecuteOptions,
    progress: &mut P,
) -> Result<ExecuteReport> {
    check_identities(plan)?;

    let mut report = ExecuteReport::default();
    if plan.changes.is_empty() {
        return Ok(report);
    }

    progress.on_batch_start(plan.changes.len());
    let outcomes = if opts.dry_run {
        plan.changes.iter().map(preview).collect::<Vec<_>>()
    } else if opts.jobs <= 1 || plan.changes.len() == 1 {
        let mut outcomes = Vec::with_capacity(plan.changes.len());
        for change in &plan.changes {
            progress.on_resource_start(&change.label, &change.description());
            let outcome = apply_change(reconciler, client, cancel, change);
            progress.on_resource_complete(&outcome.label, &outcome.result);
            outcomes.push(outcome);
        }
        outcomes
    } else {
        execute_parallel(reconciler, client, cancel, plan, opts.jobs, progress)?
    };
    if opts.dry_run {
        for outcome in &outcomes {
            progress.on_resource_complete(&outcome.label, &outcome.result);
        }
    }
    progress.on_batch_complete();

    for outcome in &outcomes {
        report.summary.add_result(&outcome.result);
    }
    report.outcomes = outcomes;
    info!(
        "Applied {} change(s): {} failed, {} skipped",
        report.summary.total_changes(),
        report.summary.failed,
        report.summary.skipped
    );
    Ok(report)
}

/// Reject plans where two changes would touch the same identity
fn check_identities(plan: &Plan) -> Result<()> {
    let mut owners: BTreeMap<(&str, &str), &str> = BTreeMap::new();
    for change in &plan.changes {
        let Some(id) = change.action.identity() else {
            continue;
        };
        if let Some(first) = owners.insert((&change.resource_type, id), &change.label) {
            return Err(Error::validation(
                &change.resource_type,
                "id",
                format!("identity {id} is claimed by both {first} and {}", change.label),
            ));
        }
    }
    Ok(())
}

/// Execute changes in parallel using rayon
fn execute_parallel<P: ProgressCallback>(
    reconciler: &Reconciler<'_>,
    client: &dyn RemoteClient,
    cancel: &CancelToken,
    plan: &Plan,
    jobs: usize,
    progress: &mut P,
) -> Result<Vec<Outcome>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| Error::InvalidConfig {
            field: "jobs".to_string(),
            reason: format!("failed to create thread pool: {e}"),
        })?;

    let outcomes: Vec<Outcome> = pool.install(|| {
        plan.changes
            .par_iter()
            .map(|change| apply_change(reconciler, client, cancel, change))
            .collect()
    });

    // The callback is not shared across threads; report once all are done
    for outcome in &outcomes {
        progress.on_resource_complete(&outcome.label, &outcome.result);
    }
    Ok(outcomes)
}

fn outcome(change: &PlannedChange, result: ApplyResult, state: ResourceState) -> Outcome {
    Outcome {
        label: change.label.clone(),
        resource_type: change.resource_type.clone(),
        result,
        state,
    }
}

/// State the instance had before the change
fn prior(action: &Action) -> ResourceState {
    match action {
        Action::Create { .. } => ResourceState::new(),
        Action::Update { current, .. }
        | Action::Replace { current, .. }
        | Action::Delete { current }
        | Action::NoOp { current } => current.clone(),
    }
}

fn preview(change: &PlannedChange) -> Outcome {
    let result = if change.action.is_change() {
        ApplyResult::Skipped {
            reason: "dry run".to_string(),
        }
    } else {
        ApplyResult::NoChange
    };
    outcome(change, result, prior(&change.action))
}

/// Apply a single change
fn apply_change(
    reconciler: &Reconciler<'_>,
    client: &dyn RemoteClient,
    cancel: &CancelToken,
    change: &PlannedChange,
) -> Outcome {
    if let Action::NoOp { current } = &change.action {
        return outcome(change, ApplyResult::NoChange, current.clone());
    }
    if cancel.is_cancelled() {
        debug!("Skipping {}: cancelled", change.description());
        return outcome(
            change,
            ApplyResult::Skipped {
                reason: "cancelled".to_string(),
            },
            prior(&change.action),
        );
    }

    let resource_type = change.resource_type.as_str();
    let mut fallback = prior(&change.action);
    let applied = match &change.action {
        Action::Create { desired } => reconciler
            .create(client, cancel, resource_type, desired)
            .map(|state| (ApplyResult::Created, state)),
        Action::Update { current, desired, .. } => reconciler
            .update(client, cancel, resource_type, current, desired)
            .map(|state| (ApplyResult::Updated, state)),
        Action::Replace { current, desired, .. } => reconciler
            .delete(client, cancel, resource_type, current)
            .and_then(|gone| {
                fallback = gone;
                reconciler.create(client, cancel, resource_type, desired)
            })
            .map(|state| (ApplyResult::Replaced, state)),
        Action::Delete { current } => reconciler
            .delete(client, cancel, resource_type, current)
            .map(|state| (ApplyResult::Deleted, state)),
        Action::NoOp { current } => Ok((ApplyResult::NoChange, current.clone())),
    };

    match applied {
        Ok((result, state)) => outcome(change, result, state),
        Err(e) => {
            error!("{} failed: {e}", change.description());
            // A create that got as far as an identity leaves a live instance
            if let (Action::Create { desired } | Action::Replace { desired, .. }, Some(id)) =
                (&change.action, e.identity())
                && fallback.is_absent()
            {
                fallback = ResourceState {
                    id: id.to_string(),
                    attributes: desired.attributes.clone(),
                };
            }
            outcome(
                change,
                ApplyResult::Failed {
                    error: e.to_string(),
                    retryable: e.is_retryable(),
                },
                fallback,
            )
        }
    }
}
