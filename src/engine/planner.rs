//! Planning - validation, refresh and plan construction

use anyhow::{Context as AnyhowContext, Result, bail};
use declarative::{
    DesiredConfig, ExecutionPlan, ManagedObject, ReconcileError, Reconciler, ResourceRegistry,
    ValidationError, matches_target,
};
use rayon::prelude::*;

/// Validation failures for one declared object
#[derive(Debug)]
pub struct InvalidObject {
    pub address: String,
    pub errors: Vec<ValidationError>,
}

/// Validate every declared object, collecting all failures
///
/// An undeclared resource type is reported as a failure of its own.
pub fn validate_all(registry: &ResourceRegistry, desired: &[DesiredConfig]) -> Vec<InvalidObject> {
    desired
        .iter()
        .filter_map(|config| {
            let errors = match registry.get(&config.resource_type) {
                Some(schema) => schema.validate(&config.attributes),
                None => vec![ValidationError {
                    path: config.resource_type.clone(),
                    message: "unknown resource type".to_string(),
                }],
            };
            (!errors.is_empty()).then(|| InvalidObject {
                address: config.address.clone(),
                errors,
            })
        })
        .collect()
}

/// Outcome of reading every tracked object
#[derive(Debug, Default)]
pub struct RefreshReport {
    /// Objects whose state entry was overwritten with a fresh read
    pub refreshed: Vec<ManagedObject>,
    /// Objects gone from the remote system, now removed from state
    pub drifted: Vec<String>,
    pub failed: Vec<(String, ReconcileError)>,
}

impl RefreshReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Read every tracked object matching `target`, in parallel
pub fn refresh(reconciler: &Reconciler, target: Option<&str>, jobs: usize) -> Result<RefreshReport> {
    let mut objects: Vec<ManagedObject> = reconciler
        .store()
        .list()?
        .into_iter()
        .filter(|o| target.is_none_or(|t| matches_target(t, &o.resource_type, &o.address)))
        .collect();
    objects.sort_by(|a, b| a.address.cmp(&b.address));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .context("Failed to create refresh thread pool")?;

    let results: Vec<_> = pool.install(|| {
        objects
            .par_iter()
            .map(|object| (object.address.clone(), reconciler.refresh(object)))
            .collect()
    });

    let mut report = RefreshReport::default();
    for (address, result) in results {
        match result {
            Ok(Some(object)) => report.refreshed.push(object),
            Ok(None) => {
                log::warn!("{address} no longer exists remotely; removed from state");
                report.drifted.push(address);
            }
            Err(e) => report.failed.push((address, e)),
        }
    }
    Ok(report)
}

/// Validate, refresh and plan the configuration
///
/// Stops before planning if any object is invalid or cannot be read.
pub fn plan(
    reconciler: &Reconciler,
    desired: &[DesiredConfig],
    target: Option<&str>,
    jobs: usize,
) -> Result<(ExecutionPlan, RefreshReport)> {
    let invalid = validate_all(reconciler.registry(), desired);
    if !invalid.is_empty() {
        bail!("{}", describe_invalid(&invalid));
    }

    let refreshed = refresh(reconciler, target, jobs)?;
    if let Some((address, error)) = refreshed.failed.first() {
        bail!(
            "Failed to refresh {} object(s); first failure {address}: {error}",
            refreshed.failed.len()
        );
    }

    let plan = ExecutionPlan::build(reconciler, desired)
        .context("Failed to plan configuration")?
        .filter_by_target(target);
    Ok((plan, refreshed))
}

/// Multi-line description of validation failures
pub fn describe_invalid(invalid: &[InvalidObject]) -> String {
    let mut message = format!("{} object(s) failed validation:", invalid.len());
    for object in invalid {
        for error in &object.errors {
            message.push_str(&format!("\n  {}: {error}", object.address));
        }
    }
    message
}
