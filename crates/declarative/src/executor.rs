//! Batch executor - applies many change plans in parallel

use crate::context::{ConfirmCallback, ProgressCallback};
use crate::error::ReconcileError;
use crate::planner::ExecutionPlan;
use crate::reconciler::Reconciler;
use crate::types::{ApplyResult, ChangePlan, ExecuteOptions, ExecuteSummary};
use anyhow::Result;
use rayon::prelude::*;
use std::sync::{Arc, Mutex, PoisonError};

/// Outcome of one object in a batch
pub type ObjectOutcome = (String, std::result::Result<ApplyResult, ReconcileError>);

/// Summary plus the per-object outcomes of a batch
#[derive(Debug, Default)]
pub struct ExecuteReport {
    pub summary: ExecuteSummary,
    pub outcomes: Vec<ObjectOutcome>,
}

impl ExecuteReport {
    /// Outcomes that failed
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ReconcileError)> {
        self.outcomes
            .iter()
            .filter_map(|(address, result)| result.as_ref().err().map(|e| (address.as_str(), e)))
    }
}

/// Execute a plan with the given options and callbacks
///
/// Plans without changes are counted but never reach the remote API. Each
/// object is reconciled independently, so one failure does not stop the
/// others.
pub fn execute<P, C>(
    reconciler: &Reconciler,
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let changes: Vec<&ChangePlan> = plan.changes().collect();
    let unchanged = plan.len() - changes.len();

    let mut report = ExecuteReport {
        summary: ExecuteSummary {
            no_change: unchanged,
            ..Default::default()
        },
        outcomes: Vec::new(),
    };

    if changes.is_empty() {
        return Ok(report);
    }

    if opts.dry_run {
        report.summary.skipped = changes.len();
        return Ok(report);
    }

    if !confirm.confirm("Apply changes?")? {
        report.summary.skipped = changes.len();
        return Ok(report);
    }

    progress.on_batch_start(changes.len());
    let outcomes = if opts.jobs <= 1 || changes.len() == 1 {
        let mut outcomes = Vec::with_capacity(changes.len());
        for plan in changes {
            let result = reconciler.apply(plan);
            progress.on_object_complete(&plan.address, &result);
            outcomes.push((plan.address.clone(), result));
        }
        outcomes
    } else {
        execute_parallel(reconciler, &changes, opts.jobs, progress)?
    };
    progress.on_batch_complete();

    for (address, result) in &outcomes {
        match result {
            Ok(applied) => report.summary.add_result(applied),
            Err(e) => {
                log::error!("{address}: {e}");
                report.summary.failed += 1;
            }
        }
    }
    report.outcomes = outcomes;

    Ok(report)
}

/// Apply plans in parallel using rayon
fn execute_parallel<P: ProgressCallback>(
    reconciler: &Reconciler,
    plans: &[&ChangePlan],
    jobs: usize,
    progress: &mut P,
) -> Result<Vec<ObjectOutcome>> {
    // The progress callback is not thread-safe; collect first and report after
    let results: Arc<Mutex<Vec<ObjectOutcome>>> = Arc::new(Mutex::new(Vec::new()));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {e}"))?;

    pool.install(|| {
        plans.par_iter().for_each(|plan| {
            let result = reconciler.apply(plan);
            results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((plan.address.clone(), result));
        });
    });

    let mut results = Arc::try_unwrap(results)
        .map_err(|_| anyhow::anyhow!("Failed to unwrap results"))?
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    results.sort_by(|a, b| a.0.cmp(&b.0));

    for (address, result) in &results {
        progress.on_object_complete(address, result);
    }

    Ok(results)
}

/// Execute without progress reporting or confirmation
pub fn execute_simple(
    reconciler: &Reconciler,
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
) -> Result<ExecuteReport> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(reconciler, plan, opts, &mut NoProgress, &mut AutoConfirm)
}
