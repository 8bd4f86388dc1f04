//! `driftwood apply` and `driftwood destroy`

use anyhow::{Context as AnyhowContext, Result};
use declarative::ExecutionPlan;

use crate::Context;
use crate::cli::{ApplyArgs, DestroyArgs};
use crate::engine::executor::{self, ApplyOptions};
use crate::engine::{Session, planner};
use crate::ui;

pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let session = Session::open(ctx)?;
    let desired = session.config.desired()?;

    let (plan, refreshed) = planner::plan(
        &session.reconciler,
        &desired,
        args.target.as_deref(),
        super::REFRESH_JOBS,
    )?;
    for address in &refreshed.drifted {
        ui::warn(&format!("{address} was deleted outside driftwood and will be recreated"));
    }

    let opts = ApplyOptions {
        dry_run: args.dry_run,
        jobs: args.jobs,
        yes: args.yes,
        quiet: ctx.quiet,
    };
    executor::run(&session.reconciler, &plan, &opts, true)?;
    Ok(())
}

/// Delete every tracked object matching the target
///
/// Works from state alone, so a missing configuration file is fine.
pub fn destroy(ctx: &Context, args: &DestroyArgs) -> Result<()> {
    let session = Session::open_lenient(ctx)?;

    let plan = ExecutionPlan::destroy_all(&session.reconciler)
        .context("Failed to read state")?
        .filter_by_target(args.target.as_deref());

    if plan.is_empty() {
        ui::info("Nothing tracked, nothing to destroy");
        return Ok(());
    }

    let opts = ApplyOptions {
        dry_run: false,
        jobs: args.jobs,
        yes: args.yes,
        quiet: ctx.quiet,
    };
    executor::run(&session.reconciler, &plan, &opts, false)?;
    Ok(())
}
