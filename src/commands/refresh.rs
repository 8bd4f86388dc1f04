//! `driftwood refresh`

use anyhow::{Result, bail};
use colored::Colorize;

use crate::Context;
use crate::engine::{Session, planner};
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let session = Session::open_lenient(ctx)?;
    let report = planner::refresh(&session.reconciler, target, super::REFRESH_JOBS)?;

    ui::header("Refresh");
    for object in &report.refreshed {
        println!("  {} {} ({})", "✓".green(), object.address, object.external_id.dimmed());
    }
    for address in &report.drifted {
        println!("  {} {} {}", "-".red(), address, "(deleted remotely, removed from state)".dimmed());
    }
    for (address, error) in &report.failed {
        ui::error(&format!("{address}: {error}"));
        ui::dim(error.advice());
    }

    println!();
    ui::info(&format!(
        "{} refreshed, {} drifted, {} failed",
        report.refreshed.len(),
        report.drifted.len(),
        report.failed.len()
    ));

    if !report.is_success() {
        bail!("Failed to refresh {} object(s)", report.failed.len());
    }
    Ok(())
}
