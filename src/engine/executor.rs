//! Execution engine - confirmation, progress and summary around the batch executor

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{
    AutoConfirm, ConfirmCallback, ExecuteOptions, ExecuteReport, ExecutionPlan, Reconciler,
};

use super::differ::display_plan;
use crate::progress::BarProgress;
use crate::ui;

/// Options for an apply or destroy run
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Show the plan but make no changes
    pub dry_run: bool,
    /// Number of objects reconciled in parallel
    pub jobs: usize,
    /// Skip the confirmation prompt
    pub yes: bool,
    pub quiet: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            yes: false,
            quiet: false,
        }
    }
}

/// Interactive confirmation through dialoguer
pub struct DialoguerConfirm {
    default: bool,
}

impl DialoguerConfirm {
    pub fn new(default: bool) -> Self {
        Self { default }
    }
}

impl ConfirmCallback for DialoguerConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(self.default)
            .interact()?;

        Ok(confirmed)
    }
}

/// Show the plan, confirm, apply it, and print a summary
///
/// `confirm_default` is the answer selected when the user just presses
/// enter. Fails if any object failed to converge.
pub fn run(
    reconciler: &Reconciler,
    plan: &ExecutionPlan,
    opts: &ApplyOptions,
    confirm_default: bool,
) -> Result<ExecuteReport> {
    display_plan(plan);

    if !plan.has_changes() {
        return Ok(ExecuteReport::default());
    }

    let exec_opts = ExecuteOptions {
        dry_run: opts.dry_run,
        jobs: opts.jobs.max(1),
    };
    let mut progress = BarProgress::new(opts.quiet);

    println!();
    let report = if opts.yes {
        declarative::execute(reconciler, plan, &exec_opts, &mut progress, &mut AutoConfirm)?
    } else {
        let mut confirm = DialoguerConfirm::new(confirm_default);
        declarative::execute(reconciler, plan, &exec_opts, &mut progress, &mut confirm)?
    };

    print_summary(&report, opts.dry_run);

    if !report.summary.is_success() {
        bail!("{} object(s) failed to converge", report.summary.failed);
    }
    Ok(report)
}

/// Print final summary
fn print_summary(report: &ExecuteReport, dry_run: bool) {
    let summary = &report.summary;
    println!();

    if dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return;
    }
    if summary.total_changes() == 0 && summary.failed == 0 {
        println!("  {} Aborted", "✗".red());
        return;
    }

    if summary.is_success() {
        println!("  {} Configuration applied successfully!", "✓".green().bold());
    } else {
        println!("  {} Configuration applied with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} created", ui::count(summary.created, "object"));
    }
    if summary.updated > 0 {
        println!("    • {} updated", ui::count(summary.updated, "object"));
    }
    if summary.replaced > 0 {
        println!("    • {} replaced", ui::count(summary.replaced, "object"));
    }
    if summary.deleted > 0 {
        println!("    • {} deleted", ui::count(summary.deleted, "object"));
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", ui::count(summary.skipped, "object"));
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
        for (address, error) in report.failures() {
            ui::error(&format!("{address}: {error}"));
            ui::dim(error.advice());
        }
    }
}
