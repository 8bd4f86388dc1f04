//! Progress bar for batch apply

use colored::Colorize;
use declarative::{ApplyResult, ProgressCallback, ReconcileError};
use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Create a progress bar with the standard style
pub fn bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template(TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// Reports each finished object on an indicatif bar
///
/// Failures are printed above the bar as they happen; successes only
/// update the bar message.
#[derive(Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl BarProgress {
    pub fn new(quiet: bool) -> Self {
        Self { bar: None, quiet }
    }
}

fn symbol(result: &Result<ApplyResult, ReconcileError>) -> &'static str {
    match result {
        Ok(ApplyResult::NoChange(_)) => "○",
        Ok(_) => "✓",
        Err(_) => "✗",
    }
}

impl ProgressCallback for BarProgress {
    fn on_batch_start(&mut self, count: usize) {
        if !self.quiet {
            self.bar = Some(bar(count as u64, "Applying"));
        }
    }

    fn on_object_complete(&mut self, address: &str, result: &Result<ApplyResult, ReconcileError>) {
        let Some(pb) = &self.bar else {
            return;
        };

        if let Err(e) = result {
            pb.suspend(|| println!("  {} {} ({})", "✗".red(), address, e));
        }
        pb.set_message(format!("{} {}", symbol(result), address));
        pb.inc(1);
    }

    fn on_batch_complete(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}
