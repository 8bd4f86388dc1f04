//! `driftwood validate`

use anyhow::{Result, bail};

use crate::Context;
use crate::config::DriftwoodConfig;
use crate::engine::planner;
use crate::{resource, ui};

/// Check the configuration file against the resource schemas
///
/// Never opens the state file or contacts the remote system.
pub fn run(ctx: &Context) -> Result<()> {
    let config = DriftwoodConfig::load(&ctx.config_path)?;
    let desired = config.desired()?;
    let registry = resource::registry()?;

    let invalid = planner::validate_all(&registry, &desired);
    if !invalid.is_empty() {
        bail!("{}", planner::describe_invalid(&invalid));
    }

    ui::success(&format!(
        "{} is valid ({})",
        ctx.config_path.display(),
        ui::count(desired.len(), "object")
    ));
    Ok(())
}
