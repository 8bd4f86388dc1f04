//! `driftwood plan`

use anyhow::Result;

use crate::Context;
use crate::engine::{Session, differ, planner};
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let session = Session::open(ctx)?;
    let desired = session.config.desired()?;

    let (plan, refreshed) =
        planner::plan(&session.reconciler, &desired, target, super::REFRESH_JOBS)?;

    for address in &refreshed.drifted {
        ui::warn(&format!("{address} was deleted outside driftwood"));
    }
    differ::display_plan(&plan);
    Ok(())
}
