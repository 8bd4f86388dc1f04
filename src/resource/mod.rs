//! Built-in resource types

pub mod automation_rule;
pub mod event_archive;

use anyhow::{Context, Result};
use declarative::ResourceRegistry;

/// Registry of every resource type driftwood manages
pub fn registry() -> Result<ResourceRegistry> {
    Ok(ResourceRegistry::new()
        .with(event_archive::schema().context("Invalid event archive schema")?)
        .with(automation_rule::schema().context("Invalid automation rule schema")?))
}
