//! `driftwood state list|show|rm`

use anyhow::{Context as AnyhowContext, Result, anyhow};
use colored::Colorize;
use declarative::{ManagedObject, StateStore};

use crate::Context;
use crate::engine::Session;
use crate::ui;

fn find(session: &Session, address: &str) -> Result<ManagedObject> {
    session
        .store
        .find_by_address(address)
        .context("Failed to read state")?
        .ok_or_else(|| anyhow!("{address} is not tracked"))
}

pub fn list(ctx: &Context) -> Result<()> {
    let session = Session::open_lenient(ctx)?;
    let mut objects = session.store.list().context("Failed to read state")?;
    objects.sort_by(|a, b| a.address.cmp(&b.address));

    if objects.is_empty() {
        ui::info("No objects tracked");
        return Ok(());
    }

    for object in &objects {
        if ctx.verbose > 0 {
            println!(
                "{:<50} {} {}",
                object.address,
                object.external_id.dimmed(),
                object.updated_at.to_rfc3339().dimmed()
            );
        } else {
            println!("{:<50} {}", object.address, object.external_id.dimmed());
        }
    }
    Ok(())
}

pub fn show(ctx: &Context, address: &str) -> Result<()> {
    let session = Session::open_lenient(ctx)?;
    let object = find(&session, address)?;

    ui::header(&object.address);
    ui::kv("type", &object.resource_type);
    ui::kv("id", &object.external_id);
    ui::kv("updated", &object.updated_at.to_rfc3339());

    ui::section("Attributes");
    for (name, value) in &object.attributes {
        ui::kv(name, &value.to_string());
    }
    Ok(())
}

/// Forget an object; the remote object is left untouched
pub fn rm(ctx: &Context, address: &str) -> Result<()> {
    let session = Session::open_lenient(ctx)?;
    let object = find(&session, address)?;

    session
        .store
        .delete(&object.external_id)
        .context("Failed to update state")?;
    ui::success(&format!(
        "Removed {address} from state ({} still exists remotely)",
        object.external_id
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{context, session, write_config};
    use declarative::attrs;
    use tempfile::TempDir;

    fn seeded() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "");
        session(&dir)
            .store
            .save(&ManagedObject::observed(
                "aws_cloudwatch_event_archive",
                "aws_cloudwatch_event_archive.orders",
                "archive/orders",
                attrs! { "name" => "orders" },
            ))
            .unwrap();
        dir
    }

    #[test]
    fn test_list_and_show() {
        let dir = seeded();
        list(&context(&dir)).unwrap();
        show(&context(&dir), "aws_cloudwatch_event_archive.orders").unwrap();
        assert!(show(&context(&dir), "aws_cloudwatch_event_archive.nope").is_err());
    }

    #[test]
    fn test_rm_forgets_object() {
        let dir = seeded();
        rm(&context(&dir), "aws_cloudwatch_event_archive.orders").unwrap();
        assert!(session(&dir).store.list().unwrap().is_empty());
        assert!(rm(&context(&dir), "aws_cloudwatch_event_archive.orders").is_err());
    }
}
