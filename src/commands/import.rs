//! `driftwood import`

use anyhow::{Result, bail};

use crate::Context;
use crate::engine::Session;
use crate::ui;

/// Split `type.name` into its parts
fn split_address(address: &str) -> Result<(&str, &str)> {
    match address.split_once('.') {
        Some((resource_type, name))
            if !resource_type.is_empty() && !name.is_empty() && !name.contains('.') =>
        {
            Ok((resource_type, name))
        }
        _ => bail!("Invalid address '{address}': expected <type>.<name>"),
    }
}

pub fn run(ctx: &Context, address: &str, external_id: &str) -> Result<()> {
    let (resource_type, _) = split_address(address)?;
    let session = Session::open_lenient(ctx)?;

    let object = session
        .reconciler
        .import_by_id(resource_type, address, external_id)?;

    ui::success(&format!("Imported {address} ({})", object.external_id));
    for (name, value) in &object.attributes {
        ui::kv(name, &value.to_string());
    }

    let declared = session
        .config
        .desired()?
        .iter()
        .any(|d| d.address == address);
    if !declared {
        ui::warn(&format!(
            "{address} is not declared in {}; the next apply will delete it",
            ctx.config_path.display()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ARCHIVE, context, session, write_config};
    use declarative::{StateStore, attrs};
    use remotekit::backend::Backend;
    use remotekit::backend::file::FileBackend;
    use tempfile::TempDir;

    #[test]
    fn test_split_address() {
        assert_eq!(
            split_address("aws_cloudwatch_event_archive.orders").unwrap(),
            ("aws_cloudwatch_event_archive", "orders")
        );
        assert!(split_address("orders").is_err());
        assert!(split_address("a.b.c").is_err());
        assert!(split_address(".b").is_err());
    }

    #[test]
    fn test_import_existing_object() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, ARCHIVE);
        let backend = FileBackend::open(dir.path().join("remote")).unwrap();
        let (id, _) = backend
            .create(
                "aws_cloudwatch_event_archive",
                &attrs! { "name" => "orders", "event_source_arn" => "arn:bus" },
            )
            .unwrap();

        run(&context(&dir), "aws_cloudwatch_event_archive.orders", &id).unwrap();

        let object = session(&dir).store.load(&id).unwrap().unwrap();
        assert_eq!(object.address, "aws_cloudwatch_event_archive.orders");

        // Importing twice is refused
        assert!(run(&context(&dir), "aws_cloudwatch_event_archive.orders", &id).is_err());
    }

    #[test]
    fn test_import_missing_object() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "");
        let err = run(&context(&dir), "aws_cloudwatch_event_archive.x", "archive/x").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
