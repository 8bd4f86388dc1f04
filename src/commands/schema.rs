//! `driftwood schema`

use anyhow::Result;
use colored::Colorize;
use declarative::{AttributeSpec, Comparison, ResourceSchema, ValueType};

use crate::resource;
use crate::ui;

pub fn run(resource_type: Option<&str>) -> Result<()> {
    let registry = resource::registry()?;

    match resource_type {
        None => {
            ui::header("Resource types");
            for schema in registry.iter() {
                println!("  {:<36} {}", schema.type_name.bold(), schema.description.dimmed());
            }
        }
        Some(name) => {
            let schema = registry.schema(name)?;
            print!("{}", describe(schema));
        }
    }
    Ok(())
}

/// Attribute table for one resource type
fn describe(schema: &ResourceSchema) -> String {
    let mut out = format!("\n{}\n{}\n", schema.type_name.bold(), schema.description.dimmed());
    for spec in &schema.attributes {
        describe_attribute(&mut out, spec, 1);
    }
    out
}

fn describe_attribute(out: &mut String, spec: &AttributeSpec, depth: usize) {
    let indent = "  ".repeat(depth);
    let mut flags = vec![spec.mutability.label().to_string()];
    if spec.required {
        flags.push("required".to_string());
    }
    if let Some(default) = &spec.default {
        flags.push(format!("default {default}"));
    }
    match spec.comparison {
        Comparison::Exact => {}
        Comparison::Json => flags.push("compared as JSON".to_string()),
        Comparison::Unordered => flags.push("unordered".to_string()),
    }

    out.push_str(&format!(
        "{indent}{:<24} {:<16} {}\n",
        spec.name,
        spec.value_type.describe(),
        flags.join(", ").dimmed()
    ));
    if let Some(description) = &spec.description {
        out.push_str(&format!("{indent}  {}\n", description.dimmed()));
    }

    let block = match &spec.value_type {
        ValueType::Block(specs) => Some(specs),
        ValueType::List(inner) | ValueType::Map(inner) => match inner.as_ref() {
            ValueType::Block(specs) => Some(specs),
            _ => None,
        },
        _ => None,
    };
    for nested in block.into_iter().flatten() {
        describe_attribute(out, nested, depth + 1);
    }
}
