//! Plan rendering

use colored::Colorize;
use declarative::{AttributeChange, ChangePlan, ExecutionPlan, PlanAction, Value, group_by_type};
use similar::{ChangeTag, TextDiff};
use std::fmt::Write;

/// Print the plan for every changing object
pub fn display_plan(plan: &ExecutionPlan) {
    print!("{}", render_plan(plan));
}

/// Render the plan, grouped by resource type
pub fn render_plan(plan: &ExecutionPlan) -> String {
    let mut out = String::new();
    let summary = plan.summary();

    if !summary.has_changes() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "  {} No changes. {} object(s) match the configuration.",
            "✓".green(),
            summary.unchanged
        );
        return out;
    }

    let changing: Vec<ChangePlan> = plan.changes().cloned().collect();
    let groups = group_by_type(&changing);
    let mut types: Vec<&String> = groups.keys().collect();
    types.sort();

    let _ = writeln!(out);
    let _ = writeln!(out, "┌─ {} ─────────────────────────────────────────┐", "Execution Plan".bold());
    let _ = writeln!(out, "│");
    for resource_type in types {
        let _ = writeln!(out, "│ {}", resource_type.bold());
        for object in &groups[resource_type] {
            render_object(&mut out, object);
        }
        let _ = writeln!(out, "│");
    }
    let _ = writeln!(out, "├─────────────────────────────────────────────────────┤");
    let _ = writeln!(
        out,
        "│ Plan: {} to create, {} to update, {} to replace, {} to delete ({} unchanged)",
        summary.creates.to_string().green(),
        summary.updates.to_string().yellow(),
        summary.replaces.to_string().magenta(),
        summary.deletes.to_string().red(),
        summary.unchanged
    );
    let _ = writeln!(out, "└─────────────────────────────────────────────────────┘");
    out
}

fn symbol(action: PlanAction) -> colored::ColoredString {
    match action {
        PlanAction::Create => action.symbol().green(),
        PlanAction::UpdateInPlace => action.symbol().yellow(),
        PlanAction::Replace => action.symbol().magenta(),
        PlanAction::Delete => action.symbol().red(),
        PlanAction::NoOp => action.symbol().dimmed(),
    }
}

fn render_object(out: &mut String, plan: &ChangePlan) {
    let note = match (plan.action, plan.prior_id()) {
        (PlanAction::Replace, _) => " (forces replacement)".magenta().to_string(),
        (_, Some(id)) => format!(" ({id})").dimmed().to_string(),
        _ => String::new(),
    };
    let _ = writeln!(out, "│   {} {}{}", symbol(plan.action), plan.address, note);

    for change in &plan.changes {
        render_change(out, change);
    }
}

fn render_change(out: &mut String, change: &AttributeChange) {
    let marker = if change.forces_replace {
        "  # forces replacement".magenta().to_string()
    } else {
        String::new()
    };

    match (&change.before, &change.after) {
        (None, Some(after)) => {
            let _ = writeln!(out, "│       {} {} = {}", "+".green(), change.name, after);
        }
        (Some(before), None) => {
            let _ = writeln!(out, "│       {} {} = {}", "-".red(), change.name, before);
        }
        (Some(before), Some(after)) if before.is_multiline() || after.is_multiline() => {
            let _ = writeln!(out, "│       {} {}:{}", "~".yellow(), change.name, marker);
            render_text_diff(out, before, after);
        }
        (Some(before), Some(after)) => {
            let _ = writeln!(
                out,
                "│       {} {}: {} → {}{}",
                "~".yellow(),
                change.name,
                before,
                after,
                marker
            );
        }
        (None, None) => {}
    }
}

/// Line diff of two multi-line string values
fn render_text_diff(out: &mut String, before: &Value, after: &Value) {
    let old = text_of(before);
    let new = text_of(after);
    let diff = TextDiff::from_lines(&old, &new);

    for change in diff.iter_all_changes() {
        let line = change.value().trim_end_matches('\n');
        let _ = match change.tag() {
            ChangeTag::Delete => writeln!(out, "│           {}", format!("- {line}").red()),
            ChangeTag::Insert => writeln!(out, "│           {}", format!("+ {line}").green()),
            ChangeTag::Equal => writeln!(out, "│           {}", format!("  {line}").dimmed()),
        };
    }
}

fn text_of(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{DesiredConfig, ManagedObject, attrs, diff, plan_destroy};

    fn schema() -> declarative::ResourceSchema {
        crate::resource::event_archive::schema().unwrap()
    }

    fn desired(attributes: declarative::Attributes) -> DesiredConfig {
        DesiredConfig::new("aws_cloudwatch_event_archive", "orders", attributes)
    }

    fn current(attributes: declarative::Attributes) -> ManagedObject {
        ManagedObject::observed(
            "aws_cloudwatch_event_archive",
            "aws_cloudwatch_event_archive.orders",
            "archive/orders",
            attributes,
        )
    }

    #[test]
    fn test_no_changes() {
        let rendered = render_plan(&ExecutionPlan::new());
        assert!(rendered.contains("No changes"));
    }

    #[test]
    fn test_create_lists_every_attribute() {
        let plan = diff::plan(
            &schema(),
            &desired(attrs! { "name" => "orders", "event_source_arn" => "arn:bus" }),
            None,
        )
        .unwrap();
        let rendered = render_plan(&ExecutionPlan { plans: vec![plan] });

        assert!(rendered.contains("aws_cloudwatch_event_archive.orders"));
        assert!(rendered.contains("event_source_arn = \"arn:bus\""));
        assert!(rendered.contains("retention_days = 0"));
    }

    #[test]
    fn test_replace_marks_forcing_attribute() {
        let plan = diff::plan(
            &schema(),
            &desired(attrs! { "name" => "orders", "event_source_arn" => "arn:new" }),
            Some(&current(attrs! { "name" => "orders", "event_source_arn" => "arn:old" })),
        )
        .unwrap();
        let rendered = render_plan(&ExecutionPlan { plans: vec![plan] });

        assert!(rendered.contains("forces replacement"));
        assert!(rendered.contains("\"arn:old\" → \"arn:new\""));
    }

    #[test]
    fn test_multiline_values_render_line_diff() {
        let before = "{\n  \"source\": [\"a\"]\n}";
        let after = "{\n  \"source\": [\"b\"]\n}";
        let plan = diff::plan(
            &schema(),
            &desired(attrs! {
                "name" => "orders",
                "event_source_arn" => "arn:bus",
                "event_pattern" => after,
            }),
            Some(&current(attrs! {
                "name" => "orders",
                "event_source_arn" => "arn:bus",
                "event_pattern" => before,
            })),
        )
        .unwrap();
        let rendered = render_plan(&ExecutionPlan { plans: vec![plan] });

        assert!(rendered.contains("-   \"source\": [\"a\"]"));
        assert!(rendered.contains("+   \"source\": [\"b\"]"));
    }

    #[test]
    fn test_delete_shows_prior_id() {
        let plan = plan_destroy(&current(attrs! { "name" => "orders" }));
        let rendered = render_plan(&ExecutionPlan { plans: vec![plan] });

        assert!(rendered.contains("(archive/orders)"));
        assert!(rendered.contains("name = \"orders\""));
    }
}
