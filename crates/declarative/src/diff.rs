//! Diff engine - classifies desired vs. tracked state into a change plan

use crate::error::{ReconcileError, Result};
use crate::schema::ResourceSchema;
use crate::types::{AttributeChange, ChangePlan, DesiredConfig, ManagedObject, PlanAction};
use crate::value::Attributes;
use std::collections::{BTreeSet, HashMap};

/// Plan the change that brings `current` to `desired`
///
/// Validation runs first and fails closed. Defaults are filled on both sides
/// before comparing, so an attribute explicitly set to its default plans
/// exactly like an omitted one. Computed attributes never drive the plan.
/// Values compare by whole value unless the attribute declares a looser
/// [`Comparison`](crate::schema::Comparison).
pub fn plan(
    schema: &ResourceSchema,
    desired: &DesiredConfig,
    current: Option<&ManagedObject>,
) -> Result<ChangePlan> {
    let errors = schema.validate(&desired.attributes);
    if !errors.is_empty() {
        return Err(ReconcileError::Validation {
            address: desired.address.clone(),
            errors,
        });
    }

    let desired_filled = schema.with_defaults(&desired.attributes);

    let Some(current) = current else {
        let changes: Vec<AttributeChange> = schema
            .attributes
            .iter()
            .filter_map(|spec| {
                desired_filled.get(&spec.name).map(|value| AttributeChange {
                    name: spec.name.clone(),
                    before: None,
                    after: Some(value.clone()),
                    forces_replace: false,
                })
            })
            .collect();

        return Ok(ChangePlan {
            address: desired.address.clone(),
            resource_type: desired.resource_type.clone(),
            action: PlanAction::Create,
            changed_attributes: desired_filled.keys().cloned().collect(),
            requires_replace: false,
            changes,
            desired: desired_filled,
            prior: None,
        });
    };

    let current_filled = schema.with_defaults(&current.attributes);
    let changes = attribute_changes(schema, &desired_filled, &current_filled);

    let requires_replace = changes.iter().any(|c| c.forces_replace);
    let action = if changes.is_empty() {
        PlanAction::NoOp
    } else if requires_replace {
        PlanAction::Replace
    } else {
        PlanAction::UpdateInPlace
    };

    let changed_attributes: BTreeSet<String> = changes
        .iter()
        .filter(|c| {
            requires_replace
                || schema
                    .classify(&c.name)
                    .is_some_and(|spec| !spec.mutability.forces_replace())
        })
        .map(|c| c.name.clone())
        .collect();

    Ok(ChangePlan {
        address: desired.address.clone(),
        resource_type: desired.resource_type.clone(),
        action,
        changed_attributes,
        requires_replace,
        changes,
        desired: desired_filled,
        prior: Some(current.clone()),
    })
}

/// Plan the removal of a tracked object
pub fn plan_destroy(current: &ManagedObject) -> ChangePlan {
    let changes = current
        .attributes
        .iter()
        .map(|(name, value)| AttributeChange {
            name: name.clone(),
            before: Some(value.clone()),
            after: None,
            forces_replace: false,
        })
        .collect();

    ChangePlan {
        address: current.address.clone(),
        resource_type: current.resource_type.clone(),
        action: PlanAction::Delete,
        changed_attributes: BTreeSet::new(),
        requires_replace: false,
        changes,
        desired: Attributes::new(),
        prior: Some(current.clone()),
    }
}

fn attribute_changes(
    schema: &ResourceSchema,
    desired: &Attributes,
    current: &Attributes,
) -> Vec<AttributeChange> {
    schema
        .attributes
        .iter()
        .filter(|spec| !spec.mutability.is_computed())
        .filter_map(|spec| {
            let before = current.get(&spec.name);
            let after = desired.get(&spec.name);
            (!spec.same_value(before, after)).then(|| AttributeChange {
                name: spec.name.clone(),
                before: before.cloned(),
                after: after.cloned(),
                forces_replace: spec.mutability.forces_replace(),
            })
        })
        .collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    pub creates: usize,
    pub updates: usize,
    pub replaces: usize,
    pub deletes: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    /// Create a summary from a list of plans
    pub fn from_plans(plans: &[ChangePlan]) -> Self {
        let mut summary = Self::default();
        for plan in plans {
            match plan.action {
                PlanAction::NoOp => summary.unchanged += 1,
                PlanAction::Create => summary.creates += 1,
                PlanAction::UpdateInPlace => summary.updates += 1,
                PlanAction::Replace => summary.replaces += 1,
                PlanAction::Delete => summary.deletes += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.creates + self.updates + self.replaces + self.deletes
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group plans by resource type
pub fn group_by_type(plans: &[ChangePlan]) -> HashMap<String, Vec<&ChangePlan>> {
    let mut groups: HashMap<String, Vec<&ChangePlan>> = HashMap::new();
    for plan in plans {
        groups
            .entry(plan.resource_type.clone())
            .or_default()
            .push(plan);
    }
    groups
}
