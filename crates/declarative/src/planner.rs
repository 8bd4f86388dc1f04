//! Execution planner - builds the set of change plans for a run

use crate::diff::{self, DiffSummary};
use crate::error::Result;
use crate::reconciler::Reconciler;
use crate::types::{ChangePlan, DesiredConfig, PlanAction};
use std::collections::BTreeSet;

/// Change plans for every declared and every orphaned object
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub plans: Vec<ChangePlan>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan every declared object, and deletion of tracked objects that are
    /// no longer declared
    pub fn build(reconciler: &Reconciler, desired: &[DesiredConfig]) -> Result<Self> {
        let mut plans = Vec::with_capacity(desired.len());
        for config in desired {
            plans.push(reconciler.plan(config)?);
        }

        let declared: BTreeSet<&str> = desired.iter().map(|d| d.address.as_str()).collect();
        let mut orphans: Vec<_> = reconciler
            .store()
            .list()?
            .into_iter()
            .filter(|object| !declared.contains(object.address.as_str()))
            .collect();
        orphans.sort_by(|a, b| a.address.cmp(&b.address));
        plans.extend(orphans.iter().map(diff::plan_destroy));

        Ok(Self { plans })
    }

    /// Plan deletion of every tracked object
    pub fn destroy_all(reconciler: &Reconciler) -> Result<Self> {
        let mut objects = reconciler.store().list()?;
        objects.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(Self {
            plans: objects.iter().map(diff::plan_destroy).collect(),
        })
    }

    /// Filter plan to only include plans matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&ChangePlan) -> bool,
    {
        Self {
            plans: self.plans.into_iter().filter(|p| predicate(p)).collect(),
        }
    }

    /// Filter plan to only include objects matching a target pattern
    ///
    /// Target format: "type" or "type.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                self.filter(|p| matches_target(t, &p.resource_type, &p.address))
            }
        }
    }

    /// Plans that actually change something
    pub fn changes(&self) -> impl Iterator<Item = &ChangePlan> {
        self.plans.iter().filter(|p| p.action.is_change())
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary::from_plans(&self.plans)
    }

    pub fn has_changes(&self) -> bool {
        self.plans.iter().any(|p| p.action != PlanAction::NoOp)
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

/// Parse a target string like "type.name" into (type, name)
pub fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((resource_type, name)) if !name.contains('.') => {
            (Some(resource_type.to_string()), Some(name.to_string()))
        }
        Some(_) => (None, Some(target.to_string())),
    }
}

/// Check whether an object of `resource_type` at `address` matches a target
///
/// A bare type matches every object of that type; `type.name` matches one
/// object exactly.
pub fn matches_target(target: &str, resource_type: &str, address: &str) -> bool {
    let (wanted_type, wanted_name) = parse_target(target);

    if let Some(rt) = wanted_type.as_deref()
        && resource_type != rt
    {
        return false;
    }

    if let Some(n) = wanted_name.as_deref() {
        let local = address
            .strip_prefix(resource_type)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(address);
        if local != n {
            return false;
        }
    }

    true
}
