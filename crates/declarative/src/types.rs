//! Core types for declarative reconciliation

use crate::value::{Attributes, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Desired configuration for one object, as declared by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredConfig {
    /// Stable local name, e.g. `aws_cloudwatch_event_archive.test`
    pub address: String,
    /// Resource type tag
    pub resource_type: String,
    pub attributes: Attributes,
}

impl DesiredConfig {
    pub fn new(
        resource_type: impl Into<String>,
        name: impl AsRef<str>,
        attributes: Attributes,
    ) -> Self {
        let resource_type = resource_type.into();
        Self {
            address: format!("{}.{}", resource_type, name.as_ref()),
            resource_type,
            attributes,
        }
    }
}

/// Last-known materialized view of one remote object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedObject {
    /// Identifier assigned by the remote system; empty until Create succeeds
    pub external_id: String,
    pub resource_type: String,
    pub address: String,
    /// Observed attribute values, overwritten wholesale on every Read
    pub attributes: Attributes,
    pub exists_remotely: bool,
    pub updated_at: DateTime<Utc>,
}

impl ManagedObject {
    /// An object that has been declared but not yet created
    pub fn declared(desired: &DesiredConfig) -> Self {
        Self {
            external_id: String::new(),
            resource_type: desired.resource_type.clone(),
            address: desired.address.clone(),
            attributes: desired.attributes.clone(),
            exists_remotely: false,
            updated_at: Utc::now(),
        }
    }

    /// An object observed on the remote system
    pub fn observed(
        resource_type: impl Into<String>,
        address: impl Into<String>,
        external_id: impl Into<String>,
        attributes: Attributes,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            resource_type: resource_type.into(),
            address: address.into(),
            attributes,
            exists_remotely: true,
            updated_at: Utc::now(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// Lifecycle state of one object inside the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectState {
    Absent,
    Creating,
    Present,
    Updating,
    Deleting,
}

impl fmt::Display for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Absent => "absent",
            Self::Creating => "creating",
            Self::Present => "present",
            Self::Updating => "updating",
            Self::Deleting => "deleting",
        };
        f.write_str(name)
    }
}

/// Operation selected by the diff engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    NoOp,
    Create,
    UpdateInPlace,
    /// Delete followed by Create, never an update
    Replace,
    Delete,
}

impl PlanAction {
    /// Plan symbol used when rendering
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::NoOp => " ",
            Self::Create => "+",
            Self::UpdateInPlace => "~",
            Self::Replace => "-/+",
            Self::Delete => "-",
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoOp)
    }
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoOp => "no-op",
            Self::Create => "create",
            Self::UpdateInPlace => "update in-place",
            Self::Replace => "replace",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A single attribute difference, kept for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub name: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
    /// Whether this change alone forces replacement
    pub forces_replace: bool,
}

/// Output of the diff engine for one object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePlan {
    pub address: String,
    pub resource_type: String,
    pub action: PlanAction,
    pub changed_attributes: BTreeSet<String>,
    pub requires_replace: bool,
    /// Per-attribute detail for every changed attribute
    pub changes: Vec<AttributeChange>,
    /// Default-filled desired attributes (empty for Delete)
    pub desired: Attributes,
    /// State the plan was computed against
    pub prior: Option<ManagedObject>,
}

impl ChangePlan {
    /// Whether applying this plan would call the remote API
    pub fn has_changes(&self) -> bool {
        self.action.is_change()
    }

    /// External ID of the prior object, if one exists
    pub fn prior_id(&self) -> Option<&str> {
        self.prior.as_ref().map(|p| p.external_id.as_str())
    }
}

/// Result of applying a plan
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyResult {
    /// No changes needed
    NoChange(ManagedObject),
    /// Object was created
    Created(ManagedObject),
    /// Object was updated in place
    Updated(ManagedObject),
    /// Object was deleted and recreated
    Replaced(ManagedObject),
    /// Object was removed
    Deleted { external_id: String },
}

impl ApplyResult {
    /// The resulting object, if it still exists
    pub fn object(&self) -> Option<&ManagedObject> {
        match self {
            Self::NoChange(o) | Self::Created(o) | Self::Updated(o) | Self::Replaced(o) => Some(o),
            Self::Deleted { .. } => None,
        }
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange(_))
    }
}

/// Summary of a batch execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub no_change: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.replaced + self.deleted
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of objects processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.no_change + self.skipped + self.failed
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange(_) => self.no_change += 1,
            ApplyResult::Created(_) => self.created += 1,
            ApplyResult::Updated(_) => self.updated += 1,
            ApplyResult::Replaced(_) => self.replaced += 1,
            ApplyResult::Deleted { .. } => self.deleted += 1,
        }
    }
}

/// Options for batch execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Compute plans but don't apply them
    pub dry_run: bool,
    /// Number of objects reconciled in parallel
    pub jobs: usize,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
        }
    }
}
