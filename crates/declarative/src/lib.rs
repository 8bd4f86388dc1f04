//! # Declarative
//!
//! A reconciliation core for remotely managed objects.
//!
//! Users declare the desired attributes of an object; the crate compares
//! them with the last-known state, plans the smallest change that
//! converges the two, and carries that plan out against a remote
//! management API.
//!
//! ## Core Concepts
//!
//! - **ResourceSchema**: per-type attribute specs (type, mutability, default, validators)
//! - **StateStore**: last-known view of every managed object, keyed by remote ID
//! - **Diff engine**: [`diff::plan`] turns desired config + state into a [`ChangePlan`]
//! - **Reconciler**: applies a plan via Create/Read/Update/Delete and keeps state in step
//! - **Import**: [`Reconciler::import_by_id`] adopts an existing remote object
//! - **Executor**: applies many plans in parallel
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{
//!     attrs, AttributeSpec, DesiredConfig, MemoryStore, Reconciler, ResourceRegistry,
//!     ResourceSchema,
//! };
//! use std::sync::Arc;
//!
//! let registry = ResourceRegistry::new().with(
//!     ResourceSchema::new("queue", "A message queue")
//!         .attribute(AttributeSpec::string("name").required().immutable())
//!         .attribute(AttributeSpec::int("retention").default_value(7_i64)),
//! );
//!
//! let reconciler = Reconciler::new(Arc::new(registry), Arc::new(my_remote), Arc::new(MemoryStore::new()));
//! let plan = reconciler.plan(&DesiredConfig::new("queue", "jobs", attrs! { "name" => "jobs" }))?;
//! let result = reconciler.apply(&plan)?;
//! ```
//!
//! ## Collaborator Traits
//!
//! - [`RemoteApi`]: the remote management API
//! - [`StateStore`]: persistence for managed objects
//! - [`ProgressCallback`]: receives progress updates
//! - [`ConfirmCallback`]: handles user confirmations
//!
//! Retries belong to the [`RemoteApi`] implementation; the reconciler
//! itself never retries.

pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
mod import;
pub mod planner;
pub mod reconciler;
pub mod registry;
pub mod remote;
pub mod schema;
pub mod store;
pub mod types;
pub mod value;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use context::{
    AutoConfirm, AutoDecline, CancelToken, ConfirmCallback, NoProgress, ProgressCallback,
};
pub use diff::{DiffSummary, group_by_type, plan_destroy};
pub use error::{ErrorKind, ReconcileError, Result};
pub use executor::{ExecuteReport, execute, execute_simple};
pub use planner::{ExecutionPlan, matches_target, parse_target};
pub use reconciler::{DEFAULT_TIMEOUT, Reconciler};
pub use registry::ResourceRegistry;
pub use remote::{AttributeUpdate, Created, Operation, RemoteApi, RemoteError};
pub use schema::{
    AttributeSpec, Comparison, Mutability, ResourceSchema, ValidationError, Validator, ValueType,
};
pub use store::{MemoryStore, ObjectLocks, StateStore, StoreError, check_identity};
pub use types::{
    ApplyResult, AttributeChange, ChangePlan, DesiredConfig, ExecuteOptions, ExecuteSummary,
    ManagedObject, ObjectState, PlanAction,
};
pub use value::{Attributes, Value};
