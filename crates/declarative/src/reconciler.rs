//! Reconciler - applies change plans against the remote API
//!
//! Every operation on one object runs under that object's lock from the
//! state store, so a Create, Read, Update or Delete for the same address
//! never overlaps with another. Each remote call is bounded by the
//! caller-supplied timeout; a call that overruns is reported as
//! [`ReconcileError::Indeterminate`] and the caller must refresh before
//! deciding what to do next.

use crate::context::CancelToken;
use crate::diff;
use crate::error::{ReconcileError, Result};
use crate::registry::ResourceRegistry;
use crate::remote::{AttributeUpdate, Operation, RemoteApi, RemoteError};
use crate::store::StateStore;
use crate::types::{ApplyResult, ChangePlan, DesiredConfig, ManagedObject, ObjectState, PlanAction};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, PoisonError};
use std::thread;
use std::time::Duration;

/// Default bound on a single remote call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Executes change plans and keeps the state store in step with the remote
pub struct Reconciler {
    registry: Arc<ResourceRegistry>,
    remote: Arc<dyn RemoteApi>,
    store: Arc<dyn StateStore>,
    timeout: Option<Duration>,
    cancel: CancelToken,
}

impl Reconciler {
    pub fn new(
        registry: Arc<ResourceRegistry>,
        remote: Arc<dyn RemoteApi>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            registry,
            remote,
            store,
            timeout: Some(DEFAULT_TIMEOUT),
            cancel: CancelToken::new(),
        }
    }

    /// Bound every remote call; `None` waits indefinitely
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Share a cancellation token with the caller, e.g. an interrupt handler
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn StateStore {
        self.store.as_ref()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Plan against whatever the state store tracks for the address
    pub fn plan(&self, desired: &DesiredConfig) -> Result<ChangePlan> {
        let schema = self.registry.schema(&desired.resource_type)?;
        let current = self.store.find_by_address(&desired.address)?;
        diff::plan(schema, desired, current.as_ref())
    }

    /// Apply a plan, returning the resulting object
    pub fn apply(&self, plan: &ChangePlan) -> Result<ApplyResult> {
        if plan.action == PlanAction::NoOp {
            let prior = self.require_prior(plan)?;
            return Ok(ApplyResult::NoChange(prior.clone()));
        }

        let lock = self.store.locks().handle(&plan.address);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if self.cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled {
                address: plan.address.clone(),
                deleted: false,
            });
        }

        match plan.action {
            PlanAction::NoOp => self
                .require_prior(plan)
                .map(|prior| ApplyResult::NoChange(prior.clone())),
            PlanAction::Create => self.create(plan).map(ApplyResult::Created),
            PlanAction::UpdateInPlace => self.update(plan).map(ApplyResult::Updated),
            PlanAction::Replace => self.replace(plan).map(ApplyResult::Replaced),
            PlanAction::Delete => {
                let prior = self.require_prior(plan)?;
                self.delete(prior)?;
                Ok(ApplyResult::Deleted {
                    external_id: prior.external_id.clone(),
                })
            }
        }
    }

    /// Read an object and overwrite its state entry wholesale
    ///
    /// Returns `Ok(None)` when the remote system no longer has the object;
    /// the state entry is removed and no error is raised.
    pub fn refresh(&self, object: &ManagedObject) -> Result<Option<ManagedObject>> {
        let lock = self.store.locks().handle(&object.address);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_into_store(object)
    }

    /// Read a remote object without touching the state store
    pub(crate) fn read_remote(
        &self,
        resource_type: &str,
        address: &str,
        external_id: &str,
    ) -> std::result::Result<crate::value::Attributes, RemoteError> {
        let resource_type = resource_type.to_string();
        let external_id = external_id.to_string();
        log::debug!("Reading {address} ({external_id})");
        self.call(move |remote| remote.read(&resource_type, &external_id))
    }

    pub(crate) fn classify(&self, operation: Operation, address: &str, err: RemoteError) -> ReconcileError {
        ReconcileError::from_remote(
            operation,
            address,
            err,
            self.timeout.unwrap_or(Duration::ZERO),
        )
    }

    fn require_prior<'a>(&self, plan: &'a ChangePlan) -> Result<&'a ManagedObject> {
        plan.prior.as_ref().ok_or_else(|| ReconcileError::InvalidPlan {
            address: plan.address.clone(),
            message: format!("{} requires a tracked object", plan.action),
        })
    }

    fn create(&self, plan: &ChangePlan) -> Result<ManagedObject> {
        if let Some(existing) = self.store.find_by_address(&plan.address)? {
            return Err(ReconcileError::InvalidPlan {
                address: plan.address.clone(),
                message: format!("already tracked as {}, plan again", existing.external_id),
            });
        }

        let schema = self.registry.schema(&plan.resource_type)?;
        transition(&plan.address, ObjectState::Absent, ObjectState::Creating);
        log::debug!("Creating {} ({})", plan.address, plan.resource_type);

        let resource_type = plan.resource_type.clone();
        let attributes = plan.desired.clone();
        let created = self
            .call(move |remote| remote.create(&resource_type, &attributes))
            .map_err(|e| {
                transition(&plan.address, ObjectState::Creating, ObjectState::Absent);
                self.classify(Operation::Create, &plan.address, e)
            })?;

        if created.external_id.is_empty() {
            return Err(ReconcileError::PermanentRemote {
                operation: Operation::Create,
                address: plan.address.clone(),
                message: "remote system returned an empty identifier".to_string(),
            });
        }

        let mut attributes = plan.desired.clone();
        attributes.extend(schema.computed_subset(&created.computed));
        let object = ManagedObject::observed(
            &plan.resource_type,
            &plan.address,
            created.external_id,
            attributes,
        );
        self.store.save(&object)?;
        transition(&plan.address, ObjectState::Creating, ObjectState::Present);
        log::info!("Created {} as {}", plan.address, object.external_id);

        match self.read_into_store(&object) {
            Ok(Some(fresh)) => Ok(fresh),
            Ok(None) => Err(ReconcileError::PermanentRemote {
                operation: Operation::Read,
                address: plan.address.clone(),
                message: "object disappeared right after creation".to_string(),
            }),
            Err(e) => {
                log::warn!(
                    "Created {} but could not read it back ({e}); keeping create response",
                    plan.address
                );
                Ok(object)
            }
        }
    }

    fn update(&self, plan: &ChangePlan) -> Result<ManagedObject> {
        let prior = self.require_prior(plan)?;
        transition(&plan.address, ObjectState::Present, ObjectState::Updating);

        let changes: AttributeUpdate = plan
            .changed_attributes
            .iter()
            .map(|name| (name.clone(), plan.desired.get(name).cloned()))
            .collect();
        log::debug!(
            "Updating {} ({}): {}",
            plan.address,
            prior.external_id,
            plan.changed_attributes
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );

        let resource_type = plan.resource_type.clone();
        let external_id = prior.external_id.clone();
        self.call(move |remote| remote.update(&resource_type, &external_id, &changes))
            .map_err(|e| self.classify(Operation::Update, &plan.address, e))?;

        let refreshed = self.read_into_store(prior)?;
        transition(&plan.address, ObjectState::Updating, ObjectState::Present);
        refreshed.ok_or_else(|| ReconcileError::PermanentRemote {
            operation: Operation::Read,
            address: plan.address.clone(),
            message: "object disappeared during update".to_string(),
        })
    }

    fn replace(&self, plan: &ChangePlan) -> Result<ManagedObject> {
        let prior = self.require_prior(plan)?;
        log::info!(
            "Replacing {} ({}): {} forces replacement",
            plan.address,
            prior.external_id,
            plan.changes
                .iter()
                .filter(|c| c.forces_replace)
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        self.delete(prior)?;

        if self.cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled {
                address: plan.address.clone(),
                deleted: true,
            });
        }

        self.create(plan)
    }

    fn delete(&self, prior: &ManagedObject) -> Result<()> {
        transition(&prior.address, ObjectState::Present, ObjectState::Deleting);
        log::debug!("Deleting {} ({})", prior.address, prior.external_id);

        let resource_type = prior.resource_type.clone();
        let external_id = prior.external_id.clone();
        match self.call(move |remote| remote.delete(&resource_type, &external_id)) {
            Ok(()) => {}
            Err(RemoteError::NotFound) => {
                log::debug!("{} was already gone remotely", prior.external_id);
            }
            Err(e) => {
                transition(&prior.address, ObjectState::Deleting, ObjectState::Present);
                return Err(self.classify(Operation::Delete, &prior.address, e));
            }
        }

        self.store.delete(&prior.external_id)?;
        transition(&prior.address, ObjectState::Deleting, ObjectState::Absent);
        log::info!("Deleted {} ({})", prior.address, prior.external_id);
        Ok(())
    }

    fn read_into_store(&self, object: &ManagedObject) -> Result<Option<ManagedObject>> {
        match self.read_remote(&object.resource_type, &object.address, &object.external_id) {
            Ok(attributes) => {
                let fresh = ManagedObject::observed(
                    &object.resource_type,
                    &object.address,
                    &object.external_id,
                    attributes,
                );
                self.store.save(&fresh)?;
                Ok(Some(fresh))
            }
            Err(RemoteError::NotFound) => {
                log::warn!(
                    "{} ({}) no longer exists remotely; removing it from state",
                    object.address,
                    object.external_id
                );
                self.store.delete(&object.external_id)?;
                Ok(None)
            }
            Err(e) => Err(self.classify(Operation::Read, &object.address, e)),
        }
    }

    /// Run a remote call, bounded by the configured timeout
    ///
    /// The call runs on a worker thread. If the deadline passes the worker
    /// is left to finish on its own and the caller sees a timeout.
    fn call<T, F>(&self, f: F) -> std::result::Result<T, RemoteError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn RemoteApi) -> std::result::Result<T, RemoteError> + Send + 'static,
    {
        let Some(timeout) = self.timeout else {
            return f(self.remote.as_ref());
        };

        let remote = Arc::clone(&self.remote);
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(f(remote.as_ref()));
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                Err(RemoteError::Timeout(format!("no response within {timeout:?}")))
            }
            Err(RecvTimeoutError::Disconnected) => Err(RemoteError::Timeout(
                "remote call ended without a response".to_string(),
            )),
        }
    }
}

fn transition(address: &str, from: ObjectState, to: ObjectState) {
    log::debug!("{address}: {from} -> {to}");
}
