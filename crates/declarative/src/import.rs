//! Import resolver - adopts an existing remote object into state

use crate::error::{ReconcileError, Result};
use crate::reconciler::Reconciler;
use crate::remote::{Operation, RemoteError};
use crate::store::StoreError;
use crate::types::ManagedObject;
use std::sync::PoisonError;

impl Reconciler {
    /// Build a state entry for an object that already exists remotely
    ///
    /// Only ever reads from the remote system. Fails with
    /// [`ReconcileError::AlreadyManaged`] if either the identifier or the
    /// address is already tracked. The checks are repeated atomically by the
    /// store when the entry is saved, so a concurrent import of the same ID
    /// under another address loses with the same error.
    pub fn import_by_id(
        &self,
        resource_type: &str,
        address: &str,
        external_id: &str,
    ) -> Result<ManagedObject> {
        self.registry().schema(resource_type)?;

        let lock = self.store().locks().handle(address);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = self.store().load(external_id)? {
            return Err(ReconcileError::AlreadyManaged {
                address: existing.address,
                external_id: existing.external_id,
            });
        }
        if let Some(existing) = self.store().find_by_address(address)? {
            return Err(ReconcileError::AlreadyManaged {
                address: existing.address,
                external_id: existing.external_id,
            });
        }

        log::debug!("Importing {external_id} as {address}");
        let attributes = match self.read_remote(resource_type, address, external_id) {
            Ok(attributes) => attributes,
            Err(RemoteError::NotFound) => {
                return Err(ReconcileError::ImportNotFound {
                    resource_type: resource_type.to_string(),
                    external_id: external_id.to_string(),
                });
            }
            Err(e) => return Err(self.classify(Operation::Read, address, e)),
        };

        let object = ManagedObject::observed(resource_type, address, external_id, attributes);
        match self.store().save(&object) {
            Ok(()) => {}
            Err(StoreError::AddressConflict { existing, .. }) => {
                return Err(ReconcileError::AlreadyManaged {
                    address: existing,
                    external_id: external_id.to_string(),
                });
            }
            Err(StoreError::IdentityConflict { existing, .. }) => {
                return Err(ReconcileError::AlreadyManaged {
                    address: address.to_string(),
                    external_id: existing,
                });
            }
            Err(e) => return Err(e.into()),
        }
        log::info!("Imported {address} ({external_id})");
        Ok(object)
    }
}
