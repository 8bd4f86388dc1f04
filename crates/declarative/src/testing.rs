//! Test support: a scripted in-memory remote API and sample schemas

use crate::remote::{AttributeUpdate, Created, Operation, RemoteApi, RemoteError};
use crate::schema::{AttributeSpec, Comparison, ResourceSchema, ValueType, Validator};
use crate::value::{Attributes, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Archive-like schema used across the crate's tests
pub fn archive_schema() -> ResourceSchema {
    ResourceSchema::new("archive", "Event archive")
        .attribute(AttributeSpec::string("name").required().immutable())
        .attribute(
            AttributeSpec::string("event_source_arn")
                .required()
                .replace_on_change(),
        )
        .attribute(AttributeSpec::string("description").default_value(""))
        .attribute(
            AttributeSpec::string("event_pattern")
                .validate(Validator::Json)
                .compare(Comparison::Json),
        )
        .attribute(
            AttributeSpec::int("retention_days")
                .default_value(0_i64)
                .validate(Validator::at_least(0)),
        )
        .attribute(AttributeSpec::computed("arn", ValueType::String))
}

/// A recorded remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: Operation,
    pub external_id: Option<String>,
}

#[derive(Default)]
struct Inner {
    objects: BTreeMap<String, Attributes>,
    calls: Vec<Call>,
    failures: VecDeque<(Operation, RemoteError)>,
    delays: HashMap<Operation, Duration>,
}

/// In-memory remote API that records every call
///
/// IDs are `<type>/<name>`; every object gets a computed `arn`.
#[derive(Default)]
pub struct FakeRemote {
    inner: Mutex<Inner>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `operation` fail with `error`
    pub fn fail_next(&self, operation: Operation, error: RemoteError) {
        self.lock().failures.push_back((operation, error));
    }

    /// Make every call of `operation` sleep first
    pub fn delay(&self, operation: Operation, duration: Duration) {
        self.lock().delays.insert(operation, duration);
    }

    /// Place an object directly on the remote side
    pub fn insert(&self, external_id: &str, attributes: Attributes) {
        self.lock().objects.insert(external_id.to_string(), attributes);
    }

    /// Remove an object behind the reconciler's back
    pub fn remove(&self, external_id: &str) {
        self.lock().objects.remove(external_id);
    }

    pub fn object(&self, external_id: &str) -> Option<Attributes> {
        self.lock().objects.get(external_id).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.calls().into_iter().map(|c| c.operation).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn begin(&self, operation: Operation, external_id: Option<&str>) -> Result<(), RemoteError> {
        let delay = {
            let mut inner = self.lock();
            inner.calls.push(Call {
                operation,
                external_id: external_id.map(str::to_string),
            });
            if let Some(pos) = inner.failures.iter().position(|(op, _)| *op == operation)
                && let Some((_, error)) = inner.failures.remove(pos)
            {
                return Err(error);
            }
            inner.delays.get(&operation).copied()
        };
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        Ok(())
    }
}

impl RemoteApi for FakeRemote {
    fn create(&self, resource_type: &str, attributes: &Attributes) -> Result<Created, RemoteError> {
        self.begin(Operation::Create, None)?;
        let name = attributes
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("unnamed");
        let external_id = format!("{resource_type}/{name}");
        let arn = format!("arn:fake:{external_id}");

        let mut stored = attributes.clone();
        stored.insert("arn".to_string(), Value::from(arn.clone()));
        self.lock().objects.insert(external_id.clone(), stored);

        let mut computed = Attributes::new();
        computed.insert("arn".to_string(), Value::from(arn));
        Ok(Created {
            external_id,
            computed,
        })
    }

    fn read(&self, _resource_type: &str, external_id: &str) -> Result<Attributes, RemoteError> {
        self.begin(Operation::Read, Some(external_id))?;
        self.lock()
            .objects
            .get(external_id)
            .cloned()
            .ok_or(RemoteError::NotFound)
    }

    fn update(
        &self,
        _resource_type: &str,
        external_id: &str,
        changes: &AttributeUpdate,
    ) -> Result<Attributes, RemoteError> {
        self.begin(Operation::Update, Some(external_id))?;
        let mut inner = self.lock();
        let object = inner
            .objects
            .get_mut(external_id)
            .ok_or(RemoteError::NotFound)?;
        for (name, value) in changes {
            match value {
                Some(value) => object.insert(name.clone(), value.clone()),
                None => object.remove(name),
            };
        }
        Ok(object
            .iter()
            .filter(|(name, _)| name.as_str() == "arn")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn delete(&self, _resource_type: &str, external_id: &str) -> Result<(), RemoteError> {
        self.begin(Operation::Delete, Some(external_id))?;
        self.lock()
            .objects
            .remove(external_id)
            .map(|_| ())
            .ok_or(RemoteError::NotFound)
    }
}
