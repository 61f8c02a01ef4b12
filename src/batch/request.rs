//! Batch request model
//!
//! Wire shape (the `POST applyBatch` body):
//!
//! ```json
//! {
//!   "add":    [ { "id": 12, "name": "..." } ],
//!   "modify": [ { "id": 3, "version": 4, "name": "..." } ],
//!   "delete": [ 7, 8 ]
//! }
//! ```
//!
//! Modify entries carry their expected version embedded in the payload, the
//! same place the store mirrors it on every read. A modify entry without a
//! version is a hard error; a delete of an absent id is not. The asymmetry
//! is deliberate: a versionless modify is a client bug, a stale delete is
//! an ordinary race.

use serde_json::Value;

use crate::store::PersonId;

use super::errors::{BatchError, BatchResult};

/// Extract the numeric person id from a payload object.
pub fn person_id_of(payload: &Value) -> BatchResult<PersonId> {
    if !payload.is_object() {
        return Err(BatchError::InvalidPayload);
    }
    payload
        .get("id")
        .and_then(Value::as_u64)
        .map(PersonId::new)
        .ok_or(BatchError::MissingId)
}

/// One modify entry: the replacement payload plus the version the caller
/// last observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyEntry {
    /// Target person
    pub person_id: PersonId,
    /// Version the caller read before editing
    pub expected_version: u64,
    /// Replacement payload
    pub payload: Value,
}

impl ModifyEntry {
    /// Parse a modify entry from a person payload.
    pub fn from_payload(payload: Value) -> BatchResult<Self> {
        let person_id = person_id_of(&payload)?;
        let expected_version = payload
            .get("version")
            .and_then(Value::as_u64)
            .ok_or(BatchError::MissingVersion { person_id })?;
        Ok(Self {
            person_id,
            expected_version,
            payload,
        })
    }
}

/// A parsed batch: adds, modifies, and deletes applied as one unit.
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    /// New person payloads (each must carry an `id`)
    pub add: Vec<Value>,
    /// Modify entries with their expected versions
    pub modify: Vec<ModifyEntry>,
    /// Person ids to remove
    pub delete: Vec<PersonId>,
}

impl BatchRequest {
    pub fn new(add: Vec<Value>, modify: Vec<ModifyEntry>, delete: Vec<PersonId>) -> Self {
        Self {
            add,
            modify,
            delete,
        }
    }

    /// Parse the wire shape. Absent sections default to empty.
    pub fn from_value(body: &Value) -> BatchResult<Self> {
        let obj = body.as_object().ok_or(BatchError::InvalidPayload)?;

        let add = match obj.get("add") {
            None => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(_) => return Err(BatchError::InvalidPayload),
        };

        let modify = match obj.get("modify") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| ModifyEntry::from_payload(item.clone()))
                .collect::<BatchResult<Vec<_>>>()?,
            Some(_) => return Err(BatchError::InvalidPayload),
        };

        let delete = match obj.get("delete") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .map(PersonId::new)
                        .ok_or(BatchError::InvalidPayload)
                })
                .collect::<BatchResult<Vec<_>>>()?,
            Some(_) => return Err(BatchError::InvalidPayload),
        };

        Ok(Self::new(add, modify, delete))
    }

    /// Whether the batch contains no operations at all.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.modify.is_empty() && self.delete.is_empty()
    }
}
