#![forbid(unsafe_code)]

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ContractViolation;

/// Positional address of one record inside the current form instance.
///
/// Keys carry no domain meaning and are not stable across independent form sessions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordKey(pub u32);

impl RecordKey {
    pub const FIRST: RecordKey = RecordKey(0);

    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        trimmed.parse::<u32>().ok().map(RecordKey)
    }

    pub fn successor(self) -> Option<Self> {
        self.0.checked_add(1).map(RecordKey)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Domain identity of a record that already exists in durable storage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "record_id",
                reason: "must not be empty",
            });
        }
        if id.len() > 128 {
            return Err(ContractViolation::InvalidValue {
                field: "record_id",
                reason: "must be <= 128 chars",
            });
        }
        if id.chars().any(char::is_control) {
            return Err(ContractViolation::InvalidValue {
                field: "record_id",
                reason: "must not contain control characters",
            });
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl TryFrom<String> for RecordId {
    type Error = ContractViolation;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RecordId> for String {
    fn from(value: RecordId) -> Self {
        value.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity presence is the only thing the record-list core reads from a record.
pub trait Identified {
    /// `Some` iff the record was previously persisted.
    fn record_id(&self) -> Option<&RecordId>;

    fn is_persisted(&self) -> bool {
        self.record_id().is_some()
    }
}

/// Per-record-type capability set injected into a record list.
///
/// A binding is the editable target the surrounding field machinery writes into; a record is
/// the domain value extracted from it.
pub trait RecordFactory {
    type Record: Identified + Clone + Serialize + DeserializeOwned;
    type Binding;

    fn new_empty_record(&self) -> Self::Binding;

    fn extract_record(&self, binding: &Self::Binding) -> Self::Record;

    fn populate_binding(&self, binding: &mut Self::Binding, record: &Self::Record);
}

/// Field-level write target for submitted per-record values.
///
/// Unknown field names are the binding's business; the core only forwards what was submitted.
pub trait FieldBinding {
    fn assign_field(&mut self, field: &str, value: &str);
}
