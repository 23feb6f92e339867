#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::{ContractViolation, Validate};

pub const RECORDS_FIELD_SUFFIX: &str = "Records";
pub const RECORD_ADD_FIELD_SUFFIX: &str = "RecordAdd";
pub const RECORDS_REMOVED_FIELD_SUFFIX: &str = "RecordsRemoved";
pub const RECORDS_REMOVED_HASH_FIELD_SUFFIX: &str = "RecordsRemovedHash";
pub const RECORDS_IDENTITIES_FIELD_SUFFIX: &str = "RecordsIdentities";
pub const RECORDS_IDENTITIES_HASH_FIELD_SUFFIX: &str = "RecordsIdentitiesHash";
pub const SUBMIT_FIELD_SUFFIX: &str = "Submit";

const NAMESPACE_MAX_LEN: usize = 64;
const LABELS_MAX: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordListMode {
    ReadOnly,
    Editable,
}

impl RecordListMode {
    pub fn from_read_only(read_only: bool) -> Self {
        if read_only {
            Self::ReadOnly
        } else {
            Self::Editable
        }
    }

    pub fn is_read_only(self) -> bool {
        matches!(self, Self::ReadOnly)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "READ_ONLY",
            Self::Editable => "EDITABLE",
        }
    }
}

/// Prefix that keeps one record list's fields apart from every other field on the same form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordListNamespace(String);

impl RecordListNamespace {
    pub fn new(raw: impl Into<String>) -> Result<Self, ContractViolation> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "record_list_options.namespace",
                reason: "must not be empty",
            });
        }
        if raw.len() > NAMESPACE_MAX_LEN {
            return Err(ContractViolation::InvalidValue {
                field: "record_list_options.namespace",
                reason: "must be <= 64 chars",
            });
        }
        if !raw
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
        {
            return Err(ContractViolation::InvalidValue {
                field: "record_list_options.namespace",
                reason: "must start with an ascii letter",
            });
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ContractViolation::InvalidValue {
                field: "record_list_options.namespace",
                reason: "must contain only ascii letters, digits or '_'",
            });
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn records_field(&self) -> String {
        format!("{}{RECORDS_FIELD_SUFFIX}", self.0)
    }

    pub fn add_field(&self) -> String {
        format!("{}{RECORD_ADD_FIELD_SUFFIX}", self.0)
    }

    pub fn removed_field(&self) -> String {
        format!("{}{RECORDS_REMOVED_FIELD_SUFFIX}", self.0)
    }

    pub fn removed_hash_field(&self) -> String {
        format!("{}{RECORDS_REMOVED_HASH_FIELD_SUFFIX}", self.0)
    }

    pub fn identities_field(&self) -> String {
        format!("{}{RECORDS_IDENTITIES_FIELD_SUFFIX}", self.0)
    }

    pub fn identities_hash_field(&self) -> String {
        format!("{}{RECORDS_IDENTITIES_HASH_FIELD_SUFFIX}", self.0)
    }

    pub fn submit_field(&self) -> String {
        format!("{}{SUBMIT_FIELD_SUFFIX}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLabel {
    pub field: String,
    pub label: String,
}

impl FieldLabel {
    pub fn new(field: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            label: label.into(),
        }
    }
}

impl Validate for FieldLabel {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.field.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "field_label.field",
                reason: "must not be empty",
            });
        }
        if self.label.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "field_label.label",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

/// Column labels for the record fields, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLabels(Vec<FieldLabel>);

impl RecordLabels {
    pub fn v1(labels: Vec<FieldLabel>) -> Result<Self, ContractViolation> {
        let labels = Self(labels);
        labels.validate()?;
        Ok(labels)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldLabel> {
        self.0.iter()
    }

    pub fn label_for(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|l| l.field == field)
            .map(|l| l.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Validate for RecordLabels {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0.len() > LABELS_MAX {
            return Err(ContractViolation::InvalidValue {
                field: "record_list_options.labels",
                reason: "must contain <= 64 field labels",
            });
        }
        for (idx, label) in self.0.iter().enumerate() {
            label.validate()?;
            if self.0[..idx].iter().any(|prev| prev.field == label.field) {
                return Err(ContractViolation::InvalidValue {
                    field: "record_list_options.labels",
                    reason: "field names must be unique",
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordListMessages {
    pub legend: String,
    pub description: Option<String>,
    pub add_record: String,
    pub no_records: String,
    pub submit: Option<String>,
}

impl RecordListMessages {
    pub fn mvp_v1() -> Self {
        Self {
            legend: "Records:".to_string(),
            description: None,
            add_record: "Add Another Record".to_string(),
            no_records: "No records listed.".to_string(),
            submit: None,
        }
    }
}

impl Default for RecordListMessages {
    fn default() -> Self {
        Self::mvp_v1()
    }
}

/// Construction options as handed in by the caller; `namespace` and `labels` are required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordListOptions {
    pub namespace: Option<String>,
    pub labels: Option<Vec<FieldLabel>>,
    pub read_only: bool,
    pub messages: RecordListMessages,
}

impl RecordListOptions {
    pub fn v1(namespace: impl Into<String>, labels: Vec<FieldLabel>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            labels: Some(labels),
            read_only: false,
            messages: RecordListMessages::mvp_v1(),
        }
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_messages(mut self, messages: RecordListMessages) -> Self {
        self.messages = messages;
        self
    }

    pub fn resolve(self) -> Result<RecordListConfig, ContractViolation> {
        let namespace = self.namespace.ok_or(ContractViolation::MissingValue {
            field: "record_list_options.namespace",
        })?;
        let labels = self.labels.ok_or(ContractViolation::MissingValue {
            field: "record_list_options.labels",
        })?;
        Ok(RecordListConfig {
            namespace: RecordListNamespace::new(namespace)?,
            labels: RecordLabels::v1(labels)?,
            mode: RecordListMode::from_read_only(self.read_only),
            messages: self.messages,
        })
    }
}

/// Options after validation; everything a record list needs to name and describe its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordListConfig {
    pub namespace: RecordListNamespace,
    pub labels: RecordLabels,
    pub mode: RecordListMode,
    pub messages: RecordListMessages,
}
