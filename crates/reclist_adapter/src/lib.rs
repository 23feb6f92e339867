#![forbid(unsafe_code)]

pub mod line_item;

use std::fmt;
use std::sync::Arc;

use reclist_contracts::list_options::RecordListOptions;
use reclist_contracts::record::RecordKey;
use reclist_contracts::submission::{FormDecodeError, SubmittedData};
use reclist_engines::integrity_codec::IntegrityCodec;
use reclist_engines::key_store::SecretSource;
use reclist_os::{RecordListController, RecordListError, RecordListView};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::line_item::{line_item_labels, LineItem, LineItemFactory, LINE_ITEM_NAMESPACE};

#[derive(Debug)]
pub enum AdapterError {
    Decode(FormDecodeError),
    RecordList(RecordListError),
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "form decode failed: {err}"),
            Self::RecordList(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AdapterError {}

impl From<FormDecodeError> for AdapterError {
    fn from(value: FormDecodeError) -> Self {
        Self::Decode(value)
    }
}

impl From<RecordListError> for AdapterError {
    fn from(value: RecordListError) -> Self {
        Self::RecordList(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedLineItem {
    pub key: RecordKey,
    pub record: LineItem,
}

/// A submitted value the line item could not take, echoed back for re-display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemFieldError {
    pub key: RecordKey,
    pub field: String,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItemFormResponse {
    pub status: String,
    pub outcome: String,
    pub view: RecordListView<LineItem>,
    pub changed: Vec<ChangedLineItem>,
    pub removed: Vec<LineItem>,
    pub field_errors: Vec<LineItemFieldError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterErrorResponse {
    pub status: String,
    pub outcome: String,
    pub reason: String,
}

impl AdapterErrorResponse {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            outcome: "REJECTED".to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterHealthResponse {
    pub status: String,
    pub outcome: String,
}

/// Holds only the process-wide codec; every request rebuilds its record list from the form.
#[derive(Debug, Clone)]
pub struct AdapterRuntime {
    codec: Arc<IntegrityCodec>,
}

impl AdapterRuntime {
    pub fn new(codec: Arc<IntegrityCodec>) -> Self {
        Self { codec }
    }

    pub fn default_from_env() -> Result<Self, String> {
        let secret = SecretSource::from_env()
            .load()
            .map_err(|e| format!("failed to load integrity secret: {e}"))?;
        Ok(Self::new(Arc::new(IntegrityCodec::new(secret))))
    }

    pub fn health_report(&self) -> AdapterHealthResponse {
        AdapterHealthResponse {
            status: "ok".to_string(),
            outcome: "HEALTHY".to_string(),
        }
    }

    /// Initial display from authoritative records, before any submission.
    pub fn seed_line_item_form(
        &self,
        records: &[LineItem],
    ) -> Result<LineItemFormResponse, AdapterError> {
        let mut list = self.line_item_list()?;
        list.replace_records(records)?;
        info!(records = records.len(), "line item form seeded");
        respond(&list, "SEEDED", Vec::new())
    }

    pub fn run_line_item_submission<I, K, V>(
        &self,
        form_pairs: I,
    ) -> Result<LineItemFormResponse, AdapterError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let submitted = SubmittedData::from_form_pairs(form_pairs)?;
        let mut list = self.line_item_list()?;
        let outcome = list.process_submission(&submitted).map_err(|err| {
            warn!(error = %err, "line item submission rejected");
            err
        })?;
        let field_errors = field_errors(&list);
        if !field_errors.is_empty() {
            info!(errors = field_errors.len(), "line item submission has field errors");
        }
        let outcome = match (field_errors.is_empty(), outcome.state_changed) {
            (false, _) => "INVALID",
            (true, true) => "UPDATED",
            (true, false) => "UNCHANGED",
        };
        respond(&list, outcome, field_errors)
    }

    fn line_item_list(&self) -> Result<RecordListController<LineItemFactory>, RecordListError> {
        RecordListController::new(
            RecordListOptions::v1(LINE_ITEM_NAMESPACE, line_item_labels()),
            LineItemFactory,
            self.codec.clone(),
        )
    }
}

fn field_errors(list: &RecordListController<LineItemFactory>) -> Vec<LineItemFieldError> {
    list.changed_records()
        .into_keys()
        .filter_map(|key| {
            let value = list.binding(key)?.invalid_quantity()?;
            Some(LineItemFieldError {
                key,
                field: "quantity".to_string(),
                value: value.to_string(),
                reason: "must be a whole number".to_string(),
            })
        })
        .collect()
}

fn respond(
    list: &RecordListController<LineItemFactory>,
    outcome: &str,
    field_errors: Vec<LineItemFieldError>,
) -> Result<LineItemFormResponse, AdapterError> {
    let removed = list.removed_records()?;
    let changed = list
        .changed_records()
        .into_iter()
        .map(|(key, record)| ChangedLineItem { key, record })
        .collect();
    Ok(LineItemFormResponse {
        status: "ok".to_string(),
        outcome: outcome.to_string(),
        view: list.view(),
        changed,
        removed,
        field_errors,
    })
}
