#![forbid(unsafe_code)]

use reclist_contracts::envelope::CarrierFields;
use reclist_contracts::list_options::{RecordLabels, RecordListMessages, RecordListMode};
use reclist_contracts::record::RecordKey;
use serde::Serialize;

/// Immutable snapshot handed to rendering collaborators; nothing in it aliases controller state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordListView<R> {
    pub namespace: String,
    pub mode: RecordListMode,
    pub labels: RecordLabels,
    pub messages: RecordListMessages,
    pub records_field: String,
    pub entries: Vec<RecordEntryView<R>>,
    pub carrier: Option<CarrierFields>,
    pub add_field: Option<String>,
    pub submit_field: Option<String>,
}

impl<R> RecordListView<R> {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Message to show in place of the entries, if any.
    pub fn placeholder(&self) -> Option<&str> {
        if self.entries.is_empty() {
            Some(self.messages.no_records.as_str())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordEntryView<R> {
    pub key: RecordKey,
    pub field_prefix: String,
    pub remove_field: Option<String>,
    pub record: R,
}
