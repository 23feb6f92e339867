#![forbid(unsafe_code)]

pub mod record_list;
pub mod view;

pub use record_list::{RecordListController, RecordListError, SubmissionOutcome};
pub use view::{RecordEntryView, RecordListView};
