#![forbid(unsafe_code)]

pub mod common;
pub mod envelope;
pub mod list_options;
pub mod record;
pub mod submission;

pub use common::{ContractViolation, Validate};
