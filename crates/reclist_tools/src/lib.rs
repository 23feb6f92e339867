#![forbid(unsafe_code)]

pub mod envelope_cli;
pub mod key_cli;
