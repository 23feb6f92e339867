#![forbid(unsafe_code)]

pub mod identity_roster;
pub mod integrity_codec;
pub mod key_store;
pub mod record_set;
pub mod removed_ledger;
