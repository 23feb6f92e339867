#![forbid(unsafe_code)]

use std::marker::PhantomData;

use reclist_contracts::envelope::IntegrityEnvelope;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::integrity_codec::{IntegrityCodec, IntegrityError};

/// Removed, previously persisted records, carried by the client as one integrity envelope.
///
/// The carrier is the only state: every read verifies it and every append re-seals the whole
/// list, so a forged carrier surfaces on the next read or append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedLedger<R> {
    carrier: IntegrityEnvelope,
    _record: PhantomData<fn() -> R>,
}

impl<R> RemovedLedger<R>
where
    R: Serialize + DeserializeOwned,
{
    pub fn empty(codec: &IntegrityCodec) -> Result<Self, IntegrityError> {
        let carrier = codec.serialize::<[R]>(&[])?;
        Ok(Self::from_carrier(carrier))
    }

    pub fn from_carrier(carrier: IntegrityEnvelope) -> Self {
        Self {
            carrier,
            _record: PhantomData,
        }
    }

    pub fn carrier(&self) -> &IntegrityEnvelope {
        &self.carrier
    }

    /// Replaces the carrier with the values the client echoed back.
    pub fn restore_carrier(&mut self, carrier: IntegrityEnvelope) {
        self.carrier = carrier;
    }

    pub fn records(&self, codec: &IntegrityCodec) -> Result<Vec<R>, IntegrityError> {
        codec.verify_and_deserialize(&self.carrier)
    }

    /// Appends `record` and re-seals; returns the new ledger length.
    pub fn append(&mut self, codec: &IntegrityCodec, record: R) -> Result<usize, IntegrityError> {
        let mut records = self.records(codec)?;
        records.push(record);
        self.carrier = codec.serialize(records.as_slice())?;
        info!(ledger_len = records.len(), "removed-record ledger appended");
        Ok(records.len())
    }
}
