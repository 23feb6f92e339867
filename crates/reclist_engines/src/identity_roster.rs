#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use reclist_contracts::envelope::IntegrityEnvelope;
use reclist_contracts::record::{RecordId, RecordKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::integrity_codec::{IntegrityCodec, IntegrityError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RosterEntry {
    key: RecordKey,
    id: RecordId,
}

/// Record identities the server itself placed at each key, sealed for the client to echo.
///
/// Client-submitted fields never add to the roster; it is sealed from authoritative records and
/// only shrinks as keys are removed, so an identity typed into a form row is never vouched for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRoster {
    carrier: IntegrityEnvelope,
}

impl IdentityRoster {
    pub fn empty(codec: &IntegrityCodec) -> Result<Self, IntegrityError> {
        Self::seal(codec, &BTreeMap::new())
    }

    pub fn seal(
        codec: &IntegrityCodec,
        identities: &BTreeMap<RecordKey, RecordId>,
    ) -> Result<Self, IntegrityError> {
        let entries: Vec<RosterEntry> = identities
            .iter()
            .map(|(key, id)| RosterEntry {
                key: *key,
                id: id.clone(),
            })
            .collect();
        Ok(Self {
            carrier: codec.serialize(entries.as_slice())?,
        })
    }

    pub fn carrier(&self) -> &IntegrityEnvelope {
        &self.carrier
    }

    /// Replaces the carrier with the values the client echoed back.
    pub fn restore_carrier(&mut self, carrier: IntegrityEnvelope) {
        self.carrier = carrier;
    }

    pub fn identities(
        &self,
        codec: &IntegrityCodec,
    ) -> Result<BTreeMap<RecordKey, RecordId>, IntegrityError> {
        let entries: Vec<RosterEntry> = codec.verify_and_deserialize(&self.carrier)?;
        Ok(entries
            .into_iter()
            .map(|entry| (entry.key, entry.id))
            .collect())
    }

    pub fn vouches_for(
        &self,
        codec: &IntegrityCodec,
        key: RecordKey,
        id: &RecordId,
    ) -> Result<bool, IntegrityError> {
        Ok(self.identities(codec)?.get(&key) == Some(id))
    }

    /// The roster with `key` dropped, sealed but not yet installed.
    pub fn without(&self, codec: &IntegrityCodec, key: RecordKey) -> Result<Self, IntegrityError> {
        let mut identities = self.identities(codec)?;
        if identities.remove(&key).is_some() {
            debug!(%key, remaining = identities.len(), "identity roster entry dropped");
        }
        Self::seal(codec, &identities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity_codec::IntegritySecret;

    fn codec() -> IntegrityCodec {
        IntegrityCodec::new(IntegritySecret::from_bytes(vec![4u8; 32]).unwrap())
    }

    fn roster(codec: &IntegrityCodec) -> IdentityRoster {
        let identities = BTreeMap::from([
            (RecordKey(0), RecordId::from(42)),
            (RecordKey(2), RecordId::from(7)),
        ]);
        IdentityRoster::seal(codec, &identities).unwrap()
    }

    #[test]
    fn at_roster_01_vouches_only_for_sealed_key_and_id() {
        let codec = codec();
        let roster = roster(&codec);
        assert_eq!(roster.vouches_for(&codec, RecordKey(0), &RecordId::from(42)), Ok(true));
        assert_eq!(roster.vouches_for(&codec, RecordKey(2), &RecordId::from(42)), Ok(false));
        assert_eq!(roster.vouches_for(&codec, RecordKey(1), &RecordId::from(999)), Ok(false));
    }

    #[test]
    fn at_roster_02_without_drops_key_and_reseals() {
        let codec = codec();
        let roster = roster(&codec);
        let next = roster.without(&codec, RecordKey(0)).unwrap();
        assert_ne!(next.carrier(), roster.carrier());
        assert_eq!(
            next.identities(&codec).unwrap(),
            BTreeMap::from([(RecordKey(2), RecordId::from(7))])
        );
    }

    #[test]
    fn at_roster_03_foreign_carrier_is_rejected() {
        let codec = codec();
        let mut roster = IdentityRoster::empty(&codec).unwrap();
        let other = IntegrityCodec::new(IntegritySecret::from_bytes(vec![5u8; 32]).unwrap());
        roster.restore_carrier(self::roster(&other).carrier().clone());
        assert_eq!(
            roster.vouches_for(&codec, RecordKey(0), &RecordId::from(42)),
            Err(IntegrityError::TagMismatch)
        );
    }
}
