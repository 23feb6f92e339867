#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Opaque payload plus keyed-hash tag, round-tripped by the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityEnvelope {
    pub payload: String,
    pub tag: String,
}

impl IntegrityEnvelope {
    pub fn new(payload: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            tag: tag.into(),
        }
    }
}

/// One hidden field as the rendering layer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierField {
    pub name: String,
    pub value: String,
}

/// Hidden fields carrying the removed-record envelope and the sealed identity roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierFields {
    pub removed: CarrierField,
    pub removed_hash: CarrierField,
    pub identities: CarrierField,
    pub identities_hash: CarrierField,
}

impl CarrierFields {
    pub fn envelope(&self) -> IntegrityEnvelope {
        IntegrityEnvelope::new(self.removed.value.clone(), self.removed_hash.value.clone())
    }

    pub fn identities_envelope(&self) -> IntegrityEnvelope {
        IntegrityEnvelope::new(
            self.identities.value.clone(),
            self.identities_hash.value.clone(),
        )
    }

    /// Every hidden field as a `(name, value)` pair, in render order.
    pub fn pairs(&self) -> [(&str, &str); 4] {
        [
            (&self.removed.name, &self.removed.value),
            (&self.removed_hash.name, &self.removed_hash.value),
            (&self.identities.name, &self.identities.value),
            (&self.identities_hash.name, &self.identities_hash.value),
        ]
        .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}
