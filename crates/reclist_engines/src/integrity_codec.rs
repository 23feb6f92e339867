#![forbid(unsafe_code)]

use std::fmt;

use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD as BASE64_URL};
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use reclist_contracts::envelope::IntegrityEnvelope;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

const CODEC_DOMAIN: &[u8] = b"reclist.integrity.v1";
const CODEC_DOCUMENT_VERSION: u8 = 1;
const TAG_HEX_LEN: usize = 64;

pub const INTEGRITY_SECRET_MIN_LEN: usize = 32;
pub const INTEGRITY_SECRET_GENERATED_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    SecretTooShort { min: usize, got: usize },
    SecretEncoding,
    KeyRejected,
    Encode(String),
    TagMalformed,
    TagMismatch,
    PayloadMalformed,
    UnsupportedVersion(u8),
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SecretTooShort { min, got } => {
                write!(f, "integrity secret must be >= {min} bytes, got {got}")
            }
            Self::SecretEncoding => write!(f, "integrity secret is not valid base64"),
            Self::KeyRejected => write!(f, "integrity secret rejected by mac"),
            Self::Encode(reason) => write!(f, "failed to encode integrity payload: {reason}"),
            Self::TagMalformed => write!(f, "integrity tag is malformed"),
            Self::TagMismatch => write!(f, "integrity tag does not match payload"),
            Self::PayloadMalformed => write!(f, "integrity payload could not be decoded"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported integrity payload version {v}"),
        }
    }
}

impl std::error::Error for IntegrityError {}

/// Server-held key for the envelope tags. Loaded once per process and never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct IntegritySecret(Vec<u8>);

impl IntegritySecret {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, IntegrityError> {
        if bytes.len() < INTEGRITY_SECRET_MIN_LEN {
            return Err(IntegrityError::SecretTooShort {
                min: INTEGRITY_SECRET_MIN_LEN,
                got: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    pub fn from_base64(encoded: &str) -> Result<Self, IntegrityError> {
        let bytes = BASE64
            .decode(encoded.trim().as_bytes())
            .map_err(|_| IntegrityError::SecretEncoding)?;
        Self::from_bytes(bytes)
    }

    pub fn generate() -> Self {
        let mut bytes = vec![0u8; INTEGRITY_SECRET_GENERATED_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for IntegritySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IntegritySecret(<{} bytes redacted>)", self.0.len())
    }
}

#[derive(Serialize)]
struct EnvelopeDocumentRef<'a, T: ?Sized> {
    v: u8,
    value: &'a T,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EnvelopeDocument<T> {
    v: u8,
    value: T,
}

/// Keyed-hash (HMAC-SHA256) envelope codec.
///
/// Payloads are base64url JSON; tags are lowercase hex over the payload text, so a reader of
/// the payload still cannot mint a tag for a modified one.
#[derive(Debug, Clone)]
pub struct IntegrityCodec {
    secret: IntegritySecret,
}

impl IntegrityCodec {
    pub fn new(secret: IntegritySecret) -> Self {
        Self { secret }
    }

    pub fn serialize<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<IntegrityEnvelope, IntegrityError> {
        let doc = EnvelopeDocumentRef {
            v: CODEC_DOCUMENT_VERSION,
            value,
        };
        let json = serde_json::to_vec(&doc).map_err(|e| IntegrityError::Encode(e.to_string()))?;
        let payload = BASE64_URL.encode(json);
        let tag = hex::encode(self.mac_for(&payload)?.finalize().into_bytes());
        Ok(IntegrityEnvelope { payload, tag })
    }

    /// All-or-nothing: the payload is only decoded after the tag verifies.
    pub fn verify_and_deserialize<T: DeserializeOwned>(
        &self,
        envelope: &IntegrityEnvelope,
    ) -> Result<T, IntegrityError> {
        if !is_canonical_tag(&envelope.tag) {
            warn!(tag_len = envelope.tag.len(), "integrity tag rejected: malformed");
            return Err(IntegrityError::TagMalformed);
        }
        let tag = hex::decode(&envelope.tag).map_err(|_| IntegrityError::TagMalformed)?;
        if self.mac_for(&envelope.payload)?.verify_slice(&tag).is_err() {
            warn!(
                payload_len = envelope.payload.len(),
                "integrity tag rejected: mismatch"
            );
            return Err(IntegrityError::TagMismatch);
        }

        let json = BASE64_URL
            .decode(envelope.payload.as_bytes())
            .map_err(|_| IntegrityError::PayloadMalformed)?;
        let doc: EnvelopeDocument<T> =
            serde_json::from_slice(&json).map_err(|_| IntegrityError::PayloadMalformed)?;
        if doc.v != CODEC_DOCUMENT_VERSION {
            return Err(IntegrityError::UnsupportedVersion(doc.v));
        }
        Ok(doc.value)
    }

    fn mac_for(&self, payload: &str) -> Result<HmacSha256, IntegrityError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| IntegrityError::KeyRejected)?;
        mac.update(CODEC_DOMAIN);
        mac.update(&[0u8]);
        mac.update(payload.as_bytes());
        Ok(mac)
    }
}

fn is_canonical_tag(tag: &str) -> bool {
    tag.len() == TAG_HEX_LEN && tag.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: Option<u64>,
        label: String,
    }

    fn codec() -> IntegrityCodec {
        IntegrityCodec::new(IntegritySecret::from_bytes(vec![7u8; 32]).unwrap())
    }

    fn samples() -> Vec<Sample> {
        vec![
            Sample {
                id: Some(42),
                label: "bolt".to_string(),
            },
            Sample {
                id: None,
                label: "nut".to_string(),
            },
        ]
    }

    fn corrupt_char(input: &str, idx: usize) -> String {
        let mut chars: Vec<char> = input.chars().collect();
        chars[idx] = if chars[idx] == 'a' { 'b' } else { 'a' };
        chars.into_iter().collect()
    }

    #[test]
    fn at_codec_01_roundtrip_returns_original_value() {
        let codec = codec();
        let env = codec.serialize(&samples()).unwrap();
        let back: Vec<Sample> = codec.verify_and_deserialize(&env).unwrap();
        assert_eq!(back, samples());

        let empty = codec.serialize(&Vec::<Sample>::new()).unwrap();
        let back: Vec<Sample> = codec.verify_and_deserialize(&empty).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn at_codec_02_tampered_payload_is_rejected() {
        let codec = codec();
        let env = codec.serialize(&samples()).unwrap();
        for idx in [0, env.payload.len() / 2, env.payload.len() - 1] {
            let tampered = IntegrityEnvelope::new(corrupt_char(&env.payload, idx), env.tag.clone());
            let err = codec
                .verify_and_deserialize::<Vec<Sample>>(&tampered)
                .expect_err("tampered payload must fail");
            assert_eq!(err, IntegrityError::TagMismatch);
        }
    }

    #[test]
    fn at_codec_03_tampered_tag_is_rejected() {
        let codec = codec();
        let env = codec.serialize(&samples()).unwrap();
        let tampered = IntegrityEnvelope::new(env.payload.clone(), corrupt_char(&env.tag, 5));
        assert_eq!(
            codec.verify_and_deserialize::<Vec<Sample>>(&tampered),
            Err(IntegrityError::TagMismatch)
        );

        let upper = IntegrityEnvelope::new(env.payload.clone(), env.tag.to_ascii_uppercase());
        assert_eq!(
            codec.verify_and_deserialize::<Vec<Sample>>(&upper),
            Err(IntegrityError::TagMalformed)
        );

        let truncated = IntegrityEnvelope::new(env.payload.clone(), env.tag[..63].to_string());
        assert_eq!(
            codec.verify_and_deserialize::<Vec<Sample>>(&truncated),
            Err(IntegrityError::TagMalformed)
        );
    }

    #[test]
    fn at_codec_04_other_secret_cannot_verify() {
        let env = codec().serialize(&samples()).unwrap();
        let other = IntegrityCodec::new(IntegritySecret::from_bytes(vec![8u8; 32]).unwrap());
        assert_eq!(
            other.verify_and_deserialize::<Vec<Sample>>(&env),
            Err(IntegrityError::TagMismatch)
        );
    }

    #[test]
    fn at_codec_05_wrong_shape_fails_without_partial_value() {
        let codec = codec();
        let env = codec.serialize(&"not a list").unwrap();
        assert_eq!(
            codec.verify_and_deserialize::<Vec<Sample>>(&env),
            Err(IntegrityError::PayloadMalformed)
        );
    }

    #[test]
    fn at_codec_06_tag_swap_between_envelopes_is_rejected() {
        let codec = codec();
        let a = codec.serialize(&samples()).unwrap();
        let b = codec.serialize(&Vec::<Sample>::new()).unwrap();
        assert_ne!(a.tag, b.tag);
        let swapped = IntegrityEnvelope::new(a.payload, b.tag);
        assert_eq!(
            codec.verify_and_deserialize::<Vec<Sample>>(&swapped),
            Err(IntegrityError::TagMismatch)
        );
    }

    #[test]
    fn at_codec_07_secret_must_meet_minimum_length() {
        assert_eq!(
            IntegritySecret::from_bytes(vec![1u8; 16]),
            Err(IntegrityError::SecretTooShort { min: 32, got: 16 })
        );
        assert_eq!(
            IntegritySecret::from_base64("%%%"),
            Err(IntegrityError::SecretEncoding)
        );
        let generated = IntegritySecret::generate();
        let restored = IntegritySecret::from_base64(&generated.to_base64()).unwrap();
        assert_eq!(generated, restored);
    }

    #[test]
    fn at_codec_08_debug_output_redacts_secret() {
        let secret = IntegritySecret::from_bytes(vec![0x41; 32]).unwrap();
        let rendered = format!("{:?}", IntegrityCodec::new(secret));
        assert!(rendered.contains("redacted"));
        assert!(!rendered.contains("65, 65"));
    }
}
