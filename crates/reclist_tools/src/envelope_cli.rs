#![forbid(unsafe_code)]

use reclist_contracts::envelope::IntegrityEnvelope;
use reclist_engines::integrity_codec::IntegrityCodec;

/// `seal` takes a JSON document; `open` takes a payload and a tag.
pub fn execute_envelope_command(
    codec: &IntegrityCodec,
    subcommand: &str,
    args: &[&str],
    input: Option<&str>,
) -> Result<String, String> {
    match subcommand {
        "seal" => {
            let raw = input.ok_or_else(|| "missing JSON input".to_string())?;
            let value: serde_json::Value =
                serde_json::from_str(raw).map_err(|e| format!("invalid JSON input: {e}"))?;
            let envelope = codec
                .serialize(&value)
                .map_err(|e| format!("failed to seal envelope: {e}"))?;
            Ok(format!("payload={}\ntag={}", envelope.payload, envelope.tag))
        }
        "open" => {
            let [payload, tag] = args else {
                return Err("usage: reclist envelope open <payload> <tag>".to_string());
            };
            let value: serde_json::Value = codec
                .verify_and_deserialize(&IntegrityEnvelope::new(*payload, *tag))
                .map_err(|e| format!("envelope rejected: {e}"))?;
            serde_json::to_string_pretty(&value).map_err(|e| e.to_string())
        }
        _ => Err(format!(
            "unknown envelope subcommand: {subcommand}. expected one of: seal, open"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::execute_envelope_command;
    use reclist_engines::integrity_codec::{IntegrityCodec, IntegritySecret};

    fn codec() -> IntegrityCodec {
        IntegrityCodec::new(IntegritySecret::from_bytes(vec![1u8; 32]).unwrap())
    }

    fn split_sealed(out: &str) -> (String, String) {
        let mut payload = String::new();
        let mut tag = String::new();
        for line in out.lines() {
            if let Some(v) = line.strip_prefix("payload=") {
                payload = v.to_string();
            } else if let Some(v) = line.strip_prefix("tag=") {
                tag = v.to_string();
            }
        }
        (payload, tag)
    }

    #[test]
    fn at_envelope_cli_01_seal_then_open() {
        let codec = codec();
        let sealed =
            execute_envelope_command(&codec, "seal", &[], Some(r#"[{"id":"42"}]"#)).unwrap();
        let (payload, tag) = split_sealed(&sealed);
        let opened =
            execute_envelope_command(&codec, "open", &[payload.as_str(), tag.as_str()], None)
                .unwrap();
        let value: serde_json::Value = serde_json::from_str(&opened).unwrap();
        assert_eq!(value[0]["id"], "42");
    }

    #[test]
    fn at_envelope_cli_02_open_rejects_foreign_tag() {
        let sealed = execute_envelope_command(&codec(), "seal", &[], Some("[]")).unwrap();
        let (payload, tag) = split_sealed(&sealed);
        let other = IntegrityCodec::new(IntegritySecret::from_bytes(vec![2u8; 32]).unwrap());
        let err =
            execute_envelope_command(&other, "open", &[payload.as_str(), tag.as_str()], None)
                .unwrap_err();
        assert!(err.starts_with("envelope rejected"));
    }

    #[test]
    fn at_envelope_cli_03_usage_errors() {
        let codec = codec();
        assert!(execute_envelope_command(&codec, "open", &["only-one"], None).is_err());
        assert!(execute_envelope_command(&codec, "seal", &[], None).is_err());
        assert!(execute_envelope_command(&codec, "seal", &[], Some("{nope")).is_err());
        assert!(execute_envelope_command(&codec, "bogus", &[], None).is_err());
    }
}
