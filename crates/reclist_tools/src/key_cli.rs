#![forbid(unsafe_code)]

use reclist_engines::integrity_codec::IntegritySecret;
use reclist_engines::key_store::IntegrityKeyStore;

pub fn execute_key_command(
    store: &IntegrityKeyStore,
    subcommand: &str,
    value: Option<&str>,
) -> Result<String, String> {
    match subcommand {
        "init" => {
            if store.exists() {
                return Ok(format!("EXISTS {}", store.key_path().display()));
            }
            store
                .load_or_create()
                .map_err(|e| format!("failed to create integrity key: {e}"))?;
            Ok(format!("CREATED {}", store.key_path().display()))
        }
        "set" => {
            let raw = value.ok_or_else(|| "missing secret input value".to_string())?;
            let secret = IntegritySecret::from_base64(raw)
                .map_err(|e| format!("invalid integrity secret: {e}"))?;
            store
                .install(&secret)
                .map_err(|e| format!("failed to store integrity key: {e}"))?;
            Ok("OK".to_string())
        }
        "path" => Ok(store.key_path().display().to_string()),
        "has" => {
            let has = store
                .load()
                .map_err(|e| format!("failed to check integrity key: {e}"))?
                .is_some();
            Ok(if has { "YES" } else { "NO" }.to_string())
        }
        _ => Err(format!(
            "unknown key subcommand: {subcommand}. expected one of: init, set, path, has"
        )),
    }
}
