#![forbid(unsafe_code)]

use std::env;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::integrity_codec::{IntegrityError, IntegritySecret};

pub const ENV_INTEGRITY_SECRET: &str = "RECLIST_INTEGRITY_SECRET";
pub const ENV_INTEGRITY_KEY_PATH: &str = "RECLIST_INTEGRITY_KEY_PATH";

#[derive(Debug)]
pub enum KeyStoreError {
    Io(std::io::Error),
    Secret(IntegrityError),
    AlreadyExists(PathBuf),
}

impl std::fmt::Display for KeyStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Secret(err) => write!(f, "invalid integrity secret: {err}"),
            Self::AlreadyExists(path) => {
                write!(f, "integrity key already exists at {}", path.display())
            }
        }
    }
}

impl std::error::Error for KeyStoreError {}

impl From<std::io::Error> for KeyStoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<IntegrityError> for KeyStoreError {
    fn from(value: IntegrityError) -> Self {
        Self::Secret(value)
    }
}

/// Where the process-wide integrity secret comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    Inline(String),
    KeyFile(PathBuf),
}

impl SecretSource {
    /// `RECLIST_INTEGRITY_SECRET` wins over `RECLIST_INTEGRITY_KEY_PATH`.
    pub fn from_env() -> Self {
        if let Ok(inline) = env::var(ENV_INTEGRITY_SECRET) {
            if !inline.trim().is_empty() {
                return Self::Inline(inline);
            }
        }
        Self::KeyFile(key_path_from_env())
    }

    pub fn load(&self) -> Result<IntegritySecret, KeyStoreError> {
        match self {
            Self::Inline(encoded) => Ok(IntegritySecret::from_base64(encoded)?),
            Self::KeyFile(path) => IntegrityKeyStore::for_path(path.clone()).load_or_create(),
        }
    }
}

/// Key file holding the base64 integrity secret, created owner-only on first use.
#[derive(Debug, Clone)]
pub struct IntegrityKeyStore {
    key_path: PathBuf,
}

impl IntegrityKeyStore {
    pub fn default_local() -> Self {
        Self::for_path(key_path_from_env())
    }

    pub fn for_path(key_path: PathBuf) -> Self {
        Self { key_path }
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    pub fn exists(&self) -> bool {
        self.key_path.exists()
    }

    pub fn load(&self) -> Result<Option<IntegritySecret>, KeyStoreError> {
        if !self.key_path.exists() {
            return Ok(None);
        }
        let encoded = fs::read_to_string(&self.key_path)?;
        Ok(Some(IntegritySecret::from_base64(&encoded)?))
    }

    pub fn load_or_create(&self) -> Result<IntegritySecret, KeyStoreError> {
        if let Some(secret) = self.load()? {
            return Ok(secret);
        }
        let secret = IntegritySecret::generate();
        self.write_new(&secret)?;
        Ok(secret)
    }

    /// Fails with `AlreadyExists` rather than replacing a live key; rotating invalidates every
    /// envelope already handed to clients.
    pub fn install(&self, secret: &IntegritySecret) -> Result<(), KeyStoreError> {
        if self.key_path.exists() {
            return Err(KeyStoreError::AlreadyExists(self.key_path.clone()));
        }
        self.write_new(secret)
    }

    fn write_new(&self, secret: &IntegritySecret) -> Result<(), KeyStoreError> {
        if let Some(parent) = self.key_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        write_new_file_restricted(&self.key_path, secret.to_base64().as_bytes())?;
        info!(key_path = %self.key_path.display(), "integrity key created");
        Ok(())
    }
}

fn key_path_from_env() -> PathBuf {
    env::var(ENV_INTEGRITY_KEY_PATH)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(default_key_path)
}

fn default_key_path() -> PathBuf {
    if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg_config_home)
            .join("reclist")
            .join("integrity.key");
    }
    if let Ok(home) = env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("reclist")
            .join("integrity.key");
    }
    PathBuf::from(".reclist").join("integrity.key")
}

fn write_new_file_restricted(path: &Path, data: &[u8]) -> Result<(), KeyStoreError> {
    let mut file = OpenOptions::new().create_new(true).write(true).open(path)?;
    file.write_all(data)?;
    file.flush()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{IntegrityKeyStore, KeyStoreError, SecretSource};
    use crate::integrity_codec::IntegritySecret;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_key_path(name: &str) -> (PathBuf, PathBuf) {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(1);
        let base = std::env::temp_dir().join(format!("reclist-key-test-{name}-{suffix}"));
        let key_path = base.join("nested").join("integrity.key");
        (base, key_path)
    }

    #[test]
    fn at_keystore_01_load_or_create_is_stable_across_loads() {
        let (base, key_path) = temp_key_path("stable");
        let store = IntegrityKeyStore::for_path(key_path.clone());
        assert!(!store.exists());

        let first = store.load_or_create().expect("create should succeed");
        let second = store.load_or_create().expect("load should succeed");
        assert_eq!(first, second);

        let raw = fs::read_to_string(&key_path).unwrap();
        assert_eq!(raw, first.to_base64());
        fs::remove_dir_all(base).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn at_keystore_02_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let (base, key_path) = temp_key_path("perms");
        IntegrityKeyStore::for_path(key_path.clone())
            .load_or_create()
            .unwrap();
        let mode = fs::metadata(&key_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        fs::remove_dir_all(base).unwrap();
    }

    #[test]
    fn at_keystore_03_install_never_overwrites() {
        let (base, key_path) = temp_key_path("install");
        let store = IntegrityKeyStore::for_path(key_path);
        let secret = IntegritySecret::generate();
        store.install(&secret).unwrap();
        let err = store
            .install(&IntegritySecret::generate())
            .expect_err("second install must fail");
        assert!(matches!(err, KeyStoreError::AlreadyExists(_)));
        assert_eq!(store.load().unwrap(), Some(secret));
        fs::remove_dir_all(base).unwrap();
    }

    #[test]
    fn at_keystore_04_corrupt_key_file_fails_closed() {
        let (base, key_path) = temp_key_path("corrupt");
        fs::create_dir_all(key_path.parent().unwrap()).unwrap();
        fs::write(&key_path, "c2hvcnQ=").unwrap();
        let err = IntegrityKeyStore::for_path(key_path)
            .load_or_create()
            .expect_err("short key must fail");
        assert!(matches!(err, KeyStoreError::Secret(_)));
        fs::remove_dir_all(base).unwrap();
    }

    #[test]
    fn at_keystore_05_inline_source_decodes_base64() {
        let secret = IntegritySecret::generate();
        let loaded = SecretSource::Inline(secret.to_base64()).load().unwrap();
        assert_eq!(loaded, secret);
        assert!(SecretSource::Inline("bm9wZQ==".to_string()).load().is_err());
    }
}
