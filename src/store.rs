// Credential persistence. The record is a flat string -> string map
// stored as pretty JSON so it stays human-editable.

use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CLIENT_ID: &str = "client_id";
pub const ACCESS_TOKEN: &str = "access_token";
pub const REFRESH_TOKEN: &str = "refresh_token";
pub const ACCOUNT_USERNAME: &str = "account_username";
pub const ACCOUNT_ID: &str = "account_id";
pub const EXPIRES_IN: &str = "expires_in";
pub const EXPIRE_DATE: &str = "expire_date";

/// Key/value credential record. Ordered so the file is stable across writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialRecord(BTreeMap<String, String>);

impl CredentialRecord {
    /// A fresh anonymous-only record.
    pub fn anonymous(client_id: &str) -> Self {
        let mut record = CredentialRecord::default();
        record.insert(CLIENT_ID, client_id);
        record
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn client_id(&self) -> Option<&str> {
        self.get(CLIENT_ID)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.get(ACCESS_TOKEN)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy keeping only the entries accepted by `keep`.
    pub fn filtered(&self, mut keep: impl FnMut(&str) -> bool) -> Self {
        CredentialRecord(
            self.0
                .iter()
                .filter(|(k, _)| keep(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CredentialRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        CredentialRecord(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Single writer of the on-disk credential record.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    client_id: String,
}

impl CredentialStore {
    /// `client_id` seeds the record the first time the file is created.
    pub fn new(path: impl Into<PathBuf>, client_id: impl Into<String>) -> Self {
        CredentialStore {
            path: path.into(),
            client_id: client_id.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted record, creating an anonymous-only one on first run.
    pub fn load(&self) -> Result<CredentialRecord, StorageError> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "initializing credential file");
            let record = CredentialRecord::anonymous(&self.client_id);
            self.save(&record)?;
            return Ok(record);
        }

        let contents = fs::read_to_string(&self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;
        let record: CredentialRecord =
            serde_json::from_str(&contents).map_err(|source| StorageError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), keys = record.len(), "loaded credentials");
        Ok(record)
    }

    /// Replace the persisted record. Writes a sibling temp file and renames
    /// it over the target so a crash never leaves a half-written file.
    pub fn save(&self, record: &CredentialRecord) -> Result<(), StorageError> {
        let io_err = |source: std::io::Error| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let contents = serde_json::to_string_pretty(record).map_err(StorageError::Serialize)?;
        let tmp = self.temp_path();
        fs::write(&tmp, contents).map_err(io_err)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(e));
        }
        debug!(path = %self.path.display(), keys = record.len(), "saved credentials");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
