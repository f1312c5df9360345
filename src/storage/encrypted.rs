//! SQLite-backed baseline store. Rows are keyed by the SHA-256 of the user id
//! and the baseline JSON is sealed with AES-256-GCM.
//! Key derived from a device-bound secret (in production: Secure Enclave / Keystore).

use super::BaselineStore;
use crate::baseline::UserBaseline;
use crate::error::StorageError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

fn derive_key(seed: &[u8]) -> [u8; KEY_LEN] {
    use ring::digest;
    let mut out = [0u8; KEY_LEN];
    let h = digest::digest(&digest::SHA256, seed);
    out[..h.as_ref().len().min(KEY_LEN)].copy_from_slice(h.as_ref());
    out
}

fn user_key(user_id: &str) -> String {
    format!("{:x}", Sha256::digest(user_id.as_bytes()))
}

fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<String, StorageError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| StorageError::Crypto(e.to_string()))?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt((&nonce).into(), plaintext)
        .map_err(|e| StorageError::Crypto(e.to_string()))?;
    let mut out = nonce.to_vec();
    out.extend(ciphertext);
    Ok(BASE64.encode(&out))
}

fn decrypt(key: &[u8; KEY_LEN], encoded: &str) -> Result<Vec<u8>, StorageError> {
    let raw = BASE64
        .decode(encoded)
        .map_err(|e| StorageError::Crypto(e.to_string()))?;
    if raw.len() < NONCE_LEN {
        return Err(StorageError::Crypto("payload too short".into()));
    }
    let (nonce, ct) = raw.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| StorageError::Crypto(e.to_string()))?;
    cipher
        .decrypt(nonce.into(), ct)
        .map_err(|e| StorageError::Crypto(e.to_string()))
}

struct Sealed {
    conn: Mutex<Connection>,
    key: [u8; KEY_LEN],
}

/// The async [`BaselineStore`] methods run on Tokio's blocking pool; the
/// `*_blocking` methods are for callers outside a runtime.
pub struct SecureStore {
    inner: Arc<Sealed>,
}

impl SecureStore {
    /// Open or create the DB at `path`.
    pub fn open(path: &Path, secret: &[u8]) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS baselines (
                user_key TEXT PRIMARY KEY,
                updated_at INTEGER NOT NULL,
                sample_count INTEGER NOT NULL,
                payload_enc TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_baselines_updated ON baselines(updated_at);
            "#,
        )?;
        Ok(Self {
            inner: Arc::new(Sealed {
                conn: Mutex::new(conn),
                key: derive_key(secret),
            }),
        })
    }

    pub fn load_blocking(&self, user_id: &str) -> Result<Option<UserBaseline>, StorageError> {
        self.inner.load(user_id)
    }

    pub fn save_blocking(&self, user_id: &str, baseline: &UserBaseline) -> Result<(), StorageError> {
        self.inner.save(user_id, baseline)
    }

    pub fn remove_blocking(&self, user_id: &str) -> Result<(), StorageError> {
        self.inner.remove(user_id)
    }

    /// Retention: drop baselines not updated since `ts_millis`.
    pub fn prune_before(&self, ts_millis: i64) -> Result<u64, StorageError> {
        let n = self.inner.conn()?.execute(
            "DELETE FROM baselines WHERE updated_at < ?1",
            params![ts_millis],
        )?;
        Ok(n as u64)
    }

    async fn off_runtime<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Sealed) -> Result<T, StorageError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

impl Sealed {
    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    fn load(&self, user_id: &str) -> Result<Option<UserBaseline>, StorageError> {
        let enc: Option<String> = self
            .conn()?
            .query_row(
                "SELECT payload_enc FROM baselines WHERE user_key = ?1",
                params![user_key(user_id)],
                |row| row.get(0),
            )
            .optional()?;
        match enc {
            Some(enc) => {
                let plain = decrypt(&self.key, &enc)?;
                Ok(Some(serde_json::from_slice(&plain)?))
            }
            None => Ok(None),
        }
    }

    fn save(&self, user_id: &str, baseline: &UserBaseline) -> Result<(), StorageError> {
        let payload = serde_json::to_vec(baseline)?;
        let enc = encrypt(&self.key, &payload)?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO baselines (user_key, updated_at, sample_count, payload_enc) VALUES (?1, ?2, ?3, ?4)",
            params![
                user_key(user_id),
                baseline.last_updated.timestamp_millis(),
                baseline.sample_count as i64,
                enc
            ],
        )?;
        Ok(())
    }

    fn remove(&self, user_id: &str) -> Result<(), StorageError> {
        self.conn()?.execute(
            "DELETE FROM baselines WHERE user_key = ?1",
            params![user_key(user_id)],
        )?;
        Ok(())
    }
}

#[async_trait]
impl BaselineStore for SecureStore {
    async fn load(&self, user_id: &str) -> Result<Option<UserBaseline>, StorageError> {
        let user_id = user_id.to_string();
        self.off_runtime(move |s| s.load(&user_id)).await
    }

    async fn save(&self, user_id: &str, baseline: &UserBaseline) -> Result<(), StorageError> {
        let user_id = user_id.to_string();
        let baseline = baseline.clone();
        self.off_runtime(move |s| s.save(&user_id, &baseline)).await
    }

    async fn remove(&self, user_id: &str) -> Result<(), StorageError> {
        let user_id = user_id.to_string();
        self.off_runtime(move |s| s.remove(&user_id)).await
    }
}
