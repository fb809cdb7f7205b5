//! Sealed session tokens.
//!
//! A token is the AES-256-GCM encryption of the JSON [`SessionClaims`],
//! written as `iv:tag:ciphertext` in hex. Only holders of the session key can
//! mint or read one, so no server-side session table is needed.

use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::capability::Role;
use super::AuthError;

const KEY_FILE: &str = ".session_key";

/// 32-byte AES key for sealing session tokens.
#[derive(Clone)]
pub struct SessionKey([u8; 32]);

impl SessionKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn from_hex(raw: &str) -> anyhow::Result<Self> {
        let bytes = hex::decode(raw.trim())?;
        let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            anyhow::anyhow!(
                "session key must be 64 hex characters (32 bytes), got {} bytes",
                bytes.len()
            )
        })?;
        Ok(Self(key))
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// Load the session key from `SESSION_KEY`, or from `{data_dir}/.session_key`,
/// generating that file on first start.
pub fn load_or_generate_key(config: &flightdeck_core::config::AuthConfig) -> anyhow::Result<SessionKey> {
    if let Some(env_key) = &config.session_key {
        info!("Using session key from SESSION_KEY env var");
        return SessionKey::from_hex(env_key);
    }
    load_or_generate_key_file(&config.data_dir)
}

fn load_or_generate_key_file(data_dir: &Path) -> anyhow::Result<SessionKey> {
    let key_path = data_dir.join(KEY_FILE);
    if key_path.exists() {
        let hex_key = std::fs::read_to_string(&key_path)?;
        let key = SessionKey::from_hex(&hex_key)
            .map_err(|e| anyhow::anyhow!("invalid key file at {}: {}", key_path.display(), e))?;
        info!("Loaded session key from {}", key_path.display());
        return Ok(key);
    }

    let key = SessionKey::generate();
    std::fs::create_dir_all(data_dir)?;
    std::fs::write(&key_path, hex::encode(key.0))?;
    info!("Generated new session key at {}", key_path.display());
    Ok(key)
}

/// What a session token asserts about its holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: DateTime<Utc>,
}

impl SessionClaims {
    pub fn new(sub: Uuid, role: Role, ttl: Duration) -> Self {
        Self {
            sub,
            role,
            exp: Utc::now() + ttl,
        }
    }
}

/// Encrypt `claims` into a token.
pub fn seal(key: &SessionKey, claims: &SessionClaims) -> Result<String, AuthError> {
    let plaintext = serde_json::to_vec(claims).map_err(|e| AuthError::Seal(e.to_string()))?;

    let mut iv_bytes = [0u8; 12];
    OsRng.fill_bytes(&mut iv_bytes);
    let nonce = Nonce::from_slice(&iv_bytes);

    let ciphertext = key
        .cipher()
        .encrypt(nonce, plaintext.as_ref())
        .map_err(|e| AuthError::Seal(e.to_string()))?;

    // AES-GCM appends the 16-byte tag to the ciphertext.
    let (ct, tag) = ciphertext.split_at(ciphertext.len() - 16);
    Ok(format!("{}:{}:{}", hex::encode(iv_bytes), hex::encode(tag), hex::encode(ct)))
}

/// Decrypt and check a token. Expired tokens are rejected.
pub fn open(key: &SessionKey, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
    let mut parts = token.trim().splitn(3, ':');
    let (Some(iv), Some(tag), Some(ct)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AuthError::Malformed);
    };

    let iv_bytes = hex::decode(iv).map_err(|_| AuthError::Malformed)?;
    let tag_bytes = hex::decode(tag).map_err(|_| AuthError::Malformed)?;
    let mut combined = hex::decode(ct).map_err(|_| AuthError::Malformed)?;
    if iv_bytes.len() != 12 || tag_bytes.len() != 16 {
        return Err(AuthError::Malformed);
    }
    combined.extend_from_slice(&tag_bytes);

    let plaintext = key
        .cipher()
        .decrypt(Nonce::from_slice(&iv_bytes), combined.as_ref())
        .map_err(|_| AuthError::Tampered)?;
    let claims: SessionClaims = serde_json::from_slice(&plaintext).map_err(|_| AuthError::Malformed)?;

    if claims.exp <= now {
        return Err(AuthError::Expired);
    }
    Ok(claims)
}
