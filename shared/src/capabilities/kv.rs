use crux_kv::error::KeyValueError;
use crux_kv::KeyValue;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::marker::PhantomData;
use thiserror::Error;

pub const MAX_KEY_LENGTH: usize = 512;
pub const MAX_VALUE_SIZE: usize = 5 * 1024 * 1024;

/// What every `crux_kv` call reports back: the stored bytes for a read, the
/// previous bytes for a write or delete.
pub type KvResult = Result<Option<Vec<u8>>, KeyValueError>;

/// Which browser-style storage area a value lives in. Carried as the
/// namespace prefix of the raw `crux_kv` key.
///
/// `Local` survives restarts. `Session` is cleared by the shell when the
/// session ends (tab closed, app process killed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageTier {
    Local,
    Session,
}

impl StorageTier {
    pub const ALL: [Self; 2] = [Self::Local, Self::Session];

    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Session => "session",
        }
    }

    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Local => Self::Session,
            Self::Session => Self::Local,
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.prefix() == prefix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKey {
    User,
    Language,
    Notes,
}

impl StorageKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "agroai_user",
            Self::Language => "agroai_lang",
            Self::Notes => "agroai_notes",
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tier-qualified key. `raw()` is what crosses to the shell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KvKey {
    tier: StorageTier,
    key: String,
}

impl KvKey {
    pub fn new(tier: StorageTier, key: impl Into<String>) -> Result<Self, KvError> {
        let key = key.into();
        Self::validate_key(&key)?;
        Ok(Self { tier, key })
    }

    #[must_use]
    pub fn slot(tier: StorageTier, key: StorageKey) -> Self {
        Self {
            tier,
            key: key.as_str().to_string(),
        }
    }

    /// Splits a raw `tier:key` string as sent by the core.
    pub fn parse(raw: &str) -> Result<Self, KvError> {
        let Some((prefix, key)) = raw.split_once(':') else {
            return Err(KvError::InvalidKey {
                key: raw.to_string(),
                reason: "key has no storage tier prefix".to_string(),
            });
        };
        let tier = StorageTier::from_prefix(prefix).ok_or_else(|| KvError::InvalidKey {
            key: raw.to_string(),
            reason: format!("unknown storage tier '{prefix}'"),
        })?;
        Self::new(tier, key)
    }

    #[must_use]
    pub fn raw(&self) -> String {
        format!("{}:{}", self.tier.prefix(), self.key)
    }

    #[must_use]
    pub const fn tier(&self) -> StorageTier {
        self.tier
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    fn validate_key(key: &str) -> Result<(), KvError> {
        if key.trim().is_empty() {
            return Err(KvError::InvalidKey {
                key: key.to_string(),
                reason: "key cannot be empty".to_string(),
            });
        }

        if key.len() > MAX_KEY_LENGTH {
            return Err(KvError::InvalidKey {
                key: key.chars().take(50).collect::<String>() + "...",
                reason: format!("key exceeds maximum length of {MAX_KEY_LENGTH} bytes"),
            });
        }

        if key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
            return Err(KvError::InvalidKey {
                key: key.to_string(),
                reason: "key cannot contain path sequences".to_string(),
            });
        }

        if key.chars().any(char::is_control) {
            return Err(KvError::InvalidKey {
                key: key.replace('\0', "\\0"),
                reason: "key contains control characters".to_string(),
            });
        }

        Ok(())
    }
}

/// A storage request the core issues through `crux_kv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvOperation {
    Get { key: KvKey },
    Set { key: KvKey, value: Vec<u8> },
    Delete { key: KvKey },
}

impl KvOperation {
    #[must_use]
    pub fn get(tier: StorageTier, key: StorageKey) -> Self {
        Self::Get {
            key: KvKey::slot(tier, key),
        }
    }

    pub fn set(tier: StorageTier, key: StorageKey, value: Vec<u8>) -> Result<Self, KvError> {
        if value.len() > MAX_VALUE_SIZE {
            return Err(KvError::ValueTooLarge {
                size: value.len(),
                max: MAX_VALUE_SIZE,
            });
        }
        Ok(Self::Set {
            key: KvKey::slot(tier, key),
            value,
        })
    }

    #[must_use]
    pub fn delete(tier: StorageTier, key: StorageKey) -> Self {
        Self::Delete {
            key: KvKey::slot(tier, key),
        }
    }

    #[must_use]
    pub fn key(&self) -> &KvKey {
        match self {
            Self::Get { key } | Self::Set { key, .. } | Self::Delete { key } => key,
        }
    }

    /// Hands the operation to the `crux_kv` capability.
    pub fn dispatch<Ev, F>(self, kv: &KeyValue<Ev>, make_event: F)
    where
        Ev: 'static,
        F: FnOnce(KvResult) -> Ev + Send + Sync + 'static,
    {
        match self {
            Self::Get { key } => kv.get(key.raw(), make_event),
            Self::Set { key, value } => kv.set(key.raw(), value, make_event),
            Self::Delete { key } => kv.delete(key.raw(), make_event),
        }
    }
}

/// Failures the core detects before anything reaches the shell. Storage
/// failures themselves arrive as `KeyValueError`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum KvError {
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("value too large: {size} bytes exceeds maximum of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },

    #[error("serialization error for {key}: {message}")]
    Serialization { key: String, message: String },
}

/// How a read of a typed slot turned out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue<T> {
    Found(T),
    /// Nothing stored under the key.
    Absent,
    /// The read failed or the bytes did not decode. The stored data may
    /// still be intact.
    Unreadable,
}

impl<T> StoredValue<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Absent | Self::Unreadable => None,
        }
    }
}

/// A key bound to the type stored under it, so encode and decode cannot drift.
#[derive(Debug, Clone, Copy)]
pub struct TypedSlot<T> {
    key: StorageKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedSlot<T>
where
    T: Serialize + DeserializeOwned,
{
    #[must_use]
    pub const fn new(key: StorageKey) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn key(&self) -> StorageKey {
        self.key
    }

    pub fn encode(&self, value: &T) -> Result<Vec<u8>, KvError> {
        let data = serde_json::to_vec(value).map_err(|e| KvError::Serialization {
            key: self.key.to_string(),
            message: e.to_string(),
        })?;
        if data.len() > MAX_VALUE_SIZE {
            return Err(KvError::ValueTooLarge {
                size: data.len(),
                max: MAX_VALUE_SIZE,
            });
        }
        Ok(data)
    }

    pub fn decode(&self, data: &[u8]) -> Result<T, KvError> {
        serde_json::from_slice(data).map_err(|e| KvError::Serialization {
            key: self.key.to_string(),
            message: e.to_string(),
        })
    }

    /// Write operation for `value` in `tier`.
    pub fn set(&self, tier: StorageTier, value: &T) -> Result<KvOperation, KvError> {
        KvOperation::set(tier, self.key, self.encode(value)?)
    }

    /// Classifies a read, logging why a value could not be used.
    pub fn read(&self, result: KvResult) -> StoredValue<T> {
        match result {
            Ok(Some(data)) => match self.decode(&data) {
                Ok(value) => StoredValue::Found(value),
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "stored value does not decode");
                    StoredValue::Unreadable
                }
            },
            Ok(None) => StoredValue::Absent,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "storage read failed");
                StoredValue::Unreadable
            }
        }
    }
}
