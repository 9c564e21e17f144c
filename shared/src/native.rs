//! Adapters that fulfil capability requests on native shells and in tests.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::capabilities::{
    AuthOperation, AuthResult, KeyValueError, KvKey, NullCredentialVerifier, StorageKey,
    StorageTier, MAX_VALUE_SIZE,
};
use crux_kv::{KeyValueOperation, KeyValueResponse, KeyValueResult};

/// Something that can answer the `crux_kv` protocol.
pub trait KvBackend {
    fn handle(&mut self, operation: &KeyValueOperation) -> KeyValueResult;
}

fn into_result(outcome: Result<KeyValueResponse, KeyValueError>) -> KeyValueResult {
    match outcome {
        Ok(response) => KeyValueResult::Ok { response },
        Err(error) => KeyValueResult::Err { error },
    }
}

fn parse_key(raw: &str) -> Result<KvKey, KeyValueError> {
    KvKey::parse(raw).map_err(|e| KeyValueError::Other {
        message: e.to_string(),
    })
}

fn check_size(value: &[u8]) -> Result<(), KeyValueError> {
    if value.len() > MAX_VALUE_SIZE {
        return Err(KeyValueError::Other {
            message: format!(
                "value too large: {} bytes exceeds maximum of {MAX_VALUE_SIZE} bytes",
                value.len()
            ),
        });
    }
    Ok(())
}

/// Raw keys under `prefix`, across both tiers, in a single page.
fn list_page(
    keys: impl Iterator<Item = String>,
    prefix: &str,
    cursor: u64,
) -> Result<KeyValueResponse, KeyValueError> {
    if cursor != 0 {
        return Err(KeyValueError::CursorNotFound);
    }
    let mut keys: Vec<String> = keys.filter(|key| key.starts_with(prefix)).collect();
    keys.sort();
    Ok(KeyValueResponse::ListKeys {
        keys,
        next_cursor: 0,
    })
}

#[derive(Debug, Default)]
struct Area(HashMap<String, Vec<u8>>);

impl Area {
    fn handle(
        &mut self,
        operation: &KeyValueOperation,
        key: &str,
    ) -> Result<KeyValueResponse, KeyValueError> {
        match operation {
            KeyValueOperation::Get { .. } => Ok(KeyValueResponse::Get {
                value: self.0.get(key).cloned().into(),
            }),
            KeyValueOperation::Set { value, .. } => {
                check_size(value)?;
                let previous = self.0.insert(key.to_string(), value.clone());
                Ok(KeyValueResponse::Set {
                    previous: previous.into(),
                })
            }
            KeyValueOperation::Delete { .. } => Ok(KeyValueResponse::Delete {
                previous: self.0.remove(key).into(),
            }),
            KeyValueOperation::Exists { .. } => Ok(KeyValueResponse::Exists {
                is_present: self.0.contains_key(key),
            }),
            KeyValueOperation::ListKeys { .. } => Err(KeyValueError::Other {
                message: "listing is per store, not per tier".to_string(),
            }),
        }
    }

    fn raw_keys(&self, tier: StorageTier) -> impl Iterator<Item = String> + '_ {
        self.0
            .keys()
            .map(move |key| format!("{}:{key}", tier.prefix()))
    }
}

fn operation_key(operation: &KeyValueOperation) -> Option<&str> {
    match operation {
        KeyValueOperation::Get { key }
        | KeyValueOperation::Set { key, .. }
        | KeyValueOperation::Delete { key }
        | KeyValueOperation::Exists { key } => Some(key),
        KeyValueOperation::ListKeys { .. } => None,
    }
}

/// Both tiers in memory. `end_session` drops the session tier the way closing
/// a tab would.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    local: Area,
    session: Area,
}

impl MemoryKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn end_session(&mut self) {
        self.session.0.clear();
    }

    #[must_use]
    pub fn get(&self, tier: StorageTier, key: StorageKey) -> Option<&[u8]> {
        self.area(tier).0.get(key.as_str()).map(Vec::as_slice)
    }

    /// Writes raw bytes, bypassing the size check. Lets tests plant data an
    /// older build might have left behind.
    pub fn put_raw(&mut self, tier: StorageTier, key: StorageKey, value: impl Into<Vec<u8>>) {
        self.area_mut(tier)
            .0
            .insert(key.as_str().to_string(), value.into());
    }

    fn area(&self, tier: StorageTier) -> &Area {
        match tier {
            StorageTier::Local => &self.local,
            StorageTier::Session => &self.session,
        }
    }

    fn area_mut(&mut self, tier: StorageTier) -> &mut Area {
        match tier {
            StorageTier::Local => &mut self.local,
            StorageTier::Session => &mut self.session,
        }
    }

    fn answer(
        &mut self,
        operation: &KeyValueOperation,
    ) -> Result<KeyValueResponse, KeyValueError> {
        if let KeyValueOperation::ListKeys { prefix, cursor } = operation {
            let keys = self
                .local
                .raw_keys(StorageTier::Local)
                .chain(self.session.raw_keys(StorageTier::Session));
            return list_page(keys, prefix, *cursor);
        }
        let raw = operation_key(operation).unwrap_or_default();
        let key = parse_key(raw)?;
        self.area_mut(key.tier()).handle(operation, key.key())
    }
}

impl KvBackend for MemoryKvStore {
    fn handle(&mut self, operation: &KeyValueOperation) -> KeyValueResult {
        into_result(self.answer(operation))
    }
}

/// Local tier in a SQLite database, session tier in memory.
pub struct SqliteKvStore {
    conn: Connection,
    session: Area,
}

impl std::fmt::Debug for SqliteKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteKvStore")
            .field("path", &self.conn.path())
            .finish_non_exhaustive()
    }
}

fn storage_error(e: &rusqlite::Error) -> KeyValueError {
    match e {
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(
                failure.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ) =>
        {
            KeyValueError::Timeout
        }
        _ => KeyValueError::Io {
            message: e.to_string(),
        },
    }
}

impl SqliteKvStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KeyValueError> {
        let conn = Connection::open(path.as_ref()).map_err(|e| storage_error(&e))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, KeyValueError> {
        let conn = Connection::open_in_memory().map_err(|e| storage_error(&e))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, KeyValueError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY NOT NULL,
                value BLOB NOT NULL
            );",
        )
        .map_err(|e| storage_error(&e))?;
        debug!(path = ?conn.path(), "opened local storage");
        Ok(Self {
            conn,
            session: Area::default(),
        })
    }

    pub fn end_session(&mut self) {
        self.session.0.clear();
    }

    fn read_local(&self, key: &str) -> Result<Option<Vec<u8>>, KeyValueError> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()
            .map_err(|e| storage_error(&e))
    }

    fn handle_local(
        &self,
        operation: &KeyValueOperation,
        key: &str,
    ) -> Result<KeyValueResponse, KeyValueError> {
        match operation {
            KeyValueOperation::Get { .. } => Ok(KeyValueResponse::Get {
                value: self.read_local(key)?.into(),
            }),
            KeyValueOperation::Set { value, .. } => {
                check_size(value)?;
                let previous = self.read_local(key)?;
                self.conn
                    .execute(
                        "INSERT INTO kv (key, value) VALUES (?1, ?2)
                         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                        params![key, value],
                    )
                    .map_err(|e| storage_error(&e))?;
                Ok(KeyValueResponse::Set {
                    previous: previous.into(),
                })
            }
            KeyValueOperation::Delete { .. } => {
                let previous = self.read_local(key)?;
                self.conn
                    .execute("DELETE FROM kv WHERE key = ?1", params![key])
                    .map_err(|e| storage_error(&e))?;
                Ok(KeyValueResponse::Delete {
                    previous: previous.into(),
                })
            }
            KeyValueOperation::Exists { .. } => Ok(KeyValueResponse::Exists {
                is_present: self.read_local(key)?.is_some(),
            }),
            KeyValueOperation::ListKeys { .. } => Err(KeyValueError::Other {
                message: "listing is per store, not per tier".to_string(),
            }),
        }
    }

    fn local_keys(&self) -> Result<Vec<String>, KeyValueError> {
        let mut statement = self
            .conn
            .prepare("SELECT key FROM kv")
            .map_err(|e| storage_error(&e))?;
        let keys = statement
            .query_map([], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| storage_error(&e))?;
        Ok(keys
            .into_iter()
            .map(|key| format!("{}:{key}", StorageTier::Local.prefix()))
            .collect())
    }

    fn answer(
        &mut self,
        operation: &KeyValueOperation,
    ) -> Result<KeyValueResponse, KeyValueError> {
        if let KeyValueOperation::ListKeys { prefix, cursor } = operation {
            let local = self.local_keys()?;
            let keys = local
                .into_iter()
                .chain(self.session.raw_keys(StorageTier::Session));
            return list_page(keys, prefix, *cursor);
        }
        let raw = operation_key(operation).unwrap_or_default();
        let key = parse_key(raw)?;
        match key.tier() {
            StorageTier::Local => self.handle_local(operation, key.key()),
            StorageTier::Session => self.session.handle(operation, key.key()),
        }
    }
}

impl KvBackend for SqliteKvStore {
    fn handle(&mut self, operation: &KeyValueOperation) -> KeyValueResult {
        let outcome = self.answer(operation);
        if let Err(e) = &outcome {
            warn!(key = operation_key(operation).unwrap_or("*"), error = %e, "storage operation failed");
        }
        into_result(outcome)
    }
}

impl NullCredentialVerifier {
    /// Accepts after the configured delay, so the sign-in spinner is visible.
    pub async fn verify_after_delay(&self, operation: &AuthOperation) -> AuthResult {
        tokio::time::sleep(self.delay()).await;
        self.verify(operation)
    }
}
