//! Authenticated session and its persistence.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use crate::errors::AppError;
use crate::models::{Company, User};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";
pub const COMPANY_KEY: &str = "company";

/// String key/value persistence for the session.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn remove(&self, key: &str) -> Result<(), AppError>;
}

#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);
        Ok(())
    }
}

/// Stores the keys as one JSON object on disk.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Map<String, Value> {
        let Ok(raw) = fs::read_to_string(&self.path) else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            _ => {
                log::warn!("Ignoring unreadable session file {}", self.path.display());
                Map::new()
            }
        }
    }

    fn write_all(&self, map: &Map<String, Value>) -> Result<(), AppError> {
        if map.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
                _ => Ok(()),
            };
        }
        fs::write(&self.path, serde_json::to_string_pretty(map)?)?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.read_all()
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut map = self.read_all();
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_all(&map)
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut map = self.read_all();
        if map.remove(key).is_some() {
            self.write_all(&map)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: Option<User>,
    /// `None` for administrators, who are not bound to a company.
    pub company: Option<Company>,
}

/// Shared view of the current session, backed by a [`SessionStorage`].
#[derive(Clone)]
pub struct SessionHandle {
    current: Arc<RwLock<Option<AuthSession>>>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionHandle {
    /// Rehydrates whatever session the storage holds.
    pub fn load(storage: Arc<dyn SessionStorage>) -> Self {
        let session = storage.get(TOKEN_KEY).map(|token| AuthSession {
            token,
            user: read_json(storage.as_ref(), USER_KEY),
            company: read_json(storage.as_ref(), COMPANY_KEY),
        });
        if session.is_some() {
            log::debug!("Restored persisted session");
        }

        Self {
            current: Arc::new(RwLock::new(session)),
            storage,
        }
    }

    pub fn in_memory() -> Self {
        Self::load(Arc::new(MemoryStorage::default()))
    }

    pub fn establish(&self, session: AuthSession) -> Result<(), AppError> {
        self.storage.set(TOKEN_KEY, &session.token)?;
        match &session.user {
            Some(user) => self.storage.set(USER_KEY, &serde_json::to_string(user)?)?,
            None => self.storage.remove(USER_KEY)?,
        }
        match &session.company {
            Some(company) => self.storage.set(COMPANY_KEY, &serde_json::to_string(company)?)?,
            None => self.storage.remove(COMPANY_KEY)?,
        }
        *self.write() = Some(session);
        Ok(())
    }

    /// Drops the session from memory and storage. Storage failures are logged
    /// since the in-memory session is gone either way.
    pub fn clear(&self) {
        *self.write() = None;
        for key in [TOKEN_KEY, USER_KEY, COMPANY_KEY] {
            if let Err(err) = self.storage.remove(key) {
                log::error!("Failed to remove '{}' from session storage: {}", key, err);
            }
        }
    }

    pub fn current(&self) -> Option<AuthSession> {
        self.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.read().as_ref().and_then(|s| s.user.clone())
    }

    pub fn company(&self) -> Option<Company> {
        self.read().as_ref().and_then(|s| s.company.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.read()
            .as_ref()
            .and_then(|s| s.user.as_ref())
            .is_some_and(User::is_admin)
    }

    pub fn is_company_user(&self) -> bool {
        self.read()
            .as_ref()
            .is_some_and(|s| s.company.is_some() && !s.user.as_ref().is_some_and(User::is_admin))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<AuthSession>> {
        self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<AuthSession>> {
        self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(storage: &dyn SessionStorage, key: &str) -> Option<T> {
    let raw = storage.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("Discarding persisted '{}': {}", key, err);
            None
        }
    }
}
