use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::{debug, warn};

use crate::error::Result;
use crate::session::SessionTokens;

pub const ACCESS_TOKEN_KEY: &str = "nutritrack.access_token";
pub const REFRESH_TOKEN_KEY: &str = "nutritrack.refresh_token";

/// Where the session tokens live between requests. Last write wins.
pub trait TokenStore: Send + Sync + Debug {
    fn access_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
    fn set_tokens(&self, tokens: &SessionTokens);
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<Option<SessionTokens>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: SessionTokens) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        tokens.as_ref().map(|t| t.access_token.clone())
    }

    fn refresh_token(&self) -> Option<String> {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        tokens.as_ref().and_then(|t| t.refresh_token.clone())
    }

    fn set_tokens(&self, tokens: &SessionTokens) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens.clone());
    }

    fn clear(&self) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Key-value JSON file holding the two token keys.
///
/// Storage is best effort: an unreadable file reads as empty and failed writes
/// are logged, never surfaced to the request that triggered them.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> BTreeMap<String, String> {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return BTreeMap::new();
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "ignoring unreadable token file");
            BTreeMap::new()
        })
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        self.read_entries().remove(key).filter(|v| !v.is_empty())
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_entries();
        f(&mut entries);
        if let Err(e) = self.write_entries(&entries) {
            warn!(path = %self.path.display(), error = %e, "failed to persist tokens");
        }
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Option<String> {
        self.get(ACCESS_TOKEN_KEY)
    }

    fn refresh_token(&self) -> Option<String> {
        self.get(REFRESH_TOKEN_KEY)
    }

    fn set_tokens(&self, tokens: &SessionTokens) {
        self.update(|entries| {
            entries.insert(ACCESS_TOKEN_KEY.to_string(), tokens.access_token.clone());
            match &tokens.refresh_token {
                Some(refresh) => {
                    entries.insert(REFRESH_TOKEN_KEY.to_string(), refresh.clone());
                }
                None => {
                    entries.remove(REFRESH_TOKEN_KEY);
                }
            }
        });
        debug!(path = %self.path.display(), "stored session tokens");
    }

    fn clear(&self) {
        self.update(|entries| {
            entries.remove(ACCESS_TOKEN_KEY);
            entries.remove(REFRESH_TOKEN_KEY);
        });
        debug!(path = %self.path.display(), "cleared session tokens");
    }
}
