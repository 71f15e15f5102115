use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;

/// Single-slot cache for the auth token.
///
/// Holds zero or one tokens; a write always fully replaces any prior value.
/// The mediator never clears the slot on its own; `clear` exists for the
/// sign-out collaborator. Handlers receive the store by injection so they can
/// be exercised without a real storage sandbox.
pub trait TokenStore: Send + Sync {
    /// Read the current token, if any. An empty stored value reads as absent.
    fn load(&self) -> Option<String>;

    /// Replace the stored token. Last write wins; no merge.
    fn save(&self, token: &str) -> Result<()>;

    /// Remove the stored token.
    fn clear(&self) -> Result<()>;
}

#[derive(Serialize, Deserialize)]
struct TokenSlot {
    token: String,
}

/// Token persisted as a one-key JSON file under the config directory.
///
/// No concurrency control: a racing writer is tolerated because the value is
/// idempotent and every reader tolerates stale-or-absent by failing the
/// current operation.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location: `<config dir>/tradebridge/token.json`.
    pub fn default_path() -> PathBuf {
        crate::config::BridgeConfig::config_dir().join("token.json")
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let slot: TokenSlot = serde_json::from_str(&content).ok()?;
        if slot.token.is_empty() {
            None
        } else {
            Some(slot.token)
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow!("Failed to create token directory: {}", e))?;
        }
        let json = serde_json::to_string_pretty(&TokenSlot {
            token: token.to_string(),
        })?;
        std::fs::write(&self.path, json)
            .map_err(|e| anyhow!("Failed to write token file: {}", e))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .map_err(|e| anyhow!("Failed to remove token file: {}", e))?;
        }
        Ok(())
    }
}

/// In-process store for tests and embedding.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            slot: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.slot
            .lock()
            .ok()?
            .clone()
            .filter(|t| !t.is_empty())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self
            .slot
            .lock()
            .map_err(|_| anyhow!("Token slot poisoned"))? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self
            .slot
            .lock()
            .map_err(|_| anyhow!("Token slot poisoned"))? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, FileTokenStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token.json"));
        (dir, store)
    }

    #[test]
    fn load_without_file_returns_none() {
        let (_dir, store) = temp_store();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn save_then_load_roundtrip() {
        let (_dir, store) = temp_store();
        store.save("tok-abc").unwrap();
        assert_eq!(store.load().as_deref(), Some("tok-abc"));
    }

    #[test]
    fn last_write_wins() {
        let (_dir, store) = temp_store();
        store.save("token-a").unwrap();
        store.save("token-b").unwrap();
        // Full replacement: B, never A, never a merge.
        assert_eq!(store.load().as_deref(), Some("token-b"));
    }

    #[test]
    fn clear_removes_token() {
        let (_dir, store) = temp_store();
        store.save("tok").unwrap();
        store.clear().unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn clear_without_file_is_ok() {
        let (_dir, store) = temp_store();
        store.clear().unwrap();
    }

    #[test]
    fn empty_token_reads_as_absent() {
        let (_dir, store) = temp_store();
        store.save("").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FileTokenStore::new(path);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn memory_store_last_write_wins() {
        let store = MemoryTokenStore::new();
        store.save("a").unwrap();
        store.save("b").unwrap();
        assert_eq!(store.load().as_deref(), Some("b"));
        store.clear().unwrap();
        assert_eq!(store.load(), None);
    }
}
