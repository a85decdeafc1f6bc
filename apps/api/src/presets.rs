//! Preset store — named settings blobs persisted as one flat JSON file.
//!
//! Presets are opaque to the core: whatever settings object the client sends
//! is stored verbatim and handed back. The file is rewritten whole on every
//! mutation; at this size (a handful of presets) that is simpler and safer
//! than incremental writes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;

/// One saved preset: the client's settings blob plus bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub settings: Value,
    pub saved_at: DateTime<Utc>,
}

/// File-backed preset store. All access goes through the lock; the file is
/// only touched inside it, so readers never observe a partial write.
pub struct PresetStore {
    path: PathBuf,
    presets: RwLock<BTreeMap<String, Preset>>,
}

impl PresetStore {
    /// Loads the store from `path`. A missing file is an empty store; an
    /// unreadable or corrupt file is logged and treated as empty rather than
    /// failing startup.
    pub async fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let presets = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, Preset>>(&contents) {
                Ok(map) => map,
                Err(e) => {
                    warn!("preset file {} unreadable ({e}), starting empty", path.display());
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        PresetStore {
            path,
            presets: RwLock::new(presets),
        }
    }

    pub async fn list(&self) -> Vec<Preset> {
        self.presets.read().await.values().cloned().collect()
    }

    pub async fn get(&self, name: &str) -> Option<Preset> {
        self.presets.read().await.get(name).cloned()
    }

    /// Inserts or replaces a preset and persists the file.
    pub async fn put(&self, name: String, settings: Value) -> Result<Preset> {
        let preset = Preset {
            name: name.clone(),
            settings,
            saved_at: Utc::now(),
        };
        let mut presets = self.presets.write().await;
        presets.insert(name, preset.clone());
        self.flush(&presets).await?;
        Ok(preset)
    }

    /// Removes a preset. Returns false when the name was unknown.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let mut presets = self.presets.write().await;
        if presets.remove(name).is_none() {
            return Ok(false);
        }
        self.flush(&presets).await?;
        Ok(true)
    }

    async fn flush(&self, presets: &BTreeMap<String, Preset>) -> Result<()> {
        let contents = serde_json::to_string_pretty(presets)
            .context("Failed to serialize presets")?;
        tokio::fs::write(&self.path, contents)
            .await
            .with_context(|| format!("Failed to write preset file {}", self.path.display()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scratch_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("presets.json")
    }

    #[tokio::test]
    async fn test_missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::open(scratch_path(&dir)).await;
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_put_get_roundtrip_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch_path(&dir);

        let store = PresetStore::open(&path).await;
        store
            .put("morning-drill".to_string(), json!({"digits": 2, "page_count": 3}))
            .await
            .unwrap();

        let reopened = PresetStore::open(&path).await;
        let preset = reopened.get("morning-drill").await.expect("persisted");
        assert_eq!(preset.settings["digits"], 2);
    }

    #[tokio::test]
    async fn test_put_replaces_existing_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::open(scratch_path(&dir)).await;
        store.put("a".to_string(), json!({"v": 1})).await.unwrap();
        store.put("a".to_string(), json!({"v": 2})).await.unwrap();
        assert_eq!(store.list().await.len(), 1);
        assert_eq!(store.get("a").await.unwrap().settings["v"], 2);
    }

    #[tokio::test]
    async fn test_delete_reports_unknown_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::open(scratch_path(&dir)).await;
        store.put("a".to_string(), json!({})).await.unwrap();
        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch_path(&dir);
        tokio::fs::write(&path, "not json").await.unwrap();
        let store = PresetStore::open(&path).await;
        assert!(store.list().await.is_empty());
    }
}
