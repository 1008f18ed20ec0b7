use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

use crate::application::ports::SettingsStorePort;
use crate::domain::errors::{DomainError, DomainResult};

/// Ajustes persistidos en un JSON plano `{clave: valor}`.
/// Cada escritura reescribe el fichero completo vía temporal + rename.
pub struct JsonFileSettingsStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl JsonFileSettingsStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("leyendo ajustes de {}", path.display()))?;
            serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ajustes ilegibles en {} ({}), se empieza de cero", path.display(), e);
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };

        debug!("Ajustes cargados de {} ({} claves)", path.display(), values.len());
        Ok(Self { path, values: RwLock::new(values) })
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SettingsStorePort for JsonFileSettingsStore {
    fn get_string(&self, key: &str, default: &str) -> String {
        match self.values.read() {
            Ok(values) => values.get(key).cloned().unwrap_or_else(|| default.to_string()),
            Err(_) => default.to_string(),
        }
    }

    fn set_string(&self, key: &str, value: &str) -> DomainResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| DomainError::OperationFailed("Lock de ajustes fallido".into()))?;
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
            .map_err(|e| DomainError::OperationFailed(format!("Error guardando ajustes: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let store = JsonFileSettingsStore::open(&path).unwrap();
        assert_eq!(store.get_string("video_quality", "MEDIUM"), "MEDIUM");
        store.set_string("video_quality", "HIGH").unwrap();
        drop(store);

        let reopened = JsonFileSettingsStore::open(&path).unwrap();
        assert_eq!(reopened.get_string("video_quality", "MEDIUM"), "HIGH");
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        let store = JsonFileSettingsStore::open(&path).unwrap();
        assert_eq!(store.get_string("ai_model", "fallback"), "fallback");
        store.set_string("ai_model", "x").unwrap();
        assert_eq!(JsonFileSettingsStore::open(&path).unwrap().get_string("ai_model", ""), "x");
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/dir/settings.json");
        let store = JsonFileSettingsStore::open(&path).unwrap();
        store.set_string("output_language", "en-US").unwrap();
        assert!(path.exists());
    }
}
