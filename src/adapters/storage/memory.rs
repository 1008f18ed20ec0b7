use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::application::ports::{RecordStorePort, SettingsStorePort};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::record::ConversationRecord;

/// Ajustes en memoria: para tests y para arrancar sin disco.
#[derive(Default)]
pub struct MemorySettingsStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<'a>(values: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let values = values.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Self { values: RwLock::new(values) }
    }
}

impl SettingsStorePort for MemorySettingsStore {
    fn get_string(&self, key: &str, default: &str) -> String {
        self.values
            .read()
            .ok()
            .and_then(|values| values.get(key).cloned())
            .unwrap_or_else(|| default.to_string())
    }

    fn set_string(&self, key: &str, value: &str) -> DomainResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| DomainError::OperationFailed("Lock de ajustes fallido".into()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<ConversationRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<ConversationRecord>) -> Self {
        Self { records: RwLock::new(records) }
    }
}

fn poisoned() -> DomainError {
    DomainError::OperationFailed("Lock de conversaciones fallido".into())
}

#[async_trait]
impl RecordStorePort for MemoryRecordStore {
    async fn count(&self) -> DomainResult<usize> {
        Ok(self.records.read().map_err(|_| poisoned())?.len())
    }

    async fn list(&self) -> DomainResult<Vec<ConversationRecord>> {
        Ok(self.records.read().map_err(|_| poisoned())?.clone())
    }

    async fn delete(&self, id: &str) -> DomainResult<bool> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }

    async fn delete_all(&self) -> DomainResult<()> {
        self.records.write().map_err(|_| poisoned())?.clear();
        Ok(())
    }
}
