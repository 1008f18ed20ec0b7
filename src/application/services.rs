use std::sync::Arc;
use tracing::info;

use crate::{
    application::ports::{RecordStorePort, SettingsStorePort},
    domain::{
        errors::{DomainError, DomainResult},
        settings::{
            AiModel, OutputLanguage, StreamQuality, KEY_AI_MODEL, KEY_API_KEY, KEY_OUTPUT_LANGUAGE,
            KEY_VIDEO_QUALITY,
        },
    },
};

/// Preferencias del usuario sobre el almacén cifrado, más el recuento de
/// conversaciones guardadas.
#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn SettingsStorePort>,
    records: Arc<dyn RecordStorePort>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingsStorePort>, records: Arc<dyn RecordStorePort>) -> Self {
        Self { store, records }
    }

    pub fn save_api_key(&self, key: &str) -> DomainResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(DomainError::InvalidInput("la API key no puede estar vacía".into()));
        }
        self.store.set_string(KEY_API_KEY, key)?;
        info!("API key guardada");
        Ok(())
    }

    pub fn api_key(&self) -> Option<String> {
        let key = self.store.get_string(KEY_API_KEY, "");
        (!key.trim().is_empty()).then_some(key)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// `abcd****wxyz`; claves cortas se ocultan enteras.
    pub fn masked_api_key(&self) -> String {
        let Some(key) = self.api_key() else {
            return String::new();
        };
        let chars: Vec<char> = key.chars().collect();
        if chars.len() <= 8 {
            return "****".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}****{tail}")
    }

    pub fn delete_api_key(&self) -> DomainResult<()> {
        self.store.set_string(KEY_API_KEY, "")?;
        info!("API key eliminada");
        Ok(())
    }

    pub fn available_models(&self) -> &'static [AiModel] {
        &AiModel::ALL
    }

    pub fn select_model(&self, model: AiModel) -> DomainResult<()> {
        self.store.set_string(KEY_AI_MODEL, model.id())?;
        info!("Modelo cambiado a {}", model.display_name());
        Ok(())
    }

    pub fn selected_model(&self) -> String {
        self.store.get_string(KEY_AI_MODEL, AiModel::default().id())
    }

    pub fn selected_model_display_name(&self) -> String {
        let id = self.selected_model();
        AiModel::from_id(&id).map(|m| m.display_name().to_string()).unwrap_or(id)
    }

    pub fn available_languages(&self) -> &'static [OutputLanguage] {
        &OutputLanguage::ALL
    }

    pub fn select_language(&self, language: OutputLanguage) -> DomainResult<()> {
        self.store.set_string(KEY_OUTPUT_LANGUAGE, language.code())?;
        info!("Idioma cambiado a {}", language.display_name());
        Ok(())
    }

    pub fn selected_language(&self) -> String {
        self.store.get_string(KEY_OUTPUT_LANGUAGE, OutputLanguage::default().code())
    }

    pub fn selected_language_display_name(&self) -> String {
        let code = self.selected_language();
        OutputLanguage::from_code(&code)
            .map(|l| format!("{} ({})", l.native_name(), l.display_name()))
            .unwrap_or(code)
    }

    pub fn available_qualities(&self) -> &'static [StreamQuality] {
        &StreamQuality::ALL
    }

    pub fn select_quality(&self, quality: StreamQuality) -> DomainResult<()> {
        self.store.set_string(KEY_VIDEO_QUALITY, quality.id())?;
        info!("Calidad de vídeo cambiada a {}", quality.display_name());
        Ok(())
    }

    /// Id tal y como está guardado (puede ser un valor desconocido).
    pub fn selected_quality(&self) -> String {
        self.store.get_string(KEY_VIDEO_QUALITY, StreamQuality::default().id())
    }

    pub fn selected_quality_display_name(&self) -> String {
        let id = self.selected_quality();
        StreamQuality::from_id(&id).map(|q| q.display_name().to_string()).unwrap_or(id)
    }

    pub async fn conversation_count(&self) -> DomainResult<usize> {
        self.records.count().await
    }

    pub async fn delete_all_conversations(&self) -> DomainResult<()> {
        self.records.delete_all().await?;
        info!("Conversaciones eliminadas");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::{MemoryRecordStore, MemorySettingsStore};
    use crate::domain::record::ConversationRecord;

    fn service_with(values: &[(&str, &str)]) -> SettingsService {
        let store = Arc::new(MemorySettingsStore::with_values(values.iter().copied()));
        let records = Arc::new(MemoryRecordStore::with_records(vec![
            ConversationRecord { id: "a".into(), title: "uno".into(), created_at_ms: 1 },
            ConversationRecord { id: "b".into(), title: "dos".into(), created_at_ms: 2 },
        ]));
        SettingsService::new(store, records)
    }

    #[test]
    fn api_key_is_trimmed_and_masked() {
        let svc = service_with(&[]);
        assert_eq!(svc.masked_api_key(), "");
        assert!(!svc.has_api_key());

        assert!(matches!(svc.save_api_key("   "), Err(DomainError::InvalidInput(_))));

        svc.save_api_key("  abcdefghijkl ").unwrap();
        assert_eq!(svc.api_key().as_deref(), Some("abcdefghijkl"));
        assert_eq!(svc.masked_api_key(), "abcd****ijkl");

        svc.save_api_key("short").unwrap();
        assert_eq!(svc.masked_api_key(), "****");

        svc.delete_api_key().unwrap();
        assert!(!svc.has_api_key());
    }

    #[test]
    fn defaults_when_nothing_persisted() {
        let svc = service_with(&[]);
        assert_eq!(svc.selected_model(), "qwen3-omni-flash-realtime");
        assert_eq!(svc.selected_language(), "zh-CN");
        assert_eq!(svc.selected_language_display_name(), "中文 (Chinese)");
        assert_eq!(svc.selected_quality(), "MEDIUM");
    }

    #[test]
    fn unknown_persisted_ids_show_raw_value() {
        let svc = service_with(&[(KEY_AI_MODEL, "custom-model"), (KEY_VIDEO_QUALITY, "ULTRA")]);
        assert_eq!(svc.selected_model_display_name(), "custom-model");
        assert_eq!(svc.selected_quality_display_name(), "ULTRA");
    }

    #[test]
    fn selections_are_persisted() {
        let svc = service_with(&[]);
        svc.select_model(AiModel::StandardRealtime).unwrap();
        svc.select_language(OutputLanguage::Spanish).unwrap();
        svc.select_quality(StreamQuality::High).unwrap();

        assert_eq!(svc.selected_model_display_name(), "Qwen3 Omni Standard (Realtime)");
        assert_eq!(svc.selected_language(), "es-ES");
        assert_eq!(svc.selected_quality(), "HIGH");
    }

    #[tokio::test]
    async fn conversations_can_be_cleared() {
        let svc = service_with(&[]);
        assert_eq!(svc.conversation_count().await.unwrap(), 2);
        svc.delete_all_conversations().await.unwrap();
        assert_eq!(svc.conversation_count().await.unwrap(), 0);
    }
}
