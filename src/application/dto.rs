use serde::{Deserialize, Serialize};

use crate::domain::settings::{AiModel, OutputLanguage, StreamQuality};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareStreamingRequest {
    /// Respuesta del usuario si las gafas piden el permiso de cámara.
    pub grant: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRequest {
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectModelRequest {
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectLanguageRequest {
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectQualityRequest {
    pub quality: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub display_name: String,
    pub description: Option<String>,
}

impl From<AiModel> for CatalogEntry {
    fn from(m: AiModel) -> Self {
        Self { id: m.id().into(), display_name: m.display_name().into(), description: None }
    }
}

impl From<OutputLanguage> for CatalogEntry {
    fn from(l: OutputLanguage) -> Self {
        Self {
            id: l.code().into(),
            display_name: format!("{} ({})", l.native_name(), l.display_name()),
            description: None,
        }
    }
}

impl From<StreamQuality> for CatalogEntry {
    fn from(q: StreamQuality) -> Self {
        Self {
            id: q.id().into(),
            display_name: q.display_name().into(),
            description: Some(q.description().into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub has_api_key: bool,
    pub api_key_masked: String,
    pub model: String,
    pub model_display_name: String,
    pub language: String,
    pub language_display_name: String,
    pub quality: String,
    pub quality_display_name: String,
    pub conversation_count: usize,
    pub models: Vec<CatalogEntry>,
    pub languages: Vec<CatalogEntry>,
    pub qualities: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
