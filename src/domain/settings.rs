use serde::{Deserialize, Serialize};

pub const KEY_API_KEY: &str = "qwen_api_key";
pub const KEY_AI_MODEL: &str = "ai_model";
pub const KEY_OUTPUT_LANGUAGE: &str = "output_language";
pub const KEY_VIDEO_QUALITY: &str = "video_quality";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AiModel {
    FlashRealtime,
    StandardRealtime,
}

impl AiModel {
    pub const ALL: [AiModel; 2] = [AiModel::FlashRealtime, AiModel::StandardRealtime];

    pub fn id(&self) -> &'static str {
        match self {
            AiModel::FlashRealtime => "qwen3-omni-flash-realtime",
            AiModel::StandardRealtime => "qwen3-omni-standard-realtime",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AiModel::FlashRealtime => "Qwen3 Omni Flash (Realtime)",
            AiModel::StandardRealtime => "Qwen3 Omni Standard (Realtime)",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }
}

impl Default for AiModel {
    fn default() -> Self {
        AiModel::FlashRealtime
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputLanguage {
    Chinese,
    English,
    Japanese,
    Korean,
    Spanish,
    French,
}

impl OutputLanguage {
    pub const ALL: [OutputLanguage; 6] = [
        OutputLanguage::Chinese,
        OutputLanguage::English,
        OutputLanguage::Japanese,
        OutputLanguage::Korean,
        OutputLanguage::Spanish,
        OutputLanguage::French,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            OutputLanguage::Chinese => "zh-CN",
            OutputLanguage::English => "en-US",
            OutputLanguage::Japanese => "ja-JP",
            OutputLanguage::Korean => "ko-KR",
            OutputLanguage::Spanish => "es-ES",
            OutputLanguage::French => "fr-FR",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OutputLanguage::Chinese => "Chinese",
            OutputLanguage::English => "English",
            OutputLanguage::Japanese => "Japanese",
            OutputLanguage::Korean => "Korean",
            OutputLanguage::Spanish => "Spanish",
            OutputLanguage::French => "French",
        }
    }

    pub fn native_name(&self) -> &'static str {
        match self {
            OutputLanguage::Chinese => "中文",
            OutputLanguage::English => "English",
            OutputLanguage::Japanese => "日本語",
            OutputLanguage::Korean => "한국어",
            OutputLanguage::Spanish => "Español",
            OutputLanguage::French => "Français",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.code() == code)
    }
}

impl Default for OutputLanguage {
    fn default() -> Self {
        OutputLanguage::Chinese
    }
}

/// Calidad de vídeo pedida a las gafas al abrir la sesión.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StreamQuality {
    Low,
    Medium,
    High,
}

impl StreamQuality {
    pub const ALL: [StreamQuality; 3] = [StreamQuality::Low, StreamQuality::Medium, StreamQuality::High];

    pub fn id(&self) -> &'static str {
        match self {
            StreamQuality::Low => "LOW",
            StreamQuality::Medium => "MEDIUM",
            StreamQuality::High => "HIGH",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StreamQuality::Low => "Low",
            StreamQuality::Medium => "Medium",
            StreamQuality::High => "High",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StreamQuality::Low => "Ahorro de batería, para sesiones largas",
            StreamQuality::Medium => "Equilibrado (recomendado)",
            StreamQuality::High => "Máxima calidad, mayor consumo",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|q| q.id() == id)
    }

    /// Valores persistidos desconocidos caen en la calidad por defecto.
    pub fn from_persisted(id: &str) -> Self {
        Self::from_id(id).unwrap_or_default()
    }
}

impl Default for StreamQuality {
    fn default() -> Self {
        StreamQuality::Medium
    }
}
