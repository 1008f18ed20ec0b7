use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StreamState {
    Idle,
    Starting,
    Streaming,
    Stopping,
    Error { message: String },
}

impl Default for StreamState {
    fn default() -> Self {
        StreamState::Idle
    }
}

/// Señales de ciclo de vida que emite la sesión del dispositivo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    Starting,
    Streaming,
    Stopping,
    Stopped,
    Paused,
    Error(String),
}

/// Metadatos del último frame mostrado, para el dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameMeta {
    pub width: u32,
    pub height: u32,
    pub sequence: u64,
    pub fps_est: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsFrameMetaMessage {
    pub r#type: String,
    pub meta: FrameMeta,
}
