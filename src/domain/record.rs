use serde::{Deserialize, Serialize};

/// Conversación guardada por el asistente. Solo se cuenta, lista y borra.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationRecord {
    pub id: String,
    pub title: String,
    pub created_at_ms: u64,
}
