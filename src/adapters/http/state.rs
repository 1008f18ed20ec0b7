use std::sync::Arc;
use crate::application::device_manager::DeviceManager;
use crate::application::services::SettingsService;

/// Estado compartido para los manejadores HTTP de Axum.
/// Siguiendo la Arquitectura Hexagonal, el estado contiene los servicios (Casos de Uso).
#[derive(Clone)]
pub struct HttpState {
    /// Conexión con las gafas y sesión de streaming.
    pub devices: Arc<DeviceManager>,
    /// Preferencias persistidas del usuario.
    pub settings: Arc<SettingsService>,
}
