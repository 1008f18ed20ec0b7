use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

use crate::domain::{
    device::{DeviceId, DeviceSelector, DeviceSet, Permission, PermissionStatus, RegistrationState},
    errors::DomainResult,
    frame::{Frame, PhotoData},
    record::ConversationRecord,
    settings::StreamQuality,
    stream::SessionSignal,
};

/// Capacidad del SDK de las gafas: registro, descubrimiento, permisos y sesiones.
#[async_trait]
pub trait DeviceCapabilityPort: Send + Sync {
    fn registration_states(&self) -> BoxStream<'static, RegistrationState>;
    fn device_sets(&self) -> BoxStream<'static, DeviceSet>;
    fn active_devices(&self, selector: Arc<dyn DeviceSelector>) -> BoxStream<'static, Option<DeviceId>>;

    /// Nivel de batería (0-100). No todos los dispositivos lo publican.
    fn battery_levels(&self) -> BoxStream<'static, u8> {
        stream::empty().boxed()
    }

    async fn start_registration(&self) -> DomainResult<()>;
    async fn start_unregistration(&self) -> DomainResult<()>;
    async fn check_permission(&self, permission: Permission) -> DomainResult<PermissionStatus>;
    async fn open_session(
        &self,
        selector: Arc<dyn DeviceSelector>,
        quality: StreamQuality,
        target_fps: u32,
    ) -> DomainResult<Arc<dyn SessionHandle>>;
}

/// Una sesión de vídeo/foto abierta contra las gafas.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// Los `Err` indican un fallo del propio flujo, no de un frame concreto.
    fn frames(&self) -> BoxStream<'static, DomainResult<Frame>>;
    fn signals(&self) -> BoxStream<'static, SessionSignal>;
    async fn capture_photo(&self) -> DomainResult<PhotoData>;
    async fn close(&self);
}

/// Almacén clave/valor persistente (cifrado fuera de este crate).
pub trait SettingsStorePort: Send + Sync {
    fn get_string(&self, key: &str, default: &str) -> String;
    fn set_string(&self, key: &str, value: &str) -> DomainResult<()>;
}

#[async_trait]
pub trait RecordStorePort: Send + Sync {
    async fn count(&self) -> DomainResult<usize>;
    async fn list(&self) -> DomainResult<Vec<ConversationRecord>>;
    async fn delete(&self, id: &str) -> DomainResult<bool>;
    async fn delete_all(&self) -> DomainResult<()>;
}
