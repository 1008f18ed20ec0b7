use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::application::connection::ConnectionCoordinator;
use crate::application::ports::{DeviceCapabilityPort, SettingsStorePort};
use crate::application::streaming::{DeviceEvent, StreamCoordinator, StreamSettings};
use crate::domain::{
    connection::ConnectionState,
    device::{DeviceId, DeviceSelector, Permission, PermissionStatus, RegistrationState},
    errors::{DomainError, DomainResult},
    frame::{CapturedPhoto, DisplayFrame},
    stream::StreamState,
};

#[derive(Debug, Clone)]
pub struct DeviceManagerConfig {
    pub stream: StreamSettings,
    /// Límite para la respuesta del usuario al pedir permiso. `None` = sin límite.
    pub permission_timeout: Option<Duration>,
}

impl Default for DeviceManagerConfig {
    fn default() -> Self {
        Self {
            stream: StreamSettings::default(),
            permission_timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// Foto fija de todo lo observable, para quien no quiera suscribirse a cada canal.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSnapshot {
    pub connection: ConnectionState,
    pub registration: RegistrationState,
    pub stream: StreamState,
    pub has_active_device: bool,
    pub devices: Vec<DeviceId>,
    pub battery_level: Option<u8>,
    pub error_message: Option<String>,
    pub ready_to_stream: bool,
    pub last_frame: Option<Arc<DisplayFrame>>,
    pub captured_photo: Option<Arc<CapturedPhoto>>,
    pub frames_received: u64,
    pub dropped_frames: u64,
}

/// Raíz de composición: conexión + streaming detrás de una sola API.
pub struct DeviceManager {
    device: Arc<dyn DeviceCapabilityPort>,
    connection: Arc<ConnectionCoordinator>,
    stream: Arc<StreamCoordinator>,
    ready_tx: watch::Sender<bool>,
    monitoring_started: AtomicBool,
    permission_timeout: Option<Duration>,
}

impl DeviceManager {
    pub fn new(
        device: Arc<dyn DeviceCapabilityPort>,
        settings: Arc<dyn SettingsStorePort>,
        selector: Arc<dyn DeviceSelector>,
        config: DeviceManagerConfig,
    ) -> Self {
        let connection = Arc::new(ConnectionCoordinator::new(device.clone(), selector.clone()));
        let stream = Arc::new(StreamCoordinator::new(device.clone(), settings, selector, config.stream));
        Self {
            device,
            connection,
            stream,
            ready_tx: watch::channel(false).0,
            monitoring_started: AtomicBool::new(false),
            permission_timeout: config.permission_timeout,
        }
    }

    /// Se suscribe una única vez por vida del proceso; las llamadas siguientes no hacen nada.
    pub fn start_monitoring(&self) -> DomainResult<()> {
        if self.monitoring_started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Iniciando monitorización de las gafas");
        self.connection.start()?;
        Ok(())
    }

    pub async fn start_device_search(&self) -> DomainResult<()> {
        self.connection.start_search().await
    }

    pub fn stop_device_search(&self) {
        self.connection.stop_search();
    }

    pub async fn disconnect(&self) -> DomainResult<()> {
        self.stream.stop().await;
        self.connection.disconnect().await
    }

    /// Comprueba el permiso de cámara y, si hace falta, lo pide con `request`.
    /// Solo marca "listo para streaming" cuando el permiso queda concedido.
    pub async fn navigate_to_streaming<F, Fut>(&self, request: F) -> DomainResult<()>
    where
        F: FnOnce(Permission) -> Fut + Send,
        Fut: Future<Output = PermissionStatus> + Send,
    {
        let permission = Permission::Camera;
        let status = match self.device.check_permission(permission).await {
            Ok(status) => status,
            Err(e) => {
                self.stream.set_error(format!("Permission check error: {}", e));
                return Err(DomainError::PermissionCheck(e.to_string()));
            }
        };

        if status == PermissionStatus::Granted {
            self.ready_tx.send_replace(true);
            return Ok(());
        }

        info!("Solicitando permiso {:?} al usuario", permission);
        let requested = match self.permission_timeout {
            Some(limit) => match tokio::time::timeout(limit, request(permission)).await {
                Ok(status) => status,
                Err(_) => {
                    warn!("Sin respuesta a la petición de permiso tras {:?}", limit);
                    self.stream.set_error("Permission request timed out");
                    return Err(DomainError::PermissionDenied("tiempo de espera agotado".into()));
                }
            },
            None => request(permission).await,
        };

        match requested {
            PermissionStatus::Granted => {
                self.ready_tx.send_replace(true);
                Ok(())
            }
            PermissionStatus::Denied => {
                self.stream.set_error("Permission denied");
                Err(DomainError::PermissionDenied(format!("{:?}", permission)))
            }
        }
    }

    /// Vuelve a la selección de dispositivo. No detiene el stream.
    pub fn navigate_to_device_selection(&self) {
        self.ready_tx.send_replace(false);
    }

    pub async fn check_camera_permission(&self) -> bool {
        matches!(
            self.device.check_permission(Permission::Camera).await,
            Ok(PermissionStatus::Granted)
        )
    }

    pub async fn start_stream(&self) -> DomainResult<()> {
        self.stream.start().await
    }

    pub async fn stop_stream(&self) {
        self.stream.stop().await;
    }

    pub async fn take_photo(&self) -> DomainResult<Option<Arc<CapturedPhoto>>> {
        self.stream.take_photo().await
    }

    pub fn clear_captured_photo(&self) {
        self.stream.clear_captured_photo();
    }

    pub fn set_error(&self, message: impl Into<String>) {
        self.stream.set_error(message);
    }

    pub fn clear_error(&self) {
        self.stream.clear_error();
    }

    /// Detiene el stream y cancela todos los listeners. Seguro sin `start_monitoring`.
    pub async fn close(&self) {
        self.stream.stop().await;
        self.connection.stop().await;
        info!("DeviceManager cerrado");
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.watch_state()
    }

    pub fn registration_state(&self) -> RegistrationState {
        self.connection.registration()
    }

    pub fn watch_registration(&self) -> watch::Receiver<RegistrationState> {
        self.connection.watch_registration()
    }

    pub fn is_registered(&self) -> bool {
        self.connection.registration() == RegistrationState::Registered
    }

    pub fn has_active_device(&self) -> bool {
        self.connection.has_active_device()
    }

    pub fn devices(&self) -> Vec<DeviceId> {
        self.connection.devices()
    }

    pub fn watch_devices(&self) -> watch::Receiver<Vec<DeviceId>> {
        self.connection.watch_devices()
    }

    pub fn battery_level(&self) -> Option<u8> {
        self.connection.battery_level()
    }

    pub fn stream_state(&self) -> StreamState {
        self.stream.state()
    }

    pub fn watch_stream(&self) -> watch::Receiver<StreamState> {
        self.stream.watch_state()
    }

    pub fn last_frame(&self) -> Option<Arc<DisplayFrame>> {
        self.stream.last_frame()
    }

    pub fn watch_frames(&self) -> watch::Receiver<Option<Arc<DisplayFrame>>> {
        self.stream.watch_frames()
    }

    pub fn captured_photo(&self) -> Option<Arc<CapturedPhoto>> {
        self.stream.captured_photo()
    }

    pub fn error_message(&self) -> Option<String> {
        self.stream.error_message()
    }

    pub fn watch_errors(&self) -> watch::Receiver<Option<String>> {
        self.stream.watch_errors()
    }

    pub fn is_ready_to_stream(&self) -> bool {
        *self.ready_tx.borrow()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.stream.subscribe_events()
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            connection: self.connection.state(),
            registration: self.connection.registration(),
            stream: self.stream.state(),
            has_active_device: self.connection.has_active_device(),
            devices: self.connection.devices(),
            battery_level: self.connection.battery_level(),
            error_message: self.stream.error_message(),
            ready_to_stream: self.is_ready_to_stream(),
            last_frame: self.stream.last_frame(),
            captured_photo: self.stream.captured_photo(),
            frames_received: self.stream.frames_received(),
            dropped_frames: self.stream.dropped_frames(),
        }
    }
}
