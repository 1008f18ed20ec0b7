use futures::stream::{BoxStream, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::format_converter;
use crate::application::ports::{DeviceCapabilityPort, SessionHandle, SettingsStorePort};
use crate::domain::{
    device::DeviceSelector,
    errors::{DomainError, DomainResult},
    frame::{CapturedPhoto, DisplayFrame, Frame},
    settings::{StreamQuality, KEY_VIDEO_QUALITY},
    stream::{SessionSignal, StreamState},
};

/// Parámetros fijos de las sesiones que abre el coordinador.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub target_fps: u32,
    pub frame_quality: u8,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self { target_fps: 24, frame_quality: format_converter::FRAME_JPEG_QUALITY }
    }
}

/// Notificaciones opcionales para quien quiera reaccionar a cada frame o foto.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    FrameReceived(Arc<DisplayFrame>),
    PhotoTaken(Arc<CapturedPhoto>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Listener {
    Frames,
    Signals,
}

enum SessionEnd {
    Stopped,
    Failed(String),
}

/// La única sesión viva junto con sus dos listeners.
struct ActiveSession {
    generation: u64,
    handle: Arc<dyn SessionHandle>,
    frame_task: JoinHandle<()>,
    signal_task: JoinHandle<()>,
}

/// Dueño exclusivo de la sesión de streaming. Toda creación y destrucción de
/// la sesión pasa por `slot`, así que nunca hay dos sesiones abiertas.
pub struct StreamCoordinator {
    device: Arc<dyn DeviceCapabilityPort>,
    settings: Arc<dyn SettingsStorePort>,
    selector: Arc<dyn DeviceSelector>,
    config: StreamSettings,
    slot: Mutex<Option<ActiveSession>>,
    generation: AtomicU64,
    frames_received: AtomicU64,
    dropped_frames: AtomicU64,
    state_tx: watch::Sender<StreamState>,
    frame_tx: watch::Sender<Option<Arc<DisplayFrame>>>,
    photo_tx: watch::Sender<Option<Arc<CapturedPhoto>>>,
    error_tx: watch::Sender<Option<String>>,
    events: broadcast::Sender<DeviceEvent>,
}

impl StreamCoordinator {
    pub fn new(
        device: Arc<dyn DeviceCapabilityPort>,
        settings: Arc<dyn SettingsStorePort>,
        selector: Arc<dyn DeviceSelector>,
        config: StreamSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            device,
            settings,
            selector,
            config,
            slot: Mutex::new(None),
            generation: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            dropped_frames: AtomicU64::new(0),
            state_tx: watch::channel(StreamState::Idle).0,
            frame_tx: watch::channel(None).0,
            photo_tx: watch::channel(None).0,
            error_tx: watch::channel(None).0,
            events,
        }
    }

    /// Cierra cualquier sesión previa y abre una nueva con la calidad guardada.
    pub async fn start(self: &Arc<Self>) -> DomainResult<()> {
        let mut slot = self.slot.lock().await;

        if let Some(previous) = slot.take() {
            info!("Cerrando la sesión anterior antes de abrir otra");
            Self::teardown(previous, None).await;
        }
        self.frame_tx.send_replace(None);

        let saved = self.settings.get_string(KEY_VIDEO_QUALITY, StreamQuality::default().id());
        let quality = StreamQuality::from_persisted(&saved);
        info!("Iniciando stream: calidad {} ({:?}), {} fps", saved, quality, self.config.target_fps);

        self.state_tx.send_replace(StreamState::Starting);
        let handle = match self
            .device
            .open_session(self.selector.clone(), quality, self.config.target_fps)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                error!("No se pudo abrir la sesión: {}", e);
                self.publish_failure(e.to_string());
                return Err(e);
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let frame_task = tokio::spawn(Arc::clone(self).run_frames(generation, handle.frames()));
        let signal_task = tokio::spawn(Arc::clone(self).run_signals(generation, handle.signals()));

        *slot = Some(ActiveSession { generation, handle, frame_task, signal_task });
        debug!("Sesión #{} abierta", generation);
        Ok(())
    }

    /// Parada pedida por el usuario. Idempotente.
    pub async fn stop(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(session) = slot.take() {
            info!("Deteniendo stream (sesión #{})", session.generation);
            self.state_tx.send_replace(StreamState::Stopping);
            Self::teardown(session, None).await;
        }
        self.frame_tx.send_replace(None);
        self.state_tx.send_replace(StreamState::Idle);
    }

    /// Cancela los listeners (esperando a que terminen) y después cierra el handle.
    /// `caller` es el listener que ejecuta el teardown: no puede esperarse a sí mismo.
    async fn teardown(session: ActiveSession, caller: Option<Listener>) {
        let ActiveSession { generation, handle, frame_task, signal_task } = session;

        for (kind, task) in [(Listener::Frames, frame_task), (Listener::Signals, signal_task)] {
            if caller == Some(kind) {
                continue;
            }
            task.abort();
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!("El listener {:?} de la sesión #{} terminó con pánico", kind, generation);
                }
            }
        }

        handle.close().await;
        debug!("Sesión #{} liberada", generation);
    }

    /// Fin de sesión iniciado desde uno de sus listeners.
    async fn release(&self, generation: u64, caller: Listener, end: SessionEnd) {
        let mut slot = self.slot.lock().await;
        if !matches!(slot.as_ref(), Some(s) if s.generation == generation) {
            return;
        }
        let Some(session) = slot.take() else { return };

        Self::teardown(session, Some(caller)).await;
        self.frame_tx.send_replace(None);

        match end {
            SessionEnd::Stopped => {
                self.state_tx.send_replace(StreamState::Idle);
            }
            SessionEnd::Failed(message) => self.publish_failure(message),
        }
    }

    fn publish_failure(&self, message: String) {
        self.error_tx.send_replace(Some(message.clone()));
        self.state_tx.send_replace(StreamState::Error { message });
    }

    async fn run_signals(self: Arc<Self>, generation: u64, mut signals: BoxStream<'static, SessionSignal>) {
        let mut previous: Option<SessionSignal> = None;

        while let Some(signal) = signals.next().await {
            debug!("Señal de sesión #{}: {:?} (anterior: {:?})", generation, signal, previous);
            match &signal {
                SessionSignal::Starting => {
                    self.state_tx.send_replace(StreamState::Starting);
                }
                SessionSignal::Streaming => {
                    info!("Stream activo (sesión #{})", generation);
                    self.state_tx.send_replace(StreamState::Streaming);
                }
                SessionSignal::Stopping => {
                    self.state_tx.send_replace(StreamState::Stopping);
                }
                SessionSignal::Stopped => {
                    // Un Stopped inicial es el estado de reposo del dispositivo, no el fin
                    // de esta sesión. No se publica Idle: el handle sigue abierto y el
                    // estado se queda en Starting hasta la siguiente señal.
                    if previous.as_ref().is_some_and(|p| *p != SessionSignal::Stopped) {
                        info!("Las gafas detuvieron la sesión #{}, liberando", generation);
                        self.release(generation, Listener::Signals, SessionEnd::Stopped).await;
                        return;
                    }
                }
                SessionSignal::Error(message) => {
                    error!("Error de sesión #{}: {}", generation, message);
                    let message = DomainError::Session(message.clone()).to_string();
                    self.release(generation, Listener::Signals, SessionEnd::Failed(message)).await;
                    return;
                }
                SessionSignal::Paused => {
                    debug!("Otro estado de sesión: {:?}", signal);
                }
            }
            previous = Some(signal);
        }

        debug!("Fin de las señales de la sesión #{}", generation);
    }

    async fn run_frames(
        self: Arc<Self>,
        generation: u64,
        mut frames: BoxStream<'static, DomainResult<Frame>>,
    ) {
        while let Some(item) = frames.next().await {
            match item {
                Ok(frame) => self.on_frame(frame).await,
                Err(e) => {
                    error!("Fallo en el flujo de vídeo de la sesión #{}: {}", generation, e);
                    self.release(generation, Listener::Frames, SessionEnd::Failed(e.to_string())).await;
                    return;
                }
            }
        }
        debug!("Fin de los frames de la sesión #{}", generation);
    }

    async fn on_frame(&self, frame: Frame) {
        let sequence = self.frames_received.fetch_add(1, Ordering::Relaxed) + 1;
        let quality = self.config.frame_quality;

        let converted =
            tokio::task::spawn_blocking(move || format_converter::to_display_frame(&frame, sequence, quality))
                .await;

        match converted {
            Ok(Ok(display)) => {
                let display = Arc::new(display);
                self.frame_tx.send_replace(Some(display.clone()));
                if self.events.receiver_count() > 0 {
                    let _ = self.events.send(DeviceEvent::FrameReceived(display));
                }
            }
            Ok(Err(e)) => {
                self.dropped_frames.fetch_add(1, Ordering::Relaxed);
                warn!("Frame {} descartado: {}", sequence, e);
            }
            Err(e) => {
                self.dropped_frames.fetch_add(1, Ordering::Relaxed);
                warn!("Conversión del frame {} abortada: {}", sequence, e);
            }
        }
    }

    /// Solo tiene efecto en `Streaming`; en otro estado devuelve `None` sin tocar nada.
    /// La captura se hace con el slot tomado: un `stop`/`start`/`release` concurrente
    /// espera a que termine y nunca cierra el handle en mitad de una foto.
    pub async fn take_photo(&self) -> DomainResult<Option<Arc<CapturedPhoto>>> {
        let slot = self.slot.lock().await;
        let Some(session) = slot.as_ref() else {
            warn!("No se puede tomar la foto: no hay sesión");
            return Ok(None);
        };
        if !matches!(*self.state_tx.borrow(), StreamState::Streaming) {
            warn!("No se puede tomar la foto: no hay streaming");
            return Ok(None);
        }

        let data = match session.handle.capture_photo().await {
            Ok(data) => data,
            Err(e) => {
                error!("Fallo capturando foto: {}", e);
                self.error_tx.send_replace(Some("Photo capture failed".to_string()));
                return Err(DomainError::Capture(e.to_string()));
            }
        };

        let photo = tokio::task::spawn_blocking(move || format_converter::photo_from_data(data))
            .await
            .map_err(|e| DomainError::OperationFailed(e.to_string()))?;

        match photo {
            Ok(photo) => {
                let photo = Arc::new(photo);
                info!("Foto capturada: {}x{} (sesión #{})", photo.width, photo.height, session.generation);
                self.photo_tx.send_replace(Some(photo.clone()));
                if self.events.receiver_count() > 0 {
                    let _ = self.events.send(DeviceEvent::PhotoTaken(photo.clone()));
                }
                Ok(Some(photo))
            }
            Err(e) => {
                error!("La foto recibida no se pudo decodificar: {}", e);
                self.error_tx.send_replace(Some("Photo capture failed".to_string()));
                Err(DomainError::Capture(e.to_string()))
            }
        }
    }

    pub async fn has_session(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    pub fn state(&self) -> StreamState {
        self.state_tx.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<StreamState> {
        self.state_tx.subscribe()
    }

    pub fn last_frame(&self) -> Option<Arc<DisplayFrame>> {
        self.frame_tx.borrow().clone()
    }

    pub fn watch_frames(&self) -> watch::Receiver<Option<Arc<DisplayFrame>>> {
        self.frame_tx.subscribe()
    }

    pub fn captured_photo(&self) -> Option<Arc<CapturedPhoto>> {
        self.photo_tx.borrow().clone()
    }

    pub fn clear_captured_photo(&self) {
        self.photo_tx.send_replace(None);
    }

    pub fn error_message(&self) -> Option<String> {
        self.error_tx.borrow().clone()
    }

    pub fn watch_errors(&self) -> watch::Receiver<Option<String>> {
        self.error_tx.subscribe()
    }

    pub fn set_error(&self, message: impl Into<String>) {
        self.error_tx.send_replace(Some(message.into()));
    }

    pub fn clear_error(&self) {
        self.error_tx.send_replace(None);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }
}
