use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info};

use super::session::{SessionLedger, SimulatedSession};
use crate::application::ports::{DeviceCapabilityPort, SessionHandle};
use crate::domain::{
    device::{DeviceId, DeviceSelector, DeviceSet, Permission, PermissionStatus, RegistrationState},
    errors::{DomainError, DomainResult},
    settings::StreamQuality,
};

/// Sesiones que se conservan para inspección; las más antiguas se descartan.
const SESSION_HISTORY: usize = 8;

/// Valor actual + suscriptores. Cada suscriptor recibe el valor vigente y
/// después todos los cambios, en orden y sin fusionar.
struct Feed<T> {
    inner: Mutex<(T, Vec<mpsc::UnboundedSender<T>>)>,
}

impl<T: Clone + Send + 'static> Feed<T> {
    fn new(initial: T) -> Self {
        Self { inner: Mutex::new((initial, Vec::new())) }
    }

    fn subscribe(&self) -> BoxStream<'static, T> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut inner) = self.inner.lock() {
            let _ = tx.send(inner.0.clone());
            inner.1.push(tx);
        }
        UnboundedReceiverStream::new(rx).boxed()
    }

    fn publish(&self, value: T) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.0 = value.clone();
            inner.1.retain(|tx| tx.send(value.clone()).is_ok());
        }
    }

    fn current(&self) -> Option<T> {
        self.inner.lock().ok().map(|inner| inner.0.clone())
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedGlassesConfig {
    /// Registrarse solo al pedirlo y hacer visible `device_name`.
    pub auto_register: bool,
    /// Las sesiones generan señales y frames por sí mismas.
    pub auto_stream: bool,
    pub device_name: String,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for SimulatedGlassesConfig {
    fn default() -> Self {
        Self {
            auto_register: false,
            auto_stream: false,
            device_name: "glasses-1".into(),
            frame_width: 640,
            frame_height: 480,
        }
    }
}

/// Gafas simuladas: sustituyen al SDK del fabricante en tests y en la demo.
pub struct SimulatedGlasses {
    config: SimulatedGlassesConfig,
    registration: Feed<RegistrationState>,
    devices: Feed<DeviceSet>,
    battery: Feed<Option<u8>>,
    permission: Mutex<DomainResult<PermissionStatus>>,
    open_failure: Mutex<Option<String>>,
    sessions: Mutex<Vec<Arc<SimulatedSession>>>,
    ledger: Arc<SessionLedger>,
    registration_requests: AtomicUsize,
    unregistration_requests: AtomicUsize,
    subscriptions: AtomicUsize,
}

impl SimulatedGlasses {
    pub fn new(config: SimulatedGlassesConfig) -> Self {
        Self {
            config,
            registration: Feed::new(RegistrationState::Unavailable),
            devices: Feed::new(DeviceSet::new()),
            battery: Feed::new(None),
            permission: Mutex::new(Ok(PermissionStatus::Granted)),
            open_failure: Mutex::new(None),
            sessions: Mutex::new(Vec::new()),
            ledger: Arc::new(SessionLedger::default()),
            registration_requests: AtomicUsize::new(0),
            unregistration_requests: AtomicUsize::new(0),
            subscriptions: AtomicUsize::new(0),
        }
    }

    pub fn set_registration(&self, state: RegistrationState) {
        debug!("[sim] registro -> {:?}", state);
        self.registration.publish(state);
    }

    pub fn set_devices<'a>(&self, ids: impl IntoIterator<Item = &'a str>) {
        let set: DeviceSet = ids.into_iter().map(DeviceId::new).collect();
        debug!("[sim] dispositivos visibles -> {:?}", set);
        self.devices.publish(set);
    }

    pub fn set_battery(&self, level: u8) {
        self.battery.publish(Some(level));
    }

    pub fn set_permission(&self, result: DomainResult<PermissionStatus>) {
        if let Ok(mut permission) = self.permission.lock() {
            *permission = result;
        }
    }

    /// La próxima apertura de sesión fallará con `message`.
    pub fn fail_next_open(&self, message: &str) {
        if let Ok(mut failure) = self.open_failure.lock() {
            *failure = Some(message.to_string());
        }
    }

    /// Últimas sesiones abiertas, de la más antigua a la más reciente.
    pub fn sessions(&self) -> Vec<Arc<SimulatedSession>> {
        self.sessions.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn last_session(&self) -> Option<Arc<SimulatedSession>> {
        self.sessions().last().cloned()
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    pub fn registration_requests(&self) -> usize {
        self.registration_requests.load(Ordering::SeqCst)
    }

    pub fn unregistration_requests(&self) -> usize {
        self.unregistration_requests.load(Ordering::SeqCst)
    }

    /// Veces que alguien se suscribió al estado de registro.
    pub fn registration_subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceCapabilityPort for SimulatedGlasses {
    fn registration_states(&self) -> BoxStream<'static, RegistrationState> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        self.registration.subscribe()
    }

    fn device_sets(&self) -> BoxStream<'static, DeviceSet> {
        self.devices.subscribe()
    }

    fn active_devices(&self, selector: Arc<dyn DeviceSelector>) -> BoxStream<'static, Option<DeviceId>> {
        let selected = self.devices.subscribe().map(move |set| selector.select(&set));
        // Solo se emiten cambios reales del dispositivo activo.
        stream::unfold((selected, None::<Option<DeviceId>>), |(mut selected, last)| async move {
            loop {
                let next = selected.next().await?;
                if last.as_ref() != Some(&next) {
                    return Some((next.clone(), (selected, Some(next))));
                }
            }
        })
        .boxed()
    }

    fn battery_levels(&self) -> BoxStream<'static, u8> {
        self.battery.subscribe().filter_map(|level| async move { level }).boxed()
    }

    async fn start_registration(&self) -> DomainResult<()> {
        self.registration_requests.fetch_add(1, Ordering::SeqCst);
        info!("[sim] registro solicitado");
        if self.config.auto_register {
            self.set_registration(RegistrationState::Registering);
            self.set_registration(RegistrationState::Registered);
            self.set_devices([self.config.device_name.as_str()]);
        }
        Ok(())
    }

    async fn start_unregistration(&self) -> DomainResult<()> {
        self.unregistration_requests.fetch_add(1, Ordering::SeqCst);
        info!("[sim] baja del registro solicitada");
        if self.config.auto_register {
            self.set_registration(RegistrationState::Unregistering);
            self.set_devices(std::iter::empty::<&str>());
            self.set_registration(RegistrationState::Available);
        }
        Ok(())
    }

    async fn check_permission(&self, _permission: Permission) -> DomainResult<PermissionStatus> {
        self.permission
            .lock()
            .map_err(|_| DomainError::OperationFailed("Lock de permisos fallido".into()))?
            .clone()
    }

    async fn open_session(
        &self,
        selector: Arc<dyn DeviceSelector>,
        quality: StreamQuality,
        target_fps: u32,
    ) -> DomainResult<Arc<dyn SessionHandle>> {
        if let Some(message) = self.open_failure.lock().ok().and_then(|mut f| f.take()) {
            return Err(DomainError::Session(message));
        }

        let devices = self.devices.current().unwrap_or_default();
        let Some(device) = selector.select(&devices) else {
            return Err(DomainError::NotFound("no hay gafas activas".into()));
        };
        debug!("[sim] abriendo sesión en {}", device);

        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| DomainError::OperationFailed("Lock de sesiones fallido".into()))?;
        let session = SimulatedSession::open(
            self.ledger.opened() + 1,
            quality,
            target_fps,
            (self.config.frame_width, self.config.frame_height),
            self.ledger.clone(),
        );
        if self.config.auto_stream {
            session.start_generator();
        }
        sessions.push(session.clone());
        if sessions.len() > SESSION_HISTORY {
            let excess = sessions.len() - SESSION_HISTORY;
            sessions.drain(..excess);
        }
        Ok(session)
    }
}
