use futures::stream::{self, StreamExt};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::ports::DeviceCapabilityPort;
use crate::domain::{
    connection::{ConnectionEvent, ConnectionMachine, ConnectionState},
    device::{DeviceId, DeviceSelector, DeviceSet, RegistrationState},
    errors::{DomainError, DomainResult},
};

enum Input {
    Registration(RegistrationState),
    Devices(DeviceSet),
    Active(Option<DeviceId>),
    Battery(u8),
}

/// Fusiona registro, dispositivos visibles y dispositivo activo en un único
/// `ConnectionState`. Un solo bucle consume las tres fuentes.
pub struct ConnectionCoordinator {
    device: Arc<dyn DeviceCapabilityPort>,
    selector: Arc<dyn DeviceSelector>,
    machine: Mutex<ConnectionMachine>,
    state_tx: watch::Sender<ConnectionState>,
    registration_tx: watch::Sender<RegistrationState>,
    devices_tx: watch::Sender<Vec<DeviceId>>,
    has_active_tx: watch::Sender<bool>,
    battery_tx: watch::Sender<Option<u8>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionCoordinator {
    pub fn new(device: Arc<dyn DeviceCapabilityPort>, selector: Arc<dyn DeviceSelector>) -> Self {
        Self {
            device,
            selector,
            machine: Mutex::new(ConnectionMachine::default()),
            state_tx: watch::channel(ConnectionState::Disconnected).0,
            registration_tx: watch::channel(RegistrationState::Unavailable).0,
            devices_tx: watch::channel(Vec::new()).0,
            has_active_tx: watch::channel(false).0,
            battery_tx: watch::channel(None).0,
            listener: Mutex::new(None),
        }
    }

    /// Se suscribe a las fuentes del dispositivo. Llamadas repetidas no hacen nada.
    pub fn start(self: &Arc<Self>) -> DomainResult<bool> {
        let mut listener = self
            .listener
            .lock()
            .map_err(|_| DomainError::OperationFailed("Lock del listener de conexión".into()))?;
        if listener.is_some() {
            return Ok(false);
        }

        let merged = stream::select_all(vec![
            self.device.registration_states().map(Input::Registration).boxed(),
            self.device.device_sets().map(Input::Devices).boxed(),
            self.device.active_devices(self.selector.clone()).map(Input::Active).boxed(),
            self.device.battery_levels().map(Input::Battery).boxed(),
        ]);

        let this = Arc::clone(self);
        *listener = Some(tokio::spawn(async move {
            let mut merged = merged;
            while let Some(input) = merged.next().await {
                this.on_input(input);
            }
            debug!("Fuentes de conexión agotadas");
        }));

        info!("Monitorización de conexión iniciada");
        Ok(true)
    }

    /// Cancela el bucle de escucha. Seguro aunque nunca se haya iniciado.
    pub async fn stop(&self) {
        let handle = match self.listener.lock() {
            Ok(mut listener) => listener.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
            debug!("Listener de conexión cancelado");
        }
    }

    fn on_input(&self, input: Input) {
        match input {
            Input::Registration(state) => {
                debug!("Estado de registro: {:?}", state);
                self.apply(ConnectionEvent::Registration(state));
            }
            Input::Devices(set) => {
                debug!("Dispositivos visibles: {}", set.len());
                self.devices_tx.send_replace(set.into_iter().collect());
            }
            Input::Active(device) => {
                debug!("Dispositivo activo: {:?}", device);
                self.apply(ConnectionEvent::ActiveDevice(device));
            }
            Input::Battery(level) => {
                self.battery_tx.send_replace(Some(level.min(100)));
            }
        }
    }

    pub(crate) fn apply(&self, event: ConnectionEvent) {
        let Ok(mut machine) = self.machine.lock() else {
            warn!("Máquina de conexión envenenada, evento descartado: {:?}", event);
            return;
        };

        let changed = machine.apply(event);
        // Las observaciones se publican con el lock tomado para que nunca se
        // vea un registro nuevo con un estado de conexión antiguo.
        self.registration_tx.send_replace(machine.registration());
        self.has_active_tx.send_replace(machine.active_device().is_some());
        if let Some(state) = changed {
            info!("Conexión -> {:?}", state);
            self.state_tx.send_replace(state);
        }
    }

    pub async fn start_search(&self) -> DomainResult<()> {
        info!("Buscando gafas, registro actual: {:?}", *self.registration_tx.borrow());
        self.apply(ConnectionEvent::SearchStarted);

        if let Err(e) = self.device.start_registration().await {
            warn!("No se pudo iniciar el registro: {}", e);
            self.apply(ConnectionEvent::RegistrationFailed(e.to_string()));
            return Err(e);
        }
        Ok(())
    }

    pub fn stop_search(&self) {
        self.apply(ConnectionEvent::SearchStopped);
    }

    /// Fuerza `Disconnected` tras pedir la baja del registro.
    pub async fn disconnect(&self) -> DomainResult<()> {
        let result = self.device.start_unregistration().await;
        if let Err(e) = &result {
            warn!("Error iniciando la baja del registro: {}", e);
        }
        self.apply(ConnectionEvent::ForceDisconnect);
        self.battery_tx.send_replace(None);
        result
    }

    pub fn state(&self) -> ConnectionState {
        self.state_tx.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn registration(&self) -> RegistrationState {
        *self.registration_tx.borrow()
    }

    pub fn watch_registration(&self) -> watch::Receiver<RegistrationState> {
        self.registration_tx.subscribe()
    }

    pub fn devices(&self) -> Vec<DeviceId> {
        self.devices_tx.borrow().clone()
    }

    pub fn watch_devices(&self) -> watch::Receiver<Vec<DeviceId>> {
        self.devices_tx.subscribe()
    }

    pub fn has_active_device(&self) -> bool {
        *self.has_active_tx.borrow()
    }

    pub fn battery_level(&self) -> Option<u8> {
        *self.battery_tx.borrow()
    }
}
