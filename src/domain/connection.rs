use serde::{Deserialize, Serialize};

use super::device::{DeviceId, RegistrationState};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Searching,
    Connecting,
    Connected { device_name: String },
    Error { message: String },
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Disconnected
    }
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }
}

/// Entradas que alteran el estado de conexión: las tres fuentes externas
/// más las operaciones explícitas del usuario.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Registration(RegistrationState),
    ActiveDevice(Option<DeviceId>),
    SearchStarted,
    SearchStopped,
    ForceDisconnect,
    RegistrationFailed(String),
}

/// Celda única con el último valor de cada entrada y el estado resultante.
#[derive(Debug, Clone, Default)]
pub struct ConnectionMachine {
    registration: RegistrationState,
    active_device: Option<DeviceId>,
    state: ConnectionState,
}

impl ConnectionMachine {
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn registration(&self) -> RegistrationState {
        self.registration
    }

    pub fn active_device(&self) -> Option<&DeviceId> {
        self.active_device.as_ref()
    }

    /// Aplica un evento. Devuelve el nuevo estado solo si ha cambiado.
    pub fn apply(&mut self, event: ConnectionEvent) -> Option<ConnectionState> {
        let next = match event {
            ConnectionEvent::ActiveDevice(device) => {
                self.active_device = device;
                match &self.active_device {
                    Some(id) => Some(ConnectionState::Connected { device_name: id.to_string() }),
                    None if self.state.is_connected() => Some(ConnectionState::Disconnected),
                    None => None,
                }
            }
            ConnectionEvent::Registration(registration) => {
                self.registration = registration;
                self.on_registration()
            }
            ConnectionEvent::SearchStarted => Some(ConnectionState::Searching),
            ConnectionEvent::SearchStopped => match self.state {
                ConnectionState::Searching => Some(ConnectionState::Disconnected),
                _ => None,
            },
            ConnectionEvent::ForceDisconnect => Some(ConnectionState::Disconnected),
            ConnectionEvent::RegistrationFailed(message) => Some(ConnectionState::Error { message }),
        };

        match next {
            Some(next) if next != self.state => {
                self.state = next.clone();
                Some(next)
            }
            _ => None,
        }
    }

    fn on_registration(&self) -> Option<ConnectionState> {
        if let Some(id) = &self.active_device {
            return Some(ConnectionState::Connected { device_name: id.to_string() });
        }
        match self.registration {
            RegistrationState::Unavailable => Some(ConnectionState::Disconnected),
            RegistrationState::Registering => Some(ConnectionState::Connecting),
            // Registrado pero el selector aún no confirmó dispositivo.
            RegistrationState::Registered
                if matches!(self.state, ConnectionState::Searching | ConnectionState::Connecting) =>
            {
                Some(ConnectionState::Connecting)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glasses() -> Option<DeviceId> {
        Some(DeviceId::new("glasses-1"))
    }

    #[test]
    fn search_then_registration_never_reports_connected_without_device() {
        let mut m = ConnectionMachine::default();
        m.apply(ConnectionEvent::Registration(RegistrationState::Unavailable));

        let mut seen = Vec::new();
        m.apply(ConnectionEvent::SearchStarted);
        seen.push(m.state().clone());
        m.apply(ConnectionEvent::Registration(RegistrationState::Registering));
        seen.push(m.state().clone());
        m.apply(ConnectionEvent::Registration(RegistrationState::Registered));
        seen.push(m.state().clone());

        assert_eq!(
            seen,
            vec![
                ConnectionState::Searching,
                ConnectionState::Connecting,
                ConnectionState::Connecting
            ]
        );
    }

    #[test]
    fn registered_while_searching_moves_to_connecting() {
        let mut m = ConnectionMachine::default();
        m.apply(ConnectionEvent::SearchStarted);
        let changed = m.apply(ConnectionEvent::Registration(RegistrationState::Registered));
        assert_eq!(changed, Some(ConnectionState::Connecting));
    }

    #[test]
    fn losing_active_device_while_connected_disconnects() {
        let mut m = ConnectionMachine::default();
        m.apply(ConnectionEvent::ActiveDevice(glasses()));
        assert_eq!(
            m.state(),
            &ConnectionState::Connected { device_name: "glasses-1".into() }
        );

        let changed = m.apply(ConnectionEvent::ActiveDevice(None));
        assert_eq!(changed, Some(ConnectionState::Disconnected));
    }

    #[test]
    fn active_device_absent_is_noop_when_not_connected() {
        let mut m = ConnectionMachine::default();
        m.apply(ConnectionEvent::SearchStarted);
        assert_eq!(m.apply(ConnectionEvent::ActiveDevice(None)), None);
        assert_eq!(m.state(), &ConnectionState::Searching);
    }

    #[test]
    fn active_device_wins_over_registration_updates() {
        let mut m = ConnectionMachine::default();
        m.apply(ConnectionEvent::ActiveDevice(glasses()));
        m.apply(ConnectionEvent::Registration(RegistrationState::Unavailable));
        assert!(m.state().is_connected());
    }

    #[test]
    fn unavailable_registration_disconnects() {
        let mut m = ConnectionMachine::default();
        m.apply(ConnectionEvent::Registration(RegistrationState::Registering));
        assert_eq!(m.state(), &ConnectionState::Connecting);
        m.apply(ConnectionEvent::Registration(RegistrationState::Unavailable));
        assert_eq!(m.state(), &ConnectionState::Disconnected);
    }

    #[test]
    fn available_and_unregistering_leave_state_untouched() {
        let mut m = ConnectionMachine::default();
        m.apply(ConnectionEvent::SearchStarted);
        assert_eq!(m.apply(ConnectionEvent::Registration(RegistrationState::Available)), None);
        assert_eq!(
            m.apply(ConnectionEvent::Registration(RegistrationState::Unregistering)),
            None
        );
        assert_eq!(m.state(), &ConnectionState::Searching);
    }

    #[test]
    fn stop_search_only_clears_searching() {
        let mut m = ConnectionMachine::default();
        m.apply(ConnectionEvent::Registration(RegistrationState::Registering));
        assert_eq!(m.apply(ConnectionEvent::SearchStopped), None);
        assert_eq!(m.state(), &ConnectionState::Connecting);

        m.apply(ConnectionEvent::SearchStarted);
        assert_eq!(m.apply(ConnectionEvent::SearchStopped), Some(ConnectionState::Disconnected));
    }

    #[test]
    fn force_disconnect_overrides_connected() {
        let mut m = ConnectionMachine::default();
        m.apply(ConnectionEvent::ActiveDevice(glasses()));
        assert_eq!(m.apply(ConnectionEvent::ForceDisconnect), Some(ConnectionState::Disconnected));
    }
}
