use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identificador opaco de unas gafas visibles para el SDK.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Conjunto de dispositivos visibles en un instante dado.
pub type DeviceSet = BTreeSet<DeviceId>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RegistrationState {
    Unavailable,
    Available,
    Registering,
    Registered,
    Unregistering,
}

impl Default for RegistrationState {
    fn default() -> Self {
        RegistrationState::Unavailable
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Permission {
    Camera,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Política que elige el dispositivo activo entre los visibles.
pub trait DeviceSelector: Send + Sync {
    fn select(&self, devices: &DeviceSet) -> Option<DeviceId>;
}

/// Elige el primer dispositivo visible (orden lexicográfico del id).
#[derive(Debug, Clone, Default)]
pub struct AutoDeviceSelector;

impl DeviceSelector for AutoDeviceSelector {
    fn select(&self, devices: &DeviceSet) -> Option<DeviceId> {
        devices.iter().next().cloned()
    }
}

/// Solo acepta un dispositivo concreto, y únicamente mientras sea visible.
#[derive(Debug, Clone)]
pub struct SpecificDeviceSelector(pub DeviceId);

impl DeviceSelector for SpecificDeviceSelector {
    fn select(&self, devices: &DeviceSet) -> Option<DeviceId> {
        devices.get(&self.0).cloned()
    }
}
