//! Registro, búsqueda y permisos contra las gafas simuladas.
//!
//! Run: `cargo test --test connection_flow`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use glasses_stream::adapters::simulated::{SimulatedGlasses, SimulatedGlassesConfig};
use glasses_stream::adapters::storage::MemorySettingsStore;
use glasses_stream::application::device_manager::{DeviceManager, DeviceManagerConfig};
use glasses_stream::domain::{
    connection::ConnectionState,
    device::{AutoDeviceSelector, DeviceId, PermissionStatus, RegistrationState, SpecificDeviceSelector},
    errors::DomainError,
    stream::{SessionSignal, StreamState},
};

// ── Helpers ──────────────────────────────────────────────────────────

fn manual_glasses() -> Arc<SimulatedGlasses> {
    Arc::new(SimulatedGlasses::new(SimulatedGlassesConfig {
        frame_width: 16,
        frame_height: 16,
        ..Default::default()
    }))
}

fn manager_for(glasses: &Arc<SimulatedGlasses>, config: DeviceManagerConfig) -> DeviceManager {
    DeviceManager::new(
        glasses.clone(),
        Arc::new(MemorySettingsStore::new()),
        Arc::new(AutoDeviceSelector),
        config,
    )
}

async fn wait_for<T>(rx: &mut watch::Receiver<T>, pred: impl FnMut(&T) -> bool) {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(pred))
        .await
        .expect("timeout esperando estado")
        .expect("canal cerrado");
}

async fn wait_connection(manager: &DeviceManager, expected: ConnectionState) {
    let mut rx = manager.watch_connection();
    wait_for(&mut rx, |s| *s == expected).await;
}

async fn wait_registration(manager: &DeviceManager, expected: RegistrationState) {
    let mut rx = manager.watch_registration();
    wait_for(&mut rx, |s| *s == expected).await;
}

async fn eventually(check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("la condición no se cumplió a tiempo");
}

fn connected(name: &str) -> ConnectionState {
    ConnectionState::Connected { device_name: name.into() }
}

/// Gafas disponibles pero sin registrar, con la monitorización ya en marcha.
async fn monitored() -> (DeviceManager, Arc<SimulatedGlasses>) {
    let glasses = manual_glasses();
    glasses.set_registration(RegistrationState::Available);
    let manager = manager_for(&glasses, DeviceManagerConfig::default());
    manager.start_monitoring().unwrap();
    wait_registration(&manager, RegistrationState::Available).await;
    (manager, glasses)
}

// ── Búsqueda y registro ──────────────────────────────────────────────

#[tokio::test]
async fn search_moves_through_searching_and_connecting() {
    let (manager, glasses) = monitored().await;
    assert_eq!(manager.connection_state(), ConnectionState::Disconnected);

    manager.start_device_search().await.unwrap();
    assert_eq!(manager.connection_state(), ConnectionState::Searching);
    assert_eq!(glasses.registration_requests(), 1);

    glasses.set_registration(RegistrationState::Registering);
    wait_connection(&manager, ConnectionState::Connecting).await;

    glasses.set_registration(RegistrationState::Registered);
    wait_registration(&manager, RegistrationState::Registered).await;
    assert_eq!(manager.connection_state(), ConnectionState::Connecting);
    assert!(manager.is_registered());

    glasses.set_devices(["glasses-1"]);
    wait_connection(&manager, connected("glasses-1")).await;
    assert!(manager.has_active_device());
}

#[tokio::test]
async fn active_device_drives_connected_and_disconnected() {
    let (manager, glasses) = monitored().await;

    glasses.set_devices(["glasses-1"]);
    wait_connection(&manager, connected("glasses-1")).await;

    glasses.set_devices(std::iter::empty::<&str>());
    wait_connection(&manager, ConnectionState::Disconnected).await;
    assert!(!manager.has_active_device());
}

#[tokio::test]
async fn stop_search_returns_to_disconnected() {
    let (manager, _glasses) = monitored().await;
    manager.start_device_search().await.unwrap();
    assert_eq!(manager.connection_state(), ConnectionState::Searching);

    manager.stop_device_search();
    assert_eq!(manager.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn auto_registering_glasses_end_up_connected() {
    let glasses = Arc::new(SimulatedGlasses::new(SimulatedGlassesConfig {
        auto_register: true,
        ..Default::default()
    }));
    let manager = manager_for(&glasses, DeviceManagerConfig::default());
    manager.start_monitoring().unwrap();

    manager.start_device_search().await.unwrap();
    wait_connection(&manager, connected("glasses-1")).await;
    wait_registration(&manager, RegistrationState::Registered).await;
}

#[tokio::test]
async fn specific_selector_ignores_other_devices() {
    let glasses = manual_glasses();
    let manager = DeviceManager::new(
        glasses.clone(),
        Arc::new(MemorySettingsStore::new()),
        Arc::new(SpecificDeviceSelector(DeviceId::new("glasses-2"))),
        DeviceManagerConfig::default(),
    );
    manager.start_monitoring().unwrap();

    glasses.set_devices(["glasses-1"]);
    let mut devices = manager.watch_devices();
    wait_for(&mut devices, |d| d.len() == 1).await;
    assert_eq!(manager.connection_state(), ConnectionState::Disconnected);

    glasses.set_devices(["glasses-1", "glasses-2"]);
    wait_connection(&manager, connected("glasses-2")).await;
}

#[tokio::test]
async fn monitoring_subscribes_only_once() {
    let (manager, glasses) = monitored().await;
    manager.start_monitoring().unwrap();
    manager.start_monitoring().unwrap();
    assert_eq!(glasses.registration_subscriptions(), 1);
}

#[tokio::test]
async fn devices_and_battery_are_observable() {
    let (manager, glasses) = monitored().await;

    glasses.set_devices(["glasses-b", "glasses-a"]);
    let mut devices = manager.watch_devices();
    wait_for(&mut devices, |d| d.len() == 2).await;
    assert_eq!(manager.devices(), vec![DeviceId::new("glasses-a"), DeviceId::new("glasses-b")]);

    glasses.set_battery(87);
    eventually(|| manager.battery_level() == Some(87)).await;
    assert_eq!(manager.snapshot().battery_level, Some(87));
}

// ── Desconexión y cierre ─────────────────────────────────────────────

#[tokio::test]
async fn disconnect_stops_stream_and_unregisters() {
    let (manager, glasses) = monitored().await;
    glasses.set_devices(["glasses-1"]);
    glasses.set_battery(50);
    wait_connection(&manager, connected("glasses-1")).await;
    eventually(|| manager.battery_level().is_some()).await;

    manager.start_stream().await.unwrap();
    let session = glasses.last_session().unwrap();
    session.push_signal(SessionSignal::Streaming);
    let mut stream = manager.watch_stream();
    wait_for(&mut stream, |s| *s == StreamState::Streaming).await;

    manager.disconnect().await.unwrap();

    assert_eq!(manager.stream_state(), StreamState::Idle);
    assert!(session.is_closed());
    assert_eq!(glasses.unregistration_requests(), 1);
    assert_eq!(manager.connection_state(), ConnectionState::Disconnected);
    assert_eq!(manager.battery_level(), None);
}

#[tokio::test]
async fn close_stops_listening_to_the_device() {
    let (manager, glasses) = monitored().await;
    manager.close().await;

    glasses.set_devices(["glasses-1"]);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(manager.connection_state(), ConnectionState::Disconnected);
    assert!(manager.devices().is_empty());
}

#[tokio::test]
async fn close_without_monitoring_is_safe() {
    let glasses = manual_glasses();
    let manager = manager_for(&glasses, DeviceManagerConfig::default());
    manager.close().await;
    manager.close().await;
    assert_eq!(manager.stream_state(), StreamState::Idle);
}

// ── Permisos ─────────────────────────────────────────────────────────

#[tokio::test]
async fn granted_permission_marks_ready_without_asking() {
    let glasses = manual_glasses();
    let manager = manager_for(&glasses, DeviceManagerConfig::default());

    let asked = AtomicBool::new(false);
    manager
        .navigate_to_streaming(|_| {
            asked.store(true, Ordering::SeqCst);
            async { PermissionStatus::Denied }
        })
        .await
        .unwrap();
    assert!(!asked.load(Ordering::SeqCst));
    assert!(manager.is_ready_to_stream());
    assert!(manager.check_camera_permission().await);

    manager.navigate_to_device_selection();
    assert!(!manager.is_ready_to_stream());
}

#[tokio::test]
async fn permission_granted_by_user_marks_ready() {
    let glasses = manual_glasses();
    glasses.set_permission(Ok(PermissionStatus::Denied));
    let manager = manager_for(&glasses, DeviceManagerConfig::default());

    manager.navigate_to_streaming(|_| async { PermissionStatus::Granted }).await.unwrap();
    assert!(manager.is_ready_to_stream());
    assert_eq!(manager.error_message(), None);
}

#[tokio::test]
async fn permission_denied_by_user_sets_error() {
    let glasses = manual_glasses();
    glasses.set_permission(Ok(PermissionStatus::Denied));
    let manager = manager_for(&glasses, DeviceManagerConfig::default());

    let err = manager
        .navigate_to_streaming(|_| async { PermissionStatus::Denied })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PermissionDenied(_)));
    assert!(!manager.is_ready_to_stream());
    assert_eq!(manager.error_message().as_deref(), Some("Permission denied"));
    assert!(!manager.check_camera_permission().await);
}

#[tokio::test]
async fn permission_check_failure_sets_error() {
    let glasses = manual_glasses();
    glasses.set_permission(Err(DomainError::OperationFailed("servicio caído".into())));
    let manager = manager_for(&glasses, DeviceManagerConfig::default());

    let err = manager
        .navigate_to_streaming(|_| async { PermissionStatus::Granted })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PermissionCheck(_)));
    assert!(!manager.is_ready_to_stream());
    assert!(manager.error_message().unwrap().starts_with("Permission check error"));
}

#[tokio::test]
async fn unanswered_permission_request_times_out() {
    let glasses = manual_glasses();
    glasses.set_permission(Ok(PermissionStatus::Denied));
    let manager = manager_for(
        &glasses,
        DeviceManagerConfig { permission_timeout: Some(Duration::from_millis(50)), ..Default::default() },
    );

    let err = manager
        .navigate_to_streaming(|_| std::future::pending::<PermissionStatus>())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PermissionDenied(_)));
    assert!(!manager.is_ready_to_stream());
    assert_eq!(manager.error_message().as_deref(), Some("Permission request timed out"));
}
