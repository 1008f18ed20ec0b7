use std::sync::Arc;
use tower_http::services::ServeDir;

use glasses_stream::adapters::{
    http::{router, state::HttpState},
    simulated::{SimulatedGlasses, SimulatedGlassesConfig},
    storage::{JsonFileSettingsStore, MemoryRecordStore},
};
use glasses_stream::application::{device_manager::DeviceManager, services::SettingsService};
use glasses_stream::config::AppConfig;
use glasses_stream::domain::device::AutoDeviceSelector;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs (RUST_LOG=info por defecto)
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let cfg = AppConfig::load()?;
    tracing::info!("🔧 Inicializando adaptadores de infraestructura...");

    // 2. Instanciar Adaptadores (Capa de Infraestructura)
    // Sin SDK del fabricante usamos las gafas simuladas.
    let settings_store = Arc::new(JsonFileSettingsStore::open(&cfg.settings_path)?);
    let records = Arc::new(MemoryRecordStore::new());
    let glasses = Arc::new(SimulatedGlasses::new(SimulatedGlassesConfig {
        auto_register: true,
        auto_stream: true,
        ..Default::default()
    }));

    // 3. Instanciar Servicios (Capa de Aplicación - Casos de Uso)
    let devices = Arc::new(DeviceManager::new(
        glasses,
        settings_store.clone(),
        Arc::new(AutoDeviceSelector),
        cfg.manager_config(),
    ));
    let settings = Arc::new(SettingsService::new(settings_store, records));
    devices.start_monitoring()?;

    // 4. Configurar el Estado de la API
    let state = HttpState { devices: devices.clone(), settings };

    // 5. Configurar el Router de Axum y Archivos Estáticos
    let app = router(state).fallback_service(ServeDir::new(&cfg.static_dir));

    // 6. Lanzar el Servidor
    let addr = format!("0.0.0.0:{}", cfg.http_port);
    tracing::info!("🚀 Dashboard de las gafas en http://{}", addr);
    tracing::info!("📂 Archivos estáticos servidos desde {}", cfg.static_dir.display());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    // Cerrar la sesión antes de salir para no dejar la cámara de las gafas encendida.
    devices.close().await;
    tracing::info!("👋 Apagado limpio");

    Ok(())
}
