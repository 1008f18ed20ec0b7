use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::application::device_manager::DeviceManagerConfig;
use crate::application::format_converter::FRAME_JPEG_QUALITY;
use crate::application::streaming::StreamSettings;

/// Configuración de la aplicación: `glasses.toml` opcional + variables de entorno.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http_port: u16,
    pub settings_path: PathBuf,
    pub static_dir: PathBuf,
    pub target_fps: u32,
    pub frame_quality: u8,
    /// 0 desactiva el límite de espera del permiso.
    pub permission_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: 8090,
            settings_path: PathBuf::from("settings.json"),
            static_dir: PathBuf::from("static"),
            target_fps: 24,
            frame_quality: FRAME_JPEG_QUALITY,
            permission_timeout_secs: 120,
        }
    }
}

impl AppConfig {
    /// Carga `GLASSES_CONFIG` (o `glasses.toml` si existe) y aplica el entorno encima.
    pub fn load() -> Result<Self> {
        let path = std::env::var("GLASSES_CONFIG").unwrap_or_else(|_| "glasses.toml".to_string());
        let mut cfg = Self::from_file(Path::new(&path))?;
        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("leyendo {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("parseando {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = var("GLASSES_HTTP_PORT") {
            self.http_port = v.parse().with_context(|| format!("GLASSES_HTTP_PORT inválido: {v}"))?;
        }
        if let Some(v) = var("GLASSES_SETTINGS_PATH") {
            self.settings_path = PathBuf::from(v);
        }
        if let Some(v) = var("GLASSES_STATIC_DIR") {
            self.static_dir = PathBuf::from(v);
        }
        if let Some(v) = var("GLASSES_TARGET_FPS") {
            self.target_fps = v.parse().with_context(|| format!("GLASSES_TARGET_FPS inválido: {v}"))?;
        }
        if let Some(v) = var("GLASSES_FRAME_QUALITY") {
            self.frame_quality =
                v.parse().with_context(|| format!("GLASSES_FRAME_QUALITY inválido: {v}"))?;
        }
        if let Some(v) = var("GLASSES_PERMISSION_TIMEOUT_SECS") {
            self.permission_timeout_secs = v
                .parse()
                .with_context(|| format!("GLASSES_PERMISSION_TIMEOUT_SECS inválido: {v}"))?;
        }
        Ok(())
    }

    pub fn manager_config(&self) -> DeviceManagerConfig {
        DeviceManagerConfig {
            stream: StreamSettings {
                target_fps: self.target_fps.max(1),
                frame_quality: self.frame_quality.clamp(1, 100),
            },
            permission_timeout: (self.permission_timeout_secs > 0)
                .then(|| Duration::from_secs(self.permission_timeout_secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn toml_overrides_only_given_fields() {
        let cfg = AppConfig::from_toml("http_port = 9000\ntarget_fps = 30\n").unwrap();
        assert_eq!(cfg.http_port, 9000);
        assert_eq!(cfg.target_fps, 30);
        assert_eq!(cfg.frame_quality, 50);
        assert_eq!(cfg.settings_path, PathBuf::from("settings.json"));
    }

    #[test]
    fn env_wins_over_file() {
        let env: HashMap<&str, &str> = [
            ("GLASSES_HTTP_PORT", "7000"),
            ("GLASSES_PERMISSION_TIMEOUT_SECS", "0"),
        ]
        .into_iter()
        .collect();

        let mut cfg = AppConfig::from_toml("http_port = 9000").unwrap();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(cfg.http_port, 7000);
        assert!(cfg.manager_config().permission_timeout.is_none());
    }

    #[test]
    fn bad_env_value_is_an_error() {
        let mut cfg = AppConfig::default();
        let err = cfg.apply_env(|k| (k == "GLASSES_TARGET_FPS").then(|| "rápido".to_string()));
        assert!(err.is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = AppConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap();
        assert_eq!(cfg.http_port, 8090);
        assert_eq!(
            cfg.manager_config().permission_timeout,
            Some(Duration::from_secs(120))
        );
    }
}
