use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("No encontrado: {0}")]
    NotFound(String),
    #[error("Entrada inválida: {0}")]
    InvalidInput(String),
    #[error("Error de operación: {0}")]
    OperationFailed(String),

    /// El usuario (o el dispositivo) rechazó el permiso de cámara.
    #[error("Permiso denegado: {0}")]
    PermissionDenied(String),
    /// No se pudo consultar el estado del permiso.
    #[error("Error comprobando permiso: {0}")]
    PermissionCheck(String),
    /// El dispositivo informó de un fallo con la sesión abierta.
    #[error("Error de sesión: {0}")]
    Session(String),
    /// Fallo al capturar una foto; la sesión sigue viva.
    #[error("Fallo en la captura de foto: {0}")]
    Capture(String),
    #[error("Frame ilegible: {0}")]
    FrameDecode(String),
    #[error("Geometría de frame inválida: {width}x{height} con {len} bytes")]
    InvalidFrameGeometry { width: u32, height: u32, len: usize },
    #[error("Error codificando imagen: {0}")]
    Encode(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
