use serde::{Deserialize, Serialize};

/// Frame crudo tal y como llega de las gafas: I420 planar
/// `[Y: w*h][U: w*h/4][V: w*h/4]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self { width, height, data }
    }

    /// Tamaño esperado de un buffer 4:2:0 para estas dimensiones.
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3 / 2
    }
}

/// Frame listo para mostrar (JPEG). Solo se conserva el más reciente.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFrame {
    pub width: u32,
    pub height: u32,
    pub sequence: u64,
    #[serde(skip)]
    pub jpeg: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedPhoto {
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub jpeg: Vec<u8>,
}

/// Foto tal y como la entrega el dispositivo.
#[derive(Debug, Clone)]
pub enum PhotoData {
    /// Imagen ya comprimida (JPEG, PNG...).
    Encoded(Vec<u8>),
    /// Píxeles RGB8 sin comprimir.
    Rgb { width: u32, height: u32, pixels: Vec<u8> },
}
