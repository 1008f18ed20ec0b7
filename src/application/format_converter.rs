//! Conversión de frames de las gafas: I420 planar -> NV21 -> JPEG.

use image::{codecs::jpeg::JpegEncoder, ExtendedColorType, ImageFormat, RgbImage};

use crate::domain::{
    errors::{DomainError, DomainResult},
    frame::{CapturedPhoto, DisplayFrame, Frame, PhotoData},
};

/// Calidad JPEG para el preview en vivo.
pub const FRAME_JPEG_QUALITY: u8 = 50;
/// Calidad al recomprimir fotos que no llegan como JPEG.
pub const PHOTO_JPEG_QUALITY: u8 = 90;

/// Reordena los planos de croma: `[Y][U][V]` -> `[Y][V,U,V,U...]`.
/// El tamaño de salida es idéntico al de entrada.
pub fn i420_to_nv21(input: &[u8], width: u32, height: u32) -> DomainResult<Vec<u8>> {
    if input.len() != Frame::expected_len(width, height) {
        return Err(DomainError::InvalidFrameGeometry { width, height, len: input.len() });
    }

    let size = width as usize * height as usize;
    let quarter = size / 4;
    let mut output = vec![0u8; input.len()];

    // Y no cambia
    output[..size].copy_from_slice(&input[..size]);

    let u_plane = &input[size..size + quarter];
    let v_plane = &input[size + quarter..size + 2 * quarter];
    for (n, pair) in output[size..size + 2 * quarter].chunks_exact_mut(2).enumerate() {
        pair[0] = v_plane[n];
        pair[1] = u_plane[n];
    }

    Ok(output)
}

/// Pasa un buffer NV21 a RGB con los coeficientes BT.601.
pub fn nv21_to_rgb(nv21: &[u8], width: u32, height: u32) -> DomainResult<RgbImage> {
    if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
        return Err(DomainError::InvalidFrameGeometry { width, height, len: nv21.len() });
    }
    if nv21.len() != Frame::expected_len(width, height) {
        return Err(DomainError::InvalidFrameGeometry { width, height, len: nv21.len() });
    }

    let w = width as usize;
    let size = w * height as usize;
    let mut out = RgbImage::new(width, height);

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let (xu, yu) = (x as usize, y as usize);
        let luma = nv21[yu * w + xu] as f32;
        let ci = size + (yu / 2) * w + (xu / 2) * 2;
        let v = nv21[ci] as f32 - 128.0;
        let u = nv21[ci + 1] as f32 - 128.0;

        let r = (luma + 1.402 * v).clamp(0.0, 255.0) as u8;
        let g = (luma - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
        let b = (luma + 1.772 * u).clamp(0.0, 255.0) as u8;
        *pixel = image::Rgb([r, g, b]);
    }

    Ok(out)
}

pub fn encode_jpeg(rgb: &RgbImage, quality: u8) -> DomainResult<Vec<u8>> {
    let mut jpeg = Vec::new();
    let mut enc = JpegEncoder::new_with_quality(&mut jpeg, quality);
    enc.encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| DomainError::Encode(e.to_string()))?;
    Ok(jpeg)
}

/// Camino completo de un frame de vídeo hasta algo mostrable.
pub fn to_display_frame(frame: &Frame, sequence: u64, quality: u8) -> DomainResult<DisplayFrame> {
    let nv21 = i420_to_nv21(&frame.data, frame.width, frame.height)?;
    let rgb = nv21_to_rgb(&nv21, frame.width, frame.height)?;
    let jpeg = encode_jpeg(&rgb, quality)?;
    Ok(DisplayFrame { width: frame.width, height: frame.height, sequence, jpeg })
}

/// Normaliza la foto del dispositivo a JPEG. Si ya viene en JPEG se conserva tal cual.
pub fn photo_from_data(data: PhotoData) -> DomainResult<CapturedPhoto> {
    match data {
        PhotoData::Encoded(bytes) => {
            let img = image::load_from_memory(&bytes)
                .map_err(|e| DomainError::FrameDecode(e.to_string()))?;
            let (width, height) = (img.width(), img.height());
            let jpeg = match image::guess_format(&bytes) {
                Ok(ImageFormat::Jpeg) => bytes,
                _ => encode_jpeg(&img.to_rgb8(), PHOTO_JPEG_QUALITY)?,
            };
            Ok(CapturedPhoto { width, height, jpeg })
        }
        PhotoData::Rgb { width, height, pixels } => {
            let len = pixels.len();
            let rgb = RgbImage::from_raw(width, height, pixels)
                .ok_or(DomainError::InvalidFrameGeometry { width, height, len })?;
            let jpeg = encode_jpeg(&rgb, PHOTO_JPEG_QUALITY)?;
            Ok(CapturedPhoto { width, height, jpeg })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pseudo_random(len: usize, seed: u32) -> Vec<u8> {
        let mut x = seed.wrapping_mul(2654435761).max(1);
        (0..len)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                (x & 0xff) as u8
            })
            .collect()
    }

    #[test]
    fn nv21_keeps_luma_and_interleaves_v_then_u() {
        for (seed, (w, h)) in [(2u32, 2u32), (4, 2), (6, 4), (16, 8), (64, 48)].into_iter().enumerate() {
            let input = pseudo_random(Frame::expected_len(w, h), seed as u32 + 1);
            let out = i420_to_nv21(&input, w, h).unwrap();

            let size = (w * h) as usize;
            let quarter = size / 4;
            assert_eq!(out.len(), input.len());
            assert_eq!(&out[..size], &input[..size]);
            for n in 0..quarter {
                assert_eq!(out[size + 2 * n], input[size + quarter + n], "V en {n}");
                assert_eq!(out[size + 2 * n + 1], input[size + n], "U en {n}");
            }
        }
    }

    #[test]
    fn wrong_buffer_size_is_rejected() {
        let err = i420_to_nv21(&[0u8; 10], 4, 4).unwrap_err();
        assert_eq!(err, DomainError::InvalidFrameGeometry { width: 4, height: 4, len: 10 });
    }

    #[test]
    fn odd_dimensions_cannot_be_encoded() {
        let len = Frame::expected_len(3, 2);
        assert!(matches!(
            nv21_to_rgb(&vec![0u8; len], 3, 2),
            Err(DomainError::InvalidFrameGeometry { .. })
        ));
    }

    #[test]
    fn grey_frame_encodes_to_jpeg() {
        let (w, h) = (16, 16);
        let frame = Frame::new(w, h, vec![128u8; Frame::expected_len(w, h)]);
        let display = to_display_frame(&frame, 7, FRAME_JPEG_QUALITY).unwrap();

        assert_eq!((display.width, display.height, display.sequence), (16, 16, 7));
        assert_eq!(&display.jpeg[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&display.jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
    }

    #[test]
    fn neutral_chroma_gives_grey_pixels() {
        let (w, h) = (2, 2);
        let mut nv21 = vec![200u8; 4];
        nv21.extend_from_slice(&[128, 128]);
        let rgb = nv21_to_rgb(&nv21, w, h).unwrap();
        assert_eq!(rgb.get_pixel(1, 1).0, [200, 200, 200]);
    }

    #[test]
    fn raw_photo_is_compressed() {
        let photo = photo_from_data(PhotoData::Rgb { width: 4, height: 2, pixels: vec![10; 24] }).unwrap();
        assert_eq!((photo.width, photo.height), (4, 2));
        assert_eq!(image::guess_format(&photo.jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn jpeg_photo_bytes_are_kept() {
        let jpeg = encode_jpeg(&RgbImage::new(8, 8), 80).unwrap();
        let photo = photo_from_data(PhotoData::Encoded(jpeg.clone())).unwrap();
        assert_eq!(photo.jpeg, jpeg);
        assert_eq!((photo.width, photo.height), (8, 8));
    }

    #[test]
    fn garbage_photo_is_a_decode_error() {
        let err = photo_from_data(PhotoData::Encoded(vec![1, 2, 3])).unwrap_err();
        assert!(matches!(err, DomainError::FrameDecode(_)));
    }

    #[test]
    fn short_rgb_photo_is_rejected() {
        let err = photo_from_data(PhotoData::Rgb { width: 4, height: 4, pixels: vec![0; 5] }).unwrap_err();
        assert!(matches!(err, DomainError::InvalidFrameGeometry { .. }));
    }
}
