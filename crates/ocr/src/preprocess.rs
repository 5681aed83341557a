use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use std::io::Cursor;
use thiserror::Error;

/// Tesseract reads table text best around 300 DPI; a scanned A4 page at that
/// resolution is roughly 2500 px wide.
const MAX_EDGE: u32 = 2800;
const MIN_EDGE: u32 = 1200;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Process raw image bytes (JPEG / PNG / TIFF / …) and return normalized PNG bytes.
pub fn prepare_for_ocr_from_bytes(data: &[u8]) -> Result<Vec<u8>, PreprocessError> {
    let img = image::load_from_memory(data)?;
    encode_as_png(normalize(img))
}

/// Rescale into OCR range, grayscale, contrast stretch.
fn normalize(img: DynamicImage) -> DynamicImage {
    let longest = img.width().max(img.height());
    let img = if longest > MAX_EDGE {
        img.resize(MAX_EDGE, MAX_EDGE, image::imageops::FilterType::Lanczos3)
    } else if longest > 0 && longest < MIN_EDGE {
        // Low-resolution phone captures: small digits merge without upscaling.
        let factor = (MIN_EDGE / longest).max(1) + 1;
        img.resize(
            img.width() * factor,
            img.height() * factor,
            image::imageops::FilterType::CatmullRom,
        )
    } else {
        img
    };

    let gray: GrayImage = img.to_luma8();
    DynamicImage::ImageLuma8(stretch_contrast(gray))
}

fn stretch_contrast(gray: GrayImage) -> GrayImage {
    let (min_px, max_px) = gray
        .pixels()
        .fold((255u8, 0u8), |(mn, mx), p| (mn.min(p[0]), mx.max(p[0])));

    if max_px == min_px {
        return gray;
    }

    let range = (max_px - min_px) as u32;
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let p = gray.get_pixel(x, y)[0];
        Luma([((p - min_px) as u32 * 255 / range) as u8])
    })
}

fn encode_as_png(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_gray(width: u32, height: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(ImageBuffer::from_fn(width, height, |_, _| Luma([value])))
    }

    #[test]
    fn uniform_image_is_left_alone() {
        let result = normalize(solid_gray(1500, 10, 128));
        assert_eq!(result.width(), 1500);
        assert!(result.to_luma8().pixels().all(|p| p[0] == 128));
    }

    #[test]
    fn gradient_stretches_to_full_range() {
        let img: GrayImage = ImageBuffer::from_fn(1300, 1, |x, _| Luma([(40 + x * 100 / 1300) as u8]));
        let gray = normalize(DynamicImage::ImageLuma8(img)).to_luma8();
        assert_eq!(gray.pixels().map(|p| p[0]).min().unwrap(), 0);
        assert_eq!(gray.pixels().map(|p| p[0]).max().unwrap(), 255);
    }

    #[test]
    fn small_capture_is_upscaled() {
        let result = normalize(solid_gray(400, 300, 200));
        assert!(result.width() >= MIN_EDGE);
        assert_eq!(result.width() * 3, result.height() * 4);
    }

    #[test]
    fn large_scan_is_downscaled() {
        let result = normalize(solid_gray(3000, 3000, 200));
        assert!(result.width() <= MAX_EDGE && result.height() <= MAX_EDGE);
    }

    #[test]
    fn prepare_from_bytes_produces_png() {
        let mut jpeg = Vec::new();
        solid_gray(8, 8, 100)
            .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();
        let result = prepare_for_ocr_from_bytes(&jpeg).unwrap();
        assert_eq!(&result[..4], b"\x89PNG");
    }

    #[test]
    fn garbage_bytes_fail_to_load() {
        assert!(matches!(prepare_for_ocr_from_bytes(b"not an image"), Err(PreprocessError::Load(_))));
    }
}
