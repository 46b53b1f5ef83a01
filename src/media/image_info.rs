use std::io::Cursor;
use std::path::Path;

use image::{ColorType, ImageFormat, ImageReader};
use tracing::debug;

use crate::media::detect_mime_type;
use crate::metadata::{ImageInfo, MetadataError};

#[derive(Debug, thiserror::Error)]
pub enum ImageInfoError {
    #[error("Failed to read image file: {0}")]
    Io(#[from] std::io::Error),
    #[error("File must be an image (detected {0})")]
    NotAnImage(String),
    #[error("Unsupported image format: {0}")]
    Unsupported(String),
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

impl From<ImageInfoError> for MetadataError {
    fn from(err: ImageInfoError) -> Self {
        MetadataError::InvalidInput(err.to_string())
    }
}

/// Formats the bundled decoder can read.
const DECODABLE_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

fn format_name(format: Option<ImageFormat>) -> String {
    match format {
        Some(ImageFormat::Jpeg) => "JPEG".to_string(),
        Some(ImageFormat::Png) => "PNG".to_string(),
        Some(ImageFormat::WebP) => "WEBP".to_string(),
        Some(ImageFormat::Gif) => "GIF".to_string(),
        Some(ImageFormat::Bmp) => "BMP".to_string(),
        Some(ImageFormat::Tiff) => "TIFF".to_string(),
        Some(other) => other
            .extensions_str()
            .first()
            .map(|ext| ext.to_uppercase())
            .unwrap_or_else(|| "unknown".to_string()),
        None => "unknown".to_string(),
    }
}

/// PIL-style colour mode names, which is what listing prompts have always used.
fn color_mode(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 => "L",
        ColorType::La8 | ColorType::La16 => "LA",
        ColorType::L16 => "I;16",
        ColorType::Rgb8 | ColorType::Rgb16 => "RGB",
        ColorType::Rgba8 | ColorType::Rgba16 => "RGBA",
        ColorType::Rgb32F => "RGB",
        ColorType::Rgba32F => "RGBA",
        _ => "RGB",
    }
}

pub fn analyze_image_bytes(bytes: &[u8]) -> Result<ImageInfo, ImageInfoError> {
    let mime = detect_mime_type(bytes).unwrap_or_else(|| "unknown".to_string());
    if !mime.starts_with("image/") {
        return Err(ImageInfoError::NotAnImage(mime));
    }
    if !DECODABLE_MIME_TYPES.contains(&mime.as_str()) {
        return Err(ImageInfoError::Unsupported(mime));
    }

    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader.format();
    let decoded = reader.decode()?;

    let info = ImageInfo {
        width: decoded.width(),
        height: decoded.height(),
        format: format_name(format),
        mode: color_mode(decoded.color()).to_string(),
    };
    debug!("Analyzed image: mime={} info={:?}", mime, info);
    Ok(info)
}

pub fn analyze_image(path: &Path) -> Result<ImageInfo, ImageInfoError> {
    let bytes = std::fs::read(path)?;
    analyze_image_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
    use tempfile::TempDir;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, format).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn reads_jpeg_dimensions_and_mode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.jpg");
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 300, image::Rgb([73, 109, 137])));
        std::fs::write(&path, encode(image, ImageFormat::Jpeg)).unwrap();

        let info = analyze_image(&path).unwrap();
        assert_eq!(
            info,
            ImageInfo {
                width: 400,
                height: 300,
                format: "JPEG".to_string(),
                mode: "RGB".to_string(),
            }
        );
    }

    #[test]
    fn reads_png_alpha_and_grayscale_modes() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(8, 4));
        let info = analyze_image_bytes(&encode(rgba, ImageFormat::Png)).unwrap();
        assert_eq!(info.format, "PNG");
        assert_eq!(info.mode, "RGBA");
        assert_eq!((info.width, info.height), (8, 4));

        let gray = DynamicImage::ImageLuma8(GrayImage::new(3, 3));
        let info = analyze_image_bytes(&encode(gray, ImageFormat::Png)).unwrap();
        assert_eq!(info.mode, "L");
    }

    #[test]
    fn rejects_files_that_are_not_images() {
        let err = analyze_image_bytes(b"%PDF-1.4 not a picture").unwrap_err();
        assert!(matches!(err, ImageInfoError::NotAnImage(_)));
        assert!(err.to_string().contains("File must be an image"));

        let err: MetadataError = analyze_image_bytes(b"plain text").unwrap_err().into();
        assert!(matches!(err, MetadataError::InvalidInput(_)));
    }

    #[test]
    fn heic_files_are_rejected_before_decoding() {
        let mut heic = vec![0, 0, 0, 24];
        heic.extend_from_slice(b"ftypheic");
        heic.extend_from_slice(&[0, 0, 0, 0]);
        heic.extend_from_slice(b"mif1heic");
        heic.extend_from_slice(&[0; 32]);

        let err = analyze_image_bytes(&heic).unwrap_err();
        assert!(
            matches!(err, ImageInfoError::Unsupported(_) | ImageInfoError::NotAnImage(_)),
            "{err}"
        );
        let err: MetadataError = err.into();
        assert!(matches!(err, MetadataError::InvalidInput(_)));
    }

    #[test]
    fn gif_is_an_image_but_not_decodable_here() {
        let err = analyze_image_bytes(b"GIF89a\x01\x00\x01\x00\x00\x00\x00;").unwrap_err();
        assert!(matches!(err, ImageInfoError::Unsupported(ref mime) if mime == "image/gif"));
        assert!(err.to_string().contains("Unsupported image format"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let err = analyze_image(&dir.path().join("absent.png")).unwrap_err();
        assert!(matches!(err, ImageInfoError::Io(_)));
    }
}
