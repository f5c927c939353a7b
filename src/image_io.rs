//! # Image Input Module
//!
//! Loads answer sheet photos from disk or memory with basic safety checks.
//!
//! ## Supported Image Formats
//!
//! - PNG (Portable Network Graphics)
//! - JPEG/JPG (Joint Photographic Experts Group)
//! - BMP (Bitmap)
//! - TIFF/TIF (Tagged Image File Format)
//!
//! The format is detected from the file header with `image::guess_format`,
//! never from the file extension.

use image::{DynamicImage, ImageFormat};
use std::path::Path;
use tracing::{debug, info};

use crate::errors::error_logging;
use crate::scan_config::ImageIoConfig;
use crate::scan_errors::ScanError;

/// Returns true for the formats the scanner accepts.
pub fn is_supported_format(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp | ImageFormat::Tiff
    )
}

/// Validate an image path: it must name an existing, non-empty regular file
/// no larger than `max_file_size`. Returns the file size in bytes.
pub fn validate_image_path(path: &Path, config: &ImageIoConfig) -> Result<u64, ScanError> {
    if !path.exists() {
        return Err(ScanError::ImageLoad(format!(
            "file does not exist ({})",
            path.display()
        )));
    }

    if !path.is_file() {
        return Err(ScanError::ImageLoad(format!(
            "path is not a file ({})",
            path.display()
        )));
    }

    let file_size = path
        .metadata()
        .map_err(|e| {
            ScanError::ImageLoad(format!(
                "cannot read file metadata ({}) - {}",
                path.display(),
                e
            ))
        })?
        .len();

    if file_size == 0 {
        return Err(ScanError::ImageLoad(format!(
            "file is empty ({})",
            path.display()
        )));
    }
    if file_size > config.max_file_size {
        return Err(ScanError::ImageLoad(format!(
            "file too large ({} bytes, maximum allowed: {} bytes)",
            file_size, config.max_file_size
        )));
    }

    Ok(file_size)
}

/// Detects the image format from the leading bytes of `bytes`.
pub fn detect_format(bytes: &[u8], config: &ImageIoConfig) -> Result<ImageFormat, ScanError> {
    if bytes.len() < config.min_format_bytes {
        return Err(ScanError::ImageLoad(format!(
            "not enough data to determine the image format (read {} bytes, need at least {})",
            bytes.len(),
            config.min_format_bytes
        )));
    }

    let header = &bytes[..bytes.len().min(config.buffer_size)];
    let format = image::guess_format(header)
        .map_err(|e| ScanError::ImageLoad(format!("unrecognized image format - {}", e)))?;

    if !is_supported_format(format) {
        return Err(ScanError::ImageLoad(format!(
            "unsupported image format {:?}",
            format
        )));
    }

    debug!("Detected image format {format:?}");
    Ok(format)
}

/// Decodes an in-memory image after checking its size and format.
///
/// # Examples
///
/// ```
/// use answer_sheet_scanner::image_io::decode_image;
/// use answer_sheet_scanner::scan_config::ImageIoConfig;
/// use image::{GrayImage, ImageFormat, Luma};
/// use std::io::Cursor;
///
/// let mut png = Vec::new();
/// GrayImage::from_pixel(8, 6, Luma([200]))
///     .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
///     .unwrap();
///
/// let img = decode_image(&png, &ImageIoConfig::default()).unwrap();
/// assert_eq!((img.width(), img.height()), (8, 6));
/// ```
pub fn decode_image(bytes: &[u8], config: &ImageIoConfig) -> Result<DynamicImage, ScanError> {
    if bytes.len() as u64 > config.max_file_size {
        return Err(ScanError::ImageLoad(format!(
            "image data too large ({} bytes, maximum allowed: {} bytes)",
            bytes.len(),
            config.max_file_size
        )));
    }

    let format = detect_format(bytes, config)?;
    let image = image::load_from_memory_with_format(bytes, format)?;
    Ok(image)
}

/// Validates, reads and decodes the image at `path`.
pub fn load_image(path: &Path, config: &ImageIoConfig) -> Result<DynamicImage, ScanError> {
    let start_time = std::time::Instant::now();

    let file_size = validate_image_path(path, config)?;
    let bytes = std::fs::read(path).map_err(|e| {
        error_logging::log_filesystem_error(
            &e,
            "read_image",
            path.to_str(),
            Some(file_size),
        );
        ScanError::ImageLoad(format!("cannot read {} - {}", path.display(), e))
    })?;

    let image = decode_image(&bytes, config)?;

    info!(
        "Loaded image {} ({}x{}, {} bytes) in {}ms",
        path.display(),
        image.width(),
        image.height(),
        file_size,
        start_time.elapsed().as_millis()
    );

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_formats() {
        assert!(is_supported_format(ImageFormat::Png));
        assert!(is_supported_format(ImageFormat::Jpeg));
        assert!(is_supported_format(ImageFormat::Bmp));
        assert!(is_supported_format(ImageFormat::Tiff));
        assert!(!is_supported_format(ImageFormat::Gif));
    }

    #[test]
    fn test_detect_format_needs_minimum_bytes() {
        let config = ImageIoConfig::default();
        let result = detect_format(&[0x89, b'P', b'N'], &config);
        assert!(matches!(result, Err(ScanError::ImageLoad(_))));
    }

    #[test]
    fn test_detect_format_reads_png_signature() {
        let config = ImageIoConfig::default();
        let header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(detect_format(&header, &config), Ok(ImageFormat::Png));
    }

    #[test]
    fn test_detect_format_rejects_gif() {
        let config = ImageIoConfig::default();
        let result = detect_format(b"GIF89a\x01\x00\x01\x00\x00\x00", &config);
        assert!(matches!(result, Err(ScanError::ImageLoad(msg)) if msg.contains("unsupported")));
    }

    #[test]
    fn test_missing_file_is_image_load_error() {
        let result = validate_image_path(
            Path::new("/definitely/not/here.png"),
            &ImageIoConfig::default(),
        );
        assert!(matches!(result, Err(ScanError::ImageLoad(msg)) if msg.contains("does not exist")));
    }

    #[test]
    fn test_decode_rejects_oversized_data() {
        let config = ImageIoConfig {
            max_file_size: 4,
            ..ImageIoConfig::default()
        };
        let result = decode_image(&[0u8; 16], &config);
        assert!(matches!(result, Err(ScanError::ImageLoad(msg)) if msg.contains("too large")));
    }
}
