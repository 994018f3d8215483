use image::codecs::jpeg::JpegEncoder;

/// JPEG quality used for every stored photo.
pub const PHOTO_JPEG_QUALITY: u8 = 85;

#[derive(Debug, thiserror::Error)]
pub enum PhotoError {
    #[error("unreadable image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

/// Decode an uploaded JPEG or PNG, flatten it to 8-bit RGB, and re-encode it as JPEG.
pub fn reencode_as_jpeg(bytes: &[u8]) -> Result<Vec<u8>, PhotoError> {
    let decoded = image::load_from_memory(bytes).map_err(PhotoError::Decode)?;
    let rgb = decoded.to_rgb8();

    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, PHOTO_JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(PhotoError::Encode)?;
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ColorType, DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn rgba_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 128]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("png encodes");
        bytes
    }

    #[test]
    fn transparent_png_becomes_rgb_jpeg() {
        let encoded = reencode_as_jpeg(&rgba_png(12, 8)).expect("re-encodes");

        assert_eq!(
            image::guess_format(&encoded).expect("format detected"),
            ImageFormat::Jpeg
        );
        let decoded = image::load_from_memory(&encoded).expect("jpeg decodes");
        assert_eq!(decoded.color(), ColorType::Rgb8);
        assert_eq!((decoded.width(), decoded.height()), (12, 8));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let result = reencode_as_jpeg(b"definitely not an image");
        assert!(matches!(result, Err(PhotoError::Decode(_))));
    }
}
