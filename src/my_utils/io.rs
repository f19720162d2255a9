use data_encoding::BASE64_MIME;
use image::DynamicImage;

use crate::error::DetectionResult;

/// 原始字节解码成图片
pub fn decode_image(bytes: &[u8]) -> DetectionResult<DynamicImage> {
    let image = image::load_from_memory(bytes)?;
    Ok(image)
}

/// base64 字符串解码成图片，兼容带 data:image/...;base64, 前缀的写法
pub fn decode_base64_image(base64_image: &str) -> DetectionResult<DynamicImage> {
    let payload = match base64_image.find(',') {
        Some(i) => &base64_image[i + 1..],
        None => base64_image,
    };
    let bytes = BASE64_MIME.decode(payload.trim().as_bytes())?;
    decode_image(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectionError;
    use image::{ImageFormat, RgbImage};
    use image_base64_wasm::vec_to_base64;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(7, 5, image::Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn test_decode_png() {
        let decoded = decode_image(&png_bytes()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (7, 5));
    }

    #[test]
    fn test_decode_base64_with_prefix() {
        let encoded = vec_to_base64(png_bytes());
        let decoded = decode_base64_image(&encoded).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (7, 5));
        let payload = &encoded[encoded.find(',').map_or(0, |i| i + 1)..];
        assert!(decode_base64_image(payload).is_ok());
    }

    #[test]
    fn test_reject_bad_base64() {
        assert!(matches!(decode_base64_image("data:image/png;base64,@@@@"), Err(DetectionError::Base64(_))));
        assert!(matches!(decode_base64_image("abc"), Err(DetectionError::Base64(_))));
        // 字母表和填充都合法，但末尾多余的 bit 不为0
        assert!(matches!(decode_base64_image("AB=="), Err(DetectionError::Base64(_))));
        assert!(matches!(decode_base64_image("data:image/png;base64,AAB="), Err(DetectionError::Base64(_))));
    }

    #[test]
    fn test_valid_base64_but_not_an_image() {
        assert!(matches!(decode_base64_image("AA=="), Err(DetectionError::Decode(_))));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(decode_image(b"not an image"), Err(DetectionError::Decode(_))));
        assert!(matches!(decode_image(&[]), Err(DetectionError::Decode(_))));
    }
}
