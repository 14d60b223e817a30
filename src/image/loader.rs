use crate::utils::error::EmotionError;
use crate::Result;
use base64::Engine;
use image::{DynamicImage, ImageFormat};
use ndarray::Array3;

pub struct ImageLoader;

impl ImageLoader {
    /// 解码base64字符串（兼容 data:xxx;base64, 前缀）
    pub fn decode_base64(base64_data: &str, max_bytes: usize) -> Result<Vec<u8>> {
        let base64_clean = if base64_data.starts_with("data:") {
            base64_data.split(',').nth(1).unwrap_or(base64_data)
        } else {
            base64_data
        };

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(base64_clean.trim())
            .map_err(EmotionError::Base64)?;

        if bytes.len() > max_bytes {
            return Err(EmotionError::FileTooLarge(bytes.len(), max_bytes));
        }

        Ok(bytes)
    }

    /// 从字节流加载图像
    pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        let format = Self::detect_format(bytes)
            .ok_or_else(|| EmotionError::Decode("unrecognized image data".to_string()))?;

        if !Self::is_supported_format(format) {
            return Err(EmotionError::UnsupportedFormat(format!("{:?}", format)));
        }

        image::load_from_memory_with_format(bytes, format)
            .map_err(|e| EmotionError::Decode(format!("{:?} image: {}", format, e)))
    }

    /// 检测图像格式
    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    /// 验证图像格式是否支持
    pub fn is_supported_format(format: ImageFormat) -> bool {
        matches!(format, ImageFormat::Png | ImageFormat::Jpeg)
    }

    /// 转换为ndarray::Array3<f32> (HWC格式)，像素值缩放到 [0, 1]
    ///
    /// 任何颜色模式都先统一为RGB：丢弃alpha，灰度复制为三通道。
    pub fn to_array3(image: &DynamicImage) -> Result<Array3<f32>> {
        let rgb_image = image.to_rgb8();
        let (width, height) = rgb_image.dimensions();
        let data: Vec<f32> = rgb_image
            .into_raw()
            .into_iter()
            .map(|v| v as f32 / 255.0)
            .collect();

        Array3::from_shape_vec((height as usize, width as usize, 3), data)
            .map_err(|e| EmotionError::Internal(format!("Failed to build image tensor: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, format).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn decodes_png_and_jpeg() {
        let image = DynamicImage::ImageRgb8(image::RgbImage::new(8, 4));
        let png = encode(image.clone(), ImageFormat::Png);
        let jpeg = encode(image, ImageFormat::Jpeg);

        assert_eq!(ImageLoader::detect_format(&png), Some(ImageFormat::Png));
        assert_eq!(ImageLoader::detect_format(&jpeg), Some(ImageFormat::Jpeg));
        assert_eq!(ImageLoader::from_bytes(&png).unwrap().width(), 8);
        assert_eq!(ImageLoader::from_bytes(&jpeg).unwrap().height(), 4);
    }

    #[test]
    fn truncated_png_is_a_decode_error() {
        let png = encode(DynamicImage::ImageRgb8(image::RgbImage::new(32, 32)), ImageFormat::Png);
        let err = ImageLoader::from_bytes(&png[..20]).unwrap_err();
        assert!(matches!(err, EmotionError::Decode(_)));
    }

    #[test]
    fn bmp_is_not_accepted() {
        let mut bmp = b"BM".to_vec();
        bmp.extend_from_slice(&[0u8; 64]);
        let err = ImageLoader::from_bytes(&bmp).unwrap_err();
        assert!(matches!(err, EmotionError::UnsupportedFormat(_)));
    }

    #[test]
    fn grayscale_expands_to_three_channels() {
        let gray = GrayImage::from_pixel(2, 3, Luma([255]));
        let array = ImageLoader::to_array3(&DynamicImage::ImageLuma8(gray)).unwrap();

        assert_eq!(array.dim(), (3, 2, 3));
        assert!(array.iter().all(|&v| (v - 1.0).abs() < f32::EPSILON));
    }

    #[test]
    fn alpha_is_discarded() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([51, 102, 255, 0]));
        let array = ImageLoader::to_array3(&DynamicImage::ImageRgba8(rgba)).unwrap();

        assert_eq!(array.dim(), (2, 2, 3));
        assert!((array[[0, 0, 0]] - 0.2).abs() < 1e-6);
        assert!((array[[1, 1, 2]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn base64_accepts_data_url_prefix() {
        let raw = base64::engine::general_purpose::STANDARD.encode(b"hello");
        let with_prefix = format!("data:image/png;base64,{}", raw);

        assert_eq!(ImageLoader::decode_base64(&raw, 1024).unwrap(), b"hello");
        assert_eq!(ImageLoader::decode_base64(&with_prefix, 1024).unwrap(), b"hello");

        let err = ImageLoader::decode_base64(&raw, 2).unwrap_err();
        assert!(matches!(err, EmotionError::FileTooLarge(5, 2)));
    }
}
