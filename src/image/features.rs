use crate::emotion::types::{FeatureTensor, MediaKind, RawMediaInput};
use crate::image::ImageLoader;
use crate::utils::error::EmotionError;
use crate::Result;
use image::imageops::{self, FilterType};
use image::DynamicImage;

/// 图像特征提取器
///
/// 先统一为RGB，再以Catmull-Rom（双三次）插值缩放到固定的正方形尺寸，
/// 不保留宽高比。输出为 (edge, edge, 3)，取值 [0, 1]。
#[derive(Debug, Clone, Copy)]
pub struct ImageFeatureExtractor {
    edge: u32,
}

impl ImageFeatureExtractor {
    pub const FILTER: FilterType = FilterType::CatmullRom;

    pub fn new(edge: u32) -> Self {
        Self { edge: edge.max(1) }
    }

    pub fn edge(&self) -> u32 {
        self.edge
    }

    pub fn output_shape(&self) -> [usize; 3] {
        [self.edge as usize, self.edge as usize, 3]
    }

    pub fn extract(&self, input: &RawMediaInput) -> Result<FeatureTensor> {
        if input.kind != MediaKind::Image {
            return Err(EmotionError::InvalidInput(format!(
                "image extractor received {} input",
                input.kind
            )));
        }

        let image = ImageLoader::from_bytes(&input.bytes)?;
        tracing::debug!(
            "Decoded {:?} image: {}x{}",
            input.format,
            image.width(),
            image.height()
        );

        self.extract_image(&image)
    }

    pub fn extract_image(&self, image: &DynamicImage) -> Result<FeatureTensor> {
        let rgb = image.to_rgb8();
        let resized = imageops::resize(&rgb, self.edge, self.edge, Self::FILTER);
        let array = ImageLoader::to_array3(&DynamicImage::ImageRgb8(resized))?;
        Ok(FeatureTensor::Image(array))
    }
}
