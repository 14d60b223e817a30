pub mod features;
pub mod loader;

pub use features::ImageFeatureExtractor;
pub use loader::ImageLoader;
