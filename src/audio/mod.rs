pub mod decoder;
pub mod features;
pub mod mfcc;
pub mod resample;

pub use decoder::{AudioDecoder, DecodedAudio};
pub use features::AudioFeatureExtractor;
pub use mfcc::{Mfcc, MfccConfig};
