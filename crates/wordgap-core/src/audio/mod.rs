//! Audio processing: clip decoding, resampling, silence and output encoding

mod decode;
mod encoder;
mod resample;

pub use decode::{decode_file, DecodedClip};
pub use encoder::{AudioEncoder, AudioFormat};
pub use resample::resample_mono;

/// Number of samples covering `seconds` at `sample_rate`
pub fn samples_for_duration(seconds: f64, sample_rate: u32) -> usize {
    (seconds * sample_rate as f64).round() as usize
}

/// Generated (not synthesized) pause of the given length
pub fn silence(seconds: f64, sample_rate: u32) -> Vec<f32> {
    vec![0.0; samples_for_duration(seconds, sample_rate)]
}
