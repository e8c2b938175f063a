//! Sample-rate conversion so clips from any backend share one output rate

use rubato::{FftFixedIn, Resampler};

use crate::error::{Error, Result};

const CHUNK: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Resample mono PCM from `from` Hz to `to` Hz.
///
/// The result has exactly `round(len * to / from)` samples with the
/// resampler's delay removed, so clip durations survive conversion.
pub fn resample_mono(input: &[f32], from: u32, to: u32) -> Result<Vec<f32>> {
    if from == 0 || to == 0 {
        return Err(Error::AudioError(format!(
            "cannot resample from {} Hz to {} Hz",
            from, to
        )));
    }
    if from == to || input.is_empty() {
        return Ok(input.to_vec());
    }

    let mut resampler = FftFixedIn::<f32>::new(from as usize, to as usize, CHUNK, SUB_CHUNKS, 1)
        .map_err(|e| Error::AudioError(format!("resampler setup failed: {}", e)))?;

    let target = ((input.len() as u64 * to as u64 + from as u64 / 2) / from as u64) as usize;
    let delay = resampler.output_delay();
    let mut out = Vec::with_capacity(target + delay + CHUNK);

    // Trailing zero blocks flush the filter until the delayed tail is out
    let mut pos = 0;
    while out.len() < target + delay {
        let mut block = vec![0.0f32; resampler.input_frames_next()];
        if pos < input.len() {
            let end = (pos + block.len()).min(input.len());
            block[..end - pos].copy_from_slice(&input[pos..end]);
            pos = end;
        }

        let frames = resampler
            .process(&[block], None)
            .map_err(|e| Error::AudioError(format!("resampling failed: {}", e)))?;
        out.extend_from_slice(&frames[0]);
    }

    out.drain(..delay);
    out.truncate(target);
    Ok(out)
}
