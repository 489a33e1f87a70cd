//! Sample-rate conversion for capture streams.

/// Resample audio using linear interpolation.
///
/// Good enough for speech: the transcription engine is tolerant of the mild
/// high-frequency rolloff, and this avoids pulling in a DSP dependency.
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let output_len = (samples.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let source_pos = i as f64 * ratio;
        let index = source_pos as usize;
        let frac = (source_pos - index as f64) as f32;

        let sample = if index + 1 < samples.len() {
            samples[index] * (1.0 - frac) + samples[index + 1] * frac
        } else {
            samples[samples.len() - 1]
        };
        output.push(sample);
    }

    output
}

/// Mix multi-channel audio down to mono by averaging each frame.
pub fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
