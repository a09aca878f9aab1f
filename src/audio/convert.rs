//! Sample-format conversion between the device stream and the wire format.

use super::backend::AudioFrame;

/// Mix interleaved multi-channel samples down to mono by averaging.
pub fn mix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    samples
        .chunks(channels)
        .map(|chunk| {
            let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Resample mono PCM with linear interpolation. Handles non-integer ratios
/// in both directions; identity when rates match.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = src_pos.fract();

        let sample = if src_idx + 1 < samples.len() {
            let s0 = samples[src_idx] as f64;
            let s1 = samples[src_idx + 1] as f64;
            (s0 + (s1 - s0) * frac) as i16
        } else if src_idx < samples.len() {
            samples[src_idx]
        } else {
            0
        };
        output.push(sample);
    }
    output
}

/// Encode samples as little-endian PCM16 bytes.
pub fn pcm16_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Convert a raw device frame into the wire format: mono, target rate,
/// little-endian PCM16 bytes.
pub fn encode_wire_frame(frame: &AudioFrame, target_sample_rate: u32) -> Vec<u8> {
    let mono = mix_to_mono(&frame.samples, frame.channels);
    let resampled = resample(&mono, frame.sample_rate, target_sample_rate);
    pcm16_bytes(&resampled)
}
