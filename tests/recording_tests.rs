// Tests for the raw-recording buffer and its seal-once artifact semantics.

use anyhow::Result;
use legado_voice::{AudioFrame, RecordingBuffer};
use std::time::Duration;

fn frame(samples: Vec<i16>, timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples,
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
    }
}

#[test]
fn test_duration_tracks_appended_samples() {
    let mut buffer = RecordingBuffer::new(16000, 1);

    // 10 frames of 100ms each = 1 second
    for i in 0..10 {
        buffer.append(&frame(vec![0i16; 1600], i * 100));
    }

    assert_eq!(buffer.duration(), Duration::from_secs(1));
}

#[test]
fn test_seal_produces_readable_wav() -> Result<()> {
    let mut buffer = RecordingBuffer::new(16000, 1);

    for i in 0..5 {
        buffer.append(&frame(vec![100i16; 1600], i * 100));
    }

    let artifact = buffer.seal()?;

    assert_eq!(artifact.mime_type, "audio/wav");
    assert_eq!(artifact.duration, Duration::from_millis(500));
    assert!(!artifact.bytes.is_empty());

    // Round-trip through hound to verify the payload is a real WAV file
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("session.wav");
    std::fs::write(&path, &artifact.bytes)?;

    let reader = hound::WavReader::open(&path)?;
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len(), 5 * 1600);

    Ok(())
}

#[test]
fn test_seal_is_idempotent() -> Result<()> {
    let mut buffer = RecordingBuffer::new(16000, 1);
    buffer.append(&frame(vec![7i16; 1600], 0));

    let first = buffer.seal()?;
    let second = buffer.seal()?;

    assert_eq!(first.bytes, second.bytes);
    assert_eq!(first.duration, second.duration);
    assert!(buffer.is_sealed());

    Ok(())
}

#[test]
fn test_appends_after_sealing_are_dropped() -> Result<()> {
    let mut buffer = RecordingBuffer::new(16000, 1);
    buffer.append(&frame(vec![1i16; 1600], 0));

    let sealed = buffer.seal()?;

    buffer.append(&frame(vec![2i16; 1600], 100));

    assert_eq!(buffer.duration(), Duration::from_millis(100));
    assert_eq!(buffer.seal()?.bytes, sealed.bytes);

    Ok(())
}

#[test]
fn test_recording_format_follows_first_frame() -> Result<()> {
    // Buffer configured for 16kHz but the device delivers 48kHz stereo;
    // the raw recording preserves what was actually captured.
    let mut buffer = RecordingBuffer::new(16000, 1);
    buffer.append(&AudioFrame {
        samples: vec![0i16; 9600],
        sample_rate: 48000,
        channels: 2,
        timestamp_ms: 0,
    });

    let artifact = buffer.seal()?;
    assert_eq!(artifact.sample_rate, 48000);
    assert_eq!(artifact.channels, 2);
    assert_eq!(artifact.duration, Duration::from_millis(100));

    Ok(())
}

#[test]
fn test_empty_buffer_seals_cleanly() -> Result<()> {
    let mut buffer = RecordingBuffer::new(16000, 1);
    let artifact = buffer.seal()?;

    assert_eq!(artifact.duration, Duration::ZERO);
    assert!(!artifact.bytes.is_empty()); // header-only WAV

    Ok(())
}
