//! Non-realtime bounce: run the whole scheduling + synthesis pass against a
//! zero-based clock into a stereo buffer, then encode 16-bit PCM WAV bytes.

use std::io::Cursor;

use fastrand::Rng;

use crate::composition::Composition;
use crate::error::EngineError;
use crate::mapping::EngineConfig;
use crate::scheduler::schedule_all;
use crate::voice::Mixer;

/// Seconds appended after the last drawn pixel so releases and delay
/// echoes are not cut off.
const RENDER_TAIL: f32 = 1.5;

/// Render the composition into a complete WAV file (stereo, 16-bit PCM).
/// Runs faster than realtime; blocking from the caller's perspective.
pub fn render_to_wav(
    composition: &Composition,
    config: &EngineConfig,
    rng: &mut Rng,
) -> Result<Vec<u8>, EngineError> {
    if composition.is_empty() {
        return Err(EngineError::EmptyComposition);
    }

    let extent = (composition.max_x() / config.pixels_per_second).max(1.0) + RENDER_TAIL;
    let frames = (extent * config.sample_rate as f32) as usize;

    let events = schedule_all(composition, 0.0, config, rng);
    let mut mixer = Mixer::from_events(&events, config.sample_rate, config, rng);

    let mut buffer = Vec::with_capacity(frames * 2);
    for _ in 0..frames {
        let (left, right) = mixer.next_frame();
        buffer.push(left);
        buffer.push(right);
    }

    // Only touch the signal if it actually clips
    let peak = buffer.iter().fold(0.0f32, |max, s| max.max(s.abs()));
    if peak > 1.0 {
        for sample in buffer.iter_mut() {
            *sample /= peak;
        }
    }

    encode_wav(&buffer, 2, config.sample_rate)
}

/// Encode interleaved float samples as a canonical 44-byte-header WAV.
pub fn encode_wav(samples: &[f32], channels: u16, sample_rate: u32) -> Result<Vec<u8>, EngineError> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)
        .map_err(|e| EngineError::Render(e.to_string()))?;
    for &sample in samples {
        writer
            .write_sample(pcm16(sample))
            .map_err(|e| EngineError::Render(e.to_string()))?;
    }
    writer
        .finalize()
        .map_err(|e| EngineError::Render(e.to_string()))?;

    Ok(cursor.into_inner())
}

/// Float to 16-bit conversion: clamp, scale asymmetrically so -1.0 lands on
/// -32768 and 1.0 on 32767, truncate.
#[inline]
fn pcm16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32768.0) as i16
    } else {
        (clamped * 32767.0) as i16
    }
}
