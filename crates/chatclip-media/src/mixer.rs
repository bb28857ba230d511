//! Mixing cues into the soundtrack.

use std::path::Path;

use chatclip_models::Timeline;
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::debug;

use crate::error::MediaResult;
use crate::sounds::{CueBank, SAMPLE_RATE};

/// Mix every audio event of `timeline` into a mono track spanning the whole
/// clip. Cues running past the end are cut off; the sum is hard-clipped to
/// [-1, 1].
pub fn mix_timeline(timeline: &Timeline, bank: &CueBank) -> Vec<f32> {
    let total_samples = (timeline.total_duration() * SAMPLE_RATE as f64).ceil() as usize;
    let mut track = vec![0.0_f32; total_samples];
    let mut placed = 0usize;

    for event in timeline.events() {
        let Some((cue, gain)) = bank.cue_for(event.kind) else {
            continue;
        };

        let start = (event.time * SAMPLE_RATE as f64).round() as usize;
        if start >= total_samples {
            continue;
        }

        for (slot, sample) in track[start..].iter_mut().zip(cue) {
            *slot += sample * gain;
        }
        placed += 1;
    }

    for sample in &mut track {
        *sample = sample.clamp(-1.0, 1.0);
    }

    debug!(cues = placed, samples = total_samples, "Mixed soundtrack");
    track
}

/// Write a mono track as 16-bit PCM WAV.
pub fn write_wav(path: &Path, samples: &[f32]) -> MediaResult<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for sample in samples {
        writer.write_sample((sample * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;

    Ok(())
}
