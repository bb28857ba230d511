//! Synthesized sound cues.
//!
//! Cues are generated procedurally so no audio assets ship with the binary.
//! The key click carries a little noise; it comes from a seeded generator so
//! identical inputs render identical audio.

use std::f64::consts::PI;

use chatclip_models::EventKind;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Output sample rate in Hz.
pub const SAMPLE_RATE: u32 = 44_100;

/// Default seed for click noise.
pub const DEFAULT_NOISE_SEED: u64 = 0x0C1C_C11C;

const KEY_CLICK_SECS: f64 = 0.008;
const SEND_CHIME_SECS: f64 = 0.3;
const RECEIVE_CHIME_SECS: f64 = 0.2;

/// Mix gain per cue kind.
pub const KEY_CLICK_GAIN: f32 = 0.3;
pub const SEND_CHIME_GAIN: f32 = 0.5;
pub const RECEIVE_CHIME_GAIN: f32 = 0.4;

/// Pre-rendered mono samples for every cue kind.
#[derive(Debug, Clone)]
pub struct CueBank {
    pub key_click: Vec<f32>,
    pub send_chime: Vec<f32>,
    pub receive_chime: Vec<f32>,
}

impl CueBank {
    /// Synthesize all cues.
    pub fn synthesize(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self {
            key_click: key_click(&mut rng),
            send_chime: send_chime(),
            receive_chime: receive_chime(),
        }
    }

    /// Samples and mix gain for an event, if it makes a sound.
    pub fn cue_for(&self, kind: EventKind) -> Option<(&[f32], f32)> {
        match kind {
            EventKind::KeyClick => Some((&self.key_click, KEY_CLICK_GAIN)),
            EventKind::SendChime => Some((&self.send_chime, SEND_CHIME_GAIN)),
            EventKind::ReceiveChime => Some((&self.receive_chime, RECEIVE_CHIME_GAIN)),
            _ => None,
        }
    }
}

impl Default for CueBank {
    fn default() -> Self {
        Self::synthesize(DEFAULT_NOISE_SEED)
    }
}

fn sample_count(secs: f64) -> usize {
    (SAMPLE_RATE as f64 * secs).round() as usize
}

fn sample_time(i: usize) -> f64 {
    i as f64 / SAMPLE_RATE as f64
}

/// 8 ms click: a sine wobbling between 600 and 1000 Hz under a fast decay,
/// plus gaussian noise.
fn key_click(rng: &mut StdRng) -> Vec<f32> {
    (0..sample_count(KEY_CLICK_SECS))
        .map(|i| {
            let t = sample_time(i);
            let frequency = 800.0 + 200.0 * (2.0 * PI * 10.0 * t).sin();
            let envelope = (-t * 200.0).exp();
            let noise = gaussian(rng) * 0.1;
            let value = ((2.0 * PI * frequency * t).sin() + noise) * envelope;
            value.clamp(-1.0, 1.0) as f32
        })
        .collect()
}

/// Two-tone C5 + E5 chime with a soft attack.
fn send_chime() -> Vec<f32> {
    (0..sample_count(SEND_CHIME_SECS))
        .map(|i| {
            let t = sample_time(i);
            let tone = 0.6 * (2.0 * PI * 523.25 * t).sin() + 0.4 * (2.0 * PI * 659.25 * t).sin();
            let envelope = (-t * 3.0).exp() * (1.0 - (-t * 20.0).exp());
            (tone * envelope).clamp(-1.0, 1.0) as f32
        })
        .collect()
}

/// Quiet A4 notification.
fn receive_chime() -> Vec<f32> {
    (0..sample_count(RECEIVE_CHIME_SECS))
        .map(|i| {
            let t = sample_time(i);
            let envelope = (-t * 5.0).exp() * (1.0 - (-t * 30.0).exp());
            (0.3 * (2.0 * PI * 440.0 * t).sin() * envelope).clamp(-1.0, 1.0) as f32
        })
        .collect()
}

/// Standard normal sample (Box-Muller).
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
