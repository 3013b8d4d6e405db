//! One `Voice` per scheduled event: a generator, a click-free gain envelope,
//! an optional lowpass insert, an equal-power panner and an optional delay
//! send, all owned by the voice. The `Mixer` accumulates every voice into
//! stereo frames; it is the only shared mutable state between scheduling and
//! playback, and clearing it is the hard-stop.

use fastrand::Rng;

use crate::effects::{BiquadLowpass, FeedbackDelay};
use crate::mapping::EngineConfig;
use crate::scheduler::{CURVE_RATE, PitchSpec, ScheduledEvent};
use crate::composition::Timbre;
use crate::waveform::Waveform;
use crate::zones::FilterParams;

const ATTACK: f32 = 0.01;
const DISCRETE_RELEASE: f32 = 0.01;
const CONTINUOUS_RELEASE: f32 = 0.2;
/// How long a delay send keeps ringing after the voice's own release.
const DELAY_TAIL_REPEATS: f32 = 4.0;
/// Detune of the second unison oscillator for pad/lead, +1.2%.
const UNISON_DETUNE: f32 = 1.012;
const BASS_CUTOFF: f32 = 600.0;

enum Generator {
    Oscillator { wave: Waveform, phase: f32 },
    Unison { phase1: f32, phase2: f32 },
    Bass { phase: f32, lowpass: BiquadLowpass },
    Fm { carrier_phase: f32, mod_phase: f32, mod_freq: f32, mod_index: f32 },
    Buffer { samples: Vec<f32> },
}

pub struct Voice {
    start_sample: usize,
    sample_rate: f32,
    /// Seconds from voice start to the scheduled event end.
    duration: f32,
    /// Seconds of envelope past `duration` (continuous release class).
    release_after: f32,
    /// Total lifetime in samples, including any delay tail.
    lifetime: usize,
    volume: f32,
    pan_gains: (f32, f32),
    pitch: PitchSpec,
    generator: Generator,
    filter: Option<BiquadLowpass>,
    delay: Option<FeedbackDelay>,
}

impl Voice {
    /// Build the synthesis chain for one event. Zero or negative duration is
    /// not an error, just no voice.
    pub fn new(
        event: &ScheduledEvent,
        sample_rate: u32,
        config: &EngineConfig,
        rng: &mut Rng,
    ) -> Option<Voice> {
        let duration = event.end_time - event.start_time;
        if duration <= 0.0 {
            return None;
        }
        let sample_rate = sample_rate as f32;
        let base_freq = initial_frequency(&event.pitch);

        let generator = match event.timbre {
            Timbre::Sine => Generator::Oscillator { wave: Waveform::Sine, phase: 0.0 },
            Timbre::Square | Timbre::Pulse => {
                Generator::Oscillator { wave: Waveform::Square, phase: 0.0 }
            }
            Timbre::Sawtooth => Generator::Oscillator { wave: Waveform::Sawtooth, phase: 0.0 },
            Timbre::Triangle => Generator::Oscillator { wave: Waveform::Triangle, phase: 0.0 },
            Timbre::Pad | Timbre::Lead => Generator::Unison { phase1: 0.0, phase2: 0.0 },
            Timbre::Bass => Generator::Bass {
                phase: 0.0,
                lowpass: BiquadLowpass::new(
                    sample_rate,
                    FilterParams { cutoff: BASS_CUTOFF, q: 0.7 },
                ),
            },
            Timbre::Fm => Generator::Fm {
                carrier_phase: 0.0,
                mod_phase: 0.0,
                mod_freq: base_freq * 1.5,
                mod_index: base_freq * 0.75,
            },
            Timbre::Noise => Generator::Buffer {
                samples: noise_buffer((duration * sample_rate) as usize, rng),
            },
            Timbre::Pluck => Generator::Buffer {
                samples: pluck_buffer((duration * sample_rate) as usize, base_freq, sample_rate, rng),
            },
        };

        let release_after = if matches!(event.pitch, PitchSpec::Curve(_)) {
            CONTINUOUS_RELEASE
        } else {
            0.0 // discrete release happens inside the event duration
        };

        let delay = event
            .delay
            .then(|| FeedbackDelay::new(sample_rate, config.delay_time, config.delay_feedback));
        let delay_tail = if delay.is_some() {
            config.delay_time * DELAY_TAIL_REPEATS
        } else {
            0.0
        };

        let lifetime = ((duration + release_after + delay_tail) * sample_rate) as usize;

        // Equal-power pan law
        let angle = (event.pan.clamp(-1.0, 1.0) + 1.0) * std::f32::consts::FRAC_PI_4;

        Some(Voice {
            start_sample: (event.start_time.max(0.0) * sample_rate) as usize,
            sample_rate,
            duration,
            release_after,
            lifetime: lifetime.max(1),
            volume: event.volume,
            pan_gains: (angle.cos(), angle.sin()),
            pitch: event.pitch.clone(),
            generator,
            filter: event
                .filter
                .map(|params| BiquadLowpass::new(sample_rate, params)),
            delay,
        })
    }

    pub fn start_sample(&self) -> usize {
        self.start_sample
    }

    pub fn end_sample(&self) -> usize {
        self.start_sample + self.lifetime
    }

    pub fn is_finished(&self, sample_idx: usize) -> bool {
        sample_idx >= self.end_sample()
    }

    /// Render one stereo frame at the absolute sample index. Must be called
    /// with a monotonically advancing index; the generator, filter and delay
    /// state advance one step per call.
    pub fn tick(&mut self, sample_idx: usize) -> (f32, f32) {
        if sample_idx < self.start_sample || self.is_finished(sample_idx) {
            return (0.0, 0.0);
        }
        let t = (sample_idx - self.start_sample) as f32 / self.sample_rate;

        let dry = if t <= self.duration + self.release_after {
            let freq = self.frequency_at(t);
            let raw = self.generator_sample(sample_idx, freq);
            raw * self.envelope(t) * self.volume
        } else {
            0.0 // only the delay tail is still ringing
        };

        let filtered = match &mut self.filter {
            Some(lowpass) => lowpass.process(dry),
            None => dry,
        };

        let frame = (filtered * self.pan_gains.0, filtered * self.pan_gains.1);
        match &mut self.delay {
            Some(delay) => delay.process(frame),
            None => frame,
        }
    }

    fn frequency_at(&self, t: f32) -> f32 {
        match &self.pitch {
            PitchSpec::Constant(freq) => *freq,
            PitchSpec::Ramp { start, end } => {
                let progress = (t / self.duration).clamp(0.0, 1.0);
                start + (end - start) * progress
            }
            PitchSpec::Curve(curve) => {
                // Sample-and-hold at the rate the scheduler resampled at
                let idx = ((t * CURVE_RATE) as usize).min(curve.len().saturating_sub(1));
                curve.get(idx).copied().unwrap_or(0.0)
            }
        }
    }

    fn generator_sample(&mut self, sample_idx: usize, freq: f32) -> f32 {
        let sample_rate = self.sample_rate;
        match &mut self.generator {
            Generator::Oscillator { wave, phase } => {
                let out = wave.generate_sample(*phase);
                *phase = (*phase + freq / sample_rate) % 1.0;
                out
            }
            Generator::Unison { phase1, phase2 } => {
                let out = Waveform::Sawtooth.generate_sample(*phase1)
                    + Waveform::Sawtooth.generate_sample(*phase2);
                *phase1 = (*phase1 + freq / sample_rate) % 1.0;
                *phase2 = (*phase2 + freq * UNISON_DETUNE / sample_rate) % 1.0;
                out * 0.5
            }
            Generator::Bass { phase, lowpass } => {
                let out = lowpass.process(Waveform::Sawtooth.generate_sample(*phase));
                *phase = (*phase + freq / sample_rate) % 1.0;
                out
            }
            Generator::Fm { carrier_phase, mod_phase, mod_freq, mod_index } => {
                let modulation = *mod_index * Waveform::Square.generate_sample(*mod_phase);
                let out = Waveform::Sine.generate_sample(*carrier_phase);
                *carrier_phase += (freq + modulation) / sample_rate;
                *carrier_phase = carrier_phase.rem_euclid(1.0);
                *mod_phase = (*mod_phase + *mod_freq / sample_rate) % 1.0;
                out
            }
            Generator::Buffer { samples } => {
                let idx = sample_idx - self.start_sample;
                samples.get(idx).copied().unwrap_or(0.0)
            }
        }
    }

    fn envelope(&self, t: f32) -> f32 {
        let attack = ATTACK.min(self.duration / 2.0);
        if t < attack {
            return t / attack;
        }
        if self.release_after > 0.0 {
            // Sustained class: hold through the event, fade after it
            if t <= self.duration {
                1.0
            } else {
                (1.0 - (t - self.duration) / self.release_after).max(0.0)
            }
        } else {
            // Discrete class: fade out inside the event's own duration
            let release = DISCRETE_RELEASE.min(self.duration / 2.0);
            let release_start = self.duration - release;
            if t < release_start {
                1.0
            } else {
                ((self.duration - t) / release).max(0.0)
            }
        }
    }
}

fn initial_frequency(pitch: &PitchSpec) -> f32 {
    match pitch {
        PitchSpec::Constant(freq) => *freq,
        PitchSpec::Ramp { start, .. } => *start,
        PitchSpec::Curve(curve) => curve.first().copied().unwrap_or(200.0),
    }
}

fn noise_buffer(len: usize, rng: &mut Rng) -> Vec<f32> {
    (0..len).map(|_| rng.f32() * 2.0 - 1.0).collect()
}

/// Karplus-Strong: seed one period of noise, then average-and-decay. The
/// result is a plucked string at the seeded fundamental.
fn pluck_buffer(len: usize, freq: f32, sample_rate: f32, rng: &mut Rng) -> Vec<f32> {
    let period = ((sample_rate / freq.max(1.0)) as usize).clamp(2, len.max(2));
    let mut buffer = vec![0.0f32; len];
    for sample in buffer.iter_mut().take(period) {
        *sample = rng.f32() * 2.0 - 1.0;
    }
    for i in period..len {
        buffer[i] = (buffer[i - period] + buffer[i - period + 1]) * 0.5 * 0.996;
    }
    buffer
}

/// Additive stereo mix over a set of voices with a shared sample cursor.
/// This is the offline/realtime rendering of the per-event node graph.
pub struct Mixer {
    voices: Vec<Voice>,
    cursor: usize,
}

impl Mixer {
    pub fn new(voices: Vec<Voice>) -> Self {
        Mixer { voices, cursor: 0 }
    }

    /// Build voices for a whole event list, silently dropping degenerate
    /// events (per-event failures never propagate).
    pub fn from_events(
        events: &[ScheduledEvent],
        sample_rate: u32,
        config: &EngineConfig,
        rng: &mut Rng,
    ) -> Self {
        let voices = events
            .iter()
            .filter_map(|event| Voice::new(event, sample_rate, config, rng))
            .collect();
        Mixer::new(voices)
    }

    pub fn next_frame(&mut self) -> (f32, f32) {
        let mut left = 0.0;
        let mut right = 0.0;
        for voice in &mut self.voices {
            let (l, r) = voice.tick(self.cursor);
            left += l;
            right += r;
        }
        self.cursor += 1;
        (left, right)
    }

    /// Samples until every voice, including delay tails, has gone quiet.
    pub fn total_samples(&self) -> usize {
        self.voices.iter().map(Voice::end_sample).max().unwrap_or(0)
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.total_samples()
    }

    /// Voices that still have something left to play at the cursor.
    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_finished(self.cursor)).count()
    }

    /// Hard stop: forget every voice immediately, regardless of its
    /// scheduled stop time.
    pub fn clear(&mut self) {
        self.voices.clear();
    }
}
