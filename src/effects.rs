//! Per-voice inserts: a biquad lowpass (filter zones and the bass timbre)
//! and a stereo feedback delay send (delay zones). Every voice owns its own
//! insert state; nothing is shared between voices.

use std::collections::VecDeque;

use crate::zones::FilterParams;

pub struct BiquadLowpass {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x_state: (f32, f32), // x[n-1], x[n-2]
    y_state: (f32, f32), // y[n-1], y[n-2]
}

impl BiquadLowpass {
    pub fn new(sample_rate: f32, params: FilterParams) -> Self {
        let omega = std::f32::consts::TAU * (params.cutoff / sample_rate).min(0.49);
        let alpha = omega.sin() / (2.0 * params.q.max(0.01));
        let cos_omega = omega.cos();
        let a0 = 1.0 + alpha;

        BiquadLowpass {
            b0: (1.0 - cos_omega) / 2.0 / a0,
            b1: (1.0 - cos_omega) / a0,
            b2: (1.0 - cos_omega) / 2.0 / a0,
            a1: -2.0 * cos_omega / a0,
            a2: (1.0 - alpha) / a0,
            x_state: (0.0, 0.0),
            y_state: (0.0, 0.0),
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        // y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
        let output = self.b0 * input + self.b1 * self.x_state.0 + self.b2 * self.x_state.1
            - self.a1 * self.y_state.0 - self.a2 * self.y_state.1;

        self.x_state.1 = self.x_state.0;
        self.x_state.0 = input;
        self.y_state.1 = self.y_state.0;
        self.y_state.0 = output;

        output
    }
}

/// Post-pan send: the dry frame goes straight through, a delayed copy with
/// feedback is summed on top. One delay line per channel.
pub struct FeedbackDelay {
    left: VecDeque<f32>,
    right: VecDeque<f32>,
    feedback: f32,
}

impl FeedbackDelay {
    pub fn new(sample_rate: f32, time: f32, feedback: f32) -> Self {
        let delay_samples = ((time * sample_rate) as usize).max(1);
        FeedbackDelay {
            left: VecDeque::from(vec![0.0; delay_samples]),
            right: VecDeque::from(vec![0.0; delay_samples]),
            feedback,
        }
    }

    pub fn process(&mut self, dry: (f32, f32)) -> (f32, f32) {
        let wet_l = self.left.back().copied().unwrap_or(0.0);
        let wet_r = self.right.back().copied().unwrap_or(0.0);

        Self::cycle_buffer(&mut self.left, dry.0 + wet_l * self.feedback);
        Self::cycle_buffer(&mut self.right, dry.1 + wet_r * self.feedback);

        (dry.0 + wet_l, dry.1 + wet_r)
    }

    #[inline]
    fn cycle_buffer(buffer: &mut VecDeque<f32>, new_value: f32) {
        buffer.pop_back();
        buffer.push_front(new_value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowpass_attenuates_fast_alternation() {
        let mut filter = BiquadLowpass::new(44100.0, FilterParams { cutoff: 400.0, q: 0.7 });
        // Nyquist-rate alternation should come out much smaller than it went in
        let mut peak: f32 = 0.0;
        for i in 0..2000 {
            let input = if i % 2 == 0 { 1.0 } else { -1.0 };
            let out = filter.process(input);
            if i > 200 {
                peak = peak.max(out.abs());
            }
        }
        assert!(peak < 0.1, "peak {}", peak);
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut filter = BiquadLowpass::new(44100.0, FilterParams { cutoff: 1000.0, q: 0.7 });
        let mut out = 0.0;
        for _ in 0..4000 {
            out = filter.process(1.0);
        }
        assert!((out - 1.0).abs() < 0.05, "settled at {}", out);
    }

    #[test]
    fn delay_echoes_after_its_delay_time() {
        let mut delay = FeedbackDelay::new(1000.0, 0.01, 0.5); // 10 samples
        let first = delay.process((1.0, 1.0));
        assert_eq!(first, (1.0, 1.0)); // dry passes through immediately

        let mut echo_at = None;
        for i in 1..30 {
            let out = delay.process((0.0, 0.0));
            if out.0 != 0.0 && echo_at.is_none() {
                echo_at = Some((i, out.0));
            }
        }
        let (i, level) = echo_at.expect("no echo heard");
        assert_eq!(i, 10);
        assert_eq!(level, 1.0);
    }
}
