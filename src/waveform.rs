#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Waveform {
    pub fn generate_sample(&self, phase: f32) -> f32 { // Phase should be in the range [0.0, 1.0)
        match self {
            Waveform::Sine => (phase * std::f32::consts::TAU).sin(),
            Waveform::Square => if phase % 1.0 < 0.5 { 1.0 } else { -1.0 },
            Waveform::Sawtooth => phase % 1.0 * 2.0 - 1.0,
            Waveform::Triangle => {
                let p = phase % 1.0;
                if p < 0.5 { p * 4.0 - 1.0 } else { 3.0 - p * 4.0 }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waveforms_stay_in_range() {
        for wave in [Waveform::Sine, Waveform::Square, Waveform::Sawtooth, Waveform::Triangle] {
            for i in 0..100 {
                let s = wave.generate_sample(i as f32 / 100.0);
                assert!((-1.0..=1.0).contains(&s), "{:?} out of range: {}", wave, s);
            }
        }
    }

    #[test]
    fn square_flips_at_half_phase() {
        assert_eq!(Waveform::Square.generate_sample(0.25), 1.0);
        assert_eq!(Waveform::Square.generate_sample(0.75), -1.0);
    }

    #[test]
    fn triangle_peaks_at_half_phase() {
        assert_eq!(Waveform::Triangle.generate_sample(0.0), -1.0);
        assert_eq!(Waveform::Triangle.generate_sample(0.5), 1.0);
        assert!((Waveform::Triangle.generate_sample(0.25)).abs() < 1e-6);
    }
}
