//! Canvas coordinate conversions. The vertical axis is pitch on a logarithmic
//! scale (top = high), the horizontal axis is time and stereo position.
//!
//! All functions are pure; canvas dimensions and pixel density are passed in
//! explicitly, never read from any ambient state.

pub const FREQ_MIN: f32 = 100.0;
pub const FREQ_MAX: f32 = 2000.0;
pub const PIXELS_PER_SECOND: f32 = 100.0;

/// Shared parameters for one scheduling/render pass.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub pixels_per_second: f32,
    pub sample_rate: u32,
    /// Delay-zone insert parameters. Owned by the caller (a UI in practice);
    /// the scheduler only toggles whether an event routes through the insert.
    pub delay_time: f32,
    pub delay_feedback: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            canvas_width: 1200.0,
            canvas_height: 800.0,
            pixels_per_second: PIXELS_PER_SECOND,
            sample_rate: 44100,
            delay_time: 0.5,
            delay_feedback: 0.4,
        }
    }
}

/// Map a vertical pixel position to a frequency in Hz.
pub fn y_to_frequency(y: f32, canvas_height: f32) -> f32 {
    let normalized = 1.0 - (y / canvas_height).clamp(0.0, 1.0);
    FREQ_MIN * (FREQ_MAX / FREQ_MIN).powf(normalized)
}

/// Inverse of [`y_to_frequency`]. Used by ruler drawing; kept here so the
/// round trip stays testable against the forward mapping.
pub fn y_from_frequency(freq: f32, canvas_height: f32) -> f32 {
    let freq = freq.clamp(FREQ_MIN, FREQ_MAX);
    let normalized = (freq / FREQ_MIN).ln() / (FREQ_MAX / FREQ_MIN).ln();
    (1.0 - normalized) * canvas_height
}

/// Map a horizontal pixel position to a stereo pan in [-1, 1].
pub fn x_to_pan(x: f32, canvas_width: f32) -> f32 {
    ((x / canvas_width) * 2.0 - 1.0).clamp(-1.0, 1.0)
}

/// Map a horizontal pixel position to a time offset in seconds.
pub fn x_to_time_offset(x: f32, pixels_per_second: f32) -> f32 {
    x / pixels_per_second
}
