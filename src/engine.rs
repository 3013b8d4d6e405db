//! Realtime playback over cpal. The engine schedules the composition once,
//! builds every voice up front and hands the mixer to the output stream;
//! after that the audio clock runs on its own and the only interaction left
//! is stopping.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use fastrand::Rng;

use crate::composition::Composition;
use crate::error::EngineError;
use crate::mapping::EngineConfig;
use crate::scheduler::schedule_all;
use crate::voice::Mixer;

pub struct PlaybackEngine {
    stream_config: StreamConfig,
    sample_rate: u32,
    mixer: Arc<Mutex<Option<Mixer>>>,
    stream: Option<Stream>,
}

impl PlaybackEngine {
    /// Open the default output device. Fails with `EngineError::Audio` when
    /// the host has no audio; scheduling and offline rendering stay usable
    /// without an engine.
    pub fn new() -> Result<Self, EngineError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::Audio("No output device found".to_string()))?;
        let config = device
            .default_output_config()
            .map_err(|e| EngineError::Audio(e.to_string()))?;
        let stream_config = config.config();

        Ok(PlaybackEngine {
            sample_rate: stream_config.sample_rate.0,
            stream_config,
            mixer: Arc::new(Mutex::new(None)),
            stream: None,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Schedule the composition against the device clock and start playing.
    /// Any previous playback is hard-stopped first so no prior voices leak
    /// into the new pass.
    pub fn play(&mut self, composition: &Composition, config: &EngineConfig) -> Result<(), EngineError> {
        self.stop();

        let mut rng = Rng::new();
        let events = schedule_all(composition, 0.0, config, &mut rng);
        let mixer = Mixer::from_events(&events, self.sample_rate, config, &mut rng);

        *self.mixer.lock().unwrap() = Some(mixer);
        self.start_stream()?;

        Ok(())
    }

    /// Hard stop: drop the stream and every active voice immediately,
    /// regardless of scheduled stop times.
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
        *self.mixer.lock().unwrap() = None;
    }

    pub fn is_playing(&self) -> bool {
        self.mixer
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|mixer| !mixer.is_finished())
    }

    /// Voices that still have something to play. Zero after `stop`.
    pub fn active_voices(&self) -> usize {
        self.mixer
            .lock()
            .unwrap()
            .as_ref()
            .map_or(0, |mixer| mixer.active_voices())
    }

    fn start_stream(&mut self) -> Result<(), EngineError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::Audio("No output device".to_string()))?;

        let config = self.stream_config.clone();
        let channels = config.channels as usize;
        let mixer = Arc::clone(&self.mixer);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut mixer_lock = mixer.lock().unwrap();

                    if let Some(mixer) = mixer_lock.as_mut() {
                        for frame in data.chunks_mut(channels) {
                            let (left, right) = mixer.next_frame();
                            for (i, sample) in frame.iter_mut().enumerate() {
                                *sample = if i % 2 == 0 { left } else { right };
                            }
                        }
                    } else {
                        for sample in data.iter_mut() {
                            *sample = 0.0;
                        }
                    }
                },
                |err| eprintln!("Stream error: {}", err),
                None,
            )
            .map_err(|e| EngineError::Audio(e.to_string()))?;

        stream.play().map_err(|e| EngineError::Audio(e.to_string()))?;
        self.stream = Some(stream);

        Ok(())
    }
}
