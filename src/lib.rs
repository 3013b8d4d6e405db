//  _______  _______           _        ______   ______   _______           _______
// (  ____ \(  ___  )|\     /|( (    /|(  __  \ (  ___ \ (  ____ )|\     /|(  ____ \|\     /|
// | (    \/| (   ) || )   ( ||  \  ( || (  \  )| (   ) )| (    )|| )   ( || (    \/| )   ( |
// | (_____ | |   | || |   | ||   \ | || |   ) || (__/ / | (____)|| |   | || (_____ | (___) |
// (_____  )| |   | || |   | || (\ \) || |   | ||  __ (  |     __)| |   | |(_____  )|  ___  |
//       ) || |   | || |   | || | \   || |   ) || (  \ \ | (\ (   | |   | |      ) || (   ) |
// /\____) || (___) || (___) || )  \  || (__/  )| )___) )| ) \ \__| (___) |/\____) || )   ( |
// \_______)(_______)(_______)|/    )_)(______/ |/ \___/ |/   \__/(_______)\_______)|/     \|

pub mod error;
pub mod mapping;
pub mod composition;
pub mod zones;
pub mod scheduler;
pub mod waveform;
pub mod effects;
pub mod voice;
pub mod render;
pub mod engine;

pub use error::EngineError;
pub use mapping::{EngineConfig, FREQ_MAX, FREQ_MIN, PIXELS_PER_SECOND};
pub use composition::{Composition, Point, Stroke, Symbol, SymbolKind, Timbre};
pub use zones::{FilterParams, find_active_zone};
pub use scheduler::{PitchSpec, ScheduledEvent, schedule_all};
pub use waveform::Waveform;
pub use voice::{Mixer, Voice};
pub use render::{encode_wav, render_to_wav};
pub use engine::PlaybackEngine;
