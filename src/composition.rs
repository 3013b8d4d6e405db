//! The drawn composition: freehand strokes and placed symbols. This is the
//! sole input of the scheduler, owned and mutated by the editing layer and
//! treated as read-only during a scheduling pass.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Voice types. Continuous timbres sustain across a whole stroke with a
/// time-varying pitch curve; discrete timbres fire once per short event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timbre {
    Sine,
    Square,
    Sawtooth,
    Triangle,
    Pad,
    Bass,
    Lead,
    Pulse,
    Fm,
    Pluck,
    Noise,
}

impl Timbre {
    pub fn is_continuous(&self) -> bool {
        !matches!(self, Timbre::Pluck | Timbre::Noise)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Staccato,
    Percussion,
    Arpeggio,
    Glissando,
    Granular,
    Tremolo,
    Filter,
    Delay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub id: u64,
    pub points: Vec<Point>,
    pub color: String,
    pub line_width: f32,
    pub timbre: Timbre,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_y: Option<f32>,
    #[serde(rename = "type")]
    pub kind: SymbolKind,
    pub color: String,
    pub size: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timbre: Option<Timbre>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Composition {
    pub strokes: Vec<Stroke>,
    pub symbols: Vec<Symbol>,
}

impl Composition {
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.symbols.is_empty()
    }

    /// Rightmost pixel touched by any stroke point or symbol anchor/end.
    /// Determines the temporal extent of an offline render.
    pub fn max_x(&self) -> f32 {
        let mut max_x: f32 = 0.0;
        for stroke in &self.strokes {
            for point in &stroke.points {
                max_x = max_x.max(point.x);
            }
        }
        for symbol in &self.symbols {
            max_x = max_x.max(symbol.x);
            if let Some(end_x) = symbol.end_x {
                max_x = max_x.max(end_x);
            }
        }
        max_x
    }

    /// Parse the project/export JSON schema. Unknown fields are ignored for
    /// forward compatibility; unknown timbre or symbol kind strings are not.
    pub fn from_json(content: &str) -> Result<Self, EngineError> {
        serde_json::from_str(content).map_err(|e| EngineError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string(self).map_err(|e| EngineError::Parse(e.to_string()))
    }
}
