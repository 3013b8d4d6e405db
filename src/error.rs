use std::fmt;

impl std::error::Error for EngineError {}

#[derive(Debug, Clone)]
pub enum EngineError {
    EmptyComposition,
    Parse(String),
    Audio(String),
    Render(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineError::EmptyComposition => write!(f, "Render Error: the composition is empty"),
            EngineError::Parse(msg) => write!(f, "Parsing Error: {}", msg),
            EngineError::Audio(msg) => write!(f, "Audio Error: {}", msg),
            EngineError::Render(msg) => write!(f, "Render Error: {}", msg),
        }
    }
}
