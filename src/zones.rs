//! Effect zones. Filter and delay symbols produce no sound of their own;
//! they mark an interval `[x, x + 2*size]` on the time axis, and any event
//! whose reference x falls inside it gets the matching insert.

use crate::composition::{Symbol, SymbolKind};
use crate::mapping::EngineConfig;

/// Lowpass parameters derived from a filter-zone symbol: the zone's height
/// sets the cutoff, its size sets the resonance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub cutoff: f32,
    pub q: f32,
}

impl FilterParams {
    pub fn from_zone(zone: &Symbol, canvas_height: f32) -> Self {
        FilterParams {
            cutoff: (1.0 - zone.y / canvas_height) * 5000.0 + 200.0,
            q: (zone.size / 50.0) * 20.0,
        }
    }
}

/// First symbol of the given kind whose zone covers `x`, in composition
/// order. When zones overlap, whichever comes first wins; stacking
/// overlapping zones is not supported and no precedence is guaranteed.
pub fn find_active_zone<'a>(x: f32, kind: SymbolKind, symbols: &'a [Symbol]) -> Option<&'a Symbol> {
    symbols
        .iter()
        .find(|s| s.kind == kind && x >= s.x && x <= s.x + s.size * 2.0)
}

pub(crate) fn filter_at(x: f32, symbols: &[Symbol], config: &EngineConfig) -> Option<FilterParams> {
    find_active_zone(x, SymbolKind::Filter, symbols)
        .map(|zone| FilterParams::from_zone(zone, config.canvas_height))
}

pub(crate) fn delay_at(x: f32, symbols: &[Symbol]) -> bool {
    find_active_zone(x, SymbolKind::Delay, symbols).is_some()
}
