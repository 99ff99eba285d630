//! Seams the route builder calls out through.
//!
//! Kept minimal: the engine only needs to know how fast a vehicle moves
//! between two locations.

use crate::model::LocationId;

/// Average driving speed assumed by the reference fleet, stops included.
pub const DEFAULT_SPEED_MPH: f64 = 18.0;

/// Average speed in miles per hour between two locations.
///
/// Must be `Sync`: window candidates are evaluated in parallel.
pub trait SpeedProfile: Sync {
    fn mph(&self, from: LocationId, to: LocationId) -> f64;
}

impl<F> SpeedProfile for F
where
    F: Fn(LocationId, LocationId) -> f64 + Sync,
{
    fn mph(&self, from: LocationId, to: LocationId) -> f64 {
        self(from, to)
    }
}

/// The same speed on every leg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantSpeed {
    pub mph: f64,
}

impl Default for ConstantSpeed {
    fn default() -> Self {
        Self {
            mph: DEFAULT_SPEED_MPH,
        }
    }
}

impl ConstantSpeed {
    pub fn new(mph: f64) -> Self {
        Self { mph }
    }
}

impl SpeedProfile for ConstantSpeed {
    fn mph(&self, _from: LocationId, _to: LocationId) -> f64 {
        self.mph
    }
}
