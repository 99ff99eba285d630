use thiserror::Error;

use crate::model::{LocationId, TaskId};

#[derive(Debug, Error)]
pub enum RouteError {
    /// No ordering of a window keeps every deadline. Indicates the selected
    /// load contains a deadline combination that cannot be served.
    #[error(
        "no ordering of stops {window_start}..={window_end} meets the deadline \
         at stop {stop} (location {location})"
    )]
    RouteInfeasible {
        window_start: usize,
        window_end: usize,
        stop: usize,
        location: LocationId,
    },

    #[error("unknown location {0}")]
    UnknownLocation(LocationId),

    #[error("invalid distance matrix: {0}")]
    InvalidMatrix(String),

    #[error("vehicle capacity must be at least one task")]
    InvalidCapacity,

    #[error("speed from {from} to {to} must be positive and finite, got {mph}")]
    InvalidSpeed {
        from: LocationId,
        to: LocationId,
        mph: f64,
    },

    #[error("projected arrival passes midnight: {0}")]
    ClockOverflow(#[from] jiff::Error),

    #[error("tasks already claimed or not available: {0:?}")]
    ClaimConflict(Vec<TaskId>),
}
