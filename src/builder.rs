//! Route builder pipeline.
//!
//! selection -> construction -> neighbor insertion -> end filling ->
//! return to hub -> windowed reordering -> arrival projection.

use jiff::civil::{Time, time};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::arrival::ArrivalProjector;
use crate::construction::{DEFAULT_ACCEPTABLE_INCREASE, RouteConstructor};
use crate::error::RouteError;
use crate::groups::GroupIndex;
use crate::matrix::DistanceMatrix;
use crate::model::{HUB, Location, LocationId, Task, VehicleId};
use crate::optimizer::{DEFAULT_WINDOW_SIZE, SegmentOptimizer};
use crate::route::{PlannedRoute, Route};
use crate::selection::{ConstraintSelector, SelectionWindow};
use crate::time::horizon;
use crate::traits::SpeedProfile;

/// Nominal departure of every vehicle's first trip of the day.
pub const FIRST_DISPATCH: Time = time(8, 0, 0, 0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Location every route starts and ends at.
    pub hub: LocationId,
    /// Deadlines within this many minutes of departure are urgent.
    pub urgency_horizon_minutes: i64,
    /// Departures after this time also take non-urgent deadline tasks.
    pub first_dispatch: Time,
    /// Largest detour, as a multiple of the direct leg, neighbor insertion accepts.
    pub acceptable_increase: f64,
    /// Stops per reordering window, both fixed ends included.
    pub window_size: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            hub: HUB,
            urgency_horizon_minutes: 120,
            first_dispatch: FIRST_DISPATCH,
            acceptable_increase: DEFAULT_ACCEPTABLE_INCREASE,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

/// Per-trip inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteParameters {
    pub vehicle_id: VehicleId,
    /// Most tasks the vehicle carries at once.
    pub capacity: usize,
    pub departure: Time,
}

/// Build one hub-to-hub route for `params.vehicle_id` from a pool snapshot.
///
/// Tasks in `tasks` that are not Available or are pinned to another vehicle
/// are ignored. Task state is never touched; claiming the returned load is
/// up to the caller. An empty load yields an empty route.
#[instrument(skip_all, fields(vehicle = params.vehicle_id, departure = %params.departure))]
pub fn build_route<S>(
    tasks: &[&Task],
    matrix: &DistanceMatrix,
    locations: &[Location],
    speed: &S,
    params: &RouteParameters,
    options: &BuildOptions,
) -> Result<PlannedRoute, RouteError>
where
    S: SpeedProfile,
{
    if params.capacity == 0 {
        return Err(RouteError::InvalidCapacity);
    }
    if !matrix.contains(options.hub) {
        return Err(RouteError::UnknownLocation(options.hub));
    }

    let mut eligible: Vec<&Task> = Vec::with_capacity(tasks.len());
    for &task in tasks {
        if !task.is_eligible_for(params.vehicle_id) {
            continue;
        }
        if !matrix.contains(task.destination) {
            return Err(RouteError::UnknownLocation(task.destination));
        }
        if task.destination == options.hub {
            warn!(task = task.id, "task destined for the hub skipped");
            continue;
        }
        eligible.push(task);
    }
    debug!(eligible = eligible.len(), "snapshot filtered");

    let groups = GroupIndex::build(&eligible);
    let selector = ConstraintSelector::new(
        &eligible,
        &groups,
        matrix,
        speed,
        options.hub,
        params.vehicle_id,
        params.capacity,
    );
    let selection = selector.select(SelectionWindow {
        departure: params.departure,
        urgent_by: horizon(params.departure, options.urgency_horizon_minutes),
        late_departure: params.departure > options.first_dispatch,
    })?;

    let load: Vec<&Task> = eligible
        .iter()
        .copied()
        .filter(|task| selection.load.contains(&task.id))
        .collect();

    let constructor =
        RouteConstructor::new(matrix, speed, params.departure, options.hub, params.capacity);
    let route = constructor.construct(&Route::departing(options.hub), &load);
    let route =
        constructor.insert_neighbors(&route, &selection.pending, options.acceptable_increase)?;
    let route = constructor.fill_end(&route, &selection.pending)?;

    if route.task_count() == 0 {
        debug!("nothing to deliver");
        return Ok(PlannedRoute::empty(params.vehicle_id));
    }

    let route = constructor.return_to_hub(&route);
    let optimizer = SegmentOptimizer::new(matrix, speed, params.departure, options.window_size);
    let route = optimizer.optimize(&route)?;

    let projector = ArrivalProjector::new(locations, speed);
    let planned = projector.project(params.vehicle_id, &route, params.departure)?;
    debug!(
        stops = planned.stops.len(),
        tasks = planned.load.len(),
        miles = planned.total_distance(),
        "route built"
    );
    Ok(planned)
}
