//! Day-long dispatch over a shared task pool.
//!
//! Routes are built strictly one vehicle at a time: the vehicle that is back
//! at the hub earliest goes next, and its load is claimed before any other
//! vehicle sees the pool again.

use jiff::civil::Time;
use serde::Serialize;
use tracing::{debug, info};

use crate::builder::{BuildOptions, FIRST_DISPATCH, RouteParameters, build_route};
use crate::error::RouteError;
use crate::matrix::DistanceMatrix;
use crate::model::{Location, LocationId, TaskId, VehicleId};
use crate::pool::{DestinationCorrection, TaskPool};
use crate::route::PlannedRoute;
use crate::traits::SpeedProfile;

/// Tasks a vehicle carries at once unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub capacity: usize,
    pub location: LocationId,
    pub clock: Time,
    /// Miles driven today.
    pub mileage: f64,
    pub load: Vec<TaskId>,
}

impl Vehicle {
    pub fn new(id: VehicleId, hub: LocationId) -> Self {
        Self {
            id,
            capacity: DEFAULT_CAPACITY,
            location: hub,
            clock: FIRST_DISPATCH,
            mileage: 0.0,
            load: Vec::new(),
        }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Drive `route`, dropping each stop's tasks at its projected arrival.
    pub fn deliver(&mut self, route: &PlannedRoute, pool: &mut TaskPool) {
        self.load = route.load.clone();
        for stop in &route.stops {
            self.location = stop.location.id;
            self.clock = stop.arrival;
            self.mileage += stop.distance;
            for &id in &stop.tasks {
                pool.mark_delivered(id, stop.arrival);
            }
            self.load.retain(|id| !stop.tasks.contains(id));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchSummary {
    pub routes: Vec<PlannedRoute>,
    pub total_mileage: f64,
    pub delivered: usize,
    pub on_time: usize,
    pub total_tasks: usize,
}

pub struct Dispatcher {
    vehicles: Vec<Vehicle>,
    options: BuildOptions,
}

impl Dispatcher {
    pub fn new(vehicles: Vec<Vehicle>, options: BuildOptions) -> Self {
        Self { vehicles, options }
    }

    /// `count` vehicles with default capacity, ids from 1.
    pub fn with_fleet(count: u32, options: BuildOptions) -> Self {
        let vehicles = (1..=count).map(|id| Vehicle::new(id, options.hub)).collect();
        Self::new(vehicles, options)
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// Dispatch trips until every task is delivered or no vehicle can make
    /// further progress.
    pub fn run<S: SpeedProfile>(
        &mut self,
        pool: &mut TaskPool,
        matrix: &DistanceMatrix,
        locations: &[Location],
        speed: &S,
        corrections: &[DestinationCorrection],
    ) -> Result<DispatchSummary, RouteError> {
        let mut routes = Vec::new();
        let mut retired = vec![false; self.vehicles.len()];

        while !pool.all_delivered() {
            let Some(index) = (0..self.vehicles.len())
                .filter(|&i| !retired[i])
                .min_by_key(|&i| (self.vehicles[i].clock, self.vehicles[i].id))
            else {
                break;
            };
            let vehicle = &mut self.vehicles[index];

            pool.release_late_arrivals(vehicle.clock);
            pool.apply_corrections(corrections, vehicle.clock);

            let params = RouteParameters {
                vehicle_id: vehicle.id,
                capacity: vehicle.capacity,
                departure: vehicle.clock,
            };
            let route = build_route(
                &pool.eligible_for(vehicle.id),
                matrix,
                locations,
                speed,
                &params,
                &self.options,
            )?;

            if route.is_empty() {
                match pool.next_release_after(vehicle.clock, corrections) {
                    Some(next) => {
                        debug!(
                            vehicle = vehicle.id,
                            from = %vehicle.clock,
                            to = %next,
                            "waiting at hub"
                        );
                        vehicle.clock = next;
                    }
                    None => {
                        debug!(vehicle = vehicle.id, "nothing left for this vehicle");
                        retired[index] = true;
                    }
                }
                continue;
            }

            if !pool.claim(&route.load, vehicle.clock) {
                return Err(RouteError::ClaimConflict(route.load.clone()));
            }

            info!(
                vehicle = vehicle.id,
                departure = %vehicle.clock,
                stops = route.stops.len(),
                tasks = route.load.len(),
                miles = route.total_distance(),
                "route dispatched"
            );
            vehicle.deliver(&route, pool);
            routes.push(route);
        }

        let on_time = pool.tasks().filter(|task| pool.delivered_on_time(task.id)).count();
        Ok(DispatchSummary {
            routes,
            total_mileage: self.vehicles.iter().map(|v| v.mileage).sum(),
            delivered: pool.delivered_count(),
            on_time,
            total_tasks: pool.len(),
        })
    }
}
