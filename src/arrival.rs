//! Projected arrival times along a finished route.

use std::collections::HashMap;

use jiff::SignedDuration;
use jiff::civil::Time;

use crate::error::RouteError;
use crate::model::{Location, LocationId, VehicleId};
use crate::route::{PlannedRoute, PlannedStop, Route};
use crate::time::{advance, leg_duration};
use crate::traits::SpeedProfile;

pub struct ArrivalProjector<'a, S> {
    locations: HashMap<LocationId, &'a Location>,
    speed: &'a S,
}

impl<'a, S: SpeedProfile> ArrivalProjector<'a, S> {
    pub fn new(locations: &'a [Location], speed: &'a S) -> Self {
        Self {
            locations: locations.iter().map(|location| (location.id, location)).collect(),
            speed,
        }
    }

    /// Arrival at every stop; the first stop is the departure itself.
    pub fn arrivals(&self, route: &Route, departure: Time) -> Result<Vec<Time>, RouteError> {
        let mut arrivals = Vec::with_capacity(route.len());
        let mut elapsed = SignedDuration::ZERO;

        for (index, stop) in route.stops().iter().enumerate() {
            if index > 0 {
                let previous = &route.stops()[index - 1];
                elapsed +=
                    leg_duration(self.speed, previous.location, stop.location, stop.distance)?;
            }
            arrivals.push(advance(departure, elapsed)?);
        }

        Ok(arrivals)
    }

    /// Resolve locations and attach arrivals, producing the route handed to
    /// the vehicle.
    pub fn project(
        &self,
        vehicle_id: VehicleId,
        route: &Route,
        departure: Time,
    ) -> Result<PlannedRoute, RouteError> {
        let arrivals = self.arrivals(route, departure)?;

        let stops = route
            .stops()
            .iter()
            .zip(arrivals)
            .map(|(stop, arrival)| {
                let location = self
                    .locations
                    .get(&stop.location)
                    .ok_or(RouteError::UnknownLocation(stop.location))?;
                Ok(PlannedStop {
                    location: (*location).clone(),
                    distance: stop.distance,
                    tasks: stop.tasks.clone(),
                    arrival,
                })
            })
            .collect::<Result<Vec<_>, RouteError>>()?;

        Ok(PlannedRoute {
            vehicle_id,
            stops,
            load: route.task_ids(),
        })
    }
}
