//! Greedy route construction.
//!
//! Three passes over a [`Route`], each returning a new route:
//! nearest-neighbor stops for the selected load (deadline destinations
//! first), cheap detours inserted between existing stops, and nearest-neighbor
//! stops appended at the tail until the vehicle is full. The last two never
//! add a stop that would make any deadline on the route late.

use std::collections::BTreeSet;

use jiff::civil::Time;
use tracing::debug;

use crate::error::RouteError;
use crate::matrix::DistanceMatrix;
use crate::model::{LocationId, Task, TaskId};
use crate::optimizer::is_feasible;
use crate::route::{Route, Stop};
use crate::traits::SpeedProfile;

/// Detour factor accepted by neighbor insertion by default.
pub const DEFAULT_ACCEPTABLE_INCREASE: f64 = 1.65;

pub struct RouteConstructor<'a, S> {
    matrix: &'a DistanceMatrix,
    speed: &'a S,
    departure: Time,
    hub: LocationId,
    capacity: usize,
}

impl<'a, S: SpeedProfile> RouteConstructor<'a, S> {
    pub fn new(
        matrix: &'a DistanceMatrix,
        speed: &'a S,
        departure: Time,
        hub: LocationId,
        capacity: usize,
    ) -> Self {
        Self {
            matrix,
            speed,
            departure,
            hub,
            capacity,
        }
    }

    /// Append one stop per destination in `load`, nearest first, visiting
    /// destinations holding a deadline before all others.
    pub fn construct(&self, route: &Route, load: &[&Task]) -> Route {
        let deadline_stops: BTreeSet<LocationId> = load
            .iter()
            .filter(|task| task.deadline.is_some())
            .map(|task| task.destination)
            .collect();
        let other_stops: BTreeSet<LocationId> = load
            .iter()
            .map(|task| task.destination)
            .filter(|location| !deadline_stops.contains(location))
            .collect();

        let route = self.visit_nearest(route, deadline_stops, load);
        let route = self.visit_nearest(&route, other_stops, load);

        debug!(stops = route.len() - 1, tasks = route.task_count(), "initial stops constructed");
        route
    }

    /// Append a stop at each of `destinations`, always driving to the
    /// nearest one left, carrying every task of `load` bound there.
    pub(crate) fn visit_nearest(
        &self,
        route: &Route,
        mut destinations: BTreeSet<LocationId>,
        load: &[&Task],
    ) -> Route {
        let mut route = route.clone();
        while let Some((next, distance)) =
            self.matrix.nearest(self.tail(&route), |id| destinations.contains(&id))
        {
            let here: Vec<&Task> =
                load.iter().copied().filter(|task| task.destination == next).collect();
            route = route.with_appended(stop_for(next, distance, &here));
            destinations.remove(&next);
        }
        route
    }

    /// Insert the nearest unvisited destination between a stop and its
    /// successor when the detour stays within `acceptable_increase` times the
    /// direct leg. Starts at the last deadline stop so urgent drops are never
    /// pushed back.
    pub fn insert_neighbors(
        &self,
        route: &Route,
        pending: &[&Task],
        acceptable_increase: f64,
    ) -> Result<Route, RouteError> {
        let mut route = route.clone();
        let mut index = route.last_deadline_stop().unwrap_or(0);
        let mut inserted = 0;

        while index + 1 < route.len() {
            let room = self.room(&route);
            let left = remaining(&route, pending);
            let unvisited = self.unvisited(&route, &left);
            if room == 0 || unvisited.is_empty() {
                break;
            }

            let here = route.stops()[index].location;
            let next = &route.stops()[index + 1];
            if let Some((candidate, to_candidate)) =
                self.matrix.nearest(here, |id| unvisited.contains(&id))
            {
                let detour = to_candidate + self.matrix.distance(candidate, next.location);
                if detour <= acceptable_increase * next.distance {
                    let tasks = take(&left, candidate, room);
                    let placed = self.on_time(&route, candidate, to_candidate, tasks, |r, stop| {
                        r.with_inserted(index + 1, stop, self.matrix)
                    })?;
                    if let Some(placed) = placed {
                        route = placed;
                        inserted += 1;
                    }
                }
            }
            index += 1;
        }

        debug!(inserted, tasks = route.task_count(), "neighbor insertion finished");
        Ok(route)
    }

    /// Append nearest-neighbor stops at the tail until the vehicle is full or
    /// no destination with pending tasks remains.
    pub fn fill_end(&self, route: &Route, pending: &[&Task]) -> Result<Route, RouteError> {
        let mut route = route.clone();
        let mut late: BTreeSet<LocationId> = BTreeSet::new();

        loop {
            let room = self.room(&route);
            if room == 0 {
                break;
            }
            let left = remaining(&route, pending);
            let unvisited = self.unvisited(&route, &left);

            let Some((next, distance)) = self
                .matrix
                .nearest(self.tail(&route), |id| unvisited.contains(&id) && !late.contains(&id))
            else {
                break;
            };
            let tasks = take(&left, next, room);
            match self.on_time(&route, next, distance, tasks, Route::with_appended)? {
                Some(placed) => route = placed,
                None => {
                    late.insert(next);
                }
            }
        }

        debug!(stops = route.len() - 1, tasks = route.task_count(), "end filling finished");
        Ok(route)
    }

    /// Close the route with the return leg to the hub.
    pub fn return_to_hub(&self, route: &Route) -> Route {
        let distance = self.matrix.distance(self.tail(route), self.hub);
        route.with_appended(Stop::hub(self.hub, distance))
    }

    /// `route` edited to carry `tasks` at `location`, if every deadline on it
    /// is still met. Deadline tasks that would arrive late are left out of the
    /// stop; `None` when nothing can be placed.
    fn on_time<E>(
        &self,
        route: &Route,
        location: LocationId,
        distance: f64,
        tasks: Vec<&Task>,
        edit: E,
    ) -> Result<Option<Route>, RouteError>
    where
        E: Fn(&Route, Stop) -> Route,
    {
        if tasks.is_empty() {
            return Ok(None);
        }
        let placed = edit(route, stop_for(location, distance, &tasks));
        if is_feasible(&placed, self.departure, self.speed)? {
            return Ok(Some(placed));
        }

        let undated: Vec<&Task> =
            tasks.into_iter().filter(|task| task.deadline.is_none()).collect();
        debug!(location, kept = undated.len(), "stop would miss a deadline");
        if undated.is_empty() {
            return Ok(None);
        }
        let placed = edit(route, stop_for(location, distance, &undated));
        Ok(is_feasible(&placed, self.departure, self.speed)?.then_some(placed))
    }

    fn tail(&self, route: &Route) -> LocationId {
        route.last().map_or(self.hub, |stop| stop.location)
    }

    fn room(&self, route: &Route) -> usize {
        self.capacity.saturating_sub(route.task_count())
    }

    /// Destinations of `left` not yet on the route, hub excluded.
    fn unvisited(&self, route: &Route, left: &[&Task]) -> BTreeSet<LocationId> {
        let visited = route.visited();
        left.iter()
            .map(|task| task.destination)
            .filter(|location| *location != self.hub && !visited.contains(location))
            .collect()
    }
}

/// Up to `room` tasks of `left` bound for `location`, lowest id first.
fn take<'t>(left: &[&'t Task], location: LocationId, room: usize) -> Vec<&'t Task> {
    let mut here: Vec<&Task> =
        left.iter().copied().filter(|task| task.destination == location).collect();
    here.sort_by_key(|task| task.id);
    here.truncate(room);
    here
}

/// Pending tasks not yet placed on `route`.
fn remaining<'t>(route: &Route, pending: &[&'t Task]) -> Vec<&'t Task> {
    let placed: BTreeSet<TaskId> = route.task_ids().into_iter().collect();
    pending.iter().copied().filter(|task| !placed.contains(&task.id)).collect()
}

fn stop_for(location: LocationId, distance: f64, tasks: &[&Task]) -> Stop {
    let deadline = tasks.iter().filter_map(|task| task.deadline).min();
    let ids = tasks.iter().map(|task| task.id).collect();
    Stop::new(location, distance, ids, deadline)
}
