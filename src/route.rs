//! Stops and routes as values.
//!
//! Every edit returns a new [`Route`]; phases of the builder are plain
//! functions from one route to the next.

use std::collections::BTreeSet;
use std::fmt;

use jiff::civil::Time;
use serde::{Deserialize, Serialize};

use crate::matrix::DistanceMatrix;
use crate::model::{Location, LocationId, TaskId, VehicleId};

/// One drop-off location on a route under construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub location: LocationId,
    /// Miles from the previous stop.
    pub distance: f64,
    pub tasks: Vec<TaskId>,
    /// Earliest deadline among `tasks`.
    pub deadline: Option<Time>,
}

impl Stop {
    pub fn new(
        location: LocationId,
        distance: f64,
        tasks: Vec<TaskId>,
        deadline: Option<Time>,
    ) -> Self {
        Self {
            location,
            distance,
            tasks,
            deadline,
        }
    }

    /// An empty stop at the hub.
    pub fn hub(hub: LocationId, distance: f64) -> Self {
        Self::new(hub, distance, Vec::new(), None)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Route {
    stops: Vec<Stop>,
}

impl Route {
    /// A route holding only the departure stop at the hub.
    pub fn departing(hub: LocationId) -> Self {
        Self {
            stops: vec![Stop::hub(hub, 0.0)],
        }
    }

    pub fn from_stops(stops: Vec<Stop>) -> Self {
        Self { stops }
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn last(&self) -> Option<&Stop> {
        self.stops.last()
    }

    pub fn total_distance(&self) -> f64 {
        self.stops.iter().map(|stop| stop.distance).sum()
    }

    pub fn task_count(&self) -> usize {
        self.stops.iter().map(|stop| stop.tasks.len()).sum()
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.stops
            .iter()
            .flat_map(|stop| stop.tasks.iter().copied())
            .collect()
    }

    pub fn visited(&self) -> BTreeSet<LocationId> {
        self.stops.iter().map(|stop| stop.location).collect()
    }

    /// Index of the last stop carrying a deadline.
    pub fn last_deadline_stop(&self) -> Option<usize> {
        self.stops.iter().rposition(|stop| stop.deadline.is_some())
    }

    pub fn with_appended(&self, stop: Stop) -> Self {
        let mut stops = self.stops.clone();
        stops.push(stop);
        Self { stops }
    }

    /// Insert `stop` at `index`; the stop that follows it has its distance
    /// re-measured from the new stop.
    pub fn with_inserted(&self, index: usize, stop: Stop, matrix: &DistanceMatrix) -> Self {
        let mut stops = self.stops.clone();
        let inserted_at = stop.location;
        stops.insert(index, stop);
        if let Some(next) = stops.get_mut(index + 1) {
            next.distance = matrix.distance(inserted_at, next.location);
        }
        Self { stops }
    }

    /// Replace `stops[start..start + ordering.len()]` with those stops taken in
    /// `ordering` (indices relative to `start`), re-measuring distances from
    /// `start` to the stop after the slice.
    pub fn with_reordered(
        &self,
        start: usize,
        ordering: &[usize],
        matrix: &DistanceMatrix,
    ) -> Self {
        let mut stops = self.stops.clone();
        for (offset, &from) in ordering.iter().enumerate() {
            stops[start + offset] = self.stops[start + from].clone();
        }

        let end = (start + ordering.len() + 1).min(stops.len());
        for index in start.max(1)..end {
            let previous = stops[index - 1].location;
            stops[index].distance = matrix.distance(previous, stops[index].location);
        }
        Self { stops }
    }
}

/// A stop with its resolved location and projected arrival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStop {
    pub location: Location,
    pub distance: f64,
    pub tasks: Vec<TaskId>,
    pub arrival: Time,
}

/// The finished hub-to-hub route for one trip, plus the load it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedRoute {
    pub vehicle_id: VehicleId,
    pub stops: Vec<PlannedStop>,
    pub load: Vec<TaskId>,
}

impl PlannedRoute {
    pub fn empty(vehicle_id: VehicleId) -> Self {
        Self {
            vehicle_id,
            stops: Vec::new(),
            load: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn total_distance(&self) -> f64 {
        self.stops.iter().map(|stop| stop.distance).sum()
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.stops
            .iter()
            .flat_map(|stop| stop.tasks.iter().copied())
            .collect()
    }

    pub fn departure(&self) -> Option<Time> {
        self.stops.first().map(|stop| stop.arrival)
    }

    pub fn return_time(&self) -> Option<Time> {
        self.stops.last().map(|stop| stop.arrival)
    }
}

impl fmt::Display for PlannedRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Vehicle {} route: {:.1} miles, {} stops, {} tasks",
            self.vehicle_id,
            self.total_distance(),
            self.stops.len(),
            self.load.len()
        )?;
        for (index, stop) in self.stops.iter().enumerate() {
            let mut tasks = stop.tasks.clone();
            tasks.sort_unstable();
            writeln!(
                f,
                "  {:>2}. {} {} (+{:.1} mi) tasks {:?}",
                index + 1,
                stop.arrival,
                stop.location.landmark,
                stop.distance,
                tasks
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> DistanceMatrix {
        DistanceMatrix::from_rows(vec![
            vec![0.0, 2.0, 4.0, 5.0],
            vec![2.0, 0.0, 3.0, 4.0],
            vec![4.0, 3.0, 0.0, 1.0],
            vec![5.0, 4.0, 1.0, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_insert_remeasures_next_stop() {
        let matrix = matrix();
        let route = Route::departing(1).with_appended(Stop::new(3, 4.0, vec![1], None));
        let route = route.with_inserted(1, Stop::new(2, 2.0, vec![2], None), &matrix);

        let locations: Vec<LocationId> = route.stops().iter().map(|s| s.location).collect();
        assert_eq!(locations, vec![1, 2, 3]);
        assert_eq!(route.stops()[2].distance, 3.0);
        assert_eq!(route.total_distance(), 5.0);
    }

    #[test]
    fn test_reorder_remeasures_window_and_successor() {
        let matrix = matrix();
        let route = Route::from_stops(vec![
            Stop::hub(1, 0.0),
            Stop::new(3, 4.0, vec![1], None),
            Stop::new(2, 3.0, vec![2], None),
            Stop::new(4, 4.0, vec![3], None),
            Stop::hub(1, 5.0),
        ]);

        let reordered = route.with_reordered(1, &[1, 0], &matrix);
        let locations: Vec<LocationId> = reordered.stops().iter().map(|s| s.location).collect();
        assert_eq!(locations, vec![1, 2, 3, 4, 1]);
        let distances: Vec<f64> = reordered.stops().iter().map(|s| s.distance).collect();
        assert_eq!(distances, vec![0.0, 2.0, 3.0, 1.0, 5.0]);
        // The original is untouched.
        assert_eq!(route.stops()[1].location, 3);
    }

    #[test]
    fn test_last_deadline_stop() {
        let deadline = Some(jiff::civil::time(10, 30, 0, 0));
        let route = Route::departing(1)
            .with_appended(Stop::new(2, 2.0, vec![1], deadline))
            .with_appended(Stop::new(3, 3.0, vec![2], None));
        assert_eq!(route.last_deadline_stop(), Some(1));
        assert_eq!(Route::departing(1).last_deadline_stop(), None);
    }
}
