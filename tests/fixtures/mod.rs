//! Test fixtures for hub-route-planner.
//!
//! Provides:
//! - A small downtown delivery area with a Manhattan-distance matrix
//! - Matrix builders for hand-made geometries
//! - Route invariant checks shared by the integration tests

#![allow(dead_code)]

pub mod downtown;

pub use downtown::*;

use std::collections::{BTreeSet, HashMap};

use hub_route_planner::matrix::DistanceMatrix;
use hub_route_planner::model::{HUB, Location, Task, TaskId, VehicleId};
use hub_route_planner::route::PlannedRoute;

/// Matrix with Manhattan distances (miles) between `points`; the first point
/// is the hub.
pub fn manhattan_matrix(points: &[(f64, f64)]) -> DistanceMatrix {
    let rows = points
        .iter()
        .map(|from| {
            points
                .iter()
                .map(|to| (from.0 - to.0).abs() + (from.1 - to.1).abs())
                .collect()
        })
        .collect();
    DistanceMatrix::from_rows(rows).expect("manhattan distances form a valid matrix")
}

/// Placeholder location records for ids `1..=count`.
pub fn numbered_locations(count: usize) -> Vec<Location> {
    (1..=count)
        .map(|id| Location::new(id, format!("Stop {id}"), format!("{id} Main St")))
        .collect()
}

pub fn refs(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().collect()
}

/// Assert every property a finished route must hold.
pub fn assert_route_invariants(
    route: &PlannedRoute,
    tasks: &[Task],
    capacity: usize,
    vehicle: VehicleId,
) {
    if route.is_empty() {
        assert!(route.load.is_empty(), "empty route must carry nothing");
        return;
    }

    let by_id: HashMap<TaskId, &Task> = tasks.iter().map(|task| (task.id, task)).collect();

    // Round-trip shape
    assert_eq!(route.stops.first().unwrap().location.id, HUB, "route must start at the hub");
    assert_eq!(route.stops.last().unwrap().location.id, HUB, "route must end at the hub");
    assert_eq!(route.stops[0].distance, 0.0, "departure stop has no distance");
    assert!(route.stops.last().unwrap().tasks.is_empty(), "nothing is dropped at the return stop");

    // No duplication, and the load matches the stops
    let placed = route.task_ids();
    let unique: BTreeSet<TaskId> = placed.iter().copied().collect();
    assert_eq!(unique.len(), placed.len(), "a task appears on two stops");
    let load: BTreeSet<TaskId> = route.load.iter().copied().collect();
    assert_eq!(unique, load, "stops and load disagree");

    // Capacity
    assert!(load.len() <= capacity, "load of {} exceeds capacity {}", load.len(), capacity);

    for stop in &route.stops {
        for id in &stop.tasks {
            let task = by_id[id];
            // Destination
            assert_eq!(task.destination, stop.location.id, "task {id} dropped at the wrong stop");
            // Exclusivity
            if let Some(pinned) = task.pinned_vehicle() {
                assert_eq!(pinned, vehicle, "task {id} is pinned to vehicle {pinned}");
            }
            // Deadline
            if let Some(deadline) = task.deadline {
                assert!(
                    stop.arrival <= deadline,
                    "task {id} arrives {} after {deadline}",
                    stop.arrival
                );
            }
        }
    }

    // Atomicity
    for task in tasks {
        for other in task.co_delivery() {
            if load.contains(&task.id) || load.contains(other) {
                assert!(
                    load.contains(&task.id) && load.contains(other),
                    "tasks {} and {} must ride together",
                    task.id,
                    other
                );
            }
        }
    }
}
