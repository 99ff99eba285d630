//! Dispatch loop tests
//!
//! A full day over the downtown fixture: late arrivals, destination
//! corrections, pinned tasks and deliver groups across two vehicles.

mod fixtures;

use std::collections::BTreeSet;

use jiff::civil::time;

use fixtures::*;
use hub_route_planner::builder::BuildOptions;
use hub_route_planner::dispatch::{DispatchSummary, Dispatcher, Vehicle};
use hub_route_planner::model::{Constraint, Task, TaskId, TaskState};
use hub_route_planner::pool::TaskPool;
use hub_route_planner::route::PlannedRoute;
use hub_route_planner::traits::ConstantSpeed;

// ============================================================================
// Test Helpers
// ============================================================================

fn run_day(vehicles: u32) -> (DispatchSummary, TaskPool, Dispatcher) {
    let mut pool = TaskPool::new(downtown_tasks());
    let mut dispatcher = Dispatcher::with_fleet(vehicles, BuildOptions::default());
    let summary = dispatcher
        .run(
            &mut pool,
            &downtown_matrix(),
            &downtown_locations(),
            &ConstantSpeed::default(),
            &downtown_corrections(),
        )
        .unwrap();
    (summary, pool, dispatcher)
}

fn route_carrying(summary: &DispatchSummary, id: TaskId) -> &PlannedRoute {
    summary
        .routes
        .iter()
        .find(|route| route.load.contains(&id))
        .unwrap_or_else(|| panic!("task {id} was never dispatched"))
}

// ============================================================================
// Full Day
// ============================================================================

#[test]
fn test_every_task_delivered_on_time() {
    let (summary, pool, _) = run_day(2);

    assert_eq!(summary.total_tasks, 24);
    assert_eq!(summary.delivered, 24);
    assert_eq!(summary.on_time, 24);
    assert!(pool.all_delivered());
}

#[test]
fn test_routes_keep_invariants() {
    let (summary, _, _) = run_day(2);

    // Destinations as known at dispatch time.
    let mut tasks = downtown_tasks();
    for task in &mut tasks {
        if task.id == MISADDRESSED_TASK {
            task.destination = CORRECTED_DESTINATION;
        }
    }

    let mut seen = BTreeSet::new();
    for route in &summary.routes {
        assert!(!route.is_empty());
        assert_route_invariants(route, &tasks, 16, route.vehicle_id);
        for id in &route.load {
            assert!(seen.insert(*id), "task {id} dispatched twice");
        }
    }
}

#[test]
fn test_pinned_task_rides_its_vehicle() {
    let (summary, _, _) = run_day(2);
    assert_eq!(route_carrying(&summary, PINNED_TASK).vehicle_id, 2);
}

#[test]
fn test_group_shares_one_route() {
    let (summary, _, _) = run_day(2);

    let route = route_carrying(&summary, GROUP[0]);
    for id in GROUP {
        assert!(route.load.contains(&id), "task {id} split from its group");
    }
}

#[test]
fn test_late_arrival_waits_for_its_truck() {
    let (summary, pool, _) = run_day(2);

    let route = route_carrying(&summary, LATE_TASK);
    assert!(route.departure().unwrap() >= LATE_TRUCK);

    let task = pool.get(LATE_TASK).unwrap();
    assert_eq!(pool.state_at(LATE_TASK, time(9, 0, 0, 0)), Some(TaskState::LateArrival));
    assert!(task.delivered_at().unwrap() > LATE_TRUCK);
}

#[test]
fn test_corrected_destination_is_used() {
    let (summary, pool, _) = run_day(2);

    let route = route_carrying(&summary, MISADDRESSED_TASK);
    assert!(route.departure().unwrap() >= CORRECTION_KNOWN);

    let stop = route
        .stops
        .iter()
        .find(|stop| stop.tasks.contains(&MISADDRESSED_TASK))
        .unwrap();
    assert_eq!(stop.location.id, CORRECTED_DESTINATION);

    let task = pool.get(MISADDRESSED_TASK).unwrap();
    assert_eq!(task.destination, CORRECTED_DESTINATION);
    assert_eq!(
        pool.state_at(MISADDRESSED_TASK, time(10, 0, 0, 0)),
        Some(TaskState::UnknownDestination)
    );
}

#[test]
fn test_vehicles_end_at_hub_with_mileage_accounted() {
    let (summary, _, dispatcher) = run_day(2);

    for vehicle in dispatcher.vehicles() {
        assert_eq!(vehicle.location, 1);
        assert!(vehicle.load.is_empty());
    }
    let driven: f64 = dispatcher.vehicles().iter().map(|v| v.mileage).sum();
    let planned: f64 = summary.routes.iter().map(PlannedRoute::total_distance).sum();
    assert!((driven - planned).abs() < 1e-9);
    assert!((summary.total_mileage - planned).abs() < 1e-9);
}

// ============================================================================
// Stalls
// ============================================================================

#[test]
fn test_task_pinned_to_missing_vehicle_is_left_behind() {
    let (summary, pool, _) = run_day(1);

    assert_eq!(summary.delivered, 23);
    assert_eq!(pool.get(PINNED_TASK).unwrap().state(), TaskState::Available);
    assert!(summary.routes.iter().all(|route| route.vehicle_id == 1));
}

#[test]
fn test_idle_vehicle_waits_for_late_truck() {
    let late = Task::with_constraint(1, 2, Constraint::DelayedArrival(LATE_TRUCK));
    let mut pool = TaskPool::new([late]);
    let vehicles = vec![Vehicle::new(1, 1).capacity(4)];
    let mut dispatcher = Dispatcher::new(vehicles, BuildOptions::default());

    let summary = dispatcher
        .run(
            &mut pool,
            &downtown_matrix(),
            &downtown_locations(),
            &ConstantSpeed::default(),
            &[],
        )
        .unwrap();

    assert_eq!(summary.routes.len(), 1);
    assert_eq!(summary.routes[0].departure(), Some(LATE_TRUCK));
    assert_eq!(summary.delivered, 1);
}
