mod fixtures;

use fixtures::*;
use hub_route_planner::builder::{BuildOptions, FIRST_DISPATCH, RouteParameters, build_route};
use hub_route_planner::error::RouteError;
use hub_route_planner::model::{LocationId, TaskId};
use hub_route_planner::pool::TaskPool;
use hub_route_planner::route::PlannedRoute;

fn first_trip<S>(speed: &S) -> Result<PlannedRoute, RouteError>
where
    S: hub_route_planner::traits::SpeedProfile,
{
    let pool = TaskPool::new(downtown_tasks());
    let params = RouteParameters {
        vehicle_id: 1,
        capacity: 16,
        departure: FIRST_DISPATCH,
    };
    build_route(
        &pool.eligible_for(1),
        &downtown_matrix(),
        &downtown_locations(),
        speed,
        &params,
        &BuildOptions::default(),
    )
}

#[test]
fn smoke_first_trip_of_the_day() {
    // Slower on legs back to the hub.
    let speed = |_from: LocationId, to: LocationId| if to == 1 { 12.0 } else { 18.0 };
    let route = first_trip(&speed).unwrap();

    assert_eq!(route.load.len(), 16);
    for urgent in [1, 2, 3] {
        assert!(route.load.contains(&urgent), "urgent task {urgent} left behind");
    }
    assert!(!route.load.contains(&PINNED_TASK));
    assert!(!route.load.contains(&LATE_TASK));
    assert!(!route.load.contains(&MISADDRESSED_TASK));
    assert_route_invariants(&route, &downtown_tasks(), 16, 1);

    let report = route.to_string();
    assert!(report.starts_with("Vehicle 1 route:"));
    assert!(report.contains("City Hall"));

    let json = serde_json::to_value(&route).unwrap();
    assert_eq!(json["vehicle_id"], 1);
    assert_eq!(json["stops"][0]["location"]["landmark"], "Central Hub");
    let load: Vec<TaskId> = serde_json::from_value(json["load"].clone()).unwrap();
    assert_eq!(load, route.load);
}

#[test]
fn smoke_stalled_vehicle_is_reported() {
    let speed = |_from: LocationId, _to: LocationId| 0.0;
    let result = first_trip(&speed);
    assert!(matches!(result, Err(RouteError::InvalidSpeed { .. })));
}
