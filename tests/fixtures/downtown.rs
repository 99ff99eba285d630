//! A compact downtown delivery area: the hub plus twelve drop points on a
//! two-mile square grid, and a day's worth of tasks exercising every
//! constraint.

use jiff::civil::{Time, time};

use hub_route_planner::matrix::DistanceMatrix;
use hub_route_planner::model::{Constraint, Location, Task};
use hub_route_planner::pool::DestinationCorrection;

use super::manhattan_matrix;

/// Grid coordinates in miles, indexed by location id - 1. The hub is first.
pub const DOWNTOWN: [(f64, f64); 13] = [
    (0.0, 0.0),   // 1  Hub
    (0.5, 0.2),   // 2
    (0.8, -0.3),  // 3
    (-0.4, 0.6),  // 4
    (-0.9, -0.8), // 5
    (0.3, 0.9),   // 6
    (0.6, 0.7),   // 7
    (1.0, 1.0),   // 8
    (-0.7, 0.1),  // 9
    (-0.2, -0.6), // 10
    (0.9, -0.9),  // 11
    (-1.0, 0.9),  // 12
    (0.1, -1.0),  // 13
];

const LANDMARKS: [&str; 13] = [
    "Central Hub",
    "City Hall",
    "Market Square",
    "Public Library",
    "Rail Yard",
    "Museum of Art",
    "Opera House",
    "North Park",
    "Old Mill",
    "Courthouse",
    "River Docks",
    "West Gate",
    "South Clinic",
];

pub const TEN_AM: Time = time(10, 0, 0, 0);
pub const NOON: Time = time(12, 0, 0, 0);
pub const LATE_TRUCK: Time = time(9, 5, 0, 0);
pub const CORRECTION_KNOWN: Time = time(10, 20, 0, 0);

/// Task pinned to vehicle 2.
pub const PINNED_TASK: u32 = 4;
/// Tasks that must ride together.
pub const GROUP: [u32; 3] = [5, 6, 7];
/// Task arriving on the late truck.
pub const LATE_TASK: u32 = 8;
/// Task whose destination is corrected mid-morning.
pub const MISADDRESSED_TASK: u32 = 9;
/// Where the misaddressed task really goes.
pub const CORRECTED_DESTINATION: usize = 10;

pub fn downtown_matrix() -> DistanceMatrix {
    manhattan_matrix(&DOWNTOWN)
}

pub fn downtown_locations() -> Vec<Location> {
    LANDMARKS
        .iter()
        .enumerate()
        .map(|(i, landmark)| Location::new(i + 1, *landmark, format!("{} Grid Ave", (i + 1) * 100)))
        .collect()
}

pub fn downtown_tasks() -> Vec<Task> {
    let mut tasks = vec![
        Task::new(1, 2).deadline(TEN_AM).weight(2.0),
        Task::new(2, 3).deadline(TEN_AM).weight(5.5),
        Task::new(3, 4).deadline(TEN_AM),
        Task::with_constraint(PINNED_TASK, 5, Constraint::PinnedToVehicle(2)),
        Task::with_constraint(5, 6, Constraint::MustDeliverWith(vec![6])),
        Task::with_constraint(6, 7, Constraint::MustDeliverWith(vec![7])),
        Task::new(7, 8),
        Task::with_constraint(LATE_TASK, 9, Constraint::DelayedArrival(LATE_TRUCK))
            .deadline(time(13, 0, 0, 0)),
        Task::with_constraint(MISADDRESSED_TASK, 11, Constraint::DestinationPending),
        Task::new(10, 12).deadline(NOON),
        Task::new(11, 13).deadline(NOON),
    ];

    // Plain parcels spread over the grid.
    let spread = [2, 3, 5, 6, 7, 8, 9, 10, 11, 12, 13, 4, 10];
    tasks.extend(
        spread
            .iter()
            .enumerate()
            .map(|(i, &destination)| Task::new(12 + i as u32, destination)),
    );
    tasks
}

pub fn downtown_corrections() -> Vec<DestinationCorrection> {
    vec![
        DestinationCorrection::new(MISADDRESSED_TASK)
            .known_at(CORRECTION_KNOWN)
            .location(CORRECTED_DESTINATION),
    ]
}
