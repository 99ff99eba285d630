//! Initial load selection driven by task constraints.
//!
//! Steps, each capped at the remaining capacity:
//! 1. tasks due within the urgency horizon;
//! 2. tasks pinned to this vehicle, plus every other deadline task when the
//!    vehicle leaves after the first dispatch;
//! 3. close deliver groups touched so far (all members, or none);
//! 4. tasks headed to a destination already in the load, then close groups
//!    again;
//! 5. drop deadline destinations furthest from the hub until visiting the
//!    remaining ones nearest-first meets every deadline;
//! 6. fold in whole groups, smallest first, while they fit and keep the
//!    deadlines.
//!
//! Whenever a step would overflow, the tasks closest to the hub are kept.

use std::collections::{BTreeMap, BTreeSet};

use jiff::civil::Time;
use tracing::debug;

use crate::construction::RouteConstructor;
use crate::error::RouteError;
use crate::groups::GroupIndex;
use crate::matrix::DistanceMatrix;
use crate::model::{LocationId, Task, TaskId, VehicleId};
use crate::optimizer::is_feasible;
use crate::route::Route;
use crate::traits::SpeedProfile;

/// Outcome of selection: the load, and what later phases may still add.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub load: BTreeSet<TaskId>,
    /// Candidates outside the load and outside every deliver group, id order.
    pub pending: Vec<&'a Task>,
}

/// Timing of one build.
#[derive(Debug, Clone, Copy)]
pub struct SelectionWindow {
    pub departure: Time,
    /// Deadlines at or before this are urgent.
    pub urgent_by: Time,
    /// The vehicle leaves after the first dispatch and can absorb the
    /// remaining deadline tasks.
    pub late_departure: bool,
}

pub struct ConstraintSelector<'a, S> {
    tasks: BTreeMap<TaskId, &'a Task>,
    groups: &'a GroupIndex,
    matrix: &'a DistanceMatrix,
    speed: &'a S,
    hub: LocationId,
    vehicle_id: VehicleId,
    capacity: usize,
}

impl<'a, S: SpeedProfile> ConstraintSelector<'a, S> {
    /// `tasks` must already be eligible for `vehicle_id`. Members of groups
    /// that are not wholly present are dropped here.
    pub fn new(
        tasks: &[&'a Task],
        groups: &'a GroupIndex,
        matrix: &'a DistanceMatrix,
        speed: &'a S,
        hub: LocationId,
        vehicle_id: VehicleId,
        capacity: usize,
    ) -> Self {
        let tasks = tasks
            .iter()
            .filter(|task| groups.group_of(task.id).is_none_or(|group| group.is_complete()))
            .map(|&task| (task.id, task))
            .collect();

        Self {
            tasks,
            groups,
            matrix,
            speed,
            hub,
            vehicle_id,
            capacity,
        }
    }

    pub fn select(&self, window: SelectionWindow) -> Result<Selection<'a>, RouteError> {
        let urgent = self.matching(|task| task.deadline.is_some_and(|d| d <= window.urgent_by));
        let mut load = self.admit(&BTreeSet::new(), urgent);
        debug!(urgent = load.len(), "urgent tasks admitted");

        let mut more = self.matching(|task| task.pinned_vehicle() == Some(self.vehicle_id));
        if window.late_departure {
            more.extend(self.matching(|task| task.deadline.is_some_and(|d| d > window.urgent_by)));
        }
        load = self.admit(&load, more);
        load = self.close_groups(load);

        let destinations: BTreeSet<LocationId> =
            load.iter().map(|id| self.tasks[id].destination).collect();
        let on_the_way = self.matching(|task| destinations.contains(&task.destination));
        load = self.admit(&load, on_the_way);
        load = self.close_groups(load);

        load = self.trim_deadlines(load, window.departure)?;
        load = self.fold_groups(load, window.departure)?;
        debug!(selected = load.len(), capacity = self.capacity, "selection finished");

        let pending = self
            .tasks
            .values()
            .filter(|task| !load.contains(&task.id) && !self.groups.is_grouped(task.id))
            .copied()
            .collect();

        Ok(Selection { load, pending })
    }

    fn matching<P>(&self, predicate: P) -> Vec<TaskId>
    where
        P: Fn(&Task) -> bool,
    {
        self.tasks
            .values()
            .filter(|task| predicate(task))
            .map(|task| task.id)
            .collect()
    }

    fn hub_distance(&self, id: TaskId) -> f64 {
        self.matrix.distance(self.hub, self.tasks[&id].destination)
    }

    /// `so_far` plus as much of `more` as capacity allows, closest to the
    /// hub first.
    fn admit(&self, so_far: &BTreeSet<TaskId>, more: Vec<TaskId>) -> BTreeSet<TaskId> {
        let mut more: Vec<TaskId> = more
            .into_iter()
            .filter(|id| !so_far.contains(id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let room = self.capacity.saturating_sub(so_far.len());
        if more.len() > room {
            more = closest_first(more, |id| self.hub_distance(id));
            debug!(dropped = more.len() - room, "capacity trimmed candidates");
            more.truncate(room);
        }

        so_far.iter().copied().chain(more).collect()
    }

    /// Complete every group the load touches, or drop its members.
    fn close_groups(&self, mut load: BTreeSet<TaskId>) -> BTreeSet<TaskId> {
        for group in self.groups.groups().iter().filter(|group| group.is_complete()) {
            let touched = group.members().iter().any(|id| load.contains(id));
            if !touched || group.members().is_subset(&load) {
                continue;
            }

            let missing = group.members().difference(&load).count();
            if load.len() + missing <= self.capacity {
                load.extend(group.members().iter().copied());
            } else {
                debug!(members = ?group.members(), "partial group dropped");
                load.retain(|id| !group.contains(*id));
            }
        }
        load
    }

    /// Drop the deadline tasks of the destination furthest from the hub,
    /// with every group they belong to, until the deadline stops of the load
    /// can all be served nearest-first.
    fn trim_deadlines(
        &self,
        mut load: BTreeSet<TaskId>,
        departure: Time,
    ) -> Result<BTreeSet<TaskId>, RouteError> {
        while !self.deadlines_met(&load, departure)? {
            let furthest = load
                .iter()
                .map(|id| self.tasks[id])
                .filter(|task| task.deadline.is_some())
                .map(|task| task.destination)
                .max_by(|&a, &b| {
                    let hub_distance = |location| self.matrix.distance(self.hub, location);
                    hub_distance(a).total_cmp(&hub_distance(b)).then(a.cmp(&b))
                });
            let Some(furthest) = furthest else {
                break;
            };

            let dropped: Vec<TaskId> = load
                .iter()
                .copied()
                .filter(|id| {
                    let task = self.tasks[id];
                    task.deadline.is_some() && task.destination == furthest
                })
                .collect();
            for id in &dropped {
                load.remove(id);
                if let Some(group) = self.groups.group_of(*id) {
                    load.retain(|member| !group.contains(*member));
                }
            }
            debug!(location = furthest, dropped = ?dropped, "deadline stop cannot be met");
        }
        Ok(load)
    }

    /// Add whole groups, smallest first, while they fit and keep the
    /// deadlines.
    fn fold_groups(
        &self,
        mut load: BTreeSet<TaskId>,
        departure: Time,
    ) -> Result<BTreeSet<TaskId>, RouteError> {
        for group in self.groups.groups().iter().filter(|group| group.is_complete()) {
            let missing = group.members().difference(&load).count();
            if missing == 0 {
                continue;
            }
            if load.len() + missing > self.capacity {
                debug!(members = ?group.members(), "group excluded from this trip");
                continue;
            }

            let extended: BTreeSet<TaskId> = load.union(group.members()).copied().collect();
            if self.deadlines_met(&extended, departure)? {
                load = extended;
            } else {
                debug!(members = ?group.members(), "group would miss a deadline");
            }
        }
        Ok(load)
    }

    /// Visiting the deadline destinations of `load` nearest-first, the way
    /// construction lays them out, is on time everywhere.
    fn deadlines_met(&self, load: &BTreeSet<TaskId>, departure: Time) -> Result<bool, RouteError> {
        let dated: Vec<&Task> = load
            .iter()
            .map(|id| self.tasks[id])
            .filter(|task| task.deadline.is_some())
            .collect();
        if dated.is_empty() {
            return Ok(true);
        }

        let constructor =
            RouteConstructor::new(self.matrix, self.speed, departure, self.hub, self.capacity);
        let destinations = dated.iter().map(|task| task.destination).collect();
        let route = constructor.visit_nearest(&Route::departing(self.hub), destinations, &dated);
        is_feasible(&route, departure, self.speed)
    }
}

/// Sort by (distance, id) ascending.
fn closest_first<F>(mut ids: Vec<TaskId>, distance: F) -> Vec<TaskId>
where
    F: Fn(TaskId) -> f64,
{
    ids.sort_by(|&a, &b| distance(a).total_cmp(&distance(b)).then(a.cmp(&b)));
    ids
}
