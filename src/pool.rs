//! The shared, shrinking set of tasks the dispatch loop draws from.
//!
//! Route builds only ever see a snapshot. The one mutation a build depends on
//! is [`TaskPool::claim`], which moves a whole load out of the Available state
//! at once so no later build can pick any of it up.

use std::collections::BTreeMap;

use jiff::civil::Time;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{LocationId, Task, TaskId, TaskState, VehicleId};

/// Late information about where a task with a pending destination must go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationCorrection {
    pub task_id: TaskId,
    /// When the corrected destination becomes known. `None` means now.
    pub known_at: Option<Time>,
    pub location: Option<LocationId>,
}

impl DestinationCorrection {
    pub fn new(task_id: TaskId) -> Self {
        Self {
            task_id,
            known_at: None,
            location: None,
        }
    }

    pub fn known_at(mut self, at: Time) -> Self {
        self.known_at = Some(at);
        self
    }

    pub fn location(mut self, location: LocationId) -> Self {
        self.location = Some(location);
        self
    }

    /// Fill this correction's gaps from newer information for the same task.
    pub fn merge(&mut self, newer: &DestinationCorrection) {
        if newer.task_id != self.task_id {
            return;
        }
        self.known_at = newer.known_at.or(self.known_at);
        self.location = newer.location.or(self.location);
    }

    fn applies_at(&self, now: Time) -> bool {
        self.location.is_some() && self.known_at.is_none_or(|at| at <= now)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskPool {
    tasks: BTreeMap<TaskId, Task>,
}

impl TaskPool {
    pub fn new(tasks: impl IntoIterator<Item = Task>) -> Self {
        Self {
            tasks: tasks.into_iter().map(|task| (task.id, task)).collect(),
        }
    }

    pub fn insert(&mut self, task: Task) -> Option<Task> {
        self.tasks.insert(task.id, task)
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Tasks a build for `vehicle` may select from, in id order.
    pub fn eligible_for(&self, vehicle: VehicleId) -> Vec<&Task> {
        self.tasks
            .values()
            .filter(|task| task.is_eligible_for(vehicle))
            .collect()
    }

    /// Take every task in `ids` out of the pool, or none of them.
    ///
    /// Returns false, leaving the pool untouched, if any id is unknown or no
    /// longer Available.
    pub fn claim(&mut self, ids: &[TaskId], at: Time) -> bool {
        let claimable = ids.iter().all(|id| {
            self.tasks
                .get(id)
                .is_some_and(|task| task.state() == TaskState::Available)
        });
        if !claimable {
            return false;
        }

        for id in ids {
            if let Some(task) = self.tasks.get_mut(id) {
                task.transition(TaskState::InTransit, at);
            }
        }
        true
    }

    /// Mark late tasks that have reached the hub by `now` as Available.
    ///
    /// The history records the announced arrival, not `now`.
    pub fn release_late_arrivals(&mut self, now: Time) -> usize {
        let mut released = 0;
        for task in self.tasks.values_mut() {
            if task.state() != TaskState::LateArrival {
                continue;
            }
            if let Some(arrival) = task.earliest_available().filter(|&at| at <= now) {
                task.transition(TaskState::Available, arrival);
                released += 1;
            }
        }
        if released > 0 {
            debug!(released, %now, "late arrivals released");
        }
        released
    }

    /// Give pending-destination tasks their corrected destination once known.
    pub fn apply_corrections(&mut self, corrections: &[DestinationCorrection], now: Time) -> usize {
        let mut corrected = 0;
        for correction in corrections.iter().filter(|c| c.applies_at(now)) {
            let Some(task) = self.tasks.get_mut(&correction.task_id) else {
                continue;
            };
            if task.state() != TaskState::UnknownDestination {
                continue;
            }
            if let Some(location) = correction.location {
                task.destination = location;
                task.transition(TaskState::Available, now);
                corrected += 1;
            }
        }
        if corrected > 0 {
            debug!(corrected, %now, "destination corrections applied");
        }
        corrected
    }

    /// Earliest moment after `now` at which a waiting task could become
    /// Available.
    pub fn next_release_after(
        &self,
        now: Time,
        corrections: &[DestinationCorrection],
    ) -> Option<Time> {
        let late = self
            .tasks
            .values()
            .filter(|task| task.state() == TaskState::LateArrival)
            .filter_map(Task::earliest_available);

        let corrected = corrections
            .iter()
            .filter(|c| c.location.is_some())
            .filter(|c| {
                self.tasks
                    .get(&c.task_id)
                    .is_some_and(|task| task.state() == TaskState::UnknownDestination)
            })
            .filter_map(|c| c.known_at);

        late.chain(corrected).filter(|&at| at > now).min()
    }

    pub fn mark_delivered(&mut self, id: TaskId, at: Time) -> bool {
        match self.tasks.get_mut(&id) {
            Some(task) if task.state() == TaskState::InTransit => {
                task.transition(TaskState::Delivered, at);
                true
            }
            _ => false,
        }
    }

    /// Status snapshot of one task at a past moment.
    pub fn state_at(&self, id: TaskId, at: Time) -> Option<TaskState> {
        self.tasks.get(&id).map(|task| task.state_at(at))
    }

    /// Delivered, and by its deadline if it has one.
    pub fn delivered_on_time(&self, id: TaskId) -> bool {
        self.tasks.get(&id).is_some_and(|task| match task.delivered_at() {
            Some(at) => task.deadline.is_none_or(|deadline| at <= deadline),
            None => false,
        })
    }

    pub fn delivered_count(&self) -> usize {
        self.tasks
            .values()
            .filter(|task| task.state() == TaskState::Delivered)
            .count()
    }

    pub fn all_delivered(&self) -> bool {
        self.tasks
            .values()
            .all(|task| task.state() == TaskState::Delivered)
    }
}
