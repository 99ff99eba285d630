//! Delivery domain values: locations, tasks and their constraints.

use jiff::civil::{Time, time};
use serde::{Deserialize, Serialize};

/// Location number. Indexes the distance matrix directly.
pub type LocationId = usize;
/// Unique task (package) identifier.
pub type TaskId = u32;
/// Vehicle (truck) identifier.
pub type VehicleId = u32;

/// Location number of the hub every route starts and ends at.
pub const HUB: LocationId = 1;

/// Time stamped on the first history record of every task.
pub const LOADED_AT: Time = time(7, 59, 0, 0);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub landmark: String,
    pub address: String,
}

impl Location {
    pub fn new(id: LocationId, landmark: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id,
            landmark: landmark.into(),
            address: address.into(),
        }
    }
}

/// The single special handling rule attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Constraint {
    #[default]
    Unconstrained,
    /// Only this vehicle may carry the task.
    PinnedToVehicle(VehicleId),
    /// Must ride on the same route as every listed task.
    MustDeliverWith(Vec<TaskId>),
    /// Reaches the hub at this time; not selectable before.
    DelayedArrival(Time),
    /// Destination on file is wrong; waits for a correction.
    DestinationPending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// At the hub, selectable.
    Available,
    /// Not at the hub yet.
    LateArrival,
    /// At the hub, destination unknown.
    UnknownDestination,
    InTransit,
    Delivered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub state: TaskState,
    pub time: Time,
}

/// A package to deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub deadline: Option<Time>,
    /// Kilograms. Carried for reporting only.
    pub weight: Option<f64>,
    pub destination: LocationId,
    pub constraint: Constraint,
    state: TaskState,
    history: Vec<HistoryRecord>,
}

impl Task {
    pub fn new(id: TaskId, destination: LocationId) -> Self {
        Self::with_constraint(id, destination, Constraint::Unconstrained)
    }

    /// Create a task whose initial state follows from its constraint.
    pub fn with_constraint(id: TaskId, destination: LocationId, constraint: Constraint) -> Self {
        let state = match constraint {
            Constraint::DelayedArrival(_) => TaskState::LateArrival,
            Constraint::DestinationPending => TaskState::UnknownDestination,
            _ => TaskState::Available,
        };

        Self {
            id,
            deadline: None,
            weight: None,
            destination,
            constraint,
            state,
            history: vec![HistoryRecord {
                state,
                time: LOADED_AT,
            }],
        }
    }

    pub fn deadline(mut self, deadline: Time) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn weight(mut self, kilograms: f64) -> Self {
        self.weight = Some(kilograms);
        self
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn history(&self) -> &[HistoryRecord] {
        &self.history
    }

    pub fn pinned_vehicle(&self) -> Option<VehicleId> {
        match self.constraint {
            Constraint::PinnedToVehicle(vehicle) => Some(vehicle),
            _ => None,
        }
    }

    pub fn co_delivery(&self) -> &[TaskId] {
        match &self.constraint {
            Constraint::MustDeliverWith(ids) => ids,
            _ => &[],
        }
    }

    pub fn earliest_available(&self) -> Option<Time> {
        match self.constraint {
            Constraint::DelayedArrival(at) => Some(at),
            _ => None,
        }
    }

    pub fn destination_unknown(&self) -> bool {
        matches!(self.constraint, Constraint::DestinationPending)
    }

    /// Available and either unpinned or pinned to `vehicle`.
    pub fn is_eligible_for(&self, vehicle: VehicleId) -> bool {
        self.state == TaskState::Available
            && self.pinned_vehicle().is_none_or(|pinned| pinned == vehicle)
    }

    /// Move to `state` and append the transition to the history.
    pub(crate) fn transition(&mut self, state: TaskState, at: Time) {
        self.state = state;
        self.history.push(HistoryRecord { state, time: at });
    }

    /// State the task was in at `at`, according to its history.
    pub fn state_at(&self, at: Time) -> TaskState {
        self.history
            .iter()
            .take_while(|record| record.time <= at)
            .last()
            .or_else(|| self.history.first())
            .map(|record| record.state)
            .unwrap_or(self.state)
    }

    /// Time of the first Delivered record, if any.
    pub fn delivered_at(&self) -> Option<Time> {
        self.history
            .iter()
            .find(|record| record.state == TaskState::Delivered)
            .map(|record| record.time)
    }
}
