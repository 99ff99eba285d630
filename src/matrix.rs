//! Symmetric travel-distance lookup by location number.

use serde::{Deserialize, Serialize};

use crate::error::RouteError;
use crate::model::LocationId;

/// Tolerance used when checking symmetry of parsed distances.
const SYMMETRY_EPSILON: f64 = 1e-9;

/// Distances in miles between numbered locations.
///
/// Location ids run from 1 to `len()`; id `k` is row and column `k - 1` of the
/// supplied data. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    miles: Vec<Vec<f64>>,
}

impl DistanceMatrix {
    /// Build from full square rows, ordered by location id starting at 1.
    pub fn from_rows(miles: Vec<Vec<f64>>) -> Result<Self, RouteError> {
        let n = miles.len();
        if n == 0 {
            return Err(RouteError::InvalidMatrix("no locations".to_string()));
        }

        if let Some((i, row)) = miles.iter().enumerate().find(|(_, row)| row.len() != n) {
            return Err(RouteError::InvalidMatrix(format!(
                "row {} has {} entries, expected {}",
                i + 1,
                row.len(),
                n
            )));
        }

        for (i, row) in miles.iter().enumerate() {
            if row[i] != 0.0 {
                return Err(RouteError::InvalidMatrix(format!(
                    "distance from {} to itself is {}",
                    i + 1,
                    row[i]
                )));
            }
            for (j, &value) in row.iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(RouteError::InvalidMatrix(format!(
                        "distance from {} to {} is {}",
                        i + 1,
                        j + 1,
                        value
                    )));
                }
                if (value - miles[j][i]).abs() > SYMMETRY_EPSILON {
                    return Err(RouteError::InvalidMatrix(format!(
                        "distance from {} to {} differs from the reverse",
                        i + 1,
                        j + 1
                    )));
                }
            }
        }

        Ok(Self { miles })
    }

    /// Build from a lower triangle: row `k` holds distances from location
    /// `k + 1` to locations `1..=k + 1`, the last entry being the zero diagonal.
    pub fn from_lower_triangle(rows: Vec<Vec<f64>>) -> Result<Self, RouteError> {
        let n = rows.len();
        let mut miles = vec![vec![0.0; n]; n];

        for (i, row) in rows.iter().enumerate() {
            if row.len() != i + 1 {
                return Err(RouteError::InvalidMatrix(format!(
                    "triangle row {} has {} entries, expected {}",
                    i + 1,
                    row.len(),
                    i + 1
                )));
            }
            for (j, &value) in row.iter().enumerate() {
                miles[i][j] = value;
                miles[j][i] = value;
            }
        }

        Self::from_rows(miles)
    }

    /// Number of locations, hub included.
    pub fn len(&self) -> usize {
        self.miles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.miles.is_empty()
    }

    pub fn contains(&self, id: LocationId) -> bool {
        id >= 1 && id <= self.miles.len()
    }

    /// Location ids in matrix order.
    pub fn location_ids(&self) -> impl Iterator<Item = LocationId> + '_ {
        1..=self.miles.len()
    }

    /// Distance between two known locations.
    ///
    /// Callers validate ids up front; an unknown id here is a programming error.
    pub fn distance(&self, from: LocationId, to: LocationId) -> f64 {
        self.miles[from - 1][to - 1]
    }

    pub fn try_distance(&self, from: LocationId, to: LocationId) -> Result<f64, RouteError> {
        for id in [from, to] {
            if !self.contains(id) {
                return Err(RouteError::UnknownLocation(id));
            }
        }
        Ok(self.distance(from, to))
    }

    /// The first location in matrix order nearest to `from` among `eligible`.
    pub fn nearest<F>(&self, from: LocationId, eligible: F) -> Option<(LocationId, f64)>
    where
        F: Fn(LocationId) -> bool,
    {
        let mut best: Option<(LocationId, f64)> = None;
        for id in self.location_ids().filter(|&id| eligible(id)) {
            let dist = self.distance(from, id);
            if best.is_none_or(|(_, best_dist)| dist < best_dist) {
                best = Some((id, dist));
            }
        }
        best
    }
}
