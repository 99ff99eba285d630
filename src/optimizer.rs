//! Windowed, deadline-aware reordering of a finished route.
//!
//! A window of `window_size` consecutive stops slides from the start of the
//! route to its end. Its first and last stops stay put; every ordering of the
//! `window_size - 2` stops between them is tried and the shortest one that
//! keeps the deadlines is written back before the window moves on. The work
//! per window is `(window_size - 2)!` candidates, so the window size is the
//! knob trading optimality for runtime: 7 means 120 candidates per window.

use jiff::civil::Time;
use jiff::SignedDuration;
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::error::RouteError;
use crate::matrix::DistanceMatrix;
use crate::route::Route;
use crate::time::{leg_duration, slack};
use crate::traits::SpeedProfile;

pub const DEFAULT_WINDOW_SIZE: usize = 7;

/// Distances closer than this are treated as equal.
const DISTANCE_EPSILON: f64 = 1e-9;

/// Index of the first stop projected to arrive after its earliest deadline.
///
/// Walks the whole route from the departure stop at `departure`.
pub fn first_late_stop<S: SpeedProfile>(
    route: &Route,
    departure: Time,
    speed: &S,
) -> Result<Option<usize>, RouteError> {
    let mut elapsed = SignedDuration::ZERO;
    for (index, pair) in route.stops().windows(2).enumerate() {
        let (previous, stop) = (&pair[0], &pair[1]);
        elapsed += leg_duration(speed, previous.location, stop.location, stop.distance)?;
        if let Some(deadline) = stop.deadline {
            if elapsed > slack(departure, deadline) {
                return Ok(Some(index + 1));
            }
        }
    }
    Ok(None)
}

/// Every deadline on `route` is met.
pub fn is_feasible<S: SpeedProfile>(
    route: &Route,
    departure: Time,
    speed: &S,
) -> Result<bool, RouteError> {
    Ok(first_late_stop(route, departure, speed)?.is_none())
}

pub struct SegmentOptimizer<'a, S> {
    matrix: &'a DistanceMatrix,
    speed: &'a S,
    departure: Time,
    window_size: usize,
}

struct Candidate {
    rank: usize,
    distance: f64,
    late: Option<usize>,
    route: Route,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        let tied = (self.distance - other.distance).abs() <= DISTANCE_EPSILON;
        self.distance < other.distance - DISTANCE_EPSILON || (tied && self.rank < other.rank)
    }
}

impl<'a, S: SpeedProfile> SegmentOptimizer<'a, S> {
    pub fn new(
        matrix: &'a DistanceMatrix,
        speed: &'a S,
        departure: Time,
        window_size: usize,
    ) -> Self {
        Self {
            matrix,
            speed,
            departure,
            window_size,
        }
    }

    /// Reorder `route` window by window.
    ///
    /// A route shorter than the window is treated as a single window; routes
    /// of three stops or fewer have nothing to reorder. Fails with
    /// [`RouteError::RouteInfeasible`] when a window has no ordering that keeps
    /// the deadlines.
    #[instrument(skip_all, level = "debug", fields(stops = route.len()))]
    pub fn optimize(&self, route: &Route) -> Result<Route, RouteError> {
        let len = route.len();
        let size = self.window_size.min(len);
        if len <= 3 || size < 4 {
            return Ok(route.clone());
        }

        let orderings: Vec<Vec<usize>> = permutations(size - 2).collect();
        let last_start = len - size;
        let mut route = route.clone();

        for start in 0..=last_start {
            let end = start + size - 1;
            let candidates = orderings
                .par_iter()
                .enumerate()
                .map(|(rank, ordering)| self.evaluate(&route, start, end, rank, ordering))
                .collect::<Result<Vec<Candidate>, RouteError>>()?;

            let identity_distance = candidates[0].distance;
            let identity_late = candidates[0].late;

            // Stops up to `start + 1` never move again once this window is done;
            // lateness beyond them can still be repaired by later windows.
            let settled = start + 1;
            let chosen = shortest(candidates.iter().filter(|c| c.late.is_none())).or_else(|| {
                if start == last_start {
                    None
                } else {
                    let repairable = |c: &&Candidate| c.late.is_some_and(|late| late > settled);
                    shortest(candidates.iter().filter(repairable))
                }
            });

            let Some(chosen) = chosen else {
                let stop = identity_late.unwrap_or(end);
                return Err(RouteError::RouteInfeasible {
                    window_start: start,
                    window_end: end,
                    stop,
                    location: route.stops()[stop].location,
                });
            };

            if chosen.rank != 0 {
                debug!(
                    start,
                    saved = identity_distance - chosen.distance,
                    "window reordered"
                );
                route = chosen.route.clone();
            }
        }

        Ok(route)
    }

    fn evaluate(
        &self,
        route: &Route,
        start: usize,
        end: usize,
        rank: usize,
        ordering: &[usize],
    ) -> Result<Candidate, RouteError> {
        let candidate = route.with_reordered(start + 1, ordering, self.matrix);
        let distance = candidate.stops()[start + 1..=end].iter().map(|stop| stop.distance).sum();
        let late = first_late_stop(&candidate, self.departure, self.speed)?;

        Ok(Candidate {
            rank,
            distance,
            late,
            route: candidate,
        })
    }
}

fn shortest<'c>(candidates: impl Iterator<Item = &'c Candidate>) -> Option<&'c Candidate> {
    candidates.fold(None, |best: Option<&Candidate>, candidate| match best {
        Some(best) if !candidate.beats(best) => Some(best),
        _ => Some(candidate),
    })
}

/// All orderings of `0..size`, identity first (Heap's algorithm).
pub fn permutations(size: usize) -> Permutations {
    Permutations {
        idxs: (0..size).collect(),
        swaps: vec![0; size],
        i: 0,
    }
}

pub struct Permutations {
    idxs: Vec<usize>,
    swaps: Vec<usize>,
    i: usize,
}

impl Iterator for Permutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.i > 0 {
            loop {
                if self.i >= self.swaps.len() {
                    return None;
                }
                if self.swaps[self.i] < self.i {
                    break;
                }
                self.swaps[self.i] = 0;
                self.i += 1;
            }
            self.idxs.swap(self.i, (self.i & 1) * self.swaps[self.i]);
            self.swaps[self.i] += 1;
        }
        self.i = 1;
        Some(self.idxs.clone())
    }
}
