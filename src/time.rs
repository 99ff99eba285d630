//! Clock arithmetic for projected arrivals.
//!
//! Travel time is rounded to whole seconds per leg. Feasibility checks and
//! arrival projection both go through [`leg_duration`], so they never disagree.

use jiff::SignedDuration;
use jiff::civil::Time;

use crate::error::RouteError;
use crate::model::LocationId;
use crate::traits::SpeedProfile;

/// Time to drive `miles` from `from` to `to`.
pub fn leg_duration<S: SpeedProfile + ?Sized>(
    speed: &S,
    from: LocationId,
    to: LocationId,
    miles: f64,
) -> Result<SignedDuration, RouteError> {
    if miles == 0.0 {
        return Ok(SignedDuration::ZERO);
    }

    let mph = speed.mph(from, to);
    if !mph.is_finite() || mph <= 0.0 {
        return Err(RouteError::InvalidSpeed { from, to, mph });
    }

    let seconds = (miles / mph * 3600.0).round() as i64;
    Ok(SignedDuration::from_secs(seconds))
}

/// `start` advanced by `elapsed`; errors if the result passes midnight.
pub fn advance(start: Time, elapsed: SignedDuration) -> Result<Time, RouteError> {
    Ok(start.checked_add(elapsed)?)
}

/// Signed offset of `deadline` from `start`.
pub fn slack(start: Time, deadline: Time) -> SignedDuration {
    deadline.duration_since(start)
}

/// `start` plus `minutes`, saturating at the end of the day.
pub fn horizon(start: Time, minutes: i64) -> Time {
    start.saturating_add(SignedDuration::from_mins(minutes))
}
