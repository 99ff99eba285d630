//! hub-route-planner core
//!
//! Builds a single hub-to-hub delivery route for one vehicle trip: constraint
//! driven task selection, nearest-neighbor construction, detour insertion and
//! a windowed, deadline-aware reordering pass.

pub mod arrival;
pub mod builder;
pub mod construction;
pub mod dispatch;
pub mod error;
pub mod groups;
pub mod matrix;
pub mod model;
pub mod optimizer;
pub mod pool;
pub mod route;
pub mod selection;
pub mod time;
pub mod traits;
