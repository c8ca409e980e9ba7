//! Motion planning
//!
//! Travel limits, three-phase safe moves and stepped jogs.

pub mod limits;
pub mod planner;

pub use limits::{AxisLimits, MotionError, TravelLimits};
pub use planner::{
    plan_jog, plan_safe_move, JogMove, MotionConfig, MoveDirective, SafeMovePlan, SpeedTiers,
};
