//! Safe move and jog planning
//!
//! Every cartesian move to a new location is split into three phases so the
//! head never drags through labware:
//!
//! 1. Lift to a safe height above both the current and the target Z
//! 2. Translate in X/Y
//! 3. Descend to the target Z
//!
//! Plans are validated against the travel limits before any directive is
//! issued.

use heapless::Vec;

use crate::config::SyringeParameters;
use crate::geometry::{Axis, AxisTarget, Point3, Position};

use super::limits::{MotionError, TravelLimits};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Speed tiers and the step sizes that select them
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpeedTiers {
    /// mm/s
    pub slow: f64,
    /// mm/s
    pub medium: f64,
    /// mm/s
    pub high: f64,
    /// Steps up to this size (mm) use the slow tier
    pub slow_step_max_mm: f64,
    /// Steps below this size (mm) use the medium tier
    pub medium_step_max_mm: f64,
}

impl Default for SpeedTiers {
    fn default() -> Self {
        Self {
            slow: 10.0,
            medium: 40.0,
            high: 160.0,
            slow_step_max_mm: 10.0,
            medium_step_max_mm: 50.0,
        }
    }
}

/// Motion configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MotionConfig {
    pub limits: TravelLimits,
    pub speeds: SpeedTiers,
    /// Height added above the higher of current and target Z before translating
    pub lift_clearance_mm: f64,
    /// Z used when visiting a deck slot
    pub slot_height_mm: f64,
    /// Long jogs run fast until this close to the target, then slow
    pub approach_distance_mm: f64,
    /// Z lift before drawing an air gap
    pub air_gap_lift_mm: f64,
    /// Air gap volume (nL)
    pub air_gap_nl: f64,
    /// Extra volume drawn and returned around an aspiration (nL)
    pub backlash_nl: f64,
    /// Default flow rate (nL/s)
    pub default_rate_nl_s: f64,
    /// Pause after aspirating or dispensing (ms)
    pub settle_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            limits: TravelLimits::default(),
            speeds: SpeedTiers::default(),
            lift_clearance_mm: 40.0,
            slot_height_mm: 150.0,
            approach_distance_mm: 10.0,
            air_gap_lift_mm: 25.0,
            air_gap_nl: 50.0,
            backlash_nl: 100.0,
            default_rate_nl_s: 50.0,
            settle_ms: 1000,
        }
    }
}

/// One phase of a safe move
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveDirective {
    Lift { z: f64 },
    Translate { x: f64, y: f64 },
    Descend { z: f64 },
}

impl MoveDirective {
    pub fn target(&self) -> AxisTarget {
        match *self {
            MoveDirective::Lift { z } | MoveDirective::Descend { z } => AxisTarget::z(z),
            MoveDirective::Translate { x, y } => AxisTarget::xy(x, y),
        }
    }

    /// Lifts and translations travel at medium speed; descents go slow
    pub fn speed(&self, tiers: &SpeedTiers) -> f64 {
        match self {
            MoveDirective::Lift { .. } | MoveDirective::Translate { .. } => tiers.medium,
            MoveDirective::Descend { .. } => tiers.slow,
        }
    }
}

/// Ordered lift, translate, descend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeMovePlan {
    pub directives: [MoveDirective; 3],
}

impl SafeMovePlan {
    pub fn lift_z(&self) -> f64 {
        match self.directives[0] {
            MoveDirective::Lift { z } => z,
            _ => f64::NAN,
        }
    }
}

/// Plan a safe move from `current` to `target`
///
/// Fails without producing directives if any target coordinate is outside
/// the travel limits.
pub fn plan_safe_move(
    current: &Position,
    target: Point3,
    config: &MotionConfig,
) -> Result<SafeMovePlan, MotionError> {
    let limits = &config.limits;
    limits.x.check(Axis::X, target.x)?;
    limits.y.check(Axis::Y, target.y)?;
    limits.z.check(Axis::Z, target.z)?;

    let floor = current.z.max(target.z);
    let lift = (floor + config.lift_clearance_mm)
        .min(limits.z.max)
        .max(floor);

    Ok(SafeMovePlan {
        directives: [
            MoveDirective::Lift { z: lift },
            MoveDirective::Translate {
                x: target.x,
                y: target.y,
            },
            MoveDirective::Descend { z: target.z },
        ],
    })
}

/// Single-axis jog move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JogMove {
    pub target: AxisTarget,
    pub speed_mm_s: f64,
}

/// Plan a relative jog of `delta` mm on one axis
///
/// Speed follows the step size: small steps go slow, medium steps at medium
/// speed, and long steps run fast to within the approach distance before a
/// slow final move. `speed_cap` limits every move's speed.
pub fn plan_jog(
    current: &Position,
    axis: Axis,
    delta: f64,
    config: &MotionConfig,
    syringe: Option<&SyringeParameters>,
    speed_cap: f64,
) -> Result<Vec<JogMove, 2>, MotionError> {
    let start = current.get(axis);
    let end = start + delta;
    config.limits.for_axis(axis, syringe).check(axis, end)?;

    let tiers = &config.speeds;
    let magnitude = delta.abs();
    let cap = |speed: f64| speed.min(speed_cap);
    let single = |speed| JogMove {
        target: AxisTarget::axis(axis, end),
        speed_mm_s: cap(speed),
    };

    // Never more than two moves, the capacity of the returned Vec
    let mut moves = Vec::new();
    if magnitude <= tiers.slow_step_max_mm {
        moves.extend([single(tiers.slow)]);
    } else if magnitude < tiers.medium_step_max_mm {
        moves.extend([single(tiers.medium)]);
    } else {
        let approach = end - delta.signum() * config.approach_distance_mm;
        let fast = JogMove {
            target: AxisTarget::axis(axis, approach),
            speed_mm_s: cap(tiers.high),
        };
        moves.extend([fast, single(tiers.slow)]);
    }

    Ok(moves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(x: f64, y: f64, z: f64) -> Position {
        Position {
            x,
            y,
            z,
            ..Default::default()
        }
    }

    #[test]
    fn test_safe_move_phases() {
        let config = MotionConfig::default();
        let plan = plan_safe_move(&at(50.0, 50.0, 60.0), Point3::new(200.0, 100.0, 80.0), &config)
            .unwrap();
        assert_eq!(
            plan.directives,
            [
                MoveDirective::Lift { z: 120.0 },
                MoveDirective::Translate { x: 200.0, y: 100.0 },
                MoveDirective::Descend { z: 80.0 },
            ]
        );
    }

    #[test]
    fn test_lift_clamped_to_z_max() {
        let config = MotionConfig::default();
        let plan = plan_safe_move(&at(50.0, 50.0, 150.0), Point3::new(60.0, 60.0, 140.0), &config)
            .unwrap();
        assert_eq!(plan.lift_z(), config.limits.z.max);
    }

    #[test]
    fn test_out_of_bounds_target_rejected() {
        let config = MotionConfig::default();
        let result = plan_safe_move(&at(50.0, 50.0, 60.0), Point3::new(500.0, 50.0, 60.0), &config);
        assert!(matches!(
            result,
            Err(MotionError::OutOfBounds { axis: Axis::X, .. })
        ));
        let result = plan_safe_move(&at(50.0, 50.0, 60.0), Point3::new(50.0, 50.0, 10.0), &config);
        assert!(matches!(
            result,
            Err(MotionError::OutOfBounds { axis: Axis::Z, .. })
        ));
    }

    #[test]
    fn test_jog_speed_tiers() {
        let config = MotionConfig::default();
        let pos = at(100.0, 100.0, 100.0);

        let small = plan_jog(&pos, Axis::X, 5.0, &config, None, f64::INFINITY).unwrap();
        assert_eq!(small.len(), 1);
        assert_eq!(small[0].speed_mm_s, 10.0);

        let medium = plan_jog(&pos, Axis::Y, -25.0, &config, None, f64::INFINITY).unwrap();
        assert_eq!(medium.len(), 1);
        assert_eq!(medium[0].speed_mm_s, 40.0);
        assert_eq!(medium[0].target.y, Some(75.0));

        let long = plan_jog(&pos, Axis::X, 100.0, &config, None, f64::INFINITY).unwrap();
        assert_eq!(long.len(), 2);
        assert_eq!(long[0].target.x, Some(190.0));
        assert_eq!(long[0].speed_mm_s, 160.0);
        assert_eq!(long[1].target.x, Some(200.0));
        assert_eq!(long[1].speed_mm_s, 10.0);
    }

    #[test]
    fn test_jog_speed_cap_and_limits() {
        let config = MotionConfig::default();
        let pos = at(100.0, 100.0, 100.0);
        let capped = plan_jog(&pos, Axis::X, 100.0, &config, None, 30.0).unwrap();
        assert_eq!(capped[0].speed_mm_s, 30.0);

        assert!(matches!(
            plan_jog(&pos, Axis::Z, 100.0, &config, None, f64::INFINITY),
            Err(MotionError::OutOfBounds { axis: Axis::Z, .. })
        ));
        assert!(matches!(
            plan_jog(&pos, Axis::B, 1.0, &config, None, f64::INFINITY),
            Err(MotionError::OutOfBounds { axis: Axis::B, .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_lift_never_below_either_z(
            cur_z in 35.0f64..170.15,
            tgt_z in 35.0f64..170.15,
            x in 25.0f64..418.0,
            y in 5.0f64..340.0,
        ) {
            let config = MotionConfig::default();
            let plan = plan_safe_move(&at(100.0, 100.0, cur_z), Point3::new(x, y, tgt_z), &config)
                .unwrap();
            let lift = plan.lift_z();
            prop_assert!(lift >= cur_z);
            prop_assert!(lift >= tgt_z);
            prop_assert!(lift <= config.limits.z.max);
            prop_assert_eq!(plan.directives[2], MoveDirective::Descend { z: tgt_z });
        }

        #[test]
        fn prop_jog_ends_on_target(delta in -70.0f64..300.0) {
            let config = MotionConfig::default();
            let moves = plan_jog(&at(100.0, 100.0, 100.0), Axis::X, delta, &config, None, f64::INFINITY)
                .unwrap();
            let long = delta.abs() >= config.speeds.medium_step_max_mm;
            prop_assert_eq!(moves.len(), if long { 2 } else { 1 });
            prop_assert_eq!(moves[moves.len() - 1].target.x, Some(100.0 + delta));
        }
    }
}
