//! Axis and point types
//!
//! The gantry has three cartesian axes (X, Y, Z) and two plunger axes (B, C),
//! one per syringe side. All coordinates are in millimeters.

use core::fmt;
use core::ops::{Add, Mul, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Gantry axis identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    X,
    Y,
    Z,
    /// Left plunger
    B,
    /// Right plunger
    C,
}

impl Axis {
    /// All axes in controller order
    pub const ALL: [Axis; 5] = [Axis::X, Axis::Y, Axis::Z, Axis::B, Axis::C];

    /// Check if this is one of the syringe plunger axes
    pub fn is_plunger(self) -> bool {
        matches!(self, Axis::B | Axis::C)
    }

    /// Controller letter for this axis
    pub fn as_char(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
            Axis::B => 'B',
            Axis::C => 'C',
        }
    }

    fn bit(self) -> u8 {
        match self {
            Axis::X => 1,
            Axis::Y => 1 << 1,
            Axis::Z => 1 << 2,
            Axis::B => 1 << 3,
            Axis::C => 1 << 4,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Syringe side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Plunger {
    #[default]
    Left,
    Right,
}

impl Plunger {
    /// Axis driving this plunger
    pub fn axis(self) -> Axis {
        match self {
            Plunger::Left => Axis::B,
            Plunger::Right => Axis::C,
        }
    }

    /// The other side
    pub fn toggled(self) -> Self {
        match self {
            Plunger::Left => Plunger::Right,
            Plunger::Right => Plunger::Left,
        }
    }
}

/// Set of axes, used for homing requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisSet {
    bits: u8,
}

impl AxisSet {
    pub const XYZ: AxisSet = AxisSet { bits: 0b0_0111 };
    pub const ALL: AxisSet = AxisSet { bits: 0b1_1111 };

    /// Build a set from a slice of axes
    pub fn from_axes(axes: &[Axis]) -> Self {
        let bits = axes.iter().fold(0, |acc, axis| acc | axis.bit());
        Self { bits }
    }

    /// Set holding a single axis
    pub fn single(axis: Axis) -> Self {
        Self { bits: axis.bit() }
    }

    pub fn contains(&self, axis: Axis) -> bool {
        self.bits & axis.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Iterate the axes in controller order
    pub fn iter(&self) -> impl Iterator<Item = Axis> + '_ {
        Axis::ALL.into_iter().filter(|axis| self.contains(*axis))
    }
}

impl fmt::Display for AxisSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in self.iter() {
            write!(f, "{}", axis)?;
        }
        Ok(())
    }
}

/// Point in deck coordinates
///
/// Serialized as a `[x, y, z]` array so stored setups stay compact.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "[f64; 3]", into = "[f64; 3]"))]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &Point3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Point3) -> Point3 {
        Point3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(&self, other: &Point3) -> f64 {
        (*self - *other).norm()
    }

    /// Unit vector in the same direction, or zero for a zero-length vector
    pub fn normalized(&self) -> Point3 {
        let n = self.norm();
        if n > 0.0 {
            *self * (1.0 / n)
        } else {
            Point3::default()
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Component-wise comparison within `tolerance`
    pub fn approx_eq(&self, other: &Point3, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
    }
}

impl Add for Point3 {
    type Output = Point3;

    fn add(self, rhs: Point3) -> Point3 {
        Point3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Point3;

    fn sub(self, rhs: Point3) -> Point3 {
        Point3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point3 {
    type Output = Point3;

    fn mul(self, rhs: f64) -> Point3 {
        Point3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl From<[f64; 3]> for Point3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Point3::new(x, y, z)
    }
}

impl From<Point3> for [f64; 3] {
    fn from(p: Point3) -> Self {
        [p.x, p.y, p.z]
    }
}

impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Full gantry position snapshot
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub b: f64,
    pub c: f64,
}

impl Position {
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::B => self.b,
            Axis::C => self.c,
        }
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
            Axis::B => self.b = value,
            Axis::C => self.c = value,
        }
    }

    /// Cartesian part of the position
    pub fn point(&self) -> Point3 {
        Point3::new(self.x, self.y, self.z)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X={:.2} Y={:.2} Z={:.2} B={:.2} C={:.2}",
            self.x, self.y, self.z, self.b, self.c
        )
    }
}

/// Partial move target; axes left as `None` do not move
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisTarget {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub b: Option<f64>,
    pub c: Option<f64>,
}

impl AxisTarget {
    /// Target a single axis
    pub fn axis(axis: Axis, value: f64) -> Self {
        let mut target = Self::default();
        target.set(axis, value);
        target
    }

    pub fn z(value: f64) -> Self {
        Self::axis(Axis::Z, value)
    }

    pub fn xy(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        let slot = match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
            Axis::B => &mut self.b,
            Axis::C => &mut self.c,
        };
        *slot = Some(value);
    }

    pub fn get(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::B => self.b,
            Axis::C => self.c,
        }
    }

    /// Axes set in this target, in controller order
    pub fn axes(&self) -> impl Iterator<Item = (Axis, f64)> + '_ {
        Axis::ALL
            .into_iter()
            .filter_map(|axis| self.get(axis).map(|value| (axis, value)))
    }

    /// Apply this target on top of `position`
    pub fn apply_to(&self, position: &mut Position) {
        for (axis, value) in self.axes() {
            position.set(axis, value);
        }
    }
}

impl fmt::Display for AxisTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (axis, value) in self.axes() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}{:.2}", axis, value)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_set() {
        let set = AxisSet::from_axes(&[Axis::Z, Axis::X]);
        assert!(set.contains(Axis::X));
        assert!(set.contains(Axis::Z));
        assert!(!set.contains(Axis::B));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Axis::X, Axis::Z]);
        assert_eq!(AxisSet::XYZ.to_string(), "XYZ");
        assert!(AxisSet::default().is_empty());
    }

    #[test]
    fn test_plunger_axes() {
        assert_eq!(Plunger::Left.axis(), Axis::B);
        assert_eq!(Plunger::Right.axis(), Axis::C);
        assert_eq!(Plunger::Left.toggled(), Plunger::Right);
        assert!(Axis::C.is_plunger());
        assert!(!Axis::Z.is_plunger());
    }

    #[test]
    fn test_point_math() {
        let a = Point3::new(1.0, 0.0, 0.0);
        let b = Point3::new(0.0, 1.0, 0.0);
        assert_eq!(a.cross(&b), Point3::new(0.0, 0.0, 1.0));
        assert_eq!(a.dot(&b), 0.0);
        assert_eq!((a + b) * 2.0, Point3::new(2.0, 2.0, 0.0));
        assert!((Point3::new(3.0, 4.0, 0.0).norm() - 5.0).abs() < 1e-12);
        assert_eq!(Point3::default().normalized(), Point3::default());
    }

    #[test]
    fn test_axis_target_apply() {
        let mut pos = Position {
            x: 1.0,
            y: 2.0,
            z: 3.0,
            ..Default::default()
        };
        AxisTarget::xy(10.0, 20.0).apply_to(&mut pos);
        assert_eq!(pos.point(), Point3::new(10.0, 20.0, 3.0));

        let target = AxisTarget::axis(Axis::B, -5.0);
        assert_eq!(target.axes().collect::<Vec<_>>(), vec![(Axis::B, -5.0)]);
        assert_eq!(target.to_string(), "B-5.00");
    }
}
