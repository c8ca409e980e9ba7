//! Position telemetry

use std::sync::{Arc, PoisonError, RwLock};

use nanotron_core::geometry::Position;

/// Last known head position, replaced whole after each command
#[derive(Debug, Clone, Default)]
pub struct PositionCell {
    inner: Arc<RwLock<Position>>,
}

impl PositionCell {
    pub fn new(position: Position) -> Self {
        Self {
            inner: Arc::new(RwLock::new(position)),
        }
    }

    /// Consistent copy of the position
    pub fn snapshot(&self) -> Position {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn publish(&self, position: Position) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_whole() {
        let cell = PositionCell::default();
        let reader = cell.clone();
        cell.publish(Position {
            x: 1.0,
            y: 2.0,
            z: 3.0,
            b: -4.0,
            c: 0.0,
        });
        let snap = reader.snapshot();
        assert_eq!((snap.x, snap.y, snap.z, snap.b), (1.0, 2.0, 3.0, -4.0));
    }
}
