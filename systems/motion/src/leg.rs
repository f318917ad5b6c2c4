//! Resumable interpolation across a single tile.

use glam::Vec2;

/// Fraction of a leg after which the unit counts as standing on the
/// destination for gameplay purposes.
const SETTLE_POINT: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Advance {
    InProgress,
    Done,
}

/// Progress from one world position to the next. Progress only ever grows,
/// so pausing a leg is simply not advancing it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Leg {
    from: Vec2,
    to: Vec2,
    progress: f32,
}

impl Leg {
    pub(crate) fn new(from: Vec2, to: Vec2) -> Self {
        Self {
            from,
            to,
            progress: 0.0,
        }
    }

    pub(crate) fn advance(&mut self, fraction: f32) -> Advance {
        if fraction.is_finite() && fraction > 0.0 {
            self.progress = (self.progress + fraction).min(1.0);
        }
        if self.progress >= 1.0 {
            Advance::Done
        } else {
            Advance::InProgress
        }
    }

    pub(crate) fn position(&self) -> Vec2 {
        if self.progress >= 1.0 {
            self.to
        } else {
            self.from.lerp(self.to, self.progress)
        }
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.progress >= SETTLE_POINT
    }

    pub(crate) fn to(&self) -> Vec2 {
        self.to
    }

    pub(crate) fn progress(&self) -> f32 {
        self.progress
    }
}
