//! Diagonal-then-straight route shaping.
//!
//! Shaped routes open with alternating primary/secondary steps so units cut
//! across the grid the way players expect, then finish along each axis in
//! turn. The shaper never searches: the first blocked step it cannot swap
//! around makes it defer to A*.

use glam::Vec2;
use skirmish_core::ShaperConfig;
use skirmish_world::{Grid, Node, NodeId, Terrain};

use crate::Path;

/// Outcome of shaping a route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shaped {
    /// Every step of the shaped route can be traversed.
    Path(Path),
    /// A step was blocked; the caller should run a full search instead.
    Defer,
}

/// Builds diagonal-then-straight routes without searching.
#[derive(Clone, Copy, Debug, Default)]
pub struct PathShaper {
    config: ShaperConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Column,
    Row,
}

struct Cursor<'t, 'a> {
    terrain: &'t Terrain<'a>,
    node: &'a Node,
    steps: Vec<NodeId>,
}

impl<'t, 'a> Cursor<'t, 'a> {
    fn new(terrain: &'t Terrain<'a>, node: &'a Node) -> Self {
        Self {
            terrain,
            node,
            steps: Vec::new(),
        }
    }

    /// Moves one cell along `axis`, recording the step. Returns `false` and
    /// leaves the cursor in place when the step is impossible.
    fn advance(&mut self, axis: Axis, sign: i32) -> bool {
        let grid: &'a Grid = self.terrain.grid();
        let (columns, rows) = match axis {
            Axis::Column => (sign, 0),
            Axis::Row => (0, sign),
        };
        let Some(next) = self
            .node
            .cell()
            .offset(columns, rows)
            .and_then(|cell| grid.node(cell))
        else {
            return false;
        };

        if !self.terrain.can_traverse(self.node, next) {
            return false;
        }

        self.steps.push(next.id());
        self.node = next;
        true
    }

    fn checkpoint(&self) -> (&'a Node, usize) {
        (self.node, self.steps.len())
    }

    fn restore(&mut self, (node, len): (&'a Node, usize)) {
        self.node = node;
        self.steps.truncate(len);
    }
}

impl PathShaper {
    /// Creates a shaper with the provided tuning.
    #[must_use]
    pub const fn new(config: ShaperConfig) -> Self {
        Self { config }
    }

    /// Tuning in effect.
    #[must_use]
    pub const fn config(&self) -> ShaperConfig {
        self.config
    }

    /// Shapes a route between the cells nearest to the two world positions.
    ///
    /// Each diagonal pair is tried primary-first, then secondary-first from
    /// the same cell. If neither ordering fits, or any straight step of the
    /// tail is blocked, the result is [`Shaped::Defer`]. Identical start and
    /// target cells produce an empty path.
    ///
    /// Without `straight_after_diagonals` the leftover secondary distance is
    /// not walked, so the route may stop short of the target row or column;
    /// callers re-plan once it is exhausted. A route that would leave a
    /// distinct target without a single step defers instead.
    #[must_use]
    pub fn shape(&self, terrain: &Terrain<'_>, start: Vec2, target: Vec2) -> Shaped {
        let grid = terrain.grid();
        let start_node = grid.node_at_world(start);
        let target_node = grid.node_at_world(target);
        let (dx, dy) = start_node.cell().delta_to(target_node.cell());

        let mut remaining_x = dx.unsigned_abs();
        let mut remaining_y = dy.unsigned_abs();
        let sign_x = signum(dx);
        let sign_y = signum(dy);

        let x_is_primary = !self.config.primary_is_longer_axis || remaining_x >= remaining_y;
        let (primary, primary_sign, secondary, secondary_sign) = if x_is_primary {
            (Axis::Column, sign_x, Axis::Row, sign_y)
        } else {
            (Axis::Row, sign_y, Axis::Column, sign_x)
        };

        let pairs = u64::from(self.config.step_start_pairs)
            .min(remaining_x)
            .min(remaining_y);

        let mut cursor = Cursor::new(terrain, start_node);
        for _ in 0..pairs {
            let checkpoint = cursor.checkpoint();
            let primary_first =
                cursor.advance(primary, primary_sign) && cursor.advance(secondary, secondary_sign);
            if !primary_first {
                cursor.restore(checkpoint);
                let secondary_first = cursor.advance(secondary, secondary_sign)
                    && cursor.advance(primary, primary_sign);
                if !secondary_first {
                    tracing::trace!(
                        from = %start_node.cell(),
                        to = %target_node.cell(),
                        at = %cursor.node.cell(),
                        "diagonal pair blocked"
                    );
                    return Shaped::Defer;
                }
            }
            remaining_x -= 1;
            remaining_y -= 1;
        }

        let (remaining_primary, remaining_secondary) = if x_is_primary {
            (remaining_x, remaining_y)
        } else {
            (remaining_y, remaining_x)
        };
        let remaining_secondary = if self.config.straight_after_diagonals {
            remaining_secondary
        } else {
            0
        };

        let tail = [
            (secondary, secondary_sign, remaining_secondary),
            (primary, primary_sign, remaining_primary),
        ];
        for (axis, sign, count) in tail {
            for _ in 0..count {
                if !cursor.advance(axis, sign) {
                    tracing::trace!(at = %cursor.node.cell(), "straight step blocked");
                    return Shaped::Defer;
                }
            }
        }

        if cursor.steps.is_empty() && start_node.id() != target_node.id() {
            tracing::trace!(
                from = %start_node.cell(),
                to = %target_node.cell(),
                "nothing left to shape"
            );
            return Shaped::Defer;
        }

        Shaped::Path(Path::from_steps(cursor.steps))
    }
}

fn signum(delta: i64) -> i32 {
    match delta {
        d if d > 0 => 1,
        d if d < 0 => -1,
        _ => 0,
    }
}
