//! Static colliders that block movement and line of sight.

use glam::Vec2;

/// Set of collision layers a query or collider belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LayerMask(u8);

impl LayerMask {
    /// Matches no layer.
    pub const NONE: LayerMask = LayerMask(0);
    /// Walls that stop every unit.
    pub const WALL: LayerMask = LayerMask(1);
    /// Walls that only AI path searches respect.
    pub const AI_WALL: LayerMask = LayerMask(1 << 1);

    /// Combines two masks.
    #[must_use]
    pub const fn union(self, other: LayerMask) -> LayerMask {
        LayerMask(self.0 | other.0)
    }

    /// Whether the two masks share at least one layer.
    #[must_use]
    pub const fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }
}

/// Geometry of a collider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// Axis-aligned box spanning `min..=max`.
    Rect {
        /// Lower-left corner.
        min: Vec2,
        /// Upper-right corner.
        max: Vec2,
    },
    /// Thin wall between two points.
    Segment {
        /// First endpoint.
        start: Vec2,
        /// Second endpoint.
        end: Vec2,
    },
}

/// Static collider assigned to a layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collider {
    /// Geometry of the collider.
    pub shape: Shape,
    /// Layer the collider belongs to.
    pub layer: LayerMask,
}

/// Queries answered by the static collision layer.
pub trait Obstacles {
    /// Whether any collider on `mask` intersects the segment `from..=to`.
    ///
    /// A segment starting inside a collider counts as blocked.
    fn linecast(&self, from: Vec2, to: Vec2, mask: LayerMask) -> bool;

    /// Whether any collider on `mask` overlaps the box centred on `center`.
    fn overlaps_box(&self, center: Vec2, half_extents: Vec2, mask: LayerMask) -> bool;
}

/// Flat list of static colliders.
#[derive(Clone, Debug, Default)]
pub struct WallLayer {
    colliders: Vec<Collider>,
}

impl WallLayer {
    /// Creates an empty layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an axis-aligned box collider; the corners may be given in any order.
    pub fn push_rect(&mut self, a: Vec2, b: Vec2, layer: LayerMask) {
        self.colliders.push(Collider {
            shape: Shape::Rect {
                min: a.min(b),
                max: a.max(b),
            },
            layer,
        });
    }

    /// Adds a thin segment collider.
    pub fn push_segment(&mut self, start: Vec2, end: Vec2, layer: LayerMask) {
        self.colliders.push(Collider {
            shape: Shape::Segment { start, end },
            layer,
        });
    }

    /// Colliders in insertion order.
    #[must_use]
    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    fn on_mask(&self, mask: LayerMask) -> impl Iterator<Item = &Collider> + '_ {
        self.colliders
            .iter()
            .filter(move |collider| collider.layer.intersects(mask))
    }
}

impl Obstacles for WallLayer {
    fn linecast(&self, from: Vec2, to: Vec2, mask: LayerMask) -> bool {
        self.on_mask(mask).any(|collider| match collider.shape {
            Shape::Rect { min, max } => segment_hits_rect(from, to, min, max),
            Shape::Segment { start, end } => segments_intersect(from, to, start, end),
        })
    }

    fn overlaps_box(&self, center: Vec2, half_extents: Vec2, mask: LayerMask) -> bool {
        let box_min = center - half_extents;
        let box_max = center + half_extents;
        self.on_mask(mask).any(|collider| match collider.shape {
            Shape::Rect { min, max } => {
                min.x < box_max.x && max.x > box_min.x && min.y < box_max.y && max.y > box_min.y
            }
            Shape::Segment { start, end } => segment_hits_rect(start, end, box_min, box_max),
        })
    }
}

/// Liang-Barsky clip of the segment `a..=b` against a closed box.
fn segment_hits_rect(a: Vec2, b: Vec2, min: Vec2, max: Vec2) -> bool {
    let delta = b - a;
    let mut enter = 0.0_f32;
    let mut exit = 1.0_f32;

    let planes = [
        (-delta.x, a.x - min.x),
        (delta.x, max.x - a.x),
        (-delta.y, a.y - min.y),
        (delta.y, max.y - a.y),
    ];

    for (p, q) in planes {
        if p == 0.0 {
            if q < 0.0 {
                return false;
            }
            continue;
        }

        let t = q / p;
        if p < 0.0 {
            if t > exit {
                return false;
            }
            enter = enter.max(t);
        } else {
            if t < enter {
                return false;
            }
            exit = exit.min(t);
        }
    }

    enter <= exit
}

fn segments_intersect(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    let d1 = orientation(c, d, a);
    let d2 = orientation(c, d, b);
    let d3 = orientation(a, b, c);
    let d4 = orientation(a, b, d);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && within_box(c, d, a))
        || (d2 == 0.0 && within_box(c, d, b))
        || (d3 == 0.0 && within_box(a, b, c))
        || (d4 == 0.0 && within_box(a, b, d))
}

fn orientation(origin: Vec2, towards: Vec2, point: Vec2) -> f32 {
    (towards - origin).perp_dot(point - origin)
}

fn within_box(a: Vec2, b: Vec2, point: Vec2) -> bool {
    let min = a.min(b);
    let max = a.max(b);
    point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
}
