#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative tile grid shared read-only by every unit.
//!
//! The grid is derived once from a tilemap's bounds and a walkability test and
//! never resized. Wall colliders stand in for the physics layer: they answer
//! the line-of-sight queries the pathfinding and motion systems issue between
//! cell centres.

use std::fmt;

use glam::Vec2;
use skirmish_core::CellCoord;
use thiserror::Error;

mod layout;
mod walls;

pub use layout::{LayoutError, TileLayout};
pub use walls::{Collider, LayerMask, Obstacles, Shape, WallLayer};

const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Fraction of a cell's side covered by the box used to test walkability.
const WALKABILITY_BOX: f32 = 0.5;

/// Reasons a grid cannot be built.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GridError {
    /// The requested grid has no columns or no rows.
    #[error("grid must have at least one cell, got {columns}x{rows}")]
    Empty {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
    },
    /// The cell length is zero, negative or not finite.
    #[error("cell length must be a positive finite number, got {0}")]
    InvalidCellLength(f32),
    /// The grid origin is not finite.
    #[error("grid origin must be finite, got {0}")]
    InvalidOrigin(Vec2),
}

/// World-space placement and dimensions of a grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridBounds {
    /// World position of the bottom-left corner of cell `(0, 0)`.
    pub origin: Vec2,
    /// Side length of a square cell in world units.
    pub cell_length: f32,
    /// Number of cell columns.
    pub columns: u32,
    /// Number of cell rows.
    pub rows: u32,
}

impl GridBounds {
    /// Creates a bounds description anchored at `origin`.
    #[must_use]
    pub const fn new(origin: Vec2, cell_length: f32, columns: u32, rows: u32) -> Self {
        Self {
            origin,
            cell_length,
            columns,
            rows,
        }
    }
}

/// Dense index of a node inside its grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Position of the node inside the grid's dense storage.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single grid cell.
///
/// Nodes carry only static data. Search costs and parent links live in the
/// per-search scratch tables of the pathfinding system.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    id: NodeId,
    cell: CellCoord,
    position: Vec2,
    walkable: bool,
}

impl Node {
    /// Identifier of the node inside its grid.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Grid coordinates of the node.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// World position of the cell centre.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Whether units may stand on the cell.
    #[must_use]
    pub const fn is_walkable(&self) -> bool {
        self.walkable
    }
}

/// Fixed-size walkability grid built from a tilemap's bounds.
#[derive(Clone, Debug)]
pub struct Grid {
    origin: Vec2,
    cell_length: f32,
    columns: u32,
    rows: u32,
    nodes: Vec<Node>,
}

impl Grid {
    /// Populates the grid, calling `is_walkable` once per cell with the cell's
    /// world-space centre.
    pub fn build_from_bounds<F>(bounds: GridBounds, mut is_walkable: F) -> Result<Self, GridError>
    where
        F: FnMut(Vec2) -> bool,
    {
        let GridBounds {
            origin,
            cell_length,
            columns,
            rows,
        } = bounds;

        if columns == 0 || rows == 0 {
            return Err(GridError::Empty { columns, rows });
        }
        if !cell_length.is_finite() || cell_length <= 0.0 {
            return Err(GridError::InvalidCellLength(cell_length));
        }
        if !origin.is_finite() {
            return Err(GridError::InvalidOrigin(origin));
        }

        let capacity = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        let mut nodes = Vec::with_capacity(capacity);
        for row in 0..rows {
            for column in 0..columns {
                let cell = CellCoord::new(column, row);
                let position = cell_center(origin, cell_length, cell);
                let id = NodeId(u32::try_from(nodes.len()).unwrap_or(u32::MAX));
                nodes.push(Node {
                    id,
                    cell,
                    position,
                    walkable: is_walkable(position),
                });
            }
        }

        let blocked = nodes.iter().filter(|node| !node.walkable).count();
        tracing::debug!(columns, rows, cell_length, blocked, "built grid");

        Ok(Self {
            origin,
            cell_length,
            columns,
            rows,
            nodes,
        })
    }

    /// Builds the grid marking every cell whose sample box overlaps a collider
    /// on `mask` as unwalkable.
    pub fn from_obstacles(
        bounds: GridBounds,
        obstacles: &dyn Obstacles,
        mask: LayerMask,
    ) -> Result<Self, GridError> {
        let half_extents = Vec2::splat(bounds.cell_length * WALKABILITY_BOX * 0.5);
        Self::build_from_bounds(bounds, |center| {
            !obstacles.overlaps_box(center, half_extents, mask)
        })
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of a single cell in world units.
    #[must_use]
    pub const fn cell_length(&self) -> f32 {
        self.cell_length
    }

    /// World position of the bottom-left corner of cell `(0, 0)`.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Number of nodes stored in the grid.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Grids are never empty; provided for API symmetry with [`Grid::len`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in row-major order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Node stored under the provided identifier.
    #[must_use]
    pub fn node_by_id(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Node located at the provided cell, if it lies inside the grid.
    #[must_use]
    pub fn node(&self, cell: CellCoord) -> Option<&Node> {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return None;
        }

        let width = usize::try_from(self.columns).ok()?;
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        self.nodes.get(row.checked_mul(width)?.checked_add(column)?)
    }

    /// Resolves a world position to the nearest cell.
    ///
    /// The position is clamped into the grid as a fraction of its extent, so
    /// out-of-bounds queries degrade to the nearest edge cell instead of
    /// failing or wrapping.
    #[must_use]
    pub fn node_at_world(&self, position: Vec2) -> &Node {
        let column = clamp_axis(
            position.x - self.origin.x,
            self.columns,
            self.cell_length,
        );
        let row = clamp_axis(position.y - self.origin.y, self.rows, self.cell_length);
        let index = row as usize * self.columns as usize + column as usize;
        &self.nodes[index]
    }

    /// World position of the centre of `cell`, whether or not it lies inside
    /// the grid.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> Vec2 {
        cell_center(self.origin, self.cell_length, cell)
    }

    /// Up to eight cells surrounding `node`, orthogonal and diagonal.
    ///
    /// Cells outside the grid are omitted; walkability and line of sight are
    /// left for the caller to check.
    pub fn neighbors(&self, node: &Node) -> impl Iterator<Item = &Node> + '_ {
        let cell = node.cell();
        NEIGHBOR_OFFSETS
            .iter()
            .filter_map(move |&(columns, rows)| cell.offset(columns, rows))
            .filter_map(move |neighbor| self.node(neighbor))
    }
}

fn clamp_axis(offset: f32, count: u32, cell_length: f32) -> u32 {
    let extent = count as f32 * cell_length;
    let percent = offset / extent;
    let percent = if percent.is_finite() {
        percent.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let index = ((count - 1) as f32 * percent).round_ties_even();
    (index as u32).min(count - 1)
}

fn cell_center(origin: Vec2, cell_length: f32, cell: CellCoord) -> Vec2 {
    origin
        + Vec2::new(
            (cell.column() as f32 + 0.5) * cell_length,
            (cell.row() as f32 + 0.5) * cell_length,
        )
}

/// Everything a path or motion query needs to know about the static level:
/// the grid plus the colliders answering line-of-sight checks.
#[derive(Clone, Copy)]
pub struct Terrain<'a> {
    grid: &'a Grid,
    obstacles: &'a dyn Obstacles,
    movement_mask: LayerMask,
    pathing_mask: LayerMask,
}

impl<'a> Terrain<'a> {
    /// Bundles the grid with its colliders using the default masks: single
    /// steps collide with [`LayerMask::WALL`], path searches with
    /// [`LayerMask::WALL`] and [`LayerMask::AI_WALL`].
    #[must_use]
    pub fn new(grid: &'a Grid, obstacles: &'a dyn Obstacles) -> Self {
        Self {
            grid,
            obstacles,
            movement_mask: LayerMask::WALL,
            pathing_mask: LayerMask::WALL.union(LayerMask::AI_WALL),
        }
    }

    /// Overrides the layers that stop single steps and dashes.
    #[must_use]
    pub const fn with_movement_mask(mut self, mask: LayerMask) -> Self {
        self.movement_mask = mask;
        self
    }

    /// Overrides the layers that invalidate path edges.
    #[must_use]
    pub const fn with_pathing_mask(mut self, mask: LayerMask) -> Self {
        self.pathing_mask = mask;
        self
    }

    /// Grid shared by every unit.
    #[must_use]
    pub const fn grid(&self) -> &'a Grid {
        self.grid
    }

    /// Whether a path may advance from `from` into the adjacent `to`: the
    /// destination must be walkable and the segment between the centres must
    /// not cross a pathing collider.
    #[must_use]
    pub fn can_traverse(&self, from: &Node, to: &Node) -> bool {
        to.is_walkable()
            && !self
                .obstacles
                .linecast(from.position(), to.position(), self.pathing_mask)
    }

    /// Whether a movement collider lies on the straight line between two
    /// world positions.
    #[must_use]
    pub fn movement_blocked(&self, from: Vec2, to: Vec2) -> bool {
        self.obstacles.linecast(from, to, self.movement_mask)
    }
}

impl fmt::Debug for Terrain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Terrain")
            .field("columns", &self.grid.columns())
            .field("rows", &self.grid.rows())
            .field("movement_mask", &self.movement_mask)
            .field("pathing_mask", &self.pathing_mask)
            .finish_non_exhaustive()
    }
}
