#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic grid routing: classic A* plus a cheaper diagonal-then-straight
//! shaper that defers to A* whenever any of its steps is blocked.

use glam::Vec2;
use skirmish_core::{CellCoord, PathSource, ShaperConfig};
use skirmish_world::{Grid, NodeId, Terrain};

mod astar;
mod shaper;

pub use astar::PathFinder;
pub use shaper::{PathShaper, Shaped};

/// Ordered node sequence from an exclusive start to an inclusive destination.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path {
    steps: Vec<NodeId>,
}

impl Path {
    pub(crate) fn from_steps(steps: Vec<NodeId>) -> Self {
        Self { steps }
    }

    /// Nodes to visit, in order.
    #[must_use]
    pub fn steps(&self) -> &[NodeId] {
        &self.steps
    }

    /// Number of tile steps in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the path contains no steps, as for a zero-distance request.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Node at `index`, if the path is that long.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.steps.get(index).copied()
    }

    /// Resolves the steps into cell coordinates.
    #[must_use]
    pub fn cells(&self, grid: &Grid) -> Vec<CellCoord> {
        self.steps
            .iter()
            .filter_map(|id| grid.node_by_id(*id))
            .map(|node| node.cell())
            .collect()
    }
}

/// Result of a planning request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    /// Path to follow; `None` means stay in place until conditions change.
    pub path: Option<Path>,
    /// Strategy that produced the path.
    pub source: PathSource,
}

impl Route {
    fn from_search(path: Option<Path>, found: PathSource) -> Self {
        match path {
            Some(path) => Self {
                path: Some(path),
                source: found,
            },
            None => Self {
                path: None,
                source: PathSource::Unreachable,
            },
        }
    }
}

/// Per-unit planner that owns the search scratch space.
#[derive(Debug, Default)]
pub struct PathPlanner {
    finder: PathFinder,
    shaper: PathShaper,
}

impl PathPlanner {
    /// Creates a planner whose shaper uses the provided tuning.
    #[must_use]
    pub fn new(config: ShaperConfig) -> Self {
        Self {
            finder: PathFinder::new(),
            shaper: PathShaper::new(config),
        }
    }

    /// Tuning applied by the shaper.
    #[must_use]
    pub fn shaper_config(&self) -> ShaperConfig {
        self.shaper.config()
    }

    /// Routes with the shaper first, deferring to A* between the same
    /// endpoints when the shaper gives up.
    pub fn plan(&mut self, terrain: &Terrain<'_>, start: Vec2, target: Vec2) -> Route {
        match self.shaper.shape(terrain, start, target) {
            Shaped::Path(path) => Route {
                path: Some(path),
                source: PathSource::DiagonalThenStraight,
            },
            Shaped::Defer => {
                tracing::debug!(?start, ?target, "shaper deferred to A*");
                let path = self.finder.find_path(terrain, start, target);
                Route::from_search(path, PathSource::AStarFallback)
            }
        }
    }

    /// Routes with A* only.
    pub fn find_path(&mut self, terrain: &Terrain<'_>, start: Vec2, target: Vec2) -> Route {
        let path = self.finder.find_path(terrain, start, target);
        Route::from_search(path, PathSource::AStar)
    }
}
