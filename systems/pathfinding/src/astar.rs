//! Grid A* restricted to orthogonal moves.

use glam::Vec2;
use skirmish_core::CellCoord;
use skirmish_world::{Node, NodeId, Terrain};

use crate::Path;

const ORTHOGONAL_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;

/// A* search over the grid.
///
/// The open set is scanned linearly for the lowest f-cost, ties going to the
/// lower h-cost and then to the earliest inserted node. Costs and parent links
/// live in a scratch table keyed by [`NodeId`] that is invalidated at the start
/// of every search, so nothing leaks from one search into the next.
#[derive(Debug, Default)]
pub struct PathFinder {
    scratch: SearchScratch,
    open: Vec<NodeId>,
}

impl PathFinder {
    /// Creates a finder with empty scratch space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds a path between the cells nearest to the two world positions.
    ///
    /// Returns `None` when the target cannot be reached. A search whose start
    /// and target share a cell succeeds with an empty path.
    pub fn find_path(&mut self, terrain: &Terrain<'_>, start: Vec2, target: Vec2) -> Option<Path> {
        let grid = terrain.grid();
        let start_node = grid.node_at_world(start);
        let target_node = grid.node_at_world(target);
        let start_id = start_node.id();
        let target_id = target_node.id();
        let target_cell = target_node.cell();

        self.scratch.begin(grid.len());
        self.open.clear();

        let entry = self.scratch.entry_mut(start_id);
        entry.g = 0;
        entry.h = distance(start_node.cell(), target_cell);
        entry.open = true;
        self.open.push(start_id);

        while let Some(best) = self.lowest_cost_index() {
            let current_id = self.open.remove(best);
            let entry = self.scratch.entry_mut(current_id);
            entry.open = false;
            entry.closed = true;
            let current_g = entry.g;

            if current_id == target_id {
                return Some(self.retrace(start_id, target_id, grid.len()));
            }

            let Some(current) = grid.node_by_id(current_id) else {
                continue;
            };

            for neighbor in grid.neighbors(current) {
                if is_diagonal(current, neighbor) {
                    continue;
                }

                let neighbor_id = neighbor.id();
                let known = self.scratch.entry(neighbor_id);
                if known.closed || !terrain.can_traverse(current, neighbor) {
                    continue;
                }

                let cost = current_g + distance(current.cell(), neighbor.cell());
                if cost < known.g || !known.open {
                    let entry = self.scratch.entry_mut(neighbor_id);
                    entry.g = cost;
                    entry.h = distance(neighbor.cell(), target_cell);
                    entry.parent = Some(current_id);

                    if !entry.open {
                        entry.open = true;
                        self.open.push(neighbor_id);
                    }
                }
            }
        }

        tracing::debug!(
            start = %start_node.cell(),
            target = %target_cell,
            "no path between cells"
        );
        None
    }

    fn lowest_cost_index(&self) -> Option<usize> {
        let mut best: Option<(usize, u32, u32)> = None;
        for (index, id) in self.open.iter().enumerate() {
            let entry = self.scratch.entry(*id);
            let f = entry.g + entry.h;
            let better = match best {
                None => true,
                Some((_, best_f, best_h)) => f < best_f || (f == best_f && entry.h < best_h),
            };
            if better {
                best = Some((index, f, entry.h));
            }
        }
        best.map(|(index, _, _)| index)
    }

    fn retrace(&self, start: NodeId, target: NodeId, node_count: usize) -> Path {
        let mut steps = Vec::new();
        let mut current = target;
        while current != start && steps.len() <= node_count {
            steps.push(current);
            match self.scratch.entry(current).parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        steps.reverse();
        Path::from_steps(steps)
    }

    #[cfg(test)]
    pub(crate) fn poison_scratch(&mut self, node_count: usize, parent: NodeId) {
        self.scratch.poison(node_count, parent);
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct ScratchEntry {
    stamp: u32,
    g: u32,
    h: u32,
    parent: Option<NodeId>,
    open: bool,
    closed: bool,
}

#[derive(Debug, Default)]
struct SearchScratch {
    generation: u32,
    entries: Vec<ScratchEntry>,
}

impl SearchScratch {
    fn begin(&mut self, node_count: usize) {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.entries.fill(ScratchEntry::default());
            self.generation = 1;
        }
        if self.entries.len() != node_count {
            self.entries.resize(node_count, ScratchEntry::default());
        }
    }

    fn entry(&self, id: NodeId) -> ScratchEntry {
        match self.entries.get(id.index()) {
            Some(entry) if entry.stamp == self.generation => *entry,
            _ => ScratchEntry {
                stamp: self.generation,
                ..ScratchEntry::default()
            },
        }
    }

    fn entry_mut(&mut self, id: NodeId) -> &mut ScratchEntry {
        let generation = self.generation;
        let index = id.index();
        if index >= self.entries.len() {
            self.entries.resize(index + 1, ScratchEntry::default());
        }
        let entry = &mut self.entries[index];
        if entry.stamp != generation {
            *entry = ScratchEntry {
                stamp: generation,
                ..ScratchEntry::default()
            };
        }
        entry
    }

    #[cfg(test)]
    fn poison(&mut self, node_count: usize, parent: NodeId) {
        let generation = self.generation;
        self.entries = (0..node_count)
            .map(|index| ScratchEntry {
                stamp: generation,
                g: 7 + index as u32 * 3,
                h: 1,
                parent: Some(parent),
                open: index % 2 == 0,
                closed: index % 3 == 0,
            })
            .collect();
    }
}

fn is_diagonal(current: &Node, neighbor: &Node) -> bool {
    current.cell().column() != neighbor.cell().column() && current.cell().row() != neighbor.cell().row()
}

/// Octile distance scaled by ten.
fn distance(a: CellCoord, b: CellCoord) -> u32 {
    let dx = a.column().abs_diff(b.column());
    let dy = a.row().abs_diff(b.row());
    if dx > dy {
        DIAGONAL_COST * dy + ORTHOGONAL_COST * (dx - dy)
    } else {
        DIAGONAL_COST * dx + ORTHOGONAL_COST * (dy - dx)
    }
}
