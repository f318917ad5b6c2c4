use glam::Vec2;
use skirmish_core::{CellCoord, PathSource, ShaperConfig};
use skirmish_system_pathfinding::{PathPlanner, Route};
use skirmish_world::{Grid, LayerMask, Terrain, TileLayout, WallLayer};

const ARENA: &str = "
    ..........
    ..~~~~....
    ......#...
    .####.#...
    ....#.#..T
    S...#.....
";

struct Arena {
    layout: TileLayout,
    grid: Grid,
    walls: WallLayer,
}

impl Arena {
    fn load() -> Self {
        let layout = TileLayout::parse(ARENA).expect("arena parses");
        let walls = layout.wall_layer(Vec2::ZERO, 1.0);
        let grid = Grid::from_obstacles(
            layout.bounds(Vec2::ZERO, 1.0),
            &walls,
            LayerMask::WALL.union(LayerMask::AI_WALL),
        )
        .expect("grid builds");
        Self {
            layout,
            grid,
            walls,
        }
    }

    fn center(&self, cell: CellCoord) -> Vec2 {
        self.grid.cell_center(cell)
    }

    fn route(&self, planner: &mut PathPlanner, from: CellCoord, to: CellCoord) -> Route {
        let terrain = Terrain::new(&self.grid, &self.walls);
        planner.plan(&terrain, self.center(from), self.center(to))
    }
}

fn assert_walkable_chain(arena: &Arena, from: CellCoord, cells: &[CellCoord]) {
    let mut previous = from;
    for cell in cells {
        assert_eq!(
            previous.manhattan_distance(*cell),
            1,
            "non-adjacent step {previous} -> {cell}"
        );
        let node = arena.grid.node(*cell).expect("cell inside arena");
        assert!(node.is_walkable(), "path crosses wall at {cell}");
        previous = *cell;
    }
}

#[test]
fn planner_routes_around_walls_to_the_marked_target() {
    let arena = Arena::load();
    let start = arena.layout.start().expect("start marker");
    let target = arena.layout.target().expect("target marker");
    let mut planner = PathPlanner::default();

    let route = arena.route(&mut planner, start, target);

    assert_eq!(route.source, PathSource::AStarFallback);
    let cells = route.path.expect("target reachable").cells(&arena.grid);
    assert_eq!(cells.last().copied(), Some(target));
    assert_walkable_chain(&arena, start, &cells);
}

#[test]
fn open_stretches_are_shaped_without_search() {
    let arena = Arena::load();
    let mut planner = PathPlanner::default();

    let route = arena.route(&mut planner, CellCoord::new(7, 0), CellCoord::new(9, 3));

    assert_eq!(route.source, PathSource::DiagonalThenStraight);
    assert_eq!(
        route.path.expect("shaped").cells(&arena.grid),
        vec![
            CellCoord::new(7, 1),
            CellCoord::new(8, 1),
            CellCoord::new(8, 2),
            CellCoord::new(9, 2),
            CellCoord::new(9, 3),
        ]
    );
}

#[test]
fn ai_walls_block_paths_but_not_single_steps() {
    let arena = Arena::load();
    let terrain = Terrain::new(&arena.grid, &arena.walls);
    let below = arena.center(CellCoord::new(3, 3));
    let above = arena.center(CellCoord::new(3, 5));

    let mut planner = PathPlanner::default();
    let route = planner.find_path(&terrain, below, above);
    let cells = route.path.expect("detour exists").cells(&arena.grid);

    assert!(cells.len() > 2);
    assert!(!cells.contains(&CellCoord::new(3, 4)));
    assert!(!terrain.movement_blocked(
        arena.center(CellCoord::new(2, 3)),
        arena.center(CellCoord::new(2, 4))
    ));
}

#[test]
fn repeated_plans_replay_identically() {
    let arena = Arena::load();
    let queries = [
        (CellCoord::new(0, 0), CellCoord::new(9, 1)),
        (CellCoord::new(9, 5), CellCoord::new(0, 2)),
        (CellCoord::new(5, 0), CellCoord::new(5, 5)),
        (CellCoord::new(2, 1), CellCoord::new(7, 4)),
    ];

    let replay = |config: ShaperConfig| {
        let mut planner = PathPlanner::new(config);
        queries
            .iter()
            .map(|&(from, to)| {
                let route = arena.route(&mut planner, from, to);
                (
                    route.source,
                    route.path.map(|path| path.cells(&arena.grid)),
                )
            })
            .collect::<Vec<_>>()
    };

    let first = replay(ShaperConfig::default());
    let second = replay(ShaperConfig::default());
    assert_eq!(first, second, "replay diverged between runs");

    for ((from, _), (_, cells)) in queries.iter().zip(&first) {
        let cells = cells.as_ref().expect("every query is reachable");
        assert_walkable_chain(&arena, *from, cells);
    }
}
