use std::time::Duration;

use glam::Vec2;
use skirmish_core::{CellCoord, Direction, MotionConfig, MotionEvent, PathSource, ShaperConfig};
use skirmish_system_motion::{MotionController, MotionGate};
use skirmish_world::{Grid, LayerMask, Terrain, TileLayout, WallLayer};

const FRAME: Duration = Duration::from_millis(125);

fn load(text: &str) -> (TileLayout, Grid, WallLayer) {
    let layout = TileLayout::parse(text).expect("layout parses");
    let walls = layout.wall_layer(Vec2::ZERO, 1.0);
    let grid = Grid::from_obstacles(
        layout.bounds(Vec2::ZERO, 1.0),
        &walls,
        LayerMask::WALL.union(LayerMask::AI_WALL),
    )
    .expect("grid builds");
    (layout, grid, walls)
}

fn chase(
    motion: &mut MotionController,
    terrain: &Terrain<'_>,
    destination: Vec2,
    max_frames: usize,
    events: &mut Vec<MotionEvent>,
) -> Option<usize> {
    for frame in 0..max_frames {
        motion.move_to(destination, terrain, MotionGate::FREE, events);
        motion.tick(FRAME, terrain, MotionGate::FREE, events);
        if motion.position() == destination && !motion.is_moving() {
            return Some(frame);
        }
    }
    None
}

#[test]
fn unit_walks_around_walls_to_its_target() {
    let (layout, grid, walls) = load(
        "
        ..........
        .#######..
        .......#..
        S......#.T
        ",
    );
    let terrain = Terrain::new(&grid, &walls);
    let start = grid.cell_center(layout.start().expect("start"));
    let target = grid.cell_center(layout.target().expect("target"));
    let mut motion = MotionController::new(MotionConfig::default(), start);
    let mut events = Vec::new();

    let arrived = chase(&mut motion, &terrain, target, 200, &mut events);

    assert!(arrived.is_some(), "unit never reached {target}");
    assert!(events.contains(&MotionEvent::PathPlanned {
        source: PathSource::AStarFallback,
        steps: 15,
    }));

    let mut previous = layout.start().expect("start");
    for event in &events {
        if let MotionEvent::StepCompleted { cell } = event {
            assert_eq!(previous.manhattan_distance(*cell), 1);
            let node = grid.node(*cell).expect("cell inside grid");
            assert!(node.is_walkable(), "walked through wall at {cell}");
            previous = *cell;
        }
    }
    assert_eq!(previous, CellCoord::new(9, 0));
}

#[test]
fn player_walls_stop_strides_but_ai_walls_do_not() {
    let (_, grid, walls) = load(
        "
        ....
        .#~.
        ....
        ",
    );
    let terrain = Terrain::new(&grid, &walls);
    let mut events = Vec::new();

    let mut below_wall = MotionController::new(
        MotionConfig::default(),
        grid.cell_center(CellCoord::new(1, 0)),
    );
    below_wall.step(
        Direction::North,
        &terrain,
        MotionGate::FREE,
        &mut events,
    );
    assert!(!below_wall.is_moving());

    let mut below_ai_wall = MotionController::new(
        MotionConfig::default(),
        grid.cell_center(CellCoord::new(2, 0)),
    );
    below_ai_wall.step(
        Direction::North,
        &terrain,
        MotionGate::FREE,
        &mut events,
    );
    assert!(below_ai_wall.is_moving());
}

#[test]
fn fixed_primary_without_secondary_run_still_arrives() {
    let (_, grid, walls) = load(
        "
        .....
        .....
        .....
        .....
        .....
        ",
    );
    let terrain = Terrain::new(&grid, &walls);
    let config = MotionConfig {
        shaper: ShaperConfig {
            primary_is_longer_axis: false,
            straight_after_diagonals: false,
            ..ShaperConfig::default()
        },
        ..MotionConfig::default()
    };

    for target in [CellCoord::new(0, 3), CellCoord::new(2, 4)] {
        let mut motion = MotionController::new(config, grid.cell_center(CellCoord::new(0, 0)));
        let mut events = Vec::new();
        let destination = grid.cell_center(target);

        let arrived = chase(&mut motion, &terrain, destination, 100, &mut events);

        assert!(arrived.is_some(), "unit never reached {target}");
        assert!(events.iter().all(|event| !matches!(
            event,
            MotionEvent::PathPlanned { steps: 0, .. }
        )));
    }
}
