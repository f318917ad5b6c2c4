//! Frame loop driving one unit's status and motion across an arena.

use std::{fmt, time::Duration};

use anyhow::{Context, Result};
use glam::Vec2;
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skirmish_core::{CellCoord, MotionEvent, StatusEvent, Tracked, UnitId};
use skirmish_system_motion::{MotionController, MotionGate};
use skirmish_system_status::StatusAggregator;
use skirmish_world::{Grid, LayerMask, Terrain, TileLayout, WallLayer};

use crate::scenario::{Scenario, ScriptedBuff, ScriptedDash, ScriptedHit};

/// Identifier reported for the unit standing on the target marker.
const TARGET_UNIT: UnitId = UnitId::new(1);

/// Outcome of a scenario run.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Report {
    pub(crate) frames_run: u32,
    pub(crate) arrived_at: Option<u32>,
    pub(crate) final_cell: CellCoord,
    pub(crate) motion_events: usize,
    pub(crate) status_events: usize,
    pub(crate) damage_taken: f32,
    pub(crate) scattered: Vec<CellCoord>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arrived_at {
            Some(frame) => write!(f, "arrived at frame {frame}")?,
            None => write!(f, "did not arrive after {} frames", self.frames_run)?,
        }
        write!(
            f,
            "; final cell {}, {} motion events, {} status events, {} damage taken",
            self.final_cell, self.motion_events, self.status_events, self.damage_taken
        )?;
        if !self.scattered.is_empty() {
            write!(f, ", {} scattered walls", self.scattered.len())?;
        }
        Ok(())
    }
}

/// One unit chasing the target marker while its scripted effects play out.
#[derive(Debug)]
pub(crate) struct Simulation {
    grid: Grid,
    walls: WallLayer,
    target: Vec2,
    motion: MotionController,
    status: StatusAggregator,
    buffs: Vec<ScriptedBuff>,
    hits: Vec<ScriptedHit>,
    dashes: Vec<ScriptedDash>,
    scattered: Vec<CellCoord>,
}

impl Simulation {
    /// Builds the arena, scattering the scenario's extra AI walls with `seed`.
    pub(crate) fn new(scenario: &Scenario, seed: u64) -> Result<Self> {
        let layout = &scenario.layout;
        let start = layout.start().context("layout has no start marker")?;
        let target = layout.target().context("layout has no target marker")?;

        let mut walls = layout.wall_layer(Vec2::ZERO, scenario.cell_length);
        let scattered = scatter_walls(layout, scenario.scatter, seed);
        for &cell in &scattered {
            let min = Vec2::new(cell.column() as f32, cell.row() as f32) * scenario.cell_length;
            walls.push_rect(min, min + Vec2::splat(scenario.cell_length), LayerMask::AI_WALL);
        }

        let grid = Grid::from_obstacles(
            layout.bounds(Vec2::ZERO, scenario.cell_length),
            &walls,
            LayerMask::WALL.union(LayerMask::AI_WALL),
        )
        .context("failed to build arena grid")?;

        let target = grid.cell_center(target);
        let tracked = Tracked {
            unit: TARGET_UNIT,
            position: target,
        };
        let mut motion = MotionController::new(scenario.motion, grid.cell_center(start))
            .with_resolver(move |_origin: Vec2| Some(tracked));
        motion.track(Some(tracked));

        tracing::info!(
            columns = layout.columns(),
            rows = layout.rows(),
            %start,
            scattered = scattered.len(),
            "arena ready"
        );

        Ok(Self {
            grid,
            walls,
            target,
            motion,
            status: StatusAggregator::new(),
            buffs: scenario.buffs.clone(),
            hits: scenario.hits.clone(),
            dashes: scenario.dashes.clone(),
            scattered,
        })
    }

    /// Runs up to `frames` frames of length `dt`, stopping once the unit
    /// rests on the target.
    pub(crate) fn run(&mut self, frames: u32, dt: Duration) -> Report {
        let terrain = Terrain::new(&self.grid, &self.walls);
        let mut motion_events = Vec::new();
        let mut status_events = Vec::new();
        let mut report = Report {
            frames_run: 0,
            arrived_at: None,
            final_cell: self.grid.node_at_world(self.motion.position()).cell(),
            motion_events: 0,
            status_events: 0,
            damage_taken: 0.0,
            scattered: self.scattered.clone(),
        };

        for frame in 0..frames {
            report.frames_run = frame + 1;
            self.status.tick(dt, &mut status_events);

            for scripted in self.buffs.iter().filter(|buff| buff.frame == frame) {
                self.status.add(scripted.to_buff(), &mut status_events);
            }
            for hit in self.hits.iter().filter(|hit| hit.frame == frame) {
                match self.status.intercept_damage(&hit.to_damage()) {
                    Some(amount) => {
                        tracing::info!(frame, amount, kind = ?hit.kind, "hit landed");
                        report.damage_taken += amount;
                    }
                    None => tracing::info!(frame, kind = ?hit.kind, "hit absorbed"),
                }
            }

            let summary = self.status.summary();
            let gate = MotionGate::new(summary.can_move, summary.speed_multiplier);

            for dash in self.dashes.iter().filter(|dash| dash.frame == frame) {
                self.motion.dash(
                    dash.direction,
                    dash.tiles,
                    Duration::from_millis(dash.millis),
                    Duration::from_millis(dash.hold_ms),
                    &terrain,
                    gate,
                    &mut motion_events,
                );
            }

            self.motion
                .move_to(self.target, &terrain, gate, &mut motion_events);
            self.motion.tick(dt, &terrain, gate, &mut motion_events);

            report.status_events += log_status(frame, &mut status_events);
            report.motion_events += log_motion(frame, &mut motion_events);

            if self.motion.position() == self.target && !self.motion.is_moving() {
                report.arrived_at = Some(frame);
                break;
            }
        }

        report.final_cell = self.grid.node_at_world(self.motion.position()).cell();
        report
    }
}

/// Picks `count` distinct floor cells, excluding the markers, in cell order.
fn scatter_walls(layout: &TileLayout, count: u32, seed: u64) -> Vec<CellCoord> {
    if count == 0 {
        return Vec::new();
    }

    let candidates: Vec<CellCoord> = (0..layout.rows())
        .flat_map(|row| (0..layout.columns()).map(move |column| CellCoord::new(column, row)))
        .filter(|cell| Some(*cell) != layout.start() && Some(*cell) != layout.target())
        .filter(|cell| layout.walls().iter().all(|(wall, _)| wall != cell))
        .collect();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let amount = usize::try_from(count).unwrap_or(usize::MAX);
    let mut picked: Vec<CellCoord> = candidates
        .choose_multiple(&mut rng, amount)
        .copied()
        .collect();
    picked.sort();
    picked
}

fn log_status(frame: u32, events: &mut Vec<StatusEvent>) -> usize {
    let count = events.len();
    for event in events.drain(..) {
        tracing::info!(frame, ?event, "status");
    }
    count
}

fn log_motion(frame: u32, events: &mut Vec<MotionEvent>) -> usize {
    let count = events.len();
    for event in events.drain(..) {
        match event {
            MotionEvent::StepCompleted { .. } => tracing::debug!(frame, ?event, "motion"),
            _ => tracing::info!(frame, ?event, "motion"),
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(125);

    fn scenario(extra: &str) -> Scenario {
        let text = format!(
            "layout = \"\"\"\n..........\n.#######..\n.......#..\nS......#.T\n\"\"\"\n{extra}"
        );
        Scenario::parse(&text).expect("scenario parses")
    }

    #[test]
    fn unit_reaches_the_target_around_walls() {
        let mut simulation = Simulation::new(&scenario(""), 0).expect("arena builds");

        let report = simulation.run(400, FRAME);

        assert!(report.arrived_at.is_some(), "{report}");
        assert_eq!(report.final_cell, CellCoord::new(9, 0));
        assert!(report.motion_events > 0);
        assert_eq!(report.status_events, 0);
    }

    #[test]
    fn freeze_delays_arrival_until_fire_thaws_it() {
        let mut free = Simulation::new(&scenario(""), 0).expect("arena builds");
        let mut frozen = Simulation::new(
            &scenario(
                "[[buffs]]\nframe = 2\nkind = \"freeze\"\n\n[[hits]]\nframe = 20\namount = 5.0\nkind = \"Fire\"\n",
            ),
            0,
        )
        .expect("arena builds");

        let free = free.run(400, FRAME);
        let frozen = frozen.run(400, FRAME);

        let free_frame = free.arrived_at.expect("free unit arrives");
        let frozen_frame = frozen.arrived_at.expect("thawed unit arrives");
        assert!(frozen_frame > free_frame);
        assert_eq!(frozen.damage_taken, 5.0);
        assert_eq!(frozen.status_events, 2);
    }

    #[test]
    fn invincibility_absorbs_scripted_hits() {
        let mut simulation = Simulation::new(
            &scenario(
                "[[buffs]]\nframe = 0\nkind = \"invincible\"\nseconds = 1.0\n\n[[hits]]\nframe = 1\namount = 5.0\n\n[[hits]]\nframe = 9\namount = 2.0\n",
            ),
            0,
        )
        .expect("arena builds");

        let report = simulation.run(400, FRAME);

        assert_eq!(report.damage_taken, 2.0);
    }

    #[test]
    fn scattered_walls_depend_only_on_the_seed() {
        let layout = scenario("scatter = 5").layout;

        let first = scatter_walls(&layout, 5, 42);
        let again = scatter_walls(&layout, 5, 42);

        assert_eq!(first, again);
        assert_eq!(first.len(), 5);
        for cell in &first {
            assert!(layout.walls().iter().all(|(wall, _)| wall != cell));
            assert_ne!(Some(*cell), layout.start());
            assert_ne!(Some(*cell), layout.target());
        }
        assert!(scatter_walls(&layout, 0, 42).is_empty());
    }

    #[test]
    fn report_mentions_arrival() {
        let report = Report {
            frames_run: 12,
            arrived_at: Some(11),
            final_cell: CellCoord::new(9, 0),
            motion_events: 30,
            status_events: 2,
            damage_taken: 0.0,
            scattered: Vec::new(),
        };

        assert_eq!(
            report.to_string(),
            "arrived at frame 11; final cell (9, 0), 30 motion events, 2 status events, 0 damage taken"
        );
    }
}
