#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-unit motion controller that commits to one tile at a time.
//!
//! The controller is a resumable state machine. Callers issue commands
//! (`move_to`, `step`, `dash`, `teleport`, `halt`) and then advance it once
//! per frame with [`MotionController::tick`]. Anything that would otherwise
//! wait, such as a stride, a dash leg or a movement hold, is stored as state
//! and resumed on the next tick.

use std::{fmt, time::Duration};

use glam::Vec2;
use skirmish_core::{Direction, MotionConfig, MotionEvent, PathSource, Tracked};
use skirmish_system_pathfinding::{Path, PathPlanner};
use skirmish_world::{Grid, NodeId, Terrain};

mod leg;

use leg::{Advance, Leg};

/// Lowest speed multiplier used to scale a stride or dash that is allowed
/// to progress.
const MIN_SPEED_MULTIPLIER: f32 = 0.01;

/// Shortest duration a single dash tile may take, in seconds.
const MIN_DASH_TILE_SECONDS: f32 = 0.0001;

/// Movement permissions sampled from the unit's status for the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionGate {
    /// Whether new steps, routes and dashes may start.
    pub can_move: bool,
    /// Scales stride and dash speed. Zero or below pauses both without
    /// losing progress.
    pub speed_multiplier: f32,
}

impl MotionGate {
    /// Unrestricted movement at normal speed.
    pub const FREE: MotionGate = MotionGate {
        can_move: true,
        speed_multiplier: 1.0,
    };

    /// Creates a gate from explicit values.
    #[must_use]
    pub const fn new(can_move: bool, speed_multiplier: f32) -> Self {
        Self {
            can_move,
            speed_multiplier,
        }
    }

    fn is_paused(self) -> bool {
        self.speed_multiplier.is_nan() || self.speed_multiplier <= 0.0
    }

    fn effective_multiplier(self) -> f32 {
        self.speed_multiplier.max(MIN_SPEED_MULTIPLIER)
    }
}

impl Default for MotionGate {
    fn default() -> Self {
        Self::FREE
    }
}

/// Picks a new unit to track while a route is being walked.
pub trait RetargetResolver {
    /// Returns the unit to track from `origin`, or `None` to keep the
    /// current target.
    fn resolve(&mut self, origin: Vec2) -> Option<Tracked>;
}

impl<F> RetargetResolver for F
where
    F: FnMut(Vec2) -> Option<Tracked>,
{
    fn resolve(&mut self, origin: Vec2) -> Option<Tracked> {
        self(origin)
    }
}

#[derive(Clone, Copy, Debug)]
struct Stride {
    direction: Direction,
    leg: Leg,
}

#[derive(Clone, Copy, Debug)]
struct DashRun {
    direction: Direction,
    tiles: u32,
    completed: u32,
    seconds_per_tile: f32,
    post_hold: Duration,
    leg: Leg,
}

/// Motion state owned by a single unit.
pub struct MotionController {
    config: MotionConfig,
    planner: PathPlanner,
    position: Vec2,
    settled: Vec2,
    arrived: Vec2,
    facing: Direction,
    path: Option<Path>,
    path_index: usize,
    path_source: Option<PathSource>,
    destination: Option<Vec2>,
    tracked: Option<Tracked>,
    repath_counter: u32,
    retarget_counter: u32,
    repath_pending: bool,
    stride: Option<Stride>,
    dash: Option<DashRun>,
    hold_remaining: Duration,
    manual_hold: bool,
    resolver: Option<Box<dyn RetargetResolver>>,
}

impl MotionController {
    /// Creates an idle controller resting at `position`, facing south.
    #[must_use]
    pub fn new(config: MotionConfig, position: Vec2) -> Self {
        Self {
            config,
            planner: PathPlanner::new(config.shaper),
            position,
            settled: position,
            arrived: position,
            facing: Direction::default(),
            path: None,
            path_index: 0,
            path_source: None,
            destination: None,
            tracked: None,
            repath_counter: 0,
            retarget_counter: 0,
            repath_pending: false,
            stride: None,
            dash: None,
            hold_remaining: Duration::ZERO,
            manual_hold: false,
            resolver: None,
        }
    }

    /// Installs the resolver consulted every `retarget_interval` tiles.
    #[must_use]
    pub fn with_resolver<R>(mut self, resolver: R) -> Self
    where
        R: RetargetResolver + 'static,
    {
        self.set_resolver(resolver);
        self
    }

    /// Replaces the retarget resolver.
    pub fn set_resolver<R>(&mut self, resolver: R)
    where
        R: RetargetResolver + 'static,
    {
        self.resolver = Some(Box::new(resolver));
    }

    /// Tuning in effect.
    #[must_use]
    pub const fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Current interpolated world position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Position the unit counts as standing on for gameplay: it moves to the
    /// destination once a stride or dash tile is half done.
    #[must_use]
    pub const fn settled_position(&self) -> Vec2 {
        self.settled
    }

    /// Position of the last tile the unit fully arrived on.
    #[must_use]
    pub const fn arrived_position(&self) -> Vec2 {
        self.arrived
    }

    /// Facing direction.
    #[must_use]
    pub const fn facing(&self) -> Direction {
        self.facing
    }

    /// Whether a stride or a dash is in flight.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.stride.is_some() || self.dash.is_some()
    }

    /// Whether a dash is in flight.
    #[must_use]
    pub const fn is_dashing(&self) -> bool {
        self.dash.is_some()
    }

    /// Whether a timed or manual hold currently forbids new movement.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.manual_hold || !self.hold_remaining.is_zero()
    }

    /// Progress of the in-flight stride or dash tile in `0.0..=1.0`.
    #[must_use]
    pub fn leg_progress(&self) -> Option<f32> {
        match (&self.dash, &self.stride) {
            (Some(run), _) => Some(run.leg.progress()),
            (None, Some(stride)) => Some(stride.leg.progress()),
            (None, None) => None,
        }
    }

    /// Nodes of the committed route that have not been reached yet.
    #[must_use]
    pub fn remaining_path(&self) -> &[NodeId] {
        self.path
            .as_ref()
            .and_then(|path| path.steps().get(self.path_index..))
            .unwrap_or(&[])
    }

    /// Strategy that produced the most recent route.
    #[must_use]
    pub const fn path_source(&self) -> Option<PathSource> {
        self.path_source
    }

    /// Destination of the latest [`MotionController::move_to`] call.
    #[must_use]
    pub const fn destination(&self) -> Option<Vec2> {
        self.destination
    }

    /// Unit currently tracked for re-paths.
    #[must_use]
    pub const fn tracked(&self) -> Option<Tracked> {
        self.tracked
    }

    /// Whether a re-path will run when the in-flight stride finishes.
    #[must_use]
    pub const fn repath_pending(&self) -> bool {
        self.repath_pending
    }

    /// Sets or clears the tracked unit, typically to refresh its position.
    pub fn track(&mut self, tracked: Option<Tracked>) {
        self.tracked = tracked;
    }

    /// Walks toward `destination`, planning a route when none is active.
    ///
    /// Silently does nothing while movement is forbidden, held, or a dash is
    /// in flight.
    pub fn move_to(
        &mut self,
        destination: Vec2,
        terrain: &Terrain<'_>,
        gate: MotionGate,
        out: &mut Vec<MotionEvent>,
    ) {
        if !gate.can_move || self.is_held() || self.is_dashing() {
            return;
        }

        self.destination = Some(destination);
        if self.stride.is_none() && self.remaining_path().is_empty() {
            self.plan(terrain, destination, out);
        }

        self.move_along_path(terrain, gate, out);
    }

    /// Commits to a single-tile stride in `direction`.
    ///
    /// A wall between the current and destination positions, or a
    /// destination outside the grid, refuses the stride without moving the
    /// unit.
    pub fn step(
        &mut self,
        direction: Direction,
        terrain: &Terrain<'_>,
        gate: MotionGate,
        out: &mut Vec<MotionEvent>,
    ) {
        if !gate.can_move || self.is_held() || self.is_moving() {
            return;
        }

        self.facing = direction;
        let grid = terrain.grid();
        let from = self.position;
        let to = from + direction.unit_vector() * grid.cell_length();

        let on_grid = stays_on_grid(grid, from, direction);

        if !on_grid || terrain.movement_blocked(from, to) {
            tracing::trace!(?direction, at = %grid.node_at_world(from).cell(), on_grid, "step refused");
            out.push(MotionEvent::StepRefused { direction });
            return;
        }

        out.push(MotionEvent::StepStarted {
            direction,
            from: grid.node_at_world(from).cell(),
            to: grid.node_at_world(to).cell(),
        });
        self.stride = Some(Stride {
            direction,
            leg: Leg::new(from, to),
        });
    }

    /// Dashes up to `tiles` tiles in a fixed direction over `total`, scaled
    /// by the speed multiplier at the start of the dash.
    ///
    /// The dash cancels any in-flight stride, drops the current route and
    /// ignores holds and `can_move` until it ends. Each tile is checked for
    /// walls before it starts; a blocked tile ends the dash on the last valid
    /// tile. Once the dash ends, movement is held for `post_hold`.
    #[allow(clippy::too_many_arguments)]
    pub fn dash(
        &mut self,
        direction: Direction,
        tiles: u32,
        total: Duration,
        post_hold: Duration,
        terrain: &Terrain<'_>,
        gate: MotionGate,
        out: &mut Vec<MotionEvent>,
    ) {
        if tiles == 0 || !gate.can_move {
            return;
        }

        self.stride = None;
        self.dash = None;
        self.clear_path();
        self.facing = direction;
        out.push(MotionEvent::DashStarted { direction, tiles });

        let seconds_per_tile =
            total.as_secs_f32() / tiles as f32 / gate.effective_multiplier();
        match self.dash_leg(direction, terrain) {
            Some(leg) => {
                self.dash = Some(DashRun {
                    direction,
                    tiles,
                    completed: 0,
                    seconds_per_tile,
                    post_hold,
                    leg,
                });
            }
            None => self.block_dash(post_hold, terrain, out),
        }
    }

    /// Instantly moves the unit to `position`.
    ///
    /// Any stride, dash or route is dropped and movement is held for the
    /// configured teleport guard.
    pub fn teleport(&mut self, position: Vec2, terrain: &Terrain<'_>, out: &mut Vec<MotionEvent>) {
        self.stop_moving_for(self.config.teleport_guard);
        self.stride = None;
        self.dash = None;
        self.position = position;
        self.settled = position;
        self.arrived = position;
        self.clear_path();

        let cell = terrain.grid().node_at_world(position).cell();
        tracing::debug!(%cell, "teleported");
        out.push(MotionEvent::Teleported { cell });
    }

    /// Drops the current route and any pending re-path without moving.
    pub fn halt(&mut self, out: &mut Vec<MotionEvent>) {
        self.clear_path();
        self.repath_pending = false;
        out.push(MotionEvent::Halted);
    }

    /// Holds movement for `duration` of real time, replacing any running
    /// timed hold. Zero durations are ignored.
    pub fn stop_moving_for(&mut self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        self.hold_remaining = duration;
    }

    /// Sets or clears the manual hold.
    pub fn set_stop_moving(&mut self, held: bool) {
        self.manual_hold = held;
    }

    /// Faces the dominant axis of `vector`. Zero vectors are ignored.
    pub fn change_direction(&mut self, vector: Vec2) {
        if let Some(direction) = Direction::from_vector(vector) {
            self.facing = direction;
        }
    }

    /// Advances holds, the in-flight stride and the in-flight dash by `dt`.
    ///
    /// Holds always count down. Strides and dashes pause while the speed
    /// multiplier is zero or below.
    pub fn tick(
        &mut self,
        dt: Duration,
        terrain: &Terrain<'_>,
        gate: MotionGate,
        out: &mut Vec<MotionEvent>,
    ) {
        self.hold_remaining = self.hold_remaining.saturating_sub(dt);

        if self.dash.is_some() {
            self.advance_dash(dt, terrain, gate, out);
        } else if self.stride.is_some() {
            self.advance_stride(dt, terrain, gate, out);
        }
    }

    fn advance_stride(
        &mut self,
        dt: Duration,
        terrain: &Terrain<'_>,
        gate: MotionGate,
        out: &mut Vec<MotionEvent>,
    ) {
        let Some(mut stride) = self.stride.take() else {
            return;
        };
        if gate.is_paused() {
            self.stride = Some(stride);
            return;
        }

        let rate = self.config.base_speed * gate.effective_multiplier();
        let advance = stride.leg.advance(dt.as_secs_f32() * rate);
        self.position = stride.leg.position();
        if stride.leg.is_settled() {
            self.settled = stride.leg.to();
        }

        if advance == Advance::InProgress {
            self.stride = Some(stride);
            return;
        }

        self.arrived = stride.leg.to();
        let cell = terrain.grid().node_at_world(self.position).cell();
        tracing::trace!(direction = ?stride.direction, %cell, "stride completed");
        out.push(MotionEvent::StepCompleted { cell });
        self.repath_if_pending(terrain, out);
    }

    fn advance_dash(
        &mut self,
        dt: Duration,
        terrain: &Terrain<'_>,
        gate: MotionGate,
        out: &mut Vec<MotionEvent>,
    ) {
        let Some(mut run) = self.dash.take() else {
            return;
        };
        if gate.is_paused() {
            self.dash = Some(run);
            return;
        }

        let fraction = dt.as_secs_f32() / run.seconds_per_tile.max(MIN_DASH_TILE_SECONDS);
        let advance = run.leg.advance(fraction);
        self.position = run.leg.position();
        if run.leg.is_settled() {
            self.settled = run.leg.to();
        }

        if advance == Advance::InProgress {
            self.dash = Some(run);
            return;
        }

        self.arrived = run.leg.to();
        run.completed += 1;
        if run.completed >= run.tiles {
            let cell = terrain.grid().node_at_world(self.settled).cell();
            tracing::debug!(%cell, tiles = run.tiles, "dash finished");
            out.push(MotionEvent::DashFinished { cell });
            self.stop_moving_for(run.post_hold);
            return;
        }

        match self.dash_leg(run.direction, terrain) {
            Some(leg) => {
                run.leg = leg;
                self.dash = Some(run);
            }
            None => self.block_dash(run.post_hold, terrain, out),
        }
    }

    fn dash_leg(&self, direction: Direction, terrain: &Terrain<'_>) -> Option<Leg> {
        let from = self.settled;
        let to = from + direction.unit_vector() * terrain.grid().cell_length();
        if !stays_on_grid(terrain.grid(), from, direction) || terrain.movement_blocked(from, to) {
            return None;
        }
        Some(Leg::new(from, to))
    }

    fn block_dash(&mut self, post_hold: Duration, terrain: &Terrain<'_>, out: &mut Vec<MotionEvent>) {
        self.position = self.settled;
        self.arrived = self.settled;
        let cell = terrain.grid().node_at_world(self.settled).cell();
        tracing::debug!(%cell, "dash blocked");
        out.push(MotionEvent::DashBlocked { cell });
        self.stop_moving_for(post_hold);
    }

    fn move_along_path(&mut self, terrain: &Terrain<'_>, gate: MotionGate, out: &mut Vec<MotionEvent>) {
        if self.is_held() || self.is_moving() {
            return;
        }

        let grid = terrain.grid();
        let current = grid.node_at_world(self.position);
        let Some(mut next) = self.next_waypoint() else {
            return;
        };

        if current.id() == next {
            self.count_tile(out);
            self.path_index += 1;
            match self.next_waypoint() {
                Some(waypoint) => next = waypoint,
                None => {
                    self.clear_path();
                    return;
                }
            }
        }

        let Some(next) = grid.node_by_id(next) else {
            return;
        };
        let (dx, dy) = current.cell().delta_to(next.cell());
        let direction = if dx > 0 {
            Direction::East
        } else if dx < 0 {
            Direction::West
        } else if dy > 0 {
            Direction::North
        } else if dy < 0 {
            Direction::South
        } else {
            return;
        };

        self.step(direction, terrain, gate, out);
    }

    fn next_waypoint(&self) -> Option<NodeId> {
        self.path.as_ref()?.get(self.path_index)
    }

    fn count_tile(&mut self, out: &mut Vec<MotionEvent>) {
        self.retarget_counter = self.retarget_counter.saturating_add(1);
        if self.retarget_counter >= self.config.retarget_interval {
            self.retarget_counter = 0;
            if let Some(resolver) = self.resolver.as_mut() {
                if let Some(tracked) = resolver.resolve(self.position) {
                    tracing::debug!(unit = tracked.unit.get(), "retargeted");
                    self.tracked = Some(tracked);
                    out.push(MotionEvent::Retargeted { unit: tracked.unit });
                }
            }
        }

        self.repath_counter = self.repath_counter.saturating_add(1);
        if self.repath_counter >= self.config.repath_every_tiles {
            self.repath_counter = 0;
            self.repath_pending = true;
        }
    }

    fn repath_if_pending(&mut self, terrain: &Terrain<'_>, out: &mut Vec<MotionEvent>) {
        if !self.repath_pending {
            return;
        }
        let Some(target) = self
            .tracked
            .map(|tracked| tracked.position)
            .or(self.destination)
        else {
            return;
        };

        self.repath_pending = false;
        self.repath_counter = 0;
        self.plan(terrain, target, out);
    }

    fn plan(&mut self, terrain: &Terrain<'_>, target: Vec2, out: &mut Vec<MotionEvent>) {
        self.clear_path();

        let grid = terrain.grid();
        if grid.node_at_world(self.position).id() == grid.node_at_world(target).id() {
            return;
        }

        let route = self.planner.plan(terrain, self.position, target);
        let steps = route.path.as_ref().map_or(0, Path::len);
        tracing::debug!(source = ?route.source, steps, "planned route");
        out.push(MotionEvent::PathPlanned {
            source: route.source,
            steps,
        });

        self.path_source = Some(route.source);
        self.path = route.path.filter(|path| !path.is_empty());
    }

    fn clear_path(&mut self) {
        self.path = None;
        self.path_index = 0;
    }
}

/// Whether the cell one tile from `from` in `direction` exists.
fn stays_on_grid(grid: &Grid, from: Vec2, direction: Direction) -> bool {
    let (columns, rows) = direction.delta();
    grid.node_at_world(from)
        .cell()
        .offset(columns, rows)
        .and_then(|cell| grid.node(cell))
        .is_some()
}

impl fmt::Debug for MotionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MotionController")
            .field("position", &self.position)
            .field("settled", &self.settled)
            .field("arrived", &self.arrived)
            .field("facing", &self.facing)
            .field("path_index", &self.path_index)
            .field("path_source", &self.path_source)
            .field("stride", &self.stride)
            .field("dash", &self.dash)
            .field("hold_remaining", &self.hold_remaining)
            .field("manual_hold", &self.manual_hold)
            .field("has_resolver", &self.resolver.is_some())
            .finish_non_exhaustive()
    }
}
