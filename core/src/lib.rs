#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Skirmish simulation crates.
//!
//! This crate defines the vocabulary that connects the grid world, the pure
//! pathfinding/motion/status systems, and the adapters driving them. Systems
//! never talk to each other directly: they take read-only views of the world,
//! mutate state they exclusively own, and report what happened by pushing
//! [`MotionEvent`] or [`StatusEvent`] values into caller-owned buffers.

use std::{borrow::Cow, fmt, time::Duration};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Unique identifier assigned to a unit taking part in the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Rows grow upward in world space: row zero is the bottom edge of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Returns the cell displaced by the signed offsets, or `None` when the
    /// result would leave the non-negative coordinate space.
    #[must_use]
    pub fn offset(self, columns: i32, rows: i32) -> Option<CellCoord> {
        let column = self.column.checked_add_signed(columns)?;
        let row = self.row.checked_add_signed(rows)?;
        Some(CellCoord::new(column, row))
    }

    /// Signed displacement that leads from `self` to `other`.
    #[must_use]
    pub fn delta_to(self, other: CellCoord) -> (i64, i64) {
        (
            i64::from(other.column) - i64::from(self.column),
            i64::from(other.row) - i64::from(self.row),
        )
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Axis-aligned facing and movement directions available to units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward increasing row indices (world +y).
    North,
    /// Movement toward increasing column indices (world +x).
    East,
    /// Movement toward decreasing row indices (world -y).
    #[default]
    South,
    /// Movement toward decreasing column indices (world -x).
    West,
}

impl Direction {
    /// All directions in a stable order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Signed `(column, row)` offset of a single step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::East => (1, 0),
            Self::South => (0, -1),
            Self::West => (-1, 0),
        }
    }

    /// Unit-length world vector pointing in this direction.
    #[must_use]
    pub fn unit_vector(self) -> Vec2 {
        let (x, y) = self.delta();
        Vec2::new(x as f32, y as f32)
    }

    /// Snaps an arbitrary vector onto its dominant axis.
    ///
    /// Ties between the axes resolve to the vertical axis. Zero and non-finite
    /// vectors have no direction.
    #[must_use]
    pub fn from_vector(vector: Vec2) -> Option<Direction> {
        if !vector.is_finite() || vector == Vec2::ZERO {
            return None;
        }

        if vector.x.abs() > vector.y.abs() {
            if vector.x > 0.0 {
                Some(Self::East)
            } else {
                Some(Self::West)
            }
        } else if vector.y > 0.0 {
            Some(Self::North)
        } else {
            Some(Self::South)
        }
    }

    /// Direction of a single orthogonal step between two adjacent cells.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Direction> {
        match from.delta_to(to) {
            (0, 1) => Some(Self::North),
            (1, 0) => Some(Self::East),
            (0, -1) => Some(Self::South),
            (-1, 0) => Some(Self::West),
            _ => None,
        }
    }
}

/// Element carried by a hit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageKind {
    /// Untyped physical damage.
    #[default]
    Normal,
    /// Fire damage; thaws chill and freeze effects.
    Fire,
    /// Ice damage.
    Ice,
    /// Poison damage.
    Poison,
    /// Damage that ignores typed resistances.
    True,
}

/// Description of a single hit delivered to a unit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DamageInfo {
    /// Raw amount before any damage-taken multiplier is applied.
    pub amount: f32,
    /// Element of the hit.
    pub kind: DamageKind,
    /// Unit that dealt the hit, when known.
    pub source: Option<UnitId>,
}

impl DamageInfo {
    /// Creates an untyped hit without a known source.
    #[must_use]
    pub const fn new(amount: f32) -> Self {
        Self {
            amount,
            kind: DamageKind::Normal,
            source: None,
        }
    }

    /// Overrides the element carried by the hit.
    #[must_use]
    pub const fn with_kind(mut self, kind: DamageKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attributes the hit to a unit.
    #[must_use]
    pub const fn with_source(mut self, source: UnitId) -> Self {
        self.source = Some(source);
        self
    }
}

/// Identifier shared by every instance of the same timed effect.
///
/// Two buffs with equal identifiers are the same effect for stacking purposes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuffId(Cow<'static, str>);

impl BuffId {
    /// Creates an identifier from a static string, usable in constants.
    #[must_use]
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    /// Creates an identifier from an owned string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    /// String form of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Informational classification of a timed effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuffCategory {
    /// Beneficial effect.
    Buff,
    /// Harmful effect.
    Debuff,
}

/// Policy applied when an effect is added while one with the same identifier
/// is already active. The incoming effect's rule decides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StackRule {
    /// Keep the longer remaining time and the stronger intensity.
    #[default]
    RefreshDuration,
    /// Accumulate remaining time, keep the stronger intensity.
    AddDuration,
    /// Accumulate intensity, merge remaining time like `RefreshDuration`.
    AddIntensity,
    /// Remove the active effect and apply the incoming one.
    Replace,
    /// Discard the incoming effect.
    IgnoreIfExists,
}

impl StackRule {
    /// Canonical name used in configuration files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RefreshDuration => "refresh_duration",
            Self::AddDuration => "add_duration",
            Self::AddIntensity => "add_intensity",
            Self::Replace => "replace",
            Self::IgnoreIfExists => "ignore_if_exists",
        }
    }

    /// Parses a rule name, falling back to [`StackRule::RefreshDuration`] for
    /// anything unrecognised.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let normalised = name.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalised.as_str() {
            "add_duration" | "addduration" => Self::AddDuration,
            "add_intensity" | "addintensity" => Self::AddIntensity,
            "replace" => Self::Replace,
            "ignore_if_exists" | "ignoreifexists" => Self::IgnoreIfExists,
            _ => Self::RefreshDuration,
        }
    }
}

impl From<String> for StackRule {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl From<StackRule> for String {
    fn from(value: StackRule) -> Self {
        value.name().to_owned()
    }
}

/// Strategy that produced the path a unit is following.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSource {
    /// Plain grid A* search.
    AStar,
    /// Diagonal stair-steps followed by straight runs.
    DiagonalThenStraight,
    /// The shaper gave up and deferred to A*.
    AStarFallback,
    /// No route exists; the unit should stay in place.
    Unreachable,
}

/// Tuning for the diagonal-then-straight path shaper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaperConfig {
    /// Maximum number of diagonal stair-step pairs attempted before the
    /// straight runs.
    pub step_start_pairs: u32,
    /// Treat the axis with the larger delta as primary; when `false` the
    /// column axis is always primary.
    pub primary_is_longer_axis: bool,
    /// Walk the leftover secondary-axis distance before the primary run.
    pub straight_after_diagonals: bool,
}

impl Default for ShaperConfig {
    fn default() -> Self {
        Self {
            step_start_pairs: 4,
            primary_is_longer_axis: true,
            straight_after_diagonals: true,
        }
    }
}

/// Tuning for a unit's motion controller.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Base movement speed measured in tiles per second.
    pub base_speed: f32,
    /// Schedule a re-path after this many tiles along a committed path.
    pub repath_every_tiles: u32,
    /// Consult the retarget resolver after this many tiles.
    pub retarget_interval: u32,
    /// Window during which movement stays disabled after a teleport.
    #[serde(with = "serde_millis")]
    pub teleport_guard: Duration,
    /// Path shaping options.
    pub shaper: ShaperConfig,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            base_speed: 4.0,
            repath_every_tiles: 3,
            retarget_interval: 3,
            teleport_guard: Duration::from_millis(100),
            shaper: ShaperConfig::default(),
        }
    }
}

/// Serde helpers that encode [`Duration`] values as whole milliseconds.
pub mod serde_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialises the duration as an unsigned millisecond count.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    /// Deserialises an unsigned millisecond count into a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Target tracked by a unit's motion controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tracked {
    /// Unit being tracked.
    pub unit: UnitId,
    /// Last known world position of the tracked unit.
    pub position: Vec2,
}

/// Events reported by a motion controller.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MotionEvent {
    /// A new route replaced the previous one.
    PathPlanned {
        /// Strategy that produced the route.
        source: PathSource,
        /// Number of tile steps in the route.
        steps: usize,
    },
    /// A single-tile step was committed.
    StepStarted {
        /// Direction of travel.
        direction: Direction,
        /// Cell the step departs from.
        from: CellCoord,
        /// Cell the step arrives at.
        to: CellCoord,
    },
    /// A single-tile step was refused because a wall blocks it.
    StepRefused {
        /// Direction that was attempted.
        direction: Direction,
    },
    /// A single-tile step reached its destination.
    StepCompleted {
        /// Cell the unit now rests on.
        cell: CellCoord,
    },
    /// The retarget resolver selected a unit to track.
    Retargeted {
        /// Newly tracked unit.
        unit: UnitId,
    },
    /// A dash began.
    DashStarted {
        /// Fixed direction of the dash.
        direction: Direction,
        /// Number of tiles requested.
        tiles: u32,
    },
    /// A dash stopped early because a wall blocks the next tile.
    DashBlocked {
        /// Last valid cell reached by the dash.
        cell: CellCoord,
    },
    /// A dash travelled every requested tile.
    DashFinished {
        /// Cell the dash ended on.
        cell: CellCoord,
    },
    /// The unit was moved instantly.
    Teleported {
        /// Cell the unit now rests on.
        cell: CellCoord,
    },
    /// The current route was discarded without implying arrival.
    Halted,
}

/// Why an active effect left a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalReason {
    /// Remaining time ran out.
    Expired,
    /// A caller removed the effect explicitly.
    Removed,
    /// An incoming effect with [`StackRule::Replace`] took its place.
    Replaced,
}

/// Events reported by a status aggregator. `Applied` and `Removed` are the
/// one-shot apply and removal hooks of an effect.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StatusEvent {
    /// An effect became active.
    Applied {
        /// Identifier of the effect.
        id: BuffId,
        /// Opaque presentation cue (audio key) attached to the effect.
        cue: Option<Cow<'static, str>>,
    },
    /// An incoming effect merged into the active one.
    Stacked {
        /// Identifier of the effect.
        id: BuffId,
        /// Rule that resolved the merge.
        rule: StackRule,
    },
    /// An incoming effect was discarded.
    Ignored {
        /// Identifier of the effect.
        id: BuffId,
    },
    /// An effect stopped being active.
    Removed {
        /// Identifier of the effect.
        id: BuffId,
        /// Why the effect was removed.
        reason: RemovalReason,
    },
}
