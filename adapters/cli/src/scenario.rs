//! TOML scenario files describing an arena, one unit and a script of
//! status effects, hits and dashes.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use skirmish_core::{DamageInfo, DamageKind, Direction, MotionConfig, StackRule};
use skirmish_system_status::{catalogue, Buff, Lifetime};
use skirmish_world::TileLayout;

const DEFAULT_FRAMES: u32 = 240;
const DEFAULT_FRAME_MS: u64 = 16;

/// Fully parsed and validated scenario.
#[derive(Debug)]
pub(crate) struct Scenario {
    pub(crate) layout: TileLayout,
    pub(crate) cell_length: f32,
    pub(crate) frames: u32,
    pub(crate) frame_ms: u64,
    pub(crate) scatter: u32,
    pub(crate) motion: MotionConfig,
    pub(crate) buffs: Vec<ScriptedBuff>,
    pub(crate) hits: Vec<ScriptedHit>,
    pub(crate) dashes: Vec<ScriptedDash>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    layout: String,
    #[serde(default = "default_cell_length")]
    cell_length: f32,
    frames: Option<u32>,
    frame_ms: Option<u64>,
    #[serde(default)]
    scatter: u32,
    #[serde(default)]
    motion: MotionConfig,
    #[serde(default)]
    buffs: Vec<ScriptedBuff>,
    #[serde(default)]
    hits: Vec<ScriptedHit>,
    #[serde(default)]
    dashes: Vec<ScriptedDash>,
}

fn default_cell_length() -> f32 {
    1.0
}

/// Catalogue entry applied by a scripted buff.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum BuffKind {
    Invincible,
    Speedboost,
    Chill,
    Freeze,
    Silence,
    Vulnerability,
}

/// Effect applied at the start of `frame`.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScriptedBuff {
    pub(crate) frame: u32,
    pub(crate) kind: BuffKind,
    /// Lifetime in seconds; zero or negative never expires.
    #[serde(default)]
    pub(crate) seconds: f32,
    pub(crate) multiplier: Option<f32>,
    pub(crate) stack: Option<StackRule>,
}

impl ScriptedBuff {
    pub(crate) fn to_buff(&self) -> Buff {
        let lifetime = Lifetime::from_secs(self.seconds);
        let buff = match self.kind {
            BuffKind::Invincible => catalogue::invincible(lifetime),
            BuffKind::Speedboost => {
                catalogue::speedboost(lifetime, self.multiplier.unwrap_or(1.5))
            }
            BuffKind::Chill => catalogue::chill(lifetime, self.multiplier.unwrap_or(0.5)),
            BuffKind::Freeze => catalogue::freeze(lifetime),
            BuffKind::Silence => catalogue::silence(lifetime),
            BuffKind::Vulnerability => {
                catalogue::vulnerability(lifetime, self.multiplier.unwrap_or(1.25))
            }
        };
        match self.stack {
            Some(rule) => buff.with_stack_rule(rule),
            None => buff,
        }
    }
}

/// Hit delivered at the start of `frame`.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScriptedHit {
    pub(crate) frame: u32,
    pub(crate) amount: f32,
    #[serde(default)]
    pub(crate) kind: DamageKind,
}

impl ScriptedHit {
    pub(crate) fn to_damage(self) -> DamageInfo {
        DamageInfo::new(self.amount).with_kind(self.kind)
    }
}

/// Dash issued at the start of `frame`.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScriptedDash {
    pub(crate) frame: u32,
    pub(crate) direction: Direction,
    pub(crate) tiles: u32,
    pub(crate) millis: u64,
    #[serde(default)]
    pub(crate) hold_ms: u64,
}

impl Scenario {
    /// Reads and validates the scenario stored at `path`.
    pub(crate) fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid scenario {}", path.display()))
    }

    /// Parses and validates scenario TOML.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let file: ScenarioFile =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;
        let layout = TileLayout::parse(&file.layout).context("failed to parse layout")?;

        if layout.start().is_none() {
            bail!("layout has no `S` start marker");
        }
        if layout.target().is_none() {
            bail!("layout has no `T` target marker");
        }
        if !(file.cell_length.is_finite() && file.cell_length > 0.0) {
            bail!("cell_length must be positive, got {}", file.cell_length);
        }
        if file.frame_ms == Some(0) {
            bail!("frame_ms must be at least 1");
        }
        if !(file.motion.base_speed.is_finite() && file.motion.base_speed > 0.0) {
            bail!(
                "motion.base_speed must be positive, got {}",
                file.motion.base_speed
            );
        }
        for dash in &file.dashes {
            if dash.tiles == 0 {
                bail!("dash on frame {} covers no tiles", dash.frame);
            }
        }

        Ok(Self {
            layout,
            cell_length: file.cell_length,
            frames: file.frames.unwrap_or(DEFAULT_FRAMES),
            frame_ms: file.frame_ms.unwrap_or(DEFAULT_FRAME_MS),
            scatter: file.scatter,
            motion: file.motion,
            buffs: file.buffs,
            hits: file.hits,
            dashes: file.dashes,
        })
    }
}
