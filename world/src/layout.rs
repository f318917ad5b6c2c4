//! ASCII tilemap layouts used by scenarios and tests.
//!
//! Rows are written top to bottom, the way they read on screen, while row
//! indices grow upward in world space. The last text line is therefore row
//! zero.

use glam::Vec2;
use skirmish_core::CellCoord;
use thiserror::Error;

use crate::{walls::LayerMask, GridBounds, WallLayer};

/// Reasons a layout string cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The layout contains no rows.
    #[error("layout contains no rows")]
    Empty,
    /// A row differs in width from the first row.
    #[error("layout row {line} has {found} cells, expected {expected}")]
    Ragged {
        /// One-based text line of the offending row.
        line: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A glyph outside the supported alphabet was found.
    #[error("unknown glyph {glyph:?} on layout line {line}")]
    UnknownGlyph {
        /// The glyph.
        glyph: char,
        /// One-based text line containing the glyph.
        line: usize,
    },
    /// A marker that may appear once appears several times.
    #[error("marker {0:?} appears more than once")]
    DuplicateMarker(char),
}

const FLOOR: char = '.';
const WALL: char = '#';
const AI_WALL: char = '~';
const START: char = 'S';
const TARGET: char = 'T';

/// Parsed tilemap: dimensions, wall cells and optional markers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileLayout {
    columns: u32,
    rows: u32,
    walls: Vec<(CellCoord, LayerMask)>,
    start: Option<CellCoord>,
    target: Option<CellCoord>,
}

impl TileLayout {
    /// Parses a layout. Blank lines and surrounding whitespace are ignored.
    ///
    /// Glyphs: `.` floor, `#` wall, `~` wall only AI paths respect, `S` start
    /// marker, `T` target marker.
    pub fn parse(text: &str) -> Result<Self, LayoutError> {
        let lines: Vec<(usize, &str)> = text
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty())
            .collect();

        let Some(&(_, first)) = lines.first() else {
            return Err(LayoutError::Empty);
        };
        let expected = first.chars().count();
        let rows = lines.len();

        let mut walls = Vec::new();
        let mut start = None;
        let mut target = None;

        for (text_row, &(line, content)) in lines.iter().enumerate() {
            let found = content.chars().count();
            if found != expected {
                return Err(LayoutError::Ragged {
                    line,
                    expected,
                    found,
                });
            }

            let row = to_u32(rows - 1 - text_row);
            for (column, glyph) in content.chars().enumerate() {
                let cell = CellCoord::new(to_u32(column), row);
                match glyph {
                    FLOOR => {}
                    WALL => walls.push((cell, LayerMask::WALL)),
                    AI_WALL => walls.push((cell, LayerMask::AI_WALL)),
                    START => place_marker(&mut start, cell, START)?,
                    TARGET => place_marker(&mut target, cell, TARGET)?,
                    other => return Err(LayoutError::UnknownGlyph { glyph: other, line }),
                }
            }
        }

        walls.sort_by_key(|(cell, _)| *cell);

        Ok(Self {
            columns: to_u32(expected),
            rows: to_u32(rows),
            walls,
            start,
            target,
        })
    }

    /// Number of columns in the layout.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the layout.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Cell carrying the `S` marker, if any.
    #[must_use]
    pub const fn start(&self) -> Option<CellCoord> {
        self.start
    }

    /// Cell carrying the `T` marker, if any.
    #[must_use]
    pub const fn target(&self) -> Option<CellCoord> {
        self.target
    }

    /// Wall cells with the layer each belongs to, ordered by cell.
    #[must_use]
    pub fn walls(&self) -> &[(CellCoord, LayerMask)] {
        &self.walls
    }

    /// Bounds covering the layout when placed at `origin`.
    #[must_use]
    pub const fn bounds(&self, origin: Vec2, cell_length: f32) -> GridBounds {
        GridBounds::new(origin, cell_length, self.columns, self.rows)
    }

    /// One full-cell box collider per wall cell.
    #[must_use]
    pub fn wall_layer(&self, origin: Vec2, cell_length: f32) -> WallLayer {
        let mut layer = WallLayer::new();
        for &(cell, mask) in &self.walls {
            let min = origin
                + Vec2::new(
                    cell.column() as f32 * cell_length,
                    cell.row() as f32 * cell_length,
                );
            layer.push_rect(min, min + Vec2::splat(cell_length), mask);
        }
        layer
    }
}

fn place_marker(
    slot: &mut Option<CellCoord>,
    cell: CellCoord,
    marker: char,
) -> Result<(), LayoutError> {
    if slot.replace(cell).is_some() {
        return Err(LayoutError::DuplicateMarker(marker));
    }
    Ok(())
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
