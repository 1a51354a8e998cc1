use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub const STANDARD_WIDTH: u8 = 16;
pub const STANDARD_HEIGHT: u8 = 12;

const STANDARD_OBSTACLES: [(u8, u8); 6] = [(2, 2), (13, 2), (2, 9), (13, 9), (7, 4), (7, 7)];

static STANDARD_BOARD: Lazy<Board> = Lazy::new(|| {
    let mut board = Board::open(STANDARD_WIDTH, STANDARD_HEIGHT);
    for (x, y) in STANDARD_OBSTACLES {
        board.set_terrain(Position::new(x, y), Terrain::Obstacle);
    }
    board
});

/// Grid coordinate, origin at the top-left cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: u8,
    pub y: u8,
}

impl Position {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: Position) -> u16 {
        u16::from(self.x.abs_diff(other.x)) + u16::from(self.y.abs_diff(other.y))
    }

    /// Every in-bounds cell within `radius` steps, row-major.
    pub fn within(self, radius: u8, board: &Board) -> Vec<Position> {
        let r = i16::from(radius);
        let mut cells = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                if dx.abs() + dy.abs() > r {
                    continue;
                }
                let x = i16::from(self.x) + dx;
                let y = i16::from(self.y) + dy;
                if let Some(cell) = board.cell(x, y) {
                    cells.push(cell);
                }
            }
        }
        cells
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Terrain {
    #[default]
    Open,
    /// Difficult ground: halves movement range for most classes.
    Rough,
    Obstacle,
}

impl Terrain {
    fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '.' => Some(Terrain::Open),
            '~' => Some(Terrain::Rough),
            '#' => Some(Terrain::Obstacle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum BoardError {
    Empty,
    RaggedRow { row: usize, expected: usize, actual: usize },
    UnknownGlyph { row: usize, column: usize, glyph: char },
    TooLarge { width: usize, height: usize },
    CellCount { expected: usize, actual: usize },
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::Empty => write!(f, "board has no cells"),
            BoardError::RaggedRow {
                row,
                expected,
                actual,
            } => write!(f, "row {row} has {actual} cells, expected {expected}"),
            BoardError::UnknownGlyph { row, column, glyph } => {
                write!(f, "unknown terrain {glyph:?} at row {row}, column {column}")
            }
            BoardError::TooLarge { width, height } => {
                write!(f, "{width}x{height} exceeds the largest supported board")
            }
            BoardError::CellCount { expected, actual } => {
                write!(f, "board lists {actual} cells, expected {expected}")
            }
        }
    }
}

impl std::error::Error for BoardError {}

/// Wire form of [`Board`]; checked before it becomes one.
#[derive(Deserialize)]
struct BoardRecord {
    width: u8,
    height: u8,
    cells: Vec<Terrain>,
}

impl TryFrom<BoardRecord> for Board {
    type Error = BoardError;

    fn try_from(record: BoardRecord) -> Result<Self, Self::Error> {
        let expected = usize::from(record.width) * usize::from(record.height);
        if expected == 0 {
            return Err(BoardError::Empty);
        }
        if record.cells.len() != expected {
            return Err(BoardError::CellCount {
                expected,
                actual: record.cells.len(),
            });
        }
        Ok(Self {
            width: record.width,
            height: record.height,
            cells: record.cells,
        })
    }
}

/// Static terrain of a match. Never mutated once play starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "BoardRecord")]
pub struct Board {
    pub width: u8,
    pub height: u8,
    cells: Vec<Terrain>,
}

impl Board {
    pub fn open(width: u8, height: u8) -> Self {
        Self {
            width,
            height,
            cells: vec![Terrain::Open; usize::from(width) * usize::from(height)],
        }
    }

    pub fn standard() -> Self {
        STANDARD_BOARD.clone()
    }

    /// Parses rows of `.` (open), `~` (rough) and `#` (obstacle).
    pub fn from_rows(rows: &[&str]) -> Result<Self, BoardError> {
        let expected = rows.first().map(|row| row.chars().count()).unwrap_or(0);
        if rows.is_empty() || expected == 0 {
            return Err(BoardError::Empty);
        }
        if expected > usize::from(u8::MAX) || rows.len() > usize::from(u8::MAX) {
            return Err(BoardError::TooLarge {
                width: expected,
                height: rows.len(),
            });
        }

        let mut cells = Vec::with_capacity(expected * rows.len());
        for (row, line) in rows.iter().enumerate() {
            let actual = line.chars().count();
            if actual != expected {
                return Err(BoardError::RaggedRow {
                    row,
                    expected,
                    actual,
                });
            }
            for (column, glyph) in line.chars().enumerate() {
                let terrain = Terrain::from_glyph(glyph).ok_or(BoardError::UnknownGlyph {
                    row,
                    column,
                    glyph,
                })?;
                cells.push(terrain);
            }
        }

        Ok(Self {
            width: expected as u8,
            height: rows.len() as u8,
            cells,
        })
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Converts signed coordinates, returning `None` off the board.
    pub fn cell(&self, x: i16, y: i16) -> Option<Position> {
        if x < 0 || y < 0 || x >= i16::from(self.width) || y >= i16::from(self.height) {
            return None;
        }
        Some(Position::new(x as u8, y as u8))
    }

    fn index(&self, pos: Position) -> usize {
        usize::from(pos.y) * usize::from(self.width) + usize::from(pos.x)
    }

    /// Off-board cells read as obstacles.
    pub fn terrain(&self, pos: Position) -> Terrain {
        if !self.in_bounds(pos) {
            return Terrain::Obstacle;
        }
        self.cells
            .get(self.index(pos))
            .copied()
            .unwrap_or(Terrain::Obstacle)
    }

    pub fn set_terrain(&mut self, pos: Position, terrain: Terrain) {
        if self.in_bounds(pos) {
            let index = self.index(pos);
            if let Some(cell) = self.cells.get_mut(index) {
                *cell = terrain;
            }
        }
    }

    pub fn is_obstacle(&self, pos: Position) -> bool {
        self.terrain(pos) == Terrain::Obstacle
    }

    pub fn is_rough(&self, pos: Position) -> bool {
        self.terrain(pos) == Terrain::Rough
    }

    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Position::new(x, y)))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}
