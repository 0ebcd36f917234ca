//! Walkability grid loaded from the server's navmesh matrix

use std::path::Path;

use thiserror::Error;

/// Navmesh loading and validation errors
#[derive(Debug, Error)]
pub enum GridError {
    #[error("navmesh file could not be read: {0}")]
    Io(#[from] std::io::Error),

    #[error("navmesh is not a JSON matrix: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("navmesh has no cells")]
    Empty,

    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("cell ({col}, {row}) holds {value}, expected 0 or 1")]
    BadCell { row: usize, col: usize, value: i64 },
}

/// Immutable 2D walkability mask over the play area. Built once at startup
/// and shared read-only by every session.
#[derive(Debug, Clone)]
pub struct NavGrid {
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
}

impl NavGrid {
    /// Validate a raw row-major matrix (1 = walkable) into a grid.
    pub fn load(raw: &[Vec<i64>]) -> Result<Self, GridError> {
        let rows = raw.len();
        let cols = raw.first().map(|row| row.len()).unwrap_or(0);
        if rows == 0 || cols == 0 {
            return Err(GridError::Empty);
        }

        let mut cells = Vec::with_capacity(rows * cols);
        for (y, row) in raw.iter().enumerate() {
            if row.len() != cols {
                return Err(GridError::RaggedRow {
                    row: y,
                    expected: cols,
                    found: row.len(),
                });
            }
            for (x, &value) in row.iter().enumerate() {
                match value {
                    0 => cells.push(false),
                    1 => cells.push(true),
                    other => {
                        return Err(GridError::BadCell {
                            row: y,
                            col: x,
                            value: other,
                        })
                    }
                }
            }
        }

        Ok(Self { rows, cols, cells })
    }

    /// Load a grid from a JSON file shaped like the server's navmesh.json.
    pub fn from_file(path: &Path) -> Result<Self, GridError> {
        let bytes = std::fs::read(path)?;
        let raw: Vec<Vec<i64>> = serde_json::from_slice(&bytes)?;
        Self::load(&raw)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether the point lies inside the grid on a walkable cell.
    ///
    /// Out-of-range coordinates are simply not walkable; this never panics.
    /// Indexing truncates toward zero, mirroring the server's cell lookup.
    pub fn is_walkable(&self, x: f64, y: f64) -> bool {
        if !x.is_finite() || !y.is_finite() {
            return false;
        }
        if x < 0.0 || y < 0.0 || x >= self.cols as f64 || y >= self.rows as f64 {
            return false;
        }
        let col = x.trunc() as usize;
        let row = y.trunc() as usize;
        self.cells[row * self.cols + col]
    }
}
