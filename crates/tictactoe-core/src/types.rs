use crate::{
    Result,
    constants::{BOARD_CELLS, BOARD_SIZE, EMPTY_CELL},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Board position of a move, as sent by the server.
///
/// Values are kept as the server sent them; range checks against the board
/// belong to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    pub row: i32,
    pub col: i32,
}

impl Coordinates {
    pub fn new(row: i32, col: i32) -> Self {
        Coordinates { row, col }
    }

    /// Whether the position lies on the 11x11 board.
    #[must_use]
    pub fn is_on_board(&self) -> bool {
        let size = BOARD_SIZE as i32;
        (0..size).contains(&self.row) && (0..size).contains(&self.col)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Running match score from the local player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub yours: i32,
    pub opponent: i32,
}

impl Score {
    pub fn new(yours: i32, opponent: i32) -> Self {
        Score { yours, opponent }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.yours, self.opponent)
    }
}

/// Full board state sent by the server when a session resumes.
///
/// `0` marks an empty cell, any other value is a player marker. The local
/// player's own marker is carried alongside so the view can tell the two
/// players apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    cells: [[i32; BOARD_SIZE]; BOARD_SIZE],
    my_marker: i32,
}

impl BoardSnapshot {
    /// Build a snapshot from exactly 121 values in row-major order.
    ///
    /// # Errors
    /// Returns `Error::InvalidBoard` when the slice length is not 121.
    pub fn from_row_major(values: &[i32], my_marker: i32) -> Result<Self> {
        if values.len() != BOARD_CELLS {
            return Err(Error::InvalidBoard {
                expected: BOARD_CELLS,
                actual: values.len(),
            });
        }

        let mut cells = [[EMPTY_CELL; BOARD_SIZE]; BOARD_SIZE];
        for (index, value) in values.iter().enumerate() {
            cells[index / BOARD_SIZE][index % BOARD_SIZE] = *value;
        }

        Ok(BoardSnapshot { cells, my_marker })
    }

    /// Cell value at `(row, col)`, `None` when off the board.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<i32> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    /// The marker value identifying the local player's pieces.
    #[must_use]
    pub fn my_marker(&self) -> i32 {
        self.my_marker
    }

    /// Occupied cells with their position and whether they are ours.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (Coordinates, bool)> + '_ {
        self.cells.iter().enumerate().flat_map(move |(row, cols)| {
            cols.iter()
                .enumerate()
                .filter(|(_, value)| **value != EMPTY_CELL)
                .map(move |(col, value)| {
                    (
                        Coordinates::new(row as i32, col as i32),
                        *value == self.my_marker,
                    )
                })
        })
    }
}
