use log::{debug, trace, warn};
use rand::Rng;
use thiserror::Error;

/// Errors raised while building or playing a minefield
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The field needs at least one row and one column, and a cell count that can be allocated
    #[error("invalid dimensions {rows}x{cols}: rows and cols must be positive and the field must fit in memory")]
    InvalidDimension { rows: usize, cols: usize },

    /// More mines were requested than there are cells
    #[error("too many mines: {mines} requested for {cells} cells")]
    TooManyMines { mines: usize, cells: usize },

    /// Coordinates fall outside the grid
    #[error("cell ({row}, {col}) is outside the {rows}x{cols} field")]
    OutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
}

/// Overall state of a game played on a field
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum GameState {
    Playing,
    Won,
    Lost,
}

/// One position in the minefield
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct Cell {
    mine: bool,
    flagged: bool,
    revealed: bool,
    adjacent_mines: u8,
}

impl Cell {
    /// Whether a mine is buried here
    pub fn has_mine(&self) -> bool {
        self.mine
    }

    /// Whether the player put a flag here
    pub fn is_flagged(&self) -> bool {
        self.flagged
    }

    /// Whether the cell has been dug open
    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Mines in the 3x3 window centred on this cell, the cell itself included
    pub fn adjacent_mines(&self) -> u8 {
        self.adjacent_mines
    }
}

/// The minefield grid and its bookkeeping
#[derive(Clone, Debug)]
pub struct Field {
    /// Cells in row-major order
    cells: Vec<Cell>,

    /// Number of rows in the grid
    rows: usize,

    /// Number of columns in the grid
    cols: usize,

    /// Number of mines in the grid
    mines: usize,

    /// Cells not revealed yet
    hidden: usize,

    /// Cells currently carrying a flag
    flagged: usize,

    /// Set once a mine is played or the field is cleared
    game_over: bool,

    /// Set once a mine is played
    exploded: bool,
}

impl Field {
    /// Build a field with `mines` mines placed at random
    pub fn new(rows: usize, cols: usize, mines: usize) -> Result<Self, FieldError> {
        Self::with_rng(rows, cols, mines, &mut rand::thread_rng())
    }

    /// Build a field with `mines` mines placed using the given random generator
    pub fn with_rng<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        mines: usize,
        rng: &mut R,
    ) -> Result<Self, FieldError> {
        let mut field = Self::empty(rows, cols)?;

        let cell_count = field.cells.len();
        if mines > cell_count {
            return Err(FieldError::TooManyMines {
                mines,
                cells: cell_count,
            });
        }

        // Draw from the pool of free indices so every draw lands on an empty cell,
        // even when the field is nearly full of mines.
        let mut spots_remaining: Vec<usize> = Vec::new();
        spots_remaining
            .try_reserve_exact(cell_count)
            .map_err(|_| FieldError::InvalidDimension { rows, cols })?;
        spots_remaining.extend(0..cell_count);
        for _ in 0..mines {
            let index_rm = rng.gen_range(0..spots_remaining.len());
            let index = spots_remaining.swap_remove(index_rm);
            field.place_mine(index / cols, index % cols);
        }

        debug!("created {}x{} field with {} mines", rows, cols, field.mines);

        Ok(field)
    }

    /// A field without any mine, all cells hidden.
    /// Dimensions whose cell count can't be represented or allocated are rejected.
    fn empty(rows: usize, cols: usize) -> Result<Self, FieldError> {
        let invalid = FieldError::InvalidDimension { rows, cols };

        if rows < 1 || cols < 1 {
            return Err(invalid);
        }
        let cell_count = rows.checked_mul(cols).ok_or_else(|| invalid.clone())?;

        let mut cells = Vec::new();
        cells.try_reserve_exact(cell_count).map_err(|_| invalid)?;
        cells.resize(cell_count, Cell::default());

        Ok(Field {
            cells,
            rows,
            cols,
            mines: 0,
            hidden: cell_count,
            flagged: 0,
            game_over: false,
            exploded: false,
        })
    }

    /// Put a flag on a hidden cell, or take it off if it already has one.
    /// Revealed cells are left alone.
    pub fn flag_cell(&mut self, row: usize, col: usize) -> Result<(), FieldError> {
        let index = self.index(row, col)?;

        if self.game_over {
            warn!("ignoring flag on ({}, {}): game is over", row, col);
            return Ok(());
        }

        let cell = &mut self.cells[index];
        if !cell.revealed {
            cell.flagged = !cell.flagged;
            if cell.flagged {
                self.flagged += 1;
            } else {
                self.flagged -= 1;
            }
        }

        Ok(())
    }

    /// Dig the cell at the given coordinates.
    ///
    /// Playing a mine ends the game. Playing a safe cell reveals it, and if no mine touches it,
    /// keeps revealing the surrounding cells until the open area is bordered by numbers.
    /// Flagged and already revealed cells are not played.
    pub fn play_cell(&mut self, row: usize, col: usize) -> Result<(), FieldError> {
        let index = self.index(row, col)?;

        if self.game_over {
            warn!("ignoring dig on ({}, {}): game is over", row, col);
            return Ok(());
        }

        let cell = self.cells[index];
        if cell.revealed || cell.flagged {
            return Ok(());
        }

        if cell.mine {
            debug!("mine hit at ({}, {})", row, col);
            self.exploded = true;
            self.game_over = true;
            return Ok(());
        }

        // Flood reveal, starting from the played cell
        let mut spots_to_visit = vec![(row, col)];

        while let Some((r, c)) = spots_to_visit.pop() {
            let cell = &mut self.cells[r * self.cols + c];

            // Skip cells already opened or protected by a flag.
            // A zero cell never borders a mine, so the cascade only meets safe cells
            if cell.revealed || cell.flagged || cell.mine {
                continue;
            }

            // Reveal the cell
            cell.revealed = true;
            self.hidden -= 1;
            trace!("revealed ({}, {}) = {}", r, c, cell.adjacent_mines);

            // No mine around: visit the whole window, the cell itself included
            if cell.adjacent_mines == 0 {
                spots_to_visit.extend(self.window(r, c));
            }
        }

        // Only mines left hidden means the field is cleared
        self.game_over = self.won();

        Ok(())
    }

    /// True when the only hidden cells left are the mines
    pub fn won(&self) -> bool {
        self.mines == self.hidden
    }

    /// True once a mine was played or the field was cleared
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Whether the game is still on, won or lost.
    /// Playing a mine always gives `Lost`, even on a field made only of mines where `won()` holds.
    pub fn state(&self) -> GameState {
        if self.exploded {
            GameState::Lost
        } else if self.game_over {
            GameState::Won
        } else {
            GameState::Playing
        }
    }

    /// The number of rows in the field
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// The number of columns in the field
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The number of mines in the field
    pub fn mines(&self) -> usize {
        self.mines
    }

    /// The number of cells not revealed yet, mines included
    pub fn hidden_count(&self) -> usize {
        self.hidden
    }

    /// The number of cells carrying a flag
    pub fn flagged_count(&self) -> usize {
        self.flagged
    }

    /// Get a reference to the cell at the given coordinates
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.index(row, col).ok().map(|index| &self.cells[index])
    }

    /// Iterator over all cells with their `(row, col)` coordinates, in row-major order
    pub fn cells(&self) -> impl Iterator<Item = ((usize, usize), &Cell)> {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| ((index / cols, index % cols), cell))
    }

    fn index(&self, row: usize, col: usize) -> Result<usize, FieldError> {
        if row < self.rows && col < self.cols {
            Ok(row * self.cols + col)
        } else {
            Err(FieldError::OutOfRange {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }

    /// Place a mine at the given coordinates and bump the count of every cell in its window
    fn place_mine(&mut self, row: usize, col: usize) {
        let index = row * self.cols + col;
        if self.cells[index].mine {
            return;
        }

        self.cells[index].mine = true;
        self.mines += 1;

        for (r, c) in self.window(row, col) {
            self.cells[r * self.cols + c].adjacent_mines += 1;
        }
    }

    /// Coordinates of the 3x3 window around `(row, col)` clipped to the grid, centre included
    fn window(&self, row: usize, col: usize) -> impl Iterator<Item = (usize, usize)> {
        let min_row = row.saturating_sub(1);
        let max_row = (row + 1).min(self.rows - 1);

        let min_col = col.saturating_sub(1);
        let max_col = (col + 1).min(self.cols - 1);

        (min_row..=max_row).flat_map(move |r| (min_col..=max_col).map(move |c| (r, c)))
    }
}
