use std::io::{self, BufRead, Write};
use std::num::IntErrorKind;

use log::{debug, info};
use thiserror::Error;

use crate::minefield::{Cell, Field, GameState};

/// What a dug cell should do: reveal it, or toggle its flag
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Mode {
    Dig,
    Flag,
}

impl Mode {
    fn label(self) -> &'static str {
        match self {
            Mode::Dig => "dig",
            Mode::Flag => "flag",
        }
    }
}

/// A line of player input
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Command {
    Quit,
    Mode(Mode),
    Cell(i64, i64),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("invalid input: 2 numbers expected")]
    Parse,

    #[error("invalid input: [0 <= row < {rows}] [0 <= column < {cols}]")]
    OutOfRange { rows: usize, cols: usize },
}

/// How a session ended
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Outcome {
    Won,
    Lost,
    Quit,
}

/// A game of minesweeper played over text input and output
#[derive(Debug)]
pub struct Minesweep {
    field: Field,
    mode: Mode,
}

impl Minesweep {
    const MINE_CHAR: char = '*';
    const FLAG_CHAR: char = '!';
    const HIDDEN_CHAR: char = '.';
    const EMPTY_CHAR: char = ' ';
    const HELP: &'static str = "[c: dig, d: flag, q: quit]";

    pub fn new(field: Field) -> Self {
        Self {
            field,
            mode: Mode::Dig,
        }
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Run the prompt loop until the game is over, the player quits, or input runs out
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<Outcome> {
        info!(
            "starting {}x{} game with {} mines",
            self.field.rows(),
            self.field.cols(),
            self.field.mines()
        );

        let mut lines = input.lines();

        while !self.field.is_game_over() {
            writeln!(output, "{}", render(&self.field))?;
            writeln!(
                output,
                "flags: {}/{}  hidden: {}",
                self.field.flagged_count(),
                self.field.mines(),
                self.field.hidden_count()
            )?;
            write!(output, "{}\n{} > ", Self::HELP, self.mode.label())?;
            output.flush()?;

            let line = match lines.next() {
                Some(line) => line?,
                None => {
                    writeln!(output)?;
                    return Ok(Outcome::Quit);
                }
            };

            match parse_input(&line) {
                Ok(Command::Quit) => return Ok(Outcome::Quit),
                Ok(command) => {
                    if let Err(err) = self.apply(command) {
                        writeln!(output, "{}", err)?;
                    }
                }
                Err(err) => writeln!(output, "{}", err)?,
            }
        }

        writeln!(output, "{}", render(&self.field))?;

        let outcome = match self.field.state() {
            GameState::Won => {
                writeln!(output, "You win!")?;
                Outcome::Won
            }
            _ => {
                writeln!(output, "BOOM! You lose.")?;
                Outcome::Lost
            }
        };
        info!("game over: {:?}", outcome);

        Ok(outcome)
    }

    /// Apply a mode switch or a move on the field
    pub fn apply(&mut self, command: Command) -> Result<(), InputError> {
        match command {
            // the prompt loop stops before applying a quit
            Command::Quit => {}
            Command::Mode(mode) => {
                debug!("switching to {:?} mode", mode);
                self.mode = mode;
            }
            Command::Cell(row, col) => {
                let (row, col) = match (usize::try_from(row), usize::try_from(col)) {
                    (Ok(row), Ok(col)) => (row, col),
                    _ => return Err(self.out_of_range()),
                };

                let result = match self.mode {
                    Mode::Dig => self.field.play_cell(row, col),
                    Mode::Flag => self.field.flag_cell(row, col),
                };

                // moves only fail on coordinates outside the grid
                result.map_err(|_| self.out_of_range())?;
            }
        }

        Ok(())
    }

    fn out_of_range(&self) -> InputError {
        InputError::OutOfRange {
            rows: self.field.rows(),
            cols: self.field.cols(),
        }
    }
}

/// Parse one line of player input
pub fn parse_input(line: &str) -> Result<Command, InputError> {
    let line = line.trim().to_lowercase();

    match line.as_str() {
        "q" => return Ok(Command::Quit),
        "c" => return Ok(Command::Mode(Mode::Dig)),
        "d" => return Ok(Command::Mode(Mode::Flag)),
        _ => {}
    }

    let numbers = line
        .split_whitespace()
        .map(parse_coordinate)
        .collect::<Result<Vec<_>, _>>()?;

    match numbers[..] {
        [row, col] => Ok(Command::Cell(row, col)),
        _ => Err(InputError::Parse),
    }
}

/// Parse one coordinate. Integers too large for `i64` saturate, so they still land
/// outside the grid instead of being rejected as non-numbers.
fn parse_coordinate(word: &str) -> Result<i64, InputError> {
    match word.parse::<i64>() {
        Ok(n) => Ok(n),
        Err(err) => match err.kind() {
            IntErrorKind::PosOverflow => Ok(i64::MAX),
            IntErrorKind::NegOverflow => Ok(i64::MIN),
            _ => Err(InputError::Parse),
        },
    }
}

/// Draw the field as a bordered block of text, one character per cell
pub fn render(field: &Field) -> String {
    let border = format!("+{}+", "-".repeat(field.cols()));

    let mut grid = border.clone();
    for ((_, col), cell) in field.cells() {
        if col == 0 {
            grid.push_str("\n|");
        }
        grid.push(symbol(cell, field.is_game_over()));
        if col == field.cols() - 1 {
            grid.push('|');
        }
    }
    grid.push('\n');
    grid.push_str(&border);

    grid
}

fn symbol(cell: &Cell, game_over: bool) -> char {
    if game_over && cell.has_mine() {
        Minesweep::MINE_CHAR
    } else if cell.is_revealed() {
        match cell.adjacent_mines() {
            0 => Minesweep::EMPTY_CHAR,
            // the window holds at most nine cells
            n => char::from_digit(n as u32, 10).unwrap_or('#'),
        }
    } else if cell.is_flagged() {
        Minesweep::FLAG_CHAR
    } else {
        Minesweep::HIDDEN_CHAR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Find a seed whose 3x3 field has its only mine in the bottom-right corner
    fn corner_mine_field() -> Field {
        (0..)
            .map(|seed| Field::with_rng(3, 3, 1, &mut StdRng::seed_from_u64(seed)).unwrap())
            .find(|field| field.cell(2, 2).unwrap().has_mine())
            .unwrap()
    }

    fn play(session: &mut Minesweep, script: &str) -> (Outcome, String) {
        let mut output = Vec::new();
        let outcome = session.run(Cursor::new(script), &mut output).unwrap();
        (outcome, String::from_utf8(output).unwrap())
    }

    #[test]
    fn parse_commands() {
        assert_eq!(parse_input("q"), Ok(Command::Quit));
        assert_eq!(parse_input("  Q \n"), Ok(Command::Quit));
        assert_eq!(parse_input("c"), Ok(Command::Mode(Mode::Dig)));
        assert_eq!(parse_input("D"), Ok(Command::Mode(Mode::Flag)));
        assert_eq!(parse_input("1 2"), Ok(Command::Cell(1, 2)));
        assert_eq!(parse_input("  4   0 "), Ok(Command::Cell(4, 0)));
        assert_eq!(parse_input("-1 3"), Ok(Command::Cell(-1, 3)));
        assert_eq!(parse_input("99999999999999999999 0"), Ok(Command::Cell(i64::MAX, 0)));
        assert_eq!(parse_input("2 -99999999999999999999"), Ok(Command::Cell(2, i64::MIN)));
    }

    #[test]
    fn parse_errors() {
        for line in ["", "1", "1 2 3", "a b", "1,2", "quit", "1 x"] {
            assert_eq!(parse_input(line), Err(InputError::Parse), "{:?}", line);
        }
    }

    #[test]
    fn render_hidden_field() {
        let field = Field::with_rng(2, 4, 1, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(render(&field), "+----+\n|....|\n|....|\n+----+");
    }

    #[test]
    fn render_states() {
        let mut field = corner_mine_field();

        field.flag_cell(1, 2).unwrap();
        field.play_cell(0, 0).unwrap();
        assert_eq!(render(&field), "+---+\n|   |\n| 1!|\n| 1.|\n+---+");

        field.flag_cell(1, 2).unwrap();
        field.play_cell(2, 2).unwrap();
        assert_eq!(render(&field), "+---+\n|   |\n| 1.|\n| 1*|\n+---+");
    }

    #[test]
    fn apply_moves() {
        let mut session = Minesweep::new(corner_mine_field());

        session.apply(Command::Mode(Mode::Flag)).unwrap();
        assert_eq!(session.mode(), Mode::Flag);
        session.apply(Command::Cell(2, 2)).unwrap();
        assert!(session.field().cell(2, 2).unwrap().is_flagged());

        assert_eq!(
            session.apply(Command::Cell(3, 0)),
            Err(InputError::OutOfRange { rows: 3, cols: 3 })
        );
        assert_eq!(
            session.apply(Command::Cell(0, -1)),
            Err(InputError::OutOfRange { rows: 3, cols: 3 })
        );

        session.apply(Command::Mode(Mode::Dig)).unwrap();
        session.apply(Command::Cell(2, 2)).unwrap();
        assert!(!session.field().is_game_over());

        session.apply(Command::Cell(0, 0)).unwrap();
        assert_eq!(session.field().state(), GameState::Won);
    }

    #[test]
    fn session_won() {
        let mut session = Minesweep::new(corner_mine_field());

        let (outcome, output) = play(&mut session, "d\n2 2\nc\n0 0\n");

        assert_eq!(outcome, Outcome::Won);
        assert!(output.contains("flag > "));
        assert!(output.contains("flags: 1/1  hidden: 9\n"));
        assert!(output.ends_with("+---+\n|   |\n| 11|\n| 1*|\n+---+\nYou win!\n"));
    }

    #[test]
    fn session_lost() {
        let mut session = Minesweep::new(corner_mine_field());

        let (outcome, output) = play(&mut session, "1 1\n2 2\n0 0\n");

        assert_eq!(outcome, Outcome::Lost);
        assert!(output.ends_with("+---+\n|...|\n|.1.|\n|..*|\n+---+\nBOOM! You lose.\n"));
        // the move after the mine is never read
        assert_eq!(session.field().hidden_count(), 8);
    }

    #[test]
    fn session_reports_bad_input() {
        let mut session = Minesweep::new(corner_mine_field());

        let (outcome, output) = play(&mut session, "hello\n7 1\n99999999999999999999 0\nq\n0 0\n");

        assert_eq!(outcome, Outcome::Quit);
        assert!(output.contains("invalid input: 2 numbers expected\n"));
        assert_eq!(output.matches("invalid input: [0 <= row < 3] [0 <= column < 3]\n").count(), 2);
        assert_eq!(output.matches("dig > ").count(), 4);
        assert_eq!(session.field().hidden_count(), 9);
    }

    #[test]
    fn session_ends_with_input() {
        let mut session = Minesweep::new(corner_mine_field());

        let (outcome, _) = play(&mut session, "1 1\n");

        assert_eq!(outcome, Outcome::Quit);
        assert_eq!(session.field().state(), GameState::Playing);
    }
}
