use std::io;
use std::process::ExitCode;

use clap::Parser;
use log::error;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use minefield::{Field, FieldError};
use minesweep::Minesweep;
use settings::{Args, Settings, SettingsError};

mod minefield;
mod minesweep;
mod settings;

/// Reasons a game can't be set up
#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("cannot create field from {settings:?}: {source}")]
    Field {
        settings: Settings,
        source: FieldError,
    },
}

/// Resolve the settings and lay out the mines for a new game
fn new_game(args: &Args) -> Result<Minesweep, StartupError> {
    let settings = Settings::from_args(args)?;

    let field = match args.seed {
        Some(seed) => Field::with_rng(
            settings.rows,
            settings.cols,
            settings.mines,
            &mut StdRng::seed_from_u64(seed),
        ),
        None => Field::new(settings.rows, settings.cols, settings.mines),
    }
    .map_err(|source| StartupError::Field { settings, source })?;

    Ok(Minesweep::new(field))
}

pub fn main() -> ExitCode {
    env_logger::builder().format_timestamp(None).init();

    let args = Args::parse();

    // Errors go through the logger only; env_logger shows the error level by default
    let mut game = match new_game(&args) {
        Ok(game) => game,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    match game.run(io::stdin().lock(), io::stdout().lock()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("terminal i/o failed: {}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_games_match() {
        let args = Args::try_parse_from(["minesweep", "--rows", "6", "--cols", "7", "--mines", "9", "--seed", "11"]).unwrap();

        let a = new_game(&args).unwrap();
        let b = new_game(&args).unwrap();

        assert_eq!(a.field().rows(), 6);
        assert_eq!(a.field().cols(), 7);
        assert_eq!(a.field().mines(), 9);
        assert!(a.field().cells().zip(b.field().cells()).all(|((_, x), (_, y))| x == y));
    }

    #[test]
    fn startup_errors_carry_one_message() {
        let args = Args::try_parse_from(["minesweep", "--rows", "4294967296", "--cols", "4294967297"]).unwrap();
        let err = new_game(&args).unwrap_err();
        assert!(matches!(
            err,
            StartupError::Field { source: FieldError::InvalidDimension { .. }, .. }
        ));
        assert!(err.to_string().starts_with("cannot create field from Settings { rows: 4294967296"));

        let args = Args::try_parse_from(["minesweep", "--mines", "26"]).unwrap();
        let err = new_game(&args).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot create field from Settings { rows: 5, cols: 5, mines: 26 }: \
             too many mines: 26 requested for 25 cells"
        );

        let args = Args::try_parse_from(["minesweep", "--config", "/nonexistent/minesweep.json"]).unwrap();
        assert!(matches!(new_game(&args), Err(StartupError::Settings(SettingsError::Io { .. }))));
    }
}
