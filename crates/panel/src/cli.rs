//! Command-line definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tombola_core::GameMode;

/// Mode names accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// One name
    Individual,
    /// One name and one question
    Paired,
    /// A small group of names
    Group,
}

impl From<ModeArg> for GameMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Individual => GameMode::Individual,
            ModeArg::Paired => GameMode::PairedQuestion,
            ModeArg::Group => GameMode::Group,
        }
    }
}

/// CLI arguments for the tombola device.
#[derive(Parser, Debug)]
#[command(name = "tombola")]
#[command(author, version, about = "Classroom name draw with receipt printer")]
#[command(long_about = r#"
Draws names (and optionally questions) without replacement from a roster
kept on the device.

Without a subcommand the front panel starts: space/d draws, r resets the
roster, m cycles the game mode, R resets roster and questions, q quits.

Example:
  tombola load-roster alumnos.txt --questions preguntas.txt
  tombola draw --mode group
  tombola status --json
"#)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Operation to run instead of the front panel
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Operator commands, all routed through the trigger arbiter.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replace the roster with the names in FILE (one per line)
    LoadRoster {
        /// Text file with one name per line
        file: PathBuf,
        /// Also replace the question pool from this file
        #[arg(long, value_name = "FILE")]
        questions: Option<PathBuf>,
    },
    /// Replace the question pool with the questions in FILE
    LoadQuestions {
        /// Text file with one question per line
        file: PathBuf,
    },
    /// Add one name to the roster
    Register {
        /// Name to add
        name: String,
    },
    /// Draw once and print the receipt
    Draw {
        /// Game mode for this draw
        #[arg(short, long, value_enum, default_value = "individual")]
        mode: ModeArg,
    },
    /// Restore the roster from its master copy
    Reset {
        /// Restore the question pool as well
        #[arg(long)]
        all: bool,
    },
    /// Show the mode and pool counts
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}
