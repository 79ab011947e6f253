//! Game modes and the in-memory mode selector.

use std::{fmt, str::FromStr};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Selection policy applied by the next draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// One name.
    #[default]
    Individual,
    /// One name and one question.
    PairedQuestion,
    /// Up to the configured group size of distinct names.
    Group,
}

impl GameMode {
    /// Modes in selector order.
    pub const CYCLE: [GameMode; 3] = [
        GameMode::Individual,
        GameMode::PairedQuestion,
        GameMode::Group,
    ];

    /// The mode the selector moves to from `self`.
    pub fn next(self) -> Self {
        match self {
            GameMode::Individual => GameMode::PairedQuestion,
            GameMode::PairedQuestion => GameMode::Group,
            GameMode::Group => GameMode::Individual,
        }
    }

    /// Label shown on the panel and on receipts.
    pub fn label(self) -> &'static str {
        match self {
            GameMode::Individual => "Individual",
            GameMode::PairedQuestion => "Name + question",
            GameMode::Group => "Group",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GameMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "individual" | "single" => Ok(GameMode::Individual),
            "paired" | "paired-question" | "paired_question" | "question" => {
                Ok(GameMode::PairedQuestion)
            }
            "group" => Ok(GameMode::Group),
            other => Err(anyhow!("unknown game mode '{other}'")),
        }
    }
}

/// Currently selected mode. Not persisted: every power-on starts at `Individual`.
#[derive(Debug, Clone, Default)]
pub struct ModeState {
    current: GameMode,
}

impl ModeState {
    /// Active mode.
    pub fn current(&self) -> GameMode {
        self.current
    }

    /// Move to the next mode, wrapping after `Group`, and return it.
    pub fn advance(&mut self) -> GameMode {
        self.current = self.current.next();
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_cycles_and_wraps() {
        let mut state = ModeState::default();
        assert_eq!(state.current(), GameMode::Individual);
        assert_eq!(state.advance(), GameMode::PairedQuestion);
        assert_eq!(state.advance(), GameMode::Group);
        assert_eq!(state.advance(), GameMode::Individual);
    }

    #[test]
    fn cycle_matches_next() {
        for (index, mode) in GameMode::CYCLE.iter().enumerate() {
            let expected = GameMode::CYCLE[(index + 1) % GameMode::CYCLE.len()];
            assert_eq!(mode.next(), expected);
        }
    }

    #[test]
    fn parses_cli_names() {
        assert_eq!("Group".parse::<GameMode>().unwrap(), GameMode::Group);
        assert_eq!(
            "paired".parse::<GameMode>().unwrap(),
            GameMode::PairedQuestion
        );
        assert!("teams".parse::<GameMode>().is_err());
    }
}
