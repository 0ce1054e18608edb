//! Scripted player actions accepted by the `play` subcommand.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use geotoken_core::{CellIndex, Direction};

/// One scripted player action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Single step with the movement buttons.
    Step(Direction),
    /// Multi-cell button move.
    Move {
        /// Rows to travel; positive is north.
        delta_row: i32,
        /// Columns to travel; positive is east.
        delta_col: i32,
    },
    /// Click on an absolute cell.
    Click(CellIndex),
    /// Click on a cell relative to the player.
    Tap {
        /// Row offset from the player.
        delta_row: i32,
        /// Column offset from the player.
        delta_col: i32,
    },
    /// Replay a recorded position trace.
    Trace(PathBuf),
}

impl Action {
    /// Parses `n|s|e|w`, `move:<dr>,<dc>`, `click:<row>,<col>`, `tap:<dr>,<dc>` or `trace:<file>`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        match text.to_ascii_lowercase().as_str() {
            "n" | "north" => return Ok(Self::Step(Direction::North)),
            "s" | "south" => return Ok(Self::Step(Direction::South)),
            "e" | "east" => return Ok(Self::Step(Direction::East)),
            "w" | "west" => return Ok(Self::Step(Direction::West)),
            _ => {}
        }

        let (verb, argument) = text
            .split_once(':')
            .with_context(|| format!("unknown action `{text}`"))?;
        match verb {
            "move" => {
                let (delta_row, delta_col) = pair(argument)?;
                Ok(Self::Move {
                    delta_row,
                    delta_col,
                })
            }
            "click" => {
                let cell = argument
                    .parse::<CellIndex>()
                    .with_context(|| format!("invalid cell in `{text}`"))?;
                Ok(Self::Click(cell))
            }
            "tap" => {
                let (delta_row, delta_col) = pair(argument)?;
                Ok(Self::Tap {
                    delta_row,
                    delta_col,
                })
            }
            "trace" if !argument.is_empty() => Ok(Self::Trace(PathBuf::from(argument))),
            _ => bail!("unknown action `{text}`"),
        }
    }
}

fn pair(argument: &str) -> Result<(i32, i32)> {
    let cell = argument
        .parse::<CellIndex>()
        .with_context(|| format!("invalid offset `{argument}`"))?;
    Ok((cell.row(), cell.col()))
}
