/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use anyhow::{Context, Result};
use clap::{builder::PossibleValue, Parser, Subcommand, ValueEnum};

use crate::{perft, san, splitperft, FenConfig, Game, GameVariant, Square, FEN_STARTPOS};

/// Checks, plays, and describes chess positions.
#[derive(Debug, Clone, Parser)]
#[command(version, about, rename_all = "lower")]
pub struct Cli {
    /// The position to start from.
    #[arg(short, long, default_value = FEN_STARTPOS)]
    pub fen: String,

    /// The variant of chess, which decides how castling rights are written.
    #[arg(short, long, value_enum, default_value = "standard")]
    pub variant: GameVariant,

    /// If set, the FEN is read and written without its two move clocks.
    #[arg(short, long, default_value = "false")]
    pub epd: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Something to do with the starting position.
#[derive(Debug, Clone, Subcommand)]
#[command(rename_all = "lower")]
pub enum Command {
    /// Print the FEN of the position, normalized.
    Fen,

    /// Play the provided moves, in UCI or SAN, printing the movetext, final FEN, and result.
    Play { moves: Vec<String> },

    /// Shows all legal moves in the position, or for the piece on a specific square.
    Moves {
        square: Option<Square>,

        /// If set, moves will be sorted in alphabetical order.
        #[arg(short, long, default_value = "false")]
        sort: bool,
    },

    /// Performs a perft on the position at the supplied depth, printing total node count.
    Perft {
        depth: usize,

        /// If set, the node count below every legal move is printed as well.
        #[arg(short, long, default_value = "false")]
        split: bool,
    },
}

impl Cli {
    /// The FEN settings selected on the command line.
    pub fn config(&self) -> Result<FenConfig> {
        let field_count = if self.epd {
            FenConfig::EPD
        } else {
            FenConfig::FULL
        };

        FenConfig::new(field_count, self.variant)
    }

    /// Runs the selected command, printing its output to stdout.
    pub fn execute(self) -> Result<()> {
        let mut game = Game::from_fen_with(&self.fen, self.config()?)
            .with_context(|| format!("Could not start from {:?}", self.fen))?;

        match self.command {
            Command::Fen => println!("{}", game.fen()),

            Command::Play { moves } => {
                for mv in &moves {
                    game.make_move_str(mv)
                        .with_context(|| format!("Could not play {mv:?} in {}", game.fen()))?;
                }

                println!("{}", game.movetext());
                println!("{}", game.fen());
                println!("{}", game.result());
            }

            Command::Moves { square, sort } => {
                let position = *game.position();
                let moves = match square {
                    Some(square) => position.legal_moves_from(square),
                    None => position.legal_moves(),
                };

                let mut names = moves
                    .iter()
                    .map(|mv| {
                        let ambiguous = san::ambiguities(&position, mv);
                        let mut after = position;
                        let applied = after.apply_unchecked(mv);
                        san::render(&applied, &ambiguous, &after)
                    })
                    .collect::<Vec<_>>();

                if sort {
                    names.sort();
                }

                println!("{}", names.join(" "));
            }

            Command::Perft { depth, split } => {
                if split {
                    let (nodes, moves) = splitperft(&game, depth);
                    for (mv, count) in moves {
                        println!("{mv}: {count}");
                    }
                    println!("\n{nodes}");
                } else {
                    println!("{}", perft(&game, depth));
                }
            }
        }

        Ok(())
    }
}

impl ValueEnum for GameVariant {
    fn value_variants<'a>() -> &'a [Self] {
        &[GameVariant::Standard, GameVariant::Chess960]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            GameVariant::Standard => PossibleValue::new("standard"),
            GameVariant::Chess960 => PossibleValue::new("chess960").aliases(["960", "frc"]),
        })
    }
}
