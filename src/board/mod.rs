/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Decoding of opening book moves.
mod book;

/// Parsing and generation of FEN strings, plus the variant configuration for them.
mod fen;

/// A game of chess: history, undo/redo, and results.
mod game;

/// Check detection and full move legality.
mod legality;

/// Moves, move types, and the record of an applied move.
mod moves;

/// Move generation testing.
mod perft;

/// Colors, piece kinds, and pieces.
mod piece;

/// The board grid and the full position around it.
mod position;

/// Movement geometry of each piece kind, ignoring checks.
pub mod rules;

/// Standard Algebraic Notation.
pub mod san;

/// Squares, files, and ranks.
mod square;

/// Position hashing.
mod zobrist;

pub use book::*;
pub use fen::*;
pub use game::*;
pub use moves::*;
pub use perft::*;
pub use piece::*;
pub use position::*;
pub use square::*;
pub use zobrist::*;
