/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! [Standard Algebraic Notation](https://en.wikipedia.org/wiki/Algebraic_notation_(chess)).

use crate::{DetailedMove, Move, MoveType, PieceKind, Position, Square};

/// Squares of other pieces, identical to the one moving, that could also legally reach `mv`'s destination.
///
/// Must be called on the position *before* `mv` is applied. Pawns and Kings never need disambiguation.
///
/// Alternatives are tested with full legality rather than movement rules alone,
/// so a pinned twin never forces a file or rank into the SAN.
pub fn ambiguities(position: &Position, mv: &Move) -> Vec<Square> {
    let Some(piece) = position.board().get(mv.from()) else {
        return Vec::new();
    };
    if matches!(piece.kind(), PieceKind::Pawn | PieceKind::King) {
        return Vec::new();
    }

    position
        .board()
        .pieces(piece.color())
        .filter(|&(square, other)| square != mv.from() && other == piece)
        .map(|(square, _)| square)
        .filter(|&square| {
            let alternative = Move::new(square, mv.to(), mv.player());
            position.is_valid_move(&alternative, true, false)
        })
        .collect()
}

/// The SAN of an applied move, without any check or mate suffix.
///
/// # Example
/// ```
/// # use arbiter::*;
/// let mut pos = Position::default();
/// let applied = pos.apply_unchecked(&Move::new(Square::G1, Square::F3, Color::White));
/// assert_eq!(san::body(&applied, &[]), "Nf3");
/// ```
pub fn body(applied: &DetailedMove, ambiguities: &[Square]) -> String {
    if let Some(side) = applied.castle() {
        return side.san().to_string();
    }

    let (from, to) = (applied.mv().from(), applied.mv().to());
    let captures = applied.captured().is_some();
    let mut san = String::with_capacity(8);

    if applied.piece().is_pawn() {
        if captures {
            san.push(from.file().char());
        }
    } else {
        san.push(applied.piece().kind().san_char());

        if !ambiguities.is_empty() {
            let shares_rank = ambiguities.iter().any(|other| other.rank() == from.rank());
            let shares_file = ambiguities.iter().any(|other| other.file() == from.file());

            if shares_rank || !shares_file {
                san.push(from.file().char());
            }
            if shares_file {
                san.push(from.rank().char());
            }
        }
    }

    if captures {
        san.push('x');
    }
    san.push_str(&to.to_uci());

    let promotes = applied.move_type().contains(MoveType::PROMOTION);
    if let Some(kind) = applied.mv().promotion().filter(|_| promotes) {
        san.push('=');
        san.push(kind.san_char());
    }

    san
}

/// The full SAN of an applied move, given the position *after* it was applied.
///
/// Appends `#` if the opponent is now checkmated, or `+` if they are in check. Castles are never decorated.
pub fn render(applied: &DetailedMove, ambiguities: &[Square], after: &Position) -> String {
    let mut san = body(applied, ambiguities);
    if applied.castle().is_some() {
        return san;
    }

    let opponent = applied.mv().player().opponent();
    if after.is_checkmated(opponent) {
        san.push('#');
    } else if after.is_in_check(opponent) {
        san.push('+');
    }

    san
}
