/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! How each kind of piece moves.
//!
//! Everything here ignores whether a move leaves the mover's King in check.
//! That is layered on by the legality checks in [`Position::is_valid_move`].

use arrayvec::ArrayVec;

use crate::{CastleSide, Color, Move, MoveList, Piece, PieceKind, Position, Rank, Square};

/// Offsets of the eight squares a Knight jumps to.
const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

/// Offsets of the eight squares around a King. The first four are also the orthogonal ray directions.
const KING_STEPS: [(i8, i8); 8] = [
    (0, 1),
    (1, 0),
    (0, -1),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, -1),
    (-1, 1),
];

/// Most candidate moves a single piece can produce (a Queen in the center of an empty board has 27).
const MAX_CANDIDATES: usize = 32;

/// Returns `true` if `mv` follows the movement rules of `piece` in `position`.
///
/// Occupancy of the destination by a friendly piece is checked by the caller,
/// since only the King may move onto one of its own pieces (its castling Rook).
pub fn is_valid_move(piece: Piece, mv: &Move, position: &Position) -> bool {
    let (from, to) = (mv.from(), mv.to());

    if piece.kind() != PieceKind::Pawn && mv.promotion().is_some() {
        return false;
    }

    match piece.kind() {
        PieceKind::Pawn => is_valid_pawn_move(piece.color(), mv, position),
        PieceKind::Knight => {
            matches!((from.distance_files(to), from.distance_ranks(to)), (1, 2) | (2, 1))
        }
        PieceKind::Bishop => from.is_diagonal_to(to) && is_path_clear(from, to, position),
        PieceKind::Rook => from.is_orthogonal_to(to) && is_path_clear(from, to, position),
        PieceKind::Queen => {
            (from.is_diagonal_to(to) || from.is_orthogonal_to(to)) && is_path_clear(from, to, position)
        }
        PieceKind::King => is_valid_king_move(piece.color(), mv, position),
    }
}

/// Every square strictly between `from` and `to` is empty.
#[inline(always)]
fn is_path_clear(from: Square, to: Square, position: &Position) -> bool {
    from.between(to).all(|square| position.board().get(square).is_none())
}

fn is_valid_pawn_move(color: Color, mv: &Move, position: &Position) -> bool {
    let (from, to) = (mv.from(), mv.to());
    let board = position.board();

    let promotes = to.rank() == Rank::eighth(color);
    let promotion_ok = match mv.promotion() {
        Some(kind) => promotes && kind.is_promotable(),
        None => !promotes,
    };
    if !promotion_ok {
        return false;
    }

    let advance = from.rank_delta(to) * color.forward();
    match (from.distance_files(to), advance) {
        (0, 1) => board.get(to).is_none(),
        (0, 2) => {
            from.rank() == Rank::second(color)
                && board.get(to).is_none()
                && from
                    .forward_by(color, 1)
                    .is_some_and(|skipped| board.get(skipped).is_none())
        }
        (1, 1) => match board.get(to) {
            Some(target) => target.color() != color,
            None => {
                position.ep_square() == Some(to)
                    && from.rank() == Rank::fifth(color)
                    && board.get(Square::new(to.file(), from.rank()))
                        == Some(Piece::new(color.opponent(), PieceKind::Pawn))
            }
        },
        _ => false,
    }
}

fn is_valid_king_move(color: Color, mv: &Move, position: &Position) -> bool {
    match position.castle_side(mv) {
        Some(side) => can_castle_ignoring_checks(color, side, mv.from(), position),
        None => {
            mv.from().distance_chebyshev(mv.to()) == 1
                && position
                    .board()
                    .get(mv.to())
                    .map_or(true, |target| target.color() != color)
        }
    }
}

/// Checks everything about a castle except whether the King passes through check.
///
/// The right must still be held, the castling Rook must be on its starting square, and every square the King
/// or Rook crosses or lands on must be empty apart from the King and Rook themselves.
pub(crate) fn can_castle_ignoring_checks(
    color: Color,
    side: CastleSide,
    king_from: Square,
    position: &Position,
) -> bool {
    if !position.castling_rights().has(color, side) {
        return false;
    }

    let rook_from = position.castling_rook_square(color, side);
    if position.board().get(rook_from) != Some(Piece::new(color, PieceKind::Rook)) {
        return false;
    }

    let king_path = span(king_from, side.king_destination(color));
    let rook_path = span(rook_from, side.rook_destination(color));

    king_path
        .chain(rook_path)
        .all(|square| square == king_from || square == rook_from || position.board().get(square).is_none())
}

/// Both endpoints and every square between them.
#[inline(always)]
pub(crate) fn span(a: Square, b: Square) -> impl Iterator<Item = Square> {
    [a, b].into_iter().chain(a.between(b))
}

/// Generates the candidate moves of the `piece` on `from`, keeping only those `is_legal` accepts.
///
/// If `return_if_any` is set, generation stops after the first accepted move.
/// Pawn moves onto the last rank are expanded into one move per promotion.
pub fn get_valid_moves(
    piece: Piece,
    from: Square,
    position: &Position,
    return_if_any: bool,
    mut is_legal: impl FnMut(&Move) -> bool,
) -> MoveList {
    let mut candidates = ArrayVec::<Move, MAX_CANDIDATES>::new();
    let color = piece.color();

    match piece.kind() {
        PieceKind::Pawn => {
            let targets = [
                from.forward_by(color, 1),
                from.forward_by(color, 2).filter(|_| from.rank() == Rank::second(color)),
                from.offset(-1, color.forward()),
                from.offset(1, color.forward()),
            ];

            for to in targets.into_iter().flatten() {
                if to.rank() == Rank::eighth(color) {
                    for kind in PieceKind::PROMOTIONS {
                        candidates.push(Move::with_promotion(from, to, color, kind));
                    }
                } else {
                    candidates.push(Move::new(from, to, color));
                }
            }
        }
        PieceKind::Knight => {
            for (df, dr) in KNIGHT_JUMPS {
                if let Some(to) = from.offset(df, dr) {
                    candidates.push(Move::new(from, to, color));
                }
            }
        }
        PieceKind::Bishop => push_rays(&mut candidates, from, color, &KING_STEPS[4..], position),
        PieceKind::Rook => push_rays(&mut candidates, from, color, &KING_STEPS[..4], position),
        PieceKind::Queen => push_rays(&mut candidates, from, color, &KING_STEPS, position),
        PieceKind::King => {
            for (df, dr) in KING_STEPS {
                // Moving onto a friendly piece is only ever a castle, which is generated below
                if let Some(to) = from.offset(df, dr) {
                    if position.board().get(to).map_or(true, |target| target.color() != color) {
                        candidates.push(Move::new(from, to, color));
                    }
                }
            }

            for side in CastleSide::all() {
                if position.castling_rights().has(color, side) && from.rank() == Rank::first(color) {
                    candidates.push(castling_move(from, color, side, position));
                }
            }
        }
    }

    let mut moves = MoveList::new();
    for mv in candidates {
        if is_legal(&mv) {
            moves.push(mv);
            if return_if_any {
                break;
            }
        }
    }
    moves
}

/// The castle for `color` on `side`, written as a two-file King move where that is unambiguous,
/// and as King-takes-Rook otherwise.
fn castling_move(king_from: Square, color: Color, side: CastleSide, position: &Position) -> Move {
    let king_to = side.king_destination(color);
    if king_from.distance_files(king_to) == 2 {
        Move::new(king_from, king_to, color)
    } else {
        Move::new(king_from, position.castling_rook_square(color, side), color)
    }
}

/// Walks each direction from `from` until the edge of the board or the first occupied square, inclusive.
fn push_rays(
    candidates: &mut ArrayVec<Move, MAX_CANDIDATES>,
    from: Square,
    color: Color,
    directions: &[(i8, i8)],
    position: &Position,
) {
    for &(df, dr) in directions {
        let mut current = from;
        while let Some(to) = current.offset(df, dr) {
            candidates.push(Move::new(from, to, color));
            if position.board().get(to).is_some() {
                break;
            }
            current = to;
        }
    }
}
