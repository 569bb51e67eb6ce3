/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::rules;
use crate::{Color, Move, MoveList, PieceKind, Position, Rank, Square};

impl Position {
    /// Returns `true` if `mv` may be played in this position.
    ///
    /// If `validate_check` is set, moves that leave the mover's King attacked are rejected,
    /// as are castles through or out of check.
    /// If `enforce_current_player` is set, only the side to move may move.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// let pos = Position::default();
    /// assert!(pos.is_valid_move(&Move::new(Square::E2, Square::E4, Color::White), true, true));
    /// assert!(!pos.is_valid_move(&Move::new(Square::E7, Square::E5, Color::Black), true, true));
    /// assert!(pos.is_valid_move(&Move::new(Square::E7, Square::E5, Color::Black), true, false));
    /// ```
    pub fn is_valid_move(&self, mv: &Move, validate_check: bool, enforce_current_player: bool) -> bool {
        let (from, to, player) = (mv.from(), mv.to(), mv.player());

        if from == to {
            return false;
        }

        let Some(piece) = self.board.get(from) else {
            return false;
        };
        if piece.color() != player || (enforce_current_player && player != self.side_to_move) {
            return false;
        }

        let castle = self.castle_side(mv);
        if let Some(target) = self.board.get(to) {
            if target.color() == player && castle.is_none() {
                return false;
            }
        }

        if !rules::is_valid_move(piece, mv, self) {
            return false;
        }

        if !validate_check {
            return true;
        }

        match castle {
            Some(side) => {
                // The King may stay on its square in Chess960, so the origin is checked on its own
                if self.is_in_check(player) {
                    return false;
                }

                let king_to = side.king_destination(player);
                let crossed = rules::span(from, king_to).filter(|&square| square != king_to);
                for square in crossed {
                    let mut probe = *self;
                    probe.board.set(from, None);
                    probe.board.place(square, piece);
                    if probe.is_in_check(player) {
                        return false;
                    }
                }
                !self.would_be_in_check_after(mv, player)
            }
            None => !self.would_be_in_check_after(mv, player),
        }
    }

    /// Returns `true` if the King of `color` is attacked by any enemy piece.
    ///
    /// A side without a King is never in check.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K2r w - - 0 1").unwrap();
    /// assert!(pos.is_in_check(Color::White));
    /// assert!(!pos.is_in_check(Color::Black));
    /// ```
    pub fn is_in_check(&self, color: Color) -> bool {
        let Some(king) = self.board.king(color) else {
            return false;
        };

        self.board.pieces(color.opponent()).any(|(square, attacker)| {
            let mv = if attacker.is_pawn() && king.rank() == Rank::eighth(attacker.color()) {
                Move::with_promotion(square, king, attacker.color(), PieceKind::Queen)
            } else {
                Move::new(square, king, attacker.color())
            };
            self.is_valid_move(&mv, false, false)
        })
    }

    /// Returns `true` if playing `mv` would leave the King of `color` in check.
    ///
    /// The move is simulated on a copy of this position; `self` is never changed.
    pub fn would_be_in_check_after(&self, mv: &Move, color: Color) -> bool {
        let mut probe = *self;
        probe.apply_unchecked(mv);
        probe.is_in_check(color)
    }

    /// Generates every legal move of `color`, ignoring whose turn it is.
    ///
    /// If `return_if_any` is set, generation stops at the first legal move found.
    pub fn moves_for(&self, color: Color, return_if_any: bool) -> MoveList {
        let mut moves = MoveList::new();
        for (square, piece) in self.board.pieces(color) {
            let found = rules::get_valid_moves(piece, square, self, return_if_any, |mv| {
                self.is_valid_move(mv, true, false)
            });
            moves.extend(found);
            if return_if_any && !moves.is_empty() {
                break;
            }
        }
        moves
    }

    /// Generates every legal move for the side to move.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// assert_eq!(Position::default().legal_moves().len(), 20);
    /// ```
    #[inline(always)]
    pub fn legal_moves(&self) -> MoveList {
        self.moves_for(self.side_to_move, false)
    }

    /// Generates every legal move of the piece on `square`, regardless of whose turn it is.
    pub fn legal_moves_from(&self, square: Square) -> MoveList {
        let Some(piece) = self.board.get(square) else {
            return MoveList::new();
        };
        rules::get_valid_moves(piece, square, self, false, |mv| self.is_valid_move(mv, true, false))
    }

    /// Returns `true` if `color` has at least one legal move.
    #[inline(always)]
    pub fn has_legal_moves(&self, color: Color) -> bool {
        !self.moves_for(color, true).is_empty()
    }

    /// Returns `true` if `color` is in check and has no legal moves.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// // Back rank mate
    /// let pos = Position::from_fen("3R2k1/5ppp/8/8/8/8/8/6K1 b - - 0 1").unwrap();
    /// assert!(pos.is_checkmated(Color::Black));
    /// assert!(!pos.is_checkmated(Color::White));
    /// ```
    pub fn is_checkmated(&self, color: Color) -> bool {
        self.is_in_check(color) && !self.has_legal_moves(color)
    }

    /// Returns `true` if it is `color`'s turn, `color` is not in check, and `color` has no legal moves.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// let pos = Position::from_fen("k7/8/1Q6/8/8/8/8/7K b - - 0 1").unwrap();
    /// assert!(pos.is_stalemated(Color::Black));
    /// assert!(!pos.is_stalemated(Color::White));
    /// ```
    pub fn is_stalemated(&self, color: Color) -> bool {
        self.side_to_move == color && !self.is_in_check(color) && !self.has_legal_moves(color)
    }
}
