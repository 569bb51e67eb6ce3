/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use anyhow::{bail, Result};

use crate::{Color, File, Move, PieceKind, Rank, Square};

/// A move as stored in a [Polyglot](http://hgm.nubati.net/book_format.html) opening book.
///
/// ```text
/// bits  0..3   destination file
/// bits  3..6   destination rank
/// bits  6..9   origin file
/// bits  9..12  origin rank
/// bits 12..15  promotion: 0 none, 1 knight, 2 bishop, 3 rook, 4 queen
/// ```
///
/// Castling is stored as the King moving onto its own Rook (`e1h1`), which [`Position::is_valid_move`](crate::Position::is_valid_move)
/// understands directly.
/// Book data is untrusted: a decoded move must still be validated before it is played.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BookMove(pub u16);

impl BookMove {
    const FIELD_MASK: u16 = 0b111;
    const TO_FILE: u16 = 0;
    const TO_RANK: u16 = 3;
    const FROM_FILE: u16 = 6;
    const FROM_RANK: u16 = 9;
    const PROMOTION: u16 = 12;

    #[inline(always)]
    const fn field(&self, shift: u16) -> u8 {
        (self.0 >> shift & Self::FIELD_MASK) as u8
    }

    #[inline(always)]
    const fn square(&self, file_shift: u16, rank_shift: u16) -> Square {
        Square::new(File(self.field(file_shift)), Rank(self.field(rank_shift)))
    }

    /// The origin square.
    #[inline(always)]
    pub const fn from(&self) -> Square {
        self.square(Self::FROM_FILE, Self::FROM_RANK)
    }

    /// The destination square.
    #[inline(always)]
    pub const fn to(&self) -> Square {
        self.square(Self::TO_FILE, Self::TO_RANK)
    }

    /// The promotion, if any. Fails on codes above 4.
    pub fn promotion(&self) -> Result<Option<PieceKind>> {
        Ok(match self.field(Self::PROMOTION) {
            0 => None,
            1 => Some(PieceKind::Knight),
            2 => Some(PieceKind::Bishop),
            3 => Some(PieceKind::Rook),
            4 => Some(PieceKind::Queen),
            code => bail!("Invalid promotion code {code} in book move {:#06x}", self.0),
        })
    }

    /// Decodes this book move as a move by `player`.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// // e7e8q
    /// let raw = BookMove((4 << 12) | (6 << 9) | (4 << 6) | (7 << 3) | 4);
    /// let mv = raw.to_move(Color::White).unwrap();
    /// assert_eq!(mv.to_uci(), "e7e8q");
    /// ```
    pub fn to_move(&self, player: Color) -> Result<Move> {
        if self.0 >> 15 != 0 {
            bail!("Book move {:#06x} has its unused high bit set", self.0);
        }

        Ok(match self.promotion()? {
            Some(kind) => Move::with_promotion(self.from(), self.to(), player, kind),
            None => Move::new(self.from(), self.to(), player),
        })
    }

    /// Encodes `mv` in book format. Promotions to anything other than N, B, R, or Q are dropped.
    pub fn encode(mv: &Move) -> Self {
        let promotion: u16 = match mv.promotion() {
            Some(PieceKind::Knight) => 1,
            Some(PieceKind::Bishop) => 2,
            Some(PieceKind::Rook) => 3,
            Some(PieceKind::Queen) => 4,
            _ => 0,
        };

        let (from, to) = (mv.from(), mv.to());
        Self(
            promotion << Self::PROMOTION
                | (from.rank().index() as u16) << Self::FROM_RANK
                | (from.file().index() as u16) << Self::FROM_FILE
                | (to.rank().index() as u16) << Self::TO_RANK
                | (to.file().index() as u16) << Self::TO_FILE,
        )
    }
}

impl fmt::Debug for BookMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} ({:#06x})", self.from(), self.to(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Game;

    #[test]
    fn test_decoding() {
        let e2e4 = BookMove((1 << 9) | (4 << 6) | (3 << 3) | 4);
        assert_eq!(e2e4.from(), Square::E2);
        assert_eq!(e2e4.to(), Square::E4);
        assert_eq!(e2e4.promotion().unwrap(), None);

        let bad_promotion = BookMove(7 << 12);
        assert!(bad_promotion.promotion().is_err());
        assert!(bad_promotion.to_move(Color::White).is_err());
        assert!(BookMove(1 << 15).to_move(Color::White).is_err());
    }

    #[test]
    fn test_encode_matches_decode() {
        let mv = Move::with_promotion(Square::B2, Square::A1, Color::Black, PieceKind::Knight);
        let book = BookMove::encode(&mv);
        assert_eq!(book.to_move(Color::Black).unwrap(), mv);
    }

    #[test]
    fn test_castling_is_king_takes_rook() {
        let game = Game::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let e1h1 = BookMove::encode(&Move::new(Square::E1, Square::H1, Color::White));
        assert!(game.book_move(e1h1.0).is_some());

        // Untrusted input is validated, not trusted
        let e1e3 = BookMove::encode(&Move::new(Square::E1, Square::E3, Color::White));
        assert_eq!(game.book_move(e1e3.0), None);
    }
}
