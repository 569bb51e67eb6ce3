/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use anyhow::{bail, Context, Result};
use arrayvec::ArrayVec;
use bitflags::bitflags;

use crate::{Color, File, Piece, PieceKind, Rank, Square, StateSnapshot, MAX_NUM_MOVES};

/// A list of moves that never allocates.
pub type MoveList = ArrayVec<Move, MAX_NUM_MOVES>;

bitflags! {
    /// What happened when a move was applied.
    ///
    /// A single move can be several things at once, so test membership rather than equality:
    /// ```
    /// # use arbiter::MoveType;
    /// let result = MoveType::MOVE | MoveType::CAPTURE | MoveType::PROMOTION;
    /// assert!(result.contains(MoveType::CAPTURE));
    /// assert!(!result.contains(MoveType::CASTLING));
    /// assert!(result.is_valid());
    /// assert!(!MoveType::INVALID.is_valid());
    /// ```
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    pub struct MoveType: u8 {
        const INVALID = 1 << 0;
        const MOVE = 1 << 1;
        const CAPTURE = 1 << 2;
        const CASTLING = 1 << 3;
        const PROMOTION = 1 << 4;
        const EN_PASSANT = 1 << 5;
    }
}

impl MoveType {
    /// Returns `true` unless this result marks a rejected move.
    #[inline(always)]
    pub const fn is_valid(&self) -> bool {
        !self.contains(Self::INVALID)
    }
}

/// The side of the board a castle is performed on.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CastleSide {
    /// Towards the H file ("kingside", `O-O`).
    Short,
    /// Towards the A file ("queenside", `O-O-O`).
    Long,
}

impl CastleSide {
    pub const COUNT: usize = 2;

    #[inline(always)]
    pub const fn all() -> [Self; Self::COUNT] {
        [Self::Short, Self::Long]
    }

    #[inline(always)]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Where the King lands after castling to this side.
    ///
    /// # Example
    /// ```
    /// # use arbiter::{CastleSide, Color, Square};
    /// assert_eq!(CastleSide::Short.king_destination(Color::White), Square::G1);
    /// assert_eq!(CastleSide::Long.king_destination(Color::Black), Square::C8);
    /// ```
    #[inline(always)]
    pub const fn king_destination(&self, color: Color) -> Square {
        match self {
            Self::Short => Square::new(File::G, Rank::first(color)),
            Self::Long => Square::new(File::C, Rank::first(color)),
        }
    }

    /// Where the Rook lands after castling to this side.
    ///
    /// # Example
    /// ```
    /// # use arbiter::{CastleSide, Color, Square};
    /// assert_eq!(CastleSide::Short.rook_destination(Color::White), Square::F1);
    /// assert_eq!(CastleSide::Long.rook_destination(Color::Black), Square::D8);
    /// ```
    #[inline(always)]
    pub const fn rook_destination(&self, color: Color) -> Square {
        match self {
            Self::Short => Square::new(File::F, Rank::first(color)),
            Self::Long => Square::new(File::D, Rank::first(color)),
        }
    }

    /// SAN text for castling to this side.
    #[inline(always)]
    pub const fn san(&self) -> &'static str {
        match self {
            Self::Short => "O-O",
            Self::Long => "O-O-O",
        }
    }
}

/// A move request: origin, destination, the player making it, and an optional promotion.
///
/// Castling is requested by moving the King onto its own castling Rook, or by moving it two files
/// towards that Rook (`e1g1`). Both forms are accepted wherever a [`Move`] is validated.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    from: Square,
    to: Square,
    player: Color,
    promotion: Option<PieceKind>,
}

impl Move {
    /// Creates a new [`Move`] without a promotion.
    ///
    /// # Example
    /// ```
    /// # use arbiter::{Move, Square, Color};
    /// let mv = Move::new(Square::E2, Square::E4, Color::White);
    /// assert_eq!(mv.to_uci(), "e2e4");
    /// ```
    #[inline(always)]
    pub const fn new(from: Square, to: Square, player: Color) -> Self {
        Self {
            from,
            to,
            player,
            promotion: None,
        }
    }

    /// Creates a new [`Move`] that promotes to `promotion` when it reaches the last rank.
    ///
    /// Whether `promotion` is an acceptable kind is decided when the move is validated.
    #[inline(always)]
    pub const fn with_promotion(
        from: Square,
        to: Square,
        player: Color,
        promotion: PieceKind,
    ) -> Self {
        Self {
            from,
            to,
            player,
            promotion: Some(promotion),
        }
    }

    /// Parses a move from UCI-style text, like `e2e4` or `e7e8q`.
    ///
    /// Squares and the promotion letter are case-insensitive.
    ///
    /// # Example
    /// ```
    /// # use arbiter::{Move, Square, Color, PieceKind};
    /// let mv = Move::from_uci("B7B8N", Color::White).unwrap();
    /// assert_eq!(mv, Move::with_promotion(Square::B7, Square::B8, Color::White, PieceKind::Knight));
    ///
    /// assert!(Move::from_uci("e2", Color::White).is_err());
    /// assert!(Move::from_uci("e7e8x", Color::White).is_err());
    /// ```
    pub fn from_uci(uci: &str, player: Color) -> Result<Self> {
        let uci = uci.trim();
        let (Some(from), Some(to)) = (uci.get(0..2), uci.get(2..4)) else {
            bail!("Move must be 4 or 5 characters long. Got {uci:?}");
        };

        let from = Square::from_uci(from).context(format!("Invalid origin in move {uci:?}"))?;
        let to = Square::from_uci(to).context(format!("Invalid destination in move {uci:?}"))?;

        match uci.get(4..) {
            None | Some("") => Ok(Self::new(from, to, player)),
            Some(promotion) => {
                let kind = promotion
                    .parse()
                    .context(format!("Invalid promotion in move {uci:?}"))?;
                Ok(Self::with_promotion(from, to, player, kind))
            }
        }
    }

    /// Converts this move to UCI-style text. Promotions are written in lowercase.
    #[inline(always)]
    pub fn to_uci(&self) -> String {
        match self.promotion {
            Some(kind) => format!("{}{}{}", self.from, self.to, kind.char()),
            None => format!("{}{}", self.from, self.to),
        }
    }

    #[inline(always)]
    pub const fn from(&self) -> Square {
        self.from
    }

    #[inline(always)]
    pub const fn to(&self) -> Square {
        self.to
    }

    #[inline(always)]
    pub const fn player(&self) -> Color {
        self.player
    }

    #[inline(always)]
    pub const fn promotion(&self) -> Option<PieceKind> {
        self.promotion
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.to_uci(), self.player.name())
    }
}

/// A history entry: a move that was applied, plus everything needed to take it back.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct DetailedMove {
    pub(crate) mv: Move,
    pub(crate) piece: Piece,
    pub(crate) captured: Option<(Square, Piece)>,
    pub(crate) castle: Option<CastleSide>,
    pub(crate) move_type: MoveType,
    pub(crate) san: String,
    pub(crate) snapshot: StateSnapshot,
}

impl DetailedMove {
    /// The move as it was requested.
    #[inline(always)]
    pub const fn mv(&self) -> Move {
        self.mv
    }

    /// The piece that moved, as it was before the move (a Pawn, for promotions).
    #[inline(always)]
    pub const fn piece(&self) -> Piece {
        self.piece
    }

    /// The piece that was captured, if any.
    #[inline(always)]
    pub fn captured(&self) -> Option<Piece> {
        self.captured.map(|(_, piece)| piece)
    }

    /// Where the captured piece stood. Differs from the destination for en passant.
    #[inline(always)]
    pub fn capture_square(&self) -> Option<Square> {
        self.captured.map(|(square, _)| square)
    }

    #[inline(always)]
    pub const fn castle(&self) -> Option<CastleSide> {
        self.castle
    }

    #[inline(always)]
    pub const fn move_type(&self) -> MoveType {
        self.move_type
    }

    /// The move in Standard Algebraic Notation.
    #[inline(always)]
    pub fn san(&self) -> &str {
        &self.san
    }

    /// State from before the move was applied.
    #[inline(always)]
    pub const fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }
}

impl fmt::Display for DetailedMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.san)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_parsing() {
        let mv = Move::from_uci("e2e4", Color::White).unwrap();
        assert_eq!(mv.from(), Square::E2);
        assert_eq!(mv.to(), Square::E4);
        assert_eq!(mv.promotion(), None);
        assert_eq!(mv.to_string(), "e2e4");

        let mv = Move::from_uci("a2a1Q", Color::Black).unwrap();
        assert_eq!(mv.promotion(), Some(PieceKind::Queen));
        assert_eq!(mv.to_uci(), "a2a1q");

        // Letters the rules will reject still parse; validation decides.
        let mv = Move::from_uci("a7a8k", Color::White).unwrap();
        assert_eq!(mv.promotion(), Some(PieceKind::King));

        assert!(Move::from_uci("", Color::White).is_err());
        assert!(Move::from_uci("e2e", Color::White).is_err());
        assert!(Move::from_uci("e9e4", Color::White).is_err());
        assert!(Move::from_uci("e7e8qq", Color::White).is_err());
    }

    #[test]
    fn test_move_equality() {
        let plain = Move::new(Square::A7, Square::A8, Color::White);
        let queen = Move::with_promotion(Square::A7, Square::A8, Color::White, PieceKind::Queen);
        let lower = Move::from_uci("a7a8q", Color::White).unwrap();
        let upper = Move::from_uci("A7A8Q", Color::White).unwrap();

        assert_ne!(plain, queen);
        assert_eq!(queen, lower);
        assert_eq!(lower, upper);
        assert_ne!(plain, Move::new(Square::A7, Square::A8, Color::Black));
    }

    #[test]
    fn test_castle_destinations() {
        for color in Color::all() {
            for side in CastleSide::all() {
                let king = side.king_destination(color);
                let rook = side.rook_destination(color);
                assert_eq!(king.rank(), Rank::first(color));
                assert_eq!(king.distance_files(rook), 1);
            }
        }
    }
}
