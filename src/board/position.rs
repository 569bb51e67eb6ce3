/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{fmt, ops::Index};

use anyhow::{bail, Result};
use bitflags::bitflags;

use crate::{
    CastleSide, Color, DetailedMove, File, Move, MoveType, Piece, PieceKind, Rank, Square,
    ZobristKey, MAX_PIECES_PER_SIDE,
};

bitflags! {
    /// The four castling rights, one bit each.
    ///
    /// Rights only ever disappear during a game; undoing a move restores a saved copy.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    pub struct CastlingRights: u8 {
        const WHITE_KING_SIDE = 0b0001;
        const WHITE_QUEEN_SIDE = 0b0010;
        const BLACK_KING_SIDE = 0b0100;
        const BLACK_QUEEN_SIDE = 0b1000;
    }
}

impl CastlingRights {
    /// Number of possible combinations of castling rights.
    pub const COUNT: usize = 16;

    /// The flag for `color` castling to `side`.
    ///
    /// # Example
    /// ```
    /// # use arbiter::{CastlingRights, CastleSide, Color};
    /// assert_eq!(CastlingRights::flag(Color::Black, CastleSide::Long), CastlingRights::BLACK_QUEEN_SIDE);
    /// ```
    #[inline(always)]
    pub const fn flag(color: Color, side: CastleSide) -> Self {
        match (color, side) {
            (Color::White, CastleSide::Short) => Self::WHITE_KING_SIDE,
            (Color::White, CastleSide::Long) => Self::WHITE_QUEEN_SIDE,
            (Color::Black, CastleSide::Short) => Self::BLACK_KING_SIDE,
            (Color::Black, CastleSide::Long) => Self::BLACK_QUEEN_SIDE,
        }
    }

    /// Both flags belonging to `color`.
    #[inline(always)]
    pub const fn both(color: Color) -> Self {
        Self::flag(color, CastleSide::Short).union(Self::flag(color, CastleSide::Long))
    }

    #[inline(always)]
    pub const fn has(&self, color: Color, side: CastleSide) -> bool {
        self.contains(Self::flag(color, side))
    }

    /// Index in `[0, 16)`, for lookup tables.
    #[inline(always)]
    pub const fn index(&self) -> usize {
        self.bits() as usize
    }
}

/// Mutable game state that a move may change in ways that cannot be recomputed from the move alone.
///
/// Saved in every [`DetailedMove`] so the move can be taken back exactly.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StateSnapshot {
    pub side_to_move: Color,
    pub castling_rights: CastlingRights,
    pub ep_square: Option<Square>,
    pub halfmove: usize,
    pub fullmove: usize,
}

/// An `8x8` grid of optional pieces.
///
/// Row `0` holds rank 8 and row `7` holds rank 1, matching the order ranks are written in FEN.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board([[Option<Piece>; File::COUNT]; Rank::COUNT]);

impl Board {
    /// Creates a [`Board`] with no pieces on it.
    #[inline(always)]
    pub const fn empty() -> Self {
        Self([[None; File::COUNT]; Rank::COUNT])
    }

    /// Creates the [`Board`] of a standard chess game.
    ///
    /// # Example
    /// ```
    /// # use arbiter::{Board, Piece, Square};
    /// let board = Board::standard();
    /// assert_eq!(board.get(Square::E1), Some(Piece::WHITE_KING));
    /// assert_eq!(board.get(Square::D8), Some(Piece::BLACK_QUEEN));
    /// assert_eq!(board.get(Square::E4), None);
    /// ```
    pub fn standard() -> Self {
        use PieceKind::*;
        const BACK_RANK: [PieceKind; File::COUNT] =
            [Rook, Knight, Bishop, Queen, King, Bishop, Knight, Rook];

        let mut board = Self::empty();
        for (file, kind) in File::iter().zip(BACK_RANK) {
            for color in Color::all() {
                board.place(Square::new(file, Rank::first(color)), Piece::new(color, kind));
                board.place(Square::new(file, Rank::second(color)), Piece::new(color, Pawn));
            }
        }
        board
    }

    /// Creates a [`Board`] from rows of pieces, rank 8 first.
    #[inline(always)]
    pub const fn from_rows(rows: [[Option<Piece>; File::COUNT]; Rank::COUNT]) -> Self {
        Self(rows)
    }

    /// The rows of this board, rank 8 first.
    #[inline(always)]
    pub const fn rows(&self) -> &[[Option<Piece>; File::COUNT]; Rank::COUNT] {
        &self.0
    }

    #[inline(always)]
    const fn cell(square: Square) -> (usize, usize) {
        (Rank::MAX as usize - square.rank().index(), square.file().index())
    }

    /// Fetches the piece on `square`, if there is one.
    #[inline(always)]
    pub const fn get(&self, square: Square) -> Option<Piece> {
        let (row, col) = Self::cell(square);
        self.0[row][col]
    }

    /// Replaces whatever is on `square` with `piece`.
    #[inline(always)]
    pub fn set(&mut self, square: Square, piece: Option<Piece>) {
        let (row, col) = Self::cell(square);
        self.0[row][col] = piece;
    }

    /// Places `piece` on `square`.
    #[inline(always)]
    pub fn place(&mut self, square: Square, piece: Piece) {
        self.set(square, Some(piece));
    }

    /// Removes and returns the piece on `square`, if there is one.
    #[inline(always)]
    pub fn take(&mut self, square: Square) -> Option<Piece> {
        let (row, col) = Self::cell(square);
        self.0[row][col].take()
    }

    /// Iterates over every occupied square, from `a1` to `h8`.
    pub fn iter(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::iter().filter_map(|square| self.get(square).map(|piece| (square, piece)))
    }

    /// Iterates over every square occupied by `color`.
    pub fn pieces(&self, color: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.iter().filter(move |(_, piece)| piece.color() == color)
    }

    /// Number of pieces of `color` and `kind` on the board.
    pub fn count(&self, color: Color, kind: PieceKind) -> usize {
        self.iter().filter(|(_, piece)| piece.is(color, kind)).count()
    }

    /// Locates the King of `color`.
    pub fn king(&self, color: Color) -> Option<Square> {
        self.pieces(color)
            .find(|(_, piece)| piece.is_king())
            .map(|(square, _)| square)
    }
}

impl Index<Square> for Board {
    type Output = Option<Piece>;
    #[inline(always)]
    fn index(&self, index: Square) -> &Self::Output {
        let (row, col) = Self::cell(index);
        &self.0[row][col]
    }
}

impl fmt::Debug for Board {
    /// Draws the board, White at the bottom.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in Rank::iter().rev() {
            write!(f, "{rank}|")?;
            for file in File::iter() {
                match self.get(Square::new(file, rank)) {
                    Some(piece) => write!(f, " {piece}")?,
                    None => write!(f, " .")?,
                }
            }
            writeln!(f)?;
        }
        writeln!(f, " +----------------")?;
        write!(f, "   a b c d e f g h")
    }
}

/// The full state of a chess position: what [FEN](https://www.chessprogramming.org/Forsyth-Edwards_Notation) describes.
///
/// The files the castling Rooks start on are part of the position, so Chess960 setups castle correctly.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub(crate) board: Board,
    pub(crate) side_to_move: Color,
    pub(crate) castling_rights: CastlingRights,
    pub(crate) rook_files: [[File; CastleSide::COUNT]; Color::COUNT],
    pub(crate) ep_square: Option<Square>,
    pub(crate) halfmove: usize,
    pub(crate) fullmove: usize,
}

impl Position {
    /// Creates a new [`Position`] from its parts.
    ///
    /// Castling Rook files are found by scanning each back rank outwards from the King.
    /// Fails if the en passant square does not sit behind a pawn that just double-pushed,
    /// or if either side has more material than a real game allows.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// let pos = Position::new(Board::standard(), Color::White, CastlingRights::all(), None, 0, 1).unwrap();
    /// assert_eq!(pos, Position::default());
    ///
    /// let bad_ep = Position::new(Board::standard(), Color::White, CastlingRights::all(), Some(Square::E6), 0, 1);
    /// assert!(bad_ep.is_err());
    /// ```
    pub fn new(
        board: Board,
        side_to_move: Color,
        castling_rights: CastlingRights,
        ep_square: Option<Square>,
        halfmove: usize,
        fullmove: usize,
    ) -> Result<Self> {
        let mut rook_files = [[File::H, File::A]; Color::COUNT];
        for color in Color::all() {
            for side in CastleSide::all() {
                if let Some(file) = outermost_rook(&board, color, side) {
                    rook_files[color][side.index()] = file;
                }
            }
        }

        let position = Self {
            board,
            side_to_move,
            castling_rights,
            rook_files,
            ep_square,
            halfmove,
            fullmove,
        };
        position.validate()?;
        Ok(position)
    }

    /// Checks the en passant square and each side's material.
    pub fn validate(&self) -> Result<()> {
        if let Some(ep) = self.ep_square {
            let victim = self.side_to_move.opponent();
            let (ep_rank, pawn_rank) = (Rank::third(victim), Rank::fourth(victim));
            if ep.rank() != ep_rank
                || self.board.get(Square::new(ep.file(), pawn_rank)) != Some(Piece::new(victim, PieceKind::Pawn))
            {
                bail!(
                    "Invalid en passant square {ep}: with {} to move it must be on rank {ep_rank} in front of a {} pawn on rank {pawn_rank}",
                    self.side_to_move.name(),
                    victim.name(),
                );
            }
        }

        for color in Color::all() {
            let count = |kind| self.board.count(color, kind);
            let total = self.board.pieces(color).count();

            if total > MAX_PIECES_PER_SIDE {
                bail!(
                    "{} has {total} pieces; at most {MAX_PIECES_PER_SIDE} are allowed",
                    color.name()
                );
            }

            if count(PieceKind::King) > 1 {
                bail!("{} has more than one king", color.name());
            }

            let extra = count(PieceKind::Queen).saturating_sub(1)
                + count(PieceKind::Rook).saturating_sub(2)
                + count(PieceKind::Bishop).saturating_sub(2)
                + count(PieceKind::Knight).saturating_sub(2);
            if count(PieceKind::Pawn) + extra > File::COUNT {
                bail!(
                    "{} has more promoted material than its missing pawns allow",
                    color.name()
                );
            }
        }

        Ok(())
    }

    /// Overrides which file the castling Rook of `color` on `side` starts on.
    pub(crate) fn set_rook_file(&mut self, color: Color, side: CastleSide, file: File) {
        self.rook_files[color][side.index()] = file;
    }

    #[inline(always)]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    #[inline(always)]
    pub const fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline(always)]
    pub const fn castling_rights(&self) -> CastlingRights {
        self.castling_rights
    }

    #[inline(always)]
    pub const fn ep_square(&self) -> Option<Square> {
        self.ep_square
    }

    /// Number of plies since the last capture or pawn move.
    #[inline(always)]
    pub const fn halfmove(&self) -> usize {
        self.halfmove
    }

    /// Starts at 1 and increments after Black moves.
    #[inline(always)]
    pub const fn fullmove(&self) -> usize {
        self.fullmove
    }

    /// The file the castling Rook of `color` on `side` starts on.
    #[inline(always)]
    pub const fn rook_file(&self, color: Color, side: CastleSide) -> File {
        self.rook_files[color.index()][side.index()]
    }

    /// The square the castling Rook of `color` on `side` starts on.
    #[inline(always)]
    pub const fn castling_rook_square(&self, color: Color, side: CastleSide) -> Square {
        Square::new(self.rook_file(color, side), Rank::first(color))
    }

    /// The 64-bit repetition key of this position.
    #[inline(always)]
    pub fn key(&self) -> ZobristKey {
        ZobristKey::new(self)
    }

    /// Saves the state a move can change irreversibly.
    #[inline(always)]
    pub const fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            side_to_move: self.side_to_move,
            castling_rights: self.castling_rights,
            ep_square: self.ep_square,
            halfmove: self.halfmove,
            fullmove: self.fullmove,
        }
    }

    #[inline(always)]
    fn restore(&mut self, snapshot: &StateSnapshot) {
        self.side_to_move = snapshot.side_to_move;
        self.castling_rights = snapshot.castling_rights;
        self.ep_square = snapshot.ep_square;
        self.halfmove = snapshot.halfmove;
        self.fullmove = snapshot.fullmove;
    }

    /// If `mv` is written as a castle, returns the side it castles to.
    ///
    /// A castle is the King moving onto its own castling Rook, or moving two files onto the `g` or `c` file
    /// along its back rank. Whether the castle is allowed is not checked here.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    /// assert_eq!(pos.castle_side(&Move::new(Square::E1, Square::G1, Color::White)), Some(CastleSide::Short));
    /// assert_eq!(pos.castle_side(&Move::new(Square::E1, Square::A1, Color::White)), Some(CastleSide::Long));
    /// assert_eq!(pos.castle_side(&Move::new(Square::E1, Square::F1, Color::White)), None);
    /// ```
    pub fn castle_side(&self, mv: &Move) -> Option<CastleSide> {
        let (from, to, color) = (mv.from(), mv.to(), mv.player());
        let first = Rank::first(color);

        if from.rank() != first || to.rank() != first || !self.board.get(from)?.is(color, PieceKind::King) {
            return None;
        }

        match self.board.get(to) {
            Some(rook) if rook.is(color, PieceKind::Rook) => {
                let side = if to.file() > from.file() {
                    CastleSide::Short
                } else {
                    CastleSide::Long
                };
                (self.rook_file(color, side) == to.file()).then_some(side)
            }
            Some(_) => None,
            None if from.distance_files(to) == 2 => match to.file() {
                File::G if to > from => Some(CastleSide::Short),
                File::C if to < from => Some(CastleSide::Long),
                _ => None,
            },
            None => None,
        }
    }

    /// Validates `mv` (unless `already_validated`) and applies it.
    ///
    /// Returns [`MoveType::INVALID`] if the move was rejected, leaving the position untouched.
    ///
    /// # Panics
    ///
    /// If `already_validated` is `true` and there is no piece on the origin square.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// let mut pos = Position::default();
    /// let result = pos.apply_move(&Move::new(Square::E2, Square::E4, Color::White), false);
    /// assert_eq!(result, MoveType::MOVE);
    ///
    /// let result = pos.apply_move(&Move::new(Square::E4, Square::E5, Color::White), false);
    /// assert_eq!(result, MoveType::INVALID);
    /// ```
    pub fn apply_move(&mut self, mv: &Move, already_validated: bool) -> MoveType {
        if !already_validated && !self.is_valid_move(mv, true, true) {
            return MoveType::INVALID;
        }
        self.apply_unchecked(mv).move_type
    }

    /// Applies `mv` without checking that it is legal, returning a record that [`Position::revert`] can undo.
    ///
    /// The returned record's SAN is left empty.
    ///
    /// # Panics
    ///
    /// If there is no piece on the origin square.
    pub fn apply_unchecked(&mut self, mv: &Move) -> DetailedMove {
        let (from, to) = (mv.from(), mv.to());
        let castle = self.castle_side(mv);
        let snapshot = self.snapshot();

        let Some(piece) = self.board.take(from) else {
            panic!("Cannot apply {mv:?}: there is no piece on {from}");
        };
        let color = piece.color();

        let mut recorded = *mv;
        let mut move_type = MoveType::MOVE;
        let mut captured = None;
        self.ep_square = None;
        self.halfmove += 1;

        if let Some(side) = castle {
            let rook = self.board.take(self.castling_rook_square(color, side));
            self.board.place(side.king_destination(color), piece);
            self.board.set(side.rook_destination(color), rook);
            self.castling_rights.remove(CastlingRights::both(color));
            move_type |= MoveType::CASTLING;
        } else {
            let en_passant = piece.is_pawn() && from.file() != to.file() && self.board.get(to).is_none();
            let capture_square = if en_passant {
                Square::new(to.file(), from.rank())
            } else {
                to
            };

            if let Some(victim) = self.board.take(capture_square) {
                captured = Some((capture_square, victim));
                move_type |= MoveType::CAPTURE;
                if en_passant {
                    move_type |= MoveType::EN_PASSANT;
                }
                self.halfmove = 0;
                self.clear_rights_at(capture_square, color.opponent());
            }

            let mut landed = piece;
            match piece.kind() {
                PieceKind::Pawn => {
                    self.halfmove = 0;
                    if to.rank() == Rank::eighth(color) {
                        let kind = mv.promotion().unwrap_or(PieceKind::Queen);
                        landed = piece.promoted(kind);
                        recorded = Move::with_promotion(from, to, color, kind);
                        move_type |= MoveType::PROMOTION;
                    } else if from.distance_ranks(to) == 2 && self.has_adjacent_enemy_pawn(to, color) {
                        self.ep_square = from.forward_by(color, 1);
                    }
                }
                PieceKind::King => self.castling_rights.remove(CastlingRights::both(color)),
                PieceKind::Rook => self.clear_rights_at(from, color),
                _ => {}
            }

            self.board.place(to, landed);
        }

        if color == Color::Black {
            self.fullmove += 1;
        }
        self.side_to_move = self.side_to_move.opponent();

        DetailedMove {
            mv: recorded,
            piece,
            captured,
            castle,
            move_type,
            san: String::new(),
            snapshot,
        }
    }

    /// Takes back a move previously applied to this position.
    pub fn revert(&mut self, applied: &DetailedMove) {
        let (from, to) = (applied.mv.from(), applied.mv.to());
        let color = applied.piece.color();

        if let Some(side) = applied.castle {
            let king = self.board.take(side.king_destination(color));
            let rook = self.board.take(side.rook_destination(color));
            self.board.set(from, king);
            self.board.set(self.castling_rook_square(color, side), rook);
        } else {
            self.board.set(to, None);
            self.board.place(from, applied.piece);
            if let Some((square, victim)) = applied.captured {
                self.board.place(square, victim);
            }
        }

        self.restore(&applied.snapshot);
    }

    /// Clears `color`'s castling right on the side whose Rook starts on `square`.
    fn clear_rights_at(&mut self, square: Square, color: Color) {
        for side in CastleSide::all() {
            if self.castling_rook_square(color, side) == square {
                self.castling_rights.remove(CastlingRights::flag(color, side));
            }
        }
    }

    /// Returns `true` if an enemy pawn stands beside `square`, able to capture a pawn that just landed there.
    fn has_adjacent_enemy_pawn(&self, square: Square, color: Color) -> bool {
        let enemy_pawn = Piece::new(color.opponent(), PieceKind::Pawn);
        [-1, 1]
            .into_iter()
            .filter_map(|delta| square.offset(delta, 0))
            .any(|beside| self.board.get(beside) == Some(enemy_pawn))
    }

    /// Returns `true` if neither side has enough material to checkmate.
    ///
    /// Any pawn, rook, or queen is enough. Otherwise a side can mate with two bishops, a bishop and a knight,
    /// or three knights. Everything less, including two knights, is declared a draw.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// assert!(Position::from_fen("8/8/4k3/8/8/3K4/8/8 w - - 0 1").unwrap().is_insufficient_material());
    /// assert!(Position::from_fen("8/8/4k3/8/8/3KNN2/8/8 w - - 0 1").unwrap().is_insufficient_material());
    /// assert!(!Position::from_fen("8/8/4k3/8/8/3KBN2/8/8 w - - 0 1").unwrap().is_insufficient_material());
    /// assert!(!Position::from_fen("8/8/4k3/8/8/3K4/7P/8 w - - 0 1").unwrap().is_insufficient_material());
    /// ```
    pub fn is_insufficient_material(&self) -> bool {
        let heavy_or_pawn = self
            .board
            .iter()
            .any(|(_, piece)| matches!(piece.kind(), PieceKind::Pawn | PieceKind::Rook | PieceKind::Queen));
        if heavy_or_pawn {
            return false;
        }

        Color::all().into_iter().all(|color| {
            let bishops = self.board.count(color, PieceKind::Bishop);
            let knights = self.board.count(color, PieceKind::Knight);
            !(bishops >= 2 || (bishops >= 1 && knights >= 1) || knights >= 3)
        })
    }
}

/// The file of the Rook of `color` furthest from its King on `side`, along the back rank.
fn outermost_rook(board: &Board, color: Color, side: CastleSide) -> Option<File> {
    let rank = Rank::first(color);
    let king = File::iter().find(|&file| {
        board
            .get(Square::new(file, rank))
            .is_some_and(|piece| piece.is(color, PieceKind::King))
    })?;
    let rook = Piece::new(color, PieceKind::Rook);

    let is_rook = |file: &File| board.get(Square::new(*file, rank)) == Some(rook);
    match side {
        CastleSide::Short => File::iter().rev().take_while(|&file| file > king).find(is_rook),
        CastleSide::Long => File::iter().take_while(|&file| file < king).find(is_rook),
    }
}

impl Default for Position {
    /// The standard starting position.
    fn default() -> Self {
        Self {
            board: Board::standard(),
            side_to_move: Color::White,
            castling_rights: CastlingRights::all(),
            rook_files: [[File::H, File::A]; Color::COUNT],
            ep_square: None,
            halfmove: 0,
            fullmove: 1,
        }
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:?}", self.board)?;
        writeln!(f)?;
        writeln!(f, "FEN: {self}")?;
        write!(f, "Key: {}", self.key())
    }
}
