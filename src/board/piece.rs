/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    hash::{Hash, Hasher},
    ops::{Index, IndexMut, Not},
    str::FromStr,
};

use anyhow::{bail, Result};

/// Represents the color of a player or piece.
///
/// White moves first, and therefore [`Color`] defaults to [`Color::White`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Color {
    #[default]
    White,
    Black,
}

impl Color {
    /// Number of color variants.
    pub const COUNT: usize = 2;

    /// An array of both colors, starting with White.
    #[inline(always)]
    pub const fn all() -> [Self; Self::COUNT] {
        [Self::White, Self::Black]
    }

    /// Returns this [`Color`]'s opposite / inverse / enemy.
    ///
    /// # Example
    /// ```
    /// # use arbiter::Color;
    /// assert_eq!(Color::White.opponent(), Color::Black);
    /// assert_eq!(!Color::Black, Color::White);
    /// ```
    #[inline(always)]
    pub const fn opponent(&self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Direction this color's pawns advance in, as a rank delta.
    #[inline(always)]
    pub const fn forward(&self) -> i8 {
        match self {
            Self::White => 1,
            Self::Black => -1,
        }
    }

    #[inline(always)]
    pub const fn is_white(&self) -> bool {
        matches!(self, Self::White)
    }

    #[inline(always)]
    pub const fn is_black(&self) -> bool {
        matches!(self, Self::Black)
    }

    /// Obtain the inner value as a `usize`, for indexing.
    #[inline(always)]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Parses a side-to-move character, which must be exactly `w` or `b`.
    ///
    /// # Example
    /// ```
    /// # use arbiter::Color;
    /// assert_eq!(Color::from_uci('b').unwrap(), Color::Black);
    /// assert!(Color::from_uci('W').is_err());
    /// ```
    #[inline(always)]
    pub fn from_uci(color: char) -> Result<Self> {
        match color {
            'w' => Ok(Self::White),
            'b' => Ok(Self::Black),
            _ => bail!("Invalid char for Color: Must be 'w' or 'b'. Got {color:?}"),
        }
    }

    /// The color of a piece letter: uppercase is White, lowercase is Black.
    #[inline(always)]
    pub const fn from_case(c: char) -> Self {
        if c.is_ascii_uppercase() {
            Self::White
        } else {
            Self::Black
        }
    }

    #[inline(always)]
    pub const fn to_uci(&self) -> char {
        match self {
            Self::White => 'w',
            Self::Black => 'b',
        }
    }

    #[inline(always)]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }
}

impl Not for Color {
    type Output = Self;
    #[inline(always)]
    fn not(self) -> Self::Output {
        self.opponent()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl<T> Index<Color> for [T; Color::COUNT] {
    type Output = T;
    #[inline(always)]
    fn index(&self, index: Color) -> &Self::Output {
        &self[index.index()]
    }
}

impl<T> IndexMut<Color> for [T; Color::COUNT] {
    #[inline(always)]
    fn index_mut(&mut self, index: Color) -> &mut Self::Output {
        &mut self[index.index()]
    }
}

/// Represents the kind (or "role") that a chess piece can be.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// Number of piece kinds.
    pub const COUNT: usize = 6;

    /// The kinds a pawn may promote to, in the order they are generated.
    pub const PROMOTIONS: [Self; 4] = [Self::Queen, Self::Rook, Self::Bishop, Self::Knight];

    /// An array of all six kinds, starting with Pawn.
    #[inline(always)]
    pub const fn all() -> [Self; Self::COUNT] {
        [
            Self::Pawn,
            Self::Knight,
            Self::Bishop,
            Self::Rook,
            Self::Queen,
            Self::King,
        ]
    }

    #[inline(always)]
    const fn from_bits_unchecked(bits: u8) -> Self {
        match bits {
            0 => Self::Pawn,
            1 => Self::Knight,
            2 => Self::Bishop,
            3 => Self::Rook,
            4 => Self::Queen,
            _ => Self::King,
        }
    }

    #[inline(always)]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Returns `true` if a pawn may promote to this kind.
    #[inline(always)]
    pub const fn is_promotable(&self) -> bool {
        matches!(self, Self::Queen | Self::Rook | Self::Bishop | Self::Knight)
    }

    /// Parses a [`PieceKind`] from its letter, ignoring case.
    ///
    /// # Example
    /// ```
    /// # use arbiter::PieceKind;
    /// assert_eq!(PieceKind::from_uci('n').unwrap(), PieceKind::Knight);
    /// assert_eq!(PieceKind::from_uci('Q').unwrap(), PieceKind::Queen);
    /// assert!(PieceKind::from_uci('x').is_err());
    /// ```
    #[inline(always)]
    pub fn from_uci(kind: char) -> Result<Self> {
        match kind.to_ascii_lowercase() {
            'p' => Ok(Self::Pawn),
            'n' => Ok(Self::Knight),
            'b' => Ok(Self::Bishop),
            'r' => Ok(Self::Rook),
            'q' => Ok(Self::Queen),
            'k' => Ok(Self::King),
            _ => bail!("Invalid char for PieceKind: Must be one of [p, n, b, r, q, k]. Got {kind:?}"),
        }
    }

    /// Lowercase letter of this kind.
    #[inline(always)]
    pub const fn char(&self) -> char {
        match self {
            Self::Pawn => 'p',
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Rook => 'r',
            Self::Queen => 'q',
            Self::King => 'k',
        }
    }

    /// Uppercase letter of this kind, as used in SAN.
    #[inline(always)]
    pub const fn san_char(&self) -> char {
        self.char().to_ascii_uppercase()
    }

    #[inline(always)]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pawn => "pawn",
            Self::Knight => "knight",
            Self::Bishop => "bishop",
            Self::Rook => "rook",
            Self::Queen => "queen",
            Self::King => "king",
        }
    }
}

impl FromStr for PieceKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_uci(c),
            _ => bail!("Invalid str for PieceKind: Must be a str of len 1. Got {s:?}"),
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.char())
    }
}

impl fmt::Debug for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Represents a chess piece on the game board.
///
/// Internally encoded using the following bit pattern:
/// ```text
///     000 1 0 111
///          | |  |
///          | |  +- Kind.
///          | +- Color.
///          +- Set if the piece was obtained by promotion.
/// ```
///
/// The promotion bit only affects FEN output (a trailing `~`).
/// Two pieces are equal, and hash alike, iff they have the same [`Color`] and [`PieceKind`].
#[derive(Clone, Copy)]
pub struct Piece(u8);

impl Piece {
    pub const WHITE_PAWN: Self = Self::new(Color::White, PieceKind::Pawn);
    pub const WHITE_KNIGHT: Self = Self::new(Color::White, PieceKind::Knight);
    pub const WHITE_BISHOP: Self = Self::new(Color::White, PieceKind::Bishop);
    pub const WHITE_ROOK: Self = Self::new(Color::White, PieceKind::Rook);
    pub const WHITE_QUEEN: Self = Self::new(Color::White, PieceKind::Queen);
    pub const WHITE_KING: Self = Self::new(Color::White, PieceKind::King);

    pub const BLACK_PAWN: Self = Self::new(Color::Black, PieceKind::Pawn);
    pub const BLACK_KNIGHT: Self = Self::new(Color::Black, PieceKind::Knight);
    pub const BLACK_BISHOP: Self = Self::new(Color::Black, PieceKind::Bishop);
    pub const BLACK_ROOK: Self = Self::new(Color::Black, PieceKind::Rook);
    pub const BLACK_QUEEN: Self = Self::new(Color::Black, PieceKind::Queen);
    pub const BLACK_KING: Self = Self::new(Color::Black, PieceKind::King);

    /// Number of unique piece variants.
    pub const COUNT: usize = Color::COUNT * PieceKind::COUNT;

    const KIND_MASK: u8 = 0b0000_0111;
    const COLOR_BIT: u8 = 3;
    const PROMOTED_MASK: u8 = 0b0001_0000;
    const IDENTITY_MASK: u8 = 0b0000_1111;

    /// Creates a new [`Piece`] from the given [`Color`] and [`PieceKind`].
    ///
    /// # Example
    /// ```
    /// # use arbiter::{Piece, Color, PieceKind};
    /// let white_knight = Piece::new(Color::White, PieceKind::Knight);
    /// assert_eq!(white_knight.to_string(), "N");
    /// ```
    #[inline(always)]
    pub const fn new(color: Color, kind: PieceKind) -> Self {
        Self((color as u8) << Self::COLOR_BIT | kind as u8)
    }

    #[inline(always)]
    pub const fn color(&self) -> Color {
        if self.0 >> Self::COLOR_BIT & 1 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    #[inline(always)]
    pub const fn kind(&self) -> PieceKind {
        PieceKind::from_bits_unchecked(self.0 & Self::KIND_MASK)
    }

    /// Returns `true` if this piece was created by promoting a pawn.
    #[inline(always)]
    pub const fn is_promoted(&self) -> bool {
        self.0 & Self::PROMOTED_MASK != 0
    }

    /// Returns `true` if this piece has the given [`Color`] and [`PieceKind`].
    #[inline(always)]
    pub const fn is(&self, color: Color, kind: PieceKind) -> bool {
        self.0 & Self::IDENTITY_MASK == Self::new(color, kind).0
    }

    #[inline(always)]
    pub const fn is_pawn(&self) -> bool {
        matches!(self.kind(), PieceKind::Pawn)
    }

    #[inline(always)]
    pub const fn is_rook(&self) -> bool {
        matches!(self.kind(), PieceKind::Rook)
    }

    #[inline(always)]
    pub const fn is_king(&self) -> bool {
        matches!(self.kind(), PieceKind::King)
    }

    /// Index in `[0, 12)`, ignoring the promotion bit. Useful for lookup tables.
    #[inline(always)]
    pub const fn index(&self) -> usize {
        self.color().index() * PieceKind::COUNT + self.kind().index()
    }

    /// Creates a new [`Piece`] from a FEN letter: uppercase is White, lowercase is Black.
    ///
    /// # Example
    /// ```
    /// # use arbiter::{Piece, Color, PieceKind};
    /// let black_knight = Piece::from_uci('n').unwrap();
    /// assert_eq!(black_knight.color(), Color::Black);
    /// assert_eq!(black_knight.kind(), PieceKind::Knight);
    /// ```
    #[inline(always)]
    pub fn from_uci(piece: char) -> Result<Self> {
        Ok(Self::new(Color::from_case(piece), PieceKind::from_uci(piece)?))
    }

    /// Converts this [`Piece`] into its FEN letter.
    #[inline(always)]
    pub const fn to_uci(&self) -> char {
        match self.color() {
            Color::White => self.kind().char().to_ascii_uppercase(),
            Color::Black => self.kind().char(),
        }
    }

    /// Replaces this piece with a promoted piece of the same color, marked as promotion-derived.
    ///
    /// # Example
    /// ```
    /// # use arbiter::{Piece, PieceKind};
    /// let queen = Piece::BLACK_PAWN.promoted(PieceKind::Queen);
    /// assert_eq!(queen, Piece::BLACK_QUEEN);
    /// assert!(queen.is_promoted());
    /// assert!(!Piece::BLACK_QUEEN.is_promoted());
    /// ```
    #[inline(always)]
    pub const fn promoted(self, promotion: PieceKind) -> Self {
        Self(Self::new(self.color(), promotion).0 | Self::PROMOTED_MASK)
    }

    /// Marks this piece as promotion-derived without changing its kind.
    #[inline(always)]
    pub const fn with_promoted_flag(self) -> Self {
        Self(self.0 | Self::PROMOTED_MASK)
    }

    /// Human-readable name, like `"white queen"`.
    #[inline(always)]
    pub fn name(&self) -> String {
        format!("{} {}", self.color().name(), self.kind().name())
    }
}

impl PartialEq for Piece {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.0 & Self::IDENTITY_MASK == other.0 & Self::IDENTITY_MASK
    }
}

impl Eq for Piece {}

impl Hash for Piece {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.0 & Self::IDENTITY_MASK).hash(state);
    }
}

impl FromStr for Piece {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_uci(c),
            _ => bail!("Invalid str for Piece: Must be a str of len 1. Got {s:?}"),
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

impl fmt::Debug for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_promoted() {
            write!(f, "\"{}\" (promoted)", self.name())
        } else {
            write!(f, "\"{}\"", self.name())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_piece_parts() {
        for color in Color::all() {
            for kind in PieceKind::all() {
                let piece = Piece::new(color, kind);
                assert_eq!(piece.color(), color);
                assert_eq!(piece.kind(), kind);
                assert!(piece.is(color, kind));
                assert_eq!(Piece::from_uci(piece.to_uci()).unwrap(), piece);
            }
        }
    }

    #[test]
    fn test_promoted_flag_ignored_by_eq_and_hash() {
        let promoted = Piece::WHITE_PAWN.promoted(PieceKind::Rook);
        assert!(promoted.is_promoted());
        assert_eq!(promoted, Piece::WHITE_ROOK);
        assert_eq!(promoted.index(), Piece::WHITE_ROOK.index());

        let set: HashSet<Piece> = [promoted, Piece::WHITE_ROOK].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_indices_are_unique() {
        let indices: HashSet<usize> = Color::all()
            .into_iter()
            .flat_map(|c| PieceKind::all().map(|k| Piece::new(c, k).index()))
            .collect();
        assert_eq!(indices.len(), Piece::COUNT);
        assert!(indices.iter().all(|&i| i < Piece::COUNT));
    }

    #[test]
    fn test_invalid_letters() {
        assert!(Piece::from_uci('x').is_err());
        assert!("QQ".parse::<Piece>().is_err());
        assert!("".parse::<PieceKind>().is_err());
    }
}
