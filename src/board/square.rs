/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    ops::{Index, IndexMut},
    str::FromStr,
};

use anyhow::{bail, Result};

use crate::Color;

/// Represents a single square on an `8x8` chess board.
///
/// Squares use [Least Significant File Mapping](https://www.chessprogramming.org/Square_Mapping_Considerations#Deduction_on_Files_and_Ranks),
/// so `square = file + rank * 8`:
/// ```text
/// 8| 56 57 58 59 60 61 62 63
/// 7| 48 49 50 51 52 53 54 55
/// 6| 40 41 42 43 44 45 46 47
/// 5| 32 33 34 35 36 37 38 39
/// 4| 24 25 26 27 28 29 30 31
/// 3| 16 17 18 19 20 21 22 23
/// 2|  8  9 10 11 12 13 14 15
/// 1|  0  1  2  3  4  5  6  7
///  +------------------------
///    a  b  c  d  e  f  g  h
/// ```
///
/// A [`Square`] can only be built from an in-range [`File`] and [`Rank`], so every value is on the board.
/// "No square" is expressed as `Option<Square>`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Square(pub(crate) u8);

impl Square {
    pub const A1: Self = Self::new(File::A, Rank::ONE);
    pub const B1: Self = Self::new(File::B, Rank::ONE);
    pub const C1: Self = Self::new(File::C, Rank::ONE);
    pub const D1: Self = Self::new(File::D, Rank::ONE);
    pub const E1: Self = Self::new(File::E, Rank::ONE);
    pub const F1: Self = Self::new(File::F, Rank::ONE);
    pub const G1: Self = Self::new(File::G, Rank::ONE);
    pub const H1: Self = Self::new(File::H, Rank::ONE);

    pub const A2: Self = Self::new(File::A, Rank::TWO);
    pub const B2: Self = Self::new(File::B, Rank::TWO);
    pub const C2: Self = Self::new(File::C, Rank::TWO);
    pub const D2: Self = Self::new(File::D, Rank::TWO);
    pub const E2: Self = Self::new(File::E, Rank::TWO);
    pub const F2: Self = Self::new(File::F, Rank::TWO);
    pub const G2: Self = Self::new(File::G, Rank::TWO);
    pub const H2: Self = Self::new(File::H, Rank::TWO);

    pub const A3: Self = Self::new(File::A, Rank::THREE);
    pub const B3: Self = Self::new(File::B, Rank::THREE);
    pub const C3: Self = Self::new(File::C, Rank::THREE);
    pub const D3: Self = Self::new(File::D, Rank::THREE);
    pub const E3: Self = Self::new(File::E, Rank::THREE);
    pub const F3: Self = Self::new(File::F, Rank::THREE);
    pub const G3: Self = Self::new(File::G, Rank::THREE);
    pub const H3: Self = Self::new(File::H, Rank::THREE);

    pub const A4: Self = Self::new(File::A, Rank::FOUR);
    pub const B4: Self = Self::new(File::B, Rank::FOUR);
    pub const C4: Self = Self::new(File::C, Rank::FOUR);
    pub const D4: Self = Self::new(File::D, Rank::FOUR);
    pub const E4: Self = Self::new(File::E, Rank::FOUR);
    pub const F4: Self = Self::new(File::F, Rank::FOUR);
    pub const G4: Self = Self::new(File::G, Rank::FOUR);
    pub const H4: Self = Self::new(File::H, Rank::FOUR);

    pub const A5: Self = Self::new(File::A, Rank::FIVE);
    pub const B5: Self = Self::new(File::B, Rank::FIVE);
    pub const C5: Self = Self::new(File::C, Rank::FIVE);
    pub const D5: Self = Self::new(File::D, Rank::FIVE);
    pub const E5: Self = Self::new(File::E, Rank::FIVE);
    pub const F5: Self = Self::new(File::F, Rank::FIVE);
    pub const G5: Self = Self::new(File::G, Rank::FIVE);
    pub const H5: Self = Self::new(File::H, Rank::FIVE);

    pub const A6: Self = Self::new(File::A, Rank::SIX);
    pub const B6: Self = Self::new(File::B, Rank::SIX);
    pub const C6: Self = Self::new(File::C, Rank::SIX);
    pub const D6: Self = Self::new(File::D, Rank::SIX);
    pub const E6: Self = Self::new(File::E, Rank::SIX);
    pub const F6: Self = Self::new(File::F, Rank::SIX);
    pub const G6: Self = Self::new(File::G, Rank::SIX);
    pub const H6: Self = Self::new(File::H, Rank::SIX);

    pub const A7: Self = Self::new(File::A, Rank::SEVEN);
    pub const B7: Self = Self::new(File::B, Rank::SEVEN);
    pub const C7: Self = Self::new(File::C, Rank::SEVEN);
    pub const D7: Self = Self::new(File::D, Rank::SEVEN);
    pub const E7: Self = Self::new(File::E, Rank::SEVEN);
    pub const F7: Self = Self::new(File::F, Rank::SEVEN);
    pub const G7: Self = Self::new(File::G, Rank::SEVEN);
    pub const H7: Self = Self::new(File::H, Rank::SEVEN);

    pub const A8: Self = Self::new(File::A, Rank::EIGHT);
    pub const B8: Self = Self::new(File::B, Rank::EIGHT);
    pub const C8: Self = Self::new(File::C, Rank::EIGHT);
    pub const D8: Self = Self::new(File::D, Rank::EIGHT);
    pub const E8: Self = Self::new(File::E, Rank::EIGHT);
    pub const F8: Self = Self::new(File::F, Rank::EIGHT);
    pub const G8: Self = Self::new(File::G, Rank::EIGHT);
    pub const H8: Self = Self::new(File::H, Rank::EIGHT);

    pub const COUNT: usize = 64;

    /// Returns an iterator over all squares, from `a1` to `h8`.
    ///
    /// # Example
    /// ```
    /// # use arbiter::Square;
    /// let mut iter = Square::iter();
    /// assert_eq!(iter.len(), 64);
    /// assert_eq!(iter.next(), Some(Square::A1));
    /// assert_eq!(iter.last(), Some(Square::H8));
    /// ```
    #[inline(always)]
    pub fn iter() -> impl ExactSizeIterator<Item = Self> + DoubleEndedIterator<Item = Self> {
        (0..Self::COUNT as u8).map(Self)
    }

    /// Creates a new [`Square`] from the provided [`File`] and [`Rank`].
    ///
    /// # Example
    /// ```
    /// # use arbiter::{Square, File, Rank};
    /// assert_eq!(Square::new(File::C, Rank::FOUR), Square::C4);
    /// ```
    #[inline(always)]
    pub const fn new(file: File, rank: Rank) -> Self {
        Self(file.0 | rank.0 << 3)
    }

    /// Creates a new [`Square`] from an index in `[0, 63]`.
    ///
    /// # Example
    /// ```
    /// # use arbiter::Square;
    /// assert_eq!(Square::from_index(26).unwrap(), Square::C4);
    /// assert!(Square::from_index(64).is_err());
    /// ```
    #[inline(always)]
    pub fn from_index(index: usize) -> Result<Self> {
        if index >= Self::COUNT {
            bail!("Invalid index for Square: Must be between [0, 63]. Got {index}");
        }
        Ok(Self(index as u8))
    }

    /// Parses a [`Square`] from algebraic notation, like `"e4"`.
    ///
    /// Input is case-insensitive.
    ///
    /// # Example
    /// ```
    /// # use arbiter::Square;
    /// assert_eq!(Square::from_uci("c4").unwrap(), Square::C4);
    /// assert_eq!(Square::from_uci("C4").unwrap(), Square::C4);
    /// assert!(Square::from_uci("z0").is_err());
    /// assert!(Square::from_uci("c44").is_err());
    /// ```
    pub fn from_uci(square: &str) -> Result<Self> {
        let mut chars = square.chars();
        let (Some(file), Some(rank), None) = (chars.next(), chars.next(), chars.next()) else {
            bail!("Invalid Square string: String must contain exactly 2 characters. Got {square:?}")
        };

        Ok(Self::new(File::from_char(file)?, Rank::from_char(rank)?))
    }

    /// Converts this [`Square`] to lowercase algebraic notation.
    ///
    /// # Example
    /// ```
    /// # use arbiter::Square;
    /// assert_eq!(Square::C4.to_uci(), "c4");
    /// ```
    #[inline(always)]
    pub fn to_uci(self) -> String {
        format!("{}{}", self.file(), self.rank())
    }

    /// Fetches the [`File`] of this [`Square`].
    #[inline(always)]
    pub const fn file(&self) -> File {
        File(self.0 & 0b111)
    }

    /// Fetches the [`Rank`] of this [`Square`].
    #[inline(always)]
    pub const fn rank(&self) -> Rank {
        Rank(self.0 >> 3)
    }

    /// Obtain the inner value as a `usize`, for indexing.
    #[inline(always)]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// Returns `true` if this is a light square.
    ///
    /// # Example
    /// ```
    /// # use arbiter::Square;
    /// assert!(!Square::A1.is_light());
    /// assert!(Square::H1.is_light());
    /// ```
    #[inline(always)]
    pub const fn is_light(&self) -> bool {
        (self.file().0 + self.rank().0) % 2 == 1
    }

    /// Signed number of files from `self` to `other`.
    #[inline(always)]
    pub const fn file_delta(&self, other: Self) -> i8 {
        other.file().0 as i8 - self.file().0 as i8
    }

    /// Signed number of ranks from `self` to `other`.
    #[inline(always)]
    pub const fn rank_delta(&self, other: Self) -> i8 {
        other.rank().0 as i8 - self.rank().0 as i8
    }

    /// Absolute number of files between `self` and `other`.
    #[inline(always)]
    pub const fn distance_files(&self, other: Self) -> u8 {
        self.file().0.abs_diff(other.file().0)
    }

    /// Absolute number of ranks between `self` and `other`.
    #[inline(always)]
    pub const fn distance_ranks(&self, other: Self) -> u8 {
        self.rank().0.abs_diff(other.rank().0)
    }

    /// The number of king steps needed to travel from `self` to `other`.
    ///
    /// # Example
    /// ```
    /// # use arbiter::Square;
    /// assert_eq!(Square::A1.distance_chebyshev(Square::H8), 7);
    /// assert_eq!(Square::E4.distance_chebyshev(Square::F6), 2);
    /// ```
    #[inline(always)]
    pub const fn distance_chebyshev(&self, other: Self) -> u8 {
        let files = self.distance_files(other);
        let ranks = self.distance_ranks(other);
        if files > ranks {
            files
        } else {
            ranks
        }
    }

    /// Returns `true` if `self` and `other` share a file or a rank.
    #[inline(always)]
    pub const fn is_orthogonal_to(&self, other: Self) -> bool {
        self.0 != other.0 && (self.file().0 == other.file().0 || self.rank().0 == other.rank().0)
    }

    /// Returns `true` if `self` and `other` lie on the same diagonal.
    #[inline(always)]
    pub const fn is_diagonal_to(&self, other: Self) -> bool {
        self.0 != other.0 && self.distance_files(other) == self.distance_ranks(other)
    }

    /// Returns an iterator over every square strictly between `self` and `other`.
    ///
    /// If the two squares do not share a file, rank, or diagonal, the iterator is empty.
    ///
    /// # Example
    /// ```
    /// # use arbiter::Square;
    /// let between: Vec<_> = Square::A1.between(Square::D4).collect();
    /// assert_eq!(between, [Square::B2, Square::C3]);
    ///
    /// assert_eq!(Square::A1.between(Square::B3).count(), 0);
    /// assert_eq!(Square::E1.between(Square::F1).count(), 0);
    /// ```
    pub fn between(self, other: Self) -> impl Iterator<Item = Self> {
        let aligned = self.is_orthogonal_to(other) || self.is_diagonal_to(other);
        let df = self.file_delta(other).signum();
        let dr = self.rank_delta(other).signum();
        let steps = if aligned {
            self.distance_chebyshev(other).saturating_sub(1)
        } else {
            0
        };

        (1..=steps as i8).filter_map(move |n| self.offset(df * n, dr * n))
    }

    /// Attempt to offset this [`Square`] by the file and rank offsets.
    ///
    /// Returns `None` if the result would be off the board.
    ///
    /// # Example
    /// ```
    /// # use arbiter::Square;
    /// assert_eq!(Square::C4.offset(1, 1), Some(Square::D5));
    /// assert_eq!(Square::C4.offset(-1, -1), Some(Square::B3));
    /// assert_eq!(Square::A1.offset(-1, -1), None);
    /// ```
    #[inline(always)]
    pub const fn offset(&self, file_delta: i8, rank_delta: i8) -> Option<Self> {
        let Some(file) = self.file().offset(file_delta) else {
            return None;
        };

        let Some(rank) = self.rank().offset(rank_delta) else {
            return None;
        };

        Some(Self::new(file, rank))
    }

    /// Moves `n` ranks towards the opponent of `color`, if possible.
    ///
    /// # Example
    /// ```
    /// # use arbiter::{Square, Color};
    /// assert_eq!(Square::C4.forward_by(Color::White, 1), Some(Square::C5));
    /// assert_eq!(Square::C4.forward_by(Color::Black, 2), Some(Square::C2));
    /// assert_eq!(Square::C8.forward_by(Color::White, 1), None);
    /// ```
    #[inline(always)]
    pub const fn forward_by(&self, color: Color, n: u8) -> Option<Self> {
        self.offset(0, n as i8 * color.forward())
    }

    /// Moves `n` ranks towards `color`'s own back rank, if possible.
    #[inline(always)]
    pub const fn backward_by(&self, color: Color, n: u8) -> Option<Self> {
        self.offset(0, -(n as i8) * color.forward())
    }
}

impl FromStr for Square {
    type Err = anyhow::Error;
    /// Wrapper for [`Square::from_uci`].
    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uci(s)
    }
}

impl TryFrom<&str> for Square {
    type Error = anyhow::Error;
    #[inline(always)]
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_uci(value)
    }
}

impl TryFrom<usize> for Square {
    type Error = anyhow::Error;
    #[inline(always)]
    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::from_index(value)
    }
}

impl<T> Index<Square> for [T; Square::COUNT] {
    type Output = T;
    /// A [`Square`] can be used to index into an array of 64 elements.
    #[inline(always)]
    fn index(&self, index: Square) -> &Self::Output {
        &self[index.index()]
    }
}

impl<T> IndexMut<Square> for [T; Square::COUNT] {
    #[inline(always)]
    fn index_mut(&mut self, index: Square) -> &mut Self::Output {
        &mut self[index.index()]
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file(), self.rank())
    }
}

impl fmt::Debug for Square {
    /// Displays the square in algebraic notation and its internal value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self} ({})", self.0)
    }
}

/// Represents one of eight ranks on a chess board.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Rank(pub(crate) u8);

impl Rank {
    pub const ONE: Self = Self(0);
    pub const TWO: Self = Self(1);
    pub const THREE: Self = Self(2);
    pub const FOUR: Self = Self(3);
    pub const FIVE: Self = Self(4);
    pub const SIX: Self = Self(5);
    pub const SEVEN: Self = Self(6);
    pub const EIGHT: Self = Self(7);

    pub const MAX: u8 = 7;
    pub const COUNT: usize = 8;

    /// Returns an iterator over all ranks, from [`Rank::ONE`] to [`Rank::EIGHT`].
    #[inline(always)]
    pub fn iter() -> impl ExactSizeIterator<Item = Self> + DoubleEndedIterator<Item = Self> {
        (0..=Self::MAX).map(Self)
    }

    #[inline(always)]
    pub fn new(rank: u8) -> Result<Self> {
        if rank > Self::MAX {
            bail!("Invalid int for Rank: Must be between [0, {}]. Got {rank}", Self::MAX);
        }
        Ok(Self(rank))
    }

    /// The back rank of `color`.
    #[inline(always)]
    pub const fn first(color: Color) -> Self {
        match color {
            Color::White => Self::ONE,
            Color::Black => Self::EIGHT,
        }
    }

    /// The rank `color`'s pawns start on.
    #[inline(always)]
    pub const fn second(color: Color) -> Self {
        match color {
            Color::White => Self::TWO,
            Color::Black => Self::SEVEN,
        }
    }

    /// The rank a pawn of `color` passes over with a double push.
    #[inline(always)]
    pub const fn third(color: Color) -> Self {
        match color {
            Color::White => Self::THREE,
            Color::Black => Self::SIX,
        }
    }

    /// The rank a pawn of `color` lands on with a double push.
    #[inline(always)]
    pub const fn fourth(color: Color) -> Self {
        match color {
            Color::White => Self::FOUR,
            Color::Black => Self::FIVE,
        }
    }

    /// The rank a pawn of `color` stands on when it may capture en passant.
    #[inline(always)]
    pub const fn fifth(color: Color) -> Self {
        match color {
            Color::White => Self::FIVE,
            Color::Black => Self::FOUR,
        }
    }

    /// The rank `color`'s pawns promote on.
    #[inline(always)]
    pub const fn eighth(color: Color) -> Self {
        Self::first(color.opponent())
    }

    /// Parses a rank from a digit `'1'..='8'`.
    ///
    /// # Example
    /// ```
    /// # use arbiter::Rank;
    /// assert_eq!(Rank::from_char('3').unwrap(), Rank::THREE);
    /// assert!(Rank::from_char('9').is_err());
    /// ```
    #[inline(always)]
    pub fn from_char(rank: char) -> Result<Self> {
        match rank {
            '1'..='8' => Ok(Self(rank as u8 - b'1')),
            _ => bail!("Invalid char for Rank: Must be between ['1', '8']. Got {rank:?}"),
        }
    }

    #[inline(always)]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    #[inline(always)]
    pub const fn char(&self) -> char {
        (self.0 + b'1') as char
    }

    /// Offsets this [`Rank`] by `delta`, returning `None` if it would leave the board.
    #[inline(always)]
    pub const fn offset(self, delta: i8) -> Option<Self> {
        let rank = self.0 as i8 + delta;
        if rank < 0 || rank > Self::MAX as i8 {
            None
        } else {
            Some(Self(rank as u8))
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.char())
    }
}

impl fmt::Debug for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.char(), self.0)
    }
}

/// Represents one of eight files on a chess board.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct File(pub(crate) u8);

impl File {
    pub const A: Self = Self(0);
    pub const B: Self = Self(1);
    pub const C: Self = Self(2);
    pub const D: Self = Self(3);
    pub const E: Self = Self(4);
    pub const F: Self = Self(5);
    pub const G: Self = Self(6);
    pub const H: Self = Self(7);

    pub const MAX: u8 = 7;
    pub const COUNT: usize = 8;

    /// Returns an iterator over all files, from [`File::A`] to [`File::H`].
    #[inline(always)]
    pub fn iter() -> impl ExactSizeIterator<Item = Self> + DoubleEndedIterator<Item = Self> {
        (0..=Self::MAX).map(Self)
    }

    #[inline(always)]
    pub fn new(file: u8) -> Result<Self> {
        if file > Self::MAX {
            bail!("Invalid int for File: Must be between [0, {}]. Got {file}", Self::MAX);
        }
        Ok(Self(file))
    }

    /// Parses a file from a letter `a..=h`, ignoring case.
    ///
    /// # Example
    /// ```
    /// # use arbiter::File;
    /// assert_eq!(File::from_char('c').unwrap(), File::C);
    /// assert_eq!(File::from_char('C').unwrap(), File::C);
    /// assert!(File::from_char('z').is_err());
    /// ```
    #[inline(always)]
    pub fn from_char(file: char) -> Result<Self> {
        match file.to_ascii_lowercase() {
            c @ 'a'..='h' => Ok(Self(c as u8 - b'a')),
            _ => bail!("Invalid char for File: Must be between ['a', 'h']. Got {file:?}"),
        }
    }

    #[inline(always)]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// Lowercase letter of this file.
    #[inline(always)]
    pub const fn char(&self) -> char {
        (self.0 + b'a') as char
    }

    /// Offsets this [`File`] by `delta`, returning `None` if it would leave the board.
    #[inline(always)]
    pub const fn offset(self, delta: i8) -> Option<Self> {
        let file = self.0 as i8 + delta;
        if file < 0 || file > Self::MAX as i8 {
            None
        } else {
            Some(Self(file as u8))
        }
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.char())
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.char(), self.0)
    }
}
