/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Reading and writing [Forsyth-Edwards Notation](https://www.chessprogramming.org/Forsyth-Edwards_Notation).

use std::{fmt, str::FromStr};

use anyhow::{anyhow, bail, Context, Result};

use crate::{
    Board, CastleSide, CastlingRights, Color, File, Move, Piece, Position, Rank, Square,
};

/// Every letter that may appear in the placement field of a FEN, and the piece it stands for.
const FEN_PIECES: [(char, Piece); Piece::COUNT] = [
    ('P', Piece::WHITE_PAWN),
    ('N', Piece::WHITE_KNIGHT),
    ('B', Piece::WHITE_BISHOP),
    ('R', Piece::WHITE_ROOK),
    ('Q', Piece::WHITE_QUEEN),
    ('K', Piece::WHITE_KING),
    ('p', Piece::BLACK_PAWN),
    ('n', Piece::BLACK_KNIGHT),
    ('b', Piece::BLACK_BISHOP),
    ('r', Piece::BLACK_ROOK),
    ('q', Piece::BLACK_QUEEN),
    ('k', Piece::BLACK_KING),
];

/// Marks the preceding piece as the result of a promotion.
const PROMOTED_MARKER: char = '~';

/// The variant of chess being played.
///
/// Only affects how castling rights are written: Chess960 names the files of the castling Rooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameVariant {
    #[default]
    Standard,
    Chess960,
}

/// How FEN strings are read and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FenConfig {
    /// Number of space-separated fields: [`FenConfig::FULL`] or [`FenConfig::EPD`].
    pub field_count: usize,

    /// Castling notation to write.
    pub variant: GameVariant,
}

impl FenConfig {
    /// All six fields, including both move clocks.
    pub const FULL: usize = 6;

    /// The first four fields only, as in EPD records. Clocks default to `0 1`.
    pub const EPD: usize = 4;

    /// Creates a new [`FenConfig`], rejecting field counts other than 4 and 6.
    pub fn new(field_count: usize, variant: GameVariant) -> Result<Self> {
        if field_count != Self::FULL && field_count != Self::EPD {
            bail!(
                "FEN field count must be {} or {}. Got {field_count}",
                Self::FULL,
                Self::EPD
            );
        }

        Ok(Self {
            field_count,
            variant,
        })
    }

    /// Full six-field FEN with Chess960 castling notation.
    #[inline(always)]
    pub const fn chess960() -> Self {
        Self {
            field_count: Self::FULL,
            variant: GameVariant::Chess960,
        }
    }
}

impl Default for FenConfig {
    fn default() -> Self {
        Self {
            field_count: Self::FULL,
            variant: GameVariant::Standard,
        }
    }
}

impl Board {
    /// Parses the placement field of a FEN.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// let board = Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR").unwrap();
    /// assert_eq!(board, Board::standard());
    ///
    /// assert!(Board::from_fen("8/8/8/8/8/8/8").is_err());
    /// assert!(Board::from_fen("9/8/8/8/8/8/8/8").is_err());
    /// ```
    pub fn from_fen(placement: &str) -> Result<Self> {
        let rows: Vec<&str> = placement.split('/').collect();
        if rows.len() != Rank::COUNT {
            bail!(
                "FEN placement must have {} rows separated by '/'. Got {} in {placement:?}",
                Rank::COUNT,
                rows.len()
            );
        }

        let mut grid = [[None; File::COUNT]; Rank::COUNT];
        for (row, text) in rows.into_iter().enumerate() {
            grid[row] = parse_row(text).context(format!("Invalid FEN row {}", row + 1))?;
        }

        Ok(Self::from_rows(grid))
    }

    /// Writes this board as the placement field of a FEN, rank 8 first.
    pub fn to_fen(&self) -> String {
        let mut placement = String::with_capacity(64);

        for (i, row) in self.rows().iter().enumerate() {
            if i > 0 {
                placement.push('/');
            }

            let mut empty = 0;
            for cell in row {
                match cell {
                    Some(piece) => {
                        if empty > 0 {
                            placement.push_str(&empty.to_string());
                            empty = 0;
                        }
                        placement.push(piece.to_uci());
                        if piece.is_promoted() {
                            placement.push(PROMOTED_MARKER);
                        }
                    }
                    None => empty += 1,
                }
            }

            if empty > 0 {
                placement.push_str(&empty.to_string());
            }
        }

        placement
    }
}

/// Expands one `/`-separated row of a FEN placement into eight cells.
fn parse_row(text: &str) -> Result<[Option<Piece>; File::COUNT]> {
    let mut cells: [Option<Piece>; File::COUNT] = [None; File::COUNT];
    let mut col = 0;
    let mut last_was_piece = false;

    for c in text.chars() {
        if c == PROMOTED_MARKER {
            if !last_was_piece {
                bail!("misplaced {PROMOTED_MARKER:?} in {text:?}: it must follow a piece");
            }
            if let Some(piece) = cells[col - 1] {
                cells[col - 1] = Some(piece.with_promoted_flag());
            }
            last_was_piece = false;
        } else if let Some(empty) = c.to_digit(10) {
            if empty == 0 {
                bail!("Empty square count in {text:?} must be at least 1");
            }
            col += empty as usize;
            if col > File::COUNT {
                bail!("Row {text:?} describes more than {} squares", File::COUNT);
            }
            last_was_piece = false;
        } else {
            let piece = fen_piece(c).ok_or_else(|| anyhow!("Unknown piece letter {c:?} in {text:?}"))?;
            if col >= File::COUNT {
                bail!("Row {text:?} describes more than {} squares", File::COUNT);
            }
            cells[col] = Some(piece);
            col += 1;
            last_was_piece = true;
        }
    }

    if col != File::COUNT {
        bail!(
            "Row {text:?} describes {col} squares; it must describe exactly {}",
            File::COUNT
        );
    }

    Ok(cells)
}

#[inline(always)]
fn fen_piece(c: char) -> Option<Piece> {
    FEN_PIECES
        .iter()
        .find_map(|&(letter, piece)| (letter == c).then_some(piece))
}

/// Parses a move clock, which must be written with digits only.
fn parse_clock(field: &str, name: &str) -> Result<usize> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_digit()) {
        bail!("{name} must be a non-negative integer. Got {field:?}");
    }
    field
        .parse()
        .context(format!("{name} {field:?} is out of range"))
}

/// Castling rights, plus any Rook files named explicitly (Shredder-FEN letters).
fn parse_castling(
    field: &str,
    board: &Board,
) -> Result<(CastlingRights, Vec<(Color, CastleSide, File)>)> {
    let mut rights = CastlingRights::empty();
    let mut files = Vec::new();

    if field == "-" {
        return Ok((rights, files));
    }

    for c in field.chars() {
        let color = Color::from_case(c);
        let side = match c.to_ascii_lowercase() {
            'k' => CastleSide::Short,
            'q' => CastleSide::Long,
            'a'..='h' => {
                let file = File::from_char(c)?;
                let king = board
                    .king(color)
                    .filter(|king| king.rank() == Rank::first(color))
                    .ok_or_else(|| {
                        anyhow!("Castling right {c:?} requires a {} king on its back rank", color.name())
                    })?;
                let side = if file > king.file() {
                    CastleSide::Short
                } else {
                    CastleSide::Long
                };
                files.push((color, side, file));
                side
            }
            _ => bail!("Invalid castling rights {field:?}: unexpected {c:?}"),
        };
        rights |= CastlingRights::flag(color, side);
    }

    Ok((rights, files))
}

impl Position {
    /// Parses a six-field FEN string.
    ///
    /// Castling rights may be written as `KQkq` or with Rook files (`HAha`), so Chess960 positions parse too.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// let pos = Position::from_fen(FEN_STARTPOS).unwrap();
    /// assert_eq!(pos, Position::default());
    /// assert_eq!(pos.to_fen(), FEN_STARTPOS);
    ///
    /// assert!(Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -").is_err());
    /// ```
    #[inline(always)]
    pub fn from_fen(fen: &str) -> Result<Self> {
        Self::from_fen_with(fen, FenConfig::default())
    }

    /// Parses a FEN string with `config.field_count` fields.
    pub fn from_fen_with(fen: &str, config: FenConfig) -> Result<Self> {
        let fields: Vec<&str> = fen.split_ascii_whitespace().collect();
        if fields.len() != config.field_count {
            bail!(
                "FEN must have {} fields. Got {} in {fen:?}",
                config.field_count,
                fields.len()
            );
        }

        let board = Board::from_fen(fields[0])?;

        let side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => bail!("Side to move must be 'w' or 'b'. Got {other:?}"),
        };

        let (castling_rights, rook_files) = parse_castling(fields[2], &board)?;

        let ep_square = match fields[3] {
            "-" => None,
            square => Some(
                Square::from_uci(square).context(format!("Invalid en passant square {square:?}"))?,
            ),
        };

        let (halfmove, fullmove) = if config.field_count == FenConfig::FULL {
            (
                parse_clock(fields[4], "Halfmove clock")?,
                parse_clock(fields[5], "Fullmove number")?,
            )
        } else {
            (0, 1)
        };

        let mut position = Self::new(
            board,
            side_to_move,
            castling_rights,
            ep_square,
            halfmove,
            fullmove,
        )
        .context(format!("Invalid position {fen:?}"))?;

        for (color, side, file) in rook_files {
            position.set_rook_file(color, side, file);
        }

        Ok(position)
    }

    /// Writes this position as a six-field FEN string with standard castling notation.
    #[inline(always)]
    pub fn to_fen(&self) -> String {
        self.to_fen_with(FenConfig::default())
    }

    /// Writes this position as a FEN string, according to `config`.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// let pos = Position::default();
    /// let epd = FenConfig::new(4, GameVariant::Standard).unwrap();
    /// assert_eq!(pos.to_fen_with(epd), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -");
    /// assert_eq!(pos.to_fen_with(FenConfig::chess960()), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w HAha - 0 1");
    /// ```
    pub fn to_fen_with(&self, config: FenConfig) -> String {
        let ep = self
            .ep_square()
            .map_or_else(|| String::from("-"), |square| square.to_uci());

        let mut fen = format!(
            "{} {} {} {ep}",
            self.board().to_fen(),
            self.side_to_move().to_uci(),
            self.castling_field(config.variant),
        );

        if config.field_count == FenConfig::FULL {
            fen.push_str(&format!(" {} {}", self.halfmove(), self.fullmove()));
        }

        fen
    }

    fn castling_field(&self, variant: GameVariant) -> String {
        let mut field = String::with_capacity(4);

        for color in Color::all() {
            for side in CastleSide::all() {
                if !self.castling_rights().has(color, side) {
                    continue;
                }

                let letter = match variant {
                    GameVariant::Standard => match side {
                        CastleSide::Short => 'k',
                        CastleSide::Long => 'q',
                    },
                    GameVariant::Chess960 => self.rook_file(color, side).char(),
                };

                field.push(match color {
                    Color::White => letter.to_ascii_uppercase(),
                    Color::Black => letter,
                });
            }
        }

        if field.is_empty() {
            field.push('-');
        }
        field
    }
}

impl FromStr for Position {
    type Err = anyhow::Error;
    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}

impl fmt::Display for Position {
    /// Writes the FEN of this position. The alternate form (`{:#}`) uses Chess960 castling notation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = if f.alternate() {
            FenConfig::chess960()
        } else {
            FenConfig::default()
        };
        write!(f, "{}", self.to_fen_with(config))
    }
}

/// Everything needed to start a game somewhere other than the standard position.
///
/// Consumed by [`Game::from_creation_data`](crate::Game::from_creation_data), which replays `moves`
/// from the described position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameCreationData {
    pub board: Board,
    pub side_to_move: Color,
    pub castling_rights: CastlingRights,
    pub ep_square: Option<Square>,
    pub halfmove: usize,
    pub fullmove: usize,
    pub moves: Vec<Move>,
}

impl GameCreationData {
    /// Creates [`GameCreationData`] for the position described by `fen`, with no moves to replay.
    pub fn from_fen(fen: &str) -> Result<Self> {
        let position = Position::from_fen(fen)?;
        Ok(Self {
            board: *position.board(),
            side_to_move: position.side_to_move(),
            castling_rights: position.castling_rights(),
            ep_square: position.ep_square(),
            halfmove: position.halfmove(),
            fullmove: position.fullmove(),
            moves: Vec::new(),
        })
    }

    /// The starting position these parts describe, before any moves are replayed.
    pub fn position(&self) -> Result<Position> {
        Position::new(
            self.board,
            self.side_to_move,
            self.castling_rights,
            self.ep_square,
            self.halfmove,
            self.fullmove,
        )
    }
}

impl Default for GameCreationData {
    fn default() -> Self {
        let position = Position::default();
        Self {
            board: *position.board(),
            side_to_move: position.side_to_move(),
            castling_rights: position.castling_rights(),
            ep_square: None,
            halfmove: 0,
            fullmove: 1,
            moves: Vec::new(),
        }
    }
}

impl FromStr for GameCreationData {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FEN_KIWIPETE, FEN_STARTPOS};

    #[test]
    fn test_round_trips() {
        let fens = [
            FEN_STARTPOS,
            FEN_KIWIPETE,
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
            "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/8/8/8/8/8/8/R3K2R b Kq - 17 42",
            "4k3/8/8/8/8/8/8/Q~3K3 w - - 0 1",
        ];

        for fen in fens {
            let pos = Position::from_fen(fen).unwrap();
            assert_eq!(pos.to_fen(), fen);
            assert_eq!(pos.to_string(), fen);
            assert_eq!(fen.parse::<Position>().unwrap(), pos);
        }
    }

    #[test]
    fn test_promoted_marker() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/Q~3K3 w - - 0 1").unwrap();
        assert!(pos.board().get(Square::A1).unwrap().is_promoted());

        assert!(Position::from_fen("4k3/8/8/8/8/8/8/~Q3K3 w - - 0 1").is_err());
        assert!(Position::from_fen("4k3/8/8/8/8/8/8/1~Q2K3 w - - 0 1").is_err());
        assert!(Position::from_fen("4k3/8/8/8/8/8/8/Q~~3K3 w - - 0 1").is_err());
    }

    #[test]
    fn test_structural_errors() {
        let bad = [
            "",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1 extra",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR/8 w KQkq - 0 1",
            "rnbqkbnr/ppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/ppppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/44/8/8/8/PPPPPPPP/RNBQKBNX w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR W KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR white KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQxq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e9 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - -1 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 one",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - +3 1",
        ];

        for fen in bad {
            assert!(Position::from_fen(fen).is_err(), "{fen:?} should not parse");
        }
    }

    #[test]
    fn test_en_passant_cross_check() {
        // White to move: the target must be on rank 6, in front of a black pawn on rank 5
        assert!(Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2").is_ok());
        assert!(Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - e6 0 2").is_err());
        assert!(Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d3 0 2").is_err());

        // Black to move: rank 3, in front of a white pawn on rank 4
        assert!(Position::from_fen("4k3/8/8/8/3Pp3/8/8/4K3 b - d3 0 1").is_ok());
        assert!(Position::from_fen("4k3/8/8/8/3Pp3/8/8/4K3 b - d6 0 1").is_err());
    }

    #[test]
    fn test_castling_field_replaces_rights() {
        let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w Kq - 0 1").unwrap();
        assert_eq!(
            pos.castling_rights(),
            CastlingRights::WHITE_KING_SIDE | CastlingRights::BLACK_QUEEN_SIDE
        );

        let none = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w - - 0 1").unwrap();
        assert_eq!(none.castling_rights(), CastlingRights::empty());
        assert!(none.to_fen().contains(" w - - "));
    }

    #[test]
    fn test_chess960_castling_notation() {
        let fen = "bqnbrkrn/pppppppp/8/8/8/8/PPPPPPPP/BQNBRKRN w GEge - 0 1";
        let pos = Position::from_fen(fen).unwrap();
        assert_eq!(pos.rook_file(Color::White, CastleSide::Short), File::G);
        assert_eq!(pos.rook_file(Color::White, CastleSide::Long), File::E);
        assert_eq!(format!("{pos:#}"), fen);
        assert_eq!(
            pos.to_fen(),
            "bqnbrkrn/pppppppp/8/8/8/8/PPPPPPPP/BQNBRKRN w KQkq - 0 1"
        );

        // Shredder letters pick a rook that is not the outermost one
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/RR2K3 w B - 0 1").unwrap();
        assert_eq!(pos.rook_file(Color::White, CastleSide::Long), File::B);
        assert_eq!(format!("{pos:#}"), "4k3/8/8/8/8/8/8/RR2K3 w B - 0 1");
    }

    #[test]
    fn test_epd_fields() {
        let epd = FenConfig::new(FenConfig::EPD, GameVariant::Standard).unwrap();
        let pos = Position::from_fen_with("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -", epd)
            .unwrap();
        assert_eq!(pos, Position::default());
        assert_eq!((pos.halfmove(), pos.fullmove()), (0, 1));

        assert!(Position::from_fen_with(FEN_STARTPOS, epd).is_err());
        assert!(FenConfig::new(5, GameVariant::Standard).is_err());
    }

    #[test]
    fn test_creation_data() {
        let data = GameCreationData::from_fen(FEN_KIWIPETE).unwrap();
        assert_eq!(data.position().unwrap(), Position::from_fen(FEN_KIWIPETE).unwrap());
        assert_eq!(GameCreationData::default().position().unwrap(), Position::default());
    }
}
