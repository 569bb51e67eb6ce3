/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{fmt, ops::Deref, str::FromStr};

use anyhow::{anyhow, bail, Context, Result};

use crate::{
    san, BookMove, Color, DetailedMove, FenConfig, GameCreationData, Move, MoveType, Position,
    ZobristKey,
};

/// Number of plies without a capture or pawn move after which a draw may be claimed.
const FIFTY_MOVE_PLIES: usize = 100;

/// Number of times a position must occur for a threefold repetition.
const REPETITIONS: usize = 3;

/// The state of a game, as judged from its current position and history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameResult {
    OnGoing,
    ThreeFoldRepeat,
    FiftyRuleRepeat,
    Stalemated,
    InsufficientMaterial,
    /// The side to move is in check, but has legal moves.
    Check,
    /// The side to move is checkmated.
    Mate,
    WhiteResign,
    BlackResign,
    WhiteTimeout,
    BlackTimeout,
    /// A King is missing from the board.
    Unknown,
}

impl GameResult {
    /// Returns `true` if no more moves should be played.
    #[inline(always)]
    pub const fn is_over(&self) -> bool {
        !matches!(self, Self::OnGoing | Self::Check)
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::OnGoing => "ongoing",
            Self::ThreeFoldRepeat => "draw by threefold repetition",
            Self::FiftyRuleRepeat => "draw by the fifty-move rule",
            Self::Stalemated => "draw by stalemate",
            Self::InsufficientMaterial => "draw by insufficient material",
            Self::Check => "check",
            Self::Mate => "checkmate",
            Self::WhiteResign => "white resigned",
            Self::BlackResign => "black resigned",
            Self::WhiteTimeout => "white lost on time",
            Self::BlackTimeout => "black lost on time",
            Self::Unknown => "unknown",
        };
        write!(f, "{text}")
    }
}

/// A game of chess: a [`Position`] plus the moves that led to it.
///
/// Moves are recorded with their SAN and everything needed to take them back.
/// Undone moves are kept until a new move is made, so they can be redone.
///
/// The basic methods you're probably looking for are [`Game::from_fen`], [`Game::make_move`], and [`Game::result`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    /// The current position.
    position: Position,

    /// The position the game started from, for [`Game::reset`] and movetext numbering.
    start: Position,

    /// Applied moves. Entries at or past `cursor` have been undone.
    history: Vec<DetailedMove>,

    /// Number of moves currently applied.
    cursor: usize,

    /// Repetition key of every position reached so far, including the start. Always `cursor + 1` long.
    keys: Vec<ZobristKey>,

    resigned: Option<Color>,

    timeouts: [bool; Color::COUNT],

    draw_claimed: bool,

    config: FenConfig,
}

impl Game {
    /// Creates a new [`Game`] from the standard starting position.
    #[inline(always)]
    pub fn new() -> Self {
        Self::from_position(Position::default())
    }

    /// Creates a new [`Game`] starting from `position`.
    pub fn from_position(position: Position) -> Self {
        Self {
            position,
            start: position,
            history: Vec::new(),
            cursor: 0,
            keys: vec![position.key()],
            resigned: None,
            timeouts: [false; Color::COUNT],
            draw_claimed: false,
            config: FenConfig::default(),
        }
    }

    /// Creates a new [`Game`] from a six-field FEN string.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// let game = Game::from_fen(FEN_KIWIPETE).unwrap();
    /// assert_eq!(game.fen(), FEN_KIWIPETE);
    /// assert!(Game::from_fen("not a fen").is_err());
    /// ```
    #[inline(always)]
    pub fn from_fen(fen: &str) -> Result<Self> {
        Self::from_fen_with(fen, FenConfig::default())
    }

    /// Creates a new [`Game`] from a FEN string, reading and writing FENs according to `config`.
    pub fn from_fen_with(fen: &str, config: FenConfig) -> Result<Self> {
        let mut game = Self::from_position(Position::from_fen_with(fen, config)?);
        game.config = config;
        Ok(game)
    }

    /// Creates a new [`Game`] from its parts, replaying `data.moves` in order.
    ///
    /// Fails if the position is malformed or any of the moves is not legal when it is reached.
    pub fn from_creation_data(data: GameCreationData) -> Result<Self> {
        let mut game = Self::from_position(data.position()?);

        for (i, mv) in data.moves.iter().enumerate() {
            if !game.make_move(mv, false).is_valid() {
                bail!(
                    "Move {} ({mv:?}) is not legal in position {}",
                    i + 1,
                    game.fen()
                );
            }
        }

        Ok(game)
    }

    /// The current position.
    #[inline(always)]
    pub const fn position(&self) -> &Position {
        &self.position
    }

    /// The position this game started from.
    #[inline(always)]
    pub const fn start(&self) -> &Position {
        &self.start
    }

    /// The moves currently applied, oldest first.
    #[inline(always)]
    pub fn history(&self) -> &[DetailedMove] {
        &self.history[..self.cursor]
    }

    /// The most recently applied move.
    #[inline(always)]
    pub fn last_move(&self) -> Option<&DetailedMove> {
        self.history().last()
    }

    #[inline(always)]
    pub const fn config(&self) -> FenConfig {
        self.config
    }

    /// Changes how this game reads and writes FEN strings.
    #[inline(always)]
    pub fn set_config(&mut self, config: FenConfig) {
        self.config = config;
    }

    /// Validates `mv` (unless `already_validated`), applies it, and records it.
    ///
    /// Any undone moves waiting to be redone are discarded.
    /// Returns [`MoveType::INVALID`] if the move was rejected, leaving the game untouched.
    ///
    /// # Panics
    ///
    /// If `already_validated` is `true` and there is no piece on the origin square.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// let mut game = Game::default();
    /// let result = game.make_move(&Move::new(Square::E2, Square::E4, Color::White), false);
    /// assert!(result.contains(MoveType::MOVE));
    /// assert_eq!(game.last_move().unwrap().san(), "e4");
    ///
    /// let result = game.make_move(&Move::new(Square::E2, Square::E4, Color::White), false);
    /// assert_eq!(result, MoveType::INVALID);
    /// ```
    pub fn make_move(&mut self, mv: &Move, already_validated: bool) -> MoveType {
        if !already_validated && !self.position.is_valid_move(mv, true, true) {
            return MoveType::INVALID;
        }

        self.history.truncate(self.cursor);
        self.push_move(mv)
    }

    /// Applies `mv` at the cursor and records it, replacing any entry already recorded there.
    fn push_move(&mut self, mv: &Move) -> MoveType {
        let ambiguous = san::ambiguities(&self.position, mv);
        let mut applied = self.position.apply_unchecked(mv);
        applied.san = san::render(&applied, &ambiguous, &self.position);
        let move_type = applied.move_type;

        if self.cursor < self.history.len() {
            self.history[self.cursor] = applied;
        } else {
            self.history.push(applied);
        }
        self.cursor += 1;
        self.keys.push(self.position.key());

        move_type
    }

    /// Parses `uci` as a move for the side to move and plays it.
    ///
    /// Fails if the text is malformed or the move is not legal.
    pub fn make_move_uci(&mut self, uci: &str) -> Result<MoveType> {
        let mv = Move::from_uci(uci, self.side_to_move())?;
        let result = self.make_move(&mv, false);
        if !result.is_valid() {
            bail!("Illegal move {uci:?} in position {}", self.fen());
        }
        Ok(result)
    }

    /// Resolves `san` to a legal move for the side to move and plays it.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// let mut game = Game::default();
    /// for san in ["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"] {
    ///     game.make_move_san(san).unwrap();
    /// }
    /// assert_eq!(game.movetext(), "1. e4 e5 2. Nf3 Nc6 3. Bb5 a6");
    /// assert!(game.make_move_san("Qd8").is_err());
    /// ```
    pub fn make_move_san(&mut self, san: &str) -> Result<MoveType> {
        let mv = self.move_from_san(san)?;
        Ok(self.make_move(&mv, true))
    }

    /// Plays a move written either as UCI text or as SAN.
    pub fn make_move_str(&mut self, text: &str) -> Result<MoveType> {
        if let Ok(mv) = Move::from_uci(text, self.side_to_move()) {
            if self.position.is_valid_move(&mv, true, true) {
                return Ok(self.make_move(&mv, true));
            }
        }

        self.make_move_san(text)
            .with_context(|| format!("{text:?} is neither a legal UCI move nor legal SAN"))
    }

    /// Finds the legal move for the side to move whose SAN is `san`.
    ///
    /// Check, mate, and annotation marks (`+#!?`) are ignored, `=` before a promotion is optional,
    /// and `0-0`/`0-0-0` are accepted for castling.
    pub fn move_from_san(&self, san: &str) -> Result<Move> {
        let wanted = normalize_san(san);
        if wanted.is_empty() {
            bail!("Empty SAN");
        }

        let mut matches = self.position.legal_moves().into_iter().filter(|mv| {
            let ambiguous = san::ambiguities(&self.position, mv);
            let mut probe = self.position;
            let applied = probe.apply_unchecked(mv);
            normalize_san(&san::body(&applied, &ambiguous)) == wanted
        });

        let mv = matches
            .next()
            .ok_or_else(|| anyhow!("No legal move matches {san:?} in position {}", self.fen()))?;
        if matches.next().is_some() {
            bail!("{san:?} is ambiguous in position {}", self.fen());
        }

        Ok(mv)
    }

    /// Takes back the last move. Returns `false` if there was nothing to undo.
    ///
    /// Clears any timeouts.
    pub fn undo(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }

        self.cursor -= 1;
        self.position.revert(&self.history[self.cursor]);
        self.keys.pop();
        self.timeouts = [false; Color::COUNT];
        true
    }

    /// Takes back up to `n` moves, returning how many were taken back.
    pub fn undo_n(&mut self, n: usize) -> usize {
        (0..n).take_while(|_| self.undo()).count()
    }

    /// Re-applies the next undone move. Returns `false` if there was nothing to redo.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// let mut game = Game::default();
    /// game.make_move_uci("e2e4").unwrap();
    /// assert!(game.undo());
    /// assert_eq!(game.fen(), FEN_STARTPOS);
    /// assert!(game.redo());
    /// assert_eq!(game.last_move().unwrap().san(), "e4");
    /// assert!(!game.redo());
    /// ```
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.get(self.cursor) else {
            return false;
        };

        let mv = next.mv();
        self.push_move(&mv);
        true
    }

    #[inline(always)]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[inline(always)]
    pub fn can_redo(&self) -> bool {
        self.cursor < self.history.len()
    }

    /// Judges the game from its current state, in priority order:
    /// resignation, missing King, stalemate, insufficient material, threefold repetition,
    /// fifty-move rule, checkmate, check, timeout.
    pub fn result(&self) -> GameResult {
        if let Some(color) = self.resigned {
            return match color {
                Color::White => GameResult::WhiteResign,
                Color::Black => GameResult::BlackResign,
            };
        }

        if Color::all()
            .into_iter()
            .any(|color| self.board().king(color).is_none())
        {
            return GameResult::Unknown;
        }

        let side = self.side_to_move();
        if self.is_stalemated(side) {
            GameResult::Stalemated
        } else if self.is_insufficient_material() {
            GameResult::InsufficientMaterial
        } else if self.is_threefold_repetition() {
            GameResult::ThreeFoldRepeat
        } else if self.is_fifty_move_draw() {
            GameResult::FiftyRuleRepeat
        } else if self.is_checkmated(side) {
            GameResult::Mate
        } else if self.is_in_check(side) {
            GameResult::Check
        } else if self.timeouts[Color::White] {
            GameResult::WhiteTimeout
        } else if self.timeouts[Color::Black] {
            GameResult::BlackTimeout
        } else {
            GameResult::OnGoing
        }
    }

    /// Returns `true` if the current position has occurred at least three times.
    pub fn is_threefold_repetition(&self) -> bool {
        let Some(current) = self.keys.last() else {
            return false;
        };
        self.keys.iter().filter(|&key| key == current).count() >= REPETITIONS
    }

    /// Returns `true` if a hundred plies have passed without a capture or pawn move.
    #[inline(always)]
    pub fn is_fifty_move_draw(&self) -> bool {
        self.halfmove() >= FIFTY_MOVE_PLIES
    }

    /// Returns `true` if a draw was claimed, or the game is drawn by rule.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// assert!(Game::from_fen("8/8/4k3/8/8/3K4/8/8 w - - 0 1").unwrap().is_draw());
    /// assert!(!Game::default().is_draw());
    /// ```
    pub fn is_draw(&self) -> bool {
        self.draw_claimed
            || Color::all().into_iter().any(|color| self.is_stalemated(color))
            || self.is_insufficient_material()
            || self.is_threefold_repetition()
            || self.is_fifty_move_draw()
    }

    /// Returns `true` if `color` has won by checkmate, resignation, or timeout.
    pub fn is_winner(&self, color: Color) -> bool {
        match self.result() {
            GameResult::Mate => self.side_to_move() != color,
            GameResult::WhiteResign | GameResult::WhiteTimeout => color == Color::Black,
            GameResult::BlackResign | GameResult::BlackTimeout => color == Color::White,
            _ => false,
        }
    }

    /// Records that `color` resigned.
    #[inline(always)]
    pub fn resign(&mut self, color: Color) {
        self.resigned = Some(color);
    }

    /// Records that `color` ran out of time.
    #[inline(always)]
    pub fn set_timeout(&mut self, color: Color) {
        self.timeouts[color] = true;
    }

    /// Records that the players agreed to, or claimed, a draw.
    #[inline(always)]
    pub fn claim_draw(&mut self) {
        self.draw_claimed = true;
    }

    /// Returns to the starting position, forgetting every move and flag.
    pub fn reset(&mut self) {
        let config = self.config;
        *self = Self::from_position(self.start);
        self.config = config;
    }

    /// The FEN of the current position, written according to this game's [`FenConfig`].
    #[inline(always)]
    pub fn fen(&self) -> String {
        self.position.to_fen_with(self.config)
    }

    /// The 64-bit repetition key of the current position.
    #[inline(always)]
    pub fn key(&self) -> u64 {
        self.position.key().inner()
    }

    /// The applied moves as PGN movetext, like `1. e4 e5 2. Nf3`.
    ///
    /// If Black moved first, the text starts with `N...`.
    pub fn movetext(&self) -> String {
        let mut text = String::new();
        let mut number = self.start.fullmove();

        for (i, applied) in self.history().iter().enumerate() {
            match applied.piece().color() {
                Color::White => {
                    if i > 0 {
                        text.push(' ');
                    }
                    text.push_str(&format!("{number}. {}", applied.san()));
                }
                Color::Black => {
                    if i == 0 {
                        text.push_str(&format!("{number}... {}", applied.san()));
                    } else {
                        text.push(' ');
                        text.push_str(applied.san());
                    }
                    number += 1;
                }
            }
        }

        text
    }

    /// Decodes a raw opening-book move and returns it only if it is legal in the current position.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// let game = Game::default();
    /// let e2e4 = BookMove::encode(&Move::new(Square::E2, Square::E4, Color::White));
    /// assert_eq!(game.book_move(e2e4.0), Some(Move::new(Square::E2, Square::E4, Color::White)));
    ///
    /// let e2e5 = BookMove::encode(&Move::new(Square::E2, Square::E5, Color::White));
    /// assert_eq!(game.book_move(e2e5.0), None);
    /// ```
    pub fn book_move(&self, raw: u16) -> Option<Move> {
        let mv = BookMove(raw).to_move(self.side_to_move()).ok()?;
        self.position.is_valid_move(&mv, true, true).then_some(mv)
    }
}

/// Strips decorations that do not identify a move, so SAN written by hand compares equal to generated SAN.
fn normalize_san(san: &str) -> String {
    san.trim()
        .trim_end_matches(['+', '#', '!', '?'])
        .chars()
        .filter(|&c| c != '=')
        .map(|c| if c == '0' { 'O' } else { c })
        .collect()
}

impl Default for Game {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Game {
    type Target = Position;
    /// A [`Game`] immutably dereferences to a [`Position`], for simplicity.
    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.position
    }
}

impl FromStr for Game {
    type Err = anyhow::Error;
    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fen())
    }
}
