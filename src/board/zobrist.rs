/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use crate::{CastlingRights, Color, File, Piece, Position, Square};

/// Zobrist keys for every feature of a [`Position`].
///
/// Generated at compile time, so keys are identical between runs and builds.
const ZOBRIST_TABLE: ZobristHashTable = ZobristHashTable::new();

/// Seed for the key generator.
const SEED: u64 = 0x2545_F491_4F6C_DD1D;

/// A 64-bit repetition key for a [`Position`].
///
/// Two positions with the same pieces on the same squares, side to move, castling rights,
/// and en passant square have the same key. The move clocks do not affect it.
#[derive(Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct ZobristKey(u64);

impl ZobristKey {
    /// Computes the key of `position` from scratch.
    ///
    /// # Example
    /// ```
    /// # use arbiter::*;
    /// let start = Position::default();
    /// assert_ne!(ZobristKey::new(&start).inner(), 0);
    ///
    /// // Clocks are not part of the key
    /// let later = Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 12 40").unwrap();
    /// assert_eq!(ZobristKey::new(&start), ZobristKey::new(&later));
    /// ```
    pub fn new(position: &Position) -> Self {
        let mut key = Self::default();

        for (square, piece) in position.board().iter() {
            key.hash_piece(square, piece);
        }

        if let Some(ep) = position.ep_square() {
            key.hash(ZOBRIST_TABLE.ep_keys[ep.file().index()]);
        }

        key.hash(ZOBRIST_TABLE.castling_keys[position.castling_rights().index()]);

        if position.side_to_move() == Color::Black {
            key.hash(ZOBRIST_TABLE.black_to_move);
        }

        key
    }

    /// Return the inner `u64` of this key.
    #[inline(always)]
    pub const fn inner(&self) -> u64 {
        self.0
    }

    /// Toggles `hash_key` in this key.
    #[inline(always)]
    fn hash(&mut self, hash_key: u64) {
        self.0 ^= hash_key;
    }

    #[inline(always)]
    fn hash_piece(&mut self, square: Square, piece: Piece) {
        self.hash(ZOBRIST_TABLE.piece_keys[square][piece.index()]);
    }
}

impl fmt::Display for ZobristKey {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

struct ZobristHashTable {
    piece_keys: [[u64; Piece::COUNT]; Square::COUNT],

    /// Keyed by file; the rank of an en passant square follows from the side to move.
    ep_keys: [u64; File::COUNT],

    castling_keys: [u64; CastlingRights::COUNT],

    black_to_move: u64,
}

impl ZobristHashTable {
    const fn new() -> Self {
        let mut state = SEED;
        let mut piece_keys = [[0; Piece::COUNT]; Square::COUNT];
        let mut ep_keys = [0; File::COUNT];
        let mut castling_keys = [0; CastlingRights::COUNT];

        let mut i = 0;
        while i < Square::COUNT {
            let mut j = 0;
            while j < Piece::COUNT {
                let key;
                (key, state) = splitmix64(state);
                piece_keys[i][j] = key;
                j += 1;
            }
            i += 1;
        }

        i = 0;
        while i < File::COUNT {
            let key;
            (key, state) = splitmix64(state);
            ep_keys[i] = key;
            i += 1;
        }

        // No rights at all keeps a zero key
        i = 1;
        while i < CastlingRights::COUNT {
            let key;
            (key, state) = splitmix64(state);
            castling_keys[i] = key;
            i += 1;
        }

        let (black_to_move, _) = splitmix64(state);

        Self {
            piece_keys,
            ep_keys,
            castling_keys,
            black_to_move,
        }
    }
}

/// One step of the SplitMix64 generator, returning `(output, next_state)`.
///
/// See <https://prng.di.unimi.it/splitmix64.c>
const fn splitmix64(state: u64) -> (u64, u64) {
    let state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    (z ^ (z >> 31), state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Move, Position};

    #[test]
    fn test_keys_are_unique() {
        let table = &ZOBRIST_TABLE;
        let mut all: Vec<u64> = table.piece_keys.iter().flatten().copied().collect();
        all.extend(table.ep_keys);
        all.extend(&table.castling_keys[1..]);
        all.push(table.black_to_move);

        let count = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), count);
        assert!(!all.contains(&0));
    }

    #[test]
    fn test_transpositions_share_a_key() {
        let mut a = Position::default();
        let mut b = Position::default();

        for uci in ["g1f3", "g8f6", "b1c3"] {
            a.apply_move(&Move::from_uci(uci, a.side_to_move()).unwrap(), false);
        }
        for uci in ["b1c3", "g8f6", "g1f3"] {
            b.apply_move(&Move::from_uci(uci, b.side_to_move()).unwrap(), false);
        }

        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), Position::default().key());
    }

    #[test]
    fn test_state_changes_the_key() {
        let base = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let black = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1").unwrap();
        let fewer_rights = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w Kkq - 0 1").unwrap();

        assert_ne!(base.key(), black.key());
        assert_ne!(base.key(), fewer_rights.key());
    }

    #[test]
    fn test_promoted_flag_does_not_change_the_key() {
        let plain = Position::from_fen("4k3/8/8/8/8/8/8/Q3K3 w - - 0 1").unwrap();
        let promoted = Position::from_fen("4k3/8/8/8/8/8/8/Q~3K3 w - - 0 1").unwrap();
        assert_eq!(plain.key(), promoted.key());
    }
}
