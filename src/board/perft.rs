/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::Position;

/// Counts the leaf nodes of the legal move tree of `position`, `depth` plies deep.
///
/// This performs bulk counting: at depth 1, it returns the number of legal moves
/// rather than making each of them.
///
/// # Example
/// ```
/// # use arbiter::*;
/// let pos = Position::default();
/// assert_eq!(perft(&pos, 0), 1);
/// assert_eq!(perft(&pos, 1), 20);
/// assert_eq!(perft(&pos, 2), 400);
/// ```
pub fn perft(position: &Position, depth: usize) -> u64 {
    match depth {
        0 => 1,
        1 => position.legal_moves().len() as u64,
        _ => position.legal_moves().into_iter().fold(0, |nodes, mv| {
            let mut child = *position;
            child.apply_unchecked(&mv);
            nodes + perft(&child, depth - 1)
        }),
    }
}

/// Like [`perft`], but also returns the node count below each root move, in generation order.
pub fn splitperft(position: &Position, depth: usize) -> (u64, Vec<(String, u64)>) {
    if depth == 0 {
        return (1, Vec::new());
    }

    let split: Vec<_> = position
        .legal_moves()
        .into_iter()
        .map(|mv| {
            let mut child = *position;
            child.apply_unchecked(&mv);
            (mv.to_uci(), perft(&child, depth - 1))
        })
        .collect();

    (split.iter().map(|(_, nodes)| nodes).sum(), split)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splitperft_sums_to_perft() {
        let pos = Position::from_fen(crate::FEN_KIWIPETE).unwrap();
        let (total, split) = splitperft(&pos, 2);
        assert_eq!(split.len(), 48);
        assert_eq!(total, 2039);
        assert_eq!(total, perft(&pos, 2));
    }

    #[test]
    fn test_promotions() {
        let pos = Position::from_fen("n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1").unwrap();
        assert_eq!(perft(&pos, 1), 24);
        assert_eq!(perft(&pos, 2), 496);
    }
}
