/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use arbiter::{
    rules, Color, Game, GameResult, Move, PieceKind, Position, Rank, Square, FEN_KIWIPETE, FEN_STARTPOS,
};

fn game_after(fen: &str, moves: &str) -> Game {
    let mut game = Game::from_fen(fen).unwrap();
    for mv in moves.split_ascii_whitespace() {
        game.make_move_str(mv).unwrap();
    }
    game
}

/// Every enemy piece that could move onto the King of `color`, by movement rules alone.
fn is_attacked_geometrically(pos: &Position, color: Color) -> bool {
    let Some(king) = pos.board().king(color) else {
        return false;
    };

    pos.board().pieces(color.opponent()).any(|(square, piece)| {
        let promotes = piece.is_pawn() && king.rank() == Rank::eighth(piece.color());
        let mv = if promotes {
            Move::with_promotion(square, king, piece.color(), PieceKind::Queen)
        } else {
            Move::new(square, king, piece.color())
        };
        rules::is_valid_move(piece, &mv, pos)
    })
}

#[test]
fn test_startpos_round_trip() {
    let pos = Position::from_fen(FEN_STARTPOS).unwrap();
    assert_eq!(pos.to_fen(), FEN_STARTPOS);
    assert_eq!(pos, Position::default());

    let game = game_after(FEN_KIWIPETE, "e2a6 b4c3 e1g1 e8g8");
    let reparsed = Position::from_fen(&game.fen()).unwrap();
    assert_eq!(reparsed.to_fen(), game.fen());
    assert_eq!(reparsed.key(), game.position().key());
}

#[test]
fn test_apply_undo_inverse() {
    // Captures, en passant, both castles, and a promotion
    let lines = [
        (FEN_STARTPOS, "e4 d5 exd5 Qxd5 Nc3 Qa5 d4 c6 Nf3 Bf5 Bc4 e6 O-O Nd7 Qe2 O-O-O"),
        ("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1", "e5 d4 e6"),
        ("rnbqkbnr/ppp1pppp/8/8/3pP3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 3", "dxe3"),
        ("4k3/1P6/8/8/8/8/8/4K3 w - - 0 1", "b8=Q+ Kd7 Qb5+"),
    ];

    for (fen, moves) in lines {
        let mut game = Game::from_fen(fen).unwrap();
        let mut before = Vec::new();

        for san in moves.split_ascii_whitespace() {
            before.push((*game.position(), game.key()));
            game.make_move_san(san).unwrap();
        }

        while let Some((position, key)) = before.pop() {
            assert!(game.undo());
            assert_eq!(*game.position(), position, "undo failed in {fen}");
            assert_eq!(game.key(), key);
        }
        assert!(!game.undo());
    }
}

#[test]
fn test_castling_gating() {
    let e1g1 = Move::new(Square::E1, Square::G1, Color::White);

    let open = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    assert!(open.is_valid_move(&e1g1, true, true));

    let mut castled = open;
    assert!(castled.apply_move(&e1g1, false).is_valid());
    assert!(castled.board().get(Square::G1).unwrap().is(Color::White, PieceKind::King));
    assert!(castled.board().get(Square::F1).unwrap().is(Color::White, PieceKind::Rook));
    assert_eq!(castled.board().get(Square::E1), None);
    assert_eq!(castled.board().get(Square::H1), None);

    // Something in the way
    let blocked = Position::from_fen("r3k2r/8/8/8/8/8/8/R3KB1R w KQkq - 0 1").unwrap();
    assert!(!blocked.is_valid_move(&e1g1, true, true));

    // The King would pass through f1, which the f3 Rook attacks
    let attacked = Position::from_fen("r3k2r/8/8/8/8/5r2/8/R3K2R w KQkq - 0 1").unwrap();
    assert!(!attacked.is_valid_move(&e1g1, true, true));
}

#[test]
fn test_en_passant_window() {
    let exd6 = Move::new(Square::E5, Square::D6, Color::White);

    let game = game_after(FEN_STARTPOS, "e4 e6 e5 d5");
    assert_eq!(game.ep_square(), Some(Square::D6));
    assert!(game.is_valid_move(&exd6, true, true));

    let mut played = game.clone();
    played.make_move(&exd6, false);
    assert_eq!(played.last_move().unwrap().san(), "exd6");
    assert_eq!(played.board().get(Square::D5), None);

    // The right lapses after one ply
    let lapsed = game_after(FEN_STARTPOS, "e4 e6 e5 d5 a3 a6");
    assert_eq!(lapsed.ep_square(), None);
    assert!(!lapsed.is_valid_move(&exd6, true, true));
}

#[test]
fn test_check_invariant() {
    let fens = [
        FEN_STARTPOS,
        FEN_KIWIPETE,
        "4k3/8/8/8/8/8/8/4K2r w - - 0 1",
        "3R2k1/5ppp/8/8/8/8/8/6K1 b - - 0 1",
        "k7/8/1Q6/8/8/8/8/7K b - - 0 1",
        "4k3/3P4/8/8/8/8/8/4K3 b - - 0 1",
        "4k3/8/8/8/8/8/3n4/4K3 w - - 0 1",
        "n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1",
    ];

    for fen in fens {
        let pos = Position::from_fen(fen).unwrap();
        for color in [Color::White, Color::Black] {
            assert_eq!(pos.is_in_check(color), is_attacked_geometrically(&pos, color), "{fen}");

            if pos.is_checkmated(color) {
                assert!(pos.is_in_check(color));
                assert!(!pos.has_legal_moves(color));
            }

            if pos.is_stalemated(color) {
                assert!(!pos.is_in_check(color));
                assert!(!pos.has_legal_moves(color));
                assert_eq!(pos.side_to_move(), color);
            }
        }
    }
}

#[test]
fn test_san_disambiguation() {
    let fen = "k7/8/K7/8/8/Q7/8/QQ6 w - - 0 1";

    for (uci, san) in [("b1b2", "Qbb2"), ("a1b2", "Qa1b2"), ("a3b2", "Q3b2")] {
        let mut game = Game::from_fen(fen).unwrap();
        game.make_move_uci(uci).unwrap();
        assert_eq!(game.last_move().unwrap().san(), san);

        let mut by_san = Game::from_fen(fen).unwrap();
        by_san.make_move_san(san).unwrap();
        assert_eq!(by_san.position(), game.position());
    }
}

#[test]
fn test_draw_detection() {
    for fen in [
        "8/8/4k3/8/8/3K4/8/8 w - - 0 1",
        "8/8/4k3/8/8/3KB3/8/8 w - - 0 1",
        "8/8/4k3/8/8/3KNN2/8/8 w - - 0 1",
    ] {
        let game = Game::from_fen(fen).unwrap();
        assert!(game.is_draw(), "{fen}");
        assert_eq!(game.result(), GameResult::InsufficientMaterial);
        assert!(!game.is_winner(Color::White));
    }

    let game = Game::from_fen("8/8/4k3/8/8/3KR3/8/8 w - - 0 1").unwrap();
    assert!(!game.is_draw());
}

#[test]
fn test_scholars_mate() {
    let game = game_after(FEN_STARTPOS, "e4 e5 Bc4 d6 Qf3 h6 Qxf7");

    assert!(game.is_checkmated(Color::Black));
    assert!(!game.is_stalemated(Color::Black));
    assert!(game.is_winner(Color::White));
    assert!(!game.is_winner(Color::Black));
    assert_eq!(game.result(), GameResult::Mate);
    assert_eq!(game.last_move().unwrap().san(), "Qxf7#");
    assert_eq!(game.movetext(), "1. e4 e5 2. Bc4 d6 3. Qf3 h6 4. Qxf7#");
}
