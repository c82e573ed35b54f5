//! Algebraic-notation handling. We distinguish between:
//! 1. LAN (long algebraic notation), the standard in UCI, e.g. `e2e4`.
//! 2. SAN (standard algebraic notation), used in PGN files and other
//!    displays, e.g. `Nf3`, `exd5`, `O-O-O`, `e8=Q+`.

use std::{fmt::Write, sync::atomic::Ordering};

use crate::chess::{
    board::Board,
    chessmove::{Move, MoveFlags},
    piece::{Piece, PieceType},
    types::{CheckState, File, Rank, Square},
    CHESS960,
};

/// The decomposed form of a SAN token, before disambiguation.
struct SanParts {
    piece: PieceType,
    from_file: Option<File>,
    from_rank: Option<Rank>,
    to: Square,
    promotion: Option<PieceType>,
}

fn promo_piece(b: u8) -> Option<PieceType> {
    match b {
        b'Q' | b'q' => Some(PieceType::Queen),
        b'R' | b'r' => Some(PieceType::Rook),
        b'B' | b'b' => Some(PieceType::Bishop),
        b'N' | b'n' => Some(PieceType::Knight),
        _ => None,
    }
}

fn is_lan(s: &str) -> bool {
    let b = s.as_bytes();
    if !(4..=5).contains(&b.len()) {
        return false;
    }
    if b.len() == 5 && !matches!(b[4], b'q' | b'r' | b'b' | b'n') {
        return false;
    }
    (b'a'..=b'h').contains(&b[0])
        && (b'1'..=b'8').contains(&b[1])
        && (b'a'..=b'h').contains(&b[2])
        && (b'1'..=b'8').contains(&b[3])
}

fn is_castling_token(s: &str) -> bool {
    let s = s.trim_end_matches(['+', '#']);
    s.eq_ignore_ascii_case("o-o")
        || s.eq_ignore_ascii_case("o-o-o")
        || s == "0-0"
        || s == "0-0-0"
}

/// Splits a SAN token into its parts. The accepted shape is
/// `[NBRQK]? [a-h1-8]? [1-8]? x? [a-h][1-8] (=[NBRQ])?` with arbitrary
/// trailing annotation, mirroring how greedy regex matching resolves the
/// disambiguator/target ambiguity: the last square named is the target.
fn parse_san_parts(s: &str) -> Option<SanParts> {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return None;
    }

    let mut idx = 0;
    let piece = match bytes[0] {
        b'N' => PieceType::Knight,
        b'B' => PieceType::Bishop,
        b'R' => PieceType::Rook,
        b'Q' => PieceType::Queen,
        b'K' => PieceType::King,
        _ => PieceType::Pawn,
    };
    if piece != PieceType::Pawn {
        idx = 1;
    }

    // find the last file-rank pair; everything before it is the
    // disambiguator, everything after it is promotion and annotation.
    let mut target_at = None;
    for i in idx..bytes.len().saturating_sub(1) {
        if (b'a'..=b'h').contains(&bytes[i]) && (b'1'..=b'8').contains(&bytes[i + 1]) {
            target_at = Some(i);
        }
    }
    let target_at = target_at?;

    let to_file = File::from_index(bytes[target_at] - b'a')?;
    let to_rank = Rank::from_index(bytes[target_at + 1] - b'1')?;
    let to = Square::from_rank_file(to_rank, to_file);

    // validate the disambiguator segment
    let mut from_file = None;
    let mut from_rank = None;
    let mut seen_capture = false;
    for &ch in &bytes[idx..target_at] {
        match ch {
            b'a'..=b'h' if from_file.is_none() && from_rank.is_none() && !seen_capture => {
                from_file = File::from_index(ch - b'a');
            }
            b'1'..=b'8' if from_rank.is_none() && !seen_capture => {
                from_rank = Rank::from_index(ch - b'1');
            }
            b'x' if !seen_capture => {
                seen_capture = true;
            }
            _ => return None,
        }
    }

    // optional promotion glyph after the target square
    let mut promotion = None;
    let rest = &bytes[target_at + 2..];
    if rest.len() >= 2 && rest[0] == b'=' {
        promotion = promo_piece(rest[1]);
    }

    Some(SanParts {
        piece,
        from_file,
        from_rank,
        to,
        promotion,
    })
}

/// Tests whether a string has the shape of a move in LAN, SAN, or as a
/// castling token. Makes no reference to any position.
pub fn is_ok(s: &str) -> bool {
    is_lan(s) || is_castling_token(s) || parse_san_parts(s).is_some()
}

/// Among the legal moves, finds the unique one matching the SAN
/// description. Returns `None` if nothing matches, or if the description
/// is still ambiguous after applying the file/rank disambiguators.
fn get_move_from(
    pos: &Board,
    pt: PieceType,
    to: Square,
    promotion: Option<PieceType>,
    from_file: Option<File>,
    from_rank: Option<Rank>,
) -> Option<Move> {
    let us = pos.turn();
    let mut found = None;
    let mut count = 0usize;

    let matching = |m: &Move| {
        !m.is_castle()
            && m.to() == to
            && pos.moved_piece(*m) == Some(Piece::new(us, pt))
            && m.promotion_type() == promotion
    };

    for m in pos.legal_moves().into_iter().filter(matching) {
        if from_file.is_some_and(|f| m.from().file() != f) {
            continue;
        }
        if from_rank.is_some_and(|r| m.from().rank() != r) {
            continue;
        }
        found = Some(m);
        count += 1;
    }

    if count == 1 {
        found
    } else {
        None
    }
}

fn castling_move(pos: &Board, kingside: bool) -> Option<Move> {
    let us = pos.turn();
    let king_sq = pos.king_sq(us);
    let rook_file = if kingside {
        pos.castling_rights().kingside(us)
    } else {
        pos.castling_rights().queenside(us)
    }?;
    let rook_sq = Square::from_rank_file(king_sq.rank(), rook_file);
    Some(Move::new_with_flags(king_sq, rook_sq, MoveFlags::Castle))
}

fn lan_to_move(pos: &Board, s: &str) -> Option<Move> {
    let bytes = s.as_bytes();
    let from = Square::from_rank_file(
        Rank::from_index(bytes[1] - b'1')?,
        File::from_index(bytes[0] - b'a')?,
    );
    let to = Square::from_rank_file(
        Rank::from_index(bytes[3] - b'1')?,
        File::from_index(bytes[2] - b'a')?,
    );
    let us = pos.turn();
    let moved = pos.piece_at(from);

    if moved == Some(Piece::new(us, PieceType::King)) {
        if CHESS960.load(Ordering::Relaxed) {
            // a king-to-rook move is the wire encoding of castling.
            if pos.piece_at(to) == Some(Piece::new(us, PieceType::Rook)) {
                return Some(Move::new_with_flags(from, to, MoveFlags::Castle));
            }
        } else if from == Square::E1.relative_to(us) {
            if to == Square::G1.relative_to(us)
                && pos.castling_rights().kingside(us).is_some()
            {
                return castling_move(pos, true);
            }
            if to == Square::C1.relative_to(us)
                && pos.castling_rights().queenside(us).is_some()
            {
                return castling_move(pos, false);
            }
        }
    }

    if moved == Some(Piece::new(us, PieceType::Pawn)) {
        // promotions default to a queen if the glyph was omitted.
        if to.relative_rank(us) == Rank::Eight {
            let promo = bytes
                .get(4)
                .and_then(|&b| promo_piece(b))
                .unwrap_or(PieceType::Queen);
            return Some(Move::new_with_promo(from, to, promo));
        }
        if Some(to) == pos.ep_sq() && from.file() != to.file() {
            return Some(Move::new_with_flags(from, to, MoveFlags::EnPassant));
        }
    }

    if from == to {
        return None;
    }
    Some(Move::new(from, to))
}

/// Parses a move given in LAN or SAN (or as a castling token) against the
/// position. The returned move is not checked for legality; use
/// [`validate_move`] for that.
pub fn algebraic_to_move(pos: &Board, s: &str) -> Option<Move> {
    if is_lan(s) {
        return lan_to_move(pos, s);
    }

    if is_castling_token(s) {
        let token = s.trim_end_matches(['+', '#']);
        let kingside = token.eq_ignore_ascii_case("o-o") || token == "0-0";
        return castling_move(pos, kingside);
    }

    let parts = parse_san_parts(s)?;

    // pawn moves to the relative back rank are always promotions,
    // defaulting to a queen.
    let promotion = if parts.piece == PieceType::Pawn
        && parts.to.relative_rank(pos.turn()) == Rank::Eight
    {
        Some(parts.promotion.unwrap_or(PieceType::Queen))
    } else {
        None
    };

    get_move_from(
        pos,
        parts.piece,
        parts.to,
        promotion,
        parts.from_file,
        parts.from_rank,
    )
}

/// Converts a move given in LAN or SAN to its wire (LAN) text.
/// Returns an empty string if the input does not resolve.
pub fn algebraic_to_string(pos: &Board, s: &str) -> String {
    if is_lan(s) {
        return s.to_string();
    }
    algebraic_to_move(pos, s)
        .map(|m| m.to_string())
        .unwrap_or_default()
}

/// Parses a move in LAN or SAN and checks it against the legal move list.
pub fn validate_move(pos: &Board, s: &str) -> Option<Move> {
    let m = algebraic_to_move(pos, s)?;
    if pos.legal_moves().contains(&m) {
        Some(m)
    } else {
        None
    }
}

/// Renders a legal move in SAN. `None` renders as `"(none)"` and the null
/// move as `"0000"`.
pub fn to_san(pos: &Board, m: Option<Move>) -> String {
    let Some(m) = m else {
        return "(none)".to_string();
    };
    if m == Move::NULL {
        return "0000".to_string();
    }

    let mut san = String::new();

    if m.is_castle() {
        san.push_str(if m.to() > m.from() { "O-O" } else { "O-O-O" });
    } else {
        let pt = pos.moved_piece(m).unwrap().piece_type();

        if pt != PieceType::Pawn {
            san.push(match pt {
                PieceType::Knight => 'N',
                PieceType::Bishop => 'B',
                PieceType::Rook => 'R',
                PieceType::Queen => 'Q',
                _ => 'K',
            });
        }

        // a disambiguator is needed when two or more pieces of the same
        // type can legally reach the target square.
        let peers: Vec<Move> = pos
            .legal_moves()
            .into_iter()
            .filter(|&other| {
                !other.is_castle()
                    && other.to() == m.to()
                    && pos.moved_piece(other).map(Piece::piece_type) == Some(pt)
            })
            .collect();

        if pt != PieceType::Pawn && peers.len() > 1 {
            let same_file = peers
                .iter()
                .filter(|p| p.from().file() == m.from().file())
                .count();
            let same_rank = peers
                .iter()
                .filter(|p| p.from().rank() == m.from().rank())
                .count();
            if same_file == 1 {
                san.push((b'a' + m.from().file() as u8) as char);
            } else if same_rank == 1 {
                san.push((b'1' + m.from().rank() as u8) as char);
            } else {
                let _ = write!(san, "{}", m.from());
            }
        }

        if pos.is_capture(m) {
            if pt == PieceType::Pawn {
                san.push((b'a' + m.from().file() as u8) as char);
            }
            san.push('x');
        }

        let _ = write!(san, "{}", m.to());

        if m.is_ep() {
            san.push_str("/e.p.");
        }
        if let Some(promo) = m.promotion_type() {
            san.push('=');
            san.push(match promo {
                PieceType::Knight => 'N',
                PieceType::Bishop => 'B',
                PieceType::Rook => 'R',
                _ => 'Q',
            });
        }
    }

    match pos.gives(m) {
        CheckState::None => (),
        CheckState::Check => san.push('+'),
        CheckState::Checkmate => san.push('#'),
    }

    san
}

/// Renders a line of moves in SAN, space-separated, playing each move out
/// on a scratch copy of the position.
pub fn line_to_san(pos: &Board, line: &[Move]) -> String {
    let mut playout = pos.clone();
    let mut out = String::new();
    for &m in line {
        debug_assert!(playout.legal_moves().contains(&m));
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&to_san(&playout, Some(m)));
        playout.make_move(m);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formedness() {
        assert!(is_ok("e2e4"));
        assert!(is_ok("e7e8q"));
        assert!(is_ok("Nf3"));
        assert!(is_ok("exd5"));
        assert!(is_ok("Rae1"));
        assert!(is_ok("R1a3"));
        assert!(is_ok("Qh4e1"));
        assert!(is_ok("e8=Q"));
        assert!(is_ok("e8=Q+"));
        assert!(is_ok("exd6/e.p."));
        assert!(is_ok("O-O"));
        assert!(is_ok("o-o-o"));
        assert!(is_ok("0-0"));
        assert!(is_ok("O-O+"));

        assert!(!is_ok(""));
        assert!(!is_ok("Ze4"));
        assert!(!is_ok("xxxx"));
        assert!(!is_ok("i9i9"));
        assert!(!is_ok("O-O-O-O"));
    }

    #[test]
    fn lan_simple() {
        let pos = Board::default();
        let m = algebraic_to_move(&pos, "e2e4").unwrap();
        assert_eq!(m.from(), Square::E2);
        assert_eq!(m.to(), Square::E4);
    }

    #[test]
    fn lan_promotion_defaults_to_queen() {
        let pos = Board::from_fen("8/P7/8/8/8/8/8/4K2k w - - 0 1").unwrap();
        let m = algebraic_to_move(&pos, "a7a8").unwrap();
        assert_eq!(m.promotion_type(), Some(PieceType::Queen));
        let m = algebraic_to_move(&pos, "a7a8n").unwrap();
        assert_eq!(m.promotion_type(), Some(PieceType::Knight));
    }

    #[test]
    fn lan_en_passant_flag() {
        let pos =
            Board::from_fen("rnbqkbnr/pppp1ppp/8/4pP2/8/8/PPPPP1PP/RNBQKBNR w KQkq e6 0 3")
                .unwrap();
        let m = algebraic_to_move(&pos, "f5e6").unwrap();
        assert!(m.is_ep());
    }

    #[test]
    fn san_knight_move() {
        let pos = Board::default();
        let m = algebraic_to_move(&pos, "Nf3").unwrap();
        assert_eq!(m.from(), Square::G1);
        assert_eq!(m.to(), Square::F3);
        assert_eq!(to_san(&pos, Some(m)), "Nf3");
    }

    #[test]
    fn san_pawn_capture() {
        let pos =
            Board::from_fen("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2")
                .unwrap();
        let m = algebraic_to_move(&pos, "exd5").unwrap();
        assert_eq!(m.from(), Square::E4);
        assert_eq!(m.to(), Square::D5);
        // terse form without the capture marker
        let m2 = algebraic_to_move(&pos, "ed5").unwrap();
        assert_eq!(m, m2);
    }

    #[test]
    fn san_disambiguation() {
        let pos =
            Board::from_fen("r1bqkbnr/pppp1ppp/2n5/1N2p3/4P3/5N2/PPPP1PPP/R1BQKB1R w KQ - 14 9")
                .unwrap();
        // two knights can reach d4, so the bare form is ambiguous.
        assert_eq!(algebraic_to_move(&pos, "Nd4"), None);
        let m = algebraic_to_move(&pos, "Nfd4").unwrap();
        assert_eq!(m.from(), Square::F3);
        let m = algebraic_to_move(&pos, "N3d4").unwrap();
        assert_eq!(m.from(), Square::F3);
        let m = algebraic_to_move(&pos, "Nbd4").unwrap();
        assert_eq!(m.from(), Square::B5);
        let m = algebraic_to_move(&pos, "N5d4").unwrap();
        assert_eq!(m.from(), Square::B5);
    }

    #[test]
    fn san_disambiguation_respects_pins() {
        let pos = Board::from_fen(
            "r1b1k1nr/ppppbppp/2n5/1N2p3/2Q1P1q1/5N2/PPPP1PPP/R1BK1B1R w - - 20 12",
        )
        .unwrap();
        // the f3 knight is pinned to the king, so only the b5 knight can
        // reach d4 and no disambiguator is needed.
        assert_eq!(algebraic_to_move(&pos, "Nfd4"), None);
        assert_eq!(algebraic_to_move(&pos, "N3d4"), None);
        let m = algebraic_to_move(&pos, "Nd4").unwrap();
        assert_eq!(m.from(), Square::B5);
    }

    #[test]
    fn san_promotion() {
        let pos = Board::from_fen("8/P7/8/8/8/8/8/4K2k w - - 0 1").unwrap();
        let m = algebraic_to_move(&pos, "a8=Q").unwrap();
        assert_eq!(m.from(), Square::A7);
        assert_eq!(m.to(), Square::A8);
        assert_eq!(m.promotion_type(), Some(PieceType::Queen));
        let m = algebraic_to_move(&pos, "a8=N").unwrap();
        assert_eq!(m.promotion_type(), Some(PieceType::Knight));
        // bare pawn push to the back rank is a queen promotion
        let m = algebraic_to_move(&pos, "a8").unwrap();
        assert_eq!(m.promotion_type(), Some(PieceType::Queen));
    }

    #[test]
    fn san_with_check_marker() {
        let pos =
            Board::from_fen("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2")
                .unwrap();
        let m = algebraic_to_move(&pos, "Qh4+").unwrap();
        assert_eq!(m.from(), Square::D8);
        assert_eq!(m.to(), Square::H4);
        assert_eq!(to_san(&pos, Some(m)), "Qh4#");
    }

    #[test]
    fn castling_standard() {
        let pos =
            Board::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        let m = algebraic_to_move(&pos, "O-O").unwrap();
        assert!(m.is_castle());
        assert_eq!(m.from(), Square::E1);
        assert_eq!(m.to(), Square::H1);
        assert_eq!(to_san(&pos, Some(m)), "O-O");

        let m = algebraic_to_move(&pos, "O-O-O").unwrap();
        assert!(m.is_castle());
        assert_eq!(m.from(), Square::E1);
        assert_eq!(m.to(), Square::A1);
        assert_eq!(to_san(&pos, Some(m)), "O-O-O");

        // zeros and lowercase are accepted too
        assert!(algebraic_to_move(&pos, "0-0").unwrap().is_castle());
        assert!(algebraic_to_move(&pos, "o-o-o").unwrap().is_castle());
    }

    #[test]
    fn castling_via_lan() {
        let pos =
            Board::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        let m = algebraic_to_move(&pos, "e1g1").unwrap();
        assert!(m.is_castle());
        assert_eq!(m.to(), Square::H1);
        let m = algebraic_to_move(&pos, "e1c1").unwrap();
        assert!(m.is_castle());
        assert_eq!(m.to(), Square::A1);
    }

    #[test]
    fn sentinels() {
        let pos = Board::default();
        assert_eq!(to_san(&pos, None), "(none)");
        assert_eq!(to_san(&pos, Some(Move::NULL)), "0000");
    }

    #[test]
    fn en_passant_suffix_round_trips() {
        let pos =
            Board::from_fen("rnbqkbnr/pppp1ppp/8/4pP2/8/8/PPPPP1PP/RNBQKBNR w KQkq e6 0 3")
                .unwrap();
        let m = algebraic_to_move(&pos, "fxe6").unwrap();
        assert!(m.is_ep());
        let san = to_san(&pos, Some(m));
        assert!(san.starts_with("fxe6/e.p."), "got {san}");
        assert_eq!(algebraic_to_move(&pos, &san), Some(m));
    }

    #[test]
    fn validate_rejects_illegal() {
        let pos = Board::default();
        // e5 is not reachable in one move from the start position.
        assert_eq!(validate_move(&pos, "e5"), None);
        assert_eq!(validate_move(&pos, "e2e5"), None);
        assert!(validate_move(&pos, "e2e4").is_some());
    }

    #[test]
    fn algebraic_to_string_forms() {
        let pos = Board::default();
        assert_eq!(algebraic_to_string(&pos, "e2e4"), "e2e4");
        assert_eq!(algebraic_to_string(&pos, "Nf3"), "g1f3");
        assert_eq!(algebraic_to_string(&pos, "Zf3"), "");
    }

    #[test]
    fn round_trip_all_legal_moves() {
        // to_san and algebraic_to_move are inverses over the legal moves,
        // and every SAN string we emit is well-formed; the wire text
        // round-trips through validate_move as well.
        let positions = [
            Board::STARTING_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
            "rn3r2/pbppq1p1/1p2pN2/8/3P2NP/6P1/PPP1BP1R/R3K1k1 w Q - 5 18",
            "rnbqkbnr/pppp1ppp/8/4pP2/8/8/PPPPP1PP/RNBQKBNR w KQkq e6 0 3",
        ];
        for fen in positions {
            let pos = Board::from_fen(fen).unwrap();
            for m in pos.legal_moves() {
                let san = to_san(&pos, Some(m));
                assert!(is_ok(&san), "ill-formed SAN {san} in {fen}");
                assert_eq!(
                    algebraic_to_move(&pos, &san),
                    Some(m),
                    "SAN round trip failed for {san} in {fen}"
                );
                let wire = m.to_string();
                assert_eq!(
                    validate_move(&pos, &wire),
                    Some(m),
                    "wire round trip failed for {wire} in {fen}"
                );
            }
        }
    }

    #[test]
    fn line_rendering() {
        let pos = Board::default();
        let e4 = algebraic_to_move(&pos, "e2e4").unwrap();
        let mut after = pos.clone();
        after.make_move(e4);
        let e5 = algebraic_to_move(&after, "e7e5").unwrap();
        assert_eq!(line_to_san(&pos, &[e4, e5]), "e4 e5");
    }
}
