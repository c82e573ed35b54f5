use crate::{
    chess::{
        board::{
            movegen::{MoveList, MoveListEntry},
            Board,
        },
        chessmove::Move,
        piece::{Piece, PieceType},
        squareset::SquareSet,
        types::Square,
    },
    historytable::{ButterflyHistory, CapturePieceToHistory, PieceToHistory},
};

/// Depth at which the quiescence search starts trying quiet checks.
pub const DEPTH_QS_CHECKS: i32 = 0;
/// Depth below which the quiescence search only considers recaptures.
pub const DEPTH_QS_RECAPTURES: i32 = -5;

/// States of the staged move generator. Grouped by picker flavour: the main
/// search runs MainTT through BadCapture, check evasions run the Evasion
/// stages, and the probcut and quiescence pickers have their own tails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    MainTT,
    CaptureInit,
    GoodCapture,
    Refutation,
    QuietInit,
    Quiet,
    BadCapture,

    EvasionTT,
    EvasionInit,
    Evasion,

    ProbcutTT,
    ProbcutInit,
    Probcut,

    QSearchTT,
    QCaptureInit,
    QCapture,
    QCheckInit,
    QCheck,
}

/// A staged generator of pseudo-legal moves for one node of the search
/// tree. Moves are produced one at a time, most-promising first, without
/// ever materialising the full ordered list; losing captures are deferred
/// to the very end via a partition at the front of the buffer.
///
/// The picker borrows the position and the history tables for its whole
/// lifetime; neither may change while it is live.
pub struct MovePicker<'a> {
    pos: &'a Board,
    butterfly_history: Option<&'a ButterflyHistory>,
    capture_history: &'a CapturePieceToHistory,
    continuation_history: [Option<&'a PieceToHistory>; 6],
    tt_move: Option<Move>,
    refutations: [Option<Move>; 3],
    stage: Stage,
    moves: MoveList,
    cur: usize,
    end_bad_captures: usize,
    ref_cur: usize,
    ref_end: usize,
    depth: i32,
    recapture_square: Option<Square>,
    threshold: i32,
}

impl<'a> MovePicker<'a> {
    /// Constructor for the main search.
    #[allow(clippy::too_many_arguments)]
    pub fn new_main(
        pos: &'a Board,
        tt_move: Option<Move>,
        depth: i32,
        butterfly_history: &'a ButterflyHistory,
        capture_history: &'a CapturePieceToHistory,
        continuation_history: [Option<&'a PieceToHistory>; 6],
        counter_move: Option<Move>,
        killers: [Option<Move>; 2],
    ) -> Self {
        debug_assert!(depth > 0);

        let tt_usable = tt_move.is_some_and(|m| pos.is_pseudo_legal(m));
        let stage = match (pos.in_check(), tt_usable) {
            (true, true) => Stage::EvasionTT,
            (true, false) => Stage::EvasionInit,
            (false, true) => Stage::MainTT,
            (false, false) => Stage::CaptureInit,
        };

        Self {
            pos,
            butterfly_history: Some(butterfly_history),
            capture_history,
            continuation_history,
            tt_move,
            refutations: [killers[0], killers[1], counter_move],
            stage,
            moves: MoveList::new(),
            cur: 0,
            end_bad_captures: 0,
            ref_cur: 0,
            ref_end: 0,
            depth,
            recapture_square: None,
            threshold: 0,
        }
    }

    /// Constructor for the quiescence search.
    pub fn new_quiescence(
        pos: &'a Board,
        tt_move: Option<Move>,
        depth: i32,
        butterfly_history: &'a ButterflyHistory,
        capture_history: &'a CapturePieceToHistory,
        continuation_history: [Option<&'a PieceToHistory>; 6],
        recapture_square: Option<Square>,
    ) -> Self {
        debug_assert!(depth <= 0);

        let tt_usable = tt_move.is_some_and(|m| pos.is_pseudo_legal(m));
        let stage = match (pos.in_check(), tt_usable) {
            (true, true) => Stage::EvasionTT,
            (true, false) => Stage::EvasionInit,
            (false, true) => Stage::QSearchTT,
            (false, false) => Stage::QCaptureInit,
        };

        Self {
            pos,
            butterfly_history: Some(butterfly_history),
            capture_history,
            continuation_history,
            tt_move,
            refutations: [None; 3],
            stage,
            moves: MoveList::new(),
            cur: 0,
            end_bad_captures: 0,
            ref_cur: 0,
            ref_end: 0,
            depth,
            recapture_square,
            threshold: 0,
        }
    }

    /// Constructor for probcut: only captures whose static exchange value
    /// meets the threshold are produced. The position must not be in check.
    pub fn new_probcut(
        pos: &'a Board,
        tt_move: Option<Move>,
        threshold: i32,
        capture_history: &'a CapturePieceToHistory,
    ) -> Self {
        debug_assert!(!pos.in_check());

        let tt_usable = tt_move.is_some_and(|m| {
            pos.is_capture_stage(m) && pos.is_pseudo_legal(m) && pos.see_ge(m, threshold)
        });
        let stage = if tt_usable {
            Stage::ProbcutTT
        } else {
            Stage::ProbcutInit
        };

        Self {
            pos,
            butterfly_history: None,
            capture_history,
            continuation_history: [None; 6],
            tt_move,
            refutations: [None; 3],
            stage,
            moves: MoveList::new(),
            cur: 0,
            end_bad_captures: 0,
            ref_cur: 0,
            ref_end: 0,
            depth: 0,
            recapture_square: None,
            threshold,
        }
    }

    /// Returns the next pseudo-legal move, or `None` once the stage machine
    /// has run dry. The transposition-table move is never produced twice,
    /// and with `skip_quiets` only tactical moves and refutations come out.
    pub fn next_move<const SEARCH_MATE: bool>(&mut self, skip_quiets: bool) -> Option<Move> {
        loop {
            match self.stage {
                Stage::MainTT => {
                    self.stage = Stage::CaptureInit;
                    return self.tt_move;
                }
                Stage::EvasionTT => {
                    self.stage = Stage::EvasionInit;
                    return self.tt_move;
                }
                Stage::QSearchTT => {
                    self.stage = Stage::QCaptureInit;
                    return self.tt_move;
                }
                Stage::ProbcutTT => {
                    self.stage = Stage::ProbcutInit;
                    return self.tt_move;
                }

                Stage::CaptureInit | Stage::ProbcutInit | Stage::QCaptureInit => {
                    self.pos.generate_captures(&mut self.moves);
                    self.cur = 0;
                    self.end_bad_captures = 0;
                    self.score_captures::<SEARCH_MATE>();
                    partial_insertion_sort(&mut self.moves, i32::MIN);
                    self.stage = match self.stage {
                        Stage::CaptureInit => Stage::GoodCapture,
                        Stage::ProbcutInit => Stage::Probcut,
                        _ => Stage::QCapture,
                    };
                }

                Stage::GoodCapture => {
                    while self.cur < self.moves.len() {
                        let entry = self.moves[self.cur];
                        self.cur += 1;
                        if Some(entry.mov) == self.tt_move {
                            continue;
                        }
                        if self.pos.see_ge(entry.mov, -69 * entry.score / 1024) {
                            return Some(entry.mov);
                        }
                        // losing captures go to the front partition,
                        // to be tried again after the quiets.
                        self.moves[self.end_bad_captures] = entry;
                        self.end_bad_captures += 1;
                    }

                    // set up the refutations; if the countermove collides
                    // with a killer, drop the duplicate slot.
                    self.ref_cur = 0;
                    self.ref_end = if self.refutations[2] == self.refutations[0]
                        || self.refutations[2] == self.refutations[1]
                    {
                        2
                    } else {
                        3
                    };
                    self.stage = Stage::Refutation;
                }

                Stage::Refutation => {
                    while self.ref_cur < self.ref_end {
                        let refutation = self.refutations[self.ref_cur];
                        self.ref_cur += 1;
                        let Some(m) = refutation else {
                            continue;
                        };
                        if Some(m) != self.tt_move
                            && !self.pos.is_capture(m)
                            && self.pos.is_pseudo_legal(m)
                        {
                            return Some(m);
                        }
                    }
                    self.stage = Stage::QuietInit;
                }

                Stage::QuietInit => {
                    if !skip_quiets {
                        debug_assert!(self.depth >= 1);
                        // the quiets share the buffer with the deferred
                        // bad captures, starting right after them.
                        self.moves.truncate(self.end_bad_captures);
                        self.cur = self.end_bad_captures;
                        self.pos.generate_quiets(&mut self.moves);
                        self.score_quiets::<SEARCH_MATE>();
                        let start = self.cur;
                        partial_insertion_sort(&mut self.moves[start..], -3000 * self.depth);
                    }
                    self.stage = Stage::Quiet;
                }

                Stage::Quiet => {
                    if !skip_quiets {
                        while self.cur < self.moves.len() {
                            let m = self.moves[self.cur].mov;
                            self.cur += 1;
                            if Some(m) == self.tt_move {
                                continue;
                            }
                            if self.refutations.contains(&Some(m)) {
                                continue;
                            }
                            return Some(m);
                        }
                    }
                    // rewind to the losing captures.
                    self.cur = 0;
                    self.stage = Stage::BadCapture;
                }

                Stage::BadCapture => {
                    while self.cur < self.end_bad_captures {
                        let m = self.moves[self.cur].mov;
                        self.cur += 1;
                        if Some(m) == self.tt_move {
                            continue;
                        }
                        return Some(m);
                    }
                    return None;
                }

                Stage::EvasionInit => {
                    self.pos.generate_evasions(&mut self.moves);
                    self.cur = 0;
                    self.score_evasions();
                    self.stage = Stage::Evasion;
                }

                Stage::Evasion => {
                    // evasions are usually few and cut quickly, so pick the
                    // best remaining by linear scan instead of pre-sorting.
                    while self.cur < self.moves.len() {
                        let mut best = self.cur;
                        for i in self.cur + 1..self.moves.len() {
                            if self.moves[i].score > self.moves[best].score {
                                best = i;
                            }
                        }
                        self.moves.swap(self.cur, best);
                        let m = self.moves[self.cur].mov;
                        self.cur += 1;
                        if Some(m) == self.tt_move {
                            continue;
                        }
                        return Some(m);
                    }
                    return None;
                }

                Stage::Probcut => {
                    while self.cur < self.moves.len() {
                        let m = self.moves[self.cur].mov;
                        self.cur += 1;
                        if Some(m) == self.tt_move {
                            continue;
                        }
                        if self.pos.see_ge(m, self.threshold) {
                            return Some(m);
                        }
                    }
                    return None;
                }

                Stage::QCapture => {
                    while self.cur < self.moves.len() {
                        let m = self.moves[self.cur].mov;
                        self.cur += 1;
                        if Some(m) == self.tt_move {
                            continue;
                        }
                        if self.depth > DEPTH_QS_RECAPTURES
                            || Some(m.to()) == self.recapture_square
                        {
                            return Some(m);
                        }
                    }
                    // if we are not going to try checks, we are done.
                    if self.depth != DEPTH_QS_CHECKS {
                        return None;
                    }
                    self.stage = Stage::QCheckInit;
                }

                Stage::QCheckInit => {
                    self.pos.generate_quiet_checks(&mut self.moves);
                    self.cur = 0;
                    self.stage = Stage::QCheck;
                }

                Stage::QCheck => {
                    while self.cur < self.moves.len() {
                        let m = self.moves[self.cur].mov;
                        self.cur += 1;
                        if Some(m) == self.tt_move {
                            continue;
                        }
                        return Some(m);
                    }
                    return None;
                }
            }
        }
    }

    fn cont_hist(&self, index: usize, piece: Piece, to: Square) -> i32 {
        self.continuation_history[index].map_or(0, |t| i32::from(t.get(piece, to)))
    }

    /// MVV blended with capture history; the attacker identity only enters
    /// through the history term.
    fn score_captures<const SEARCH_MATE: bool>(&mut self) {
        let pos = self.pos;
        let capture_history = self.capture_history;
        for entry in self.moves.iter_mut() {
            let m = entry.mov;
            let to = m.to();
            let moved = pos.moved_piece(m).unwrap();
            let victim_value = pos
                .captured_piece(m)
                .map_or(0, |p| p.piece_type().mg_value());
            let victim_type = caphist_piece_type(pos, m);

            entry.score = (7 * victim_value
                + i32::from(capture_history.get(moved, to, victim_type)))
                / 16;

            if SEARCH_MATE {
                entry.score += search_mate_bonus(pos, m, moved);
            }
        }
    }

    fn score_quiets<const SEARCH_MATE: bool>(&mut self) {
        use PieceType::{Bishop, Knight, Pawn, Queen, Rook};

        let pos = self.pos;
        let us = pos.turn();
        let butterfly = self.butterfly_history.unwrap();

        let threatened_by_pawn = pos.attacks_by(Pawn, !us);
        let threatened_by_minor =
            pos.attacks_by(Knight, !us) | pos.attacks_by(Bishop, !us) | threatened_by_pawn;
        let threatened_by_rook = pos.attacks_by(Rook, !us) | threatened_by_minor;

        // our pieces that stand attacked by something cheaper than them.
        let threatened_pieces = (pos.pieces(us, Queen) & threatened_by_rook)
            | (pos.pieces(us, Rook) & threatened_by_minor)
            | ((pos.pieces(us, Knight) | pos.pieces(us, Bishop)) & threatened_by_pawn);

        let mut check_squares = [SquareSet::EMPTY; 6];
        for pt in PieceType::all() {
            check_squares[pt] = pos.check_squares(pt);
        }

        let start = self.cur;
        for i in start..self.moves.len() {
            let MoveListEntry { mov: m, .. } = self.moves[i];
            let from = m.from();
            let to = m.to();
            let moved = pos.moved_piece(m).unwrap();
            let pt = moved.piece_type();

            let mut score = 2 * i32::from(butterfly.get(us, m));
            score += 2 * self.cont_hist(0, moved, to);
            score += self.cont_hist(1, moved, to);
            score += self.cont_hist(3, moved, to);
            score += self.cont_hist(5, moved, to);

            // bonus for escaping from capture
            if threatened_pieces.contains_square(from) {
                score += if pt == Queen && !threatened_by_rook.contains_square(to) {
                    50_000
                } else if pt == Rook && !threatened_by_minor.contains_square(to) {
                    25_000
                } else if !threatened_by_pawn.contains_square(to) {
                    15_000
                } else {
                    0
                };
            }

            if SEARCH_MATE {
                score += search_mate_bonus(pos, m, moved);
            } else {
                score += self.cont_hist(2, moved, to) / 4;

                // bonus for checks
                if check_squares[pt].contains_square(to) {
                    score += 16_384;
                }

                // malus for putting a piece en prise
                if !threatened_pieces.contains_square(from) {
                    score -= match pt {
                        Queen => {
                            i32::from(threatened_by_rook.contains_square(to)) * 50_000
                                + i32::from(threatened_by_minor.contains_square(to)) * 10_000
                                + i32::from(threatened_by_pawn.contains_square(to)) * 20_000
                        }
                        Rook => {
                            i32::from(threatened_by_minor.contains_square(to)) * 25_000
                                + i32::from(threatened_by_pawn.contains_square(to)) * 10_000
                        }
                        Pawn => 0,
                        _ => i32::from(threatened_by_pawn.contains_square(to)) * 15_000,
                    };
                }
            }

            self.moves[i].score = score;
        }
    }

    fn score_evasions(&mut self) {
        let pos = self.pos;
        let us = pos.turn();
        let butterfly = self.butterfly_history.unwrap();

        for i in 0..self.moves.len() {
            let m = self.moves[i].mov;
            let score = if pos.is_capture_stage(m) {
                // captures first, ordered most-valuable-victim then
                // least-valuable-attacker.
                pos.captured_piece(m)
                    .map_or(0, |p| p.piece_type().mg_value())
                    - pos.moved_piece(m).unwrap().piece_type().index() as i32
                    + (1 << 28)
            } else {
                i32::from(butterfly.get(us, m))
                    + self.cont_hist(0, pos.moved_piece(m).unwrap(), m.to())
            };
            self.moves[i].score = score;
        }
    }
}

/// The capture-history victim slot for a move: the taken pawn for en
/// passant, and the pawn slot for non-capturing promotions.
fn caphist_piece_type(pos: &Board, m: Move) -> PieceType {
    pos.captured_piece(m)
        .map_or(PieceType::Pawn, Piece::piece_type)
}

/// Check-seeking score adjustments for the mate-hunting scorer variant.
/// Applied to captures and quiets alike, replacing the usual check bonus
/// and en-prise malus.
fn search_mate_bonus(pos: &Board, m: Move, moved: Piece) -> i32 {
    use PieceType::{Bishop, King, Knight, Pawn, Queen, Rook};

    let us = pos.turn();
    let their_king = pos.king_sq(!us);
    let king_ring = pos.attacks_from(King, their_king);
    let to = m.to();
    let pt = moved.piece_type();
    let mut bonus = 0;

    if pos.gives_check(m) {
        bonus += 20_000 - 400 * i32::from(Square::distance(their_king, to));

        if pt == Knight {
            bonus += 3_000;
        } else if (pt == Queen || pt == Rook) && Square::distance(their_king, to) == 1 {
            bonus += 4_000;
        }
    }

    if pt == Pawn {
        bonus += 640 * i32::from(to.file().edge_distance())
            + 1280 * (to.relative_rank(us) as i32);

        if Square::distance(to, m.from()) == 2 {
            bonus += 4_000;
        }
    }

    // bonus for being able to give check on the move after this one.
    let (direct, ring_weight) = match pt {
        Knight => (6_000, 2_560),
        Queen => (5_000, 1_280),
        Rook => (4_000, 960),
        Bishop => (3_000, 640),
        _ => (0, 0),
    };
    if matches!(pt, Knight | Queen | Rook | Bishop) {
        if (pos.attacks_from(pt, to) & pos.check_squares(pt)).non_empty() {
            bonus += direct;
        }
        let pseudo = crate::chess::board::movegen::attacks_by_type(pt, to, SquareSet::EMPTY);
        bonus += ring_weight * (pseudo & king_ring).count() as i32;
    }

    bonus
}

/// Sorts the entries scoring at least `limit` in descending order at the
/// front of the slice; entries below the limit end up in unspecified order
/// after them. Stable among the sorted entries.
pub fn partial_insertion_sort(entries: &mut [MoveListEntry], limit: i32) {
    let mut sorted_end = 0;
    for p in 1..entries.len() {
        if entries[p].score >= limit {
            let tmp = entries[p];
            sorted_end += 1;
            entries[p] = entries[sorted_end];
            let mut q = sorted_end;
            while q > 0 && entries[q - 1].score < tmp.score {
                entries[q] = entries[q - 1];
                q -= 1;
            }
            entries[q] = tmp;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::historytable::ContinuationHistory;

    struct Histories {
        butterfly: ButterflyHistory,
        capture: CapturePieceToHistory,
        continuation: ContinuationHistory,
    }

    impl Histories {
        fn new() -> Self {
            Self {
                butterfly: ButterflyHistory::new(),
                capture: CapturePieceToHistory::new(),
                continuation: ContinuationHistory::new(),
            }
        }

        fn cont_slice(&self) -> [Option<&PieceToHistory>; 6] {
            let block = self.continuation.get(Piece::WP, Square::A1);
            [
                Some(block),
                Some(block),
                Some(block),
                Some(block),
                None,
                Some(block),
            ]
        }
    }

    fn main_picker<'a>(
        pos: &'a Board,
        hist: &'a Histories,
        tt_move: Option<Move>,
        depth: i32,
    ) -> MovePicker<'a> {
        MovePicker::new_main(
            pos,
            tt_move,
            depth,
            &hist.butterfly,
            &hist.capture,
            hist.cont_slice(),
            None,
            [None; 2],
        )
    }

    fn drain<const SEARCH_MATE: bool>(picker: &mut MovePicker, skip_quiets: bool) -> Vec<Move> {
        let mut out = Vec::new();
        while let Some(m) = picker.next_move::<SEARCH_MATE>(skip_quiets) {
            out.push(m);
        }
        out
    }

    fn pseudo_legal_set(pos: &Board) -> Vec<Move> {
        let mut ml = MoveList::new();
        pos.generate_moves(&mut ml);
        let mut moves: Vec<Move> = ml.iter_moves().copied().collect();
        moves.sort_unstable();
        moves
    }

    #[test]
    fn tt_move_first_then_the_rest() {
        // start position, main search: the TT move leads, followed by the
        // nineteen other quiets, with no duplicates.
        let pos = Board::default();
        let hist = Histories::new();
        let tt = pos.parse_uci("e2e4").unwrap();
        let mut picker = main_picker(&pos, &hist, Some(tt), 8);

        let emitted = drain::<false>(&mut picker, false);
        assert_eq!(emitted[0], tt);
        assert_eq!(emitted.len(), 20);
        assert_eq!(emitted.iter().filter(|&&m| m == tt).count(), 1);

        let mut sorted = emitted.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 20, "duplicate emission");
        assert_eq!(sorted, pseudo_legal_set(&pos));
    }

    #[test]
    fn no_captures_falls_through_to_quiets() {
        let pos = Board::from_fen(
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2",
        )
        .unwrap();
        let hist = Histories::new();
        let mut picker = main_picker(&pos, &hist, None, 6);

        let emitted = drain::<false>(&mut picker, false);
        assert!(!emitted.is_empty());
        assert!(emitted.iter().all(|&m| !pos.is_capture(m)));

        let mut sorted = emitted;
        sorted.sort_unstable();
        assert_eq!(sorted, pseudo_legal_set(&pos));
    }

    #[test]
    fn evasions_capture_ordered_first() {
        // white king in check from the queen on e2; taking the queen must
        // outrank any quiet evasion.
        let pos = Board::from_fen("4k3/8/8/8/8/8/4q3/4K3 w - - 0 1").unwrap();
        assert!(pos.in_check());
        let hist = Histories::new();
        let mut picker = main_picker(&pos, &hist, None, 5);

        let emitted = drain::<false>(&mut picker, false);
        assert!(!emitted.is_empty());
        for &m in &emitted {
            assert!(pos.is_pseudo_legal(m));
        }
        assert!(pos.is_capture(emitted[0]));
        assert_eq!(emitted[0].to(), Square::E2);

        let mut sorted = emitted;
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted, pseudo_legal_set(&pos));
    }

    #[test]
    fn probcut_demotes_tt_that_fails_see() {
        // Nxe5 wins a pawn but loses the knight to the c6-knight, so its
        // exchange value is well below a +200 threshold.
        let pos = Board::from_fen(
            "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 0 3",
        )
        .unwrap();
        let hist = Histories::new();
        let tt = pos.parse_uci("f3e5").unwrap();

        let mut picker = MovePicker::new_probcut(&pos, Some(tt), 200, &hist.capture);
        assert_eq!(drain::<false>(&mut picker, false), Vec::<Move>::new());
    }

    #[test]
    fn probcut_emits_tt_meeting_threshold() {
        let pos = Board::from_fen(
            "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 0 3",
        )
        .unwrap();
        let hist = Histories::new();
        let tt = pos.parse_uci("f3e5").unwrap();

        // SEE of Nxe5 is pawn-for-knight, -573; a threshold below that
        // lets the TT move through, and nothing else qualifies.
        let mut picker = MovePicker::new_probcut(&pos, Some(tt), -700, &hist.capture);
        assert_eq!(drain::<false>(&mut picker, false), vec![tt]);
    }

    #[test]
    fn qsearch_recapture_filter() {
        // two captures are available, but below the recapture horizon only
        // the one landing on the recapture square comes out.
        let pos = Board::from_fen("4k3/8/8/3p3p/8/8/3R3R/4K3 w - - 0 1").unwrap();
        let hist = Histories::new();
        let mut picker = MovePicker::new_quiescence(
            &pos,
            None,
            DEPTH_QS_RECAPTURES - 1,
            &hist.butterfly,
            &hist.capture,
            hist.cont_slice(),
            Some(Square::D5),
        );

        let emitted = drain::<false>(&mut picker, false);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].to(), Square::D5);
    }

    #[test]
    fn qsearch_blocked_recapture_yields_nothing() {
        // the rook's path to the recapture square is blocked by its own
        // king, so no capture exists at all and the picker runs dry
        // without ever reaching the check stages.
        let pos = Board::from_fen("8/8/8/3k4/8/3K4/3R4/8 w - - 0 1").unwrap();
        let hist = Histories::new();
        let mut picker = MovePicker::new_quiescence(
            &pos,
            None,
            DEPTH_QS_RECAPTURES - 1,
            &hist.butterfly,
            &hist.capture,
            hist.cont_slice(),
            Some(Square::D5),
        );
        assert_eq!(drain::<false>(&mut picker, false), Vec::<Move>::new());
    }

    #[test]
    fn qsearch_tries_quiet_checks_at_zero_depth() {
        let pos = Board::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        let hist = Histories::new();
        let mut picker = MovePicker::new_quiescence(
            &pos,
            None,
            DEPTH_QS_CHECKS,
            &hist.butterfly,
            &hist.capture,
            hist.cont_slice(),
            None,
        );

        let emitted = drain::<false>(&mut picker, false);
        // no captures exist; every emission is a quiet check.
        assert!(!emitted.is_empty());
        for &m in &emitted {
            assert!(pos.gives_check(m), "{m} does not give check");
            assert!(!pos.is_capture(m));
        }
    }

    #[test]
    fn bad_capture_deferred_to_the_end() {
        // Nxe5 is the only capture and it loses material, so it is tried
        // after every quiet, exactly once.
        let pos = Board::from_fen("4k3/8/3p4/4p3/8/5N2/8/4K3 w - - 0 1").unwrap();
        let hist = Histories::new();
        let mut picker = main_picker(&pos, &hist, None, 4);

        let emitted = drain::<false>(&mut picker, false);
        let capture = pos.parse_uci("f3e5").unwrap();
        assert_eq!(emitted.iter().filter(|&&m| m == capture).count(), 1);
        assert_eq!(*emitted.last().unwrap(), capture);

        let mut sorted = emitted;
        sorted.sort_unstable();
        assert_eq!(sorted, pseudo_legal_set(&pos));
    }

    #[test]
    fn winning_captures_ordered_by_victim() {
        // the knight can take a rook or a pawn; the rook capture leads.
        let pos = Board::from_fen("k7/8/4p3/5r2/3N4/8/8/K7 w - - 0 1").unwrap();
        let hist = Histories::new();
        let mut picker = main_picker(&pos, &hist, None, 4);

        let emitted = drain::<false>(&mut picker, false);
        assert_eq!(emitted[0], pos.parse_uci("d4f5").unwrap());
        assert_eq!(emitted[1], pos.parse_uci("d4e6").unwrap());
    }

    #[test]
    fn illegal_tt_move_is_skipped() {
        let pos = Board::default();
        let hist = Histories::new();
        // moving from an empty square is not even pseudo-legal.
        let bogus = Move::new(Square::E5, Square::E6);
        let mut picker = main_picker(&pos, &hist, Some(bogus), 8);

        let emitted = drain::<false>(&mut picker, false);
        assert!(!emitted.contains(&bogus));
        let mut sorted = emitted;
        sorted.sort_unstable();
        assert_eq!(sorted, pseudo_legal_set(&pos));
    }

    #[test]
    fn skip_quiets_emits_only_tactical_and_refutations() {
        let pos = Board::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        let hist = Histories::new();
        let killer = pos.parse_uci("a2a3").unwrap();
        let mut picker = MovePicker::new_main(
            &pos,
            None,
            6,
            &hist.butterfly,
            &hist.capture,
            hist.cont_slice(),
            None,
            [Some(killer), None],
        );

        let emitted = drain::<false>(&mut picker, true);
        for &m in &emitted {
            assert!(
                pos.is_capture_stage(m) || m == killer,
                "unexpected quiet {m}"
            );
        }
        assert!(emitted.contains(&killer));
    }

    #[test]
    fn refutations_deduplicated_and_filtered() {
        let pos = Board::default();
        let hist = Histories::new();
        let k1 = pos.parse_uci("g1f3").unwrap();
        let k2 = pos.parse_uci("b1c3").unwrap();
        // countermove collides with the first killer.
        let mut picker = MovePicker::new_main(
            &pos,
            None,
            6,
            &hist.butterfly,
            &hist.capture,
            hist.cont_slice(),
            Some(k1),
            [Some(k1), Some(k2)],
        );

        let emitted = drain::<false>(&mut picker, false);
        assert_eq!(emitted.iter().filter(|&&m| m == k1).count(), 1);
        assert_eq!(emitted.iter().filter(|&&m| m == k2).count(), 1);
        // the killers lead, since no captures exist here.
        assert_eq!(&emitted[..2], &[k1, k2]);

        let mut sorted = emitted;
        sorted.sort_unstable();
        assert_eq!(sorted, pseudo_legal_set(&pos));
    }

    #[test]
    fn capture_refutation_is_not_emitted_as_refutation() {
        // a killer that happens to be a capture in this position must not
        // come out during the refutation stage; it is already covered by
        // the capture stages.
        let pos = Board::from_fen("4k3/8/8/4p3/8/5N2/8/4K3 w - - 0 1").unwrap();
        let hist = Histories::new();
        let capture = pos.parse_uci("f3e5").unwrap();
        let mut picker = MovePicker::new_main(
            &pos,
            None,
            6,
            &hist.butterfly,
            &hist.capture,
            hist.cont_slice(),
            None,
            [Some(capture), None],
        );

        let emitted = drain::<false>(&mut picker, false);
        assert_eq!(emitted.iter().filter(|&&m| m == capture).count(), 1);
        // it is emitted up front as a winning capture, not after quiets.
        assert_eq!(emitted[0], capture);
    }

    #[test]
    fn butterfly_history_orders_quiets() {
        let pos = Board::default();
        let mut hist = Histories::new();
        let favourite = pos.parse_uci("g1f3").unwrap();
        for _ in 0..20 {
            hist.butterfly.update(pos.turn(), favourite, 2_000);
        }
        let mut picker = main_picker(&pos, &hist, None, 8);
        let emitted = drain::<false>(&mut picker, false);
        assert_eq!(emitted[0], favourite);
    }

    #[test]
    fn checking_quiet_preferred_by_default_scorer() {
        // the rook check on d1 collects the check bonus and should lead.
        let pos = Board::from_fen("3k4/8/8/8/8/8/8/K2R4 w - - 0 1").unwrap();
        let hist = Histories::new();
        let mut picker = main_picker(&pos, &hist, None, 1);
        let first = picker.next_move::<false>(false).unwrap();
        assert!(pos.gives_check(first));
    }

    #[test]
    fn search_mate_scorer_emits_full_move_set() {
        let pos = Board::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        let hist = Histories::new();
        let mut picker = main_picker(&pos, &hist, None, 6);
        let mut emitted = drain::<true>(&mut picker, false);
        emitted.sort_unstable();
        emitted.dedup();
        assert_eq!(emitted, pseudo_legal_set(&pos));
    }

    #[test]
    fn exhaustive_and_nonduplicating_across_positions() {
        let fens = [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            "4k3/8/8/8/8/8/4q3/4K3 w - - 0 1",
            "rnbqkbnr/pppp1ppp/8/4pP2/8/8/PPPPP1PP/RNBQKBNR w KQkq e6 0 3",
        ];
        for fen in fens {
            let pos = Board::from_fen(fen).unwrap();
            let hist = Histories::new();
            let tt = pos.legal_moves().first().copied();
            let mut picker = main_picker(&pos, &hist, tt, 3);
            let emitted = drain::<false>(&mut picker, false);

            let mut sorted = emitted.clone();
            sorted.sort_unstable();
            let mut deduped = sorted.clone();
            deduped.dedup();
            assert_eq!(sorted.len(), deduped.len(), "duplicate emission in {fen}");
            assert_eq!(sorted, pseudo_legal_set(&pos), "incomplete emission in {fen}");
        }
    }

    #[test]
    fn partial_sort_contract() {
        let entry = |score| MoveListEntry {
            mov: Move::new(Square::A1, Square::B1),
            score,
        };
        let mut entries = [
            entry(5),
            entry(-100),
            entry(40),
            entry(7),
            entry(-3),
            entry(40),
            entry(0),
        ];
        partial_insertion_sort(&mut entries, 0);

        // everything at or above the limit is sorted descending at the
        // front; entries below the limit may land anywhere after them.
        let qualifying: Vec<i32> = entries
            .iter()
            .map(|e| e.score)
            .filter(|&s| s >= 0)
            .collect();
        let front: Vec<i32> = entries[..qualifying.len()].iter().map(|e| e.score).collect();
        assert_eq!(front, vec![40, 40, 7, 5, 0]);
        for w in front.windows(2) {
            assert!(w[0] >= w[1]);
        }
    }

    #[test]
    fn partial_sort_is_stable_among_qualifying_entries() {
        let entry = |score, from| MoveListEntry {
            mov: Move::new(from, Square::H8),
            score,
        };
        let mut entries = [
            entry(10, Square::A1),
            entry(10, Square::B1),
            entry(10, Square::C1),
            entry(20, Square::D1),
        ];
        partial_insertion_sort(&mut entries, i32::MIN);
        assert_eq!(entries[0].mov.from(), Square::D1);
        assert_eq!(entries[1].mov.from(), Square::A1);
        assert_eq!(entries[2].mov.from(), Square::B1);
        assert_eq!(entries[3].mov.from(), Square::C1);
    }

    #[test]
    fn full_sort_threshold_orders_captures_descending() {
        let pos = Board::from_fen("k7/8/4p3/5r2/3N4/8/8/K7 w - - 0 1").unwrap();
        let mut ml = MoveList::new();
        pos.generate_captures(&mut ml);
        for (i, entry) in ml.iter_mut().enumerate() {
            entry.score = [3, 9, 1, 7, 5].get(i).copied().unwrap_or(0);
        }
        partial_insertion_sort(&mut ml, i32::MIN);
        for w in ml.windows(2) {
            assert!(w[0].score >= w[1].score);
        }
    }
}
