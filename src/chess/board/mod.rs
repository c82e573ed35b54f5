pub mod movegen;
pub mod san;

use std::{
    fmt::{Debug, Display, Formatter},
    sync::atomic::Ordering,
};

use arrayvec::ArrayVec;

use movegen::{
    attacks_by_type, bishop_attacks, pawn_attacks, pawn_attacks_by, rook_attacks, MoveList,
    MAX_POSITION_MOVES, RAY_BETWEEN, RAY_FULL,
};

use crate::{
    chess::{
        chessmove::{Move, MoveFlags},
        fen::Fen,
        piece::{Black, Colour, Piece, PieceType, White},
        squareset::SquareSet,
        types::{CastlingRights, CheckState, Rank, Square, State},
        CHESS960,
    },
    errors::{FenParseError, MoveParseError},
};

#[derive(PartialEq, Eq, Clone)]
pub struct Board {
    /// Copyable state for the board.
    pub(crate) state: State,
    /// The side to move.
    side: Colour,
    /// The number of half moves made since the start of the game.
    ply: usize,

    history: Vec<State>,
}

impl Debug for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("mailbox", &self.state.mailbox)
            .field("side", &self.side)
            .field("ep_sq", &self.state.ep_square)
            .field("fifty_move_counter", &self.state.fifty_move_counter)
            .field("ply", &self.ply)
            .field("threats", &self.state.threats)
            .field("castle_perm", &self.state.castle_perm)
            .finish_non_exhaustive()
    }
}

impl Board {
    pub const STARTING_FEN: &'static str =
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    pub const STARTING_FEN_960: &'static str =
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w AHah - 0 1";

    pub fn empty() -> Self {
        Self {
            state: State::default(),
            side: Colour::White,
            ply: 0,
            history: Vec::new(),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, FenParseError> {
        let parsed = Fen::parse_relaxed(fen)?;
        let mut out = Self::empty();
        out.set_from_fen(&parsed);
        Ok(out)
    }

    pub fn set_from_fen(&mut self, fen: &Fen) {
        self.reset();

        self.state.bbs = fen.board;

        for sq in Square::all() {
            self.state.mailbox[sq] = fen.board.piece_at(sq);
        }

        self.side = fen.turn;
        self.state.castle_perm = fen.castling;
        self.state.ep_square = fen.ep;
        self.state.fifty_move_counter = fen.halfmove;
        self.ply = (fen.fullmove.get() - 1) * 2;
        if self.side == Colour::Black {
            self.ply += 1;
        }

        // generate derived state
        self.regenerate_derived_state();

        // clear en-passant squares that no pawn can actually take:
        let can_attack = self
            .state
            .ep_square
            .into_iter()
            .flat_map(|sq| {
                let sources = pawn_attacks_by(sq.as_set(), !self.side);
                let our_pawns =
                    self.state.bbs.colours[self.side] & self.state.bbs.pieces[PieceType::Pawn];

                (sources & our_pawns).into_iter().zip(std::iter::repeat(sq))
            })
            .map(|(from, to)| Move::new_with_flags(from, to, MoveFlags::EnPassant))
            .any(|mv| self.is_pseudo_legal(mv) && self.is_legal(mv));

        if !can_attack {
            self.state.ep_square = None;
        }
    }

    pub fn set_startpos(&mut self) {
        let starting_fen = if CHESS960.load(Ordering::SeqCst) {
            Self::STARTING_FEN_960
        } else {
            Self::STARTING_FEN
        };
        let fen = Fen::parse(starting_fen).expect("STARTING_FEN is broken");
        self.set_from_fen(&fen);
    }

    pub fn reset(&mut self) {
        self.state = State::default();
        self.side = Colour::White;
        self.ply = 0;
        self.history.clear();
    }

    fn regenerate_derived_state(&mut self) {
        self.state.threats = self.state.bbs.generate_threats(self.side);
        self.state.pinned = [
            self.state.bbs.generate_pinned(Colour::White),
            self.state.bbs.generate_pinned(Colour::Black),
        ];
    }

    pub const fn turn(&self) -> Colour {
        self.side
    }

    pub const fn ep_sq(&self) -> Option<Square> {
        self.state.ep_square
    }

    pub const fn ply(&self) -> usize {
        self.ply
    }

    pub const fn fifty_move_counter(&self) -> u8 {
        self.state.fifty_move_counter
    }

    pub const fn castling_rights(&self) -> CastlingRights {
        self.state.castle_perm
    }

    pub fn in_check(&self) -> bool {
        self.state.threats.checkers.non_empty()
    }

    pub fn checkers(&self) -> SquareSet {
        self.state.threats.checkers
    }

    pub fn threats(&self) -> SquareSet {
        self.state.threats.all
    }

    pub fn king_sq(&self, side: Colour) -> Square {
        self.state.bbs.king_sq(side)
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.state.mailbox[sq]
    }

    /// The piece that is picked up by the given move.
    pub fn moved_piece(&self, m: Move) -> Option<Piece> {
        self.state.mailbox[m.from()]
    }

    pub fn pieces(&self, side: Colour, piece_type: PieceType) -> SquareSet {
        self.state.bbs.pieces[piece_type] & self.state.bbs.colours[side]
    }

    pub fn occupied(&self) -> SquareSet {
        self.state.bbs.occupied()
    }

    /// Determines if `sq` is attacked by `side`.
    pub fn sq_attacked(&self, sq: Square, side: Colour) -> bool {
        self.state.bbs.sq_attacked(sq, side)
    }

    pub fn any_attacked(&self, squares: SquareSet, by: Colour) -> bool {
        for sq in squares {
            if self.sq_attacked(sq, by) {
                return true;
            }
        }
        false
    }

    /// Union of the attacks of all pieces of the given type and colour,
    /// over the current occupancy.
    pub fn attacks_by(&self, pt: PieceType, side: Colour) -> SquareSet {
        let pieces = self.pieces(side, pt);
        if pt == PieceType::Pawn {
            return pawn_attacks_by(pieces, side);
        }
        let occupied = self.state.bbs.occupied();
        let mut acc = SquareSet::EMPTY;
        for sq in pieces {
            acc |= attacks_by_type(pt, sq, occupied);
        }
        acc
    }

    /// Attacks of a piece of the given type standing on `sq`, over the
    /// current occupancy. Not defined for pawns, whose attacks depend on
    /// colour.
    pub fn attacks_from(&self, pt: PieceType, sq: Square) -> SquareSet {
        attacks_by_type(pt, sq, self.state.bbs.occupied())
    }

    /// Squares from which a piece of the given type belonging to the side
    /// to move would give direct check.
    pub fn check_squares(&self, pt: PieceType) -> SquareSet {
        let them = !self.side;
        let their_king = self.state.bbs.king_sq(them);
        match pt {
            PieceType::Pawn => pawn_attacks_by(their_king.as_set(), them),
            PieceType::King => SquareSet::EMPTY,
            _ => attacks_by_type(pt, their_king, self.state.bbs.occupied()),
        }
    }

    /// Gets the piece that will be captured by the given move, if any.
    /// En passant captures report the taken pawn.
    pub fn captured_piece(&self, m: Move) -> Option<Piece> {
        if m.is_castle() {
            return None;
        }
        if m.is_ep() {
            return Some(Piece::new(!self.side, PieceType::Pawn));
        }
        self.state.mailbox[m.to()]
    }

    /// Determines whether this move would be a capture in the current position.
    pub fn is_capture(&self, m: Move) -> bool {
        self.captured_piece(m).is_some()
    }

    /// Capture-stage moves: captures plus queen promotions, the set the
    /// capture generator emits.
    pub fn is_capture_stage(&self, m: Move) -> bool {
        self.is_capture(m) || m.promotion_type() == Some(PieceType::Queen)
    }

    /// Determines whether this move would be tactical in the current position.
    pub fn is_tactical(&self, m: Move) -> bool {
        m.is_promo() || m.is_ep() || self.is_capture(m)
    }

    /// Checks whether a move is pseudo-legal.
    /// This means that it is a legal move, except for the fact that it might leave the king in check.
    pub fn is_pseudo_legal(&self, m: Move) -> bool {
        if m.is_castle() {
            return self.is_pseudo_legal_castling(m);
        }

        let from = m.from();
        let to = m.to();

        let moved_piece = self.state.mailbox[from];
        let captured_piece = self.state.mailbox[to];

        let Some(moved_piece) = moved_piece else {
            return false;
        };

        if moved_piece.colour() != self.side {
            return false;
        }

        if captured_piece.is_some_and(|piece| piece.colour() == self.side) {
            return false;
        }

        if captured_piece.is_some()
            && moved_piece.piece_type() == PieceType::Pawn
            && from.file() == to.file()
        {
            return false;
        }

        if moved_piece.piece_type() == PieceType::Pawn {
            let should_be_promoting = to > Square::H7 || to < Square::A2;
            if should_be_promoting != m.is_promo() {
                return false;
            }
            if m.is_ep() {
                let attacks = match self.side {
                    Colour::White => pawn_attacks::<White>(from.as_set()),
                    Colour::Black => pawn_attacks::<Black>(from.as_set()),
                };
                return Some(to) == self.state.ep_square && attacks.contains_square(to);
            } else if (SquareSet::RANK_4 | SquareSet::RANK_5).contains_square(to)
                && (SquareSet::RANK_2 | SquareSet::RANK_7).contains_square(from)
                && from.file() == to.file()
            {
                if from.relative_rank(self.side) != Rank::Two {
                    return false;
                }
                let Some(one_forward) = from.pawn_push(self.side) else {
                    return false;
                };
                return self.state.mailbox[one_forward].is_none()
                    && Some(to) == one_forward.pawn_push(self.side);
            } else if captured_piece.is_none() {
                return Some(to) == from.pawn_push(self.side);
            }
            // pawn capture
            return match self.side {
                Colour::White => pawn_attacks::<White>(from.as_set()).contains_square(to),
                Colour::Black => pawn_attacks::<Black>(from.as_set()).contains_square(to),
            };
        }

        // not a pawn move, but is somehow ep/promo?
        if m.is_ep() || m.is_promo() {
            return false;
        }

        if moved_piece.piece_type() == PieceType::King && self.state.threats.all.contains_square(to)
        {
            return false;
        }

        attacks_by_type(moved_piece.piece_type(), from, self.state.bbs.occupied())
            .contains_square(to)
    }

    pub fn is_pseudo_legal_castling(&self, m: Move) -> bool {
        // illegal if:
        // - we're not moving the king
        // - we're not doing everything on the home rank
        // - we don't have castling rights on the target square
        // - we're in check
        // - there are pieces between the king and the rook
        // - the king passes through a square that is attacked by the opponent
        // - the king ends up in check (not checked here)
        let Some(moved) = self.state.mailbox[m.from()] else {
            return false;
        };
        if moved != Piece::new(self.side, PieceType::King) {
            return false;
        }
        let home_rank = match self.side {
            Colour::White => SquareSet::RANK_1,
            Colour::Black => SquareSet::RANK_8,
        };
        if !home_rank.contains_square(m.to()) {
            return false;
        }
        if !home_rank.contains_square(m.from()) {
            return false;
        }
        let (king_dst, rook_dst) = if m.to() > m.from() {
            // kingside castling.
            if self.state.castle_perm.kingside(self.side) != Some(m.to().file()) {
                // the to-square doesn't match the castling rights
                // (it goes to the wrong place, or the rights don't exist)
                return false;
            }
            (
                Square::G1.relative_to(self.side),
                Square::F1.relative_to(self.side),
            )
        } else {
            // queenside castling.
            if self.state.castle_perm.queenside(self.side) != Some(m.to().file()) {
                return false;
            }
            (
                Square::C1.relative_to(self.side),
                Square::D1.relative_to(self.side),
            )
        };

        // king_path is the path the king takes to get to its destination.
        let king_path = RAY_BETWEEN[m.from()][king_dst];
        // rook_path is the path the rook takes to get to its destination.
        let rook_path = RAY_BETWEEN[m.from()][m.to()];
        // castle_occ is the occupancy that "counts" for castling.
        let castle_occ = self.state.bbs.occupied() ^ m.from().as_set() ^ m.to().as_set();

        (castle_occ & (king_path | rook_path | king_dst.as_set() | rook_dst.as_set())).is_empty()
            && !self.any_attacked(king_path | m.from().as_set(), self.side.flip())
    }

    /// Checks whether a given pseudo-legal move is legal in the current position.
    pub fn is_legal(&self, m: Move) -> bool {
        debug_assert!(self.is_pseudo_legal(m));

        let turn = self.turn();
        let bbs = &self.state.bbs;

        let from = m.from();
        let to = m.to();

        let us = bbs.colours[turn];
        let our_king_bb = bbs.pieces[PieceType::King] & us;
        let king = our_king_bb.first().unwrap();

        let them = bbs.colours[!turn];
        let their_queens = bbs.pieces[PieceType::Queen] & them;
        let their_bishops = bbs.pieces[PieceType::Bishop] & them;
        let their_rooks = bbs.pieces[PieceType::Rook] & them;

        if m.is_castle() {
            let king_to = m.history_to_square();
            return !(self.state.threats.all.contains_square(king_to)
                || CHESS960.load(Ordering::Relaxed)
                    && self.state.pinned[turn].contains_square(to));
        } else if m.is_ep() {
            let rank = if to.rank() == Rank::Three {
                Rank::Four
            } else {
                Rank::Five
            };

            let cap_sq = Square::from_rank_file(rank, to.file());

            let occ_after = bbs.occupied() ^ to.as_set() ^ from.as_set() ^ cap_sq.as_set();

            return (bishop_attacks(king, occ_after) & (their_queens | their_bishops)).is_empty()
                && (rook_attacks(king, occ_after) & (their_queens | their_rooks)).is_empty();
        }

        let moving = self.state.mailbox[from].unwrap();

        if moving.piece_type() == PieceType::King {
            let without_king = bbs.occupied() ^ our_king_bb;

            let diags = their_queens | their_bishops;
            let orthos = their_queens | their_rooks;
            let moving_into_check = (bishop_attacks(to, without_king) & diags).non_empty()
                || (rook_attacks(to, without_king) & orthos).non_empty();
            return !moving_into_check;
        }

        // moving anything other than the king
        // is illegal when in double-check.
        if self.state.threats.checkers.many() {
            return false;
        }

        // if your piece is pinned, you can only
        // move it along the direction that it is
        // pinned in.
        if self.state.pinned[turn].contains_square(from)
            && !RAY_FULL[from][to].contains_square(king)
        {
            return false;
        }

        // not in check and not moving the king? a-ok.
        if self.state.threats.checkers.is_empty() {
            return true;
        }

        // single checker, you have to be
        // capturing it or blocking the check.
        let checker = self.state.threats.checkers.first().unwrap();
        (RAY_BETWEEN[king][checker] | self.state.threats.checkers).contains_square(to)
    }

    /// Tests whether a pseudo-legal move gives check, without making it.
    pub fn gives_check(&self, m: Move) -> bool {
        let us = self.side;
        let them = !us;
        let bbs = &self.state.bbs;
        let their_king = bbs.king_sq(them);
        let from = m.from();
        let to = m.to();
        let moved = self.state.mailbox[from].unwrap();

        if m.is_castle() {
            // castling is encoded as king takes rook.
            let (king_dst, rook_dst) = if to > from {
                (Square::G1.relative_to(us), Square::F1.relative_to(us))
            } else {
                (Square::C1.relative_to(us), Square::D1.relative_to(us))
            };
            let occ_after = (bbs.occupied() ^ from.as_set() ^ to.as_set())
                | king_dst.as_set()
                | rook_dst.as_set();
            return rook_attacks(rook_dst, occ_after).contains_square(their_king);
        }

        // direct check?
        if self.check_squares(moved.piece_type()).contains_square(to) {
            return true;
        }

        // discovered check?
        if (bbs.slider_blockers(them) & bbs.colours[us]).contains_square(from)
            && !RAY_FULL[from][to].contains_square(their_king)
        {
            return true;
        }

        if let Some(promo) = m.promotion_type() {
            let occ_after = bbs.occupied() ^ from.as_set();
            return attacks_by_type(promo, to, occ_after).contains_square(their_king);
        }

        if m.is_ep() {
            // the only case left is a discovered check through the
            // captured pawn.
            let cap_sq = Square::from_rank_file(from.rank(), to.file());
            let occ_after =
                (bbs.occupied() ^ from.as_set() ^ cap_sq.as_set()) | to.as_set();
            let our_diags = (bbs.all_bishops() | bbs.all_queens()) & bbs.colours[us];
            let our_orthos = (bbs.all_rooks() | bbs.all_queens()) & bbs.colours[us];
            return (bishop_attacks(their_king, occ_after) & our_diags).non_empty()
                || (rook_attacks(their_king, occ_after) & our_orthos).non_empty();
        }

        false
    }

    /// What check-state results from making the given legal move.
    pub fn gives(&self, m: Move) -> CheckState {
        debug_assert!(self.is_pseudo_legal(m));
        debug_assert!(self.is_legal(m));
        let mut playout = Self {
            state: self.state.clone(),
            side: self.side,
            ply: self.ply,
            history: Vec::new(),
        };
        playout.make_move(m);
        if !playout.in_check() {
            return CheckState::None;
        }
        let mut ml = MoveList::new();
        playout.generate_moves(&mut ml);
        for &reply in ml.iter_moves() {
            if playout.is_legal(reply) {
                return CheckState::Check;
            }
        }
        CheckState::Checkmate
    }

    /// Tests if the static exchange value of the move meets the threshold,
    /// with an alpha-beta-like walk over the capture sequence on the target
    /// square.
    pub fn see_ge(&self, m: Move, threshold: i32) -> bool {
        // Only deal with normal moves, assume others pass a simple SEE.
        if m.is_castle() || m.is_ep() || m.is_promo() {
            return 0 >= threshold;
        }

        let from = m.from();
        let to = m.to();
        let bbs = &self.state.bbs;

        // The opponent may be able to recapture, so this is the best result
        // we can hope for.
        let mut swap = self.state.mailbox[to].map_or(0, |p| p.piece_type().mg_value()) - threshold;
        if swap < 0 {
            return false;
        }

        // Now assume the worst possible result: that the opponent can
        // capture our piece for free.
        swap = self.state.mailbox[from].unwrap().piece_type().mg_value() - swap;
        if swap <= 0 {
            return true;
        }

        let diags = bbs.all_bishops() | bbs.all_queens();
        let orthos = bbs.all_rooks() | bbs.all_queens();

        let mut occupied = bbs.occupied() ^ from.as_set() ^ to.as_set();
        let mut stm = self.side;
        let mut attackers = bbs.all_attackers_to_sq(to, occupied);
        let mut res = 1;

        loop {
            stm = !stm;
            attackers &= occupied;
            let stm_attackers = attackers & bbs.colours[stm];
            if stm_attackers.is_empty() {
                break;
            }
            res ^= 1;

            // Locate the least valuable attacker, put it on the square,
            // and add any x-ray attackers that stood behind it.
            let pawns = stm_attackers & bbs.all_pawns();
            if pawns.non_empty() {
                swap = PieceType::Pawn.mg_value() - swap;
                if swap < res {
                    break;
                }
                occupied ^= pawns.isolate_lsb();
                attackers |= bishop_attacks(to, occupied) & diags;
                continue;
            }
            let knights = stm_attackers & bbs.all_knights();
            if knights.non_empty() {
                swap = PieceType::Knight.mg_value() - swap;
                if swap < res {
                    break;
                }
                occupied ^= knights.isolate_lsb();
                continue;
            }
            let bishops = stm_attackers & bbs.all_bishops();
            if bishops.non_empty() {
                swap = PieceType::Bishop.mg_value() - swap;
                if swap < res {
                    break;
                }
                occupied ^= bishops.isolate_lsb();
                attackers |= bishop_attacks(to, occupied) & diags;
                continue;
            }
            let rooks = stm_attackers & bbs.all_rooks();
            if rooks.non_empty() {
                swap = PieceType::Rook.mg_value() - swap;
                if swap < res {
                    break;
                }
                occupied ^= rooks.isolate_lsb();
                attackers |= rook_attacks(to, occupied) & orthos;
                continue;
            }
            let queens = stm_attackers & bbs.all_queens();
            if queens.non_empty() {
                swap = PieceType::Queen.mg_value() - swap;
                if swap < res {
                    break;
                }
                occupied ^= queens.isolate_lsb();
                attackers |= (bishop_attacks(to, occupied) & diags)
                    | (rook_attacks(to, occupied) & orthos);
                continue;
            }

            // King capture: if the opponent still has attackers, the king
            // cannot actually recapture, so the result flips.
            return if (attackers & !bbs.colours[stm]).non_empty() {
                res == 0
            } else {
                res != 0
            };
        }

        res != 0
    }

    pub fn make_move(&mut self, m: Move) {
        debug_assert!(self.is_pseudo_legal(m));
        debug_assert!(self.is_legal(m));

        self.history.push(self.state.clone());

        let from = m.from();
        let mut to = m.to();
        let castle = m.is_castle();
        let side = self.side;
        let piece = self.state.mailbox[from].unwrap();
        let captured = if castle { None } else { self.state.mailbox[to] };
        let mut castling_perm = self.state.castle_perm;

        self.state.fifty_move_counter += 1;

        if m.is_ep() {
            let clear_at = match side {
                Colour::White => to.sub(8),
                Colour::Black => to.add(8),
            }
            .unwrap();
            let taken = Piece::new(side.flip(), PieceType::Pawn);
            self.state.bbs.clear_piece_at(clear_at, taken);
            self.state.mailbox[clear_at] = None;
        } else if castle {
            // from, to, and piece are encoded as king-captures-rook, so pick
            // both pieces up before putting either down - in Chess960 the
            // destination squares can overlap the origin squares.
            let rook_from = to;
            let rook = Piece::new(side, PieceType::Rook);
            let rook_to = if Some(to.file()) == castling_perm.kingside(side) {
                to = Square::G1.relative_to(side);
                Square::F1.relative_to(side)
            } else {
                to = Square::C1.relative_to(side);
                Square::D1.relative_to(side)
            };
            self.state.bbs.clear_piece_at(from, piece);
            self.state.mailbox[from] = None;
            self.state.bbs.clear_piece_at(rook_from, rook);
            self.state.mailbox[rook_from] = None;
            self.state.bbs.set_piece_at(to, piece);
            self.state.mailbox[to] = Some(piece);
            self.state.bbs.set_piece_at(rook_to, rook);
            self.state.mailbox[rook_to] = Some(rook);
        }

        if let Some(captured) = captured {
            self.state.fifty_move_counter = 0;
            self.state.bbs.clear_piece_at(to, captured);
            self.state.mailbox[to] = None;
        }

        self.state.ep_square = None;
        if piece.piece_type() == PieceType::Pawn {
            self.state.fifty_move_counter = 0;
            let double_push = from.rank().abs_diff(to.rank()) == 2;
            if double_push
                && ((to.as_set().west_one() | to.as_set().east_one())
                    & self.state.bbs.pieces[PieceType::Pawn]
                    & self.state.bbs.colours[side.flip()])
                .non_empty()
            {
                self.state.ep_square = match side {
                    Colour::White => from.add(8),
                    Colour::Black => from.sub(8),
                };
            }
        }

        if let Some(promo) = m.promotion_type() {
            let promo = Piece::new(side, promo);
            self.state.bbs.clear_piece_at(from, piece);
            self.state.mailbox[from] = None;
            self.state.bbs.set_piece_at(to, promo);
            self.state.mailbox[to] = Some(promo);
        } else if !castle {
            self.state.bbs.move_piece(from, to, piece);
            self.state.mailbox[from] = None;
            self.state.mailbox[to] = Some(piece);
        }

        // update castling rights
        if piece == Piece::WR && from.rank() == Rank::One {
            castling_perm.remove::<White>(from.file());
        } else if piece == Piece::BR && from.rank() == Rank::Eight {
            castling_perm.remove::<Black>(from.file());
        } else if piece == Piece::WK {
            castling_perm.clear::<White>();
        } else if piece == Piece::BK {
            castling_perm.clear::<Black>();
        }
        if captured.is_some() {
            if to.rank() == Rank::One {
                castling_perm.remove::<White>(to.file());
            } else if to.rank() == Rank::Eight {
                castling_perm.remove::<Black>(to.file());
            }
        }
        self.state.castle_perm = castling_perm;

        self.side = self.side.flip();
        self.ply += 1;

        self.regenerate_derived_state();
    }

    pub fn unmake_move(&mut self) {
        self.ply -= 1;
        self.side = self.side.flip();
        self.state = self.history.pop().expect("No move to unmake!");
    }

    /// Parses a move in the UCI wire format against the current position.
    pub fn parse_uci(&self, uci: &str) -> Result<Move, MoveParseError> {
        use MoveParseError::{
            IllegalMove, InvalidFromSquareFile, InvalidFromSquareRank, InvalidLength,
            InvalidPromotionPiece, InvalidToSquareFile, InvalidToSquareRank,
        };
        let bytes = uci.as_bytes();
        if !(4..=5).contains(&bytes.len()) {
            return Err(InvalidLength(bytes.len()));
        }
        if !(b'a'..=b'h').contains(&bytes[0]) {
            return Err(InvalidFromSquareFile(bytes[0] as char));
        }
        if !(b'1'..=b'8').contains(&bytes[1]) {
            return Err(InvalidFromSquareRank(bytes[1] as char));
        }
        if !(b'a'..=b'h').contains(&bytes[2]) {
            return Err(InvalidToSquareFile(bytes[2] as char));
        }
        if !(b'1'..=b'8').contains(&bytes[3]) {
            return Err(InvalidToSquareRank(bytes[3] as char));
        }
        if bytes.len() == 5 && ![b'n', b'b', b'r', b'q'].contains(&bytes[4]) {
            return Err(InvalidPromotionPiece(bytes[4] as char));
        }

        let from = Square::new((bytes[1] - b'1') * 8 + (bytes[0] - b'a')).unwrap();
        let to = Square::new((bytes[3] - b'1') * 8 + (bytes[2] - b'a')).unwrap();

        let frc_cleanup = !CHESS960.load(Ordering::Relaxed);

        self.legal_moves()
            .into_iter()
            .find(|&m| {
                let m_to = if frc_cleanup && m.is_castle() {
                    // if we're in normal UCI mode, we'll rework our castling moves into the
                    // standard format.
                    match m.to() {
                        Square::A1 => Square::C1,
                        Square::H1 => Square::G1,
                        Square::A8 => Square::C8,
                        Square::H8 => Square::G8,
                        _ => m.to(),
                    }
                } else {
                    m.to()
                };
                m.from() == from
                    && m_to == to
                    && match (bytes.get(4), m.promotion_type()) {
                        (None, None) => true,
                        (Some(&b), Some(pt)) => pt.promo_char() == Some(b as char),
                        _ => false,
                    }
            })
            .ok_or_else(|| IllegalMove(uci.to_string()))
    }

    pub fn legal_moves(&self) -> ArrayVec<Move, MAX_POSITION_MOVES> {
        let mut legal_moves = ArrayVec::new();
        let mut move_list = MoveList::new();
        self.generate_moves(&mut move_list);
        for &m in move_list.iter_moves() {
            if self.is_legal(m) {
                legal_moves.push(m);
            }
        }
        legal_moves
    }
}

impl Default for Board {
    fn default() -> Self {
        let mut out = Self::empty();
        out.set_startpos();
        out
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        use crate::chess::types::File;

        let mut counter = 0;
        for rank in Rank::all().rev() {
            for file in File::all() {
                let sq = Square::from_rank_file(rank, file);
                let piece = self.state.mailbox[sq];
                if let Some(piece) = piece {
                    if counter != 0 {
                        write!(f, "{counter}")?;
                    }
                    counter = 0;
                    write!(f, "{piece}")?;
                } else {
                    counter += 1;
                }
            }
            if counter != 0 {
                write!(f, "{counter}")?;
            }
            counter = 0;
            if rank != Rank::One {
                write!(f, "/")?;
            }
        }

        match self.side {
            Colour::White => write!(f, " w")?,
            Colour::Black => write!(f, " b")?,
        }
        write!(f, " ")?;
        if self.state.castle_perm == CastlingRights::default() {
            write!(f, "-")?;
        } else {
            for (_, ch) in [
                self.state.castle_perm.kingside(Colour::White),
                self.state.castle_perm.queenside(Colour::White),
                self.state.castle_perm.kingside(Colour::Black),
                self.state.castle_perm.queenside(Colour::Black),
            ]
            .into_iter()
            .zip("KQkq".chars())
            .filter(|(m, _)| m.is_some())
            {
                write!(f, "{ch}")?;
            }
        }
        if let Some(ep_sq) = self.state.ep_square {
            write!(f, " {ep_sq}")?;
        } else {
            write!(f, " -")?;
        }
        write!(f, " {}", self.state.fifty_move_counter)?;
        write!(f, " {}", self.ply / 2 + 1)?;

        Ok(())
    }
}
