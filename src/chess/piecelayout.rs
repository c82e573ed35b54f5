use std::fmt::Display;

use crate::chess::{
    board::movegen::{
        bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks, RAY_BETWEEN,
    },
    piece::{Black, Col, Colour, Piece, PieceType, White},
    squareset::SquareSet,
    types::{File, Rank, Square},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PieceLayout {
    pub pieces: [SquareSet; 6],
    pub colours: [SquareSet; 2],
}

impl PieceLayout {
    pub fn king<C: Col>(&self) -> SquareSet {
        self.all_kings() & self.our_pieces::<C>()
    }

    pub fn king_sq(&self, colour: Colour) -> Square {
        let king = self.pieces[PieceType::King] & self.colours[colour];
        debug_assert_eq!(king.count(), 1);
        king.first().unwrap()
    }

    pub fn pawns<C: Col>(&self) -> SquareSet {
        self.all_pawns() & self.our_pieces::<C>()
    }

    pub fn their_pieces<C: Col>(&self) -> SquareSet {
        self.colours[C::Opposite::COLOUR]
    }

    pub fn our_pieces<C: Col>(&self) -> SquareSet {
        self.colours[C::COLOUR]
    }

    pub fn orthos<C: Col>(&self) -> SquareSet {
        (self.all_rooks() | self.all_queens()) & self.our_pieces::<C>()
    }

    pub fn diags<C: Col>(&self) -> SquareSet {
        (self.all_bishops() | self.all_queens()) & self.our_pieces::<C>()
    }

    pub fn empty(&self) -> SquareSet {
        !self.occupied()
    }

    pub fn occupied(&self) -> SquareSet {
        self.colours[Colour::White] | self.colours[Colour::Black]
    }

    pub fn knights<C: Col>(&self) -> SquareSet {
        self.all_knights() & self.our_pieces::<C>()
    }

    pub fn all_pawns(&self) -> SquareSet {
        self.pieces[PieceType::Pawn]
    }

    pub fn all_knights(&self) -> SquareSet {
        self.pieces[PieceType::Knight]
    }

    pub fn all_bishops(&self) -> SquareSet {
        self.pieces[PieceType::Bishop]
    }

    pub fn all_rooks(&self) -> SquareSet {
        self.pieces[PieceType::Rook]
    }

    pub fn all_queens(&self) -> SquareSet {
        self.pieces[PieceType::Queen]
    }

    pub fn all_kings(&self) -> SquareSet {
        self.pieces[PieceType::King]
    }

    pub fn move_piece(&mut self, from: Square, to: Square, piece: Piece) {
        let from_to_bb = from.as_set() | to.as_set();
        self.pieces[piece.piece_type()] ^= from_to_bb;
        self.colours[piece.colour()] ^= from_to_bb;
    }

    pub fn set_piece_at(&mut self, sq: Square, piece: Piece) {
        let sq_bb = sq.as_set();
        self.pieces[piece.piece_type()] |= sq_bb;
        self.colours[piece.colour()] |= sq_bb;
    }

    pub fn clear_piece_at(&mut self, sq: Square, piece: Piece) {
        let sq_bb = sq.as_set();
        self.pieces[piece.piece_type()] &= !sq_bb;
        self.colours[piece.colour()] &= !sq_bb;
    }

    pub fn piece_bb(&self, piece: Piece) -> SquareSet {
        SquareSet::intersection(
            self.pieces[piece.piece_type()],
            self.colours[piece.colour()],
        )
    }

    pub fn of_type(&self, piece_type: PieceType) -> SquareSet {
        self.pieces[piece_type]
    }

    pub fn all_attackers_to_sq(&self, sq: Square, occupied: SquareSet) -> SquareSet {
        let sq_bb = sq.as_set();
        let black_pawn_attackers = pawn_attacks::<White>(sq_bb) & self.pawns::<Black>();
        let white_pawn_attackers = pawn_attacks::<Black>(sq_bb) & self.pawns::<White>();
        let knight_attackers = knight_attacks(sq) & self.all_knights();
        let diag_attackers =
            bishop_attacks(sq, occupied) & (self.all_bishops() | self.all_queens());
        let orth_attackers = rook_attacks(sq, occupied) & (self.all_rooks() | self.all_queens());
        let king_attackers = king_attacks(sq) & self.all_kings();
        black_pawn_attackers
            | white_pawn_attackers
            | knight_attackers
            | diag_attackers
            | orth_attackers
            | king_attackers
    }

    pub fn sq_attacked_by<C: Col>(&self, sq: Square) -> bool {
        (self.all_attackers_to_sq(sq, self.occupied()) & self.our_pieces::<C>()).non_empty()
    }

    pub fn sq_attacked(&self, sq: Square, side: Colour) -> bool {
        match side {
            Colour::White => self.sq_attacked_by::<White>(sq),
            Colour::Black => self.sq_attacked_by::<Black>(sq),
        }
    }

    /// Squares attacked by the opponent of `side`, and the pieces currently
    /// checking `side`'s king. The attack map is computed with `side`'s king
    /// removed from the occupancy, so a checked king cannot legally step
    /// backwards along a slider's ray.
    pub fn generate_threats(&self, side: Colour) -> Threats {
        match side {
            Colour::White => self.generate_threats_for::<White>(),
            Colour::Black => self.generate_threats_for::<Black>(),
        }
    }

    fn generate_threats_for<C: Col>(&self) -> Threats {
        let our_king = self.king::<C>();
        let occ = self.occupied() ^ our_king;

        let mut all = pawn_attacks::<C::Opposite>(self.pawns::<C::Opposite>());
        for sq in self.knights::<C::Opposite>() {
            all |= knight_attacks(sq);
        }
        for sq in self.diags::<C::Opposite>() {
            all |= bishop_attacks(sq, occ);
        }
        for sq in self.orthos::<C::Opposite>() {
            all |= rook_attacks(sq, occ);
        }
        all |= king_attacks(self.king_sq(C::Opposite::COLOUR));

        let king_sq = our_king.first().unwrap();
        let checkers =
            self.all_attackers_to_sq(king_sq, self.occupied()) & self.their_pieces::<C>();

        Threats { all, checkers }
    }

    /// Pieces of either colour that are the sole obstruction between an enemy
    /// slider and the king of `side`. Intersected with `side`'s own pieces
    /// this gives the absolute pins; intersected with the opponent's pieces
    /// it gives the discovered-check candidates against `side`'s king.
    pub fn slider_blockers(&self, side: Colour) -> SquareSet {
        let ksq = self.king_sq(side);
        let them = self.colours[!side];
        let their_diags = (self.all_bishops() | self.all_queens()) & them;
        let their_orthos = (self.all_rooks() | self.all_queens()) & them;

        let snipers = (bishop_attacks(ksq, SquareSet::EMPTY) & their_diags)
            | (rook_attacks(ksq, SquareSet::EMPTY) & their_orthos);

        let occupied = self.occupied();
        let mut blockers = SquareSet::EMPTY;
        for sniper in snipers {
            let between = RAY_BETWEEN[ksq][sniper] & occupied;
            if between.one() {
                blockers |= between;
            }
        }
        blockers
    }

    pub fn generate_pinned(&self, side: Colour) -> SquareSet {
        self.slider_blockers(side) & self.colours[side]
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        let sq_bb = sq.as_set();
        let colour = if (self.our_pieces::<White>() & sq_bb).non_empty() {
            Colour::White
        } else if (self.our_pieces::<Black>() & sq_bb).non_empty() {
            Colour::Black
        } else {
            return None;
        };
        for piece in PieceType::all() {
            if (self.pieces[piece] & sq_bb).non_empty() {
                return Some(Piece::new(colour, piece));
            }
        }
        panic!("Bit set in colour square-set for {colour:?} but not in piece square-sets! square is {sq}");
    }

    fn any_bbs_overlapping(&self) -> bool {
        if (self.colours[0] & self.colours[1]).non_empty() {
            return true;
        }
        for i in 0..self.pieces.len() {
            for j in i + 1..self.pieces.len() {
                if (self.pieces[i] & self.pieces[j]).non_empty() {
                    return true;
                }
            }
        }
        false
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Threats {
    pub all: SquareSet,
    pub checkers: SquareSet,
}

impl Display for PieceLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for rank in Rank::all().rev() {
            for file in File::all() {
                let sq = Square::from_rank_file(rank, file);
                if let Some(piece) = self.piece_at(sq) {
                    write!(f, " {}", piece.char())?;
                } else {
                    write!(f, " .")?;
                }
            }
            writeln!(f)?;
        }
        if self.any_bbs_overlapping() {
            writeln!(f, "WARNING: Some square-sets are overlapping")?;
        }
        Ok(())
    }
}
