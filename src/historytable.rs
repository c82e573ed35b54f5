use crate::chess::{
    chessmove::Move,
    piece::{Colour, Piece, PieceType},
    types::Square,
};

/// The history gravity update: pulls an entry towards the bonus while
/// decaying it in proportion to its current magnitude, which keeps every
/// entry within ±BOUND without explicit clamping.
fn gravity(entry: &mut i16, bonus: i32, bound: i32) {
    let bonus = bonus.clamp(-bound, bound);
    let decayed = i32::from(*entry) * bonus.abs() / bound;
    #[allow(clippy::cast_possible_truncation)]
    {
        *entry += (bonus - decayed) as i16;
    }
}

/// Success statistics for quiet moves, indexed by the side to move and the
/// from/to squares of the move.
#[derive(Clone)]
pub struct ButterflyHistory {
    table: [[i16; 64 * 64]; 2],
}

impl ButterflyHistory {
    const BOUND: i32 = 7183;

    pub const fn new() -> Self {
        Self {
            table: [[0; 64 * 64]; 2],
        }
    }

    pub fn clear(&mut self) {
        self.table.iter_mut().flatten().for_each(|x| *x = 0);
    }

    pub const fn get(&self, side: Colour, m: Move) -> i16 {
        self.table[side as usize][m.from_to()]
    }

    pub fn update(&mut self, side: Colour, m: Move, bonus: i32) {
        gravity(&mut self.table[side.index()][m.from_to()], bonus, Self::BOUND);
    }
}

impl Default for ButterflyHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Success statistics for captures, indexed by the moving piece, the target
/// square, and the type of the captured piece.
#[derive(Clone)]
pub struct CapturePieceToHistory {
    table: [[[i16; 6]; 64]; 12],
}

impl CapturePieceToHistory {
    const BOUND: i32 = 10_692;

    pub const fn new() -> Self {
        Self {
            table: [[[0; 6]; 64]; 12],
        }
    }

    pub fn clear(&mut self) {
        self.table
            .iter_mut()
            .flatten()
            .flatten()
            .for_each(|x| *x = 0);
    }

    pub const fn get(&self, piece: Piece, to: Square, captured: PieceType) -> i16 {
        self.table[piece as usize][to as usize][captured as usize]
    }

    pub fn update(&mut self, piece: Piece, to: Square, captured: PieceType, bonus: i32) {
        gravity(
            &mut self.table[piece.index()][to.index()][captured.index()],
            bonus,
            Self::BOUND,
        );
    }
}

impl Default for CapturePieceToHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// One continuation-history block: statistics for a move indexed by its
/// moving piece and target square, conditioned on some earlier move of the
/// search line having been played.
#[derive(Clone, Copy)]
pub struct PieceToHistory {
    table: [[i16; 64]; 12],
}

impl PieceToHistory {
    const BOUND: i32 = 29_952;

    pub const fn new() -> Self {
        Self {
            table: [[0; 64]; 12],
        }
    }

    pub fn clear(&mut self) {
        self.table.iter_mut().flatten().for_each(|x| *x = 0);
    }

    pub const fn get(&self, piece: Piece, to: Square) -> i16 {
        self.table[piece as usize][to as usize]
    }

    pub fn update(&mut self, piece: Piece, to: Square, bonus: i32) {
        gravity(&mut self.table[piece.index()][to.index()], bonus, Self::BOUND);
    }
}

impl Default for PieceToHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// The full continuation-history table, owned by the search driver: one
/// [`PieceToHistory`] block for each (piece, square) pair an earlier move
/// might have landed on. Boxed, as the table is over a megabyte.
#[derive(Clone)]
pub struct ContinuationHistory {
    table: Box<[[PieceToHistory; 64]; 12]>,
}

impl ContinuationHistory {
    pub fn new() -> Self {
        let table = vec![[PieceToHistory::new(); 64]; 12]
            .into_boxed_slice()
            .try_into()
            .map_err(|_| ())
            .unwrap();
        Self { table }
    }

    pub fn clear(&mut self) {
        self.table
            .iter_mut()
            .flatten()
            .for_each(PieceToHistory::clear);
    }

    pub fn get(&self, piece: Piece, sq: Square) -> &PieceToHistory {
        &self.table[piece.index()][sq.index()]
    }

    pub fn get_mut(&mut self, piece: Piece, sq: Square) -> &mut PieceToHistory {
        &mut self.table[piece.index()][sq.index()]
    }
}

impl Default for ContinuationHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::types::Square;

    #[test]
    fn gravity_saturates() {
        let mut entry = 0i16;
        for _ in 0..1_000 {
            gravity(&mut entry, 2_000, 7183);
        }
        assert!(i32::from(entry) <= 7183);
        for _ in 0..1_000 {
            gravity(&mut entry, -2_000, 7183);
        }
        assert!(i32::from(entry) >= -7183);
    }

    #[test]
    fn butterfly_update_and_get() {
        let mut hist = ButterflyHistory::new();
        let m = Move::new(Square::G1, Square::F3);
        assert_eq!(hist.get(Colour::White, m), 0);
        hist.update(Colour::White, m, 1_000);
        assert!(hist.get(Colour::White, m) > 0);
        assert_eq!(hist.get(Colour::Black, m), 0);
    }

    #[test]
    fn capture_history_dimensions() {
        let mut hist = CapturePieceToHistory::new();
        hist.update(Piece::WN, Square::E5, PieceType::Pawn, 500);
        assert!(hist.get(Piece::WN, Square::E5, PieceType::Pawn) > 0);
        assert_eq!(hist.get(Piece::WN, Square::E5, PieceType::Rook), 0);
        assert_eq!(hist.get(Piece::BN, Square::E5, PieceType::Pawn), 0);
    }

    #[test]
    fn continuation_blocks_are_independent() {
        let mut cont = ContinuationHistory::new();
        cont.get_mut(Piece::WP, Square::E4)
            .update(Piece::WN, Square::F3, 800);
        assert!(cont.get(Piece::WP, Square::E4).get(Piece::WN, Square::F3) > 0);
        assert_eq!(cont.get(Piece::WP, Square::E5).get(Piece::WN, Square::F3), 0);
    }
}
