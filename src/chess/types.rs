use std::{
    fmt::{self, Display},
    mem::size_of,
    ops::{Index, IndexMut},
    str::FromStr,
};

use crate::chess::{
    piece::{Col, Colour, Piece},
    piecelayout::{PieceLayout, Threats},
    squareset::SquareSet,
};

#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum File {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

const _FILE_ASSERT: () = assert!(size_of::<File>() == size_of::<Option<File>>());

impl File {
    pub const fn abs_diff(self, other: Self) -> u8 {
        (self as u8).abs_diff(other as u8)
    }

    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 8 {
            // SAFETY: inner is less than 8, so it corresponds to a valid enum variant.
            Some(unsafe { std::mem::transmute::<u8, Self>(index) })
        } else {
            None
        }
    }

    /// Distance from the closer board edge, 0 on the a/h files up to 3 in the centre.
    pub const fn edge_distance(self) -> u8 {
        let f = self as u8;
        if f < 4 { f } else { 7 - f }
    }

    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        // SAFETY: all values are within `0..8`.
        (0..8u8).map(|i| unsafe { std::mem::transmute(i) })
    }

    pub const fn with(self, rank: Rank) -> Square {
        Square::from_rank_file(rank, self)
    }
}

impl<T> Index<File> for [T; 8] {
    type Output = T;

    fn index(&self, index: File) -> &Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked(index as usize) }
    }
}

impl<T> IndexMut<File> for [T; 8] {
    fn index_mut(&mut self, index: File) -> &mut Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked_mut(index as usize) }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum Rank {
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
}

const _RANK_ASSERT: () = assert!(size_of::<Rank>() == size_of::<Option<Rank>>());

impl Rank {
    pub const fn abs_diff(self, other: Self) -> u8 {
        (self as u8).abs_diff(other as u8)
    }

    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 8 {
            // SAFETY: inner is less than 8, so it corresponds to a valid enum variant.
            Some(unsafe { std::mem::transmute::<u8, Self>(index) })
        } else {
            None
        }
    }

    pub const fn sub(self, diff: u8) -> Option<Self> {
        #![allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
        Self::from_index((self as i8 - diff as i8) as u8)
    }

    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        // SAFETY: all values are within `0..8`.
        (0..8u8).map(|i| unsafe { std::mem::transmute(i) })
    }
}

impl<T> Index<Rank> for [T; 8] {
    type Output = T;

    fn index(&self, index: Rank) -> &Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked(index as usize) }
    }
}

impl<T> IndexMut<Rank> for [T; 8] {
    fn index_mut(&mut self, index: Rank) -> &mut Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked_mut(index as usize) }
    }
}

#[rustfmt::skip]
#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Debug, Default)]
#[repr(u8)]
pub enum Square {
    #[default]
    A1, B1, C1, D1, E1, F1, G1, H1,
    A2, B2, C2, D2, E2, F2, G2, H2,
    A3, B3, C3, D3, E3, F3, G3, H3,
    A4, B4, C4, D4, E4, F4, G4, H4,
    A5, B5, C5, D5, E5, F5, G5, H5,
    A6, B6, C6, D6, E6, F6, G6, H6,
    A7, B7, C7, D7, E7, F7, G7, H7,
    A8, B8, C8, D8, E8, F8, G8, H8,
}

const _SQUARE_ASSERT: () = assert!(size_of::<Square>() == size_of::<Option<Square>>());

impl<T> Index<Square> for [T; 64] {
    type Output = T;

    fn index(&self, index: Square) -> &Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked(index as usize) }
    }
}

impl<T> IndexMut<Square> for [T; 64] {
    fn index_mut(&mut self, index: Square) -> &mut Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked_mut(index as usize) }
    }
}

static SQUARE_NAMES: [&str; 64] = [
    "a1", "b1", "c1", "d1", "e1", "f1", "g1", "h1", "a2", "b2", "c2", "d2", "e2", "f2", "g2", "h2",
    "a3", "b3", "c3", "d3", "e3", "f3", "g3", "h3", "a4", "b4", "c4", "d4", "e4", "f4", "g4", "h4",
    "a5", "b5", "c5", "d5", "e5", "f5", "g5", "h5", "a6", "b6", "c6", "d6", "e6", "f6", "g6", "h6",
    "a7", "b7", "c7", "d7", "e7", "f7", "g7", "h7", "a8", "b8", "c8", "d8", "e8", "f8", "g8", "h8",
];

#[allow(clippy::unusual_byte_groupings)]
impl Square {
    pub const fn from_rank_file(rank: Rank, file: File) -> Self {
        let inner = rank as u8 * 8 + file as u8;
        // SAFETY: Rank and File are constrained such that inner is always < 64.
        unsafe { std::mem::transmute(inner) }
    }

    pub const fn new(inner: u8) -> Option<Self> {
        if inner < 64 {
            // SAFETY: inner is less than 64, so it corresponds to a valid enum variant.
            Some(unsafe { std::mem::transmute::<u8, Self>(inner) })
        } else {
            None
        }
    }

    pub const fn new_clamped(inner: u8) -> Self {
        let inner = if inner < 63 { inner } else { 63 };
        if let Some(sq) = Self::new(inner) {
            sq
        } else {
            panic!()
        }
    }

    /// SAFETY: you may only call this function with value of `inner` less than 64.
    pub const unsafe fn new_unchecked(inner: u8) -> Self {
        debug_assert!(inner < 64);
        std::mem::transmute(inner)
    }

    pub const fn flip_rank(self) -> Self {
        // SAFETY: given the precondition that `self as u8` is less than 64,
        // this operation cannot construct a value >= 64.
        unsafe { std::mem::transmute(self as u8 ^ 0b111_000) }
    }

    pub const fn relative_to(self, side: Colour) -> Self {
        if matches!(side, Colour::White) {
            self
        } else {
            self.flip_rank()
        }
    }

    /// The rank of this square from the mover's point of view.
    pub const fn relative_rank(self, side: Colour) -> Rank {
        self.relative_to(side).rank()
    }

    /// The file that this square is on.
    pub const fn file(self) -> File {
        // SAFETY: `self as u8` is less than 64, and this operation can only
        // decrease the value, so cannot construct a value >= 64.
        unsafe { std::mem::transmute(self as u8 % 8) }
    }

    /// The rank that this square is on.
    pub const fn rank(self) -> Rank {
        // SAFETY: `self as u8` is less than 64, and this operation can only
        // decrease the value, so cannot construct a value >= 64.
        unsafe { std::mem::transmute(self as u8 / 8) }
    }

    /// Chebyshev distance between two squares.
    pub const fn distance(a: Self, b: Self) -> u8 {
        let fd = a.file().abs_diff(b.file());
        let rd = a.rank().abs_diff(b.rank());
        if fd > rd { fd } else { rd }
    }

    pub const fn signed_inner(self) -> i8 {
        #![allow(clippy::cast_possible_wrap)]
        self as i8
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn inner(self) -> u8 {
        self as u8
    }

    pub const fn add(self, offset: u8) -> Option<Self> {
        Self::new(self as u8 + offset)
    }

    /// SAFETY: You may not call this function with a square and offset such that
    /// `square as u8 + offset` is outwith `0..64`.
    pub const unsafe fn add_unchecked(self, offset: i8) -> Self {
        #![allow(
            clippy::cast_possible_truncation,
            clippy::cast_possible_wrap,
            clippy::cast_sign_loss
        )]
        let res = self as i8 + offset;
        Self::new_unchecked(res as u8)
    }

    pub const fn sub(self, offset: u8) -> Option<Self> {
        #![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
        let res = self as i8 - offset as i8;
        if res < 0 {
            None
        } else {
            Self::new(res as u8)
        }
    }

    pub const fn as_set(self) -> SquareSet {
        SquareSet::from_inner(1 << self as u8)
    }

    pub fn pawn_push(self, side: Colour) -> Option<Self> {
        if side == Colour::White {
            self.add(8)
        } else {
            self.sub(8)
        }
    }

    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        // SAFETY: all values are within `0..64`.
        (0..64u8).map(|i| unsafe { std::mem::transmute(i) })
    }

    pub fn name(self) -> &'static str {
        SQUARE_NAMES[self]
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", SQUARE_NAMES[*self])
    }
}

impl FromStr for Square {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SQUARE_NAMES
            .iter()
            .position(|&name| name == s)
            .and_then(|index| -> Option<u8> { index.try_into().ok() })
            .and_then(Self::new)
            .ok_or("Invalid square name")
    }
}

impl From<Square> for u16 {
    fn from(square: Square) -> Self {
        square as Self
    }
}

pub enum CheckState {
    None,
    Check,
    Checkmate,
}

/// Castling rights, stored as the file of the castling rook for each of the
/// four king/queen-side slots so that Chess960 positions work unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CastlingRights {
    // packed representation:
    // each file requires eight values - three bits.
    // [ 3 | wk ][ 3 | wq ][ 3 | bk ][ 3 | bq ][ 4 | flags ]
    data: u16,
}

#[allow(clippy::unusual_byte_groupings)]
impl CastlingRights {
    pub const WKCA: u16 = 0b0001;
    pub const WQCA: u16 = 0b0010;
    pub const BKCA: u16 = 0b0100;
    pub const BQCA: u16 = 0b1000;
    const WK_MASK: u16 = 0b111_000_000_000_0000;
    const WQ_MASK: u16 = 0b000_111_000_000_0000;
    const BK_MASK: u16 = 0b000_000_111_000_0000;
    const BQ_MASK: u16 = 0b000_000_000_111_0000;
    const WK_SHIFT: u8 = 4 + 3 + 3 + 3;
    const WQ_SHIFT: u8 = 4 + 3 + 3;
    const BK_SHIFT: u8 = 4 + 3;
    const BQ_SHIFT: u8 = 4;

    pub const fn new(
        wk: Option<File>,
        wq: Option<File>,
        bk: Option<File>,
        bq: Option<File>,
    ) -> Self {
        let mut data = 0;

        if let Some(wk) = wk {
            data |= ((wk as u16) << Self::WK_SHIFT) | Self::WKCA;
        }
        if let Some(wq) = wq {
            data |= ((wq as u16) << Self::WQ_SHIFT) | Self::WQCA;
        }
        if let Some(bk) = bk {
            data |= ((bk as u16) << Self::BK_SHIFT) | Self::BKCA;
        }
        if let Some(bq) = bq {
            data |= ((bq as u16) << Self::BQ_SHIFT) | Self::BQCA;
        }

        Self { data }
    }

    pub fn clear<C: Col>(&mut self) {
        self.data &= if C::WHITE {
            !(Self::WK_MASK | Self::WQ_MASK | Self::WKCA | Self::WQCA)
        } else {
            !(Self::BK_MASK | Self::BQ_MASK | Self::BKCA | Self::BQCA)
        };
    }

    pub fn clear_side<const IS_KINGSIDE: bool, C: Col>(&mut self) {
        #![allow(clippy::collapsible_else_if)]
        self.data &= !if C::WHITE {
            if IS_KINGSIDE {
                Self::WK_MASK | Self::WKCA
            } else {
                Self::WQ_MASK | Self::WQCA
            }
        } else {
            if IS_KINGSIDE {
                Self::BK_MASK | Self::BKCA
            } else {
                Self::BQ_MASK | Self::BQCA
            }
        };
    }

    pub fn remove<C: Col>(&mut self, file: File) {
        if self.kingside(C::COLOUR) == Some(file) {
            self.clear_side::<true, C>();
        } else if self.queenside(C::COLOUR) == Some(file) {
            self.clear_side::<false, C>();
        }
    }

    pub fn kingside(self, side: Colour) -> Option<File> {
        #![allow(clippy::cast_possible_truncation)]
        let presence = [Self::WKCA, Self::BKCA][side];
        if self.data & presence == 0 {
            return None;
        }
        let shift = [Self::WK_SHIFT, Self::BK_SHIFT][side];
        let mask = [Self::WK_MASK, Self::BK_MASK][side];
        let value = (self.data & mask) >> shift;
        File::from_index(value as u8)
    }

    pub fn queenside(self, side: Colour) -> Option<File> {
        #![allow(clippy::cast_possible_truncation)]
        let presence = [Self::WQCA, Self::BQCA][side];
        if self.data & presence == 0 {
            return None;
        }
        let shift = [Self::WQ_SHIFT, Self::BQ_SHIFT][side];
        let mask = [Self::WQ_MASK, Self::BQ_MASK][side];
        let value = (self.data & mask) >> shift;
        File::from_index(value as u8)
    }

    pub fn set_kingside(&mut self, side: Colour, file: File) {
        let presence = [Self::WKCA, Self::BKCA][side];
        let shift = [Self::WK_SHIFT, Self::BK_SHIFT][side];
        let mask = [!Self::WK_MASK, !Self::BK_MASK][side];
        self.data &= mask;
        self.data |= ((file as u16) << shift) | presence;
    }

    pub fn set_queenside(&mut self, side: Colour, file: File) {
        let presence = [Self::WQCA, Self::BQCA][side];
        let shift = [Self::WQ_SHIFT, Self::BQ_SHIFT][side];
        let mask = [!Self::WQ_MASK, !Self::BQ_MASK][side];
        self.data &= mask;
        self.data |= ((file as u16) << shift) | presence;
    }
}

/// Full copyable state for a chess position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    /// Which rooks can castle.
    pub castle_perm: CastlingRights,
    /// The en passant square.
    pub ep_square: Option<Square>,
    /// The number of half moves made since the last capture or pawn advance.
    pub fifty_move_counter: u8,
    /// Squares that the opponent attacks, and the pieces giving check.
    pub threats: Threats,
    /// Pieces pinned to their own king, per side.
    pub pinned: [SquareSet; 2],
    /// The square-sets of all the pieces on the board.
    pub bbs: PieceLayout,
    /// An array to accelerate `Board::piece_at()`.
    pub mailbox: [Option<Piece>; 64],
}

impl Default for State {
    fn default() -> Self {
        Self {
            castle_perm: CastlingRights::default(),
            ep_square: None,
            fifty_move_counter: 0,
            threats: Threats::default(),
            pinned: [SquareSet::EMPTY; 2],
            bbs: PieceLayout::default(),
            mailbox: [None; 64],
        }
    }
}
