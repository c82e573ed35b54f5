use std::{num::NonZeroUsize, str::FromStr, str::SplitWhitespace};

use arrayvec::ArrayVec;

use crate::{
    chess::{
        piece::{Colour, Piece, PieceType},
        piecelayout::PieceLayout,
        squareset::SquareSet,
        types::{CastlingRights, File, Rank, Square},
    },
    errors::FenParseError,
};

/// A parsed FEN representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fen {
    pub board: PieceLayout,
    pub turn: Colour,
    pub castling: CastlingRights,
    pub ep: Option<Square>,
    pub halfmove: u8,
    pub fullmove: NonZeroUsize,
}

impl Fen {
    const DEFAULT_FULL_MOVE: NonZeroUsize = match NonZeroUsize::new(1) {
        Some(v) => v,
        None => unreachable!(),
    };

    /// Parse a FEN string in strict mode.
    /// All 6 fields must be present, and no extra tokens are allowed.
    pub fn parse(fen: &str) -> Result<Self, FenParseError> {
        let mut tokens = fen.split_whitespace();
        let result = Self::parse_inner(&mut tokens, true)?;
        // In strict mode, no extra tokens allowed.
        if tokens.next().is_some() {
            return Err(FenParseError::ExtraTokens);
        }
        Ok(result)
    }

    /// Parse a FEN string in relaxed mode.
    /// Missing fields after the board are defaulted to: w, -, -, 0, 1
    /// Extra tokens after the fullmove counter are permitted but ignored.
    pub fn parse_relaxed(fen: &str) -> Result<Self, FenParseError> {
        let mut tokens = fen.split_whitespace();
        Self::parse_inner(&mut tokens, false)
    }

    fn parse_inner(tokens: &mut SplitWhitespace<'_>, strict: bool) -> Result<Self, FenParseError> {
        // Field #1: Piece placement
        let board_str = tokens.next().ok_or(FenParseError::MissingBoard)?;
        let board = Self::parse_board(board_str)?;

        // Field #2: Active colour
        let turn = match tokens.next() {
            Some(s) if strict => Self::parse_turn(s)?,
            Some(s) => Self::parse_turn(s).unwrap_or(Colour::White),
            None if strict => return Err(FenParseError::MissingSide),
            None => Colour::White,
        };

        // At this point we can test if we're illegally checking:
        if board.sq_attacked(board.king_sq(!turn), turn) {
            return Err(FenParseError::WaitingInCheck);
        }

        // Field #3: Castling availability
        let castling = match tokens.next() {
            Some(s) if strict => Self::parse_castling(s, &board)?,
            Some(s) => Self::parse_castling(s, &board).unwrap_or_default(),
            None if strict => return Err(FenParseError::MissingCastling),
            None => CastlingRights::default(),
        };

        // Field #4: En passant target square
        let ep = match tokens.next() {
            Some(s) if strict => Self::parse_ep(s, turn)?,
            Some(s) => Self::parse_ep(s, turn).unwrap_or(None),
            None if strict => return Err(FenParseError::MissingEnPassant),
            None => None,
        };

        // Field #5: Halfmove clock
        let halfmove = match tokens.next() {
            Some(s) if strict => Self::parse_halfmove(s)?,
            Some(s) => Self::parse_halfmove(s).unwrap_or(0),
            None if strict => return Err(FenParseError::MissingHalfmoveClock),
            None => 0,
        };

        // Field #6: Fullmove number
        let fullmove = match tokens.next() {
            Some(s) if strict => Self::parse_fullmove(s)?,
            Some(s) => Self::parse_fullmove(s).unwrap_or(Self::DEFAULT_FULL_MOVE),
            None if strict => return Err(FenParseError::MissingFullmoveNumber),
            None => Self::DEFAULT_FULL_MOVE,
        };

        Ok(Self {
            board,
            turn,
            castling,
            ep,
            halfmove,
            fullmove,
        })
    }

    fn parse_board(board_str: &str) -> Result<PieceLayout, FenParseError> {
        let mut layout = PieceLayout::default();
        let mut rank = Rank::Eight;

        let mut ranks = ArrayVec::<&str, 8>::new();

        let mut board_parts = board_str.split('/');

        while let Some(segment) = board_parts.next() {
            if ranks.try_push(segment).is_err() {
                // 8 successfully parsed, plus one now, plus the rest.
                return Err(FenParseError::BoardSegments(8 + 1 + board_parts.count()));
            }
        }

        if ranks.len() != 8 {
            return Err(FenParseError::BoardSegments(ranks.len()));
        }

        for (rank_idx, rank_str) in ranks.iter().enumerate() {
            let mut file = File::A;
            let mut squares_in_rank = 0;
            let mut prev_was_digit = false;

            for c in rank_str.chars() {
                match c {
                    '1'..='8' => {
                        if prev_was_digit {
                            return Err(FenParseError::AdjacentDigits);
                        }
                        prev_was_digit = true;
                        let count = c as u8 - b'0';
                        squares_in_rank += count;
                        if squares_in_rank > 8 {
                            return Err(FenParseError::BadSquaresInSegment);
                        }
                        for _ in 0..count {
                            file = File::from_index(file as u8 + 1).unwrap_or(File::A);
                        }
                    }
                    'P' | 'R' | 'N' | 'B' | 'Q' | 'K' | 'p' | 'r' | 'n' | 'b' | 'q' | 'k' => {
                        prev_was_digit = false;
                        squares_in_rank += 1;
                        if squares_in_rank > 8 {
                            return Err(FenParseError::BadSquaresInSegment);
                        }
                        let piece = Self::char_to_piece(c);
                        let sq = Square::from_rank_file(rank, file);
                        layout.set_piece_at(sq, piece);
                        file = File::from_index(file as u8 + 1).unwrap_or(File::A);
                    }
                    _ => return Err(FenParseError::UnexpectedCharacter(c)),
                }
            }

            if squares_in_rank != 8 {
                return Err(FenParseError::BadSquaresInSegment);
            }

            // Move to next rank (going from 8 down to 1)
            if rank_idx < 7 {
                rank = rank.sub(1).ok_or(FenParseError::BadSquaresInSegment)?;
            }
        }

        // general correctness validation - misses a lot, but does some nice things.

        // pawns are on sensible squares
        if (layout.pieces[PieceType::Pawn] & SquareSet::BACK_RANKS).non_empty() {
            return Err(FenParseError::PawnsOnBackranks);
        }

        // check king counts
        for colour in Colour::all() {
            match (layout.pieces[PieceType::King] & layout.colours[colour]).count() {
                0 => return Err(FenParseError::MissingKing { colour }),
                1 => (),
                _ => return Err(FenParseError::DuplicateKings { colour }),
            }
        }

        Ok(layout)
    }

    fn char_to_piece(c: char) -> Piece {
        match c {
            'P' => Piece::WP,
            'R' => Piece::WR,
            'N' => Piece::WN,
            'B' => Piece::WB,
            'Q' => Piece::WQ,
            'K' => Piece::WK,
            'p' => Piece::BP,
            'r' => Piece::BR,
            'n' => Piece::BN,
            'b' => Piece::BB,
            'q' => Piece::BQ,
            'k' => Piece::BK,
            _ => panic!("char_to_piece called with invalid char"),
        }
    }

    fn parse_turn(s: &str) -> Result<Colour, FenParseError> {
        match s {
            "w" => Ok(Colour::White),
            "b" => Ok(Colour::Black),
            _ => Err(FenParseError::InvalidSide(s.to_string())),
        }
    }

    fn parse_castling(s: &str, board: &PieceLayout) -> Result<CastlingRights, FenParseError> {
        if s == "-" {
            return Ok(CastlingRights::default());
        }

        let mut rights = CastlingRights::default();

        let white_king_sq = board.king_sq(Colour::White);
        let black_king_sq = board.king_sq(Colour::Black);

        for c in s.chars() {
            match c {
                // Standard notation (assumes rooks on A/H files)
                'K' => rights.set_kingside(Colour::White, File::H),
                'Q' => rights.set_queenside(Colour::White, File::A),
                'k' => rights.set_kingside(Colour::Black, File::H),
                'q' => rights.set_queenside(Colour::Black, File::A),
                // X-FEN / Shredder-FEN: uppercase file letter for white
                'A'..='H' => {
                    let file = File::from_index(c as u8 - b'A')
                        .ok_or_else(|| FenParseError::InvalidCastling(s.to_string()))?;

                    let king_sq = white_king_sq;

                    if king_sq.rank() != Rank::One {
                        return Err(FenParseError::KingNotOnBackRank {
                            colour: "white",
                            castling: s.to_string(),
                        });
                    }

                    let king_file = king_sq.file();
                    if file == king_file {
                        return Err(FenParseError::KingOnCastlingFile {
                            colour: "white",
                            file: format!("{king_file:?}"),
                            castling: s.to_string(),
                        });
                    }

                    if file > king_file {
                        rights.set_kingside(Colour::White, file);
                    } else {
                        rights.set_queenside(Colour::White, file);
                    }
                }
                // X-FEN / Shredder-FEN: lowercase file letter for black
                'a'..='h' => {
                    let file = File::from_index(c as u8 - b'a')
                        .ok_or_else(|| FenParseError::InvalidCastling(s.to_string()))?;

                    let king_sq = black_king_sq;

                    if king_sq.rank() != Rank::Eight {
                        return Err(FenParseError::KingNotOnBackRank {
                            colour: "black",
                            castling: s.to_string(),
                        });
                    }

                    let king_file = king_sq.file();
                    if file == king_file {
                        return Err(FenParseError::KingOnCastlingFile {
                            colour: "black",
                            file: format!("{king_file:?}"),
                            castling: s.to_string(),
                        });
                    }

                    if file > king_file {
                        rights.set_kingside(Colour::Black, file);
                    } else {
                        rights.set_queenside(Colour::Black, file);
                    }
                }
                _ => return Err(FenParseError::InvalidCastling(s.to_string())),
            }
        }

        Ok(rights)
    }

    fn parse_ep(s: &str, turn: Colour) -> Result<Option<Square>, FenParseError> {
        if s == "-" {
            return Ok(None);
        }
        let sq = Square::from_str(s).map_err(|_| FenParseError::InvalidEnPassant(s.to_string()))?;
        let expected = match turn {
            Colour::White => Rank::Six,
            Colour::Black => Rank::Three,
        };
        if sq.rank() != expected {
            return Err(FenParseError::InvalidEnPassant(s.to_string()));
        }
        Ok(Some(sq))
    }

    fn parse_halfmove(s: &str) -> Result<u8, FenParseError> {
        s.parse::<u8>()
            .map_err(|_| FenParseError::InvalidHalfmoveClock(s.to_string()))
    }

    fn parse_fullmove(s: &str) -> Result<NonZeroUsize, FenParseError> {
        s.parse::<NonZeroUsize>()
            .map_err(|_| FenParseError::InvalidFullmoveNumber(s.to_string()))
    }
}
