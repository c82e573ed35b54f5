use thiserror::Error;

use crate::chess::piece::Colour;

/// Errors that can occur when parsing SAN (Standard Algebraic Notation) moves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanError {
    #[error("invalid san: {0:?}")]
    InvalidSan(String),
    #[error("illegal san: {0:?}")]
    IllegalMove(String),
    #[error("ambiguous san: {0:?}")]
    AmbiguousMove(String),
    #[error("missing promotion piece type: {0:?}")]
    MissingPromotion(String),
}

/// Errors that can occur when parsing a move in the UCI wire format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveParseError {
    #[error("invalid move length {0}")]
    InvalidLength(usize),
    #[error("invalid from-square file {0}")]
    InvalidFromSquareFile(char),
    #[error("invalid from-square rank {0}")]
    InvalidFromSquareRank(char),
    #[error("invalid to-square file {0}")]
    InvalidToSquareFile(char),
    #[error("invalid to-square rank {0}")]
    InvalidToSquareRank(char),
    #[error("invalid promotion piece {0}")]
    InvalidPromotionPiece(char),
    #[error("illegal move {0}")]
    IllegalMove(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenParseError {
    #[error("FEN string is missing board part")]
    MissingBoard,
    #[error("board part of FEN has {0} segments, expected 8")]
    BoardSegments(usize),
    #[error("wrong number of squares in board segment")]
    BadSquaresInSegment,
    #[error("adjacent digits in board segment are not allowed")]
    AdjacentDigits,
    #[error("unexpected character in piece placement: '{0}'")]
    UnexpectedCharacter(char),
    #[error("expected side to be 'w' or 'b', got \"{0}\"")]
    InvalidSide(String),
    #[error("expected side part")]
    MissingSide,
    #[error("expected castling part")]
    MissingCastling,
    #[error("invalid castling format: \"{0}\"")]
    InvalidCastling(String),
    #[error("{} king is missing", if *colour == Colour::White { "white" } else { "black" })]
    MissingKing { colour: Colour },
    #[error("more than one {} king", if *colour == Colour::White { "white" } else { "black" })]
    DuplicateKings { colour: Colour },
    #[error("pawns present on backranks")]
    PawnsOnBackranks,
    #[error("waiting player's king in check")]
    WaitingInCheck,
    #[error(
        "{colour} king is not on the back rank, but castling rights \"{castling}\" imply present castling rights"
    )]
    KingNotOnBackRank {
        colour: &'static str,
        castling: String,
    },
    #[error(
        "{colour} king is on file {file}, but got castling rights on that file: \"{castling}\""
    )]
    KingOnCastlingFile {
        colour: &'static str,
        file: String,
        castling: String,
    },
    #[error("expected en passant part")]
    MissingEnPassant,
    #[error("invalid en passant square: \"{0}\"")]
    InvalidEnPassant(String),
    #[error("expected halfmove clock part")]
    MissingHalfmoveClock,
    #[error("invalid halfmove clock: \"{0}\"")]
    InvalidHalfmoveClock(String),
    #[error("expected fullmove number part")]
    MissingFullmoveNumber,
    #[error("invalid fullmove number: \"{0}\"")]
    InvalidFullmoveNumber(String),
    #[error("unexpected extra tokens after fullmove number")]
    ExtraTokens,
}
