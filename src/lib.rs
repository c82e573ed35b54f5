#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::inline_always
)]

//! Move ordering for chess search: a staged, allocation-free move picker
//! blending transposition-table suggestions, history heuristics, and
//! static exchange evaluation, plus a SAN/LAN codec, over a self-contained
//! board layer.

pub mod chess;
pub mod errors;
pub mod historytable;
pub mod movepicker;

pub use chess::{
    board::{
        movegen::{MoveList, MoveListEntry},
        san, Board,
    },
    chessmove::{Move, MoveFlags},
    piece::{Colour, Piece, PieceType},
    squareset::SquareSet,
    types::{File, Rank, Square},
};
pub use historytable::{
    ButterflyHistory, CapturePieceToHistory, ContinuationHistory, PieceToHistory,
};
pub use movepicker::{
    partial_insertion_sort, MovePicker, DEPTH_QS_CHECKS, DEPTH_QS_RECAPTURES,
};
