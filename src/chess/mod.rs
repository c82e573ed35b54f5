use std::sync::atomic::AtomicBool;

pub mod board;
pub mod chessmove;
pub mod fen;
pub mod magic;
pub mod piece;
pub mod piecelayout;
pub mod squareset;
pub mod types;

/// Whether we're playing Fischer-random chess. Changes castling encoding
/// on the wire and how castling moves are parsed.
pub static CHESS960: AtomicBool = AtomicBool::new(false);
