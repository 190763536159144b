//! Protocol module - LTO-CM command set, tag identity and block image types.

pub mod block;
pub mod commands;
pub mod constants;
pub mod tag;

pub use block::{Block, BlockHalf, Half};
pub use commands::{Operation, Response};
pub use constants::*;
pub use tag::{Addressing, SerialNumber, StandardWord, TagType};
