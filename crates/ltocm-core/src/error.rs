//! Session error type. Every variant is fatal to the current dump.

use thiserror::Error;

use crate::protocol::{Addressing, Half, Operation};
use crate::state::SessionState;
use crate::transceiver::TransceiverError;

#[derive(Error, Debug)]
pub enum LtoCmError {
    #[error("radio initialisation failed: {0}")]
    RadioInitFailed(#[source] TransceiverError),

    #[error("{op} failed: {source}")]
    TransceiveFailed {
        op: Operation,
        #[source]
        source: TransceiverError,
    },

    #[error("unknown LTO-CM memory type {0:04X}")]
    UnknownTagType(u16),

    #[error("invalid serial number reply: {}", hex::encode_upper(.0))]
    BadSerial(Vec<u8>),

    #[error("SELECT not acknowledged: {}", hex::encode_upper(.0))]
    SelectRejected(Vec<u8>),

    #[error("READ BLOCK {block} half {half} failed: NACK")]
    NackOnRead { block: u16, half: Half },

    #[error("READ BLOCK {block} half {half} failed: expected 18 bytes, got {got}")]
    ShortRead { block: u16, half: Half, got: usize },

    #[error("READ BLOCK {block} half {half} failed: CRC error")]
    CrcMismatch { block: u16, half: Half },

    #[error("cannot open output: {0}")]
    SinkOpenFailed(#[source] std::io::Error),

    #[error("output write failed: {0}")]
    SinkWriteFailed(#[source] std::io::Error),

    #[error("block {block} cannot be addressed in {addressing:?} form")]
    BlockOutOfRange { block: u16, addressing: Addressing },

    #[error("{op} not allowed in state {state}")]
    InvalidState { op: Operation, state: SessionState },
}

pub type Result<T> = std::result::Result<T, LtoCmError>;
