//! Block image types and per-half integrity checks.

use std::fmt;

use super::constants::{BLOCK_LEN, HALF_DATA_LEN, HALF_FRAME_LEN, NACK};
use crate::crc::verify_crc;
use crate::error::LtoCmError;

/// Which half of a 32-byte block a reply carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Half {
    /// Returned by READ BLOCK / READ BLOCK EXTENDED.
    First,
    /// Returned by READ BLOCK CONTINUE.
    Second,
}

impl Half {
    pub fn index(&self) -> usize {
        match self {
            Half::First => 0,
            Half::Second => 1,
        }
    }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// 16 validated data bytes of one block half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHalf([u8; HALF_DATA_LEN]);

impl BlockHalf {
    /// Validate an 18-byte reply and keep its data.
    ///
    /// Checks run in order: single-byte NACK, exact length, CRC.
    pub fn from_reply(block: u16, half: Half, reply: &[u8]) -> Result<Self, LtoCmError> {
        if reply.len() == 1 && reply[0] == NACK {
            return Err(LtoCmError::NackOnRead { block, half });
        }
        if reply.len() != HALF_FRAME_LEN {
            return Err(LtoCmError::ShortRead {
                block,
                half,
                got: reply.len(),
            });
        }
        if !verify_crc(reply) {
            return Err(LtoCmError::CrcMismatch { block, half });
        }
        let mut data = [0u8; HALF_DATA_LEN];
        data.copy_from_slice(&reply[..HALF_DATA_LEN]);
        Ok(Self(data))
    }

    pub fn as_bytes(&self) -> &[u8; HALF_DATA_LEN] {
        &self.0
    }
}

/// One 32-byte memory block.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Block {
    index: u16,
    data: [u8; BLOCK_LEN],
}

impl Block {
    pub fn from_halves(index: u16, first: &BlockHalf, second: &BlockHalf) -> Self {
        let mut data = [0u8; BLOCK_LEN];
        data[..HALF_DATA_LEN].copy_from_slice(first.as_bytes());
        data[HALF_DATA_LEN..].copy_from_slice(second.as_bytes());
        Self { index, data }
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_LEN] {
        &self.data
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({}: {})", self.index, hex::encode_upper(self.data))
    }
}
