//! Tag identity: memory standard, serial number and block addressing form.

use std::fmt;
use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};

use super::constants::{SERIAL_LEN, SHORT_ADDRESS_MAX_BLOCKS, STANDARD_WORD_LEN};
use crate::error::LtoCmError;

/// Raw 16-bit REQUEST STANDARD reply, transmitted big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StandardWord(pub u16);

impl StandardWord {
    /// Decode the first two reply bytes. Returns `None` if fewer arrived.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < STANDARD_WORD_LEN {
            return None;
        }
        Cursor::new(data).read_u16::<BigEndian>().ok().map(Self)
    }

    /// Map the word onto a known memory type.
    pub fn classify(&self) -> Result<TagType, LtoCmError> {
        match self.0 {
            0x0001 => Ok(TagType::Type1),
            0x0002 => Ok(TagType::Type2),
            0x0003 => Ok(TagType::Type3),
            other => Err(LtoCmError::UnknownTagType(other)),
        }
    }
}

impl fmt::Display for StandardWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

/// LTO-CM memory type.
///
/// Block counts are what real chips answer to: a type 1 chip declaring
/// 4 KiB in block 0 reads 127 blocks, a type 2 chip declaring 8 KiB reads
/// 255. The Proxmark 3 tables (101 and 95) do not match hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagType {
    Type1,
    Type2,
    Type3,
}

impl TagType {
    /// Number of 32-byte blocks to read.
    pub fn block_count(&self) -> u16 {
        match self {
            TagType::Type1 => 127,
            TagType::Type2 => 255,
            TagType::Type3 => 511,
        }
    }

    pub fn addressing(&self) -> Addressing {
        Addressing::for_block_count(self.block_count())
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagType::Type1 => write!(f, "type 1 ({} blocks)", self.block_count()),
            TagType::Type2 => write!(f, "type 2 ({} blocks)", self.block_count()),
            TagType::Type3 => write!(f, "type 3 ({} blocks)", self.block_count()),
        }
    }
}

/// READ BLOCK addressing form, fixed for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// `30 BLK CRC CRC`
    Short,
    /// `21 BLKlo BLKhi CRC CRC`
    Extended,
}

impl Addressing {
    pub fn for_block_count(blocks: u16) -> Self {
        if blocks <= SHORT_ADDRESS_MAX_BLOCKS {
            Addressing::Short
        } else {
            Addressing::Extended
        }
    }
}

/// Five-byte serial: four UID bytes followed by their XOR.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerialNumber([u8; SERIAL_LEN]);

impl SerialNumber {
    /// Validate a REQUEST SERIAL NUMBER reply.
    ///
    /// Anything other than exactly five bytes with a matching parity byte
    /// is `BadSerial`.
    pub fn from_bytes(data: &[u8]) -> Result<Self, LtoCmError> {
        let bytes: [u8; SERIAL_LEN] = data
            .try_into()
            .map_err(|_| LtoCmError::BadSerial(data.to_vec()))?;
        if bytes[0] ^ bytes[1] ^ bytes[2] ^ bytes[3] != bytes[4] {
            return Err(LtoCmError::BadSerial(data.to_vec()));
        }
        Ok(Self(bytes))
    }

    /// Build a serial from its four UID bytes, computing the parity byte.
    pub fn from_uid(uid: [u8; 4]) -> Self {
        let parity = uid[0] ^ uid[1] ^ uid[2] ^ uid[3];
        Self([uid[0], uid[1], uid[2], uid[3], parity])
    }

    pub fn as_bytes(&self) -> &[u8; SERIAL_LEN] {
        &self.0
    }

    /// Dump file name used when none is given: `SSSSSSSS.bin`.
    pub fn default_filename(&self) -> String {
        format!("{}.bin", hex::encode_upper(&self.0[..4]))
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4]
        )
    }
}

impl fmt::Debug for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerialNumber({})", self)
    }
}
