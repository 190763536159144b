//! LTO-CM protocol constants (ECMA-319 command set over ISO/IEC 14443-A framing).

// ============================================================================
// Commands (Host -> Tag)
// ============================================================================

/// REQUEST STANDARD, sent as a 7-bit short frame in the INIT state.
pub const CMD_REQUEST_STANDARD: u8 = 0x45;
/// Bit length of the REQUEST STANDARD frame.
pub const REQUEST_STANDARD_BITS: usize = 7;

/// REQUEST SERIAL NUMBER (anticollision cascade level 1, NVB = 0x20).
pub const CMD_REQUEST_SERIAL: [u8; 2] = [0x93, 0x20];

/// SELECT prefix (cascade level 1, NVB = 0x70).
pub const CMD_SELECT: [u8; 2] = [0x93, 0x70];

/// READ BLOCK with a one-byte block address.
pub const CMD_READ_BLOCK: u8 = 0x30;

/// READ BLOCK with a two-byte little-endian block address.
pub const CMD_READ_BLOCK_EXTENDED: u8 = 0x21;

/// READ BLOCK CONTINUE: fetch the second half of the block just read.
pub const CMD_READ_BLOCK_CONTINUE: u8 = 0x80;

// ============================================================================
// Responses (Tag -> Host)
// ============================================================================

/// Single-byte acknowledgement.
pub const ACK: u8 = 0x0A;
/// Single-byte negative acknowledgement.
pub const NACK: u8 = 0x05;

// ============================================================================
// Sizes
// ============================================================================

/// Receive buffer size; the largest frame the radio may hand back.
pub const MAX_FRAME_LEN: usize = 264;

/// CRC-A trailer length.
pub const CRC_LEN: usize = 2;

/// StandardWord length in bytes.
pub const STANDARD_WORD_LEN: usize = 2;

/// Serial number length including the parity byte.
pub const SERIAL_LEN: usize = 5;

/// Data bytes carried by one READ BLOCK / READ BLOCK CONTINUE reply.
pub const HALF_DATA_LEN: usize = 16;

/// Wire length of a block-half reply (data + CRC).
pub const HALF_FRAME_LEN: usize = HALF_DATA_LEN + CRC_LEN;

/// Size of one memory block (two halves).
pub const BLOCK_LEN: usize = 2 * HALF_DATA_LEN;

/// Highest block count that can still use the one-byte READ BLOCK form.
pub const SHORT_ADDRESS_MAX_BLOCKS: u16 = 255;
