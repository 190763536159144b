//! LTO-CM command layer.
//!
//! Each command builds its fixed frame, appends CRC-A where the frame carries
//! operands, sends it through the radio and hands the reply back untouched.
//! Deciding whether a reply length is acceptable is left to the caller.

use std::fmt;

use super::constants::*;
use super::tag::{Addressing, SerialNumber};
use crate::crc::append_crc;
use crate::error::{LtoCmError, Result};
use crate::transceiver::{Radio, Transceiver};

/// LTO-CM command, used to label exchanges and failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    RequestStandard,
    RequestSerial,
    Select,
    ReadBlock,
    ReadBlockExtended,
    ReadBlockContinue,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::RequestStandard => write!(f, "REQUEST STANDARD"),
            Operation::RequestSerial => write!(f, "REQUEST SERIAL NUMBER"),
            Operation::Select => write!(f, "SELECT"),
            Operation::ReadBlock => write!(f, "READ BLOCK"),
            Operation::ReadBlockExtended => write!(f, "READ BLOCK EXTENDED"),
            Operation::ReadBlockContinue => write!(f, "READ BLOCK CONTINUE"),
        }
    }
}

/// Sent frame and raw reply of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub op: Operation,
    pub sent: Vec<u8>,
    pub data: Vec<u8>,
}

impl Response {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// `93 70 S0..S4 CRC CRC`
pub fn select_frame(serial: &SerialNumber) -> [u8; 9] {
    let mut frame = [0u8; 9];
    frame[..2].copy_from_slice(&CMD_SELECT);
    frame[2..7].copy_from_slice(serial.as_bytes());
    append_crc(&mut frame, 7);
    frame
}

/// READ BLOCK frame for `block` in the given addressing form.
pub fn read_block_frame(addressing: Addressing, block: u16) -> Result<Vec<u8>> {
    let mut frame = match addressing {
        Addressing::Short => {
            let block = u8::try_from(block)
                .map_err(|_| LtoCmError::BlockOutOfRange { block, addressing })?;
            vec![CMD_READ_BLOCK, block]
        }
        Addressing::Extended => {
            let [lo, hi] = block.to_le_bytes();
            vec![CMD_READ_BLOCK_EXTENDED, lo, hi]
        }
    };
    let n = frame.len();
    frame.extend_from_slice(&[0, 0]);
    append_crc(&mut frame, n);
    Ok(frame)
}

fn exchange_bytes<T: Transceiver>(
    radio: &mut Radio<T>,
    op: Operation,
    frame: &[u8],
) -> Result<Response> {
    let data = radio
        .send_bytes(frame)
        .map_err(|source| LtoCmError::TransceiveFailed { op, source })?;
    Ok(Response {
        op,
        sent: frame.to_vec(),
        data,
    })
}

/// REQUEST STANDARD: 7-bit frame `45`, reply is the big-endian StandardWord.
///
/// A trailing partial byte in the reply is dropped.
pub fn request_standard<T: Transceiver>(radio: &mut Radio<T>) -> Result<Response> {
    let op = Operation::RequestStandard;
    let frame = [CMD_REQUEST_STANDARD];
    let reply = radio
        .send_bits(&frame, REQUEST_STANDARD_BITS)
        .map_err(|source| LtoCmError::TransceiveFailed { op, source })?;
    let mut data = reply.data;
    data.truncate(reply.bits / 8);
    Ok(Response {
        op,
        sent: frame.to_vec(),
        data,
    })
}

/// REQUEST SERIAL NUMBER: `93 20`.
pub fn request_serial<T: Transceiver>(radio: &mut Radio<T>) -> Result<Response> {
    exchange_bytes(radio, Operation::RequestSerial, &CMD_REQUEST_SERIAL)
}

/// SELECT the tag with the given serial.
pub fn select<T: Transceiver>(radio: &mut Radio<T>, serial: &SerialNumber) -> Result<Response> {
    exchange_bytes(radio, Operation::Select, &select_frame(serial))
}

/// First half of `block`, in the session's addressing form.
pub fn read_block<T: Transceiver>(
    radio: &mut Radio<T>,
    addressing: Addressing,
    block: u16,
) -> Result<Response> {
    let op = match addressing {
        Addressing::Short => Operation::ReadBlock,
        Addressing::Extended => Operation::ReadBlockExtended,
    };
    let frame = read_block_frame(addressing, block)?;
    exchange_bytes(radio, op, &frame)
}

/// Second half of the block named by the preceding READ BLOCK.
pub fn read_block_continue<T: Transceiver>(radio: &mut Radio<T>) -> Result<Response> {
    exchange_bytes(
        radio,
        Operation::ReadBlockContinue,
        &[CMD_READ_BLOCK_CONTINUE],
    )
}
