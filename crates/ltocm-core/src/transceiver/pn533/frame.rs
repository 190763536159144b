//! PN533 host frame codec.
//!
//! Normal information frame:
//! `00 00 FF LEN LCS TFI CMD PARAMS... DCS 00`
//! where `LEN` counts `TFI` through the last parameter.

use crate::transceiver::TransceiverError;

pub const PREAMBLE: [u8; 3] = [0x00, 0x00, 0xFF];
pub const POSTAMBLE: u8 = 0x00;
pub const ACK_FRAME: [u8; 6] = [0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00];
pub const ERROR_FRAME: [u8; 8] = [0x00, 0x00, 0xFF, 0x01, 0xFF, 0x7F, 0x81, 0x00];

/// Frame identifier, host to PN533.
pub const TFI_HOST: u8 = 0xD4;
/// Frame identifier, PN533 to host.
pub const TFI_DEVICE: u8 = 0xD5;

/// Preamble, LEN, LCS, DCS, postamble.
const OVERHEAD: usize = 7;

// Commands
pub const CMD_GET_FIRMWARE_VERSION: u8 = 0x02;
pub const CMD_READ_REGISTER: u8 = 0x06;
pub const CMD_WRITE_REGISTER: u8 = 0x08;
pub const CMD_RF_CONFIGURATION: u8 = 0x32;
pub const CMD_IN_COMMUNICATE_THRU: u8 = 0x42;

// RFConfiguration items
pub const RF_ITEM_FIELD: u8 = 0x01;
pub const RF_ITEM_TIMINGS: u8 = 0x02;
pub const RF_ITEM_MAX_RETRIES: u8 = 0x05;

// CIU registers
pub const REG_CIU_TX_MODE: u16 = 0x6302;
pub const REG_CIU_RX_MODE: u16 = 0x6303;
pub const REG_CIU_TX_AUTO: u16 = 0x6305;
pub const REG_CIU_CONTROL: u16 = 0x633C;
pub const REG_CIU_BIT_FRAMING: u16 = 0x633D;

pub const CRC_ENABLE: u8 = 0x80;
pub const FORCE_100_ASK: u8 = 0x40;
pub const LAST_BITS_MASK: u8 = 0x07;

/// InCommunicateThru status: target did not answer.
pub const STATUS_TIMEOUT: u8 = 0x01;
pub const STATUS_MASK: u8 = 0x3F;

/// Length checksum.
pub fn lcs(len: u8) -> u8 {
    0u8.wrapping_sub(len)
}

/// Data checksum over TFI and payload.
pub fn dcs(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    0u8.wrapping_sub(sum)
}

/// Wrap a command and its parameters in a host frame.
pub fn encode(cmd: u8, params: &[u8]) -> Result<Vec<u8>, TransceiverError> {
    let needed = params.len() + 2;
    let len = u8::try_from(needed).map_err(|_| TransceiverError::Overflow {
        needed,
        capacity: u8::MAX as usize,
    })?;

    let mut out = Vec::with_capacity(OVERHEAD + len as usize);
    out.extend_from_slice(&PREAMBLE);
    out.push(len);
    out.push(lcs(len));
    let body_start = out.len();
    out.push(TFI_HOST);
    out.push(cmd);
    out.extend_from_slice(params);
    let checksum = dcs(&out[body_start..]);
    out.push(checksum);
    out.push(POSTAMBLE);
    Ok(out)
}

pub fn is_ack(frame: &[u8]) -> bool {
    frame.starts_with(&ACK_FRAME)
}

/// Unwrap the reply to `cmd` and return its parameters.
pub fn decode(frame: &[u8], cmd: u8) -> Result<Vec<u8>, TransceiverError> {
    if frame.starts_with(&ERROR_FRAME) {
        return Err(TransceiverError::FrameFormat("error frame".into()));
    }
    if frame.len() < OVERHEAD + 2 {
        return Err(TransceiverError::FrameFormat(format!(
            "frame too short: {} bytes",
            frame.len()
        )));
    }
    if frame[..3] != PREAMBLE {
        return Err(TransceiverError::FrameFormat("invalid preamble".into()));
    }

    let len = frame[3];
    if frame[4] != lcs(len) {
        return Err(TransceiverError::FrameFormat(format!(
            "LCS mismatch: LEN {:02X}, LCS {:02X}",
            len, frame[4]
        )));
    }
    let body_end = 5 + len as usize;
    if frame.len() < body_end + 2 {
        return Err(TransceiverError::FrameFormat(format!(
            "truncated frame: LEN {} but {} bytes",
            len,
            frame.len()
        )));
    }

    let body = &frame[5..body_end];
    if frame[body_end] != dcs(body) {
        return Err(TransceiverError::FrameFormat("DCS mismatch".into()));
    }
    if frame[body_end + 1] != POSTAMBLE {
        return Err(TransceiverError::FrameFormat("invalid postamble".into()));
    }

    match body {
        [TFI_DEVICE, reply, params @ ..] if *reply == cmd.wrapping_add(1) => Ok(params.to_vec()),
        [tfi, reply, ..] => Err(TransceiverError::FrameFormat(format!(
            "unexpected reply {:02X} {:02X} to command {:02X}",
            tfi, reply, cmd
        ))),
        _ => Err(TransceiverError::FrameFormat("empty frame body".into())),
    }
}
