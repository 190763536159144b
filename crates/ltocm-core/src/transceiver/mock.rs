//! Mock transceiver emulating an LTO-CM tag, for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::traits::{Property, Transceiver, TransceiverError};
use crate::crc::{append_crc, verify_crc};
use crate::protocol::Half;
use crate::protocol::constants::*;

/// One radio exchange as seen by the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    Bits { data: Vec<u8>, bits: usize },
    Bytes(Vec<u8>),
}

impl Exchange {
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Exchange::Bytes(data) => Some(data),
            Exchange::Bits { .. } => None,
        }
    }
}

/// Everything the mock observed, shared with the test after the mock has
/// been handed to a session.
#[derive(Debug, Default)]
pub struct MockLog {
    pub exchanges: Vec<Exchange>,
    pub properties: Vec<(Property, bool)>,
    pub init_calls: usize,
    pub close_calls: usize,
}

/// Misbehaviour injected on one block half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Answer with the single NACK byte.
    Nack,
    /// Answer with only the first `n` bytes of the reply.
    Truncate(usize),
    /// Flip the last CRC byte.
    CorruptCrc,
    /// Do not answer at all.
    Silent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagState {
    Init,
    Preselect,
    Command,
}

/// Emulated LTO-CM tag behind a perfect reader.
///
/// Follows the tag side of the protocol: wakes on REQUEST STANDARD, only
/// accepts byte frames afterwards, checks the CRC of every operand frame and
/// only honours READ BLOCK CONTINUE right after a READ BLOCK. Frames it does
/// not accept get no answer, which the reader reports as a timeout.
pub struct MockTransceiver {
    standard: [u8; STANDARD_WORD_LEN],
    serial: Vec<u8>,
    memory: Vec<[u8; BLOCK_LEN]>,
    faults: HashMap<(u16, Half), Fault>,
    reject_select: bool,
    init_failure: bool,
    state: TagState,
    pending_continue: Option<u16>,
    properties: HashMap<Property, bool>,
    log: Arc<Mutex<MockLog>>,
}

impl MockTransceiver {
    /// Type 2 tag (255 blocks) with serial `11 22 33 44 44`; every byte of
    /// block `b` holds `b mod 256`.
    pub fn new() -> Self {
        Self {
            standard: [0x00, 0x02],
            serial: vec![0x11, 0x22, 0x33, 0x44, 0x44],
            memory: patterned_memory(255),
            faults: HashMap::new(),
            reject_select: false,
            init_failure: false,
            state: TagState::Init,
            pending_continue: None,
            properties: HashMap::from([
                (Property::HandleCrc, true),
                (Property::EasyFraming, true),
                (Property::AutoIso14443_4, true),
            ]),
            log: Arc::new(Mutex::new(MockLog::default())),
        }
    }

    /// Set the StandardWord. Known types get a patterned memory of the
    /// matching size.
    pub fn with_standard(mut self, word: u16) -> Self {
        self.standard = word.to_be_bytes();
        let blocks = match word {
            0x0001 => 127,
            0x0002 => 255,
            0x0003 => 511,
            _ => 0,
        };
        self.memory = patterned_memory(blocks);
        self
    }

    /// Raw REQUEST SERIAL NUMBER reply, parity included.
    pub fn with_serial(mut self, serial: &[u8]) -> Self {
        self.serial = serial.to_vec();
        self
    }

    pub fn with_memory(mut self, memory: Vec<[u8; BLOCK_LEN]>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_fault(mut self, block: u16, half: Half, fault: Fault) -> Self {
        self.faults.insert((block, half), fault);
        self
    }

    /// Answer SELECT with NACK.
    pub fn reject_select(mut self) -> Self {
        self.reject_select = true;
        self
    }

    /// Make `initiator_init` fail.
    pub fn fail_init(&mut self) {
        self.init_failure = true;
    }

    /// Shared handle on the exchange log.
    pub fn log(&self) -> Arc<Mutex<MockLog>> {
        Arc::clone(&self.log)
    }

    fn record(&self, exchange: Exchange) {
        self.log.lock().unwrap().exchanges.push(exchange);
    }

    /// Refuse exchanges while any reader-side framing is still on.
    fn check_raw_mode(&self) -> Result<(), TransceiverError> {
        if self.properties.values().any(|enabled| *enabled) {
            return Err(TransceiverError::FrameFormat("framing enabled".into()));
        }
        Ok(())
    }

    fn select_frame(&self) -> [u8; 9] {
        let mut frame = [0u8; 9];
        frame[..2].copy_from_slice(&CMD_SELECT);
        for (dst, src) in frame[2..7].iter_mut().zip(&self.serial) {
            *dst = *src;
        }
        append_crc(&mut frame, 7);
        frame
    }

    fn half_reply(&self, block: u16, half: Half) -> Option<Vec<u8>> {
        let Some(data) = self.memory.get(block as usize) else {
            return Some(vec![NACK]);
        };
        let offset = half.index() * HALF_DATA_LEN;
        let mut reply = vec![0u8; HALF_FRAME_LEN];
        reply[..HALF_DATA_LEN].copy_from_slice(&data[offset..offset + HALF_DATA_LEN]);
        append_crc(&mut reply, HALF_DATA_LEN);

        match self.faults.get(&(block, half)) {
            None => Some(reply),
            Some(Fault::Nack) => Some(vec![NACK]),
            Some(Fault::Truncate(n)) => {
                reply.truncate(*n);
                Some(reply)
            }
            Some(Fault::CorruptCrc) => {
                reply[HALF_FRAME_LEN - 1] ^= 0xFF;
                Some(reply)
            }
            Some(Fault::Silent) => None,
        }
    }

    fn read_first_half(&mut self, block: u16, extended: bool) -> Option<Vec<u8>> {
        // Large tags only understand the extended form.
        if !extended && self.memory.len() > SHORT_ADDRESS_MAX_BLOCKS as usize {
            self.pending_continue = None;
            return Some(vec![NACK]);
        }
        let reply = self.half_reply(block, Half::First);
        self.pending_continue = match &reply {
            Some(r) if r.len() == HALF_FRAME_LEN => Some(block),
            _ => None,
        };
        reply
    }

    fn respond(&mut self, tx: &[u8]) -> Option<Vec<u8>> {
        match self.state {
            TagState::Init => None,
            TagState::Preselect => {
                if tx == CMD_REQUEST_SERIAL.as_slice() {
                    Some(self.serial.clone())
                } else if tx == self.select_frame().as_slice() {
                    if self.reject_select {
                        Some(vec![NACK])
                    } else {
                        self.state = TagState::Command;
                        Some(vec![ACK])
                    }
                } else {
                    None
                }
            }
            TagState::Command => {
                if tx.len() > 1 && !verify_crc(tx) {
                    self.pending_continue = None;
                    return None;
                }
                match tx {
                    [CMD_READ_BLOCK, block, _, _] => self.read_first_half(*block as u16, false),
                    [CMD_READ_BLOCK_EXTENDED, lo, hi, _, _] => {
                        self.read_first_half(u16::from_le_bytes([*lo, *hi]), true)
                    }
                    [CMD_READ_BLOCK_CONTINUE] => match self.pending_continue.take() {
                        Some(block) => self.half_reply(block, Half::Second),
                        None => Some(vec![NACK]),
                    },
                    _ => {
                        self.pending_continue = None;
                        None
                    }
                }
            }
        }
    }
}

impl Default for MockTransceiver {
    fn default() -> Self {
        Self::new()
    }
}

fn patterned_memory(blocks: usize) -> Vec<[u8; BLOCK_LEN]> {
    (0..blocks).map(|b| [(b % 256) as u8; BLOCK_LEN]).collect()
}

fn copy_reply(reply: &[u8], rx: &mut [u8]) -> Result<usize, TransceiverError> {
    if reply.len() > rx.len() {
        return Err(TransceiverError::Overflow {
            needed: reply.len(),
            capacity: rx.len(),
        });
    }
    rx[..reply.len()].copy_from_slice(reply);
    Ok(reply.len())
}

impl Transceiver for MockTransceiver {
    fn name(&self) -> String {
        "mock LTO-CM".to_string()
    }

    fn initiator_init(&mut self) -> Result<(), TransceiverError> {
        self.log.lock().unwrap().init_calls += 1;
        if self.init_failure {
            return Err(TransceiverError::OpenFailed("init failure".into()));
        }
        self.state = TagState::Init;
        Ok(())
    }

    fn set_property(&mut self, property: Property, enabled: bool) -> Result<(), TransceiverError> {
        self.log.lock().unwrap().properties.push((property, enabled));
        self.properties.insert(property, enabled);
        Ok(())
    }

    fn transceive_bits(
        &mut self,
        tx: &[u8],
        tx_bits: usize,
        rx: &mut [u8],
    ) -> Result<usize, TransceiverError> {
        self.record(Exchange::Bits {
            data: tx.to_vec(),
            bits: tx_bits,
        });
        self.check_raw_mode()?;
        let wakeup = tx.first().map(|b| b & 0x7F) == Some(CMD_REQUEST_STANDARD);
        if tx_bits != REQUEST_STANDARD_BITS || !wakeup {
            return Err(TransceiverError::Timeout);
        }
        self.state = TagState::Preselect;
        self.pending_continue = None;
        let standard = self.standard;
        Ok(copy_reply(&standard, rx)? * 8)
    }

    fn transceive_bytes(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<usize, TransceiverError> {
        self.record(Exchange::Bytes(tx.to_vec()));
        self.check_raw_mode()?;
        match self.respond(tx) {
            Some(reply) => copy_reply(&reply, rx),
            None => Err(TransceiverError::Timeout),
        }
    }

    fn close(&mut self) -> Result<(), TransceiverError> {
        self.log.lock().unwrap().close_calls += 1;
        self.state = TagState::Init;
        Ok(())
    }
}
