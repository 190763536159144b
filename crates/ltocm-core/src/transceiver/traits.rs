//! Contactless transceiver abstraction.
//!
//! Defines the `Transceiver` trait for raw ISO/IEC 14443-A exchanges,
//! allowing different implementations (PN533 over USB, mock, etc.).

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransceiverError {
    #[error("Reader not found")]
    DeviceNotFound,

    #[error("Failed to open reader: {0}")]
    OpenFailed(String),

    #[error("Failed to claim interface {interface}: {message}")]
    ClaimInterfaceFailed { interface: u8, message: String },

    #[error("Endpoint not found: type={ep_type}, direction={direction}")]
    EndpointNotFound { ep_type: String, direction: String },

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Malformed reader frame: {0}")]
    FrameFormat(String),

    #[error("Reader reported status 0x{0:02X}")]
    Status(u8),

    #[error("No response from tag")]
    Timeout,

    #[error("Receive buffer too small: need {needed}, have {capacity}")]
    Overflow { needed: usize, capacity: usize },

    #[error("Unsupported property {0}")]
    Unsupported(Property),

    #[error("Reader is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Framing properties of the initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// Reader appends and checks CRC-A on its own.
    HandleCrc,
    /// Reader wraps exchanges in its own high-level framing.
    EasyFraming,
    /// Reader switches to ISO14443-4 when the tag advertises it.
    AutoIso14443_4,
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::HandleCrc => write!(f, "HANDLE_CRC"),
            Property::EasyFraming => write!(f, "EASY_FRAMING"),
            Property::AutoIso14443_4 => write!(f, "AUTO_ISO14443_4"),
        }
    }
}

/// Abstract contactless initiator.
///
/// This trait enables:
/// - Production implementation on a PN533 reader
/// - Mock implementation emulating an LTO-CM tag for testing
///
/// Implementations must never inject framing or CRC on their own once the
/// corresponding property has been switched off.
pub trait Transceiver {
    /// Human-readable reader name.
    fn name(&self) -> String;

    /// Put the reader in initiator mode with the RF field on.
    fn initiator_init(&mut self) -> Result<(), TransceiverError>;

    /// Switch a framing property on or off.
    fn set_property(&mut self, property: Property, enabled: bool) -> Result<(), TransceiverError>;

    /// Send the first `tx_bits` bits of `tx` and receive the reply into
    /// `rx`. Returns the number of bits received.
    fn transceive_bits(
        &mut self,
        tx: &[u8],
        tx_bits: usize,
        rx: &mut [u8],
    ) -> Result<usize, TransceiverError>;

    /// Send whole bytes and receive the reply into `rx`. Returns the number
    /// of bytes received.
    fn transceive_bytes(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<usize, TransceiverError>;

    /// Turn the field off and release the reader.
    fn close(&mut self) -> Result<(), TransceiverError>;
}

impl<T: Transceiver + ?Sized> Transceiver for Box<T> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn initiator_init(&mut self) -> Result<(), TransceiverError> {
        (**self).initiator_init()
    }

    fn set_property(&mut self, property: Property, enabled: bool) -> Result<(), TransceiverError> {
        (**self).set_property(property, enabled)
    }

    fn transceive_bits(
        &mut self,
        tx: &[u8],
        tx_bits: usize,
        rx: &mut [u8],
    ) -> Result<usize, TransceiverError> {
        (**self).transceive_bits(tx, tx_bits, rx)
    }

    fn transceive_bytes(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<usize, TransceiverError> {
        (**self).transceive_bytes(tx, rx)
    }

    fn close(&mut self) -> Result<(), TransceiverError> {
        (**self).close()
    }
}
