//! Radio adapter: the only path from the command layer to the reader.
//!
//! Owns the transceiver and the receive buffer, and pins the framing
//! properties for the whole session.

use tracing::{debug, info, trace, warn};

use super::traits::{Property, Transceiver, TransceiverError};
use crate::error::LtoCmError;
use crate::protocol::constants::MAX_FRAME_LEN;

/// Properties switched off at open, in this order, and never touched again.
pub const SESSION_PROPERTIES: [Property; 3] = [
    Property::HandleCrc,
    Property::EasyFraming,
    Property::AutoIso14443_4,
];

/// Reply to a bit-frame exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitReply {
    /// Received bytes; the last one may be partial.
    pub data: Vec<u8>,
    /// Number of valid bits in `data`.
    pub bits: usize,
}

pub struct Radio<T: Transceiver> {
    inner: T,
    rx: [u8; MAX_FRAME_LEN],
    closed: bool,
}

impl<T: Transceiver> Radio<T> {
    /// Initialise the initiator and switch off CRC handling, easy framing
    /// and ISO14443-4 autoswitching.
    ///
    /// On failure the transceiver is closed before returning.
    pub fn open(mut inner: T) -> Result<Self, LtoCmError> {
        if let Err(e) = Self::configure(&mut inner) {
            if let Err(close_err) = inner.close() {
                warn!(error = %close_err, "Close after failed init also failed");
            }
            return Err(LtoCmError::RadioInitFailed(e));
        }
        info!(reader = %inner.name(), "Reader opened");
        Ok(Self {
            inner,
            rx: [0u8; MAX_FRAME_LEN],
            closed: false,
        })
    }

    fn configure(inner: &mut T) -> Result<(), TransceiverError> {
        inner.initiator_init()?;
        for property in SESSION_PROPERTIES {
            debug!(%property, "Disabling property");
            inner.set_property(property, false)?;
        }
        Ok(())
    }

    pub fn name(&self) -> String {
        self.inner.name()
    }

    /// Transmit a short frame of `nbits` bits.
    pub fn send_bits(&mut self, tx: &[u8], nbits: usize) -> Result<BitReply, TransceiverError> {
        if self.closed {
            return Err(TransceiverError::Closed);
        }
        trace!(bits = nbits, tx = %hex::encode_upper(tx), "Sent bits");
        let bits = self.inner.transceive_bits(tx, nbits, &mut self.rx)?;
        let len = bits.div_ceil(8);
        if len > self.rx.len() {
            return Err(TransceiverError::Overflow {
                needed: len,
                capacity: self.rx.len(),
            });
        }
        let data = self.rx[..len].to_vec();
        trace!(bits, rx = %hex::encode_upper(&data), "Received bits");
        Ok(BitReply { data, bits })
    }

    /// Transmit whole bytes.
    pub fn send_bytes(&mut self, tx: &[u8]) -> Result<Vec<u8>, TransceiverError> {
        if self.closed {
            return Err(TransceiverError::Closed);
        }
        trace!(tx = %hex::encode_upper(tx), "Sent bytes");
        let len = self.inner.transceive_bytes(tx, &mut self.rx)?;
        if len > self.rx.len() {
            return Err(TransceiverError::Overflow {
                needed: len,
                capacity: self.rx.len(),
            });
        }
        let data = self.rx[..len].to_vec();
        trace!(rx = %hex::encode_upper(&data), "Received bytes");
        Ok(data)
    }

    /// Release the reader. Later calls are no-ops.
    pub fn close(&mut self) -> Result<(), TransceiverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        info!(reader = %self.inner.name(), "Closing reader");
        self.inner.close()
    }
}

impl<T: Transceiver> Drop for Radio<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to close reader");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transceiver::mock::{Exchange, MockTransceiver};

    #[test]
    fn open_disables_framing_properties_once() {
        let mock = MockTransceiver::new();
        let log = mock.log();
        let radio = Radio::open(mock).unwrap();
        drop(radio);

        let log = log.lock().unwrap();
        assert_eq!(
            log.properties,
            vec![
                (Property::HandleCrc, false),
                (Property::EasyFraming, false),
                (Property::AutoIso14443_4, false),
            ]
        );
        assert_eq!(log.init_calls, 1);
        assert_eq!(log.close_calls, 1);
    }

    #[test]
    fn failed_init_closes_reader() {
        let mut mock = MockTransceiver::new();
        mock.fail_init();
        let log = mock.log();
        let err = Radio::open(mock).err().unwrap();
        assert!(matches!(err, LtoCmError::RadioInitFailed(_)));
        assert_eq!(log.lock().unwrap().close_calls, 1);
    }

    #[test]
    fn bits_and_bytes_are_logged_separately() {
        let mock = MockTransceiver::new();
        let log = mock.log();
        let mut radio = Radio::open(mock).unwrap();

        let reply = radio.send_bits(&[0x45], 7).unwrap();
        assert_eq!(reply.bits, 16);
        assert_eq!(reply.data, vec![0x00, 0x02]);

        let serial = radio.send_bytes(&[0x93, 0x20]).unwrap();
        assert_eq!(serial.len(), 5);

        let log = log.lock().unwrap();
        assert_eq!(
            log.exchanges,
            vec![
                Exchange::Bits {
                    data: vec![0x45],
                    bits: 7
                },
                Exchange::Bytes(vec![0x93, 0x20]),
            ]
        );
    }

    #[test]
    fn closed_radio_refuses_exchanges() {
        let mut radio = Radio::open(MockTransceiver::new()).unwrap();
        radio.close().unwrap();
        radio.close().unwrap();
        assert!(matches!(
            radio.send_bytes(&[0x80]),
            Err(TransceiverError::Closed)
        ));
    }
}
