//! PN533 reader over USB (nusb).
//!
//! All tag traffic goes through InCommunicateThru, so the reader adds
//! nothing to the frames once CRC handling is switched off in the CIU.

pub mod frame;

use std::io::{Read, Write};

use nusb::transfer::{Bulk, In, Out};
use nusb::{Interface, MaybeFuture, list_devices};
use tracing::{debug, info, instrument, trace};

use self::frame::*;
use super::traits::{Property, Transceiver, TransceiverError};

/// Known PN533-based readers: (vendor, product, name).
pub const SUPPORTED_READERS: [(u16, u16, &str); 3] = [
    (0x04CC, 0x2533, "NXP PN533"),
    (0x04E6, 0x5591, "SCM Micro SCL3711"),
    (0x054C, 0x02E1, "Sony RC-S360"),
];

const USB_BUFFER_LEN: usize = 4096;

/// PN533 reader.
pub struct Pn533Transceiver {
    interface: Interface,
    in_endpoint: u8,
    out_endpoint: u8,
    vid: u16,
    pid: u16,
    firmware: Option<(u8, u8)>,
    handle_crc: bool,
    easy_framing: bool,
    tx_last_bits: Option<u8>,
    field_on: bool,
}

impl Pn533Transceiver {
    /// Open the first supported reader found on the bus.
    #[instrument(level = "info")]
    pub fn open() -> Result<Self, TransceiverError> {
        let devices = list_devices()
            .wait()
            .map_err(|e| TransceiverError::OpenFailed(e.to_string()))?;

        for device_info in devices {
            let ids = (device_info.vendor_id(), device_info.product_id());
            if SUPPORTED_READERS
                .iter()
                .any(|(vid, pid, _)| (*vid, *pid) == ids)
            {
                return Self::open_device_info(device_info);
            }
        }

        Err(TransceiverError::DeviceNotFound)
    }

    /// Open the reader with a specific VID/PID.
    #[instrument(level = "info")]
    pub fn open_with_ids(vid: u16, pid: u16) -> Result<Self, TransceiverError> {
        let device_info = list_devices()
            .wait()
            .map_err(|e| TransceiverError::OpenFailed(e.to_string()))?
            .find(|d| d.vendor_id() == vid && d.product_id() == pid)
            .ok_or(TransceiverError::DeviceNotFound)?;

        Self::open_device_info(device_info)
    }

    fn open_device_info(device_info: nusb::DeviceInfo) -> Result<Self, TransceiverError> {
        let vid = device_info.vendor_id();
        let pid = device_info.product_id();

        info!(
            vendor_id = %format!("{:04X}", vid),
            product_id = %format!("{:04X}", pid),
            "Found reader"
        );

        let device = device_info
            .open()
            .wait()
            .map_err(|e| TransceiverError::OpenFailed(e.to_string()))?;

        let claimed = device.claim_interface(0).wait();
        let interface = claimed.map_err(|e| TransceiverError::ClaimInterfaceFailed {
            interface: 0,
            message: e.to_string(),
        })?;

        let mut in_endpoint: u8 = 0;
        let mut out_endpoint: u8 = 0;

        for config in device.configurations() {
            for iface in config.interfaces() {
                if iface.interface_number() != 0 {
                    continue;
                }
                for alt in iface.alt_settings() {
                    for ep in alt.endpoints() {
                        if ep.transfer_type() == nusb::descriptors::TransferType::Bulk {
                            if ep.direction() == nusb::transfer::Direction::In {
                                in_endpoint = ep.address();
                            } else {
                                out_endpoint = ep.address();
                            }
                        }
                    }
                }
            }
        }

        if in_endpoint == 0 {
            return Err(TransceiverError::EndpointNotFound {
                ep_type: "Bulk".into(),
                direction: "In".into(),
            });
        }
        if out_endpoint == 0 {
            return Err(TransceiverError::EndpointNotFound {
                ep_type: "Bulk".into(),
                direction: "Out".into(),
            });
        }

        debug!(
            in_ep = %format!("0x{:02X}", in_endpoint),
            out_ep = %format!("0x{:02X}", out_endpoint),
            "Endpoints found"
        );

        Ok(Self {
            interface,
            in_endpoint,
            out_endpoint,
            vid,
            pid,
            firmware: None,
            handle_crc: true,
            easy_framing: true,
            tx_last_bits: None,
            field_on: false,
        })
    }

    pub fn vendor_id(&self) -> u16 {
        self.vid
    }

    pub fn product_id(&self) -> u16 {
        self.pid
    }

    #[instrument(skip(self, data), fields(len = data.len()))]
    fn write(&self, data: &[u8]) -> Result<(), TransceiverError> {
        let ep = self
            .interface
            .endpoint::<Bulk, Out>(self.out_endpoint)
            .map_err(|e| TransceiverError::WriteFailed(e.to_string()))?;

        let mut writer = ep.writer(USB_BUFFER_LEN);
        writer
            .write_all(data)
            .map_err(|e| TransceiverError::WriteFailed(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| TransceiverError::WriteFailed(e.to_string()))?;

        debug!(bytes_written = data.len(), "Write complete");
        Ok(())
    }

    #[instrument(skip(self))]
    fn read(&self) -> Result<Vec<u8>, TransceiverError> {
        let ep = self
            .interface
            .endpoint::<Bulk, In>(self.in_endpoint)
            .map_err(|e| TransceiverError::ReadFailed(e.to_string()))?;

        let mut reader = ep.reader(USB_BUFFER_LEN);
        let mut buf = vec![0u8; USB_BUFFER_LEN];
        let n = reader
            .read(&mut buf)
            .map_err(|e| TransceiverError::ReadFailed(e.to_string()))?;
        buf.truncate(n);

        debug!(bytes_read = n, "Read complete");
        Ok(buf)
    }

    /// Send one command, wait for the ACK frame, then the reply.
    fn command(&self, cmd: u8, params: &[u8]) -> Result<Vec<u8>, TransceiverError> {
        let out = encode(cmd, params)?;
        trace!(frame = %hex::encode_upper(&out), "PN533 <-");
        self.write(&out)?;

        let ack = self.read()?;
        if !is_ack(&ack) {
            return Err(TransceiverError::FrameFormat(format!(
                "expected ACK, got {}",
                hex::encode_upper(&ack)
            )));
        }

        let reply = self.read()?;
        trace!(frame = %hex::encode_upper(&reply), "PN533 ->");
        decode(&reply, cmd)
    }

    fn read_register(&self, addr: u16) -> Result<u8, TransceiverError> {
        let reply = self.command(CMD_READ_REGISTER, &addr.to_be_bytes())?;
        match reply.as_slice() {
            [0x00, value] => Ok(*value),
            [status, ..] => Err(TransceiverError::Status(*status)),
            [] => Err(TransceiverError::FrameFormat("empty reply".into())),
        }
    }

    fn write_register(&self, addr: u16, value: u8) -> Result<(), TransceiverError> {
        let [hi, lo] = addr.to_be_bytes();
        let reply = self.command(CMD_WRITE_REGISTER, &[hi, lo, value])?;
        match reply.first() {
            Some(0x00) | None => Ok(()),
            Some(status) => Err(TransceiverError::Status(*status)),
        }
    }

    fn update_register(&self, addr: u16, mask: u8, value: u8) -> Result<(), TransceiverError> {
        let current = self.read_register(addr)?;
        let next = (current & !mask) | (value & mask);
        if next != current {
            self.write_register(addr, next)?;
        }
        Ok(())
    }

    fn rf_configuration(&self, item: u8, data: &[u8]) -> Result<(), TransceiverError> {
        let mut params = Vec::with_capacity(1 + data.len());
        params.push(item);
        params.extend_from_slice(data);
        self.command(CMD_RF_CONFIGURATION, &params)?;
        Ok(())
    }

    fn set_tx_last_bits(&mut self, bits: u8) -> Result<(), TransceiverError> {
        if self.tx_last_bits == Some(bits) {
            return Ok(());
        }
        self.update_register(REG_CIU_BIT_FRAMING, LAST_BITS_MASK, bits)?;
        self.tx_last_bits = Some(bits);
        Ok(())
    }

    fn communicate_thru(&self, tx: &[u8], rx: &mut [u8]) -> Result<usize, TransceiverError> {
        if self.easy_framing {
            return Err(TransceiverError::Unsupported(Property::EasyFraming));
        }
        let reply = self.command(CMD_IN_COMMUNICATE_THRU, tx)?;
        let Some((status, data)) = reply.split_first() else {
            return Err(TransceiverError::FrameFormat("empty reply".into()));
        };
        match status & STATUS_MASK {
            0x00 => {}
            STATUS_TIMEOUT => return Err(TransceiverError::Timeout),
            other => return Err(TransceiverError::Status(other)),
        }
        if data.len() > rx.len() {
            return Err(TransceiverError::Overflow {
                needed: data.len(),
                capacity: rx.len(),
            });
        }
        rx[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }
}

impl Transceiver for Pn533Transceiver {
    fn name(&self) -> String {
        let model = SUPPORTED_READERS
            .iter()
            .find(|(vid, pid, _)| (*vid, *pid) == (self.vid, self.pid))
            .map(|(_, _, name)| *name)
            .unwrap_or("PN533");
        match self.firmware {
            Some((ver, rev)) => format!("{} v{}.{}", model, ver, rev),
            None => model.to_string(),
        }
    }

    #[instrument(skip(self))]
    fn initiator_init(&mut self) -> Result<(), TransceiverError> {
        // Flush anything a previous user left half-done.
        self.write(&ACK_FRAME)?;

        let fw = self.command(CMD_GET_FIRMWARE_VERSION, &[])?;
        if let [_ic, ver, rev, ..] = fw.as_slice() {
            self.firmware = Some((*ver, *rev));
            info!(version = %format!("{}.{}", ver, rev), "PN533 firmware");
        }

        self.rf_configuration(RF_ITEM_FIELD, &[0x00])?;

        // ISO14443-A at 106 kbps with CRC handled by the CIU.
        self.write_register(REG_CIU_TX_MODE, CRC_ENABLE)?;
        self.write_register(REG_CIU_RX_MODE, CRC_ENABLE)?;
        self.update_register(REG_CIU_TX_AUTO, FORCE_100_ASK, FORCE_100_ASK)?;
        self.set_tx_last_bits(0)?;

        self.rf_configuration(RF_ITEM_MAX_RETRIES, &[0x00, 0x01, 0x00])?;
        self.rf_configuration(RF_ITEM_TIMINGS, &[0x00, 0x0B, 0x0A])?;
        self.rf_configuration(RF_ITEM_FIELD, &[0x01])?;
        self.field_on = true;

        self.handle_crc = true;
        self.easy_framing = true;
        Ok(())
    }

    fn set_property(&mut self, property: Property, enabled: bool) -> Result<(), TransceiverError> {
        match property {
            Property::HandleCrc => {
                let value = if enabled { CRC_ENABLE } else { 0 };
                self.update_register(REG_CIU_TX_MODE, CRC_ENABLE, value)?;
                self.update_register(REG_CIU_RX_MODE, CRC_ENABLE, value)?;
                self.handle_crc = enabled;
            }
            Property::EasyFraming => self.easy_framing = enabled,
            // Only affects target selection, which is never done here.
            Property::AutoIso14443_4 => debug!(enabled, "AUTO_ISO14443_4 ignored"),
        }
        Ok(())
    }

    fn transceive_bits(
        &mut self,
        tx: &[u8],
        tx_bits: usize,
        rx: &mut [u8],
    ) -> Result<usize, TransceiverError> {
        if self.handle_crc {
            return Err(TransceiverError::Unsupported(Property::HandleCrc));
        }
        let len = tx_bits.div_ceil(8);
        let frame = tx.get(..len).ok_or(TransceiverError::Overflow {
            needed: len,
            capacity: tx.len(),
        })?;

        self.set_tx_last_bits((tx_bits % 8) as u8)?;
        let received = self.communicate_thru(frame, rx)?;
        let last = self.read_register(REG_CIU_CONTROL)? & LAST_BITS_MASK;
        Ok(received_bits(received, last))
    }

    fn transceive_bytes(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<usize, TransceiverError> {
        self.set_tx_last_bits(0)?;
        self.communicate_thru(tx, rx)
    }

    fn close(&mut self) -> Result<(), TransceiverError> {
        if !self.field_on {
            return Ok(());
        }
        self.field_on = false;
        self.rf_configuration(RF_ITEM_FIELD, &[0x00])
    }
}

/// Valid bits in a reply of `len` bytes whose last byte holds `last` bits
/// (0 meaning a full byte).
fn received_bits(len: usize, last: u8) -> usize {
    match (len, last) {
        (0, _) => 0,
        (n, 0) => n * 8,
        (n, last) => (n - 1) * 8 + last as usize,
    }
}
