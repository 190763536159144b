//! LtoCm-Core: LTO Cartridge Memory reader in Rust.
//!
//! This crate reads the complete memory image of an LTO Cartridge Memory
//! (LTO-CM) chip over ISO/IEC 14443-A, using a contactless reader in raw
//! mode with CRC-A computed on the host.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **CRC**: ISO14443-A CRC for every frame carrying operands
//! - **Transceiver**: Reader abstraction (PN533 over nusb, mock) and the
//!   `Radio` adapter that pins the framing properties
//! - **Protocol**: LTO-CM commands, tag identity, block halves
//! - **State**: Session state machine
//! - **Events**: Observer pattern for UI decoupling
//! - **Sink**: Destination for the dumped blocks
//! - **Session**: High-level orchestrator
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufWriter;
//!
//! use ltocm_core::session::{DumpConfig, LtoCmSession};
//! use ltocm_core::transceiver::Pn533Transceiver;
//!
//! let config = DumpConfig::default();
//! let reader = Pn533Transceiver::open().expect("no reader");
//! let session = LtoCmSession::new(reader).expect("reader init failed");
//! let summary = session
//!     .with_config(&config)
//!     .run(|tag| File::create(config.output_path(tag)).map(BufWriter::new))
//!     .expect("dump failed");
//! println!("{} bytes", summary.bytes);
//! ```

pub mod crc;
pub mod error;
pub mod events;
pub mod protocol;
pub mod session;
pub mod sink;
pub mod state;
pub mod transceiver;

// Re-exports for convenience
pub use error::{LtoCmError, Result};
pub use events::{FrameDirection, LtoCmEvent, LtoCmObserver, NullObserver, TracingObserver};
pub use protocol::{Addressing, Block, Half, Operation, SerialNumber, StandardWord, TagType};
pub use session::{DumpConfig, DumpSummary, LtoCmSession, TagInfo};
pub use sink::BlockSink;
pub use state::SessionState;
pub use transceiver::{MockTransceiver, Pn533Transceiver, Transceiver, TransceiverError};
