//! Contactless reader layer.
//!
//! Provides the `Transceiver` abstraction with a PN533 USB backend and a
//! tag-emulating mock, plus the `Radio` adapter the command layer talks to.

pub mod mock;
pub mod pn533;
pub mod radio;
pub mod traits;

pub use mock::MockTransceiver;
pub use pn533::Pn533Transceiver;
pub use radio::{BitReply, Radio};
pub use traits::{Property, Transceiver, TransceiverError};
