//! Event system for UI decoupling.
//!
//! Lets a CLI or any other front-end follow a dump without being coupled
//! to the session driver.

use std::fmt;

use crate::protocol::{Operation, SerialNumber, StandardWord, TagType};
use crate::state::SessionState;

/// Radio frame direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDirection {
    Tx, // Reader -> Tag
    Rx, // Tag -> Reader
}

impl fmt::Display for FrameDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameDirection::Tx => write!(f, "TX"),
            FrameDirection::Rx => write!(f, "RX"),
        }
    }
}

/// Events emitted by an LTO-CM session.
#[derive(Debug, Clone)]
pub enum LtoCmEvent {
    /// Reader initialised and framing configured.
    RadioOpened { name: String },
    /// Session state changed.
    PhaseChanged {
        from: SessionState,
        to: SessionState,
    },
    /// Tag identified and selected.
    TagIdentified {
        standard: StandardWord,
        tag_type: TagType,
        serial: SerialNumber,
    },
    /// Radio frame sent or received. `data` is only filled in hexdump mode.
    Frame {
        direction: FrameDirection,
        op: Operation,
        length: usize,
        data: Option<Vec<u8>>,
    },
    /// Block `block` written; `total` blocks expected.
    Progress { block: u16, total: u16 },
    /// The session failed.
    Failed { message: String },
    /// All blocks written.
    Complete { blocks: u16, bytes: u64 },
}

/// Observer trait for receiving session events.
///
/// Implement this trait in your UI layer to receive updates.
pub trait LtoCmObserver: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &LtoCmEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl LtoCmObserver for NullObserver {
    fn on_event(&self, _event: &LtoCmEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl LtoCmObserver for TracingObserver {
    fn on_event(&self, event: &LtoCmEvent) {
        match event {
            LtoCmEvent::RadioOpened { name } => {
                tracing::info!(reader = %name, "NFC reader opened");
            }
            LtoCmEvent::PhaseChanged { from, to } => {
                tracing::debug!(from = %from, to = %to, "Phase changed");
            }
            LtoCmEvent::TagIdentified {
                standard,
                tag_type,
                serial,
            } => {
                tracing::info!(
                    standard = %standard,
                    tag_type = %tag_type,
                    serial = %serial,
                    "Found LTO-CM tag"
                );
            }
            LtoCmEvent::Frame {
                direction,
                op,
                length,
                data,
            } => match data {
                Some(bytes) => tracing::trace!(
                    dir = %direction,
                    op = %op,
                    len = length,
                    data = %hex::encode_upper(bytes),
                    "Frame"
                ),
                None => tracing::trace!(dir = %direction, op = %op, len = length, "Frame"),
            },
            LtoCmEvent::Progress { block, total } => {
                let pct = if *total > 0 {
                    (u32::from(*block) + 1) * 100 / u32::from(*total)
                } else {
                    0
                };
                tracing::debug!(block, total, progress = %format!("{}%", pct), "Block read");
            }
            // The caller reports the error itself.
            LtoCmEvent::Failed { message } => {
                tracing::debug!("Session failed: {}", message);
            }
            LtoCmEvent::Complete { blocks, bytes } => {
                tracing::info!(blocks, bytes, "Dump complete");
            }
        }
    }
}
