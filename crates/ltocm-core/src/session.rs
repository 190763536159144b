//! LTO-CM session - drives one cartridge from wake-up to the last block.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result as AnyResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{LtoCmError, Result};
use crate::events::{FrameDirection, LtoCmEvent, LtoCmObserver, TracingObserver};
use crate::protocol::commands::{self, Operation, Response};
use crate::protocol::constants::{ACK, BLOCK_LEN, STANDARD_WORD_LEN};
use crate::protocol::{Addressing, Block, BlockHalf, Half, SerialNumber, StandardWord, TagType};
use crate::sink::BlockSink;
use crate::state::{SessionContext, SessionState};
use crate::transceiver::{Radio, Transceiver, TransceiverError};

/// Configuration for a dump.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Output file. Defaults to `<serial>.bin`.
    pub output: Option<PathBuf>,
    /// Directory for the default-named output file.
    pub output_dir: Option<PathBuf>,
    /// Only use the reader with this USB vendor ID.
    pub usb_vendor_id: Option<u16>,
    /// Only use the reader with this USB product ID.
    pub usb_product_id: Option<u16>,
    /// Attach raw frame bytes to frame events.
    pub hexdump: bool,
}

impl DumpConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> AnyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DumpConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> AnyResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Where the dump of `tag` goes.
    pub fn output_path(&self, tag: &TagInfo) -> PathBuf {
        if let Some(path) = &self.output {
            return path.clone();
        }
        match &self.output_dir {
            Some(dir) => dir.join(tag.default_filename()),
            None => PathBuf::from(tag.default_filename()),
        }
    }
}

/// Identity of the selected tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagInfo {
    pub standard: StandardWord,
    pub tag_type: TagType,
    pub serial: SerialNumber,
}

impl TagInfo {
    pub fn block_count(&self) -> u16 {
        self.tag_type.block_count()
    }

    pub fn addressing(&self) -> Addressing {
        self.tag_type.addressing()
    }

    pub fn default_filename(&self) -> String {
        self.serial.default_filename()
    }

    /// Size of a complete dump in bytes.
    pub fn dump_len(&self) -> u64 {
        u64::from(self.block_count()) * BLOCK_LEN as u64
    }
}

/// Outcome of a successful dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpSummary {
    pub tag: TagInfo,
    pub blocks: u16,
    pub bytes: u64,
}

/// LTO-CM session - one cartridge, one pass, no retries.
pub struct LtoCmSession<T: Transceiver, O: LtoCmObserver> {
    radio: Radio<T>,
    observer: Arc<O>,
    ctx: SessionContext,
    tag: Option<TagInfo>,
    hexdump: bool,
}

impl<T: Transceiver> LtoCmSession<T, TracingObserver> {
    /// Open a session with the default tracing observer.
    pub fn new(transceiver: T) -> Result<Self> {
        Self::with_observer(transceiver, Arc::new(TracingObserver))
    }
}

impl<T: Transceiver, O: LtoCmObserver> LtoCmSession<T, O> {
    /// Open the radio and create a session in the INIT state.
    pub fn with_observer(transceiver: T, observer: Arc<O>) -> Result<Self> {
        let radio = Radio::open(transceiver)?;
        observer.on_event(&LtoCmEvent::RadioOpened { name: radio.name() });
        Ok(Self {
            radio,
            observer,
            ctx: SessionContext::new(),
            tag: None,
            hexdump: false,
        })
    }

    /// Apply the session-relevant parts of `config`.
    pub fn with_config(mut self, config: &DumpConfig) -> Self {
        self.hexdump = config.hexdump;
        self
    }

    pub fn state(&self) -> SessionState {
        self.ctx.state
    }

    pub fn tag(&self) -> Option<&TagInfo> {
        self.tag.as_ref()
    }

    /// Wake, identify and select the tag (INIT -> PRESELECT -> COMMAND).
    #[instrument(skip(self))]
    pub fn identify(&mut self) -> Result<TagInfo> {
        let result = self.identify_inner();
        self.track(result)
    }

    /// Read every block of the selected tag into `sink`, in order.
    ///
    /// A block reaches the sink only once both halves passed their checks.
    #[instrument(skip(self, sink))]
    pub fn read_blocks<S: BlockSink + ?Sized>(&mut self, sink: &mut S) -> Result<u16> {
        let result = self.read_blocks_inner(sink);
        self.track(result)
    }

    /// Full dump: identify, open the sink for the found tag, read all
    /// blocks, finish the sink. The radio is closed on every path.
    #[instrument(skip_all)]
    pub fn run<F, S>(mut self, open_sink: F) -> Result<DumpSummary>
    where
        F: FnOnce(&TagInfo) -> io::Result<S>,
        S: BlockSink,
    {
        let result = self.run_inner(open_sink);
        let result = self.track(result);
        if let Err(e) = self.radio.close() {
            warn!(error = %e, "Failed to close reader");
        }
        result
    }

    /// Close the radio without dumping.
    pub fn close(&mut self) -> std::result::Result<(), TransceiverError> {
        self.radio.close()
    }

    fn run_inner<F, S>(&mut self, open_sink: F) -> Result<DumpSummary>
    where
        F: FnOnce(&TagInfo) -> io::Result<S>,
        S: BlockSink,
    {
        let tag = self.identify()?;
        let mut sink = open_sink(&tag).map_err(LtoCmError::SinkOpenFailed)?;
        let blocks = self.read_blocks(&mut sink)?;
        sink.finish().map_err(LtoCmError::SinkWriteFailed)?;

        let bytes = u64::from(blocks) * BLOCK_LEN as u64;
        self.emit(LtoCmEvent::Complete { blocks, bytes });
        Ok(DumpSummary { tag, blocks, bytes })
    }

    fn identify_inner(&mut self) -> Result<TagInfo> {
        self.ctx.check(Operation::RequestStandard)?;
        let resp = commands::request_standard(&mut self.radio)?;
        self.emit_frames(&resp);
        let standard = decode_standard(&resp.data);
        debug!(standard = %standard, "REQUEST STANDARD");
        self.goto(SessionState::Preselect);
        let tag_type = standard.classify()?;

        self.ctx.check(Operation::RequestSerial)?;
        let resp = commands::request_serial(&mut self.radio)?;
        self.emit_frames(&resp);
        let serial = SerialNumber::from_bytes(&resp.data)?;
        debug!(serial = %serial, "REQUEST SERIAL NUMBER");

        self.ctx.check(Operation::Select)?;
        let resp = commands::select(&mut self.radio, &serial)?;
        self.emit_frames(&resp);
        if resp.data != [ACK] {
            return Err(LtoCmError::SelectRejected(resp.data));
        }
        self.goto(SessionState::Command);

        let tag = TagInfo {
            standard,
            tag_type,
            serial,
        };
        info!(
            standard = %standard,
            serial = %serial,
            blocks = tag.block_count(),
            "Tag selected"
        );
        self.emit(LtoCmEvent::TagIdentified {
            standard,
            tag_type,
            serial,
        });
        self.tag = Some(tag);
        Ok(tag)
    }

    fn read_blocks_inner<S: BlockSink + ?Sized>(&mut self, sink: &mut S) -> Result<u16> {
        let tag = self.tag.ok_or(LtoCmError::InvalidState {
            op: Operation::ReadBlock,
            state: self.ctx.state,
        })?;
        let total = tag.block_count();
        let addressing = tag.addressing();
        info!(blocks = total, ?addressing, "Reading LTO-CM data");

        for index in 0..total {
            let block = self.read_block(index, addressing)?;
            let written = sink.write_block(&block);
            written.map_err(LtoCmError::SinkWriteFailed)?;
            self.ctx.blocks_done += 1;
            self.emit(LtoCmEvent::Progress {
                block: index,
                total,
            });
        }
        Ok(self.ctx.blocks_done)
    }

    /// READ BLOCK (or its extended form) then READ BLOCK CONTINUE, with
    /// nothing in between.
    fn read_block(&mut self, index: u16, addressing: Addressing) -> Result<Block> {
        let op = match addressing {
            Addressing::Short => Operation::ReadBlock,
            Addressing::Extended => Operation::ReadBlockExtended,
        };
        self.ctx.check(op)?;
        let resp = commands::read_block(&mut self.radio, addressing, index)?;
        self.emit_frames(&resp);
        let first = BlockHalf::from_reply(index, Half::First, &resp.data)?;
        self.ctx.pending_continue = Some(index);

        self.ctx.check(Operation::ReadBlockContinue)?;
        let resp = commands::read_block_continue(&mut self.radio);
        self.ctx.pending_continue = None;
        let resp = resp?;
        self.emit_frames(&resp);
        let second = BlockHalf::from_reply(index, Half::Second, &resp.data)?;

        Ok(Block::from_halves(index, &first, &second))
    }

    fn goto(&mut self, to: SessionState) {
        let from = self.ctx.state;
        self.ctx.goto_state(to);
        self.emit(LtoCmEvent::PhaseChanged { from, to });
    }

    /// Move to FAILED on the first error, once.
    fn track<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(e) = &result {
            if !self.ctx.is_failed() {
                let from = self.ctx.state;
                self.ctx.fail();
                self.emit(LtoCmEvent::PhaseChanged {
                    from,
                    to: SessionState::Failed,
                });
                self.emit(LtoCmEvent::Failed {
                    message: e.to_string(),
                });
            }
        }
        result
    }

    fn emit(&self, event: LtoCmEvent) {
        self.observer.on_event(&event);
    }

    fn emit_frames(&self, resp: &Response) {
        let data = |bytes: &[u8]| self.hexdump.then(|| bytes.to_vec());
        self.emit(LtoCmEvent::Frame {
            direction: FrameDirection::Tx,
            op: resp.op,
            length: resp.sent.len(),
            data: data(&resp.sent),
        });
        self.emit(LtoCmEvent::Frame {
            direction: FrameDirection::Rx,
            op: resp.op,
            length: resp.len(),
            data: data(&resp.data),
        });
    }
}

/// Big-endian StandardWord from the reply; a short reply is zero-padded on
/// the right, which never yields a known type.
fn decode_standard(data: &[u8]) -> StandardWord {
    let mut word = [0u8; STANDARD_WORD_LEN];
    for (dst, src) in word.iter_mut().zip(data) {
        *dst = *src;
    }
    StandardWord::from_bytes(&word).unwrap_or(StandardWord(0))
}
