// fixtures.rs: mock tags, a recording observer and a shared in-memory sink

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use ltocm_core::LtoCmError;
use ltocm_core::events::{LtoCmEvent, LtoCmObserver};
use ltocm_core::session::{DumpConfig, DumpSummary, LtoCmSession, TagInfo};
use ltocm_core::transceiver::MockTransceiver;
use ltocm_core::transceiver::mock::{Exchange, MockLog};

/// `11 22 33 44` plus its parity byte.
pub const SERIAL: [u8; 5] = [0x11, 0x22, 0x33, 0x44, 0x44];
/// Same UID with a wrong parity byte.
pub const BAD_PARITY_SERIAL: [u8; 5] = [0x11, 0x22, 0x33, 0x44, 0x55];

pub fn tag(standard: u16) -> MockTransceiver {
    MockTransceiver::new()
        .with_standard(standard)
        .with_serial(&SERIAL)
}

#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<LtoCmEvent>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<LtoCmEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl LtoCmObserver for Recorder {
    fn on_event(&self, event: &LtoCmEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// `Write` handle onto a buffer the test keeps after the session took the
/// sink.
#[derive(Clone, Default)]
pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Everything one dump left behind.
pub struct DumpRun {
    pub result: Result<DumpSummary, LtoCmError>,
    /// `None` when the sink was never opened.
    pub output: Option<Vec<u8>>,
    pub opened_for: Option<TagInfo>,
    pub log: Arc<Mutex<MockLog>>,
    pub events: Vec<LtoCmEvent>,
}

impl DumpRun {
    pub fn exchanges(&self) -> Vec<Exchange> {
        self.log.lock().unwrap().exchanges.clone()
    }

    /// Byte frames sent after SELECT, i.e. the block-reading traffic.
    pub fn read_frames(&self) -> Vec<Vec<u8>> {
        self.exchanges()
            .iter()
            .filter_map(Exchange::bytes)
            .skip(2)
            .map(<[u8]>::to_vec)
            .collect()
    }

    pub fn close_calls(&self) -> usize {
        self.log.lock().unwrap().close_calls
    }
}

pub fn dump(mock: MockTransceiver) -> DumpRun {
    dump_with(mock, &DumpConfig::default())
}

pub fn dump_with(mock: MockTransceiver, config: &DumpConfig) -> DumpRun {
    let log = mock.log();
    let recorder = Arc::new(Recorder::default());
    let buf = SharedBuf::default();
    let mut opened_for = None;

    let session = LtoCmSession::with_observer(mock, Arc::clone(&recorder))
        .unwrap()
        .with_config(config);
    let result = session.run(|tag| {
        opened_for = Some(*tag);
        Ok(buf.clone())
    });

    let output = opened_for.map(|_| buf.0.lock().unwrap().clone());
    DumpRun {
        result,
        output,
        opened_for,
        log,
        events: recorder.events(),
    }
}
