use std::io;
use std::sync::Arc;

use ltocm_core::LtoCmError;
use ltocm_core::events::{LtoCmEvent, NullObserver};
use ltocm_core::protocol::{Half, Operation};
use ltocm_core::session::LtoCmSession;
use ltocm_core::transceiver::MockTransceiver;
use ltocm_core::transceiver::mock::{Exchange, Fault};

use crate::common::fixtures::*;

#[test]
fn wrong_serial_parity_opens_no_sink() {
    let run = dump(tag(0x0001).with_serial(&BAD_PARITY_SERIAL));
    match &run.result {
        Err(LtoCmError::BadSerial(bytes)) => assert_eq!(bytes, &BAD_PARITY_SERIAL),
        other => panic!("expected BadSerial, got {:?}", other),
    }
    assert!(run.output.is_none());
    assert_eq!(run.close_calls(), 1);
}

#[test]
fn short_serial_is_rejected() {
    let run = dump(MockTransceiver::new().with_serial(&SERIAL[..4]));
    match &run.result {
        Err(LtoCmError::BadSerial(bytes)) => assert_eq!(bytes.len(), 4),
        other => panic!("expected BadSerial, got {:?}", other),
    }
    assert!(run.output.is_none());
}

#[test]
fn unknown_standard_stops_after_wakeup() {
    let run = dump(MockTransceiver::new().with_standard(0x0004));
    assert!(matches!(
        run.result,
        Err(LtoCmError::UnknownTagType(0x0004))
    ));
    assert!(run.output.is_none());
    assert_eq!(run.exchanges().len(), 1);
    assert_eq!(run.close_calls(), 1);
}

#[test]
fn nack_on_first_half_of_block_17() {
    let run = dump(tag(0x0002).with_fault(17, Half::First, Fault::Nack));
    assert!(matches!(
        run.result,
        Err(LtoCmError::NackOnRead {
            block: 17,
            half: Half::First
        })
    ));
    assert_eq!(run.output.as_ref().unwrap().len(), 17 * 32);
    assert_eq!(run.close_calls(), 1);
}

#[test]
fn corrupted_crc_on_second_half_of_block_3() {
    let run = dump(tag(0x0002).with_fault(3, Half::Second, Fault::CorruptCrc));
    assert!(matches!(
        run.result,
        Err(LtoCmError::CrcMismatch {
            block: 3,
            half: Half::Second
        })
    ));
    assert_eq!(run.output.as_ref().unwrap().len(), 3 * 32);
}

#[test]
fn truncated_reply_writes_no_partial_block() {
    let run = dump(tag(0x0002).with_fault(42, Half::First, Fault::Truncate(17)));
    assert!(matches!(
        run.result,
        Err(LtoCmError::ShortRead {
            block: 42,
            half: Half::First,
            got: 17
        })
    ));
    let output = run.output.unwrap();
    assert_eq!(output.len(), 42 * 32);
    assert!(output[41 * 32..].iter().all(|&b| b == 41));
}

#[test]
fn no_continue_after_failed_first_half() {
    let run = dump(tag(0x0002).with_fault(5, Half::First, Fault::CorruptCrc));
    assert!(run.result.is_err());
    let frames = run.read_frames();
    // Five complete pairs, then the failing READ BLOCK.
    assert_eq!(frames.len(), 11);
    assert_eq!(frames[10][..2], [0x30, 5]);
}

#[test]
fn silent_tag_names_the_operation() {
    let run = dump(tag(0x0001).with_fault(0, Half::Second, Fault::Silent));
    assert!(matches!(
        run.result,
        Err(LtoCmError::TransceiveFailed {
            op: Operation::ReadBlockContinue,
            ..
        })
    ));
    assert_eq!(run.output.unwrap().len(), 0);
}

#[test]
fn rejected_select() {
    let run = dump(tag(0x0002).reject_select());
    assert!(matches!(run.result, Err(LtoCmError::SelectRejected(_))));
    assert!(run.output.is_none());
    assert_eq!(run.close_calls(), 1);
}

#[test]
fn failure_emits_failed_event_once() {
    let run = dump(tag(0x0002).with_fault(17, Half::First, Fault::Nack));
    let failed: Vec<_> = run
        .events
        .iter()
        .filter_map(|e| match e {
            LtoCmEvent::Failed { message } => Some(message.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(failed, ["READ BLOCK 17 half 0 failed: NACK"]);

    let completed = run
        .events
        .iter()
        .filter(|e| matches!(e, LtoCmEvent::Complete { .. }))
        .count();
    assert_eq!(completed, 0);
}

#[test]
fn radio_init_failure_closes_reader() {
    let mut mock = tag(0x0002);
    mock.fail_init();
    let log = mock.log();
    let err = LtoCmSession::with_observer(mock, Arc::new(NullObserver))
        .err()
        .unwrap();
    assert!(matches!(err, LtoCmError::RadioInitFailed(_)));
    let log = log.lock().unwrap();
    assert_eq!(log.close_calls, 1);
    assert!(log.exchanges.is_empty());
}

#[test]
fn sink_open_failure_reads_nothing() {
    let mock = tag(0x0002);
    let log = mock.log();
    let session = LtoCmSession::with_observer(mock, Arc::new(NullObserver)).unwrap();
    let result = session.run(|_| -> io::Result<Vec<u8>> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    });
    assert!(matches!(result, Err(LtoCmError::SinkOpenFailed(_))));

    let log = log.lock().unwrap();
    assert_eq!(log.close_calls, 1);
    let reads = log
        .exchanges
        .iter()
        .filter_map(Exchange::bytes)
        .filter(|f| f[0] == 0x30)
        .count();
    assert_eq!(reads, 0);
}

struct FullDisk {
    room: usize,
}

impl io::Write for FullDisk {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.len() > self.room {
            return Err(io::Error::new(io::ErrorKind::StorageFull, "disk full"));
        }
        self.room -= buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn sink_write_failure_stops_reading() {
    let mock = tag(0x0002);
    let log = mock.log();
    let session = LtoCmSession::with_observer(mock, Arc::new(NullObserver)).unwrap();
    let result = session.run(|_| Ok(FullDisk { room: 64 }));
    assert!(matches!(result, Err(LtoCmError::SinkWriteFailed(_))));

    let log = log.lock().unwrap();
    assert_eq!(log.close_calls, 1);
    // REQUEST SERIAL, SELECT and three read pairs.
    assert_eq!(
        log.exchanges.iter().filter_map(Exchange::bytes).count(),
        2 + 3 * 2
    );
}
