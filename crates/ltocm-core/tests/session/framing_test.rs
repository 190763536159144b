use ltocm_core::crc::{crc_a, verify_crc};
use ltocm_core::transceiver::mock::Exchange;
use ltocm_core::transceiver::radio::SESSION_PROPERTIES;

use crate::common::fixtures::*;

#[test]
fn request_standard_is_the_only_bit_frame() {
    for standard in [0x0001, 0x0002, 0x0003] {
        let run = dump(tag(standard));
        assert!(run.result.is_ok());
        let exchanges = run.exchanges();
        assert_eq!(
            exchanges[0],
            Exchange::Bits {
                data: vec![0x45],
                bits: 7
            }
        );
        assert!(exchanges[1..].iter().all(|e| e.bytes().is_some()));
    }
}

#[test]
fn read_frames_come_in_ordered_pairs() {
    let run = dump(tag(0x0002));
    let frames = run.read_frames();
    assert_eq!(frames.len(), 2 * 255);

    for (k, pair) in frames.chunks(2).enumerate() {
        assert_eq!(pair[0].len(), 4);
        assert_eq!(pair[0][0], 0x30);
        assert_eq!(pair[0][1] as usize, k);
        assert!(verify_crc(&pair[0]));
        assert_eq!(pair[1], vec![0x80]);
    }
}

#[test]
fn select_echoes_serial_with_crc() {
    let run = dump(tag(0x0001));
    let exchanges = run.exchanges();
    assert_eq!(exchanges[1], Exchange::Bytes(vec![0x93, 0x20]));

    let select = exchanges[2].bytes().unwrap();
    assert_eq!(select.len(), 9);
    assert_eq!(&select[..2], &[0x93, 0x70]);
    assert_eq!(&select[2..7], &SERIAL);
    let (lo, hi) = crc_a(&select[..7]);
    assert_eq!(&select[7..], &[lo, hi]);
}

#[test]
fn framing_properties_set_once_before_any_exchange() {
    let run = dump(tag(0x0001));
    let log = run.log.lock().unwrap();
    assert_eq!(log.init_calls, 1);
    let expected: Vec<_> = SESSION_PROPERTIES.iter().map(|p| (*p, false)).collect();
    assert_eq!(log.properties, expected);
}
