use ltocm_core::SessionState;
use ltocm_core::crc::verify_crc;
use ltocm_core::events::{FrameDirection, LtoCmEvent};
use ltocm_core::protocol::{Operation, TagType};
use ltocm_core::session::DumpConfig;

use crate::common::fixtures::*;

fn assert_patterned(output: &[u8], blocks: usize) {
    assert_eq!(output.len(), blocks * 32);
    for (b, block) in output.chunks(32).enumerate() {
        assert!(
            block.iter().all(|&v| v == (b % 256) as u8),
            "block {} has wrong content",
            b
        );
    }
}

#[test]
fn type2_tag_dumps_8160_bytes() {
    let run = dump(tag(0x0002));
    let summary = run.result.as_ref().unwrap();
    assert_eq!(summary.blocks, 255);
    assert_eq!(summary.bytes, 8160);
    assert_eq!(summary.tag.tag_type, TagType::Type2);
    assert_eq!(summary.tag.default_filename(), "11223344.bin");
    assert_patterned(run.output.as_ref().unwrap(), 255);
    assert_eq!(run.close_calls(), 1);
}

#[test]
fn type3_tag_uses_extended_reads_only() {
    let run = dump(tag(0x0003));
    let summary = run.result.as_ref().unwrap();
    assert_eq!(summary.bytes, 16352);
    assert_patterned(run.output.as_ref().unwrap(), 511);

    let frames = run.read_frames();
    assert!(frames.iter().all(|f| f[0] != 0x30));
    let extended: Vec<_> = frames.iter().filter(|f| f[0] == 0x21).collect();
    assert_eq!(extended.len(), 511);
    assert!(extended.iter().all(|f| f.len() == 5));
    // Last block index, little-endian.
    assert_eq!(&extended[510][1..3], &[0xFE, 0x01]);
}

#[test]
fn type1_tag_stops_at_block_126() {
    let run = dump(tag(0x0001));
    assert_eq!(run.result.as_ref().unwrap().blocks, 127);
    assert_patterned(run.output.as_ref().unwrap(), 127);

    let frames = run.read_frames();
    let last_read = frames.iter().rev().find(|f| f[0] == 0x30).unwrap();
    assert_eq!(last_read[1], 126);
    assert_eq!(frames.len(), 2 * 127);
}

#[test]
fn sink_opened_with_selected_tag() {
    let run = dump(tag(0x0002));
    let tag = run.opened_for.unwrap();
    assert_eq!(tag.serial.as_bytes(), &SERIAL);
    assert_eq!(tag.block_count(), 255);
}

#[test]
fn custom_memory_is_copied_verbatim() {
    let memory: Vec<[u8; 32]> = (0..255u16)
        .map(|b| {
            let mut block = [0u8; 32];
            for (i, v) in block.iter_mut().enumerate() {
                *v = (b as usize * 7 + i) as u8;
            }
            block
        })
        .collect();
    let run = dump(tag(0x0002).with_memory(memory.clone()));
    assert!(run.result.is_ok());
    assert_eq!(run.output.unwrap(), memory.concat());
}

#[test]
fn retained_halves_carry_valid_crc() {
    let config = DumpConfig {
        hexdump: true,
        ..Default::default()
    };
    let run = dump_with(tag(0x0002), &config);
    assert!(run.result.is_ok());

    let mut halves = 0;
    for event in &run.events {
        if let LtoCmEvent::Frame {
            direction: FrameDirection::Rx,
            length: 18,
            data: Some(data),
            ..
        } = event
        {
            assert!(verify_crc(data));
            halves += 1;
        }
    }
    assert_eq!(halves, 2 * 255);
}

#[test]
fn frame_events_omit_data_without_hexdump() {
    let run = dump(tag(0x0001));
    for event in &run.events {
        if let LtoCmEvent::Frame { data, .. } = event {
            assert!(data.is_none());
        }
    }
}

#[test]
fn successful_dump_event_sequence() {
    let run = dump(tag(0x0001));
    assert!(run.result.is_ok());

    assert!(matches!(
        run.events.first(),
        Some(LtoCmEvent::RadioOpened { .. })
    ));
    assert!(matches!(
        run.events.last(),
        Some(LtoCmEvent::Complete {
            blocks: 127,
            bytes: 4064
        })
    ));

    let phases: Vec<_> = run
        .events
        .iter()
        .filter_map(|e| match e {
            LtoCmEvent::PhaseChanged { to, .. } => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(phases, vec![SessionState::Preselect, SessionState::Command]);

    let progress = run
        .events
        .iter()
        .filter(|e| matches!(e, LtoCmEvent::Progress { .. }))
        .count();
    assert_eq!(progress, 127);

    let identified = run
        .events
        .iter()
        .filter(|e| matches!(e, LtoCmEvent::TagIdentified { .. }))
        .count();
    assert_eq!(identified, 1);

    let failed = run
        .events
        .iter()
        .filter(|e| matches!(e, LtoCmEvent::Failed { .. }))
        .count();
    assert_eq!(failed, 0);
}

#[test]
fn request_standard_frame_event_is_labelled() {
    let run = dump(tag(0x0001));
    assert!(matches!(
        run.events.get(1),
        Some(LtoCmEvent::Frame {
            direction: FrameDirection::Tx,
            op: Operation::RequestStandard,
            length: 1,
            ..
        })
    ));
}
