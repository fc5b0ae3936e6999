// Layout conformance tests for the shared diagnostic segment.
// Other runtimes attach to the same bytes, so header offsets and the slot
// geometry must not drift.
use dmxp_logrelay::SharedLog::layout::{
    decode_slot, encode_slot, slot_range, SegmentHeader, HEADER_SIZE, SEGMENT_SIZE, SLOT_COUNT,
    SLOT_SIZE,
};
use memoffset::offset_of;
use std::mem::{align_of, size_of};

#[test]
fn test_segment_header_layout() {
    let size = size_of::<SegmentHeader>();
    let align = align_of::<SegmentHeader>();
    let off_instances = offset_of!(SegmentHeader, instance_count);
    let off_next_id = offset_of!(SegmentHeader, next_message_id);

    println!(
        "SegmentHeader => size: {size}, align: {align}, offsets: [instance_count:{off_instances}, next_message_id:{off_next_id}]"
    );

    assert_eq!(size, HEADER_SIZE);
    assert_eq!(align, align_of::<i16>());
    assert_eq!(off_instances, 0);
    assert_eq!(off_next_id, 2);
}

#[test]
fn test_segment_geometry() {
    assert_eq!(SLOT_COUNT, 32);
    assert_eq!(SLOT_SIZE, 512);
    assert_eq!(SEGMENT_SIZE, 4 + 32 * 512);
    for i in 0..SLOT_COUNT {
        let range = slot_range(i);
        assert_eq!(range.len(), SLOT_SIZE);
        assert_eq!(range.start, HEADER_SIZE + i * SLOT_SIZE);
    }
}

#[test]
fn test_slot_written_by_foreign_runtime_decodes() {
    // Built by hand the way a non-Rust writer would.
    let mut slot = vec![0u8; SLOT_SIZE];
    slot[0..8].copy_from_slice(&1_700_000_000_000_000_000i64.to_le_bytes());
    slot[8..12].copy_from_slice(&4i32.to_le_bytes());
    slot[12..16].copy_from_slice(b"host");
    slot[16..28].copy_from_slice(b"hello world\n");
    slot[28] = 0xAA; // trailing garbage after the terminator

    let rec = decode_slot(&slot).unwrap();
    assert_eq!(rec.timestamp, 1_700_000_000_000_000_000);
    assert_eq!(rec.process, "host");
    assert_eq!(rec.text, "hello world");

    let mut ours = vec![0u8; SLOT_SIZE];
    let used = encode_slot(&mut ours, rec.timestamp, &rec.process, &rec.text);
    assert_eq!(&ours[..used], &slot[..28]);
}
