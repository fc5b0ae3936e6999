// Binary layout of the shared diagnostic segment
//
// ```text
// offset 0      i16 LE  instance count
// offset 2      i16 LE  next message id (wraps 32767 -> -32768)
// offset 4+i*512        slot i, i in [0, 32)
//     +0   i64 LE  timestamp (nanoseconds since the Unix epoch)
//     +8   i32 LE  process name length in bytes (N)
//     +12  N bytes UTF-8 process name
//     +12+N        UTF-8 text terminated by '\n'; bytes after it are undefined
// ```
//
// Everything here is pure byte manipulation so it can be tested without a
// mapping.

/// Number of message slots in the ring.
pub const SLOT_COUNT: usize = 32;

/// Size of one slot in bytes.
pub const SLOT_SIZE: usize = 512;

/// Size of the segment header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Exact size of the mapped segment.
pub const SEGMENT_SIZE: usize = HEADER_SIZE + SLOT_COUNT * SLOT_SIZE;

/// Terminator written after every message text.
pub const LINE_TERMINATOR: &str = "\n";

const TIMESTAMP_SIZE: usize = 8;
const NAME_LEN_SIZE: usize = 4;

/// Bytes of a slot taken before the process name.
pub const SLOT_PREFIX_SIZE: usize = TIMESTAMP_SIZE + NAME_LEN_SIZE;

/// Longest process name that still leaves room for an empty line.
pub const MAX_PROCESS_NAME_BYTES: usize = SLOT_SIZE - SLOT_PREFIX_SIZE - LINE_TERMINATOR.len();

/// Segment header mirror.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentHeader {
    pub instance_count: i16,
    pub next_message_id: i16,
}

impl SegmentHeader {
    pub fn read(segment: &[u8]) -> Self {
        Self {
            instance_count: i16::from_le_bytes([segment[0], segment[1]]),
            next_message_id: i16::from_le_bytes([segment[2], segment[3]]),
        }
    }

    pub fn write(&self, segment: &mut [u8]) {
        segment[0..2].copy_from_slice(&self.instance_count.to_le_bytes());
        segment[2..4].copy_from_slice(&self.next_message_id.to_le_bytes());
    }
}

/// Slot index for a message id. Non-negative for every input.
#[inline]
pub fn slot_index(message_id: i64) -> usize {
    message_id.rem_euclid(SLOT_COUNT as i64) as usize
}

/// Byte range of slot `index` inside the segment.
#[inline]
pub fn slot_range(index: usize) -> std::ops::Range<usize> {
    let start = HEADER_SIZE + index * SLOT_SIZE;
    start..start + SLOT_SIZE
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
pub fn clip_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Trim `text` so that name + prefix + text + terminator fits one slot.
pub fn truncate_text(process_name_bytes: usize, text: &str) -> &str {
    let budget = SLOT_SIZE
        .saturating_sub(SLOT_PREFIX_SIZE)
        .saturating_sub(process_name_bytes)
        .saturating_sub(LINE_TERMINATOR.len());
    clip_utf8(text, budget)
}

/// Bytes a record occupies in its slot.
pub fn encoded_len(process: &str, text: &str) -> usize {
    SLOT_PREFIX_SIZE + process.len() + text.len() + LINE_TERMINATOR.len()
}

/// A decoded slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRecord {
    pub timestamp: i64,
    pub process: String,
    pub text: String,
}

/// Write one record into a slot and return the number of bytes used.
///
/// Oversized names and texts are clipped rather than rejected.
pub fn encode_slot(slot: &mut [u8], timestamp: i64, process: &str, text: &str) -> usize {
    debug_assert_eq!(slot.len(), SLOT_SIZE);
    let process = clip_utf8(process, MAX_PROCESS_NAME_BYTES);
    let text = truncate_text(process.len(), text);

    slot[0..8].copy_from_slice(&timestamp.to_le_bytes());
    slot[8..12].copy_from_slice(&(process.len() as i32).to_le_bytes());

    let mut at = SLOT_PREFIX_SIZE;
    for part in [process.as_bytes(), text.as_bytes(), LINE_TERMINATOR.as_bytes()] {
        slot[at..at + part.len()].copy_from_slice(part);
        at += part.len();
    }
    at
}

/// Read one record back. Returns `None` when the slot holds no valid record
/// (never written, or torn by a foreign writer).
pub fn decode_slot(slot: &[u8]) -> Option<SlotRecord> {
    if slot.len() < SLOT_PREFIX_SIZE {
        return None;
    }
    let timestamp = i64::from_le_bytes(slot[0..8].try_into().ok()?);
    let name_len = i32::from_le_bytes(slot[8..12].try_into().ok()?);
    if name_len < 0 || name_len as usize > slot.len() - SLOT_PREFIX_SIZE {
        return None;
    }
    let name_end = SLOT_PREFIX_SIZE + name_len as usize;
    let process = String::from_utf8_lossy(&slot[SLOT_PREFIX_SIZE..name_end]).into_owned();

    // The text runs to the first line break; an untouched slot has none.
    let rest = &slot[name_end..];
    let end = rest.iter().position(|&b| b == b'\n')?;
    let line = rest[..end].strip_suffix(b"\r").unwrap_or(&rest[..end]);
    let text = String::from_utf8_lossy(line).into_owned();

    Some(SlotRecord {
        timestamp,
        process,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_size_is_exact() {
        assert_eq!(SEGMENT_SIZE, 16388);
        assert_eq!(slot_range(0), 4..516);
        assert_eq!(slot_range(31).end, SEGMENT_SIZE);
    }

    #[test]
    fn header_is_little_endian() {
        let mut seg = [0u8; HEADER_SIZE];
        SegmentHeader {
            instance_count: 3,
            next_message_id: -32768,
        }
        .write(&mut seg);
        assert_eq!(seg, [3, 0, 0x00, 0x80]);
        let back = SegmentHeader::read(&seg);
        assert_eq!(back.instance_count, 3);
        assert_eq!(back.next_message_id, i16::MIN);
    }

    #[test]
    fn slot_index_is_non_negative_across_wrap() {
        assert_eq!(slot_index(0), 0);
        assert_eq!(slot_index(33), 1);
        assert_eq!(slot_index(i16::MAX as i64), 31);
        assert_eq!(slot_index(i16::MIN as i64), 0);
        assert_eq!(slot_index(-1), 31);
    }

    #[test]
    fn slot_bytes_match_layout() {
        let mut slot = [0u8; SLOT_SIZE];
        let used = encode_slot(&mut slot, 7, "app", "hi");
        assert_eq!(used, 8 + 4 + 3 + 2 + 1);
        assert_eq!(&slot[0..8], &7i64.to_le_bytes());
        assert_eq!(&slot[8..12], &3i32.to_le_bytes());
        assert_eq!(&slot[12..18], b"apphi\n");
    }

    #[test]
    fn oversized_text_is_truncated_to_slot() {
        let mut slot = [0u8; SLOT_SIZE];
        let text = "x".repeat(2000);
        let used = encode_slot(&mut slot, 1, "writer", &text);
        assert_eq!(used, SLOT_SIZE);
        let rec = decode_slot(&slot).unwrap();
        assert_eq!(rec.text.len(), SLOT_SIZE - 12 - 6 - 1);
        assert_eq!(encoded_len(&rec.process, &rec.text), SLOT_SIZE);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 3-byte chars; budget 512-12-1 = 499 is not a multiple of 3
        let text = "\u{20ac}".repeat(400);
        let clipped = truncate_text(0, &text);
        assert!(clipped.len() <= 499);
        assert_eq!(clipped.len() % 3, 0);
        assert_eq!(clipped.len(), 498);
    }

    #[test]
    fn untouched_slot_decodes_to_none() {
        let slot = [0u8; SLOT_SIZE];
        assert_eq!(decode_slot(&slot), None);
    }

    #[test]
    fn bogus_name_length_decodes_to_none() {
        let mut slot = [0u8; SLOT_SIZE];
        slot[8..12].copy_from_slice(&(-5i32).to_le_bytes());
        assert_eq!(decode_slot(&slot), None);
        slot[8..12].copy_from_slice(&10_000i32.to_le_bytes());
        assert_eq!(decode_slot(&slot), None);
    }

    #[test]
    fn text_stops_at_first_line_break() {
        let mut slot = [0u8; SLOT_SIZE];
        encode_slot(&mut slot, 1, "p", "first\r\nsecond");
        assert_eq!(decode_slot(&slot).unwrap().text, "first");
    }

    #[test]
    fn overlong_process_name_is_clipped() {
        let mut slot = [0u8; SLOT_SIZE];
        let name = "n".repeat(600);
        let used = encode_slot(&mut slot, 1, &name, "text");
        assert_eq!(used, SLOT_SIZE);
        let rec = decode_slot(&slot).unwrap();
        assert_eq!(rec.process.len(), MAX_PROCESS_NAME_BYTES);
        assert_eq!(rec.text, "");
    }
}
