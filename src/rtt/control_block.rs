//! RTT control-block layout parsing (spec §3 "RTT control block").

/// Bytes making up the fixed-size ID field.
pub const ID_LEN: usize = 16;
/// Bytes making up `num_up` + `num_down`.
pub const COUNTS_LEN: usize = 8;
/// One channel descriptor: `{name_ptr, buf_ptr, size, wr_off, rd_off, flags}`.
pub const DESCRIPTOR_LEN: usize = 24;
/// Channel counts above this are treated as implausible metadata (spec
/// §4.7 "refuse if either exceeds 16").
pub const MAX_CHANNELS: u32 = 16;

/// `true` if `header` (the first [`ID_LEN`] bytes at `cb_addr`) matches
/// `search` (the configured, ≤16 ASCII char, search string), zero-padded.
pub fn header_matches(header: &[u8], search: &str) -> bool {
    if header.len() < ID_LEN || search.len() > ID_LEN {
        return false;
    }
    let mut expected = [0u8; ID_LEN];
    expected[..search.len()].copy_from_slice(search.as_bytes());
    header[..ID_LEN] == expected
}

/// Parse the 8 bytes following the ID field into `(num_up, num_down)`.
pub fn parse_counts(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < COUNTS_LEN {
        return None;
    }
    let num_up = u32::from_le_bytes(bytes[0..4].try_into().ok()?);
    let num_down = u32::from_le_bytes(bytes[4..8].try_into().ok()?);
    Some((num_up, num_down))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDescriptor {
    pub buf_addr: u32,
    pub size: u32,
    pub wr_off: u32,
    pub rd_off: u32,
    pub flags: u32,
}

/// Parse one 24-byte descriptor (`name_ptr` is not surfaced; nothing in
/// this crate needs the channel's human-readable name from target RAM).
pub fn parse_descriptor(bytes: &[u8]) -> Option<ChannelDescriptor> {
    if bytes.len() < DESCRIPTOR_LEN {
        return None;
    }
    Some(ChannelDescriptor {
        buf_addr: u32::from_le_bytes(bytes[4..8].try_into().ok()?),
        size: u32::from_le_bytes(bytes[8..12].try_into().ok()?),
        wr_off: u32::from_le_bytes(bytes[12..16].try_into().ok()?),
        rd_off: u32::from_le_bytes(bytes[16..20].try_into().ok()?),
        flags: u32::from_le_bytes(bytes[20..24].try_into().ok()?),
    })
}

/// Byte offset of channel `index`'s descriptor within the control block,
/// relative to `cb_addr` (spec §3: up-buffers come first).
pub fn descriptor_offset(index: u32) -> u64 {
    (ID_LEN + COUNTS_LEN) as u64 + (index as u64) * DESCRIPTOR_LEN as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_match_zero_padded() {
        let mut header = [0u8; 16];
        header[..10].copy_from_slice(b"SEGGER RTT");
        assert!(header_matches(&header, "SEGGER RTT"));
        assert!(!header_matches(&header, "SEGGER RTX"));
    }

    #[test]
    fn counts_parse_le() {
        let bytes = [0x02, 0, 0, 0, 0x03, 0, 0, 0];
        assert_eq!(parse_counts(&bytes), Some((2, 3)));
    }

    #[test]
    fn descriptor_offsets_are_24_byte_strided() {
        assert_eq!(descriptor_offset(0), 24);
        assert_eq!(descriptor_offset(1), 48);
    }
}
