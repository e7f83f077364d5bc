//! Frame builders shared by the integration tests.

#![allow(dead_code)]

use sdls_crypto::auth_mask::TM_PRIMARY_HEADER_LEN;
use sdls_crypto::{CipherSuiteKind, FrameOffsets, SecurityAssociation};

pub const KEY: [u8; 32] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
    0x0f, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d,
    0x1e, 0x1f,
];
pub const SPI: u16 = 0x0102;

/// TM primary header: version 0, SCID 0xAB, VCID 1, OCF flag set,
/// MC count 0x21, VC count 0x07, first header pointer 0.
pub const TM_HEADER: [u8; TM_PRIMARY_HEADER_LEN] = [0x0a, 0xb3, 0x21, 0x07, 0x18, 0x00];

pub fn association(kind: CipherSuiteKind) -> SecurityAssociation {
    SecurityAssociation::with_key(kind, &KEY, SPI, 16).unwrap()
}

/// A TM frame with `payload` in the data field and empty security header
/// and trailer, prefixed by `lead` unrelated bytes.
pub fn tm_frame(sa: &SecurityAssociation, lead: usize, payload: &[u8]) -> (Vec<u8>, FrameOffsets) {
    let mut buf = vec![0xee; lead];
    buf.extend_from_slice(&TM_HEADER);
    buf.resize(buf.len() + sa.header_size(), 0);
    let data_start = buf.len();
    buf.extend_from_slice(payload);
    buf.resize(buf.len() + sa.trailer_size(), 0);
    let frame_end = buf.len();
    // Frame error control field after the trailer, outside the frame region
    buf.extend_from_slice(&[0xc3, 0x3c]);
    (buf, FrameOffsets::new(lead, data_start, frame_end))
}

pub fn payload_of<'a>(buf: &'a [u8], offsets: &FrameOffsets, len: usize) -> &'a [u8] {
    &buf[offsets.data_start..offsets.data_start + len]
}
