//! Selective authentication of frame primary headers.
//!
//! A mask has one bit per primary-header bit. Set bits are copied into the
//! additional authenticated data (AAD); cleared bits are zeroed, so fields a
//! relay may rewrite in transit do not break verification.
//!
//! The engine has no knowledge of which fields are mutable. Callers choose
//! the mask; the standard masks below cover the common CCSDS frame types.

/// TM transfer frame primary header length (CCSDS 132.0-B).
pub const TM_PRIMARY_HEADER_LEN: usize = 6;
/// TC transfer frame primary header length (CCSDS 232.0-B).
pub const TC_PRIMARY_HEADER_LEN: usize = 5;
/// AOS transfer frame primary header length without FHEC (CCSDS 732.0-B).
pub const AOS_PRIMARY_HEADER_LEN: usize = 6;
/// USLP primary header length without the VC frame count (CCSDS 732.1-B).
pub const USLP_MIN_PRIMARY_HEADER_LEN: usize = 7;
/// USLP primary header length with the longest (7-byte) VC frame count.
pub const USLP_MAX_PRIMARY_HEADER_LEN: usize = 14;

/// Bitmask over a frame's primary header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthMask {
    bits: Vec<u8>,
}

impl AuthMask {
    /// Create a mask from raw bytes. Its length must match the primary header
    /// it will be applied to.
    pub fn new(bits: impl Into<Vec<u8>>) -> Self {
        Self { bits: bits.into() }
    }

    /// Authenticate every header bit.
    pub fn full(len: usize) -> Self {
        Self::new(vec![0xff; len])
    }

    /// Authenticate no header bits (the security header is still covered).
    pub fn none(len: usize) -> Self {
        Self::new(vec![0x00; len])
    }

    /// TM primary header: version, spacecraft ID, virtual channel ID, OCF
    /// flag, virtual channel frame count and data field status.
    ///
    /// The master channel frame count (byte 2) is excluded; it is
    /// renumbered whenever virtual channels are multiplexed downstream.
    pub fn tm() -> Self {
        Self::new([0xff, 0xff, 0x00, 0xff, 0xff, 0xff])
    }

    /// TC primary header, fully authenticated.
    pub fn tc() -> Self {
        Self::full(TC_PRIMARY_HEADER_LEN)
    }

    /// AOS primary header (no FHEC): only the virtual channel ID.
    ///
    /// Spacecraft ID, VC frame count and signaling field are left out so
    /// ground equipment may rewrite them.
    pub fn aos() -> Self {
        let mut bits = vec![0x00; AOS_PRIMARY_HEADER_LEN];
        bits[1] = 0b0011_1111;
        Self::new(bits)
    }

    /// USLP primary header of `header_len` bytes: virtual channel ID and MAP
    /// ID.
    ///
    /// The header length depends on the VC frame count length carried in
    /// byte 6, so it is supplied by the caller.
    ///
    /// # Panics
    /// Panics if `header_len` is not a valid USLP primary header length.
    pub fn uslp(header_len: usize) -> Self {
        assert!(
            (USLP_MIN_PRIMARY_HEADER_LEN..=USLP_MAX_PRIMARY_HEADER_LEN).contains(&header_len),
            "invalid USLP primary header length {}",
            header_len
        );
        let mut bits = vec![0x00; header_len];
        bits[2] = 0b0000_0111;
        bits[3] = 0b1111_1110;
        Self::new(bits)
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// AND `header` with the mask, returning the header part of the AAD.
    ///
    /// # Panics
    /// Panics if `header` and the mask differ in length.
    pub fn apply(&self, header: &[u8]) -> Vec<u8> {
        let mut aad = Vec::with_capacity(self.len());
        self.apply_into(header, &mut aad);
        aad
    }

    /// Like [`AuthMask::apply`], appending to an existing AAD buffer.
    ///
    /// # Panics
    /// Panics if `header` and the mask differ in length.
    pub fn apply_into(&self, header: &[u8], aad: &mut Vec<u8>) {
        assert_eq!(
            header.len(),
            self.bits.len(),
            "auth mask length must equal primary header length"
        );
        aad.extend(header.iter().zip(&self.bits).map(|(h, m)| h & m));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_masks_bits() {
        let mask = AuthMask::new([0xf0, 0x0f, 0x00]);
        assert_eq!(mask.apply(&[0xab, 0xcd, 0xef]), vec![0xa0, 0x0d, 0x00]);
    }

    #[test]
    fn test_apply_into_appends() {
        let mask = AuthMask::full(2);
        let mut aad = vec![0x99];
        mask.apply_into(&[0x12, 0x34], &mut aad);
        assert_eq!(aad, vec![0x99, 0x12, 0x34]);
    }

    #[test]
    fn test_none_zeroes_everything() {
        let mask = AuthMask::none(4);
        assert_eq!(mask.apply(&[0xff; 4]), vec![0; 4]);
    }

    #[test]
    fn test_tm_excludes_master_channel_count() {
        let mask = AuthMask::tm();
        assert_eq!(mask.len(), TM_PRIMARY_HEADER_LEN);

        let a = mask.apply(&[0x40, 0x12, 0x01, 0x07, 0x18, 0x00]);
        let b = mask.apply(&[0x40, 0x12, 0xee, 0x07, 0x18, 0x00]);
        assert_eq!(a, b);

        // Virtual channel ID bits are covered
        let c = mask.apply(&[0x40, 0x14, 0x01, 0x07, 0x18, 0x00]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_standard_lengths() {
        assert_eq!(AuthMask::tc().len(), TC_PRIMARY_HEADER_LEN);
        assert_eq!(AuthMask::aos().len(), AOS_PRIMARY_HEADER_LEN);
        assert_eq!(AuthMask::uslp(7).len(), 7);
        assert_eq!(AuthMask::uslp(14).len(), 14);
    }

    #[test]
    fn test_aos_covers_only_vcid() {
        let mask = AuthMask::aos();
        // Version 01, SCID 0x5a, VCID 0x15
        let header = [0x56, 0x95, 0x00, 0x10, 0x2c, 0x80];
        assert_eq!(mask.apply(&header), vec![0x00, 0x15, 0x00, 0x00, 0x00, 0x00]);

        // Frame count changes do not affect the AAD
        let recounted = [0x56, 0x95, 0x00, 0x10, 0x2d, 0x80];
        assert_eq!(mask.apply(&header), mask.apply(&recounted));
    }

    #[test]
    fn test_uslp_covers_vcid_and_map_id() {
        let mask = AuthMask::uslp(7);
        // TFVN 12, SCID 0xab, VCID 5, MAP ID 3
        let header = [0xc0, 0x0a, 0xb0, 0xa6, 0x00, 0x3f, 0x0c];
        assert_eq!(mask.apply(&header), vec![0x00, 0x00, 0x00, 0xa6, 0x00, 0x00, 0x00]);

        // The top VCID bits live in byte 2
        let vcid_high = [0xc0, 0x0a, 0xb4, 0xa6, 0x00, 0x3f, 0x0c];
        assert_ne!(mask.apply(&header), mask.apply(&vcid_high));
    }

    #[test]
    #[should_panic(expected = "invalid USLP")]
    fn test_uslp_rejects_short_header() {
        AuthMask::uslp(6);
    }

    #[test]
    #[should_panic(expected = "auth mask length")]
    fn test_length_mismatch_panics() {
        AuthMask::tm().apply(&[0; 5]);
    }
}
