//! Anti-replay sequence numbers that double as GCM nonce material.
//!
//! An [`IvSeqNum`] is a fixed-length, big-endian unsigned integer. All
//! arithmetic is modulo `2^(8 * len)`: incrementing the maximum value wraps to
//! zero, and window checks measure the forward distance with modular
//! subtraction so a counter near the top of its range accepts candidates that
//! have already wrapped past zero.
//!
//! # Thread Safety
//!
//! Mutated in place by `increment`. Owners that share one across threads must
//! serialize access themselves.

use std::fmt;

/// Fixed-length big-endian modular counter.
///
/// Ordering is numeric (not modular) between sequence numbers of equal length.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IvSeqNum {
    /// Most significant byte first
    bytes: Vec<u8>,
}

impl IvSeqNum {
    /// Create a zero-valued sequence number of `len` bytes.
    ///
    /// # Panics
    /// Panics if `len` is 0.
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "sequence number length must be at least 1 byte");
        Self {
            bytes: vec![0; len],
        }
    }

    /// Create a sequence number of `len` bytes from raw big-endian bytes.
    ///
    /// Longer input keeps only its least significant `len` bytes; shorter
    /// input is zero-padded on the left.
    ///
    /// # Panics
    /// Panics if `len` is 0.
    pub fn from_bytes(raw: &[u8], len: usize) -> Self {
        let mut seq = Self::new(len);
        seq.write_to(raw);
        seq
    }

    /// Declared length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a sequence number has at least one byte.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Big-endian value at the declared length.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True if every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    /// Add one, wrapping to all-zero bytes on overflow.
    pub fn increment(&mut self) {
        for byte in self.bytes.iter_mut().rev() {
            let (next, carry) = byte.overflowing_add(1);
            *byte = next;
            if !carry {
                return;
            }
        }
    }

    /// Serialize to `out_len` bytes, zero-padding on the left or keeping
    /// only the least significant bytes.
    pub fn to_bytes(&self, out_len: usize) -> Vec<u8> {
        let mut out = vec![0; out_len];
        self.copy_into(&mut out);
        out
    }

    /// Write the value right-aligned into `out`, padding or truncating on
    /// the left to fit.
    pub fn copy_into(&self, out: &mut [u8]) {
        fit_right_aligned(&self.bytes, out);
    }

    /// Forward distance `(candidate - self) mod 2^(8 * len)`, as big-endian
    /// bytes of this sequence number's length.
    ///
    /// `candidate` is first normalized to this length.
    pub fn distance_to(&self, candidate: &IvSeqNum) -> Vec<u8> {
        let candidate = candidate.to_bytes(self.len());
        let mut out = vec![0; self.len()];
        let mut borrow = false;

        for i in (0..self.len()).rev() {
            let (d, b1) = candidate[i].overflowing_sub(self.bytes[i]);
            let (d, b2) = d.overflowing_sub(borrow as u8);
            out[i] = d;
            borrow = b1 || b2;
        }
        // The final borrow is the modular wrap; dropping it is the reduction.
        out
    }

    /// Check whether `candidate` is between 1 and `window` steps ahead of
    /// this value, modulo the counter range.
    ///
    /// The immediate successor is always accepted, so a window of 0 behaves
    /// like a window of 1.
    pub fn verify_in_window(&self, candidate: &IvSeqNum, window: u64) -> bool {
        let mut next = self.clone();
        next.increment();
        if next.bytes == candidate.to_bytes(self.len()) {
            return true;
        }

        match to_u64(&self.distance_to(candidate)) {
            Some(distance) => (1..=window.max(1)).contains(&distance),
            None => false,
        }
    }

    /// Overwrite the value from raw bytes, normalized as in `from_bytes`.
    fn write_to(&mut self, raw: &[u8]) {
        fit_right_aligned(raw, &mut self.bytes);
    }
}

/// Copy `src` into `dst` aligned on the least significant (rightmost) byte.
fn fit_right_aligned(src: &[u8], dst: &mut [u8]) {
    if src.len() >= dst.len() {
        dst.copy_from_slice(&src[src.len() - dst.len()..]);
    } else {
        let pad = dst.len() - src.len();
        dst[..pad].fill(0);
        dst[pad..].copy_from_slice(src);
    }
}

/// Big-endian bytes to u64, or None if the value does not fit.
fn to_u64(bytes: &[u8]) -> Option<u64> {
    let split = bytes.len().saturating_sub(8);
    if bytes[..split].iter().any(|&b| b != 0) {
        return None;
    }
    Some(
        bytes[split..]
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
    )
}

impl fmt::Display for IvSeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.bytes))
    }
}

impl fmt::Debug for IvSeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IvSeqNum({})", self)
    }
}
