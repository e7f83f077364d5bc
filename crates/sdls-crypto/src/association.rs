//! SDLS security associations (CCSDS 355.0-B-2).
//!
//! A [`SecurityAssociation`] binds an SPI, a cipher suite with its key, and
//! the anti-replay sequence numbers for one link direction. It protects
//! transfer frames in place:
//!
//! ```text
//! frame_start                       data_start               frame_end
//! | primary header | SPI | seq num   | frame data   | tag        |
//! |<-- auth mask ->|<- sec header ->|<- encrypted ->|<- trailer ->|
//! ```
//!
//! Authenticated data is the primary header ANDed with the caller's
//! [`AuthMask`], followed by the complete security header. The frame data is
//! encrypted; GCM authenticates it implicitly.
//!
//! # Receive path ordering
//!
//! 1. SPI check, before any cipher work
//! 2. MAC verification and in-place decryption
//! 3. Anti-replay window check per [`ReplayPolicy`]
//!
//! MAC verification is the only authenticity decision. The window is a
//! freshness policy on top of it, so a frame can be rejected as tampered
//! (`MacVerificationFailure`) or as authentic but stale
//! (`AntiReplaySequenceNumberFailure`).
//!
//! # Thread Safety
//!
//! Both paths take `&mut self`. An association shared between threads must be
//! wrapped in a `Mutex` by its owner so that incrementing the send sequence
//! number and using it as a nonce stay atomic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::auth_mask::AuthMask;
use crate::seq_num::IvSeqNum;
use crate::suite::{CipherSuite, CipherSuiteKind, SuiteError, SPI_LEN};

/// Default anti-replay window, in frames.
pub const DEFAULT_SEQ_NUM_WINDOW: u64 = 1024;

/// Outcome of [`SecurityAssociation::process_security`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationStatus {
    /// Verified and decrypted.
    NoFailure,
    /// The frame carries another association's SPI.
    InvalidSpi,
    /// The authentication tag did not verify.
    MacVerificationFailure,
    /// Authentic, but the sequence number is outside the anti-replay window.
    AntiReplaySequenceNumberFailure,
    /// The offsets leave no room for the security header and trailer.
    MalformedFrame,
}

impl VerificationStatus {
    pub fn is_ok(self) -> bool {
        self == Self::NoFailure
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoFailure => "no failure",
            Self::InvalidSpi => "invalid SPI",
            Self::MacVerificationFailure => "MAC verification failure",
            Self::AntiReplaySequenceNumberFailure => "anti-replay sequence number failure",
            Self::MalformedFrame => "malformed frame",
        };
        f.write_str(s)
    }
}

/// What to do with an authentic frame whose sequence number is outside the
/// window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplayPolicy {
    /// Reject with `AntiReplaySequenceNumberFailure`.
    #[default]
    Strict,
    /// Accept, but log a warning.
    LogOnly,
    /// No window check.
    Disabled,
}

/// Send path errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecurityError {
    /// Every sequence number has been used with this key.
    #[error("sequence number space exhausted for SPI {0}; rekey required")]
    SequenceNumberExhausted(u16),

    /// The send sequence number may only move forward under one key.
    #[error("send sequence number for SPI {spi} cannot move from {current} to {requested}")]
    SequenceNumberRollback {
        spi: u16,
        current: IvSeqNum,
        requested: IvSeqNum,
    },

    #[error("cipher error: {0}")]
    Suite(#[from] SuiteError),
}

/// Location of one transfer frame inside a caller's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOffsets {
    /// First byte of the primary header.
    pub frame_start: usize,
    /// First byte after the security header.
    pub data_start: usize,
    /// First byte after the security trailer.
    pub frame_end: usize,
}

impl FrameOffsets {
    pub fn new(frame_start: usize, data_start: usize, frame_end: usize) -> Self {
        Self {
            frame_start,
            data_start,
            frame_end,
        }
    }

    /// Split into regions for the given header/trailer sizes, or None if
    /// they do not fit inside `buf_len`.
    fn regions(
        &self,
        header_size: usize,
        trailer_size: usize,
        buf_len: usize,
    ) -> Option<Regions> {
        let sec_header_start = self.data_start.checked_sub(header_size)?;
        let data_end = self.frame_end.checked_sub(trailer_size)?;

        if self.frame_start > sec_header_start
            || self.data_start > data_end
            || self.frame_end > buf_len
        {
            return None;
        }

        Some(Regions {
            primary_header: self.frame_start..sec_header_start,
            sec_header: sec_header_start..self.data_start,
            data: self.data_start..data_end,
            trailer: data_end..self.frame_end,
        })
    }
}

struct Regions {
    primary_header: Range<usize>,
    sec_header: Range<usize>,
    data: Range<usize>,
    trailer: Range<usize>,
}

/// One direction of an SDLS-protected link.
pub struct SecurityAssociation {
    spi: u16,
    suite: Box<dyn CipherSuite>,
    /// Last sequence number sent
    send_seq: IvSeqNum,
    /// Last sequence number accepted
    recv_seq: IvSeqNum,
    seq_num_window: u64,
    replay_policy: ReplayPolicy,
    /// Skip the window check for the next received frame
    skip_next_seq_check: bool,
}

impl SecurityAssociation {
    /// Create an association with zeroed sequence numbers.
    ///
    /// Without a known starting point for the peer's counter, the window
    /// check is skipped for the first received frame.
    pub fn new(suite: Box<dyn CipherSuite>, spi: u16, seq_num_window: u64) -> Self {
        let iv_len = suite.iv_len();
        Self {
            spi,
            suite,
            send_seq: IvSeqNum::new(iv_len),
            recv_seq: IvSeqNum::new(iv_len),
            seq_num_window,
            replay_policy: ReplayPolicy::default(),
            skip_next_seq_check: true,
        }
    }

    /// Build the suite from raw key bytes and create the association.
    pub fn with_key(
        kind: CipherSuiteKind,
        key: &[u8],
        spi: u16,
        seq_num_window: u64,
    ) -> sdls_common::Result<Self> {
        Ok(Self::new(kind.build(key)?, spi, seq_num_window))
    }

    /// Start both sequence numbers from a known value. The window check then
    /// applies from the first received frame.
    ///
    /// The send sequence number only moves forward: if frames were already
    /// sent past `seq_num`, it is left where it is.
    pub fn with_initial_seq_num(mut self, seq_num: &[u8]) -> Self {
        let seq = IvSeqNum::from_bytes(seq_num, self.suite.iv_len());
        if seq > self.send_seq {
            self.send_seq = seq.clone();
        }
        self.recv_seq = seq;
        self.skip_next_seq_check = false;
        self
    }

    pub fn with_replay_policy(mut self, policy: ReplayPolicy) -> Self {
        self.replay_policy = policy;
        self
    }

    pub fn spi(&self) -> u16 {
        self.spi
    }

    pub fn suite(&self) -> &dyn CipherSuite {
        self.suite.as_ref()
    }

    pub fn header_size(&self) -> usize {
        self.suite.header_size()
    }

    pub fn trailer_size(&self) -> usize {
        self.suite.trailer_size()
    }

    pub fn overhead_bytes(&self) -> usize {
        self.suite.overhead_bytes()
    }

    pub fn seq_num_window(&self) -> u64 {
        self.seq_num_window
    }

    pub fn replay_policy(&self) -> ReplayPolicy {
        self.replay_policy
    }

    /// Sequence number of the last frame sent.
    pub fn send_seq_num(&self) -> &IvSeqNum {
        &self.send_seq
    }

    /// Sequence number of the last frame accepted.
    pub fn recv_seq_num(&self) -> &IvSeqNum {
        &self.recv_seq
    }

    /// Reset the receive sequence number. `seq_num` is big-endian and
    /// normalized to the suite's sequence number length.
    pub fn set_recv_seq_num(&mut self, seq_num: &[u8]) {
        self.recv_seq = IvSeqNum::from_bytes(seq_num, self.suite.iv_len());
    }

    /// Move the send sequence number forward to `seq_num`; the next frame
    /// sent carries `seq_num + 1`.
    ///
    /// # Errors
    /// `SequenceNumberRollback` unless `seq_num` is above the current send
    /// sequence number. Every value up to the current one has been used as a
    /// nonce under this key.
    pub fn advance_send_seq_num(&mut self, seq_num: &[u8]) -> Result<(), SecurityError> {
        let seq = IvSeqNum::from_bytes(seq_num, self.suite.iv_len());
        if seq <= self.send_seq {
            warn!(
                spi = self.spi,
                current = %self.send_seq,
                requested = %seq,
                "refusing to move send sequence number backwards"
            );
            return Err(SecurityError::SequenceNumberRollback {
                spi: self.spi,
                current: self.send_seq.clone(),
                requested: seq,
            });
        }
        self.send_seq = seq;
        Ok(())
    }

    /// Do not check the sequence number of the next received frame.
    pub fn skip_verifying_next_seq_num(&mut self) {
        self.skip_next_seq_check = true;
    }

    /// Authenticate and encrypt a frame in place.
    ///
    /// `buf[offsets.frame_start..offsets.frame_end]` must hold the primary
    /// header, room for the security header, the plaintext frame data and
    /// room for the trailer. The security header and tag are written; the
    /// frame data is replaced by ciphertext.
    ///
    /// # Errors
    /// `SequenceNumberExhausted` once the send counter would wrap to a
    /// previously used value. The association must be rekeyed.
    ///
    /// # Panics
    /// Panics if the offsets do not fit the configured overhead inside `buf`,
    /// or if `auth_mask` does not match the primary header length.
    pub fn apply_security(
        &mut self,
        buf: &mut [u8],
        offsets: FrameOffsets,
        auth_mask: &AuthMask,
    ) -> Result<(), SecurityError> {
        let regions = offsets.regions(self.header_size(), self.trailer_size(), buf.len());
        let Some(regions) = regions else {
            panic!(
                "frame {:?} too small for {} bytes of SDLS overhead in a {}-byte buffer",
                offsets,
                self.overhead_bytes(),
                buf.len()
            );
        };

        // Zero is never sent, so wrapping back to it means the space is spent.
        let mut next = self.send_seq.clone();
        next.increment();
        if next.is_zero() {
            return Err(SecurityError::SequenceNumberExhausted(self.spi));
        }
        self.send_seq = next;

        let sec_header = &mut buf[regions.sec_header.clone()];
        sec_header[..SPI_LEN].copy_from_slice(&self.spi.to_be_bytes());
        self.send_seq.copy_into(&mut sec_header[SPI_LEN..]);

        let aad = build_aad(buf, &regions, auth_mask);
        let nonce = self
            .suite
            .nonce(self.spi, &buf[regions.sec_header.start + SPI_LEN..regions.sec_header.end]);

        let (data, trailer) =
            buf[regions.data.start..regions.trailer.end].split_at_mut(regions.data.len());
        self.suite.seal_in_place(&nonce, &aad, data, trailer)?;

        trace!(spi = self.spi, seq = %self.send_seq, "applied security");
        Ok(())
    }

    /// Verify and decrypt a frame in place.
    ///
    /// Never panics on frame contents; offsets that leave no room for the
    /// security header and trailer yield `MalformedFrame`. On `NoFailure` the
    /// frame data holds plaintext and the security header and trailer are
    /// zeroed. On `AntiReplaySequenceNumberFailure` the security header, frame
    /// data and trailer are all zeroed. On any other status the buffer is
    /// untouched.
    ///
    /// # Panics
    /// Panics if `auth_mask` does not match the length of the primary header
    /// delimited by `offsets`.
    pub fn process_security(
        &mut self,
        buf: &mut [u8],
        offsets: FrameOffsets,
        auth_mask: &AuthMask,
    ) -> VerificationStatus {
        let regions = offsets.regions(self.header_size(), self.trailer_size(), buf.len());
        let Some(regions) = regions else {
            warn!(spi = self.spi, ?offsets, "frame too small for SDLS overhead");
            return VerificationStatus::MalformedFrame;
        };
        assert_eq!(
            auth_mask.len(),
            regions.primary_header.len(),
            "auth mask length must equal primary header length"
        );

        let sec_header = &buf[regions.sec_header.clone()];
        let received_spi = u16::from_be_bytes([sec_header[0], sec_header[1]]);
        if received_spi != self.spi {
            warn!("Expected SPI {}, received SPI {}", self.spi, received_spi);
            return VerificationStatus::InvalidSpi;
        }

        let received_iv = sec_header[SPI_LEN..].to_vec();
        let aad = build_aad(buf, &regions, auth_mask);
        let nonce = self.suite.nonce(received_spi, &received_iv);

        let (data, trailer) =
            buf[regions.data.start..regions.trailer.end].split_at_mut(regions.data.len());
        if self.suite.open_in_place(&nonce, &aad, data, trailer).is_err() {
            debug!(spi = self.spi, "MAC verification failed");
            return VerificationStatus::MacVerificationFailure;
        }

        let received_seq = IvSeqNum::from_bytes(&received_iv, self.suite.iv_len());
        if self.skip_next_seq_check {
            self.skip_next_seq_check = false;
        } else if self.replay_policy != ReplayPolicy::Disabled
            && !self
                .recv_seq
                .verify_in_window(&received_seq, self.seq_num_window)
        {
            warn!(
                spi = self.spi,
                last = %self.recv_seq,
                received = %received_seq,
                window = self.seq_num_window,
                "sequence number outside anti-replay window"
            );
            if self.replay_policy == ReplayPolicy::Strict {
                buf[regions.sec_header.start..regions.trailer.end].fill(0);
                return VerificationStatus::AntiReplaySequenceNumberFailure;
            }
        }
        self.recv_seq = received_seq;

        buf[regions.sec_header].fill(0);
        buf[regions.trailer].fill(0);

        debug!("Processed security SPI {}, seq num {}", self.spi, self.recv_seq);
        VerificationStatus::NoFailure
    }
}

/// Masked primary header followed by the full security header.
fn build_aad(buf: &[u8], regions: &Regions, auth_mask: &AuthMask) -> Vec<u8> {
    let mut aad = Vec::with_capacity(auth_mask.len() + regions.sec_header.len());
    auth_mask.apply_into(&buf[regions.primary_header.clone()], &mut aad);
    aad.extend_from_slice(&buf[regions.sec_header.clone()]);
    aad
}

impl fmt::Debug for SecurityAssociation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityAssociation")
            .field("spi", &self.spi)
            .field("suite", &self.suite.name())
            .field("send_seq", &self.send_seq)
            .field("recv_seq", &self.recv_seq)
            .field("seq_num_window", &self.seq_num_window)
            .field("replay_policy", &self.replay_policy)
            .finish_non_exhaustive()
    }
}
