//! Cipher suites for SDLS authenticated encryption.
//!
//! A [`CipherSuite`] fixes the on-wire security header and trailer sizes, the
//! rule that turns an SPI and a sequence number into a GCM nonce, and the
//! AEAD seal/open operations. Suites are constructed from key material and
//! hold the expanded key schedule for their lifetime.
//!
//! Two suites are provided:
//!
//! | suite                   | IV on wire | nonce                               | tag |
//! |-------------------------|------------|-------------------------------------|-----|
//! | `AES-256-GCM-128`       | 12 bytes   | the 12 IV bytes                     | 16  |
//! | `AES-256-GCM-128-SEQ32` | 4 bytes    | SPI (2) \|\| zeros (6) \|\| IV (4)  | 16  |
//!
//! Nonce uniqueness is the caller's responsibility: sealing is deterministic
//! for identical inputs.

use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Nonce, Tag,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Length of the Security Parameter Index field in the security header.
pub const SPI_LEN: usize = 2;
/// AES-256 key length.
pub const AES_256_KEY_LEN: usize = 32;
/// GCM nonce length.
pub const GCM_NONCE_LEN: usize = 12;
/// Full 128-bit GCM tag length.
pub const GCM_TAG_LEN: usize = 16;
/// Sequence number length carried by the SEQ32 suite.
pub const SEQ32_IV_LEN: usize = 4;

/// Errors from the AEAD primitive.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SuiteError {
    #[error("encryption failed")]
    Encrypt,

    #[error("authentication tag did not verify")]
    Authentication,

    #[error("invalid nonce length: expected {expected}, got {actual}")]
    NonceLength { expected: usize, actual: usize },

    #[error("invalid tag length: expected {expected}, got {actual}")]
    TagLength { expected: usize, actual: usize },
}

/// AEAD primitive used by a security association.
///
/// The key is bound when the suite is built (see [`CipherSuiteKind::build`]).
pub trait CipherSuite: Send + Sync {
    /// Algorithm identifier, e.g. `AES-256-GCM-128`.
    fn name(&self) -> &'static str;

    fn key_len(&self) -> usize;

    /// Length of the sequence number carried in the security header.
    fn iv_len(&self) -> usize;

    fn tag_len(&self) -> usize;

    /// SPI field plus sequence number field.
    fn header_size(&self) -> usize {
        SPI_LEN + self.iv_len()
    }

    /// Authentication tag field.
    fn trailer_size(&self) -> usize {
        self.tag_len()
    }

    fn overhead_bytes(&self) -> usize {
        self.header_size() + self.trailer_size()
    }

    /// Derive the AEAD nonce from the SPI and the on-wire sequence number.
    fn nonce(&self, spi: u16, iv: &[u8]) -> Vec<u8>;

    /// Encrypt `data` in place and write the tag into `tag`.
    fn seal_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        data: &mut [u8],
        tag: &mut [u8],
    ) -> Result<(), SuiteError>;

    /// Verify `tag` and decrypt `data` in place.
    ///
    /// On failure `data` is left untouched. The tag comparison is constant
    /// time.
    fn open_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        data: &mut [u8],
        tag: &[u8],
    ) -> Result<(), SuiteError>;

    /// Encrypt `plaintext`, returning `(ciphertext, tag)`.
    fn seal(
        &self,
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), SuiteError> {
        let mut data = plaintext.to_vec();
        let mut tag = vec![0; self.tag_len()];
        self.seal_in_place(nonce, aad, &mut data, &mut tag)?;
        Ok((data, tag))
    }

    /// Verify and decrypt, returning the plaintext.
    fn open(
        &self,
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, SuiteError> {
        let mut data = ciphertext.to_vec();
        self.open_in_place(nonce, aad, &mut data, tag)?;
        Ok(data)
    }
}

/// Cipher suite selector, as it appears in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CipherSuiteKind {
    #[default]
    #[serde(rename = "AES-256-GCM-128")]
    Aes256Gcm128,
    #[serde(rename = "AES-256-GCM-128-SEQ32")]
    Aes256Gcm128Seq32,
}

impl CipherSuiteKind {
    /// Key length the suite requires.
    pub fn key_len(self) -> usize {
        AES_256_KEY_LEN
    }

    /// Build the suite with `key` bound to it.
    pub fn build(self, key: &[u8]) -> sdls_common::Result<Box<dyn CipherSuite>> {
        let suite: Box<dyn CipherSuite> = match self {
            Self::Aes256Gcm128 => Box::new(Aes256Gcm128::new(key)?),
            Self::Aes256Gcm128Seq32 => Box::new(Aes256Gcm128Seq32::new(key)?),
        };
        Ok(suite)
    }
}

/// AES-256-GCM keyed with a 256-bit key and producing 128-bit tags.
struct GcmCore {
    cipher: Aes256Gcm,
}

impl GcmCore {
    fn new(key: &[u8]) -> sdls_common::Result<Self> {
        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|_| sdls_common::Error::InvalidKeyLength {
                expected: AES_256_KEY_LEN,
                actual: key.len(),
            })?;
        Ok(Self { cipher })
    }

    fn seal_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        data: &mut [u8],
        tag: &mut [u8],
    ) -> Result<(), SuiteError> {
        check_lengths(nonce, tag)?;

        let computed = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(nonce), aad, data)
            .map_err(|_| SuiteError::Encrypt)?;
        tag.copy_from_slice(&computed);
        Ok(())
    }

    fn open_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        data: &mut [u8],
        tag: &[u8],
    ) -> Result<(), SuiteError> {
        check_lengths(nonce, tag)?;

        self.cipher
            .decrypt_in_place_detached(Nonce::from_slice(nonce), aad, data, Tag::from_slice(tag))
            .map_err(|_| SuiteError::Authentication)
    }
}

fn check_lengths(nonce: &[u8], tag: &[u8]) -> Result<(), SuiteError> {
    if nonce.len() != GCM_NONCE_LEN {
        return Err(SuiteError::NonceLength {
            expected: GCM_NONCE_LEN,
            actual: nonce.len(),
        });
    }
    if tag.len() != GCM_TAG_LEN {
        return Err(SuiteError::TagLength {
            expected: GCM_TAG_LEN,
            actual: tag.len(),
        });
    }
    Ok(())
}

/// AES-256-GCM with a 12-byte sequence number used directly as the nonce.
///
/// This is the SDLS baseline suite: security header is 2 bytes SPI + 12
/// bytes IV, security trailer is the 16-byte tag.
pub struct Aes256Gcm128 {
    core: GcmCore,
}

impl Aes256Gcm128 {
    pub const NAME: &'static str = "AES-256-GCM-128";

    pub fn new(key: &[u8]) -> sdls_common::Result<Self> {
        Ok(Self {
            core: GcmCore::new(key)?,
        })
    }
}

impl CipherSuite for Aes256Gcm128 {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn key_len(&self) -> usize {
        AES_256_KEY_LEN
    }

    fn iv_len(&self) -> usize {
        GCM_NONCE_LEN
    }

    fn tag_len(&self) -> usize {
        GCM_TAG_LEN
    }

    fn nonce(&self, _spi: u16, iv: &[u8]) -> Vec<u8> {
        let mut nonce = vec![0; GCM_NONCE_LEN];
        crate::seq_num::IvSeqNum::from_bytes(iv, GCM_NONCE_LEN).copy_into(&mut nonce);
        nonce
    }

    fn seal_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        data: &mut [u8],
        tag: &mut [u8],
    ) -> Result<(), SuiteError> {
        self.core.seal_in_place(nonce, aad, data, tag)
    }

    fn open_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        data: &mut [u8],
        tag: &[u8],
    ) -> Result<(), SuiteError> {
        self.core.open_in_place(nonce, aad, data, tag)
    }
}

impl fmt::Debug for Aes256Gcm128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aes256Gcm128")
            .field("key", &"<redacted>")
            .finish()
    }
}

/// AES-256-GCM with a short 32-bit sequence number on the wire.
///
/// The nonce is `SPI || 0x000000000000 || seq`, so associations sharing a
/// key under different SPIs never collide. Trades 8 bytes of header for
/// 2^32 - 1 frames per key.
pub struct Aes256Gcm128Seq32 {
    core: GcmCore,
}

impl Aes256Gcm128Seq32 {
    pub const NAME: &'static str = "AES-256-GCM-128-SEQ32";

    pub fn new(key: &[u8]) -> sdls_common::Result<Self> {
        Ok(Self {
            core: GcmCore::new(key)?,
        })
    }
}

impl CipherSuite for Aes256Gcm128Seq32 {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn key_len(&self) -> usize {
        AES_256_KEY_LEN
    }

    fn iv_len(&self) -> usize {
        SEQ32_IV_LEN
    }

    fn tag_len(&self) -> usize {
        GCM_TAG_LEN
    }

    fn nonce(&self, spi: u16, iv: &[u8]) -> Vec<u8> {
        let mut nonce = vec![0; GCM_NONCE_LEN];
        nonce[..SPI_LEN].copy_from_slice(&spi.to_be_bytes());
        crate::seq_num::IvSeqNum::from_bytes(iv, SEQ32_IV_LEN)
            .copy_into(&mut nonce[GCM_NONCE_LEN - SEQ32_IV_LEN..]);
        nonce
    }

    fn seal_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        data: &mut [u8],
        tag: &mut [u8],
    ) -> Result<(), SuiteError> {
        self.core.seal_in_place(nonce, aad, data, tag)
    }

    fn open_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        data: &mut [u8],
        tag: &[u8],
    ) -> Result<(), SuiteError> {
        self.core.open_in_place(nonce, aad, data, tag)
    }
}

impl fmt::Debug for Aes256Gcm128Seq32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aes256Gcm128Seq32")
            .field("key", &"<redacted>")
            .finish()
    }
}
