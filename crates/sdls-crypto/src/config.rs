//! Construction-time parameters for a security association.
//!
//! ```
//! use sdls_crypto::config::AssociationConfig;
//!
//! let json = r#"{
//!     "spi": 1,
//!     "key": "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f",
//!     "suite": "AES-256-GCM-128",
//!     "seq_num_window": 64
//! }"#;
//!
//! let sa = AssociationConfig::from_json(json).unwrap().build().unwrap();
//! assert_eq!(sa.spi(), 1);
//! assert_eq!(sa.overhead_bytes(), 30);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

use crate::association::{ReplayPolicy, SecurityAssociation, DEFAULT_SEQ_NUM_WINDOW};
use crate::suite::CipherSuiteKind;
use sdls_common::helpers::{decode_hex, decode_key};
use sdls_common::{Error, Result};

fn default_seq_num_window() -> u64 {
    DEFAULT_SEQ_NUM_WINDOW
}

/// Parameters handed over by the key provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct AssociationConfig {
    pub spi: u16,
    /// Hex-encoded key; length fixed by the suite.
    pub key: String,
    #[serde(default)]
    pub suite: CipherSuiteKind,
    #[serde(default = "default_seq_num_window")]
    pub seq_num_window: u64,
    #[serde(default)]
    pub replay_policy: ReplayPolicy,
    /// Hex-encoded big-endian starting sequence number.
    #[serde(default)]
    pub initial_seq_num: Option<String>,
}

impl AssociationConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::serialization)
    }

    /// Decode the key and build the association.
    pub fn build(&self) -> Result<SecurityAssociation> {
        let key = decode_key(&self.key, self.suite.key_len())?;
        let sa = SecurityAssociation::with_key(self.suite, &key, self.spi, self.seq_num_window)?
            .with_replay_policy(self.replay_policy);

        match &self.initial_seq_num {
            Some(hex) => {
                let seq = decode_hex(hex)?;
                if seq.is_empty() {
                    return Err(Error::config("initial_seq_num is empty"));
                }
                Ok(sa.with_initial_seq_num(&seq))
            }
            None => Ok(sa),
        }
    }
}

impl Drop for AssociationConfig {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for AssociationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssociationConfig")
            .field("spi", &self.spi)
            .field("key", &"<redacted>")
            .field("suite", &self.suite)
            .field("seq_num_window", &self.seq_num_window)
            .field("replay_policy", &self.replay_policy)
            .field("initial_seq_num", &self.initial_seq_num)
            .finish()
    }
}
