//! CCSDS Space Data Link Security (SDLS) for transfer frames.
//!
//! This crate provides:
//! - Security associations that authenticate and encrypt frames in place
//! - Anti-replay sequence numbers with modular window checks
//! - Authentication masks for selective primary-header authentication
//! - AES-256-GCM cipher suites
//!
//! # Design
//!
//! The engine is a synchronous in-memory transform. Frame transport, key
//! provisioning and error-control coding live outside it: a link hands over
//! a buffer with the frame's offsets and gets back either a protected frame
//! (send) or a [`VerificationStatus`] (receive).
//!
//! The sequence number is both the anti-replay counter and the GCM nonce
//! material, so the send path increments before every use and never reuses
//! a value under the same key.

#![forbid(unsafe_code)]

pub mod association;
pub mod auth_mask;
pub mod config;
pub mod seq_num;
pub mod suite;

pub use association::{
    FrameOffsets, ReplayPolicy, SecurityAssociation, SecurityError, VerificationStatus,
};
pub use auth_mask::AuthMask;
pub use config::AssociationConfig;
pub use seq_num::IvSeqNum;
pub use suite::{Aes256Gcm128, Aes256Gcm128Seq32, CipherSuite, CipherSuiteKind, SuiteError};
