//! Integration tests for SDLS-protected frames over a UDP link.

mod common;

use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use common::{association, payload_of, tm_frame};
use sdls_crypto::{
    AssociationConfig, AuthMask, CipherSuiteKind, FrameOffsets, VerificationStatus,
};

/// Secure TM frames on one socket, verify them on the other
#[tokio::test]
async fn test_secured_frames_over_udp() {
    sdls_common::init_tracing_with_default("debug");

    let ground_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let ground_addr = ground_socket.local_addr().unwrap();
    let spacecraft_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let ground_handle = tokio::spawn(async move {
        let mut rx = association(CipherSuiteKind::Aes256Gcm128);
        let mask = AuthMask::tm();
        let mut buf = vec![0u8; 2048];
        let mut received = Vec::new();

        for _ in 0..5 {
            let (len, _) = ground_socket.recv_from(&mut buf).await.unwrap();
            let frame = &mut buf[..len];
            let data_start = 6 + rx.header_size();
            let offsets = FrameOffsets::new(0, data_start, len);

            let status = rx.process_security(frame, offsets, &mask);
            assert_eq!(status, VerificationStatus::NoFailure);
            received.push(frame[data_start..len - rx.trailer_size()].to_vec());
        }
        received
    });

    let mut tx = association(CipherSuiteKind::Aes256Gcm128);
    let mask = AuthMask::tm();
    let mut sent = Vec::new();

    for i in 0..5 {
        let payload = format!("frame {} housekeeping", i).into_bytes();
        let (mut buf, offsets) = tm_frame(&tx, 0, &payload);
        tx.apply_security(&mut buf, offsets, &mask).unwrap();
        assert_ne!(payload_of(&buf, &offsets, payload.len()), &payload[..]);

        spacecraft_socket
            .send_to(&buf[..offsets.frame_end], ground_addr)
            .await
            .unwrap();
        sent.push(payload);
    }

    let received = timeout(Duration::from_secs(5), ground_handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, sent);
}

/// Frames sealed in sequence verify in sequence on both suites
#[tokio::test]
async fn test_frame_sequence_both_suites() {
    for kind in [CipherSuiteKind::Aes256Gcm128, CipherSuiteKind::Aes256Gcm128Seq32] {
        let mut tx = association(kind);
        let mut rx = association(kind);
        let mask = AuthMask::tm();

        for i in 0..20 {
            let payload = format!("Message {}", i);
            let (mut buf, offsets) = tm_frame(&tx, 3, payload.as_bytes());
            tx.apply_security(&mut buf, offsets, &mask).unwrap();

            assert_eq!(
                rx.process_security(&mut buf, offsets, &mask),
                VerificationStatus::NoFailure
            );
            assert_eq!(payload_of(&buf, &offsets, payload.len()), payload.as_bytes());
            // Bytes outside the frame region are never touched
            assert_eq!(&buf[..3], &[0xee; 3]);
            assert_eq!(&buf[offsets.frame_end..], &[0xc3, 0x3c]);
        }
        assert_eq!(rx.recv_seq_num(), tx.send_seq_num());
    }
}

/// Both ends configured from JSON interoperate
#[tokio::test]
async fn test_link_from_config() -> anyhow::Result<()> {
    let json = format!(
        r#"{{
            "spi": {},
            "key": "{}",
            "suite": "AES-256-GCM-128-SEQ32",
            "seq_num_window": 4,
            "initial_seq_num": "000000ff"
        }}"#,
        common::SPI,
        hex::encode(common::KEY)
    );
    let mut tx = AssociationConfig::from_json(&json)?.build()?;
    let mut rx = AssociationConfig::from_json(&json)?.build()?;
    let mask = AuthMask::tm();

    let (mut buf, offsets) = tm_frame(&tx, 0, b"config driven");
    tx.apply_security(&mut buf, offsets, &mask)?;
    assert_eq!(&buf[offsets.data_start - 4..offsets.data_start], &[0, 0, 1, 0]);
    assert_eq!(
        rx.process_security(&mut buf, offsets, &mask),
        VerificationStatus::NoFailure
    );
    assert_eq!(payload_of(&buf, &offsets, 13), b"config driven");
    Ok(())
}

/// Dropped frames inside the window are tolerated; a late frame is not
#[tokio::test]
async fn test_loss_and_reordering() {
    let mut tx = association(CipherSuiteKind::Aes256Gcm128);
    let mut rx = association(CipherSuiteKind::Aes256Gcm128);
    let mask = AuthMask::tm();

    let mut frames = Vec::new();
    for i in 0..4 {
        let (mut buf, offsets) = tm_frame(&tx, 0, &[i; 32]);
        tx.apply_security(&mut buf, offsets, &mask).unwrap();
        frames.push((buf, offsets));
    }

    let (mut f0, o0) = frames[0].clone();
    assert!(rx.process_security(&mut f0, o0, &mask).is_ok());

    // Frame 1 is delayed; frame 3 arrives first
    let (mut f3, o3) = frames[3].clone();
    assert!(rx.process_security(&mut f3, o3, &mask).is_ok());

    let (mut f1, o1) = frames[1].clone();
    assert_eq!(
        rx.process_security(&mut f1, o1, &mask),
        VerificationStatus::AntiReplaySequenceNumberFailure
    );
}
