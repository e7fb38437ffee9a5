//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use std::sync::LazyLock as Lazy;

use bytes::Bytes;
use routegen_optimizer::packet::{
    DecodeError, EchoKind, EchoPacket, strip_ipv4_header,
};
use routegen_utils::ip::AddressFamily;

//
// Test packets.
//

static ECHO_REQUEST: Lazy<(Vec<u8>, EchoPacket)> = Lazy::new(|| {
    (
        vec![
            0x08, 0x00, 0x30, 0xcc, 0x12, 0x34, 0x00, 0x01, 0x72, 0x6f, 0x75,
            0x74, 0x65, 0x67, 0x65, 0x6e, 0x2d, 0x70, 0x72, 0x6f, 0x62, 0x65,
            0x00, 0x00,
        ],
        EchoPacket::request(0x1234, 1),
    )
});

static ECHO_REPLY: Lazy<(Vec<u8>, EchoPacket)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x00, 0x38, 0xcc, 0x12, 0x34, 0x00, 0x01, 0x72, 0x6f, 0x75,
            0x74, 0x65, 0x67, 0x65, 0x6e, 0x2d, 0x70, 0x72, 0x6f, 0x62, 0x65,
            0x00, 0x00,
        ],
        EchoPacket {
            kind: EchoKind::Reply,
            identifier: 0x1234,
            sequence: 1,
            payload: Bytes::from_static(EchoPacket::PAYLOAD),
        },
    )
});

//
// Tests.
//

#[test]
fn test_encode_echo_request() {
    let (ref bytes, ref packet) = *ECHO_REQUEST;
    assert_eq!(packet.encode(AddressFamily::Ipv4).as_ref(), bytes.as_slice());
}

#[test]
fn test_decode_echo_reply() {
    let (ref bytes, ref packet) = *ECHO_REPLY;
    assert_eq!(EchoPacket::decode(bytes, AddressFamily::Ipv4).as_ref(), Ok(packet));
}

#[test]
fn test_encode_echo_request_ipv6() {
    let bytes = EchoPacket::request(0x1234, 1).encode(AddressFamily::Ipv6);
    // Type 128, checksum left to the kernel.
    assert_eq!(&bytes[..8], &[0x80, 0x00, 0x00, 0x00, 0x12, 0x34, 0x00, 0x01]);
    assert_eq!(
        EchoPacket::decode(&bytes, AddressFamily::Ipv6).unwrap().kind,
        EchoKind::Request
    );
}

#[test]
fn test_decode_errors() {
    let (ref bytes, _) = *ECHO_REPLY;

    assert_eq!(
        EchoPacket::decode(&bytes[..6], AddressFamily::Ipv4),
        Err(DecodeError::InsufficientData)
    );

    let mut corrupted = bytes.clone();
    corrupted[7] ^= 0xff;
    assert_eq!(
        EchoPacket::decode(&corrupted, AddressFamily::Ipv4),
        Err(DecodeError::InvalidChecksum)
    );

    // Destination unreachable.
    let mut unreachable = bytes.clone();
    unreachable[0] = 3;
    unreachable[2] -= 3;
    assert_eq!(
        EchoPacket::decode(&unreachable, AddressFamily::Ipv4),
        Err(DecodeError::UnexpectedType(3))
    );
}

#[test]
fn test_strip_ipv4_header() {
    let (ref bytes, ref packet) = *ECHO_REPLY;
    let mut datagram = vec![
        0x45, 0x00, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x00, 0x40, 0x01, 0x00,
        0x00, 0xc6, 0x33, 0x64, 0x01, 0xc0, 0x00, 0x02, 0x0a,
    ];
    datagram.extend_from_slice(bytes);

    let data = strip_ipv4_header(&datagram).unwrap();
    assert_eq!(
        EchoPacket::decode(data, AddressFamily::Ipv4).as_ref(),
        Ok(packet)
    );

    assert_eq!(
        strip_ipv4_header(&[0x60, 0x00]),
        Err(DecodeError::InvalidIpHeader)
    );
    assert_eq!(strip_ipv4_header(&[]), Err(DecodeError::InsufficientData));
    assert_eq!(
        strip_ipv4_header(&datagram[..12]),
        Err(DecodeError::InsufficientData)
    );
}
