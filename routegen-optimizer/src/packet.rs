//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use bytes::{Buf, BufMut, Bytes, BytesMut};
use internet_checksum::Checksum;
use routegen_utils::ip::AddressFamily;
use serde::{Deserialize, Serialize};

// Type aliases.
pub type DecodeResult<T> = Result<T, DecodeError>;

// Decode errors.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum DecodeError {
    InsufficientData,
    InvalidChecksum,
    InvalidIpHeader,
    UnexpectedType(u8),
}

// ICMP echo message kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum EchoKind {
    Request,
    Reply,
}

// ICMP/ICMPv6 echo message.
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |     Type      |     Code      |          Checksum             |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |           Identifier          |        Sequence Number        |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |     Data ...
// +-+-+-+-+-
//
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct EchoPacket {
    pub kind: EchoKind,
    pub identifier: u16,
    pub sequence: u16,
    pub payload: Bytes,
}

// ===== impl EchoKind =====

impl EchoKind {
    // Returns the ICMP type value of this message kind.
    pub fn icmp_type(&self, af: AddressFamily) -> u8 {
        match (af, self) {
            (AddressFamily::Ipv4, EchoKind::Request) => 8,
            (AddressFamily::Ipv4, EchoKind::Reply) => 0,
            (AddressFamily::Ipv6, EchoKind::Request) => 128,
            (AddressFamily::Ipv6, EchoKind::Reply) => 129,
        }
    }

    fn from_icmp_type(af: AddressFamily, icmp_type: u8) -> Option<EchoKind> {
        [EchoKind::Request, EchoKind::Reply]
            .into_iter()
            .find(|kind| kind.icmp_type(af) == icmp_type)
    }
}

// ===== impl EchoPacket =====

impl EchoPacket {
    pub const HDR_LENGTH: usize = 8;
    pub const PAYLOAD: &'static [u8] = b"routegen-probe\0\0";

    // Builds an echo request with the default payload.
    pub fn request(identifier: u16, sequence: u16) -> EchoPacket {
        EchoPacket {
            kind: EchoKind::Request,
            identifier,
            sequence,
            payload: Bytes::from_static(Self::PAYLOAD),
        }
    }

    // Encodes the message.
    //
    // The checksum is only computed for ICMPv4. The ICMPv6 checksum covers
    // a pseudo-header and is filled in by the kernel.
    pub fn encode(&self, af: AddressFamily) -> Bytes {
        let mut buf =
            BytesMut::with_capacity(Self::HDR_LENGTH + self.payload.len());
        buf.put_u8(self.kind.icmp_type(af));
        buf.put_u8(0);
        buf.put_u16(0);
        buf.put_u16(self.identifier);
        buf.put_u16(self.sequence);
        buf.put_slice(&self.payload);

        if af == AddressFamily::Ipv4 {
            update_cksum(&mut buf);
        }

        buf.freeze()
    }

    // Decodes a message.
    pub fn decode(data: &[u8], af: AddressFamily) -> DecodeResult<EchoPacket> {
        if data.len() < Self::HDR_LENGTH {
            return Err(DecodeError::InsufficientData);
        }
        if af == AddressFamily::Ipv4 {
            verify_cksum(data)?;
        }

        let mut buf = Bytes::copy_from_slice(data);
        let icmp_type = buf.get_u8();
        let kind = EchoKind::from_icmp_type(af, icmp_type)
            .ok_or(DecodeError::UnexpectedType(icmp_type))?;
        let _code = buf.get_u8();
        let _checksum = buf.get_u16();
        let identifier = buf.get_u16();
        let sequence = buf.get_u16();

        Ok(EchoPacket {
            kind,
            identifier,
            sequence,
            payload: buf,
        })
    }
}

// ===== global functions =====

// Strips the IPv4 header that raw ICMPv4 sockets prepend to every
// received datagram.
pub fn strip_ipv4_header(data: &[u8]) -> DecodeResult<&[u8]> {
    let first = *data.first().ok_or(DecodeError::InsufficientData)?;
    if first >> 4 != 4 {
        return Err(DecodeError::InvalidIpHeader);
    }
    let hdr_len = usize::from(first & 0x0f) * 4;
    if hdr_len < 20 {
        return Err(DecodeError::InvalidIpHeader);
    }
    data.get(hdr_len..).ok_or(DecodeError::InsufficientData)
}

const CKSUM_RANGE: std::ops::Range<usize> = 2..4;

fn update_cksum(buf: &mut BytesMut) {
    let mut cksum = Checksum::new();
    cksum.add_bytes(buf);
    buf[CKSUM_RANGE].copy_from_slice(&cksum.checksum());
}

fn verify_cksum(data: &[u8]) -> DecodeResult<()> {
    let mut cksum = Checksum::new();
    cksum.add_bytes(data);
    if cksum.checksum() != [0, 0] {
        return Err(DecodeError::InvalidChecksum);
    }
    Ok(())
}

// ===== impl DecodeError =====

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::InsufficientData => {
                write!(f, "not enough data")
            }
            DecodeError::InvalidChecksum => {
                write!(f, "invalid checksum")
            }
            DecodeError::InvalidIpHeader => {
                write!(f, "invalid IP header")
            }
            DecodeError::UnexpectedType(icmp_type) => {
                write!(f, "unexpected ICMP type: {icmp_type}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}
