//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use std::io::Read;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_new::new;
use routegen_utils::ip::AddressFamily;
use serde::Serialize;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;
use tokio::time::Instant;

use crate::error::{Error, IoError};
use crate::packet::{self, EchoKind, EchoPacket};
use crate::target::TargetKey;

// Largest datagram read from a probe socket.
const RX_BUFFER_SIZE: usize = 1500;

// Outcome of one probe: `sent` echo attempts towards a target.
#[derive(Clone, Debug, PartialEq)]
#[derive(Serialize)]
pub struct ProbeResult {
    pub timestamp: DateTime<Utc>,
    pub sent: u32,
    pub received: u32,
    // Fraction of unanswered attempts, from 0.0 to 1.0.
    pub loss: f64,
    // Round-trip times of the answered attempts, if any.
    pub rtt: Option<RttStats>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Serialize)]
pub struct RttStats {
    pub min: Duration,
    pub avg: Duration,
    pub max: Duration,
}

// Reachability measurement.
//
// Implementations never fail: unreachable targets, timeouts and socket
// errors are reported as lost attempts.
#[async_trait]
pub trait Prober: Send + Sync {
    // Sends `count` attempts to the target, waiting at most `timeout` for
    // each one.
    async fn probe(
        &self,
        target: &TargetKey,
        count: u32,
        timeout: Duration,
    ) -> ProbeResult;
}

// ICMP echo prober.
//
// Uses raw sockets by default, which require CAP_NET_RAW. Datagram mode
// relies on unprivileged ICMP sockets (`net.ipv4.ping_group_range`) instead.
#[derive(Debug, new)]
pub struct IcmpProber {
    udp: bool,
}

// ===== impl ProbeResult =====

impl ProbeResult {
    // Builds a result out of the round-trip times of the answered attempts.
    pub fn from_samples(sent: u32, samples: &[Duration]) -> ProbeResult {
        let received = samples.len().min(sent as usize) as u32;
        let loss = if sent == 0 {
            0.0
        } else {
            f64::from(sent - received) / f64::from(sent)
        };
        let rtt = RttStats::compute(samples);

        ProbeResult {
            timestamp: Utc::now(),
            sent,
            received,
            loss,
            rtt,
        }
    }

    // Builds a result where every attempt was lost.
    pub fn lost(sent: u32) -> ProbeResult {
        ProbeResult::from_samples(sent, &[])
    }

    pub fn is_answered(&self) -> bool {
        self.received > 0
    }
}

// ===== impl RttStats =====

impl RttStats {
    fn compute(samples: &[Duration]) -> Option<RttStats> {
        let min = samples.iter().min()?;
        let max = samples.iter().max()?;
        let avg = samples.iter().sum::<Duration>() / samples.len() as u32;
        Some(RttStats {
            min: *min,
            avg,
            max: *max,
        })
    }
}

// ===== impl IcmpProber =====

impl IcmpProber {
    fn socket(&self, target: &TargetKey) -> Result<AsyncFd<Socket>, IoError> {
        let (domain, protocol) = match target.address_family() {
            AddressFamily::Ipv4 => (Domain::IPV4, Protocol::ICMPV4),
            AddressFamily::Ipv6 => (Domain::IPV6, Protocol::ICMPV6),
        };
        let ty = if self.udp { Type::DGRAM } else { Type::RAW };

        let socket = Socket::new(domain, ty, Some(protocol))
            .map_err(IoError::SocketError)?;
        socket
            .set_nonblocking(true)
            .map_err(IoError::SocketError)?;
        socket
            .bind(&SocketAddr::new(target.source, 0).into())
            .map_err(IoError::SocketError)?;
        // Only replies from the target are received from now on.
        socket
            .connect(&SocketAddr::new(target.destination, 0).into())
            .map_err(IoError::SocketError)?;
        AsyncFd::new(socket).map_err(IoError::SocketError)
    }

    // Performs one echo exchange, returning its round-trip time or `None`
    // when no reply arrived in time.
    async fn attempt(
        &self,
        socket: &AsyncFd<Socket>,
        target: &TargetKey,
        identifier: u16,
        sequence: u16,
        timeout: Duration,
    ) -> Result<Option<Duration>, Error> {
        let af = target.address_family();
        let request = EchoPacket::request(identifier, sequence).encode(af);

        let exchange = async {
            let start = Instant::now();
            if let Err(error) = socket
                .async_io(Interest::WRITABLE, |socket| socket.send(&request))
                .await
            {
                return Err(Error::IoError(*target, IoError::SendError(error)));
            }

            let mut buf = [0; RX_BUFFER_SIZE];
            loop {
                let len = match socket
                    .async_io(Interest::READABLE, |mut socket| {
                        socket.read(&mut buf)
                    })
                    .await
                {
                    Ok(len) => len,
                    Err(error) => {
                        let error = IoError::RecvError(error);
                        return Err(Error::IoError(*target, error));
                    }
                };
                match self.decode_reply(af, &buf[..len]) {
                    Ok(reply) if self.matches(&reply, identifier, sequence) => {
                        return Ok(start.elapsed());
                    }
                    Ok(_) => continue,
                    Err(error) => {
                        Error::EchoDecodeError(*target, error).log();
                    }
                }
            }
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(rtt)) => Ok(Some(rtt)),
            Ok(Err(error)) => Err(error),
            Err(_) => Ok(None),
        }
    }

    fn decode_reply(
        &self,
        af: AddressFamily,
        data: &[u8],
    ) -> packet::DecodeResult<EchoPacket> {
        let data = match (af, self.udp) {
            (AddressFamily::Ipv4, false) => packet::strip_ipv4_header(data)?,
            _ => data,
        };
        EchoPacket::decode(data, af)
    }

    fn matches(
        &self,
        reply: &EchoPacket,
        identifier: u16,
        sequence: u16,
    ) -> bool {
        // The kernel rewrites the identifier of datagram-mode echoes.
        reply.kind == EchoKind::Reply
            && reply.sequence == sequence
            && (self.udp || reply.identifier == identifier)
    }
}

#[async_trait]
impl Prober for IcmpProber {
    async fn probe(
        &self,
        target: &TargetKey,
        count: u32,
        timeout: Duration,
    ) -> ProbeResult {
        let socket = match self.socket(target) {
            Ok(socket) => socket,
            Err(error) => {
                Error::IoError(*target, error).log();
                return ProbeResult::lost(count);
            }
        };

        let identifier = rand::random::<u16>();
        let mut samples = Vec::with_capacity(count as usize);
        for sequence in 0..count {
            match self
                .attempt(&socket, target, identifier, sequence as u16, timeout)
                .await
            {
                Ok(Some(rtt)) => samples.push(rtt),
                Ok(None) => {}
                Err(error) => error.log(),
            }
        }

        ProbeResult::from_samples(count, &samples)
    }
}
