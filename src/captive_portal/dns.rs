//! 通配 DNS 应答：任何域名都解析到 AP 自身地址
//!
//! Every A query is answered with the access point's own address, so whatever
//! host a client probes ends up on the portal.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

const HEADER_LEN: usize = 12;
const TYPE_A: u16 = 1;
const TYPE_ANY: u16 = 255;
const CLASS_IN: u16 = 1;
/// Classic DNS over UDP limit.
const MAX_PACKET: usize = 512;

struct Question {
    /// Offset just past QTYPE/QCLASS.
    end: usize,
    qtype: u16,
    name: String,
}

fn parse_question(packet: &[u8]) -> Option<Question> {
    if packet.len() < HEADER_LEN {
        return None;
    }

    let mut idx = HEADER_LEN;
    let mut name = String::new();
    loop {
        let label_len = *packet.get(idx)? as usize;
        idx += 1;
        if label_len == 0 {
            break;
        }
        // Compression pointers never appear in a query's first question.
        if label_len & 0xC0 != 0 || idx + label_len > packet.len() {
            return None;
        }
        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(&String::from_utf8_lossy(&packet[idx..idx + label_len]));
        idx += label_len;
    }

    let tail = packet.get(idx..idx + 4)?;
    Some(Question {
        end: idx + 4,
        qtype: u16::from_be_bytes([tail[0], tail[1]]),
        name,
    })
}

/// Builds the reply to `query`, or `None` if the packet is not something we answer.
pub fn answer_query(query: &[u8], answer: Ipv4Addr, ttl: u32) -> Option<Vec<u8>> {
    if query.len() < HEADER_LEN {
        return None;
    }
    let is_response = query[2] & 0x80 != 0;
    let qdcount = u16::from_be_bytes([query[4], query[5]]);
    if is_response || qdcount == 0 {
        return None;
    }
    let question = parse_question(query)?;
    let with_answer = matches!(question.qtype, TYPE_A | TYPE_ANY);

    let mut out = Vec::with_capacity(question.end + 16);
    out.extend_from_slice(&query[0..2]);
    // QR + AA, keep opcode and RD; RA set, RCODE 0.
    out.push(0x84 | (query[2] & 0x79));
    out.push(0x80);
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&u16::from(with_answer).to_be_bytes());
    out.extend_from_slice(&[0, 0, 0, 0]);
    out.extend_from_slice(&query[HEADER_LEN..question.end]);

    if with_answer {
        out.extend_from_slice(&[0xC0, 0x0C]);
        out.extend_from_slice(&TYPE_A.to_be_bytes());
        out.extend_from_slice(&CLASS_IN.to_be_bytes());
        out.extend_from_slice(&ttl.to_be_bytes());
        out.extend_from_slice(&4u16.to_be_bytes());
        out.extend_from_slice(&answer.octets());
    }
    log::debug!("DNS {} -> {} (qtype {})", question.name, answer, question.qtype);
    Some(out)
}

/// Non-blocking UDP responder, polled once per portal tick.
pub struct DnsResponder {
    socket: UdpSocket,
    answer: Ipv4Addr,
    ttl: u32,
}

impl DnsResponder {
    pub fn bind(addr: SocketAddr, answer: Ipv4Addr, ttl: u32) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        log::info!("DNS responding with {} on {}", answer, socket.local_addr()?);
        Ok(Self {
            socket,
            answer,
            ttl,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Answers at most one pending query. Returns whether one was read.
    pub fn poll(&mut self) -> io::Result<bool> {
        let mut frame = [0u8; MAX_PACKET];
        let (len, remote) = match self.socket.recv_from(&mut frame) {
            Ok(r) => r,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
            Err(e) => return Err(e),
        };
        match answer_query(&frame[..len], self.answer, self.ttl) {
            Some(reply) => {
                self.socket.send_to(&reply, remote)?;
            }
            None => log::trace!("ignoring malformed DNS packet from {}", remote),
        }
        Ok(true)
    }
}
