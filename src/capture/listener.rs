use log::{debug, info, warn};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use thiserror::Error;

use crate::capture::descriptor::PacketDescriptor;

/// Largest datagram the capture process emits.
pub const DEFAULT_MAX_DATAGRAM: usize = 4096;
/// Largest payload a UDP datagram over IPv4 can carry.
pub const MAX_DATAGRAM: usize = 65_507;

#[derive(Error, Debug)]
pub enum ListenerError {
    #[error("cannot bind packet listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot switch packet listener to non-blocking mode: {0}")]
    NonBlocking(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub datagrams_received: u64,
    pub malformed_dropped: u64,
}

/// Non-blocking UDP endpoint the capture process sends packet records to.
pub struct Listener {
    socket: UdpSocket,
    buffer: Vec<u8>,
    stats: ListenerStats,
}

impl Listener {
    pub fn bind(addr: &str, max_datagram: usize) -> Result<Self, ListenerError> {
        let socket = UdpSocket::bind(addr).map_err(|source| ListenerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        socket.set_nonblocking(true).map_err(ListenerError::NonBlocking)?;

        info!("Listening for packet records on {}", addr);

        Ok(Listener {
            socket,
            buffer: vec![0u8; max_datagram.clamp(1, MAX_DATAGRAM)],
            stats: ListenerStats::default(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Returns every datagram queued right now; an empty socket yields an empty batch.
    pub fn drain(&mut self) -> Vec<Vec<u8>> {
        let mut batch = Vec::new();

        loop {
            match self.socket.recv_from(&mut self.buffer) {
                Ok((len, _)) => {
                    self.stats.datagrams_received += 1;
                    batch.push(self.buffer[..len].to_vec());
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("Packet listener receive error: {}", e);
                    break;
                }
            }
        }

        batch
    }

    /// Drains the socket and decodes each payload, dropping malformed records.
    pub fn drain_descriptors(&mut self) -> Vec<PacketDescriptor> {
        let payloads = self.drain();
        let mut packets = Vec::with_capacity(payloads.len());

        for payload in payloads {
            match PacketDescriptor::from_slice(&payload) {
                Ok(packet) => packets.push(packet),
                Err(e) => {
                    self.stats.malformed_dropped += 1;
                    debug!("Dropping malformed packet record ({} bytes): {}", payload.len(), e);
                }
            }
        }

        packets
    }

    pub fn stats(&self) -> ListenerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::descriptor::PacketKind;
    use std::time::{Duration, Instant};

    fn loopback_pair() -> (Listener, UdpSocket) {
        let listener = Listener::bind("127.0.0.1:0", DEFAULT_MAX_DATAGRAM).unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.connect(listener.local_addr().unwrap()).unwrap();
        (listener, sender)
    }

    // Loopback delivery is immediate on most platforms; poll briefly to stay robust.
    fn drain_until(listener: &mut Listener, expected: usize) -> Vec<PacketDescriptor> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut packets = Vec::new();
        while packets.len() + (listener.stats().malformed_dropped as usize) < expected
            && Instant::now() < deadline
        {
            packets.extend(listener.drain_descriptors());
            std::thread::sleep(Duration::from_millis(5));
        }
        packets
    }

    #[test]
    fn test_drain_empty_returns_immediately() {
        let (mut listener, _sender) = loopback_pair();

        let start = Instant::now();
        let batch = listener.drain();
        assert!(batch.is_empty());
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_drain_decodes_batch_in_arrival_order() {
        let (mut listener, sender) = loopback_pair();
        sender.send(br#"{"type":"TCP","size":100,"src_ip":"10.0.0.5"}"#).unwrap();
        sender.send(br#"{"type":"UDP","size":200,"src_ip":"10.0.0.6"}"#).unwrap();
        sender.send(br#"{"type":"ARP","size":42}"#).unwrap();

        let packets = drain_until(&mut listener, 3);
        let kinds: Vec<_> = packets.iter().map(|p| p.kind.clone()).collect();
        assert_eq!(kinds, vec![PacketKind::Tcp, PacketKind::Udp, PacketKind::Arp]);
        assert_eq!(listener.stats().datagrams_received, 3);
    }

    #[test]
    fn test_malformed_payload_does_not_abort_drain() {
        let (mut listener, sender) = loopback_pair();
        sender.send(br#"{"type":"TCP","size":1}"#).unwrap();
        sender.send(b"garbage{").unwrap();
        sender.send(br#"{"type":"UDP","size":2}"#).unwrap();

        let packets = drain_until(&mut listener, 3);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].size, 1);
        assert_eq!(packets[1].size, 2);
        assert_eq!(listener.stats().malformed_dropped, 1);
    }

    #[test]
    fn test_oversized_buffer_is_clamped() {
        let listener = Listener::bind("127.0.0.1:0", usize::MAX).unwrap();
        assert_eq!(listener.buffer.len(), MAX_DATAGRAM);
    }

    #[test]
    fn test_bind_failure_is_reported() {
        let (listener, _sender) = loopback_pair();
        let taken = listener.local_addr().unwrap().to_string();

        match Listener::bind(&taken, DEFAULT_MAX_DATAGRAM) {
            Err(ListenerError::Bind { addr, .. }) => assert_eq!(addr, taken),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("second bind on {} should fail", taken),
        }
    }
}
