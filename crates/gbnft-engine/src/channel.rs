//! Transport boundary: an unreliable, unordered datagram primitive.
//!
//! The engines only need two capabilities — send a frame, wait a bounded
//! time for a frame — so that is the whole trait. The UDP implementation
//! carries the optional loss-injection hook, applied transparently inside
//! `send` so retransmission behavior can be exercised against a lossy
//! channel without touching the protocol code.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use gbnft_wire::MAX_DATAGRAM;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("socket I/O failed")]
    Io(#[from] io::Error),
    #[error("no address resolved for {0}")]
    Resolve(String),
    #[error("no peer to send to yet")]
    NoPeer,
}

/// Datagram send/receive with bounded waiting.
///
/// `recv` returns `Ok(None)` on timeout; `timeout == None` blocks until a
/// frame arrives. Loss, duplication and reordering are all fair game — the
/// ARQ layers above are what make the transfer reliable.
pub trait Channel {
    fn send(&mut self, frame: &[u8]) -> Result<usize, ChannelError>;
    fn recv(&mut self, timeout: Option<Duration>) -> Result<Option<Bytes>, ChannelError>;
}

/// Channel construction parameters.
///
/// `loss` is a drop probability in `[0, 1]` applied to outgoing frames.
/// `seed`, when set, makes the drop pattern reproducible; otherwise the
/// generator is seeded from the OS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub loss: f64,
    pub seed: Option<u64>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            loss: 0.0,
            seed: None,
        }
    }
}

/// Blocking UDP implementation of [`Channel`].
///
/// The socket is owned exclusively by the channel for the lifetime of the
/// run and closed when it is dropped, on every exit path.
///
/// Replies track the source of the most recent datagram, which is how the
/// server side answers whichever peer is currently transferring (the
/// protocol assumes one sender at a time).
pub struct UdpChannel {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
    loss: f64,
    rng: StdRng,
    buf: Vec<u8>,
}

impl UdpChannel {
    /// Client mode: bind an ephemeral local port and aim at `host:port`.
    pub fn connect(host: &str, port: u16, config: ChannelConfig) -> Result<Self, ChannelError> {
        let target = format!("{host}:{port}");
        let peer = target
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| ChannelError::Resolve(target))?;
        let local: SocketAddr = if peer.is_ipv4() {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)?;
        debug!(%peer, "client channel bound to {}", socket.local_addr()?);
        Ok(Self::from_parts(socket, Some(peer), config))
    }

    /// Server mode: bind the given port on all interfaces; the peer is
    /// learned from the first datagram received.
    pub fn bind(port: u16, config: ChannelConfig) -> Result<Self, ChannelError> {
        let socket = UdpSocket::bind(("0.0.0.0", port))?;
        debug!("server channel bound to {}", socket.local_addr()?);
        Ok(Self::from_parts(socket, None, config))
    }

    fn from_parts(socket: UdpSocket, peer: Option<SocketAddr>, config: ChannelConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            socket,
            peer,
            loss: config.loss,
            rng,
            buf: vec![0u8; MAX_DATAGRAM],
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ChannelError> {
        Ok(self.socket.local_addr()?)
    }
}

impl Channel for UdpChannel {
    fn send(&mut self, frame: &[u8]) -> Result<usize, ChannelError> {
        let peer = self.peer.ok_or(ChannelError::NoPeer)?;
        if self.loss > 0.0 && self.rng.random::<f64>() < self.loss {
            // Report the frame as sent; as far as the protocol can tell,
            // the network ate it.
            debug!(len = frame.len(), "simulated loss on send");
            return Ok(frame.len());
        }
        Ok(self.socket.send_to(frame, peer)?)
    }

    fn recv(&mut self, timeout: Option<Duration>) -> Result<Option<Bytes>, ChannelError> {
        // A zero read timeout means "block forever" to the OS; clamp so an
        // already-elapsed deadline still polls the socket once.
        let timeout = timeout.map(|t| t.max(Duration::from_millis(1)));
        self.socket.set_read_timeout(timeout)?;
        match self.socket.recv_from(&mut self.buf) {
            Ok((n, src)) => {
                self.peer = Some(src);
                Ok(Some(Bytes::copy_from_slice(&self.buf[..n])))
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (UdpChannel, UdpChannel) {
        let server = UdpChannel::bind(0, ChannelConfig::default()).unwrap();
        let port = server.local_addr().unwrap().port();
        let client = UdpChannel::connect("127.0.0.1", port, ChannelConfig::default()).unwrap();
        (client, server)
    }

    #[test]
    fn loopback_round_trip_and_reply() {
        let (mut client, mut server) = pair();
        client.send(b"ping").unwrap();
        let got = server.recv(Some(Duration::from_secs(1))).unwrap().unwrap();
        assert_eq!(&got[..], b"ping");

        // Server learned the peer from the datagram source.
        server.send(b"pong").unwrap();
        let got = client.recv(Some(Duration::from_secs(1))).unwrap().unwrap();
        assert_eq!(&got[..], b"pong");
    }

    #[test]
    fn recv_times_out_with_none() {
        let (_client, mut server) = pair();
        let got = server.recv(Some(Duration::from_millis(20))).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn server_send_without_peer_fails() {
        let mut server = UdpChannel::bind(0, ChannelConfig::default()).unwrap();
        assert!(matches!(server.send(b"x"), Err(ChannelError::NoPeer)));
    }

    #[test]
    fn full_loss_drops_everything_but_reports_success() {
        let server = UdpChannel::bind(0, ChannelConfig::default()).unwrap();
        let port = server.local_addr().unwrap().port();
        let mut server = server;
        let mut client = UdpChannel::connect(
            "127.0.0.1",
            port,
            ChannelConfig {
                loss: 1.0,
                seed: Some(7),
            },
        )
        .unwrap();
        assert_eq!(client.send(b"doomed").unwrap(), 6);
        assert!(server.recv(Some(Duration::from_millis(50))).unwrap().is_none());
    }
}
