//! Owns the datagram socket to the IMP emulator (spec §4.1).
//!
//! Grounded on `imp.c`'s `args`/`make_socket` (bind a local UDP port, fix a
//! remote destination, no retransmission/buffering) and the teacher's
//! `Client::start` socket setup in `client.rs`.

use std::net::SocketAddr;

use tokio::net::UdpSocket;

pub struct Transport {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl Transport {
    pub async fn bind(local: SocketAddr, peer: SocketAddr) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(local).await?;
        Ok(Self { socket, peer })
    }

    pub async fn send(&self, datagram: &[u8]) -> std::io::Result<()> {
        self.socket.send_to(datagram, self.peer).await?;
        Ok(())
    }

    /// Reads one datagram into `buf`, returning the number of bytes read.
    /// Datagrams from anywhere other than the configured peer are ignored
    /// (read again) since this adapter is bound to exactly one IMP.
    pub async fn recv(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            let (n, from) = self.socket.recv_from(buf).await?;
            if from == self.peer {
                return Ok(n);
            }
            tracing::warn!(%from, expected = %self.peer, "transport: datagram from unexpected peer, ignoring");
        }
    }
}
