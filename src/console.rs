//! The downstream console connection (spec §6): a byte-stream TCP
//! connection the NCP engine bridges telnet traffic to and from.
//!
//! Grounded on `waitsconnect.c`'s `connect_to_console`/
//! `handle_console_input`/`disconnect_console`.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub struct Console {
    stream: TcpStream,
}

impl Console {
    pub async fn connect(addr: std::net::SocketAddr) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self { stream })
    }

    pub async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(bytes).await
    }

    /// Reads whatever is available into `buf`. A return of `0` means the
    /// peer closed the connection.
    pub async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf).await
    }

    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.stream.shutdown().await
    }
}
