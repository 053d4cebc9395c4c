//! Transports that open byte streams to a printer
//!
//! Most thermal printers accept raw ESC/POS on TCP port 9100.

use async_trait::async_trait;
use std::fmt::Debug;
use std::io;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::net::TcpStream;
use tracing::{info, instrument, warn};

/// Default raw printing port
pub const DEFAULT_PORT: u16 = 9100;

/// Opens printer connections.
///
/// A transport only establishes streams; the session owns the stream it
/// gets back and is the only writer to it.
#[async_trait]
pub trait Transport: Send + Sync + Debug + 'static {
    type Connection: AsyncWrite + Unpin + Send + 'static;

    async fn connect(&self, host: &str, port: u16) -> io::Result<Self::Connection>;
}

/// Plain TCP transport
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

#[async_trait]
impl Transport for TcpTransport {
    type Connection = TcpStream;

    async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((host, port)).await?;
        // Small command buffers (e.g. a cut) should not sit in Nagle's buffer
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// Check whether a printer accepts TCP connections.
///
/// The probe connection is dropped right away; nothing is written.
#[instrument(fields(addr = %format!("{}:{}", host, port)))]
pub async fn probe(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpTransport.connect(host, port)).await {
        Ok(Ok(_)) => {
            info!("Printer online");
            true
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Printer offline");
            false
        }
        Err(_) => {
            warn!("Printer check timeout");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_online() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(probe("127.0.0.1", port, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn test_probe_offline() {
        // Bind then drop to get a port nobody listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        assert!(!probe("127.0.0.1", port, Duration::from_secs(2)).await);
    }
}
