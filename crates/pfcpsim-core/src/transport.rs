use crate::error::Result;
use async_trait::async_trait;
use std::net::SocketAddr;

/// Abstract datagram transport
/// Allows running the client over a real UDP socket or an in-process fake
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one datagram to the target
    async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<usize>;

    /// Receive one datagram
    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)>;

    /// Get local address
    fn local_addr(&self) -> Result<SocketAddr>;
}

// Implement Transport for tokio::net::UdpSocket
#[async_trait]
impl Transport for tokio::net::UdpSocket {
    async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<usize> {
        Ok(tokio::net::UdpSocket::send_to(self, data, target).await?)
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        Ok(tokio::net::UdpSocket::recv_from(self, buf).await?)
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(tokio::net::UdpSocket::local_addr(self)?)
    }
}
