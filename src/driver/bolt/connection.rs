//! Bolt transport: handshake and message framing over a byte stream.
//!
//! The transport knows nothing about the connection lifecycle; it moves
//! requests out and responses in. [`super::BoltClient`] drives it and owns
//! the state machine.

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder};

use crate::bolt::codec::BoltClientCodec;
use crate::bolt::handshake::{client_handshake, negotiated_version, HANDSHAKE_RESPONSE_SIZE};
use crate::bolt::{BoltError, BoltRequest, BoltResponse, BoltResult, BoltVersion};
use crate::driver::config::ServerAddress;

/// Open a TCP socket to a server.
pub async fn connect_tcp(address: &ServerAddress, timeout: Duration) -> BoltResult<TcpStream> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect(address.to_socket_addr()))
        .await
        .map_err(|_| {
            BoltError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("connecting to {} took longer than {:?}", address, timeout),
            ))
        })??;

    // small request/response messages; do not wait for Nagle
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// A negotiated Bolt byte stream.
pub struct BoltConnection<S = TcpStream> {
    stream: S,
    codec: BoltClientCodec,
    read_buffer: BytesMut,
    write_buffer: BytesMut,
    version: BoltVersion,
}

impl<S> BoltConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Send the preamble and version proposals, then read the server's choice.
    pub async fn handshake(mut stream: S) -> BoltResult<Self> {
        stream.write_all(&client_handshake()).await?;
        stream.flush().await?;

        let mut answer = [0u8; HANDSHAKE_RESPONSE_SIZE];
        stream.read_exact(&mut answer).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => BoltError::ConnectionClosed,
            _ => BoltError::Io(e),
        })?;
        let version = negotiated_version(answer)?;

        Ok(Self {
            stream,
            codec: BoltClientCodec::new(),
            read_buffer: BytesMut::with_capacity(8192),
            write_buffer: BytesMut::with_capacity(8192),
            version,
        })
    }

    pub fn version(&self) -> BoltVersion {
        self.version
    }

    /// Write one request and flush.
    pub async fn send(&mut self, request: BoltRequest) -> BoltResult<()> {
        self.send_all([request]).await
    }

    /// Write several requests in a single flush; responses arrive in order.
    pub async fn send_all<I>(&mut self, requests: I) -> BoltResult<()>
    where
        I: IntoIterator<Item = BoltRequest>,
    {
        self.write_buffer.clear();
        for request in requests {
            tracing::trace!(message = request.name(), "C: request");
            self.codec.encode(request, &mut self.write_buffer)?;
        }
        self.stream.write_all(&self.write_buffer).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read the next response.
    pub async fn recv(&mut self) -> BoltResult<BoltResponse> {
        loop {
            if let Some(response) = self.codec.decode(&mut self.read_buffer)? {
                tracing::trace!(message = response.name(), "S: response");
                return Ok(response);
            }
            if self.stream.read_buf(&mut self.read_buffer).await? == 0 {
                return Err(BoltError::ConnectionClosed);
            }
        }
    }

    /// Shut the write half down. Errors are irrelevant at this point.
    pub async fn shutdown(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}

impl<S> std::fmt::Debug for BoltConnection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoltConnection")
            .field("version", &self.version)
            .field("buffered", &self.read_buffer.len())
            .finish()
    }
}
