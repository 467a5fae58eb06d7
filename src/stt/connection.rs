use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::protocol::frame::{decode_payload, encode_frame, FrameAccumulator};
use crate::protocol::message::{ClientMessage, ServiceMessage};

/// Handshake status the service reports when a connection opens.
///
/// The fields describe the service's load posture. They are surfaced for
/// the caller's benefit; nothing in this client gates admission on them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceStatus {
    pub max_utilization: f64,
    pub can_overload: bool,
}

/// Timeouts applied at every suspension point on the connection.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionTimeouts {
    pub connect: Duration,
    pub io: Duration,
}

impl Default for ConnectionTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            io: Duration::from_secs(30),
        }
    }
}

/// A framed duplex stream to the transcription service.
///
/// The protocol is strictly sequential: one in-flight session at a time,
/// and nothing else may read or write the underlying stream. Generic over
/// the stream type so tests can drive it with an in-memory duplex.
#[derive(Debug)]
pub struct Connection<S> {
    stream: S,
    acc: FrameAccumulator,
    timeouts: ConnectionTimeouts,
}

impl Connection<TcpStream> {
    /// Open a TCP connection and wait for the service's
    /// `StatusConnectionOpen` handshake.
    pub async fn connect(
        host: &str,
        port: u16,
        timeouts: ConnectionTimeouts,
    ) -> Result<(Self, ServiceStatus)> {
        let addr = format!("{host}:{port}");
        info!("connecting to transcription service at {addr}");

        let stream = timeout(timeouts.connect, TcpStream::connect(&addr))
            .await
            .map_err(|_| Error::Connect(format!("timed out connecting to {addr}")))?
            .map_err(|e| Error::Connect(format!("{addr}: {e}")))?;
        stream.set_nodelay(true)?;

        // No session exists yet, so a dead or silent service here is a
        // connect failure rather than a mid-session I/O failure.
        Self::handshake(stream, timeouts).await.map_err(|e| match e {
            Error::Io(e) => Error::Connect(format!("{addr}: handshake failed: {e}")),
            other => other,
        })
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Perform the handshake on an already-open byte stream.
    pub async fn handshake(stream: S, timeouts: ConnectionTimeouts) -> Result<(Self, ServiceStatus)> {
        let mut conn = Self {
            stream,
            acc: FrameAccumulator::new(),
            timeouts,
        };
        match conn.receive().await? {
            ServiceMessage::StatusConnectionOpen {
                max_utilization,
                can_overload,
            } => {
                info!(max_utilization, can_overload, "transcription service ready");
                Ok((
                    conn,
                    ServiceStatus {
                        max_utilization,
                        can_overload,
                    },
                ))
            }
            other => Err(Error::Protocol(format!(
                "expected StatusConnectionOpen handshake, got {other:?}"
            ))),
        }
    }

    /// Encode a message and write the whole frame.
    pub async fn send(&mut self, message: &ClientMessage) -> Result<()> {
        let frame = encode_frame(message)?;
        timeout(self.timeouts.io, self.stream.write_all(&frame))
            .await
            .map_err(|_| Error::Io(timed_out("write")))??;
        Ok(())
    }

    /// Read until one complete frame is available, then decode it.
    ///
    /// The frame header and payload may arrive split across any number of
    /// reads; leftover bytes past the frame boundary are kept for the next
    /// call. A magic mismatch makes the connection unusable.
    pub async fn receive(&mut self) -> Result<ServiceMessage> {
        loop {
            if let Some(payload) = self.acc.next_payload()? {
                let message = decode_payload(&payload)?;
                debug!(?message, "received");
                return Ok(message);
            }

            let mut chunk = [0u8; 4096];
            let n = timeout(self.timeouts.io, self.stream.read(&mut chunk))
                .await
                .map_err(|_| Error::Io(timed_out("read")))??;
            if n == 0 {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "service closed the connection mid-frame",
                )));
            }
            self.acc.extend(&chunk[..n]);
        }
    }

    /// Close the write side of the stream. Safe to call repeatedly; errors
    /// from an already-closed peer are ignored.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!("error closing connection: {e}");
        }
    }
}

fn timed_out(op: &str) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, format!("{op} timed out"))
}
