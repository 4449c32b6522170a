//! TCP transport driver.
//!
//! # Responsibilities
//! - Dial a destination address, or adopt an already-open socket
//! - Pump socket bytes into transport events and outbound ciphertext onto
//!   the socket
//! - Surface connect/read/write failures as transport error events

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::{Transport, TransportHandle};

const READ_BUF_SIZE: usize = 16 * 1024;

/// Dial `host:port` on a background task and return the session-side end.
pub(super) fn connect(host: String, port: u16) -> Transport {
    let (transport, handle) = Transport::channel();

    tokio::spawn(async move {
        match TcpStream::connect((host.as_str(), port)).await {
            Ok(stream) => {
                tracing::debug!(host = %host, port, "transport connected");
                if handle.open() {
                    run(stream, handle).await;
                }
            }
            Err(e) => {
                tracing::debug!(host = %host, port, error = %e, "transport connect failed");
                handle.error(e.to_string());
            }
        }
    });

    transport
}

/// Adopt an already-open socket.
pub(super) fn from_stream(stream: TcpStream) -> Transport {
    let (transport, handle) = Transport::channel();
    handle.open();
    tokio::spawn(run(stream, handle));
    transport
}

/// Pump loop: socket reads become events, outbound chunks become writes.
async fn run(stream: TcpStream, mut handle: TransportHandle) {
    let (mut reader, mut writer) = stream.into_split();
    let mut buf = vec![0u8; READ_BUF_SIZE];

    loop {
        tokio::select! {
            chunk = handle.next_outbound() => match chunk {
                Some(bytes) => {
                    if let Err(e) = writer.write_all(&bytes).await {
                        handle.error(e.to_string());
                        break;
                    }
                }
                // Session dropped its end: nothing more to send.
                None => {
                    let _ = writer.shutdown().await;
                    break;
                }
            },
            read = reader.read(&mut buf) => match read {
                Ok(0) => {
                    handle.close();
                    break;
                }
                Ok(n) => {
                    if !handle.deliver(buf[..n].to_vec()) {
                        break;
                    }
                }
                Err(e) => {
                    handle.error(e.to_string());
                    break;
                }
            },
        }
    }
}
