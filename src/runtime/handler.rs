//! Read handlers invoked by the reactor for every drained chunk.

use crate::error::{Error, Result};
use crate::net::ConnectionHandle;
use serde::Deserialize;
use tracing::{trace, warn};

/// Receives each chunk read from a ready connection.
///
/// Called synchronously from the reactor thread, once per successful read,
/// with the connection the bytes came from. Returning an error closes that
/// connection only.
pub trait ReadHandler {
    fn on_read(&mut self, conn: &mut ConnectionHandle, data: &[u8]) -> Result<()>;
}

impl<F> ReadHandler for F
where
    F: FnMut(&mut ConnectionHandle, &[u8]) -> Result<()>,
{
    fn on_read(&mut self, conn: &mut ConnectionHandle, data: &[u8]) -> Result<()> {
        self(conn, data)
    }
}

/// What the echo handler sends back for a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EchoMode {
    /// Exactly the bytes read.
    #[default]
    Exact,
    /// The bytes read, zero-filled up to the read buffer size.
    Padded,
}

/// Writes every chunk straight back to its sender.
#[derive(Debug, Clone)]
pub struct EchoHandler {
    mode: EchoMode,
    buffer_size: usize,
}

impl EchoHandler {
    pub fn new(mode: EchoMode, buffer_size: usize) -> Self {
        Self { mode, buffer_size }
    }
}

impl ReadHandler for EchoHandler {
    fn on_read(&mut self, conn: &mut ConnectionHandle, data: &[u8]) -> Result<()> {
        match self.mode {
            EchoMode::Exact => write_back(conn, data),
            EchoMode::Padded => {
                let mut padded = vec![0u8; self.buffer_size.max(data.len())];
                padded[..data.len()].copy_from_slice(data);
                write_back(conn, &padded)
            }
        }
    }
}

/// Write all of `data`, retrying interrupted calls. There is no write
/// buffering: if the socket send buffer fills up the rest is discarded.
fn write_back(conn: &mut ConnectionHandle, data: &[u8]) -> Result<()> {
    let mut written = 0;
    while written < data.len() {
        match conn.write(&data[written..]) {
            Ok(0) => {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "write returned 0",
                )))
            }
            Ok(n) => written += n,
            Err(Error::Interrupted) => continue,
            Err(Error::WouldBlock) => {
                warn!(
                    fd = conn.raw_fd(),
                    dropped = data.len() - written,
                    "Send buffer full, dropping echo remainder"
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }
    trace!(fd = conn.raw_fd(), bytes = written, "Echoed");
    Ok(())
}
