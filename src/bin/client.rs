//! Interactive client for edge-echo.
//!
//! Sends every whitespace-separated word read from stdin and prints what the
//! server sends back. `--echo-mode` and `--buffer-size` must match the
//! server's so the client knows how long each reply is.

use clap::Parser;
use edge_echo::net::{ConnectionHandle, Endpoint};
use edge_echo::runtime::EchoMode;
use edge_echo::Error;
use std::io::{self, BufRead};
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "edge-echo-client")]
#[command(version = "0.1.0")]
#[command(about = "Line client for the edge-echo server", long_about = None)]
struct ClientArgs {
    /// Server address
    #[arg(short = 'a', long, default_value = "127.0.0.1:8888")]
    connect: String,

    /// Read buffer size in bytes, same as the server's
    #[arg(short = 'b', long, default_value_t = 1024)]
    buffer_size: usize,

    /// Echo mode the server runs in
    #[arg(short = 'e', long, value_enum, default_value = "exact")]
    echo_mode: EchoMode,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = ClientArgs::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Client failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &ClientArgs) -> edge_echo::Result<()> {
    let endpoint = Endpoint::parse(&args.connect)?;
    let mut conn = ConnectionHandle::connect_to(&endpoint)?;
    debug!(server = %endpoint, fd = conn.raw_fd(), mode = ?args.echo_mode, "Connected");

    let buffer_size = args.buffer_size.max(1);
    let mut buf = vec![0u8; buffer_size];
    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line.map_err(Error::Io)?;
        for word in line.split_whitespace() {
            if let Err(e) = send_all(&mut conn, word.as_bytes()) {
                println!("socket already disconnected, can't write any more!");
                return Err(e);
            }

            let want = expected_reply_len(args.echo_mode, word.len(), buffer_size);
            match receive(&mut conn, &mut buf, want)? {
                Some(reply) => {
                    let text = String::from_utf8_lossy(&reply);
                    println!("message from server: {}", text.replace('\0', ""));
                }
                None => {
                    println!("server socket disconnected");
                    return Ok(());
                }
            }
        }
    }
    Ok(())
}

/// Bytes the server sends back for a word of `len` bytes. In padded mode
/// every server read of up to `buffer_size` bytes is zero-filled to
/// `buffer_size`.
fn expected_reply_len(mode: EchoMode, len: usize, buffer_size: usize) -> usize {
    match mode {
        EchoMode::Exact => len,
        EchoMode::Padded => len.div_ceil(buffer_size) * buffer_size,
    }
}

fn send_all(conn: &mut ConnectionHandle, mut data: &[u8]) -> edge_echo::Result<()> {
    while !data.is_empty() {
        match conn.write(data) {
            Ok(0) => return Err(Error::Io(io::ErrorKind::WriteZero.into())),
            Ok(n) => data = &data[n..],
            Err(Error::Interrupted) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Read exactly `want` bytes, through `buf` as many times as needed.
/// Returns `None` if the server closed the connection first.
fn receive(
    conn: &mut ConnectionHandle,
    buf: &mut [u8],
    want: usize,
) -> edge_echo::Result<Option<Vec<u8>>> {
    let mut reply = Vec::with_capacity(want);
    while reply.len() < want {
        let limit = (want - reply.len()).min(buf.len());
        match conn.read(&mut buf[..limit]) {
            Ok(0) => return Ok(None),
            Ok(n) => reply.extend_from_slice(&buf[..n]),
            Err(Error::Interrupted) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(Some(reply))
}
