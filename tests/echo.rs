use edge_echo::net::{ConnectionHandle, Endpoint};
use edge_echo::runtime::{EchoHandler, EchoMode, Reactor, ReactorOptions};
use edge_echo::Error;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;

/// Start an echo reactor on an ephemeral loopback port. The reactor thread is
/// left running until the test process exits.
fn spawn_server(mode: EchoMode, buffer_size: usize) -> SocketAddr {
    let listener =
        ConnectionHandle::bind_listener(&Endpoint::new("127.0.0.1", 0).expect("endpoint"), None)
            .expect("bind listener");
    let options = ReactorOptions {
        buffer_size,
        ..ReactorOptions::default()
    };
    let mut reactor =
        Reactor::new(listener, EchoHandler::new(mode, buffer_size), options).expect("reactor");
    let addr = SocketAddr::from(reactor.local_endpoint().expect("local addr"));

    thread::spawn(move || {
        let _ = reactor.run();
    });
    addr
}

fn client(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout");
    stream
}

#[test]
fn echo_ping_exact() {
    let addr = spawn_server(EchoMode::Exact, 1024);
    let mut c = client(addr);

    c.write_all(b"ping").expect("write");
    let mut buf = [0u8; 4];
    c.read_exact(&mut buf).expect("read_exact");
    assert_eq!(&buf, b"ping");

    // Nothing beyond the four bytes
    c.set_read_timeout(Some(Duration::from_millis(100))).unwrap();
    let mut extra = [0u8; 1];
    assert!(c.read(&mut extra).is_err());
}

#[test]
fn echo_ping_padded() {
    let addr = spawn_server(EchoMode::Padded, 64);
    let mut c = client(addr);

    c.write_all(b"ping").expect("write");
    let mut buf = [0xffu8; 64];
    c.read_exact(&mut buf).expect("read_exact");
    assert_eq!(&buf[..4], b"ping");
    assert!(buf[4..].iter().all(|&b| b == 0));
}

#[test]
fn echo_large_payload_through_small_buffer() {
    let addr = spawn_server(EchoMode::Exact, 16);
    let mut c = client(addr);

    let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    c.write_all(&payload).expect("write");
    let mut back = vec![0u8; payload.len()];
    c.read_exact(&mut back).expect("read_exact");
    assert_eq!(back, payload);
}

#[test]
fn clients_are_isolated() {
    let addr = spawn_server(EchoMode::Exact, 1024);
    let mut a = client(addr);
    let mut b = client(addr);

    for round in 0..10 {
        let msg_a = format!("alpha-{round}");
        let msg_b = format!("bravo-{round}");
        a.write_all(msg_a.as_bytes()).unwrap();
        b.write_all(msg_b.as_bytes()).unwrap();

        let mut got_a = vec![0u8; msg_a.len()];
        let mut got_b = vec![0u8; msg_b.len()];
        a.read_exact(&mut got_a).unwrap();
        b.read_exact(&mut got_b).unwrap();
        assert_eq!(got_a, msg_a.as_bytes());
        assert_eq!(got_b, msg_b.as_bytes());
    }
}

#[test]
fn disconnect_leaves_others_running() {
    let addr = spawn_server(EchoMode::Exact, 1024);
    let mut stay = client(addr);
    let mut leave = client(addr);

    leave.write_all(b"bye").unwrap();
    let mut buf = [0u8; 3];
    leave.read_exact(&mut buf).unwrap();
    drop(leave);

    thread::sleep(Duration::from_millis(50));

    stay.write_all(b"still here").unwrap();
    let mut buf = [0u8; 10];
    stay.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"still here");

    // Listener keeps accepting
    let mut late = client(addr);
    late.write_all(b"late").unwrap();
    let mut buf = [0u8; 4];
    late.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"late");
}

#[test]
fn connect_to_closed_port_fails() {
    let listener =
        ConnectionHandle::bind_listener(&Endpoint::new("127.0.0.1", 0).unwrap(), None).unwrap();
    let endpoint = listener.local_endpoint().unwrap();
    drop(listener);

    match ConnectionHandle::connect_to(&endpoint) {
        Err(Error::Connect(target, _)) => assert_eq!(target, endpoint),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("connect unexpectedly succeeded"),
    }
}

#[test]
fn client_handle_round_trip() {
    let addr = spawn_server(EchoMode::Exact, 1024);
    let endpoint = match addr {
        SocketAddr::V4(v4) => Endpoint::from(v4),
        SocketAddr::V6(_) => unreachable!("bound to IPv4 loopback"),
    };

    let mut conn = ConnectionHandle::connect_to(&endpoint).unwrap();
    assert_eq!(conn.write(b"hello").unwrap(), 5);

    let mut buf = [0u8; 5];
    let mut filled = 0;
    while filled < buf.len() {
        let n = conn.read(&mut buf[filled..]).unwrap();
        assert!(n > 0, "server closed early");
        filled += n;
    }
    assert_eq!(&buf, b"hello");
}
