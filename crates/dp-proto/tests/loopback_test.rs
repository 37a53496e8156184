//! Integration test: run a client and a server session against each other
//! over UDP loopback and check payloads and sequence numbers on both ends.

use std::net::{Ipv4Addr, SocketAddr};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver};

use dp_proto::{Error, Received, Session, SessionConfig, SessionState, MAX_PAYLOAD};

/// What the server thread observed, with its sequence number at that point.
#[derive(Debug)]
enum ServerEvent {
    Connected(u32),
    Chunk(Vec<u8>, u32),
    Closed(u32),
}

fn config() -> SessionConfig {
    SessionConfig::default().with_read_timeout(Duration::from_secs(5))
}

/// Bind a server session, then listen and receive until the client closes.
fn start_server() -> (SocketAddr, Receiver<ServerEvent>, thread::JoinHandle<()>) {
    let mut server = Session::bind((Ipv4Addr::LOCALHOST, 0).into(), config()).unwrap();
    let addr = server.local_addr().unwrap();
    let (tx, rx) = bounded::<ServerEvent>(64);

    let handle = thread::spawn(move || {
        server.listen().expect("listen failed");
        tx.send(ServerEvent::Connected(server.sequence())).unwrap();

        let mut buf = [0u8; MAX_PAYLOAD];
        loop {
            match server.recv(&mut buf).expect("recv failed") {
                Received::Data(n) => {
                    tx.send(ServerEvent::Chunk(buf[..n].to_vec(), server.sequence()))
                        .unwrap();
                }
                Received::Closed => {
                    assert_eq!(server.state(), SessionState::Closed);
                    tx.send(ServerEvent::Closed(server.sequence())).unwrap();
                    return;
                }
            }
        }
    });

    (addr, rx, handle)
}

fn connect(addr: SocketAddr, events: &Receiver<ServerEvent>) -> Session {
    let mut client = Session::client(addr, config()).unwrap();
    client.connect().unwrap();
    match events.recv_timeout(Duration::from_secs(5)).unwrap() {
        ServerEvent::Connected(seq) => assert_eq!(seq, client.sequence()),
        other => panic!("expected Connected, got {:?}", other),
    }
    client
}

/// Send one chunk and return what the server received.
fn send_chunk(client: &mut Session, events: &Receiver<ServerEvent>, chunk: &[u8]) -> Vec<u8> {
    let before = client.sequence();
    assert_eq!(client.send(chunk).unwrap(), chunk.len());
    let step = if chunk.is_empty() { 1 } else { chunk.len() as u32 };
    assert_eq!(client.sequence(), before + step);

    match events.recv_timeout(Duration::from_secs(5)).unwrap() {
        ServerEvent::Chunk(data, seq) => {
            assert_eq!(seq, client.sequence(), "sequence numbers diverged");
            data
        }
        other => panic!("expected Chunk, got {:?}", other),
    }
}

fn finish(mut client: Session, events: &Receiver<ServerEvent>, server: thread::JoinHandle<()>) {
    client.disconnect().unwrap();
    assert_eq!(client.state(), SessionState::Closed);
    match events.recv_timeout(Duration::from_secs(5)).unwrap() {
        ServerEvent::Closed(seq) => assert_eq!(seq, client.sequence()),
        other => panic!("expected Closed, got {:?}", other),
    }
    server.join().expect("server panicked");
}

#[test]
fn three_chunks_then_close() {
    let (addr, events, server) = start_server();
    let mut client = connect(addr, &events);

    let chunks: Vec<Vec<u8>> = (0..3u8)
        .map(|c| (0..10u8).map(|i| c * 10 + i).collect())
        .collect();

    let mut received = Vec::new();
    for chunk in &chunks {
        let data = send_chunk(&mut client, &events, chunk);
        assert_eq!(data.len(), 10);
        received.extend_from_slice(&data);
    }
    assert_eq!(received, chunks.concat());
    assert_eq!(client.stats().payload_bytes_sent, 30);

    finish(client, &events, server);
}

#[test]
fn max_payload_boundary() {
    let (addr, events, server) = start_server();
    let mut client = connect(addr, &events);

    let full: Vec<u8> = (0..MAX_PAYLOAD).map(|i| (i % 251) as u8).collect();
    assert_eq!(send_chunk(&mut client, &events, &full), full);

    let before = client.sequence();
    let too_big = vec![0u8; MAX_PAYLOAD + 1];
    assert!(matches!(
        client.send(&too_big),
        Err(Error::BufferOversized { len }) if len == MAX_PAYLOAD + 1
    ));
    assert_eq!(client.sequence(), before);
    assert!(client.is_connected());

    finish(client, &events, server);
}

#[test]
fn zero_length_send_advances_by_one() {
    let (addr, events, server) = start_server();
    let mut client = connect(addr, &events);

    let data = send_chunk(&mut client, &events, &[]);
    assert!(data.is_empty());

    // Data still flows after a control-only SEND
    assert_eq!(send_chunk(&mut client, &events, b"after"), b"after");

    finish(client, &events, server);
}
