use remex::net::{TcpListener, TcpStream};
use remex::{spawn, Error, RuntimeBuilder};
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Eleven bytes in, the same eleven bytes back.
#[test]
fn echo_roundtrip() {
    let rt = RuntimeBuilder::new().worker_threads(2).build();

    rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = std::thread::spawn(move || {
            let mut socket = std::net::TcpStream::connect(addr).unwrap();
            socket.write_all(b"hello world").unwrap();

            let mut echoed = [0u8; 11];
            socket.read_exact(&mut echoed).unwrap();
            echoed
        });

        let (stream, _) = listener.accept().await.unwrap();

        let mut buf = [0u8; 11];
        let mut filled = 0;
        while filled < buf.len() {
            let n = stream.read(&mut buf[filled..]).await.unwrap();
            assert_ne!(n, 0, "peer closed before sending all bytes");
            filled += n;
        }

        stream.write_all(&buf).await.unwrap();

        let echoed = client.join().unwrap();
        assert_eq!(&echoed, b"hello world");
    })
    .unwrap();
}

#[remex::test]
async fn connect_reaches_a_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        stream.write_all(b"ping").await.unwrap();
    });

    let stream = TcpStream::connect(addr).await.unwrap();

    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..]).await.unwrap();
        assert_ne!(n, 0);
        filled += n;
    }

    assert_eq!(&buf, b"ping");
    server.await;
}

/// A second task waiting for the same direction of the same stream must
/// observe `Busy` while the first parker stays installed. The inline
/// flavor makes the interleaving deterministic: the blocked future parks
/// first, the spawned task polls second.
#[test]
fn second_reader_observes_busy() {
    let rt = RuntimeBuilder::inline().build();

    rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = std::thread::spawn(move || {
            let mut socket = std::net::TcpStream::connect(addr).unwrap();

            // Give both readers time to race for the slot, then release
            // the first one.
            std::thread::sleep(Duration::from_millis(200));
            socket.write_all(b"x").unwrap();

            let mut done = [0u8; 1];
            socket.read_exact(&mut done).unwrap();
        });

        let (stream, _) = listener.accept().await.unwrap();
        let stream = Arc::new(stream);

        let busy = Arc::new(Mutex::new(false));

        let contender = {
            let stream = stream.clone();
            let busy = busy.clone();
            spawn(async move {
                let mut buf = [0u8; 1];
                match stream.read(&mut buf).await {
                    Err(Error::Busy) => *busy.lock().unwrap() = true,
                    other => panic!("expected Busy, got {other:?}"),
                }
            })
        };

        // Parks in the read slot before the contender runs.
        let mut buf = [0u8; 1];
        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(n, 1);
        assert_eq!(&buf, b"x");

        contender.await;
        assert!(
            *busy.lock().unwrap(),
            "the second reader must have been turned away"
        );

        stream.write_all(b"k").await.unwrap();

        client.join().unwrap();
    })
    .unwrap();
}

#[remex::test]
async fn read_returns_zero_on_peer_close() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let client = std::thread::spawn(move || {
        let socket = std::net::TcpStream::connect(addr).unwrap();
        drop(socket);
    });

    let (stream, _) = listener.accept().await.unwrap();

    let mut buf = [0u8; 16];
    let n = stream.read(&mut buf).await.unwrap();
    assert_eq!(n, 0);

    client.join().unwrap();
}
