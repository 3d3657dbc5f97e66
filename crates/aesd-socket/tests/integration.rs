//! End-to-end tests over real TCP connections

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use aesd_log::{SharedLog, StoreConfig};
use aesd_socket::{Server, ServerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

struct Running {
    addr: SocketAddr,
    log: SharedLog,
    shutdown: CancellationToken,
    handle: JoinHandle<aesd_socket::ServerResult<usize>>,
}

impl Running {
    async fn start(capacity: usize) -> Self {
        let config = ServerConfig::default()
            .with_bind_addr(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .with_timestamp_interval_secs(0)
            .with_store(StoreConfig::with_capacity(capacity));
        let server = Server::bind(config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let log = server.log().clone();
        let shutdown = server.shutdown_token();
        let handle = tokio::spawn(server.run_until(std::future::pending()));
        Self {
            addr,
            log,
            shutdown,
            handle,
        }
    }

    async fn stop(self) -> usize {
        self.shutdown.cancel();
        self.handle.await.unwrap().unwrap()
    }
}

async fn send_and_expect(stream: &mut TcpStream, packet: &[u8], expected: &[u8]) {
    stream.write_all(packet).await.unwrap();
    let mut reply = vec![0u8; expected.len()];
    timeout(IO_TIMEOUT, stream.read_exact(&mut reply))
        .await
        .expect("reply timed out")
        .unwrap();
    assert_eq!(
        String::from_utf8_lossy(&reply),
        String::from_utf8_lossy(expected)
    );
}

#[tokio::test]
async fn test_packets_echo_whole_log() {
    let server = Running::start(10).await;
    let mut client = TcpStream::connect(server.addr).await.unwrap();

    send_and_expect(&mut client, b"swrite1\n", b"swrite1\n").await;
    send_and_expect(&mut client, b"swrite2\n", b"swrite1\nswrite2\n").await;

    assert_eq!(server.stop().await, 2);
}

#[tokio::test]
async fn test_log_persists_across_connections() {
    let server = Running::start(10).await;

    let mut first = TcpStream::connect(server.addr).await.unwrap();
    send_and_expect(&mut first, b"from first\n", b"from first\n").await;
    drop(first);

    let mut second = TcpStream::connect(server.addr).await.unwrap();
    send_and_expect(
        &mut second,
        b"from second\n",
        b"from first\nfrom second\n",
    )
    .await;

    server.stop().await;
}

#[tokio::test]
async fn test_packet_split_across_sends() {
    let server = Running::start(10).await;
    let mut client = TcpStream::connect(server.addr).await.unwrap();

    client.write_all(b"split ").await.unwrap();
    client.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    send_and_expect(&mut client, b"packet\n", b"split packet\n").await;

    server.stop().await;
}

#[tokio::test]
async fn test_oldest_command_evicted() {
    let server = Running::start(3).await;
    let mut client = TcpStream::connect(server.addr).await.unwrap();

    send_and_expect(&mut client, b"1\n", b"1\n").await;
    send_and_expect(&mut client, b"2\n", b"1\n2\n").await;
    send_and_expect(&mut client, b"3\n", b"1\n2\n3\n").await;
    send_and_expect(&mut client, b"4\n", b"2\n3\n4\n").await;

    assert_eq!(server.stop().await, 3);
}

#[tokio::test]
async fn test_seek_command() {
    let server = Running::start(10).await;
    let mut client = TcpStream::connect(server.addr).await.unwrap();

    send_and_expect(&mut client, b"write1\n", b"write1\n").await;
    send_and_expect(&mut client, b"write2\n", b"write1\nwrite2\n").await;
    send_and_expect(&mut client, b"write3\n", b"write1\nwrite2\nwrite3\n").await;

    send_and_expect(&mut client, b"AESDCHAR_IOCSEEKTO:1,3\n", b"te2\nwrite3\n").await;
    send_and_expect(&mut client, b"AESDCHAR_IOCSEEKTO:2,0\n", b"write3\n").await;

    // Rejected seeks are answered with nothing
    let mut probe = TcpStream::connect(server.addr).await.unwrap();
    probe.write_all(b"AESDCHAR_IOCSEEKTO:9,0\n").await.unwrap();
    probe.shutdown().await.unwrap();
    let mut reply = Vec::new();
    timeout(IO_TIMEOUT, probe.read_to_end(&mut reply))
        .await
        .expect("close timed out")
        .unwrap();
    assert!(reply.is_empty());

    send_and_expect(
        &mut client,
        b"write4\n",
        b"write1\nwrite2\nwrite3\nwrite4\n",
    )
    .await;

    assert_eq!(server.stop().await, 4);
}

#[tokio::test]
async fn test_unterminated_tail_is_discarded() {
    let server = Running::start(10).await;

    let mut client = TcpStream::connect(server.addr).await.unwrap();
    client.write_all(b"never finished").await.unwrap();
    client.shutdown().await.unwrap();
    let mut rest = Vec::new();
    timeout(IO_TIMEOUT, client.read_to_end(&mut rest))
        .await
        .expect("close timed out")
        .unwrap();
    assert!(rest.is_empty());

    let mut other = TcpStream::connect(server.addr).await.unwrap();
    send_and_expect(&mut other, b"done\n", b"done\n").await;

    assert_eq!(server.stop().await, 1);
}

#[tokio::test]
async fn test_concurrent_clients_store_whole_packets() {
    const CLIENTS: usize = 8;
    let server = Running::start(CLIENTS).await;

    let mut tasks = Vec::new();
    for id in 0..CLIENTS {
        let addr = server.addr;
        tasks.push(tokio::spawn(async move {
            let mut client = TcpStream::connect(addr).await.unwrap();
            let packet = format!("client-{id}-{}\n", "x".repeat(64));
            for byte in packet.as_bytes().chunks(7) {
                client.write_all(byte).await.unwrap();
                tokio::task::yield_now().await;
            }
            let mut buf = vec![0u8; 4096];
            let n = timeout(IO_TIMEOUT, client.read(&mut buf))
                .await
                .expect("reply timed out")
                .unwrap();
            assert!(n > 0);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let mut stored: Vec<String> = server
        .log
        .snapshot()
        .iter()
        .map(|entry| String::from_utf8(entry.as_slice().to_vec()).unwrap())
        .collect();
    stored.sort();
    for (id, record) in stored.iter().enumerate() {
        assert_eq!(record, &format!("client-{id}-{}\n", "x".repeat(64)));
    }

    assert_eq!(server.stop().await, CLIENTS);
}
