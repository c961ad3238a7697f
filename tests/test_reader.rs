use std::time::Duration;

use lantern::http::reader::{ReadError, RequestReader};
use tokio::io::AsyncWriteExt;

fn reader() -> RequestReader {
    RequestReader::new(Duration::from_secs(2), 16 * 1024)
}

#[tokio::test]
async fn test_reads_head_in_one_packet() {
    let (mut client, mut server) = tokio::io::duplex(4096);
    client.write_all(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n").await.unwrap();

    let buf = reader().read(&mut server).await.unwrap().unwrap();

    assert_eq!(&buf[..], b"GET / HTTP/1.1\r\nHost: a\r\n\r\n");
}

#[tokio::test]
async fn test_reassembles_head_split_across_writes() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    let sender = tokio::spawn(async move {
        let parts: [&[u8]; 4] = [b"GET /index", b".html HTTP/1.1\r", b"\nHost: a\r\n\r", b"\n"];
        for part in parts {
            client.write_all(part).await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        client
    });

    let buf = reader().read(&mut server).await.unwrap().unwrap();
    assert_eq!(&buf[..], b"GET /index.html HTTP/1.1\r\nHost: a\r\n\r\n");
    drop(sender.await.unwrap());
}

#[tokio::test]
async fn test_reads_heads_larger_than_one_chunk() {
    let (mut client, mut server) = tokio::io::duplex(8192);
    let mut head = b"GET / HTTP/1.1\r\n".to_vec();
    head.extend_from_slice(format!("X-Filler: {}\r\n\r\n", "a".repeat(3000)).as_bytes());
    client.write_all(&head).await.unwrap();

    let buf = reader().read(&mut server).await.unwrap().unwrap();

    assert_eq!(buf.len(), head.len());
}

#[tokio::test]
async fn test_accepts_bare_newline_terminator() {
    let (mut client, mut server) = tokio::io::duplex(4096);
    client.write_all(b"GET / HTTP/1.1\n\n").await.unwrap();

    let buf = reader().read(&mut server).await.unwrap().unwrap();

    assert_eq!(&buf[..], b"GET / HTTP/1.1\n\n");
}

#[tokio::test]
async fn test_peer_close_without_data() {
    let (client, mut server) = tokio::io::duplex(4096);
    drop(client);

    assert!(reader().read(&mut server).await.unwrap().is_none());
}

#[tokio::test]
async fn test_peer_close_mid_head_returns_partial_buffer() {
    let (mut client, mut server) = tokio::io::duplex(4096);
    client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
    drop(client);

    let buf = reader().read(&mut server).await.unwrap().unwrap();

    assert_eq!(&buf[..], b"GET / HTTP/1.1\r\n");
}

#[tokio::test]
async fn test_idle_client_times_out() {
    let (mut client, mut server) = tokio::io::duplex(4096);
    client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();

    let mut reader = RequestReader::new(Duration::from_millis(50), 16 * 1024);
    let result = reader.read(&mut server).await;

    assert!(matches!(result, Err(ReadError::Timeout)));
    drop(client);
}

#[tokio::test]
async fn test_oversized_head_is_rejected() {
    let (mut client, mut server) = tokio::io::duplex(64 * 1024);
    let junk = vec![b'a'; 8 * 1024];
    client.write_all(&junk).await.unwrap();

    let mut reader = RequestReader::new(Duration::from_secs(2), 4 * 1024);
    let result = reader.read(&mut server).await;

    assert!(matches!(result, Err(ReadError::HeadTooLarge)));
}
