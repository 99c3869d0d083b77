// Minimal HTTP/1.1 server for exercising the real transport on localhost.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What the server does with one incoming request.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    /// 200 with a body of this many bytes
    Body(usize),
    /// Empty response with this status code
    Status(u16),
    /// Headers promising a body that never arrives
    Stall,
    /// Headers for this many bytes, then half of them and a closed socket
    Truncated(usize),
}

/// Serves one connection per reply, in order, then stops accepting.
pub async fn spawn_server(replies: Vec<Reply>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        for reply in replies {
            let (socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            tokio::spawn(async move {
                let _ = handle(socket, reply).await;
            });
        }
    });

    addr
}

/// Returns an address with nothing listening on it.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn url(addr: SocketAddr) -> String {
    format!("http://{}/payload.bin", addr)
}

async fn read_request(socket: &mut TcpStream) -> io::Result<()> {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&chunk[..n]);
        if request.windows(4).any(|w| w == b"\r\n\r\n") {
            return Ok(());
        }
    }
}

fn headers(status: u16, reason: &str, content_length: usize) -> String {
    format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
        status, reason, content_length
    )
}

async fn handle(mut socket: TcpStream, reply: Reply) -> io::Result<()> {
    read_request(&mut socket).await?;

    match reply {
        Reply::Body(len) => {
            socket.write_all(headers(200, "OK", len).as_bytes()).await?;
            socket.write_all(&vec![0xAB; len]).await?;
        }
        Reply::Status(code) => {
            socket.write_all(headers(code, "Error", 0).as_bytes()).await?;
        }
        Reply::Stall => {
            socket.write_all(headers(200, "OK", 1_000_000).as_bytes()).await?;
            socket.flush().await?;
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Reply::Truncated(len) => {
            socket.write_all(headers(200, "OK", len).as_bytes()).await?;
            socket.write_all(&vec![0xCD; len / 2]).await?;
        }
    }

    socket.flush().await?;
    socket.shutdown().await
}
