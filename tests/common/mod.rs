//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Handle to a running mock control plane.
pub struct MockPlatform {
    body: Arc<Mutex<String>>,
}

impl MockPlatform {
    /// Swap the policy-set JSON served to the next fetch.
    pub fn set_body(&self, body: impl Into<String>) {
        *self.body.lock().unwrap() = body.into();
    }
}

/// Start a mock control plane serving the given policy-set JSON on every
/// request.
pub async fn start_mock_platform(addr: SocketAddr, initial: &str) -> MockPlatform {
    let body = Arc::new(Mutex::new(initial.to_string()));
    let served = body.clone();

    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let served = served.clone();
                    tokio::spawn(async move {
                        // Drain the request head so the client sees a
                        // clean exchange.
                        let mut buf = [0u8; 2048];
                        let _ = socket.read(&mut buf).await;

                        let payload = served.lock().unwrap().clone();
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            payload.len(),
                            payload
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockPlatform { body }
}
