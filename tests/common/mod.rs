//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use twofa_throttle::config::ThrottleConfig;
use twofa_throttle::store::{KvStore, MemoryStore, StoreError, StoreResult};
use twofa_throttle::{HttpServer, Shutdown};

/// Request head (request line and headers, lowercase) as the origin saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub head: String,
}

#[allow(dead_code)]
impl SeenRequest {
    pub fn has_header(&self, name: &str) -> bool {
        self.head
            .lines()
            .any(|line| line.starts_with(&format!("{}:", name.to_ascii_lowercase())))
    }

    pub fn path(&self) -> &str {
        self.head.split_whitespace().nth(1).unwrap_or("")
    }
}

/// Start a programmable mock origin on an ephemeral port.
///
/// `f` gets each request head and returns the status and body to answer with.
pub async fn start_programmable_origin<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(SeenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 1024];
                        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut chunk).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                            }
                        }
                        let head = String::from_utf8_lossy(&buf).to_ascii_lowercase();

                        let (status, body) = f(SeenRequest { head }).await;
                        let response_str = format!(
                            "HTTP/1.1 {} Mock\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Mock origin answering every request with `status`, counting calls.
#[allow(dead_code)]
pub async fn start_counting_origin(status: u16) -> (SocketAddr, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let addr = start_programmable_origin(move |_| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            (status, "{}".to_string())
        }
    })
    .await;
    (addr, calls)
}

/// Store wrapper whose reads can be slowed down or broken at will.
#[derive(Clone, Default)]
pub struct ScriptedStore {
    pub inner: MemoryStore,
    read_delay_ms: Arc<AtomicU32>,
    failing: Arc<AtomicBool>,
    pub writes: Arc<AtomicU32>,
}

#[allow(dead_code)]
impl ScriptedStore {
    pub fn set_read_delay(&self, delay: Duration) {
        self.read_delay_ms.store(delay.as_millis() as u32, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvStore for ScriptedStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let delay = self.read_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(u64::from(delay))).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("scripted failure".into()));
        }
        self.inner.get(key).await
    }

    fn put_no_wait(&self, key: &str, value: Value) -> StoreResult<()> {
        self.inner.put_no_wait(key, value)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}

/// A throttle serving on an ephemeral port.
pub struct RunningThrottle {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    #[allow(dead_code)]
    pub updates: mpsc::UnboundedSender<ThrottleConfig>,
}

#[allow(dead_code)]
impl RunningThrottle {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningThrottle {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config forwarding to `origin` with everything else at defaults.
pub fn config_for(origin: SocketAddr) -> ThrottleConfig {
    let mut config = ThrottleConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.address = origin.to_string();
    config.observability.metrics_enabled = false;
    config
}

pub async fn start_throttle(config: ThrottleConfig, store: Arc<dyn KvStore>) -> RunningThrottle {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let (updates, update_rx) = mpsc::unbounded_channel();

    let server = HttpServer::new(config, store);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, update_rx, rx).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    RunningThrottle { addr, shutdown, updates }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Let spawned store writes land.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
