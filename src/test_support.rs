//! Helpers shared by the unit tests.

use std::{
    io::Write,
    net::SocketAddr,
    path::Path,
    sync::{Arc, Mutex},
};

use flate2::{write::GzEncoder, Compression};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

use crate::{
    db::{Session, Store},
    error::{Error, Result},
    observation::{Element, Observation},
};

/// Serves one canned HTTP/1.1 response on a local port, then closes.
pub async fn serve_once(status: &str, body: Vec<u8>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let status = status.to_string();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        // Drain the request head so closing the socket doesn't reset the connection.
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let head = format!(
            "HTTP/1.1 {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            status,
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&body).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    addr
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn gzip(content: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

pub fn write_gzip(path: &Path, content: &str) {
    std::fs::write(path, gzip(content)).unwrap();
}

/// `n` TMAX observations for one station, with distinct, sortable dates.
pub fn observations(n: usize) -> Vec<Observation> {
    (0..n)
        .map(|i| Observation {
            station_id: "USW00003017".to_string(),
            date: format!("2010{:04}", i),
            element: Element::Tmax,
            value: (i as i32 - 50).to_string(),
            m_flag: None,
            q_flag: None,
            s_flag: None,
            obs_time: Some("0700".to_string()),
        })
        .collect()
}

#[derive(Debug, Default, Clone)]
pub struct StoreLog {
    pub opened: usize,
    pub insert_attempts: usize,
    pub batches: Vec<Vec<Observation>>,
    pub post_loads: usize,
    pub committed: usize,
}

/// Records what a loader does instead of talking to a database.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    log: Arc<Mutex<StoreLog>>,
    fail_insert_at: Option<usize>,
    fail_post_load: bool,
}

impl MemoryStore {
    /// Fails the insert attempt with this zero-based index, counted across sessions.
    pub fn failing_insert_at(batch: usize) -> Self {
        MemoryStore {
            fail_insert_at: Some(batch),
            ..Default::default()
        }
    }

    pub fn failing_post_load() -> Self {
        MemoryStore {
            fail_post_load: true,
            ..Default::default()
        }
    }

    pub fn log(&self) -> StoreLog {
        self.log.lock().unwrap().clone()
    }
}

pub struct MemorySession {
    store: MemoryStore,
}

impl Store for MemoryStore {
    type Session = MemorySession;

    async fn open(&self) -> Result<MemorySession> {
        self.log.lock().unwrap().opened += 1;
        Ok(MemorySession {
            store: self.clone(),
        })
    }
}

impl Session for MemorySession {
    async fn insert_batch(&mut self, batch: &[Observation]) -> Result<()> {
        let mut log = self.store.log.lock().unwrap();
        let attempt = log.insert_attempts;
        log.insert_attempts += 1;
        if self.store.fail_insert_at == Some(attempt) {
            return Err(Error::Load("insert rejected".to_string()));
        }
        log.batches.push(batch.to_vec());
        Ok(())
    }

    async fn post_load(&mut self) -> Result<()> {
        if self.store.fail_post_load {
            return Err(Error::Load("procedure failed".to_string()));
        }
        self.store.log.lock().unwrap().post_loads += 1;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.store.log.lock().unwrap().committed += 1;
        Ok(())
    }
}
