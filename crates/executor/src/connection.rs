//! Subprocess RPC peer connection.

use dashmap::DashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{oneshot, Mutex};

use switchboard_core::{types::ServiceDescriptor, Error, Result};

use crate::rpc::{RpcRequest, RpcResponse};

/// Lifecycle of one subprocess channel.
///
/// `NotStarted → Starting → Ready → (InFlight)* → Ready → Closed`, with
/// `Starting → Failed` on spawn error (reported as an `Err` from `spawn`)
/// and `Ready|InFlight → Failed` on unexpected stream closure. A `Failed`
/// connection is discarded by its owner; it is never written to again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    NotStarted,
    Starting,
    Ready,
    InFlight,
    Failed,
    Closed,
}

#[derive(Default)]
struct Health {
    failed: AtomicBool,
    closed: AtomicBool,
}

/// A live RPC channel to one service subprocess.
///
/// Requests share stdin behind a lock; a dedicated reader task owns stdout
/// and routes each response to its pending request by id, so interleaved
/// responses from concurrent calls resolve correctly.
pub struct ServiceConnection {
    service_id: String,
    stdin: Mutex<ChildStdin>,
    child: Mutex<Child>,
    pending: Arc<DashMap<u64, oneshot::Sender<RpcResponse>>>,
    next_id: AtomicU64,
    health: Arc<Health>,
}

impl ServiceConnection {
    /// Spawn the service process and start its reader tasks.
    pub async fn spawn(service: &ServiceDescriptor) -> Result<Arc<Self>> {
        tracing::info!(
            service = %service.service_id,
            command = %service.command,
            "Starting service process"
        );

        let mut cmd = Command::new(&service.command);
        cmd.args(&service.args)
            .envs(&service.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &service.working_directory {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            Error::transport(
                &service.service_id,
                format!("failed to spawn '{}': {}", service.command, e),
            )
        })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            Error::transport(&service.service_id, "failed to capture child stdin")
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            Error::transport(&service.service_id, "failed to capture child stdout")
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            Error::transport(&service.service_id, "failed to capture child stderr")
        })?;

        let pending: Arc<DashMap<u64, oneshot::Sender<RpcResponse>>> = Arc::new(DashMap::new());
        let health = Arc::new(Health::default());

        // Reader task: owns stdout for the life of the connection.
        {
            let service_id = service.service_id.clone();
            let pending = pending.clone();
            let health = health.clone();
            tokio::spawn(async move {
                read_loop(service_id, stdout, pending, health).await;
            });
        }

        // Drain stderr so the child never blocks on a full pipe.
        {
            let service_id = service.service_id.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(service = %service_id, line = %line, "service stderr");
                }
            });
        }

        Ok(Arc::new(Self {
            service_id: service.service_id.clone(),
            stdin: Mutex::new(stdin),
            child: Mutex::new(child),
            pending,
            next_id: AtomicU64::new(1),
            health,
        }))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        if self.health.closed.load(Ordering::SeqCst) {
            ConnectionState::Closed
        } else if self.health.failed.load(Ordering::SeqCst) {
            ConnectionState::Failed
        } else if !self.pending.is_empty() {
            ConnectionState::InFlight
        } else {
            ConnectionState::Ready
        }
    }

    /// Whether the channel can carry another request.
    pub fn usable(&self) -> bool {
        !matches!(self.state(), ConnectionState::Failed | ConnectionState::Closed)
    }

    /// Requests currently awaiting a response.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Send one request and await its correlated response.
    pub async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
        deadline: Duration,
    ) -> Result<RpcResponse> {
        if !self.usable() {
            return Err(Error::transport(
                &self.service_id,
                format!("connection is {:?}", self.state()),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        let frame = match serde_json::to_string(&RpcRequest {
            id,
            method: method.to_string(),
            params,
        }) {
            Ok(frame) => frame,
            Err(e) => {
                self.pending.remove(&id);
                return Err(Error::Serialization(e));
            }
        };

        if let Err(e) = self.write_frame(&frame).await {
            self.pending.remove(&id);
            self.health.failed.store(true, Ordering::SeqCst);
            return Err(e);
        }

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(Error::transport(
                &self.service_id,
                "connection closed while awaiting response",
            )),
            Err(_) => {
                // The peer may still answer later; the reader will find no
                // pending entry and drop the frame.
                self.pending.remove(&id);
                Err(Error::ExecutionTimeout(self.service_id.clone()))
            }
        }
    }

    async fn write_frame(&self, frame: &str) -> Result<()> {
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(frame.as_bytes()).await.map_err(|e| {
            Error::transport(&self.service_id, format!("stdin write failed: {}", e))
        })?;
        stdin.write_all(b"\n").await.map_err(|e| {
            Error::transport(&self.service_id, format!("stdin write failed: {}", e))
        })?;
        stdin.flush().await.map_err(|e| {
            Error::transport(&self.service_id, format!("stdin flush failed: {}", e))
        })?;
        Ok(())
    }

    /// Close the channel and reap the child process.
    pub async fn close(&self) {
        self.health.closed.store(true, Ordering::SeqCst);
        {
            let mut stdin = self.stdin.lock().await;
            let _ = stdin.shutdown().await;
        }
        let mut child = self.child.lock().await;
        let _ = child.kill().await;
        tracing::debug!(service = %self.service_id, "Connection closed");
    }
}

/// Route responses to pending requests until the stream closes.
async fn read_loop(
    service_id: String,
    stdout: tokio::process::ChildStdout,
    pending: Arc<DashMap<u64, oneshot::Sender<RpcResponse>>>,
    health: Arc<Health>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<RpcResponse>(trimmed) {
                    Ok(response) => {
                        let Some(id) = response.id else {
                            tracing::warn!(service = %service_id, "Response frame without id, dropping");
                            continue;
                        };
                        match pending.remove(&id) {
                            Some((_, tx)) => {
                                let _ = tx.send(response);
                            }
                            None => {
                                tracing::warn!(
                                    service = %service_id,
                                    id,
                                    "Response with no pending request, dropping"
                                );
                            }
                        }
                    }
                    Err(_) => {
                        // Services sometimes log to stdout; skip non-frames.
                        tracing::debug!(service = %service_id, line = %trimmed, "Skipping non-frame output");
                    }
                }
            }
            Ok(None) => {
                tracing::warn!(service = %service_id, "Service closed stdout");
                break;
            }
            Err(e) => {
                tracing::warn!(service = %service_id, error = %e, "Error reading from service");
                break;
            }
        }
    }
    health.failed.store(true, Ordering::SeqCst);
    // Dropping the senders resolves every waiter with a transport error.
    pending.clear();
}
