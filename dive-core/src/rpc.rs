// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! JSON-RPC client for a headless Delve server.
//!
//! Delve speaks JSON-RPC 1.0 over a plain TCP stream: one JSON object per
//! request, each carrying an `id` that the reply echoes. Calls from many
//! workers run concurrently over the one connection, so a connection actor
//! owns the socket and matches replies to callers by id.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::api::*;
use crate::error::RpcError;
use crate::service::DebuggerService;

type Reply = oneshot::Sender<Result<Value, RpcError>>;

/// Request sent to the connection actor
struct RpcRequest {
    method: String,
    params: Value,
    reply: Reply,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    method: &'a str,
    params: [&'a Value; 1],
    id: u64,
}

#[derive(Deserialize)]
struct WireResponse {
    id: u64,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Value,
}

/// Owns the socket; runs in its own task
struct ConnectionActor<R, W> {
    lines: Lines<BufReader<R>>,
    writer: W,
    receiver: mpsc::Receiver<RpcRequest>,
    pending: HashMap<u64, Reply>,
    next_id: u64,
}

impl<R, W> ConnectionActor<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn spawn(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    request = self.receiver.recv() => match request {
                        Some(request) => self.send(request).await,
                        None => break,
                    },
                    line = self.lines.next_line() => match line {
                        Ok(Some(line)) => self.handle_response(&line),
                        Ok(None) => {
                            info!("debugger closed the connection");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "failed reading from debugger");
                            break;
                        }
                    },
                }
            }
            for (_, reply) in self.pending.drain() {
                let _ = reply.send(Err(RpcError::Disconnected));
            }
        })
    }

    async fn send(&mut self, request: RpcRequest) {
        let id = self.next_id;
        self.next_id += 1;
        let wire = WireRequest {
            method: &request.method,
            params: [&request.params],
            id,
        };
        let mut bytes = match serde_json::to_vec(&wire) {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = request.reply.send(Err(e.into()));
                return;
            }
        };
        bytes.push(b'\n');
        debug!(id, method = %request.method, "rpc call");
        if let Err(e) = self.write(&bytes).await {
            let _ = request.reply.send(Err(e.into()));
            return;
        }
        self.pending.insert(id, request.reply);
    }

    async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await
    }

    fn handle_response(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let response: WireResponse = match serde_json::from_str(line) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "malformed reply from debugger");
                return;
            }
        };
        let Some(reply) = self.pending.remove(&response.id) else {
            warn!(id = response.id, "reply for unknown request");
            return;
        };
        let result = match response.error {
            Value::Null => Ok(response.result),
            Value::String(message) => Err(RpcError::Remote(message)),
            other => Err(RpcError::Remote(other.to_string())),
        };
        let _ = reply.send(result);
    }
}

/// Handle to a Delve server. Cheap to clone; all clones share the connection.
#[derive(Clone)]
pub struct DelveClient {
    sender: mpsc::Sender<RpcRequest>,
}

impl DelveClient {
    pub async fn connect(addr: &str) -> Result<Self, RpcError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        info!(addr, "connected to debugger");
        Ok(Self::from_stream(reader, writer))
    }

    /// Keep trying to connect until `timeout` elapses. A freshly spawned
    /// server needs a moment before it listens.
    pub async fn connect_with_retry(
        addr: &str,
        interval: Duration,
        timeout: Duration,
    ) -> Result<Self, RpcError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match Self::connect(addr).await {
                Ok(client) => return Ok(client),
                Err(e) if tokio::time::Instant::now() + interval < deadline => {
                    debug!(addr, error = %e, "retrying connection");
                    tokio::time::sleep(interval).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn from_stream<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(64);
        ConnectionActor {
            lines: BufReader::new(reader).lines(),
            writer,
            receiver,
            pending: HashMap::new(),
            next_id: 0,
        }
        .spawn();
        Self { sender }
    }

    async fn call<P, T>(&self, method: &str, params: P) -> Result<T, RpcError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = RpcRequest {
            method: format!("RPCServer.{method}"),
            params: serde_json::to_value(params)?,
            reply: reply_tx,
        };
        self.sender
            .send(request)
            .await
            .map_err(|_| RpcError::Disconnected)?;
        let value = reply_rx.await.map_err(|_| RpcError::Disconnected)??;
        Ok(serde_json::from_value(value)?)
    }

    async fn command(
        &self,
        name: &'static str,
        goroutine_id: Option<i64>,
    ) -> Result<DebuggerState, RpcError> {
        let out: CommandOut = self
            .call("Command", DebuggerCommand { name, goroutine_id })
            .await?;
        Ok(out.state)
    }
}

#[async_trait]
impl DebuggerService for DelveClient {
    async fn create_breakpoint(&self, breakpoint: Breakpoint) -> Result<Breakpoint, RpcError> {
        let out: CreateBreakpointOut = self
            .call("CreateBreakpoint", CreateBreakpointIn { breakpoint })
            .await?;
        Ok(out.breakpoint)
    }

    async fn clear_breakpoint(&self, id: i64) -> Result<Breakpoint, RpcError> {
        let out: ClearBreakpointOut = self
            .call(
                "ClearBreakpoint",
                ClearBreakpointIn {
                    id,
                    name: String::new(),
                },
            )
            .await?;
        out.breakpoint
            .ok_or_else(|| RpcError::UnexpectedResponse(format!("no breakpoint with id {id}")))
    }

    async fn amend_breakpoint(&self, breakpoint: Breakpoint) -> Result<(), RpcError> {
        let _: Value = self
            .call("AmendBreakpoint", AmendBreakpointIn { breakpoint })
            .await?;
        Ok(())
    }

    async fn list_breakpoints(&self, all: bool) -> Result<Vec<Breakpoint>, RpcError> {
        let out: ListBreakpointsOut = self
            .call("ListBreakpoints", ListBreakpointsIn { all })
            .await?;
        Ok(out.breakpoints)
    }

    async fn continue_execution(&self) -> Result<DebuggerState, RpcError> {
        self.command("continue", None).await
    }

    async fn next(&self) -> Result<DebuggerState, RpcError> {
        self.command("next", None).await
    }

    async fn step(&self) -> Result<DebuggerState, RpcError> {
        self.command("step", None).await
    }

    async fn step_out(&self) -> Result<DebuggerState, RpcError> {
        self.command("stepOut", None).await
    }

    async fn restart(&self) -> Result<(), RpcError> {
        let _: Value = self
            .call(
                "Restart",
                RestartIn {
                    position: String::new(),
                    reset_args: false,
                    new_args: Vec::new(),
                    rerecord: false,
                    rebuild: false,
                },
            )
            .await?;
        Ok(())
    }

    async fn switch_goroutine(&self, id: i64) -> Result<DebuggerState, RpcError> {
        self.command("switchGoroutine", Some(id)).await
    }

    async fn list_goroutines(&self, start: i64, count: i64) -> Result<Vec<Goroutine>, RpcError> {
        let out: ListGoroutinesOut = self
            .call("ListGoroutines", ListGoroutinesIn { start, count })
            .await?;
        Ok(out.goroutines)
    }

    async fn stacktrace(
        &self,
        goroutine_id: i64,
        depth: i64,
        kind: StacktraceKind,
        load: Option<LoadConfig>,
    ) -> Result<Vec<Stackframe>, RpcError> {
        let out: StacktraceOut = self
            .call(
                "Stacktrace",
                StacktraceIn {
                    id: goroutine_id,
                    depth,
                    full: load.is_some(),
                    defers: false,
                    opts: kind.bits(),
                    cfg: load,
                },
            )
            .await?;
        Ok(out.locations)
    }

    async fn list_sources(&self, filter: &str) -> Result<Vec<String>, RpcError> {
        let out: ListSourcesOut = self
            .call(
                "ListSources",
                ListSourcesIn {
                    filter: filter.to_string(),
                },
            )
            .await?;
        Ok(out.sources)
    }

    async fn detach(&self, kill: bool) -> Result<(), RpcError> {
        let _: Value = self.call("Detach", DetachIn { kill }).await?;
        Ok(())
    }
}
