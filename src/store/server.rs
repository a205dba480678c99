//! RESP server over a `MemoryStore`, one task per client.

use super::command::StoreCommand;
use super::MemoryStore;
use crate::redis::{RespParser, RespValue};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

pub struct MemoryServer {
    store: MemoryStore,
}

impl MemoryServer {
    pub fn new(store: MemoryStore) -> Self {
        MemoryServer { store }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Bind `addr` and serve until the process exits.
    pub async fn run(self, addr: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("counter store listening on {}", listener.local_addr()?);
        self.serve(listener).await
    }

    /// Accept clients on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let handler = ConnectionHandler::new(stream, self.store.clone(), addr.to_string());
                    tokio::spawn(handler.run());
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

struct ConnectionHandler {
    stream: TcpStream,
    store: MemoryStore,
    buffer: BytesMut,
    client_addr: String,
}

impl ConnectionHandler {
    fn new(stream: TcpStream, store: MemoryStore, client_addr: String) -> Self {
        ConnectionHandler {
            stream,
            store,
            buffer: BytesMut::with_capacity(4096),
            client_addr,
        }
    }

    async fn run(mut self) {
        debug!("Client connected: {}", self.client_addr);
        let mut read_buf = vec![0u8; 4096];
        let mut out = BytesMut::with_capacity(4096);

        loop {
            match self.stream.read(&mut read_buf).await {
                Ok(0) => {
                    debug!("Client disconnected: {}", self.client_addr);
                    break;
                }
                Ok(n) => {
                    self.buffer.extend_from_slice(&read_buf[..n]);

                    // Answer every complete frame in one write, so a
                    // pipelined batch costs one round trip.
                    let keep_open = self.drain_frames(&mut out);
                    if !out.is_empty() {
                        if let Err(e) = self.stream.write_all(&out).await {
                            error!("Failed to write response to {}: {}", self.client_addr, e);
                            break;
                        }
                        out.clear();
                    }
                    if !keep_open {
                        break;
                    }
                }
                Err(e) => {
                    error!("Error reading from client {}: {}", self.client_addr, e);
                    break;
                }
            }
        }
    }

    /// Execute buffered frames, appending replies to `out`. Returns false
    /// when the stream is unparseable and the connection must close.
    fn drain_frames(&mut self, out: &mut BytesMut) -> bool {
        loop {
            match RespParser::parse_buf(&mut self.buffer) {
                Ok(Some(request)) => {
                    let response = match StoreCommand::from_resp(&request) {
                        Ok(cmd) => {
                            debug!(command = cmd.name(), client = %self.client_addr, "request");
                            self.store.apply(&cmd)
                        }
                        Err(msg) => RespValue::err(msg),
                    };
                    RespParser::encode_into(&response, out);
                }
                Ok(None) => return true,
                Err(e) => {
                    warn!("Protocol error from {}: {}", self.client_addr, e);
                    let error = RespValue::err(format!("ERR Protocol error: {}", e));
                    RespParser::encode_into(&error, out);
                    return false;
                }
            }
        }
    }
}
