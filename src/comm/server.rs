use crate::comm::config::CommConfig;
use crate::comm::error::{CommError, Result};
use crate::comm::protocol::{
    decode_message, encode_response, initialize_result, tool_call_result, tools_list_result,
};
use crate::comm::types::{
    CallToolParams, CancelledParams, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    JsonRpcMessage, JsonRpcResponse, METHOD_NOT_FOUND,
};
use crate::executor::{ExecutorError, ToolRegistry};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// In-flight `tools/call` tasks keyed by the serialized request id
type InFlight = Arc<Mutex<HashMap<String, JoinHandle<()>>>>;

/// Outcome of reading one inbound line
#[derive(Debug, PartialEq, Eq)]
enum LineRead {
    Eof,
    Line,
    /// The line exceeded the limit and was skipped; carries its full length
    TooLong(usize),
}

/// Read one `\n`-terminated line into `buf`, buffering at most `max` bytes of it.
///
/// An oversized line is consumed up to and including its newline without
/// being kept, so the stream stays in sync for the next message.
async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>, max: usize) -> std::io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    let limit = u64::try_from(max).unwrap_or(u64::MAX).saturating_add(1);
    let n = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if n == 0 {
        return Ok(LineRead::Eof);
    }
    if n <= max || buf.last() == Some(&b'\n') {
        return Ok(LineRead::Line);
    }

    buf.clear();
    let mut total = n;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            break;
        }
        match available.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                total += pos + 1;
                break;
            }
            None => {
                let len = available.len();
                reader.consume(len);
                total += len;
            }
        }
    }
    Ok(LineRead::TooLong(total))
}

/// Comm server - serves tool calls over a line-delimited JSON-RPC stream
pub struct Comm {
    config: CommConfig,
    registry: Arc<ToolRegistry>,
    in_flight: InFlight,
}

impl Comm {
    pub fn new(config: CommConfig, registry: Arc<ToolRegistry>) -> Self {
        Self {
            config,
            registry,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Serve until `reader` hits EOF or fails.
    ///
    /// Each `tools/call` runs on its own task; responses funnel through one
    /// writer task so lines never interleave. On EOF the calls still running
    /// are allowed to finish (they are bounded by the executor timeout) and
    /// their responses are flushed before returning. If this future is dropped
    /// instead, the runtime drops the call tasks and their process groups are
    /// killed.
    pub async fn run<R, W>(self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Vec<u8>>(self.config.outbound_capacity);
        let writer_handle = tokio::spawn(write_loop(writer, rx));

        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();

        info!(server = %self.config.server_name, "comm serving on stdio");

        let outcome = loop {
            line.clear();
            match read_line(&mut reader, &mut line, self.config.max_line_bytes).await {
                Ok(LineRead::Eof) => {
                    info!("input closed");
                    break Ok(());
                }
                Ok(LineRead::TooLong(n)) => {
                    warn!(bytes = n, "inbound line too large");
                    let response = JsonRpcResponse::failure(
                        Value::Null,
                        INVALID_REQUEST,
                        CommError::LineTooLong(n).to_string(),
                    );
                    if let Err(e) = send(&tx, &response).await {
                        break Err(e);
                    }
                }
                Ok(LineRead::Line) => {
                    let text = String::from_utf8_lossy(&line);
                    let text = text.trim();
                    if text.is_empty() {
                        continue;
                    }

                    if let Err(e) = self.handle_line(text, &tx).await {
                        break Err(e);
                    }
                }
                Err(e) => {
                    error!(error = %e, "read error");
                    break Err(CommError::Read(e.to_string()));
                }
            }
        };

        self.drain_in_flight().await;
        drop(tx);

        match writer_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "writer stopped with error"),
            Err(e) => warn!(error = %e, "writer task failed"),
        }

        outcome
    }

    async fn handle_line(&self, text: &str, tx: &mpsc::Sender<Vec<u8>>) -> Result<()> {
        let message = match decode_message(text) {
            Ok(message) => message,
            Err(response) => {
                warn!("rejecting malformed message");
                return send(tx, &response).await;
            }
        };

        debug!(method = %message.method, id = ?message.id, "received message");

        let Some(id) = message.id.clone() else {
            self.handle_notification(message).await;
            return Ok(());
        };

        let response = match message.method.as_str() {
            "initialize" => {
                let requested = message
                    .params
                    .as_ref()
                    .and_then(|p| p.get("protocolVersion"))
                    .and_then(Value::as_str)
                    .unwrap_or(self.config.protocol_version.as_str());
                JsonRpcResponse::success(
                    id,
                    initialize_result(
                        requested,
                        &self.config.server_name,
                        &self.config.server_version,
                    ),
                )
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => {
                JsonRpcResponse::success(id, tools_list_result(&self.registry.tool_definitions()))
            }
            "tools/call" => return self.spawn_tool_call(id, message.params, tx).await,
            other => JsonRpcResponse::failure(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        };

        send(tx, &response).await
    }

    async fn handle_notification(&self, message: JsonRpcMessage) {
        match message.method.as_str() {
            "notifications/initialized" => debug!("client initialized"),
            "notifications/cancelled" => {
                let params = message
                    .params
                    .map(serde_json::from_value::<CancelledParams>)
                    .transpose();
                match params {
                    Ok(Some(params)) => {
                        let key = params.request_id.to_string();
                        if let Some(handle) = self.in_flight.lock().await.remove(&key) {
                            info!(
                                request_id = %key,
                                reason = params.reason.as_deref().unwrap_or(""),
                                "cancelling tool call"
                            );
                            handle.abort();
                        } else {
                            debug!(request_id = %key, "cancel for unknown or finished request");
                        }
                    }
                    Ok(None) => warn!("cancel notification without params"),
                    Err(e) => warn!(error = %e, "invalid cancel notification"),
                }
            }
            other => debug!(method = %other, "ignoring notification"),
        }
    }

    async fn spawn_tool_call(
        &self,
        id: Value,
        params: Option<Value>,
        tx: &mpsc::Sender<Vec<u8>>,
    ) -> Result<()> {
        let params = match params.map(serde_json::from_value::<CallToolParams>) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                let response =
                    JsonRpcResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {e}"));
                return send(tx, &response).await;
            }
            None => {
                let response = JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing params");
                return send(tx, &response).await;
            }
        };

        let key = id.to_string();

        // Held across spawn + insert so the task cannot remove its entry first.
        let mut in_flight = self.in_flight.lock().await;
        if in_flight.contains_key(&key) {
            drop(in_flight);
            let response = JsonRpcResponse::failure(
                id,
                INVALID_REQUEST,
                format!("Request id {key} is already in flight"),
            );
            return send(tx, &response).await;
        }

        let registry = Arc::clone(&self.registry);
        let table = Arc::clone(&self.in_flight);
        let tx = tx.clone();
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            let arguments = params.arguments.unwrap_or_else(|| json!({}));
            let response = match registry.call(&params.name, arguments).await {
                Ok(output) => JsonRpcResponse::success(id, tool_call_result(&output)),
                Err(e @ (ExecutorError::UnknownTool(_) | ExecutorError::InvalidInput(..))) => {
                    JsonRpcResponse::failure(id, INVALID_PARAMS, e.to_string())
                }
                Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
            };

            table.lock().await.remove(&task_key);

            if let Err(e) = send(&tx, &response).await {
                warn!(request_id = %task_key, error = %e, "failed to queue response");
            }
        });

        in_flight.insert(key, handle);
        Ok(())
    }

    /// Wait for every call still running.
    async fn drain_in_flight(&self) {
        let pending: Vec<_> = self.in_flight.lock().await.drain().collect();
        if pending.is_empty() {
            return;
        }
        info!(count = pending.len(), "waiting for in-flight tool calls");
        for (key, handle) in pending {
            if let Err(e) = handle.await
                && !e.is_cancelled()
            {
                warn!(request_id = %key, error = %e, "tool call task failed");
            }
        }
    }
}

async fn send(tx: &mpsc::Sender<Vec<u8>>, response: &JsonRpcResponse) -> Result<()> {
    let bytes = encode_response(response)?;
    tx.send(bytes).await.map_err(|_| CommError::ChannelClosed)
}

async fn write_loop<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut rx: mpsc::Receiver<Vec<u8>>,
) -> Result<()> {
    while let Some(bytes) = rx.recv().await {
        writer
            .write_all(&bytes)
            .await
            .map_err(|e| CommError::Write(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| CommError::Write(e.to_string()))?;
    }
    Ok(())
}
