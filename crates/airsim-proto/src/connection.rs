use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Result, SimError};
use crate::frame::{read_message, write_message};
use crate::types::{value_as_str, value_as_u32};

/// msgpack-rpc message type tags.
pub const REQUEST: u8 = 0;
pub const RESPONSE: u8 = 1;
pub const NOTIFICATION: u8 = 2;

/// Calls that never answer are abandoned after an hour, like the stock AirSim client.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// A msgpack-rpc connection to an AirSim server.
///
/// Handles message decoding over the TCP stream and request/response
/// correlation via msgpack-rpc message ids.
pub struct Connection {
    reader: Mutex<(ReadHalf<TcpStream>, BytesMut)>,
    writer: Mutex<WriteHalf<TcpStream>>,
    msg_id: AtomicU32,
    timeout: Duration,
    /// Calls awaiting a response, keyed by message id. A slot holds the
    /// response once another caller has read it off the wire.
    pending: Mutex<HashMap<u32, Option<Reply>>>,
}

/// The payload of a received response: the result, or the server's error text.
type Reply = std::result::Result<rmpv::Value, String>;

impl Connection {
    /// Establish a TCP connection to the AirSim RPC server.
    pub async fn open(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let addr = format!("{host}:{port}");
        info!("Connecting to AirSim at {addr}");
        let stream = TcpStream::connect(&addr).await?;
        let conn = Self::from_stream(stream, timeout)?;
        info!("TCP connection to AirSim established");
        Ok(conn)
    }

    /// Wrap an already-connected TCP stream.
    pub fn from_stream(stream: TcpStream, timeout: Duration) -> Result<Self> {
        stream.set_nodelay(true)?;
        let (reader, writer) = tokio::io::split(stream);
        Ok(Self {
            reader: Mutex::new((reader, BytesMut::new())),
            writer: Mutex::new(writer),
            msg_id: AtomicU32::new(0),
            timeout,
            pending: Mutex::new(HashMap::new()),
        })
    }

    /// Allocate the next message id.
    fn next_id(&self) -> u32 {
        self.msg_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Call a remote method and wait for its result.
    ///
    /// Fails with [`SimError::Timeout`] if no response arrives within the
    /// connection timeout, and with [`SimError::Rpc`] if the server reports an error.
    /// Several calls may be in flight at once; each gets its own response.
    pub async fn call(&self, method: &str, params: Vec<rmpv::Value>) -> Result<rmpv::Value> {
        let msg_id = self.next_id();
        self.pending.lock().await.insert(msg_id, None);

        let received = match self.send_request(msg_id, method, params).await {
            Ok(()) => match tokio::time::timeout(self.timeout, self.recv(msg_id)).await {
                Ok(received) => received,
                Err(_) => Err(SimError::Timeout(format!(
                    "no response to {method} within {:?}",
                    self.timeout
                ))),
            },
            Err(e) => Err(e),
        };

        // A response arriving after this point has nobody waiting and is dropped.
        self.pending.lock().await.remove(&msg_id);

        received?.map_err(|message| SimError::Rpc {
            method: method.into(),
            message,
        })
    }

    async fn send_request(&self, msg_id: u32, method: &str, params: Vec<rmpv::Value>) -> Result<()> {
        let msg = rmpv::Value::Array(vec![
            rmpv::Value::from(REQUEST),
            rmpv::Value::from(msg_id),
            rmpv::Value::from(method),
            rmpv::Value::Array(params),
        ]);
        debug!("Sending {method} (id={msg_id})");

        let mut writer = self.writer.lock().await;
        write_message(&mut *writer, &msg).await
    }

    /// Wait for the response with the given message id.
    ///
    /// The reader stays locked for the whole wait. Responses for other pending
    /// calls are parked in their slot; the owner finds them once it gets the reader.
    async fn recv(&self, msg_id: u32) -> Result<Reply> {
        let mut guard = self.reader.lock().await;

        if let Some(reply) = self
            .pending
            .lock()
            .await
            .get_mut(&msg_id)
            .and_then(Option::take)
        {
            return Ok(reply);
        }

        let (reader, buf) = &mut *guard;
        loop {
            let value = read_message(reader, buf).await?;
            debug!("Received: {value}");
            let Some((id, reply)) = Self::parse_response(value)? else {
                continue;
            };

            if id == msg_id {
                return Ok(reply);
            }
            match self.pending.lock().await.get_mut(&id) {
                Some(slot) => *slot = Some(reply),
                None => warn!("Dropping response {id}: no call is waiting for it"),
            }
        }
    }

    /// Split a `[1, msgid, error, result]` response into its id and outcome.
    ///
    /// Server notifications are logged and skipped (`Ok(None)`).
    fn parse_response(value: rmpv::Value) -> Result<Option<(u32, Reply)>> {
        let mut parts = match value {
            rmpv::Value::Array(parts) => parts,
            other => {
                return Err(SimError::InvalidMessage(format!(
                    "expected an array, got {other}"
                )))
            }
        };

        match parts.first().and_then(rmpv::Value::as_u64) {
            Some(t) if t == u64::from(RESPONSE) && parts.len() == 4 => {}
            Some(t) if t == u64::from(NOTIFICATION) => {
                warn!("Ignoring server notification: {:?}", parts.get(1));
                return Ok(None);
            }
            _ => {
                return Err(SimError::InvalidMessage(format!(
                    "not a msgpack-rpc response: {}",
                    rmpv::Value::Array(parts)
                )))
            }
        }

        let result = parts.pop().unwrap_or(rmpv::Value::Nil);
        let error = parts.pop().unwrap_or(rmpv::Value::Nil);
        let id = parts
            .pop()
            .as_ref()
            .and_then(value_as_u32)
            .ok_or_else(|| SimError::InvalidMessage("response without a valid msgid".into()))?;

        let reply = if error.is_nil() {
            Ok(result)
        } else {
            Err(error_message(&error))
        };
        Ok(Some((id, reply)))
    }
}

/// Render a server error object as text.
///
/// rpclib sends a plain string for most failures, but other servers wrap it in an array.
fn error_message(error: &rmpv::Value) -> String {
    if let Some(s) = value_as_str(error) {
        return s.to_string();
    }
    match error {
        rmpv::Value::Array(items) => items
            .iter()
            .map(|v| value_as_str(v).map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(": "),
        other => other.to_string(),
    }
}
