use thiserror::Error;

/// Errors that can occur when talking to an AirSim RPC server.
#[derive(Debug, Error)]
pub enum SimError {
    /// The server answered a call with a non-nil error object.
    #[error("RPC error in {method}: {message}")]
    Rpc { method: String, message: String },

    /// The connection to the simulator was lost or not established.
    #[error("Disconnected: {0}")]
    Disconnected(String),

    /// A message that is not a well-formed msgpack-rpc response,
    /// or a result of the wrong type.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Control values that cannot be sent to the vehicle.
    #[error("Invalid controls: {0}")]
    InvalidControls(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// MessagePack encoding error.
    #[error("Msgpack encode error: {0}")]
    MsgpackEncode(#[from] rmp_serde::encode::Error),

    /// MessagePack decoding error.
    #[error("Msgpack decode error: {0}")]
    MsgpackDecode(#[from] rmp_serde::decode::Error),

    /// Timeout waiting for a response.
    #[error("Timeout: {0}")]
    Timeout(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
