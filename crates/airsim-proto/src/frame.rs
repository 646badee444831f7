use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Result, SimError};

const READ_CHUNK: usize = 4096;

/// Read one complete msgpack value from the reader.
///
/// msgpack-rpc has no length prefix: values are self-delimiting, so bytes are
/// accumulated in `buf` until a whole value decodes. Leftover bytes stay in
/// `buf` for the next call.
pub async fn read_message<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    buf: &mut BytesMut,
) -> Result<rmpv::Value> {
    loop {
        if let Some(value) = try_decode(buf)? {
            return Ok(value);
        }

        buf.reserve(READ_CHUNK);
        let n = reader.read_buf(buf).await?;
        if n == 0 {
            let why = if buf.is_empty() {
                "Connection closed by server"
            } else {
                "Connection closed in the middle of a message"
            };
            return Err(SimError::Disconnected(why.into()));
        }
    }
}

/// Try to decode one value from the front of `buf`.
///
/// Returns `Ok(None)` when `buf` holds only part of a value.
pub fn try_decode(buf: &mut BytesMut) -> Result<Option<rmpv::Value>> {
    if buf.is_empty() {
        return Ok(None);
    }

    let mut cursor = std::io::Cursor::new(&buf[..]);
    match rmpv::decode::read_value(&mut cursor) {
        Ok(value) => {
            let used = cursor.position() as usize;
            buf.advance(used);
            Ok(Some(value))
        }
        Err(e) if is_incomplete(&e) => Ok(None),
        Err(e) => Err(SimError::InvalidMessage(e.to_string())),
    }
}

fn is_incomplete(err: &rmpv::decode::Error) -> bool {
    match err {
        rmpv::decode::Error::InvalidMarkerRead(e) | rmpv::decode::Error::InvalidDataRead(e) => {
            e.kind() == std::io::ErrorKind::UnexpectedEof
        }
        _ => false,
    }
}

/// Encode a value and write it to the writer.
pub async fn write_message<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    value: &rmpv::Value,
) -> Result<()> {
    let mut packed = Vec::new();
    rmpv::encode::write_value(&mut packed, value)
        .map_err(|e| SimError::Io(std::io::Error::other(e)))?;
    writer.write_all(&packed).await?;
    writer.flush().await?;
    Ok(())
}
