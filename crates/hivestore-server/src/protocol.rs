//! Wire protocol: JSON request/response messages over a byte stream.
//!
//! With the buffered transport each message is a single JSON line. With the
//! framed transport each message is a 4-byte big-endian length followed by
//! the JSON body. Both ends must agree on the transport.

use std::io;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted frame body.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// How messages are delimited on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Newline-delimited JSON.
    Buffered,
    /// Length-prefixed JSON.
    Framed,
}

impl Transport {
    pub fn from_framed(framed: bool) -> Self {
        if framed {
            Transport::Framed
        } else {
            Transport::Buffered
        }
    }
}

/// A request from a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    DescribeVersion,
    Get {
        keyspace: String,
        column_family: String,
        row: Vec<u8>,
        column: Vec<u8>,
    },
    GetSlice {
        keyspace: String,
        column_family: String,
        row: Vec<u8>,
        #[serde(default)]
        count: Option<usize>,
    },
    Insert {
        keyspace: String,
        column_family: String,
        row: Vec<u8>,
        column: Vec<u8>,
        value: Vec<u8>,
    },
    Remove {
        keyspace: String,
        column_family: String,
        row: Vec<u8>,
        #[serde(default)]
        column: Option<Vec<u8>>,
    },
}

/// A column in wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnWire {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
}

/// A response sent back to the client.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    Ok(OkResponse),
    Error(ErrorResponse),
}

/// Successful response variants.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OkResponse {
    Version {
        ok: bool,
        version: String,
    },
    Value {
        ok: bool,
        value: Option<Vec<u8>>,
    },
    Columns {
        ok: bool,
        columns: Vec<ColumnWire>,
    },
    Empty {
        ok: bool,
    },
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl Response {
    pub fn ok_empty() -> Self {
        Response::Ok(OkResponse::Empty { ok: true })
    }

    pub fn ok_version(version: impl Into<String>) -> Self {
        Response::Ok(OkResponse::Version {
            ok: true,
            version: version.into(),
        })
    }

    pub fn ok_value(value: Option<Vec<u8>>) -> Self {
        Response::Ok(OkResponse::Value { ok: true, value })
    }

    pub fn ok_columns(columns: Vec<ColumnWire>) -> Self {
        Response::Ok(OkResponse::Columns { ok: true, columns })
    }

    pub fn error(error: impl Into<String>, message: impl Into<String>) -> Self {
        Response::Error(ErrorResponse {
            error: error.into(),
            message: message.into(),
        })
    }
}

/// Read one message body into `buf`.
///
/// Returns `Ok(false)` when the peer closed the stream between messages.
pub async fn read_message<R>(
    reader: &mut R,
    transport: Transport,
    buf: &mut Vec<u8>,
) -> io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    match transport {
        Transport::Buffered => loop {
            // Body plus its newline.
            let limit = MAX_FRAME_LEN as u64 + 1;
            let n = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
            if n == 0 {
                return Ok(false);
            }
            if n as u64 == limit && buf.last() != Some(&b'\n') {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line exceeds limit of {MAX_FRAME_LEN} bytes"),
                ));
            }
            while matches!(buf.last(), Some(b'\n' | b'\r')) {
                buf.pop();
            }
            if !buf.is_empty() {
                return Ok(true);
            }
        },
        Transport::Framed => {
            let mut len_bytes = [0u8; 4];
            match reader.read_exact(&mut len_bytes).await {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(false),
                Err(e) => return Err(e),
            }
            let len = u32::from_be_bytes(len_bytes) as usize;
            if len > MAX_FRAME_LEN {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("frame of {len} bytes exceeds limit of {MAX_FRAME_LEN}"),
                ));
            }
            buf.resize(len, 0);
            reader.read_exact(buf).await?;
            Ok(true)
        }
    }
}

/// Write one message body and flush.
pub async fn write_message<W>(writer: &mut W, transport: Transport, body: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match transport {
        Transport::Buffered => {
            writer.write_all(body).await?;
            writer.write_all(b"\n").await?;
        }
        Transport::Framed => {
            let len = u32::try_from(body.len())
                .ok()
                .filter(|&n| n as usize <= MAX_FRAME_LEN)
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "message too large"))?;
            writer.write_all(&len.to_be_bytes()).await?;
            writer.write_all(body).await?;
        }
    }
    writer.flush().await
}
