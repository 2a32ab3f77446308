//! Async client for a `hivestore-server` backend.
//!
//! Each method serializes a request, sends it, reads one response, and
//! returns the parsed result.

use serde_json::Value;
use tokio::io::{BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use hivestore_core::backend::Column;

use crate::error::ClientError;
use crate::protocol::{ErrorResponse, Request, Transport, read_message, write_message};

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client for a hivestore backend server.
pub struct ColumnStoreClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    transport: Transport,
    buf: Vec<u8>,
}

impl ColumnStoreClient {
    /// Connect to a server at `addr` (`host:port`).
    pub async fn connect(addr: &str, transport: Transport) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            transport,
            buf: Vec::new(),
        })
    }

    pub async fn describe_version(&mut self) -> Result<String> {
        let resp = self.send_request(&Request::DescribeVersion).await?;
        check_error(&resp)?;
        resp.get("version")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ClientError::Protocol("missing 'version' in response".to_string()))
    }

    /// Read a single column.
    pub async fn get(
        &mut self,
        keyspace: &str,
        column_family: &str,
        row: &[u8],
        column: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        let req = Request::Get {
            keyspace: keyspace.to_string(),
            column_family: column_family.to_string(),
            row: row.to_vec(),
            column: column.to_vec(),
        };
        let resp = self.send_request(&req).await?;
        value_from_response(&resp)
    }

    /// Read a row's columns in name order.
    pub async fn get_slice(
        &mut self,
        keyspace: &str,
        column_family: &str,
        row: &[u8],
        count: Option<usize>,
    ) -> Result<Vec<Column>> {
        let req = Request::GetSlice {
            keyspace: keyspace.to_string(),
            column_family: column_family.to_string(),
            row: row.to_vec(),
            count,
        };
        let resp = self.send_request(&req).await?;
        columns_from_response(&resp)
    }

    /// Upsert a single column.
    pub async fn insert(
        &mut self,
        keyspace: &str,
        column_family: &str,
        row: &[u8],
        column: &[u8],
        value: &[u8],
    ) -> Result<()> {
        let req = Request::Insert {
            keyspace: keyspace.to_string(),
            column_family: column_family.to_string(),
            row: row.to_vec(),
            column: column.to_vec(),
            value: value.to_vec(),
        };
        let resp = self.send_request(&req).await?;
        check_error(&resp)
    }

    /// Remove one column, or the whole row when `column` is `None`.
    pub async fn remove(
        &mut self,
        keyspace: &str,
        column_family: &str,
        row: &[u8],
        column: Option<&[u8]>,
    ) -> Result<()> {
        let req = Request::Remove {
            keyspace: keyspace.to_string(),
            column_family: column_family.to_string(),
            row: row.to_vec(),
            column: column.map(<[u8]>::to_vec),
        };
        let resp = self.send_request(&req).await?;
        check_error(&resp)
    }

    async fn send_request(&mut self, req: &Request) -> Result<Value> {
        let data = serde_json::to_vec(req).map_err(ClientError::Serialization)?;
        write_message(&mut self.writer, self.transport, &data).await?;

        if !read_message(&mut self.reader, self.transport, &mut self.buf).await? {
            return Err(ClientError::Disconnected);
        }
        serde_json::from_slice(&self.buf).map_err(ClientError::Serialization)
    }
}

// ---------------------------------------------------------------------------
// Response parsing helpers
// ---------------------------------------------------------------------------

fn check_error(resp: &Value) -> Result<()> {
    if let Some(err) = resp.get("error") {
        let error = err.as_str().unwrap_or("Unknown").to_string();
        let message = resp
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        return Err(ClientError::Server(ErrorResponse { error, message }));
    }
    Ok(())
}

fn bytes_from_value(v: &Value, what: &str) -> Result<Vec<u8>> {
    serde_json::from_value(v.clone())
        .map_err(|e| ClientError::Protocol(format!("malformed '{what}' in response: {e}")))
}

fn value_from_response(resp: &Value) -> Result<Option<Vec<u8>>> {
    check_error(resp)?;
    match resp.get("value") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => bytes_from_value(v, "value").map(Some),
    }
}

fn columns_from_response(resp: &Value) -> Result<Vec<Column>> {
    check_error(resp)?;
    let arr = resp
        .get("columns")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::Protocol("missing 'columns' in response".to_string()))?;
    arr.iter()
        .map(|c| {
            let name = c.get("name").unwrap_or(&Value::Null);
            let value = c.get("value").unwrap_or(&Value::Null);
            Ok(Column {
                name: bytes_from_value(name, "name")?,
                value: bytes_from_value(value, "value")?,
            })
        })
        .collect()
}
