//! Row keys for catalog entities and index rows.
//!
//! Every row key is a kind tag followed by one or more escaped-terminator
//! encoded components:
//!
//! - database:  `[0x01][db]`
//! - table:     `[0x02][db][table]`
//! - partition: `[0x03][db][table][v1 SEP v2 SEP ... vn]`
//! - index row: `[0x1x][scope components...]`
//!
//! A component is the UTF-8 bytes of the identifier with `0x00` escaped as
//! `0x00 0xFF`, followed by the terminator `0x00 0x00`. Byte order of encoded
//! components equals string order, and any string (including NUL) round-trips.

use std::fmt;

use crate::error::EncodingError;

pub const TAG_DATABASE: u8 = 0x01;
pub const TAG_TABLE: u8 = 0x02;
pub const TAG_PARTITION: u8 = 0x03;
pub const TAG_INDEX_DATABASES: u8 = 0x10;
pub const TAG_INDEX_TABLES: u8 = 0x11;
pub const TAG_INDEX_PARTITIONS: u8 = 0x12;

/// Reserved separator joining partition values into a partition name.
/// No individual partition value may contain it.
pub const PARTITION_SEPARATOR: char = '\u{1F}';

/// An encoded backend row key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey(Vec<u8>);

impl RowKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowKey(")?;
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        write!(f, ")")
    }
}

/// Append one escaped-terminator component to `out`.
pub fn push_component(out: &mut Vec<u8>, s: &str) {
    for &b in s.as_bytes() {
        if b == 0x00 {
            out.push(0x00);
            out.push(0xFF);
        } else {
            out.push(b);
        }
    }
    out.push(0x00);
    out.push(0x00);
}

/// Decode one component from the front of `data`.
///
/// Returns the string and the number of bytes consumed, terminator included.
pub fn take_component(data: &[u8]) -> Result<(String, usize), EncodingError> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        if data[i] != 0x00 {
            out.push(data[i]);
            i += 1;
            continue;
        }
        match data.get(i + 1) {
            Some(0x00) => {
                let s = String::from_utf8(out).map_err(|_| EncodingError::MalformedKey)?;
                return Ok((s, i + 2));
            }
            Some(0xFF) => {
                out.push(0x00);
                i += 2;
            }
            _ => return Err(EncodingError::MalformedKey),
        }
    }
    Err(EncodingError::MalformedKey)
}

/// Build a row key from a tag and components.
pub fn encode_components(tag: u8, components: &[&str]) -> RowKey {
    let len = components.iter().map(|c| c.len() + 2).sum::<usize>();
    let mut out = Vec::with_capacity(1 + len);
    out.push(tag);
    for c in components {
        push_component(&mut out, c);
    }
    RowKey(out)
}

/// Split a row key into its components, checking the tag and arity.
pub fn decode_components(
    key: &RowKey,
    tag: u8,
    arity: usize,
) -> Result<Vec<String>, EncodingError> {
    let data = key.as_bytes();
    if data.first() != Some(&tag) {
        return Err(EncodingError::MalformedKey);
    }
    let mut offset = 1;
    let mut parts = Vec::with_capacity(arity);
    while offset < data.len() {
        let (part, consumed) = take_component(&data[offset..])?;
        parts.push(part);
        offset += consumed;
    }
    if parts.len() != arity {
        return Err(EncodingError::MalformedKey);
    }
    Ok(parts)
}

/// Reject an empty database or table name.
pub fn require_name(kind: &'static str, value: &str) -> Result<(), EncodingError> {
    if value.is_empty() {
        return Err(EncodingError::InvalidIdentifier {
            kind,
            value: value.to_string(),
            reason: "name must not be empty",
        });
    }
    Ok(())
}

/// Join partition values into a partition name.
///
/// Fails if there are no values or if any value contains the separator.
pub fn partition_name(values: &[String]) -> Result<String, EncodingError> {
    if values.is_empty() {
        return Err(EncodingError::InvalidIdentifier {
            kind: "partition",
            value: String::new(),
            reason: "at least one partition value is required",
        });
    }
    if let Some(bad) = values.iter().find(|v| v.contains(PARTITION_SEPARATOR)) {
        return Err(EncodingError::InvalidIdentifier {
            kind: "partition",
            value: bad.clone(),
            reason: "partition values must not contain the reserved separator U+001F",
        });
    }
    let sep = PARTITION_SEPARATOR.to_string();
    Ok(values.join(&sep))
}

/// Split a partition name back into its ordered values.
pub fn partition_values(name: &str) -> Vec<String> {
    name.split(PARTITION_SEPARATOR).map(str::to_string).collect()
}

pub fn encode_database_key(name: &str) -> Result<RowKey, EncodingError> {
    require_name("database", name)?;
    Ok(encode_components(TAG_DATABASE, &[name]))
}

pub fn encode_table_key(db_name: &str, table_name: &str) -> Result<RowKey, EncodingError> {
    require_name("database", db_name)?;
    require_name("table", table_name)?;
    Ok(encode_components(TAG_TABLE, &[db_name, table_name]))
}

pub fn encode_partition_key(
    db_name: &str,
    table_name: &str,
    values: &[String],
) -> Result<RowKey, EncodingError> {
    require_name("database", db_name)?;
    require_name("table", table_name)?;
    let name = partition_name(values)?;
    Ok(encode_components(TAG_PARTITION, &[db_name, table_name, name.as_str()]))
}

pub fn decode_database_key(key: &RowKey) -> Result<String, EncodingError> {
    let mut parts = decode_components(key, TAG_DATABASE, 1)?;
    Ok(parts.remove(0))
}

pub fn decode_table_key(key: &RowKey) -> Result<(String, String), EncodingError> {
    let mut parts = decode_components(key, TAG_TABLE, 2)?.into_iter();
    match (parts.next(), parts.next()) {
        (Some(db), Some(table)) => Ok((db, table)),
        _ => Err(EncodingError::MalformedKey),
    }
}

pub fn decode_partition_key(
    key: &RowKey,
) -> Result<(String, String, Vec<String>), EncodingError> {
    let mut parts = decode_components(key, TAG_PARTITION, 3)?.into_iter();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(db), Some(table), Some(name)) => Ok((db, table, partition_values(&name))),
        _ => Err(EncodingError::MalformedKey),
    }
}

/// Encode an index member as a column name. Column order equals member order.
pub fn encode_member(member: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(member.len() + 2);
    push_component(&mut out, member);
    out
}

pub fn decode_member(column: &[u8]) -> Result<String, EncodingError> {
    let (member, consumed) = take_component(column)?;
    if consumed != column.len() {
        return Err(EncodingError::MalformedKey);
    }
    Ok(member)
}
