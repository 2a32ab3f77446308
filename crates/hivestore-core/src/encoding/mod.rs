//! Identifier-to-key encoding.

pub mod key;

pub use key::{
    PARTITION_SEPARATOR, RowKey, decode_database_key, decode_partition_key, decode_table_key,
    encode_database_key, encode_partition_key, encode_table_key,
};
