//! Single-record row codec
//!
//! Record layout:
//! - fixed block: fixed columns packed in schema order, little-endian
//! - per variable column: u32 length (little endian) + UTF-8 bytes,
//!   zlib-compressed when the store compresses
//!
//! Every read strategy decodes through `decode_row`.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::schema::{ColumnCodec, FixedCodec, RowSchema};
use super::value::{Row, Value};
use crate::error::LsearchError;
use crate::Result;

/// Check that a row carries every schema column with a matching value type
pub fn validate_row(schema: &RowSchema, row: &Row, row_number: usize) -> Result<()> {
    for column in schema.columns() {
        let Some(value) = row.get(&column.name) else {
            return Err(LsearchError::SchemaViolation(format!(
                "missing column in row {}: {}",
                row_number, column.name
            )));
        };
        if !column.codec.accepts(value) {
            return Err(LsearchError::SchemaViolation(format!(
                "column '{}' expects codec '{}' but row {} holds {:?}",
                column.name, column.codec, row_number, value
            )));
        }
    }
    Ok(())
}

fn encode_fixed(codec: FixedCodec, value: &Value, output: &mut Vec<u8>) -> Result<()> {
    match (codec, value) {
        (FixedCodec::Bool, Value::Bool(v)) => output.push(u8::from(*v)),
        (FixedCodec::Int32, Value::Int32(v)) => output.extend_from_slice(&v.to_le_bytes()),
        (FixedCodec::UInt32, Value::UInt32(v)) => output.extend_from_slice(&v.to_le_bytes()),
        (FixedCodec::Int64, Value::Int64(v)) => output.extend_from_slice(&v.to_le_bytes()),
        (FixedCodec::UInt64, Value::UInt64(v)) => output.extend_from_slice(&v.to_le_bytes()),
        (FixedCodec::Float32, Value::Float32(v)) => output.extend_from_slice(&v.to_le_bytes()),
        (FixedCodec::Float64, Value::Float64(v)) => output.extend_from_slice(&v.to_le_bytes()),
        _ => {
            return Err(LsearchError::SchemaViolation(format!(
                "value {:?} does not match codec '{}'",
                value,
                codec.tag()
            )))
        }
    }
    Ok(())
}

fn decode_fixed(codec: FixedCodec, bytes: &[u8]) -> Result<Value> {
    let value = match codec {
        FixedCodec::Bool => match bytes[0] {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            other => {
                return Err(LsearchError::Corrupt(format!(
                    "invalid bool byte {}",
                    other
                )))
            }
        },
        FixedCodec::Int32 => Value::Int32(i32::from_le_bytes(word(bytes))),
        FixedCodec::UInt32 => Value::UInt32(u32::from_le_bytes(word(bytes))),
        FixedCodec::Int64 => Value::Int64(i64::from_le_bytes(dword(bytes))),
        FixedCodec::UInt64 => Value::UInt64(u64::from_le_bytes(dword(bytes))),
        FixedCodec::Float32 => Value::Float32(f32::from_le_bytes(word(bytes))),
        FixedCodec::Float64 => Value::Float64(f64::from_le_bytes(dword(bytes))),
    };
    Ok(value)
}

fn word(bytes: &[u8]) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(&bytes[..4]);
    out
}

fn dword(bytes: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&bytes[..8]);
    out
}

/// Append one encoded record to `output`; the row must already be validated
pub fn encode_row(schema: &RowSchema, row: &Row, compress: bool, output: &mut Vec<u8>) -> Result<()> {
    for column in schema.fixed_columns() {
        if let ColumnCodec::Fixed(codec) = column.codec {
            encode_fixed(codec, &row[&column.name], output)?;
        }
    }

    for column in schema.variable_columns() {
        let text = row[&column.name].as_str().unwrap_or_default();
        let payload = if compress {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(text.as_bytes())?;
            encoder.finish()?
        } else {
            text.as_bytes().to_vec()
        };

        let len = u32::try_from(payload.len()).map_err(|_| {
            LsearchError::InvalidRequest(format!(
                "column '{}' value of {} bytes exceeds the 4-byte length prefix",
                column.name,
                payload.len()
            ))
        })?;
        output.extend_from_slice(&len.to_le_bytes());
        output.extend_from_slice(&payload);
    }

    Ok(())
}

/// Decode one record from a reader positioned at its first byte
pub fn decode_row<R: Read>(schema: &RowSchema, compress: bool, reader: &mut R) -> Result<Row> {
    let mut row = Row::new();

    if schema.fixed_size() > 0 {
        let mut block = vec![0u8; schema.fixed_size()];
        reader
            .read_exact(&mut block)
            .map_err(|e| LsearchError::from_decode_io(e, "fixed block"))?;

        let mut pos = 0;
        for column in schema.fixed_columns() {
            if let ColumnCodec::Fixed(codec) = column.codec {
                let value = decode_fixed(codec, &block[pos..pos + codec.size()])?;
                row.insert(column.name.clone(), value);
                pos += codec.size();
            }
        }
    }

    for column in schema.variable_columns() {
        let mut len_buf = [0u8; 4];
        reader
            .read_exact(&mut len_buf)
            .map_err(|e| LsearchError::from_decode_io(e, "length prefix"))?;
        let len = u32::from_le_bytes(len_buf) as u64;

        let mut payload = Vec::new();
        reader.by_ref().take(len).read_to_end(&mut payload)?;
        if payload.len() as u64 != len {
            return Err(LsearchError::Corrupt(format!(
                "column '{}' length prefix {} extends past end of file",
                column.name, len
            )));
        }

        let bytes = if compress {
            let mut inflated = Vec::new();
            ZlibDecoder::new(payload.as_slice())
                .read_to_end(&mut inflated)
                .map_err(|e| {
                    LsearchError::Corrupt(format!("column '{}': {}", column.name, e))
                })?;
            inflated
        } else {
            payload
        };

        let text = String::from_utf8(bytes).map_err(|e| {
            LsearchError::Corrupt(format!("column '{}' is not UTF-8: {}", column.name, e))
        })?;
        row.insert(column.name.clone(), Value::Str(text));
    }

    Ok(row)
}
