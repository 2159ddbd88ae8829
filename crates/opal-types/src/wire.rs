//! Fixed-field binary codec for mutations and transactions.
//!
//! The encoding is protobuf-compatible: varint scalars and length-delimited
//! byte fields with fixed field numbers. Field numbers and ordering are part
//! of the interoperability contract — transaction ids are double-SHA-256
//! hashes of these bytes, so any change here changes every id.
//!
//! Layout:
//! - `Record`:      1 key (bytes), 2 value (bytes, present iff `Some`),
//!   3 version (bytes)
//! - `Mutation`:    1 namespace (bytes), 2 records (repeated embedded
//!   messages), 3 metadata (bytes)
//! - `Transaction`: 1 mutation (bytes), 2 timestamp (varint), 3 metadata
//!   (bytes)

use crate::bytes::ByteString;
use crate::error::TypeError;
use crate::record::{Mutation, Record, Transaction};

const WIRE_VARINT: u8 = 0;
const WIRE_LEN: u8 = 2;

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

fn write_tag(buf: &mut Vec<u8>, field: u32, wire_type: u8) {
    write_varint(buf, (u64::from(field) << 3) | u64::from(wire_type));
}

fn write_bytes_field(buf: &mut Vec<u8>, field: u32, bytes: &[u8]) {
    write_tag(buf, field, WIRE_LEN);
    write_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn write_varint_field(buf: &mut Vec<u8>, field: u32, value: u64) {
    write_tag(buf, field, WIRE_VARINT);
    write_varint(buf, value);
}

fn encode_record(record: &Record) -> Vec<u8> {
    let mut buf = Vec::new();
    write_bytes_field(&mut buf, 1, record.key.as_bytes());
    if let Some(value) = &record.value {
        write_bytes_field(&mut buf, 2, value.as_bytes());
    }
    write_bytes_field(&mut buf, 3, record.version.as_bytes());
    buf
}

/// Serialize a mutation into its canonical wire form.
pub fn serialize_mutation(mutation: &Mutation) -> Vec<u8> {
    let mut buf = Vec::new();
    write_bytes_field(&mut buf, 1, mutation.namespace.as_bytes());
    for record in &mutation.records {
        let encoded = encode_record(record);
        write_bytes_field(&mut buf, 2, &encoded);
    }
    write_bytes_field(&mut buf, 3, mutation.metadata.as_bytes());
    buf
}

/// Serialize a transaction into its canonical wire form.
pub fn serialize_transaction(transaction: &Transaction) -> Vec<u8> {
    let mut buf = Vec::new();
    write_bytes_field(&mut buf, 1, transaction.mutation.as_bytes());
    write_varint_field(&mut buf, 2, transaction.timestamp);
    write_bytes_field(&mut buf, 3, transaction.metadata.as_bytes());
    buf
}

// ---------------------------------------------------------------------------
// Deserialization
// ---------------------------------------------------------------------------

struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn done(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn read_varint(&mut self) -> Result<u64, String> {
        let mut value: u64 = 0;
        for shift in 0..10 {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or_else(|| String::from("truncated varint"))?;
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << (shift * 7);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(String::from("varint too long"))
    }

    fn read_tag(&mut self) -> Result<(u32, u8), String> {
        let tag = self.read_varint()?;
        let wire_type = (tag & 0x7) as u8;
        let field = u32::try_from(tag >> 3).map_err(|_| String::from("field number overflow"))?;
        Ok((field, wire_type))
    }

    fn read_len_delimited(&mut self) -> Result<&'a [u8], String> {
        let len = self.read_varint()? as usize;
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| String::from("length prefix past end of buffer"))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn expect(wire_type: u8, expected: u8) -> Result<(), String> {
        if wire_type == expected {
            Ok(())
        } else {
            Err(format!("unexpected wire type {wire_type}"))
        }
    }
}

fn decode_record(buf: &[u8]) -> Result<Record, String> {
    let mut reader = WireReader::new(buf);
    let mut key = ByteString::empty();
    let mut value: Option<ByteString> = None;
    let mut version = ByteString::empty();

    while !reader.done() {
        let (field, wire_type) = reader.read_tag()?;
        match field {
            1 => {
                WireReader::expect(wire_type, WIRE_LEN)?;
                key = ByteString::from(reader.read_len_delimited()?);
            }
            2 => {
                WireReader::expect(wire_type, WIRE_LEN)?;
                value = Some(ByteString::from(reader.read_len_delimited()?));
            }
            3 => {
                WireReader::expect(wire_type, WIRE_LEN)?;
                version = ByteString::from(reader.read_len_delimited()?);
            }
            _ => return Err(format!("unknown record field {field}")),
        }
    }

    Ok(Record::new(key, value, version))
}

/// Deserialize a mutation from its wire form.
pub fn deserialize_mutation(data: &[u8]) -> Result<Mutation, TypeError> {
    let mut reader = WireReader::new(data);
    let mut namespace = ByteString::empty();
    let mut records = Vec::new();
    let mut metadata = ByteString::empty();

    let result: Result<(), String> = (|| {
        while !reader.done() {
            let (field, wire_type) = reader.read_tag()?;
            match field {
                1 => {
                    WireReader::expect(wire_type, WIRE_LEN)?;
                    namespace = ByteString::from(reader.read_len_delimited()?);
                }
                2 => {
                    WireReader::expect(wire_type, WIRE_LEN)?;
                    records.push(decode_record(reader.read_len_delimited()?)?);
                }
                3 => {
                    WireReader::expect(wire_type, WIRE_LEN)?;
                    metadata = ByteString::from(reader.read_len_delimited()?);
                }
                _ => return Err(format!("unknown mutation field {field}")),
            }
        }
        Ok(())
    })();

    result.map_err(TypeError::InvalidMutation)?;
    Ok(Mutation::new(namespace, records, metadata))
}

/// Deserialize a transaction from its wire form.
pub fn deserialize_transaction(data: &[u8]) -> Result<Transaction, TypeError> {
    let mut reader = WireReader::new(data);
    let mut mutation = ByteString::empty();
    let mut timestamp = 0u64;
    let mut metadata = ByteString::empty();

    let result: Result<(), String> = (|| {
        while !reader.done() {
            let (field, wire_type) = reader.read_tag()?;
            match field {
                1 => {
                    WireReader::expect(wire_type, WIRE_LEN)?;
                    mutation = ByteString::from(reader.read_len_delimited()?);
                }
                2 => {
                    WireReader::expect(wire_type, WIRE_VARINT)?;
                    timestamp = reader.read_varint()?;
                }
                3 => {
                    WireReader::expect(wire_type, WIRE_LEN)?;
                    metadata = ByteString::from(reader.read_len_delimited()?);
                }
                _ => return Err(format!("unknown transaction field {field}")),
            }
        }
        Ok(())
    })();

    result.map_err(TypeError::InvalidTransaction)?;
    Ok(Transaction::new(mutation, timestamp, metadata))
}
