use crate::adapters::{
    rows_from_bits, write_blob_bits, write_image_bits, write_table, write_text_bits, ImageSpec,
};
use crate::bits::{bool_from_bits, float_from_bits, int_from_bits, text_from_bits};
use crate::error::{LinkError, Result};
use log::{debug, info};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::path::PathBuf;

/// Width of the tag field on the wire.
pub const TAG_BITS: usize = 8;
/// Width of the payload bit-length field on the wire.
pub const LENGTH_BITS: usize = 32;

const CHUNK_HEADER_BITS: usize = TAG_BITS + LENGTH_BITS;

/// Chunk kinds carried on the wire.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum Tag {
    Integer = 0,
    Float = 1,
    Text = 2,
    Image = 3,
    Boolean = 4,
    Telemetry = 5,
    Tabular = 6,
    Report = 7,
    Json = 8,
}

/// A framed chunk borrowed from the surrounding bitstream.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub tag: Tag,
    pub payload: &'a [bool],
}

/// A decoded scalar chunk value, in wire order.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(u64),
    Float(f64),
    Text(String),
    Boolean(bool),
}

/// Destination for a reconstructed image chunk.
#[derive(Debug, Clone)]
pub struct ImageSink {
    pub path: PathBuf,
    pub spec: ImageSpec,
}

/// Destination for a reconstructed tabular chunk. The header row never
/// travels on the wire; the receiver supplies it.
#[derive(Debug, Clone)]
pub struct TableSink {
    pub path: PathBuf,
    pub header: Vec<String>,
}

/// Destinations for sink chunks, agreed out of band with the transmitter.
/// A sink chunk arriving without its destination configured is an error.
#[derive(Debug, Clone, Default)]
pub struct SinkConfig {
    pub telemetry: Option<PathBuf>,
    pub image: Option<ImageSink>,
    pub table: Option<TableSink>,
    pub report: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

/// Frame a payload: 8-bit tag, 32-bit big-endian payload bit-length,
/// then the payload bits themselves.
pub fn encode_chunk(tag: Tag, payload: &[bool]) -> Result<Vec<bool>> {
    if payload.len() > u32::MAX as usize {
        return Err(LinkError::PayloadTooLarge);
    }
    let mut bits = Vec::with_capacity(CHUNK_HEADER_BITS + payload.len());
    push_field(&mut bits, u64::from(u8::from(tag)), TAG_BITS);
    push_field(&mut bits, payload.len() as u64, LENGTH_BITS);
    bits.extend_from_slice(payload);
    Ok(bits)
}

fn push_field(bits: &mut Vec<bool>, value: u64, width: usize) {
    for k in (0..width).rev() {
        bits.push((value >> k) & 1 == 1);
    }
}

/// Split a bitstream into its chunks. The embedded length fields are the
/// only framing mechanism, and the final chunk must end exactly at the
/// end of the input.
pub fn split_chunks(bits: &[bool]) -> Result<Vec<Chunk<'_>>> {
    let mut chunks = Vec::new();
    let mut cursor = 0;
    while cursor < bits.len() {
        if bits.len() - cursor < CHUNK_HEADER_BITS {
            return Err(LinkError::TrailingBits);
        }
        let tag_value = int_from_bits(&bits[cursor..cursor + TAG_BITS]) as u8;
        let tag = Tag::try_from(tag_value).map_err(|_| LinkError::UnknownTag(tag_value))?;
        let length = int_from_bits(&bits[cursor + TAG_BITS..cursor + CHUNK_HEADER_BITS]) as usize;

        let payload_start = cursor + CHUNK_HEADER_BITS;
        if bits.len() - payload_start < length {
            return Err(LinkError::TruncatedChunk);
        }
        chunks.push(Chunk {
            tag,
            payload: &bits[payload_start..payload_start + length],
        });
        cursor = payload_start + length;
    }
    Ok(chunks)
}

/// Decode a TLV bitstream: scalar chunks are collected in wire order,
/// sink chunks are reconstructed at their configured destinations.
pub fn decode_bitstream(bits: &[bool], sinks: &SinkConfig) -> Result<Vec<FieldValue>> {
    let chunks = split_chunks(bits)?;
    debug!("bitstream carries {} chunks", chunks.len());

    let mut values = Vec::new();
    for chunk in chunks {
        match chunk.tag {
            Tag::Integer => values.push(FieldValue::Integer(int_from_bits(chunk.payload))),
            Tag::Float => values.push(FieldValue::Float(float_from_bits(chunk.payload)?)),
            Tag::Text => values.push(FieldValue::Text(text_from_bits(chunk.payload)?)),
            Tag::Boolean => values.push(FieldValue::Boolean(bool_from_bits(chunk.payload)?)),
            Tag::Image => {
                let sink = sinks.image.as_ref().ok_or(LinkError::MissingSink("image"))?;
                info!("reconstructing image at {}", sink.path.display());
                write_image_bits(chunk.payload, &sink.spec, &sink.path)?;
            }
            Tag::Telemetry => {
                let path = sinks
                    .telemetry
                    .as_ref()
                    .ok_or(LinkError::MissingSink("telemetry"))?;
                info!("reconstructing telemetry log at {}", path.display());
                write_blob_bits(chunk.payload, path)?;
            }
            Tag::Tabular => {
                let sink = sinks.table.as_ref().ok_or(LinkError::MissingSink("tabular"))?;
                info!("reconstructing table at {}", sink.path.display());
                let rows = rows_from_bits(chunk.payload)?;
                write_table(&sink.path, &sink.header, &rows)?;
            }
            Tag::Report => {
                let path = sinks
                    .report
                    .as_ref()
                    .ok_or(LinkError::MissingSink("report"))?;
                info!("reconstructing text report at {}", path.display());
                write_text_bits(chunk.payload, path)?;
            }
            Tag::Json => {
                let path = sinks.json.as_ref().ok_or(LinkError::MissingSink("json"))?;
                info!("reconstructing JSON file at {}", path.display());
                write_text_bits(chunk.payload, path)?;
            }
        }
    }
    Ok(values)
}
