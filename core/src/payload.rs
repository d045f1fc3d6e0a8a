use crate::adapters::{file_to_bits, image_to_bits, read_table, rows_to_bits, PixelMode};
use crate::bits::{bool_to_bits, int_to_bits};
use crate::calibration::{sync_postamble, sync_preamble};
use crate::error::{LinkError, Result};
use crate::tlv::{encode_chunk, Tag};
use log::debug;
use std::path::PathBuf;

/// File-delivery payload: the fixed CFDP-style scalar header plus up to
/// five optional sections.
#[derive(Debug, Clone, Default)]
pub struct Payload {
    pub version: u64,
    pub direction: u64,
    pub transmission_mode: u64,
    /// Carried on the wire but never computed or checked.
    pub crc_flag: bool,
    pub transfer_id: u64,
    pub spacecraft_id: u64,
    pub groundstation_id: u64,
    pub telemetry_log: Option<Vec<bool>>,
    pub image_path: Option<PathBuf>,
    pub image_mode: PixelMode,
    pub csv_path: Option<PathBuf>,
    pub text_report_path: Option<PathBuf>,
    pub json_path: Option<PathBuf>,
}

impl Payload {
    /// Payload with the mandatory header scalars and no optional sections.
    pub fn new(
        version: u64,
        direction: u64,
        transmission_mode: u64,
        crc_flag: bool,
        transfer_id: u64,
        spacecraft_id: u64,
        groundstation_id: u64,
    ) -> Self {
        Self {
            version,
            direction,
            transmission_mode,
            crc_flag,
            transfer_id,
            spacecraft_id,
            groundstation_id,
            ..Self::default()
        }
    }

    /// Serialize the payload into a single TLV bitstream: the seven
    /// header scalars in fixed order, then each present optional section
    /// under its designated tag. With `with_sync`, the literal
    /// synchronization head and tail wrap the whole stream.
    pub fn to_bits(&self, with_sync: bool) -> Result<Vec<bool>> {
        let mut bits = Vec::new();
        if with_sync {
            bits.extend(sync_preamble());
        }

        bits.extend(encode_chunk(Tag::Integer, &int_to_bits(self.version))?);
        bits.extend(encode_chunk(Tag::Integer, &int_to_bits(self.direction))?);
        bits.extend(encode_chunk(
            Tag::Integer,
            &int_to_bits(self.transmission_mode),
        )?);
        bits.extend(encode_chunk(Tag::Boolean, &bool_to_bits(self.crc_flag))?);
        bits.extend(encode_chunk(Tag::Integer, &int_to_bits(self.transfer_id))?);
        bits.extend(encode_chunk(Tag::Integer, &int_to_bits(self.spacecraft_id))?);
        bits.extend(encode_chunk(
            Tag::Integer,
            &int_to_bits(self.groundstation_id),
        )?);

        if let Some(log_bits) = &self.telemetry_log {
            bits.extend(encode_chunk(Tag::Telemetry, log_bits)?);
        }
        if let Some(path) = &self.image_path {
            let (pixel_bits, spec) = image_to_bits(path, self.image_mode)?;
            debug!(
                "attaching {}x{} image ({} bits)",
                spec.width,
                spec.height,
                pixel_bits.len()
            );
            bits.extend(encode_chunk(Tag::Image, &pixel_bits)?);
        }
        if let Some(path) = &self.csv_path {
            let rows = read_table(path)?;
            bits.extend(encode_chunk(Tag::Tabular, &rows_to_bits(&rows))?);
        }
        if let Some(path) = &self.text_report_path {
            bits.extend(encode_chunk(Tag::Report, &file_to_bits(path)?)?);
        }
        if let Some(path) = &self.json_path {
            bits.extend(encode_chunk(Tag::Json, &file_to_bits(path)?)?);
        }

        if with_sync {
            bits.extend(sync_postamble());
        }
        Ok(bits)
    }
}

/// Remove the literal synchronization head and tail from a demodulated
/// bitstring, verifying both against the transmit constants.
///
/// Zeros demodulated from the silence after the carrier drops are
/// discarded before the tail check, so a recording may run past the end
/// of the transmission.
pub fn strip_sync(bits: &[bool]) -> Result<&[bool]> {
    let end = bits
        .iter()
        .rposition(|&b| b)
        .map(|k| k + 1)
        .ok_or(LinkError::SyncPatternMismatch)?;
    let body = &bits[..end];

    let head = sync_preamble();
    let tail = sync_postamble();
    if body.len() < head.len() + tail.len()
        || body[..head.len()] != head[..]
        || body[body.len() - tail.len()..] != tail[..]
    {
        return Err(LinkError::SyncPatternMismatch);
    }
    Ok(&body[head.len()..body.len() - tail.len()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tlv::{decode_bitstream, split_chunks, FieldValue, SinkConfig};

    fn header_payload() -> Payload {
        Payload::new(1, 0, 1, false, 49, 8, 3)
    }

    #[test]
    fn test_header_chunks_in_fixed_order() {
        let bits = header_payload().to_bits(false).unwrap();
        let chunks = split_chunks(&bits).unwrap();
        let tags: Vec<Tag> = chunks.iter().map(|c| c.tag).collect();
        assert_eq!(
            tags,
            vec![
                Tag::Integer,
                Tag::Integer,
                Tag::Integer,
                Tag::Boolean,
                Tag::Integer,
                Tag::Integer,
                Tag::Integer,
            ]
        );
    }

    #[test]
    fn test_header_values_round_trip() {
        let bits = header_payload().to_bits(false).unwrap();
        let values = decode_bitstream(&bits, &SinkConfig::default()).unwrap();
        assert_eq!(
            values,
            vec![
                FieldValue::Integer(1),
                FieldValue::Integer(0),
                FieldValue::Integer(1),
                FieldValue::Boolean(false),
                FieldValue::Integer(49),
                FieldValue::Integer(8),
                FieldValue::Integer(3),
            ]
        );
    }

    #[test]
    fn test_absent_sections_emit_no_chunks() {
        let bits = header_payload().to_bits(false).unwrap();
        assert_eq!(split_chunks(&bits).unwrap().len(), 7);
    }

    #[test]
    fn test_telemetry_section_appended_when_present() {
        let mut payload = header_payload();
        payload.telemetry_log = Some(vec![true, false, true, true]);
        let bits = payload.to_bits(false).unwrap();
        let chunks = split_chunks(&bits).unwrap();
        assert_eq!(chunks.len(), 8);
        assert_eq!(chunks[7].tag, Tag::Telemetry);
        assert_eq!(chunks[7].payload, &[true, false, true, true]);
    }

    #[test]
    fn test_sync_wrap_round_trip() {
        let payload = header_payload();
        let inner = payload.to_bits(false).unwrap();
        let wrapped = payload.to_bits(true).unwrap();

        assert_eq!(strip_sync(&wrapped).unwrap(), &inner[..]);
    }

    #[test]
    fn test_strip_sync_discards_trailing_silence() {
        let mut wrapped = header_payload().to_bits(true).unwrap();
        let inner = header_payload().to_bits(false).unwrap();
        wrapped.extend(std::iter::repeat(false).take(17));

        assert_eq!(strip_sync(&wrapped).unwrap(), &inner[..]);
    }

    #[test]
    fn test_strip_sync_rejects_corrupt_head() {
        let mut wrapped = header_payload().to_bits(true).unwrap();
        wrapped[0] = false;
        assert!(matches!(
            strip_sync(&wrapped),
            Err(LinkError::SyncPatternMismatch)
        ));
    }

    #[test]
    fn test_strip_sync_rejects_unwrapped_stream() {
        let bits = header_payload().to_bits(false).unwrap();
        assert!(matches!(
            strip_sync(&bits),
            Err(LinkError::SyncPatternMismatch)
        ));
    }
}
