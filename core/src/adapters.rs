//! File-backed format adapters: the converters the TLV codec dispatches
//! into for image, tabular, and opaque-blob chunks. Reconstruction
//! destinations and image geometry are agreed out of band by both ends
//! of the link and passed in explicitly.

use crate::bits::{bits_from_bytes, bytes_from_bits, bytes_from_bits_padded};
use crate::error::{LinkError, Result};
use image::{GrayImage, RgbImage};
use std::fs;
use std::path::Path;

/// Field separator inside a tabular row on the wire.
const FIELD_SEPARATOR: char = '|';
/// Row separator on the wire.
const ROW_SEPARATOR: char = ';';

/// Pixel layout of a transferred image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelMode {
    #[default]
    Grayscale,
    Rgb,
}

impl PixelMode {
    fn bytes_per_pixel(self) -> usize {
        match self {
            PixelMode::Grayscale => 1,
            PixelMode::Rgb => 3,
        }
    }
}

/// Image geometry; never carried on the wire.
#[derive(Debug, Clone, Copy)]
pub struct ImageSpec {
    pub width: u32,
    pub height: u32,
    pub mode: PixelMode,
}

impl ImageSpec {
    fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.mode.bytes_per_pixel()
    }
}

/// Flatten an image file into pixel bits, 8 bits per sample, row-major.
pub fn image_to_bits(path: &Path, mode: PixelMode) -> Result<(Vec<bool>, ImageSpec)> {
    let img = image::open(path)?;
    let (bits, width, height) = match mode {
        PixelMode::Grayscale => {
            let gray = img.to_luma8();
            (bits_from_bytes(gray.as_raw()), gray.width(), gray.height())
        }
        PixelMode::Rgb => {
            let rgb = img.to_rgb8();
            (bits_from_bytes(rgb.as_raw()), rgb.width(), rgb.height())
        }
    };
    Ok((bits, ImageSpec { width, height, mode }))
}

/// Rebuild an image from pixel bits and write it to the destination.
pub fn write_image_bits(bits: &[bool], spec: &ImageSpec, path: &Path) -> Result<()> {
    let bytes = bytes_from_bits(bits)?;
    let expected = spec.byte_len();
    if bytes.len() != expected {
        return Err(LinkError::ImageSizeMismatch {
            got: bytes.len(),
            expected,
        });
    }
    match spec.mode {
        PixelMode::Grayscale => GrayImage::from_raw(spec.width, spec.height, bytes)
            .ok_or(LinkError::ImageSizeMismatch {
                got: expected,
                expected,
            })?
            .save(path)?,
        PixelMode::Rgb => RgbImage::from_raw(spec.width, spec.height, bytes)
            .ok_or(LinkError::ImageSizeMismatch {
                got: expected,
                expected,
            })?
            .save(path)?,
    }
    Ok(())
}

/// Join rows into the wire form: fields separated by `|`, rows by `;`,
/// UTF-8 encoded.
pub fn rows_to_bits(rows: &[Vec<String>]) -> Vec<bool> {
    let joined = rows
        .iter()
        .map(|row| row.join(&FIELD_SEPARATOR.to_string()))
        .collect::<Vec<_>>()
        .join(&ROW_SEPARATOR.to_string());
    bits_from_bytes(joined.as_bytes())
}

/// Split a tabular payload back into rows of string fields.
pub fn rows_from_bits(bits: &[bool]) -> Result<Vec<Vec<String>>> {
    let text = String::from_utf8(bytes_from_bits(bits)?)?;
    Ok(text
        .split(ROW_SEPARATOR)
        .map(|row| row.split(FIELD_SEPARATOR).map(str::to_owned).collect())
        .collect())
}

/// Read a comma-separated table, skipping its header row. Boolean-valued
/// fields normalize to `1`/`0` so both ends agree on their wire form.
pub fn read_table(path: &Path) -> Result<Vec<Vec<String>>> {
    let text = fs::read_to_string(path)?;
    Ok(text
        .lines()
        .skip(1)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.split(',')
                .map(|field| match field.to_ascii_lowercase().as_str() {
                    "true" => "1".to_owned(),
                    "false" => "0".to_owned(),
                    _ => field.to_owned(),
                })
                .collect()
        })
        .collect())
}

/// Write the externally-known header plus the recovered rows as
/// comma-separated lines.
pub fn write_table(path: &Path, header: &[String], rows: &[Vec<String>]) -> Result<()> {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(header.join(","));
    for row in rows {
        lines.push(row.join(","));
    }
    lines.push(String::new()); // trailing newline
    fs::write(path, lines.join("\n"))?;
    Ok(())
}

/// Raw bytes of any file as bits.
pub fn file_to_bits(path: &Path) -> Result<Vec<bool>> {
    Ok(bits_from_bytes(&fs::read(path)?))
}

/// Write bits to a file, zero-padding the trailing partial octet.
pub fn write_blob_bits(bits: &[bool], path: &Path) -> Result<()> {
    fs::write(path, bytes_from_bits_padded(bits))?;
    Ok(())
}

/// Write a whole-octet bitstring (text or JSON payloads) to a file.
pub fn write_text_bits(bits: &[bool], path: &Path) -> Result<()> {
    fs::write(path, bytes_from_bits(bits)?)?;
    Ok(())
}
