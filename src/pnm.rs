//! Binary PNM codec for 8-bit images.
//!
//! ## Supported Formats
//!
//! | Magic | Channels | Description |
//! |-------|----------|-------------|
//! | P5 | 1 | Binary grayscale (PGM) |
//! | P6 | 3 | Binary color, red-green-blue (PPM) |
//!
//! The header is the magic, width, height and maximum sample value, all
//! separated by whitespace; `#` starts a comment running to the end of the
//! line. A single whitespace byte follows the maximum value, then
//! `width * height * channels` raw bytes.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::warn;

use crate::error::{try_alloc, Error, Result};
use crate::image::{ChannelMode, Image};

/// Read a PNM image from `path`.
pub fn load(path: &Path) -> Result<Image> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    read_from(BufReader::new(file)).map_err(|e| match e {
        Error::Io { source, .. } => Error::io(path, source),
        other => other,
    })
}

/// Write `image` to `path`. A failed write removes the partial file.
pub fn save(path: &Path, image: &Image) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);

    let written = write_to(&mut writer, image)
        .and_then(|()| writer.flush().map_err(|e| Error::io(path, e)));
    if let Err(e) = written {
        drop(writer);
        if let Err(remove_err) = fs::remove_file(path) {
            warn!(path = %path.display(), "could not remove partial output: {remove_err}");
        }
        return Err(match e {
            Error::Io { source, .. } => Error::io(path, source),
            other => other,
        });
    }
    Ok(())
}

/// Decode a PNM image from any buffered reader.
pub fn read_from<R: BufRead>(mut reader: R) -> Result<Image> {
    let magic = next_token(&mut reader)?;
    let mode = match magic.as_slice() {
        b"P5" => ChannelMode::Gray,
        b"P6" => ChannelMode::Rgb,
        other => {
            return Err(Error::Format(format!(
                "unsupported magic {:?}, expected P5 or P6",
                String::from_utf8_lossy(other)
            )))
        }
    };

    let width = parse_number(&next_token(&mut reader)?, "width")?;
    let height = parse_number(&next_token(&mut reader)?, "height")?;
    let max_value = parse_number(&next_token(&mut reader)?, "maximum value")?;
    if width == 0 || height == 0 {
        return Err(Error::Format(format!(
            "image dimensions must be positive, got {width}x{height}"
        )));
    }
    let max_value = u8::try_from(max_value)
        .ok()
        .filter(|&v| v > 0)
        .ok_or_else(|| {
            Error::Format(format!(
                "maximum value {max_value} is not an 8-bit sample range"
            ))
        })?;

    let len = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(mode.channels()))
        .ok_or_else(|| Error::Format(format!("image of {width}x{height} is too large")))?;
    let mut samples = try_alloc(len)?;
    reader.read_exact(&mut samples).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            Error::Format(format!("raster truncated, expected {len} bytes"))
        }
        _ => Error::io("<stream>", e),
    })?;

    Image::new(width, height, mode, max_value, samples)
}

/// Encode `image` as binary PNM.
pub fn write_to<W: Write>(writer: &mut W, image: &Image) -> Result<()> {
    let magic = match image.mode() {
        ChannelMode::Gray => 5,
        ChannelMode::Rgb => 6,
    };
    write!(
        writer,
        "P{magic}\n{} {}\n{}\n",
        image.width(),
        image.height(),
        image.max_value()
    )
    .and_then(|()| writer.write_all(image.samples()))
    .map_err(|e| Error::io("<stream>", e))
}

fn peek_byte<R: BufRead>(reader: &mut R) -> Result<Option<u8>> {
    let buf = reader.fill_buf().map_err(|e| Error::io("<stream>", e))?;
    Ok(buf.first().copied())
}

/// Next whitespace-delimited header token, skipping comments. Consumes
/// exactly one whitespace byte after the token.
fn next_token<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    // Leading whitespace and comments
    loop {
        match peek_byte(reader)? {
            None => return Err(Error::Format("header ended early".into())),
            Some(b'#') => {
                let mut comment = Vec::new();
                reader
                    .read_until(b'\n', &mut comment)
                    .map_err(|e| Error::io("<stream>", e))?;
            }
            Some(b) if b.is_ascii_whitespace() => reader.consume(1),
            Some(_) => break,
        }
    }

    let mut token = Vec::new();
    while let Some(b) = peek_byte(reader)? {
        reader.consume(1);
        if b.is_ascii_whitespace() {
            return Ok(token);
        }
        token.push(b);
    }
    Err(Error::Format("header ended early".into()))
}

fn parse_number(token: &[u8], what: &str) -> Result<usize> {
    std::str::from_utf8(token)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            Error::Format(format!(
                "invalid {what} {:?}",
                String::from_utf8_lossy(token)
            ))
        })
}
