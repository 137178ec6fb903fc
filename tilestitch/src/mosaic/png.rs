//! Streaming PNG encoder for RGBA8 scanlines.
//!
//! Rows are filtered (filter type 0), deflated through a zlib stream and
//! emitted as IDAT chunks of bounded size, so encoding a mosaic of any
//! height needs one row of pixels plus the compressor's window.

use std::io::{self, Write};

use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::artifact::Artifact;
use super::types::{ComposeError, PeakTracker};

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Upper bound on a single IDAT chunk's payload.
const IDAT_CHUNK_SIZE: usize = 256 * 1024;

fn write_chunk<W: Write>(out: &mut W, chunk_type: &[u8; 4], data: &[u8]) -> io::Result<()> {
    out.write_all(&(data.len() as u32).to_be_bytes())?;
    out.write_all(chunk_type)?;
    out.write_all(data)?;

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    out.write_all(&hasher.finalize().to_be_bytes())
}

/// Buffers compressed bytes and flushes them as IDAT chunks.
struct IdatWriter<W: Write> {
    inner: W,
    buf: Vec<u8>,
}

impl<W: Write> IdatWriter<W> {
    fn flush_chunk(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            write_chunk(&mut self.inner, b"IDAT", &self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl<W: Write> Write for IdatWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = IDAT_CHUNK_SIZE - self.buf.len();
        let n = data.len().min(room);
        self.buf.extend_from_slice(&data[..n]);
        if self.buf.len() == IDAT_CHUNK_SIZE {
            self.flush_chunk()?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Writes a PNG one scanline at a time.
pub struct PngStreamWriter<W: Write> {
    encoder: ZlibEncoder<IdatWriter<W>>,
    width: u32,
    height: u32,
    rows_written: u32,
}

impl<W: Write> PngStreamWriter<W> {
    /// Writes the signature and IHDR for an 8-bit RGBA image.
    ///
    /// Both sides must lie in `1..=2^31 - 1`.
    pub fn new(mut out: W, width: u32, height: u32) -> io::Result<Self> {
        let valid = 1..=i32::MAX as u32;
        if !valid.contains(&width) || !valid.contains(&height) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{}×{} is outside the PNG size limits", width, height),
            ));
        }
        out.write_all(&PNG_SIGNATURE)?;

        let mut ihdr = Vec::with_capacity(13);
        ihdr.extend_from_slice(&width.to_be_bytes());
        ihdr.extend_from_slice(&height.to_be_bytes());
        ihdr.push(8); // bit depth
        ihdr.push(6); // color type (RGBA)
        ihdr.push(0); // compression method
        ihdr.push(0); // filter method
        ihdr.push(0); // interlace method
        write_chunk(&mut out, b"IHDR", &ihdr)?;

        let idat = IdatWriter {
            inner: out,
            buf: Vec::with_capacity(IDAT_CHUNK_SIZE),
        };
        Ok(Self {
            encoder: ZlibEncoder::new(idat, Compression::fast()),
            width,
            height,
            rows_written: 0,
        })
    }

    /// Appends one RGBA scanline of exactly `width × 4` bytes.
    pub fn write_row(&mut self, row: &[u8]) -> io::Result<()> {
        if row.len() != self.width as usize * 4 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("row is {} bytes, expected {}", row.len(), self.width * 4),
            ));
        }
        if self.rows_written == self.height {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "more rows than declared height",
            ));
        }
        self.encoder.write_all(&[0])?; // filter: none
        self.encoder.write_all(row)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Finishes the zlib stream, writes IEND and returns the sink.
    pub fn finish(self) -> io::Result<W> {
        if self.rows_written != self.height {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} of {} rows written", self.rows_written, self.height),
            ));
        }
        let mut idat = self.encoder.finish()?;
        idat.flush_chunk()?;
        let mut out = idat.inner;
        write_chunk(&mut out, b"IEND", &[])?;
        out.flush()?;
        Ok(out)
    }
}

/// Encodes an artifact to PNG, streaming it row by row into `out`.
pub fn encode_artifact<W: Write>(
    artifact: &Artifact,
    out: W,
    peak: &PeakTracker,
) -> Result<W, ComposeError> {
    let mut row = vec![0u8; artifact.row_bytes()];
    peak.record(row.len() as u64);

    let mut reader = artifact.reader()?;
    let mut png = PngStreamWriter::new(out, artifact.width(), artifact.height())?;
    for _ in 0..artifact.height() {
        reader.read_row(&mut row)?;
        png.write_row(&row)?;
    }
    Ok(png.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_rejects_sides_beyond_png_limit() {
        assert!(PngStreamWriter::new(Vec::new(), 1 << 31, 1).is_err());
        assert!(PngStreamWriter::new(Vec::new(), 1, 0).is_err());
        assert!(PngStreamWriter::new(Vec::new(), i32::MAX as u32, 1).is_ok());
    }

    #[test]
    fn test_stream_decodes_with_image_crate() {
        let source = RgbaImage::from_fn(37, 11, |x, y| Rgba([x as u8, y as u8, 200, 255]));

        let mut png = PngStreamWriter::new(Vec::new(), 37, 11).unwrap();
        for row in source.as_raw().chunks_exact(37 * 4) {
            png.write_row(row).unwrap();
        }
        let bytes = png.finish().unwrap();

        assert_eq!(&bytes[..8], &PNG_SIGNATURE);
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, source);
    }

    #[test]
    fn test_large_image_spans_several_idat_chunks() {
        // Noise defeats compression so the stream exceeds one chunk
        let mut state = 0x2545_f491u32;
        let source = RgbaImage::from_fn(512, 512, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            Rgba(state.to_le_bytes())
        });

        let mut png = PngStreamWriter::new(Vec::new(), 512, 512).unwrap();
        for row in source.as_raw().chunks_exact(512 * 4) {
            png.write_row(row).unwrap();
        }
        let bytes = png.finish().unwrap();

        let idat_count = bytes.windows(4).filter(|w| w == b"IDAT").count();
        assert!(idat_count > 1, "expected several IDAT chunks, got {}", idat_count);
        assert_eq!(image::load_from_memory(&bytes).unwrap().to_rgba8(), source);
    }

    #[test]
    fn test_missing_rows_fail() {
        let mut png = PngStreamWriter::new(Vec::new(), 2, 2).unwrap();
        png.write_row(&[0; 8]).unwrap();
        assert!(png.finish().is_err());
    }

    #[test]
    fn test_chunk_crc_covers_type_and_data() {
        let mut out = Vec::new();
        write_chunk(&mut out, b"IEND", &[]).unwrap();
        assert_eq!(out, vec![0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82]);
    }
}
