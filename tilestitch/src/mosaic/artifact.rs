//! Raw RGBA8 raster files used for blocks and merge intermediates.
//!
//! # Format
//!
//! ```text
//! offset  size  field
//! 0       8     magic "TSRGBA01"
//! 8       4     width  (u32 little-endian)
//! 12      4     height (u32 little-endian)
//! 16      ...   width × height × 4 bytes, rows top to bottom
//! ```
//!
//! Artifacts are read and written one scanline at a time so merges never
//! hold more than a row of pixels.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use image::RgbaImage;

use super::types::{ComposeError, BYTES_PER_PIXEL};

const MAGIC: &[u8; 8] = b"TSRGBA01";
const HEADER_LEN: u64 = 16;

/// Handle to a finished artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: PathBuf,
    width: u32,
    height: u32,
}

impl Artifact {
    /// Writes an in-memory image as an artifact.
    pub fn write_image(path: impl Into<PathBuf>, image: &RgbaImage) -> Result<Self, ComposeError> {
        let mut writer = ArtifactWriter::create(path, image.width(), image.height())?;
        for row in image.as_raw().chunks_exact(image.width() as usize * 4) {
            writer.write_row(row)?;
        }
        writer.finish()
    }

    /// Opens an existing artifact, validating its header and length.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ComposeError> {
        let path = path.into();
        let mut file = File::open(&path)?;
        let (width, height) = read_header(&mut file, &path)?;

        let expected = HEADER_LEN + width as u64 * height as u64 * BYTES_PER_PIXEL;
        let actual = file.metadata()?.len();
        if actual != expected {
            return Err(ComposeError::Artifact(format!(
                "{} is {} bytes, expected {} for {}×{}",
                path.display(),
                actual,
                expected,
                width,
                height
            )));
        }

        Ok(Self {
            path,
            width,
            height,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes in one scanline.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL as usize
    }

    /// Opens a scanline reader positioned at the first row.
    pub fn reader(&self) -> Result<ArtifactReader, ComposeError> {
        let mut file = File::open(&self.path)?;
        let (width, height) = read_header(&mut file, &self.path)?;
        if (width, height) != (self.width, self.height) {
            return Err(ComposeError::Artifact(format!(
                "{} changed on disk",
                self.path.display()
            )));
        }
        Ok(ArtifactReader {
            inner: BufReader::new(file),
            row_bytes: self.row_bytes(),
            rows_left: self.height,
        })
    }

    /// Loads the whole artifact into memory.
    ///
    /// Only for small artifacts and tests; the compose path never calls it
    /// on anything larger than a block.
    pub fn load(&self) -> Result<RgbaImage, ComposeError> {
        let mut reader = self.reader()?;
        let mut data = vec![0u8; self.row_bytes() * self.height as usize];
        for row in data.chunks_exact_mut(self.row_bytes().max(1)) {
            reader.read_row(row)?;
        }
        RgbaImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| ComposeError::Artifact("pixel buffer size mismatch".to_string()))
    }

    /// Deletes the artifact file.
    pub fn remove(self) -> Result<(), ComposeError> {
        std::fs::remove_file(&self.path)?;
        Ok(())
    }
}

fn read_header(file: &mut File, path: &Path) -> Result<(u32, u32), ComposeError> {
    let mut header = [0u8; HEADER_LEN as usize];
    file.read_exact(&mut header).map_err(|e| {
        ComposeError::Artifact(format!("{}: truncated header ({})", path.display(), e))
    })?;
    if &header[..8] != MAGIC {
        return Err(ComposeError::Artifact(format!(
            "{}: bad magic",
            path.display()
        )));
    }
    let width = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
    let height = u32::from_le_bytes([header[12], header[13], header[14], header[15]]);
    Ok((width, height))
}

/// Sequential scanline reader.
pub struct ArtifactReader {
    inner: BufReader<File>,
    row_bytes: usize,
    rows_left: u32,
}

impl ArtifactReader {
    /// Reads the next scanline into `buf`, which must be exactly one row long.
    pub fn read_row(&mut self, buf: &mut [u8]) -> Result<(), ComposeError> {
        if buf.len() != self.row_bytes {
            return Err(ComposeError::DimensionMismatch(format!(
                "row buffer is {} bytes, artifact rows are {}",
                buf.len(),
                self.row_bytes
            )));
        }
        if self.rows_left == 0 {
            return Err(ComposeError::Artifact("read past last row".to_string()));
        }
        self.inner.read_exact(buf)?;
        self.rows_left -= 1;
        Ok(())
    }
}

/// Sequential scanline writer producing an [`Artifact`].
pub struct ArtifactWriter {
    inner: BufWriter<File>,
    path: PathBuf,
    width: u32,
    height: u32,
    rows_written: u32,
}

impl ArtifactWriter {
    /// Creates the file and writes its header.
    pub fn create(path: impl Into<PathBuf>, width: u32, height: u32) -> Result<Self, ComposeError> {
        let path = path.into();
        let mut inner = BufWriter::new(File::create(&path)?);
        inner.write_all(MAGIC)?;
        inner.write_all(&width.to_le_bytes())?;
        inner.write_all(&height.to_le_bytes())?;
        Ok(Self {
            inner,
            path,
            width,
            height,
            rows_written: 0,
        })
    }

    pub fn write_row(&mut self, row: &[u8]) -> Result<(), ComposeError> {
        let expected = self.width as usize * BYTES_PER_PIXEL as usize;
        if row.len() != expected {
            return Err(ComposeError::DimensionMismatch(format!(
                "row is {} bytes, expected {}",
                row.len(),
                expected
            )));
        }
        if self.rows_written == self.height {
            return Err(ComposeError::Artifact(format!(
                "{}: more than {} rows written",
                self.path.display(),
                self.height
            )));
        }
        self.inner.write_all(row)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Flushes the file and returns its handle.
    ///
    /// Fails if fewer rows than the declared height were written.
    pub fn finish(mut self) -> Result<Artifact, ComposeError> {
        if self.rows_written != self.height {
            return Err(ComposeError::Artifact(format!(
                "{}: {} of {} rows written",
                self.path.display(),
                self.rows_written,
                self.height
            )));
        }
        self.inner.flush()?;
        Ok(Artifact {
            path: self.path,
            width: self.width,
            height: self.height,
        })
    }
}
