use std::fs;
use std::io::{self, Write};
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{AnalysisError, Result};

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Encode 8-bit RGB rows (`width * 3` bytes each, top first) as a PNG file.
pub fn encode_rgb(width: u32, height: u32, pixels: &[u8]) -> io::Result<Vec<u8>> {
    let stride = width as usize * 3;
    if pixels.len() != stride * height as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "expected {} bytes for a {}x{} image, got {}",
                stride * height as usize,
                width,
                height,
                pixels.len()
            ),
        ));
    }

    let mut png = Vec::with_capacity(pixels.len() / 4 + 64);
    png.extend_from_slice(&SIGNATURE);

    let mut header = Vec::with_capacity(13);
    header.extend_from_slice(&width.to_be_bytes());
    header.extend_from_slice(&height.to_be_bytes());
    // bit depth 8, colour type 2 (RGB), deflate, adaptive filtering, no interlace
    header.extend_from_slice(&[8, 2, 0, 0, 0]);
    write_chunk(&mut png, b"IHDR", &header);

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    for row in pixels.chunks(stride.max(1)) {
        encoder.write_all(&[0])?;
        encoder.write_all(row)?;
    }
    let data = encoder.finish()?;
    write_chunk(&mut png, b"IDAT", &data);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

pub fn write_rgb(path: &Path, width: u32, height: u32, pixels: &[u8]) -> Result<()> {
    let png = encode_rgb(width, height, pixels).map_err(|e| AnalysisError::io(path, e))?;
    fs::write(path, png).map_err(|e| AnalysisError::io(path, e))
}

fn write_chunk(png: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(kind);
    png.extend_from_slice(data);

    let mut crc = crc32fast::Hasher::new();
    crc.update(kind);
    crc.update(data);
    png.extend_from_slice(&crc.finalize().to_be_bytes());
}
