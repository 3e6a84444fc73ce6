//! PNG screenshot encoder.
//!
//! The screen is written as a 2-bit indexed PNG whose `PLTE` chunk holds the
//! four palette registers, so a screenshot is a byte-for-byte view of the
//! framebuffer. Image data is zlib-compressed with `miniz_oxide`.

use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

const SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const COLOR_TYPE_INDEXED: u8 = 3;

fn write_header(png: &mut Vec<u8>, width: u32, height: u32, bit_depth: u8, color_type: u8) {
    png.extend_from_slice(&SIGNATURE);
    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.push(bit_depth);
    ihdr.push(color_type);
    ihdr.extend_from_slice(&[0, 0, 0]); // compression, filter, interlace
    write_chunk(png, b"IHDR", &ihdr);
}

fn write_image(png: &mut Vec<u8>, raw: &[u8]) {
    let zlib = miniz_oxide::deflate::compress_to_vec_zlib(raw, 6);
    write_chunk(png, b"IDAT", &zlib);
    write_chunk(png, b"IEND", &[]);
}

/// Encode the 160×160 screen as an indexed PNG.
///
/// The framebuffer keeps the leftmost pixel in the low bits of each byte;
/// PNG wants it in the high bits, so every byte is reversed in 2-bit units.
pub fn encode_screen(palette: &[u32; 4], framebuffer: &[u8]) -> Vec<u8> {
    let mut png = Vec::with_capacity(4096);
    write_header(&mut png, SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, 2, COLOR_TYPE_INDEXED);

    let plte: Vec<u8> = palette.iter().flat_map(|&c| [(c >> 16) as u8, (c >> 8) as u8, c as u8]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    let stride = SCREEN_WIDTH / 4;
    let mut raw = Vec::with_capacity((stride + 1) * SCREEN_HEIGHT);
    for row in framebuffer.chunks(stride).take(SCREEN_HEIGHT) {
        raw.push(0);
        raw.extend(row.iter().map(|&b| {
            (b & 0x03) << 6 | (b & 0x0c) << 2 | (b & 0x30) >> 2 | (b & 0xc0) >> 6
        }));
    }
    write_image(&mut png, &raw);
    png
}

fn write_chunk(out: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(data);
    let crc = crc32(&chunk_type[..], data);
    out.extend_from_slice(&crc.to_be_bytes());
}

// CRC-32 over chunk type + data
fn crc32(chunk_type: &[u8], data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFFFFFF;
    for &b in chunk_type.iter().chain(data.iter()) {
        crc ^= b as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xEDB88320 } else { crc >> 1 };
        }
    }
    crc ^ 0xFFFFFFFF
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DEFAULT_PALETTE, FRAMEBUFFER_SIZE};

    /// Split a PNG into (type, data) chunks.
    fn chunks(png: &[u8]) -> Vec<([u8; 4], Vec<u8>)> {
        let mut out = Vec::new();
        let mut pos = 8;
        while pos < png.len() {
            let len = u32::from_be_bytes(png[pos..pos + 4].try_into().unwrap()) as usize;
            let ty: [u8; 4] = png[pos + 4..pos + 8].try_into().unwrap();
            let data = png[pos + 8..pos + 8 + len].to_vec();
            let crc = u32::from_be_bytes(png[pos + 8 + len..pos + 12 + len].try_into().unwrap());
            assert_eq!(crc, crc32(&ty, &data));
            out.push((ty, data));
            pos += 12 + len;
        }
        out
    }

    #[test]
    fn test_crc32_known_value() {
        // CRC of an empty IEND chunk
        assert_eq!(crc32(b"IEND", &[]), 0xAE426082);
    }

    #[test]
    fn test_screen_indexed() {
        let mut fb = vec![0u8; FRAMEBUFFER_SIZE];
        // Pixels 0..4 of row 0 = indices 1, 2, 3, 0
        fb[0] = 0b00_11_10_01;
        let png = encode_screen(&DEFAULT_PALETTE, &fb);
        let parts = chunks(&png);
        let ihdr = &parts[0].1;
        assert_eq!(&ihdr[0..8], &[0, 0, 0, 160, 0, 0, 0, 160]);
        assert_eq!((ihdr[8], ihdr[9]), (2, COLOR_TYPE_INDEXED));
        assert_eq!(&parts[1].0, b"PLTE");
        assert_eq!(&parts[1].1[..3], &[0xe0, 0xf8, 0xcf]);

        let raw = miniz_oxide::inflate::decompress_to_vec_zlib(&parts[2].1).unwrap();
        assert_eq!(raw.len(), 160 * 41);
        assert_eq!(raw[0], 0);
        assert_eq!(raw[1], 0b01_10_11_00);
    }
}
