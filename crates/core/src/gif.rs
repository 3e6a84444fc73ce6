//! Animated GIF recorder for the 2bpp screen.
//!
//! Produces GIF89a files with LZW-compressed frames. The four palette colors
//! form the global color table and the framebuffer's 2-bit indices are the
//! pixels, so frames need no color quantization. A frame whose palette
//! differs from the first one carries its own local color table.

use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// GIF code size for a 4-entry color table.
const MIN_CODE_SIZE: u8 = 2;
const MAX_CODES: u16 = 4096;
/// Color table size field: 2^(1+1) = 4 entries.
const TABLE_SIZE_BITS: u8 = 0x01;

/// Builder for animated GIF recordings of the screen.
pub struct GifEncoder {
    palette: [u32; 4],
    /// Delay between frames in centiseconds
    pub delay_cs: u16,
    data: Vec<u8>,
    pixels: Vec<u8>,
    frame_count: u32,
}

impl GifEncoder {
    /// Start a looping recording whose global color table is `palette`.
    pub fn new(palette: [u32; 4], delay_cs: u16) -> Self {
        let mut data = Vec::with_capacity(1 << 16);
        data.extend_from_slice(b"GIF89a");

        // Logical Screen Descriptor
        data.extend_from_slice(&(SCREEN_WIDTH as u16).to_le_bytes());
        data.extend_from_slice(&(SCREEN_HEIGHT as u16).to_le_bytes());
        data.push(0x80 | (TABLE_SIZE_BITS << 4) | TABLE_SIZE_BITS); // GCT, 2-bit color resolution
        data.push(0x00); // background color index
        data.push(0x00); // pixel aspect ratio
        write_color_table(&mut data, &palette);

        // Netscape Application Extension (infinite loop)
        data.extend_from_slice(&[
            0x21, 0xFF, 0x0B,
            b'N', b'E', b'T', b'S', b'C', b'A', b'P', b'E', b'2', b'.', b'0',
            0x03, 0x01,
            0x00, 0x00, // loop count = 0 (infinite)
            0x00,
        ]);

        GifEncoder {
            palette,
            delay_cs,
            data,
            pixels: Vec::with_capacity(SCREEN_WIDTH * SCREEN_HEIGHT),
            frame_count: 0,
        }
    }

    /// Append the packed 2bpp `framebuffer` as shown with `palette`.
    pub fn add_frame(&mut self, palette: &[u32; 4], framebuffer: &[u8]) {
        self.pixels.clear();
        self.pixels.extend(framebuffer.iter().flat_map(|&byte| (0..4).map(move |i| (byte >> (i * 2)) & 3)));
        self.pixels.resize(SCREEN_WIDTH * SCREEN_HEIGHT, 0);

        // Graphic Control Extension
        self.data.extend_from_slice(&[0x21, 0xF9, 0x04, 0x00]);
        self.data.extend_from_slice(&self.delay_cs.to_le_bytes());
        self.data.extend_from_slice(&[0x00, 0x00]);

        // Image Descriptor
        self.data.push(0x2C);
        self.data.extend_from_slice(&0u16.to_le_bytes());
        self.data.extend_from_slice(&0u16.to_le_bytes());
        self.data.extend_from_slice(&(SCREEN_WIDTH as u16).to_le_bytes());
        self.data.extend_from_slice(&(SCREEN_HEIGHT as u16).to_le_bytes());
        if *palette == self.palette {
            self.data.push(0x00);
        } else {
            self.data.push(0x80 | TABLE_SIZE_BITS);
            write_color_table(&mut self.data, palette);
        }

        self.data.push(MIN_CODE_SIZE);
        let compressed = lzw_compress(&self.pixels, MIN_CODE_SIZE);
        for block in compressed.chunks(255) {
            self.data.push(block.len() as u8);
            self.data.extend_from_slice(block);
        }
        self.data.push(0x00);

        self.frame_count += 1;
    }

    /// Finalize the GIF and return the complete file data.
    pub fn finish(mut self) -> Vec<u8> {
        self.data.push(0x3B);
        self.data
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }
}

fn write_color_table(data: &mut Vec<u8>, palette: &[u32; 4]) {
    for &rgb in palette {
        data.extend_from_slice(&[(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8]);
    }
}

// ─── LZW Compression ────────────────────────────────────────────────────────

/// Marks an absent child in the dictionary trie.
const NO_CODE: u16 = 0;

fn lzw_compress(data: &[u8], min_code_size: u8) -> Vec<u8> {
    let symbols = 1usize << min_code_size;
    let clear_code = symbols as u16;
    let eoi_code = clear_code + 1;

    let mut output = BitWriter::new();
    let mut code_size = u32::from(min_code_size) + 1;
    let mut next_code = eoi_code + 1;
    // children[code * symbols + pixel] is the code for that string plus pixel.
    // Entries are always above eoi_code, so 0 is free to mean "none".
    let mut children = vec![NO_CODE; MAX_CODES as usize * symbols];

    output.write_bits(u32::from(clear_code), code_size);

    let Some((&first, rest)) = data.split_first() else {
        output.write_bits(u32::from(eoi_code), code_size);
        return output.finish();
    };
    let mut prefix = u16::from(first);

    for &pixel in rest {
        let slot = prefix as usize * symbols + pixel as usize;
        let child = children[slot];
        if child != NO_CODE {
            prefix = child;
            continue;
        }

        output.write_bits(u32::from(prefix), code_size);
        if next_code < MAX_CODES {
            children[slot] = next_code;
            next_code += 1;
            if u32::from(next_code) > (1 << code_size) && code_size < 12 {
                code_size += 1;
            }
        } else {
            output.write_bits(u32::from(clear_code), code_size);
            children.fill(NO_CODE);
            code_size = u32::from(min_code_size) + 1;
            next_code = eoi_code + 1;
        }
        prefix = u16::from(pixel);
    }

    output.write_bits(u32::from(prefix), code_size);
    output.write_bits(u32::from(eoi_code), code_size);
    output.finish()
}

struct BitWriter {
    data: Vec<u8>,
    current: u32,
    bits: u32,
}

impl BitWriter {
    fn new() -> Self {
        BitWriter { data: Vec::with_capacity(8192), current: 0, bits: 0 }
    }

    fn write_bits(&mut self, value: u32, num_bits: u32) {
        self.current |= value << self.bits;
        self.bits += num_bits;
        while self.bits >= 8 {
            self.data.push(self.current as u8);
            self.current >>= 8;
            self.bits -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.data.push(self.current as u8);
        }
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DEFAULT_PALETTE, FRAMEBUFFER_SIZE};

    /// Reference LZW decoder for checking the encoder's output.
    fn lzw_decode(bytes: &[u8], min_code_size: u8) -> Vec<u8> {
        let clear = 1u32 << min_code_size;
        let eoi = clear + 1;
        let mut table: Vec<Vec<u8>> = Vec::new();
        let reset = |table: &mut Vec<Vec<u8>>| {
            table.clear();
            table.extend((0..clear).map(|i| vec![i as u8]));
            table.push(Vec::new());
            table.push(Vec::new());
        };
        reset(&mut table);

        let mut out = Vec::new();
        let mut size = u32::from(min_code_size) + 1;
        let mut prev: Option<Vec<u8>> = None;
        let (mut acc, mut nbits, mut pos) = (0u32, 0u32, 0usize);
        loop {
            while nbits < size {
                acc |= u32::from(bytes[pos]) << nbits;
                pos += 1;
                nbits += 8;
            }
            let code = acc & ((1 << size) - 1);
            acc >>= size;
            nbits -= size;

            if code == clear {
                reset(&mut table);
                size = u32::from(min_code_size) + 1;
                prev = None;
                continue;
            }
            if code == eoi {
                return out;
            }
            let entry = match (&prev, table.get(code as usize)) {
                (_, Some(e)) => e.clone(),
                (Some(p), None) => {
                    let mut e = p.clone();
                    e.push(p[0]);
                    e
                }
                (None, None) => panic!("bad first code {code}"),
            };
            if let Some(p) = prev.take() {
                if table.len() < 4096 {
                    let mut added = p;
                    added.push(entry[0]);
                    table.push(added);
                }
            }
            if table.len() == (1 << size) && size < 12 {
                size += 1;
            }
            out.extend_from_slice(&entry);
            prev = Some(entry);
        }
    }

    /// Concatenate the data sub-blocks starting at `pos`.
    fn read_sub_blocks(gif: &[u8], mut pos: usize) -> (Vec<u8>, usize) {
        let mut data = Vec::new();
        while gif[pos] != 0 {
            let len = gif[pos] as usize;
            data.extend_from_slice(&gif[pos + 1..pos + 1 + len]);
            pos += 1 + len;
        }
        (data, pos + 1)
    }

    fn noisy_framebuffer() -> Vec<u8> {
        let mut seed = 0x2545_f491u32;
        (0..FRAMEBUFFER_SIZE)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                seed as u8
            })
            .collect()
    }

    #[test]
    fn test_gif_structure() {
        let mut gif = GifEncoder::new(DEFAULT_PALETTE, 3);
        let fb = vec![0u8; FRAMEBUFFER_SIZE];
        gif.add_frame(&DEFAULT_PALETTE, &fb);
        gif.add_frame(&DEFAULT_PALETTE, &fb);
        assert_eq!(gif.frame_count(), 2);

        let data = gif.finish();
        assert_eq!(&data[..6], b"GIF89a");
        assert_eq!(u16::from_le_bytes([data[6], data[7]]), 160);
        assert_eq!(u16::from_le_bytes([data[8], data[9]]), 160);
        assert_eq!(data[10] & 0x87, 0x81);
        // Global color table follows the 13-byte header
        assert_eq!(&data[13..16], &[0xe0, 0xf8, 0xcf]);
        assert_eq!(&data[22..25], &[0x07, 0x18, 0x21]);
        assert_eq!(*data.last().unwrap(), 0x3B);
    }

    #[test]
    fn test_frame_decodes_to_screen_indices() {
        let fb = noisy_framebuffer();
        let mut gif = GifEncoder::new(DEFAULT_PALETTE, 3);
        gif.add_frame(&DEFAULT_PALETTE, &fb);
        let data = gif.finish();

        // header(13) + table(12) + netscape(19) + GCE(8) + descriptor(10)
        let image = 13 + 12 + 19 + 8;
        assert_eq!(data[image], 0x2C);
        assert_eq!(data[image + 9], 0x00);
        assert_eq!(data[image + 10], MIN_CODE_SIZE);
        let (lzw, end) = read_sub_blocks(&data, image + 11);
        assert_eq!(end, data.len() - 1);

        let pixels = lzw_decode(&lzw, MIN_CODE_SIZE);
        assert_eq!(pixels.len(), SCREEN_WIDTH * SCREEN_HEIGHT);
        for (i, &p) in pixels.iter().enumerate() {
            assert_eq!(p, (fb[i >> 2] >> ((i & 3) * 2)) & 3, "pixel {i}");
        }
    }

    #[test]
    fn test_changed_palette_gets_local_table() {
        let mut gif = GifEncoder::new(DEFAULT_PALETTE, 3);
        let palette = [0xff0000, 0x00ff00, 0x0000ff, 0xffffff];
        gif.add_frame(&palette, &[0u8; FRAMEBUFFER_SIZE]);
        let data = gif.finish();

        let image = 13 + 12 + 19 + 8;
        assert_eq!(data[image + 9], 0x81);
        assert_eq!(&data[image + 10..image + 13], &[0xff, 0x00, 0x00]);
        assert_eq!(data[image + 22], MIN_CODE_SIZE);
    }
}
