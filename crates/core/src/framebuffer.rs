//! 2 bpp indexed framebuffer and software rasterizer.
//!
//! The screen is 160×160 pixels, row-major, four horizontally adjacent
//! pixels per byte. Pixel `(x, y)` lives in byte `(160 * y + x) >> 2` at bit
//! shift `(x & 3) * 2`, so the leftmost pixel of a quartet is in the low bits.
//!
//! Drawing never uses palette indices directly. Each primitive picks one or
//! more *draw color* nibbles out of the 16-bit draw-colors register; nibble
//! `0` means "leave the pixel alone", `1..=4` selects palette index `n - 1`.
//!
//! | Primitive | Nibble 0 | Nibble 1 |
//! |-----------|----------|----------|
//! | `rect`    | fill     | outline  |
//! | `oval`    | fill     | outline  |
//! | `line`, `hline`, `vline` | stroke | - |
//! | `text`    | glyph    | background |
//! | `blit`    | one nibble per source color index | |

use crate::font::{self, GLYPH_SIZE};
use crate::{BLIT_2BPP, BLIT_FLIP_X, BLIT_FLIP_Y, BLIT_ROTATE, FRAMEBUFFER_SIZE, SCREEN_HEIGHT, SCREEN_WIDTH};

const WIDTH: i64 = SCREEN_WIDTH as i64;
const HEIGHT: i64 = SCREEN_HEIGHT as i64;

/// Decoded `blit` flag bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlitFlags {
    pub bpp2: bool,
    pub flip_x: bool,
    pub flip_y: bool,
    pub rotate: bool,
}

impl BlitFlags {
    pub fn from_bits(flags: u32) -> Self {
        BlitFlags {
            bpp2: flags & BLIT_2BPP != 0,
            flip_x: flags & BLIT_FLIP_X != 0,
            flip_y: flags & BLIT_FLIP_Y != 0,
            rotate: flags & BLIT_ROTATE != 0,
        }
    }

    /// Bits per pixel of the source sprite.
    pub fn bpp(&self) -> u32 {
        if self.bpp2 { 2 } else { 1 }
    }
}

/// Map a draw-color nibble to a palette index, or `None` when transparent.
#[inline(always)]
fn nibble_color(draw_colors: u16, slot: u32) -> Option<u8> {
    let dc = (draw_colors >> (slot * 4)) & 0xf;
    if dc == 0 { None } else { Some(((dc - 1) & 0x3) as u8) }
}

/// A rasterizer view over the framebuffer bytes.
///
/// The draw-colors register is captured when the view is created, so one
/// view corresponds to one drawing call.
pub struct Framebuffer<'a> {
    bytes: &'a mut [u8],
    draw_colors: u16,
}

impl<'a> Framebuffer<'a> {
    pub fn new(bytes: &'a mut [u8], draw_colors: u16) -> Self {
        debug_assert_eq!(bytes.len(), FRAMEBUFFER_SIZE);
        Framebuffer { bytes, draw_colors }
    }

    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Palette index at `(x, y)`. Coordinates must be on screen.
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        let idx = (SCREEN_WIDTH * y + x) >> 2;
        let shift = (x & 0x3) << 1;
        (self.bytes[idx] >> shift) & 0x3
    }

    /// Write one pixel, keeping the other three in the same byte.
    #[inline(always)]
    fn draw_point(&mut self, color: u8, x: i64, y: i64) {
        let idx = ((WIDTH * y + x) >> 2) as usize;
        let shift = (x & 0x3) << 1;
        let mask = 0x3u8 << shift;
        self.bytes[idx] = (color << shift) | (self.bytes[idx] & !mask);
    }

    #[inline(always)]
    fn draw_point_clipped(&mut self, color: u8, x: i64, y: i64) {
        if (0..WIDTH).contains(&x) && (0..HEIGHT).contains(&y) {
            self.draw_point(color, x, y);
        }
    }

    /// Fill `[start_x, end_x)` on row `y`. Bounds must already be clipped.
    ///
    /// Whole aligned quartets are written as bytes.
    fn hline_fast(&mut self, color: u8, start_x: i64, y: i64, end_x: i64) {
        let fill_end = end_x - (end_x & 3);
        let fill_start = ((start_x + 3) & !3).min(fill_end);
        let mut x = start_x;

        if fill_end - fill_start > 3 {
            for xx in start_x..fill_start {
                self.draw_point(color, xx, y);
            }
            let from = ((WIDTH * y + fill_start) >> 2) as usize;
            let to = ((WIDTH * y + fill_end) >> 2) as usize;
            self.bytes[from..to].fill(color * 0b0101_0101);
            x = fill_end;
        }

        for xx in x..end_x {
            self.draw_point(color, xx, y);
        }
    }

    fn hline_clipped(&mut self, color: u8, start_x: i64, y: i64, end_x: i64) {
        if (0..HEIGHT).contains(&y) {
            let start_x = start_x.max(0);
            let end_x = end_x.min(WIDTH);
            if start_x < end_x {
                self.hline_fast(color, start_x, y, end_x);
            }
        }
    }

    // ─── Primitives ─────────────────────────────────────────────────────────

    pub fn hline(&mut self, x: i32, y: i32, len: u32) {
        if let Some(color) = nibble_color(self.draw_colors, 0) {
            let x = x as i64;
            self.hline_clipped(color, x, y as i64, x + len as i64);
        }
    }

    pub fn vline(&mut self, x: i32, y: i32, len: u32) {
        let (x, y) = (x as i64, y as i64);
        if y + len as i64 <= 0 || !(0..WIDTH).contains(&x) {
            return;
        }
        if let Some(color) = nibble_color(self.draw_colors, 0) {
            let start_y = y.max(0);
            let end_y = (y + len as i64).min(HEIGHT);
            for yy in start_y..end_y {
                self.draw_point(color, x, yy);
            }
        }
    }

    pub fn rect(&mut self, x: i32, y: i32, width: u32, height: u32) {
        let (x, y) = (x as i64, y as i64);
        let end_x_unclamped = x + width as i64;
        let end_y_unclamped = y + height as i64;
        let start_x = x.max(0);
        let start_y = y.max(0);
        let end_x = end_x_unclamped.min(WIDTH);
        let end_y = end_y_unclamped.min(HEIGHT);
        if start_x >= end_x || start_y >= end_y {
            return;
        }

        if let Some(fill) = nibble_color(self.draw_colors, 0) {
            for yy in start_y..end_y {
                self.hline_fast(fill, start_x, yy, end_x);
            }
        }

        if let Some(stroke) = nibble_color(self.draw_colors, 1) {
            // Left and right edges
            if (0..WIDTH).contains(&x) {
                for yy in start_y..end_y {
                    self.draw_point(stroke, x, yy);
                }
            }
            if end_x_unclamped > 0 && end_x_unclamped <= WIDTH {
                for yy in start_y..end_y {
                    self.draw_point(stroke, end_x_unclamped - 1, yy);
                }
            }
            // Top and bottom edges
            if (0..HEIGHT).contains(&y) {
                self.hline_fast(stroke, start_x, y, end_x);
            }
            if end_y_unclamped > 0 && end_y_unclamped <= HEIGHT {
                self.hline_fast(stroke, start_x, end_y_unclamped - 1, end_x);
            }
        }
    }

    /// Bresenham line between two inclusive endpoints.
    pub fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        let Some(color) = nibble_color(self.draw_colors, 0) else {
            return;
        };
        let (mut x1, mut y1, mut x2, mut y2) = (x1 as i64, y1 as i64, x2 as i64, y2 as i64);
        if (x1 < 0 && x2 < 0) || (x1 >= WIDTH && x2 >= WIDTH) || (y1 < 0 && y2 < 0) || (y1 >= HEIGHT && y2 >= HEIGHT) {
            return;
        }

        if y1 > y2 {
            std::mem::swap(&mut x1, &mut x2);
            std::mem::swap(&mut y1, &mut y2);
        }

        let dx = (x2 - x1).abs();
        let sx = if x1 < x2 { 1 } else { -1 };
        let dy = y2 - y1;
        let mut err = (if dx > dy { dx } else { -dy }) / 2;

        loop {
            self.draw_point_clipped(color, x1, y1);
            if x1 == x2 && y1 == y2 {
                break;
            }
            let e2 = err;
            if e2 > -dx {
                err -= dy;
                x1 += sx;
            }
            if e2 < dy {
                err += dx;
                y1 += 1;
            }
        }
    }

    /// Ellipse inscribed in the given box.
    ///
    /// Midpoint variant: scan one quadrant along the edge and mirror each
    /// step into the other three. Long, thin ellipses are the fragile case;
    /// the trailing loop finishes the vertical extent the scan can leave short.
    pub fn oval(&mut self, x: i32, y: i32, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let fill = nibble_color(self.draw_colors, 0);
        let stroke = nibble_color(self.draw_colors, 1);
        let (x, y, width, height) = (x as i64, y as i64, width as i64, height as i64);
        if x >= WIDTH || y >= HEIGHT || x + width <= 0 || y + height <= 0 {
            return;
        }

        let mut north = y + height / 2;
        let mut west = x;
        let mut east = x + width - 1;
        // For even heights the bottom scanline overlaps the top one
        let mut south = north - (height - 1) % 2;

        // Error terms grow with the fourth power of the box size
        let a = (width - 1) as i128;
        let b = (height - 1) as i128;
        let mut b1 = b % 2;

        let mut dx = 4 * (1 - a) * b * b;
        let mut dy = 4 * (b1 + 1) * a * a;
        let mut err = dx + dy + b1 * a * a;

        let a8 = 8 * a * a;
        b1 = 8 * b * b;

        loop {
            if let Some(stroke) = stroke {
                self.draw_point_clipped(stroke, east, north);
                self.draw_point_clipped(stroke, west, north);
                self.draw_point_clipped(stroke, west, south);
                self.draw_point_clipped(stroke, east, south);
            }
            if let Some(fill) = fill {
                let start = west + 1;
                if east - start > 0 {
                    self.hline_clipped(fill, start, north, east);
                    self.hline_clipped(fill, start, south, east);
                }
            }
            let err2 = 2 * err;
            if err2 <= dy {
                north += 1;
                south -= 1;
                dy += a8;
                err += dy;
            }
            if err2 >= dx || 2 * err > dy {
                west += 1;
                east -= 1;
                dx += b1;
                err += dx;
            }
            if west > east {
                break;
            }
        }

        while north - south < height {
            if let Some(stroke) = stroke {
                self.draw_point_clipped(stroke, west - 1, north);
                self.draw_point_clipped(stroke, east + 1, north);
                self.draw_point_clipped(stroke, west - 1, south);
                self.draw_point_clipped(stroke, east + 1, south);
            }
            north += 1;
            south -= 1;
        }
    }

    /// Copy a `width × height` window of a packed sprite to the screen.
    ///
    /// `(src_x, src_y)` and `stride` address the window inside a larger sheet.
    /// Clipping happens in destination space and is mapped back through the
    /// transform: `rotate` swaps the sampling axes (and toggles `flip_x`),
    /// then the flips mirror within the requested window.
    #[allow(clippy::too_many_arguments)]
    pub fn blit(
        &mut self,
        sprite: &[u8],
        dst_x: i32,
        dst_y: i32,
        width: i32,
        height: i32,
        src_x: i32,
        src_y: i32,
        stride: i32,
        flags: BlitFlags,
    ) {
        let colors = self.draw_colors;
        let (dst_x, dst_y, width, height) = (dst_x as i64, dst_y as i64, width as i64, height as i64);
        let (src_x, src_y, stride) = (src_x as i64, src_y as i64, stride as i64);
        let flip_x = flags.flip_x ^ flags.rotate;

        let (clip_x_min, clip_y_min, clip_x_max, clip_y_max) = if flags.rotate {
            (
                dst_y.max(0) - dst_y,
                dst_x.max(0) - dst_x,
                width.min(HEIGHT - dst_y),
                height.min(WIDTH - dst_x),
            )
        } else {
            (
                dst_x.max(0) - dst_x,
                dst_y.max(0) - dst_y,
                width.min(WIDTH - dst_x),
                height.min(HEIGHT - dst_y),
            )
        };

        for y in clip_y_min..clip_y_max {
            for x in clip_x_min..clip_x_max {
                let (tx, ty) = if flags.rotate { (dst_x + y, dst_y + x) } else { (dst_x + x, dst_y + y) };

                // Flips mirror within the requested width/height, not the clipped
                // extent, so a clipped blit is a crop of the unclipped one
                let sx = src_x + if flip_x { width - x - 1 } else { x };
                let sy = src_y + if flags.flip_y { height - y - 1 } else { y };

                let color_idx = sample(sprite, sy * stride + sx, flags.bpp2);
                if let Some(color) = nibble_color(colors, color_idx as u32) {
                    self.draw_point(color, tx, ty);
                }
            }
        }
    }

    /// Render text from a sequence of code points with the built-in font.
    ///
    /// Stops at the first NUL. `\n` returns to `x` one glyph row down.
    pub fn text<I>(&mut self, chars: I, x: i32, y: i32)
    where
        I: IntoIterator<Item = u32>,
    {
        let mut cursor_x = x;
        let mut cursor_y = y;
        for code in chars {
            match code {
                0 => return,
                0x0A => {
                    cursor_y = cursor_y.wrapping_add(GLYPH_SIZE);
                    cursor_x = x;
                    continue;
                }
                c if c < 32 => {}
                c => {
                    // Ink is source index 0 so it takes nibble 0, background nibble 1
                    let rows = font::glyph(c).map(|row| !row);
                    self.blit(&rows, cursor_x, cursor_y, GLYPH_SIZE, GLYPH_SIZE, 0, 0, GLYPH_SIZE, BlitFlags::default());
                }
            }
            cursor_x = cursor_x.wrapping_add(GLYPH_SIZE);
        }
    }
}

/// Color index of the pixel at `bit_index` (in pixels) of a packed sprite.
/// Reads past the end of `sprite` yield index 0.
#[inline(always)]
fn sample(sprite: &[u8], bit_index: i64, bpp2: bool) -> u8 {
    if bit_index < 0 {
        return 0;
    }
    if bpp2 {
        let byte = sprite.get((bit_index >> 2) as usize).copied().unwrap_or(0);
        let shift = 6 - ((bit_index & 0x03) << 1);
        (byte >> shift) & 0b11
    } else {
        let byte = sprite.get((bit_index >> 3) as usize).copied().unwrap_or(0);
        let shift = 7 - (bit_index & 0x07);
        (byte >> shift) & 0b1
    }
}
