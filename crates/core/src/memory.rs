//! The 64 KB shared memory region.
//!
//! This is the only channel between guest and host. The layout is a fixed,
//! byte-exact contract; every multi-byte field is little-endian:
//!
//! | Address Range | Content                                           |
//! |---------------|---------------------------------------------------|
//! | 0x0000–0x0003 | reserved                                          |
//! | 0x0004–0x0013 | palette (4 × u32 0x00RRGGBB)                      |
//! | 0x0014–0x0015 | draw colors (4 nibbles)                           |
//! | 0x0016–0x0019 | gamepads 1–4                                      |
//! | 0x001A–0x001D | mouse X, mouse Y (i16)                            |
//! | 0x001E        | mouse buttons                                     |
//! | 0x001F        | system flags                                      |
//! | 0x0020–0x009F | reserved                                          |
//! | 0x00A0–0x199F | framebuffer (160×160, 2 bpp)                      |
//! | 0x19A0–0xFFFF | guest scratch                                     |
//!
//! Guest-supplied addresses are plain `u32` offsets into the region. They are
//! only turned into slices through [`Memory::slice`], [`Memory::slice_mut`] and
//! [`Memory::cstr`], which do the overflow-checked bounds arithmetic in one
//! place and hand back borrows that cannot outlive the call.

use std::ops::Range;

use crate::bytes::{read_f64_le, read_i16_le, read_u16_le, read_u32_le, write_i16_le, write_u16_le, write_u32_le};
use crate::error::Trap;
use crate::{
    ADDR_DRAW_COLORS, ADDR_FRAMEBUFFER, ADDR_GAMEPADS, ADDR_MOUSE_BUTTONS, ADDR_MOUSE_X, ADDR_MOUSE_Y,
    ADDR_PALETTE, ADDR_SYSTEM_FLAGS, DEFAULT_DRAW_COLORS, DEFAULT_PALETTE, FRAMEBUFFER_SIZE, MEMORY_SIZE,
    MOUSE_NONE,
};

/// Guest-visible memory with typed accessors for the host-owned fields.
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// A zeroed region. Call [`Memory::reset`] to install the boot defaults.
    pub fn new() -> Self {
        Memory { data: vec![0u8; MEMORY_SIZE] }
    }

    /// Zero the region and install the default palette, draw colors and the
    /// off-screen mouse sentinel.
    pub fn reset(&mut self) {
        self.data.fill(0);
        for (i, &color) in DEFAULT_PALETTE.iter().enumerate() {
            self.set_palette_color(i, color);
        }
        self.set_draw_colors(DEFAULT_DRAW_COLORS);
        write_i16_le(&mut self.data, ADDR_MOUSE_X, MOUSE_NONE);
        write_i16_le(&mut self.data, ADDR_MOUSE_Y, MOUSE_NONE);
    }

    // --- Bounds-checked guest access ---

    /// Validate `len` bytes starting at guest address `offset`.
    pub fn check(&self, offset: u32, len: u32) -> Result<Range<usize>, Trap> {
        let start = offset as usize;
        let end = start.checked_add(len as usize).ok_or(Trap::Overflow)?;
        if end > self.data.len() {
            log::warn!("guest access out of bounds: {len} bytes at {offset:#x}");
            return Err(Trap::OutOfBounds { offset, len });
        }
        Ok(start..end)
    }

    pub fn slice(&self, offset: u32, len: u32) -> Result<&[u8], Trap> {
        let range = self.check(offset, len)?;
        Ok(&self.data[range])
    }

    pub fn slice_mut(&mut self, offset: u32, len: u32) -> Result<&mut [u8], Trap> {
        let range = self.check(offset, len)?;
        Ok(&mut self.data[range])
    }

    /// A NUL-terminated string starting at `offset`, without the terminator.
    ///
    /// The terminator itself must lie inside the region.
    pub fn cstr(&self, offset: u32) -> Result<&[u8], Trap> {
        let start = self.check(offset, 1)?.start;
        let tail = &self.data[start..];
        match tail.iter().position(|&b| b == 0) {
            Some(len) => Ok(&tail[..len]),
            None => {
                log::warn!("guest string at {offset:#x} runs off the end of memory");
                Err(Trap::UnterminatedString { offset })
            }
        }
    }

    pub fn read_u32(&self, offset: u32) -> Result<u32, Trap> {
        let range = self.check(offset, 4)?;
        Ok(read_u32_le(&self.data, range.start))
    }

    pub fn read_f64(&self, offset: u32) -> Result<f64, Trap> {
        let range = self.check(offset, 8)?;
        Ok(read_f64_le(&self.data, range.start))
    }

    // --- Host-owned fields ---

    pub fn palette(&self) -> [u32; 4] {
        std::array::from_fn(|i| read_u32_le(&self.data, ADDR_PALETTE + i * 4))
    }

    pub fn set_palette_color(&mut self, index: usize, rgb: u32) {
        write_u32_le(&mut self.data, ADDR_PALETTE + (index & 3) * 4, rgb);
    }

    #[inline(always)]
    pub fn draw_colors(&self) -> u16 {
        read_u16_le(&self.data, ADDR_DRAW_COLORS)
    }

    pub fn set_draw_colors(&mut self, v: u16) {
        write_u16_le(&mut self.data, ADDR_DRAW_COLORS, v);
    }

    pub fn gamepad(&self, player: usize) -> u8 {
        self.data[ADDR_GAMEPADS + (player & 3)]
    }

    pub fn set_gamepad(&mut self, player: usize, buttons: u8) {
        self.data[ADDR_GAMEPADS + (player & 3)] = buttons;
    }

    /// Mouse position and button mask.
    pub fn mouse(&self) -> (i16, i16, u8) {
        (
            read_i16_le(&self.data, ADDR_MOUSE_X),
            read_i16_le(&self.data, ADDR_MOUSE_Y),
            self.data[ADDR_MOUSE_BUTTONS],
        )
    }

    pub fn set_mouse(&mut self, x: i16, y: i16, buttons: u8) {
        write_i16_le(&mut self.data, ADDR_MOUSE_X, x);
        write_i16_le(&mut self.data, ADDR_MOUSE_Y, y);
        self.data[ADDR_MOUSE_BUTTONS] = buttons;
    }

    pub fn system_flags(&self) -> u8 {
        self.data[ADDR_SYSTEM_FLAGS]
    }

    pub fn set_system_flags(&mut self, flags: u8) {
        self.data[ADDR_SYSTEM_FLAGS] = flags;
    }

    pub fn framebuffer(&self) -> &[u8] {
        &self.data[ADDR_FRAMEBUFFER..ADDR_FRAMEBUFFER + FRAMEBUFFER_SIZE]
    }

    pub fn framebuffer_mut(&mut self) -> &mut [u8] {
        &mut self.data[ADDR_FRAMEBUFFER..ADDR_FRAMEBUFFER + FRAMEBUFFER_SIZE]
    }

    // --- Whole-region access ---

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Overwrite the whole region. `src` must be exactly [`MEMORY_SIZE`] bytes.
    pub(crate) fn copy_from(&mut self, src: &[u8]) {
        self.data.copy_from_slice(src);
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_defaults() {
        let mut mem = Memory::new();
        mem.data[0x8000] = 0xAA;
        mem.reset();
        assert_eq!(mem.data[0x8000], 0);
        assert_eq!(mem.palette(), DEFAULT_PALETTE);
        assert_eq!(mem.data[ADDR_DRAW_COLORS], 0x03);
        assert_eq!(mem.data[ADDR_DRAW_COLORS + 1], 0x12);
        assert_eq!(mem.mouse(), (0x7fff, 0x7fff, 0));
    }

    #[test]
    fn test_check_bounds() {
        let mem = Memory::new();
        assert_eq!(mem.check(0, 0x10000).unwrap(), 0..0x10000);
        assert_eq!(mem.check(0xffff, 1).unwrap(), 0xffff..0x10000);
        assert_eq!(mem.check(0x10000, 0).unwrap(), 0x10000..0x10000);
        assert_eq!(mem.check(0xffff, 2), Err(Trap::OutOfBounds { offset: 0xffff, len: 2 }));
        assert!(mem.check(u32::MAX, u32::MAX).is_err());
    }

    #[test]
    fn test_cstr() {
        let mut mem = Memory::new();
        mem.data[0x2000..0x2003].copy_from_slice(b"hi\0");
        assert_eq!(mem.cstr(0x2000).unwrap(), b"hi");
        assert_eq!(mem.cstr(0x2002).unwrap(), b"");
        assert!(matches!(mem.cstr(0x10000), Err(Trap::OutOfBounds { .. })));
    }

    #[test]
    fn test_cstr_unterminated() {
        let mut mem = Memory::new();
        mem.data[0xfffe] = b'a';
        mem.data[0xffff] = b'b';
        assert_eq!(mem.cstr(0xfffe), Err(Trap::UnterminatedString { offset: 0xfffe }));
    }

    #[test]
    fn test_mouse_little_endian() {
        let mut mem = Memory::new();
        mem.set_mouse(-1, 0x0102, 5);
        assert_eq!(&mem.data[ADDR_MOUSE_X..ADDR_MOUSE_X + 4], &[0xff, 0xff, 0x02, 0x01]);
        assert_eq!(mem.mouse(), (-1, 0x0102, 5));
    }

    #[test]
    fn test_gamepad_slots() {
        let mut mem = Memory::new();
        mem.set_gamepad(2, 0x41);
        assert_eq!(mem.data[0x18], 0x41);
        assert_eq!(mem.gamepad(2), 0x41);
    }
}
