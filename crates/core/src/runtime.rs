//! Host-function dispatcher and frame driver.
//!
//! [`Runtime`] owns everything a guest can reach: the shared memory region,
//! the disk and a handle to the APU. Every host function validates its guest
//! pointers through [`Memory`] before anything is read or drawn, and reports
//! violations as a [`Trap`] for the caller to treat as fatal.
//!
//! ## Frame lifecycle
//!
//! ```text
//! update()
//!   ├─ first call ever: guest.start()
//!   ├─ otherwise: clear framebuffer unless SYSTEM_PRESERVE_FRAMEBUFFER
//!   ├─ guest.update()        (guest issues host calls)
//!   └─ apu.tick()
//! composite_u32()            (presentation reads palette + framebuffer)
//! ```

use crate::apu::{self, Apu, SharedApu};
use crate::disk::{Disk, DISK_CAPACITY, DISK_ENCODED_SIZE};
use crate::error::{StateError, Trap};
use crate::framebuffer::{BlitFlags, Framebuffer};
use crate::memory::Memory;
use crate::savestate::SaveState;
use crate::trace::{self, TraceArg, TypedArgs, VarArgs};
use crate::{Guest, MEMORY_SIZE, SCREEN_HEIGHT, SCREEN_WIDTH, SYSTEM_PRESERVE_FRAMEBUFFER};

/// Size of the fixed-layout snapshot produced by [`Runtime::serialize`].
pub const STATE_SIZE: usize = MEMORY_SIZE + DISK_ENCODED_SIZE + 1;

/// Receives each line of guest trace output.
pub type TraceHandler = Box<dyn FnMut(&str) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Without a disk, `diskr`/`diskw` validate their arguments and return 0.
    pub disk_enabled: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        RuntimeOptions { disk_enabled: true }
    }
}

fn default_trace_handler() -> TraceHandler {
    Box::new(|line: &str| log::info!(target: "fc4::trace", "{line}"))
}

pub struct Runtime {
    memory: Memory,
    disk: Disk,
    first_frame: bool,
    apu: SharedApu,
    options: RuntimeOptions,
    trace_handler: TraceHandler,
    /// Staging area so sprite and text sources may overlap the framebuffer.
    scratch: Vec<u8>,
    disk_dirty: bool,
    frame_count: u32,
}

impl Runtime {
    pub fn new(options: RuntimeOptions) -> Self {
        Self::with_disk(options, Disk::new())
    }

    pub fn with_disk(options: RuntimeOptions, disk: Disk) -> Self {
        let mut memory = Memory::new();
        memory.reset();
        log::debug!("runtime initialized ({} byte disk, disk {})", disk.len(),
            if options.disk_enabled { "enabled" } else { "disabled" });
        Runtime {
            memory,
            disk,
            first_frame: true,
            apu: Apu::shared(),
            options,
            trace_handler: default_trace_handler(),
            scratch: Vec::with_capacity(SCREEN_WIDTH * SCREEN_HEIGHT / 4),
            disk_dirty: false,
            frame_count: 0,
        }
    }

    /// Return to the power-on state. The disk survives.
    pub fn reset(&mut self) {
        self.memory.reset();
        self.first_frame = true;
        self.frame_count = 0;
        *apu::lock(&self.apu) = Apu::new();
        log::debug!("runtime reset");
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn memory(&self) -> &Memory { &self.memory }

    pub fn memory_mut(&mut self) -> &mut Memory { &mut self.memory }

    pub fn disk(&self) -> &Disk { &self.disk }

    pub fn options(&self) -> RuntimeOptions { self.options }

    /// A handle for the audio thread.
    pub fn apu(&self) -> SharedApu { self.apu.clone() }

    pub fn is_first_frame(&self) -> bool { self.first_frame }

    pub fn frame_count(&self) -> u32 { self.frame_count }

    pub fn set_trace_handler(&mut self, handler: TraceHandler) {
        self.trace_handler = handler;
    }

    /// Whether the guest wrote to disk since the last call.
    pub fn take_disk_dirty(&mut self) -> bool {
        std::mem::take(&mut self.disk_dirty)
    }

    // ─── Input ──────────────────────────────────────────────────────────────

    pub fn set_gamepad(&mut self, player: usize, buttons: u8) {
        self.memory.set_gamepad(player, buttons);
    }

    pub fn set_mouse(&mut self, x: i16, y: i16, buttons: u8) {
        self.memory.set_mouse(x, y, buttons);
    }

    // ─── Drawing ────────────────────────────────────────────────────────────

    fn framebuffer(&mut self) -> Framebuffer<'_> {
        let draw_colors = self.memory.draw_colors();
        Framebuffer::new(self.memory.framebuffer_mut(), draw_colors)
    }

    pub fn blit(&mut self, sprite: u32, x: i32, y: i32, width: u32, height: u32, flags: u32) -> Result<(), Trap> {
        self.blit_sub(sprite, x, y, width, height, 0, 0, width, flags)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn blit_sub(
        &mut self,
        sprite: u32,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        src_x: u32,
        src_y: u32,
        stride: u32,
        flags: u32,
    ) -> Result<(), Trap> {
        let flags = BlitFlags::from_bits(flags);
        let bpp = flags.bpp();

        let nbits = width.checked_mul(height).and_then(|n| n.checked_mul(bpp)).ok_or(Trap::Overflow)?;
        self.memory.check(sprite, nbits / 8)?;
        if width == 0 || height == 0 {
            return Ok(());
        }

        // The window may sit anywhere in a larger sheet; cover every byte sampled
        let last_pixel = (src_y as u128 + height as u128 - 1) * stride as u128 + src_x as u128 + width as u128 - 1;
        let extent = u32::try_from(last_pixel * bpp as u128 / 8 + 1).map_err(|_| Trap::Overflow)?;
        let range = self.memory.check(sprite, extent)?;

        let to_i32 = |v: u32| i32::try_from(v).map_err(|_| Trap::Overflow);
        let (w, h, sx, sy, st) = (to_i32(width)?, to_i32(height)?, to_i32(src_x)?, to_i32(src_y)?, to_i32(stride)?);

        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        scratch.extend_from_slice(&self.memory.as_bytes()[range]);
        self.framebuffer().blit(&scratch, x, y, w, h, sx, sy, st, flags);
        self.scratch = scratch;
        Ok(())
    }

    pub fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        self.framebuffer().line(x1, y1, x2, y2);
    }

    pub fn hline(&mut self, x: i32, y: i32, len: u32) {
        self.framebuffer().hline(x, y, len);
    }

    pub fn vline(&mut self, x: i32, y: i32, len: u32) {
        self.framebuffer().vline(x, y, len);
    }

    pub fn oval(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.framebuffer().oval(x, y, width, height);
    }

    pub fn rect(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.framebuffer().rect(x, y, width, height);
    }

    /// Draw a NUL-terminated byte string.
    pub fn text(&mut self, text: u32, x: i32, y: i32) -> Result<(), Trap> {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        let copied = self.memory.cstr(text).map(|bytes| scratch.extend_from_slice(bytes));
        if copied.is_ok() {
            self.framebuffer().text(scratch.iter().map(|&b| b as u32), x, y);
        }
        self.scratch = scratch;
        copied
    }

    pub fn text_utf8(&mut self, text: u32, byte_length: u32, x: i32, y: i32) -> Result<(), Trap> {
        let chars: Vec<u32> = String::from_utf8_lossy(self.memory.slice(text, byte_length)?)
            .chars()
            .map(u32::from)
            .collect();
        self.framebuffer().text(chars, x, y);
        Ok(())
    }

    pub fn text_utf16(&mut self, text: u32, byte_length: u32, x: i32, y: i32) -> Result<(), Trap> {
        let chars = decode_utf16_le(self.memory.slice(text, byte_length)?);
        self.framebuffer().text(chars.chars().map(u32::from), x, y);
        Ok(())
    }

    // ─── Sound ──────────────────────────────────────────────────────────────

    pub fn tone(&mut self, frequency: u32, duration: u32, volume: u32, flags: u32) {
        apu::lock(&self.apu).tone(frequency, duration, volume, flags);
    }

    // ─── Storage ────────────────────────────────────────────────────────────

    /// Copy up to `size` bytes of the disk into guest memory.
    pub fn diskr(&mut self, dest: u32, size: u32) -> Result<u32, Trap> {
        let dest = self.memory.slice_mut(dest, size)?;
        if !self.options.disk_enabled {
            return Ok(0);
        }
        Ok(self.disk.load_into(dest) as u32)
    }

    /// Replace the disk with `size` bytes of guest memory, truncated to capacity.
    pub fn diskw(&mut self, src: u32, size: u32) -> Result<u32, Trap> {
        let src = self.memory.slice(src, size)?;
        if !self.options.disk_enabled {
            return Ok(0);
        }
        let written = self.disk.store(src);
        if (size as usize) > DISK_CAPACITY {
            log::debug!("diskw of {size} bytes truncated to {written}");
        }
        self.disk_dirty = true;
        Ok(written as u32)
    }

    // ─── Trace ──────────────────────────────────────────────────────────────

    fn emit(&mut self, line: &str) {
        (self.trace_handler)(line);
    }

    pub fn trace(&mut self, text: u32) -> Result<(), Trap> {
        let line = String::from_utf8_lossy(self.memory.cstr(text)?).into_owned();
        self.emit(&line);
        Ok(())
    }

    pub fn trace_utf8(&mut self, text: u32, byte_length: u32) -> Result<(), Trap> {
        let line = String::from_utf8_lossy(self.memory.slice(text, byte_length)?).into_owned();
        self.emit(&line);
        Ok(())
    }

    pub fn trace_utf16(&mut self, text: u32, byte_length: u32) -> Result<(), Trap> {
        let line = decode_utf16_le(self.memory.slice(text, byte_length)?);
        self.emit(&line);
        Ok(())
    }

    /// `tracef` with a packed argument block in guest memory.
    pub fn tracef(&mut self, fmt: u32, args: u32) -> Result<(), Trap> {
        let line = {
            let fmt = self.memory.cstr(fmt)?;
            trace::format(fmt, &mut VarArgs::new(&self.memory, args))?
        };
        self.emit(&line);
        Ok(())
    }

    /// `tracef` with arguments already decoded by the guest engine.
    pub fn tracef_args(&mut self, fmt: u32, args: &[TraceArg]) -> Result<(), Trap> {
        let line = trace::format(self.memory.cstr(fmt)?, &mut TypedArgs::new(args))?;
        self.emit(&line);
        Ok(())
    }

    // ─── Frame driver ───────────────────────────────────────────────────────

    /// Run one frame of `guest`.
    pub fn update<G: Guest + ?Sized>(&mut self, guest: &mut G) -> Result<(), Trap> {
        if self.first_frame {
            self.first_frame = false;
            guest.start(self)?;
        } else if self.memory.system_flags() & SYSTEM_PRESERVE_FRAMEBUFFER == 0 {
            self.framebuffer().clear();
        }
        guest.update(self)?;
        apu::lock(&self.apu).tick();
        self.frame_count = self.frame_count.wrapping_add(1);
        Ok(())
    }

    /// Expand the framebuffer through the palette into `0x00RRGGBB` pixels.
    pub fn composite_u32(&self, out: &mut [u32]) {
        let palette = self.memory.palette().map(|c| c & 0x00ff_ffff);
        for (quad, &byte) in out.chunks_mut(4).zip(self.memory.framebuffer()) {
            for (i, px) in quad.iter_mut().enumerate() {
                *px = palette[((byte >> (i * 2)) & 0x3) as usize];
            }
        }
    }

    // ─── State ──────────────────────────────────────────────────────────────

    pub fn serialize_size(&self) -> usize {
        STATE_SIZE
    }

    /// Fixed-layout snapshot: memory, disk size (u16 LE), disk bytes, first-frame flag.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(STATE_SIZE);
        out.extend_from_slice(self.memory.as_bytes());
        self.disk.encode_into(&mut out);
        out.push(self.first_frame as u8);
        out
    }

    /// Restore a [`Runtime::serialize`] snapshot. Nothing changes on error.
    pub fn unserialize(&mut self, state: &[u8]) -> Result<(), StateError> {
        if state.len() != STATE_SIZE {
            return Err(StateError::Size { expected: STATE_SIZE, actual: state.len() });
        }
        let (memory, rest) = state.split_at(MEMORY_SIZE);
        let disk = Disk::decode(&rest[..DISK_ENCODED_SIZE])?;

        self.memory.copy_from(memory);
        self.disk = disk;
        self.first_frame = rest[DISK_ENCODED_SIZE] != 0;
        Ok(())
    }

    pub fn save_state(&self) -> SaveState {
        SaveState {
            memory: self.memory.as_bytes().to_vec(),
            disk: self.disk.clone(),
            first_frame: self.first_frame,
        }
    }

    pub fn load_state(&mut self, state: SaveState) -> Result<(), StateError> {
        if state.memory.len() != MEMORY_SIZE {
            return Err(StateError::Size { expected: MEMORY_SIZE, actual: state.memory.len() });
        }
        state.disk.validate()?;

        self.memory.copy_from(&state.memory);
        self.disk = state.disk;
        self.first_frame = state.first_frame;
        log::debug!("state loaded");
        Ok(())
    }
}

/// Decode little-endian UTF-16. A trailing odd byte is ignored and unpaired
/// surrogates become U+FFFD.
fn decode_utf16_le(bytes: &[u8]) -> String {
    let units = bytes.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    char::decode_utf16(units).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)).collect()
}
