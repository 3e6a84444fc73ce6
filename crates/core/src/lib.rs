//! # fc4-core
//!
//! Runtime core for a 160×160, four-color fantasy console.
//!
//! A guest program talks to the host through one 64 KB block of shared
//! memory (palette, draw colors, input, framebuffer) and a small set of host
//! functions for drawing, sound, persistent storage and tracing. This crate
//! implements that contract without any platform dependency; windowing,
//! audio output and guest execution live in frontends.
//!
//! ## Architecture
//!
//! - [`Runtime`]: Dispatcher. Owns memory, disk and APU handle, validates
//!   every guest pointer, drives the per-frame lifecycle
//! - [`Memory`]: The shared region and its fixed layout
//! - [`framebuffer`]: 2 bpp rasterizer (blit, line, rect, oval, text)
//! - [`apu`]: 4-channel ADSR synthesizer (2 pulse, triangle, noise)
//! - [`trace`]: `tracef` formatter
//! - [`Disk`]: 1 KB persistent storage blob
//! - [`savestate`]: Compressed save state files
//! - [`snapshot`]: Rewind ring buffer
//! - [`png`]: Screenshot encoder
//! - [`gif`]: Animated GIF recorder
//!
//! ## Guests
//!
//! Anything that can run guest code implements [`Guest`]; the runtime calls
//! [`Guest::start`] once on the first frame and [`Guest::update`] every frame.
//! Host functions return [`Trap`] on a guest trust violation. Traps are not
//! recoverable: the driver should stop the run and report the error.

pub mod bytes;
pub mod error;
pub mod memory;
pub mod disk;
pub mod font;
pub mod framebuffer;
pub mod apu;
pub mod trace;
pub mod runtime;
pub mod savestate;
pub mod snapshot;
pub mod png;
pub mod gif;

pub use apu::{Apu, SharedApu};
pub use disk::Disk;
pub use error::{StateError, Trap};
pub use memory::Memory;
pub use runtime::{Runtime, RuntimeOptions};
pub use trace::TraceArg;

// Screen
pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 160;

/// Size of the shared memory region.
pub const MEMORY_SIZE: usize = 64 * 1024;
/// 160×160 pixels at 2 bits each.
pub const FRAMEBUFFER_SIZE: usize = SCREEN_WIDTH * SCREEN_HEIGHT / 4;

// Memory map
pub const ADDR_PALETTE: usize = 0x04;
pub const ADDR_DRAW_COLORS: usize = 0x14;
pub const ADDR_GAMEPADS: usize = 0x16;
pub const ADDR_MOUSE_X: usize = 0x1a;
pub const ADDR_MOUSE_Y: usize = 0x1c;
pub const ADDR_MOUSE_BUTTONS: usize = 0x1e;
pub const ADDR_SYSTEM_FLAGS: usize = 0x1f;
pub const ADDR_FRAMEBUFFER: usize = 0xa0;

pub const DEFAULT_PALETTE: [u32; 4] = [0xe0f8cf, 0x86c06c, 0x306850, 0x071821];
/// Slot 0 → palette 2, slot 1 → palette 1, slot 2 → transparent, slot 3 → palette 0.
pub const DEFAULT_DRAW_COLORS: u16 = 0x1203;
/// Mouse coordinate reported while the pointer is outside the screen.
pub const MOUSE_NONE: i16 = 0x7fff;

// Gamepad bits
pub const BUTTON_1: u8 = 1;
pub const BUTTON_2: u8 = 2;
pub const BUTTON_LEFT: u8 = 16;
pub const BUTTON_RIGHT: u8 = 32;
pub const BUTTON_UP: u8 = 64;
pub const BUTTON_DOWN: u8 = 128;

// Mouse bits
pub const MOUSE_LEFT: u8 = 1;
pub const MOUSE_RIGHT: u8 = 2;
pub const MOUSE_MIDDLE: u8 = 4;

// System flags
pub const SYSTEM_PRESERVE_FRAMEBUFFER: u8 = 1;
pub const SYSTEM_HIDE_GAMEPAD_OVERLAY: u8 = 2;

// Blit flags
pub const BLIT_2BPP: u32 = 1;
pub const BLIT_1BPP: u32 = 0;
pub const BLIT_FLIP_X: u32 = 2;
pub const BLIT_FLIP_Y: u32 = 4;
pub const BLIT_ROTATE: u32 = 8;

// Tone flags
pub const TONE_PULSE1: u32 = 0;
pub const TONE_PULSE2: u32 = 1;
pub const TONE_TRIANGLE: u32 = 2;
pub const TONE_NOISE: u32 = 3;
pub const TONE_MODE1: u32 = 0;
pub const TONE_MODE2: u32 = 4;
pub const TONE_MODE3: u32 = 8;
pub const TONE_MODE4: u32 = 12;
pub const TONE_PAN_LEFT: u32 = 16;
pub const TONE_PAN_RIGHT: u32 = 32;
pub const TONE_NOTE_MODE: u32 = 64;

/// A guest program as seen by the frame driver.
///
/// `update` is required; a guest without one cannot be built. Engine
/// adapters map guest-side imports onto the host functions of the
/// [`Runtime`] passed in.
pub trait Guest {
    /// Runs once, on the first frame, before the first `update`.
    fn start(&mut self, _runtime: &mut Runtime) -> Result<(), Trap> {
        Ok(())
    }

    fn update(&mut self, runtime: &mut Runtime) -> Result<(), Trap>;
}

impl<G: Guest + ?Sized> Guest for Box<G> {
    fn start(&mut self, runtime: &mut Runtime) -> Result<(), Trap> {
        (**self).start(runtime)
    }

    fn update(&mut self, runtime: &mut Runtime) -> Result<(), Trap> {
        (**self).update(runtime)
    }
}
