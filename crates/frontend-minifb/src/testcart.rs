//! Built-in diagnostic cart.
//!
//! Shows the state of all four gamepads and the mouse, and doubles as a tone
//! tester: button 1 plays the current note, button 2 cycles the channel,
//! up/down move the note by a semitone, left/right cycle the duty mode. A
//! boot counter is kept on the disk.

use fc4_core::{
    Guest, Runtime, Trap, BLIT_1BPP, BLIT_FLIP_X, BLIT_FLIP_Y, BLIT_ROTATE, BUTTON_1, BUTTON_2,
    BUTTON_DOWN, BUTTON_LEFT, BUTTON_RIGHT, BUTTON_UP, MOUSE_LEFT, MOUSE_MIDDLE, MOUSE_NONE,
    MOUSE_RIGHT, TONE_NOTE_MODE,
};

// Guest-side addresses, all above the framebuffer
const DISK_BUF: u32 = 0x2000;
const SPRITE: u32 = 0x2800;
const TEXT_BUF: u32 = 0x3000;
const TEXT_BUF_LEN: usize = 0x400;
const ARGS_BUF: u32 = 0x3800;

const SMILEY: [u8; 8] = [
    0b1100_0011,
    0b1000_0001,
    0b0010_0100,
    0b0010_0100,
    0b0000_0000,
    0b0010_0100,
    0b1001_1001,
    0b1100_0011,
];

const CHANNEL_NAMES: [&str; 4] = ["pulse 1", "pulse 2", "triangle", "noise"];
const DUTY_NAMES: [&str; 4] = ["12.5%", "25%", "50%", "75%"];
const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

const LOWEST_NOTE: u32 = 24;
const HIGHEST_NOTE: u32 = 108;

pub struct TestCart {
    boots: u32,
    channel: u32,
    mode: u32,
    note: u32,
    prev_pad: u8,
    frame: u32,
}

impl TestCart {
    pub fn new() -> Self {
        TestCart { boots: 0, channel: 0, mode: 2, note: 69, prev_pad: 0, frame: 0 }
    }

    fn play(&self, rt: &mut Runtime) {
        let duration = (4 << 24) | (8 << 8) | 20;
        let flags = self.channel | (self.mode << 2) | TONE_NOTE_MODE;
        rt.tone(self.note, duration, 60, flags);
    }

    fn handle_input(&mut self, rt: &mut Runtime) {
        let pad = rt.memory().gamepad(0);
        let pressed = pad & !self.prev_pad;
        self.prev_pad = pad;

        if pressed & BUTTON_2 != 0 {
            self.channel = (self.channel + 1) % 4;
        }
        if pressed & BUTTON_UP != 0 {
            self.note = (self.note + 1).min(HIGHEST_NOTE);
        }
        if pressed & BUTTON_DOWN != 0 {
            self.note = self.note.saturating_sub(1).max(LOWEST_NOTE);
        }
        if pressed & BUTTON_RIGHT != 0 {
            self.mode = (self.mode + 1) % 4;
        }
        if pressed & BUTTON_LEFT != 0 {
            self.mode = (self.mode + 3) % 4;
        }
        if pressed & (BUTTON_1 | BUTTON_UP | BUTTON_DOWN) != 0 {
            self.play(rt);
        }
    }

    fn draw_gamepads(&self, rt: &mut Runtime) -> Result<(), Trap> {
        const BITS: [u8; 6] = [BUTTON_LEFT, BUTTON_RIGHT, BUTTON_UP, BUTTON_DOWN, BUTTON_1, BUTTON_2];
        const OFFSETS: [(i32, i32); 6] = [(0, 6), (12, 6), (6, 0), (6, 12), (24, 6), (32, 6)];

        for player in 0..4 {
            let pad = rt.memory().gamepad(player);
            let ox = 8 + (player as i32 % 2) * 76;
            let oy = 28 + (player as i32 / 2) * 30;

            rt.memory_mut().set_draw_colors(0x0003);
            draw_str(rt, &format!("P{}", player + 1), ox, oy - 10)?;
            for (bit, (dx, dy)) in BITS.iter().zip(OFFSETS) {
                let colors = if pad & bit != 0 { 0x0044 } else { 0x0030 };
                rt.memory_mut().set_draw_colors(colors);
                rt.rect(ox + dx, oy + dy, 6, 6);
            }
        }
        Ok(())
    }

    fn draw_mouse(&self, rt: &mut Runtime) -> Result<(), Trap> {
        let (x, y, buttons) = rt.memory().mouse();
        rt.memory_mut().set_draw_colors(0x0003);
        if x == MOUSE_NONE || y == MOUSE_NONE {
            return draw_str(rt, "mouse: -", 8, 92);
        }
        draw_str(rt, &format!("mouse: {x},{y}"), 8, 92)?;

        let (x, y) = (i32::from(x), i32::from(y));
        rt.memory_mut().set_draw_colors(0x0004);
        rt.hline(x - 3, y, 7);
        rt.vline(x, y - 3, 7);
        for (i, bit) in [MOUSE_LEFT, MOUSE_MIDDLE, MOUSE_RIGHT].into_iter().enumerate() {
            if buttons & bit != 0 {
                rt.memory_mut().set_draw_colors(0x0042);
                rt.oval(x - 6 + i as i32 * 4, y + 5, 4, 4);
            }
        }
        Ok(())
    }

    fn draw_tone(&self, rt: &mut Runtime) -> Result<(), Trap> {
        rt.memory_mut().set_draw_colors(0x0002);
        rt.line(0, 104, 159, 104);

        rt.memory_mut().set_draw_colors(0x0003);
        let name = NOTE_NAMES[(self.note % 12) as usize];
        let octave = self.note as i32 / 12 - 1;
        draw_str(rt, &format!("ch {}\n{}{} ({})", CHANNEL_NAMES[self.channel as usize], name, octave,
            DUTY_NAMES[self.mode as usize]), 8, 110)?;

        let playing = fc4_core::apu::lock(&rt.apu()).is_playing(self.channel as usize);
        if playing {
            rt.memory_mut().set_draw_colors(0x0044);
            rt.oval(140, 110, 12, 12);
        }
        Ok(())
    }
}

impl Default for TestCart {
    fn default() -> Self {
        Self::new()
    }
}

impl Guest for TestCart {
    fn start(&mut self, rt: &mut Runtime) -> Result<(), Trap> {
        rt.memory_mut().slice_mut(SPRITE, SMILEY.len() as u32)?.copy_from_slice(&SMILEY);

        let read = rt.diskr(DISK_BUF, 4)?;
        let stored = if read == 4 { rt.memory().read_u32(DISK_BUF)? } else { 0 };
        self.boots = stored.wrapping_add(1);
        rt.memory_mut().slice_mut(DISK_BUF, 4)?.copy_from_slice(&self.boots.to_le_bytes());
        rt.diskw(DISK_BUF, 4)?;

        put_str(rt, TEXT_BUF, "diagnostic cart, boot #%d")?;
        rt.memory_mut().slice_mut(ARGS_BUF, 4)?.copy_from_slice(&self.boots.to_le_bytes());
        rt.tracef(TEXT_BUF, ARGS_BUF)
    }

    fn update(&mut self, rt: &mut Runtime) -> Result<(), Trap> {
        self.frame = self.frame.wrapping_add(1);
        self.handle_input(rt);

        rt.memory_mut().set_draw_colors(0x0004);
        draw_str(rt, "fc4 diagnostics", 8, 4)?;
        rt.memory_mut().set_draw_colors(0x0002);
        draw_str(rt, &format!("boot {}", self.boots), 100, 148)?;

        self.draw_gamepads(rt)?;
        self.draw_mouse(rt)?;
        self.draw_tone(rt)?;

        // Cycle the sprite transforms once a second
        let flags = [0, BLIT_FLIP_X, BLIT_FLIP_Y, BLIT_ROTATE][(self.frame / 60 % 4) as usize];
        rt.memory_mut().set_draw_colors(0x0040);
        rt.blit(SPRITE, 8, 144, 8, 8, BLIT_1BPP | flags)
    }
}

/// Copy `s` into guest memory as a NUL-terminated string.
fn put_str(rt: &mut Runtime, addr: u32, s: &str) -> Result<(), Trap> {
    let len = s.len().min(TEXT_BUF_LEN - 1);
    let dest = rt.memory_mut().slice_mut(addr, len as u32 + 1)?;
    dest[..len].copy_from_slice(&s.as_bytes()[..len]);
    dest[len] = 0;
    Ok(())
}

fn draw_str(rt: &mut Runtime, s: &str, x: i32, y: i32) -> Result<(), Trap> {
    put_str(rt, TEXT_BUF, s)?;
    rt.text(TEXT_BUF, x, y)
}
