use fc4_core::apu::{self, FADE_SAMPLES, SAMPLES_PER_TICK};
use fc4_core::runtime::STATE_SIZE;
use fc4_core::*;

/// A guest built from closures, for driving frames in tests.
struct ScriptGuest<S, U> {
    start: S,
    update: U,
}

impl<S, U> Guest for ScriptGuest<S, U>
where
    S: FnMut(&mut Runtime) -> Result<(), Trap>,
    U: FnMut(&mut Runtime) -> Result<(), Trap>,
{
    fn start(&mut self, rt: &mut Runtime) -> Result<(), Trap> {
        (self.start)(rt)
    }

    fn update(&mut self, rt: &mut Runtime) -> Result<(), Trap> {
        (self.update)(rt)
    }
}

fn script<S, U>(start: S, update: U) -> ScriptGuest<S, U>
where
    S: FnMut(&mut Runtime) -> Result<(), Trap>,
    U: FnMut(&mut Runtime) -> Result<(), Trap>,
{
    ScriptGuest { start, update }
}

fn pixel(rt: &Runtime, x: usize, y: usize) -> u8 {
    let byte = rt.memory().framebuffer()[(SCREEN_WIDTH * y + x) >> 2];
    (byte >> ((x & 3) * 2)) & 3
}

#[test]
fn test_rect_scenario() {
    let mut rt = Runtime::new(RuntimeOptions::default());
    rt.memory_mut().set_draw_colors(0x0003);
    rt.rect(10, 10, 20, 20);

    for y in 0..SCREEN_HEIGHT {
        for x in 0..SCREEN_WIDTH {
            let inside = (10..30).contains(&x) && (10..30).contains(&y);
            assert_eq!(pixel(&rt, x, y), if inside { 2 } else { 0 }, "pixel ({x},{y})");
        }
    }
}

#[test]
fn test_tone_scenario() {
    let mut rt = Runtime::new(RuntimeOptions::default());
    rt.tone(440, (0 << 24) | (0 << 16) | 10 | (0 << 8), 100, 0);
    let shared = rt.apu();
    let mut frame = vec![0i16; SAMPLES_PER_TICK as usize * 2];

    let mut synth = apu::lock(&shared);
    for _ in 0..10 {
        synth.tick();
        synth.write_samples(&mut frame);
        let peak = frame.iter().map(|s| s.abs()).max().unwrap();
        // ~15% of full scale
        assert!((4000..=4916).contains(&peak), "peak {peak}");
    }
    assert!(!synth.is_fading(0));

    synth.tick();
    assert!(synth.is_fading(0));
    synth.write_samples(&mut frame);
    let fade = FADE_SAMPLES as usize * 2;
    assert!(frame[..fade].iter().any(|&s| s != 0));
    assert!(frame[fade..].iter().all(|&s| s == 0));
    assert!(!synth.is_playing(0));
}

#[test]
fn test_pulse_is_440hz() {
    let mut rt = Runtime::new(RuntimeOptions::default());
    rt.tone(440, 60, 100, TONE_MODE3);
    let mut buf = vec![0i16; SAMPLE_RATE_FRAMES * 2];
    apu::lock(&rt.apu()).write_samples(&mut buf);
    let left: Vec<i16> = buf.iter().step_by(2).copied().collect();
    let rising = left.windows(2).filter(|w| w[0] < 0 && w[1] >= 0).count();
    assert!((439..=441).contains(&rising), "{rising} rising edges");
}

const SAMPLE_RATE_FRAMES: usize = apu::SAMPLE_RATE as usize;

#[test]
fn test_diskw_clamps() {
    let mut rt = Runtime::new(RuntimeOptions::default());
    rt.memory_mut().slice_mut(0x4000, 2000).unwrap().fill(0x5a);
    assert_eq!(rt.diskw(0x4000, 2000).unwrap(), 1024);
    assert_eq!(rt.disk().len(), 1024);
    assert!(rt.disk().contents().iter().all(|&b| b == 0x5a));
}

#[test]
fn test_out_of_bounds_traps() {
    let mut rt = Runtime::new(RuntimeOptions::default());
    assert!(matches!(rt.blit(0xfff0, 0, 0, 16, 16, BLIT_2BPP), Err(Trap::OutOfBounds { .. })));
    assert!(matches!(rt.diskr(0xffff, 2), Err(Trap::OutOfBounds { .. })));
    assert!(matches!(rt.diskw(0x10000, 1), Err(Trap::OutOfBounds { .. })));
    assert!(matches!(rt.text_utf8(0xfffe, 4, 0, 0), Err(Trap::OutOfBounds { .. })));
    assert!(matches!(rt.trace_utf16(0, 0x20000), Err(Trap::OutOfBounds { .. })));

    rt.memory_mut().slice_mut(0xfffc, 4).unwrap().copy_from_slice(b"abcd");
    assert!(matches!(rt.text(0xfffc, 0, 0), Err(Trap::UnterminatedString { .. })));
    assert!(matches!(rt.trace(0xfffc), Err(Trap::UnterminatedString { .. })));
}

#[test]
fn test_blit_size_overflow_traps() {
    let mut rt = Runtime::new(RuntimeOptions::default());
    assert_eq!(rt.blit(0, 0, 0, 0x10000, 0x10000, 0), Err(Trap::Overflow));
    assert_eq!(rt.blit(0, 0, 0, 0x8000_0000, 2, BLIT_2BPP), Err(Trap::Overflow));
}

#[test]
fn test_tracef_string_pointer_checked() {
    let mut rt = Runtime::new(RuntimeOptions::default());
    rt.memory_mut().slice_mut(0x1000, 3).unwrap().copy_from_slice(b"%s\0");
    rt.memory_mut().slice_mut(0x2000, 4).unwrap().copy_from_slice(&0x0001_0000u32.to_le_bytes());
    assert!(matches!(rt.tracef(0x1000, 0x2000), Err(Trap::OutOfBounds { .. })));
}

#[test]
fn test_first_frame_calls_start_instead_of_clear() {
    let mut rt = Runtime::new(RuntimeOptions::default());
    let starts = std::cell::Cell::new(0);
    let mut guest = script(
        |rt: &mut Runtime| {
            starts.set(starts.get() + 1);
            rt.memory_mut().set_draw_colors(0x0004);
            rt.rect(0, 0, 4, 1);
            Ok(())
        },
        |_: &mut Runtime| Ok(()),
    );

    rt.update(&mut guest).unwrap();
    assert_eq!(starts.get(), 1);
    assert!(!rt.is_first_frame());
    // start's drawing survives the first frame
    assert_eq!(pixel(&rt, 0, 0), 3);

    rt.update(&mut guest).unwrap();
    assert_eq!(starts.get(), 1);
    assert_eq!(pixel(&rt, 0, 0), 0);
    assert_eq!(rt.frame_count(), 2);
}

#[test]
fn test_preserve_framebuffer_flag() {
    let mut rt = Runtime::new(RuntimeOptions::default());
    let mut guest = script(
        |rt: &mut Runtime| {
            rt.memory_mut().set_system_flags(SYSTEM_PRESERVE_FRAMEBUFFER);
            Ok(())
        },
        |rt: &mut Runtime| {
            let n = rt.frame_count() as i32;
            rt.memory_mut().set_draw_colors(0x0002);
            rt.hline(n, 0, 1);
            Ok(())
        },
    );
    for _ in 0..4 {
        rt.update(&mut guest).unwrap();
    }
    for x in 0..4 {
        assert_eq!(pixel(&rt, x, 0), 1);
    }
}

#[test]
fn test_reset_reboots_but_keeps_disk() {
    let mut rt = Runtime::new(RuntimeOptions::default());
    let starts = std::cell::Cell::new(0);
    let mut guest = script(
        |rt: &mut Runtime| {
            starts.set(starts.get() + 1);
            rt.memory_mut().set_palette_color(0, 0x123456);
            rt.memory_mut().set_draw_colors(0x0004);
            rt.rect(0, 0, 8, 8);
            rt.memory_mut().slice_mut(0x2000, 3).unwrap().copy_from_slice(b"abc");
            rt.diskw(0x2000, 3).map(|_| ())
        },
        |rt: &mut Runtime| {
            rt.tone(440, 60, 100, TONE_PULSE1);
            Ok(())
        },
    );
    rt.set_mouse(10, 20, MOUSE_LEFT);
    rt.update(&mut guest).unwrap();
    rt.update(&mut guest).unwrap();
    assert!(apu::lock(&rt.apu()).is_playing(0));

    rt.reset();
    assert!(rt.is_first_frame());
    assert_eq!(rt.frame_count(), 0);
    assert_eq!(rt.memory().palette(), DEFAULT_PALETTE);
    assert_eq!(rt.memory().draw_colors(), DEFAULT_DRAW_COLORS);
    assert_eq!(rt.memory().mouse(), (MOUSE_NONE, MOUSE_NONE, 0));
    assert!(rt.memory().framebuffer().iter().all(|&b| b == 0));
    assert!(!apu::lock(&rt.apu()).is_playing(0));
    assert_eq!(rt.disk().contents(), b"abc");

    // The next update boots the guest again
    rt.update(&mut guest).unwrap();
    assert_eq!(starts.get(), 2);
}

#[test]
fn test_update_ticks_apu() {
    let mut rt = Runtime::new(RuntimeOptions::default());
    let mut guest = script(|_| Ok(()), |_| Ok(()));
    for _ in 0..3 {
        rt.update(&mut guest).unwrap();
    }
    assert_eq!(apu::lock(&rt.apu()).ticks(), 3);
}

#[test]
fn test_trap_propagates_from_update() {
    let mut rt = Runtime::new(RuntimeOptions::default());
    let mut guest = script(
        |_: &mut Runtime| Ok(()),
        |rt: &mut Runtime| rt.diskw(0xffff_fff0, 64).map(|_| ()),
    );
    assert!(rt.update(&mut guest).is_err());
}

#[test]
fn test_serialize_roundtrip_after_calls() {
    let mut rt = Runtime::new(RuntimeOptions::default());
    let mut guest = script(
        |_: &mut Runtime| Ok(()),
        |rt: &mut Runtime| {
            rt.memory_mut().set_draw_colors(0x4321);
            rt.oval(20, 20, 40, 25);
            rt.line(0, 159, 159, 0);
            rt.memory_mut().slice_mut(0x3000, 6).unwrap().copy_from_slice(b"score\0");
            rt.text(0x3000, 4, 100)?;
            rt.diskw(0x3000, 5)?;
            Ok(())
        },
    );
    rt.update(&mut guest).unwrap();
    rt.set_gamepad(0, BUTTON_1 | BUTTON_UP);
    rt.set_mouse(12, 34, MOUSE_LEFT);

    let state = rt.serialize();
    assert_eq!(state.len(), STATE_SIZE);
    assert_eq!(STATE_SIZE, 66563);

    let mut other = Runtime::new(RuntimeOptions::default());
    assert!(other.is_first_frame());
    other.unserialize(&state).unwrap();
    assert_eq!(other.serialize(), state);
    assert_eq!(other.memory().as_bytes(), rt.memory().as_bytes());
    assert_eq!(other.disk().contents(), b"score");
    assert!(!other.is_first_frame());
}

#[test]
fn test_save_state_struct_roundtrip() {
    let mut rt = Runtime::new(RuntimeOptions::default());
    rt.rect(5, 5, 10, 10);
    let bytes = savestate::encode(&rt.save_state()).unwrap();

    let mut other = Runtime::new(RuntimeOptions::default());
    other.load_state(savestate::decode(&bytes).unwrap()).unwrap();
    assert_eq!(other.serialize(), rt.serialize());
}

#[test]
fn test_rewind_restores_earlier_frame() {
    let mut rt = Runtime::new(RuntimeOptions::default());
    let mut history = snapshot::RewindBuffer::new(8, 1);
    let mut guest = script(
        |rt: &mut Runtime| {
            rt.memory_mut().set_system_flags(SYSTEM_PRESERVE_FRAMEBUFFER);
            Ok(())
        },
        |rt: &mut Runtime| {
            let n = rt.frame_count() as i32;
            rt.memory_mut().set_draw_colors(0x0004);
            rt.vline(n, 0, 10);
            Ok(())
        },
    );
    for _ in 0..5 {
        rt.update(&mut guest).unwrap();
        if history.tick_frame() {
            history.push(snapshot::Snapshot { state: rt.serialize(), frame: rt.frame_count() });
        }
    }
    history.pop();
    let snap = history.pop().unwrap();
    assert_eq!(snap.frame, 4);
    rt.unserialize(&snap.state).unwrap();
    assert_eq!(pixel(&rt, 3, 5), 3);
    assert_eq!(pixel(&rt, 4, 5), 0);
}

#[test]
fn test_text_latin1_and_placeholder() {
    let mut rt = Runtime::new(RuntimeOptions::default());
    rt.memory_mut().set_draw_colors(0x0002);
    let row = |rt: &Runtime, x0: usize| -> Vec<u8> { (x0..x0 + 8).map(|x| pixel(rt, x, 0)).collect() };
    let acute = vec![0, 0, 0, 0, 1, 1, 0, 0];

    // Raw byte 0xE9 is é in the NUL-terminated path
    rt.memory_mut().slice_mut(0x3000, 2).unwrap().copy_from_slice(b"\xe9\0");
    rt.text(0x3000, 0, 0).unwrap();
    assert_eq!(row(&rt, 0), acute);

    // UTF-8: é has a glyph, U+263A does not
    let text = "é☺";
    let len = text.len() as u32;
    rt.memory_mut().slice_mut(0x3100, len).unwrap().copy_from_slice(text.as_bytes());
    rt.text_utf8(0x3100, len, 16, 0).unwrap();
    assert_eq!(row(&rt, 16), acute);
    assert_eq!(row(&rt, 24), vec![0, 1, 1, 1, 1, 1, 1, 0]);
}

#[test]
fn test_composite_uses_palette() {
    let mut rt = Runtime::new(RuntimeOptions::default());
    rt.memory_mut().set_palette_color(1, 0xff0000);
    rt.memory_mut().set_draw_colors(0x0002);
    rt.hline(0, 0, 2);
    let mut out = vec![0u32; SCREEN_WIDTH * SCREEN_HEIGHT];
    rt.composite_u32(&mut out);
    assert_eq!(&out[..3], &[0xff0000, 0xff0000, DEFAULT_PALETTE[0]]);
}
