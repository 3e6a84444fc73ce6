//! fc4 desktop frontend.
//!
//! Provides two execution modes:
//!
//! - **GUI mode** (default): scaled window with stereo audio, keyboard,
//!   gamepad and mouse input, save states, rewind and screenshots.
//! - **Headless mode** (`--headless`): runs a fixed number of frames and
//!   prints the screen as ASCII. Guest trace output goes to stdout.
//!
//! The guest is the built-in diagnostic cart in [`testcart`]; any engine
//! adapter implementing [`Guest`] can be driven the same way.
//!
//! GUI keys:
//! - P1: Arrows = d-pad, X/V/Space = button 1, Z/C = button 2
//! - P2: E/S/D/F = d-pad, LShift/Tab = button 1, A/Q = button 2
//! - F5 = save state, F9 = load state, F10 = record GIF, F12 = screenshot,
//!   Backspace = rewind, R = reboot, M = mute, Esc = quit

mod testcart;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Parser;
use fc4_core::apu::{self, SAMPLE_RATE};
use fc4_core::gif::GifEncoder;
use fc4_core::snapshot::{RewindBuffer, Snapshot};
use fc4_core::{
    png, savestate, Disk, Guest, Runtime, RuntimeOptions, SharedApu, BUTTON_1, BUTTON_2,
    BUTTON_DOWN, BUTTON_LEFT, BUTTON_RIGHT, BUTTON_UP, MOUSE_LEFT, MOUSE_MIDDLE, MOUSE_NONE,
    MOUSE_RIGHT, SCREEN_HEIGHT, SCREEN_WIDTH,
};
use gilrs::{Axis, Button as GilrsButton, Event as GilrsEvent, EventType, Gilrs};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Scale, ScaleMode, Window, WindowOptions};

use testcart::TestCart;

/// Stereo frames pulled from the APU per lock
const AUDIO_CHUNK_FRAMES: usize = 256;
/// Analog stick deadzone
const STICK_DEADZONE: f32 = 0.3;
/// Frames between rewind snapshots
const REWIND_INTERVAL: u32 = 2;
/// Length of an F10 recording
const RECORD_FRAMES: u32 = 4 * 60;
/// Frames between captured GIF frames, and the matching GIF delay
const RECORD_STEP: u32 = 2;
const RECORD_DELAY_CS: u16 = 3;

#[derive(Parser, Debug)]
#[command(name = "fc4", version, about = "Desktop runtime for the fc4 fantasy console")]
struct Args {
    /// Initial window scale
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=8))]
    scale: u8,

    /// Start with audio disabled
    #[arg(long)]
    mute: bool,

    /// Persistent disk file, loaded at boot and written when the guest saves
    #[arg(long)]
    disk: Option<PathBuf>,

    /// Save state file for F5/F9 [default: the disk path with a .state extension, or fc4.state]
    #[arg(long)]
    state: Option<PathBuf>,

    /// Seconds of rewind history
    #[arg(long, default_value_t = 10)]
    rewind_seconds: u32,

    /// Run without a window and print the screen
    #[arg(long)]
    headless: bool,

    /// Frames to run in headless mode
    #[arg(long, default_value_t = 60)]
    frames: u32,
}

// ─── Audio ──────────────────────────────────────────────────────────────────

/// Pulls interleaved stereo samples out of the shared APU.
struct ApuSource {
    apu: SharedApu,
    buf: Vec<i16>,
    pos: usize,
}

impl ApuSource {
    fn new(apu: SharedApu) -> Self {
        ApuSource { apu, buf: vec![0; AUDIO_CHUNK_FRAMES * 2], pos: AUDIO_CHUNK_FRAMES * 2 }
    }
}

impl Iterator for ApuSource {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        if self.pos >= self.buf.len() {
            apu::lock(&self.apu).write_samples(&mut self.buf);
            self.pos = 0;
        }
        let sample = self.buf[self.pos];
        self.pos += 1;
        Some(sample)
    }
}

impl rodio::Source for ApuSource {
    fn current_frame_len(&self) -> Option<usize> { None }
    fn channels(&self) -> u16 { 2 }
    fn sample_rate(&self) -> u32 { SAMPLE_RATE }
    fn total_duration(&self) -> Option<Duration> { None }
}

struct AudioOutput {
    _stream: rodio::OutputStream,
    _sink: rodio::Sink,
}

fn setup_audio(apu: SharedApu) -> Option<AudioOutput> {
    let (stream, handle) = match rodio::OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            log::warn!("audio device: {e}");
            return None;
        }
    };
    match rodio::Sink::try_new(&handle) {
        Ok(sink) => {
            sink.append(ApuSource::new(apu));
            Some(AudioOutput { _stream: stream, _sink: sink })
        }
        Err(e) => {
            log::warn!("audio sink: {e}");
            None
        }
    }
}

// ─── Gamepad ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct GamepadState {
    buttons: u8,
    stick_x: f32,
    stick_y: f32,
}

impl GamepadState {
    /// Button bits with the stick folded into the d-pad.
    fn bits(&self) -> u8 {
        let mut bits = self.buttons;
        if self.stick_x < -STICK_DEADZONE { bits |= BUTTON_LEFT; }
        if self.stick_x > STICK_DEADZONE { bits |= BUTTON_RIGHT; }
        // gilrs reports up as positive
        if self.stick_y > STICK_DEADZONE { bits |= BUTTON_UP; }
        if self.stick_y < -STICK_DEADZONE { bits |= BUTTON_DOWN; }
        bits
    }
}

fn init_gamepad() -> Option<Gilrs> {
    match Gilrs::new() {
        Ok(gilrs) => {
            for (id, gp) in gilrs.gamepads() {
                log::info!("gamepad [{id}] \"{}\"", gp.name());
            }
            Some(gilrs)
        }
        Err(e) => {
            log::warn!("gamepad: {e}");
            None
        }
    }
}

fn poll_gamepad(gilrs: &mut Gilrs, state: &mut GamepadState) {
    while let Some(GilrsEvent { event, .. }) = gilrs.next_event() {
        match event {
            EventType::ButtonPressed(b, _) => apply_button(state, b, true),
            EventType::ButtonReleased(b, _) => apply_button(state, b, false),
            EventType::AxisChanged(a, v, _) => apply_axis(state, a, v),
            EventType::Connected => log::info!("gamepad connected"),
            EventType::Disconnected => {
                log::info!("gamepad disconnected");
                *state = GamepadState::default();
            }
            _ => {}
        }
    }
}

fn apply_button(state: &mut GamepadState, btn: GilrsButton, pressed: bool) {
    let bit = match btn {
        GilrsButton::DPadUp => BUTTON_UP,
        GilrsButton::DPadDown => BUTTON_DOWN,
        GilrsButton::DPadLeft => BUTTON_LEFT,
        GilrsButton::DPadRight => BUTTON_RIGHT,
        GilrsButton::South | GilrsButton::North => BUTTON_1,
        GilrsButton::East | GilrsButton::West => BUTTON_2,
        _ => return,
    };
    if pressed {
        state.buttons |= bit;
    } else {
        state.buttons &= !bit;
    }
}

fn apply_axis(state: &mut GamepadState, axis: Axis, value: f32) {
    match axis {
        Axis::LeftStickX => state.stick_x = value,
        Axis::LeftStickY => state.stick_y = value,
        _ => {}
    }
}

// ─── Keyboard and mouse ─────────────────────────────────────────────────────

fn keyboard_player(window: &Window, keys: &[(Key, u8)]) -> u8 {
    keys.iter()
        .filter(|(key, _)| window.is_key_down(*key))
        .fold(0, |bits, (_, bit)| bits | bit)
}

const PLAYER1_KEYS: [(Key, u8); 9] = [
    (Key::X, BUTTON_1), (Key::V, BUTTON_1), (Key::Space, BUTTON_1),
    (Key::Z, BUTTON_2), (Key::C, BUTTON_2),
    (Key::Left, BUTTON_LEFT), (Key::Right, BUTTON_RIGHT),
    (Key::Up, BUTTON_UP), (Key::Down, BUTTON_DOWN),
];

const PLAYER2_KEYS: [(Key, u8); 8] = [
    (Key::LeftShift, BUTTON_1), (Key::Tab, BUTTON_1),
    (Key::A, BUTTON_2), (Key::Q, BUTTON_2),
    (Key::S, BUTTON_LEFT), (Key::F, BUTTON_RIGHT),
    (Key::E, BUTTON_UP), (Key::D, BUTTON_DOWN),
];

/// Mouse position in screen space, or [`MOUSE_NONE`] outside the window.
fn mouse_state(window: &Window) -> (i16, i16, u8) {
    let (w, h) = window.get_size();
    let pos = window.get_mouse_pos(MouseMode::Discard).filter(|_| w > 0 && h > 0);
    let (x, y) = match pos {
        Some((mx, my)) => (
            (mx * SCREEN_WIDTH as f32 / w as f32) as i16,
            (my * SCREEN_HEIGHT as f32 / h as f32) as i16,
        ),
        None => (MOUSE_NONE, MOUSE_NONE),
    };
    let mut buttons = 0;
    if window.get_mouse_down(MouseButton::Left) { buttons |= MOUSE_LEFT; }
    if window.get_mouse_down(MouseButton::Right) { buttons |= MOUSE_RIGHT; }
    if window.get_mouse_down(MouseButton::Middle) { buttons |= MOUSE_MIDDLE; }
    (x, y, buttons)
}

// ─── Persistence ────────────────────────────────────────────────────────────

fn load_disk(path: Option<&Path>) -> Disk {
    let Some(path) = path else { return Disk::new() };
    match fs::read(path) {
        Ok(bytes) => {
            log::info!("disk: {} ({} bytes)", path.display(), bytes.len());
            Disk::from_bytes(&bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Disk::new(),
        Err(e) => {
            log::warn!("disk {}: {e}", path.display());
            Disk::new()
        }
    }
}

fn persist_disk(runtime: &Runtime, path: Option<&Path>) {
    if let Some(path) = path {
        match fs::write(path, runtime.disk().contents()) {
            Ok(()) => log::debug!("disk written to {}", path.display()),
            Err(e) => log::error!("disk {}: {e}", path.display()),
        }
    }
}

fn state_file(args: &Args) -> PathBuf {
    match (&args.state, &args.disk) {
        (Some(state), _) => state.clone(),
        (None, Some(disk)) => savestate::state_path(disk),
        (None, None) => PathBuf::from("fc4.state"),
    }
}

fn save_screenshot(runtime: &Runtime, path: &Path) -> std::io::Result<()> {
    let memory = runtime.memory();
    fs::write(path, png::encode_screen(&memory.palette(), memory.framebuffer()))
}

/// An F10 clip in progress.
struct Recording {
    gif: GifEncoder,
    path: PathBuf,
    frames_left: u32,
}

impl Recording {
    fn start(runtime: &Runtime, path: PathBuf) -> Self {
        log::info!("recording: {}", path.display());
        Recording {
            gif: GifEncoder::new(runtime.memory().palette(), RECORD_DELAY_CS),
            path,
            frames_left: RECORD_FRAMES,
        }
    }

    /// Capture the current screen when due. Returns false once the clip is complete.
    fn capture(&mut self, runtime: &Runtime) -> bool {
        if self.frames_left % RECORD_STEP == 0 {
            let memory = runtime.memory();
            self.gif.add_frame(&memory.palette(), memory.framebuffer());
        }
        self.frames_left = self.frames_left.saturating_sub(1);
        self.frames_left > 0
    }

    fn finish(self) {
        let frames = self.gif.frame_count();
        match fs::write(&self.path, self.gif.finish()) {
            Ok(()) => log::info!("recorded {frames} frames: {}", self.path.display()),
            Err(e) => log::error!("recording {}: {e}", self.path.display()),
        }
    }
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let disk = load_disk(args.disk.as_deref());
    let mut runtime = Runtime::with_disk(RuntimeOptions::default(), disk);

    let result = if args.headless {
        run_headless(&args, &mut runtime, &mut TestCart::new())
    } else {
        run_gui(&args, &mut runtime, || Box::new(TestCart::new()))
    };

    persist_disk(&runtime, args.disk.as_deref());
    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(1);
    }
}

// ─── GUI Mode ───────────────────────────────────────────────────────────────

/// Runs the window loop. `boot` builds a fresh guest at startup and on reboot.
fn run_gui(
    args: &Args,
    runtime: &mut Runtime,
    boot: impl Fn() -> Box<dyn Guest>,
) -> Result<(), Box<dyn Error>> {
    let mut guest = boot();
    let state_path = state_file(args);
    let scale = args.scale as usize;
    let scaled_w = SCREEN_WIDTH * scale;
    let scaled_h = SCREEN_HEIGHT * scale;

    let mut window = Window::new(
        "fc4", scaled_w, scaled_h,
        WindowOptions {
            scale: Scale::X1,
            scale_mode: ScaleMode::AspectRatioStretch,
            resize: true,
            ..Default::default()
        },
    )?;
    window.set_target_fps(60);

    let mut muted = args.mute;
    let mut audio = if muted { None } else { setup_audio(runtime.apu()) };

    let mut gilrs = init_gamepad();
    let mut gp = GamepadState::default();
    let mut rewind = RewindBuffer::for_seconds(args.rewind_seconds, REWIND_INTERVAL);
    log::debug!("rewind: {} snapshots every {} frames", rewind.capacity(), rewind.interval);

    let mut screen = vec![0u32; SCREEN_WIDTH * SCREEN_HEIGHT];
    let mut scaled_buf = vec![0u32; scaled_w * scaled_h];
    let mut screenshot_n = 0u32;
    let mut recording: Option<Recording> = None;
    let mut recording_n = 0u32;
    let mut last_fps_time = Instant::now();
    let mut fps_frames = 0u32;

    while window.is_open() && !window.is_key_down(Key::Escape) {
        if let Some(g) = gilrs.as_mut() { poll_gamepad(g, &mut gp); }

        // Mute (M)
        if window.is_key_pressed(Key::M, KeyRepeat::No) {
            muted = !muted;
            audio = if muted { None } else { setup_audio(runtime.apu()) };
        }

        // Save / load state (F5 / F9)
        if window.is_key_pressed(Key::F5, KeyRepeat::No) {
            match savestate::save_to_file(&runtime.save_state(), &state_path) {
                Ok(()) => log::info!("state saved: {}", state_path.display()),
                Err(e) => log::error!("save state: {e}"),
            }
        }
        if window.is_key_pressed(Key::F9, KeyRepeat::No) {
            match savestate::load_from_file(&state_path).and_then(|s| runtime.load_state(s)) {
                Ok(()) => {
                    rewind.clear();
                    log::info!("state loaded: {}", state_path.display());
                }
                Err(e) => log::error!("load state: {e}"),
            }
        }

        // Screenshot (F12)
        if window.is_key_pressed(Key::F12, KeyRepeat::No) {
            let path = PathBuf::from(format!("screenshot_{screenshot_n:04}.png"));
            match save_screenshot(runtime, &path) {
                Ok(()) => {
                    log::info!("screenshot: {}", path.display());
                    screenshot_n += 1;
                }
                Err(e) => log::error!("screenshot {}: {e}", path.display()),
            }
        }

        // Reboot (R)
        if window.is_key_pressed(Key::R, KeyRepeat::No) {
            runtime.reset();
            guest = boot();
            rewind.clear();
            log::info!("reboot");
        }

        // Record (F10): ignored while a clip is running
        if window.is_key_pressed(Key::F10, KeyRepeat::No) && recording.is_none() {
            recording = Some(Recording::start(runtime, PathBuf::from(format!("recording_{recording_n:04}.gif"))));
            recording_n += 1;
        }

        if window.is_key_down(Key::Backspace) {
            // Rewind (Backspace): step back one snapshot per frame
            if let Some(snap) = rewind.pop() {
                runtime.unserialize(&snap.state)?;
                log::trace!("rewound to frame {}", snap.frame);
            }
        } else {
            runtime.set_gamepad(0, keyboard_player(&window, &PLAYER1_KEYS) | gp.bits());
            runtime.set_gamepad(1, keyboard_player(&window, &PLAYER2_KEYS));
            let (mx, my, mb) = mouse_state(&window);
            runtime.set_mouse(mx, my, mb);

            runtime.update(guest.as_mut())?;
            if runtime.take_disk_dirty() {
                persist_disk(runtime, args.disk.as_deref());
            }
            if rewind.tick_frame() {
                rewind.push(Snapshot { state: runtime.serialize(), frame: runtime.frame_count() });
            }
        }
        fps_frames += 1;

        if let Some(mut clip) = recording.take() {
            if clip.capture(runtime) {
                recording = Some(clip);
            } else {
                clip.finish();
            }
        }

        // Render
        runtime.composite_u32(&mut screen);
        for (y, row) in screen.chunks(SCREEN_WIDTH).enumerate() {
            for sy in 0..scale {
                let base = (y * scale + sy) * scaled_w;
                let line = &mut scaled_buf[base..base + scaled_w];
                for (out, &c) in line.chunks_mut(scale).zip(row) {
                    out.fill(c);
                }
            }
        }
        window.update_with_buffer(&scaled_buf, scaled_w, scaled_h)?;

        if last_fps_time.elapsed() >= Duration::from_secs(2) {
            let fps = fps_frames as f64 / last_fps_time.elapsed().as_secs_f64();
            let mute = if muted || audio.is_none() { " [MUTE]" } else { "" };
            window.set_title(&format!("fc4 - {fps:.0} FPS{mute} ({scale}x)"));
            fps_frames = 0;
            last_fps_time = Instant::now();
        }
    }
    if let Some(clip) = recording {
        clip.finish();
    }
    log::info!("{} frames", runtime.frame_count());
    Ok(())
}

// ─── Headless Mode ──────────────────────────────────────────────────────────

fn run_headless(args: &Args, runtime: &mut Runtime, guest: &mut dyn Guest) -> Result<(), Box<dyn Error>> {
    runtime.set_trace_handler(Box::new(|line: &str| println!("{line}")));
    log::debug!("running {} frames", args.frames);

    for _ in 0..args.frames {
        runtime.update(&mut *guest)?;
        // No audio device: drain samples so fades run out
        apu::lock(&runtime.apu()).write_samples(&mut [0i16; apu::SAMPLES_PER_TICK as usize * 2]);
    }
    print_screen(runtime);
    Ok(())
}

/// Print the screen two rows per line, darkest palette index as solid.
fn print_screen(runtime: &Runtime) {
    const SHADES: [char; 4] = [' ', '░', '▒', '█'];
    let fb = runtime.memory().framebuffer();
    let index = |x: usize, y: usize| (fb[(y * SCREEN_WIDTH + x) >> 2] >> ((x & 3) * 2)) & 3;

    println!("  === Frame {} ===", runtime.frame_count());
    for y in (0..SCREEN_HEIGHT).step_by(2) {
        let mut line = String::with_capacity(SCREEN_WIDTH + 4);
        line.push_str("  |");
        for x in 0..SCREEN_WIDTH {
            line.push(SHADES[index(x, y).max(index(x, y + 1)) as usize]);
        }
        line.push('|');
        println!("{line}");
    }
}
