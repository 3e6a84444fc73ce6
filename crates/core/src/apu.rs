//! Four-channel tone synthesizer.
//!
//! Channels 0 and 1 are pulse waves, 2 is a triangle, 3 is LFSR noise. Each
//! tone walks an Attack → Decay → Sustain → Release envelope whose section
//! lengths are given in 60 Hz ticks. Section boundaries move only when the
//! frame driver calls [`Apu::tick`]; inside a section, volume and frequency
//! are interpolated per output sample. Keeping the two clocks apart means a
//! slow or bursty audio callback can never shorten or stretch a note.
//!
//! When the Release section ends the channel does not stop dead. It fades
//! from its last volume to silence over [`FADE_SAMPLES`] samples, then goes
//! idle.
//!
//! Output is interleaved stereo `i16` at [`SAMPLE_RATE`]. Channels are summed
//! without limiting; a full-volume chord can clip, and that is accepted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const SAMPLE_RATE: u32 = 44_100;
/// Envelope ticks per second (one per frame).
pub const TICKS_PER_SECOND: u32 = 60;
pub const SAMPLES_PER_TICK: u32 = SAMPLE_RATE / TICKS_PER_SECOND;
/// Length of the click-free stop after Release (about 5 ms).
pub const FADE_SAMPLES: u32 = SAMPLE_RATE / 200;

pub const CHANNEL_COUNT: usize = 4;
const CHANNEL_TRIANGLE: usize = 2;
const CHANNEL_NOISE: usize = 3;

const MAX_VOLUME: f32 = 0.15 * i16::MAX as f32;
/// The triangle is perceptually quieter at equal amplitude.
const MAX_VOLUME_TRIANGLE: f32 = 0.25 * i16::MAX as f32;

/// LFSR steps taken per sample at most. Past this rate the output is
/// white noise regardless of the exact count.
const MAX_NOISE_STEPS: u32 = 1 << 16;

const PAN_LEFT: u8 = 1;
const PAN_RIGHT: u8 = 2;

/// APU handle shared between the frame thread and the audio callback.
pub type SharedApu = Arc<Mutex<Apu>>;

/// Lock the shared APU. A panic on the other side of the lock leaves the
/// channel state consistent enough to keep playing, so poisoning is ignored.
pub fn lock(apu: &SharedApu) -> MutexGuard<'_, Apu> {
    apu.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Envelope section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Attack,
    Decay,
    Sustain,
    Release,
}

impl Section {
    fn next(self) -> Option<Section> {
        match self {
            Section::Attack => Some(Section::Decay),
            Section::Decay => Some(Section::Sustain),
            Section::Sustain => Some(Section::Release),
            Section::Release => None,
        }
    }
}

/// Unpacked `tone` arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneParams {
    pub freq1: u16,
    pub freq2: u16,
    pub attack: u8,
    pub decay: u8,
    pub sustain: u8,
    pub release: u8,
    /// Percent, clamped to 100.
    pub sustain_volume: u8,
    /// Percent, clamped to 100. Zero means full volume.
    pub peak_volume: u8,
    pub channel: usize,
    pub mode: u8,
    pub pan: u8,
    pub note_mode: bool,
}

impl ToneParams {
    /// Decode the four packed words a guest passes to `tone`.
    ///
    /// ```text
    /// frequency: [31:16] end freq (0 = no glide)   [15:0] start freq
    /// duration:  [31:24] attack [23:16] decay [15:8] release [7:0] sustain
    /// volume:    [15:8] peak (0 = max)            [7:0] sustain
    /// flags:     [6] note mode [5:4] pan [3:2] mode [1:0] channel
    /// ```
    pub fn decode(frequency: u32, duration: u32, volume: u32, flags: u32) -> Self {
        ToneParams {
            freq1: (frequency & 0xffff) as u16,
            freq2: (frequency >> 16) as u16,
            sustain: duration as u8,
            release: (duration >> 8) as u8,
            decay: (duration >> 16) as u8,
            attack: (duration >> 24) as u8,
            sustain_volume: (volume as u8).min(100),
            peak_volume: ((volume >> 8) as u8).min(100),
            channel: (flags & 0x3) as usize,
            mode: ((flags >> 2) & 0x3) as u8,
            pan: ((flags >> 4) & 0x3) as u8,
            note_mode: flags & 0x40 != 0,
        }
    }
}

/// Equal-tempered frequency of a MIDI note with a 1/256-semitone bend.
pub fn midi_freq(note: u8, bend: u8) -> f32 {
    440.0 * 2f32.powf((note as f32 - 69.0 + bend as f32 / 256.0) / 12.0)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    if t >= 1.0 {
        return b;
    }
    a + t * (b - a)
}

/// Polynomial band-limited step correction around a discontinuity at phase 0.
fn polyblep(phase: f32, inc: f32) -> f32 {
    if phase < inc {
        let t = phase / inc;
        t + t - t * t
    } else if phase > 1.0 - inc {
        let t = (phase - (1.0 - inc)) / inc;
        1.0 - (t + t - t * t)
    } else {
        1.0
    }
}

/// Oscillator kind and its private state. Fixed per channel slot.
#[derive(Debug, Clone)]
enum Voice {
    Pulse { duty: f32 },
    Triangle,
    /// `steps` accumulates fractional LFSR steps; it needs f64 headroom
    /// because the step rate grows with the square of the frequency.
    Noise { seed: u16, last: f32, steps: f64 },
}

impl Voice {
    fn for_channel(index: usize) -> Voice {
        match index {
            CHANNEL_TRIANGLE => Voice::Triangle,
            CHANNEL_NOISE => Voice::Noise { seed: 0x0001, last: 0.0, steps: 0.0 },
            _ => Voice::Pulse { duty: 0.5 },
        }
    }

    fn max_volume(&self) -> f32 {
        match self {
            Voice::Triangle => MAX_VOLUME_TRIANGLE,
            _ => MAX_VOLUME,
        }
    }

    /// Phase at which a fresh note starts; the triangle starts on a zero crossing.
    fn start_phase(&self) -> f32 {
        match self {
            Voice::Triangle => 0.25,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Channel {
    freq1: f32,
    /// End of the pitch glide, if any.
    freq2: Option<f32>,

    start_tick: u64,
    /// Absolute tick at which each section ends.
    section_end: [u64; 4],
    section: Section,

    sustain_volume: f32,
    peak_volume: f32,

    // Interpolation endpoints for the current section
    start_volume: f32,
    end_volume: f32,
    start_freq: f32,
    end_freq: f32,
    section_samples: u32,
    elapsed: u32,

    playing: bool,
    /// Samples left in the fade-out, or 0.
    fade_remaining: u32,
    fade_from: f32,
    last_volume: f32,

    phase: f32,
    pan: u8,
    voice: Voice,
}

impl Channel {
    fn new(index: usize) -> Self {
        Channel {
            freq1: 0.0,
            freq2: None,
            start_tick: 0,
            section_end: [0; 4],
            section: Section::Release,
            sustain_volume: 0.0,
            peak_volume: 0.0,
            start_volume: 0.0,
            end_volume: 0.0,
            start_freq: 0.0,
            end_freq: 0.0,
            section_samples: 0,
            elapsed: 0,
            playing: false,
            fade_remaining: 0,
            fade_from: 0.0,
            last_volume: 0.0,
            phase: 0.0,
            pan: 0,
            voice: Voice::for_channel(index),
        }
    }

    fn section_start(&self, section: Section) -> u64 {
        match section {
            Section::Attack => self.start_tick,
            s => self.section_end[s as usize - 1],
        }
    }

    /// Glide position at an absolute tick, proportional to the whole tone.
    fn freq_at(&self, tick: u64) -> f32 {
        match self.freq2 {
            None => self.freq1,
            Some(freq2) => {
                let total = self.section_end[Section::Release as usize] - self.start_tick;
                if total == 0 {
                    return self.freq1;
                }
                let t = (tick.saturating_sub(self.start_tick)) as f32 / total as f32;
                lerp(self.freq1, freq2, t.min(1.0))
            }
        }
    }

    fn enter(&mut self, section: Section) {
        let start = self.section_start(section);
        let end = self.section_end[section as usize];

        self.section = section;
        self.section_samples = ((end - start) as u32).saturating_mul(SAMPLES_PER_TICK);
        self.elapsed = 0;
        (self.start_volume, self.end_volume) = match section {
            Section::Attack => (0.0, self.peak_volume),
            Section::Decay => (self.peak_volume, self.sustain_volume),
            Section::Sustain => (self.sustain_volume, self.sustain_volume),
            Section::Release => (self.sustain_volume, 0.0),
        };
        self.start_freq = self.freq_at(start);
        self.end_freq = self.freq_at(end);
    }

    fn begin_fade(&mut self) {
        self.fade_remaining = FADE_SAMPLES;
        self.fade_from = self.last_volume;
    }

    fn section_progress(&self) -> f32 {
        if self.section_samples == 0 {
            1.0
        } else {
            (self.elapsed as f32 / self.section_samples as f32).min(1.0)
        }
    }

    fn frequency(&self) -> f32 {
        lerp(self.start_freq, self.end_freq, self.section_progress())
    }

    fn volume(&self) -> f32 {
        if self.fade_remaining > 0 {
            self.fade_from * self.fade_remaining as f32 / FADE_SAMPLES as f32
        } else {
            lerp(self.start_volume, self.end_volume, self.section_progress())
        }
    }

    /// Advance the envelope past every section that ended by `ticks`.
    fn advance(&mut self, ticks: u64) {
        while self.playing && self.fade_remaining == 0 && ticks >= self.section_end[self.section as usize] {
            match self.section.next() {
                Some(next) => self.enter(next),
                None => self.begin_fade(),
            }
        }
    }

    /// Produce one sample and step the oscillator.
    fn next_sample(&mut self) -> f32 {
        let freq = self.frequency();
        let volume = self.volume();
        self.last_volume = volume;
        self.elapsed = self.elapsed.saturating_add(1);
        if self.fade_remaining > 0 {
            self.fade_remaining -= 1;
            if self.fade_remaining == 0 {
                self.playing = false;
            }
        }

        if let Voice::Noise { seed, last, steps } = &mut self.voice {
            // Step rate follows freq², not freq
            *steps += f64::from(freq) * f64::from(freq) / 1_000_000.0;
            if *steps > 0.0 {
                let due = steps.ceil();
                *steps -= due;
                for _ in 0..(due as u32).min(MAX_NOISE_STEPS) {
                    *seed ^= *seed >> 7;
                    *seed ^= *seed << 9;
                    *seed ^= *seed >> 13;
                }
                *last = if *seed & 1 != 0 { 1.0 } else { -1.0 };
            }
            return volume * *last;
        }

        let inc = freq / SAMPLE_RATE as f32;
        let phase = (self.phase + inc).fract();
        self.phase = phase;

        match self.voice {
            Voice::Triangle => volume * (2.0 * (2.0 * phase - 1.0).abs() - 1.0),
            Voice::Pulse { duty } => {
                // Map each half of the duty cycle onto 0..1 so both edges get corrected
                if phase < duty {
                    volume * polyblep(phase / duty, inc / duty)
                } else {
                    -volume * polyblep((phase - duty) / (1.0 - duty), inc / (1.0 - duty))
                }
            }
            Voice::Noise { .. } => 0.0,
        }
    }
}

/// The synthesizer. Owned by a runtime, usually behind a [`SharedApu`].
#[derive(Debug, Clone)]
pub struct Apu {
    channels: [Channel; CHANNEL_COUNT],
    ticks: u64,
}

impl Apu {
    pub fn new() -> Self {
        Apu { channels: std::array::from_fn(Channel::new), ticks: 0 }
    }

    pub fn shared() -> SharedApu {
        Arc::new(Mutex::new(Apu::new()))
    }

    /// Start or retrigger a tone from the packed guest arguments.
    pub fn tone(&mut self, frequency: u32, duration: u32, volume: u32, flags: u32) {
        self.play(ToneParams::decode(frequency, duration, volume, flags));
    }

    pub fn play(&mut self, params: ToneParams) {
        log::trace!("tone {params:?}");
        let index = params.channel;
        let ticks = self.ticks;
        let ch = &mut self.channels[index];

        if !ch.playing {
            ch.phase = ch.voice.start_phase();
        }

        if params.note_mode {
            ch.freq1 = midi_freq(params.freq1 as u8, (params.freq1 >> 8) as u8);
            ch.freq2 = (params.freq2 != 0).then(|| midi_freq(params.freq2 as u8, (params.freq2 >> 8) as u8));
        } else {
            ch.freq1 = params.freq1 as f32;
            ch.freq2 = (params.freq2 != 0).then_some(params.freq2 as f32);
        }

        ch.start_tick = ticks;
        let attack_end = ticks + params.attack as u64;
        let decay_end = attack_end + params.decay as u64;
        let sustain_end = decay_end + params.sustain as u64;
        let release_end = sustain_end + params.release as u64;
        ch.section_end = [attack_end, decay_end, sustain_end, release_end];

        let max = ch.voice.max_volume();
        ch.sustain_volume = max * params.sustain_volume as f32 / 100.0;
        ch.peak_volume = if params.peak_volume == 0 { max } else { max * params.peak_volume as f32 / 100.0 };

        ch.pan = params.pan;
        if let Voice::Pulse { duty } = &mut ch.voice {
            *duty = match params.mode {
                0 => 0.125,
                1 => 0.25,
                2 => 0.5,
                _ => 0.75,
            };
        }

        ch.playing = true;
        ch.fade_remaining = 0;

        ch.enter(Section::Attack);
        if params.attack == 0 {
            ch.enter(Section::Decay);
            if params.decay == 0 {
                ch.enter(Section::Sustain);
            }
        }
    }

    /// Advance the envelope clock by one frame.
    pub fn tick(&mut self) {
        let ticks = self.ticks;
        for ch in self.channels.iter_mut() {
            ch.advance(ticks);
        }
        self.ticks += 1;
    }

    /// Fill `output` with interleaved stereo frames. A trailing odd sample is
    /// left untouched.
    pub fn write_samples(&mut self, output: &mut [i16]) {
        for frame in output.chunks_exact_mut(2) {
            let mut left = 0.0f32;
            let mut right = 0.0f32;

            for ch in self.channels.iter_mut() {
                if !ch.playing {
                    continue;
                }
                let sample = ch.next_sample();
                if ch.pan != PAN_RIGHT {
                    left += sample;
                }
                if ch.pan != PAN_LEFT {
                    right += sample;
                }
            }

            // `as` saturates at the i16 range
            frame[0] = left as i16;
            frame[1] = right as i16;
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_playing(&self, channel: usize) -> bool {
        self.channels[channel & 3].playing
    }

    /// Current envelope section, or `None` when idle or fading out.
    pub fn section(&self, channel: usize) -> Option<Section> {
        let ch = &self.channels[channel & 3];
        (ch.playing && ch.fade_remaining == 0).then_some(ch.section)
    }

    pub fn is_fading(&self, channel: usize) -> bool {
        self.channels[channel & 3].fade_remaining > 0
    }

    pub fn phase(&self, channel: usize) -> f32 {
        self.channels[channel & 3].phase
    }

    /// Instantaneous frequency in Hz at the current sample position.
    pub fn frequency(&self, channel: usize) -> f32 {
        self.channels[channel & 3].frequency()
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TONE_NOISE, TONE_NOTE_MODE, TONE_PULSE1, TONE_TRIANGLE};

    const FRAME: usize = SAMPLES_PER_TICK as usize * 2;

    fn render(apu: &mut Apu) -> Vec<i16> {
        let mut buf = vec![0i16; FRAME];
        apu.write_samples(&mut buf);
        buf
    }

    fn peak(buf: &[i16]) -> i16 {
        buf.iter().map(|s| s.saturating_abs()).max().unwrap_or(0)
    }

    #[test]
    fn test_decode() {
        let p = ToneParams::decode(440 | (880 << 16), 0x0102_0304, 0x3250, 0x40 | 0x20 | 0x0c | 0x1);
        assert_eq!((p.freq1, p.freq2), (440, 880));
        assert_eq!((p.attack, p.decay, p.release, p.sustain), (1, 2, 3, 4));
        assert_eq!((p.sustain_volume, p.peak_volume), (80, 50));
        assert_eq!((p.channel, p.mode, p.pan), (1, 3, 2));
        assert!(p.note_mode);
    }

    #[test]
    fn test_decode_clamps_volume() {
        let p = ToneParams::decode(0, 0, 0xff_ff, 0);
        assert_eq!((p.sustain_volume, p.peak_volume), (100, 100));
    }

    #[test]
    fn test_midi_freq() {
        assert!((midi_freq(69, 0) - 440.0).abs() < 1e-3);
        assert!((midi_freq(81, 0) - 880.0).abs() < 1e-2);
        assert!((midi_freq(69, 128) - 452.893).abs() < 1e-2);
    }

    #[test]
    fn test_sustain_then_fade() {
        let mut apu = Apu::new();
        apu.tone(440, 10, 100, 0);
        for _ in 0..10 {
            apu.tick();
            let buf = render(&mut apu);
            let p = peak(&buf);
            assert!(p > 4000 && p <= (MAX_VOLUME as i16) + 1, "peak {p}");
            assert!(apu.is_playing(0));
        }
        assert_eq!(apu.section(0), Some(Section::Sustain));

        apu.tick();
        assert!(apu.is_fading(0));
        let buf = render(&mut apu);
        let fade_len = FADE_SAMPLES as usize * 2;
        assert!(peak(&buf[..fade_len]) > 0);
        assert!(buf[fade_len..].iter().all(|&s| s == 0));
        assert!(!apu.is_playing(0));
    }

    #[test]
    fn test_fade_envelope_decreases() {
        let mut apu = Apu::new();
        apu.tone(1000, 1, 100, 2 << 2);
        apu.tick();
        render(&mut apu);
        apu.tick();
        let mut buf = vec![0i16; FADE_SAMPLES as usize * 2];
        apu.write_samples(&mut buf);
        let first = peak(&buf[..40]);
        let last = peak(&buf[buf.len() - 40..]);
        assert!(last < first);
    }

    #[test]
    fn test_attack_ramps_up() {
        let mut apu = Apu::new();
        apu.tone(220, 10 << 24 | 10, 100, 2);
        assert_eq!(apu.section(2), Some(Section::Attack));
        let early = peak(&render(&mut apu)[..200]);
        for _ in 0..8 {
            apu.tick();
            render(&mut apu);
        }
        let late = peak(&render(&mut apu));
        assert!(late > early);
    }

    #[test]
    fn test_zero_length_sections_resolve_on_tick() {
        let mut apu = Apu::new();
        apu.tone(440, 0, 100, 0);
        assert_eq!(apu.section(0), Some(Section::Sustain));
        apu.tick();
        assert!(apu.is_fading(0));
    }

    #[test]
    fn test_retrigger_preserves_phase() {
        let mut apu = Apu::new();
        apu.tone(523, 30, 100, 0);
        apu.tick();
        let mut buf = vec![0i16; 333 * 2];
        apu.write_samples(&mut buf);
        let before = apu.phase(0);
        assert!(before > 0.0);
        apu.tone(659, 30, 100, 0);
        assert_eq!(apu.phase(0), before);
    }

    #[test]
    fn test_idle_channel_resets_phase() {
        let mut apu = Apu::new();
        apu.tone(300, 0, 100, 2);
        assert_eq!(apu.phase(2), 0.25);
        let mut buf = vec![0i16; 100];
        apu.write_samples(&mut buf);
        apu.tick();
        render(&mut apu);
        assert!(!apu.is_playing(2));
        apu.tone(300, 5, 100, 2);
        assert_eq!(apu.phase(2), 0.25);
    }

    #[test]
    fn test_retrigger_cancels_fade() {
        let mut apu = Apu::new();
        apu.tone(440, 0, 100, 1);
        apu.tick();
        assert!(apu.is_fading(1));
        apu.tone(440, 5, 100, 1);
        assert!(!apu.is_fading(1));
        assert_eq!(apu.section(1), Some(Section::Sustain));
    }

    #[test]
    fn test_glide_monotonic() {
        let mut apu = Apu::new();
        apu.tone(440 | (880 << 16), 10 << 24 | 10 << 16 | 10 << 8 | 10, 100, 0);
        let mut last = apu.frequency(0);
        assert_eq!(last, 440.0);
        for _ in 0..40 {
            let mut buf = vec![0i16; 2 * 49];
            for _ in 0..15 {
                apu.write_samples(&mut buf);
                let f = apu.frequency(0);
                assert!(f >= last - 1e-3, "{f} < {last}");
                last = f;
            }
            apu.tick();
        }
        render(&mut apu);
        assert!((apu.frequency(0) - 880.0).abs() < 0.01);
    }

    #[test]
    fn test_pan() {
        let mut apu = Apu::new();
        apu.tone(440, 10, 100, 1 << 4);
        let buf = render(&mut apu);
        assert!(buf.chunks(2).all(|f| f[1] == 0));
        assert!(buf.chunks(2).any(|f| f[0] != 0));

        let mut apu = Apu::new();
        apu.tone(440, 10, 100, 2 << 4 | 1);
        let buf = render(&mut apu);
        assert!(buf.chunks(2).all(|f| f[0] == 0));
        assert!(buf.chunks(2).any(|f| f[1] != 0));
    }

    #[test]
    fn test_noise_is_bipolar_and_holds() {
        let mut apu = Apu::new();
        apu.tone(100, 10, 100, 3);
        let buf = render(&mut apu);
        let level = MAX_VOLUME as i16;
        let left: Vec<i16> = buf.chunks(2).map(|f| f[0]).collect();
        assert!(left.iter().all(|&s| s == level || s == -level));
        // 100 Hz steps the LFSR once every 100 samples
        assert!(left[1..90].iter().all(|&s| s == left[1]));
    }

    #[test]
    fn test_extreme_note_renders() {
        // MIDI 255 is ~2.2e7 Hz; the noise channel steps ~5e8 times per sample
        let mut apu = Apu::new();
        apu.tone(255, 10, 100, TONE_NOISE | TONE_NOTE_MODE);
        apu.tone(255, 10, 100, TONE_PULSE1 | TONE_NOTE_MODE);
        apu.tone(255, 10, 100, TONE_TRIANGLE | TONE_NOTE_MODE);
        let buf = render(&mut apu);
        assert!(buf.iter().any(|&s| s != 0));
        assert!((0..3).all(|ch| (0.0..1.0).contains(&apu.phase(ch))));
    }

    #[test]
    fn test_channels_mix_additively() {
        let mut solo = Apu::new();
        solo.tone(1000, 10, 100, 3);
        let a = render(&mut solo);

        let mut both = Apu::new();
        both.tone(1000, 10, 100, 3);
        both.tone(1000, 10, 100, 2);
        let mut tri = Apu::new();
        tri.tone(1000, 10, 100, 2);
        let b = render(&mut both);
        let t = render(&mut tri);
        for i in 0..a.len() {
            assert!((b[i] as i32 - (a[i] as i32 + t[i] as i32)).abs() <= 1);
        }
    }

    #[test]
    fn test_shared_lock() {
        let apu = Apu::shared();
        lock(&apu).tone(440, 1, 50, 0);
        assert!(lock(&apu).is_playing(0));
    }
}
