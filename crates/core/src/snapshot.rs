//! Rewind history.
//!
//! Snapshots are [`Runtime::serialize`](crate::Runtime::serialize) images
//! taken every `interval` frames into a fixed-size ring. Popping walks back
//! newest-first; once the ring is full the oldest snapshot is overwritten.

/// A serialized runtime state and the frame it was taken on.
#[derive(Clone)]
pub struct Snapshot {
    pub state: Vec<u8>,
    pub frame: u32,
}

pub struct RewindBuffer {
    buf: Vec<Option<Snapshot>>,
    /// Next slot to overwrite
    write_pos: usize,
    count: usize,
    /// Frames between snapshots
    pub interval: u32,
    frame_counter: u32,
}

impl RewindBuffer {
    /// With interval=6 and capacity=100, holds 10 seconds of history at 60 fps.
    pub fn new(capacity: usize, interval: u32) -> Self {
        RewindBuffer {
            buf: vec![None; capacity.max(1)],
            write_pos: 0,
            count: 0,
            interval: interval.max(1),
            frame_counter: 0,
        }
    }

    /// Size a buffer for `seconds` of history at 60 fps, one snapshot every `interval` frames.
    pub fn for_seconds(seconds: u32, interval: u32) -> Self {
        let interval = interval.max(1);
        Self::new((seconds * 60 / interval) as usize, interval)
    }

    /// Count a finished frame. Returns true when a snapshot is due.
    pub fn tick_frame(&mut self) -> bool {
        self.frame_counter += 1;
        if self.frame_counter >= self.interval {
            self.frame_counter = 0;
            true
        } else {
            false
        }
    }

    pub fn push(&mut self, snap: Snapshot) {
        self.buf[self.write_pos] = Some(snap);
        self.write_pos = (self.write_pos + 1) % self.buf.len();
        if self.count < self.buf.len() {
            self.count += 1;
        }
    }

    /// Take the most recent snapshot.
    pub fn pop(&mut self) -> Option<Snapshot> {
        if self.count == 0 {
            return None;
        }
        self.write_pos = self.write_pos.checked_sub(1).unwrap_or(self.buf.len() - 1);
        self.count -= 1;
        self.buf[self.write_pos].take()
    }

    pub fn len(&self) -> usize { self.count }

    pub fn is_empty(&self) -> bool { self.count == 0 }

    pub fn capacity(&self) -> usize { self.buf.len() }

    pub fn clear(&mut self) {
        self.buf.iter_mut().for_each(|slot| *slot = None);
        self.count = 0;
        self.write_pos = 0;
        self.frame_counter = 0;
    }

    /// Bytes held by stored snapshots.
    pub fn memory_usage(&self) -> usize {
        self.buf.iter().flatten().map(|s| s.state.len()).sum()
    }
}
