//! RD-03D serial frame decoder.
//!
//! Wire format (little-endian, 30 bytes):
//! ```text
//! ┌─────────────┬──────────┬──────────┬──────────┬───────┐
//! │ AA FF 03 00 │ target 1 │ target 2 │ target 3 │ 55 CC │
//! │   header    │   8 B    │   8 B    │   8 B    │ tail  │
//! └─────────────┴──────────┴──────────┴──────────┴───────┘
//!
//! target = x (i16*) │ y (i16*) │ speed (i16*) │ resolution (u16)
//! i16* = sign-magnitude: bit 15 set → positive, low 15 bits = |value|
//! ```
//!
//! x / y are millimetres, speed is cm/s.  An all-zero target slot means
//! "no target".  The decoder is fed arbitrary chunks from the UART and
//! resynchronises on the header after any corruption.

/// Total frame length on the wire.
pub const FRAME_LEN: usize = 30;

/// Targets per frame.
pub const MAX_TARGETS: usize = 3;

const HEADER: [u8; 4] = [0xAA, 0xFF, 0x03, 0x00];
const TAIL: [u8; 2] = [0x55, 0xCC];
const TARGET_LEN: usize = 8;

/// One tracked target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Target {
    pub x_mm: i16,
    pub y_mm: i16,
    pub speed_cm_s: i16,
    pub resolution_mm: u16,
}

impl Target {
    /// Straight-line distance from the radar in metres.
    pub fn distance_m(&self) -> f32 {
        f32::from(self.x_mm).hypot(f32::from(self.y_mm)) / 1000.0
    }

    fn decode(b: &[u8]) -> Option<Self> {
        if b.iter().all(|&x| x == 0) {
            return None;
        }
        Some(Self {
            x_mm: sign_magnitude(b[0], b[1]),
            y_mm: sign_magnitude(b[2], b[3]),
            speed_cm_s: sign_magnitude(b[4], b[5]),
            resolution_mm: u16::from_le_bytes([b[6], b[7]]),
        })
    }

    fn encode(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(&to_sign_magnitude(self.x_mm));
        out[2..4].copy_from_slice(&to_sign_magnitude(self.y_mm));
        out[4..6].copy_from_slice(&to_sign_magnitude(self.speed_cm_s));
        out[6..8].copy_from_slice(&self.resolution_mm.to_le_bytes());
    }
}

fn sign_magnitude(lo: u8, hi: u8) -> i16 {
    let raw = u16::from_le_bytes([lo, hi]);
    let mag = (raw & 0x7FFF) as i16;
    if raw & 0x8000 != 0 { mag } else { -mag }
}

fn to_sign_magnitude(v: i16) -> [u8; 2] {
    let mag = v.unsigned_abs() & 0x7FFF;
    let raw = if v >= 0 { 0x8000 | mag } else { mag };
    raw.to_le_bytes()
}

/// A decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RadarFrame {
    pub targets: [Option<Target>; MAX_TARGETS],
}

impl RadarFrame {
    /// Distance of the nearest non-empty target.
    pub fn nearest_distance_m(&self) -> Option<f32> {
        self.targets
            .iter()
            .flatten()
            .map(Target::distance_m)
            .min_by(f32::total_cmp)
    }

    /// Serialise to wire format.  Used by simulators and tests.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut out = [0u8; FRAME_LEN];
        out[..HEADER.len()].copy_from_slice(&HEADER);
        for (i, t) in self.targets.iter().enumerate() {
            if let Some(t) = t {
                let start = HEADER.len() + i * TARGET_LEN;
                t.encode(&mut out[start..start + TARGET_LEN]);
            }
        }
        out[FRAME_LEN - TAIL.len()..].copy_from_slice(&TAIL);
        out
    }

    /// Single-target frame at `(x_mm, y_mm)`.
    pub fn single(x_mm: i16, y_mm: i16) -> Self {
        let mut f = Self::default();
        f.targets[0] = Some(Target {
            x_mm,
            y_mm,
            ..Target::default()
        });
        f
    }
}

/// Outcome of feeding one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Frame(RadarFrame),
    /// A frame started but was not terminated correctly, or a full
    /// frame's worth of bytes went by without a header.
    Malformed,
}

/// Streaming frame decoder.
pub struct FrameDecoder {
    buf: [u8; FRAME_LEN],
    len: usize,
    /// Bytes discarded while hunting for a header.
    skipped: usize,
    malformed: u32,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buf: [0; FRAME_LEN],
            len: 0,
            skipped: 0,
            malformed: 0,
        }
    }

    /// Feed one byte.
    pub fn push(&mut self, byte: u8) -> Option<Decoded> {
        if self.len < HEADER.len() {
            return self.hunt(byte);
        }

        self.buf[self.len] = byte;
        self.len += 1;
        if self.len < FRAME_LEN {
            return None;
        }

        self.len = 0;
        if self.buf[FRAME_LEN - TAIL.len()..] != TAIL {
            return Some(self.malformed());
        }

        let mut frame = RadarFrame::default();
        for (i, slot) in frame.targets.iter_mut().enumerate() {
            let start = HEADER.len() + i * TARGET_LEN;
            *slot = Target::decode(&self.buf[start..start + TARGET_LEN]);
        }
        Some(Decoded::Frame(frame))
    }

    /// Feed a chunk, calling `on` for every outcome in order.
    pub fn feed(&mut self, data: &[u8], mut on: impl FnMut(Decoded)) {
        for &b in data {
            if let Some(d) = self.push(b) {
                on(d);
            }
        }
    }

    /// Total malformed frames seen since construction.
    pub fn malformed_count(&self) -> u32 {
        self.malformed
    }

    /// Drop any partial frame (e.g. after the port was reopened).
    pub fn reset(&mut self) {
        self.len = 0;
        self.skipped = 0;
    }

    fn hunt(&mut self, byte: u8) -> Option<Decoded> {
        if byte == HEADER[self.len] {
            self.buf[self.len] = byte;
            self.len += 1;
            self.skipped = 0;
            return None;
        }
        // Restart on a fresh header start, otherwise discard.
        self.len = usize::from(byte == HEADER[0]);
        if self.len == 1 {
            self.buf[0] = byte;
            return None;
        }
        self.skipped += 1;
        if self.skipped >= FRAME_LEN {
            self.skipped = 0;
            return Some(self.malformed());
        }
        None
    }

    fn malformed(&mut self) -> Decoded {
        self.malformed = self.malformed.wrapping_add(1);
        Decoded::Malformed
    }
}
