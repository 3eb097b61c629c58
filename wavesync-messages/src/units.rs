use serde::{Deserialize, Serialize};

/// Frequency in Hertz.
///
/// Always an integer: the server rejects (and closes the stream on) fractional
/// frequencies, so anything headed for the wire goes through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hertz(pub u64);

impl std::fmt::Display for Hertz {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}

impl Hertz {
    pub const fn khz(khz: u64) -> Self {
        Self(khz * 1_000)
    }

    pub const fn mhz(mhz: u64) -> Self {
        Self(mhz * 1_000_000)
    }

    /// Round a fractional (usually pixel-derived) frequency to the nearest
    /// whole Hertz. Negative and non-finite inputs saturate to 0.
    pub fn round_from(hz: f64) -> Self {
        if hz.is_finite() && hz > 0.0 {
            Self(hz.round() as u64)
        } else {
            Self(0)
        }
    }

    pub const fn as_hz(self) -> u64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl From<u64> for Hertz {
    fn from(hz: u64) -> Self {
        Self(hz)
    }
}

impl From<Hertz> for u64 {
    fn from(hz: Hertz) -> Self {
        hz.0
    }
}

/// Magnitude in Decibels (dB).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Decibels(pub f32);

impl std::fmt::Display for Decibels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} dB", self.0)
    }
}

impl Decibels {
    pub const fn as_db(self) -> f32 {
        self.0
    }
}

impl From<f32> for Decibels {
    fn from(db: f32) -> Self {
        Self(db)
    }
}

impl From<Decibels> for f32 {
    fn from(db: Decibels) -> Self {
        db.0
    }
}
