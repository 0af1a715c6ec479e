//! Sample rate and block size types shared by every core subsystem.

use serde::{Deserialize, Serialize};

/// Common sample rates (spec §6: 8-192 kHz supported overall).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRate(pub u32);

impl SampleRate {
    pub const HZ_44100: Self = Self(44_100);
    pub const HZ_48000: Self = Self(48_000);
    pub const HZ_96000: Self = Self(96_000);
    pub const HZ_192000: Self = Self(192_000);

    #[inline]
    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn samples_to_seconds(self, samples: u64) -> f64 {
        samples as f64 / self.as_f64()
    }

    #[inline]
    pub fn seconds_to_samples(self, seconds: f64) -> u64 {
        (seconds * self.as_f64()).round() as u64
    }

    /// Number of samples per 100 ms loudness measurement block (spec §4.C.4).
    #[inline]
    pub fn lufs_block_size(self) -> usize {
        (self.0 / 10) as usize
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self::HZ_48000
    }
}

/// Block sizes the audio callback may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum BufferSize {
    Samples32 = 32,
    Samples64 = 64,
    Samples128 = 128,
    Samples256 = 256,
    Samples512 = 512,
    Samples1024 = 1024,
    Samples2048 = 2048,
    Samples4096 = 4096,
}

impl BufferSize {
    #[inline]
    pub fn as_usize(self) -> usize {
        self as u32 as usize
    }

    #[inline]
    pub fn latency_ms(self, sample_rate: SampleRate) -> f64 {
        (self.as_usize() as f64 / sample_rate.as_f64()) * 1000.0
    }
}

impl Default for BufferSize {
    fn default() -> Self {
        Self::Samples256
    }
}
