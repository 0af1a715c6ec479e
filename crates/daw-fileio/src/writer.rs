//! Common writer seam shared by the WAV and AIFF backends.

use daw_core::DawResult;

pub trait AudioFileWriter {
    /// Write `num_samples` frames. `channel_data[ch][i]` is sample `i` on
    /// channel `ch`, normalized to `[-1.0, 1.0]`.
    fn write_samples(&mut self, channel_data: &[Vec<f64>], num_samples: usize) -> DawResult<()>;

    /// Patch header sizes and flush. Calling this more than once is a
    /// no-op after the first.
    fn close(&mut self) -> DawResult<()>;

    fn file_size_bytes(&self) -> u64;
    fn sample_rate(&self) -> u32;
    fn channel_count(&self) -> u32;
}
