//! Track source interface (spec §6): the producer a track bus pulls raw
//! audio content from before summing its routed inputs.

use daw_core::AudioBuffer;

pub trait TrackSource: Send {
    /// Pull up to `out_buf.frames()` samples starting at
    /// `block_start_samples`. Returns the number of samples actually
    /// produced (less than requested at end-of-material).
    fn pull(&mut self, block_start_samples: u64, n_frames: usize, out_buf: &mut AudioBuffer) -> usize;

    fn channel_count(&self) -> usize;
}
