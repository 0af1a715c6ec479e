//! The audio sample type and the rectangular multi-channel buffer (spec §3).

/// 32-bit float audio sample, per spec §3.
pub type Sample = f32;

/// A rectangular `channels x frames` block of samples plus a maximum
/// capacity. Mutated only by its current owner (the producer stage);
/// downstream consumers receive it by reference with move semantics.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    channels: Vec<Vec<Sample>>,
    frames: usize,
    max_frames: usize,
}

impl AudioBuffer {
    /// Allocate a buffer with `num_channels` channels, each able to hold up
    /// to `max_frames` samples. Starts zero-filled with `frames() ==
    /// max_frames`.
    pub fn new(num_channels: usize, max_frames: usize) -> Self {
        Self {
            channels: (0..num_channels).map(|_| vec![0.0; max_frames]).collect(),
            frames: max_frames,
            max_frames,
        }
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Shrink the logical frame count for this block without reallocating.
    /// `n` must not exceed `max_frames`.
    pub fn set_frames(&mut self, n: usize) {
        debug_assert!(n <= self.max_frames, "frame count exceeds capacity");
        self.frames = n.min(self.max_frames);
    }

    #[inline]
    pub fn channel(&self, ch: usize) -> &[Sample] {
        &self.channels[ch][..self.frames]
    }

    #[inline]
    pub fn channel_mut(&mut self, ch: usize) -> &mut [Sample] {
        &mut self.channels[ch][..self.frames]
    }

    /// Mutable slices for every channel at once, for APIs that need to
    /// operate on all channels simultaneously (e.g. per-channel delay lines).
    pub fn all_channels_mut(&mut self) -> Vec<&mut [Sample]> {
        let frames = self.frames;
        self.channels.iter_mut().map(|ch| &mut ch[..frames]).collect()
    }

    pub fn clear(&mut self) {
        for ch in &mut self.channels {
            ch[..self.frames].fill(0.0);
        }
    }

    /// Add `other` into `self`, sample for sample, clamped to the shorter of
    /// the two channel counts and frame counts. Used by bus input summing.
    pub fn add_from(&mut self, other: &AudioBuffer) {
        let chans = self.channel_count().min(other.channel_count());
        let frames = self.frames().min(other.frames());
        for c in 0..chans {
            let dst = &mut self.channels[c][..frames];
            let src = &other.channels[c][..frames];
            for i in 0..frames {
                dst[i] += src[i];
            }
        }
    }

    pub fn add_scaled_from(&mut self, other: &AudioBuffer, gain: f64) {
        let gain = gain as Sample;
        let chans = self.channel_count().min(other.channel_count());
        let frames = self.frames().min(other.frames());
        for c in 0..chans {
            let dst = &mut self.channels[c][..frames];
            let src = &other.channels[c][..frames];
            for i in 0..frames {
                dst[i] += src[i] * gain;
            }
        }
    }

    /// Add one scaled channel of `other` into one channel of `self`.
    /// Used by send routing to apply an equal-power pan across the two
    /// legs of a stereo send independently.
    pub fn add_scaled_channel_from(&mut self, dst_ch: usize, other: &AudioBuffer, src_ch: usize, gain: f64) {
        let gain = gain as Sample;
        let frames = self.frames().min(other.frames());
        let src: Vec<Sample> = other.channels[src_ch][..frames].to_vec();
        let dst = &mut self.channels[dst_ch][..frames];
        for i in 0..frames {
            dst[i] += src[i] * gain;
        }
    }

    pub fn copy_from(&mut self, other: &AudioBuffer) {
        let chans = self.channel_count().min(other.channel_count());
        let frames = self.frames().min(other.frames());
        for c in 0..chans {
            self.channels[c][..frames].copy_from_slice(&other.channels[c][..frames]);
        }
    }

    /// Peak absolute sample magnitude across all channels in the active
    /// frame range.
    pub fn peak_abs(&self) -> Sample {
        self.channels
            .iter()
            .flat_map(|ch| ch[..self.frames].iter())
            .fold(0.0_f32, |acc, &s| acc.max(s.abs()))
    }

    pub fn resize(&mut self, num_channels: usize, max_frames: usize) {
        self.channels.resize_with(num_channels, || vec![0.0; max_frames]);
        for ch in &mut self.channels {
            ch.resize(max_frames, 0.0);
        }
        self.max_frames = max_frames;
        self.frames = self.frames.min(max_frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_zeroed() {
        let buf = AudioBuffer::new(2, 128);
        assert_eq!(buf.channel_count(), 2);
        assert_eq!(buf.frames(), 128);
        assert!(buf.channel(0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn add_from_sums_samples() {
        let mut a = AudioBuffer::new(1, 4);
        let mut b = AudioBuffer::new(1, 4);
        a.channel_mut(0).copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        b.channel_mut(0).copy_from_slice(&[10.0, 10.0, 10.0, 10.0]);
        a.add_from(&b);
        assert_eq!(a.channel(0), &[11.0, 12.0, 13.0, 14.0]);
    }

    #[test]
    fn add_scaled_channel_from_targets_one_channel() {
        let mut dst = AudioBuffer::new(2, 2);
        let mut src = AudioBuffer::new(1, 2);
        src.channel_mut(0).copy_from_slice(&[1.0, 1.0]);
        dst.add_scaled_channel_from(1, &src, 0, 0.5);
        assert_eq!(dst.channel(0), &[0.0, 0.0]);
        assert_eq!(dst.channel(1), &[0.5, 0.5]);
    }

    #[test]
    fn peak_abs_finds_largest_magnitude() {
        let mut buf = AudioBuffer::new(2, 4);
        buf.channel_mut(0).copy_from_slice(&[0.1, -0.9, 0.2, 0.0]);
        buf.channel_mut(1).copy_from_slice(&[0.0, 0.0, 0.95, -0.3]);
        assert!((buf.peak_abs() - 0.95).abs() < 1e-6);
    }
}
