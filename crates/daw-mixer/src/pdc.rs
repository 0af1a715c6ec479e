//! Plugin delay compensation line (spec §4.G step 3), grounded on the
//! teacher's `PdcDelayLine`: per-channel circular buffers, generalized
//! from stereo to an arbitrary channel count.

#[derive(Debug, Clone)]
pub struct PdcDelayLine {
    channels: Vec<Vec<f32>>,
    write_pos: usize,
    delay_samples: usize,
    capacity: usize,
}

impl PdcDelayLine {
    pub fn new(num_channels: usize, max_delay_samples: usize) -> Self {
        let capacity = max_delay_samples.max(1);
        Self {
            channels: (0..num_channels).map(|_| vec![0.0; capacity]).collect(),
            write_pos: 0,
            delay_samples: 0,
            capacity,
        }
    }

    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }

    /// Resize the delay line, keeping existing contents when the new
    /// capacity is at least as large as the old one; otherwise
    /// re-initializes to silence (spec §4.G "delay compensation setter").
    pub fn set_delay(&mut self, delay_samples: usize) {
        if delay_samples >= self.capacity {
            let new_capacity = delay_samples + 1;
            for channel in &mut self.channels {
                let mut resized = vec![0.0; new_capacity];
                for i in 0..self.capacity {
                    resized[(self.write_pos + i) % new_capacity] = channel[(self.write_pos + i) % self.capacity];
                }
                *channel = resized;
            }
            self.capacity = new_capacity;
        }
        self.delay_samples = delay_samples;
    }

    /// Process one channel's block in place: write the current sample
    /// into the circular buffer, output the sample written `delay_samples`
    /// ago.
    pub fn process_channel(&mut self, channel: usize, buffer: &mut [f32]) {
        if self.delay_samples == 0 {
            return;
        }
        let line = &mut self.channels[channel];
        let mut pos = self.write_pos;
        for sample in buffer.iter_mut() {
            let read_pos = (pos + self.capacity - self.delay_samples) % self.capacity;
            let delayed = line[read_pos];
            line[pos] = *sample;
            *sample = delayed;
            pos = (pos + 1) % self.capacity;
        }
    }

    pub fn process(&mut self, buffers: &mut [&mut [f32]]) {
        if self.delay_samples == 0 {
            return;
        }
        let frames = buffers.first().map(|b| b.len()).unwrap_or(0);
        for (ch, buffer) in buffers.iter_mut().enumerate() {
            if ch >= self.channels.len() {
                break;
            }
            self.process_channel(ch, buffer);
        }
        self.write_pos = (self.write_pos + frames) % self.capacity;
    }

    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_appears_delayed_by_exact_sample_count() {
        let mut line = PdcDelayLine::new(1, 16);
        line.set_delay(5);

        let mut impulse = vec![0.0f32; 20];
        impulse[0] = 1.0;

        let mut buf_ref: Vec<&mut [f32]> = vec![&mut impulse[..]];
        line.process(&mut buf_ref);

        assert_eq!(impulse[5], 1.0);
        for (i, &s) in impulse.iter().enumerate() {
            if i != 5 {
                assert_eq!(s, 0.0, "unexpected energy at index {i}");
            }
        }
    }

    #[test]
    fn zero_delay_is_a_no_op() {
        let mut line = PdcDelayLine::new(1, 16);
        let mut data = vec![1.0f32, 2.0, 3.0];
        let mut buf_ref: Vec<&mut [f32]> = vec![&mut data[..]];
        line.process(&mut buf_ref);
        assert_eq!(data, vec![1.0, 2.0, 3.0]);
    }
}
