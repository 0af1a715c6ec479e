//! Bit-exact WAV writer (spec §4.I), grounded on `WAVFileWriter`: write a
//! placeholder 44-byte header up front, stream samples, then patch the
//! RIFF and data chunk sizes on close.

use crate::format::AudioFormat;
use crate::writer::AudioFileWriter;
use daw_core::{DawError, DawResult};
use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

pub struct WavWriter {
    file: Option<File>,
    channels: u32,
    sample_rate: u32,
    format: AudioFormat,
    bytes_per_sample: u32,
    samples_written: u64,
}

impl WavWriter {
    pub fn create(path: impl AsRef<Path>, channels: u32, sample_rate: u32, format: AudioFormat) -> DawResult<Self> {
        if channels == 0 || channels > 32 {
            return Err(DawError::InvalidParameter(format!("invalid channel count: {channels}")));
        }
        if !(8_000..=192_000).contains(&sample_rate) {
            return Err(DawError::InvalidParameter(format!("invalid sample rate: {sample_rate}")));
        }
        if format.is_aiff() {
            return Err(DawError::FormatUnsupported("AIFF format passed to WavWriter".into()));
        }

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = File::create(path)?;
        let bytes_per_sample = format.bytes_per_sample();
        write_wav_header(&mut file, channels, sample_rate, bytes_per_sample, format.is_float())?;

        log::debug!("opened {} ({channels}ch @ {sample_rate}Hz, {})", path.display(), format.name());
        Ok(Self { file: Some(file), channels, sample_rate, format, bytes_per_sample, samples_written: 0 })
    }

    fn write_sample(&self, file: &mut File, value: f64) -> DawResult<()> {
        let clamped = value.clamp(-1.0, 1.0);
        match self.format {
            AudioFormat::WavPcm16 => {
                let v = (clamped * i16::MAX as f64) as i16;
                file.write_all(&v.to_le_bytes())?;
            }
            AudioFormat::WavPcm24 => {
                let v = (clamped * 8_388_607.0) as i32;
                let bytes = v.to_le_bytes();
                file.write_all(&bytes[0..3])?;
            }
            AudioFormat::WavPcm32 => {
                let v = (clamped * i32::MAX as f64) as i32;
                file.write_all(&v.to_le_bytes())?;
            }
            AudioFormat::WavFloat32 => {
                let v = clamped as f32;
                file.write_all(&v.to_le_bytes())?;
            }
            _ => unreachable!("non-WAV format in WavWriter"),
        }
        Ok(())
    }
}

fn write_wav_header(file: &mut File, channels: u32, sample_rate: u32, bytes_per_sample: u32, is_float: bool) -> DawResult<()> {
    let block_align = channels * bytes_per_sample;
    let byte_rate = sample_rate * block_align;
    let bits_per_sample = bytes_per_sample * 8;
    let audio_format: u16 = if is_float { 3 } else { 1 };

    file.write_all(b"RIFF")?;
    file.write_all(&0u32.to_le_bytes())?; // file size, patched on close
    file.write_all(b"WAVE")?;
    file.write_all(b"fmt ")?;
    file.write_all(&16u32.to_le_bytes())?;
    file.write_all(&audio_format.to_le_bytes())?;
    file.write_all(&(channels as u16).to_le_bytes())?;
    file.write_all(&sample_rate.to_le_bytes())?;
    file.write_all(&byte_rate.to_le_bytes())?;
    file.write_all(&(block_align as u16).to_le_bytes())?;
    file.write_all(&(bits_per_sample as u16).to_le_bytes())?;
    file.write_all(b"data")?;
    file.write_all(&0u32.to_le_bytes())?; // data size, patched on close
    Ok(())
}

impl AudioFileWriter for WavWriter {
    fn write_samples(&mut self, channel_data: &[Vec<f64>], num_samples: usize) -> DawResult<()> {
        if channel_data.len() != self.channels as usize {
            return Err(DawError::InvalidParameter("channel count mismatch".into()));
        }
        let mut file = self.file.take().ok_or_else(|| DawError::Invariant("file not open for writing".into()))?;

        for sample in 0..num_samples {
            for ch in channel_data {
                self.write_sample(&mut file, ch[sample])?;
            }
        }
        self.samples_written += num_samples as u64;
        self.file = Some(file);
        Ok(())
    }

    fn close(&mut self) -> DawResult<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };

        let data_size = self.samples_written * self.channels as u64 * self.bytes_per_sample as u64;
        let file_size = data_size + 36;

        file.seek(SeekFrom::Start(4))?;
        file.write_all(&(file_size.min(u32::MAX as u64) as u32).to_le_bytes())?;
        file.seek(SeekFrom::Start(40))?;
        file.write_all(&(data_size.min(u32::MAX as u64) as u32).to_le_bytes())?;
        file.seek(SeekFrom::End(0))?;
        file.flush()?;
        Ok(())
    }

    fn file_size_bytes(&self) -> u64 {
        44 + self.samples_written * self.channels as u64 * self.bytes_per_sample as u64
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channel_count(&self) -> u32 {
        self.channels
    }
}

impl Drop for WavWriter {
    fn drop(&mut self) {
        if self.file.is_some() {
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn header_sizes_are_patched_on_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let mut writer = WavWriter::create(&path, 1, 48_000, AudioFormat::WavPcm16).unwrap();
        writer.write_samples(&[vec![0.5, -0.5, 0.25]], 3).unwrap();
        writer.close().unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        let file_size = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(file_size as u64, 36 + 3 * 2);
        let data_size = u32::from_le_bytes(bytes[40..44].try_into().unwrap());
        assert_eq!(data_size, 6);
        assert_eq!(bytes.len(), 44 + 6);
    }

    #[test]
    fn closing_twice_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let mut writer = WavWriter::create(&path, 1, 48_000, AudioFormat::WavPcm16).unwrap();
        writer.write_samples(&[vec![0.0]], 1).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn pcm24_writes_three_bytes_per_sample() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out24.wav");
        let mut writer = WavWriter::create(&path, 1, 44_100, AudioFormat::WavPcm24).unwrap();
        writer.write_samples(&[vec![1.0]], 1).unwrap();
        writer.close().unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 44 + 3);
        assert_eq!(&bytes[44..47], &[0xFF, 0xFF, 0x7F]);
    }
}
