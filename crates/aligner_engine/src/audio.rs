use std::fs;
use std::path::Path;

use thiserror::Error;

use aligner_core::TimeWindow;

use crate::payload::FilePart;

#[derive(Debug, Error)]
pub enum SliceError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("not an uncompressed WAV file: {0}")]
    UnsupportedFormat(String),
    #[error("window {start:?}..{end:?} lies outside the recording")]
    WindowOutOfRange {
        start: Option<f64>,
        end: Option<f64>,
    },
}

/// Collaborator that re-encodes a time window of a recording into an
/// in-memory byte stream ready for upload.
pub trait AudioSlicer: Send + Sync {
    fn slice(&self, path: &Path, window: TimeWindow) -> Result<FilePart, SliceError>;
}

/// Slices uncompressed RIFF/WAV recordings at sample granularity and
/// re-emits a minimal container. Transcoding other codecs is out of scope;
/// anything that is not plain PCM or IEEE-float WAV is refused.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavSlicer;

impl AudioSlicer for WavSlicer {
    fn slice(&self, path: &Path, window: TimeWindow) -> Result<FilePart, SliceError> {
        let bytes = fs::read(path).map_err(|source| SliceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let layout = WavLayout::parse(&bytes)
            .ok_or_else(|| SliceError::UnsupportedFormat(path.display().to_string()))?;

        let frame_size = layout.block_align as u64;
        let total_frames = layout.data_len as u64 / frame_size;
        let start_frame = window
            .start
            .map(|s| (s * layout.sample_rate as f64) as u64)
            .unwrap_or(0);
        let end_frame = window
            .end
            .map(|e| (e * layout.sample_rate as f64) as u64)
            .unwrap_or(total_frames)
            .min(total_frames);
        if start_frame >= end_frame {
            return Err(SliceError::WindowOutOfRange {
                start: window.start,
                end: window.end,
            });
        }

        let byte_start = layout.data_offset + (start_frame * frame_size) as usize;
        let byte_end = layout.data_offset + (end_frame * frame_size) as usize;
        let payload = &bytes[byte_start..byte_end];

        let mut out = Vec::with_capacity(44 + payload.len());
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + payload.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&layout.fmt);
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(FilePart {
            bytes: out,
            filename,
        })
    }
}

/// Offsets and format fields pulled out of a RIFF/WAV byte stream.
struct WavLayout {
    sample_rate: u32,
    block_align: u16,
    /// The 16 canonical fmt-chunk bytes, copied into the sliced output.
    fmt: [u8; 16],
    data_offset: usize,
    data_len: usize,
}

impl WavLayout {
    fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return None;
        }

        let mut fmt: Option<[u8; 16]> = None;
        let mut data: Option<(usize, usize)> = None;
        let mut cursor = 12;
        while cursor + 8 <= bytes.len() {
            let id = &bytes[cursor..cursor + 4];
            let size = read_u32(bytes, cursor + 4)? as usize;
            let body = cursor + 8;
            match id {
                b"fmt " if size >= 16 && body + 16 <= bytes.len() => {
                    let mut chunk = [0u8; 16];
                    chunk.copy_from_slice(&bytes[body..body + 16]);
                    fmt = Some(chunk);
                }
                b"data" => {
                    let available = bytes.len().saturating_sub(body);
                    data = Some((body, size.min(available)));
                }
                _ => {}
            }
            // Chunks are word-aligned; odd sizes carry a pad byte.
            cursor = body + size + size % 2;
        }

        let fmt = fmt?;
        let (data_offset, data_len) = data?;
        let audio_format = u16::from_le_bytes([fmt[0], fmt[1]]);
        // 1 = integer PCM, 3 = IEEE float.
        if audio_format != 1 && audio_format != 3 {
            return None;
        }
        let sample_rate = u32::from_le_bytes([fmt[4], fmt[5], fmt[6], fmt[7]]);
        let block_align = u16::from_le_bytes([fmt[12], fmt[13]]);
        if sample_rate == 0 || block_align == 0 {
            return None;
        }
        Some(Self {
            sample_rate,
            block_align,
            fmt,
            data_offset,
            data_len,
        })
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Mono 16-bit PCM WAV with `frames` samples at `sample_rate`.
    fn make_wav(sample_rate: u32, frames: usize) -> Vec<u8> {
        let block_align: u16 = 2;
        let data_len = (frames * block_align as usize) as u32;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * u32::from(block_align)).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for i in 0..frames {
            out.extend_from_slice(&(i as i16).to_le_bytes());
        }
        out
    }

    fn write_temp_wav(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn slices_the_requested_sample_range() {
        let file = write_temp_wav(&make_wav(100, 200)); // 2 seconds
        let part = WavSlicer
            .slice(file.path(), TimeWindow::new(Some(0.5), Some(1.0)))
            .unwrap();

        let layout = WavLayout::parse(&part.bytes).expect("sliced output is a valid WAV");
        assert_eq!(layout.sample_rate, 100);
        // 0.5 s at 100 Hz mono 16-bit = 50 frames = 100 bytes.
        assert_eq!(layout.data_len, 100);
        // First sliced sample is frame 50.
        let first = i16::from_le_bytes([
            part.bytes[layout.data_offset],
            part.bytes[layout.data_offset + 1],
        ]);
        assert_eq!(first, 50);
    }

    #[test]
    fn open_ended_window_runs_to_the_end() {
        let file = write_temp_wav(&make_wav(100, 200));
        let part = WavSlicer
            .slice(file.path(), TimeWindow::new(Some(1.5), None))
            .unwrap();
        let layout = WavLayout::parse(&part.bytes).unwrap();
        assert_eq!(layout.data_len, 100); // last 0.5 s
    }

    #[test]
    fn end_beyond_recording_is_clamped() {
        let file = write_temp_wav(&make_wav(100, 100));
        let part = WavSlicer
            .slice(file.path(), TimeWindow::new(None, Some(99.0)))
            .unwrap();
        let layout = WavLayout::parse(&part.bytes).unwrap();
        assert_eq!(layout.data_len, 200);
    }

    #[test]
    fn start_past_the_end_is_out_of_range() {
        let file = write_temp_wav(&make_wav(100, 100));
        let err = WavSlicer
            .slice(file.path(), TimeWindow::new(Some(5.0), None))
            .unwrap_err();
        assert!(matches!(err, SliceError::WindowOutOfRange { .. }));
    }

    #[test]
    fn non_wav_bytes_are_refused() {
        let file = write_temp_wav(b"OggS this is not a wav");
        let err = WavSlicer
            .slice(file.path(), TimeWindow::new(Some(0.0), Some(1.0)))
            .unwrap_err();
        assert!(matches!(err, SliceError::UnsupportedFormat(_)));
    }
}
