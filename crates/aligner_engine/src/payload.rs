use std::fs;
use std::path::Path;

use log::warn;

use aligner_core::TimeWindow;

use crate::audio::AudioSlicer;
use crate::types::{ClientError, FailureKind};

/// One multipart file part: raw bytes plus the logical filename sent to
/// the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// Assemble the SIGNAL part: the whole file, or a windowed slice when
/// bounds are given.
pub fn signal_part(
    audio: &Path,
    window: TimeWindow,
    slicer: &dyn AudioSlicer,
) -> Result<FilePart, ClientError> {
    if window.is_empty() {
        let bytes = fs::read(audio).map_err(|err| {
            ClientError::new(
                FailureKind::Payload,
                format!("failed to read audio {}: {err}", audio.display()),
            )
        })?;
        return Ok(FilePart {
            bytes,
            filename: file_name(audio),
        });
    }
    slicer
        .slice(audio, window)
        .map_err(|err| ClientError::new(FailureKind::Payload, err.to_string()))
}

/// Assemble the TEXT part. Inline text wins over a text file; a job with
/// neither cannot be submitted.
pub fn text_part(text: Option<&Path>, inline_text: Option<&str>) -> Result<FilePart, ClientError> {
    if let Some(inline) = inline_text {
        if let Some(path) = text {
            warn!(
                "inline text provided, ignoring text file {}",
                path.display()
            );
        }
        let filename = text
            .map(file_name)
            .unwrap_or_else(|| ".txt".to_string());
        return Ok(FilePart {
            bytes: inline.as_bytes().to_vec(),
            filename,
        });
    }

    let Some(path) = text else {
        return Err(ClientError::new(
            FailureKind::Payload,
            "job carries neither a text file nor inline text",
        ));
    };
    let bytes = fs::read(path).map_err(|err| {
        ClientError::new(
            FailureKind::Payload,
            format!("failed to read text {}: {err}", path.display()),
        )
    })?;
    Ok(FilePart {
        bytes,
        filename: file_name(path),
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn inline_text_wins_over_file() {
        let path = PathBuf::from("transcript.txt");
        let part = text_part(Some(&path), Some("hello world")).unwrap();
        assert_eq!(part.bytes, b"hello world");
        assert_eq!(part.filename, "transcript.txt");
    }

    #[test]
    fn inline_text_without_file_gets_placeholder_name() {
        let part = text_part(None, Some("hello")).unwrap();
        assert_eq!(part.filename, ".txt");
    }

    #[test]
    fn missing_text_is_a_payload_error() {
        let err = text_part(None, None).unwrap_err();
        assert_eq!(err.kind, FailureKind::Payload);
    }

    #[test]
    fn unreadable_audio_is_a_payload_error() {
        let err = signal_part(
            Path::new("/nonexistent/clip.wav"),
            TimeWindow::default(),
            &crate::audio::WavSlicer,
        )
        .unwrap_err();
        assert_eq!(err.kind, FailureKind::Payload);
    }
}
