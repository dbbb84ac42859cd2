use std::path::{Path, PathBuf};

use aligner_core::{OutputFormat, TimeWindow};

/// Deterministic output path for a job: `{dir}/{stem}[window].{format}`.
///
/// Window bounds are encoded at millisecond precision so repeated runs of
/// the same job resolve to the same path; the runner's skip check depends
/// on this being pure and stable.
pub fn output_path(dir: &Path, stem: &str, format: OutputFormat, window: TimeWindow) -> PathBuf {
    let mut name = stem.to_string();
    match (window.start, window.end) {
        (None, None) => {}
        (Some(start), None) => name.push_str(&format!("_s-{}-ms", to_ms(start))),
        (None, Some(end)) => name.push_str(&format!("_e-{}-ms", to_ms(end))),
        (Some(start), Some(end)) => {
            name.push_str(&format!("_s-{}-e-{}-ms", to_ms(start), to_ms(end)));
        }
    }
    dir.join(format!("{name}.{}", format.as_str()))
}

fn to_ms(seconds: f64) -> i64 {
    (seconds * 1000.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_recording_uses_bare_stem() {
        let path = output_path(
            Path::new("out"),
            "clip",
            OutputFormat::TextGrid,
            TimeWindow::default(),
        );
        assert_eq!(path, PathBuf::from("out/clip.TextGrid"));
    }

    #[test]
    fn start_only_window_encodes_milliseconds() {
        let path = output_path(
            Path::new("out"),
            "clip",
            OutputFormat::TextGrid,
            TimeWindow::new(Some(1.5), None),
        );
        assert_eq!(path, PathBuf::from("out/clip_s-1500-ms.TextGrid"));
    }

    #[test]
    fn end_only_window_encodes_milliseconds() {
        let path = output_path(
            Path::new("out"),
            "clip",
            OutputFormat::Csv,
            TimeWindow::new(None, Some(2.25)),
        );
        assert_eq!(path, PathBuf::from("out/clip_e-2250-ms.csv"));
    }

    #[test]
    fn full_window_encodes_both_bounds() {
        let path = output_path(
            Path::new("out"),
            "clip",
            OutputFormat::TextGrid,
            TimeWindow::new(Some(1.5), Some(2.5)),
        );
        assert_eq!(path, PathBuf::from("out/clip_s-1500-e-2500-ms.TextGrid"));
    }

    #[test]
    fn same_inputs_same_path() {
        let window = TimeWindow::new(Some(0.125), Some(10.0));
        let a = output_path(Path::new("o"), "x", OutputFormat::Eaf, window);
        let b = output_path(Path::new("o"), "x", OutputFormat::Eaf, window);
        assert_eq!(a, b);
    }
}
