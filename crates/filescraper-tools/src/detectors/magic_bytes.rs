//! In-process detection from leading magic bytes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use filescraper_common::{Detector, DetectorEntry, DetectorState, ToolsConfig};

/// `infer` names a few formats differently from the rest of the registry.
fn normalize(mimetype: &str) -> &str {
    match mimetype {
        "application/xml" => "text/xml",
        "audio/wav" | "audio/x-wav" | "audio/vnd.wave" => "audio/x-wav",
        "application/msword" | "application/x-ole-storage" => "application/msword",
        other => other,
    }
}

/// Detector sniffing magic bytes with `infer`. Guesses a MIME type only.
#[derive(Debug)]
pub struct MagicBytesDetector {
    state: DetectorState,
}

impl MagicBytesDetector {
    pub const ENTRY: DetectorEntry = DetectorEntry {
        name: "MagicBytesDetector",
        build: Self::boxed,
    };

    pub fn new(path: impl Into<PathBuf>, tools: Arc<ToolsConfig>) -> Self {
        Self {
            state: DetectorState::new(path, tools),
        }
    }

    fn boxed(path: &Path, tools: Arc<ToolsConfig>) -> Box<dyn Detector> {
        Box::new(Self::new(path, tools))
    }
}

impl Detector for MagicBytesDetector {
    fn name(&self) -> &'static str {
        "MagicBytesDetector"
    }

    fn state(&self) -> &DetectorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DetectorState {
        &mut self.state
    }

    fn detect(&mut self) -> filescraper_common::Result<()> {
        match infer::get_from_path(self.state.path()) {
            Ok(Some(kind)) => {
                let mimetype = normalize(kind.mime_type()).to_string();
                self.state.message(format!("Detected {mimetype}"));
                self.state.mimetype = Some(mimetype);
            }
            Ok(None) => self.state.message("No known magic bytes found"),
            Err(e) => self.state.error(format!("Could not read file: {e}")),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn detect(bytes: &[u8]) -> MagicBytesDetector {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        let mut detector = MagicBytesDetector::new(file.path(), Arc::default());
        detector.detect().unwrap();
        detector
    }

    #[test]
    fn test_detects_pdf_header() {
        let detector = detect(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n1 0 obj\n");
        assert_eq!(detector.mimetype(), Some("application/pdf"));
        assert_eq!(detector.version(), None);
        assert!(detector.important().is_empty());
    }

    #[test]
    fn test_detects_gif_header() {
        let detector = detect(b"GIF89a\x01\x00\x01\x00\x00\x00\x00;");
        assert_eq!(detector.mimetype(), Some("image/gif"));
    }

    #[test]
    fn test_unknown_bytes_leave_mimetype_missing() {
        let detector = detect(b"just some words");
        assert_eq!(detector.mimetype(), None);
        assert!(detector.info().errors.is_empty());
    }

    #[test]
    fn test_unreadable_file_is_recorded() {
        let mut detector = MagicBytesDetector::new("/nonexistent/file.bin", Arc::default());
        detector.detect().unwrap();
        assert_eq!(detector.mimetype(), None);
        assert_eq!(detector.info().errors.len(), 1);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("application/xml"), "text/xml");
        assert_eq!(normalize("image/png"), "image/png");
    }
}
