//! The detector contract.
//!
//! Detectors make a cheap first guess at a file's MIME type and version.
//! Their guesses select which scrapers run; they do not produce streams.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ToolsConfig;
use crate::scraper::ScraperInfo;
use crate::Result;

/// Values a detector insists on, overriding every other detector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Important {
    pub mimetype: Option<String>,
    /// Version to use, keyed by the MIME type it belongs to.
    pub version: BTreeMap<String, String>,
}

impl Important {
    pub fn is_empty(&self) -> bool {
        self.mimetype.is_none() && self.version.is_empty()
    }
}

/// State shared by detector implementations.
#[derive(Debug)]
pub struct DetectorState {
    path: PathBuf,
    tools: Arc<ToolsConfig>,
    pub mimetype: Option<String>,
    pub version: Option<String>,
    pub important: Important,
    messages: Vec<String>,
    errors: Vec<String>,
}

impl DetectorState {
    pub fn new(path: impl Into<PathBuf>, tools: Arc<ToolsConfig>) -> Self {
        Self {
            path: path.into(),
            tools,
            mimetype: None,
            version: None,
            important: Important::default(),
            messages: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tools(&self) -> &ToolsConfig {
        &self.tools
    }

    pub fn message(&mut self, msg: impl Into<String>) {
        self.messages.push(msg.into());
    }

    pub fn error(&mut self, err: impl Into<String>) {
        self.errors.push(err.into());
    }

    pub fn info(&self, class: &str) -> ScraperInfo {
        ScraperInfo {
            class: class.to_string(),
            messages: self.messages.iter().filter(|m| !m.is_empty()).cloned().collect(),
            errors: self.errors.iter().filter(|e| !e.is_empty()).cloned().collect(),
        }
    }
}

/// A lightweight MIME type / version guesser.
pub trait Detector: Send {
    fn name(&self) -> &'static str;

    fn state(&self) -> &DetectorState;

    fn state_mut(&mut self) -> &mut DetectorState;

    /// Populate `mimetype`, `version` and the important values.
    fn detect(&mut self) -> Result<()>;

    fn mimetype(&self) -> Option<&str> {
        self.state().mimetype.as_deref()
    }

    fn version(&self) -> Option<&str> {
        self.state().version.as_deref()
    }

    fn important(&self) -> &Important {
        &self.state().important
    }

    fn info(&self) -> ScraperInfo {
        self.state().info(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BasicDetector {
        state: DetectorState,
    }

    impl Detector for BasicDetector {
        fn name(&self) -> &'static str {
            "BasicDetector"
        }

        fn state(&self) -> &DetectorState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut DetectorState {
            &mut self.state
        }

        fn detect(&mut self) -> Result<()> {
            self.state.mimetype = Some("text/plain".into());
            self.state.message("detected");
            Ok(())
        }
    }

    #[test]
    fn test_base_detector() {
        let mut detector = BasicDetector {
            state: DetectorState::new("testfilename", Arc::default()),
        };
        assert_eq!(detector.state().path(), Path::new("testfilename"));
        assert!(detector.important().is_empty());

        detector.detect().unwrap();
        assert_eq!(detector.mimetype(), Some("text/plain"));
        assert_eq!(detector.version(), None);
        assert_eq!(detector.info().messages, vec!["detected"]);
    }
}
