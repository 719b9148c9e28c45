//! Detection with the `file` utility.

use regex::Regex;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use filescraper_common::{Detector, DetectorEntry, DetectorState, ToolsConfig};

use crate::command::ToolCommand;
use crate::tools::get_tool_path;

static PDF_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PDF document, version (\d+\.\d+)").unwrap());
static GIF_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"GIF image data, version (87a|89a)").unwrap());
static XML_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"XML (\d+\.\d+) document").unwrap());

/// Formats `file` tends to misreport as something more generic, such as
/// `application/zip`. When `file` does recognise them, its answer wins.
const IMPORTANT_MIMETYPES: &[&str] = &[
    "application/vnd.oasis.opendocument.text",
    "application/vnd.oasis.opendocument.spreadsheet",
    "application/vnd.oasis.opendocument.presentation",
    "application/vnd.oasis.opendocument.graphics",
    "application/vnd.oasis.opendocument.formula",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
];

/// Detector running `file -b --mime-type` and `file -b`.
#[derive(Debug)]
pub struct MagicDetector {
    state: DetectorState,
}

impl MagicDetector {
    pub const ENTRY: DetectorEntry = DetectorEntry {
        name: "MagicDetector",
        build: Self::boxed,
    };

    pub fn new(path: impl Into<std::path::PathBuf>, tools: Arc<ToolsConfig>) -> Self {
        Self {
            state: DetectorState::new(path, tools),
        }
    }

    fn boxed(path: &Path, tools: Arc<ToolsConfig>) -> Box<dyn Detector> {
        Box::new(Self::new(path, tools))
    }
}

/// Version implied by a `file` description, for the formats where the
/// description carries one.
pub(crate) fn version_from_description(mimetype: &str, description: &str) -> Option<String> {
    match mimetype {
        "application/pdf" => PDF_VERSION
            .captures(description)
            .map(|c| c[1].to_string()),
        "image/gif" => GIF_VERSION
            .captures(description)
            .map(|c| format!("19{}", &c[1])),
        "text/xml" => XML_VERSION
            .captures(description)
            .map(|c| c[1].to_string()),
        _ => None,
    }
}

impl Detector for MagicDetector {
    fn name(&self) -> &'static str {
        "MagicDetector"
    }

    fn state(&self) -> &DetectorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DetectorState {
        &mut self.state
    }

    fn detect(&mut self) -> filescraper_common::Result<()> {
        let file = get_tool_path("file", self.state.tools())?;
        let path = self.state.path().to_path_buf();

        let mime = ToolCommand::new(&file)
            .args(["-b", "--mime-type"])
            .arg(&path)
            .execute()?;
        if !mime.success() {
            self.state.error(format!(
                "file returned error: {}\n{}",
                mime.code(),
                mime.stderr.trim()
            ));
            return Ok(());
        }
        let mimetype = mime.stdout.trim().to_string();
        if mimetype.is_empty() {
            self.state.error("file reported no MIME type");
            return Ok(());
        }

        let description = ToolCommand::new(&file).arg("-b").arg(&path).execute()?;
        let version = if description.success() {
            version_from_description(&mimetype, description.stdout.trim())
        } else {
            None
        };

        if IMPORTANT_MIMETYPES.contains(&mimetype.as_str()) {
            self.state.important.mimetype = Some(mimetype.clone());
        }
        self.state.message(format!("Detected {mimetype}"));
        self.state.mimetype = Some(mimetype);
        self.state.version = version;
        Ok(())
    }
}
